//! X8QL Lexer - Tokenization using logos
//!
//! The DFA produces a single word class for identifiers and keywords;
//! `tokenize` then classifies words against the case-insensitive keyword
//! table. The parser decides whether a keyword may stand in for an
//! identifier at a given position.
//!
//! Characters that match no rule become `TokenKind::Error` tokens so the
//! parser can report them as ordinary syntax errors. Only malformed
//! tokens (unterminated strings and block comments) fail lexing.

mod token;

pub use token::*;

use logos::Logos;
use thiserror::Error;
use x8ql_ast::Span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("unterminated block comment")]
    UnterminatedComment { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
        }
    }
}

/// Tokenize a source string into a vector of tokens ending with `Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        let kind = match result {
            Ok(TokenKind::Ident) => TokenKind::keyword(lexer.slice()).unwrap_or(TokenKind::Ident),
            Ok(kind) => kind,
            Err(_) => classify_error(source, span)?,
        };
        tokens.push(Token { kind, span });
    }

    // Add EOF token
    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });

    Ok(tokens)
}

/// A failed match that opened a string or comment is malformed; anything
/// else is a stray character left for the parser to report.
fn classify_error(source: &str, span: Span) -> Result<TokenKind, LexError> {
    let rest = &source[span.start..];
    let to_end = Span::new(span.start, source.len());
    if rest.starts_with('\'') || rest.starts_with('"') {
        Err(LexError::UnterminatedString { span: to_end })
    } else if rest.starts_with("/*") {
        Err(LexError::UnterminatedComment { span: to_end })
    } else {
        Ok(TokenKind::Error)
    }
}

/// A token with its span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}
