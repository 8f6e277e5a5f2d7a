//! Parser error types

use thiserror::Error;
use x8ql_ast::Span;
use x8ql_lexer::{LexError, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("unrecognized character '{found}'")]
    UnrecognizedCharacter { found: String, span: Span },

    #[error("invalid literal '{text}': {reason}")]
    InvalidLiteral {
        text: String,
        reason: String,
        span: Span,
    },

    #[error("input nests deeper than {limit} levels")]
    NestingTooDeep { limit: usize, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::UnrecognizedCharacter { span, .. } => *span,
            ParseError::InvalidLiteral { span, .. } => *span,
            ParseError::NestingTooDeep { span, .. } => *span,
        }
    }

    /// Errors that end the parse outright instead of triggering a retry
    /// with another alternative.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::NestingTooDeep { .. })
    }

    /// Build the error for a token the grammar did not expect. End of
    /// input is reported as `UnexpectedEof` rather than as a token.
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        match found {
            TokenKind::Eof => ParseError::UnexpectedEof {
                expected: expected.into(),
                span,
            },
            _ => ParseError::UnexpectedToken {
                expected: expected.into(),
                found: found.describe().to_string(),
                span,
            },
        }
    }
}

/// Any failure of a parse entry point
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Lex(err) => err.span(),
            Error::Parse(err) => err.span(),
        }
    }
}

/// A fragment kind name that names no grammar root
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fragment kind '{0}' (expected one of statement, search, where, select, collection, order_by, rank_by, update)")]
pub struct UnknownFragmentKind(pub String);
