//! Token definitions for X8QL

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\x0B\x0C]+")]        // Skip whitespace
#[logos(skip r"--[^\n]*")]                  // Skip line comments
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]   // Skip block comments
pub enum TokenKind {
    // === Keywords ===
    // Produced by `TokenKind::keyword` from `Ident` matches, never by the DFA.
    And,
    As,
    Asc,
    Between,
    By,
    Collection,
    Desc,
    End,
    False,
    From,
    In,
    Into,
    Not,
    Null,
    Or,
    Order,
    Rank,
    Search,
    Select,
    Set,
    True,
    Where,

    // === Operators ===
    #[token("=")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // === Punctuation ===
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("@")]
    At,
    /// Append sentinel inside `[-]`
    #[token("-")]
    Minus,
    /// Namespace separator in refs: `{{ns://coll.field}}`
    #[token("://")]
    SchemeSep,

    // === Literals ===
    // The sign belongs to the literal. Without a point or exponent the
    // text is always an integer.
    #[regex(r"[+-]?[0-9]+")]
    Integer,

    #[regex(r"[+-]?([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?")]
    #[regex(r"[+-]?[0-9]+[eE][+-]?[0-9]+")]
    Decimal,

    #[regex(r"'([^']|'')*'")]
    #[regex(r#""([^"]|"")*""#)]
    String,

    // === Identifiers ===
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_\-]*")]
    Ident,

    // === Special ===
    /// A character no rule recognizes
    Error,
    Eof,
}

impl TokenKind {
    /// Classify a word matched by the identifier rule. Keywords are
    /// case-insensitive.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_uppercase().as_str() {
            "AND" => TokenKind::And,
            "AS" => TokenKind::As,
            "ASC" => TokenKind::Asc,
            "BETWEEN" => TokenKind::Between,
            "BY" => TokenKind::By,
            "COLLECTION" => TokenKind::Collection,
            "DESC" => TokenKind::Desc,
            "END" => TokenKind::End,
            "FALSE" => TokenKind::False,
            "FROM" => TokenKind::From,
            "IN" => TokenKind::In,
            "INTO" => TokenKind::Into,
            "NOT" => TokenKind::Not,
            "NULL" => TokenKind::Null,
            "OR" => TokenKind::Or,
            "ORDER" => TokenKind::Order,
            "RANK" => TokenKind::Rank,
            "SEARCH" => TokenKind::Search,
            "SELECT" => TokenKind::Select,
            "SET" => TokenKind::Set,
            "TRUE" => TokenKind::True,
            "WHERE" => TokenKind::Where,
            _ => return None,
        };
        Some(kind)
    }

    /// Tokens accepted where the grammar expects an identifier.
    ///
    /// Clause keywords double as identifiers so fields can be named after
    /// them. Logical operators and boolean/null literals are excluded,
    /// otherwise expressions would be ambiguous.
    pub fn is_identifier_like(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Select
                | TokenKind::From
                | TokenKind::Into
                | TokenKind::Collection
                | TokenKind::Order
                | TokenKind::By
                | TokenKind::Where
                | TokenKind::Search
                | TokenKind::Set
                | TokenKind::Asc
                | TokenKind::Desc
                | TokenKind::Rank
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::And => "'AND'",
            TokenKind::As => "'AS'",
            TokenKind::Asc => "'ASC'",
            TokenKind::Between => "'BETWEEN'",
            TokenKind::By => "'BY'",
            TokenKind::Collection => "'COLLECTION'",
            TokenKind::Desc => "'DESC'",
            TokenKind::End => "'END'",
            TokenKind::False => "'FALSE'",
            TokenKind::From => "'FROM'",
            TokenKind::In => "'IN'",
            TokenKind::Into => "'INTO'",
            TokenKind::Not => "'NOT'",
            TokenKind::Null => "'NULL'",
            TokenKind::Or => "'OR'",
            TokenKind::Order => "'ORDER'",
            TokenKind::Rank => "'RANK'",
            TokenKind::Search => "'SEARCH'",
            TokenKind::Select => "'SELECT'",
            TokenKind::Set => "'SET'",
            TokenKind::True => "'TRUE'",
            TokenKind::Where => "'WHERE'",
            TokenKind::Eq => "'='",
            TokenKind::Ne => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Star => "'*'",
            TokenKind::At => "'@'",
            TokenKind::Minus => "'-'",
            TokenKind::SchemeSep => "'://'",
            TokenKind::Integer => "integer",
            TokenKind::Decimal => "decimal",
            TokenKind::String => "string",
            TokenKind::Ident => "identifier",
            TokenKind::Error => "unrecognized character",
            TokenKind::Eof => "end of input",
        }
    }
}
