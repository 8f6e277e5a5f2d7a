//! Recursive descent parser implementation

use std::collections::HashMap;

use tracing::trace;
use x8ql_ast::*;
use x8ql_lexer::{Token, TokenKind};

use crate::ParseError;

/// Deepest nesting of parentheses, `NOT`, function calls, arrays, JSON
/// containers and block statements, counted together.
pub const MAX_NESTING: usize = 32;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Number of `END` tokens at or after each index
    ends_after: Vec<usize>,
    /// Number of enclosing block statements
    depth: usize,
    /// Number of enclosing nested constructs of any kind
    nesting: usize,
    /// Block attempts that already failed, keyed by start position and depth
    failed_blocks: HashMap<(usize, usize), ParseError>,
    /// Furthest error from an abandoned block attempt
    deferred: Option<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        let mut ends_after = vec![0; tokens.len() + 1];
        for (i, token) in tokens.iter().enumerate().rev() {
            ends_after[i] = ends_after[i + 1] + usize::from(token.kind == TokenKind::End);
        }
        Self {
            source,
            tokens,
            pos: 0,
            ends_after,
            depth: 0,
            nesting: 0,
            failed_blocks: HashMap::new(),
            deferred: None,
        }
    }

    // === Utilities ===

    fn current(&self) -> Token {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(token) => *token,
            None => Token {
                kind: TokenKind::Eof,
                span: Span::new(self.source.len(), self.source.len()),
            },
        }
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(kind.describe()))
        }
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token
    fn last_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => self.span(),
        }
    }

    /// Error for the current token, which did not match `expected`
    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        match token.kind {
            TokenKind::Error => ParseError::UnrecognizedCharacter {
                found: self.text(&token).to_string(),
                span: token.span,
            },
            kind => ParseError::unexpected(expected, kind, token.span),
        }
    }

    /// Pick between `err` and any error left behind by an abandoned
    /// attempt, preferring whichever got further into the input.
    fn furthest(&self, err: ParseError) -> ParseError {
        match &self.deferred {
            _ if err.is_fatal() => err,
            Some(deferred) if deferred.span().start > err.span().start => deferred.clone(),
            _ => err,
        }
    }

    /// Run `parse` one nesting level deeper, failing once the input nests
    /// past `MAX_NESTING`.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING,
                span: self.span(),
            });
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn defer(&mut self, err: ParseError) {
        let further = self
            .deferred
            .as_ref()
            .map_or(true, |d| err.span().start > d.span().start);
        if further {
            self.deferred = Some(err);
        }
    }

    /// Require the whole input to have been consumed.
    pub fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.at(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.furthest(self.error("end of input")))
        }
    }

    fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        if self.peek().is_identifier_like() {
            let token = self.advance();
            Ok(Ident::new(self.text(&token), token.span))
        } else {
            Err(self.error("identifier"))
        }
    }

    // === Statements ===

    /// A block is attempted first, but only where enough `END` tokens remain
    /// to close it and every enclosing block. Otherwise an inner statement
    /// could claim the `END` of the block around it.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        let key = (start, self.depth);
        if self.ends_after.get(start).copied().unwrap_or(0) > self.depth {
            let attempt = match self.failed_blocks.get(&key) {
                Some(err) => Err(err.clone()),
                None => self.parse_block(),
            };
            match attempt {
                Ok(stmt) => return Ok(stmt),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    trace!(pos = start, depth = self.depth, error = %err, "block statement rejected, retrying as single");
                    self.failed_blocks.insert(key, err.clone());
                    self.defer(err);
                    self.pos = start;
                }
            }
        }
        self.parse_single().map_err(|err| self.furthest(err))
    }

    /// `op (statement ';')+ END`
    fn parse_block(&mut self) -> Result<Statement, ParseError> {
        self.nested(|p| {
            let start = p.span();
            let op = p.parse_ident()?;

            p.depth += 1;
            let body = p.parse_block_body();
            p.depth -= 1;
            let body = body?;
            p.consume(TokenKind::End)?;

            Ok(Statement {
                kind: StatementKind::Multi { op, body },
                span: start.merge(p.last_span()),
            })
        })
    }

    /// `(statement ';')+` up to the closing `END`
    fn parse_block_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        loop {
            body.push(self.parse_statement()?);
            self.consume(TokenKind::Semicolon)?;
            if self.at(TokenKind::End) {
                return Ok(body);
            }
        }
    }

    /// `op clause*`
    fn parse_single(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        let op = self.parse_ident()?;

        let mut clauses = Vec::new();
        while self.peek().is_identifier_like() {
            clauses.push(self.parse_clause()?);
        }

        Ok(Statement {
            kind: StatementKind::Single { op, clauses },
            span: start.merge(self.last_span()),
        })
    }

    // === Clauses ===

    /// A dedicated clause keyword is tried as its clause first. When that
    /// fails the keyword is retried as the name of a generic clause, since
    /// clause keywords also serve as identifiers (`Q select 5`).
    fn parse_clause(&mut self) -> Result<Clause, ParseError> {
        let start = self.span();
        let start_pos = self.pos;

        let kind = match self.parse_keyword_clause() {
            Some(Ok(kind)) => kind,
            Some(Err(err)) if err.is_fatal() => return Err(err),
            Some(Err(err)) => {
                self.pos = start_pos;
                match self.parse_generic_clause() {
                    Ok(kind) => {
                        trace!(pos = start_pos, error = %err, "keyword clause rejected, parsed as generic");
                        self.defer(err);
                        kind
                    }
                    Err(generic) if generic.is_fatal() => return Err(generic),
                    Err(generic) if generic.span().start > err.span().start => {
                        return Err(generic);
                    }
                    Err(_) => return Err(err),
                }
            }
            None => self.parse_generic_clause()?,
        };

        Ok(Clause {
            kind,
            span: start.merge(self.last_span()),
        })
    }

    /// `None` when the current token starts no dedicated clause
    fn parse_keyword_clause(&mut self) -> Option<Result<ClauseKind, ParseError>> {
        let kind = match self.peek() {
            TokenKind::Select
            | TokenKind::From
            | TokenKind::Into
            | TokenKind::Collection
            | TokenKind::Set
            | TokenKind::Search
            | TokenKind::Where
            | TokenKind::Order
            | TokenKind::Rank => self.advance().kind,
            _ => return None,
        };

        let clause = match kind {
            TokenKind::Select => self.parse_select_list().map(ClauseKind::Select),
            TokenKind::Set => self.parse_update_list().map(ClauseKind::Set),
            TokenKind::Search => self.parse_expression().map(ClauseKind::Search),
            TokenKind::Where => self.parse_expression().map(ClauseKind::Where),
            TokenKind::Order => self
                .consume(TokenKind::By)
                .and_then(|_| self.parse_order_by_list())
                .map(ClauseKind::OrderBy),
            TokenKind::Rank => self
                .consume(TokenKind::By)
                .and_then(|_| self.parse_expression())
                .map(ClauseKind::RankBy),
            _ => self.parse_collection().map(ClauseKind::Collection),
        };
        Some(clause)
    }

    /// `NAME operand`: `LIMIT 10`, `KEY 'k1'`
    fn parse_generic_clause(&mut self) -> Result<ClauseKind, ParseError> {
        let name = self.parse_ident()?;
        let value = self.parse_operand()?;
        Ok(ClauseKind::Generic { name, value })
    }

    pub fn parse_select_list(&mut self) -> Result<Select, ParseError> {
        match self.peek() {
            TokenKind::Star => {
                self.advance();
                Ok(Select::All)
            }
            TokenKind::At => Ok(Select::Parameter(self.parse_parameter()?)),
            _ => {
                let mut terms = vec![self.parse_select_term()?];
                while self.at(TokenKind::Comma) {
                    self.advance();
                    terms.push(self.parse_select_term()?);
                }
                Ok(Select::Terms(terms))
            }
        }
    }

    fn parse_select_term(&mut self) -> Result<SelectTerm, ParseError> {
        let start = self.span();
        let field = self.parse_field()?;
        let alias = if self.at(TokenKind::As) {
            self.advance();
            Some(self.parse_field()?)
        } else {
            None
        };

        Ok(SelectTerm {
            field,
            alias,
            span: start.merge(self.last_span()),
        })
    }

    pub fn parse_collection(&mut self) -> Result<Collection, ParseError> {
        if self.at(TokenKind::At) {
            return Ok(Collection::Parameter(self.parse_parameter()?));
        }

        let start = self.span();
        let mut segments = vec![self.parse_ident()?];
        while self.at(TokenKind::Dot) {
            self.advance();
            segments.push(self.parse_ident()?);
        }

        Ok(Collection::Path(CollectionPath {
            segments,
            span: start.merge(self.last_span()),
        }))
    }

    pub fn parse_order_by_list(&mut self) -> Result<OrderBy, ParseError> {
        if self.at(TokenKind::At) {
            return Ok(OrderBy::Parameter(self.parse_parameter()?));
        }

        let mut terms = Vec::new();
        loop {
            let start = self.span();
            let field = self.parse_field()?;
            let direction = match self.peek() {
                TokenKind::Asc => {
                    self.advance();
                    Some(OrderDirection::Asc)
                }
                TokenKind::Desc => {
                    self.advance();
                    Some(OrderDirection::Desc)
                }
                _ => None,
            };
            terms.push(OrderByTerm {
                field,
                direction,
                span: start.merge(self.last_span()),
            });

            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(OrderBy::Terms(terms))
    }

    pub fn parse_update_list(&mut self) -> Result<Update, ParseError> {
        if self.at(TokenKind::At) {
            return Ok(Update::Parameter(self.parse_parameter()?));
        }

        let mut operations = Vec::new();
        loop {
            let start = self.span();
            let field = self.parse_field()?;
            self.consume(TokenKind::Eq)?;
            if !self.at_function() {
                return Err(self.error("update function"));
            }
            let value = self.parse_function()?;
            operations.push(UpdateOperation {
                field,
                value,
                span: start.merge(self.last_span()),
            });

            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(Update::Operations(operations))
    }

    // === Expressions ===

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.at(TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            let span = left.span.merge(right.span);
            left = Expr {
                kind: ExprKind::Or {
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.at(TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            let span = left.span.merge(right.span);
            left = Expr {
                kind: ExprKind::And {
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if !self.at(TokenKind::Not) {
            return self.parse_predicate();
        }
        self.nested(|p| {
            let start = p.advance().span;
            let inner = p.parse_not()?;
            let span = start.merge(inner.span);
            Ok(Expr {
                kind: ExprKind::Not(Box::new(inner)),
                span,
            })
        })
    }

    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();

        if self.at(TokenKind::LParen) {
            return self.nested(|p| {
                p.advance();
                let inner = p.parse_expression()?;
                p.consume(TokenKind::RParen)?;
                Ok(Expr {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: start.merge(p.last_span()),
                })
            });
        }

        let lhs = self.parse_operand()?;
        let kind = match self.peek() {
            TokenKind::Eq
            | TokenKind::Ne
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::Lt
            | TokenKind::Le => {
                let op = match self.advance().kind {
                    TokenKind::Eq => CompareOp::Eq,
                    TokenKind::Ne => CompareOp::Ne,
                    TokenKind::Gt => CompareOp::Gt,
                    TokenKind::Ge => CompareOp::Ge,
                    TokenKind::Lt => CompareOp::Lt,
                    _ => CompareOp::Le,
                };
                let rhs = self.parse_operand()?;
                ExprKind::Comparison { op, lhs, rhs }
            }
            TokenKind::Between => {
                self.advance();
                let low = self.parse_operand()?;
                self.consume(TokenKind::And)?;
                let high = self.parse_operand()?;
                ExprKind::Between { lhs, low, high }
            }
            TokenKind::In => {
                self.advance();
                let set = self.parse_in_set()?;
                ExprKind::In {
                    lhs,
                    negated: false,
                    set,
                }
            }
            TokenKind::Not if self.peek_ahead(1) == TokenKind::In => {
                self.advance();
                self.advance();
                let set = self.parse_in_set()?;
                ExprKind::In {
                    lhs,
                    negated: true,
                    set,
                }
            }
            _ => ExprKind::Operand(lhs),
        };

        Ok(Expr {
            kind,
            span: start.merge(self.last_span()),
        })
    }

    /// `'(' operand (',' operand)* ')'`
    fn parse_in_set(&mut self) -> Result<Vec<Operand>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let mut set = vec![self.parse_operand()?];
        while self.at(TokenKind::Comma) {
            self.advance();
            set.push(self.parse_operand()?);
        }
        self.consume(TokenKind::RParen)?;
        Ok(set)
    }

    // === Operands ===

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        let start = self.span();

        let kind = match self.peek() {
            TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::String
            | TokenKind::Integer
            | TokenKind::Decimal
            | TokenKind::LBracket => OperandKind::Value(self.parse_value()?),
            // A JSON object key is always a string, so `{{` can only open a ref
            TokenKind::LBrace if self.peek_ahead(1) == TokenKind::LBrace => {
                OperandKind::Ref(self.parse_ref()?)
            }
            TokenKind::LBrace => OperandKind::Value(Value::Json(self.parse_json_object()?)),
            TokenKind::At => OperandKind::Parameter(self.parse_parameter()?),
            _ if self.at_function() => OperandKind::Function(self.parse_function()?),
            kind if kind.is_identifier_like() => OperandKind::Field(self.parse_field()?),
            _ => return Err(self.error("operand")),
        };

        Ok(Operand {
            kind,
            span: start.merge(self.last_span()),
        })
    }

    /// `name(` or `ns.name(`
    fn at_function(&self) -> bool {
        if !self.peek().is_identifier_like() {
            return false;
        }
        match self.peek_ahead(1) {
            TokenKind::LParen => true,
            TokenKind::Dot => {
                self.peek_ahead(2).is_identifier_like()
                    && self.peek_ahead(3) == TokenKind::LParen
            }
            _ => false,
        }
    }

    fn at_named_arg(&self) -> bool {
        self.peek().is_identifier_like() && self.peek_ahead(1) == TokenKind::Eq
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        self.nested(|p| {
            let start = p.span();
            let first = p.parse_ident()?;
            let (namespace, name) = if p.at(TokenKind::Dot) {
                p.advance();
                (Some(first), p.parse_ident()?)
            } else {
                (None, first)
            };

            p.consume(TokenKind::LParen)?;
            let args = if p.at(TokenKind::RParen) {
                FunctionArgs::None
            } else if p.at_named_arg() {
                FunctionArgs::Named(p.parse_named_args()?)
            } else {
                FunctionArgs::Positional(p.parse_positional_args()?)
            };
            p.consume(TokenKind::RParen)?;

            Ok(Function {
                namespace,
                name,
                args,
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_named_args(&mut self) -> Result<Vec<NamedArg>, ParseError> {
        let mut args = Vec::new();
        loop {
            if !self.at_named_arg() {
                return Err(self.error("named argument"));
            }
            let start = self.span();
            let name = self.parse_ident()?;
            self.consume(TokenKind::Eq)?;
            let value = self.parse_operand()?;
            args.push(NamedArg {
                name,
                value,
                span: start.merge(self.last_span()),
            });

            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(args)
    }

    fn parse_positional_args(&mut self) -> Result<Vec<Operand>, ParseError> {
        let mut args = Vec::new();
        loop {
            if self.at_named_arg() {
                return Err(self.error("positional argument"));
            }
            args.push(self.parse_operand()?);

            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(args)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        let start = self.consume(TokenKind::At)?.span;
        let name = self.parse_ident()?;
        let span = start.merge(name.span);
        Ok(Parameter { name, span })
    }

    /// `{{ns://collection.field}}`
    fn parse_ref(&mut self) -> Result<Ref, ParseError> {
        let start = self.span();
        self.consume(TokenKind::LBrace)?;
        self.consume(TokenKind::LBrace)?;

        let first = self.parse_ident()?;
        let (namespace, collection) = if self.at(TokenKind::SchemeSep) {
            self.advance();
            (Some(first), self.parse_ident()?)
        } else {
            (None, first)
        };
        self.consume(TokenKind::Dot)?;
        let field = self.parse_field()?;

        self.consume(TokenKind::RBrace)?;
        self.consume(TokenKind::RBrace)?;

        Ok(Ref {
            namespace,
            collection,
            field,
            span: start.merge(self.last_span()),
        })
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let start = self.span();
        let name = self.parse_ident()?;

        let mut path = Vec::new();
        loop {
            match self.peek() {
                TokenKind::LBracket => {
                    self.advance();
                    let segment = match self.peek() {
                        TokenKind::Integer => {
                            let token = self.advance();
                            PathSegment::Index(Value::Integer(self.integer(&token)?))
                        }
                        TokenKind::String => {
                            let token = self.advance();
                            PathSegment::Index(Value::String(unquote(self.text(&token))))
                        }
                        TokenKind::Minus => {
                            self.advance();
                            PathSegment::Append
                        }
                        _ => return Err(self.error("index, key or '-'")),
                    };
                    self.consume(TokenKind::RBracket)?;
                    path.push(segment);
                }
                TokenKind::Dot => {
                    self.advance();
                    path.push(PathSegment::Dot(self.parse_ident()?));
                }
                _ => break,
            }
        }

        Ok(Field {
            name,
            path,
            span: start.merge(self.last_span()),
        })
    }

    // === Values ===

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            TokenKind::Null => {
                self.advance();
                Ok(Value::Null)
            }
            TokenKind::True => {
                self.advance();
                Ok(Value::True)
            }
            TokenKind::False => {
                self.advance();
                Ok(Value::False)
            }
            TokenKind::String => {
                let token = self.advance();
                Ok(Value::String(unquote(self.text(&token))))
            }
            TokenKind::Integer => {
                let token = self.advance();
                Ok(Value::Integer(self.integer(&token)?))
            }
            TokenKind::Decimal => {
                let token = self.advance();
                Ok(Value::Decimal(self.decimal(&token)?))
            }
            TokenKind::LBracket => self.nested(|p| {
                p.advance();
                let mut items = Vec::new();
                if !p.at(TokenKind::RBracket) {
                    loop {
                        items.push(p.parse_value()?);
                        if !p.at(TokenKind::Comma) {
                            break;
                        }
                        p.advance();
                    }
                }
                p.consume(TokenKind::RBracket)?;
                Ok(Value::Array(items))
            }),
            TokenKind::LBrace => Ok(Value::Json(self.parse_json_object()?)),
            _ => Err(self.error("value")),
        }
    }

    fn integer(&self, token: &Token) -> Result<i128, ParseError> {
        let text = self.text(token);
        text.parse::<i128>().map_err(|_| ParseError::InvalidLiteral {
            text: text.to_string(),
            reason: "integer does not fit in 128 bits".to_string(),
            span: token.span,
        })
    }

    fn decimal(&self, token: &Token) -> Result<f64, ParseError> {
        let text = self.text(token);
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::InvalidLiteral {
                text: text.to_string(),
                reason: "decimal is out of range".to_string(),
                span: token.span,
            }),
        }
    }

    // === JSON ===

    fn parse_json_object(&mut self) -> Result<serde_json::Value, ParseError> {
        self.nested(|p| {
            p.consume(TokenKind::LBrace)?;
            let mut map = serde_json::Map::new();

            if !p.at(TokenKind::RBrace) {
                loop {
                    let key = p.parse_json_string()?;
                    p.consume(TokenKind::Colon)?;
                    let value = p.parse_json_value()?;
                    map.insert(key, value);

                    if !p.at(TokenKind::Comma) {
                        break;
                    }
                    p.advance();
                }
            }

            p.consume(TokenKind::RBrace)?;
            Ok(serde_json::Value::Object(map))
        })
    }

    fn parse_json_value(&mut self) -> Result<serde_json::Value, ParseError> {
        match self.peek() {
            TokenKind::String => Ok(serde_json::Value::String(self.parse_json_string()?)),
            TokenKind::Integer => {
                let token = self.advance();
                Ok(json_integer(self.integer(&token)?))
            }
            TokenKind::Decimal => {
                let token = self.advance();
                let value = self.decimal(&token)?;
                serde_json::Number::from_f64(value)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| ParseError::InvalidLiteral {
                        text: self.text(&token).to_string(),
                        reason: "not a JSON number".to_string(),
                        span: token.span,
                    })
            }
            TokenKind::True => {
                self.advance();
                Ok(serde_json::Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(serde_json::Value::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(serde_json::Value::Null)
            }
            TokenKind::LBrace => self.parse_json_object(),
            TokenKind::LBracket => self.nested(|p| {
                p.advance();
                let mut items = Vec::new();
                if !p.at(TokenKind::RBracket) {
                    loop {
                        items.push(p.parse_json_value()?);
                        if !p.at(TokenKind::Comma) {
                            break;
                        }
                        p.advance();
                    }
                }
                p.consume(TokenKind::RBracket)?;
                Ok(serde_json::Value::Array(items))
            }),
            _ => Err(self.error("JSON value")),
        }
    }

    /// JSON strings are double-quoted only
    fn parse_json_string(&mut self) -> Result<String, ParseError> {
        let token = self.current();
        let text = self.text(&token);
        if token.kind != TokenKind::String || !text.starts_with('"') {
            return Err(self.error("double-quoted string"));
        }
        self.advance();

        decode_json_escapes(&unquote(text)).map_err(|reason| ParseError::InvalidLiteral {
            text: text.to_string(),
            reason,
            span: token.span,
        })
    }
}

/// JSON numbers hold 64-bit integers exactly; anything wider degrades to a
/// float, as `serde_json` itself does when reading JSON text.
fn json_integer(value: i128) -> serde_json::Value {
    if let Ok(value) = i64::try_from(value) {
        serde_json::Value::from(value)
    } else if let Ok(value) = u64::try_from(value) {
        serde_json::Value::from(value)
    } else {
        serde_json::Value::from(value as f64)
    }
}

/// Strip the surrounding quotes and collapse the doubled quote escape.
fn unquote(text: &str) -> String {
    let quote = &text[..1];
    let inner = &text[1..text.len() - 1];
    inner.replace(&quote.repeat(2), quote)
}

/// Resolve JSON backslash escapes.
fn decode_json_escapes(s: &str) -> Result<String, String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('/') => result.push('/'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('u') => {
                let high = hex4(&mut chars)?;
                let code = if (0xD800..0xDC00).contains(&high) {
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err("unpaired surrogate in \\u escape".to_string());
                    }
                    let low = hex4(&mut chars)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err("unpaired surrogate in \\u escape".to_string());
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("invalid code point U+{:04X}", code))?;
                result.push(decoded);
            }
            Some(other) => return Err(format!("invalid escape '\\{}'", other)),
            None => return Err("dangling '\\' at end of string".to_string()),
        }
    }

    Ok(result)
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err("truncated \\u escape".to_string());
    }
    u32::from_str_radix(&digits, 16).map_err(|_| format!("invalid \\u escape '{}'", digits))
}
