//! X8QL Parser - Recursive descent parser
//!
//! Parses X8QL statements and statement fragments into the AST.
//! Key parsing challenges:
//! - Clause keywords double as identifiers (`SELECT select FROM into`)
//! - Block statements (`op stmt; stmt; END`) share their prefix with
//!   single statements, so a block is tried first and rewound on failure
//! - JSON objects and `{{ref}}` references both open with `{`
//!
//! Every entry point is anchored at end of input: trailing tokens are an
//! error, never silently ignored.

mod error;
mod parser;

pub use error::*;
pub use parser::*;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};
use x8ql_ast::{Collection, Expr, OrderBy, Select, Statement, ToQl, Update};
use x8ql_lexer::tokenize;

fn parse_with<'a, T>(
    source: &'a str,
    kind: FragmentKind,
    root: impl FnOnce(&mut Parser<'a>) -> Result<T, ParseError>,
) -> Result<T, Error> {
    debug!(kind = %kind, len = source.len(), "parsing fragment");
    let tokens = tokenize(source).map_err(|err| {
        debug!(kind = %kind, error = %err, "lexing failed");
        err
    })?;
    trace!(tokens = tokens.len(), "tokenized");

    let mut parser = Parser::new(source, tokens);
    let result = root(&mut parser).and_then(|node| parser.expect_eof().map(|()| node));
    result.map_err(|err| {
        debug!(kind = %kind, error = %err, "parsing failed");
        Error::from(err)
    })
}

/// Parse a complete statement: `QUERY SELECT * FROM users WHERE age > 21`
pub fn parse_statement(source: &str) -> Result<Statement, Error> {
    parse_with(source, FragmentKind::Statement, Parser::parse_statement)
}

/// Parse the expression of a SEARCH clause
pub fn parse_search(source: &str) -> Result<Expr, Error> {
    parse_with(source, FragmentKind::Search, Parser::parse_expression)
}

/// Parse the expression of a WHERE clause
pub fn parse_where(source: &str) -> Result<Expr, Error> {
    parse_with(source, FragmentKind::Where, Parser::parse_expression)
}

/// Parse a field projection: `*`, `@fields` or `a, b.c AS d`
pub fn parse_select(source: &str) -> Result<Select, Error> {
    parse_with(source, FragmentKind::Select, Parser::parse_select_list)
}

/// Parse a collection name: `users`, `db.users` or `@collection`
pub fn parse_collection(source: &str) -> Result<Collection, Error> {
    parse_with(source, FragmentKind::Collection, Parser::parse_collection)
}

/// Parse an ordering list: `a DESC, b`
pub fn parse_order_by(source: &str) -> Result<OrderBy, Error> {
    parse_with(source, FragmentKind::OrderBy, Parser::parse_order_by_list)
}

/// Parse the expression of a RANK BY clause
pub fn parse_rank_by(source: &str) -> Result<Expr, Error> {
    parse_with(source, FragmentKind::RankBy, Parser::parse_expression)
}

/// Parse an update list: `a = put(1), items[-] = insert(@item)`
pub fn parse_update(source: &str) -> Result<Update, Error> {
    parse_with(source, FragmentKind::Update, Parser::parse_update_list)
}

/// The grammar roots a fragment can be parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Statement,
    Search,
    Where,
    Select,
    Collection,
    OrderBy,
    RankBy,
    Update,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 8] = [
        FragmentKind::Statement,
        FragmentKind::Search,
        FragmentKind::Where,
        FragmentKind::Select,
        FragmentKind::Collection,
        FragmentKind::OrderBy,
        FragmentKind::RankBy,
        FragmentKind::Update,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Statement => "statement",
            FragmentKind::Search => "search",
            FragmentKind::Where => "where",
            FragmentKind::Select => "select",
            FragmentKind::Collection => "collection",
            FragmentKind::OrderBy => "order_by",
            FragmentKind::RankBy => "rank_by",
            FragmentKind::Update => "update",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentKind {
    type Err = UnknownFragmentKind;

    /// Accepts the snake_case names, case-insensitively, with `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        FragmentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownFragmentKind(s.to_string()))
    }
}

/// A parsed fragment of any kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Statement(Statement),
    Search(Expr),
    Where(Expr),
    Select(Select),
    Collection(Collection),
    OrderBy(OrderBy),
    RankBy(Expr),
    Update(Update),
}

impl Fragment {
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Statement(_) => FragmentKind::Statement,
            Fragment::Search(_) => FragmentKind::Search,
            Fragment::Where(_) => FragmentKind::Where,
            Fragment::Select(_) => FragmentKind::Select,
            Fragment::Collection(_) => FragmentKind::Collection,
            Fragment::OrderBy(_) => FragmentKind::OrderBy,
            Fragment::RankBy(_) => FragmentKind::RankBy,
            Fragment::Update(_) => FragmentKind::Update,
        }
    }
}

impl ToQl for Fragment {
    fn to_ql(&self, indent: usize) -> String {
        match self {
            Fragment::Statement(stmt) => stmt.to_ql(indent),
            Fragment::Search(expr) | Fragment::Where(expr) | Fragment::RankBy(expr) => {
                expr.to_ql(indent)
            }
            Fragment::Select(select) => select.to_ql(indent),
            Fragment::Collection(collection) => collection.to_ql(indent),
            Fragment::OrderBy(order_by) => order_by.to_ql(indent),
            Fragment::Update(update) => update.to_ql(indent),
        }
    }
}

/// Parse `source` with the entry point selected by `kind`
pub fn parse_fragment(kind: FragmentKind, source: &str) -> Result<Fragment, Error> {
    match kind {
        FragmentKind::Statement => parse_statement(source).map(Fragment::Statement),
        FragmentKind::Search => parse_search(source).map(Fragment::Search),
        FragmentKind::Where => parse_where(source).map(Fragment::Where),
        FragmentKind::Select => parse_select(source).map(Fragment::Select),
        FragmentKind::Collection => parse_collection(source).map(Fragment::Collection),
        FragmentKind::OrderBy => parse_order_by(source).map(Fragment::OrderBy),
        FragmentKind::RankBy => parse_rank_by(source).map(Fragment::RankBy),
        FragmentKind::Update => parse_update(source).map(Fragment::Update),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use x8ql_ast::*;
    use x8ql_lexer::LexError;

    fn comparison(expr: &Expr) -> (&Operand, CompareOp, &Operand) {
        match &expr.kind {
            ExprKind::Comparison { op, lhs, rhs } => (lhs, *op, rhs),
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    fn field_name(operand: &Operand) -> &str {
        match &operand.kind {
            OperandKind::Field(field) => &field.name.name,
            other => panic!("Expected field, got {:?}", other),
        }
    }

    fn value(operand: &Operand) -> &Value {
        match &operand.kind {
            OperandKind::Value(value) => value,
            other => panic!("Expected value, got {:?}", other),
        }
    }

    fn where_rhs(source: &str) -> Value {
        let expr = parse_where(source).unwrap();
        let (_, _, rhs) = comparison(&expr);
        value(rhs).clone()
    }

    // === Statements ===

    #[test]
    fn test_parse_simple_query() {
        let result = parse_statement("QUERY SELECT * FROM users WHERE age > 21");
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
        let stmt = result.unwrap();
        assert_eq!(stmt.op().name, "QUERY");
        let keys: Vec<_> = stmt.clauses().iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["select", "collection", "where"]);
    }

    #[test]
    fn test_keywords_as_identifiers() {
        let stmt = parse_statement("QUERY SELECT select FROM into").unwrap();
        let clauses = stmt.clauses();
        assert_eq!(clauses.len(), 2);

        match &clauses[0].kind {
            ClauseKind::Select(Select::Terms(terms)) => {
                assert_eq!(terms.len(), 1);
                assert_eq!(terms[0].field.name.name, "select");
                assert!(terms[0].alias.is_none());
            }
            other => panic!("Expected select terms, got {:?}", other),
        }
        match &clauses[1].kind {
            ClauseKind::Collection(Collection::Path(path)) => assert_eq!(path.name(), "into"),
            other => panic!("Expected collection path, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_keyword_is_not_identifier() {
        assert!(parse_statement("QUERY SELECT and").is_err());
        assert!(parse_select("or").is_err());
        assert!(parse_collection("null").is_err());
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let stmt =
            parse_statement("query select * from users where a = 1 order by b desc").unwrap();
        let keys: Vec<_> = stmt.clauses().iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["select", "collection", "where", "order_by"]);
        assert_eq!(stmt.op().name, "query");
        assert_eq!(stmt.op().normalized(), "query");
    }

    #[test]
    fn test_clauses_any_order_and_repeated() {
        let stmt = parse_statement("QUERY WHERE a = 1 WHERE b = 2 SELECT *").unwrap();
        let keys: Vec<_> = stmt.clauses().iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["where", "where", "select"]);
    }

    #[test]
    fn test_statement_without_clauses() {
        let stmt = parse_statement("PING").unwrap();
        assert!(stmt.clauses().is_empty());
    }

    #[test]
    fn test_generic_clauses() {
        let stmt = parse_statement("QUERY FROM users LIMIT 10 OFFSET @off KEY 'k1'").unwrap();
        let clauses = stmt.clauses();
        let keys: Vec<_> = clauses.iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["collection", "limit", "offset", "key"]);

        match &clauses[1].kind {
            ClauseKind::Generic { name, value: operand } => {
                assert_eq!(name.name, "LIMIT");
                assert_eq!(value(operand), &Value::Integer(10));
            }
            other => panic!("Expected generic clause, got {:?}", other),
        }
        match &clauses[2].kind {
            ClauseKind::Generic { value: operand, .. } => {
                assert!(matches!(operand.kind, OperandKind::Parameter(_)));
            }
            other => panic!("Expected generic clause, got {:?}", other),
        }
    }

    #[test]
    fn test_collection_keywords() {
        for source in ["INSERT INTO users", "QUERY FROM users", "DROP COLLECTION users"] {
            let stmt = parse_statement(source).unwrap();
            assert!(
                matches!(stmt.clauses()[0].kind, ClauseKind::Collection(_)),
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_search_and_rank_clauses() {
        let stmt = parse_statement(
            "QUERY SEARCH vector_search(vector=@v, k=10) RANK BY score(@q) SELECT @fields",
        )
        .unwrap();
        let keys: Vec<_> = stmt.clauses().iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["search", "rank_by", "select"]);
    }

    #[test]
    fn test_clause_keyword_as_generic_clause_name() {
        for (source, expected) in [
            ("Q select 5", "select"),
            ("Q order 5", "order"),
            ("QUERY ORDER x", "ORDER"),
            ("QUERY RANK score(@q)", "RANK"),
        ] {
            let stmt = parse_statement(source).unwrap();
            match &stmt.clauses()[0].kind {
                ClauseKind::Generic { name, .. } => assert_eq!(name.name, expected),
                other => panic!("Expected generic clause for {}, got {:?}", source, other),
            }
        }

        let stmt = parse_statement("Q select 5 WHERE a = 1").unwrap();
        let keys: Vec<_> = stmt.clauses().iter().map(|c| c.kind.key()).collect();
        assert_eq!(keys, vec!["select", "where"]);
        assert!(matches!(stmt.clauses()[0].kind, ClauseKind::Generic { .. }));
    }

    #[test]
    fn test_keyword_clause_preferred_over_generic() {
        let stmt = parse_statement("Q SET @p").unwrap();
        assert!(matches!(
            stmt.clauses()[0].kind,
            ClauseKind::Set(Update::Parameter(_))
        ));

        let stmt = parse_statement("Q SELECT x").unwrap();
        assert!(matches!(
            stmt.clauses()[0].kind,
            ClauseKind::Select(Select::Terms(_))
        ));
    }

    #[test]
    fn test_failed_keyword_clause_reports_furthest_error() {
        // Both readings fail at ';'; the keyword clause's message wins
        let err = parse_statement("Q select ;").unwrap_err();
        assert_eq!(
            err,
            Error::Parse(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: "';'".to_string(),
                span: Span::new(9, 10),
            })
        );

        // The generic reading stops early, the ORDER BY list got further
        let err = parse_statement("Q ORDER BY a,").unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_block_statement() {
        let stmt = parse_statement(
            "BATCH DELETE WHERE id = 1; UPDATE SET a = put(2) WHERE id = 3; END",
        )
        .unwrap();
        match &stmt.kind {
            StatementKind::Multi { op, body } => {
                assert_eq!(op.name, "BATCH");
                assert_eq!(body.len(), 2);
                assert_eq!(body[0].op().name, "DELETE");
                assert_eq!(body[1].op().name, "UPDATE");
                assert_eq!(body[1].clauses().len(), 2);
            }
            other => panic!("Expected block statement, got {:?}", other),
        }
    }

    #[test]
    fn test_block_statement_requires_end() {
        assert!(parse_statement("BATCH DELETE WHERE id = 1; UPDATE SET a = put(2);").is_err());
        assert!(parse_statement("BATCH DELETE WHERE id = 1 END").is_err());
    }

    #[test]
    fn test_nested_block_statement() {
        let stmt = parse_statement("OUTER INNER A; END; B; END").unwrap();
        match &stmt.kind {
            StatementKind::Multi { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(body[0].kind, StatementKind::Multi { .. }));
                assert!(matches!(body[1].kind, StatementKind::Single { .. }));
            }
            other => panic!("Expected block statement, got {:?}", other),
        }
    }

    #[test]
    fn test_inner_statement_does_not_claim_outer_end() {
        // `DELETE KEY k1; END` alone would be a block; here the END closes BATCH
        let stmt = parse_statement("BATCH DELETE KEY k1; END").unwrap();
        match &stmt.kind {
            StatementKind::Multi { body, .. } => {
                assert_eq!(body.len(), 1);
                assert_eq!(body[0].op().name, "DELETE");
                assert_eq!(body[0].clauses()[0].kind.key(), "key");
            }
            other => panic!("Expected block statement, got {:?}", other),
        }
    }

    #[test]
    fn test_block_error_points_past_prefix() {
        let err = parse_statement("BATCH DO A 1; DO B #; END").unwrap_err();
        assert_eq!(
            err,
            Error::Parse(ParseError::UnrecognizedCharacter {
                found: "#".to_string(),
                span: Span::new(19, 20),
            })
        );
    }

    #[test]
    fn test_empty_input() {
        let err = parse_statement("").unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::UnexpectedEof { .. })
        ));
        assert!(parse_where("   -- only a comment").is_err());
    }

    // === Expressions ===

    #[test]
    fn test_precedence() {
        let expr = parse_where("a = 1 OR b = 2 AND NOT c = 3").unwrap();
        let ExprKind::Or { lhs, rhs } = &expr.kind else {
            panic!("Expected OR at root, got {:?}", expr.kind);
        };
        assert_eq!(field_name(comparison(lhs).0), "a");

        let ExprKind::And { lhs, rhs } = &rhs.kind else {
            panic!("Expected AND, got {:?}", rhs.kind);
        };
        assert_eq!(field_name(comparison(lhs).0), "b");

        let ExprKind::Not(inner) = &rhs.kind else {
            panic!("Expected NOT, got {:?}", rhs.kind);
        };
        assert_eq!(field_name(comparison(inner).0), "c");
    }

    #[test]
    fn test_binary_operators_left_associative() {
        let expr = parse_where("a = 1 OR b = 2 OR c = 3").unwrap();
        let ExprKind::Or { lhs, rhs } = &expr.kind else {
            panic!("Expected OR, got {:?}", expr.kind);
        };
        assert!(matches!(lhs.kind, ExprKind::Or { .. }));
        assert_eq!(field_name(comparison(rhs).0), "c");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_where("(a = 1 OR b = 2) AND c = 3").unwrap();
        let ExprKind::And { lhs, .. } = &expr.kind else {
            panic!("Expected AND, got {:?}", expr.kind);
        };
        let ExprKind::Paren(inner) = &lhs.kind else {
            panic!("Expected parenthesized expression, got {:?}", lhs.kind);
        };
        assert!(matches!(inner.kind, ExprKind::Or { .. }));
    }

    #[test]
    fn test_comparison_operators() {
        let cases = [
            ("a = 1", CompareOp::Eq),
            ("a != 1", CompareOp::Ne),
            ("a <> 1", CompareOp::Ne),
            ("a > 1", CompareOp::Gt),
            ("a >= 1", CompareOp::Ge),
            ("a < 1", CompareOp::Lt),
            ("a <= 1", CompareOp::Le),
        ];
        for (source, expected) in cases {
            let expr = parse_where(source).unwrap();
            assert_eq!(comparison(&expr).1, expected, "{}", source);
        }
    }

    #[test]
    fn test_between() {
        let expr = parse_where("x BETWEEN 1 AND 10 AND y = 2").unwrap();
        let ExprKind::And { lhs, rhs } = &expr.kind else {
            panic!("Expected AND, got {:?}", expr.kind);
        };
        match &lhs.kind {
            ExprKind::Between { lhs, low, high } => {
                assert_eq!(field_name(lhs), "x");
                assert_eq!(value(low), &Value::Integer(1));
                assert_eq!(value(high), &Value::Integer(10));
            }
            other => panic!("Expected BETWEEN, got {:?}", other),
        }
        assert_eq!(field_name(comparison(rhs).0), "y");
    }

    #[test]
    fn test_in_and_not_in() {
        let expr = parse_where("x IN (1, 2, 3)").unwrap();
        match &expr.kind {
            ExprKind::In { negated, set, .. } => {
                assert!(!negated);
                assert_eq!(set.len(), 3);
            }
            other => panic!("Expected IN, got {:?}", other),
        }

        let expr = parse_where("x NOT IN ('a', @p)").unwrap();
        match &expr.kind {
            ExprKind::In { negated, set, .. } => {
                assert!(negated);
                assert_eq!(set.len(), 2);
                assert!(matches!(set[1].kind, OperandKind::Parameter(_)));
            }
            other => panic!("Expected NOT IN, got {:?}", other),
        }

        assert!(parse_where("x IN ()").is_err());
        assert!(parse_where("x IN 1, 2").is_err());
    }

    #[test]
    fn test_bare_operand_expression() {
        let expr = parse_where("is_defined(email) AND NOT deleted").unwrap();
        let ExprKind::And { lhs, rhs } = &expr.kind else {
            panic!("Expected AND, got {:?}", expr.kind);
        };
        assert!(matches!(
            &lhs.kind,
            ExprKind::Operand(Operand { kind: OperandKind::Function(_), .. })
        ));
        assert!(matches!(rhs.kind, ExprKind::Not(_)));
    }

    #[test]
    fn test_expression_span() {
        let expr = parse_where("  a = 1  ").unwrap();
        assert_eq!(expr.span, Span::new(2, 7));
    }

    // === Operands ===

    #[test]
    fn test_literal_values() {
        assert_eq!(where_rhs("a = NULL"), Value::Null);
        assert_eq!(where_rhs("a = true"), Value::True);
        assert_eq!(where_rhs("a = FALSE"), Value::False);
        assert_eq!(where_rhs("a = 'O''Brien'"), Value::String("O'Brien".to_string()));
        assert_eq!(where_rhs(r#"a = "a""b""#), Value::String("a\"b".to_string()));
        assert_eq!(where_rhs("a = +42"), Value::Integer(42));
        assert_eq!(where_rhs("a = -7"), Value::Integer(-7));
        assert_eq!(where_rhs("a = 123.0"), Value::Decimal(123.0));
        assert_eq!(where_rhs("a = 123e5"), Value::Decimal(123e5));
        assert_eq!(where_rhs("a = .5"), Value::Decimal(0.5));
        assert_eq!(where_rhs("a = -1.2e-3"), Value::Decimal(-1.2e-3));
    }

    #[test]
    fn test_wide_integers() {
        assert_eq!(
            where_rhs("a = 99999999999999999999"),
            Value::Integer(99_999_999_999_999_999_999)
        );
        assert_eq!(
            where_rhs("a = -170141183460469231731687303715884105728"),
            Value::Integer(i128::MIN)
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        let source = format!("a = 1{}", "0".repeat(39));
        let err = parse_where(&source).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::InvalidLiteral { .. })
        ));
        assert_eq!(err.span(), Span::new(4, 44));
    }

    #[test]
    fn test_decimal_out_of_range() {
        let err = parse_where("a = 1e999").unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_json_object() {
        let rhs = where_rhs(r#"meta = {"a": [1, 2.5, {"b": null}], "s": "x""y", "t": true}"#);
        assert_eq!(
            rhs,
            Value::Json(json!({"a": [1, 2.5, {"b": null}], "s": "x\"y", "t": true}))
        );
    }

    #[test]
    fn test_json_escapes() {
        let rhs = where_rhs(r#"meta = {"line": "a\nb\u0041"}"#);
        assert_eq!(rhs, Value::Json(json!({"line": "a\nbA"})));

        let err = parse_where(r#"meta = {"bad": "\q"}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_json_requires_double_quotes() {
        assert!(parse_where("meta = {'a': 1}").is_err());
        assert!(parse_where(r#"meta = {"a": 'b'}"#).is_err());
        assert!(parse_where(r#"meta = {a: 1}"#).is_err());
        assert_eq!(where_rhs("meta = {}"), Value::Json(json!({})));
    }

    #[test]
    fn test_array_value() {
        let rhs = where_rhs(r#"tags = [1, 'two', {"three": 3}, [NULL]]"#);
        assert_eq!(
            rhs,
            Value::Array(vec![
                Value::Integer(1),
                Value::String("two".to_string()),
                Value::Json(json!({"three": 3})),
                Value::Array(vec![Value::Null]),
            ])
        );
        assert_eq!(where_rhs("tags = []"), Value::Array(vec![]));
    }

    #[test]
    fn test_field_paths() {
        let expr = parse_where("a.b[0].c['key'] = 1").unwrap();
        let OperandKind::Field(field) = &comparison(&expr).0.kind else {
            panic!("Expected field");
        };
        assert_eq!(field.name.name, "a");
        assert_eq!(field.path.len(), 4);
        assert!(matches!(&field.path[0], PathSegment::Dot(id) if id.name == "b"));
        assert_eq!(field.path[1], PathSegment::Index(Value::Integer(0)));
        assert!(matches!(&field.path[2], PathSegment::Dot(id) if id.name == "c"));
        assert_eq!(
            field.path[3],
            PathSegment::Index(Value::String("key".to_string()))
        );
    }

    #[test]
    fn test_invalid_field_index() {
        assert!(parse_where("a[1.5] = 1").is_err());
        assert!(parse_where("a[b] = 1").is_err());
        assert!(parse_where("a. = 1").is_err());
    }

    #[test]
    fn test_function_arguments() {
        let expr = parse_where("ns.vector_search(vector=@v, k=10)").unwrap();
        let ExprKind::Operand(Operand { kind: OperandKind::Function(function), .. }) = &expr.kind
        else {
            panic!("Expected function, got {:?}", expr.kind);
        };
        assert_eq!(function.namespace.as_ref().map(|n| n.name.as_str()), Some("ns"));
        assert_eq!(function.name.name, "vector_search");
        match &function.args {
            FunctionArgs::Named(args) => {
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].name.name, "vector");
                assert_eq!(value(&args[1].value), &Value::Integer(10));
            }
            other => panic!("Expected named args, got {:?}", other),
        }

        let expr = parse_where("contains(tags, 'x') = true").unwrap();
        let OperandKind::Function(function) = &comparison(&expr).0.kind else {
            panic!("Expected function");
        };
        assert!(function.namespace.is_none());
        assert!(matches!(&function.args, FunctionArgs::Positional(args) if args.len() == 2));

        let expr = parse_where("now()").unwrap();
        let ExprKind::Operand(Operand { kind: OperandKind::Function(function), .. }) = &expr.kind
        else {
            panic!("Expected function");
        };
        assert_eq!(function.args, FunctionArgs::None);
    }

    #[test]
    fn test_mixed_arguments_rejected() {
        assert!(parse_where("f(a=1, 2)").is_err());
        assert!(parse_where("f(1, a=2)").is_err());
    }

    #[test]
    fn test_refs() {
        let expr = parse_where("owner = {{docs://users.id}}").unwrap();
        let OperandKind::Ref(r) = &comparison(&expr).2.kind else {
            panic!("Expected ref");
        };
        assert_eq!(r.namespace.as_ref().map(|n| n.name.as_str()), Some("docs"));
        assert_eq!(r.collection.name, "users");
        assert_eq!(r.field.name.name, "id");

        let expr = parse_where("city = {{users.address.city}}").unwrap();
        let OperandKind::Ref(r) = &comparison(&expr).2.kind else {
            panic!("Expected ref");
        };
        assert!(r.namespace.is_none());
        assert_eq!(r.field.name.name, "address");
        assert_eq!(r.field.path.len(), 1);

        assert!(parse_where("a = {{users}}").is_err());
        assert!(parse_where("a = {{users.id}").is_err());
    }

    // === Fragments ===

    #[test]
    fn test_select_list() {
        assert_eq!(parse_select("*").unwrap(), Select::All);
        assert!(matches!(parse_select("@fields").unwrap(), Select::Parameter(_)));

        let Select::Terms(terms) = parse_select("a.b AS c, d").unwrap() else {
            panic!("Expected select terms");
        };
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].alias.as_ref().map(|a| a.name.name.as_str()), Some("c"));
        assert!(terms[1].alias.is_none());
    }

    #[test]
    fn test_collection() {
        let Collection::Path(path) = parse_collection("db.users").unwrap() else {
            panic!("Expected collection path");
        };
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.name(), "db.users");
        assert!(matches!(
            parse_collection("@collection").unwrap(),
            Collection::Parameter(_)
        ));
    }

    #[test]
    fn test_order_by() {
        let OrderBy::Terms(terms) = parse_order_by("x DESC, y, z asc").unwrap() else {
            panic!("Expected order terms");
        };
        let directions: Vec<_> = terms.iter().map(|t| t.direction).collect();
        assert_eq!(
            directions,
            vec![Some(OrderDirection::Desc), None, Some(OrderDirection::Asc)]
        );
        assert!(matches!(parse_order_by("@order").unwrap(), OrderBy::Parameter(_)));

        // A field may be named after a direction keyword
        let OrderBy::Terms(terms) = parse_order_by("desc ASC").unwrap() else {
            panic!("Expected order terms");
        };
        assert_eq!(terms[0].field.name.name, "desc");
        assert_eq!(terms[0].direction, Some(OrderDirection::Asc));
    }

    #[test]
    fn test_update_with_append() {
        let Update::Operations(ops) = parse_update("items[-] = fn(@p)").unwrap() else {
            panic!("Expected update operations");
        };
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].field.name.name, "items");
        assert_eq!(ops[0].field.path, vec![PathSegment::Append]);
        assert_eq!(ops[0].value.name.name, "fn");
        match &ops[0].value.args {
            FunctionArgs::Positional(args) => {
                assert!(matches!(args[0].kind, OperandKind::Parameter(_)));
            }
            other => panic!("Expected positional args, got {:?}", other),
        }

        let stmt = parse_statement("UPDATE SET items[-] = fn(@p), count = increment(1)").unwrap();
        assert!(matches!(
            &stmt.clauses()[0].kind,
            ClauseKind::Set(Update::Operations(ops)) if ops.len() == 2
        ));
    }

    #[test]
    fn test_update_requires_function() {
        assert!(parse_update("a = 5").is_err());
        assert!(parse_update("a = b").is_err());
        assert!(matches!(parse_update("@updates").unwrap(), Update::Parameter(_)));
    }

    #[test]
    fn test_entry_points_reject_trailing_tokens() {
        assert!(parse_where("a = 1 ORDER BY x").is_err());
        assert!(parse_search("a = 1)").is_err());
        assert!(parse_select("a, b extra").is_err());
        assert!(parse_collection("users WHERE a = 1").is_err());
        assert!(parse_order_by("a DESC b").is_err());
        assert!(parse_rank_by("score(@q) 1").is_err());
        assert!(parse_update("a = put(1) b").is_err());
        assert!(parse_statement("QUERY SELECT * ;").is_err());
    }

    #[test]
    fn test_trailing_token_error_position() {
        let err = parse_where("a = 1 ORDER BY x").unwrap_err();
        match err {
            Error::Parse(ParseError::UnexpectedToken { expected, found, span }) => {
                assert_eq!(expected, "end of input");
                assert_eq!(found, "'ORDER'");
                assert_eq!(span, Span::new(6, 11));
            }
            other => panic!("Expected unexpected token, got {:?}", other),
        }
    }

    // === Nesting ===

    fn assert_too_deep(result: Result<impl std::fmt::Debug, Error>, start: usize) {
        match result {
            Err(Error::Parse(ParseError::NestingTooDeep { limit, span })) => {
                assert_eq!(limit, MAX_NESTING);
                assert_eq!(span.start, start);
            }
            other => panic!("Expected nesting error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_parentheses_limit() {
        let at_limit = format!("{}a = 1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse_where(&at_limit).is_ok());

        let n = MAX_NESTING + 1;
        let too_deep = format!("{}a = 1{}", "(".repeat(n), ")".repeat(n));
        assert_too_deep(parse_where(&too_deep), MAX_NESTING);
    }

    #[test]
    fn test_nested_not_limit() {
        assert!(parse_where(&format!("{}a", "NOT ".repeat(MAX_NESTING))).is_ok());
        assert_too_deep(
            parse_where(&format!("{}a", "NOT ".repeat(MAX_NESTING + 1))),
            4 * MAX_NESTING,
        );
    }

    #[test]
    fn test_mixed_nesting_shares_limit() {
        let half = MAX_NESTING / 2;
        let at_limit = format!("{}a{}", "(NOT ".repeat(half), ")".repeat(half));
        assert!(parse_where(&at_limit).is_ok());

        let too_deep = format!("{}(a){}", "(NOT ".repeat(half), ")".repeat(half));
        assert_too_deep(parse_where(&too_deep), 5 * half);
    }

    #[test]
    fn test_nested_function_limit() {
        let n = MAX_NESTING + 1;
        let source = format!("{}1{}", "f(".repeat(n), ")".repeat(n));
        assert_too_deep(parse_rank_by(&source), 2 * MAX_NESTING);
    }

    #[test]
    fn test_nested_array_limit() {
        let n = MAX_NESTING + 1;
        let source = format!("a = {}{}", "[".repeat(n), "]".repeat(n));
        assert_too_deep(parse_where(&source), 4 + MAX_NESTING);
    }

    #[test]
    fn test_nested_json_limit() {
        let at_limit = format!(
            "a = {}1{}",
            "{\"a\": ".repeat(MAX_NESTING),
            "}".repeat(MAX_NESTING)
        );
        assert!(parse_where(&at_limit).is_ok());

        let n = MAX_NESTING + 1;
        let too_deep = format!("a = {}1{}", "{\"a\": ".repeat(n), "}".repeat(n));
        assert_too_deep(parse_where(&too_deep), 4 + 6 * MAX_NESTING);

        let json_arrays = format!("a = {{\"a\": {}{}}}", "[".repeat(n), "]".repeat(n));
        assert_too_deep(parse_where(&json_arrays), 10 + MAX_NESTING - 1);
    }

    #[test]
    fn test_nested_block_limit() {
        let block = |n: usize| {
            format!(
                "{}DO A 1;{} END",
                "B ".repeat(n),
                " END;".repeat(n - 1)
            )
        };
        assert!(parse_statement(&block(MAX_NESTING)).is_ok());
        assert_too_deep(parse_statement(&block(MAX_NESTING + 1)), 2 * MAX_NESTING);
    }

    #[test]
    fn test_stray_character() {
        let err = parse_where("a = #").unwrap_err();
        assert_eq!(
            err,
            Error::Parse(ParseError::UnrecognizedCharacter {
                found: "#".to_string(),
                span: Span::new(4, 5),
            })
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_where("a = 'open").unwrap_err();
        assert!(matches!(
            err,
            Error::Lex(LexError::UnterminatedString { .. })
        ));
        assert_eq!(err.span().start, 4);
    }

    #[test]
    fn test_fragment_kind_names() {
        for kind in FragmentKind::ALL {
            assert_eq!(kind.as_str().parse::<FragmentKind>().unwrap(), kind);
        }
        assert_eq!("ORDER-BY".parse::<FragmentKind>().unwrap(), FragmentKind::OrderBy);
        assert_eq!(FragmentKind::RankBy.to_string(), "rank_by");
        assert!("having".parse::<FragmentKind>().is_err());
    }

    #[test]
    fn test_parse_fragment_dispatch() {
        let fragment = parse_fragment(FragmentKind::RankBy, "score(@q)").unwrap();
        assert_eq!(fragment.kind(), FragmentKind::RankBy);
        assert!(matches!(fragment, Fragment::RankBy(_)));

        let fragment = parse_fragment(FragmentKind::Collection, "db.users").unwrap();
        assert_eq!(fragment.to_ql(0), "db.users");

        assert!(parse_fragment(FragmentKind::Select, "a = 1").is_err());
    }

    #[test]
    fn test_fragment_serializes_untagged() {
        let fragment = parse_fragment(FragmentKind::Select, "*").unwrap();
        assert_eq!(serde_json::to_value(&fragment).unwrap(), json!("All"));
    }
}
