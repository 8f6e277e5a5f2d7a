//! Canonical text printer for X8QL AST
//!
//! Serializes AST nodes back to X8QL source. Keywords are upper-case,
//! identifiers keep their original casing, strings are single-quoted and
//! block statements indent their bodies two spaces per level.
//! Printing a parsed tree and parsing the output again yields the same
//! printed text.

use crate::{
    Clause, ClauseKind, Collection, CollectionPath, CompareOp, Expr, ExprKind, Field, Function,
    FunctionArgs, Ident, NamedArg, Operand, OperandKind, OrderBy, OrderByTerm, OrderDirection,
    Parameter, PathSegment, Ref, Select, SelectTerm, Statement, StatementKind, Update,
    UpdateOperation, Value,
};

/// Trait for converting AST nodes to canonical X8QL text.
pub trait ToQl {
    /// Convert to canonical X8QL with the given indentation level.
    fn to_ql(&self, indent: usize) -> String;
}

/// Helper to generate indentation string (two spaces per level).
fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}

/// Quote a string value, doubling embedded single quotes.
fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote a JSON string: JSON backslash escapes, with `"` doubled since
/// that is how the lexer terminates double-quoted strings.
fn quote_json_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for c in s.chars() {
        match c {
            '"' => result.push_str("\"\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            c if (c as u32) < 0x20 => result.push_str(&format!("\\u{:04x}", c as u32)),
            _ => result.push(c),
        }
    }
    result.push('"');
    result
}

fn join<T: ToQl>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_ql(0))
        .collect::<Vec<_>>()
        .join(sep)
}

// ===== Statements =====

impl ToQl for Statement {
    fn to_ql(&self, indent: usize) -> String {
        let ind = indent_str(indent);
        match &self.kind {
            StatementKind::Single { op, clauses } => {
                let mut parts = vec![op.to_ql(0)];
                parts.extend(clauses.iter().map(|c| c.to_ql(0)));
                format!("{}{}", ind, parts.join(" "))
            }
            StatementKind::Multi { op, body } => {
                let mut lines = vec![format!("{}{}", ind, op.to_ql(0))];
                for stmt in body {
                    lines.push(format!("{};", stmt.to_ql(indent + 1)));
                }
                lines.push(format!("{}END", ind));
                lines.join("\n")
            }
        }
    }
}

impl ToQl for Clause {
    fn to_ql(&self, indent: usize) -> String {
        let body = match &self.kind {
            ClauseKind::Select(select) => format!("SELECT {}", select.to_ql(0)),
            ClauseKind::Collection(collection) => format!("FROM {}", collection.to_ql(0)),
            ClauseKind::Set(update) => format!("SET {}", update.to_ql(0)),
            ClauseKind::Search(expr) => format!("SEARCH {}", expr.to_ql(0)),
            ClauseKind::Where(expr) => format!("WHERE {}", expr.to_ql(0)),
            ClauseKind::OrderBy(order_by) => format!("ORDER BY {}", order_by.to_ql(0)),
            ClauseKind::RankBy(expr) => format!("RANK BY {}", expr.to_ql(0)),
            ClauseKind::Generic { name, value } => {
                format!("{} {}", name.to_ql(0), value.to_ql(0))
            }
        };
        format!("{}{}", indent_str(indent), body)
    }
}

// ===== Clause payloads =====

impl ToQl for Select {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            Select::All => "*".to_string(),
            Select::Terms(terms) => join(terms, ", "),
            Select::Parameter(param) => param.to_ql(0),
        }
    }
}

impl ToQl for SelectTerm {
    fn to_ql(&self, _indent: usize) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.field.to_ql(0), alias.to_ql(0)),
            None => self.field.to_ql(0),
        }
    }
}

impl ToQl for Collection {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            Collection::Path(path) => path.to_ql(0),
            Collection::Parameter(param) => param.to_ql(0),
        }
    }
}

impl ToQl for CollectionPath {
    fn to_ql(&self, _indent: usize) -> String {
        self.name()
    }
}

impl ToQl for OrderBy {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            OrderBy::Terms(terms) => join(terms, ", "),
            OrderBy::Parameter(param) => param.to_ql(0),
        }
    }
}

impl ToQl for OrderByTerm {
    fn to_ql(&self, _indent: usize) -> String {
        match self.direction {
            Some(direction) => format!("{} {}", self.field.to_ql(0), direction.to_ql(0)),
            None => self.field.to_ql(0),
        }
    }
}

impl ToQl for OrderDirection {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            OrderDirection::Asc => "ASC".to_string(),
            OrderDirection::Desc => "DESC".to_string(),
        }
    }
}

impl ToQl for Update {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            Update::Operations(ops) => join(ops, ", "),
            Update::Parameter(param) => param.to_ql(0),
        }
    }
}

impl ToQl for UpdateOperation {
    fn to_ql(&self, _indent: usize) -> String {
        format!("{} = {}", self.field.to_ql(0), self.value.to_ql(0))
    }
}

// ===== Expressions =====

/// Binding strength used to decide where parentheses are required.
fn precedence(expr: &Expr) -> u8 {
    match expr.kind {
        ExprKind::Or { .. } => 1,
        ExprKind::And { .. } => 2,
        ExprKind::Not(_) => 3,
        _ => 4,
    }
}

fn wrap(expr: &Expr, needs_parens: bool) -> String {
    if needs_parens {
        format!("({})", expr.to_ql(0))
    } else {
        expr.to_ql(0)
    }
}

impl ToQl for Expr {
    fn to_ql(&self, _indent: usize) -> String {
        let own = precedence(self);
        match &self.kind {
            ExprKind::Operand(operand) => operand.to_ql(0),
            ExprKind::Paren(inner) => format!("({})", inner.to_ql(0)),
            ExprKind::Comparison { op, lhs, rhs } => {
                format!("{} {} {}", lhs.to_ql(0), op.to_ql(0), rhs.to_ql(0))
            }
            ExprKind::Between { lhs, low, high } => format!(
                "{} BETWEEN {} AND {}",
                lhs.to_ql(0),
                low.to_ql(0),
                high.to_ql(0)
            ),
            ExprKind::In { lhs, negated, set } => format!(
                "{} {}IN ({})",
                lhs.to_ql(0),
                if *negated { "NOT " } else { "" },
                join(set, ", ")
            ),
            ExprKind::Not(inner) => format!("NOT {}", wrap(inner, precedence(inner) < own)),
            ExprKind::And { lhs, rhs } => format!(
                "{} AND {}",
                wrap(lhs, precedence(lhs) < own),
                wrap(rhs, precedence(rhs) <= own)
            ),
            ExprKind::Or { lhs, rhs } => format!(
                "{} OR {}",
                wrap(lhs, precedence(lhs) < own),
                wrap(rhs, precedence(rhs) <= own)
            ),
        }
    }
}

impl ToQl for CompareOp {
    fn to_ql(&self, _indent: usize) -> String {
        self.as_str().to_string()
    }
}

impl ToQl for Operand {
    fn to_ql(&self, _indent: usize) -> String {
        match &self.kind {
            OperandKind::Value(value) => value.to_ql(0),
            OperandKind::Field(field) => field.to_ql(0),
            OperandKind::Parameter(param) => param.to_ql(0),
            OperandKind::Ref(r) => r.to_ql(0),
            OperandKind::Function(function) => function.to_ql(0),
        }
    }
}

impl ToQl for Value {
    fn to_ql(&self, _indent: usize) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::True => "TRUE".to_string(),
            Value::False => "FALSE".to_string(),
            Value::String(s) => quote_string(s),
            Value::Integer(i) => i.to_string(),
            // Debug keeps a point or exponent, so the text lexes as a decimal again
            Value::Decimal(d) => format!("{:?}", d),
            Value::Json(json) => json_to_ql(json),
            Value::Array(items) => format!("[{}]", join(items, ", ")),
        }
    }
}

fn json_to_ql(json: &serde_json::Value) -> String {
    match json {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => format!("{:?}", f),
            _ => n.to_string(),
        },
        serde_json::Value::String(s) => quote_json_string(s),
        serde_json::Value::Array(items) => format!(
            "[{}]",
            items.iter().map(json_to_ql).collect::<Vec<_>>().join(", ")
        ),
        serde_json::Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote_json_string(k), json_to_ql(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

impl ToQl for Field {
    fn to_ql(&self, _indent: usize) -> String {
        let mut result = self.name.to_ql(0);
        for segment in &self.path {
            match segment {
                PathSegment::Index(value) => {
                    result.push('[');
                    result.push_str(&value.to_ql(0));
                    result.push(']');
                }
                PathSegment::Append => result.push_str("[-]"),
                PathSegment::Dot(ident) => {
                    result.push('.');
                    result.push_str(&ident.name);
                }
            }
        }
        result
    }
}

impl ToQl for Function {
    fn to_ql(&self, _indent: usize) -> String {
        let args = match &self.args {
            FunctionArgs::None => String::new(),
            FunctionArgs::Positional(args) => join(args, ", "),
            FunctionArgs::Named(args) => join(args, ", "),
        };
        match &self.namespace {
            Some(ns) => format!("{}.{}({})", ns.name, self.name.name, args),
            None => format!("{}({})", self.name.name, args),
        }
    }
}

impl ToQl for NamedArg {
    fn to_ql(&self, _indent: usize) -> String {
        format!("{}={}", self.name.name, self.value.to_ql(0))
    }
}

impl ToQl for Ref {
    fn to_ql(&self, _indent: usize) -> String {
        match &self.namespace {
            Some(ns) => format!(
                "{{{{{}://{}.{}}}}}",
                ns.name,
                self.collection.name,
                self.field.to_ql(0)
            ),
            None => format!("{{{{{}.{}}}}}", self.collection.name, self.field.to_ql(0)),
        }
    }
}

impl ToQl for Parameter {
    fn to_ql(&self, _indent: usize) -> String {
        format!("@{}", self.name.name)
    }
}

impl ToQl for Ident {
    fn to_ql(&self, _indent: usize) -> String {
        self.name.clone()
    }
}
