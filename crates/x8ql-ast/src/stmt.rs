//! Statement and clause AST nodes

use serde::{Deserialize, Serialize};
use crate::{Collection, Expr, Ident, Operand, OrderBy, Select, Span, Update};

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `QUERY SELECT * WHERE a = 1`
    Single { op: Ident, clauses: Vec<Clause> },

    /// `BATCH stmt; stmt; END`
    Multi { op: Ident, body: Vec<Statement> },
}

impl Statement {
    pub fn op(&self) -> &Ident {
        match &self.kind {
            StatementKind::Single { op, .. } => op,
            StatementKind::Multi { op, .. } => op,
        }
    }

    /// Clauses of a single statement; empty for a block.
    pub fn clauses(&self) -> &[Clause] {
        match &self.kind {
            StatementKind::Single { clauses, .. } => clauses,
            StatementKind::Multi { .. } => &[],
        }
    }
}

/// A clause of a single statement
///
/// The grammar places no restriction on which clauses appear, how often,
/// or in what order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub kind: ClauseKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClauseKind {
    /// `SELECT a, b AS c`
    Select(Select),
    /// `FROM users`, `INTO users`, `COLLECTION users`
    Collection(Collection),
    /// `SET a = put(1)`
    Set(Update),
    /// `SEARCH vector_search(vector=@v)`
    Search(Expr),
    /// `WHERE a = 1`
    Where(Expr),
    /// `ORDER BY a DESC`
    OrderBy(OrderBy),
    /// `RANK BY score(@q)`
    RankBy(Expr),
    /// Any other `NAME operand`: `LIMIT 10`, `KEY 'k1'`
    Generic { name: Ident, value: Operand },
}

impl ClauseKind {
    /// Lower-case clause key, matching the name a consumer would file the
    /// clause under.
    pub fn key(&self) -> String {
        match self {
            ClauseKind::Select(_) => "select".to_string(),
            ClauseKind::Collection(_) => "collection".to_string(),
            ClauseKind::Set(_) => "set".to_string(),
            ClauseKind::Search(_) => "search".to_string(),
            ClauseKind::Where(_) => "where".to_string(),
            ClauseKind::OrderBy(_) => "order_by".to_string(),
            ClauseKind::RankBy(_) => "rank_by".to_string(),
            ClauseKind::Generic { name, .. } => name.normalized(),
        }
    }
}
