//! Clause payload nodes: projections, collections, ordering and updates

use serde::{Deserialize, Serialize};
use crate::{Field, Function, Ident, Parameter, Span};

/// Field projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Select {
    /// `*`
    All,
    /// `field AS alias, ...`
    Terms(Vec<SelectTerm>),
    /// `@fields`
    Parameter(Parameter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectTerm {
    pub field: Field,
    pub alias: Option<Field>,
    pub span: Span,
}

/// Target collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Collection {
    Path(CollectionPath),
    Parameter(Parameter),
}

/// Dotted collection name: `db.users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPath {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl CollectionPath {
    /// The path joined with `.`, as written.
    pub fn name(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// ORDER BY list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderBy {
    Terms(Vec<OrderByTerm>),
    Parameter(Parameter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByTerm {
    pub field: Field,
    /// `None` leaves the default to the consumer
    pub direction: Option<OrderDirection>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// SET list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Update {
    Operations(Vec<UpdateOperation>),
    Parameter(Parameter),
}

/// `field = function(...)`
///
/// The right-hand side is always a function call naming the update
/// operation (`put`, `insert`, `increment`, ...), never a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    pub field: Field,
    pub value: Function,
    pub span: Span,
}
