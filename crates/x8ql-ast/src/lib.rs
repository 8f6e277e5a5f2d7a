//! X8QL AST - Core types for the abstract syntax tree
//!
//! This crate defines all AST node types produced by the X8QL parser,
//! spans for source locations, and the canonical text printer.

mod span;
mod expr;
mod query;
mod stmt;
mod printer;

pub use span::*;
pub use expr::*;
pub use query::*;
pub use stmt::*;
pub use printer::*;
