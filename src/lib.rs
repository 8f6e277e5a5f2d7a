//! X8QL - A query language for document stores
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use x8ql_ast as ast;
pub use x8ql_lexer as lexer;
pub use x8ql_parser as parser;

pub use x8ql_parser::{
    parse_collection, parse_fragment, parse_order_by, parse_rank_by, parse_search, parse_select,
    parse_statement, parse_update, parse_where, Error, Fragment, FragmentKind,
};
