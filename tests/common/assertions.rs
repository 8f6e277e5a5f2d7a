use x8ql_ast::*;
use x8ql_parser::{parse_fragment, parse_statement, FragmentKind};

/// Assert that a statement parses, returning it
pub fn assert_parses(source: &str) -> Statement {
    match parse_statement(source) {
        Ok(stmt) => stmt,
        Err(err) => panic!("Expected source to parse successfully: {}\n{}", err, source),
    }
}

/// Assert that parsing a statement fails
pub fn assert_parse_fails(source: &str) {
    assert!(
        parse_statement(source).is_err(),
        "Expected source to fail parsing: {}",
        source
    );
}

/// Assert a statement carries a clause with the given key, returning the first one
pub fn assert_has_clause<'a>(stmt: &'a Statement, key: &str) -> &'a Clause {
    stmt.clauses()
        .iter()
        .find(|c| c.kind.key() == key)
        .unwrap_or_else(|| panic!("Expected clause '{}' in {:?}", key, stmt))
}

/// Assert that printing the parsed fragment and parsing the output again
/// reproduces the same printed text
pub fn assert_print_fixpoint(kind: FragmentKind, source: &str) -> String {
    let first = parse_fragment(kind, source)
        .unwrap_or_else(|err| panic!("Failed to parse {} '{}': {}", kind, source, err));
    let printed = first.to_ql(0);

    let second = parse_fragment(kind, &printed)
        .unwrap_or_else(|err| panic!("Failed to reparse {} '{}': {}", kind, printed, err));
    assert_eq!(
        second.to_ql(0),
        printed,
        "Printing is not stable for {} '{}'",
        kind,
        source
    );
    printed
}
