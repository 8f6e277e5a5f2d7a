use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the `.x8ql` query corpus
pub fn queries_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("queries")
}

/// Discover all .x8ql files in tests/queries/, sorted by name
pub fn discover_queries() -> Vec<PathBuf> {
    let mut queries: Vec<_> = fs::read_dir(queries_dir())
        .expect("Failed to read queries directory")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("x8ql"))
        .collect();
    queries.sort();
    queries
}

/// Load a query from tests/queries/
pub fn load_query(name: &str) -> String {
    let path = queries_dir().join(format!("{}.x8ql", name));
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load query {}: {}", name, e))
}
