//! Static mapping tables: label aliases and format names.
//!
//! Both tables are plain JSON objects. Defaults are compiled into the binary;
//! either can be replaced by a file on the command line. Loading happens once
//! at startup and the resulting [`MappingTables`] is never mutated.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::{LookupError, Result};

/// Canonical label name -> known aliases. Lookup order is file order.
pub type LabelAliasTable = IndexMap<String, Vec<String>>;

/// Raw medium format name -> short display name.
pub type FormatMappingTable = FxHashMap<String, String>;

const BUNDLED_LABEL_ALIAS: &str = include_str!("../data/label_alias.json");
const BUNDLED_FORMAT_MAPPING: &str = include_str!("../data/format_mapping.json");

/// Characters of the offending file echoed back in parse errors
const SNIPPET_CHARS: usize = 120;

#[derive(Clone, Debug, Default)]
pub struct MappingTables {
    pub label_alias: LabelAliasTable,
    pub format_map: FormatMappingTable,
}

impl MappingTables {
    /// Tables shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::load(None, None)
    }

    /// Bundled tables, with each one replaced by a file when a path is given.
    pub fn load(label_alias: Option<&Path>, format_map: Option<&Path>) -> Result<Self> {
        let label_alias = match label_alias {
            Some(path) => read_json_file(path)?,
            None => parse_json_text(BUNDLED_LABEL_ALIAS, Path::new("<bundled>/label_alias.json"))?,
        };
        let format_map = match format_map {
            Some(path) => read_json_file(path)?,
            None => parse_json_text(BUNDLED_FORMAT_MAPPING, Path::new("<bundled>/format_mapping.json"))?,
        };
        Ok(Self {
            label_alias,
            format_map,
        })
    }
}

/// Read and parse a JSON file, tolerating a UTF-8 BOM.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| LookupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json_text(&text, path)
}

/// Parse JSON text, reporting failures with the file path and position.
pub fn parse_json_text<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| LookupError::Config {
        path: PathBuf::from(path),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
        snippet: text.chars().take(SNIPPET_CHARS).collect::<String>().replace('\n', "\\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_tables_parse() {
        let tables = MappingTables::bundled().unwrap();
        assert_eq!(tables.format_map.get("Blu-ray").map(String::as_str), Some("BD"));
        assert!(!tables.label_alias.is_empty());
    }

    #[test]
    fn test_label_alias_keeps_file_order() {
        let table: LabelAliasTable = parse_json_text(
            r#"{"Zeta": ["z"], "Alpha": ["a"], "Mid": []}"#,
            Path::new("aliases.json"),
        )
        .unwrap();
        let keys: Vec<&str> = table.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let table: FormatMappingTable =
            parse_json_text("\u{FEFF}{\"CD\": \"CD\"}", Path::new("fmt.json")).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_malformed_file_reports_position() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\n  \"Lantis\": [\"ランティス\",]\n}}").unwrap();

        let err = read_json_file::<LabelAliasTable>(file.path()).unwrap_err();
        match &err {
            LookupError::Config { line, snippet, .. } => {
                assert_eq!(*line, 2);
                assert!(snippet.starts_with("{\\n"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = MappingTables::load(Some(Path::new("/nonexistent/label_alias.json")), None);
        assert!(matches!(result, Err(LookupError::Read { .. })));
    }
}
