//! Reading catalog lists and writing records.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{LookupError, Result};

/// Non-empty, non-comment lines of a catalog list, trimmed.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| LookupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// `*.txt` files of a batch directory, sorted by name.
pub fn list_batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| LookupError::Read {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Whether `stem` names a file directly inside a directory: non-empty, not
/// `.`/`..`, no path separators or NUL.
pub fn is_safe_file_stem(stem: &str) -> bool {
    !stem.is_empty()
        && stem != "."
        && stem != ".."
        && !stem.contains(['/', '\\', '\0'])
}

/// Pretty JSON (2-space indent, non-ASCII kept as is) to a file, or stdout when `out` is `None`.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_lines_skips_blank_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "# wishlist\nPCCG-01965\n\n  KICA-0001~3  \n#KICA-9999\n").unwrap();

        assert_eq!(read_lines(&path).unwrap(), vec!["PCCG-01965", "KICA-0001~3"]);
    }

    #[test]
    fn test_list_batch_files_only_txt_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), "X-1\n").unwrap();
        }
        let names: Vec<String> = list_batch_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_is_safe_file_stem() {
        assert!(is_safe_file_stem("PCCG-01965"));
        assert!(is_safe_file_stem("PCCG-01965~7"));
        assert!(is_safe_file_stem("..PCCG"));
        for bad in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", "nul\0"] {
            assert!(!is_safe_file_stem(bad), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_write_json_creates_parent_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("PCCG-01965.json");
        write_json(&json!({"edition_name": "通常盤"}), Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("通常盤"));
        assert!(text.contains("\n  \"edition_name\""));
    }
}
