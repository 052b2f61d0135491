// Output documents: every run overwrites the full set, and no document becomes
// visible until all of them serialized and were staged next to their targets.
// A failed replacement rolls back the targets replaced before it.

use crate::error::{Result, SheetGenError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Raw schema written by extraction.
pub const RAW_DOCUMENT: &str = "raw.json";
/// Compiled schema.
pub const SCHEMA_DOCUMENT: &str = "schema.json";
/// Route schema.
pub const ROUTES_DOCUMENT: &str = "routes.json";
/// Emission manifest.
pub const MANIFEST_DOCUMENT: &str = "manifest.json";

/// Render a value as the human-readable JSON used for every document.
pub fn to_document<T: Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Write `(file name, contents)` pairs into `dir`. All contents are staged in
/// temporary files first; targets are replaced only once every stage succeeded.
/// If replacing a target fails, targets already replaced in this call get their
/// previous contents back.
pub fn write_documents(dir: &Path, documents: &[(&str, String)]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut staged = Vec::with_capacity(documents.len());
    for (name, contents) in documents {
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        let path = dir.join(name);
        let previous = if path.is_file() {
            Some(std::fs::read(&path)?)
        } else {
            None
        };
        staged.push((path, file, previous));
    }

    let mut written: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for (path, file, previous) in staged {
        if let Err(e) = file.persist(&path) {
            restore(&written);
            return Err(SheetGenError::Persist {
                path: path.display().to_string(),
                source: e.error,
            });
        }
        log::debug!("Wrote {}", path.display());
        written.push((path, previous));
    }
    Ok(written.into_iter().map(|(path, _)| path).collect())
}

fn restore(written: &[(PathBuf, Option<Vec<u8>>)]) {
    for (path, previous) in written.iter().rev() {
        let outcome = match previous {
            Some(contents) => std::fs::write(path, contents),
            None => std::fs::remove_file(path),
        };
        match outcome {
            Ok(()) => log::debug!("Restored {}", path.display()),
            Err(e) => log::warn!("Could not restore {}: {e}", path.display()),
        }
    }
}

/// Read a document that must exist; a missing file is reported by name.
pub fn read_document(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(SheetGenError::Schema(format!(
            "{name} not found in {}",
            dir.display()
        )));
    }
    Ok(std::fs::read_to_string(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_documents_overwrites() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");

        write_documents(&out, &[("a.json", "{\"v\": 1}\n".to_string())]).unwrap();
        write_documents(&out, &[("a.json", "{}\n".to_string())]).unwrap();

        assert_eq!(std::fs::read_to_string(out.join("a.json")).unwrap(), "{}\n");
        let leftovers = std::fs::read_dir(&out).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files must not remain");
    }

    #[test]
    fn test_failed_write_restores_earlier_documents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("a.json"), "old\n").unwrap();
        // a non-empty directory cannot be replaced by a file
        std::fs::create_dir(dir.join("c.json")).unwrap();
        std::fs::write(dir.join("c.json").join("keep"), "").unwrap();

        let err = write_documents(
            dir,
            &[
                ("a.json", "new\n".to_string()),
                ("b.json", "{}\n".to_string()),
                ("c.json", "{}\n".to_string()),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, SheetGenError::Persist { .. }));
        assert_eq!(std::fs::read_to_string(dir.join("a.json")).unwrap(), "old\n");
        assert!(!dir.join("b.json").exists());
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.json", "c.json"]);
    }

    #[test]
    fn test_read_missing_document() {
        let tmp = TempDir::new().unwrap();
        let err = read_document(tmp.path(), SCHEMA_DOCUMENT).unwrap_err();
        assert!(err.to_string().contains("schema.json not found"));
    }

    #[test]
    fn test_to_document_is_pretty() {
        let text = to_document(&serde_json::json!({ "a": [1, 2] })).unwrap();
        assert!(text.contains("\n  \"a\""));
        assert!(text.ends_with('\n'));
    }
}
