//! Repository map files.
//!
//! A map is an ordered list of [`RepoMapEntry`] records, stored as JSON, or
//! as YAML when the file ends in `.yml`/`.yaml`.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{MigrationError, Result};
use crate::types::RepoMapEntry;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("yml" | "yaml")
    )
}

/// Read a repository map.
///
/// Entries with missing or unusable fields load with empty strings and are
/// rejected later, one by one, by the orchestrator. Only a file that is not a
/// list at all fails the whole map.
pub fn load_repo_map(path: impl AsRef<Path>) -> Result<Vec<RepoMapEntry>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MigrationError::MapNotFound(path.to_path_buf()));
    }

    let invalid = |message: String| MigrationError::InvalidMap {
        path: path.to_path_buf(),
        message,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let records: Vec<Value> = if is_yaml(path) {
        serde_yaml::from_str(&contents).map_err(|e| invalid(e.to_string()))?
    } else {
        serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?
    };

    let entries = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).unwrap_or_else(|e| {
                warn!(index, error = %e, "Unreadable map record");
                RepoMapEntry::default()
            })
        })
        .collect::<Vec<RepoMapEntry>>();

    info!(path = %path.display(), entries = entries.len(), "Loaded repository map");
    Ok(entries)
}

/// Write a repository map, creating parent directories as needed.
pub fn write_repo_map(path: impl AsRef<Path>, entries: &[RepoMapEntry]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let contents = if is_yaml(path) {
        serde_yaml::to_string(entries)?
    } else {
        serde_json::to_string_pretty(entries)?
    };
    std::fs::write(path, contents)?;

    info!(path = %path.display(), entries = entries.len(), "Repository mapping generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repos_map.json");
        std::fs::write(
            &path,
            r#"[
                {"src_repo": "r1", "src_project": "p1", "dest_repo": "r1", "dest_project": "org1"},
                {"src_repo": "r2", "src_project": "p1"}
            ]"#,
        )
        .unwrap();

        let entries = load_repo_map(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], RepoMapEntry::new("r1", "p1", "r1", "org1"));
        assert!(entries[1].dest_repo.is_empty());
        assert!(!entries[1].is_valid());
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.yaml");
        std::fs::write(
            &path,
            "- src_repo: r1\n  src_project: p1\n  dest_repo: r1\n  dest_project: org1\n",
        )
        .unwrap();

        let entries = load_repo_map(&path).unwrap();
        assert_eq!(entries, vec![RepoMapEntry::new("r1", "p1", "r1", "org1")]);
    }

    #[test]
    fn test_bad_record_does_not_sink_the_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repos_map.json");
        std::fs::write(
            &path,
            r#"[
                {"src_repo": null, "src_project": "p1", "dest_repo": "r0", "dest_project": "org1"},
                "not-a-record",
                {"src_repo": "r2", "src_project": "p1", "dest_repo": "r2", "dest_project": "org1"}
            ]"#,
        )
        .unwrap();

        let entries = load_repo_map(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].missing_fields(), vec!["src_repo"]);
        assert!(!entries[1].is_valid());
        assert_eq!(entries[2], RepoMapEntry::new("r2", "p1", "r2", "org1"));
    }

    #[test]
    fn test_yaml_null_field_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.yml");
        std::fs::write(
            &path,
            "- src_repo: r1\n  src_project: ~\n  dest_repo: r1\n  dest_project: org1\n\
             - src_repo: r2\n  src_project: p1\n  dest_repo: r2\n  dest_project: org1\n",
        )
        .unwrap();

        let entries = load_repo_map(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].missing_fields(), vec!["src_project"]);
        assert!(entries[1].is_valid());
    }

    #[test]
    fn test_missing_map() {
        let dir = TempDir::new().unwrap();
        let err = load_repo_map(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MigrationError::MapNotFound(_)));
        assert!(err.is_batch_fatal());
    }

    #[test]
    fn test_malformed_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_repo_map(&path),
            Err(MigrationError::InvalidMap { .. })
        ));
    }

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/map.json");
        let entries = vec![RepoMapEntry::new("r1", "p1", "r1", "my-dest-project")];

        write_repo_map(&path, &entries).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  {"), "expected pretty JSON: {written}");
        assert_eq!(load_repo_map(&path).unwrap(), entries);
    }

    #[test]
    fn test_write_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.yml");
        write_repo_map(&path, &[RepoMapEntry::new("a", "b", "c", "d")]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("src_repo: a"));
    }
}
