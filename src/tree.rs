use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

const SIZE_UNITS: [&str; 6] = ["b", "kb", "mb", "gb", "tb", "pb"];

pub const DEFAULT_ROUND: i32 = 1;
/// Beyond this many places an `f64` label gains nothing.
pub const MAX_ROUND: i32 = 15;

pub type Tree = BTreeMap<String, Vec<TreeType>>;

#[derive(Debug, PartialEq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub extension: String,
    pub file_size_raw: u64,
    pub file_size_label: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum TreeType {
    File(FileInfo),
    Dir(Tree),
}

/// Render a byte count with the largest unit that keeps it under 1024,
/// e.g. `1024 -> "1kb"`.
pub fn file_size_label(size: f64, places: i32) -> String {
    let mut size = size;
    let mut unit = SIZE_UNITS[0];
    for (idx, candidate) in SIZE_UNITS.iter().enumerate() {
        unit = candidate;
        if size < 1024.0 || idx == SIZE_UNITS.len() - 1 {
            break;
        }
        size /= 1024.0;
    }
    format!("{}{}", round_to(size, places), unit)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places.clamp(0, MAX_ROUND));
    (value * factor).round() / factor
}

/// Map `path` to its name and its entries, recursing into subdirectories.
///
/// Entries are sorted by name. A directory with no entries maps to an empty
/// tree.
pub fn explore(path: &Path, places: i32) -> Result<Tree> {
    let mut entries: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("reading directory {}", path.display()))?
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("listing directory {}", path.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut inner = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            inner.push(TreeType::Dir(explore(&entry_path, places)?));
        } else if entry_path.is_file() {
            let metadata = entry_path
                .metadata()
                .with_context(|| format!("reading metadata for {}", entry_path.display()))?;
            let size = metadata.len();
            inner.push(TreeType::File(FileInfo {
                path: entry.file_name().to_string_lossy().into_owned(),
                extension: entry_path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                file_size_raw: size,
                file_size_label: file_size_label(size as f64, places),
            }));
        }
    }

    let mut tree = Tree::new();
    if !inner.is_empty() {
        tree.insert(dir_label(path), inner);
    }
    Ok(tree)
}

fn dir_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn to_json(tree: &Tree) -> Result<String> {
    serde_json::to_string_pretty(tree).context("serializing tree mapping")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use tempfile::TempDir;

    #[test]
    fn size_labels() {
        for (size, expected) in [
            (1.0, "1b"),
            (1023.0, "1023b"),
            (1024.0, "1kb"),
            (1536.0, "1.5kb"),
            (1_048_576.0, "1mb"),
            (1_073_741_824.0, "1gb"),
        ] {
            assert_eq!(file_size_label(size, 1), expected);
        }
    }

    #[test]
    fn size_label_clamps_at_largest_unit() {
        let huge = 1024f64.powi(6) * 2.0;
        assert_eq!(file_size_label(huge, 1), "2048pb");
    }

    #[test]
    fn size_label_respects_places() {
        assert_eq!(file_size_label(1300.0, 0), "1kb");
        assert_eq!(file_size_label(1300.0, 2), "1.27kb");
    }

    #[test]
    fn size_label_clamps_places() {
        assert_eq!(file_size_label(1024.0, 400), "1kb");
        assert_eq!(file_size_label(1536.0, i32::MAX), "1.5kb");
        assert_eq!(file_size_label(1536.0, -3), "2kb");
    }

    #[test]
    fn maps_generated_structure() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("test-data");
        builder::build(&base, 2).unwrap();

        let tree = explore(&base, 1).unwrap();

        let level_1 = &tree["test-data"];
        assert_eq!(level_1.len(), 1);
        let TreeType::Dir(inner) = &level_1[0] else {
            panic!("expected directory, got {:?}", level_1[0]);
        };
        let entries = &inner["level_1"];
        assert_eq!(
            entries[0],
            TreeType::File(FileInfo {
                path: "file_level_1.txt".to_owned(),
                extension: "txt".to_owned(),
                file_size_raw: 16,
                file_size_label: "16b".to_owned(),
            })
        );
        assert!(matches!(entries[1], TreeType::Dir(_)));
    }

    #[test]
    fn empty_directory_maps_to_empty_tree() {
        let tmp = TempDir::new().unwrap();
        assert!(explore(tmp.path(), 1).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = explore(&tmp.path().join("nope"), 1).unwrap_err();
        assert!(err.to_string().contains("reading directory"));
    }

    #[test]
    fn json_uses_tagged_variants() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("README"), "hi").unwrap();
        let tree = explore(tmp.path(), 1).unwrap();

        let json = to_json(&tree).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let name = dir_label(tmp.path());
        let file = &value[name.as_str()][0]["File"];
        assert_eq!(file["path"], "README");
        assert_eq!(file["extension"], "");
        assert_eq!(file["file_size_raw"], 2);
    }
}
