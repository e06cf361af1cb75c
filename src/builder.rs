use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_DIR: &str = "test-data";
pub const DEFAULT_DEPTH: u32 = 6;

/// Failure while materialising one level of the structure.
#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("creating directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("writing marker file {}", .path.display())]
    WriteMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FilesystemError {
    pub fn path(&self) -> &Path {
        match self {
            FilesystemError::CreateDir { path, .. } | FilesystemError::WriteMarker { path, .. } => {
                path
            }
        }
    }
}

/// One layer of nesting: its number, directory, and marker file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Level {
    pub number: u32,
    pub dir: PathBuf,
    pub marker: PathBuf,
}

pub fn dir_name(level: u32) -> String {
    format!("level_{level}")
}

pub fn marker_name(level: u32) -> String {
    format!("file_level_{level}.txt")
}

pub fn marker_contents(level: u32) -> String {
    format!("This is level {level}\n")
}

/// Lazily yield every level `build` would touch, without touching the
/// filesystem.
///
/// Each level's directory is the previous level's directory plus one segment,
/// starting from `base`. A depth of zero yields nothing.
pub fn plan(base: &Path, depth: u32) -> impl Iterator<Item = Level> + use<> {
    let mut current = base.to_path_buf();
    (1..=depth).map(move |number| {
        current.push(dir_name(number));
        Level {
            number,
            dir: current.clone(),
            marker: current.join(marker_name(number)),
        }
    })
}

/// Outcome of a successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub base: PathBuf,
    pub depth: u32,
    pub deepest: Option<PathBuf>,
}

impl BuildReport {
    pub fn completion_message(&self) -> String {
        format!(
            "Directory structure with depth {} created successfully under {}.",
            self.depth,
            self.base.display()
        )
    }

    pub fn deepest(&self) -> Option<&Path> {
        self.deepest.as_deref()
    }
}

/// Create `depth` nested `level_<k>` directories under `base`, writing
/// `file_level_<k>.txt` into each.
///
/// Levels are materialised one at a time; only the current path is held in
/// memory. Existing directories are reused and existing marker files
/// overwritten, so reruns succeed. The first failure aborts the remaining
/// levels.
pub fn build(base: &Path, depth: u32) -> Result<BuildReport, FilesystemError> {
    let mut current = base.to_path_buf();

    for number in 1..=depth {
        current.push(dir_name(number));
        fs::create_dir_all(&current).map_err(|source| FilesystemError::CreateDir {
            path: current.clone(),
            source,
        })?;

        let marker = current.join(marker_name(number));
        fs::write(&marker, marker_contents(number))
            .map_err(|source| FilesystemError::WriteMarker { path: marker, source })?;
        debug!(level = number, dir = %current.display(), "level created");
    }

    info!(depth, base = %base.display(), "nested structure ready");

    Ok(BuildReport {
        base: base.to_path_buf(),
        depth,
        deepest: (depth > 0).then_some(current),
    })
}
