//! Per-run scratch directory
//!
//! Each montage build owns one temporary directory, so concurrent runs never
//! collide on intermediate files. The directory is removed on drop.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// Isolated working directory for one run
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create under `root`, or the system temp directory when unset
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("montage-");
            b
        };
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Run workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name` and return its path
    pub fn write(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let a = RunWorkspace::create(Some(root.path())).unwrap();
        let b = RunWorkspace::create(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));

        let script = a.write("filter_graph.txt", "[0:v]null[vout]").unwrap();
        assert_eq!(std::fs::read_to_string(&script).unwrap(), "[0:v]null[vout]");
        assert!(!b.file("filter_graph.txt").exists());
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let workspace = RunWorkspace::create(None).unwrap();
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!path.exists());
    }
}
