//! [`TestWorkspace`] for scenarios that read manifests and data files.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory holding a settings manifest and data files.
///
/// # Example
///
/// ```rust
/// use settings_test_utils::TestWorkspace;
///
/// let workspace = TestWorkspace::new();
/// let manifest = workspace.write_manifest("[settings.TIMEOUT]\ndefault = 30\n");
/// assert!(manifest.ends_with("settings.toml"));
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `settings.toml` and return its path.
    pub fn write_manifest(&self, content: &str) -> PathBuf {
        self.write_file("settings.toml", content)
    }

    /// Write `content` to `name` (relative to the root) and return its path.
    ///
    /// # Panics
    /// Panics if the file cannot be written.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write_file: failed to write {}: {e}", path.display()));
        path
    }
}
