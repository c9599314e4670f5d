//! Temporary directories for tests that touch the filesystem.

// Test helpers panic on setup failure.
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory removed on drop.
///
/// # Example
///
/// ```
/// use catalog_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let path = dir.write_file("agent.toml", "node_name = \"node-1\"\n");
/// assert!(path.exists());
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: TempDir::new().expect("failed to create temp directory") }
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Path of `relative` inside the directory. Nothing is created.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.inner.path().join(relative)
    }

    /// Writes `contents` to `name` inside the directory and returns its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        std::fs::write(&path, contents).expect("failed to write test file");
        path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
