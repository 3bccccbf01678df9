use std::path::PathBuf;

use tempfile::TempDir;

/// Temporary directory holding script and config files for a test.
pub struct ScriptFixture {
    pub temp_dir: TempDir,
}

impl Default for ScriptFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptFixture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Write `content` to `relative_path`, creating parent directories.
    #[must_use]
    pub fn write(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    #[must_use]
    pub fn script(&self, name: &str, content: &str) -> PathBuf {
        self.write(&format!("scripts/{name}.yaml"), content)
    }
}
