//! Script file persistence

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use script_bench_core::RunnerConfig;

use crate::RunError;

/// Location the script is written to before each run
#[derive(Debug, Clone)]
pub struct ScriptStore {
    path: PathBuf,
}

impl ScriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.script_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the script file with `script`.
    ///
    /// The text goes to a sibling temp file first and is renamed into place,
    /// so the interpreter never sees a half-written script.
    pub async fn write(&self, script: &str) -> Result<PathBuf, RunError> {
        let persist_err = |source| RunError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, script).await.map_err(persist_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persist_err(e));
        }

        debug!("Script saved to {:?} ({} bytes)", self.path, script.len());
        Ok(self.path.clone())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("script"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path().join("script.sh"));

        store.write("echo first\necho more\n").await.unwrap();
        let path = store.write("echo second\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "echo second\n");
        assert!(!dir.path().join("script.sh.tmp").exists());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path().join("a").join("b").join("script.swift"));
        store.write("print(1)").await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = ScriptStore::new(blocker.join("script.sh"));
        let err = store.write("echo hi").await.unwrap_err();
        assert!(matches!(err, RunError::Persist { .. }));
    }
}
