use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based store for season archives. One pretty-printed JSON file per key.
pub struct ArchiveStore {
    archive_dir: PathBuf,
}

impl ArchiveStore {
    /// Create a new archive store, creating the directory if needed
    pub fn new<P: AsRef<Path>>(archive_dir: P) -> Result<Self> {
        let archive_dir = archive_dir.as_ref().to_path_buf();

        fs::create_dir_all(&archive_dir).context("Failed to create archive directory")?;

        Ok(Self { archive_dir })
    }

    /// Write an archive and return the file it was written to.
    /// Existing archives are never overwritten.
    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<PathBuf> {
        let file_path = self.build_path(key);
        if file_path.exists() {
            anyhow::bail!("Archive {} already exists", file_path.display());
        }

        self.write_json(&file_path, data)?;
        info!("Saved archive: {}", file_path.display());
        Ok(file_path)
    }

    /// Load an archive
    pub fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        let file_path = self.build_path(key);
        self.read_json_opt(&file_path)
    }

    /// Keys of all stored archives, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.archive_dir).context("Failed to read archive directory")? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn build_path(&self, key: &str) -> PathBuf {
        self.archive_dir.join(format!("{}.json", key))
    }

    fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        fs::write(path, json).context("Failed to write archive file")?;
        Ok(())
    }

    fn read_json_opt<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path)?;
        let data = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse archive {:?}", path))?;
        Ok(Some(data))
    }
}
