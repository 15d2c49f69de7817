//! Environment record persistence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::RecordStore;
use crate::domain::EnvironmentRecord;
use crate::domain::environment::RECORD_FILENAME;

/// Record file manager rooted at the project directory.
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    /// Create a store for the record in the current working directory
    /// (`./.agentvm.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        Ok(Self::with_path(cwd.join(RECORD_FILENAME)))
    }

    /// Create a store with an explicit record path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the record file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Project name derived from the directory containing the record file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no usable parent directory name.
    pub fn project_name(&self) -> Result<String> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| anyhow::anyhow!("record path has no parent directory"))?;
        let name = parent.file_name().ok_or_else(|| {
            anyhow::anyhow!("cannot derive a project name from {}", parent.display())
        })?;
        Ok(name.to_string_lossy().into_owned())
    }

    /// Load the record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<EnvironmentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading record file {}", self.path.display()))?;
        let record: EnvironmentRecord = serde_json::from_str(&content)
            .with_context(|| format!("parsing record file {}", self.path.display()))?;
        Ok(Some(record))
    }

    /// Save the record to disk with mode 600.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn save(&self, record: &EnvironmentRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(record).context("serializing record")?;
        std::fs::write(&self.path, &content)
            .with_context(|| format!("writing record file {}", self.path.display()))?;
        // Records written by earlier versions carried credentials; keep the
        // file private either way.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn load(&self) -> Result<Option<EnvironmentRecord>> {
        JsonRecordStore::load(self)
    }

    fn save(&self, record: &EnvironmentRecord) -> Result<()> {
        JsonRecordStore::save(self, record)
    }
}
