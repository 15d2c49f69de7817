//! Environment record — the per-project provisioning configuration.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Record filename, written to the project directory.
pub const RECORD_FILENAME: &str = ".agentvm.json";

/// Stock image used when `init` is run without `--image`.
pub const DEFAULT_IMAGE: &str = "linode/ubuntu22.04";
/// Instance type used when `init` is run without `--type`.
pub const DEFAULT_TYPE: &str = "g6-nanode-1";
/// Region used when `init` is run without `--region`.
pub const DEFAULT_REGION: &str = "us-east";

/// Per-project provisioning configuration. Exactly one record exists per
/// project; its absence means the project is not initialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Logical project name, derived from the project directory name.
    pub project_name: String,
    /// Image new instances boot from: a stock slug (`linode/ubuntu22.04`)
    /// or a private snapshot id (`private/123`).
    pub base_image_id: String,
    /// Linode type id, e.g. `g6-nanode-1`.
    pub instance_type: String,
    /// Linode region id. Records written before the field existed load with
    /// the default region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Seconds since epoch, set once at init.
    pub created_at: i64,
    /// Seconds since epoch, set whenever `base_image_id` is rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Long-lived credential written by earlier versions. Accepted on load so
    /// old records still parse; never written back and never used — passwords
    /// are generated per instance now.
    #[serde(default, skip_serializing)]
    root_password: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl EnvironmentRecord {
    /// Create a fresh record with `created_at` set to now.
    #[must_use]
    pub fn new(
        project_name: String,
        base_image_id: String,
        instance_type: String,
        region: String,
    ) -> Self {
        Self {
            project_name,
            base_image_id,
            instance_type,
            region,
            created_at: Utc::now().timestamp(),
            last_updated: None,
            root_password: None,
        }
    }

    /// Point the record at a new base image and stamp `last_updated`.
    pub fn set_base_image(&mut self, image_id: String) {
        self.base_image_id = image_id;
        self.last_updated = Some(Utc::now().timestamp());
    }

    /// Whether the record still carries a legacy shared `root_password`.
    #[must_use]
    pub fn has_legacy_password(&self) -> bool {
        self.root_password.is_some()
    }

    /// Check that every field required to create an instance is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRecord`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("project_name", &self.project_name),
            ("base_image_id", &self.base_image_id),
            ("instance_type", &self.instance_type),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidRecord { field });
            }
        }
        Ok(())
    }

    /// Label for a new instance: `agentvm-{project}-{epoch}`.
    #[must_use]
    pub fn instance_label(&self) -> String {
        format!("agentvm-{}-{}", self.project_name, Utc::now().timestamp())
    }

    /// Label for a disk snapshot: `agentvm-{project}-base` for the first
    /// capture (the record still points at a stock image), epoch-stamped for
    /// every capture after that.
    #[must_use]
    pub fn snapshot_label(&self) -> String {
        if self.base_image_id.starts_with("private/") {
            format!("agentvm-{}-{}", self.project_name, Utc::now().timestamp())
        } else {
            format!("agentvm-{}-base", self.project_name)
        }
    }
}
