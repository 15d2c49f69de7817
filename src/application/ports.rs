//! Ports — trait boundaries between workflows and infrastructure.
//!
//! Services depend on these traits; `infra` provides the real adapters and
//! tests substitute scripted stubs.

use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{EnvironmentRecord, ImageStatus, InstanceStatus, VmHandle};

/// Parameters for creating a new instance.
#[derive(Debug, Clone, Copy)]
pub struct CreateSpec<'a> {
    pub label: &'a str,
    pub instance_type: &'a str,
    pub region: &'a str,
    pub image: &'a str,
    pub root_password: &'a str,
}

/// Cloud provider operations the workflows need.
#[allow(async_fn_in_trait)]
pub trait CloudProvider {
    /// Create and boot an instance.
    async fn create_instance(&self, spec: &CreateSpec<'_>) -> Result<VmHandle>;

    /// Fetch current status and public IPv4 (if assigned) for an instance.
    async fn instance_status(&self, id: u64) -> Result<(InstanceStatus, Option<String>)>;

    /// Delete an instance. Idempotent from the caller's point of view.
    async fn delete_instance(&self, id: u64) -> Result<()>;

    /// Snapshot the instance's primary disk into a reusable image; returns
    /// the new image id.
    async fn snapshot_disk(&self, id: u64, label: &str) -> Result<String>;

    /// Fetch the capture state of an image.
    async fn image_status(&self, image_id: &str) -> Result<ImageStatus>;
}

/// Clock abstraction so waits can be counted deterministically in tests.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Network reachability checks.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe {
    /// Whether a TCP connection to `host:port` succeeds within the probe's
    /// own timeout.
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool>;
}

/// Progress feedback during long-running operations.
pub trait ProgressReporter {
    fn step(&self, message: &str);
    fn success(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Persistence for the environment record.
pub trait RecordStore {
    /// Load the record, or `None` when the project is not initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<EnvironmentRecord>>;

    /// Write the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, record: &EnvironmentRecord) -> Result<()>;
}

/// Remote access to a running instance (file sync and interactive shell).
#[allow(async_fn_in_trait)]
pub trait RemoteAccess {
    /// Sync the project directory to `/root/{project}/` on the instance.
    async fn push_project(&self, ip: &str, password: &str, project: &str) -> Result<()>;

    /// Open an interactive shell on the instance, returning its exit status.
    async fn open_shell(&self, ip: &str, password: &str) -> Result<ExitStatus>;
}
