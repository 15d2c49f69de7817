//! Instance and image state as reported by the provider.

use std::fmt;

/// Lifecycle state of a provisioned instance.
///
/// `Requested` and `SshReady` are derived locally (before the first status
/// fetch and after a successful TCP probe); the rest map from provider
/// status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// Create accepted, no status fetched yet.
    Requested,
    /// Provider is building the instance (provisioning, migrating, ...).
    Provisioning,
    /// Instance is powering on.
    Booting,
    /// Instance exists but is powered off.
    Offline,
    /// Provider reports the instance running.
    Running,
    /// Running and accepting TCP connections on the SSH port.
    SshReady,
    /// Any status string this version does not know.
    Other,
}

impl InstanceStatus {
    /// Map a provider status string onto a lifecycle state.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "running" => Self::Running,
            "booting" | "rebooting" => Self::Booting,
            "provisioning" | "migrating" | "rebuilding" | "cloning" | "restoring" => {
                Self::Provisioning
            }
            "offline" | "stopped" => Self::Offline,
            _ => Self::Other,
        }
    }

    /// Whether the instance is up (running or already probed ready).
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::SshReady)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Provisioning => "provisioning",
            Self::Booting => "booting",
            Self::Offline => "offline",
            Self::Running => "running",
            Self::SshReady => "ssh-ready",
            Self::Other => "unknown",
        };
        f.write_str(s)
    }
}

/// State of a disk image being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Creating,
    PendingUpload,
    Available,
    Other,
}

impl ImageStatus {
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "available" => Self::Available,
            "creating" => Self::Creating,
            "pending_upload" => Self::PendingUpload,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// A live instance the process is responsible for.
///
/// The handle is transient: it exists only for the duration of one session
/// and is never persisted. `root_password` is the per-instance credential
/// generated at create time (empty when re-attaching to an instance whose
/// password this process never knew).
#[derive(Debug, Clone)]
pub struct VmHandle {
    pub id: u64,
    pub status: InstanceStatus,
    pub ip: Option<String>,
    pub root_password: String,
}
