//! Error types shared across layers.
//!
//! Provider failures carry enough detail to distinguish them at the top
//! level: the process exits 2 when a [`ProviderError`] is anywhere in the
//! chain, 1 for everything else.

use std::path::PathBuf;

use thiserror::Error;

/// Local configuration problems: missing or malformed record, missing token.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No environment record found. Run 'agentvm init' first.")]
    NotInitialized,

    #[error("Environment already initialized at {path}. Delete the file to start over.")]
    AlreadyInitialized { path: PathBuf },

    #[error(
        "No Linode API token found. Set LINODE_TOKEN or re-run interactively.\n\
         Create a token at: https://cloud.linode.com/profile/tokens"
    )]
    TokenMissing,

    #[error("Environment record has an empty '{field}' field. Re-run 'agentvm init'.")]
    InvalidRecord { field: &'static str },
}

/// Failures talking to the cloud provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Linode API error (HTTP {status}): {reason}")]
    Api { status: u16, reason: String },

    #[error("could not reach the Linode API: {0}")]
    Transport(String),

    #[error("unexpected response from the Linode API: {0}")]
    Malformed(String),

    #[error("timed out waiting for {what} after {elapsed_secs}s")]
    DeadlineExceeded { what: String, elapsed_secs: u64 },
}

/// The user interrupted an in-flight session (Ctrl-C).
#[derive(Debug, Error)]
#[error("cancelled by user")]
pub struct UserCancellation;
