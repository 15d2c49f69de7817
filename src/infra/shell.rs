//! SSH and rsync access to running instances.

use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};

use crate::application::ports::RemoteAccess;
use crate::domain::environment::RECORD_FILENAME;

/// SSH options for connecting to a disposable instance. Every instance is
/// freshly created, so there is no host key worth pinning.
const SSH_OPTIONS: [&str; 4] = [
    "StrictHostKeyChecking=no",
    "UserKnownHostsFile=/dev/null",
    "LogLevel=ERROR",
    "ConnectTimeout=10",
];

/// Production implementation — shells out to `ssh`, `rsync`, and (when
/// available) `sshpass` for non-interactive authentication.
pub struct SshAccess {
    sshpass: bool,
}

impl SshAccess {
    /// Detect whether `sshpass` is on PATH. Without it, ssh and rsync prompt
    /// for the password interactively.
    #[must_use]
    pub fn detect() -> Self {
        let sshpass = std::process::Command::new("sshpass")
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        Self { sshpass }
    }

    /// Force the sshpass setting (used in tests).
    #[must_use]
    pub fn with_sshpass(sshpass: bool) -> Self {
        Self { sshpass }
    }

    #[must_use]
    pub fn has_sshpass(&self) -> bool {
        self.sshpass
    }

    /// Build the command for `program`, wrapped in `sshpass -e` when it is
    /// available and a password is known. The password travels in the
    /// `SSHPASS` environment variable, never in argv.
    fn command(&self, program: &str, password: &str) -> tokio::process::Command {
        if self.sshpass && !password.is_empty() {
            let mut cmd = tokio::process::Command::new("sshpass");
            cmd.arg("-e").env("SSHPASS", password).arg(program);
            cmd
        } else {
            tokio::process::Command::new(program)
        }
    }
}

impl RemoteAccess for SshAccess {
    async fn push_project(&self, ip: &str, password: &str, project: &str) -> Result<()> {
        let output = self
            .command("rsync", password)
            .args(rsync_args(ip, project))
            .output()
            .await
            .context("failed to run rsync (is it installed?)")?;
        anyhow::ensure!(
            output.status.success(),
            "rsync failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }

    async fn open_shell(&self, ip: &str, password: &str) -> Result<ExitStatus> {
        let mut args = ssh_option_args();
        args.push(format!("root@{ip}"));
        self.command("ssh", password)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .context("failed to run ssh")
    }
}

/// `-o Key=Value` pairs as separate argv entries.
fn ssh_option_args() -> Vec<String> {
    SSH_OPTIONS
        .iter()
        .flat_map(|opt| ["-o".to_string(), (*opt).to_string()])
        .collect()
}

/// Arguments for the project push: archive mode, mirror deletions, skip
/// version control metadata and the record file itself.
fn rsync_args(ip: &str, project: &str) -> Vec<String> {
    vec![
        "-az".to_string(),
        "--delete".to_string(),
        "--exclude".to_string(),
        ".git".to_string(),
        "--exclude".to_string(),
        RECORD_FILENAME.to_string(),
        "-e".to_string(),
        format!("ssh {}", ssh_option_args().join(" ")),
        "./".to_string(),
        format!("root@{ip}:/root/{project}/"),
    ]
}
