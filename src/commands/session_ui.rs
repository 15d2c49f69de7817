//! Interactive session flow shared by `edit` and `build`: file sync,
//! connection banner, terminal hand-off, prompts.

use std::process::ExitStatus;

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize as _;

use crate::application::ports::RemoteAccess;
use crate::domain::{EnvironmentRecord, VmHandle};
use crate::output::{OutputContext, progress};

/// Sync the project to the instance (when `push` is set), print the
/// connection banner, and hand the terminal to ssh. Returns the shell's
/// exit status.
pub(crate) async fn sync_and_shell(
    ctx: &OutputContext,
    access: &impl RemoteAccess,
    project: &str,
    handle: &VmHandle,
    push: bool,
) -> Result<ExitStatus> {
    let ip = handle
        .ip
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("instance {} has no address", handle.id))?;

    if push {
        if ctx.show_progress() {
            let pb = progress::spinner("Syncing project files...");
            let pushed = access.push_project(ip, &handle.root_password, project).await;
            match &pushed {
                Ok(()) => progress::finish_ok(&pb, "Project synced"),
                Err(_) => progress::finish_clear(&pb),
            }
            pushed?;
        } else {
            access.push_project(ip, &handle.root_password, project).await?;
            ctx.success("project synced");
        }
    }

    banner(ctx, ip, project, handle);
    access.open_shell(ip, &handle.root_password).await
}

/// Connection details, including the one-time root password. The password is
/// shown exactly here; it is not persisted anywhere.
fn banner(ctx: &OutputContext, ip: &str, project: &str, handle: &VmHandle) {
    ctx.header("Connection details");
    ctx.kv("host", ip);
    ctx.kv("user", "root");
    if handle.root_password.is_empty() {
        ctx.kv("password", "(set when the instance was first created)");
    } else {
        ctx.kv(
            "password",
            &format!("{}", handle.root_password.style(ctx.styles.bold)),
        );
    }
    ctx.kv("project", &format!("/root/{project}"));
    ctx.kv("vscode", &format!("ssh://root@{ip}"));
}

/// Whether to point the record at an image whose capture timed out.
/// `--yes` accepts it; non-interactive runs decline it.
pub(crate) fn confirm_timed_out_image(ctx: &OutputContext, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !ctx.is_tty {
        return Ok(false);
    }
    dialoguer::Confirm::new()
        .with_prompt("Point the record at the unverified image anyway?")
        .default(false)
        .interact()
        .context("reading confirmation")
}

pub(crate) fn warn_legacy_password(ctx: &OutputContext, record: &EnvironmentRecord) {
    if record.has_legacy_password() {
        ctx.warn(
            "record carries a legacy root_password; it is ignored and passwords are generated per instance",
        );
    }
}
