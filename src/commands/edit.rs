//! `agentvm edit` — boot the base image, work on it over SSH, optionally
//! save the result back as the new base image.

use anyhow::Result;

use crate::application::services::session::{Decision, SessionDriver, SessionOutcome};
use crate::application::services::wait::WaitPolicy;
use crate::commands::session_ui;
use crate::domain::{ConfigError, VmHandle};
use crate::infra::clock::TokioSleeper;
use crate::infra::linode::LinodeClient;
use crate::infra::probe::TcpProbe;
use crate::infra::shell::SshAccess;
use crate::infra::store::JsonRecordStore;
use crate::infra::token;
use crate::output::OutputContext;
use crate::output::reporter::TerminalReporter;

/// Run `agentvm edit`.
///
/// # Errors
///
/// Returns an error when no record exists, the provider rejects a request,
/// or the instance never becomes reachable.
pub async fn run(ctx: &OutputContext, store: &JsonRecordStore, assume_yes: bool) -> Result<()> {
    let mut record = store.load()?.ok_or(ConfigError::NotInitialized)?;
    session_ui::warn_legacy_password(ctx, &record);

    let token = token::resolve_token(ctx)?;
    let provider = LinodeClient::new(token);
    let probe = TcpProbe::default();
    let sleeper = TokioSleeper;
    let access = SshAccess::detect();
    if !access.has_sshpass() {
        ctx.info("sshpass not found; ssh will prompt for the instance password");
    }
    let reporter = TerminalReporter::new(ctx);
    let driver = SessionDriver::new(
        &provider,
        &probe,
        &sleeper,
        store,
        &reporter,
        WaitPolicy::default(),
    );

    ctx.header(&format!("Editing {}", record.project_name));
    ctx.kv("base image", &record.base_image_id);

    let project = record.project_name.clone();
    let outcome = driver
        .provision_and_run(
            &mut record,
            |handle| session_body(ctx, &access, &project, assume_yes, handle),
            || session_ui::confirm_timed_out_image(ctx, assume_yes),
        )
        .await?;

    match outcome {
        SessionOutcome::Saved { image_id } => {
            ctx.success(&format!("base image updated to {image_id}"));
        }
        SessionOutcome::Destroyed => {
            ctx.info("base image unchanged");
        }
        SessionOutcome::Kept { instance_id } => {
            ctx.info(&format!(
                "instance {instance_id} left running; re-attach with 'agentvm build --continue {instance_id}'"
            ));
        }
    }
    Ok(())
}

async fn session_body(
    ctx: &OutputContext,
    access: &SshAccess,
    project: &str,
    assume_yes: bool,
    handle: VmHandle,
) -> Result<Decision> {
    let status = session_ui::sync_and_shell(ctx, access, project, &handle, true).await?;
    if !status.success() {
        ctx.warn(&format!("shell exited with {status}"));
    }

    if assume_yes {
        return Ok(Decision::Save);
    }
    if !ctx.is_tty {
        // Without a terminal there is nobody to ask; the safe answer is no.
        return Ok(Decision::Discard);
    }
    let save = dialoguer::Confirm::new()
        .with_prompt("Save this environment as the new base image?")
        .default(true)
        .interact()?;
    Ok(if save { Decision::Save } else { Decision::Discard })
}
