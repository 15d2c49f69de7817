//! `agentvm build` — run a disposable session on the base image.
//!
//! Unlike `edit`, the default is to throw the instance away afterwards;
//! `--save` and `--keep` opt into persistence.

use anyhow::Result;
use clap::Args;

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

/// Arguments for the `agentvm build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Re-attach to an instance a previous session left running
    #[arg(long = "continue", value_name = "ID")]
    pub continue_id: Option<u64>,

    /// Leave the instance running when the session ends
    #[arg(long)]
    pub keep: bool,

    /// Capture the instance as the new base image when the session ends
    #[arg(long, conflicts_with = "keep")]
    pub save: bool,
}

/// Run `agentvm build`.
///
/// # Errors
///
/// Returns an error when no record exists, the provider rejects a request,
/// or the instance never becomes reachable.
pub async fn run(
    ctx: &OutputContext,
    store: &JsonRecordStore,
    args: &BuildArgs,
    assume_yes: bool,
) -> Result<()> {
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

    ctx.header(&format!("Building {}", record.project_name));
    ctx.kv("base image", &record.base_image_id);

    let decision = if args.keep {
        Decision::Keep
    } else if args.save {
        Decision::Save
    } else {
        Decision::Discard
    };
    let project = record.project_name.clone();
    let ack = || session_ui::confirm_timed_out_image(ctx, assume_yes);

    let outcome = match args.continue_id {
        // A resumed instance already holds the project tree; pushing over it
        // with an unknown password would fail, so skip the sync.
        Some(id) => {
            driver
                .resume(
                    &mut record,
                    id,
                    |handle| session_body(ctx, &access, &project, decision, false, handle),
                    ack,
                )
                .await?
        }
        None => {
            driver
                .provision_and_run(
                    &mut record,
                    |handle| session_body(ctx, &access, &project, decision, true, handle),
                    ack,
                )
                .await?
        }
    };

    match outcome {
        SessionOutcome::Saved { image_id } => {
            ctx.success(&format!("base image updated to {image_id}"));
        }
        SessionOutcome::Destroyed => {
            ctx.success("instance destroyed");
        }
        SessionOutcome::Kept { instance_id } => {
            ctx.success(&format!("instance {instance_id} left running"));
            ctx.info(&format!(
                "re-attach with: agentvm build --continue {instance_id}"
            ));
            ctx.warn("running instances accrue charges until destroyed");
        }
    }
    Ok(())
}

async fn session_body(
    ctx: &OutputContext,
    access: &SshAccess,
    project: &str,
    decision: Decision,
    push: bool,
    handle: VmHandle,
) -> Result<Decision> {
    let status = session_ui::sync_and_shell(ctx, access, project, &handle, push).await?;
    if !status.success() {
        ctx.warn(&format!("shell exited with {status}"));
    }
    Ok(decision)
}
