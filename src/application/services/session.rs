//! Session driver — acquire an instance, run a session body, always release.
//!
//! An instance acquired here is destroyed on every exit path (body error,
//! cancellation, discard, save) except an explicit [`Decision::Keep`]. The
//! environment record is only rewritten after a captured image is confirmed
//! ready, or after the user explicitly accepts an unconfirmed one.

use std::future::Future;

use anyhow::{Context, Result};
use rand::Rng;

use crate::application::ports::{
    CloudProvider, CreateSpec, NetworkProbe, ProgressReporter, RecordStore, Sleeper,
};
use crate::application::services::wait::{self, ImageWait, WaitPolicy};
use crate::domain::{EnvironmentRecord, UserCancellation, VmHandle};

const PASSWORD_LEN: usize = 24;
const PASSWORD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// What to do with the instance once the session body finishes cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Capture the disk as the new base image, then destroy.
    Save,
    /// Destroy without capturing.
    Discard,
    /// Leave the instance running for a later re-attach.
    Keep,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A new base image was captured and the record points at it.
    Saved { image_id: String },
    /// The instance was destroyed without updating the record.
    Destroyed,
    /// The instance was deliberately left running.
    Kept { instance_id: u64 },
}

/// Generate a root password for one instance: 24 alphanumeric characters with
/// at least one lowercase letter, one uppercase letter, and one digit. The
/// password lives only in process memory and on the instance itself.
#[must_use]
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate: String = (0..PASSWORD_LEN)
            .map(|_| PASSWORD_CHARS[rng.gen_range(0..PASSWORD_CHARS.len())] as char)
            .collect();
        let has_lower = candidate.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = candidate.bytes().any(|b| b.is_ascii_uppercase());
        let has_digit = candidate.bytes().any(|b| b.is_ascii_digit());
        if has_lower && has_upper && has_digit {
            return candidate;
        }
    }
}

/// Drives one session against one instance.
pub struct SessionDriver<'a, P, N, S, St, R>
where
    P: CloudProvider,
    N: NetworkProbe,
    S: Sleeper,
    St: RecordStore,
    R: ProgressReporter,
{
    provider: &'a P,
    probe: &'a N,
    sleeper: &'a S,
    store: &'a St,
    reporter: &'a R,
    policy: WaitPolicy,
}

impl<'a, P, N, S, St, R> SessionDriver<'a, P, N, S, St, R>
where
    P: CloudProvider,
    N: NetworkProbe,
    S: Sleeper,
    St: RecordStore,
    R: ProgressReporter,
{
    pub fn new(
        provider: &'a P,
        probe: &'a N,
        sleeper: &'a S,
        store: &'a St,
        reporter: &'a R,
        policy: WaitPolicy,
    ) -> Self {
        Self {
            provider,
            probe,
            sleeper,
            store,
            reporter,
            policy,
        }
    }

    /// Create a fresh instance from the record's base image, wait for SSH,
    /// run `body`, then release the instance per the body's [`Decision`].
    ///
    /// `ack_timed_out` is consulted only when a requested capture times out:
    /// `true` persists the unconfirmed image id, `false` keeps the record
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Validation and create failures return before anything exists. After
    /// creation, any failure destroys the instance and then propagates.
    pub async fn provision_and_run<F, Fut, A>(
        &self,
        record: &mut EnvironmentRecord,
        body: F,
        ack_timed_out: A,
    ) -> Result<SessionOutcome>
    where
        F: FnOnce(VmHandle) -> Fut,
        Fut: Future<Output = Result<Decision>>,
        A: FnOnce() -> Result<bool>,
    {
        record.validate()?;
        let password = generate_password();
        let label = record.instance_label();
        let spec = CreateSpec {
            label: &label,
            instance_type: &record.instance_type,
            region: &record.region,
            image: &record.base_image_id,
            root_password: &password,
        };
        self.reporter.step(&format!(
            "creating {} instance {} in {}",
            record.instance_type, label, record.region
        ));
        let handle = self
            .provider
            .create_instance(&spec)
            .await
            .context("creating instance")?;
        self.reporter
            .success(&format!("instance {} created", handle.id));
        self.run_acquired(record, handle, body, ack_timed_out).await
    }

    /// Re-attach to an instance a previous session kept running.
    ///
    /// The original root password is not known to this process, so the
    /// handle carries an empty one and remote access falls back to
    /// interactive authentication.
    ///
    /// # Errors
    ///
    /// Fails without touching the instance if it cannot be found or is not
    /// running.
    pub async fn resume<F, Fut, A>(
        &self,
        record: &mut EnvironmentRecord,
        instance_id: u64,
        body: F,
        ack_timed_out: A,
    ) -> Result<SessionOutcome>
    where
        F: FnOnce(VmHandle) -> Fut,
        Fut: Future<Output = Result<Decision>>,
        A: FnOnce() -> Result<bool>,
    {
        record.validate()?;
        let (status, ip) = self
            .provider
            .instance_status(instance_id)
            .await
            .with_context(|| format!("looking up instance {instance_id}"))?;
        if !status.is_running() {
            anyhow::bail!(
                "instance {instance_id} is {status}, not running. \
                 Start a fresh session with 'agentvm build'."
            );
        }
        let handle = VmHandle {
            id: instance_id,
            status,
            ip,
            root_password: String::new(),
        };
        self.reporter
            .success(&format!("re-attached to instance {instance_id}"));
        self.run_acquired(record, handle, body, ack_timed_out).await
    }

    /// From here on the instance exists and this process is responsible for
    /// it. Every result, including Ctrl-C, funnels through [`Self::finalize`]
    /// so the instance cannot be leaked by an early return.
    async fn run_acquired<F, Fut, A>(
        &self,
        record: &mut EnvironmentRecord,
        mut handle: VmHandle,
        body: F,
        ack_timed_out: A,
    ) -> Result<SessionOutcome>
    where
        F: FnOnce(VmHandle) -> Fut,
        Fut: Future<Output = Result<Decision>>,
        A: FnOnce() -> Result<bool>,
    {
        let driven = tokio::select! {
            driven = self.drive(&mut handle, body) => driven,
            _ = tokio::signal::ctrl_c() => {
                self.reporter.warn("interrupted, cleaning up");
                Err(UserCancellation.into())
            }
        };
        self.finalize(record, &handle, driven, ack_timed_out).await
    }

    async fn drive<F, Fut>(&self, handle: &mut VmHandle, body: F) -> Result<Decision>
    where
        F: FnOnce(VmHandle) -> Fut,
        Fut: Future<Output = Result<Decision>>,
    {
        wait::await_running(
            self.provider,
            self.probe,
            self.sleeper,
            self.reporter,
            handle,
            &self.policy,
        )
        .await?;
        body(handle.clone()).await
    }

    /// Release the instance. Exactly one delete happens on every path except
    /// an explicit keep.
    async fn finalize<A>(
        &self,
        record: &mut EnvironmentRecord,
        handle: &VmHandle,
        driven: Result<Decision>,
        ack_timed_out: A,
    ) -> Result<SessionOutcome>
    where
        A: FnOnce() -> Result<bool>,
    {
        match driven {
            Err(err) => {
                // The session already failed; a cleanup failure is reported
                // but must not replace the original error.
                if let Err(cleanup) = self.destroy(handle.id).await {
                    self.reporter.warn(&format!("{cleanup:#}"));
                }
                Err(err)
            }
            Ok(Decision::Keep) => {
                self.reporter
                    .step(&format!("leaving instance {} running", handle.id));
                Ok(SessionOutcome::Kept {
                    instance_id: handle.id,
                })
            }
            Ok(Decision::Discard) => {
                self.destroy(handle.id).await?;
                Ok(SessionOutcome::Destroyed)
            }
            Ok(Decision::Save) => {
                let saved = self.save_image(record, handle, ack_timed_out).await;
                let cleanup = self.destroy(handle.id).await;
                let image = match saved {
                    Ok(image) => image,
                    Err(err) => {
                        if let Err(cleanup) = cleanup {
                            self.reporter.warn(&format!("{cleanup:#}"));
                        }
                        return Err(err);
                    }
                };
                cleanup?;
                match image {
                    Some(image_id) => Ok(SessionOutcome::Saved { image_id }),
                    None => Ok(SessionOutcome::Destroyed),
                }
            }
        }
    }

    /// Capture the disk and wait for the image. Returns the image id once the
    /// record has been updated, or `None` when a capture timeout went
    /// unacknowledged and the record was left alone.
    async fn save_image<A>(
        &self,
        record: &mut EnvironmentRecord,
        handle: &VmHandle,
        ack_timed_out: A,
    ) -> Result<Option<String>>
    where
        A: FnOnce() -> Result<bool>,
    {
        let label = record.snapshot_label();
        self.reporter.step(&format!("capturing image {label}"));
        let image_id = self
            .provider
            .snapshot_disk(handle.id, &label)
            .await
            .context("starting image capture")?;
        let wait = wait::await_image_ready(
            self.provider,
            self.sleeper,
            self.reporter,
            &image_id,
            &self.policy,
        )
        .await?;
        if let ImageWait::TimedOut { elapsed_secs } = wait {
            self.reporter.warn(&format!(
                "image {image_id} not ready after {elapsed_secs}s; it may still finish on Linode's side"
            ));
            if !ack_timed_out()? {
                self.reporter
                    .warn("keeping the previous base image; record unchanged");
                return Ok(None);
            }
        }
        record.set_base_image(image_id.clone());
        self.store
            .save(record)
            .context("updating environment record")?;
        Ok(Some(image_id))
    }

    async fn destroy(&self, id: u64) -> Result<()> {
        self.reporter.step(&format!("destroying instance {id}"));
        self.provider.delete_instance(id).await.with_context(|| {
            format!(
                "destroying instance {id} (it may still be running; delete it in the Linode dashboard)"
            )
        })?;
        self.reporter.success(&format!("instance {id} destroyed"));
        Ok(())
    }
}
