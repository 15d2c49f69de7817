//! Bounded waits — boot polling, SSH probing, image capture.
//!
//! Every wait here is bounded by [`WaitPolicy`] and measures elapsed time as
//! the sum of requested sleeps, so tests with an instant [`Sleeper`] observe
//! the exact same poll counts as production.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CloudProvider, NetworkProbe, ProgressReporter, Sleeper};
use crate::domain::{InstanceStatus, ProviderError, VmHandle};

/// Port probed to decide an instance is ready for use.
pub const SSH_PORT: u16 = 22;

/// Tunable bounds for every wait in a session.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    /// First delay between boot status polls; doubles each round.
    pub boot_start: Duration,
    /// Ceiling for the boot poll delay.
    pub boot_cap: Duration,
    /// Give up on the boot after this much accumulated waiting.
    pub boot_deadline: Duration,
    /// Delay between SSH reachability probes.
    pub probe_interval: Duration,
    /// Probe attempts before the instance is declared unreachable.
    pub probe_attempts: u32,
    /// Delay between image capture polls.
    pub image_interval: Duration,
    /// Stop polling the image after this much accumulated waiting. The
    /// capture keeps running provider-side; callers decide what to do with
    /// the timeout.
    pub image_max_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            boot_start: Duration::from_secs(5),
            boot_cap: Duration::from_secs(15),
            boot_deadline: Duration::from_secs(600),
            probe_interval: Duration::from_secs(1),
            probe_attempts: 30,
            image_interval: Duration::from_secs(5),
            image_max_wait: Duration::from_secs(600),
        }
    }
}

/// Outcome of waiting for an image capture.
///
/// A timeout is an ordinary value, not an error: the image may still finish
/// later and the caller must decide whether to trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageWait {
    Ready,
    TimedOut { elapsed_secs: u64 },
}

/// Poll the provider until the instance reports running, then probe the SSH
/// port until it accepts connections.
///
/// On success the handle is `SshReady` with its IPv4 address filled in. Boot
/// polls back off exponentially from `boot_start` to `boot_cap`; probes run
/// at a fixed `probe_interval`.
///
/// # Errors
///
/// Returns [`ProviderError::DeadlineExceeded`] when either bound runs out,
/// [`ProviderError::Malformed`] if the provider reports running without an
/// address, or the underlying fetch/probe error.
pub async fn await_running<P, N, S>(
    provider: &P,
    probe: &N,
    sleeper: &S,
    reporter: &impl ProgressReporter,
    handle: &mut VmHandle,
    policy: &WaitPolicy,
) -> Result<()>
where
    P: CloudProvider,
    N: NetworkProbe,
    S: Sleeper,
{
    let mut elapsed = Duration::ZERO;
    let mut delay = policy.boot_start;

    loop {
        let (status, ip) = provider
            .instance_status(handle.id)
            .await
            .with_context(|| format!("checking status of instance {}", handle.id))?;
        handle.status = status;
        if status.is_running() {
            handle.ip = ip;
            break;
        }
        if elapsed >= policy.boot_deadline {
            return Err(ProviderError::DeadlineExceeded {
                what: format!("instance {} to reach running", handle.id),
                elapsed_secs: elapsed.as_secs(),
            }
            .into());
        }
        reporter.step(&format!("instance status: {status}"));
        sleeper.sleep(delay).await;
        elapsed += delay;
        delay = (delay * 2).min(policy.boot_cap);
    }

    let ip = handle.ip.clone().ok_or_else(|| {
        ProviderError::Malformed("instance reported running without an IPv4 address".to_string())
    })?;

    reporter.step("instance running, waiting for SSH");
    let mut probed = Duration::ZERO;
    for attempt in 1..=policy.probe_attempts {
        let reachable = probe
            .check_tcp_connectivity(&ip, SSH_PORT)
            .await
            .with_context(|| format!("probing {ip}:{SSH_PORT}"))?;
        if reachable {
            handle.status = InstanceStatus::SshReady;
            reporter.success(&format!("SSH reachable at {ip}"));
            return Ok(());
        }
        if attempt == policy.probe_attempts {
            break;
        }
        sleeper.sleep(policy.probe_interval).await;
        probed += policy.probe_interval;
    }

    Err(ProviderError::DeadlineExceeded {
        what: format!("SSH on {ip} to accept connections"),
        elapsed_secs: probed.as_secs(),
    }
    .into())
}

/// Poll an image until it is available or `image_max_wait` runs out.
///
/// # Errors
///
/// Returns an error only if a status fetch fails; running out of time yields
/// [`ImageWait::TimedOut`].
pub async fn await_image_ready<P, S>(
    provider: &P,
    sleeper: &S,
    reporter: &impl ProgressReporter,
    image_id: &str,
    policy: &WaitPolicy,
) -> Result<ImageWait>
where
    P: CloudProvider,
    S: Sleeper,
{
    let mut elapsed = Duration::ZERO;
    loop {
        let status = provider
            .image_status(image_id)
            .await
            .with_context(|| format!("checking status of image {image_id}"))?;
        if status.is_available() {
            reporter.success(&format!("image {image_id} ready"));
            return Ok(ImageWait::Ready);
        }
        if elapsed >= policy.image_max_wait {
            return Ok(ImageWait::TimedOut {
                elapsed_secs: elapsed.as_secs(),
            });
        }
        reporter.step(&format!(
            "capturing image: {}%",
            progress_pct(elapsed, policy.image_max_wait)
        ));
        sleeper.sleep(policy.image_interval).await;
        elapsed += policy.image_interval;
    }
}

/// Capture progress as a percentage, capped at 95 until the image is
/// actually available.
#[must_use]
pub fn progress_pct(elapsed: Duration, max_wait: Duration) -> u64 {
    let max_secs = max_wait.as_secs();
    if max_secs == 0 {
        return 95;
    }
    (elapsed.as_secs() * 95 / max_secs).min(95)
}
