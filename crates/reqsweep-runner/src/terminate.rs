//! Process-group termination
//!
//! The tool is spawned as the leader of its own process group so helpers it
//! forks can be signalled together with it.

use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::debug;

#[cfg(unix)]
use nix::sys::signal::Signal;

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(errno) = killpg(Pid::from_raw(raw), signal) {
        // ESRCH: the group is already gone
        debug!(pgid = raw, ?signal, %errno, "killpg failed");
    }
}

/// SIGKILLs the child's process group when dropped while armed.
///
/// Covers the path where the future driving a run is dropped mid-flight
/// (runtime shutdown, task abort): `kill_on_drop` only reaches the leader.
pub(crate) struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    pub(crate) const fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    /// Call once the child has been reaped.
    pub(crate) fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            #[cfg(unix)]
            signal_group(pgid, Signal::SIGKILL);
            #[cfg(not(unix))]
            let _ = pgid;
        }
    }
}

/// Poll interval while waiting out the grace window.
#[cfg(unix)]
const EXIT_POLL: Duration = Duration::from_millis(20);

/// Leader has exited but is still a zombie. Does not reap.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn leader_exited(pid: u32) -> bool {
    use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT | WaitPidFlag::WNOHANG;
    match waitid(Id::Pid(Pid::from_raw(raw)), flags) {
        Ok(WaitStatus::StillAlive) => false,
        Ok(_) => true,
        Err(errno) => {
            debug!(pid, %errno, "waitid failed");
            false
        }
    }
}

/// No non-reaping wait here; the full grace window is always used.
#[cfg(all(
    unix,
    not(any(target_os = "linux", target_os = "android", target_os = "freebsd"))
))]
const fn leader_exited(_pid: u32) -> bool {
    false
}

/// SIGTERM the group, wait up to `grace`, then SIGKILL and reap.
///
/// The leader is reaped only after the final SIGKILL, so its pid still names
/// this group when the group is signalled.
///
/// Returns the leader's exit status when it could be collected.
pub(crate) async fn escalate(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        signal_group(pid, Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if leader_exited(pid) {
                debug!(pid, "tool exited within grace period");
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(
                    pid,
                    grace_secs = grace.as_secs_f64(),
                    "grace period elapsed, sending SIGKILL"
                );
                break;
            }
            tokio::time::sleep(EXIT_POLL).await;
        }
        // stragglers in the group that ignored TERM
        signal_group(pid, Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        if let Err(err) = child.start_kill() {
            debug!(%err, "start_kill failed");
        }
    }

    child.wait().await.ok()
}
