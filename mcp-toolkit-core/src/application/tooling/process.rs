//! Best-effort termination of a tool server subprocess.
//!
//! A process that is already gone counts as terminated: "no such process" is
//! never reported as a failure.

use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

/// How a child ended up stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The child had exited before any signal was sent.
    AlreadyExited,
    /// The child exited after the graceful signal.
    Terminated,
    /// The child needed the forceful kill.
    Killed,
    /// Every signal failed or the child never exited within the grace period.
    Unconfirmed,
}

enum Delivery {
    Delivered,
    AlreadyGone,
    Failed(std::io::Error),
}

/// Stop `child`: SIGTERM, then SIGKILL if SIGTERM cannot be delivered or the child
/// outlives `grace`. Never fails; problems are logged.
pub(crate) async fn terminate_child(server: &str, mut child: Child, grace: Duration) -> Termination {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(server, %status, "MCP server process already exited");
            return Termination::AlreadyExited;
        }
        Ok(None) => {}
        Err(err) => {
            debug!(server, %err, "could not poll MCP server process status");
        }
    }

    let Some(pid) = child.id() else {
        return Termination::AlreadyExited;
    };

    match graceful_signal(pid) {
        Delivery::Delivered => {
            debug!(server, pid, "sent termination signal to MCP server");
            if reap(&mut child, grace).await {
                return Termination::Terminated;
            }
            warn!(
                server,
                pid,
                ?grace,
                "MCP server ignored termination signal; killing"
            );
        }
        Delivery::AlreadyGone => {
            debug!(server, pid, "MCP server process was already gone");
            let _ = child.try_wait();
            return Termination::AlreadyExited;
        }
        Delivery::Failed(err) => {
            warn!(server, pid, %err, "failed to deliver termination signal; escalating");
        }
    }

    match forceful_kill(&mut child, pid) {
        Delivery::Delivered => {
            if reap(&mut child, grace).await {
                Termination::Killed
            } else {
                warn!(server, pid, "MCP server did not exit after kill");
                Termination::Unconfirmed
            }
        }
        Delivery::AlreadyGone => {
            let _ = child.try_wait();
            Termination::AlreadyExited
        }
        Delivery::Failed(err) => {
            warn!(server, pid, %err, "failed to kill MCP server process");
            Termination::Unconfirmed
        }
    }
}

async fn reap(child: &mut Child, grace: Duration) -> bool {
    matches!(tokio::time::timeout(grace, child.wait()).await, Ok(Ok(_)))
}

#[cfg(unix)]
fn graceful_signal(pid: u32) -> Delivery {
    send_signal(pid, nix::sys::signal::Signal::SIGTERM)
}

#[cfg(unix)]
fn forceful_kill(_child: &mut Child, pid: u32) -> Delivery {
    send_signal(pid, nix::sys::signal::Signal::SIGKILL)
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> Delivery {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return Delivery::Failed(std::io::Error::other(format!("pid {pid} out of range")));
    };
    match kill(Pid::from_raw(raw), signal) {
        Ok(()) => Delivery::Delivered,
        Err(Errno::ESRCH) => Delivery::AlreadyGone,
        Err(errno) => Delivery::Failed(errno.into()),
    }
}

// Windows has no graceful signal for a console-less child; go straight to the kill.
#[cfg(not(unix))]
fn graceful_signal(_pid: u32) -> Delivery {
    Delivery::Failed(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no graceful termination signal on this platform",
    ))
}

#[cfg(not(unix))]
fn forceful_kill(child: &mut Child, _pid: u32) -> Delivery {
    match child.start_kill() {
        Ok(()) => Delivery::Delivered,
        Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => Delivery::AlreadyGone,
        Err(err) => Delivery::Failed(err),
    }
}
