//! Process Accounting
//!
//! Platform access for waiting on a child, reading its resource usage
//! at exit, and interrupting it.
//!
//! Waiting and reaping are separate steps. A child that has exited but
//! is not yet reaped keeps its pid, so it can still be signalled safely
//! until [`ProcessAccounting::reap`] runs. Resource usage is only
//! available from the reap.

use std::fmt;
use std::io;

use super::snapshot::ResourceSnapshot;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited normally with the given code
    Exited(i32),
    /// Terminated by the given signal
    Signaled(i32),
    /// Any other raw wait status
    Other(i32),
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit code {}", code),
            ExitOutcome::Signaled(signal) => write!(f, "signal {}", signal),
            ExitOutcome::Other(status) => write!(f, "wait status {:#x}", status),
        }
    }
}

/// Result of reaping a child: its termination cause and usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    pub outcome: ExitOutcome,
    pub snapshot: ResourceSnapshot,
}

/// Result of an interrupt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal was delivered
    Delivered,
    /// The process no longer exists
    AlreadyExited,
}

/// Waits on children and reads their OS resource accounting.
pub trait ProcessAccounting: Send + Sync {
    /// Blocks until `pid` has exited, leaving it unreaped.
    fn wait_for_exit(&self, pid: u32) -> io::Result<()>;

    /// Reaps an exited `pid` and returns its usage.
    fn reap(&self, pid: u32) -> io::Result<ExitRecord>;

    /// Sends an interrupt (SIGINT) to `pid`.
    fn interrupt(&self, pid: u32) -> io::Result<SignalOutcome>;
}

#[cfg(not(unix))]
compile_error!("rsg needs wait4 and SIGINT and only supports unix targets");

/// Accounting through `wait4(2)` and `kill(2)`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Wait4Accounting;

#[cfg(unix)]
impl Wait4Accounting {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ProcessAccounting for Wait4Accounting {
    fn wait_for_exit(&self, pid: u32) -> io::Result<()> {
        let id = libc::id_t::try_from(pid).map_err(|_| out_of_range(pid))?;
        // SAFETY: siginfo_t is a plain C struct for which all-zero is valid.
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };

        retry_interrupted(|| {
            // SAFETY: info references a live, writable local.
            unsafe { libc::waitid(libc::P_PID, id, &mut info, libc::WEXITED | libc::WNOWAIT) }
        })
    }

    fn reap(&self, pid: u32) -> io::Result<ExitRecord> {
        let pid = to_pid(pid)?;
        let mut status: libc::c_int = 0;
        // SAFETY: rusage is a plain C struct for which all-zero is valid.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

        retry_interrupted(|| {
            // SAFETY: both out-pointers reference live, writable locals.
            unsafe { libc::wait4(pid, &mut status, 0, &mut usage) }
        })?;

        Ok(ExitRecord {
            outcome: decode_status(status),
            snapshot: snapshot_from_rusage(&usage),
        })
    }

    fn interrupt(&self, pid: u32) -> io::Result<SignalOutcome> {
        let pid = to_pid(pid)?;
        // SAFETY: kill has no memory-safety preconditions.
        let ret = unsafe { libc::kill(pid, libc::SIGINT) };
        if ret == 0 {
            return Ok(SignalOutcome::Delivered);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(SignalOutcome::AlreadyExited)
        } else {
            Err(err)
        }
    }
}

/// Returns the accounting implementation for the current platform.
#[cfg(unix)]
pub fn platform_accounting() -> Wait4Accounting {
    Wait4Accounting::new()
}

/// Repeats a libc call returning -1 on error until it is not cut short by a signal.
#[cfg(unix)]
fn retry_interrupted(mut call: impl FnMut() -> libc::c_int) -> io::Result<()> {
    loop {
        if call() != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn to_pid(pid: u32) -> io::Result<libc::pid_t> {
    libc::pid_t::try_from(pid).map_err(|_| out_of_range(pid))
}

#[cfg(unix)]
fn out_of_range(pid: u32) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("pid {} out of range", pid))
}

#[cfg(unix)]
fn decode_status(status: libc::c_int) -> ExitOutcome {
    if libc::WIFEXITED(status) {
        ExitOutcome::Exited(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        ExitOutcome::Signaled(libc::WTERMSIG(status))
    } else {
        ExitOutcome::Other(status)
    }
}

/// Converts a raw rusage into a snapshot with fixed units.
#[cfg(unix)]
pub(crate) fn snapshot_from_rusage(usage: &libc::rusage) -> ResourceSnapshot {
    ResourceSnapshot::new(
        max_rss_bytes(usage.ru_maxrss),
        timeval_micros(&usage.ru_utime),
        timeval_micros(&usage.ru_stime),
    )
}

// Darwin reports ru_maxrss in bytes, Linux and the BSDs in kilobytes.
#[cfg(unix)]
fn max_rss_bytes(raw: libc::c_long) -> u64 {
    let raw = u64::try_from(raw).unwrap_or(0);
    if cfg!(any(target_os = "macos", target_os = "ios")) {
        raw
    } else {
        raw.saturating_mul(1024)
    }
}

#[cfg(unix)]
fn timeval_micros(tv: &libc::timeval) -> u64 {
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let micros = u64::try_from(tv.tv_usec).unwrap_or(0);
    secs.saturating_mul(1_000_000).saturating_add(micros)
}
