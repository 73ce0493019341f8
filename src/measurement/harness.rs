//! Process Harness
//!
//! Owns one child process from spawn to exit and turns the OS exit
//! accounting into a [`ResourceSnapshot`].
//!
//! The harness moves through `NotStarted -> Running -> Exited`. Stop
//! requests come from a separate [`StopHandle`] so the thread blocked
//! in [`ProcessHarness::run_to_completion`] never has to be touched.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use super::accounting::{ExitOutcome, ExitRecord, ProcessAccounting, SignalOutcome};
use super::snapshot::ResourceSnapshot;
use crate::error::HarnessError;

#[derive(Debug, Clone, Copy)]
enum HarnessState {
    NotStarted,
    Running { pid: u32 },
    Exited(ExitRecord),
}

/// Lifecycle owner of a single measured child process.
pub struct ProcessHarness {
    target: PathBuf,
    args: Vec<OsString>,
    state: HarnessState,
    exited: Arc<Mutex<bool>>,
    accounting: Arc<dyn ProcessAccounting>,
}

impl ProcessHarness {
    /// Creates a harness for `target` without starting it.
    pub fn new(target: impl Into<PathBuf>, accounting: Arc<dyn ProcessAccounting>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            state: HarnessState::NotStarted,
            exited: Arc::new(Mutex::new(false)),
            accounting,
        }
    }

    /// Sets the arguments passed to the target.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the child's pid while it is running.
    pub fn pid(&self) -> Option<u32> {
        match self.state {
            HarnessState::Running { pid } => Some(pid),
            _ => None,
        }
    }

    /// Spawns the target with inherited stdio.
    ///
    /// Returns a handle that can interrupt the child from any thread.
    /// Spawn failures are returned as-is; there is no retry.
    pub fn start(&mut self) -> Result<StopHandle, HarnessError> {
        let child = Command::new(&self.target)
            .args(&self.args)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                path: self.target.clone(),
                source,
            })?;

        // The pid is reaped through wait4, so the Child itself is not kept.
        let pid = child.id();
        debug!("Spawned {} as pid {}", self.target.display(), pid);

        self.state = HarnessState::Running { pid };
        *lock_flag(&self.exited) = false;

        Ok(StopHandle {
            pid,
            exited: Arc::clone(&self.exited),
            accounting: Arc::clone(&self.accounting),
        })
    }

    /// Blocks until the child exits by any cause.
    ///
    /// Returns `Ok(None)` if the harness was never started.
    pub fn run_to_completion(&mut self) -> Result<Option<ExitOutcome>, HarnessError> {
        let pid = match self.state {
            HarnessState::NotStarted => return Ok(None),
            HarnessState::Exited(record) => return Ok(Some(record.outcome)),
            HarnessState::Running { pid } => pid,
        };

        let observed = self.accounting.wait_for_exit(pid);
        // Flag before reaping: until then the pid still names our child,
        // so a stop request holding the flag cannot hit a reused pid.
        *lock_flag(&self.exited) = true;
        let result = observed.and_then(|()| self.accounting.reap(pid));

        match result {
            Ok(record) => {
                info!("{} (pid {}) finished with {}", self.target.display(), pid, record.outcome);
                self.state = HarnessState::Exited(record);
                Ok(Some(record.outcome))
            }
            Err(source) => {
                self.state = HarnessState::NotStarted;
                Err(HarnessError::Wait { pid, source })
            }
        }
    }

    /// Returns the exit snapshot, or zero if the child has not exited.
    pub fn collect_snapshot(&self) -> ResourceSnapshot {
        match self.state {
            HarnessState::Exited(record) => record.snapshot,
            _ => ResourceSnapshot::default(),
        }
    }
}

fn lock_flag(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends stop requests to a running harness's child.
#[derive(Clone)]
pub struct StopHandle {
    pid: u32,
    exited: Arc<Mutex<bool>>,
    accounting: Arc<dyn ProcessAccounting>,
}

impl StopHandle {
    /// Returns the pid this handle signals.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns true once the harness has observed the child's exit.
    pub fn has_exited(&self) -> bool {
        *lock_flag(&self.exited)
    }

    /// Interrupts the child unless it has already exited.
    ///
    /// Fire-and-forget: the caller synchronises on the harness's
    /// snapshot, not on this call.
    pub fn request_stop(&self) -> Result<(), HarnessError> {
        // Held across the signal so the harness cannot reap in between.
        let exited = lock_flag(&self.exited);
        if *exited {
            debug!("Process {} already exited, no stop needed", self.pid);
            return Ok(());
        }

        let outcome = self.accounting.interrupt(self.pid);
        drop(exited);

        match outcome {
            Ok(SignalOutcome::Delivered) => {
                debug!("Sent interrupt to process {}", self.pid);
                Ok(())
            }
            Ok(SignalOutcome::AlreadyExited) => {
                warn!("Process {} was gone before it could be interrupted", self.pid);
                Ok(())
            }
            Err(source) => Err(HarnessError::Signal {
                pid: self.pid,
                source,
            }),
        }
    }
}
