//! Phase Orchestration
//!
//! Runs the measured target through its idle and peak phases. Each
//! phase spawns a fresh child, lets it run for a fixed window (with
//! HTTP load during the peak phase), interrupts it, and waits for the
//! exit snapshot.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::accounting::{platform_accounting, ProcessAccounting};
use super::handoff::{snapshot_handoff, SnapshotReceiver};
use super::harness::{ProcessHarness, StopHandle};
use super::snapshot::{Findings, ResourceSnapshot};
use crate::config::Config;
use crate::error::RunError;
use crate::load::{LoadGenerator, LoadStats, LoadTarget, WARMUP_DELAY};

/// How often to report a child that ignores its stop signal.
const EXIT_WAIT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// A bounded observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No external traffic
    Idle,
    /// Under synthetic HTTP load
    Peak,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Peak => "peak",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a running phase owns.
struct PhaseContext {
    phase: Phase,
    stop: StopHandle,
    snapshot: SnapshotReceiver,
    harness_task: JoinHandle<()>,
    load: Option<(CancellationToken, JoinHandle<LoadStats>)>,
}

impl PhaseContext {
    /// Ends the phase: stops load, interrupts the child, awaits the snapshot.
    async fn finish(self) -> Result<ResourceSnapshot, RunError> {
        if let Some((cancel, handle)) = self.load {
            cancel.cancel();
            match handle.await {
                Ok(stats) => info!(
                    "Load generator sent {} requests ({} succeeded, {} failed)",
                    stats.sent,
                    stats.succeeded(),
                    stats.failed
                ),
                Err(e) => warn!("Load generator task failed: {}", e),
            }
        }

        self.stop.request_stop()?;

        let mut snapshot = self.snapshot;
        let mut report = interval(EXIT_WAIT_REPORT_INTERVAL);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);
        report.tick().await;

        let snapshot = loop {
            tokio::select! {
                result = &mut snapshot => break result?,
                _ = report.tick() => warn!(
                    "Still waiting for {} phase process {} to exit",
                    self.phase,
                    self.stop.pid()
                ),
            }
        };

        if let Err(e) = self.harness_task.await {
            warn!("Harness thread for {} phase failed: {}", self.phase, e);
        }

        Ok(snapshot)
    }
}

/// Runs measurement phases against one target binary.
pub struct PhaseOrchestrator {
    target: PathBuf,
    args: Vec<OsString>,
    accounting: Arc<dyn ProcessAccounting>,
    load_warmup: Duration,
}

impl PhaseOrchestrator {
    /// Creates an orchestrator using the platform's process accounting.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self::with_accounting(target, Arc::new(platform_accounting()))
    }

    /// Creates an orchestrator with a specific accounting backend.
    pub fn with_accounting(
        target: impl Into<PathBuf>,
        accounting: Arc<dyn ProcessAccounting>,
    ) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            accounting,
            load_warmup: WARMUP_DELAY,
        }
    }

    /// Sets the arguments passed to every spawned target.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the delay before the first load request.
    pub fn with_load_warmup(mut self, warmup: Duration) -> Self {
        self.load_warmup = warmup;
        self
    }

    /// Measures the target without external traffic.
    pub async fn run_idle_phase(&self, duration: Duration) -> Result<ResourceSnapshot, RunError> {
        info!(
            "Launching {} for idle state resource usage assessment",
            self.target.display()
        );
        info!("Trying to determine idle state resource usage (no external traffic)");

        let ctx = self.begin(Phase::Idle, None)?;
        self.observe(Phase::Idle, duration, ctx).await
    }

    /// Measures the target while `load` is applied.
    pub async fn run_peak_phase(
        &self,
        duration: Duration,
        load: &LoadTarget,
    ) -> Result<ResourceSnapshot, RunError> {
        info!(
            "Launching {} for peak state resource usage assessment",
            self.target.display()
        );
        info!(
            "Trying to determine peak state resource usage using {}",
            load.endpoint
        );

        // Built before spawning so a client failure leaves no child behind.
        let generator = LoadGenerator::new(load.clone())?.with_warmup(self.load_warmup);
        let ctx = self.begin(Phase::Peak, Some(generator))?;
        self.observe(Phase::Peak, duration, ctx).await
    }

    /// Runs the idle phase, then the peak phase if load is configured.
    pub async fn run_assessment(
        &self,
        idle_duration: Duration,
        peak: Option<(Duration, &LoadTarget)>,
    ) -> Result<Findings, RunError> {
        let idle = self.run_idle_phase(idle_duration).await?;
        info!("Found idle state resource usage. {}", idle.summary());

        let peak = match peak {
            Some((duration, load)) => {
                let snapshot = self.run_peak_phase(duration, load).await?;
                info!("Found peak state resource usage. {}", snapshot.summary());
                Some(snapshot)
            }
            None => None,
        };

        Ok(Findings { idle, peak })
    }

    fn begin(&self, phase: Phase, load: Option<LoadGenerator>) -> Result<PhaseContext, RunError> {
        let mut harness = ProcessHarness::new(&self.target, Arc::clone(&self.accounting))
            .with_args(self.args.iter().cloned());
        let stop = harness.start()?;
        let (tx, rx) = snapshot_handoff();

        let harness_task = tokio::task::spawn_blocking(move || {
            if let Err(e) = harness.run_to_completion() {
                error!("{}", e);
            }
            tx.send(harness.collect_snapshot());
        });

        let load = load.map(|generator| {
            let cancel = CancellationToken::new();
            let handle = generator.spawn(cancel.clone());
            (cancel, handle)
        });

        Ok(PhaseContext {
            phase,
            stop,
            snapshot: rx,
            harness_task,
            load,
        })
    }

    async fn observe(
        &self,
        phase: Phase,
        duration: Duration,
        ctx: PhaseContext,
    ) -> Result<ResourceSnapshot, RunError> {
        sleep(duration).await;
        info!(
            "{} state assessment of {} completed",
            capitalize(phase.name()),
            self.target.display()
        );
        ctx.finish().await
    }
}

/// Runs a full assessment as described by `config`.
pub async fn run_assessment(config: &Config) -> Result<Findings, RunError> {
    let orchestrator =
        PhaseOrchestrator::new(&config.target).with_args(config.target_args.iter().cloned());
    let peak = config.load.as_ref().map(|load| (config.peak_duration, load));

    orchestrator.run_assessment(config.idle_duration, peak).await
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::measurement::accounting::{ExitRecord, SignalOutcome};
    use std::io;
    use std::time::Instant;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Idle.to_string(), "idle");
        assert_eq!(Phase::Peak.name(), "peak");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("idle"), "Idle");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn test_idle_phase_waits_full_duration() {
        let orchestrator = PhaseOrchestrator::new("sleep").with_args(["30"]);
        let start = Instant::now();

        let snapshot = orchestrator
            .run_idle_phase(Duration::from_millis(300))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(snapshot.memory_max_rss > 0);
    }

    #[tokio::test]
    async fn test_idle_phase_with_exited_target() {
        let orchestrator = PhaseOrchestrator::new("true");
        let start = Instant::now();

        let snapshot = orchestrator
            .run_idle_phase(Duration::from_millis(200))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(snapshot.memory_max_rss > 0);
    }

    #[tokio::test]
    async fn test_missing_target_is_spawn_error() {
        let orchestrator = PhaseOrchestrator::new("/nonexistent/rsg-target");
        let err = orchestrator
            .run_idle_phase(Duration::from_millis(10))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, RunError::Harness(HarnessError::Spawn { .. })));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_idle_only_assessment_has_no_peak() {
        let orchestrator = PhaseOrchestrator::new("true");
        let findings = orchestrator
            .run_assessment(Duration::from_millis(50), None)
            .await
            .unwrap();

        assert!(findings.peak.is_none());
        assert!(findings.peak_or_zero().is_zero());
    }

    /// Waits for real but cannot deliver signals.
    struct StuckAccounting;

    impl ProcessAccounting for StuckAccounting {
        fn wait_for_exit(&self, pid: u32) -> io::Result<()> {
            platform_accounting().wait_for_exit(pid)
        }

        fn reap(&self, pid: u32) -> io::Result<ExitRecord> {
            platform_accounting().reap(pid)
        }

        fn interrupt(&self, _pid: u32) -> io::Result<SignalOutcome> {
            Err(io::Error::from_raw_os_error(libc::EPERM))
        }
    }

    #[tokio::test]
    async fn test_undeliverable_stop_is_fatal() {
        let orchestrator =
            PhaseOrchestrator::with_accounting("sleep", Arc::new(StuckAccounting)).with_args(["1"]);
        let err = orchestrator
            .run_idle_phase(Duration::from_millis(50))
            .await
            .err()
            .unwrap();

        assert!(err.is_fatal());
    }
}
