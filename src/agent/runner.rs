//! Agent runner
//!
//! Perpetual driver around the orchestrator: tick, sleep, repeat.
//! Consecutive errored ticks trigger a backoff pause; systemic failures
//! (the cycle itself failing rather than individual learners) pause twice
//! as long. All sleeps are interruptible so shutdown never waits out a
//! full tick interval.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::RunnerConfig;

use super::{AgentOrchestrator, TickReport};

/// Create the shutdown channel wired to the runner. Send `true` to stop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// How a finished tick is classified for backoff purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Clean,
    /// Some learners errored but the cycle completed
    Degraded,
    /// The cycle itself failed
    Systemic,
}

impl TickOutcome {
    fn of(report: &TickReport) -> Self {
        if report.fatal {
            Self::Systemic
        } else if report.errors.is_empty() {
            Self::Clean
        } else {
            Self::Degraded
        }
    }
}

/// Consecutive-error accounting, separated out so the backoff policy is
/// testable without running the loop.
struct ErrorTracker {
    consecutive: u32,
    ceiling: u32,
    pause: Duration,
}

impl ErrorTracker {
    fn new(config: &RunnerConfig) -> Self {
        Self {
            consecutive: 0,
            ceiling: config.max_errors_before_pause,
            pause: Duration::from_secs(config.error_pause_secs),
        }
    }

    /// Record a tick outcome; returns how long to pause, if at all.
    /// Reaching the ceiling resets the counter.
    fn observe(&mut self, outcome: TickOutcome) -> Option<Duration> {
        match outcome {
            TickOutcome::Clean => {
                self.consecutive = 0;
                None
            }
            TickOutcome::Degraded | TickOutcome::Systemic => {
                self.consecutive += 1;
                if self.consecutive < self.ceiling {
                    return None;
                }
                self.consecutive = 0;
                match outcome {
                    TickOutcome::Systemic => Some(self.pause * 2),
                    _ => Some(self.pause),
                }
            }
        }
    }
}

/// Owned runner instance; the only scheduler in the process.
/// States: stopped -> running (on `run`) -> stopped (on shutdown signal).
pub struct AgentRunner {
    orchestrator: AgentOrchestrator,
    config: RunnerConfig,
    shutdown: watch::Receiver<bool>,
    ticks: u64,
}

impl AgentRunner {
    pub fn new(
        orchestrator: AgentOrchestrator,
        config: RunnerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            orchestrator,
            config,
            shutdown,
            ticks: 0,
        }
    }

    /// Run until the shutdown channel flips. The in-flight tick always
    /// finishes; only the sleeps are interrupted.
    pub async fn run(&mut self) {
        let started = Instant::now();
        let tick_interval = Duration::from_secs(self.config.tick_interval_secs);
        let mut tracker = ErrorTracker::new(&self.config);

        info!(
            interval_secs = self.config.tick_interval_secs,
            "agent runner starting"
        );

        while !*self.shutdown.borrow() {
            let tick_start = Instant::now();
            let report = self.orchestrator.step().await;
            self.ticks += 1;

            info!(
                tick = self.ticks,
                duration_ms = tick_start.elapsed().as_millis() as u64,
                processed = report.processed,
                errors = report.errors.len(),
                "tick finished"
            );
            for err in &report.errors {
                error!("{err}");
            }

            if let Some(pause) = tracker.observe(TickOutcome::of(&report)) {
                warn!(pause_secs = pause.as_secs(), "error ceiling hit, pausing");
                if !self.sleep_interruptible(pause).await {
                    break;
                }
            }

            if !self.sleep_interruptible(tick_interval).await {
                break;
            }
        }

        info!(
            ticks = self.ticks,
            uptime_secs = started.elapsed().as_secs(),
            "agent runner stopped"
        );
    }

    /// Sleep that wakes early on shutdown. Returns false when shutting down.
    async fn sleep_interruptible(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.shutdown.changed() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agent::testing::MockGenerator;
    use crate::store::Store;

    fn config(ceiling: u32, pause_secs: u64) -> RunnerConfig {
        RunnerConfig {
            tick_interval_secs: 0,
            max_errors_before_pause: ceiling,
            error_pause_secs: pause_secs,
            shutdown_grace_secs: 1,
        }
    }

    #[test]
    fn clean_tick_resets_counter() {
        let mut tracker = ErrorTracker::new(&config(3, 60));
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
        assert_eq!(tracker.observe(TickOutcome::Clean), None);
        // Counter was reset; two more degraded ticks are below the ceiling
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
        assert_eq!(
            tracker.observe(TickOutcome::Degraded),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn ceiling_pause_then_counter_resets() {
        let mut tracker = ErrorTracker::new(&config(2, 30));
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
        assert_eq!(
            tracker.observe(TickOutcome::Degraded),
            Some(Duration::from_secs(30))
        );
        // Reset after the pause
        assert_eq!(tracker.observe(TickOutcome::Degraded), None);
    }

    #[test]
    fn systemic_failure_pauses_twice_as_long() {
        let mut tracker = ErrorTracker::new(&config(1, 45));
        assert_eq!(
            tracker.observe(TickOutcome::Systemic),
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            tracker.observe(TickOutcome::Degraded),
            Some(Duration::from_secs(45))
        );
    }

    #[test]
    fn outcome_classification() {
        let clean = TickReport::default();
        assert_eq!(TickOutcome::of(&clean), TickOutcome::Clean);

        let degraded = TickReport {
            errors: vec!["x".to_string()],
            ..Default::default()
        };
        assert_eq!(TickOutcome::of(&degraded), TickOutcome::Degraded);

        let fatal = TickReport {
            errors: vec!["x".to_string()],
            fatal: true,
            ..Default::default()
        };
        assert_eq!(TickOutcome::of(&fatal), TickOutcome::Systemic);
    }

    #[tokio::test]
    async fn runner_stops_on_shutdown_signal() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = AgentOrchestrator::new(store, generator);

        let (tx, rx) = shutdown_channel();
        let mut runner = AgentRunner::new(orchestrator, config(5, 60), rx);

        let handle = tokio::spawn(async move {
            runner.run().await;
        });

        // Give the loop a moment to start ticking, then stop it
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("runner did not stop in time")
            .unwrap();
    }
}
