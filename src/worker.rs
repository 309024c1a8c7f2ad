use crate::error::Result;
use crate::health::{HealthCache, HealthStatus};
use crate::ledger::LedgerClient;
use crate::matching::{ClaimMatchingEngine, MatchReport};
use crate::registry::SubjectRegistry;
use crate::schedule::{Clock, SystemClock, delay_until_next_wake};
use itertools::Itertools;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Cloneable stop signal for the claim loop.
#[derive(Clone, Default)]
pub struct Shutdown {
    notify: Arc<Notify>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once `trigger` has been called, including before this call.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    FetchingSubjects,
    PerSubjectMatching,
    Sleeping,
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub subjects: usize,
    pub claims: usize,
    pub quantity_claimed: u64,
    /// Shutdown arrived before every subject was visited.
    pub interrupted: bool,
}

impl PassReport {
    fn absorb(&mut self, matched: MatchReport) {
        self.subjects += 1;
        self.claims += matched.claims;
        self.quantity_claimed += matched.quantity_claimed;
    }
}

pub struct ClaimWorker {
    registry: Arc<dyn SubjectRegistry>,
    ledger: Arc<dyn LedgerClient>,
    engine: ClaimMatchingEngine,
    health: HealthCache,
    clock: Arc<dyn Clock>,
    enabled: bool,
    state: Mutex<WorkerState>,
}

impl ClaimWorker {
    pub fn new(
        registry: Arc<dyn SubjectRegistry>,
        ledger: Arc<dyn LedgerClient>,
        engine: ClaimMatchingEngine,
        health: HealthCache,
    ) -> Self {
        Self {
            registry,
            ledger,
            engine,
            health,
            clock: Arc::new(SystemClock),
            enabled: true,
            state: Mutex::new(WorkerState::Idle),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn state(&self) -> WorkerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: WorkerState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Runs passes aligned to the half hour until `shutdown` fires.
    pub async fn run(&self, shutdown: Shutdown) {
        if !self.enabled {
            warn!("claim automation is disabled, worker exiting");
            self.set_state(WorkerState::Stopped);
            return;
        }
        info!("claim worker started");

        while !shutdown.is_triggered() {
            self.set_state(WorkerState::Idle);
            // Failures are logged and reflected in health; the next wake retries.
            let _ = self.run_pass(&shutdown).await;
            if shutdown.is_triggered() {
                break;
            }

            let delay = delay_until_next_wake(self.clock.now());
            self.set_state(WorkerState::Sleeping);
            info!(seconds = delay.as_secs(), "sleeping until next half hour");
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(WorkerState::Stopped);
        info!("claim worker stopped");
    }

    /// One pass over every enrolled subject. Sets health to Healthy when the
    /// pass completes and Unhealthy when any step fails.
    pub async fn run_pass(&self, shutdown: &Shutdown) -> Result<PassReport> {
        let outcome = self.claim_all(shutdown).await;
        match &outcome {
            Ok(report) if report.interrupted => {
                info!(subjects = report.subjects, "claim pass interrupted by shutdown");
            }
            Ok(report) => {
                self.health.set(HealthStatus::Healthy);
                info!(
                    subjects = report.subjects,
                    claims = report.claims,
                    quantity = report.quantity_claimed,
                    "claim pass completed"
                );
            }
            Err(e) => {
                self.health.set(HealthStatus::Unhealthy);
                error!(error = %e, "claim pass failed");
            }
        }
        outcome
    }

    async fn claim_all(&self, shutdown: &Shutdown) -> Result<PassReport> {
        self.set_state(WorkerState::FetchingSubjects);
        let fetched = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            result = self.registry.list_enrolled_subjects() => Some(result),
        };
        let mut report = PassReport::default();
        let Some(subjects) = fetched else {
            report.interrupted = true;
            return Ok(report);
        };
        let subjects: Vec<_> = subjects?
            .into_iter()
            .unique_by(|s| s.subject_id.clone())
            .collect();

        self.set_state(WorkerState::PerSubjectMatching);
        for subject in subjects {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            let id = subject.subject_id.as_str();

            let queried = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                result = self.ledger.query_certificates(id) => Some(result),
            };
            let Some(queried) = queried else {
                report.interrupted = true;
                break;
            };
            let certificates = queried.inspect_err(|e| {
                error!(subject = %id, error = %e, "certificate query failed");
            })?;

            // Claims run to completion once started.
            let matched = self
                .engine
                .match_subject(self.ledger.as_ref(), id, certificates)
                .await?;
            report.absorb(matched);
        }
        Ok(report)
    }
}
