use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::workflows::casework::{CaseLifecycleService, CaseStore, CaseworkError, StoreError};

/// Counters for one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    /// Cases flagged stagnant at the end of the pass.
    pub stagnant: usize,
    /// Cases skipped because a live transition won the version race.
    pub conflicts: usize,
    pub errors: usize,
}

/// Periodic stagnation recompute over every open case.
///
/// The sweep goes through the same version-checked save as live transitions,
/// so it can never silently overwrite an `advance` or `close` that lands
/// mid-pass; the losing side of the race is this sweep, which logs the
/// conflict and moves on. It never retries.
pub struct StagnationSweep<S> {
    service: Arc<CaseLifecycleService<S>>,
    interval: Duration,
}

impl<S> StagnationSweep<S>
where
    S: CaseStore + 'static,
{
    pub fn new(service: Arc<CaseLifecycleService<S>>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Recomputes stagnation for every open case at `now`.
    ///
    /// When `shutdown` flips while a pass is running, the case in hand is
    /// finished and no further cases are picked up. Per-case failures are
    /// logged and counted rather than aborting the remaining cases.
    pub fn pass(
        &self,
        now: DateTime<Utc>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<SweepSummary, CaseworkError> {
        let ids = self.service.open_case_ids()?;
        let mut summary = SweepSummary::default();

        for id in ids {
            if let Some(rx) = shutdown {
                if *rx.borrow() {
                    info!(remaining = %id, "shutdown requested; stopping sweep pass early");
                    break;
                }
            }

            summary.examined += 1;
            match self.service.recompute_stagnation(&id, now) {
                Ok(case) => {
                    if case.stagnant {
                        summary.stagnant += 1;
                    }
                }
                Err(CaseworkError::Store(StoreError::VersionConflict { .. })) => {
                    warn!(case = %id, "concurrent transition during sweep; skipping case");
                    summary.conflicts += 1;
                }
                Err(err) => {
                    error!(case = %id, %err, "stagnation recompute failed");
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Runs passes on the configured interval until `shutdown` flips true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.pass(Utc::now(), Some(&shutdown)) {
                        Ok(summary) => info!(
                            examined = summary.examined,
                            stagnant = summary.stagnant,
                            conflicts = summary.conflicts,
                            errors = summary.errors,
                            "stagnation sweep pass finished"
                        ),
                        Err(err) => warn!(%err, "stagnation sweep pass failed"),
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("stagnation sweep stopped");
    }
}
