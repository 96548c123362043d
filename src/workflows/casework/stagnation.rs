use chrono::{DateTime, Utc};

use super::catalog::{CatalogError, CatalogSet};
use super::domain::{CaseRecord, StagnationReason};

/// Result of evaluating a case against its time budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagnationOutcome {
    pub stagnant: bool,
    pub reason: Option<StagnationReason>,
}

impl StagnationOutcome {
    const fn none() -> Self {
        Self {
            stagnant: false,
            reason: None,
        }
    }

    const fn because(reason: StagnationReason) -> Self {
        Self {
            stagnant: true,
            reason: Some(reason),
        }
    }
}

/// Derives the stagnation flag for a case at `now`.
///
/// Pure and side-effect-free, so it can run on every read. It computes from
/// the authoritative `stage_started_at` and `awaiting_validation_since`
/// stamps, never from its own prior output, which keeps a periodic sweep safe
/// to interleave with live transitions. Persisting the outcome is the
/// [`recompute_stagnation`] operation's job.
///
/// A pending validation that outlived the validation SLA takes priority over
/// plain time-in-stage: the case is stuck on a second actor, not on the team
/// working the stage.
///
/// [`recompute_stagnation`]: super::service::CaseLifecycleService::recompute_stagnation
pub fn evaluate(
    case: &CaseRecord,
    catalogs: &CatalogSet,
    validation_sla_days: i64,
    now: DateTime<Utc>,
) -> Result<StagnationOutcome, CatalogError> {
    let stage = catalogs
        .catalog(case.variant)
        .stage_at(&case.current_stage)?;

    if !case.is_open() {
        return Ok(StagnationOutcome::none());
    }

    if let Some(since) = case.awaiting_validation_since {
        let days = (now - since).num_days();
        if days > validation_sla_days {
            return Ok(StagnationOutcome::because(
                StagnationReason::ValidationPending { days },
            ));
        }
    }

    let sla_days = case.sla_override_days.unwrap_or(stage.default_sla_days);
    let days_in_stage = (now - case.stage_started_at).num_days();
    if days_in_stage > sla_days {
        return Ok(StagnationOutcome::because(StagnationReason::NoMovement {
            days: days_in_stage,
        }));
    }

    Ok(StagnationOutcome::none())
}
