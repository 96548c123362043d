use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::board::{self, CaseBoard};
use super::catalog::{CatalogError, CatalogSet, CatalogVariant};
use super::domain::{
    Actor, AuditAction, AuditEntry, CaseId, CaseRecord, CaseStatus, StageRegistration,
    StagnationReason,
};
use super::repository::{CaseStore, StoreError};
use super::stagnation;

/// Days a staged transition may wait for its second actor before the case is
/// flagged, unless configured otherwise.
pub const DEFAULT_VALIDATION_SLA_DAYS: i64 = 5;

/// The only component authorized to mutate a case.
///
/// Every mutating operation follows load, check, mutate, save-with-expected-
/// version; a concurrent transition on the same case surfaces as
/// [`StoreError::VersionConflict`] and is never retried here. Operations take
/// an explicit `now` so behavior is deterministic under test; production
/// callers pass `Utc::now()`.
pub struct CaseLifecycleService<S> {
    catalogs: Arc<CatalogSet>,
    store: Arc<S>,
    validation_sla_days: i64,
}

static CASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_case_id() -> CaseId {
    let id = CASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CaseId(format!("case-{id:06}"))
}

/// Rejected stage changes. Recoverable at the caller's discretion and shown
/// to the user as-is, never masked behind a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("case {case} is closed; no further transitions are possible")]
    CaseClosed { case: CaseId },
    #[error("cannot move from {from} to {to}; the only allowed step forward is the next stage")]
    NotNextStage { from: String, to: String },
    #[error("case is already at stage {stage}")]
    SameStage { stage: String },
    #[error("a transition to {pending} is already awaiting validation")]
    ValidationPending { pending: String },
    #[error("no staged transition is awaiting validation")]
    NothingPending,
}

#[derive(Debug, thiserror::Error)]
pub enum CaseworkError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> CaseLifecycleService<S>
where
    S: CaseStore + 'static,
{
    pub fn new(catalogs: Arc<CatalogSet>, store: Arc<S>, validation_sla_days: i64) -> Self {
        Self {
            catalogs,
            store,
            validation_sla_days,
        }
    }

    /// Service wired against the builtin catalogs and default validation SLA.
    pub fn with_builtin_catalogs(store: Arc<S>) -> Self {
        Self::new(
            Arc::new(CatalogSet::builtin()),
            store,
            DEFAULT_VALIDATION_SLA_DAYS,
        )
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    /// Opens a case at the first stage of the variant's catalog.
    pub fn open(
        &self,
        variant: CatalogVariant,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let first = self.catalogs.catalog(variant).first().code.clone();
        self.open_at(variant, &first, actor, now)
    }

    /// Opens a case at a named stage, for migrations of records that already
    /// progressed outside the system.
    pub fn open_at(
        &self,
        variant: CatalogVariant,
        initial_stage: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let stage = self.catalogs.catalog(variant).stage_at(initial_stage)?;

        let record = CaseRecord {
            id: next_case_id(),
            variant,
            status: CaseStatus::Open,
            current_stage: stage.code.clone(),
            pending_stage: None,
            stage_started_at: now,
            awaiting_validation_since: None,
            sla_override_days: None,
            stagnant: false,
            stagnation_reason: None,
            opened_at: now,
            closed_at: None,
            version: 1,
        };

        let stored = self.store.insert(record)?;
        self.append_audit(
            &stored,
            AuditAction::Open,
            actor,
            format!("caso aberto no estágio {}", stored.current_stage),
            now,
        )?;
        Ok(stored)
    }

    /// Proposes or applies a forward step to the next stage.
    ///
    /// If the target stage is validation-gated the change is only staged: the
    /// target is parked on `pending_stage` and `current_stage` stays put until
    /// [`validate`] commits it or [`close`] cancels it. Either branch is
    /// audited as an advance.
    ///
    /// [`validate`]: CaseLifecycleService::validate
    /// [`close`]: CaseLifecycleService::close
    pub fn advance(
        &self,
        id: &CaseId,
        to_stage: &str,
        actor: &Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        if let Some(pending) = &case.pending_stage {
            return Err(TransitionError::ValidationPending {
                pending: pending.clone(),
            }
            .into());
        }

        let catalog = self.catalogs.catalog(case.variant);
        let current_order = catalog.order_of(&case.current_stage)?;
        let target = catalog.stage_at(to_stage)?;

        if target.code == case.current_stage {
            return Err(TransitionError::SameStage {
                stage: target.code.clone(),
            }
            .into());
        }
        if target.order != current_order + 1 {
            return Err(TransitionError::NotNextStage {
                from: case.current_stage.clone(),
                to: target.code.clone(),
            }
            .into());
        }

        let mut updated = case.clone();
        let base_note = if target.requires_validation {
            updated.pending_stage = Some(target.code.clone());
            updated.awaiting_validation_since = Some(now);
            format!("avanço para {} aguardando validação", target.code)
        } else {
            commit_stage(&mut updated, &target.code, now);
            format!("avanço para {}", target.code)
        };

        let saved = self.store.save(updated, case.version)?;
        self.append_audit(
            &saved,
            AuditAction::Advance,
            actor,
            compose_note(base_note, note),
            now,
        )?;
        Ok(saved)
    }

    /// Commits the stage change staged by a gated [`advance`].
    ///
    /// [`advance`]: CaseLifecycleService::advance
    pub fn validate(
        &self,
        id: &CaseId,
        actor: &Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        let pending = case
            .pending_stage
            .clone()
            .ok_or(TransitionError::NothingPending)?;

        let mut updated = case.clone();
        commit_stage(&mut updated, &pending, now);

        let saved = self.store.save(updated, case.version)?;
        self.append_audit(
            &saved,
            AuditAction::Validate,
            actor,
            compose_note(format!("validação do avanço para {pending}"), note),
            now,
        )?;
        Ok(saved)
    }

    /// Closes the case from any stage. A pending validation is cancelled and
    /// the cancellation recorded in the close entry's note, never dropped.
    pub fn close(
        &self,
        id: &CaseId,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        let mut note = format!("caso encerrado: {reason}");
        if let Some(pending) = &case.pending_stage {
            note.push_str(&format!("; validação pendente para {pending} cancelada"));
        }

        let mut updated = case.clone();
        updated.status = CaseStatus::Closed;
        updated.closed_at = Some(now);
        updated.pending_stage = None;
        updated.awaiting_validation_since = None;
        updated.stagnant = false;
        updated.stagnation_reason = None;

        let saved = self.store.save(updated, case.version)?;
        self.append_audit(&saved, AuditAction::Close, actor, note, now)?;
        Ok(saved)
    }

    /// Administrative correction: moves the case to any other catalog stage,
    /// backward or sideways included. Always audited as a correction so
    /// forward progress and corrections stay distinguishable in the trail.
    pub fn correct_stage(
        &self,
        id: &CaseId,
        to_stage: &str,
        actor: &Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        let target = self.catalogs.catalog(case.variant).stage_at(to_stage)?;
        if target.code == case.current_stage {
            return Err(TransitionError::SameStage {
                stage: target.code.clone(),
            }
            .into());
        }

        let mut base_note = format!(
            "correção administrativa de {} para {}",
            case.current_stage, target.code
        );
        if let Some(pending) = &case.pending_stage {
            base_note.push_str(&format!("; validação pendente para {pending} cancelada"));
        }

        let mut updated = case.clone();
        commit_stage(&mut updated, &target.code, now);

        let saved = self.store.save(updated, case.version)?;
        self.append_audit(
            &saved,
            AuditAction::Edit,
            actor,
            compose_note(base_note, note),
            now,
        )?;
        Ok(saved)
    }

    /// Sets or clears the per-case SLA override for the current stage.
    pub fn override_stage_sla(
        &self,
        id: &CaseId,
        days: Option<i64>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        let note = match days {
            Some(days) => format!(
                "prazo do estágio {} ajustado para {days} dias",
                case.current_stage
            ),
            None => format!("prazo padrão do estágio {} restaurado", case.current_stage),
        };

        let mut updated = case.clone();
        updated.sla_override_days = days;

        let saved = self.store.save(updated, case.version)?;
        self.append_audit(&saved, AuditAction::Edit, actor, note, now)?;
        Ok(saved)
    }

    /// Records work performed at the current stage without moving the stage.
    ///
    /// The case record is untouched, so registrations never contend with
    /// transitions on the version stamp.
    pub fn register_activity(
        &self,
        id: &CaseId,
        note: &str,
        evidence_refs: Vec<String>,
        supersedes: Option<u64>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<StageRegistration, CaseworkError> {
        let case = self.store.load(id)?;
        self.ensure_open(&case)?;

        let registration = StageRegistration {
            case_id: case.id.clone(),
            stage_code: case.current_stage.clone(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            note: note.to_string(),
            evidence_refs,
            supersedes,
            recorded_at: now,
            seq: 0,
        };

        Ok(self.store.append_registration(registration)?)
    }

    /// Recomputes the stagnation flag from the authoritative timestamps and
    /// persists it when it changed.
    ///
    /// Appends a stagnation audit entry only on the transition into
    /// stagnation; recomputing an already-stagnant case refreshes the day
    /// count without touching the trail, and recomputing with nothing elapsed
    /// is a complete no-op.
    pub fn recompute_stagnation(
        &self,
        id: &CaseId,
        now: DateTime<Utc>,
    ) -> Result<CaseRecord, CaseworkError> {
        let case = self.store.load(id)?;
        let outcome = stagnation::evaluate(&case, &self.catalogs, self.validation_sla_days, now)?;

        if case.stagnant == outcome.stagnant && case.stagnation_reason == outcome.reason {
            return Ok(case);
        }

        let newly_stagnant = outcome.stagnant && !case.stagnant;
        let mut updated = case.clone();
        updated.stagnant = outcome.stagnant;
        updated.stagnation_reason = outcome.reason;

        let saved = self.store.save(updated, case.version)?;
        if newly_stagnant {
            let reason = saved
                .stagnation_reason
                .as_ref()
                .map(StagnationReason::label)
                .unwrap_or_default();
            self.append_audit(&saved, AuditAction::Stagnate, actor_system(), reason, now)?;
        }
        Ok(saved)
    }

    pub fn case(&self, id: &CaseId) -> Result<CaseRecord, CaseworkError> {
        Ok(self.store.load(id)?)
    }

    pub fn audit_trail(&self, id: &CaseId) -> Result<Vec<AuditEntry>, CaseworkError> {
        Ok(self.store.audit_trail(id)?)
    }

    pub fn registrations(&self, id: &CaseId) -> Result<Vec<StageRegistration>, CaseworkError> {
        Ok(self.store.registrations(id)?)
    }

    /// Progress projection over both vocabularies for the presentation layer.
    pub fn board(&self, id: &CaseId, now: DateTime<Utc>) -> Result<CaseBoard, CaseworkError> {
        let case = self.store.load(id)?;
        Ok(board::case_board(
            &case,
            &self.catalogs,
            self.validation_sla_days,
            now,
        )?)
    }

    pub fn open_case_ids(&self) -> Result<Vec<CaseId>, CaseworkError> {
        Ok(self.store.open_case_ids()?)
    }

    fn ensure_open(&self, case: &CaseRecord) -> Result<(), TransitionError> {
        if case.is_open() {
            Ok(())
        } else {
            Err(TransitionError::CaseClosed {
                case: case.id.clone(),
            })
        }
    }

    fn append_audit(
        &self,
        case: &CaseRecord,
        action: AuditAction,
        actor: &Actor,
        note: String,
        now: DateTime<Utc>,
    ) -> Result<AuditEntry, StoreError> {
        self.store.append_audit(AuditEntry::new(
            case.id.clone(),
            case.current_stage.clone(),
            action,
            actor,
            Some(note),
            now,
        ))
    }
}

/// Applies a committed stage change and resets everything scoped to the
/// previous stage.
fn commit_stage(record: &mut CaseRecord, stage_code: &str, now: DateTime<Utc>) {
    record.current_stage = stage_code.to_string();
    record.stage_started_at = now;
    record.pending_stage = None;
    record.awaiting_validation_since = None;
    record.sla_override_days = None;
    record.stagnant = false;
    record.stagnation_reason = None;
}

fn compose_note(base: String, extra: Option<&str>) -> String {
    match extra {
        Some(extra) if !extra.trim().is_empty() => format!("{base}; {extra}"),
        _ => base,
    }
}

fn actor_system() -> &'static Actor {
    static SYSTEM: std::sync::OnceLock<Actor> = std::sync::OnceLock::new();
    SYSTEM.get_or_init(|| Actor::new("system", "Rotina de verificação de prazos"))
}
