use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::CatalogVariant;

/// Identifier wrapper for cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity pair supplied by the caller; no authentication happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Closed,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "aberto",
            Self::Closed => "encerrado",
        }
    }
}

/// Why a case is flagged as stagnant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StagnationReason {
    /// The case sat in its current stage past the stage SLA.
    NoMovement { days: i64 },
    /// A staged transition waited for validation past the validation SLA.
    ValidationPending { days: i64 },
}

impl StagnationReason {
    pub fn label(&self) -> String {
        match self {
            Self::NoMovement { days } => {
                format!("sem movimentação há {days} dias")
            }
            Self::ValidationPending { days } => {
                format!("validação pendente há {days} dias")
            }
        }
    }
}

/// The mutable record for one case.
///
/// Mutated exclusively through [`CaseLifecycleService`]; never deleted —
/// closure is a terminal status, not removal. `version` is the
/// optimistic-concurrency stamp checked by [`CaseStore::save`].
///
/// [`CaseLifecycleService`]: super::service::CaseLifecycleService
/// [`CaseStore::save`]: super::repository::CaseStore::save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    pub variant: CatalogVariant,
    pub status: CaseStatus,
    pub current_stage: String,
    /// Target stage staged by `advance` while it waits for validation.
    pub pending_stage: Option<String>,
    pub stage_started_at: DateTime<Utc>,
    pub awaiting_validation_since: Option<DateTime<Utc>>,
    /// Per-case SLA override for the current stage; cleared on stage change.
    pub sla_override_days: Option<i64>,
    pub stagnant: bool,
    pub stagnation_reason: Option<StagnationReason>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl CaseRecord {
    pub fn is_open(&self) -> bool {
        self.status == CaseStatus::Open
    }

    /// True while a forward transition waits for a second actor to confirm.
    pub fn awaiting_validation(&self) -> bool {
        self.pending_stage.is_some()
    }
}

/// Lifecycle actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Open,
    Advance,
    Validate,
    Stagnate,
    Close,
    /// Administrative correction; the only action allowed to move a case
    /// backward or sideways.
    Edit,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "abertura",
            Self::Advance => "avanço",
            Self::Validate => "validação",
            Self::Stagnate => "estagnação",
            Self::Close => "encerramento",
            Self::Edit => "correção",
        }
    }
}

/// Append-only record of one action performed against a case.
///
/// Never updated or deleted after insertion. `seq` is the insertion sequence
/// assigned by the store; trail ordering is `(occurred_at, seq)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub case_id: CaseId,
    /// The authoritative stage at the moment the action was recorded.
    pub stage_at_time: String,
    pub action: AuditAction,
    pub actor_id: String,
    pub actor_name: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub seq: u64,
}

impl AuditEntry {
    pub fn new(
        case_id: CaseId,
        stage_at_time: impl Into<String>,
        action: AuditAction,
        actor: &Actor,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id,
            stage_at_time: stage_at_time.into(),
            action,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            note,
            occurred_at,
            seq: 0,
        }
    }
}

/// Evidence that work happened at a stage, without moving the stage.
///
/// The progress indicator and the operational record of work done are
/// deliberately decoupled: registering activity never advances the case.
/// Registrations are append-only; a mistaken one is superseded by a new
/// registration pointing at it, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRegistration {
    pub case_id: CaseId,
    pub stage_code: String,
    pub actor_id: String,
    pub actor_name: String,
    pub note: String,
    pub evidence_refs: Vec<String>,
    /// `seq` of an earlier registration this one replaces, if any.
    pub supersedes: Option<u64>,
    pub recorded_at: DateTime<Utc>,
    pub seq: u64,
}
