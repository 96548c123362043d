use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::{CatalogError, CatalogSet, CatalogVariant, StageCatalog};
use super::domain::{CaseId, CaseRecord, CaseStatus, StagnationReason};
use super::stagnation;

/// Display status of one stage relative to the case's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageProgressStatus {
    Done,
    Current,
    NotStarted,
}

impl StageProgressStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Done => "concluído",
            Self::Current => "atual",
            Self::NotStarted => "não iniciado",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageProgressEntry {
    pub code: String,
    pub title: String,
    pub status: StageProgressStatus,
    pub status_label: &'static str,
}

/// Serializable projection of one case for the presentation layer.
///
/// Carries the authoritative progress over the case's own catalog and the
/// reconciled view over the simplified vocabulary. The stagnation fields are
/// evaluated live at `now` rather than read from the record, so the board
/// never shows a stale flag; persisting flags stays the recompute's job.
#[derive(Debug, Clone, Serialize)]
pub struct CaseBoard {
    pub case_id: CaseId,
    pub status: CaseStatus,
    pub status_label: &'static str,
    pub current_stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_stage: Option<String>,
    pub days_in_stage: i64,
    pub stagnant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagnation_reason: Option<StagnationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stagnation_reason_label: Option<String>,
    pub stages: Vec<StageProgressEntry>,
    pub simplified: Vec<StageProgressEntry>,
}

/// `order < current` is done, `== current` is current, `> current` is not
/// started.
fn progress(
    catalog: &StageCatalog,
    current_code: &str,
) -> Result<Vec<StageProgressEntry>, CatalogError> {
    let current_order = catalog.order_of(current_code)?;

    Ok(catalog
        .stages()
        .iter()
        .map(|stage| {
            let status = match stage.order.cmp(&current_order) {
                Ordering::Less => StageProgressStatus::Done,
                Ordering::Equal => StageProgressStatus::Current,
                Ordering::Greater => StageProgressStatus::NotStarted,
            };
            StageProgressEntry {
                code: stage.code.clone(),
                title: stage.title.clone(),
                status,
                status_label: status.label(),
            }
        })
        .collect())
}

pub fn case_board(
    case: &CaseRecord,
    catalogs: &CatalogSet,
    validation_sla_days: i64,
    now: DateTime<Utc>,
) -> Result<CaseBoard, CatalogError> {
    let stages = progress(catalogs.catalog(case.variant), &case.current_stage)?;

    let simplified_code = match case.variant {
        CatalogVariant::Operational => catalogs
            .mapping()
            .to_simplified(&case.current_stage)
            .to_string(),
        CatalogVariant::Visual => case.current_stage.clone(),
    };
    let simplified = progress(catalogs.visual(), &simplified_code)?;

    let outcome = stagnation::evaluate(case, catalogs, validation_sla_days, now)?;

    Ok(CaseBoard {
        case_id: case.id.clone(),
        status: case.status,
        status_label: case.status.label(),
        current_stage: case.current_stage.clone(),
        pending_stage: case.pending_stage.clone(),
        days_in_stage: (now - case.stage_started_at).num_days(),
        stagnant: outcome.stagnant,
        stagnation_reason: outcome.reason,
        stagnation_reason_label: outcome.reason.map(|reason| reason.label()),
        stages,
        simplified,
    })
}
