//! Case lifecycle and stage-workflow engine.
//!
//! Tracks a social-service case through an ordered sequence of stages,
//! enforces transition rules and validation gating, computes service-level
//! deadlines, reconciles the operational and visual stage vocabularies, and
//! records every action in an append-only audit trail.

pub mod board;
pub mod catalog;
pub mod domain;
pub mod mapping;
pub mod repository;
pub mod service;
pub mod stagnation;

#[cfg(test)]
mod tests;

pub use board::{CaseBoard, StageProgressEntry, StageProgressStatus};
pub use catalog::{CatalogError, CatalogSet, CatalogVariant, StageCatalog, StageDefinition};
pub use domain::{
    Actor, AuditAction, AuditEntry, CaseId, CaseRecord, CaseStatus, StageRegistration,
    StagnationReason,
};
pub use mapping::StageMap;
pub use repository::{CaseStore, InMemoryCaseStore, StoreError};
pub use service::{
    CaseLifecycleService, CaseworkError, TransitionError, DEFAULT_VALIDATION_SLA_DAYS,
};
pub use stagnation::StagnationOutcome;
