use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::casework::catalog::{
    CatalogSet, CatalogVariant, StageCatalog, StageDefinition,
};
use crate::workflows::casework::domain::{Actor, AuditEntry, CaseId, CaseRecord, CaseStatus};
use crate::workflows::casework::mapping::StageMap;
use crate::workflows::casework::repository::{CaseStore, InMemoryCaseStore, StoreError};
use crate::workflows::casework::service::CaseLifecycleService;
use crate::workflows::casework::StageRegistration;

pub(super) const VALIDATION_SLA_DAYS: i64 = 5;

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days(n: i64) -> Duration {
    Duration::days(n)
}

pub(super) fn worker() -> Actor {
    Actor::new("tec-01", "Maria Souza")
}

pub(super) fn supervisor() -> Actor {
    Actor::new("sup-01", "João Lima")
}

pub(super) fn build_service() -> (
    Arc<CaseLifecycleService<InMemoryCaseStore>>,
    Arc<InMemoryCaseStore>,
) {
    let store = Arc::new(InMemoryCaseStore::new());
    let service = Arc::new(CaseLifecycleService::new(
        Arc::new(CatalogSet::builtin()),
        store.clone(),
        VALIDATION_SLA_DAYS,
    ));
    (service, store)
}

pub(super) fn stage(
    code: &str,
    order: u32,
    default_sla_days: i64,
    requires_validation: bool,
) -> StageDefinition {
    StageDefinition {
        code: code.to_string(),
        order,
        title: code.to_string(),
        description: String::new(),
        default_sla_days,
        requires_validation,
    }
}

/// Two-stage catalog pair mirroring the intake pilot: a 2-day triage window
/// followed by a long diagnostic window.
pub(super) fn triage_catalogs() -> CatalogSet {
    let operational = StageCatalog::new(
        CatalogVariant::Operational,
        vec![stage("TRIAGEM", 1, 2, false), stage("DIAGNOSTICO", 2, 15, false)],
    )
    .expect("pilot operational catalog is valid");

    let visual = StageCatalog::new(
        CatalogVariant::Visual,
        vec![stage("TRIAGEM", 1, 2, false), stage("DIAGNOSTICO", 2, 15, false)],
    )
    .expect("pilot visual catalog is valid");

    let mapping = StageMap::new(
        [
            ("TRIAGEM".to_string(), "TRIAGEM".to_string()),
            ("DIAGNOSTICO".to_string(), "DIAGNOSTICO".to_string()),
        ],
        "TRIAGEM".to_string(),
    );

    CatalogSet::new(2, operational, visual, mapping)
}

pub(super) fn triage_service() -> (
    Arc<CaseLifecycleService<InMemoryCaseStore>>,
    Arc<InMemoryCaseStore>,
) {
    let store = Arc::new(InMemoryCaseStore::new());
    let service = Arc::new(CaseLifecycleService::new(
        Arc::new(triage_catalogs()),
        store.clone(),
        VALIDATION_SLA_DAYS,
    ));
    (service, store)
}

/// Walks a fresh operational case up to CADASTRO, the stage before the gated
/// DIAGNOSTICO.
pub(super) fn open_case_at_cadastro(
    service: &CaseLifecycleService<InMemoryCaseStore>,
) -> CaseRecord {
    let actor = worker();
    let case = service
        .open(CatalogVariant::Operational, &actor, t0())
        .expect("case opens");
    service
        .advance(&case.id, "TRIAGEM", &actor, None, t0() + days(1))
        .expect("advance to triage");
    service
        .advance(&case.id, "CADASTRO", &actor, None, t0() + days(2))
        .expect("advance to registration")
}

/// Store wrapper that holds the first two loading threads at the same loaded
/// version so their saves genuinely contend. Later loads pass through.
pub(super) struct BarrierStore {
    inner: InMemoryCaseStore,
    barrier: Barrier,
    gated_loads: AtomicUsize,
}

impl BarrierStore {
    pub(super) fn new() -> Self {
        Self {
            inner: InMemoryCaseStore::new(),
            barrier: Barrier::new(2),
            gated_loads: AtomicUsize::new(0),
        }
    }
}

impl CaseStore for BarrierStore {
    fn insert(&self, record: CaseRecord) -> Result<CaseRecord, StoreError> {
        self.inner.insert(record)
    }

    fn load(&self, id: &CaseId) -> Result<CaseRecord, StoreError> {
        let gated = self.gated_loads.fetch_add(1, Ordering::SeqCst) < 2;
        let record = self.inner.load(id)?;
        if gated {
            self.barrier.wait();
        }
        Ok(record)
    }

    fn save(&self, record: CaseRecord, expected_version: u64) -> Result<CaseRecord, StoreError> {
        self.inner.save(record, expected_version)
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<AuditEntry, StoreError> {
        self.inner.append_audit(entry)
    }

    fn audit_trail(&self, id: &CaseId) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.audit_trail(id)
    }

    fn append_registration(
        &self,
        registration: StageRegistration,
    ) -> Result<StageRegistration, StoreError> {
        self.inner.append_registration(registration)
    }

    fn registrations(&self, id: &CaseId) -> Result<Vec<StageRegistration>, StoreError> {
        self.inner.registrations(id)
    }

    fn open_case_ids(&self) -> Result<Vec<CaseId>, StoreError> {
        self.inner.open_case_ids()
    }
}

pub(super) fn assert_open(record: &CaseRecord) {
    assert_eq!(record.status, CaseStatus::Open);
    assert!(record.closed_at.is_none());
}
