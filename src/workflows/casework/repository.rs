use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{AuditEntry, CaseId, CaseRecord, StageRegistration};

/// Storage abstraction so the lifecycle service can be exercised in isolation.
///
/// The engine is agnostic to what sits behind this trait — a relational
/// database, a document store, or the in-memory map below for tests and the
/// sweep binary. Audit entries and registrations are append-only; `save`
/// carries the optimistic-concurrency check.
pub trait CaseStore: Send + Sync {
    fn insert(&self, record: CaseRecord) -> Result<CaseRecord, StoreError>;

    fn load(&self, id: &CaseId) -> Result<CaseRecord, StoreError>;

    /// Persists `record` only if the stored version still equals
    /// `expected_version`, bumping the version on success. A mismatch means a
    /// concurrent transition won the race; the caller must reload and decide,
    /// the store never merges.
    fn save(&self, record: CaseRecord, expected_version: u64) -> Result<CaseRecord, StoreError>;

    /// Appends an audit entry, returning it stamped with its insertion `seq`.
    fn append_audit(&self, entry: AuditEntry) -> Result<AuditEntry, StoreError>;

    /// The full trail for a case, ordered by `(occurred_at, seq)`.
    fn audit_trail(&self, id: &CaseId) -> Result<Vec<AuditEntry>, StoreError>;

    fn append_registration(
        &self,
        registration: StageRegistration,
    ) -> Result<StageRegistration, StoreError>;

    fn registrations(&self, id: &CaseId) -> Result<Vec<StageRegistration>, StoreError>;

    /// Identities of every open case, for the stagnation sweep.
    fn open_case_ids(&self) -> Result<Vec<CaseId>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("case already exists")]
    AlreadyExists,
    #[error("case not found")]
    NotFound,
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
struct MemoryState {
    cases: HashMap<CaseId, CaseRecord>,
    audit: Vec<AuditEntry>,
    registrations: Vec<StageRegistration>,
}

/// Thread-safe in-memory [`CaseStore`] for tests and the sweep binary.
#[derive(Default, Clone)]
pub struct InMemoryCaseStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaseStore for InMemoryCaseStore {
    fn insert(&self, record: CaseRecord) -> Result<CaseRecord, StoreError> {
        let mut state = self.state.lock().expect("case store mutex poisoned");
        if state.cases.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists);
        }
        state.cases.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn load(&self, id: &CaseId) -> Result<CaseRecord, StoreError> {
        let state = self.state.lock().expect("case store mutex poisoned");
        state.cases.get(id).cloned().ok_or(StoreError::NotFound)
    }

    fn save(&self, mut record: CaseRecord, expected_version: u64) -> Result<CaseRecord, StoreError> {
        let mut state = self.state.lock().expect("case store mutex poisoned");
        let stored = state.cases.get(&record.id).ok_or(StoreError::NotFound)?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }

        record.version = expected_version + 1;
        state.cases.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn append_audit(&self, mut entry: AuditEntry) -> Result<AuditEntry, StoreError> {
        let mut state = self.state.lock().expect("case store mutex poisoned");
        entry.seq = state.audit.len() as u64 + 1;
        state.audit.push(entry.clone());
        Ok(entry)
    }

    fn audit_trail(&self, id: &CaseId) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.state.lock().expect("case store mutex poisoned");
        let mut trail: Vec<AuditEntry> = state
            .audit
            .iter()
            .filter(|entry| &entry.case_id == id)
            .cloned()
            .collect();
        trail.sort_by(|a, b| (a.occurred_at, a.seq).cmp(&(b.occurred_at, b.seq)));
        Ok(trail)
    }

    fn append_registration(
        &self,
        mut registration: StageRegistration,
    ) -> Result<StageRegistration, StoreError> {
        let mut state = self.state.lock().expect("case store mutex poisoned");
        registration.seq = state.registrations.len() as u64 + 1;
        state.registrations.push(registration.clone());
        Ok(registration)
    }

    fn registrations(&self, id: &CaseId) -> Result<Vec<StageRegistration>, StoreError> {
        let state = self.state.lock().expect("case store mutex poisoned");
        Ok(state
            .registrations
            .iter()
            .filter(|registration| &registration.case_id == id)
            .cloned()
            .collect())
    }

    fn open_case_ids(&self) -> Result<Vec<CaseId>, StoreError> {
        let state = self.state.lock().expect("case store mutex poisoned");
        let mut ids: Vec<CaseId> = state
            .cases
            .values()
            .filter(|record| record.is_open())
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
