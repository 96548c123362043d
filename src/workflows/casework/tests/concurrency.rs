use std::sync::Arc;
use std::thread;

use super::common::{build_service, days, t0, worker, BarrierStore, VALIDATION_SLA_DAYS};
use crate::workflows::casework::catalog::{CatalogSet, CatalogVariant};
use crate::workflows::casework::repository::{CaseStore, StoreError};
use crate::workflows::casework::service::{CaseLifecycleService, CaseworkError};

#[test]
fn store_save_rejects_a_stale_version() {
    let (service, store) = build_service();
    let case = service
        .open(CatalogVariant::Operational, &worker(), t0())
        .expect("case opens");

    let loaded = store.load(&case.id).expect("case loads");
    store
        .save(loaded.clone(), loaded.version)
        .expect("first save wins");

    let stale = store.save(loaded.clone(), loaded.version);
    match stale {
        Err(StoreError::VersionConflict { expected, actual }) => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected a version conflict, got {other:?}"),
    }
}

#[test]
fn concurrent_advances_produce_one_winner_and_one_conflict() {
    let store = Arc::new(BarrierStore::new());
    let service = Arc::new(CaseLifecycleService::new(
        Arc::new(CatalogSet::builtin()),
        store,
        VALIDATION_SLA_DAYS,
    ));
    let actor = worker();
    let case = service
        .open(CatalogVariant::Operational, &actor, t0())
        .expect("case opens");

    // Both staff members read the case at the same version, then race their
    // transitions. The barrier in the store guarantees the interleaving.
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = Arc::clone(&service);
                let case_id = case.id.clone();
                let actor = actor.clone();
                scope.spawn(move || {
                    service.advance(&case_id, "TRIAGEM", &actor, None, t0() + days(1))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("advance thread finishes"))
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| {
            matches!(
                result,
                Err(CaseworkError::Store(StoreError::VersionConflict { .. }))
            )
        })
        .count();

    assert_eq!(successes, 1, "exactly one transition must win");
    assert_eq!(conflicts, 1, "the loser must see a detectable conflict");

    let settled = service.case(&case.id).expect("case reads");
    assert_eq!(settled.current_stage, "TRIAGEM");
    assert_eq!(settled.version, 2, "only the winner bumped the version");
}

#[test]
fn transitions_on_different_cases_are_independent() {
    let (service, _store) = build_service();
    let actor = worker();
    let first = service
        .open(CatalogVariant::Operational, &actor, t0())
        .expect("first case opens");
    let second = service
        .open(CatalogVariant::Operational, &actor, t0())
        .expect("second case opens");

    service
        .advance(&first.id, "TRIAGEM", &actor, None, t0() + days(1))
        .expect("first case advances");
    service
        .advance(&second.id, "TRIAGEM", &actor, None, t0() + days(1))
        .expect("second case advances untouched by the first");
}
