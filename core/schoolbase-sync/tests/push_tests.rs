mod common;

use common::{ids, numbered, record, records};
use pretty_assertions::assert_eq;
use schoolbase_sync::{
    push_collection, stale_ids, MemoryRemoteStore, PushReport, RemoteOp, SyncConfig, SyncError,
};

fn config() -> SyncConfig {
    SyncConfig::default()
}

fn mutations(store: &MemoryRemoteStore) -> Vec<RemoteOp> {
    store
        .ops()
        .into_iter()
        .filter(|op| matches!(op, RemoteOp::Delete { .. } | RemoteOp::Upsert { .. }))
        .collect()
}

// ── Mirror ───────────────────────────────────────────────────────

#[tokio::test]
async fn push_deletes_stale_then_upserts_local() {
    let store = MemoryRemoteStore::new();
    store.seed("students", vec![record("S1", "A"), record("S3", "C")]);

    let local = vec![record("S1", "A"), record("S2", "B")];
    let report = push_collection(&store, "students", &local, &config())
        .await
        .unwrap();

    assert_eq!(
        report,
        PushReport {
            table: "students".into(),
            remote_before: 2,
            deleted: 1,
            upserted: 2,
            delete_batches: 1,
            upsert_batches: 1,
        }
    );
    assert_eq!(store.records("students"), local);
    assert_eq!(
        mutations(&store),
        vec![
            RemoteOp::Delete {
                table: "students".into(),
                ids: vec!["S3".into()],
            },
            RemoteOp::Upsert {
                table: "students".into(),
                ids: vec!["S1".into(), "S2".into()],
            },
        ]
    );
}

#[tokio::test]
async fn upsert_overwrites_changed_fields() {
    let store = MemoryRemoteStore::new();
    store.seed("teachers", vec![record("T1", "Old name")]);

    push_collection(&store, "teachers", &[record("T1", "New name")], &config())
        .await
        .unwrap();

    assert_eq!(store.records("teachers"), vec![record("T1", "New name")]);
}

#[tokio::test]
async fn empty_local_state_clears_remote() {
    let store = MemoryRemoteStore::new();
    store.seed("fee_payments", records(&["F1", "F2", "F3"]));

    let report = push_collection(&store, "fee_payments", &[], &config())
        .await
        .unwrap();

    assert_eq!(report.deleted, 3);
    assert_eq!(report.upserted, 0);
    assert_eq!(report.upsert_batches, 0);
    assert!(store.ids("fee_payments").is_empty());
}

#[tokio::test]
async fn push_into_empty_table_only_upserts() {
    let store = MemoryRemoteStore::new();

    let report = push_collection(&store, "subjects", &records(&["M", "E"]), &config())
        .await
        .unwrap();

    assert_eq!(report.remote_before, 0);
    assert_eq!(report.delete_batches, 0);
    assert_eq!(store.ids("subjects"), vec!["E", "M"]);
}

#[tokio::test]
async fn repeating_a_push_is_idempotent() {
    let store = MemoryRemoteStore::new();
    store.seed("classes", records(&["C1", "C9"]));
    let local = records(&["C1", "C2"]);

    push_collection(&store, "classes", &local, &config())
        .await
        .unwrap();
    let after_first = store.records("classes");

    let second = push_collection(&store, "classes", &local, &config())
        .await
        .unwrap();

    assert_eq!(store.records("classes"), after_first);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.upserted, 2);
}

#[tokio::test]
async fn other_tables_are_untouched() {
    let store = MemoryRemoteStore::new();
    store.seed("students", records(&["S1"]));
    store.seed("teachers", records(&["T1"]));

    push_collection(&store, "students", &[], &config())
        .await
        .unwrap();

    assert_eq!(store.ids("teachers"), vec!["T1"]);
}

// ── Batching ─────────────────────────────────────────────────────

#[tokio::test]
async fn deletes_go_out_in_batches_of_one_hundred() {
    let store = MemoryRemoteStore::new();
    store.seed("attendance", numbered("A", 250));

    let report = push_collection(&store, "attendance", &[], &config())
        .await
        .unwrap();

    assert_eq!(report.deleted, 250);
    assert_eq!(report.delete_batches, 3);
    let sizes: Vec<usize> = mutations(&store)
        .into_iter()
        .map(|op| match op {
            RemoteOp::Delete { ids, .. } => ids.len(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);
}

#[tokio::test]
async fn upserts_go_out_in_batches_of_five_hundred() {
    let store = MemoryRemoteStore::new();
    let local = numbered("M", 1200);

    let report = push_collection(&store, "student_marks", &local, &config())
        .await
        .unwrap();

    assert_eq!(report.upserted, 1200);
    assert_eq!(report.upsert_batches, 3);
    let sizes: Vec<usize> = mutations(&store)
        .into_iter()
        .map(|op| match op {
            RemoteOp::Upsert { ids, .. } => ids.len(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(sizes, vec![500, 500, 200]);
    assert_eq!(store.ids("student_marks"), ids(&local));
}

#[tokio::test]
async fn id_scan_covers_tables_larger_than_one_page() {
    let store = MemoryRemoteStore::new();
    store.seed("attendance", numbered("A", 2500));
    let keep = numbered("A", 2500)[..10].to_vec();

    let report = push_collection(&store, "attendance", &keep, &config())
        .await
        .unwrap();

    assert_eq!(report.remote_before, 2500);
    assert_eq!(report.deleted, 2490);
    assert_eq!(store.ids("attendance").len(), 10);
}

#[tokio::test]
async fn small_batch_sizes_are_honoured() {
    let store = MemoryRemoteStore::new();
    store.seed("books", numbered("B", 5));
    let cfg = SyncConfig {
        page_size: 2,
        delete_batch_size: 2,
        upsert_batch_size: 3,
        ..Default::default()
    };

    let report = push_collection(&store, "books", &numbered("N", 4), &cfg)
        .await
        .unwrap();

    assert_eq!(report.delete_batches, 3);
    assert_eq!(report.upsert_batches, 2);
    assert_eq!(store.ids("books"), ids(&numbered("N", 4)));
}

// ── Duplicates ───────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_local_ids_collapse_to_the_last_record() {
    let store = MemoryRemoteStore::new();
    let local = vec![record("S1", "first"), record("S2", "B"), record("S1", "second")];

    let report = push_collection(&store, "students", &local, &config())
        .await
        .unwrap();

    assert_eq!(report.upserted, 2);
    assert_eq!(
        store.records("students"),
        vec![record("S1", "second"), record("S2", "B")]
    );
}

#[test]
fn stale_ids_keeps_remote_order_without_repeats() {
    let remote: Vec<String> = ["R3", "S1", "R1", "R3"].iter().map(|s| s.to_string()).collect();
    let local = records(&["S1", "S2"]);

    assert_eq!(stale_ids(&remote, &local), vec!["R3", "R1"]);
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn failed_upsert_batch_keeps_earlier_batches_and_retry_converges() {
    let store = MemoryRemoteStore::new();
    store.seed("student_marks", records(&["OLD"]));
    let local = numbered("M", 1200);
    store.fail_upserts_after(1);

    let err = push_collection(&store, "student_marks", &local, &config())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));

    // Stale delete and the first batch landed; the rest did not.
    let partial = store.ids("student_marks");
    assert_eq!(partial.len(), 500);
    assert!(!partial.contains(&"OLD".to_string()));

    store.clear_faults();
    push_collection(&store, "student_marks", &local, &config())
        .await
        .unwrap();
    assert_eq!(store.ids("student_marks"), ids(&local));
}

#[tokio::test]
async fn failed_delete_stops_before_any_upsert() {
    let store = MemoryRemoteStore::new();
    store.seed("students", records(&["S9"]));
    store.fail_deletes_after(0);

    let result = push_collection(&store, "students", &records(&["S1"]), &config()).await;

    assert!(result.is_err());
    assert!(!store
        .ops()
        .iter()
        .any(|op| matches!(op, RemoteOp::Upsert { .. })));
    assert_eq!(store.ids("students"), vec!["S9"]);
}

#[tokio::test]
async fn failed_id_scan_changes_nothing() {
    let store = MemoryRemoteStore::new();
    store.seed("students", records(&["S9"]));
    store.fail_fetches();

    let result = push_collection(&store, "students", &[], &config()).await;

    assert!(result.is_err());
    assert!(mutations(&store).is_empty());
    assert_eq!(store.ids("students"), vec!["S9"]);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_call() {
    let store = MemoryRemoteStore::new();
    let cfg = SyncConfig {
        upsert_batch_size: 0,
        ..Default::default()
    };

    let err = push_collection(&store, "students", &records(&["S1"]), &cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Config(_)));
    assert!(store.ops().is_empty());
}
