//! Full repair pipeline against an on-disk SQLite store.

use chrono::{NaiveDate, TimeZone, Utc};
use sprintdash_core::db;
use sprintdash_core::error::{ErrorCode, code_of};
use sprintdash_core::import::{SprintDump, import_dump, parse_dump};
use sprintdash_core::model::{SnapshotCounts, Sprint, WorkItem};
use sprintdash_core::reconcile::burndown::load_burndown;
use sprintdash_core::reconcile::fix_counts::fix_snapshot_counts;
use sprintdash_core::reconcile::rebuild::rebuild_snapshots;
use sprintdash_core::reconcile::validate::validate_snapshots;
use sprintdash_core::reconcile::{ReconcileOptions, SkipReason, resolve_targets};
use sprintdash_core::store::{SnapshotStore, SqliteStore};
use tempfile::TempDir;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn seeded_store(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join(".sprintdash").join("sprintdash.db");
    let store = SqliteStore::new(db::create_store(&path).unwrap());

    let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();
    let dump = SprintDump {
        sprints: vec![
            Sprint::new("s-1", "Sprint 1", "Apollo").with_dates(date(1), date(14)),
            Sprint::new("s-2", "Sprint 2", "Apollo"),
        ],
        work_items: vec![
            WorkItem::new(1, "s-1", at(1, 9)),
            WorkItem::new(2, "s-1", at(1, 9)).activated_at(at(2, 10)),
            WorkItem::new(3, "s-1", at(1, 9))
                .activated_at(at(2, 10))
                .closed_at(at(3, 23)),
            WorkItem::new(4, "s-1", at(1, 9)).removed(),
        ],
        snapshots: Vec::new(),
    };
    import_dump(&store, &dump).unwrap();

    for (day, counts) in [
        (1, SnapshotCounts::default()),
        (2, SnapshotCounts::default()),
        (3, SnapshotCounts::new(1, 2, 0)),
        (4, SnapshotCounts::new(1, 1, 2)),
    ] {
        store.upsert_snapshot("s-1", date(day), counts).unwrap();
    }
    store
        .upsert_snapshot("s-2", date(1), SnapshotCounts::default())
        .unwrap();
    store
}

#[test]
fn fix_then_rebuild_then_validate() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let targets = resolve_targets(&store, &[]).unwrap();
    assert_eq!(targets, vec!["s-1".to_string(), "s-2".to_string()]);

    let before = validate_snapshots(&store, &targets).unwrap();
    assert!(!before.is_ok());

    let fix = fix_snapshot_counts(&mut store, &targets, ReconcileOptions::default()).unwrap();
    assert_eq!(fix.snapshots_fixed(), 2);
    assert_eq!(fix.sprints[1].skipped, Some(SkipReason::NoReferenceSnapshot));
    let snaps = store.snapshots("s-1").unwrap();
    assert_eq!(snaps[0].counts, SnapshotCounts::all_todo(3));
    assert_eq!(snaps[1].counts, SnapshotCounts::all_todo(3));

    let rebuild = rebuild_snapshots(&mut store, &targets, ReconcileOptions::default()).unwrap();
    assert_eq!(rebuild.sprints[0].work_item_count, 3);
    let snaps = store.snapshots("s-1").unwrap();
    let triples: Vec<SnapshotCounts> = snaps.iter().map(|s| s.counts).collect();
    assert_eq!(
        triples,
        vec![
            SnapshotCounts::new(3, 0, 0),
            SnapshotCounts::new(1, 2, 0),
            SnapshotCounts::new(1, 1, 1),
            SnapshotCounts::new(1, 1, 1),
        ]
    );

    let after = validate_snapshots(&store, &targets).unwrap();
    assert!(after.is_ok());
    assert_eq!(after.checked_count(), 4);

    let burndown = load_burndown(&store, "s-1").unwrap().unwrap();
    assert_eq!(burndown.points.last().unwrap().remaining, 2);
}

#[test]
fn store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".sprintdash").join("sprintdash.db");
    {
        let mut store = seeded_store(&dir);
        let targets = vec!["s-1".to_string()];
        fix_snapshot_counts(&mut store, &targets, ReconcileOptions::default()).unwrap();
    }

    let store = SqliteStore::new(db::open_store(&path).unwrap());
    assert_eq!(
        store.snapshots("s-1").unwrap()[0].counts,
        SnapshotCounts::all_todo(3)
    );
}

#[test]
fn opening_a_missing_store_is_not_initialized() {
    let dir = TempDir::new().unwrap();
    let err = db::open_store(&dir.path().join("nope.db")).unwrap_err();
    assert_eq!(code_of(&err), Some(ErrorCode::NotInitialized));
}

#[test]
fn json_dump_round_trips_through_the_store() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(db::create_store(&dir.path().join("s.db")).unwrap());
    let dump = parse_dump(
        r#"{
            "sprints": [{ "id": "s-9", "name": "Sprint 9", "project": "Hermes" }],
            "work_items": [{ "id": 90, "sprint_id": "s-9",
                             "created_date": "2024-05-01T00:00:00Z",
                             "closed_date": "2024-05-02T12:00:00Z" }],
            "snapshots": [{ "sprint_id": "s-9", "snapshot_date": "2024-05-02",
                            "todo": 1, "in_progress": 0, "done": 0 }]
        }"#
        .as_bytes(),
    )
    .unwrap();
    import_dump(&store, &dump).unwrap();

    let mut store = store;
    let report =
        rebuild_snapshots(&mut store, &["s-9".to_string()], ReconcileOptions::default()).unwrap();
    assert_eq!(report.snapshots_updated(), 1);
    assert_eq!(
        store.snapshots("s-9").unwrap()[0].counts,
        SnapshotCounts::new(0, 0, 1)
    );
}
