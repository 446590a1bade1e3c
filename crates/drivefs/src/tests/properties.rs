use crate::testing::{batch, delete, file, folder, upsert, with_parents};
use crate::{ChangeBatch, DriveFs, RawRecord};
use std::collections::HashSet;

fn history() -> Vec<ChangeBatch> {
    vec![
        batch(
            1,
            vec![
                upsert(1, folder("F1", "docs", "root")),
                upsert(2, folder("F2", "docs", "root")),
                upsert(3, file("E1", "report", "F1", 1)),
                upsert(4, file("E2", "report", "F1", 2)),
            ],
        ),
        batch(
            7,
            vec![
                upsert(5, file("E3", "report", "F1", 3)),
                upsert(6, with_parents(file("E4", "notes", "F1", 4), &["F1", "F2"])),
                upsert(7, folder("F3", "archive", "F2")),
            ],
        ),
        batch(
            9,
            vec![
                delete(8, "E1"),
                upsert(9, file("E2", "report", "F3", 20)),
            ],
        ),
        batch(12, vec![upsert(12, folder("F2", "shared", "root"))]),
    ]
}

/// Live records of `history()` in first-registration order
fn final_snapshot() -> Vec<RawRecord> {
    vec![
        folder("F1", "docs", "root"),
        folder("F2", "shared", "root"),
        file("E2", "report", "F3", 20),
        file("E3", "report", "F1", 3),
        with_parents(file("E4", "notes", "F1", 4), &["F1", "F2"]),
        folder("F3", "archive", "F2"),
    ]
}

const PATHS: &[&str] = &[
    "/docs",
    "/docs/report",
    "/docs/notes",
    "/shared",
    "/shared/notes",
    "/shared/archive",
    "/shared/archive/report",
];

#[test]
fn test_incremental_converges_with_rebuild() {
    let incremental = DriveFs::default();
    for b in history() {
        // Warm the binding cache between batches
        for p in PATHS {
            _ = incremental.stat(p);
        }
        assert!(incremental.apply(&b).unwrap().applied());
    }

    let rebuilt = DriveFs::default();
    _ = rebuilt.load_snapshot(&final_snapshot()).unwrap();

    for p in PATHS {
        assert_eq!(
            incremental.resolve_id(p).unwrap(),
            rebuilt.resolve_id(p).unwrap(),
            "diverged at {p}"
        );
    }
    assert_eq!(incremental.tree().unwrap(), rebuilt.tree().unwrap());
    assert_eq!(incremental.len().unwrap(), rebuilt.len().unwrap());
}

#[test]
fn test_refused_edge_converges_once_cycle_breaks() {
    let incremental = DriveFs::default();
    let batches = vec![
        batch(
            1,
            vec![
                upsert(1, folder("A", "a", "root")),
                upsert(1, folder("B", "b", "A")),
            ],
        ),
        // A under B would close a cycle while B sits under A
        batch(3, vec![upsert(3, with_parents(folder("A", "a", "root"), &["root", "B"]))]),
        batch(4, vec![upsert(4, folder("B", "b", "root"))]),
    ];
    let mut reports = Vec::new();
    for b in &batches {
        _ = incremental.stat("/a/b");
        reports.push(incremental.apply(b).unwrap());
    }
    assert_eq!(reports[1].dropped_edges.len(), 1);
    assert_eq!(reports[2].relinked_edges, 1);

    let rebuilt = DriveFs::default();
    _ = rebuilt
        .load_snapshot(&[
            with_parents(folder("A", "a", "root"), &["root", "B"]),
            folder("B", "b", "root"),
        ])
        .unwrap();

    for p in ["/a", "/b", "/b/a"] {
        assert_eq!(
            incremental.resolve_id(p).unwrap(),
            rebuilt.resolve_id(p).unwrap(),
            "diverged at {p}"
        );
    }
    assert_eq!(incremental.tree().unwrap(), rebuilt.tree().unwrap());
}

#[test]
fn test_duplicate_batch_is_noop() {
    let fs = DriveFs::default();
    let batches = history();
    _ = fs.apply(&batches[0]).unwrap();
    _ = fs.apply(&batches[1]).unwrap();
    let tree = fs.tree().unwrap();

    let again = fs.apply(&batches[1]).unwrap();
    assert!(!again.applied());
    assert_eq!(again.upserted + again.removed, 0);

    // An older batch is stale too, even though it would change things
    let older = fs.apply(&batch(3, vec![delete(3, "F1")])).unwrap();
    assert!(!older.applied());

    assert_eq!(fs.tree().unwrap(), tree);
    assert_eq!(fs.watermark().unwrap(), Some(7));
}

#[test]
fn test_suffix_assignment_is_stable() {
    let fs = DriveFs::default();
    let changes = (1..=5)
        .map(|i| upsert(i, file(&format!("E{i}"), "same", "root", i)))
        .collect();
    _ = fs.apply(&batch(5, changes)).unwrap();

    let first = fs.list_dir("/", 0).unwrap();
    let names: Vec<_> = first.iter().skip(2).cloned().collect();
    assert_eq!(names.iter().filter(|n| n.as_str() == "same").count(), 1);
    let distinct: HashSet<_> = names.iter().collect();
    assert_eq!(distinct.len(), 5);
    assert_eq!(names, vec!["same", "same-2", "same-3", "same-4", "same-5"]);

    let ids: Vec<_> = names
        .iter()
        .map(|n| fs.resolve_id(&format!("/{n}")).unwrap())
        .collect();

    // Unrelated mutation elsewhere must not reshuffle suffixes
    _ = fs
        .apply(&batch(6, vec![upsert(6, folder("F1", "other", "root"))]))
        .unwrap();
    for _ in 0..3 {
        let again = fs.list_dir("/", 0).unwrap();
        assert_eq!(&again[2..7], &first[2..]);
    }
    let ids_after: Vec<_> = names
        .iter()
        .map(|n| fs.resolve_id(&format!("/{n}")).unwrap())
        .collect();
    assert_eq!(ids, ids_after);
}
