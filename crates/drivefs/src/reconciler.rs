// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Change Reconciler: applies watermark-ordered batches to the registry and graph

use crate::cache::CacheState;
use crate::entry::{Entry, EntryId, RawRecord};
use crate::error::{Error, Result};
use crate::graph::{EdgeDelta, GraphIndex};
use crate::proxy::{ChangePage, RawChange};
use crate::registry::{EntryRegistry, Upsert};
use std::collections::HashSet;

/// One object-level change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub change_id: u64,
    pub object_id: EntryId,
    pub deleted: bool,
    pub record: Option<RawRecord>,
}

impl Change {
    pub fn from_raw(change_id: u64, raw: RawChange) -> Self {
        Self {
            change_id,
            object_id: EntryId::new(raw.object_id),
            deleted: raw.deleted,
            record: raw.record,
        }
    }
}

/// Changes applied atomically under one watermark
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub change_id: u64,
    /// Ascending by change id
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new(change_id: u64, mut changes: Vec<Change>) -> Self {
        changes.sort_by_key(|c| c.change_id);
        Self { change_id, changes }
    }
}

impl From<ChangePage> for ChangeBatch {
    /// The watermark is the page's largest change id, or the feed's for an empty page.
    fn from(page: ChangePage) -> Self {
        let change_id = page
            .changes
            .keys()
            .next_back()
            .copied()
            .unwrap_or(page.largest_change_id);
        let changes = page
            .changes
            .into_iter()
            .map(|(id, raw)| Change::from_raw(id, raw))
            .collect();
        Self::new(change_id, changes)
    }
}

/// What an apply did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub change_id: u64,
    /// Set when the batch was at or below the watermark and skipped
    pub stale: Option<Error>,
    pub upserted: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Records that could not be converted
    pub skipped: Vec<Error>,
    /// Edges refused for closing a parent cycle
    pub dropped_edges: Vec<Error>,
    /// Previously refused edges linked because their cycle is gone
    pub relinked_edges: usize,
    /// Changed ids plus their old and new parents
    pub touched: HashSet<EntryId>,
}

impl ApplyReport {
    #[must_use]
    pub fn applied(&self) -> bool {
        self.stale.is_none()
    }

    fn note_delta(&mut self, delta: EdgeDelta) {
        self.dropped_edges.extend(delta.dropped);
    }
}

/// Result of building state from a full listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub entries: usize,
    pub skipped: Vec<Error>,
    pub dropped_edges: Vec<Error>,
}

enum Op {
    Remove(EntryId),
    Upsert(Entry),
}

/// Converts one change into an operation. `Ok(None)` means nothing to do.
fn prepare(change: &Change, root: &EntryId) -> Result<Option<Op>> {
    if &change.object_id == root {
        diagnostics::log_warn!(
            "Ignoring change {change_id} to the root entry",
            change_id: change.change_id
        );
        return Ok(None);
    }
    if change.deleted {
        return Ok(Some(Op::Remove(change.object_id.clone())));
    }
    let Some(record) = &change.record else {
        diagnostics::log_warn!(
            "Change {change_id} for {id} carries no record",
            change_id: change.change_id,
            id: change.object_id.as_str()
        );
        return Ok(None);
    };
    if record.id != change.object_id.as_str() {
        return Err(Error::invalid_record(
            change.object_id.as_str(),
            format!("record id {} does not match the change", record.id),
        ));
    }
    if record.is_trashed() {
        return Ok(Some(Op::Remove(change.object_id.clone())));
    }
    Ok(Some(Op::Upsert(record.to_entry(root)?)))
}

fn self_parent_violation(id: &EntryId) -> Error {
    diagnostics::log_error!(
        "Entry {id} lists itself as its own parent",
        id: id.as_str()
    );
    Error::internal(format!("entry {id} lists itself as a parent"))
}

/// Applies a batch. Stale batches are reported, not applied.
///
/// The whole batch is validated before anything is mutated, so an invariant
/// violation leaves the state exactly as it was.
pub fn apply_batch(state: &mut CacheState, batch: &ChangeBatch) -> Result<ApplyReport> {
    let mut report = ApplyReport {
        change_id: batch.change_id,
        ..ApplyReport::default()
    };

    if let Some(watermark) = state.watermark {
        if batch.change_id <= watermark {
            diagnostics::log_warn!(
                "Skipping stale batch {change_id} at watermark {watermark}",
                change_id: batch.change_id,
                watermark: watermark
            );
            report.stale = Some(Error::StaleBatch {
                change_id: batch.change_id,
                watermark,
            });
            return Ok(report);
        }
    }

    let root = state.root_id().clone();
    let mut ops = Vec::with_capacity(batch.changes.len());
    for change in &batch.changes {
        match prepare(change, &root) {
            Ok(Some(op)) => ops.push(op),
            Ok(None) => report.unchanged += 1,
            Err(e) => {
                diagnostics::log_warn!("Skipping change: {error}", error: e.to_string());
                report.skipped.push(e);
            }
        }
    }

    if let Some(Op::Upsert(bad)) = ops
        .iter()
        .find(|op| matches!(op, Op::Upsert(e) if e.references_self()))
    {
        return Err(self_parent_violation(&bad.id));
    }

    for op in ops {
        match op {
            Op::Remove(id) => remove_entry(state, &id, &mut report),
            Op::Upsert(entry) => upsert_entry(state, entry, &mut report)?,
        }
    }

    let relinked = state.graph.retry_deferred();
    for (child, parent) in &relinked.added {
        _ = report.touched.insert(child.clone());
        _ = report.touched.insert(parent.clone());
    }
    report.relinked_edges = relinked.added.len();

    state.watermark = Some(batch.change_id);
    diagnostics::log_info!(
        "Applied batch {change_id}: {upserted} upserted, {removed} removed, {unchanged} unchanged, {deferred} edges deferred",
        change_id: batch.change_id,
        upserted: report.upserted,
        removed: report.removed,
        unchanged: report.unchanged,
        deferred: state.graph.deferred_len()
    );
    Ok(report)
}

fn remove_entry(state: &mut CacheState, id: &EntryId, report: &mut ApplyReport) {
    match state.registry.remove(id.as_str()) {
        Ok(removed) => {
            let delta = state.graph.on_entry_changed(Some(&removed.entry), None, removed.seq);
            report.note_delta(delta);
            _ = report.touched.insert(id.clone());
            report
                .touched
                .extend(removed.entry.parent_ids.iter().cloned());
            report.removed += 1;
        }
        Err(_) => {
            // Deleted before we ever saw it
            report.unchanged += 1;
        }
    }
}

fn upsert_entry(state: &mut CacheState, entry: Entry, report: &mut ApplyReport) -> Result<()> {
    let id = entry.id.clone();
    let parents: Vec<EntryId> = entry.parent_ids.iter().cloned().collect();
    let outcome = state.registry.upsert(entry)?;
    let current = state.registry.get(id.as_str())?;

    let delta = match &outcome {
        Upsert::Inserted { seq } => state.graph.on_entry_changed(None, Some(&current), *seq),
        Upsert::Updated { seq, previous } => {
            report.touched.extend(previous.parent_ids.iter().cloned());
            state
                .graph
                .on_entry_changed(Some(previous), Some(&current), *seq)
        }
        Upsert::Unchanged => {
            report.unchanged += 1;
            return Ok(());
        }
    };
    report.note_delta(delta);
    _ = report.touched.insert(id);
    report.touched.extend(parents);
    report.upserted += 1;
    Ok(())
}

/// Builds complete state from a full listing, off any lock.
pub fn build_snapshot(root: EntryId, records: &[RawRecord]) -> Result<(CacheState, SnapshotReport)> {
    let mut report = SnapshotReport::default();
    let mut registry = EntryRegistry::new(root.clone());

    for record in records {
        if record.id == root.as_str() || record.is_trashed() {
            continue;
        }
        let entry = match record.to_entry(&root) {
            Ok(entry) => entry,
            Err(e) => {
                diagnostics::log_warn!("Skipping record: {error}", error: e.to_string());
                report.skipped.push(e);
                continue;
            }
        };
        if entry.references_self() {
            return Err(self_parent_violation(&entry.id));
        }
        _ = registry.upsert(entry)?;
    }

    let (graph, delta) = GraphIndex::rebuild(&registry);
    report.entries = registry.len() - 1;
    report.dropped_edges = delta.dropped;

    let state = CacheState {
        registry,
        graph,
        watermark: None,
    };
    Ok((state, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{batch, delete, file, folder, upsert};

    fn state() -> CacheState {
        CacheState::new(EntryId::new("root"))
    }

    #[test]
    fn test_batch_from_page_uses_largest_key() {
        let mut page = ChangePage {
            largest_change_id: 40,
            ..ChangePage::default()
        };
        assert_eq!(ChangeBatch::from(page.clone()).change_id, 40);

        _ = page.changes.insert(
            12,
            RawChange {
                object_id: "E1".to_string(),
                deleted: true,
                record: None,
            },
        );
        _ = page.changes.insert(
            9,
            RawChange {
                object_id: "E2".to_string(),
                deleted: true,
                record: None,
            },
        );
        let b = ChangeBatch::from(page);
        assert_eq!(b.change_id, 12);
        assert_eq!(b.changes[0].change_id, 9);
    }

    #[test]
    fn test_apply_and_stale() {
        let mut s = state();
        let b = batch(1, vec![upsert(1, folder("F1", "docs", "root"))]);

        let r = apply_batch(&mut s, &b).unwrap();
        assert!(r.applied());
        assert_eq!(r.upserted, 1);
        assert!(r.touched.contains("F1") && r.touched.contains("root"));
        assert_eq!(s.watermark, Some(1));

        let again = apply_batch(&mut s, &b).unwrap();
        assert_eq!(
            again.stale,
            Some(Error::StaleBatch {
                change_id: 1,
                watermark: 1
            })
        );
        assert_eq!(again.upserted, 0);
    }

    #[test]
    fn test_self_parent_rejects_whole_batch() {
        let mut s = state();
        let b = batch(
            3,
            vec![
                upsert(1, folder("F1", "docs", "root")),
                upsert(2, folder("F2", "loop", "F2")),
            ],
        );
        let err = apply_batch(&mut s, &b).unwrap_err();
        assert!(err.is_fatal());
        assert!(s.registry.get("F1").is_err());
        assert_eq!(s.watermark, None);
    }

    #[test]
    fn test_trashed_and_unknown_deletes() {
        let mut s = state();
        _ = apply_batch(&mut s, &batch(1, vec![upsert(1, file("E1", "a", "root", 3))])).unwrap();

        let mut trashed = file("E1", "a", "root", 3);
        trashed.labels.trashed = true;
        let r = apply_batch(
            &mut s,
            &batch(2, vec![upsert(2, trashed), delete(3, "never-seen")]),
        )
        .unwrap();
        assert_eq!(r.removed, 1);
        assert_eq!(r.unchanged, 1);
        assert!(s.registry.get("E1").is_err());
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let mut s = state();
        let mut bad = file("E1", "a", "root", 1);
        bad.modified_date = Some("not a date".to_string());
        let r = apply_batch(
            &mut s,
            &batch(1, vec![upsert(1, bad), upsert(2, file("E2", "b", "root", 1))]),
        )
        .unwrap();
        assert_eq!(r.skipped.len(), 1);
        assert_eq!(r.upserted, 1);
        assert!(s.registry.get("E2").is_ok());
    }

    #[test]
    fn test_snapshot_build() {
        let records = vec![
            folder("F1", "docs", "root"),
            file("E1", "a.txt", "F1", 10),
            file("E2", "b.txt", "gone", 1),
        ];
        let (s, report) = build_snapshot(EntryId::new("root"), &records).unwrap();
        assert_eq!(report.entries, 3);
        assert_eq!(s.graph.children_of("F1"), vec![EntryId::new("E1")]);
        assert_eq!(s.graph.children_of("gone"), vec![EntryId::new("E2")]);
        assert_eq!(s.watermark, None);
    }
}
