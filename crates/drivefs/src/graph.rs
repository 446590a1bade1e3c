// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Graph Index: parent/child adjacency derived from registry contents

use crate::entry::{Entry, EntryId};
use crate::error::Error;
use crate::registry::EntryRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Edge-level result of one entry change
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EdgeDelta {
    pub added: Vec<(EntryId, EntryId)>,
    pub removed: Vec<(EntryId, EntryId)>,
    /// Edges refused because they would close a parent cycle
    pub dropped: Vec<Error>,
}

impl EdgeDelta {
    fn merge(&mut self, other: EdgeDelta) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.dropped.extend(other.dropped);
    }
}

/// Adjacency over entry ids. Children are kept in registration order.
#[derive(Debug, Default, Clone)]
pub struct GraphIndex {
    children: HashMap<EntryId, BTreeMap<u64, EntryId>>,
    parents: HashMap<EntryId, BTreeSet<EntryId>>,
    /// Edges refused for cycles, keyed by (child seq, parent)
    deferred: BTreeMap<(u64, EntryId), EntryId>,
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the whole index from a registry, linking in registration order.
    pub fn rebuild(registry: &EntryRegistry) -> (Self, EdgeDelta) {
        let mut graph = Self::new();
        let mut delta = EdgeDelta::default();
        for reg in registry.in_registration_order() {
            delta.merge(graph.on_entry_changed(None, Some(&reg.entry), reg.seq));
        }
        (graph, delta)
    }

    /// Children of a folder, in disambiguation order.
    pub fn children_of(&self, folder: &str) -> Vec<EntryId> {
        self.children
            .get(folder)
            .map(|kids| kids.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_linked(&self, child: &str, parent: &str) -> bool {
        self.parents
            .get(child)
            .is_some_and(|ps| ps.contains(parent))
    }

    /// Applies only the parent edges that differ between `old` and `new`.
    ///
    /// `seq` is the registration sequence of the entry being changed.
    pub fn on_entry_changed(&mut self, old: Option<&Entry>, new: Option<&Entry>, seq: u64) -> EdgeDelta {
        let mut delta = EdgeDelta::default();
        let Some(id) = new.or(old).map(|e| e.id.clone()) else {
            return delta;
        };

        let empty = BTreeSet::new();
        let old_parents = old.map_or(&empty, |e| &e.parent_ids);
        let new_parents = new.map_or(&empty, |e| &e.parent_ids);

        for parent in old_parents.difference(new_parents) {
            _ = self.deferred.remove(&(seq, parent.clone()));
            if self.unlink(&id, parent, seq) {
                delta.removed.push((id.clone(), parent.clone()));
            }
        }

        for parent in new_parents {
            if self.is_linked(id.as_str(), parent.as_str()) {
                continue;
            }
            if self.would_cycle(&id, parent) {
                diagnostics::log_warn!(
                    "Dropping edge {child} -> {parent}: parent cycle",
                    child: id.as_str(),
                    parent: parent.as_str()
                );
                delta.dropped.push(Error::cycle_detected(id.as_str(), parent.as_str()));
                _ = self.deferred.insert((seq, parent.clone()), id.clone());
                continue;
            }
            _ = self.deferred.remove(&(seq, parent.clone()));
            self.link(&id, parent, seq);
            delta.added.push((id.clone(), parent.clone()));
        }

        if new.is_none() {
            _ = self.parents.remove(id.as_str());
            self.deferred.retain(|(child_seq, _), _| *child_seq != seq);
        }
        delta
    }

    /// Number of edges waiting for a cycle to go away
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Links every deferred edge that no longer closes a cycle.
    ///
    /// Edges are retried in child registration order until a pass links nothing.
    pub fn retry_deferred(&mut self) -> EdgeDelta {
        let mut delta = EdgeDelta::default();
        loop {
            let next = self
                .deferred
                .iter()
                .find(|((_, parent), child)| !self.would_cycle(child, parent))
                .map(|(key, child)| (key.clone(), child.clone()));
            let Some((key, child)) = next else {
                return delta;
            };
            // Linking one edge can close a cycle for the next, so rescan
            _ = self.deferred.remove(&key);
            let (seq, parent) = key;
            diagnostics::log_debug!(
                "Linking deferred edge {child} -> {parent}",
                child: child.as_str(),
                parent: parent.as_str()
            );
            self.link(&child, &parent, seq);
            delta.added.push((child, parent));
        }
    }

    fn link(&mut self, child: &EntryId, parent: &EntryId, seq: u64) {
        _ = self
            .children
            .entry(parent.clone())
            .or_default()
            .insert(seq, child.clone());
        _ = self
            .parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
    }

    fn unlink(&mut self, child: &EntryId, parent: &EntryId, seq: u64) -> bool {
        let was_linked = self
            .parents
            .get_mut(child.as_str())
            .is_some_and(|ps| ps.remove(parent.as_str()));
        if let Some(kids) = self.children.get_mut(parent.as_str()) {
            _ = kids.remove(&seq);
            if kids.is_empty() {
                _ = self.children.remove(parent.as_str());
            }
        }
        was_linked
    }

    /// True when `child` is `parent` or one of its linked ancestors.
    fn would_cycle(&self, child: &EntryId, parent: &EntryId) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([parent]);
        while let Some(current) = queue.pop_front() {
            if current == child {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(ps) = self.parents.get(current.as_str()) {
                queue.extend(ps.iter());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;

    fn folder(id: &str, parents: &[&str]) -> Entry {
        Entry {
            id: EntryId::new(id),
            title: id.to_lowercase(),
            parent_ids: parents.iter().map(|p| EntryId::new(*p)).collect(),
            kind: EntryKind::Folder,
            size_bytes: 0,
            modified_at: 0,
            revision_hint: None,
        }
    }

    fn ids(v: Vec<EntryId>) -> Vec<String> {
        v.into_iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_children_in_registration_order() {
        let mut g = GraphIndex::new();
        _ = g.on_entry_changed(None, Some(&folder("B", &["root"])), 2);
        _ = g.on_entry_changed(None, Some(&folder("A", &["root"])), 1);
        _ = g.on_entry_changed(None, Some(&folder("C", &["root", "A"])), 3);

        assert_eq!(ids(g.children_of("root")), vec!["A", "B", "C"]);
        assert_eq!(ids(g.children_of("A")), vec!["C"]);
        assert!(g.is_linked("C", "A") && g.is_linked("C", "root"));
        assert!(g.children_of("missing").is_empty());
    }

    #[test]
    fn test_incremental_parent_change() {
        let mut g = GraphIndex::new();
        let before = folder("C", &["root", "A"]);
        let after = folder("C", &["A", "B"]);
        _ = g.on_entry_changed(None, Some(&before), 3);

        let delta = g.on_entry_changed(Some(&before), Some(&after), 3);
        assert_eq!(delta.removed, vec![(EntryId::new("C"), EntryId::new("root"))]);
        assert_eq!(delta.added, vec![(EntryId::new("C"), EntryId::new("B"))]);
        assert!(g.children_of("root").is_empty());
        assert_eq!(ids(g.children_of("B")), vec!["C"]);
    }

    #[test]
    fn test_cycle_edge_dropped() {
        let mut g = GraphIndex::new();
        _ = g.on_entry_changed(None, Some(&folder("A", &["root"])), 1);
        _ = g.on_entry_changed(None, Some(&folder("B", &["A"])), 2);

        // A under B would make A its own ancestor
        let old = folder("A", &["root"]);
        let new = folder("A", &["root", "B"]);
        let delta = g.on_entry_changed(Some(&old), Some(&new), 1);

        assert_eq!(delta.dropped, vec![Error::cycle_detected("A", "B")]);
        assert!(!g.is_linked("A", "B"));
        assert!(g.is_linked("A", "root"));
        assert_eq!(g.deferred_len(), 1);
    }

    #[test]
    fn test_deferred_edge_linked_once_cycle_breaks() {
        let mut g = GraphIndex::new();
        let a_old = folder("A", &["root"]);
        let a_new = folder("A", &["root", "B"]);
        let b_old = folder("B", &["A"]);
        let b_new = folder("B", &["root"]);
        _ = g.on_entry_changed(None, Some(&a_old), 1);
        _ = g.on_entry_changed(None, Some(&b_old), 2);
        _ = g.on_entry_changed(Some(&a_old), Some(&a_new), 1);
        assert!(g.retry_deferred().added.is_empty());

        // B moving away is what breaks the cycle, A itself is untouched
        _ = g.on_entry_changed(Some(&b_old), Some(&b_new), 2);
        let delta = g.retry_deferred();
        assert_eq!(delta.added, vec![(EntryId::new("A"), EntryId::new("B"))]);
        assert!(g.is_linked("A", "B"));
        assert_eq!(g.deferred_len(), 0);
    }

    #[test]
    fn test_deferred_edge_forgotten_with_parent_or_entry() {
        let mut g = GraphIndex::new();
        let a_old = folder("A", &["root"]);
        let a_new = folder("A", &["root", "B"]);
        _ = g.on_entry_changed(None, Some(&a_old), 1);
        _ = g.on_entry_changed(None, Some(&folder("B", &["A"])), 2);
        _ = g.on_entry_changed(Some(&a_old), Some(&a_new), 1);
        assert_eq!(g.deferred_len(), 1);

        _ = g.on_entry_changed(Some(&a_new), Some(&a_old), 1);
        assert_eq!(g.deferred_len(), 0);

        _ = g.on_entry_changed(Some(&a_old), Some(&a_new), 1);
        _ = g.on_entry_changed(Some(&a_new), None, 1);
        assert_eq!(g.deferred_len(), 0);
    }

    #[test]
    fn test_removal_detaches_but_keeps_dangling_children() {
        let mut g = GraphIndex::new();
        let f = folder("F", &["root"]);
        _ = g.on_entry_changed(None, Some(&f), 1);
        _ = g.on_entry_changed(None, Some(&folder("X", &["F"])), 2);

        let delta = g.on_entry_changed(Some(&f), None, 1);
        assert_eq!(delta.removed.len(), 1);
        assert!(g.children_of("root").is_empty());
        assert!(!g.is_linked("F", "root"));
        assert_eq!(ids(g.children_of("F")), vec!["X"]);
    }
}
