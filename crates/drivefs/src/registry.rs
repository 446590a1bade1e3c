// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Entry Registry: canonical metadata for every known remote object

use crate::entry::{Entry, EntryId};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// An entry plus the order in which its id was first registered.
///
/// `seq` drives sibling disambiguation: lower sequence keeps the bare title.
#[derive(Debug, Clone)]
pub struct Registered {
    pub entry: Arc<Entry>,
    pub seq: u64,
}

/// Result of an upsert
#[derive(Debug, Clone)]
pub enum Upsert {
    Inserted { seq: u64 },
    Updated { seq: u64, previous: Arc<Entry> },
    Unchanged,
}

impl Upsert {
    #[must_use]
    pub fn changed(&self) -> bool {
        !matches!(self, Upsert::Unchanged)
    }
}

/// Arena of entries keyed by identity. Edges are stored as ids only.
#[derive(Debug, Clone)]
pub struct EntryRegistry {
    root: EntryId,
    entries: HashMap<EntryId, Registered>,
    next_seq: u64,
}

impl EntryRegistry {
    /// Creates a registry holding only the synthetic root.
    pub fn new(root: EntryId) -> Self {
        let mut entries = HashMap::new();
        _ = entries.insert(
            root.clone(),
            Registered {
                entry: Arc::new(Entry::root(root.clone())),
                seq: 0,
            },
        );
        Self {
            root,
            entries,
            next_seq: 1,
        }
    }

    pub fn root_id(&self) -> &EntryId {
        &self.root
    }

    pub fn get(&self, id: &str) -> Result<Arc<Entry>> {
        self.entries
            .get(id)
            .map(|r| r.entry.clone())
            .ok_or_else(|| Error::not_found(id))
    }

    /// Inserts or replaces by id.
    ///
    /// An entry listing itself as a parent is an invariant violation and
    /// leaves the registry untouched.
    pub fn upsert(&mut self, entry: Entry) -> Result<Upsert> {
        if entry.references_self() {
            return Err(Error::internal(format!(
                "entry {} lists itself as a parent",
                entry.id
            )));
        }
        if entry.id == self.root {
            return Err(Error::internal("the root entry cannot be replaced"));
        }

        match self.entries.get_mut(entry.id.as_str()) {
            Some(existing) => {
                let same_revision = entry.revision_hint.is_some()
                    && entry.revision_hint == existing.entry.revision_hint;
                if same_revision || existing.entry.same_content(&entry) {
                    if !same_revision {
                        // Keep the newest token so the next no-op is cheap
                        existing.entry = Arc::new(entry);
                    }
                    return Ok(Upsert::Unchanged);
                }
                let previous = std::mem::replace(&mut existing.entry, Arc::new(entry));
                Ok(Upsert::Updated {
                    seq: existing.seq,
                    previous,
                })
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                _ = self.entries.insert(
                    entry.id.clone(),
                    Registered {
                        entry: Arc::new(entry),
                        seq,
                    },
                );
                Ok(Upsert::Inserted { seq })
            }
        }
    }

    /// Deletes an entry, returning it so its former parents can be detached.
    pub fn remove(&mut self, id: &str) -> Result<Registered> {
        if id == self.root.as_str() {
            return Err(Error::internal("the root entry cannot be removed"));
        }
        self.entries.remove(id).ok_or_else(|| Error::not_found(id))
    }

    /// Number of entries, including the root
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// All entries in registration order
    pub fn in_registration_order(&self) -> Vec<Registered> {
        let mut all: Vec<_> = self.entries.values().cloned().collect();
        all.sort_by_key(|r| r.seq);
        all
    }
}
