// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path Resolver: lazily derived path bindings over the registry and graph
//!
//! Two caches live here, both derived and never a source of truth:
//! - folder listings: folder id -> disambiguated child names
//! - path bindings: canonical path -> target id plus the id chain walked
//!
//! Callers hold the state read lock while resolving and the write lock while
//! invalidating, so a binding can never be computed from a state that an
//! invalidation has already passed over.

use crate::cache::CacheState;
use crate::entry::{EntryId, EntryKind};
use crate::error::{Error, Result};
use crate::names::FolderNames;
use crate::path;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// A resolved path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: EntryId,
    pub kind: EntryKind,
    /// Ids walked from the root to the target, inclusive
    pub chain: Arc<[EntryId]>,
}

impl Binding {
    fn passes_through(&self, touched: &HashSet<EntryId>) -> bool {
        self.chain.iter().any(|id| touched.contains(id))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
}

#[derive(Debug)]
pub struct PathResolver {
    bindings: Mutex<HashMap<String, Binding>>,
    listings: Mutex<HashMap<EntryId, Arc<FolderNames>>>,
    stats: Mutex<ResolverStats>,
    max_bindings: usize,
}

impl PathResolver {
    pub fn new(max_bindings: usize) -> Self {
        Self {
            bindings: Mutex::new(HashMap::new()),
            listings: Mutex::new(HashMap::new()),
            stats: Mutex::new(ResolverStats::default()),
            max_bindings: max_bindings.max(1),
        }
    }

    fn record<F: FnOnce(&mut ResolverStats)>(&self, f: F) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *stats);
    }

    pub fn stats(&self) -> ResolverStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached path bindings
    pub fn cached_bindings(&self) -> Result<usize> {
        Ok(self.bindings.lock()?.len())
    }

    /// Resolves an absolute path against `state`.
    pub fn resolve(&self, state: &CacheState, path: &str) -> Result<Binding> {
        let segments = path::segments(path)?;
        let key = path::canonical(&segments);

        if let Some(hit) = self.bindings.lock()?.get(&key).cloned() {
            self.record(|s| s.hits += 1);
            return Ok(hit);
        }
        self.record(|s| s.misses += 1);

        let mut current = state.root_id().clone();
        // `stack` is the position, `chain` every id walked through
        let mut stack = vec![current.clone()];
        let mut chain = vec![current.clone()];
        for segment in &segments {
            let entry = state.registry.get(current.as_str())?;
            if !entry.kind.is_folder() {
                return Err(Error::not_a_directory(&key));
            }
            if segment == path::PARENT_SEGMENT {
                _ = stack.pop();
                let Some(parent) = stack.last() else {
                    return Err(Error::invalid_path(&key));
                };
                current = parent.clone();
                continue;
            }
            let names = self.folder_names(state, &current)?;
            let Some(next) = names.lookup(segment) else {
                diagnostics::log_debug!(
                    "resolve: '{segment}' not found in {folder}",
                    segment: segment.as_str(),
                    folder: current.as_str()
                );
                return Err(Error::not_found(&key));
            };
            current = next.clone();
            stack.push(current.clone());
            chain.push(current.clone());
        }

        let entry = state
            .registry
            .get(current.as_str())
            .map_err(|_| Error::not_found(&key))?;
        let binding = Binding {
            id: current,
            kind: entry.kind,
            chain: chain.into(),
        };

        let mut bindings = self.bindings.lock()?;
        if bindings.len() >= self.max_bindings {
            diagnostics::log_debug!("resolve: binding cache full, resetting");
            bindings.clear();
        }
        _ = bindings.insert(key, binding.clone());
        self.record(|s| s.inserts += 1);
        Ok(binding)
    }

    /// Disambiguated child names of a folder, computed on first use.
    pub fn folder_names(&self, state: &CacheState, folder: &EntryId) -> Result<Arc<FolderNames>> {
        if let Some(names) = self.listings.lock()?.get(folder) {
            return Ok(names.clone());
        }

        let children = state.graph.children_of(folder.as_str());
        let mut titled = Vec::with_capacity(children.len());
        for child in &children {
            // Edges only exist for registered entries
            let entry = state.registry.get(child.as_str())?;
            titled.push((child, entry));
        }
        let names = Arc::new(FolderNames::assign(
            titled.iter().map(|(id, e)| (*id, e.title.as_str())),
        ));

        _ = self
            .listings
            .lock()?
            .insert(folder.clone(), names.clone());
        Ok(names)
    }

    /// Base names of the children of the folder at `path`, in listing order.
    pub fn children_paths(&self, state: &CacheState, path: &str) -> Result<Vec<String>> {
        let binding = self.resolve(state, path)?;
        if !binding.kind.is_folder() {
            return Err(Error::not_a_directory(path));
        }
        let names = self.folder_names(state, &binding.id)?;
        Ok(names.names().map(str::to_string).collect())
    }

    /// Evicts every binding whose chain includes a touched id, and the
    /// listings of touched folders. Returns the number of bindings evicted.
    pub fn invalidate(&self, touched: &HashSet<EntryId>) -> Result<usize> {
        let mut listings = self.listings.lock()?;
        listings.retain(|folder, _| !touched.contains(folder));
        drop(listings);

        let mut bindings = self.bindings.lock()?;
        let before = bindings.len();
        bindings.retain(|_, b| !b.passes_through(touched));
        let evicted = before - bindings.len();
        drop(bindings);

        self.record(|s| s.invalidations += evicted as u64);
        Ok(evicted)
    }

    /// Drops every cached binding and listing.
    pub fn clear(&self) -> Result<usize> {
        self.listings.lock()?.clear();
        let mut bindings = self.bindings.lock()?;
        let evicted = bindings.len();
        bindings.clear();
        drop(bindings);
        self.record(|s| s.invalidations += evicted as u64);
        Ok(evicted)
    }
}
