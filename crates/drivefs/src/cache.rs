// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::entry::EntryId;
use crate::graph::GraphIndex;
use crate::registry::EntryRegistry;

/// Source-of-truth state guarded by the facade's lock
#[derive(Debug, Clone)]
pub struct CacheState {
    pub registry: EntryRegistry,
    pub graph: GraphIndex,
    /// Largest change id applied so far
    pub watermark: Option<u64>,
}

impl CacheState {
    pub fn new(root: EntryId) -> Self {
        Self {
            registry: EntryRegistry::new(root),
            graph: GraphIndex::new(),
            watermark: None,
        }
    }

    pub fn root_id(&self) -> &EntryId {
        self.registry.root_id()
    }
}
