// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::entry::EntryId;
use serde::{Deserialize, Serialize};

/// Tuning for a [`crate::DriveFs`] instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Identity of the synthetic root folder
    pub root_id: String,

    /// Batches touching more ids than this clear the whole path cache
    pub precise_invalidation_limit: usize,

    /// Path bindings kept before the binding cache is reset
    pub max_bindings: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_id: "root".to_string(),
            precise_invalidation_limit: 512,
            max_bindings: 100_000,
        }
    }
}

impl CacheConfig {
    pub fn root(&self) -> EntryId {
        EntryId::new(self.root_id.as_str())
    }
}
