// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Boundary to the remote store

use crate::entry::RawRecord;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the remote change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChange {
    pub object_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RawRecord>,
}

/// One page of the remote change feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePage {
    pub largest_change_id: u64,
    /// Present while more pages are pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub changes: BTreeMap<u64, RawChange>,
}

/// Fetches listings and change pages from the remote store.
///
/// Implementations own transport and authentication. Failures should be
/// reported as [`crate::Error::UpstreamUnavailable`].
#[async_trait]
pub trait RemoteProxy: Send + Sync {
    /// Full snapshot, used for cold start
    async fn list_all_files(&self) -> Result<Vec<RawRecord>>;

    /// Changes with id at or after `start_change_id`, or the page named by `page_token`
    async fn list_changes(
        &self,
        start_change_id: Option<u64>,
        page_token: Option<String>,
    ) -> Result<ChangePage>;

    /// Largest change id the feed holds right now
    async fn change_head(&self) -> Result<u64> {
        Ok(self.list_changes(None, None).await?.largest_change_id)
    }
}
