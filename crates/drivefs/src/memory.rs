// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory remote proxy
//!
//! Serves a fixed snapshot and a scripted change feed. Used by tests and by
//! the command line tool, which loads a [`ProxyFixture`] from JSON.

use crate::entry::RawRecord;
use crate::error::{Error, Result};
use crate::proxy::{ChangePage, RawChange, RemoteProxy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

fn default_page_size() -> usize {
    100
}

/// Serialized contents of a [`MemoryProxy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyFixture {
    #[serde(default)]
    pub files: Vec<RawRecord>,
    /// Keyed by change id
    #[serde(default)]
    pub changes: BTreeMap<u64, RawChange>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ProxyFixture {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            changes: BTreeMap::new(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    fixture: ProxyFixture,
    fail_calls: u32,
    calls: u64,
}

/// A [`RemoteProxy`] backed by a [`ProxyFixture`]
#[derive(Debug, Default)]
pub struct MemoryProxy {
    inner: Mutex<Inner>,
}

impl MemoryProxy {
    pub fn new(fixture: ProxyFixture) -> Self {
        Self {
            inner: Mutex::new(Inner {
                fixture,
                ..Inner::default()
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: ProxyFixture = serde_json::from_str(json)
            .map_err(|e| Error::upstream(format!("bad fixture: {e}")))?;
        Ok(Self::new(fixture))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_files(&self, files: Vec<RawRecord>) {
        self.lock().fixture.files = files;
    }

    pub fn push_change(&self, change_id: u64, change: RawChange) {
        _ = self.lock().fixture.changes.insert(change_id, change);
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.lock().fixture.page_size = page_size.max(1);
    }

    /// The next `n` calls fail with `UpstreamUnavailable`.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_calls = n;
    }

    /// Number of remote calls served or failed
    pub fn calls(&self) -> u64 {
        self.lock().calls
    }

    fn begin_call(&self, what: &str) -> Result<std::sync::MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls += 1;
        if inner.fail_calls > 0 {
            inner.fail_calls -= 1;
            return Err(Error::upstream(format!("{what}: injected failure")));
        }
        Ok(inner)
    }
}

#[async_trait]
impl RemoteProxy for MemoryProxy {
    async fn list_all_files(&self) -> Result<Vec<RawRecord>> {
        let inner = self.begin_call("list_all_files")?;
        Ok(inner.fixture.files.clone())
    }

    async fn change_head(&self) -> Result<u64> {
        let inner = self.begin_call("change_head")?;
        Ok(inner.fixture.changes.keys().next_back().copied().unwrap_or(0))
    }

    async fn list_changes(
        &self,
        start_change_id: Option<u64>,
        page_token: Option<String>,
    ) -> Result<ChangePage> {
        let inner = self.begin_call("list_changes")?;
        let fixture = &inner.fixture;

        let from = match page_token {
            Some(token) => token
                .parse::<u64>()
                .map_err(|_| Error::upstream(format!("unknown page token {token}")))?,
            None => start_change_id.unwrap_or(0),
        };

        let mut changes: BTreeMap<u64, RawChange> = fixture
            .changes
            .range(from..)
            .take(fixture.page_size.max(1) + 1)
            .map(|(id, c)| (*id, c.clone()))
            .collect();

        let next_page_token = if changes.len() > fixture.page_size.max(1) {
            changes.pop_last().map(|(id, _)| id.to_string())
        } else {
            None
        };

        Ok(ChangePage {
            largest_change_id: fixture.changes.keys().next_back().copied().unwrap_or(0),
            next_page_token,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file, raw_upsert};

    #[tokio::test]
    async fn test_paging() {
        let proxy = MemoryProxy::default();
        proxy.set_page_size(2);
        for id in 1..=5 {
            proxy.push_change(id, raw_upsert(file(&format!("E{id}"), "a", "root", 1)));
        }

        let first = proxy.list_changes(Some(2), None).await.unwrap();
        assert_eq!(first.changes.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(first.next_page_token.as_deref(), Some("4"));
        assert_eq!(first.largest_change_id, 5);

        let second = proxy.list_changes(Some(2), first.next_page_token).await.unwrap();
        assert_eq!(second.changes.keys().copied().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(second.next_page_token, None);
        assert_eq!(proxy.change_head().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let proxy = MemoryProxy::default();
        proxy.fail_next(1);
        assert!(matches!(
            proxy.list_all_files().await,
            Err(Error::UpstreamUnavailable(_))
        ));
        assert!(proxy.list_all_files().await.unwrap().is_empty());
        assert_eq!(proxy.calls(), 2);
    }

    #[test]
    fn test_fixture_json() {
        let proxy = MemoryProxy::from_json(
            r#"{
                "files": [{"id": "F1", "title": "docs", "mimeType": "application/vnd.google-apps.folder"}],
                "changes": {"7": {"objectId": "F1", "deleted": true}}
            }"#,
        )
        .unwrap();
        let page = tokio_test::block_on(proxy.list_changes(None, None)).unwrap();
        assert_eq!(page.largest_change_id, 7);
        assert!(page.changes[&7].deleted);
    }
}
