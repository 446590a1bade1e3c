// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Query Facade and sync driver
//!
//! A [`DriveFs`] is constructed once at process start and owned by the
//! filesystem call dispatcher. The dispatcher drives remote fetches through
//! [`DriveFs::cold_start`] and [`DriveFs::sync`], then answers kernel
//! requests with [`DriveFs::stat`] and [`DriveFs::list_dir`], which only
//! read resident state.

use crate::cache::CacheState;
use crate::config::CacheConfig;
use crate::entry::{Entry, EntryId, RawRecord};
use crate::error::{Error, Result};
use crate::proxy::RemoteProxy;
use crate::reconciler::{self, ApplyReport, ChangeBatch, SnapshotReport};
use crate::resolver::{PathResolver, ResolverStats};
use crate::stat::Stat;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Listing entries every directory starts with
pub const SELF_LINK: &str = ".";
pub const PARENT_LINK: &str = "..";

/// Summary of a [`DriveFs::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub batches: Vec<ApplyReport>,
}

impl SyncReport {
    #[must_use]
    pub fn applied(&self) -> usize {
        self.batches.iter().filter(|b| b.applied()).count()
    }
}

/// The metadata cache and its query facade
#[derive(Debug)]
pub struct DriveFs {
    config: CacheConfig,
    state: RwLock<CacheState>,
    resolver: PathResolver,
}

impl DriveFs {
    pub fn new(config: CacheConfig) -> Self {
        let state = CacheState::new(config.root());
        let resolver = PathResolver::new(config.max_bindings);
        Self {
            config,
            state: RwLock::new(state),
            resolver,
        }
    }

    /// Attributes of the object at `path`.
    pub fn stat(&self, path: &str) -> Result<Stat> {
        diagnostics::log_debug!("stat {path}", path: path);
        let state = self.state.read()?;
        let binding = self.resolver.resolve(&state, path)?;
        let entry = state.registry.get(binding.id.as_str())?;
        Ok(Stat::from_entry(&entry))
    }

    /// Full listing of the directory at `path`, `.` and `..` first.
    ///
    /// Only offset 0 is served; the listing is always complete.
    pub fn list_dir(&self, path: &str, offset: u64) -> Result<Vec<String>> {
        diagnostics::log_debug!("list_dir {path} at {offset}", path: path, offset: offset);
        if offset != 0 {
            diagnostics::log_warn!(
                "list_dir {path} with nonzero offset {offset}",
                path: path,
                offset: offset
            );
            return Err(Error::unsupported_offset(path, offset));
        }

        let state = self.state.read()?;
        let children = self.resolver.children_paths(&state, path)?;
        let mut names = Vec::with_capacity(children.len() + 2);
        names.push(SELF_LINK.to_string());
        names.push(PARENT_LINK.to_string());
        names.extend(children);
        Ok(names)
    }

    /// Identity of the object at `path`.
    pub fn resolve_id(&self, path: &str) -> Result<EntryId> {
        let state = self.state.read()?;
        Ok(self.resolver.resolve(&state, path)?.id)
    }

    /// Applies one change batch and invalidates affected bindings.
    pub fn apply(&self, batch: &ChangeBatch) -> Result<ApplyReport> {
        let mut state = self.state.write()?;
        let report = reconciler::apply_batch(&mut state, batch)?;
        if report.applied() {
            self.invalidate(&report.touched)?;
        }
        Ok(report)
    }

    fn invalidate(&self, touched: &HashSet<EntryId>) -> Result<()> {
        if touched.is_empty() {
            return Ok(());
        }
        let evicted = if touched.len() > self.config.precise_invalidation_limit {
            self.resolver.clear()?
        } else {
            self.resolver.invalidate(touched)?
        };
        diagnostics::log_debug!(
            "invalidated {evicted} bindings for {touched} ids",
            evicted: evicted,
            touched: touched.len()
        );
        Ok(())
    }

    /// Replaces all entries with a full listing. The watermark is kept.
    pub fn load_snapshot(&self, records: &[RawRecord]) -> Result<SnapshotReport> {
        self.install_snapshot(records, None)
    }

    /// Swaps in a fresh state built from `records`, raising the watermark to `head`.
    fn install_snapshot(&self, records: &[RawRecord], head: Option<u64>) -> Result<SnapshotReport> {
        let (mut fresh, report) = reconciler::build_snapshot(self.config.root(), records)?;

        let mut state = self.state.write()?;
        fresh.watermark = state.watermark.max(head);
        let watermark = fresh
            .watermark
            .map_or_else(|| "none".to_string(), |w| w.to_string());
        *state = fresh;
        _ = self.resolver.clear()?;
        drop(state);

        diagnostics::log_info!(
            "Loaded snapshot with {entries} entries at watermark {watermark}",
            entries: report.entries,
            watermark: watermark.as_str()
        );
        Ok(report)
    }

    /// Fetches the full listing and loads it, positioned at the feed head.
    ///
    /// The head is read before the listing, so changes that land in between
    /// are replayed by the next sync rather than skipped. On failure the
    /// current cache is left in place.
    pub async fn cold_start<P: RemoteProxy + ?Sized>(&self, proxy: &P) -> Result<SnapshotReport> {
        let head = proxy.change_head().await.map_err(upstream)?;
        let records = proxy.list_all_files().await.map_err(upstream)?;
        self.install_snapshot(&records, Some(head))
    }

    /// Pulls and applies every change page after the watermark.
    ///
    /// Pages applied before an upstream failure stay applied.
    pub async fn sync<P: RemoteProxy + ?Sized>(&self, proxy: &P) -> Result<SyncReport> {
        let start = self.watermark()?.map(|w| w + 1);
        let mut token: Option<String> = None;
        let mut report = SyncReport::default();

        loop {
            let page = proxy
                .list_changes(start, token.clone())
                .await
                .map_err(upstream)?;
            let next = page.next_page_token.clone();
            report.pages += 1;
            report.batches.push(self.apply(&ChangeBatch::from(page))?);

            match next {
                Some(next) if token.as_ref() != Some(&next) => token = Some(next),
                Some(next) => {
                    diagnostics::log_warn!(
                        "Change feed repeated page token {token}, stopping",
                        token: next.as_str()
                    );
                    break;
                }
                None => break,
            }
        }
        Ok(report)
    }

    /// Largest change id applied so far
    pub fn watermark(&self) -> Result<Option<u64>> {
        Ok(self.state.read()?.watermark)
    }

    pub fn entry(&self, id: &str) -> Result<Arc<Entry>> {
        self.state.read()?.registry.get(id)
    }

    /// Number of known entries, including the root
    pub fn len(&self) -> Result<usize> {
        Ok(self.state.read()?.registry.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.state.read()?.registry.is_empty())
    }

    pub fn resolver_stats(&self) -> ResolverStats {
        self.resolver.stats()
    }

    /// Indented rendering of everything reachable from the root.
    pub fn tree(&self) -> Result<String> {
        let state = self.state.read()?;
        let mut out = String::from("/\n");
        let mut on_path = HashSet::new();
        self.render(&state, state.root_id(), 1, &mut on_path, &mut out)?;
        Ok(out)
    }

    fn render(
        &self,
        state: &CacheState,
        folder: &EntryId,
        depth: usize,
        on_path: &mut HashSet<EntryId>,
        out: &mut String,
    ) -> Result<()> {
        if !on_path.insert(folder.clone()) {
            return Ok(());
        }
        let names = self.resolver.folder_names(state, folder)?;
        for (name, id) in names.iter() {
            let entry = state.registry.get(id.as_str())?;
            let indent = "  ".repeat(depth);
            if entry.kind.is_folder() {
                out.push_str(&format!("{indent}{name}/\n"));
                self.render(state, id, depth + 1, on_path, out)?;
            } else {
                out.push_str(&format!("{indent}{name} ({})\n", entry.size_bytes));
            }
        }
        _ = on_path.remove(folder);
        Ok(())
    }
}

impl Default for DriveFs {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn upstream(err: Error) -> Error {
    diagnostics::log_warn!("Remote fetch failed: {error}", error: err.to_string());
    match err {
        Error::UpstreamUnavailable(_) => err,
        other => Error::upstream(other),
    }
}
