// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Metadata cache and path resolution for a remote, id-addressed object store
//!
//! The remote store is a graph: an object may have several parent folders
//! and siblings may share a title. This crate keeps an in-memory index of
//! that graph and presents it as a single-rooted POSIX tree:
//!
//! - [`EntryRegistry`] owns canonical metadata keyed by [`EntryId`]
//! - [`GraphIndex`] owns parent/child adjacency, refusing parent cycles
//! - [`PathResolver`] derives and caches path bindings, suffixing
//!   colliding sibling names (`report`, `report-2`, ...)
//! - the reconciler applies watermark-ordered [`ChangeBatch`]es
//! - [`DriveFs`] is the facade the filesystem dispatcher calls

mod cache;
mod config;
mod entry;
mod error;
mod fs;
mod graph;
mod memory;
mod names;
mod path;
mod proxy;
mod reconciler;
mod registry;
mod resolver;
mod stat;

pub mod testing;

pub use cache::CacheState;
pub use config::CacheConfig;
pub use entry::{
    ByteCount, Entry, EntryId, EntryKind, FOLDER_MIME_TYPE, RawLabels, RawParent, RawRecord,
    parse_timestamp,
};
pub use error::{Error, Result};
pub use fs::{DriveFs, PARENT_LINK, SELF_LINK, SyncReport};
pub use graph::{EdgeDelta, GraphIndex};
pub use memory::{MemoryProxy, ProxyFixture};
pub use names::{FolderNames, sanitize};
pub use proxy::{ChangePage, RawChange, RemoteProxy};
pub use reconciler::{ApplyReport, Change, ChangeBatch, SnapshotReport};
pub use registry::{EntryRegistry, Registered, Upsert};
pub use resolver::{Binding, PathResolver, ResolverStats};
pub use stat::{FILE_MODE, FOLDER_MODE, Stat};

#[cfg(test)]
mod tests;
