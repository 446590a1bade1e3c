// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::entry::{Entry, EntryKind};

/// `S_IFDIR | 0755`
pub const FOLDER_MODE: u32 = 0o040_755;
/// `S_IFREG | 0444`
pub const FILE_MODE: u32 = 0o100_444;

/// Attributes reported for a path. Ownership and permissions are fixed read-only defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub kind: EntryKind,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch
    pub modified_at: i64,
    pub mode: u32,
    pub nlink: u32,
}

impl Stat {
    pub fn from_entry(entry: &Entry) -> Self {
        match entry.kind {
            EntryKind::Folder => Self {
                kind: EntryKind::Folder,
                size_bytes: 0,
                modified_at: entry.modified_at,
                mode: FOLDER_MODE,
                nlink: 2,
            },
            EntryKind::File => Self {
                kind: EntryKind::File,
                size_bytes: entry.size_bytes,
                modified_at: entry.modified_at,
                mode: FILE_MODE,
                nlink: 1,
            },
        }
    }
}
