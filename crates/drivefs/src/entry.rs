// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Remote object records and their canonical cache form

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// MIME type the remote store uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Opaque, stable identity of a remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    #[must_use]
    pub fn is_folder(self) -> bool {
        self == EntryKind::Folder
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical metadata for one remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    /// Display name; not unique among siblings
    pub title: String,
    /// Empty means orphaned
    pub parent_ids: BTreeSet<EntryId>,
    pub kind: EntryKind,
    /// Always zero for folders
    pub size_bytes: u64,
    /// Seconds since the Unix epoch, UTC
    pub modified_at: i64,
    pub revision_hint: Option<String>,
}

impl Entry {
    /// Synthetic root folder
    pub fn root(id: EntryId) -> Self {
        Self {
            id,
            title: String::new(),
            parent_ids: BTreeSet::new(),
            kind: EntryKind::Folder,
            size_bytes: 0,
            modified_at: 0,
            revision_hint: None,
        }
    }

    /// Compares everything a reader can observe, ignoring the revision hint.
    #[must_use]
    pub fn same_content(&self, other: &Entry) -> bool {
        self.title == other.title
            && self.parent_ids == other.parent_ids
            && self.kind == other.kind
            && self.size_bytes == other.size_bytes
            && self.modified_at == other.modified_at
    }

    #[must_use]
    pub fn references_self(&self) -> bool {
        self.parent_ids.contains(&self.id)
    }
}

/// Parent reference as the remote API reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParent {
    pub id: String,
    #[serde(default)]
    pub is_root: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLabels {
    #[serde(default)]
    pub trashed: bool,
}

/// Byte counts arrive as decimal strings from the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ByteCount {
    Number(u64),
    Text(String),
}

impl ByteCount {
    fn value(&self) -> std::result::Result<u64, std::num::ParseIntError> {
        match self {
            ByteCount::Number(n) => Ok(*n),
            ByteCount::Text(s) => s.trim().parse(),
        }
    }
}

/// One object as listed by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<RawParent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes_used: Option<ByteCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<ByteCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub labels: RawLabels,
}

impl RawRecord {
    #[must_use]
    pub fn is_trashed(&self) -> bool {
        self.labels.trashed
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Converts to the canonical form. Parents flagged as root map to `root`.
    pub fn to_entry(&self, root: &EntryId) -> Result<Entry> {
        let kind = if self.is_folder() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };

        let size_bytes = match kind {
            EntryKind::Folder => 0,
            EntryKind::File => match self.quota_bytes_used.as_ref().or(self.file_size.as_ref()) {
                Some(count) => count
                    .value()
                    .map_err(|e| Error::invalid_record(&self.id, format!("bad size: {e}")))?,
                None => 0,
            },
        };

        let modified_at = match &self.modified_date {
            Some(date) => parse_timestamp(date).map_err(|e| Error::invalid_record(&self.id, e))?,
            None => 0,
        };

        let parent_ids = self
            .parents
            .iter()
            .map(|p| {
                if p.is_root {
                    root.clone()
                } else {
                    EntryId::new(p.id.as_str())
                }
            })
            .collect();

        Ok(Entry {
            id: EntryId::new(self.id.as_str()),
            title: self.title.clone(),
            parent_ids,
            kind,
            size_bytes,
            modified_at,
            revision_hint: self.etag.clone(),
        })
    }
}

/// Parses an RFC 3339 remote timestamp into epoch seconds.
pub fn parse_timestamp(date: &str) -> std::result::Result<i64, String> {
    chrono::DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("bad modifiedDate '{date}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> EntryId {
        EntryId::new("root")
    }

    #[test]
    fn test_folder_record() {
        let json = r#"{
            "id": "F1",
            "title": "docs",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": [{"id": "0AAbc", "isRoot": true}],
            "modifiedDate": "2013-06-01T12:00:00.000Z",
            "quotaBytesUsed": "4096"
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        let entry = record.to_entry(&root()).unwrap();

        assert_eq!(entry.kind, EntryKind::Folder);
        assert_eq!(entry.size_bytes, 0);
        assert_eq!(entry.modified_at, 1_370_088_000);
        assert!(entry.parent_ids.contains("root"));
    }

    #[test]
    fn test_file_size_sources() {
        let mut record: RawRecord = serde_json::from_str(
            r#"{"id": "E1", "title": "a.txt", "parents": [{"id": "F1"}], "fileSize": 7}"#,
        )
        .unwrap();
        assert_eq!(record.to_entry(&root()).unwrap().size_bytes, 7);

        record.quota_bytes_used = Some(ByteCount::Text("10".to_string()));
        let entry = record.to_entry(&root()).unwrap();
        assert_eq!(entry.size_bytes, 10);
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.modified_at, 0);

        record.quota_bytes_used = Some(ByteCount::Text("ten".to_string()));
        assert!(matches!(
            record.to_entry(&root()),
            Err(Error::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_bad_timestamp() {
        let record: RawRecord = serde_json::from_str(
            r#"{"id": "E1", "title": "a", "modifiedDate": "yesterday"}"#,
        )
        .unwrap();
        let err = record.to_entry(&root()).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { ref id, .. } if id == "E1"));
    }

    #[test]
    fn test_trashed_and_self_reference() {
        let record: RawRecord = serde_json::from_str(
            r#"{"id": "E1", "title": "a", "parents": [{"id": "E1"}], "labels": {"trashed": true}}"#,
        )
        .unwrap();
        assert!(record.is_trashed());
        assert!(record.to_entry(&root()).unwrap().references_self());
    }

    #[test]
    fn test_same_content_ignores_revision() {
        let a = Entry::root(root());
        let mut b = a.clone();
        b.revision_hint = Some("etag-2".to_string());
        assert!(a.same_content(&b));
        b.title = "renamed".to_string();
        assert!(!a.same_content(&b));
    }
}
