// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Record and change builders for tests and fixtures

use crate::entry::{ByteCount, EntryId, FOLDER_MIME_TYPE, RawLabels, RawParent, RawRecord};
use crate::proxy::RawChange;
use crate::reconciler::{Change, ChangeBatch};

fn parent(id: &str) -> RawParent {
    RawParent {
        id: id.to_string(),
        is_root: false,
    }
}

/// A folder record with a single parent
pub fn folder(id: &str, title: &str, parent_id: &str) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        title: title.to_string(),
        mime_type: FOLDER_MIME_TYPE.to_string(),
        parents: vec![parent(parent_id)],
        quota_bytes_used: None,
        file_size: None,
        modified_date: Some("2013-06-01T12:00:00Z".to_string()),
        etag: None,
        labels: RawLabels::default(),
    }
}

/// A file record with a single parent
pub fn file(id: &str, title: &str, parent_id: &str, size: u64) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        title: title.to_string(),
        mime_type: "text/plain".to_string(),
        parents: vec![parent(parent_id)],
        quota_bytes_used: Some(ByteCount::Text(size.to_string())),
        file_size: None,
        modified_date: Some("2013-06-01T12:00:00Z".to_string()),
        etag: None,
        labels: RawLabels::default(),
    }
}

/// Replaces the parents of a record
pub fn with_parents(mut record: RawRecord, parents: &[&str]) -> RawRecord {
    record.parents = parents.iter().map(|p| parent(p)).collect();
    record
}

pub fn raw_upsert(record: RawRecord) -> RawChange {
    RawChange {
        object_id: record.id.clone(),
        deleted: false,
        record: Some(record),
    }
}

pub fn raw_delete(id: &str) -> RawChange {
    RawChange {
        object_id: id.to_string(),
        deleted: true,
        record: None,
    }
}

pub fn upsert(change_id: u64, record: RawRecord) -> Change {
    Change::from_raw(change_id, raw_upsert(record))
}

pub fn delete(change_id: u64, id: &str) -> Change {
    Change {
        change_id,
        object_id: EntryId::new(id),
        deleted: true,
        record: None,
    }
}

pub fn batch(change_id: u64, changes: Vec<Change>) -> ChangeBatch {
    ChangeBatch::new(change_id, changes)
}
