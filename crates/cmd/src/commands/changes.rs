// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use drivefs::{RawChange, RemoteProxy};

use crate::config::DriveContext;

/// `<change_id>> <title>`, or `<change_id>> <id> (deleted)`
pub fn format_change(change_id: u64, change: &RawChange) -> String {
    match (&change.record, change.deleted) {
        (_, true) => format!("{change_id}> {} (deleted)", change.object_id),
        (Some(record), false) if record.is_trashed() => {
            format!("{change_id}> {} (trashed)", record.title)
        }
        (Some(record), false) => format!("{change_id}> {}", record.title),
        (None, false) => format!("{change_id}> {} (no record)", change.object_id),
    }
}

/// Dumps the whole change feed, page by page, without touching a cache.
pub async fn changes_command<F>(ctx: &DriveContext, mut handler: F) -> Result<()>
where
    F: FnMut(String),
{
    let config = ctx.config()?;
    let proxy = ctx.proxy(&config)?;

    let mut token: Option<String> = None;
    loop {
        let page = proxy.list_changes(None, token.clone()).await?;
        for (change_id, change) in &page.changes {
            handler(format_change(*change_id, change));
        }
        match page.next_page_token {
            Some(next) if token.as_ref() == Some(&next) => {
                return Err(anyhow!("change feed repeated page token {next}"));
            }
            Some(next) => token = Some(next),
            None => return Ok(()),
        }
    }
}
