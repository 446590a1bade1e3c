// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use drivefs::Stat;

use crate::config::DriveContext;

/// One line per stat: `<path> <kind> size=<n> mode=<octal> nlink=<n> mtime=<secs>`
pub fn format_stat(path: &str, stat: &Stat) -> String {
    format!(
        "{path} {} size={} mode={:o} nlink={} mtime={}",
        stat.kind.as_str(),
        stat.size_bytes,
        stat.mode,
        stat.nlink,
        stat.modified_at
    )
}

pub async fn stat_command<F>(ctx: &DriveContext, path: &str, mut handler: F) -> Result<()>
where
    F: FnMut(String),
{
    let fs = ctx.open().await?;
    let stat = fs.stat(path)?;
    handler(format_stat(path, &stat));
    Ok(())
}
