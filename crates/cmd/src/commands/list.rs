// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

use crate::config::DriveContext;

pub async fn list_command<F>(ctx: &DriveContext, path: &str, offset: u64, mut handler: F) -> Result<()>
where
    F: FnMut(String),
{
    diagnostics::log_debug!("Listing {path}", path: path);
    let fs = ctx.open().await?;
    for name in fs.list_dir(path, offset)? {
        handler(name);
    }
    Ok(())
}
