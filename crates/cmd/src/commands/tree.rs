// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

use crate::config::DriveContext;

pub async fn tree_command<F>(ctx: &DriveContext, mut handler: F) -> Result<()>
where
    F: FnMut(String),
{
    let fs = ctx.open().await?;
    handler(fs.tree()?);
    Ok(())
}
