// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cmd::commands;
use cmd::config::DriveContext;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "gdfs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file (defaults to $GDFS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show attributes of a path
    Stat {
        path: String,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Resume offset; only 0 is supported
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Print the whole hierarchy
    Tree,
    /// Dump the remote change feed
    Changes,
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();
    let ctx = DriveContext::new(cli.config);

    match &cli.command {
        Commands::Stat { path } => {
            commands::stat_command(&ctx, path, |line| println!("{line}")).await
        }
        Commands::Ls { path, offset } => {
            commands::list_command(&ctx, path, *offset, |name| println!("{name}")).await
        }
        Commands::Tree => commands::tree_command(&ctx, |tree| print!("{tree}")).await,
        Commands::Changes => commands::changes_command(&ctx, |line| println!("{line}")).await,
    }
}
