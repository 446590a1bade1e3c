// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod changes;
pub mod list;
pub mod stat;
pub mod tree;

pub use changes::changes_command;
pub use list::list_command;
pub use stat::stat_command;
pub use tree::tree_command;
