// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use std::path::{Component, Path};

/// Segment naming the parent of the preceding one. Sanitized titles never collide with it.
pub const PARENT_SEGMENT: &str = "..";

/// Splits an absolute filesystem path into its segments.
///
/// `.` is skipped. `..` is kept so the walk can check what it climbs out of.
pub fn segments<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut components = path.components();
    if components.next() != Some(Component::RootDir) {
        return Err(Error::invalid_path(path.to_string_lossy()));
    }

    let mut out: Vec<String> = Vec::new();
    for comp in components {
        match comp {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| Error::invalid_path(path.to_string_lossy()))?;
                out.push(name.to_string());
            }
            Component::CurDir => {}
            Component::ParentDir => out.push(PARENT_SEGMENT.to_string()),
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::invalid_path(path.to_string_lossy()));
            }
        }
    }
    Ok(out)
}

/// Canonical string form used as the binding cache key
pub fn canonical(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for s in segments {
        out.push('/');
        out.push_str(s);
    }
    out
}
