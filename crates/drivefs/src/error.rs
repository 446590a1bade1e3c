// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::PoisonError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the metadata cache and its query facade
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Unsupported directory offset {offset} for {path}")]
    UnsupportedOffset { path: String, offset: u64 },

    /// Reported for dropped edges; never fails an apply
    #[error("Parent cycle: {child} cannot be placed under {parent}")]
    CycleDetected { child: String, parent: String },

    /// Reported for skipped batches; never fails an apply
    #[error("Stale change batch {change_id}, already at {watermark}")]
    StaleBatch { change_id: u64, watermark: u64 },

    #[error("Remote store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Cache lock poisoned: {0}")]
    LockPoisoned(String),
}

impl Error {
    pub fn not_found<S: AsRef<str>>(path: S) -> Self {
        Error::NotFound(path.as_ref().to_string())
    }

    pub fn not_a_directory<S: AsRef<str>>(path: S) -> Self {
        Error::NotADirectory(path.as_ref().to_string())
    }

    pub fn unsupported_offset<S: AsRef<str>>(path: S, offset: u64) -> Self {
        Error::UnsupportedOffset {
            path: path.as_ref().to_string(),
            offset,
        }
    }

    pub fn cycle_detected<S: AsRef<str>, T: AsRef<str>>(child: S, parent: T) -> Self {
        Error::CycleDetected {
            child: child.as_ref().to_string(),
            parent: parent.as_ref().to_string(),
        }
    }

    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        Error::UpstreamUnavailable(err.to_string())
    }

    pub fn invalid_path<S: AsRef<str>>(path: S) -> Self {
        Error::InvalidPath(path.as_ref().to_string())
    }

    pub fn invalid_record<S: AsRef<str>, R: std::fmt::Display>(id: S, reason: R) -> Self {
        Error::InvalidRecord {
            id: id.as_ref().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn internal<S: AsRef<str>>(msg: S) -> Self {
        Error::Internal(msg.as_ref().to_string())
    }

    /// Invariant violations, as opposed to the normal recoverable results
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Internal(_) | Error::LockPoisoned(_))
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Error {
        Error::LockPoisoned(err.to_string())
    }
}
