// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;

use thiserror::Error;

/// Errors raised by the store and the remote source.
#[derive(Debug, Error)]
pub enum TodoError {
    /// Transport-level failure: no connectivity, refused connection, timeout.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The remote answered, but not with a usable success response.
    #[error("{0}")]
    Remote(String),

    #[error("Task with ID {0} not found")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<reqwest::Error> for TodoError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TodoError::Remote(format!("HTTP {}", status))
        } else if err.is_decode() {
            TodoError::Remote(format!("Malformed response: {}", err))
        } else {
            TodoError::NetworkUnavailable(err.to_string())
        }
    }
}

/// What went wrong during a sync, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailureKind {
    #[error("Network error: Check your internet connection")]
    NetworkUnavailable,

    #[error("Failed to fetch tasks: {0}")]
    SyncFailed(String),
}

impl From<&TodoError> for SyncFailureKind {
    fn from(err: &TodoError) -> Self {
        match err {
            TodoError::NetworkUnavailable(_) => SyncFailureKind::NetworkUnavailable,
            other => SyncFailureKind::SyncFailed(other.to_string()),
        }
    }
}

/// A failed sync. With cached data it is a soft failure shown next to the
/// cached list; without it the failure is the only thing to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub kind: SyncFailureKind,
    pub has_cached_data: bool,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_cached_data {
            write!(f, "{} (Showing cached data)", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for SyncFailure {}
