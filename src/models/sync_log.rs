// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sync audit log model.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one sync attempt.
///
/// A run writes one `Started` row, then exactly one terminal row:
/// `Completed` (even when some domains failed, see `error_message`) or
/// `Failed` when the run aborted outside the per-domain boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Started,
    Completed,
    Failed,
}

/// Append-only audit row for one sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    /// Owning user ID
    pub user_id: u64,
    /// Scope of the sync ("full_sync")
    pub sync_type: String,
    pub status: SyncStatus,
    /// Start of the requested date range, `YYYY-MM-DD`
    pub date_from: String,
    /// End of the requested date range, `YYYY-MM-DD`
    pub date_to: String,
    /// Records upserted across all domains (terminal rows only)
    pub records_synced: Option<u32>,
    /// Semicolon-joined per-domain failures, if any
    pub error_message: Option<String>,
    /// When this row was written (ISO 8601)
    pub created_at: String,
}
