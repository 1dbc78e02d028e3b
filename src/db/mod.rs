// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Database layer.
//!
//! [`HealthStore`] is the conflict-aware upsert interface the sync
//! pipeline writes through: every table keys rows by their natural key,
//! so re-ingesting an identical vendor payload rewrites the same rows
//! instead of duplicating them.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{
    DailySummary, HeartRateReading, PaiScore, SpO2Reading, StressReading, SyncLog, User, Workout,
    ZeppCredentials,
};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ZEPP_CREDENTIALS: &str = "zepp_credentials";
    pub const DAILY_SUMMARIES: &str = "daily_summaries";
    pub const HEART_RATE_READINGS: &str = "heart_rate_readings";
    pub const STRESS_READINGS: &str = "stress_readings";
    pub const SPO2_READINGS: &str = "spo2_readings";
    pub const PAI_SCORES: &str = "pai_scores";
    pub const WORKOUTS: &str = "workouts";
    /// Append-only sync audit rows
    pub const SYNC_LOGS: &str = "sync_logs";
}

/// Storage interface for the sync pipeline.
///
/// Upserts are keyed by each record's natural key (last write wins on
/// values, not on existence); `insert_sync_log` appends.
#[async_trait]
pub trait HealthStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────
    async fn get_user(&self, user_id: u64) -> Result<Option<User>>;
    async fn upsert_user(&self, user: &User) -> Result<()>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Stamp the user's "last synced at" timestamp.
    async fn set_last_sync(&self, user_id: u64, synced_at: &str) -> Result<()>;

    // ─── Vendor credentials ──────────────────────────────────────
    async fn get_credentials(&self, user_id: u64) -> Result<Option<ZeppCredentials>>;
    async fn set_credentials(&self, user_id: u64, creds: &ZeppCredentials) -> Result<()>;

    // ─── Telemetry upserts (natural-key idempotent) ──────────────
    /// Keyed by (user, date).
    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()>;
    /// Keyed by (user, timestamp).
    async fn upsert_heart_rate(&self, reading: &HeartRateReading) -> Result<()>;
    /// Keyed by (user, timestamp).
    async fn upsert_stress(&self, reading: &StressReading) -> Result<()>;
    /// Keyed by (user, timestamp).
    async fn upsert_spo2(&self, reading: &SpO2Reading) -> Result<()>;
    /// Keyed by (user, date).
    async fn upsert_pai(&self, score: &PaiScore) -> Result<()>;
    /// Keyed by (user, vendor track id).
    async fn upsert_workout(&self, workout: &Workout) -> Result<()>;

    // ─── Audit log ───────────────────────────────────────────────
    async fn insert_sync_log(&self, log: &SyncLog) -> Result<()>;
}

/// Document id helpers shared by store implementations.
pub(crate) mod doc_ids {
    /// (user, date) natural key.
    pub fn by_date(user_id: u64, date: &str) -> String {
        format!("{}_{}", user_id, date)
    }

    /// (user, timestamp) natural key; RFC3339 timestamps are doc-id safe.
    pub fn by_timestamp(user_id: u64, timestamp: &str) -> String {
        format!("{}_{}", user_id, timestamp)
    }

    /// (user, track id) natural key; track ids are vendor-supplied free
    /// text, so encode them.
    pub fn by_track(user_id: u64, track_id: &str) -> String {
        format!("{}_{}", user_id, urlencoding::encode(track_id))
    }
}
