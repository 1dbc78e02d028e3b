// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Daily summary model for storage.

use serde::{Deserialize, Serialize};

/// One row per (user, calendar date); later syncs overwrite.
///
/// Sleep and heart-rate fields are `None` when the vendor payload omitted
/// them, which is routine for devices without the matching sensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    /// Owning user ID
    pub user_id: u64,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Step count
    pub steps: i64,
    /// Distance in meters
    pub distance_meters: f64,
    /// Active calories
    pub calories: i64,
    /// Sleep window start (ISO 8601)
    pub sleep_start: Option<String>,
    /// Sleep window end (ISO 8601)
    pub sleep_end: Option<String>,
    /// Total sleep in minutes
    pub sleep_duration: Option<i64>,
    /// Deep sleep in minutes
    pub deep_sleep: Option<i64>,
    /// Light sleep in minutes
    pub light_sleep: Option<i64>,
    /// REM sleep in minutes
    pub rem_sleep: Option<i64>,
    /// Awake time in minutes
    pub awake_time: Option<i64>,
    /// Average heart rate over the day
    pub heart_rate_avg: Option<i64>,
    /// Maximum heart rate over the day
    pub heart_rate_max: Option<i64>,
    /// Minimum heart rate over the day
    pub heart_rate_min: Option<i64>,
    /// Average heart-rate variability
    pub hrv_avg: Option<i64>,
    /// When this row was last written (ISO 8601)
    pub synced_at: String,
}
