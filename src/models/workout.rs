// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout model for storage.

use serde::{Deserialize, Serialize};

/// Stored workout record, keyed by (user, vendor track id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    /// Owning user ID
    pub user_id: u64,
    /// Vendor-assigned track id
    pub track_id: String,
    /// Workout type as reported by the vendor ("unknown" when absent)
    pub workout_type: String,
    /// Start time (ISO 8601)
    pub start_time: String,
    /// End time (ISO 8601)
    pub end_time: String,
    /// Duration in seconds
    pub duration_seconds: i64,
    /// Distance in meters
    pub distance_meters: Option<f64>,
    /// Calories burned
    pub calories: Option<i64>,
    /// Average heart rate during the workout
    pub avg_heart_rate: Option<i64>,
    /// Maximum heart rate during the workout
    pub max_heart_rate: Option<i64>,
    /// Vendor source tag, needed to fetch the workout detail track
    pub source: Option<String>,
}
