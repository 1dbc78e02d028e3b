// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Time-series reading models for storage.
//!
//! All readings are keyed by (user, timestamp): re-ingesting the same
//! vendor payload rewrites the same documents instead of duplicating them.

use serde::{Deserialize, Serialize};

/// One per-minute heart-rate sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateReading {
    pub user_id: u64,
    /// Sample timestamp (ISO 8601)
    pub timestamp: String,
    /// Beats per minute, 1..=253 (vendor sentinels are filtered at decode)
    pub heart_rate: u16,
}

/// One stress measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReading {
    pub user_id: u64,
    /// Measurement timestamp (ISO 8601)
    pub timestamp: String,
    pub stress_level: i64,
}

/// One blood-oxygen measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpO2Reading {
    pub user_id: u64,
    /// Measurement timestamp (ISO 8601)
    pub timestamp: String,
    /// Saturation percentage
    pub spo2_value: i64,
}

/// Daily PAI score, keyed by (user, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaiScore {
    pub user_id: u64,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub pai_score: f64,
}
