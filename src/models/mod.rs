// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod reading;
pub mod summary;
pub mod sync_log;
pub mod user;
pub mod workout;

pub use reading::{HeartRateReading, PaiScore, SpO2Reading, StressReading};
pub use summary::DailySummary;
pub use sync_log::{SyncLog, SyncStatus};
pub use user::{User, ZeppCredentials};
pub use workout::Workout;
