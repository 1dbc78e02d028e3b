// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Zepp-Sync: ingest wearable health data from the Zepp cloud
//!
//! This crate authenticates against the Zepp/Amazfit cloud API, decodes
//! its binary/base64 telemetry payloads, and keeps per-user health data
//! (daily summaries, heart rate, stress, SpO2, PAI, workouts) synced into
//! the store on a schedule.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
