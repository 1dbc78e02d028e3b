// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoders for the Zepp cloud's telemetry payload formats.
//!
//! Handles:
//! - Base64-wrapped JSON daily summaries
//! - The per-minute heart-rate binary buffer (big-endian u16 per minute)
//! - The `data` list responses for stress, SpO2, PAI and workouts
//!
//! Structural breakage (bad base64, bad JSON, truncated buffer) is a
//! `Decode` error. Missing optional keys degrade to `None`/empty results:
//! the payload schema is not self-describing and varies between device
//! firmwares, so an absent key is normal and must not kill a sync domain.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Vendor sentinel threshold: heart-rate samples >= this mean "no reading".
const HR_SENTINEL_MIN: u16 = 254;

/// Decode a base64 daily-summary blob into its JSON object.
pub fn decode_summary(base64_summary: &str) -> Result<Value> {
    let bytes = BASE64
        .decode(base64_summary)
        .map_err(|e| AppError::Decode(format!("Invalid base64 in summary: {}", e)))?;

    let text = String::from_utf8(bytes)
        .map_err(|e| AppError::Decode(format!("Summary is not UTF-8: {}", e)))?;

    serde_json::from_str(&text)
        .map_err(|e| AppError::Decode(format!("Summary is not valid JSON: {}", e)))
}

/// Decode the per-minute heart-rate buffer for one day.
///
/// The buffer holds one big-endian u16 per minute (nominally 1440 samples,
/// up to 2880 bytes). Returns a lazy iterator over `(timestamp, bpm)`;
/// samples equal to 0 or >= 254 are vendor sentinels and are skipped.
pub fn decode_heart_rate_buffer(
    base64_data: &str,
    day_start: DateTime<Utc>,
) -> Result<HeartRateSamples> {
    let bytes = BASE64
        .decode(base64_data)
        .map_err(|e| AppError::Decode(format!("Invalid base64 in heart-rate buffer: {}", e)))?;

    if bytes.len() % 2 != 0 {
        return Err(AppError::Decode(format!(
            "Heart-rate buffer has odd length {}",
            bytes.len()
        )));
    }

    Ok(HeartRateSamples {
        bytes,
        day_start,
        index: 0,
    })
}

/// Iterator over decoded heart-rate samples, minute-ascending.
///
/// Finite and restartable: cloning yields an independent pass over the
/// same buffer.
#[derive(Debug, Clone)]
pub struct HeartRateSamples {
    bytes: Vec<u8>,
    day_start: DateTime<Utc>,
    index: usize,
}

impl HeartRateSamples {
    /// Total samples in the buffer, including sentinel slots.
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 2
    }
}

impl Iterator for HeartRateSamples {
    type Item = (DateTime<Utc>, u16);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.sample_count() {
            let i = self.index;
            self.index += 1;

            let bpm = u16::from_be_bytes([self.bytes[2 * i], self.bytes[2 * i + 1]]);
            if bpm == 0 || bpm >= HR_SENTINEL_MIN {
                continue;
            }

            return Some((self.day_start + Duration::minutes(i as i64), bpm));
        }
        None
    }
}

/// Sleep window and phase durations parsed from the `slp` sub-object.
///
/// `None` means the key was absent from the payload, which is distinct
/// from a reported zero-minute phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepSummary {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub total_minutes: Option<i64>,
    pub deep_minutes: Option<i64>,
    pub light_minutes: Option<i64>,
    pub rem_minutes: Option<i64>,
    pub awake_minutes: Option<i64>,
}

/// Parse sleep data from a decoded summary object.
pub fn parse_sleep(summary: &Value) -> SleepSummary {
    let Some(slp) = summary.get("slp") else {
        return SleepSummary::default();
    };

    SleepSummary {
        // 0 is the vendor's "no sleep window" marker for the epoch fields
        start: epoch_field(slp, "st"),
        end: epoch_field(slp, "ed"),
        total_minutes: int_field(slp, "tt"),
        deep_minutes: int_field(slp, "dp"),
        light_minutes: int_field(slp, "lt"),
        rem_minutes: int_field(slp, "rm"),
        awake_minutes: int_field(slp, "wk"),
    }
}

/// Steps, distance and calories parsed from a decoded summary object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySummary {
    pub steps: Option<i64>,
    pub distance_meters: Option<f64>,
    pub calories: Option<i64>,
}

/// Parse step/activity data from a decoded summary object.
///
/// Newer firmwares report steps under `ttl`, older ones under `steps`.
pub fn parse_activity(summary: &Value) -> ActivitySummary {
    ActivitySummary {
        steps: int_field(summary, "ttl").or_else(|| int_field(summary, "steps")),
        distance_meters: summary.get("dis").and_then(Value::as_f64),
        calories: int_field(summary, "cal"),
    }
}

/// Daily heart-rate aggregate parsed from the `hr` sub-object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartRateSummary {
    pub avg: Option<i64>,
    pub max: Option<i64>,
    pub min: Option<i64>,
    pub hrv: Option<i64>,
}

/// Parse the heart-rate aggregate from a decoded summary object.
pub fn parse_heart_rate_summary(summary: &Value) -> HeartRateSummary {
    let Some(hr) = summary.get("hr") else {
        return HeartRateSummary::default();
    };

    HeartRateSummary {
        avg: int_field(hr, "avg"),
        max: int_field(hr, "max"),
        min: int_field(hr, "min"),
        hrv: int_field(hr, "hrv"),
    }
}

/// One timestamped measurement from a vendor list response.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSample {
    pub timestamp: DateTime<Utc>,
    pub value: i64,
}

/// Parse a stress list response into timestamped readings.
///
/// An absent or malformed `data` array is a routine "no data available"
/// vendor answer and yields an empty vector, never an error. Malformed
/// individual items are skipped.
pub fn parse_stress(response: &Value) -> Vec<TimedSample> {
    parse_timed_samples(response)
}

/// Parse an SpO2 list response into timestamped readings.
pub fn parse_spo2(response: &Value) -> Vec<TimedSample> {
    parse_timed_samples(response)
}

fn parse_timed_samples(response: &Value) -> Vec<TimedSample> {
    data_items(response)
        .filter_map(|item| {
            let ts = item.get("timestamp").and_then(Value::as_i64)?;
            let timestamp = DateTime::from_timestamp(ts, 0)?;
            let value = item.get("value").and_then(Value::as_i64)?;
            Some(TimedSample { timestamp, value })
        })
        .collect()
}

/// One day's PAI score from the PAI list response.
#[derive(Debug, Clone, PartialEq)]
pub struct PaiDay {
    pub date: String,
    pub score: f64,
}

/// Parse a PAI list response into daily scores.
pub fn parse_pai(response: &Value) -> Vec<PaiDay> {
    data_items(response)
        .filter_map(|item| {
            let date = item.get("date").and_then(Value::as_str)?;
            let score = item.get("pai").and_then(Value::as_f64)?;
            Some(PaiDay {
                date: date.to_string(),
                score,
            })
        })
        .collect()
}

/// One workout entry from the workout-history response.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    pub track_id: String,
    pub workout_type: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    pub distance_meters: Option<f64>,
    pub calories: Option<i64>,
    pub avg_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    pub source: Option<String>,
}

/// Parse a workout-history response into workout records.
///
/// Entries without a track id or start/end timestamps cannot be keyed or
/// placed in time and are skipped.
pub fn parse_workouts(response: &Value) -> Vec<WorkoutRecord> {
    data_items(response)
        .filter_map(|item| {
            // trackid arrives as a string on some firmwares, a number on others
            let track_id = match item.get("trackid") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return None,
            };

            let start = item.get("start").and_then(Value::as_i64)?;
            let end = item.get("end").and_then(Value::as_i64)?;

            Some(WorkoutRecord {
                track_id,
                workout_type: item
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                start: DateTime::from_timestamp(start, 0)?,
                end: DateTime::from_timestamp(end, 0)?,
                duration_seconds: item.get("time").and_then(Value::as_i64).unwrap_or(0),
                distance_meters: item.get("dis").and_then(Value::as_f64),
                calories: item.get("cal").and_then(Value::as_i64),
                avg_heart_rate: item.get("avg_hr").and_then(Value::as_i64),
                max_heart_rate: item.get("max_hr").and_then(Value::as_i64),
                source: item.get("source").and_then(Value::as_str).map(String::from),
            })
        })
        .collect()
}

/// Iterate the `data` array of a list response; empty when absent or not
/// an array.
fn data_items(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .get("data")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
}

fn int_field(obj: &Value, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

/// Epoch-seconds field where 0 means "not present".
fn epoch_field(obj: &Value, key: &str) -> Option<DateTime<Utc>> {
    obj.get(key)
        .and_then(Value::as_i64)
        .filter(|&secs| secs != 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
