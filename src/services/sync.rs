// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync orchestrator.
//!
//! One run ingests six data domains for one user and date range, in a
//! fixed sequential order: band summary → heart-rate detail → stress →
//! SpO2 → PAI → workouts. The order and the seriality are deliberate:
//! the vendor endpoints are undocumented and rate-sensitive, and bursts
//! get throttled.
//!
//! Failure handling per run:
//! - a domain failure is recorded and the run moves on (one dead endpoint
//!   must not block the other five domains)
//! - a malformed day inside a domain is skipped without failing the domain
//! - only a store failure outside the per-domain boundary aborts the run,
//!   leaving a `failed` audit row
//!
//! Every upsert is keyed by the record's natural key, so re-running a
//! sync over the same payloads rewrites rows instead of duplicating them.

use crate::db::HealthStore;
use crate::error::{AppError, Result};
use crate::models::{
    DailySummary, HeartRateReading, PaiScore, SpO2Reading, StressReading, SyncLog, SyncStatus,
    Workout,
};
use crate::services::codec;
use crate::services::zepp::{BandQuery, ZeppApi, ZeppSession};
use crate::time_utils::{format_utc_rfc3339, parse_utc_day};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scope tag written to every audit row of a full six-domain run.
const SYNC_TYPE_FULL: &str = "full_sync";

/// Per-user locks serializing concurrent sync runs for the same user.
///
/// Shared across all `SyncService` clones within one process, like the
/// per-user token refresh locks: a manual "sync now" racing the scheduled
/// pass waits instead of interleaving writes to the same rows.
pub type SyncLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Create an empty lock map for sharing across services.
pub fn new_sync_locks() -> SyncLocks {
    Arc::new(DashMap::new())
}

/// Outcome of one sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// True when every domain succeeded
    pub success: bool,
    /// Records upserted across all domains
    pub records_synced: u32,
    /// One human-readable entry per failed domain
    pub errors: Vec<String>,
    /// True when some domain failed with an auth error; the caller should
    /// refresh the vendor session before the next run
    pub auth_failure: bool,
}

/// Orchestrates vendor fetch → decode → upsert for one user at a time.
#[derive(Clone)]
pub struct SyncService {
    api: Arc<dyn ZeppApi>,
    store: Arc<dyn HealthStore>,
    sync_locks: SyncLocks,
}

impl SyncService {
    pub fn new(api: Arc<dyn ZeppApi>, store: Arc<dyn HealthStore>, sync_locks: SyncLocks) -> Self {
        Self {
            api,
            store,
            sync_locks,
        }
    }

    /// Sync all six data domains for a date range (`YYYY-MM-DD` bounds).
    pub async fn sync_all_data(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<SyncReport> {
        parse_day(from_date)
            .map_err(|_| AppError::BadRequest(format!("Invalid from_date: {}", from_date)))?;
        parse_day(to_date)
            .map_err(|_| AppError::BadRequest(format!("Invalid to_date: {}", to_date)))?;

        // Serialize concurrent runs for the same user
        let lock = self
            .sync_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut records_synced: u32 = 0;
        let mut errors: Vec<String> = Vec::new();
        let mut auth_failure = false;

        let run = self
            .run_domains(
                user_id,
                session,
                from_date,
                to_date,
                &mut records_synced,
                &mut errors,
                &mut auth_failure,
            )
            .await;

        match run {
            Ok(()) => Ok(SyncReport {
                success: errors.is_empty(),
                records_synced,
                errors,
                auth_failure,
            }),
            Err(err) => {
                // The run aborted outside the per-domain boundary (store
                // failure). Leave a failed audit row if the store lets us.
                let log = self.log_row(
                    user_id,
                    SyncStatus::Failed,
                    from_date,
                    to_date,
                    Some(records_synced),
                    Some(err.to_string()),
                );
                if let Err(log_err) = self.store.insert_sync_log(&log).await {
                    tracing::error!(user_id, error = %log_err, "Failed to write failed-run audit row");
                }
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_domains(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
        records_synced: &mut u32,
        errors: &mut Vec<String>,
        auth_failure: &mut bool,
    ) -> Result<()> {
        let started = self.log_row(user_id, SyncStatus::Started, from_date, to_date, None, None);
        self.store.insert_sync_log(&started).await?;

        record_outcome(
            self.sync_band_summaries(user_id, session, from_date, to_date)
                .await,
            "Band data sync failed",
            records_synced,
            errors,
            auth_failure,
        );
        record_outcome(
            self.sync_heart_rate_detail(user_id, session, from_date, to_date)
                .await,
            "Heart rate detail sync failed",
            records_synced,
            errors,
            auth_failure,
        );
        record_outcome(
            self.sync_stress(user_id, session, from_date, to_date).await,
            "Stress data sync failed",
            records_synced,
            errors,
            auth_failure,
        );
        record_outcome(
            self.sync_spo2(user_id, session, from_date, to_date).await,
            "SpO2 data sync failed",
            records_synced,
            errors,
            auth_failure,
        );
        record_outcome(
            self.sync_pai(user_id, session, from_date, to_date).await,
            "PAI data sync failed",
            records_synced,
            errors,
            auth_failure,
        );
        record_outcome(
            self.sync_workouts(user_id, session).await,
            "Workout sync failed",
            records_synced,
            errors,
            auth_failure,
        );

        self.store
            .set_last_sync(user_id, &format_utc_rfc3339(Utc::now()))
            .await?;

        let error_message = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };
        // Domain failures do not flip the terminal status: the run itself
        // finished, and callers inspect `errors` for partial failure.
        let completed = self.log_row(
            user_id,
            SyncStatus::Completed,
            from_date,
            to_date,
            Some(*records_synced),
            error_message,
        );
        self.store.insert_sync_log(&completed).await?;

        tracing::info!(
            user_id,
            records = *records_synced,
            failed_domains = errors.len(),
            "Sync run finished"
        );
        Ok(())
    }

    // ─── Domain: band summaries ──────────────────────────────────

    async fn sync_band_summaries(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<u32> {
        let body = self
            .api
            .band_data(session, from_date, to_date, BandQuery::Summary)
            .await?;

        let mut count = 0;
        for day in day_entries(&body) {
            match self.ingest_summary_day(user_id, day).await {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "Skipping malformed summary day");
                }
            }
        }
        Ok(count)
    }

    /// Returns false for entries missing the date or summary blob.
    async fn ingest_summary_day(&self, user_id: u64, day: &Value) -> Result<bool> {
        let Some(date) = day.get("date_time").and_then(Value::as_str) else {
            return Ok(false);
        };
        let Some(blob) = day.get("summary").and_then(Value::as_str) else {
            return Ok(false);
        };

        let summary = codec::decode_summary(blob)?;
        let activity = codec::parse_activity(&summary);
        let sleep = codec::parse_sleep(&summary);
        let hr = codec::parse_heart_rate_summary(&summary);

        let row = DailySummary {
            user_id,
            date: date.to_string(),
            steps: activity.steps.unwrap_or(0),
            distance_meters: activity.distance_meters.unwrap_or(0.0),
            calories: activity.calories.unwrap_or(0),
            sleep_start: sleep.start.map(format_utc_rfc3339),
            sleep_end: sleep.end.map(format_utc_rfc3339),
            sleep_duration: sleep.total_minutes,
            deep_sleep: sleep.deep_minutes,
            light_sleep: sleep.light_minutes,
            rem_sleep: sleep.rem_minutes,
            awake_time: sleep.awake_minutes,
            heart_rate_avg: hr.avg,
            heart_rate_max: hr.max,
            heart_rate_min: hr.min,
            hrv_avg: hr.hrv,
            synced_at: format_utc_rfc3339(Utc::now()),
        };

        self.store.upsert_daily_summary(&row).await?;
        Ok(true)
    }

    // ─── Domain: heart-rate detail ───────────────────────────────

    async fn sync_heart_rate_detail(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<u32> {
        let body = self
            .api
            .band_data(session, from_date, to_date, BandQuery::Detail)
            .await?;

        let mut count = 0;
        for day in day_entries(&body) {
            if let Err(err) = self.ingest_heart_rate_day(user_id, day, &mut count).await {
                tracing::warn!(user_id, error = %err, "Skipping malformed heart-rate day");
            }
        }
        Ok(count)
    }

    async fn ingest_heart_rate_day(
        &self,
        user_id: u64,
        day: &Value,
        count: &mut u32,
    ) -> Result<()> {
        let Some(buffer) = day.get("data_hr").and_then(Value::as_str) else {
            return Ok(());
        };
        let Some(date) = day.get("date_time").and_then(Value::as_str) else {
            return Ok(());
        };

        let day_start = parse_day(date)?;
        for (timestamp, bpm) in codec::decode_heart_rate_buffer(buffer, day_start)? {
            self.store
                .upsert_heart_rate(&HeartRateReading {
                    user_id,
                    timestamp: format_utc_rfc3339(timestamp),
                    heart_rate: bpm,
                })
                .await?;
            *count += 1;
        }
        Ok(())
    }

    // ─── Domain: stress ──────────────────────────────────────────

    async fn sync_stress(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<u32> {
        let body = self.api.stress(session, from_date, to_date).await?;

        let mut count = 0;
        for sample in codec::parse_stress(&body) {
            self.store
                .upsert_stress(&StressReading {
                    user_id,
                    timestamp: format_utc_rfc3339(sample.timestamp),
                    stress_level: sample.value,
                })
                .await?;
            count += 1;
        }
        Ok(count)
    }

    // ─── Domain: SpO2 ────────────────────────────────────────────

    async fn sync_spo2(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<u32> {
        let body = self.api.spo2(session, from_date, to_date).await?;

        let mut count = 0;
        for sample in codec::parse_spo2(&body) {
            self.store
                .upsert_spo2(&SpO2Reading {
                    user_id,
                    timestamp: format_utc_rfc3339(sample.timestamp),
                    spo2_value: sample.value,
                })
                .await?;
            count += 1;
        }
        Ok(count)
    }

    // ─── Domain: PAI ─────────────────────────────────────────────

    async fn sync_pai(
        &self,
        user_id: u64,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
    ) -> Result<u32> {
        let body = self.api.pai(session, from_date, to_date).await?;

        let mut count = 0;
        for day in codec::parse_pai(&body) {
            self.store
                .upsert_pai(&PaiScore {
                    user_id,
                    date: day.date,
                    pai_score: day.score,
                })
                .await?;
            count += 1;
        }
        Ok(count)
    }

    // ─── Domain: workouts ────────────────────────────────────────

    async fn sync_workouts(&self, user_id: u64, session: &ZeppSession) -> Result<u32> {
        let body = self.api.workout_history(session).await?;

        let mut count = 0;
        for workout in codec::parse_workouts(&body) {
            self.store
                .upsert_workout(&Workout {
                    user_id,
                    track_id: workout.track_id,
                    workout_type: workout.workout_type,
                    start_time: format_utc_rfc3339(workout.start),
                    end_time: format_utc_rfc3339(workout.end),
                    duration_seconds: workout.duration_seconds,
                    distance_meters: workout.distance_meters,
                    calories: workout.calories,
                    avg_heart_rate: workout.avg_heart_rate,
                    max_heart_rate: workout.max_heart_rate,
                    source: workout.source,
                })
                .await?;
            count += 1;
        }
        Ok(count)
    }

    fn log_row(
        &self,
        user_id: u64,
        status: SyncStatus,
        from_date: &str,
        to_date: &str,
        records_synced: Option<u32>,
        error_message: Option<String>,
    ) -> SyncLog {
        SyncLog {
            user_id,
            sync_type: SYNC_TYPE_FULL.to_string(),
            status,
            date_from: from_date.to_string(),
            date_to: to_date.to_string(),
            records_synced,
            error_message,
            created_at: format_utc_rfc3339(Utc::now()),
        }
    }
}

/// Record one domain outcome: accumulate the count or the error string.
fn record_outcome(
    result: Result<u32>,
    label: &str,
    records_synced: &mut u32,
    errors: &mut Vec<String>,
    auth_failure: &mut bool,
) {
    match result {
        Ok(count) => *records_synced += count,
        Err(err) => {
            if err.is_auth() {
                *auth_failure = true;
            }
            tracing::warn!(error = %err, "{}", label);
            errors.push(format!("{}: {}", label, err));
        }
    }
}

/// Iterate the per-day entries of a band-data response.
fn day_entries(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
}

/// Parse a `YYYY-MM-DD` day into its UTC midnight.
fn parse_day(date: &str) -> Result<chrono::DateTime<Utc>> {
    parse_utc_day(date).map_err(|e| AppError::Decode(format!("Invalid date {}: {}", date, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome_accumulates_counts() {
        let mut records = 5;
        let mut errors = Vec::new();
        let mut auth_failure = false;

        record_outcome(Ok(3), "Band data sync failed", &mut records, &mut errors, &mut auth_failure);

        assert_eq!(records, 8);
        assert!(errors.is_empty());
        assert!(!auth_failure);
    }

    #[test]
    fn test_record_outcome_records_errors() {
        let mut records = 0;
        let mut errors = Vec::new();
        let mut auth_failure = false;

        record_outcome(
            Err(AppError::Transport("HTTP 502: bad gateway".to_string())),
            "PAI data sync failed",
            &mut records,
            &mut errors,
            &mut auth_failure,
        );

        assert_eq!(records, 0);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("PAI data sync failed:"));
        assert!(!auth_failure);
    }

    #[test]
    fn test_record_outcome_flags_auth_errors() {
        let mut records = 0;
        let mut errors = Vec::new();
        let mut auth_failure = false;

        record_outcome(
            Err(AppError::Auth("Vendor rejected app token (401)".to_string())),
            "Stress data sync failed",
            &mut records,
            &mut errors,
            &mut auth_failure,
        );

        assert!(auth_failure);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_parse_day() {
        let day = parse_day("2024-01-01").unwrap();
        assert_eq!(format_utc_rfc3339(day), "2024-01-01T00:00:00Z");
        assert!(parse_day("01/01/2024").is_err());
    }
}
