// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store implementation.
//!
//! Used by tests and for local development without GCP. Mirrors the
//! Firestore key scheme exactly, so key-collision (idempotence) behavior
//! matches production. `set_failing(true)` makes every write return a
//! persistence error, to exercise store-outage paths.

use crate::db::{doc_ids, HealthStore};
use crate::error::{AppError, Result};
use crate::models::{
    DailySummary, HeartRateReading, PaiScore, SpO2Reading, StressReading, SyncLog, User, Workout,
    ZeppCredentials,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// In-memory health store.
pub struct MemoryStore {
    users: DashMap<u64, User>,
    credentials: DashMap<u64, ZeppCredentials>,
    daily_summaries: DashMap<String, DailySummary>,
    heart_rate: DashMap<String, HeartRateReading>,
    stress: DashMap<String, StressReading>,
    spo2: DashMap<String, SpO2Reading>,
    pai: DashMap<String, PaiScore>,
    workouts: DashMap<String, Workout>,
    sync_logs: Mutex<Vec<SyncLog>>,
    /// Writes remaining before the store starts failing; -1 disables.
    fail_after: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            credentials: DashMap::new(),
            daily_summaries: DashMap::new(),
            heart_rate: DashMap::new(),
            stress: DashMap::new(),
            spo2: DashMap::new(),
            pai: DashMap::new(),
            workouts: DashMap::new(),
            sync_logs: Mutex::new(Vec::new()),
            fail_after: AtomicI64::new(-1),
        }
    }

    /// Make every subsequent write fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.fail_after
            .store(if failing { 0 } else { -1 }, Ordering::SeqCst);
    }

    /// Let the next `n` writes succeed, then fail every one after.
    pub fn fail_after_writes(&self, n: i64) {
        self.fail_after.store(n, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        let remaining = self.fail_after.load(Ordering::SeqCst);
        if remaining < 0 {
            return Ok(());
        }
        if remaining == 0 {
            return Err(AppError::Persistence("Store unavailable".to_string()));
        }
        self.fail_after.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    // ─── Inspection helpers for tests ────────────────────────────

    pub fn daily_summary(&self, user_id: u64, date: &str) -> Option<DailySummary> {
        self.daily_summaries
            .get(&doc_ids::by_date(user_id, date))
            .map(|r| r.value().clone())
    }

    pub fn heart_rate(&self, user_id: u64, timestamp: &str) -> Option<HeartRateReading> {
        self.heart_rate
            .get(&doc_ids::by_timestamp(user_id, timestamp))
            .map(|r| r.value().clone())
    }

    pub fn workout(&self, user_id: u64, track_id: &str) -> Option<Workout> {
        self.workouts
            .get(&doc_ids::by_track(user_id, track_id))
            .map(|r| r.value().clone())
    }

    pub fn daily_summary_count(&self) -> usize {
        self.daily_summaries.len()
    }

    pub fn heart_rate_count(&self) -> usize {
        self.heart_rate.len()
    }

    pub fn stress_count(&self) -> usize {
        self.stress.len()
    }

    pub fn spo2_count(&self) -> usize {
        self.spo2.len()
    }

    pub fn pai_count(&self) -> usize {
        self.pai.len()
    }

    pub fn workout_count(&self) -> usize {
        self.workouts.len()
    }

    /// All sync log rows in insertion order.
    pub fn sync_logs(&self) -> Vec<SyncLog> {
        self.sync_logs.lock().expect("sync_logs poisoned").clone()
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.check_writable()?;
        self.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    async fn set_last_sync(&self, user_id: u64, synced_at: &str) -> Result<()> {
        self.check_writable()?;
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
        user.last_sync = Some(synced_at.to_string());
        Ok(())
    }

    async fn get_credentials(&self, user_id: u64) -> Result<Option<ZeppCredentials>> {
        Ok(self.credentials.get(&user_id).map(|r| r.value().clone()))
    }

    async fn set_credentials(&self, user_id: u64, creds: &ZeppCredentials) -> Result<()> {
        self.check_writable()?;
        self.credentials.insert(user_id, creds.clone());
        Ok(())
    }

    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()> {
        self.check_writable()?;
        self.daily_summaries.insert(
            doc_ids::by_date(summary.user_id, &summary.date),
            summary.clone(),
        );
        Ok(())
    }

    async fn upsert_heart_rate(&self, reading: &HeartRateReading) -> Result<()> {
        self.check_writable()?;
        self.heart_rate.insert(
            doc_ids::by_timestamp(reading.user_id, &reading.timestamp),
            reading.clone(),
        );
        Ok(())
    }

    async fn upsert_stress(&self, reading: &StressReading) -> Result<()> {
        self.check_writable()?;
        self.stress.insert(
            doc_ids::by_timestamp(reading.user_id, &reading.timestamp),
            reading.clone(),
        );
        Ok(())
    }

    async fn upsert_spo2(&self, reading: &SpO2Reading) -> Result<()> {
        self.check_writable()?;
        self.spo2.insert(
            doc_ids::by_timestamp(reading.user_id, &reading.timestamp),
            reading.clone(),
        );
        Ok(())
    }

    async fn upsert_pai(&self, score: &PaiScore) -> Result<()> {
        self.check_writable()?;
        self.pai
            .insert(doc_ids::by_date(score.user_id, &score.date), score.clone());
        Ok(())
    }

    async fn upsert_workout(&self, workout: &Workout) -> Result<()> {
        self.check_writable()?;
        self.workouts.insert(
            doc_ids::by_track(workout.user_id, &workout.track_id),
            workout.clone(),
        );
        Ok(())
    }

    async fn insert_sync_log(&self, log: &SyncLog) -> Result<()> {
        self.check_writable()?;
        self.sync_logs
            .lock()
            .expect("sync_logs poisoned")
            .push(log.clone());
        Ok(())
    }
}
