// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Natural keys are encoded as document ids, so every telemetry write is
//! an idempotent document upsert. Sync audit rows are the one exception:
//! they are append-only inserts with generated ids.

use crate::db::{collections, doc_ids, HealthStore};
use crate::error::{AppError, Result};
use crate::models::{
    DailySummary, HeartRateReading, PaiScore, SpO2Reading, StressReading, SyncLog, User, Workout,
    ZeppCredentials,
};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Persistence("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Read helpers for ops tooling and integration tests ──────

    /// Get one daily summary row.
    pub async fn get_daily_summary(
        &self,
        user_id: u64,
        date: &str,
    ) -> Result<Option<DailySummary>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DAILY_SUMMARIES)
            .obj()
            .one(&doc_ids::by_date(user_id, date))
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Get one heart-rate reading row.
    pub async fn get_heart_rate(
        &self,
        user_id: u64,
        timestamp: &str,
    ) -> Result<Option<HeartRateReading>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::HEART_RATE_READINGS)
            .obj()
            .one(&doc_ids::by_timestamp(user_id, timestamp))
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Get one workout row.
    pub async fn get_workout(&self, user_id: u64, track_id: &str) -> Result<Option<Workout>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(&doc_ids::by_track(user_id, track_id))
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Get all sync log rows for a user, oldest first.
    pub async fn get_sync_logs(&self, user_id: u64) -> Result<Vec<SyncLog>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SYNC_LOGS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl HealthStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.user_id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    async fn set_last_sync(&self, user_id: u64, synced_at: &str) -> Result<()> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        user.last_sync = Some(synced_at.to_string());
        self.upsert_user(&user).await
    }

    // ─── Credential Operations ───────────────────────────────────

    async fn get_credentials(&self, user_id: u64) -> Result<Option<ZeppCredentials>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ZEPP_CREDENTIALS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    async fn set_credentials(&self, user_id: u64, creds: &ZeppCredentials) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ZEPP_CREDENTIALS)
            .document_id(user_id.to_string())
            .object(creds)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    // ─── Telemetry Upserts ───────────────────────────────────────

    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DAILY_SUMMARIES)
            .document_id(doc_ids::by_date(summary.user_id, &summary.date))
            .object(summary)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_heart_rate(&self, reading: &HeartRateReading) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::HEART_RATE_READINGS)
            .document_id(doc_ids::by_timestamp(reading.user_id, &reading.timestamp))
            .object(reading)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_stress(&self, reading: &StressReading) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::STRESS_READINGS)
            .document_id(doc_ids::by_timestamp(reading.user_id, &reading.timestamp))
            .object(reading)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_spo2(&self, reading: &SpO2Reading) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SPO2_READINGS)
            .document_id(doc_ids::by_timestamp(reading.user_id, &reading.timestamp))
            .object(reading)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_pai(&self, score: &PaiScore) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PAI_SCORES)
            .document_id(doc_ids::by_date(score.user_id, &score.date))
            .object(score)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_workout(&self, workout: &Workout) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WORKOUTS)
            .document_id(doc_ids::by_track(workout.user_id, &workout.track_id))
            .object(workout)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    // ─── Audit Log ───────────────────────────────────────────────

    async fn insert_sync_log(&self, log: &SyncLog) -> Result<()> {
        let _: SyncLog = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::SYNC_LOGS)
            .generate_document_id()
            .object(log)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }
}
