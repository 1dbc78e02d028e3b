// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: a scriptable stub of the vendor API, payload
//! builders, and emulator gating for the Firestore integration tests.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zepp_sync::db::{FirestoreDb, MemoryStore};
use zepp_sync::error::{AppError, Result};
use zepp_sync::models::User;
use zepp_sync::services::{BandQuery, ZeppApi, ZeppSession};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create an in-memory store.
#[allow(dead_code)]
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// A basic test user.
#[allow(dead_code)]
pub fn test_user(user_id: u64) -> User {
    User {
        user_id,
        email: format!("user{}@example.com", user_id),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        last_sync: None,
    }
}

/// A session as produced by a successful handshake.
#[allow(dead_code)]
pub fn test_session() -> ZeppSession {
    ZeppSession::new("app-token".to_string(), Some("vendor-uid".to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════
// PAYLOAD BUILDERS
// ═══════════════════════════════════════════════════════════════════════════

/// Base64-encode a summary object the way the vendor wraps it.
#[allow(dead_code)]
pub fn summary_blob(summary: &Value) -> String {
    BASE64.encode(summary.to_string())
}

/// Band-data summary response for the given (date, summary) days.
#[allow(dead_code)]
pub fn band_summary_body(days: &[(&str, &Value)]) -> Value {
    let data: Vec<Value> = days
        .iter()
        .map(|(date, summary)| json!({"date_time": date, "summary": summary_blob(summary)}))
        .collect();
    json!({ "data": data })
}

/// Band-data detail response carrying per-minute heart-rate buffers.
#[allow(dead_code)]
pub fn band_detail_body(days: &[(&str, &[u16])]) -> Value {
    let data: Vec<Value> = days
        .iter()
        .map(|(date, samples)| {
            let bytes: Vec<u8> = samples.iter().flat_map(|v| v.to_be_bytes()).collect();
            json!({"date_time": date, "data_hr": BASE64.encode(&bytes)})
        })
        .collect();
    json!({ "data": data })
}

/// The reference daily summary used by the end-to-end test.
#[allow(dead_code)]
pub fn canonical_summary() -> Value {
    json!({
        "ttl": 8342,
        "dis": 5200,
        "cal": 310,
        "slp": {"st": 1700000000, "ed": 1700028800, "tt": 420, "dp": 90,
                "lt": 280, "rm": 50, "wk": 10},
        "hr": {"avg": 68, "max": 140, "min": 52, "hrv": 45}
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// STUB VENDOR API
// ═══════════════════════════════════════════════════════════════════════════

/// Scripted response for one stubbed domain.
#[derive(Clone)]
#[allow(dead_code)]
pub enum StubResponse {
    Ok(Value),
    TransportError(String),
    AuthError(String),
}

impl StubResponse {
    fn to_result(&self) -> Result<Value> {
        match self {
            StubResponse::Ok(value) => Ok(value.clone()),
            StubResponse::TransportError(msg) => Err(AppError::Transport(msg.clone())),
            StubResponse::AuthError(msg) => Err(AppError::Auth(msg.clone())),
        }
    }
}

impl Default for StubResponse {
    fn default() -> Self {
        StubResponse::Ok(json!({}))
    }
}

/// Scriptable in-process stand-in for the Zepp cloud.
///
/// Each domain serves a canned [`StubResponse`]; calls are recorded in
/// order, and `band_data` tracks concurrent callers so tests can assert
/// same-user runs are serialized.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubZepp {
    pub band_summary: StubResponse,
    pub band_detail: StubResponse,
    pub stress: StubResponse,
    pub spo2: StubResponse,
    pub pai: StubResponse,
    pub workouts: StubResponse,
    /// Session handed out by `authenticate`
    pub login_session: Mutex<Option<ZeppSession>>,
    /// (email, password) pairs passed to `authenticate`
    pub logins: Mutex<Vec<(String, String)>>,
    /// Domain call order, e.g. ["band_data/summary", "stress", ...]
    pub calls: Mutex<Vec<String>>,
    /// Artificial latency inside `band_data`
    pub band_delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[allow(dead_code)]
impl StubZepp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub answering every domain with the given bodies.
    pub fn with_bodies(
        band_summary: Value,
        band_detail: Value,
        stress: Value,
        spo2: Value,
        pai: Value,
        workouts: Value,
    ) -> Self {
        Self {
            band_summary: StubResponse::Ok(band_summary),
            band_detail: StubResponse::Ok(band_detail),
            stress: StubResponse::Ok(stress),
            spo2: StubResponse::Ok(spo2),
            pai: StubResponse::Ok(pai),
            workouts: StubResponse::Ok(workouts),
            ..Self::default()
        }
    }

    pub fn set_login_session(&self, session: ZeppSession) {
        *self.login_session.lock().unwrap() = Some(session);
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    /// Highest number of band-data calls in flight at once.
    pub fn max_concurrent_band_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl ZeppApi for StubZepp {
    async fn authenticate(&self, email: &str, password: &str) -> Result<ZeppSession> {
        self.record("authenticate");
        self.logins
            .lock()
            .unwrap()
            .push((email.to_string(), password.to_string()));

        self.login_session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Auth("No token_info in response".to_string()))
    }

    async fn band_data(
        &self,
        _session: &ZeppSession,
        _from_date: &str,
        _to_date: &str,
        query: BandQuery,
    ) -> Result<Value> {
        self.record(&format!("band_data/{}", query.as_str()));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if let Some(delay) = self.band_delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match query {
            BandQuery::Summary => self.band_summary.to_result(),
            BandQuery::Detail => self.band_detail.to_result(),
        }
    }

    async fn workout_history(&self, _session: &ZeppSession) -> Result<Value> {
        self.record("workout_history");
        self.workouts.to_result()
    }

    async fn workout_detail(
        &self,
        _session: &ZeppSession,
        track_id: &str,
        _source: &str,
    ) -> Result<Value> {
        self.record(&format!("workout_detail/{}", track_id));
        Ok(json!({}))
    }

    async fn stress(&self, session: &ZeppSession, _from: &str, _to: &str) -> Result<Value> {
        self.record("stress");
        require_user_id(session)?;
        self.stress.to_result()
    }

    async fn spo2(&self, session: &ZeppSession, _from: &str, _to: &str) -> Result<Value> {
        self.record("spo2");
        require_user_id(session)?;
        self.spo2.to_result()
    }

    async fn pai(&self, session: &ZeppSession, _from: &str, _to: &str) -> Result<Value> {
        self.record("pai");
        require_user_id(session)?;
        self.pai.to_result()
    }
}

#[allow(dead_code)]
fn require_user_id(session: &ZeppSession) -> Result<()> {
    if session.user_id.is_none() {
        return Err(AppError::Auth("User ID not set".to_string()));
    }
    Ok(())
}
