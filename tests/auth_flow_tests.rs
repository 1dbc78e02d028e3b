// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential lifecycle tests: connecting a vendor account, refreshing a
//! session after auth failures, and the scheduler's recovery behavior.

use std::sync::Arc;
use zepp_sync::config::Config;
use zepp_sync::db::{HealthStore, MemoryStore};
use zepp_sync::error::AppError;
use zepp_sync::models::ZeppCredentials;
use zepp_sync::services::kms::credential_aad;
use zepp_sync::services::{
    new_sync_locks, AuthService, KmsService, SyncScheduler, SyncService, ZeppSession,
};

mod common;
use common::{memory_store, test_user, StubResponse, StubZepp};

fn auth_service(api: Arc<StubZepp>, store: Arc<MemoryStore>) -> AuthService {
    AuthService::new(api, store, KmsService::new_mock())
}

async fn seed_credentials(store: &MemoryStore, user_id: u64, app_token: Option<&str>) {
    let kms = KmsService::new_mock();
    let encrypted = kms
        .encrypt("hunter2", Some(credential_aad(user_id).as_bytes()))
        .await
        .unwrap();

    store
        .set_credentials(
            user_id,
            &ZeppCredentials {
                zepp_email: "z@example.com".to_string(),
                zepp_password_encrypted: encrypted,
                app_token: app_token.map(String::from),
                zepp_user_id: app_token.map(|_| "vendor-uid".to_string()),
                updated_at: "2024-01-01T00:00:00Z".to_string(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_connect_account_stores_encrypted_credentials() {
    let store = memory_store();
    let stub = Arc::new(StubZepp::new());
    stub.set_login_session(ZeppSession::new(
        "tok-1".to_string(),
        Some("uid-1".to_string()),
    ));
    let auth = auth_service(stub.clone(), store.clone());

    let session = auth
        .connect_account(7, "z@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(session.app_token, "tok-1");

    let creds = store.get_credentials(7).await.unwrap().expect("credentials");
    assert_eq!(creds.zepp_email, "z@example.com");
    assert_eq!(creds.app_token.as_deref(), Some("tok-1"));
    assert_eq!(creds.zepp_user_id.as_deref(), Some("uid-1"));

    // Password is stored encrypted, bound to user 7
    assert_ne!(creds.zepp_password_encrypted, "hunter2");
    let kms = KmsService::new_mock();
    let decrypted = kms
        .decrypt_with_fallback(
            &creds.zepp_password_encrypted,
            Some(credential_aad(7).as_bytes()),
        )
        .await
        .unwrap();
    assert_eq!(decrypted, "hunter2");
    assert!(kms
        .decrypt(
            &creds.zepp_password_encrypted,
            Some(credential_aad(8).as_bytes())
        )
        .await
        .is_err());
}

#[tokio::test]
async fn test_connect_account_rejects_bad_credentials() {
    let store = memory_store();
    // Stub without a login session: authenticate fails
    let auth = auth_service(Arc::new(StubZepp::new()), store.clone());

    let err = auth
        .connect_account(7, "z@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));

    // Nothing persisted for a failed handshake
    assert!(store.get_credentials(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_session_replaces_token_pair() {
    let store = memory_store();
    seed_credentials(&store, 7, Some("stale-token")).await;

    let stub = Arc::new(StubZepp::new());
    stub.set_login_session(ZeppSession::new(
        "fresh-token".to_string(),
        Some("fresh-uid".to_string()),
    ));
    let auth = auth_service(stub.clone(), store.clone());

    let session = auth.refresh_session(7).await.unwrap();
    assert_eq!(session.app_token, "fresh-token");

    // The handshake ran with the stored email and decrypted password
    let logins = stub.logins.lock().unwrap().clone();
    assert_eq!(
        logins,
        vec![("z@example.com".to_string(), "hunter2".to_string())]
    );

    let creds = store.get_credentials(7).await.unwrap().unwrap();
    assert_eq!(creds.app_token.as_deref(), Some("fresh-token"));
    assert_eq!(creds.zepp_user_id.as_deref(), Some("fresh-uid"));
}

#[tokio::test]
async fn test_refresh_session_without_credentials() {
    let store = memory_store();
    let auth = auth_service(Arc::new(StubZepp::new()), store);

    let err = auth.refresh_session(7).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_session_for_requires_stored_token() {
    let store = memory_store();
    seed_credentials(&store, 7, None).await;
    let auth = auth_service(Arc::new(StubZepp::new()), store.clone());

    let err = auth.session_for(7).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));

    seed_credentials(&store, 8, Some("tok")).await;
    let session = auth.session_for(8).await.unwrap();
    assert_eq!(session.app_token, "tok");
}

// ═══════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════

fn scheduler(api: Arc<StubZepp>, store: Arc<MemoryStore>) -> SyncScheduler {
    let auth = auth_service(api.clone(), store.clone());
    let sync = SyncService::new(api, store.clone(), new_sync_locks());
    SyncScheduler::new(auth, sync, store, &Config::test_default())
}

#[tokio::test]
async fn test_scheduler_syncs_connected_users() {
    let store = memory_store();
    store.upsert_user(&test_user(1)).await.unwrap();
    seed_credentials(&store, 1, Some("tok")).await;

    let api = Arc::new(StubZepp::new());
    scheduler(api.clone(), store.clone()).run_once().await;

    // A clean pass syncs without touching the login endpoint
    assert_eq!(api.login_count(), 0);
    assert_eq!(store.sync_logs().len(), 2);
    let user = store.get_user(1).await.unwrap().unwrap();
    assert!(user.last_sync.is_some());
}

#[tokio::test]
async fn test_scheduler_refreshes_on_auth_failure() {
    let store = memory_store();
    store.upsert_user(&test_user(1)).await.unwrap();
    seed_credentials(&store, 1, Some("stale-token")).await;

    let mut stub = StubZepp::new();
    stub.stress = StubResponse::AuthError("Vendor rejected app token (401)".to_string());
    let api = Arc::new(stub);
    api.set_login_session(ZeppSession::new(
        "fresh-token".to_string(),
        Some("fresh-uid".to_string()),
    ));

    scheduler(api.clone(), store.clone()).run_once().await;

    // The auth failure triggered exactly one refresh handshake
    assert_eq!(api.login_count(), 1);
    let creds = store.get_credentials(1).await.unwrap().unwrap();
    assert_eq!(creds.app_token.as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn test_scheduler_skips_unconnected_users() {
    let store = memory_store();
    // User 1 has no credentials at all; user 2 never completed a handshake
    store.upsert_user(&test_user(1)).await.unwrap();
    store.upsert_user(&test_user(2)).await.unwrap();
    seed_credentials(&store, 2, None).await;

    let api = Arc::new(StubZepp::new());
    scheduler(api.clone(), store.clone()).run_once().await;

    assert!(api.recorded_calls().is_empty());
    assert!(store.sync_logs().is_empty());
}
