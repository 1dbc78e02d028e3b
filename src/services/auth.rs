// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vendor credential management.
//!
//! Owns the credential lifecycle around the login handshake:
//! - `connect_account` validates fresh credentials against the vendor
//!   before anything is persisted (account-registration path)
//! - `refresh_session` re-runs the handshake with the stored password and
//!   replaces the token pair (auth-failure recovery path)
//!
//! The vendor password is stored KMS-encrypted, bound to the owning user
//! via AAD, and decrypted only transiently inside these calls.

use crate::db::HealthStore;
use crate::error::{AppError, Result};
use crate::models::ZeppCredentials;
use crate::services::kms::{credential_aad, KmsService};
use crate::services::zepp::{ZeppApi, ZeppSession};
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;

/// Credential vault and handshake driver.
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn ZeppApi>,
    store: Arc<dyn HealthStore>,
    kms: KmsService,
}

impl AuthService {
    pub fn new(api: Arc<dyn ZeppApi>, store: Arc<dyn HealthStore>, kms: KmsService) -> Self {
        Self { api, store, kms }
    }

    /// Connect a vendor account to a local user.
    ///
    /// Runs the handshake first so invalid credentials are rejected before
    /// anything is written, then persists the encrypted password together
    /// with the fresh token pair.
    pub async fn connect_account(
        &self,
        user_id: u64,
        zepp_email: &str,
        zepp_password: &str,
    ) -> Result<ZeppSession> {
        let session = self.api.authenticate(zepp_email, zepp_password).await?;

        let aad = credential_aad(user_id);
        let encrypted = self
            .kms
            .encrypt(zepp_password, Some(aad.as_bytes()))
            .await?;

        let creds = ZeppCredentials {
            zepp_email: zepp_email.to_string(),
            zepp_password_encrypted: encrypted,
            app_token: Some(session.app_token.clone()),
            zepp_user_id: session.user_id.clone(),
            updated_at: format_utc_rfc3339(chrono::Utc::now()),
        };
        self.store.set_credentials(user_id, &creds).await?;

        tracing::info!(user_id, "Vendor account connected");
        Ok(session)
    }

    /// Re-run the login handshake for a user and persist the replaced
    /// token pair.
    ///
    /// Called between sync cycles when a run reported an auth failure; the
    /// orchestrator itself never retries within a run.
    pub async fn refresh_session(&self, user_id: u64) -> Result<ZeppSession> {
        let mut creds = self
            .store
            .get_credentials(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Credentials for user {}", user_id)))?;

        let aad = credential_aad(user_id);
        let password = self
            .kms
            .decrypt_with_fallback(&creds.zepp_password_encrypted, Some(aad.as_bytes()))
            .await?;

        let session = self.api.authenticate(&creds.zepp_email, &password).await?;

        creds.app_token = Some(session.app_token.clone());
        creds.zepp_user_id = session.user_id.clone();
        creds.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.store.set_credentials(user_id, &creds).await?;

        tracing::info!(user_id, "Vendor session refreshed");
        Ok(session)
    }

    /// Build a session from stored credentials without touching the vendor.
    pub async fn session_for(&self, user_id: u64) -> Result<ZeppSession> {
        let creds = self
            .store
            .get_credentials(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Credentials for user {}", user_id)))?;

        ZeppSession::from_credentials(&creds)
    }
}
