// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic sync driver.
//!
//! Every `SYNC_INTERVAL_MINUTES` it walks all users with a stored vendor
//! token and runs a full sync over the lookback window. Users are
//! processed one after another; the vendor throttles bursts, and a home
//! deployment has no need for fan-out.
//!
//! Auth-failure recovery lives here, not in the orchestrator: when a run
//! reports an auth failure (or aborts with one), the stored password is
//! used to re-run the login handshake so the next cycle has a fresh
//! token. The failed cycle itself is not retried.

use crate::config::Config;
use crate::db::HealthStore;
use crate::error::Result;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::services::sync::SyncService;
use crate::services::zepp::ZeppSession;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Periodic sync scheduler.
pub struct SyncScheduler {
    auth: AuthService,
    sync: SyncService,
    store: Arc<dyn HealthStore>,
    interval: Duration,
    lookback_days: i64,
}

impl SyncScheduler {
    pub fn new(
        auth: AuthService,
        sync: SyncService,
        store: Arc<dyn HealthStore>,
        config: &Config,
    ) -> Self {
        Self {
            auth,
            sync,
            store,
            interval: Duration::from_secs(config.sync_interval_minutes * 60),
            lookback_days: config.sync_lookback_days,
        }
    }

    /// Run sync passes until the task is dropped.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup does not
        // hammer the vendor right after a crash loop.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One pass over all users.
    pub async fn run_once(&self) {
        tracing::info!("Running automatic sync");

        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list users for sync");
                return;
            }
        };

        for user in users {
            if let Err(err) = self.sync_user(&user).await {
                tracing::error!(user_id = user.user_id, error = %err, "Sync failed");
                if err.is_auth() {
                    self.try_refresh(user.user_id).await;
                }
            }
        }
    }

    async fn sync_user(&self, user: &User) -> Result<()> {
        let Some(creds) = self.store.get_credentials(user.user_id).await? else {
            tracing::debug!(user_id = user.user_id, "No vendor credentials, skipping");
            return Ok(());
        };

        // Users whose handshake never ran (or was wiped) are skipped until
        // they reconnect; there is no token to sync with.
        let session = match ZeppSession::from_credentials(&creds) {
            Ok(session) => session,
            Err(err) if err.is_auth() => {
                tracing::debug!(user_id = user.user_id, "No vendor token stored, skipping");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let (from_date, to_date) = self.date_range();
        tracing::info!(
            user_id = user.user_id,
            from = %from_date,
            to = %to_date,
            "Syncing user"
        );

        let report = self
            .sync
            .sync_all_data(user.user_id, &session, &from_date, &to_date)
            .await?;

        if report.auth_failure {
            tracing::info!(
                user_id = user.user_id,
                "Auth failure during sync, refreshing vendor session"
            );
            self.try_refresh(user.user_id).await;
        }

        tracing::info!(
            user_id = user.user_id,
            records = report.records_synced,
            failed_domains = report.errors.len(),
            "Sync completed"
        );
        Ok(())
    }

    async fn try_refresh(&self, user_id: u64) {
        match self.auth.refresh_session(user_id).await {
            Ok(_) => tracing::info!(user_id, "Vendor session refreshed"),
            Err(err) => {
                tracing::error!(user_id, error = %err, "Failed to refresh vendor session");
            }
        }
    }

    /// Date range covering the lookback window up to today (UTC).
    fn date_range(&self) -> (String, String) {
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(self.lookback_days);
        (
            from.format("%Y-%m-%d").to_string(),
            today.format("%Y-%m-%d").to_string(),
        )
    }
}
