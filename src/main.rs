// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Zepp-Sync daemon
//!
//! Wires the Firestore store, the KMS credential vault and the Zepp cloud
//! client together and runs the periodic sync scheduler until shutdown.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zepp_sync::{
    config::Config,
    db::{FirestoreDb, HealthStore},
    services::{new_sync_locks, AuthService, KmsService, SyncScheduler, SyncService, ZeppApi, ZeppClient},
};

/// KMS key used to encrypt stored vendor passwords.
const CREDENTIAL_KEY_NAME: &str = "credential-encryption";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        interval_minutes = config.sync_interval_minutes,
        lookback_days = config.sync_lookback_days,
        "Starting Zepp-Sync"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");
    let store: Arc<dyn HealthStore> = Arc::new(db);

    // Initialize KMS service
    let kms = KmsService::new(&config.gcp_project_id, &config.gcp_region, CREDENTIAL_KEY_NAME)
        .await
        .expect("Failed to initialize KMS service");
    tracing::info!("KMS service initialized");

    // Initialize Zepp cloud client
    let zepp: Arc<dyn ZeppApi> = Arc::new(ZeppClient::new().expect("Failed to build Zepp client"));

    // Per-user locks shared by every sync entry point in this process
    let sync_locks = new_sync_locks();

    let auth_service = AuthService::new(zepp.clone(), store.clone(), kms);
    let sync_service = SyncService::new(zepp, store.clone(), sync_locks);
    let scheduler = SyncScheduler::new(auth_service, sync_service, store, &config);

    // Run until ctrl-c
    tokio::select! {
        _ = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received, stopping scheduler");
        }
    }

    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zepp_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
