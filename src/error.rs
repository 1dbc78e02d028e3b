// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Errors are tagged by failure class so callers can branch on the class
//! itself instead of scanning message text: the sync scheduler refreshes
//! vendor credentials on `Auth`, records `Decode`/`Transport` per domain,
//! and treats `Persistence` outside a domain boundary as fatal to the run.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Vendor credential or handshake failure. Recoverable by re-running
    /// the login handshake with the stored credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Structurally broken vendor payload (bad base64, bad JSON, truncated
    /// binary buffer). Missing optional fields are NOT decode errors.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Network or HTTP-level failure talking to the vendor cloud.
    #[error("Vendor API error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors that should trigger a credential refresh before the
    /// next sync cycle.
    pub fn is_auth(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }
}

/// Result type alias for fallible operations.
pub type Result<T> = std::result::Result<T, AppError>;
