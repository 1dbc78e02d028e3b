//! User model for storage.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Local account ID (also used as document ID)
    pub user_id: u64,
    /// Account email address
    pub email: String,
    /// When the account was created (ISO 8601)
    pub created_at: String,
    /// When the last sync pass finished (ISO 8601)
    pub last_sync: Option<String>,
}

/// Vendor credentials for a user (password encrypted in Firestore).
///
/// The bearer token pair is written by the login handshake and replaced on
/// refresh; no expiry is known up front, so a stale token only shows up as
/// a rejected vendor call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeppCredentials {
    /// Vendor account email
    pub zepp_email: String,
    /// Encrypted vendor account password (base64)
    pub zepp_password_encrypted: String,
    /// Bearer token for vendor data calls, if a handshake has succeeded
    pub app_token: Option<String>,
    /// Opaque vendor-side user id bound to the token
    pub zepp_user_id: Option<String>,
    /// When the token pair was last replaced (ISO 8601)
    pub updated_at: String,
}
