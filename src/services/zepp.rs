// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Zepp cloud API client.
//!
//! Handles:
//! - The two-step login handshake (redirect-based access token, then
//!   token exchange for a bearer `app_token` + vendor user id)
//! - Authenticated telemetry fetches, one method per data domain
//!
//! The endpoints are undocumented; request shapes and the fixed client
//! identifiers below mirror what the official app sends. Authentication
//! state is an explicit [`ZeppSession`] value passed into every call, so
//! one client can serve many users concurrently.

use crate::error::{AppError, Result};
use crate::models::ZeppCredentials;
use crate::services::device;
use async_trait::async_trait;
use serde_json::Value;

/// Fixed client identifiers required by the vendor login protocol.
const CLIENT_ID: &str = "HuaMi";
const REDIRECT_URI: &str = "https://s3-us-west-2.amazonws.com/hm-registration/successs498.html";
const APP_NAME: &str = "com.xiaomi.hm.health";
const APP_VERSION: &str = "6.3.5";
const COUNTRY_CODE: &str = "ES";
const DEVICE_MODEL: &str = "web";
const THIRD_NAME: &str = "huami";
const APP_PLATFORM: &str = "web";

/// Query parameter carrying the access token on the redirect URL.
const ACCESS_TOKEN_PARAM: &str = "access";

/// Vendor endpoint bases.
const AUTH_BASE_URL: &str = "https://api-user.huami.com";
const ACCOUNT_BASE_URL: &str = "https://account.huami.com";
const API_BASE_URL: &str = "https://api-mifit-de2.huami.com";

/// Bound on any single vendor call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bearer credential for vendor data calls.
///
/// Produced by [`ZeppApi::authenticate`] or rebuilt from stored
/// credentials; passed by value into every gateway call instead of living
/// as client instance state.
#[derive(Debug, Clone)]
pub struct ZeppSession {
    /// Bearer token attached to every data request
    pub app_token: String,
    /// Vendor-side user id; required for the stress/SpO2/PAI endpoints
    pub user_id: Option<String>,
}

impl ZeppSession {
    pub fn new(app_token: String, user_id: Option<String>) -> Self {
        Self { app_token, user_id }
    }

    /// Rebuild a session from stored credentials without re-running the
    /// handshake. Fails when no token has been stored yet.
    pub fn from_credentials(creds: &ZeppCredentials) -> Result<Self> {
        let app_token = creds
            .app_token
            .clone()
            .ok_or_else(|| AppError::Auth("not authenticated".to_string()))?;

        Ok(Self {
            app_token,
            user_id: creds.zepp_user_id.clone(),
        })
    }

    fn require_user_id(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| AppError::Auth("User ID not set".to_string()))
    }
}

/// Which band-data representation to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandQuery {
    /// Daily summary blobs (steps, sleep, HR aggregate)
    Summary,
    /// Per-minute detail buffers
    Detail,
}

impl BandQuery {
    pub fn as_str(self) -> &'static str {
        match self {
            BandQuery::Summary => "summary",
            BandQuery::Detail => "detail",
        }
    }
}

/// Vendor API surface, one method per data domain.
///
/// Data methods return the raw JSON body; decoding lives in
/// [`crate::services::codec`].
#[async_trait]
pub trait ZeppApi: Send + Sync {
    /// Run the two-step login handshake.
    async fn authenticate(&self, email: &str, password: &str) -> Result<ZeppSession>;

    /// Band data (daily summaries or per-minute detail) for a date range.
    async fn band_data(
        &self,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
        query: BandQuery,
    ) -> Result<Value>;

    /// Workout history list.
    async fn workout_history(&self, session: &ZeppSession) -> Result<Value>;

    /// Workout detail (GPS track) for one track id.
    async fn workout_detail(
        &self,
        session: &ZeppSession,
        track_id: &str,
        source: &str,
    ) -> Result<Value>;

    /// Stress readings for a date range.
    async fn stress(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value>;

    /// SpO2 readings for a date range.
    async fn spo2(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value>;

    /// PAI scores for a date range.
    async fn pai(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value>;
}

/// HTTP client for the Zepp cloud.
#[derive(Clone)]
pub struct ZeppClient {
    http: reqwest::Client,
    auth_base: String,
    account_base: String,
    api_base: String,
}

impl ZeppClient {
    /// Create a client against the production vendor endpoints.
    pub fn new() -> Result<Self> {
        Self::with_base_urls(AUTH_BASE_URL, ACCOUNT_BASE_URL, API_BASE_URL)
    }

    /// Create a client against custom endpoint bases.
    pub fn with_base_urls(auth_base: &str, account_base: &str, api_base: &str) -> Result<Self> {
        // The access-token step reads the Location header off a 303, so the
        // client must never follow redirects itself.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_base: auth_base.to_string(),
            account_base: account_base.to_string(),
            api_base: api_base.to_string(),
        })
    }

    /// Step 1: trade email+password for a short-lived access token.
    ///
    /// The vendor answers with a redirect whose URL carries the token as a
    /// query parameter.
    async fn request_access_token(&self, email: &str, password: &str) -> Result<String> {
        let url = format!(
            "{}/registrations/{}/tokens",
            self.auth_base,
            urlencoding::encode(email)
        );

        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", CLIENT_ID),
                ("password", password),
                ("redirect_uri", REDIRECT_URI),
                ("token", "access"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Access token request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::SEE_OTHER && status != reqwest::StatusCode::OK {
            return Err(AppError::Transport(format!(
                "Access token request returned HTTP {}",
                status
            )));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok());

        extract_access_token(location)
    }

    /// Attach the bearer token and app identifiers to a data request.
    fn authed_get(&self, session: &ZeppSession, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("apptoken", &session.app_token)
            .header("appPlatform", APP_PLATFORM)
            .header("appname", APP_NAME)
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json(&self, response: reqwest::Response) -> Result<Value> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Rejected bearer token; the caller refreshes credentials
            if status.as_u16() == 401 {
                return Err(AppError::Auth("Vendor rejected app token (401)".to_string()));
            }

            return Err(AppError::Transport(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl ZeppApi for ZeppClient {
    async fn authenticate(&self, email: &str, password: &str) -> Result<ZeppSession> {
        // Step 1: access token via redirect
        let access_token = self.request_access_token(email, password).await?;

        // Step 2: exchange for an app token, identified by a stable
        // per-account device fingerprint
        let device_id = device::fingerprint(email);
        let url = format!("{}/v2/client/login", self.account_base);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("app_name", APP_NAME),
                ("app_version", APP_VERSION),
                ("code", access_token.as_str()),
                ("country_code", COUNTRY_CODE),
                ("device_id", device_id.as_str()),
                ("device_model", DEVICE_MODEL),
                ("grant_type", "access_token"),
                ("third_name", THIRD_NAME),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Login request failed: {}", e)))?;

        let body = self.check_response_json(response).await?;
        let session = session_from_login_body(&body)?;

        tracing::info!("Vendor login handshake completed");
        Ok(session)
    }

    async fn band_data(
        &self,
        session: &ZeppSession,
        from_date: &str,
        to_date: &str,
        query: BandQuery,
    ) -> Result<Value> {
        let url = format!("{}/v1/data/band_data.json", self.api_base);
        let response = self
            .authed_get(session, &url)
            .query(&[
                ("query_type", query.as_str()),
                ("from_date", from_date),
                ("to_date", to_date),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch band data: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn workout_history(&self, session: &ZeppSession) -> Result<Value> {
        let url = format!("{}/v1/sport/run/history.json", self.api_base);
        let response = self
            .authed_get(session, &url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch workout history: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn workout_detail(
        &self,
        session: &ZeppSession,
        track_id: &str,
        source: &str,
    ) -> Result<Value> {
        let url = format!("{}/v1/sport/run/detail.json", self.api_base);
        let response = self
            .authed_get(session, &url)
            .query(&[("trackid", track_id), ("source", source)])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch workout detail: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn stress(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value> {
        let user_id = session.require_user_id()?;
        let url = format!(
            "{}/users/{}/healthStress",
            self.api_base,
            urlencoding::encode(user_id)
        );
        let response = self
            .authed_get(session, &url)
            .query(&[("from", from_date), ("to", to_date)])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch stress data: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn spo2(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value> {
        let user_id = session.require_user_id()?;
        let url = format!("{}/users/{}/spo2", self.api_base, urlencoding::encode(user_id));
        let response = self
            .authed_get(session, &url)
            .query(&[("from", from_date), ("to", to_date)])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch SpO2 data: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn pai(&self, session: &ZeppSession, from_date: &str, to_date: &str) -> Result<Value> {
        let user_id = session.require_user_id()?;
        let url = format!("{}/users/{}/pai", self.api_base, urlencoding::encode(user_id));
        let response = self
            .authed_get(session, &url)
            .query(&[("from", from_date), ("to", to_date)])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch PAI data: {}", e)))?;

        self.check_response_json(response).await
    }
}

/// Pull the access token out of the redirect `Location` URL.
fn extract_access_token(location: Option<&str>) -> Result<String> {
    let location =
        location.ok_or_else(|| AppError::Auth("No redirect location found in response".to_string()))?;

    let url = url::Url::parse(location)
        .map_err(|e| AppError::Auth(format!("Invalid redirect location: {}", e)))?;

    url.query_pairs()
        .find(|(key, _)| key == ACCESS_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::Auth("No access token found in redirect URL".to_string()))
}

/// Build a session from the login response body.
///
/// The body must carry a `token_info` object with the bearer token and the
/// vendor user id.
fn session_from_login_body(body: &Value) -> Result<ZeppSession> {
    let token_info = body
        .get("token_info")
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::Auth("No token_info in response".to_string()))?;

    let app_token = token_info
        .get("app_token")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Auth("No app_token in token_info".to_string()))?;

    // user_id is a string on current firmwares but has been seen numeric
    let user_id = match token_info.get("user_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(AppError::Auth("No user_id in token_info".to_string())),
    };

    Ok(ZeppSession::new(app_token.to_string(), Some(user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_access_token() {
        let token = extract_access_token(Some(
            "https://example.com/success.html?access=tok123&country_code=ES",
        ))
        .unwrap();
        assert_eq!(token, "tok123");
    }

    #[test]
    fn test_extract_access_token_missing_location() {
        let err = extract_access_token(None).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.to_string().contains("redirect location"));
    }

    #[test]
    fn test_extract_access_token_missing_param() {
        let err =
            extract_access_token(Some("https://example.com/success.html?country_code=ES")).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn test_extract_access_token_unparseable_location() {
        let err = extract_access_token(Some("not a url")).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn test_session_from_login_body() {
        let body = json!({
            "token_info": {"app_token": "app-tok", "user_id": "uid-1", "login_token": "x"}
        });
        let session = session_from_login_body(&body).unwrap();
        assert_eq!(session.app_token, "app-tok");
        assert_eq!(session.user_id.as_deref(), Some("uid-1"));
    }

    #[test]
    fn test_session_from_login_body_numeric_user_id() {
        let body = json!({"token_info": {"app_token": "app-tok", "user_id": 42}});
        let session = session_from_login_body(&body).unwrap();
        assert_eq!(session.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_session_from_login_body_missing_token_info() {
        let err = session_from_login_body(&json!({"result": "error"})).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.to_string().contains("token_info"));
    }

    #[test]
    fn test_session_from_credentials_requires_token() {
        let creds = ZeppCredentials {
            zepp_email: "a@b.com".to_string(),
            zepp_password_encrypted: "enc".to_string(),
            app_token: None,
            zepp_user_id: None,
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let err = ZeppSession::from_credentials(&creds).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn test_require_user_id() {
        let session = ZeppSession::new("tok".to_string(), None);
        assert!(matches!(session.require_user_id(), Err(AppError::Auth(_))));

        let session = ZeppSession::new("tok".to_string(), Some("uid".to_string()));
        assert_eq!(session.require_user_id().unwrap(), "uid");
    }

    #[test]
    fn test_band_query_strings() {
        assert_eq!(BandQuery::Summary.as_str(), "summary");
        assert_eq!(BandQuery::Detail.as_str(), "detail");
    }
}
