// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud KMS service for encrypting/decrypting stored vendor credentials.
//!
//! Uses direct KMS encryption (not envelope encryption) for simplicity.
//! Ciphertexts are bound to their owning user via additional authenticated
//! data, so a ciphertext copied onto another user's record will not decrypt.
//! `decrypt_with_fallback` still accepts rows written before AAD binding.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Mock ciphertext prefixes (offline mode only).
const MOCK_AAD_PREFIX: &str = "AAD:";
const MOCK_NOAAD_PREFIX: &str = "NOAAD:";

/// AAD string binding a ciphertext to a local user record.
pub fn credential_aad(user_id: u64) -> String {
    format!("user_id:{}", user_id)
}

/// KMS encryption service.
#[derive(Clone)]
pub struct KmsService {
    /// Full resource path to the KMS key
    /// Format: projects/{project}/locations/{location}/keyRings/{ring}/cryptoKeys/{key}
    key_path: String,

    /// GCP KMS client
    client: Option<std::sync::Arc<google_cloud_kms::client::Client>>,
}

impl KmsService {
    /// KMS Key Ring Name
    const KEY_RING_NAME: &str = "zepp-sync";

    /// Create a new KMS service.
    /// Connects to GCP KMS.
    pub async fn new(project_id: &str, location: &str, key_name: &str) -> Result<Self> {
        let key_path = format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            project_id,
            location,
            Self::KEY_RING_NAME,
            key_name
        );

        let config = google_cloud_kms::client::ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create KMS auth config: {}", e))
            })?;

        let client = google_cloud_kms::client::Client::new(config)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create KMS client: {}", e))
            })?;

        Ok(Self {
            key_path,
            client: Some(std::sync::Arc::new(client)),
        })
    }

    /// Create a mock KMS service for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            key_path: "projects/mock/locations/mock/keyRings/mock/cryptoKeys/mock".to_string(),
            client: None,
        }
    }

    /// Encrypt plaintext data using KMS, optionally bound to AAD.
    /// Returns base64-encoded ciphertext.
    pub async fn encrypt(&self, plaintext: &str, aad: Option<&[u8]>) -> Result<String> {
        use google_cloud_googleapis::cloud::kms::v1::EncryptRequest;

        // Mock mode
        if self.client.is_none() {
            return Ok(match aad {
                Some(aad) => format!(
                    "{}{}:{}",
                    MOCK_AAD_PREFIX,
                    BASE64.encode(aad),
                    BASE64.encode(plaintext)
                ),
                None => format!("{}{}", MOCK_NOAAD_PREFIX, BASE64.encode(plaintext)),
            });
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("KMS client not connected")))?;

        let req = EncryptRequest {
            name: self.key_path.clone(),
            plaintext: plaintext.as_bytes().to_vec(),
            additional_authenticated_data: aad.map(<[u8]>::to_vec).unwrap_or_default(),
            ..Default::default()
        };

        let response = client
            .encrypt(req, None)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("KMS encrypt failed: {}", e)))?;

        Ok(BASE64.encode(response.ciphertext))
    }

    /// Decrypt ciphertext using KMS with the AAD it was encrypted under.
    /// Expects base64-encoded ciphertext.
    pub async fn decrypt(&self, ciphertext_b64: &str, aad: Option<&[u8]>) -> Result<String> {
        use google_cloud_googleapis::cloud::kms::v1::DecryptRequest;

        // Mock mode
        if self.client.is_none() {
            return Self::mock_decrypt(ciphertext_b64, aad);
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("KMS client not connected")))?;

        let ciphertext = BASE64.decode(ciphertext_b64).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Base64 ciphertext decode failed: {}", e))
        })?;

        let req = DecryptRequest {
            name: self.key_path.clone(),
            ciphertext,
            additional_authenticated_data: aad.map(<[u8]>::to_vec).unwrap_or_default(),
            ..Default::default()
        };

        let response = client
            .decrypt(req, None)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("KMS decrypt failed: {}", e)))?;

        String::from_utf8(response.plaintext)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed: {}", e)))
    }

    /// Decrypt with a fallback for rows written before AAD binding.
    ///
    /// Tries AAD-bound decryption first, then a plain KMS decrypt; in mock
    /// mode a bare base64 ciphertext is accepted as pre-KMS legacy data.
    pub async fn decrypt_with_fallback(
        &self,
        ciphertext_b64: &str,
        aad: Option<&[u8]>,
    ) -> Result<String> {
        let primary_err = match self.decrypt(ciphertext_b64, aad).await {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => e,
        };

        if let Ok(plaintext) = self.decrypt(ciphertext_b64, None).await {
            tracing::warn!("Decrypted credential without AAD binding (legacy row)");
            return Ok(plaintext);
        }

        // Raw legacy data only exists in offline/mock setups
        if self.client.is_none() {
            if let Ok(bytes) = BASE64.decode(ciphertext_b64) {
                if let Ok(plaintext) = String::from_utf8(bytes) {
                    return Ok(plaintext);
                }
            }
        }

        Err(primary_err)
    }

    /// Mock decrypt: enforce the AAD rules the real key enforces.
    fn mock_decrypt(ciphertext_b64: &str, aad: Option<&[u8]>) -> Result<String> {
        if let Some(rest) = ciphertext_b64.strip_prefix(MOCK_AAD_PREFIX) {
            let (aad_part, data_part) = rest.split_once(':').ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Malformed mock ciphertext"))
            })?;

            let expected = aad.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Ciphertext requires AAD, none provided"))
            })?;

            let stored_aad = BASE64.decode(aad_part).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Base64 AAD decode failed (mock): {}", e))
            })?;
            if stored_aad != expected {
                return Err(AppError::Internal(anyhow::anyhow!("AAD mismatch")));
            }

            return Self::mock_decode_b64(data_part);
        }

        if let Some(rest) = ciphertext_b64.strip_prefix(MOCK_NOAAD_PREFIX) {
            if aad.is_some() {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "AAD provided for ciphertext without AAD"
                )));
            }
            return Self::mock_decode_b64(rest);
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Unrecognized mock ciphertext"
        )))
    }

    fn mock_decode_b64(data: &str) -> Result<String> {
        let bytes = BASE64.decode(data).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Base64 output decode failed (mock): {}", e))
        })?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed (mock): {}", e)))
    }
}
