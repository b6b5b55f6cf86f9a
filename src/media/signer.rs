//! Signed access issuer.
//!
//! Mints time-bounded URLs for privately stored objects. Grants are computed
//! per call and never persisted or cached; the object store remains the
//! source of truth for whether a grant is honored.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use url::Url;

use crate::media::MediaCategory;

type HmacSha256 = Hmac<Sha256>;

/// A minted time-bounded access URL.
#[derive(Debug, Clone, Serialize)]
pub struct SignedAccess {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// One entry of a batch issuance. A malformed reference carries an error and
/// the original reference as degraded fallback `url`; it never blocks the
/// other entries.
#[derive(Debug, Clone, Serialize)]
pub struct AccessGrantEntry {
    #[serde(rename = "ref")]
    pub reference: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct UrlSigner {
    secret: Vec<u8>,
    public_base_url: String,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>, public_base_url: &str, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Mint a signed URL for a stored object path, valid for the fixed TTL.
    pub fn sign(&self, path: &str) -> SignedAccess {
        let expires_at = Utc::now() + self.ttl;
        let token = self.token_for(path, expires_at.timestamp());
        SignedAccess {
            url: format!(
                "{}/sign/{}?expires={}&token={}",
                self.public_base_url,
                path,
                expires_at.timestamp(),
                token
            ),
            expires_at,
        }
    }

    /// Check a presented token against the path and expiry it claims.
    pub fn verify(&self, path: &str, expires_ts: i64, token: &str) -> bool {
        if expires_ts < Utc::now().timestamp() {
            return false;
        }
        let raw = match URL_SAFE_NO_PAD.decode(token) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        self.mac_for(path, expires_ts).verify_slice(&raw).is_ok()
    }

    /// Issue grants for a batch of stored-object references with per-item
    /// failure isolation.
    pub fn issue_access(&self, refs: &[String]) -> Vec<AccessGrantEntry> {
        refs.iter()
            .map(|reference| match self.parse_ref(reference) {
                Ok((_category, path)) => {
                    let signed = self.sign(&path);
                    AccessGrantEntry {
                        reference: reference.clone(),
                        url: signed.url,
                        expires_at: Some(signed.expires_at),
                        error: None,
                    }
                }
                Err(msg) => AccessGrantEntry {
                    reference: reference.clone(),
                    // Degraded fallback: hand back the reference unchanged
                    url: reference.clone(),
                    expires_at: None,
                    error: Some(msg),
                },
            })
            .collect()
    }

    /// Extract (category, object path) from a reference. Accepts either a
    /// bare `owner/category/...` path or a full URL under the public base.
    pub fn parse_ref(&self, reference: &str) -> Result<(MediaCategory, String), String> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err("empty object reference".to_string());
        }

        let path = if let Some(rest) = trimmed.strip_prefix(&self.public_base_url) {
            rest.trim_start_matches('/').to_string()
        } else if trimmed.contains("://") {
            // A URL outside our public base is not ours to sign
            Url::parse(trimmed).map_err(|e| format!("unparseable reference URL: {e}"))?;
            return Err(format!(
                "reference is not under the public base URL: {trimmed}"
            ));
        } else {
            trimmed.trim_start_matches('/').to_string()
        };

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(format!("malformed object reference: {reference}"));
        }

        // Object paths are owner/category[/folder]/filename
        let category = segments[1]
            .parse::<MediaCategory>()
            .map_err(|e| e.to_string())?;

        Ok((category, path))
    }

    fn token_for(&self, path: &str, expires_ts: i64) -> String {
        let mac = self.mac_for(path, expires_ts);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn mac_for(&self, path: &str, expires_ts: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires_ts.to_string().as_bytes());
        mac
    }
}
