//! Remote platform client.
//!
//! The platform is the other side of the handshake: it issues connection
//! keys, receives the site's long-lived access token when a connection is
//! approved, and accepts a revoke notification when one is severed.
//! [`PlatformClient`] captures that contract; [`HttpPlatformClient`]
//! implements it over blocking HTTP with a fixed timeout and a short
//! response cache for key verification.

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Profile details the platform returns when a connection key verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<NamedPlace>,
    #[serde(default)]
    pub country: Option<NamedPlace>,
}

/// A named region in the platform's profile payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPlace {
    pub name: String,
}

impl ProProfile {
    /// "First Last" display name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "City, State, Country" from whichever parts are present.
    pub fn location(&self) -> String {
        let mut parts = Vec::new();
        if let Some(city) = &self.city {
            parts.push(city.clone());
        }
        if let Some(state) = &self.state {
            parts.push(state.name.clone());
        }
        if let Some(country) = &self.country {
            parts.push(country.name.clone());
        }
        parts.join(", ")
    }
}

/// Contract with the remote platform.
///
/// All calls are synchronous and are not retried here; a failed call
/// surfaces to the caller, who may retry the whole operation.
pub trait PlatformClient: Send + Sync {
    /// Verify a connection key.
    ///
    /// `Ok(Some(profile))` when the platform recognizes the key,
    /// `Ok(None)` when it answers non-200 (invalid key), `Err` for
    /// transport-level failures.
    fn verify_key(&self, key: &str, website_url: &str)
        -> Result<Option<ProProfile>, PlatformError>;

    /// Deliver a freshly issued access token for an approved connection.
    ///
    /// Returns the platform's revoke credential (its `accessToken`).
    fn accept_association(
        &self,
        key: &str,
        website_url: &str,
        token: &str,
    ) -> Result<String, PlatformError>;

    /// Notify the platform that the connection was severed locally.
    ///
    /// Callers treat this as best-effort; the response body is ignored.
    fn revoke_association(&self, revoke_token: &str, website_url: &str)
        -> Result<(), PlatformError>;
}

#[cfg(feature = "platform-http")]
pub use self::http_client::HttpPlatformClient;

#[cfg(feature = "platform-http")]
mod http_client {
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::time::{Duration, Instant};

    use sha2::{Digest, Sha256};

    use super::{PlatformClient, ProProfile};
    use crate::error::PlatformError;
    use crate::{PLATFORM_TIMEOUT_SECONDS, VERIFY_CACHE_TTL_SECONDS};

    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct AcceptBody<'a> {
        magic_key: &'a str,
        website_url: &'a str,
        wp_token: &'a str,
    }

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct AcceptResponse {
        access_token: Option<String>,
    }

    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct RevokeBody<'a> {
        website_url: &'a str,
    }

    struct CacheEntry {
        at: Instant,
        // A cached None records a platform rejection; invalid keys do
        // not get re-checked for the cache window either.
        verdict: Option<ProProfile>,
    }

    /// Blocking HTTP [`PlatformClient`] with a fixed request timeout and
    /// a 300-second verify-key response cache keyed by a hash of the
    /// key.
    pub struct HttpPlatformClient {
        base_url: String,
        client: reqwest::blocking::Client,
        verify_cache: RwLock<HashMap<String, CacheEntry>>,
        cache_ttl: Duration,
    }

    impl HttpPlatformClient {
        /// Create a client for the platform at `base_url`.
        pub fn new(base_url: impl Into<String>) -> Result<Self, PlatformError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(PLATFORM_TIMEOUT_SECONDS))
                .build()
                .map_err(|e| PlatformError::Transport(e.to_string()))?;

            Ok(Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                client,
                verify_cache: RwLock::new(HashMap::new()),
                cache_ttl: Duration::from_secs(VERIFY_CACHE_TTL_SECONDS),
            })
        }

        /// Override the verify-response cache TTL (mainly for tests).
        pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
            self.cache_ttl = ttl;
            self
        }

        fn cache_key(key: &str) -> String {
            // Hash so arbitrarily long keys make a fixed-size cache key.
            let mut hasher = Sha256::new();
            hasher.update(key.as_bytes());
            format!("{:x}", hasher.finalize())
        }

        fn cached_verdict(&self, cache_key: &str) -> Option<Option<ProProfile>> {
            let cache = self.verify_cache.read().unwrap();
            cache.get(cache_key).and_then(|entry| {
                (entry.at.elapsed() < self.cache_ttl).then(|| entry.verdict.clone())
            })
        }

        fn store_verdict(&self, cache_key: String, verdict: Option<ProProfile>) {
            let mut cache = self.verify_cache.write().unwrap();
            let ttl = self.cache_ttl;
            cache.retain(|_, entry| entry.at.elapsed() < ttl);
            cache.insert(
                cache_key,
                CacheEntry {
                    at: Instant::now(),
                    verdict,
                },
            );
        }
    }

    impl PlatformClient for HttpPlatformClient {
        fn verify_key(
            &self,
            key: &str,
            website_url: &str,
        ) -> Result<Option<ProProfile>, PlatformError> {
            let cache_key = Self::cache_key(key);
            if let Some(verdict) = self.cached_verdict(&cache_key) {
                return Ok(verdict);
            }

            let response = self
                .client
                .get(format!("{}/verify-magic-key", self.base_url))
                .query(&[("magicKey", key), ("websiteUrl", website_url)])
                .send()
                .map_err(|e| PlatformError::Transport(e.to_string()))?;

            // Any non-200 means the key is invalid; that verdict is
            // cached just like a positive one.
            let verdict = if response.status().as_u16() == 200 {
                let profile: ProProfile = response
                    .json()
                    .map_err(|e| PlatformError::Malformed(e.to_string()))?;
                Some(profile)
            } else {
                tracing::debug!(status = response.status().as_u16(), "key verification rejected");
                None
            };

            self.store_verdict(cache_key, verdict.clone());
            Ok(verdict)
        }

        fn accept_association(
            &self,
            key: &str,
            website_url: &str,
            token: &str,
        ) -> Result<String, PlatformError> {
            let response = self
                .client
                .post(format!("{}/accept-association", self.base_url))
                .json(&AcceptBody {
                    magic_key: key,
                    website_url,
                    wp_token: token,
                })
                .send()
                .map_err(|e| PlatformError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            if status != 200 {
                return Err(PlatformError::Rejected(status));
            }

            let body: AcceptResponse = response
                .json()
                .map_err(|e| PlatformError::Malformed(e.to_string()))?;
            body.access_token
                .filter(|t| !t.is_empty())
                .ok_or(PlatformError::MissingAccessToken)
        }

        fn revoke_association(
            &self,
            revoke_token: &str,
            website_url: &str,
        ) -> Result<(), PlatformError> {
            self.client
                .post(format!("{}/revoke-association", self.base_url))
                .bearer_auth(revoke_token)
                .json(&RevokeBody { website_url })
                .send()
                .map_err(|e| PlatformError::Transport(e.to_string()))?;
            // Response deliberately ignored.
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_joins_present_parts() {
        let profile = ProProfile {
            email: "pat@agency.example".into(),
            first_name: "Pat".into(),
            last_name: "Pro".into(),
            city: Some("Tempe".into()),
            state: Some(NamedPlace {
                name: "Arizona".into(),
            }),
            country: Some(NamedPlace {
                name: "United States".into(),
            }),
        };
        assert_eq!(profile.location(), "Tempe, Arizona, United States");
        assert_eq!(profile.display_name(), "Pat Pro");
    }

    #[test]
    fn location_tolerates_missing_parts() {
        let profile = ProProfile {
            email: "pat@agency.example".into(),
            first_name: "Pat".into(),
            last_name: "Pro".into(),
            city: Some("Tempe".into()),
            state: None,
            country: None,
        };
        assert_eq!(profile.location(), "Tempe");
    }

    #[test]
    fn profile_parses_platform_json() {
        let json = r#"{
            "email": "pat@agency.example",
            "firstName": "Pat",
            "lastName": "Pro",
            "city": "Tempe",
            "state": {"name": "Arizona"},
            "country": {"name": "United States"}
        }"#;
        let profile: ProProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email, "pat@agency.example");
        assert_eq!(profile.state.as_ref().unwrap().name, "Arizona");
    }

    #[test]
    fn profile_tolerates_absent_optional_fields() {
        let json = r#"{"email": "a@b.example", "firstName": "A", "lastName": "B"}"#;
        let profile: ProProfile = serde_json::from_str(json).unwrap();
        assert!(profile.city.is_none());
        assert_eq!(profile.location(), "");
    }
}
