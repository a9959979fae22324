//! Token signing and validation.
//!
//! Tokens are compact signed-claims strings in the familiar three-segment
//! shape: `base64url(header).base64url(claims).base64url(signature)`,
//! signed with HMAC-SHA256 and verified with constant-time comparison.
//! Every token binds a platform connection key to a local principal; a
//! single-use token additionally carries a one-shot identifier that is
//! consumed on its first successful validation.
//!
//! The signing secret is the hosting application's existing
//! session-signing secret. If that secret were to change, every
//! outstanding token would become invalid, which is the same blast
//! radius as a password rotation.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::TokenError;
use crate::principal::PrincipalDirectory;
use crate::store::{keys, SecretStore};
use crate::{MAX_TOKEN_LENGTH, MIN_SECRET_LENGTH};

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated single-use identifier.
const SINGLE_USE_ID_LENGTH: usize = 32;

/// Fixed token header: HMAC-SHA256, compact claims format.
const HEADER_B64: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"; // {"alg":"HS256","typ":"JWT"}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// Principal identity embedded in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: i64,
    pub login: String,
    pub email: String,
}

/// Private claims: the key/principal binding plus any extra data the
/// issuer attached (e.g. the SSO flow marks its tokens with a `type`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub connection_key: String,
    pub user: TokenUser,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Decoded token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer: the canonical site URL.
    pub iss: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Not-before (unix seconds).
    pub nbf: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Single-use identifier, present only on single-use tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub data: TokenData,
}

impl TokenClaims {
    /// Check if the claims are past their expiry.
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() > self.exp
    }

    /// Remaining validity in seconds.
    pub fn remaining_seconds(&self) -> i64 {
        (self.exp - chrono::Utc::now().timestamp()).max(0)
    }
}

/// Creates and validates signed tokens binding a connection key to a
/// principal.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use proconnect::{TokenSigner, MemoryStore, MemoryDirectory};
///
/// let store = Arc::new(MemoryStore::new());
/// let directory = Arc::new(MemoryDirectory::new());
/// let signer = TokenSigner::new(
///     b"the-site-session-signing-secret!",
///     "https://example.com",
///     store,
///     directory,
/// )?;
///
/// let token = signer.generate("KEY-123", principal_id, 3600, false, Default::default())?;
/// let claims = signer.validate(&token, false)?;
/// assert_eq!(claims.data.user.id, principal_id);
/// ```
pub struct TokenSigner {
    secret: Vec<u8>,
    issuer: String,
    store: Arc<dyn SecretStore>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl TokenSigner {
    /// Create a signer from the site's session-signing secret and
    /// canonical URL.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NoSigningSecret`] when the secret is absent
    /// or shorter than 32 bytes; nothing in this crate can operate
    /// without a usable secret.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        store: Arc<dyn SecretStore>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(TokenError::NoSigningSecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
            issuer: issuer.into(),
            store,
            directory,
        })
    }

    /// The configured issuer (canonical site URL).
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The signing secret, for deriving sibling keys (encryption at
    /// rest shares the token story: rotating the secret severs both).
    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Generate a signed token for a principal.
    ///
    /// Claims are stamped with issuer, issued-at, not-before and expiry
    /// (`now + ttl_seconds`). When `single_use` is set, a fresh random
    /// identifier is embedded and durably stored against the principal,
    /// overwriting any prior outstanding identifier; there is never more
    /// than one outstanding single-use token per principal.
    ///
    /// As a side effect the `connection_key` is persisted against the
    /// principal. This is the only place the key-to-principal binding is
    /// written, so issuing a token against a new key supersedes every
    /// token issued against the old one.
    pub fn generate(
        &self,
        connection_key: &str,
        principal_id: i64,
        ttl_seconds: i64,
        single_use: bool,
        extra: HashMap<String, serde_json::Value>,
    ) -> Result<String, TokenError> {
        let principal = self
            .directory
            .get(principal_id)?
            .ok_or(TokenError::PrincipalMismatch)?;

        let now = chrono::Utc::now().timestamp();
        let jti = single_use.then(|| {
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(SINGLE_USE_ID_LENGTH)
                .map(char::from)
                .collect::<String>()
        });

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + ttl_seconds,
            jti: jti.clone(),
            data: TokenData {
                connection_key: connection_key.to_string(),
                user: TokenUser {
                    id: principal.id,
                    login: principal.login.clone(),
                    email: principal.email.clone(),
                },
                extra,
            },
        };

        let token = self.sign_claims(&claims)?;

        // The key binding is written here and nowhere else. A new key
        // invalidates tokens issued against any previous one.
        self.store
            .put_value(principal_id, keys::CONNECTION_KEY, connection_key)?;

        if let Some(jti) = jti {
            // Overwrite any outstanding identifier: at most one
            // single-use token is live per principal.
            self.store
                .put_value(principal_id, keys::SINGLE_USE_ID, &jti)?;
        }

        Ok(token)
    }

    /// Sign a prepared set of claims.
    ///
    /// `generate` is the normal entry point; this is exposed so tests
    /// and tooling can produce tokens with explicit timestamps.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let claims_json =
            serde_json::to_string(claims).map_err(|_| TokenError::Malformed)?;
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());

        let signing_input = format!("{HEADER_B64}.{claims_b64}");
        let signature = self.compute_signature(signing_input.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Validate a token and return its decoded claims.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// signature/shape, connection key, issuer, principal identity,
    /// expiry, then single-use identifier. Single-use checks run when
    /// the token carries an identifier or when `force_single_use` is
    /// set.
    ///
    /// On a successful single-use validation the stored identifier is
    /// deleted here, as a side effect of this call; validating the same
    /// token a second time fails with
    /// [`TokenError::SingleUseConsumed`].
    pub fn validate(
        &self,
        token: &str,
        force_single_use: bool,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;

        // Connection key must equal the value currently on file for the
        // embedded principal.
        let stored_key = self
            .store
            .get_value(claims.data.user.id, keys::CONNECTION_KEY)?;
        if stored_key.as_deref() != Some(claims.data.connection_key.as_str()) {
            return Err(TokenError::KeyMismatch);
        }

        if claims.iss != self.issuer {
            return Err(TokenError::IssuerMismatch);
        }

        // The principal must still exist and still match the identity
        // captured at issuance; a renamed or re-mailed account
        // invalidates its tokens.
        let principal = self
            .directory
            .get(claims.data.user.id)?
            .ok_or(TokenError::PrincipalMismatch)?;
        if principal.login != claims.data.user.login || principal.email != claims.data.user.email {
            return Err(TokenError::PrincipalMismatch);
        }

        if chrono::Utc::now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.jti.is_some() || force_single_use {
            self.consume_single_use(&claims)?;
        }

        Ok(claims)
    }

    /// Decode a token, verifying only shape and signature.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        // Length cap up front; nothing legitimate is this large.
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::Malformed);
        }

        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(TokenError::Malformed),
            };

        let provided_sig = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signing_input = format!("{header_b64}.{claims_b64}");
        let expected_sig = self.compute_signature(signing_input.as_bytes());

        // Constant-time comparison to prevent timing attacks.
        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            tracing::debug!("token signature verification failed");
            return Err(TokenError::Malformed);
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)
    }

    /// Check and consume the single-use identifier for `claims`.
    fn consume_single_use(&self, claims: &TokenClaims) -> Result<(), TokenError> {
        let jti = claims
            .jti
            .as_deref()
            .ok_or(TokenError::MissingSingleUseId)?;

        let stored = self
            .store
            .get_value(claims.data.user.id, keys::SINGLE_USE_ID)?;
        if stored.as_deref() != Some(jti) {
            return Err(TokenError::SingleUseConsumed);
        }

        // Delete so the token cannot validate twice.
        self.store
            .delete_value(claims.data.user.id, keys::SINGLE_USE_ID)?;
        Ok(())
    }

    fn compute_signature(&self, input: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}
