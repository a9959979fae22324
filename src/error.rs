//! Error types, one enum per component.
//!
//! Callers branch on variants rather than parsing messages. Variants that
//! surface over HTTP map to a status code via `http_status()`; token
//! failures deliberately stringify to a generic "invalid token" style
//! message so validation internals never leak to end users.

use thiserror::Error;

/// Result alias for secret-store and directory operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures from a secret-store or principal-directory backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying backend (database, pool, ...) failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
}

#[cfg(feature = "store-sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[cfg(feature = "store-sqlite")]
impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[cfg(feature = "store-postgres")]
impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Token signing and validation failures.
///
/// Validation runs its checks in a fixed order and returns the first
/// failure. The display strings are intentionally terse; map everything
/// except `NoSigningSecret` and `Store` to a generic "invalid token"
/// response for end users.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No usable signing secret is configured. Token issuance and
    /// validation cannot function without one.
    #[error("no usable signing secret is configured")]
    NoSigningSecret,

    /// The token could not be decoded or its signature did not verify.
    #[error("invalid token")]
    Malformed,

    /// The embedded connection key does not equal the key currently on
    /// file for the embedded principal.
    #[error("token connection key does not match the key on file")]
    KeyMismatch,

    /// The issuer claim does not match this site.
    #[error("token issuer is invalid")]
    IssuerMismatch,

    /// The embedded principal does not exist, or its login/email no
    /// longer match the claims.
    #[error("token principal is unknown or has changed")]
    PrincipalMismatch,

    /// The token is past its expiry claim.
    #[error("token has expired")]
    Expired,

    /// A single-use identifier was required but the token carries none.
    #[error("token must carry a single-use identifier")]
    MissingSingleUseId,

    /// The single-use identifier does not match the outstanding one (or
    /// none is outstanding). The token has effectively been used.
    #[error("single-use token has already been consumed")]
    SingleUseConsumed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TokenError {
    /// The HTTP status appropriate for surfacing this error.
    pub fn http_status(&self) -> u16 {
        match self {
            TokenError::NoSigningSecret => 500,
            TokenError::Malformed => 401,
            TokenError::KeyMismatch => 401,
            TokenError::IssuerMismatch => 401,
            TokenError::PrincipalMismatch => 401,
            TokenError::Expired => 401,
            TokenError::MissingSingleUseId => 401,
            TokenError::SingleUseConsumed => 401,
            TokenError::Store(_) => 500,
        }
    }
}

/// Failures talking to the remote platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The request could not be sent or the response not read.
    #[error("platform request failed: {0}")]
    Transport(String),

    /// The platform answered with a non-success status.
    #[error("platform rejected the request with status {0}")]
    Rejected(u16),

    /// A 200 response did not carry the expected access token.
    #[error("platform response did not include an access token")]
    MissingAccessToken,

    /// A 200 response body could not be parsed.
    #[error("platform response could not be parsed: {0}")]
    Malformed(String),
}

/// Failures encrypting or decrypting values at rest.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("ciphertext is malformed")]
    MalformedCiphertext,
}

/// Failures establishing or maintaining a platform connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No principal exists with the supplied id.
    #[error("principal not found")]
    UnknownPrincipal,

    /// The connection key is empty or the platform does not recognize it.
    #[error("connection key is invalid")]
    InvalidKey,

    /// A key is required for this operation but none is attached.
    #[error("a connection key is required to connect")]
    MissingKey,

    /// A supplied key differs from the key already on file for an
    /// explicitly identified principal.
    #[error("connection key does not match the existing key for this principal")]
    KeyConflict,

    /// The platform-verified email disagrees with the email known for
    /// the principal.
    #[error("platform email does not match the principal email")]
    EmailMismatch,

    /// The approving caller lacks account-management rights.
    #[error("caller is not allowed to manage connections")]
    Unauthorized,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ConnectError {
    /// The HTTP status appropriate for surfacing this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ConnectError::UnknownPrincipal => 404,
            ConnectError::InvalidKey => 400,
            ConnectError::MissingKey => 400,
            ConnectError::KeyConflict => 400,
            ConnectError::EmailMismatch => 400,
            ConnectError::Unauthorized => 403,
            ConnectError::Platform(_) => 502,
            ConnectError::Token(e) => e.http_status(),
            ConnectError::Store(_) => 500,
            ConnectError::Crypto(_) => 500,
        }
    }
}

/// Failures in the SSO issue/redeem flow.
///
/// Invalid tokens and lockouts are not errors here; they are outcomes of
/// the redemption state machine. These variants cover issuing problems
/// and infrastructure failures.
#[derive(Debug, Error)]
pub enum SsoError {
    /// SSO links can only be issued for connected principals.
    #[error("principal is not connected")]
    NotConnected,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
