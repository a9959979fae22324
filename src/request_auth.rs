//! Bearer-token authentication for inbound API requests.
//!
//! The platform authenticates its API calls with a token in a dedicated
//! request header rather than `Authorization`, so it can coexist with
//! whatever authentication the hosting application already does. Header
//! lookup is case-insensitive. No header means "not our request" and
//! defers to other authentication; a present-but-invalid token is an
//! authentication failure.

use std::sync::Arc;

use http::header::HeaderName;
use http::HeaderMap;

use crate::error::TokenError;
use crate::principal::{Principal, PrincipalDirectory};
use crate::token::TokenSigner;

/// Default header carrying the bearer token.
pub const DEFAULT_AUTH_HEADER: &str = "pro-authorization";

/// Resolves inbound bearer tokens to principals.
pub struct RequestAuthenticator {
    signer: Arc<TokenSigner>,
    directory: Arc<dyn PrincipalDirectory>,
    header: HeaderName,
}

impl RequestAuthenticator {
    pub fn new(signer: Arc<TokenSigner>, directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self {
            signer,
            directory,
            header: HeaderName::from_static(DEFAULT_AUTH_HEADER),
        }
    }

    /// Use a different header name.
    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    /// Authenticate a request from its headers.
    ///
    /// Returns `Ok(None)` when the designated header is absent (defer to
    /// other authentication), `Ok(Some(principal))` when the token
    /// validates (the caller should treat that principal as the
    /// effective identity for the rest of the request), and `Err` when a
    /// token is present but invalid.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, TokenError> {
        let Some(value) = headers.get(&self.header) else {
            return Ok(None);
        };
        let token = value.to_str().map_err(|_| TokenError::Malformed)?;

        let claims = self.signer.validate(token, false)?;

        let principal = self
            .directory
            .get(claims.data.user.id)?
            .ok_or(TokenError::PrincipalMismatch)?;

        tracing::debug!(principal = principal.id, "request authenticated via bearer token");
        Ok(Some(principal))
    }
}
