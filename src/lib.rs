//! # proconnect: platform-mediated temporary admin access
//!
//! A library for granting a third-party "web pro" temporary
//! administrative access to a site, mediated by a remote platform. The
//! platform hands the web pro an opaque connection key; this crate
//! verifies the key, binds it to a local principal, and from then on
//! trusts signed, time-bounded bearer tokens that embed the binding:
//! long-lived ones for API access, 30-second single-use ones for SSO.
//!
//! ## Components
//!
//! - [`TokenSigner`] creates and validates signed claims binding a
//!   connection key to a principal.
//! - [`SecretStore`] provides opaque key/value persistence for connection
//!   state, with in-memory, SQLite and PostgreSQL backends.
//! - [`Connector`] / [`WebProConnection`] verify keys with the
//!   platform, create/promote principals, maintain connect state.
//! - [`SsoRedeemer`] exchanges a single-use token for a local session,
//!   with brute-force lockout.
//! - [`RequestAuthenticator`] resolves bearer tokens on inbound API
//!   requests to an effective caller identity.
//!
//! The hosting application's own user and session models stay outside
//! the crate, behind [`PrincipalDirectory`] and [`SessionSink`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use proconnect::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let directory = Arc::new(MyDirectory::new()); // bridges your user model
//! let platform = Arc::new(HttpPlatformClient::new("https://platform.example/wp-plugin")?);
//!
//! let signer = Arc::new(TokenSigner::new(
//!     session_signing_secret,      // reuse the site's existing secret
//!     "https://my-site.example",
//!     store.clone(),
//!     directory.clone(),
//! )?);
//!
//! let connector = Connector::new(store, directory, platform, signer, "https://my-site.example");
//!
//! // An administrator approves a key the web pro brought from the platform:
//! let mut connection = connector.by_key(&submitted_key)?;
//! let principal_id = connection.connect(&approving_admin)?;
//! ```
//!
//! ## Concurrency model
//!
//! Everything is synchronous and blocking; each inbound request is
//! handled independently, and shared state lives only behind the store
//! adapters. Key and single-use-id writes are last-writer-wins; see the
//! [`store`] module docs for how to layer stronger guarantees.

pub mod connection;
mod crypto;
pub mod error;
pub mod platform;
pub mod principal;
pub mod request_auth;
pub mod sso;
pub mod store;
pub mod token;

// Re-exports for convenience
pub use connection::{Connector, WebProConnection};
pub use error::{ConnectError, PlatformError, SsoError, StoreError, TokenError};
pub use platform::{PlatformClient, ProProfile};
pub use principal::{MemoryDirectory, NewPrincipal, Principal, PrincipalDirectory, Role};
pub use request_auth::{RequestAuthenticator, DEFAULT_AUTH_HEADER};
pub use sso::{SessionSink, SsoConfig, SsoLogEntry, SsoOutcome, SsoRedeemer};
pub use store::{MemoryStore, SecretStore};
pub use token::{TokenClaims, TokenSigner};

#[cfg(feature = "platform-http")]
pub use platform::HttpPlatformClient;

#[cfg(feature = "store-sqlite")]
pub use store::SqliteStore;

#[cfg(feature = "store-postgres")]
pub use store::PostgresStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum accepted token length (prevents DoS via large tokens)
pub const MAX_TOKEN_LENGTH: usize = 2048;

/// Minimum signing-secret length (32 bytes = 256 bits for HMAC-SHA256)
pub const MIN_SECRET_LENGTH: usize = 32;

/// TTL of the token delivered to the platform on connect. Effectively
/// non-expiring; the connection is severed by rotating or deleting the
/// key, not by waiting out the clock.
pub const PLATFORM_TOKEN_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// TTL of a single-use SSO token
pub const SSO_TOKEN_TTL_SECONDS: i64 = 30;

/// Fixed timeout for outbound platform calls
pub const PLATFORM_TIMEOUT_SECONDS: u64 = 10;

/// How long verify-key responses are cached
pub const VERIFY_CACHE_TTL_SECONDS: u64 = 300;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::connection::{Connector, WebProConnection};
    pub use crate::error::{ConnectError, PlatformError, SsoError, StoreError, TokenError};
    pub use crate::platform::{PlatformClient, ProProfile};
    pub use crate::principal::{
        MemoryDirectory, NewPrincipal, Principal, PrincipalDirectory, Role,
    };
    pub use crate::request_auth::RequestAuthenticator;
    pub use crate::sso::{SessionSink, SsoConfig, SsoOutcome, SsoRedeemer};
    pub use crate::store::{MemoryStore, SecretStore};
    pub use crate::token::{TokenClaims, TokenSigner};

    #[cfg(feature = "platform-http")]
    pub use crate::platform::HttpPlatformClient;

    #[cfg(feature = "store-sqlite")]
    pub use crate::store::SqliteStore;

    #[cfg(feature = "store-postgres")]
    pub use crate::store::PostgresStore;
}
