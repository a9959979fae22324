//! Single sign-on: issuing one-shot login links and redeeming them.
//!
//! Redemption is a small state machine. A request arrives with an
//! optional `token` URL parameter and ends in one of three outcomes:
//! redirected to the normal login (no token, or lockout), denied
//! (invalid token), or logged in (session established, redirect to the
//! dashboard).
//!
//! The failure counter that backs the lockout lives in the secret store
//! with a TTL, not in process memory, so it holds across multiple
//! request-handling processes. It is a single counter whose TTL resets
//! on each failure: an approximation of a sliding window, not a
//! precise rate limiter.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SsoError, StoreResult, TokenError};
use crate::principal::{Principal, PrincipalDirectory};
use crate::store::{keys, SecretStore};
use crate::token::TokenSigner;
use crate::SSO_TOKEN_TTL_SECONDS;

/// Marker embedded in the extra data of tokens minted for SSO. A token
/// issued for API use cannot be replayed through the login endpoint.
const SSO_TOKEN_TYPE: &str = "sso";

/// Interface to the hosting application's session layer.
///
/// The crate never manages sessions itself; on a successful redemption
/// it hands the principal to this sink.
pub trait SessionSink: Send + Sync {
    /// Establish an authenticated session for `principal`.
    fn establish(&self, principal: &Principal) -> StoreResult<()>;
}

/// Configuration for the SSO flow.
#[derive(Debug, Clone)]
pub struct SsoConfig {
    /// Failed attempts tolerated before lockout (default: 5).
    pub max_attempts: u32,

    /// Window the failure counter lives for (default: 5 minutes).
    pub window: Duration,

    /// Entries kept in the login log (default: 10).
    pub log_capacity: usize,

    /// Local endpoint SSO links point at.
    pub endpoint: String,

    /// Where a successful login redirects.
    pub dashboard_url: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),
            log_capacity: 10,
            endpoint: "/sso".to_string(),
            dashboard_url: "/admin".to_string(),
        }
    }
}

impl SsoConfig {
    /// Set the lockout threshold.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the failure-counter window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the endpoint and dashboard URLs.
    pub fn with_urls(mut self, endpoint: impl Into<String>, dashboard: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self.dashboard_url = dashboard.into();
        self
    }
}

/// One entry in the bounded login log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoLogEntry {
    pub login: String,
    pub time: i64,
}

/// Result of redeeming an SSO request.
#[derive(Debug)]
pub enum SsoOutcome {
    /// No token was supplied, or the lockout is active: send the caller
    /// to the normal login page.
    LoginRedirect,

    /// The token was invalid. Answer with a generic access-denied
    /// response; never reveal which check failed.
    Denied,

    /// Session established; redirect to the dashboard.
    LoggedIn {
        principal: Principal,
        redirect: String,
    },
}

/// Issues SSO links and redeems the single-use tokens they carry.
pub struct SsoRedeemer {
    signer: Arc<TokenSigner>,
    store: Arc<dyn SecretStore>,
    directory: Arc<dyn PrincipalDirectory>,
    sessions: Arc<dyn SessionSink>,
    config: SsoConfig,
    on_failure: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SsoRedeemer {
    pub fn new(
        signer: Arc<TokenSigner>,
        store: Arc<dyn SecretStore>,
        directory: Arc<dyn PrincipalDirectory>,
        sessions: Arc<dyn SessionSink>,
    ) -> Self {
        Self {
            signer,
            store,
            directory,
            sessions,
            config: SsoConfig::default(),
            on_failure: None,
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: SsoConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a hook fired on every failed or locked-out attempt.
    pub fn on_failure(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    /// Mint a login link for a connected principal.
    ///
    /// The embedded token is single-use and expires in 30 seconds; it
    /// carries an SSO type marker so API tokens cannot be replayed here.
    pub fn issue_link(&self, principal_id: i64) -> Result<String, SsoError> {
        let key = self
            .store
            .get_value(principal_id, keys::CONNECTION_KEY)?
            .ok_or(SsoError::NotConnected)?;

        let mut extra = std::collections::HashMap::new();
        extra.insert(
            "type".to_string(),
            serde_json::Value::String(SSO_TOKEN_TYPE.to_string()),
        );

        let token = self
            .signer
            .generate(&key, principal_id, SSO_TOKEN_TTL_SECONDS, true, extra)?;
        Ok(format!("{}?token={}", self.config.endpoint, token))
    }

    /// Redeem the `token` URL parameter of an inbound SSO request.
    ///
    /// Storage failures surface as errors; everything else is an
    /// [`SsoOutcome`].
    pub fn redeem(&self, token: Option<&str>) -> Result<SsoOutcome, SsoError> {
        // No token is not an attack; just point at the login page.
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(SsoOutcome::LoginRedirect);
        };

        // Lockout check runs before any decoding.
        let attempts = self.failed_attempts()?;
        if attempts >= self.config.max_attempts {
            tracing::warn!(attempts, "sso lockout active, rejecting attempt");
            self.fire_failure_hook();
            return Ok(SsoOutcome::LoginRedirect);
        }

        let claims = match self.signer.validate(token, true) {
            Ok(claims) => claims,
            Err(TokenError::Store(e)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "sso token rejected");
                self.record_failure(attempts)?;
                self.fire_failure_hook();
                return Ok(SsoOutcome::Denied);
            }
        };

        // A valid token that was not minted for SSO is still a failure.
        let token_type = claims.data.extra.get("type").and_then(|v| v.as_str());
        if token_type != Some(SSO_TOKEN_TYPE) {
            tracing::warn!("valid token presented to sso endpoint without sso type");
            self.record_failure(attempts)?;
            self.fire_failure_hook();
            return Ok(SsoOutcome::Denied);
        }

        let principal = match self.directory.get(claims.data.user.id)? {
            Some(principal) => principal,
            None => {
                self.record_failure(attempts)?;
                self.fire_failure_hook();
                return Ok(SsoOutcome::Denied);
            }
        };

        self.sessions.establish(&principal)?;
        self.append_log(&principal)?;

        tracing::info!(principal = principal.id, login = %principal.login, "sso login");
        Ok(SsoOutcome::LoggedIn {
            redirect: self.config.dashboard_url.clone(),
            principal,
        })
    }

    /// The recent SSO logins, most recent last.
    pub fn login_log(&self) -> Result<Vec<SsoLogEntry>, SsoError> {
        let raw = self.store.get_site_value(keys::SSO_LOG)?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    fn failed_attempts(&self) -> Result<u32, SsoError> {
        let raw = self.store.get_site_value(keys::SSO_FAILURES)?;
        Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    fn record_failure(&self, current: u32) -> Result<(), SsoError> {
        // Each failure rewrites the counter and resets its TTL.
        self.store.put_site_value(
            keys::SSO_FAILURES,
            &(current + 1).to_string(),
            Some(self.config.window),
        )?;
        Ok(())
    }

    fn fire_failure_hook(&self) {
        if let Some(hook) = &self.on_failure {
            hook();
        }
    }

    fn append_log(&self, principal: &Principal) -> Result<(), SsoError> {
        let mut log = self.login_log()?;
        log.push(SsoLogEntry {
            login: principal.login.clone(),
            time: chrono::Utc::now().timestamp(),
        });
        // Bounded: evict oldest entries beyond capacity.
        while log.len() > self.config.log_capacity {
            log.remove(0);
        }

        let raw = serde_json::to_string(&log)
            .map_err(|e| crate::error::StoreError::Corrupt(e.to_string()))?;
        self.store.put_site_value(keys::SSO_LOG, &raw, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{MemoryDirectory, Role};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const TEST_SECRET: &[u8; 32] = b"test-secret-key-32bytes-long!!!!";
    const SITE: &str = "https://site.example";

    #[derive(Default)]
    struct RecordingSink {
        established: Mutex<Vec<i64>>,
    }

    impl SessionSink for RecordingSink {
        fn establish(&self, principal: &Principal) -> StoreResult<()> {
            self.established.lock().unwrap().push(principal.id);
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        directory: Arc<MemoryDirectory>,
        signer: Arc<TokenSigner>,
        sink: Arc<RecordingSink>,
        redeemer: SsoRedeemer,
        pro_id: i64,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let pro_id = directory.insert("pro", "Pat Pro", "pat@agency.example", Role::Administrator);
        store
            .put_value(pro_id, keys::CONNECTION_KEY, "KEY-1")
            .unwrap();

        let signer = Arc::new(
            TokenSigner::new(TEST_SECRET, SITE, store.clone(), directory.clone()).unwrap(),
        );
        let sink = Arc::new(RecordingSink::default());
        let redeemer = SsoRedeemer::new(
            signer.clone(),
            store.clone(),
            directory.clone(),
            sink.clone(),
        );
        Fixture {
            store,
            directory,
            signer,
            sink,
            redeemer,
            pro_id,
        }
    }

    fn token_from_link(link: &str) -> String {
        link.split_once("?token=").unwrap().1.to_string()
    }

    #[test]
    fn missing_token_redirects_to_login() {
        let f = fixture();
        assert!(matches!(
            f.redeemer.redeem(None).unwrap(),
            SsoOutcome::LoginRedirect
        ));
        assert!(matches!(
            f.redeemer.redeem(Some("")).unwrap(),
            SsoOutcome::LoginRedirect
        ));
        // Not counted as failures.
        assert_eq!(f.redeemer.failed_attempts().unwrap(), 0);
    }

    #[test]
    fn issue_link_requires_connection() {
        let f = fixture();
        let unconnected =
            f.directory
                .insert("other", "Other", "other@site.example", Role::Restricted);
        assert!(matches!(
            f.redeemer.issue_link(unconnected),
            Err(SsoError::NotConnected)
        ));
    }

    #[test]
    fn issued_link_redeems_and_establishes_session() {
        let f = fixture();
        let link = f.redeemer.issue_link(f.pro_id).unwrap();
        assert!(link.starts_with("/sso?token="));

        let outcome = f.redeemer.redeem(Some(&token_from_link(&link))).unwrap();
        match outcome {
            SsoOutcome::LoggedIn {
                principal,
                redirect,
            } => {
                assert_eq!(principal.id, f.pro_id);
                assert_eq!(redirect, "/admin");
            }
            other => panic!("expected LoggedIn, got {other:?}"),
        }
        assert_eq!(f.sink.established.lock().unwrap().as_slice(), [f.pro_id]);

        let log = f.redeemer.login_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].login, "pro");
    }

    #[test]
    fn redeeming_twice_is_denied() {
        let f = fixture();
        let link = f.redeemer.issue_link(f.pro_id).unwrap();
        let token = token_from_link(&link);

        assert!(matches!(
            f.redeemer.redeem(Some(&token)).unwrap(),
            SsoOutcome::LoggedIn { .. }
        ));
        assert!(matches!(
            f.redeemer.redeem(Some(&token)).unwrap(),
            SsoOutcome::Denied
        ));
    }

    #[test]
    fn garbage_token_is_denied_and_counted() {
        let f = fixture();
        let failures = Arc::new(AtomicU32::new(0));
        let counter = failures.clone();
        let redeemer = SsoRedeemer::new(
            f.signer.clone(),
            f.store.clone(),
            f.directory.clone(),
            f.sink.clone(),
        )
        .on_failure(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(matches!(
            redeemer.redeem(Some("not-a-token")).unwrap(),
            SsoOutcome::Denied
        ));
        assert_eq!(redeemer.failed_attempts().unwrap(), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn api_token_cannot_be_replayed_through_sso() {
        let f = fixture();
        // A long-lived API token: valid, but single-use is forced and
        // it carries no identifier, so redemption denies it.
        let token = f
            .signer
            .generate("KEY-1", f.pro_id, 3600, false, Default::default())
            .unwrap();

        assert!(matches!(
            f.redeemer.redeem(Some(&token)).unwrap(),
            SsoOutcome::Denied
        ));
    }

    #[test]
    fn single_use_token_without_sso_marker_is_denied() {
        let f = fixture();
        let token = f
            .signer
            .generate("KEY-1", f.pro_id, 60, true, Default::default())
            .unwrap();

        assert!(matches!(
            f.redeemer.redeem(Some(&token)).unwrap(),
            SsoOutcome::Denied
        ));
        // The single-use identifier was consumed by validation, so the
        // failure cannot be retried into a success.
        assert!(f
            .store
            .get_value(f.pro_id, keys::SINGLE_USE_ID)
            .unwrap()
            .is_none());
    }

    #[test]
    fn sixth_attempt_is_locked_out_before_decoding() {
        let f = fixture();
        for _ in 0..5 {
            assert!(matches!(
                f.redeemer.redeem(Some("junk")).unwrap(),
                SsoOutcome::Denied
            ));
        }
        assert_eq!(f.redeemer.failed_attempts().unwrap(), 5);

        // Even a genuinely valid link is turned away during lockout.
        let link = f.redeemer.issue_link(f.pro_id).unwrap();
        assert!(matches!(
            f.redeemer.redeem(Some(&token_from_link(&link))).unwrap(),
            SsoOutcome::LoginRedirect
        ));
        // And the single-use id is untouched: nothing was decoded.
        assert!(f
            .store
            .get_value(f.pro_id, keys::SINGLE_USE_ID)
            .unwrap()
            .is_some());
    }

    #[test]
    fn lockout_expires_with_the_counter_window() {
        let f = fixture();
        let redeemer = SsoRedeemer::new(
            f.signer.clone(),
            f.store.clone(),
            f.directory.clone(),
            f.sink.clone(),
        )
        .with_config(
            SsoConfig::default()
                .with_max_attempts(2)
                .with_window(Duration::from_millis(50)),
        );

        assert!(matches!(
            redeemer.redeem(Some("junk")).unwrap(),
            SsoOutcome::Denied
        ));
        assert!(matches!(
            redeemer.redeem(Some("junk")).unwrap(),
            SsoOutcome::Denied
        ));
        assert!(matches!(
            redeemer.redeem(Some("junk")).unwrap(),
            SsoOutcome::LoginRedirect
        ));

        std::thread::sleep(Duration::from_millis(80));
        // Counter expired; attempts are evaluated again.
        assert!(matches!(
            redeemer.redeem(Some("junk")).unwrap(),
            SsoOutcome::Denied
        ));
    }

    #[test]
    fn login_log_keeps_the_ten_most_recent() {
        let f = fixture();

        // Pre-fill the log with ten older entries.
        let seeded: Vec<SsoLogEntry> = (0..10)
            .map(|i| SsoLogEntry {
                login: format!("old-{i}"),
                time: 1_000 + i,
            })
            .collect();
        f.store
            .put_site_value(
                keys::SSO_LOG,
                &serde_json::to_string(&seeded).unwrap(),
                None,
            )
            .unwrap();

        let link = f.redeemer.issue_link(f.pro_id).unwrap();
        assert!(matches!(
            f.redeemer.redeem(Some(&token_from_link(&link))).unwrap(),
            SsoOutcome::LoggedIn { .. }
        ));

        let log = f.redeemer.login_log().unwrap();
        assert_eq!(log.len(), 10);
        // Oldest evicted, newest appended.
        assert_eq!(log.first().unwrap().login, "old-1");
        assert_eq!(log.last().unwrap().login, "pro");
    }
}
