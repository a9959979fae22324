//! Connection management: binding a platform-issued key to a local
//! principal and maintaining connect/disconnect state.
//!
//! [`Connector`] bundles the collaborators (secret store, principal
//! directory, platform client, token signer). A [`WebProConnection`] is
//! materialized from either an explicit principal id or a connection
//! key; the two entry points replace guessing at what a single loosely
//! typed argument meant.

use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::crypto::{decrypt_value, encrypt_value};
use crate::error::ConnectError;
use crate::platform::{PlatformClient, ProProfile};
use crate::principal::{NewPrincipal, Principal, PrincipalDirectory, Role};
use crate::store::{keys, SecretStore};
use crate::token::TokenSigner;
use crate::PLATFORM_TOKEN_TTL_SECONDS;

/// Length of the generated password for lazily created accounts. The
/// password is required by the account model but never surfaced, so it
/// cannot be used to log in.
const GENERATED_PASSWORD_LENGTH: usize = 24;

/// Shared context for connection operations.
pub struct Connector {
    store: Arc<dyn SecretStore>,
    directory: Arc<dyn PrincipalDirectory>,
    platform: Arc<dyn PlatformClient>,
    signer: Arc<TokenSigner>,
    site_url: String,
}

impl Connector {
    pub fn new(
        store: Arc<dyn SecretStore>,
        directory: Arc<dyn PrincipalDirectory>,
        platform: Arc<dyn PlatformClient>,
        signer: Arc<TokenSigner>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            platform,
            signer,
            site_url: site_url.into(),
        }
    }

    /// Materialize the connection state for an existing principal.
    pub fn by_id(&self, principal_id: i64) -> Result<WebProConnection<'_>, ConnectError> {
        let principal = self
            .directory
            .get(principal_id)?
            .ok_or(ConnectError::UnknownPrincipal)?;

        let mut connection = WebProConnection::empty(self);
        connection.load_principal(principal)?;
        Ok(connection)
    }

    /// Materialize connection state from a platform connection key.
    ///
    /// Resolution order: a principal already bound to the key, then a
    /// platform verification of the key to discover the web pro's
    /// profile and possibly match an existing local account by email.
    pub fn by_key(&self, key: &str) -> Result<WebProConnection<'_>, ConnectError> {
        if key.trim().is_empty() {
            return Err(ConnectError::InvalidKey);
        }

        let mut connection = WebProConnection::empty(self);

        if let Some(id) = self.store.find_principal(keys::CONNECTION_KEY, key)? {
            let principal = self
                .directory
                .get(id)?
                .ok_or(ConnectError::UnknownPrincipal)?;
            connection.load_principal(principal)?;
            connection.key = Some(key.to_string());
            return Ok(connection);
        }

        // Unrecognized key: ask the platform about it.
        let profile = self
            .platform
            .verify_key(key, &self.site_url)?
            .ok_or(ConnectError::InvalidKey)?;

        if let Some(principal) = self.directory.find_by_email(&profile.email)? {
            connection.load_principal(principal)?;
        }
        connection.location = Some(profile.location());
        connection.profile = Some(profile);
        connection.key = Some(key.to_string());
        Ok(connection)
    }
}

/// Connection state for one web pro, tied to the [`Connector`] that
/// produced it.
pub struct WebProConnection<'a> {
    connector: &'a Connector,
    principal: Option<Principal>,
    key: Option<String>,
    profile: Option<ProProfile>,
    location: Option<String>,
    added_by: Option<String>,
    added_time: Option<i64>,
}

impl<'a> WebProConnection<'a> {
    fn empty(connector: &'a Connector) -> Self {
        Self {
            connector,
            principal: None,
            key: None,
            profile: None,
            location: None,
            added_by: None,
            added_time: None,
        }
    }

    /// Populate fields from the stored state for `principal`.
    fn load_principal(&mut self, principal: Principal) -> Result<(), ConnectError> {
        let store = &self.connector.store;
        let id = principal.id;

        self.key = store.get_value(id, keys::CONNECTION_KEY)?;
        self.location = store.get_value(id, keys::LOCATION)?;
        self.added_by = store.get_value(id, keys::ADDED_BY)?;
        self.added_time = store
            .get_value(id, keys::ADDED_TIME)?
            .and_then(|t| t.parse().ok());
        self.principal = Some(principal);
        Ok(())
    }

    /// Attach a supplied key to a connection materialized by id.
    ///
    /// A key already on file must match (`KeyConflict` otherwise). A new
    /// key is verified against the platform and its email must match the
    /// principal's.
    pub fn with_key(mut self, key: &str) -> Result<Self, ConnectError> {
        if key.trim().is_empty() {
            return Err(ConnectError::InvalidKey);
        }

        match &self.key {
            Some(existing) if existing != key => Err(ConnectError::KeyConflict),
            Some(_) => Ok(self),
            None => {
                let profile = self
                    .connector
                    .platform
                    .verify_key(key, &self.connector.site_url)?
                    .ok_or(ConnectError::InvalidKey)?;

                if let Some(principal) = &self.principal {
                    if !profile.email.eq_ignore_ascii_case(&principal.email) {
                        return Err(ConnectError::EmailMismatch);
                    }
                }

                self.location = Some(profile.location());
                self.profile = Some(profile);
                self.key = Some(key.to_string());
                Ok(self)
            }
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn added_by(&self) -> Option<&str> {
        self.added_by.as_deref()
    }

    pub fn added_time(&self) -> Option<i64> {
        self.added_time
    }

    /// Email for this connection: the local account's, or the platform
    /// profile's when no account exists yet.
    pub fn email(&self) -> Option<&str> {
        self.principal
            .as_ref()
            .map(|p| p.email.as_str())
            .or_else(|| self.profile.as_ref().map(|p| p.email.as_str()))
    }

    /// Approve the connection.
    ///
    /// Requires an approver with account-management rights. Creates the
    /// local principal when none matched (administrator role, generated
    /// password, display name from the platform profile), elevates the
    /// role, persists the connection metadata, then delivers a freshly
    /// issued long-lived token to the platform and stores the returned
    /// revoke credential encrypted.
    ///
    /// Returns the id of the connected principal.
    pub fn connect(&mut self, approver: &Principal) -> Result<i64, ConnectError> {
        let key = self.key.clone().ok_or(ConnectError::MissingKey)?;

        if !approver.role.can_manage_accounts() {
            return Err(ConnectError::Unauthorized);
        }

        let principal = match self.principal.clone() {
            Some(principal) => principal,
            None => {
                let profile = self.profile.as_ref().ok_or(ConnectError::InvalidKey)?;
                let created = self.connector.directory.create(NewPrincipal {
                    login: login_from_email(&profile.email),
                    display_name: profile.display_name(),
                    email: profile.email.clone(),
                    password: generate_password(),
                    role: Role::Administrator,
                })?;
                self.principal = Some(created.clone());
                created
            }
        };

        // Idempotent elevation.
        self.connector
            .directory
            .set_role(principal.id, Role::Administrator)?;

        let store = &self.connector.store;
        if let Some(location) = &self.location {
            if store.get_value(principal.id, keys::LOCATION)?.is_none() {
                store.put_value(principal.id, keys::LOCATION, location)?;
            }
        }
        if store.get_value(principal.id, keys::ADDED_BY)?.is_none() {
            store.put_value(principal.id, keys::ADDED_BY, &approver.login)?;
            self.added_by = Some(approver.login.clone());
        }
        if store.get_value(principal.id, keys::ADDED_TIME)?.is_none() {
            let now = chrono::Utc::now().timestamp();
            store.put_value(principal.id, keys::ADDED_TIME, &now.to_string())?;
            self.added_time = Some(now);
        }

        self.deliver_access_token(&key, principal.id)?;

        tracing::info!(
            principal = principal.id,
            approved_by = %approver.login,
            "web pro connected"
        );
        Ok(principal.id)
    }

    /// Replace the connection key.
    ///
    /// The new key is re-verified with the platform and must resolve to
    /// the principal's current email. Persisting the new key supersedes
    /// every token issued against the previous one; a fresh access token
    /// is delivered and the new revoke credential stored.
    pub fn set_key(&mut self, new_key: &str) -> Result<String, ConnectError> {
        let principal = self
            .principal
            .clone()
            .ok_or(ConnectError::UnknownPrincipal)?;

        if new_key.trim().is_empty() {
            return Err(ConnectError::InvalidKey);
        }

        let profile = self
            .connector
            .platform
            .verify_key(new_key, &self.connector.site_url)?
            .ok_or(ConnectError::InvalidKey)?;

        if !profile.email.eq_ignore_ascii_case(&principal.email) {
            return Err(ConnectError::EmailMismatch);
        }

        self.location = Some(profile.location());
        self.connector.store.put_value(
            principal.id,
            keys::LOCATION,
            self.location.as_deref().unwrap_or_default(),
        )?;
        self.profile = Some(profile);

        self.deliver_access_token(new_key, principal.id)?;
        self.key = Some(new_key.to_string());

        tracing::info!(principal = principal.id, "connection key replaced");
        Ok(new_key.to_string())
    }

    /// Whether this principal is connected: a connection key is on file.
    ///
    /// The revoke credential is also consulted when `check_revoke` is
    /// set; its absence is logged as a degraded connection (the platform
    /// cannot be notified on disconnect) but does not change the result,
    /// since the credential is written last during `connect` and gating
    /// on it would reject every freshly approved connection.
    pub fn is_connected(&self, check_revoke: bool) -> Result<bool, ConnectError> {
        let Some(principal) = &self.principal else {
            return Ok(false);
        };

        let key = self
            .connector
            .store
            .get_value(principal.id, keys::CONNECTION_KEY)?;
        if key.is_none() {
            return Ok(false);
        }

        if check_revoke
            && self
                .connector
                .store
                .get_value(principal.id, keys::REVOKE_TOKEN)?
                .is_none()
        {
            tracing::debug!(
                principal = principal.id,
                "connection has no revoke credential on file"
            );
        }

        Ok(true)
    }

    /// Sever the connection.
    ///
    /// Deletes the key and connection metadata (invalidating all issued
    /// tokens), demotes the principal, and notifies the platform with
    /// the stored revoke credential. The notification is best-effort:
    /// its failure never blocks the local disconnect.
    pub fn disconnect(&mut self) -> Result<(), ConnectError> {
        let principal = self
            .principal
            .clone()
            .ok_or(ConnectError::UnknownPrincipal)?;
        let store = &self.connector.store;
        let id = principal.id;

        store.delete_value(id, keys::CONNECTION_KEY)?;
        store.delete_value(id, keys::LOCATION)?;
        store.delete_value(id, keys::ADDED_BY)?;
        store.delete_value(id, keys::ADDED_TIME)?;

        self.connector.directory.set_role(id, Role::Restricted)?;

        match self.stored_revoke_token(id) {
            Ok(Some(revoke_token)) => {
                if let Err(e) = self
                    .connector
                    .platform
                    .revoke_association(&revoke_token, &self.connector.site_url)
                {
                    tracing::warn!(principal = id, error = %e, "revoke notification failed");
                }
            }
            Ok(None) => {
                tracing::debug!(principal = id, "no revoke credential to notify with");
            }
            Err(e) => {
                tracing::warn!(principal = id, error = %e, "could not read revoke credential");
            }
        }
        store.delete_value(id, keys::REVOKE_TOKEN)?;

        self.key = None;
        self.location = None;
        self.added_by = None;
        self.added_time = None;

        tracing::info!(principal = id, "web pro disconnected");
        Ok(())
    }

    /// Issue a long-lived token, deliver it to the platform, and store
    /// the revoke credential it answers with.
    fn deliver_access_token(&self, key: &str, principal_id: i64) -> Result<(), ConnectError> {
        // `generate` persists the key binding as its side effect.
        let token = self.connector.signer.generate(
            key,
            principal_id,
            PLATFORM_TOKEN_TTL_SECONDS,
            false,
            HashMap::new(),
        )?;

        let revoke_token =
            self.connector
                .platform
                .accept_association(key, &self.connector.site_url, &token)?;

        let encrypted = encrypt_value(self.connector.signer.secret(), &revoke_token)?;
        self.connector
            .store
            .put_value(principal_id, keys::REVOKE_TOKEN, &encrypted)?;
        Ok(())
    }

    /// Decrypt the stored revoke credential, if any.
    fn stored_revoke_token(&self, principal_id: i64) -> Result<Option<String>, ConnectError> {
        let encrypted = self
            .connector
            .store
            .get_value(principal_id, keys::REVOKE_TOKEN)?;
        match encrypted {
            Some(encrypted) => {
                let token = decrypt_value(self.connector.signer.secret(), &encrypted)?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }
}

/// Derive a login from the email's local part.
fn login_from_email(email: &str) -> String {
    let local = email.rsplit_once('@').map(|(l, _)| l).unwrap_or(email);
    let sanitized: String = local
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if sanitized.is_empty() {
        "webpro".to_string()
    } else {
        sanitized
    }
}

/// Random password for lazily created accounts; never stored or shown.
fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::NamedPlace;
    use crate::principal::MemoryDirectory;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    const TEST_SECRET: &[u8; 32] = b"test-secret-key-32bytes-long!!!!";
    const SITE: &str = "https://site.example";

    /// Scripted platform: a fixed set of valid keys, a recorded list of
    /// revoke calls, and a switchable accept failure.
    struct FakePlatform {
        profiles: HashMap<String, ProProfile>,
        reject_accept: bool,
        revoked: Mutex<Vec<String>>,
    }

    impl FakePlatform {
        fn with_key(key: &str, email: &str) -> Self {
            let mut profiles = HashMap::new();
            profiles.insert(
                key.to_string(),
                ProProfile {
                    email: email.to_string(),
                    first_name: "Pat".into(),
                    last_name: "Pro".into(),
                    city: Some("Tempe".into()),
                    state: Some(NamedPlace {
                        name: "Arizona".into(),
                    }),
                    country: None,
                },
            );
            Self {
                profiles,
                reject_accept: false,
                revoked: Mutex::new(Vec::new()),
            }
        }
    }

    impl PlatformClient for FakePlatform {
        fn verify_key(
            &self,
            key: &str,
            _website_url: &str,
        ) -> Result<Option<ProProfile>, PlatformError> {
            Ok(self.profiles.get(key).cloned())
        }

        fn accept_association(
            &self,
            _key: &str,
            _website_url: &str,
            _token: &str,
        ) -> Result<String, PlatformError> {
            if self.reject_accept {
                Err(PlatformError::Rejected(403))
            } else {
                Ok("platform-revoke-credential".to_string())
            }
        }

        fn revoke_association(
            &self,
            revoke_token: &str,
            _website_url: &str,
        ) -> Result<(), PlatformError> {
            self.revoked.lock().unwrap().push(revoke_token.to_string());
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        directory: Arc<MemoryDirectory>,
        platform: Arc<FakePlatform>,
        connector: Connector,
        admin: Principal,
    }

    fn fixture(platform: FakePlatform) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let admin_id = directory.insert(
            "owner",
            "Site Owner",
            "owner@site.example",
            Role::Administrator,
        );
        let admin = directory.get(admin_id).unwrap().unwrap();

        let signer = Arc::new(
            TokenSigner::new(TEST_SECRET, SITE, store.clone(), directory.clone()).unwrap(),
        );
        let platform = Arc::new(platform);
        let connector = Connector::new(
            store.clone(),
            directory.clone(),
            platform.clone(),
            signer,
            SITE,
        );
        Fixture {
            store,
            directory,
            platform,
            connector,
            admin,
        }
    }

    #[test]
    fn by_key_creates_principal_on_connect() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let mut conn = f.connector.by_key("KEY-1").unwrap();
        assert!(conn.principal().is_none());

        let id = conn.connect(&f.admin).unwrap();

        let created = f.directory.get(id).unwrap().unwrap();
        assert_eq!(created.email, "pat@agency.example");
        assert_eq!(created.login, "pat");
        assert_eq!(created.display_name, "Pat Pro");
        assert!(created.role.can_manage_accounts());

        assert_eq!(
            f.store.get_value(id, keys::CONNECTION_KEY).unwrap().as_deref(),
            Some("KEY-1")
        );
        assert_eq!(
            f.store.get_value(id, keys::ADDED_BY).unwrap().as_deref(),
            Some("owner")
        );
        assert_eq!(
            f.store.get_value(id, keys::LOCATION).unwrap().as_deref(),
            Some("Tempe, Arizona")
        );
        // Revoke credential stored encrypted, not verbatim.
        let stored = f.store.get_value(id, keys::REVOKE_TOKEN).unwrap().unwrap();
        assert_ne!(stored, "platform-revoke-credential");
    }

    #[test]
    fn by_key_matches_existing_account_by_email() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let existing = f
            .directory
            .insert("pat", "Pat Pro", "pat@agency.example", Role::Restricted);

        let mut conn = f.connector.by_key("KEY-1").unwrap();
        assert_eq!(conn.principal().unwrap().id, existing);

        let id = conn.connect(&f.admin).unwrap();
        assert_eq!(id, existing);
        assert!(f.directory.get(id).unwrap().unwrap().role.can_manage_accounts());
    }

    #[test]
    fn invalid_key_fails_without_creating_a_principal() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        assert!(matches!(
            f.connector.by_key("BAD123").err(),
            Some(ConnectError::InvalidKey)
        ));
        // Nothing was created: only the seeded admin exists.
        assert!(f.directory.find_by_email("pat@agency.example").unwrap().is_none());
    }

    #[test]
    fn connect_requires_account_management_rights() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let restricted_id =
            f.directory
                .insert("viewer", "Viewer", "viewer@site.example", Role::Restricted);
        let restricted = f.directory.get(restricted_id).unwrap().unwrap();

        let mut conn = f.connector.by_key("KEY-1").unwrap();
        assert!(matches!(
            conn.connect(&restricted),
            Err(ConnectError::Unauthorized)
        ));
    }

    #[test]
    fn connect_surfaces_platform_rejection() {
        let mut platform = FakePlatform::with_key("KEY-1", "pat@agency.example");
        platform.reject_accept = true;
        let f = fixture(platform);

        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let err = conn.connect(&f.admin).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::Platform(PlatformError::Rejected(403))
        ));
    }

    #[test]
    fn with_key_conflicts_with_a_different_stored_key() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        assert!(matches!(
            f.connector.by_id(id).unwrap().with_key("KEY-2").err(),
            Some(ConnectError::KeyConflict)
        ));

        // The same key is accepted silently.
        assert!(f.connector.by_id(id).unwrap().with_key("KEY-1").is_ok());
    }

    #[test]
    fn with_key_rejects_email_mismatch() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let other =
            f.directory
                .insert("someone", "Someone Else", "else@site.example", Role::Restricted);

        assert!(matches!(
            f.connector.by_id(other).unwrap().with_key("KEY-1").err(),
            Some(ConnectError::EmailMismatch)
        ));
    }

    #[test]
    fn set_key_replaces_and_invalidates_old_tokens() {
        let mut platform = FakePlatform::with_key("KEY-1", "pat@agency.example");
        platform.profiles.insert(
            "KEY-2".to_string(),
            ProProfile {
                email: "pat@agency.example".into(),
                first_name: "Pat".into(),
                last_name: "Pro".into(),
                city: None,
                state: None,
                country: None,
            },
        );
        let f = fixture(platform);

        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        let mut conn = f.connector.by_id(id).unwrap();
        let key = conn.set_key("KEY-2").unwrap();
        assert_eq!(key, "KEY-2");
        assert_eq!(
            f.store.get_value(id, keys::CONNECTION_KEY).unwrap().as_deref(),
            Some("KEY-2")
        );
    }

    #[test]
    fn set_key_requires_matching_email() {
        let mut platform = FakePlatform::with_key("KEY-1", "pat@agency.example");
        platform.profiles.insert(
            "KEY-OTHER".to_string(),
            ProProfile {
                email: "intruder@other.example".into(),
                first_name: "In".into(),
                last_name: "Truder".into(),
                city: None,
                state: None,
                country: None,
            },
        );
        let f = fixture(platform);

        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        let mut conn = f.connector.by_id(id).unwrap();
        assert!(matches!(
            conn.set_key("KEY-OTHER"),
            Err(ConnectError::EmailMismatch)
        ));
    }

    #[test]
    fn is_connected_reflects_key_presence_and_does_not_mutate() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        let conn = f.connector.by_id(id).unwrap();
        assert!(conn.is_connected(true).unwrap());
        assert!(conn.is_connected(true).unwrap());
        assert!(conn.is_connected(false).unwrap());

        // Missing revoke credential does not gate the result.
        f.store.delete_value(id, keys::REVOKE_TOKEN).unwrap();
        assert!(conn.is_connected(true).unwrap());
    }

    #[test]
    fn connect_then_disconnect_round_trips() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        let mut conn = f.connector.by_id(id).unwrap();
        conn.disconnect().unwrap();

        assert_eq!(f.store.get_value(id, keys::CONNECTION_KEY).unwrap(), None);
        assert_eq!(f.store.get_value(id, keys::REVOKE_TOKEN).unwrap(), None);
        assert!(!f.directory.get(id).unwrap().unwrap().role.can_manage_accounts());
        assert!(!f.connector.by_id(id).unwrap().is_connected(true).unwrap());

        // The platform was notified with the decrypted credential.
        assert_eq!(
            f.platform.revoked.lock().unwrap().as_slice(),
            ["platform-revoke-credential"]
        );
    }

    #[test]
    fn disconnect_invalidates_outstanding_tokens() {
        let f = fixture(FakePlatform::with_key("KEY-1", "pat@agency.example"));
        let mut conn = f.connector.by_key("KEY-1").unwrap();
        let id = conn.connect(&f.admin).unwrap();

        let signer = TokenSigner::new(
            TEST_SECRET,
            SITE,
            f.store.clone() as Arc<dyn SecretStore>,
            f.directory.clone() as Arc<dyn PrincipalDirectory>,
        )
        .unwrap();
        let token = signer
            .generate("KEY-1", id, 3600, false, HashMap::new())
            .unwrap();
        assert!(signer.validate(&token, false).is_ok());

        f.connector.by_id(id).unwrap().disconnect().unwrap();
        assert!(matches!(
            signer.validate(&token, false),
            Err(crate::error::TokenError::KeyMismatch)
        ));
    }

    #[test]
    fn login_derivation_sanitizes() {
        assert_eq!(login_from_email("Pat.Pro+x@agency.example"), "pat.prox");
        assert_eq!(login_from_email("no-at-sign"), "no-at-sign");
        assert_eq!(login_from_email("@agency.example"), "webpro");
    }
}
