//! Local principals and the directory interface to the hosting
//! application's user model.
//!
//! The crate never owns user accounts; it reads and mutates them through
//! [`PrincipalDirectory`]. A principal is created lazily the first time a
//! connection key resolves to an unknown email, gets elevated on connect,
//! demoted on disconnect, and is never deleted here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Role of a local principal.
///
/// Only two levels matter to the handshake: whether the account holds
/// administrative rights or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Restricted,
}

impl Role {
    /// Whether this role may approve and manage connections.
    pub fn can_manage_accounts(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

/// A local account capable of holding administrative rights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier within the hosting application.
    pub id: i64,
    /// Login name.
    pub login: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Email address.
    pub email: String,
    /// Current role.
    pub role: Role,
}

/// Parameters for creating a principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub login: String,
    pub display_name: String,
    pub email: String,
    /// Generated at connect time; the account must have one, but it is
    /// never surfaced anywhere, so it cannot be used to log in manually.
    pub password: String,
    pub role: Role,
}

/// Interface to the hosting application's user model.
///
/// Implementations bridge whatever account system the host uses. All
/// methods are synchronous and must be safe to call from multiple
/// request-handling threads.
pub trait PrincipalDirectory: Send + Sync {
    /// Look up a principal by id.
    fn get(&self, id: i64) -> StoreResult<Option<Principal>>;

    /// Look up a principal by email address.
    fn find_by_email(&self, email: &str) -> StoreResult<Option<Principal>>;

    /// Create a new principal and return it with its assigned id.
    fn create(&self, new: NewPrincipal) -> StoreResult<Principal>;

    /// Change a principal's role.
    fn set_role(&self, id: i64, role: Role) -> StoreResult<()>;
}

/// In-memory directory, used by the tests and demos and as a reference
/// implementation of the trait.
#[derive(Default)]
pub struct MemoryDirectory {
    principals: RwLock<HashMap<i64, Principal>>,
    next_id: AtomicI64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            principals: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed an account, returning its id. Test/demo convenience.
    pub fn insert(&self, login: &str, display_name: &str, email: &str, role: Role) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let principal = Principal {
            id,
            login: login.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            role,
        };
        self.principals
            .write()
            .expect("directory lock poisoned")
            .insert(id, principal);
        id
    }
}

impl PrincipalDirectory for MemoryDirectory {
    fn get(&self, id: i64) -> StoreResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .expect("directory lock poisoned")
            .get(&id)
            .cloned())
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .expect("directory lock poisoned")
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn create(&self, new: NewPrincipal) -> StoreResult<Principal> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let principal = Principal {
            id,
            login: new.login,
            display_name: new.display_name,
            email: new.email,
            role: new.role,
        };
        self.principals
            .write()
            .expect("directory lock poisoned")
            .insert(id, principal.clone());
        Ok(principal)
    }

    fn set_role(&self, id: i64, role: Role) -> StoreResult<()> {
        if let Some(principal) = self
            .principals
            .write()
            .expect("directory lock poisoned")
            .get_mut(&id)
        {
            principal.role = role;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_sequential_ids() {
        let dir = MemoryDirectory::new();
        let a = dir
            .create(NewPrincipal {
                login: "alice".into(),
                display_name: "Alice".into(),
                email: "alice@example.com".into(),
                password: "x".into(),
                role: Role::Restricted,
            })
            .unwrap();
        let b = dir
            .create(NewPrincipal {
                login: "bob".into(),
                display_name: "Bob".into(),
                email: "bob@example.com".into(),
                password: "x".into(),
                role: Role::Restricted,
            })
            .unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn find_by_email_is_case_insensitive() {
        let dir = MemoryDirectory::new();
        dir.insert("carol", "Carol", "Carol@Example.com", Role::Restricted);
        let found = dir.find_by_email("carol@example.com").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().login, "carol");
    }

    #[test]
    fn set_role_elevates_and_demotes() {
        let dir = MemoryDirectory::new();
        let id = dir.insert("dave", "Dave", "dave@example.com", Role::Restricted);

        dir.set_role(id, Role::Administrator).unwrap();
        assert!(dir.get(id).unwrap().unwrap().role.can_manage_accounts());

        dir.set_role(id, Role::Restricted).unwrap();
        assert!(!dir.get(id).unwrap().unwrap().role.can_manage_accounts());
    }
}
