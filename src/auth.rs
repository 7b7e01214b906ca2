//! Login simulation and the current-user session.
//!
//! The persisted store is the source of truth for who is logged in.
//! [`Session`] keeps an in-memory mirror that is updated in the same call
//! that writes the store, so the two never disagree after `login`/`logout`.

use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::permissions::{Permission, PermissionSet};
use crate::storage::{KeyValueStore, StoreError};

/// Storage key holding the serialized [`User`].
pub const CURRENT_USER_KEY: &str = "currentUser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub permissions: PermissionSet,
}

impl User {
    pub fn new(name: impl Into<String>, permissions: impl Into<PermissionSet>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into(),
        }
    }

    /// The fixed account assigned by the login page.
    pub fn demo() -> Self {
        Self::new(
            "John Doe",
            [Permission::ViewPosts, Permission::ViewComments],
        )
    }
}

/// Read access to "who is logged in right now".
///
/// Implemented by [`Session`]; tests can pass a closure instead.
pub trait UserSource: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

impl<F> UserSource for F
where
    F: Fn() -> Option<User> + Send + Sync,
{
    fn current_user(&self) -> Option<User> {
        self()
    }
}

pub struct Session {
    store: Mutex<Box<dyn KeyValueStore>>,
    user: RwLock<Option<User>>,
}

impl Session {
    /// Opens a session over `store`, reading any persisted user.
    pub fn open(store: impl KeyValueStore + 'static) -> Self {
        let store: Box<dyn KeyValueStore> = Box::new(store);
        let user = load_user(store.as_ref());
        Self {
            store: Mutex::new(store),
            user: RwLock::new(user),
        }
    }

    pub fn current(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Persists `user` and makes it current.
    pub fn login(&self, user: User) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&user)?;
        let mut store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        store.set(CURRENT_USER_KEY, &blob)?;
        info!(user = %user.name, permissions = %user.permissions, "logged in");
        *self.user.write().unwrap_or_else(|p| p.into_inner()) = Some(user);
        Ok(())
    }

    /// Logs in as [`User::demo`].
    pub fn login_demo(&self) -> Result<User, StoreError> {
        let user = User::demo();
        self.login(user.clone())?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        let mut store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        store.remove(CURRENT_USER_KEY)?;
        let previous = self
            .user
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(user) = previous {
            info!(user = %user.name, "logged out");
        }
        Ok(())
    }

    /// Re-reads the store, picking up changes made by another process.
    pub fn reload(&self) -> Option<User> {
        let store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        let user = load_user(store.as_ref());
        *self.user.write().unwrap_or_else(|p| p.into_inner()) = user.clone();
        user
    }
}

impl UserSource for Session {
    fn current_user(&self) -> Option<User> {
        self.current()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.current())
            .finish_non_exhaustive()
    }
}

/// Unreadable or malformed entries count as logged out.
fn load_user(store: &dyn KeyValueStore) -> Option<User> {
    let raw = match store.get(CURRENT_USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read persisted user, treating as logged out");
            return None;
        }
    };
    match serde_json::from_str::<User>(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "malformed persisted user, treating as logged out");
            None
        }
    }
}
