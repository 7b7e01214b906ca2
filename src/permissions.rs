//! Permission model
//!
//! Permissions are a closed set of capability tags. A user holds a
//! [`PermissionSet`]; routes and actions require one. All checks are total
//! functions: an absent user never passes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::User;

/// Capability tag required to reach a route or perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ViewPosts,
    ViewComments,
    EditPost,
    CreatePost,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::ViewPosts,
        Permission::ViewComments,
        Permission::EditPost,
        Permission::CreatePost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewPosts => "VIEW_POSTS",
            Permission::ViewComments => "VIEW_COMMENTS",
            Permission::EditPost => "EDIT_POST",
            Permission::CreatePost => "CREATE_POST",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Set of granted permissions. Serializes as a plain array of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// True iff every permission in `required` is granted. Vacuously true
    /// for an empty requirement.
    pub fn contains_all(&self, required: &[Permission]) -> bool {
        required.iter().all(|p| self.0.contains(p))
    }

    pub fn contains_any(&self, candidates: &[Permission]) -> bool {
        candidates.iter().any(|p| self.0.contains(p))
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(Permission::as_str).collect();
        write!(f, "{}", tags.join(", "))
    }
}

/// False when there is no user, else a membership test.
pub fn has_permission(user: Option<&User>, permission: Permission) -> bool {
    user.is_some_and(|u| u.permissions.contains(permission))
}

/// False when there is no user, else true iff all of `permissions` are granted.
pub fn has_all(user: Option<&User>, permissions: &[Permission]) -> bool {
    user.is_some_and(|u| u.permissions.contains_all(permissions))
}

/// False when there is no user, else true iff any of `permissions` is granted.
pub fn has_any(user: Option<&User>, permissions: &[Permission]) -> bool {
    user.is_some_and(|u| u.permissions.contains_any(permissions))
}
