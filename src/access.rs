//! The one authorization predicate.
//!
//! Both the navigator (before a transition) and the guard (at render time)
//! ask [`authorize`]. Neither carries its own rule.

use crate::auth::User;
use crate::permissions::has_all;
use crate::routes::RouteDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// No user and the route is not public.
    Unauthenticated,
    /// A user is present but lacks at least one required permission.
    Forbidden,
}

impl Access {
    pub fn is_granted(self) -> bool {
        self == Access::Granted
    }
}

pub fn authorize(user: Option<&User>, route: &RouteDescriptor) -> Access {
    if route.public {
        return Access::Granted;
    }
    match user {
        None => Access::Unauthenticated,
        Some(_) if has_all(user, route.permissions) => Access::Granted,
        Some(_) => Access::Forbidden,
    }
}
