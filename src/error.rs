//! Crate-level error type.
//!
//! Each concern keeps its own `thiserror` enum; [`Error`] wraps them so app
//! actions can use `?` across layers.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::forms::FormErrors;
use crate::navigator::NavigationError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Invalid post: {0}")]
    Form(#[from] FormErrors),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An action was refused because the current user lacks a permission.
    #[error("{action} requires {permission}")]
    Unauthorized {
        action: &'static str,
        permission: crate::permissions::Permission,
    },
}

impl Error {
    /// True for refusals (navigation or action), as opposed to failures.
    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized { .. } | Error::Navigation(NavigationError::Denied { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
