//! Postboard - a permission-gated dashboard over a blog post/comment API.
//!
//! Routes are declared once in a [`RouteTable`]. Access is enforced twice
//! from one predicate ([`access::authorize`]):
//! - at transition time by the [`Navigator`], which refuses and notifies;
//! - at render time by [`guard::resolve_location`], which redirects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use postboard::{App, InMemoryPostsApi, MemoryStore, RecordingNotifier, Session};
//!
//! # async fn demo() -> postboard::Result<()> {
//! let app = App::new(
//!     Arc::new(Session::open(MemoryStore::new())),
//!     Arc::new(InMemoryPostsApi::seeded()),
//!     Arc::new(RecordingNotifier::new()),
//! );
//! app.login().await?;
//! println!("{}", app.open("/posts").await);
//! # Ok(())
//! # }
//! ```

pub mod error;

// Identity and persistence
pub mod auth;
pub mod permissions;
pub mod storage;

// Routing and access control
pub mod access;
pub mod guard;
pub mod navigator;
pub mod routes;

// Remote data
pub mod api;
pub mod query;

// Presentation and actions
pub mod app;
pub mod config;
pub mod forms;
pub mod views;

pub use access::{authorize, Access};
pub use api::{ApiError, Comment, HttpPostsApi, InMemoryPostsApi, NewPost, Post, PostPatch, PostsApi};
pub use app::{App, Rendered};
pub use auth::{Session, User, UserSource};
pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use forms::PostDraft;
pub use guard::{guard, resolve_location, GuardDecision, Resolution};
pub use navigator::{History, MemoryHistory, NavigationError, Navigator, Notifier, RecordingNotifier};
pub use permissions::{has_all, has_any, has_permission, Permission, PermissionSet};
pub use query::{QueryClient, QueryKey, QueryOptions};
pub use routes::{Params, RouteName, RouteTable, ROUTES};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
