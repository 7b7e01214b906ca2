//! Guarded navigation by route name.
//!
//! A [`Navigator`] turns route names into paths (`get`) and into guarded
//! transitions (`go`). Permissions are checked against the user returned by
//! the [`UserSource`] at the moment `go` is called, never cached.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::access::{authorize, Access};
use crate::auth::UserSource;
use crate::routes::{MissingParameter, Params, RouteDescriptor, RouteName, RouteTable};

/// Notice shown when a transition is refused for lack of permissions.
pub const DENIED_NOTICE: &str = "You don't have permission to access this page.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("access to '{route}' refused ({access:?})")]
    Denied { route: RouteName, access: Access },

    #[error(transparent)]
    MissingParameter(#[from] MissingParameter),

    #[error(transparent)]
    Preload(#[from] PreloadError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not prepare '{namespace}': {reason}")]
pub struct PreloadError {
    pub namespace: String,
    pub reason: String,
}

/// Where transitions land.
pub trait History: Send + Sync {
    fn push(&self, path: &str);

    fn location(&self) -> String;
}

/// Surfaces user-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Work that must finish before a route is shown (locale warm-up).
#[async_trait]
pub trait Preloader: Send + Sync {
    async fn prepare(&self, namespaces: &[&'static str]) -> Result<(), PreloadError>;
}

/// In-process history stack.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(vec![initial.into()]),
        }
    }

    /// Replaces the current entry instead of pushing a new one.
    pub fn replace(&self, path: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.last_mut() {
            Some(last) => *last = path.to_string(),
            None => entries.push(path.to_string()),
        }
    }

    /// Pops the current entry; returns the new location, if any remains.
    pub fn back(&self) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() > 1 {
            entries.pop();
            entries.last().cloned()
        } else {
            None
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn push(&self, path: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(path.to_string());
    }

    fn location(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }
}

/// Collects notices until the caller drains them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message.to_string());
    }
}

/// Tracks which locale namespaces have been warmed up. Namespaces are
/// bundled, so preparing one only records it.
#[derive(Debug, Default)]
pub struct LocaleCatalog {
    loaded: Mutex<BTreeSet<&'static str>>,
}

impl LocaleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, namespace: &str) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(namespace)
    }
}

#[async_trait]
impl Preloader for LocaleCatalog {
    async fn prepare(&self, namespaces: &[&'static str]) -> Result<(), PreloadError> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|p| p.into_inner());
        for &ns in namespaces {
            if loaded.insert(ns) {
                debug!(namespace = ns, "locale namespace ready");
            }
        }
        Ok(())
    }
}

pub struct Navigator {
    table: RouteTable,
    users: Arc<dyn UserSource>,
    history: Arc<dyn History>,
    notifier: Arc<dyn Notifier>,
    preloader: Arc<dyn Preloader>,
}

impl Navigator {
    pub fn new(
        table: RouteTable,
        users: Arc<dyn UserSource>,
        history: Arc<dyn History>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            table,
            users,
            history,
            notifier,
            preloader: Arc::new(LocaleCatalog::new()),
        }
    }

    pub fn with_preloader(mut self, preloader: Arc<dyn Preloader>) -> Self {
        self.preloader = preloader;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Helpers for one route.
    ///
    /// # Panics
    ///
    /// If `name` is not in the table.
    pub fn route(&self, name: RouteName) -> RouteHandle<'_> {
        RouteHandle {
            navigator: self,
            route: self.table.get(name),
        }
    }

    /// One handle per route, in table order.
    pub fn handles(&self) -> impl Iterator<Item = RouteHandle<'_>> {
        self.table.routes().iter().map(move |route| RouteHandle {
            navigator: self,
            route,
        })
    }

    /// Path for `name`. Unfilled `:tokens` stay in the result.
    pub fn resolve(&self, name: RouteName, params: &Params) -> String {
        self.table.get(name).path_for(params)
    }

    /// Whether `go(name)` would pass the permission check right now.
    pub fn can_go(&self, name: RouteName) -> bool {
        let user = self.users.current_user();
        authorize(user.as_ref(), self.table.get(name)).is_granted()
    }

    pub async fn go(&self, name: RouteName, params: &Params) -> Result<String, NavigationError> {
        self.transition(self.table.get(name), params).await
    }

    async fn transition(
        &self,
        route: &'static RouteDescriptor,
        params: &Params,
    ) -> Result<String, NavigationError> {
        let user = self.users.current_user();
        let access = authorize(user.as_ref(), route);
        if !access.is_granted() {
            warn!(route = %route.name, ?access, "navigation refused");
            self.notifier.notify(DENIED_NOTICE);
            return Err(NavigationError::Denied {
                route: route.name,
                access,
            });
        }

        let path = route.try_path_for(params).map_err(|e| {
            self.notifier.notify(&e.to_string());
            NavigationError::from(e)
        })?;

        if !route.preload.is_empty() {
            self.preloader.prepare(route.preload).await.map_err(|e| {
                self.notifier.notify(&e.to_string());
                NavigationError::from(e)
            })?;
        }

        debug!(route = %route.name, %path, "navigating");
        self.history.push(&path);
        Ok(path)
    }
}

/// `get`/`go` bound to a single route.
#[derive(Clone, Copy)]
pub struct RouteHandle<'a> {
    navigator: &'a Navigator,
    route: &'static RouteDescriptor,
}

impl<'a> RouteHandle<'a> {
    pub fn name(&self) -> RouteName {
        self.route.name
    }

    pub fn descriptor(&self) -> &'static RouteDescriptor {
        self.route
    }

    pub fn get(&self, params: &Params) -> String {
        self.route.path_for(params)
    }

    pub async fn go(&self, params: &Params) -> Result<String, NavigationError> {
        self.navigator.transition(self.route, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, User};
    use crate::permissions::Permission;
    use crate::storage::MemoryStore;

    struct Fixture {
        session: Arc<Session>,
        history: Arc<MemoryHistory>,
        notices: Arc<RecordingNotifier>,
        navigator: Navigator,
    }

    fn fixture() -> Fixture {
        let session = Arc::new(Session::open(MemoryStore::new()));
        let history = Arc::new(MemoryHistory::new("/login"));
        let notices = Arc::new(RecordingNotifier::new());
        let navigator = Navigator::new(
            RouteTable::standard(),
            session.clone(),
            history.clone(),
            notices.clone(),
        );
        Fixture {
            session,
            history,
            notices,
            navigator,
        }
    }

    struct FailingPreloader;

    #[async_trait]
    impl Preloader for FailingPreloader {
        async fn prepare(&self, namespaces: &[&'static str]) -> Result<(), PreloadError> {
            Err(PreloadError {
                namespace: namespaces.first().copied().unwrap_or_default().to_string(),
                reason: "offline".into(),
            })
        }
    }

    #[test]
    fn resolve_post_path() {
        let f = fixture();
        let params = Params::new().with("id", 42);
        assert_eq!(f.navigator.resolve(RouteName::Post, &params), "/posts/42");
        assert_eq!(f.navigator.route(RouteName::Post).get(&params), "/posts/42");
    }

    #[test]
    fn handles_cover_every_route() {
        let f = fixture();
        let names: Vec<RouteName> = f.navigator.handles().map(|h| h.name()).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], RouteName::Login);
    }

    #[tokio::test]
    async fn denied_without_user() {
        let f = fixture();
        let err = f
            .navigator
            .go(RouteName::Posts, &Params::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NavigationError::Denied {
                route: RouteName::Posts,
                access: Access::Unauthenticated
            }
        );
        assert_eq!(f.notices.drain(), vec![DENIED_NOTICE.to_string()]);
        assert_eq!(f.history.location(), "/login");
    }

    #[tokio::test]
    async fn checks_user_at_call_time() {
        let f = fixture();
        assert!(f.navigator.go(RouteName::Posts, &Params::new()).await.is_err());

        f.session.login_demo().unwrap();
        let path = f.navigator.go(RouteName::Posts, &Params::new()).await.unwrap();
        assert_eq!(path, "/posts");
        assert_eq!(f.history.location(), "/posts");

        f.session.logout().unwrap();
        assert!(f.navigator.go(RouteName::Posts, &Params::new()).await.is_err());
    }

    #[tokio::test]
    async fn demo_user_cannot_open_create() {
        let f = fixture();
        f.session.login_demo().unwrap();
        let err = f
            .navigator
            .route(RouteName::CreatePost)
            .go(&Params::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NavigationError::Denied {
                access: Access::Forbidden,
                ..
            }
        ));
        assert!(!f.navigator.can_go(RouteName::CreatePost));
    }

    #[tokio::test]
    async fn missing_parameter_aborts() {
        let f = fixture();
        f.session.login_demo().unwrap();
        let err = f
            .navigator
            .go(RouteName::Post, &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::MissingParameter(_)));
        assert_eq!(f.notices.drain().len(), 1);
        assert_eq!(f.history.entries(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn preload_runs_before_transition() {
        let session = Arc::new(Session::open(MemoryStore::new()));
        session.login_demo().unwrap();
        let catalog = Arc::new(LocaleCatalog::new());
        let history = Arc::new(MemoryHistory::default());
        let navigator = Navigator::new(
            RouteTable::standard(),
            session,
            history.clone(),
            Arc::new(RecordingNotifier::new()),
        )
        .with_preloader(catalog.clone());

        navigator
            .go(RouteName::PostComments, &Params::new().with("id", 3))
            .await
            .unwrap();
        assert!(catalog.is_loaded("postComments"));
        assert_eq!(history.location(), "/posts/3/comments");

        // Public routes without namespaces transition immediately.
        navigator.go(RouteName::NotFound, &Params::new()).await.unwrap();
        assert_eq!(history.location(), "/404");
    }

    #[tokio::test]
    async fn preload_failure_aborts() {
        let user = User::new("all", Permission::ALL);
        let history = Arc::new(MemoryHistory::default());
        let notices = Arc::new(RecordingNotifier::new());
        let navigator = Navigator::new(
            RouteTable::standard(),
            Arc::new(move || Some(user.clone())),
            history.clone(),
            notices.clone(),
        )
        .with_preloader(Arc::new(FailingPreloader));

        let err = navigator.go(RouteName::Posts, &Params::new()).await.unwrap_err();
        assert!(matches!(err, NavigationError::Preload(_)));
        assert_eq!(notices.drain(), vec!["could not prepare 'posts': offline"]);
        assert_eq!(history.location(), "/");
    }

    #[test]
    fn memory_history_back_and_replace() {
        let history = MemoryHistory::new("/");
        history.push("/posts");
        history.replace("/posts/1");
        assert_eq!(history.entries(), vec!["/", "/posts/1"]);
        assert_eq!(history.back().as_deref(), Some("/"));
        assert_eq!(history.back(), None);
    }
}
