//! The dashboard application: session, navigation, data loading and post
//! actions wired together.
//!
//! [`App::render`] is the render-time half of access control. It resolves
//! the current location through the guard on every call, so a location
//! pushed before a logout (or typed directly) can never show protected
//! content. The navigator is the transition-time half.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::api::{ApiError, Comment, HttpPostsApi, InMemoryPostsApi, Post, PostId, PostsApi};
use crate::auth::{Session, User};
use crate::config::{Backend, Config};
use crate::error::{Error, Result};
use crate::forms::PostDraft;
use crate::guard::{resolve_location, Resolution};
use crate::navigator::{History, MemoryHistory, Navigator, Notifier, DENIED_NOTICE};
use crate::permissions::{has_permission, Permission};
use crate::query::{QueryClient, QueryKey, QueryOptions};
use crate::routes::{Params, RenderMode, RouteName, RouteTable, View};
use crate::storage::FileStore;
use crate::views::{Loaded, Page, Renderer, RECENT_LIMIT};

/// One rendered screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub route: RouteName,
    pub view: View,
    /// Location after redirects.
    pub path: String,
    pub redirected_from: Vec<String>,
    /// Set on the first render of a lazily loaded view.
    pub loading: bool,
    pub header: Option<String>,
    pub body: String,
}

impl Rendered {
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

impl std::fmt::Display for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(header) = &self.header {
            writeln!(f, "{header}")?;
            writeln!(f)?;
        }
        f.write_str(&self.body)
    }
}

pub struct App {
    session: Arc<Session>,
    api: Arc<dyn PostsApi>,
    queries: QueryClient,
    table: RouteTable,
    history: Arc<MemoryHistory>,
    notifier: Arc<dyn Notifier>,
    navigator: Navigator,
    shown: Mutex<HashSet<RouteName>>,
}

impl App {
    pub fn new(session: Arc<Session>, api: Arc<dyn PostsApi>, notifier: Arc<dyn Notifier>) -> Self {
        let table = RouteTable::standard();
        let history = Arc::new(MemoryHistory::default());
        let navigator = Navigator::new(table, session.clone(), history.clone(), notifier.clone());
        Self {
            session,
            api,
            queries: QueryClient::default(),
            table,
            history,
            notifier,
            navigator,
            shown: Mutex::new(HashSet::new()),
        }
    }

    /// Builds the app described by `config`: the session persisted at
    /// `config.session_file` and the configured backend.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let session = Arc::new(Session::open(FileStore::new(&config.session_file)));
        let api: Arc<dyn PostsApi> = match config.backend {
            Backend::Http => Arc::new(HttpPostsApi::new(config.api_base_url.as_str())?),
            Backend::Memory => Arc::new(InMemoryPostsApi::seeded()),
        };
        let options = QueryOptions {
            stale_after: config.stale_after,
            ..Default::default()
        };
        Ok(Self::new(session, api, notifier).with_query_options(options))
    }

    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.queries = QueryClient::new(options);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn history(&self) -> &MemoryHistory {
        &self.history
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn location(&self) -> String {
        self.history.location()
    }

    /// Guarded transition by route name.
    pub async fn go(&self, name: RouteName, params: &Params) -> Result<String> {
        Ok(self.navigator.go(name, params).await?)
    }

    /// Pushes a raw location (as if typed in the address bar) and renders it.
    pub async fn open(&self, path: &str) -> Rendered {
        self.history.push(path);
        self.render().await
    }

    /// Renders the current location for the current user.
    pub async fn render(&self) -> Rendered {
        let user = self.session.current();
        let location = self.history.location();
        let resolution = resolve_location(&self.table, user.as_ref(), &location);
        if resolution.was_redirected() {
            self.history.replace(&resolution.path);
        }

        let route = resolution.route;
        let loading = route.render == RenderMode::Lazy
            && self
                .shown
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .insert(route.name);
        if loading {
            info!(route = %route.name, "loading view");
        }

        let page = self.load(&resolution, user.as_ref()).await;
        let renderer = Renderer::new(&self.table, user.as_ref());
        Rendered {
            route: route.name,
            view: page.view(),
            path: resolution.path,
            redirected_from: resolution.redirected_from,
            loading,
            header: renderer.header(),
            body: renderer.render(&page),
        }
    }

    async fn load(&self, resolution: &Resolution, user: Option<&User>) -> Page {
        let id = resolution
            .params
            .get("id")
            .and_then(|raw| raw.parse::<PostId>().ok());

        match resolution.route.name {
            RouteName::Login => Page::Login,
            RouteName::Dashboard => {
                let recent_posts = if has_permission(user, Permission::ViewPosts) {
                    Some(self.recent_posts().await)
                } else {
                    None
                };
                let recent_comments = if has_permission(user, Permission::ViewComments) {
                    Some(self.recent_comments().await)
                } else {
                    None
                };
                Page::Dashboard {
                    recent_posts,
                    recent_comments,
                }
            }
            RouteName::Posts => Page::PostList(self.posts().await),
            RouteName::Post => Page::PostDetail(self.post(id).await),
            RouteName::EditPost => Page::PostEditor(self.post(id).await),
            RouteName::PostComments => match id {
                Some(post_id) => Page::PostComments {
                    post_id,
                    comments: self.post_comments(post_id).await,
                },
                None => Page::NotFound,
            },
            RouteName::CreatePost => Page::PostCreator,
            RouteName::Forbidden => Page::Forbidden,
            RouteName::NotFound => Page::NotFound,
        }
    }

    async fn recent_posts(&self) -> Loaded<Vec<Post>> {
        let api = &self.api;
        self.queries
            .fetch(QueryKey::recent_posts(), move || async move {
                let mut posts = api.list_posts().await?;
                posts.truncate(RECENT_LIMIT);
                Ok::<_, ApiError>(posts)
            })
            .await
            .map_err(|e| e.to_string())
    }

    async fn recent_comments(&self) -> Loaded<Vec<Comment>> {
        let api = &self.api;
        self.queries
            .fetch(QueryKey::recent_comments(), move || async move {
                let mut comments = api.list_comments().await?;
                comments.truncate(RECENT_LIMIT);
                Ok::<_, ApiError>(comments)
            })
            .await
            .map_err(|e| e.to_string())
    }

    async fn posts(&self) -> Loaded<Vec<Post>> {
        let api = &self.api;
        self.queries
            .fetch(QueryKey::posts(), move || api.list_posts())
            .await
            .map_err(|e| e.to_string())
    }

    /// `Ok(None)` for an unparsable id or a 404. A missing post is never
    /// cached, so it shows up as soon as it is created.
    async fn post(&self, id: Option<PostId>) -> Loaded<Option<Post>> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.fetch_post(id).await {
            Ok(post) => Ok(Some(post)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn fetch_post(&self, id: PostId) -> std::result::Result<Post, ApiError> {
        let api = &self.api;
        self.queries
            .fetch(QueryKey::post(id), move || api.get_post(id))
            .await
    }

    async fn post_comments(&self, id: PostId) -> Loaded<Vec<Comment>> {
        let api = &self.api;
        self.queries
            .fetch(QueryKey::post_comments(id), move || api.list_post_comments(id))
            .await
            .map_err(|e| e.to_string())
    }

    /// Logs in the demo account and lands on the dashboard.
    pub async fn login(&self) -> Result<User> {
        let user = self.session.login_demo()?;
        self.navigator.go(RouteName::Dashboard, &Params::new()).await?;
        Ok(user)
    }

    /// Clears the session and cached data, then shows the login page.
    pub async fn logout(&self) -> Result<()> {
        self.session.logout()?;
        self.queries.clear().await;
        self.navigator.go(RouteName::Login, &Params::new()).await?;
        Ok(())
    }

    fn require(&self, action: &'static str, permission: Permission) -> Result<()> {
        let user = self.session.current();
        if has_permission(user.as_ref(), permission) {
            return Ok(());
        }
        warn!(action, %permission, "action refused");
        self.notifier.notify(DENIED_NOTICE);
        Err(Error::Unauthorized { action, permission })
    }

    /// Form pre-filled from the stored post, with the given fields replaced.
    /// Fails with a 404 [`ApiError`] when the post does not exist.
    pub async fn edit_draft(
        &self,
        id: PostId,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<PostDraft> {
        let current = self.fetch_post(id).await?;
        let (old_title, old_body) = (current.title, current.body);
        Ok(PostDraft::new(
            title.unwrap_or(old_title),
            body.unwrap_or(old_body),
        ))
    }

    /// Creates a post and shows it.
    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        self.require("create post", Permission::CreatePost)?;
        let new_post = draft.to_new_post()?;
        let post = self.api.create_post(new_post).await?;
        info!(id = post.id, "post created");
        self.queries.invalidate(&QueryKey::posts()).await;
        self.queries.invalidate(&QueryKey::post(post.id)).await;
        self.show_post(post.id);
        Ok(post)
    }

    /// Applies `draft` to post `id` and shows it.
    pub async fn update_post(&self, id: PostId, draft: &PostDraft) -> Result<Post> {
        self.require("update post", Permission::EditPost)?;
        let patch = draft.to_patch()?;
        let post = self.api.update_post(id, patch).await?;
        info!(id, "post updated");
        self.queries.invalidate(&QueryKey::post(id)).await;
        self.queries.invalidate(&QueryKey::posts()).await;
        self.show_post(id);
        Ok(post)
    }

    /// Moves to the post page after a committed write. The write already
    /// happened, so this is not a guarded transition: the render-time guard
    /// sends viewers without VIEW_POSTS to 403 instead.
    fn show_post(&self, id: PostId) {
        let path = self
            .table
            .get(RouteName::Post)
            .path_for(&Params::new().with("id", id));
        debug!(%path, "showing post after write");
        self.history.push(&path);
    }

    /// Deletes post `id`. The location is left unchanged.
    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        self.require("delete post", Permission::EditPost)?;
        self.api.delete_post(id).await?;
        info!(id, "post deleted");
        self.queries.invalidate(&QueryKey::posts()).await;
        let dropped = self.queries.invalidate(&QueryKey::post(id)).await;
        debug!(id, dropped, "post entries dropped");
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("location", &self.history.location())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Operation;
    use crate::navigator::RecordingNotifier;
    use crate::storage::MemoryStore;

    fn app() -> (App, Arc<InMemoryPostsApi>, Arc<RecordingNotifier>) {
        let api = Arc::new(InMemoryPostsApi::seeded());
        let notices = Arc::new(RecordingNotifier::new());
        let app = App::new(
            Arc::new(Session::open(MemoryStore::new())),
            api.clone(),
            notices.clone(),
        )
        .with_query_options(QueryOptions {
            retry_delay: std::time::Duration::ZERO,
            ..Default::default()
        });
        (app, api, notices)
    }

    #[tokio::test]
    async fn logged_out_render_shows_login() {
        let (app, _, _) = app();
        let screen = app.render().await;
        assert_eq!(screen.route, RouteName::Login);
        assert_eq!(app.location(), "/login");
        assert!(screen.header.is_none());
    }

    #[tokio::test]
    async fn lazy_views_flag_first_render_only() {
        let (app, _, _) = app();
        app.login().await.unwrap();
        assert!(app.open("/posts").await.loading);
        assert!(!app.open("/posts").await.loading);
        assert!(!app.open("/").await.loading);
    }

    #[tokio::test]
    async fn missing_post_renders_not_found_state() {
        let (app, _, _) = app();
        app.login().await.unwrap();
        let screen = app.open("/posts/99").await;
        assert_eq!(screen.view, View::PostDetail);
        assert!(screen.body.contains("Post not found"));

        let screen = app.open("/posts/abc").await;
        assert!(screen.body.contains("Post not found"));
    }

    #[tokio::test]
    async fn denied_action_makes_no_remote_call() {
        let (app, api, notices) = app();
        app.login().await.unwrap();
        let err = app.delete_post(1).await.unwrap_err();
        assert!(err.is_denied());
        assert_eq!(api.calls(Operation::DeletePost), 0);
        assert_eq!(notices.drain(), vec![DENIED_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn remote_failure_renders_banner() {
        let (app, api, _) = app();
        app.login().await.unwrap();
        api.fail_next(2);
        let screen = app.open("/posts").await;
        assert!(screen.body.contains("! failed to fetch posts: HTTP 503"));
    }

    #[tokio::test]
    async fn edit_draft_keeps_unchanged_fields() {
        let (app, _, _) = app();
        let draft = app
            .edit_draft(2, Some("New title".into()), None)
            .await
            .unwrap();
        assert_eq!(draft.title, "New title");
        assert_eq!(draft.body, "Body of sample post 2. It says something useful.");
    }
}
