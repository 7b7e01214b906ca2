//! Text rendering of each page.
//!
//! The app loads a [`Page`] (data plus load errors) and this module turns it
//! into lines for the terminal. Action links are only shown when the viewer
//! holds the permission the target needs.

use crate::api::{Comment, Post, PostId};
use crate::auth::User;
use crate::permissions::{has_permission, Permission};
use crate::routes::{Params, RouteName, RouteTable, View};

/// Posts and comments shown on the dashboard.
pub const RECENT_LIMIT: usize = 5;

/// Data or the message of the remote failure that prevented loading it.
pub type Loaded<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Login,
    Dashboard {
        /// `None` when the viewer may not see posts.
        recent_posts: Option<Loaded<Vec<Post>>>,
        recent_comments: Option<Loaded<Vec<Comment>>>,
    },
    PostList(Loaded<Vec<Post>>),
    /// `Ok(None)` means the post does not exist.
    PostDetail(Loaded<Option<Post>>),
    PostEditor(Loaded<Option<Post>>),
    PostComments {
        post_id: PostId,
        comments: Loaded<Vec<Comment>>,
    },
    PostCreator,
    Forbidden,
    NotFound,
}

impl Page {
    pub fn view(&self) -> View {
        match self {
            Page::Login => View::Login,
            Page::Dashboard { .. } => View::Dashboard,
            Page::PostList(_) => View::PostList,
            Page::PostDetail(_) => View::PostDetail,
            Page::PostEditor(_) => View::PostEditor,
            Page::PostComments { .. } => View::PostComments,
            Page::PostCreator => View::PostCreator,
            Page::Forbidden => View::Forbidden,
            Page::NotFound => View::NotFound,
        }
    }
}

/// Line buffer for one screen.
#[derive(Debug, Default)]
struct Screen {
    lines: Vec<String>,
}

impl Screen {
    fn heading(&mut self, text: &str) {
        self.lines.push(text.to_string());
        self.lines.push("=".repeat(text.chars().count()));
    }

    fn section(&mut self, text: &str) {
        self.blank();
        self.lines.push(format!("-- {text} --"));
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn error(&mut self, message: &str) {
        self.lines.push(format!("! {message}"));
    }

    fn link(&mut self, label: &str, path: &str) {
        self.lines.push(format!("  [{label}] {path}"));
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

pub struct Renderer<'a> {
    table: &'a RouteTable,
    user: Option<&'a User>,
}

impl<'a> Renderer<'a> {
    pub fn new(table: &'a RouteTable, user: Option<&'a User>) -> Self {
        Self { table, user }
    }

    fn can(&self, permission: Permission) -> bool {
        has_permission(self.user, permission)
    }

    fn path(&self, name: RouteName, id: Option<PostId>) -> String {
        let params = match id {
            Some(id) => Params::new().with("id", id),
            None => Params::new(),
        };
        self.table.get(name).path_for(&params)
    }

    /// One-line header shown above authenticated pages.
    pub fn header(&self) -> Option<String> {
        self.user
            .map(|u| format!("postboard | {} ({}) | logout", u.name, u.permissions))
    }

    pub fn render(&self, page: &Page) -> String {
        let mut s = Screen::default();
        match page {
            Page::Login => self.login(&mut s),
            Page::Dashboard {
                recent_posts,
                recent_comments,
            } => self.dashboard(&mut s, recent_posts.as_ref(), recent_comments.as_ref()),
            Page::PostList(posts) => self.post_list(&mut s, posts),
            Page::PostDetail(post) => self.post_detail(&mut s, post),
            Page::PostEditor(post) => self.post_editor(&mut s, post),
            Page::PostComments { post_id, comments } => {
                self.post_comments(&mut s, *post_id, comments)
            }
            Page::PostCreator => self.post_creator(&mut s),
            Page::Forbidden => {
                s.heading("403 - Access denied");
                s.line("You don't have permission to view this page.");
                s.blank();
                s.link("home", &self.path(RouteName::Dashboard, None));
            }
            Page::NotFound => {
                s.heading("404 - Page not found");
                s.line("The page you're looking for doesn't exist.");
                s.blank();
                s.link("home", &self.path(RouteName::Dashboard, None));
            }
        }
        s.finish()
    }

    fn login(&self, s: &mut Screen) {
        s.heading("Sign in");
        s.line("This dashboard uses a demo account.");
        s.line("Run `login` to continue as John Doe (VIEW_POSTS, VIEW_COMMENTS).");
    }

    fn dashboard(
        &self,
        s: &mut Screen,
        posts: Option<&Loaded<Vec<Post>>>,
        comments: Option<&Loaded<Vec<Comment>>>,
    ) {
        s.heading("Dashboard");
        s.line("Welcome to your dashboard. Here's an overview of recent activity.");

        if let Some(posts) = posts {
            s.section("Recent Posts");
            match posts {
                Ok(posts) => {
                    for post in posts.iter().take(RECENT_LIMIT) {
                        s.line(format!("#{} {}", post.id, post.title));
                        s.link("view", &self.path(RouteName::Post, Some(post.id)));
                    }
                    s.link("all posts", &self.path(RouteName::Posts, None));
                }
                Err(e) => s.error(e),
            }
        }

        if let Some(comments) = comments {
            s.section("Recent Comments");
            match comments {
                Ok(comments) => {
                    for c in comments.iter().take(RECENT_LIMIT) {
                        s.line(format!("{} <{}> on post #{}", c.name, c.email, c.post_id));
                        s.line(format!("  {}", c.body));
                    }
                }
                Err(e) => s.error(e),
            }
        }
    }

    fn post_list(&self, s: &mut Screen, posts: &Loaded<Vec<Post>>) {
        s.heading("Posts");
        s.line("Manage and view all posts");
        if self.can(Permission::CreatePost) {
            s.link("create", &self.path(RouteName::CreatePost, None));
        }
        let posts = match posts {
            Ok(posts) => posts,
            Err(e) => return s.error(e),
        };
        if posts.is_empty() {
            s.blank();
            s.line("No posts found");
            s.line("There are no posts available at the moment.");
            return;
        }
        for post in posts {
            s.blank();
            s.line(format!("#{} {}", post.id, post.title));
            s.line(format!("  {}", post.body));
            s.link("view", &self.path(RouteName::Post, Some(post.id)));
            if self.can(Permission::EditPost) {
                s.link("edit", &self.path(RouteName::EditPost, Some(post.id)));
            }
            if self.can(Permission::ViewComments) {
                s.link("comments", &self.path(RouteName::PostComments, Some(post.id)));
            }
            if self.can(Permission::EditPost) {
                s.link("delete", &format!("delete {}", post.id));
            }
        }
    }

    fn missing_post(&self, s: &mut Screen, what: &str) {
        s.heading("Post not found");
        s.line(format!("The post you're {what} doesn't exist."));
        s.link("back to posts", &self.path(RouteName::Posts, None));
    }

    fn post_detail(&self, s: &mut Screen, post: &Loaded<Option<Post>>) {
        let post = match post {
            Ok(Some(post)) => post,
            Ok(None) => return self.missing_post(s, "looking for"),
            Err(e) => return s.error(e),
        };
        s.link("back to posts", &self.path(RouteName::Posts, None));
        s.heading(&post.title);
        s.line(format!("Post #{} by user {}", post.id, post.user_id));
        s.blank();
        s.line(post.body.clone());
        s.blank();
        if self.can(Permission::EditPost) {
            s.link("edit", &self.path(RouteName::EditPost, Some(post.id)));
        }
        if self.can(Permission::ViewComments) {
            s.link("comments", &self.path(RouteName::PostComments, Some(post.id)));
        }
    }

    fn post_editor(&self, s: &mut Screen, post: &Loaded<Option<Post>>) {
        let post = match post {
            Ok(Some(post)) => post,
            Ok(None) => return self.missing_post(s, "trying to edit"),
            Err(e) => return s.error(e),
        };
        s.link("back to post", &self.path(RouteName::Post, Some(post.id)));
        s.heading("Edit Post");
        s.line("Make changes to your post below.");
        s.blank();
        s.line(format!("Title:   {}", post.title));
        s.line(format!("Content: {}", post.body));
        s.blank();
        s.line(format!(
            "Save with: edit {} --title <title> --body <content>",
            post.id
        ));
    }

    fn post_comments(&self, s: &mut Screen, post_id: PostId, comments: &Loaded<Vec<Comment>>) {
        s.link("back to post", &self.path(RouteName::Post, Some(post_id)));
        s.heading(&format!("Comments on post #{post_id}"));
        let comments = match comments {
            Ok(comments) => comments,
            Err(e) => return s.error(e),
        };
        if comments.is_empty() {
            s.line("No comments yet.");
            return;
        }
        for c in comments {
            s.blank();
            s.line(format!("{} <{}>", c.name, c.email));
            s.line(format!("  {}", c.body));
        }
    }

    fn post_creator(&self, s: &mut Screen) {
        s.link("back to posts", &self.path(RouteName::Posts, None));
        s.heading("Create New Post");
        s.line("Fill out the form below to create a new post.");
        s.blank();
        s.line("Title:   at least 3 characters");
        s.line("Content: at least 10 characters");
        s.blank();
        s.line("Submit with: create --title <title> --body <content>");
    }
}
