//! PostsApi trait: the boundary between the dashboard and the blog backend.
//!
//! Two implementations: [`HttpPostsApi`] talks to a JSONPlaceholder
//! compatible REST server, [`InMemoryPostsApi`] keeps everything in process
//! for offline runs and tests.

pub mod http;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpPostsApi;
pub use memory::InMemoryPostsApi;
pub use types::{Comment, CommentId, NewPost, Post, PostId, PostPatch};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("failed to {operation}: HTTP {status}")]
    Status { operation: Operation, status: u16 },

    #[error("failed to {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            ApiError::Status { operation, .. } | ApiError::Transport { operation, .. } => {
                Some(*operation)
            }
            ApiError::Url(_) => None,
        }
    }
}

/// Remote call kinds, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListPosts,
    GetPost,
    CreatePost,
    UpdatePost,
    DeletePost,
    ListComments,
    ListPostComments,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::ListPosts => "fetch posts",
            Operation::GetPost => "fetch post",
            Operation::CreatePost => "create post",
            Operation::UpdatePost => "update post",
            Operation::DeletePost => "delete post",
            Operation::ListComments => "fetch comments",
            Operation::ListPostComments => "fetch post comments",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>>;

    async fn get_post(&self, id: PostId) -> Result<Post>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Partial update (HTTP PATCH).
    async fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post>;

    async fn delete_post(&self, id: PostId) -> Result<()>;

    async fn list_comments(&self) -> Result<Vec<Comment>>;

    async fn list_post_comments(&self, post_id: PostId) -> Result<Vec<Comment>>;
}
