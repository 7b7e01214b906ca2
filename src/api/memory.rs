//! In-process [`PostsApi`] backed by vectors behind a lock.
//!
//! Mutations are real here (unlike the public demo server), so a deleted
//! post stays deleted. Call counts and injected failures make it usable as
//! a test double for the query cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ApiError, Comment, NewPost, Operation, Post, PostId, PostPatch, PostsApi, Result};

#[derive(Debug, Default)]
struct Data {
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

#[derive(Debug, Default)]
pub struct InMemoryPostsApi {
    data: RwLock<Data>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: AtomicUsize,
}

impl InMemoryPostsApi {
    pub fn new(posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self {
            data: RwLock::new(Data { posts, comments }),
            ..Default::default()
        }
    }

    /// A small fixed data set: six posts, two comments on each of the
    /// first three.
    pub fn seeded() -> Self {
        let posts = (1..=6)
            .map(|id| Post {
                id,
                title: format!("Sample post {id}"),
                body: format!("Body of sample post {id}. It says something useful."),
                user_id: 1 + (id - 1) / 3,
            })
            .collect();
        let comments = (1..=6)
            .map(|id| {
                let post_id = 1 + (id - 1) / 2;
                Comment {
                    id,
                    post_id,
                    name: format!("Comment {id}"),
                    email: format!("reader{id}@example.com"),
                    body: format!("Comment {id} on post {post_id}."),
                }
            })
            .collect();
        Self::new(posts, comments)
    }

    /// Makes the next `n` calls fail with HTTP 503.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// How many times `operation` was attempted.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key(operation))
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, operation: Operation) -> Result<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(key(operation))
            .or_default() += 1;

        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(ApiError::Status {
                operation,
                status: 503,
            });
        }
        Ok(())
    }
}

fn key(operation: Operation) -> &'static str {
    match operation {
        Operation::ListPosts => "list_posts",
        Operation::GetPost => "get_post",
        Operation::CreatePost => "create_post",
        Operation::UpdatePost => "update_post",
        Operation::DeletePost => "delete_post",
        Operation::ListComments => "list_comments",
        Operation::ListPostComments => "list_post_comments",
    }
}

fn not_found(operation: Operation) -> ApiError {
    ApiError::Status {
        operation,
        status: 404,
    }
}

#[async_trait]
impl PostsApi for InMemoryPostsApi {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.enter(Operation::ListPosts)?;
        Ok(self.data.read().await.posts.clone())
    }

    async fn get_post(&self, id: PostId) -> Result<Post> {
        self.enter(Operation::GetPost)?;
        self.data
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(Operation::GetPost))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.enter(Operation::CreatePost)?;
        let mut data = self.data.write().await;
        let id = data.posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let created = Post {
            id,
            title: post.title,
            body: post.body,
            user_id: post.user_id,
        };
        data.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post> {
        self.enter(Operation::UpdatePost)?;
        let mut data = self.data.write().await;
        let post = data
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(Operation::UpdatePost))?;
        patch.apply(post);
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        self.enter(Operation::DeletePost)?;
        let mut data = self.data.write().await;
        let before = data.posts.len();
        data.posts.retain(|p| p.id != id);
        if data.posts.len() == before {
            return Err(not_found(Operation::DeletePost));
        }
        data.comments.retain(|c| c.post_id != id);
        Ok(())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>> {
        self.enter(Operation::ListComments)?;
        Ok(self.data.read().await.comments.clone())
    }

    async fn list_post_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        self.enter(Operation::ListPostComments)?;
        Ok(self
            .data
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_removes_post_and_its_comments() {
        let api = InMemoryPostsApi::seeded();
        api.delete_post(1).await.unwrap();
        let posts = api.list_posts().await.unwrap();
        assert!(posts.iter().all(|p| p.id != 1));
        assert!(api.list_post_comments(1).await.unwrap().is_empty());
        assert!(api.delete_post(1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn create_assigns_next_id() {
        let api = InMemoryPostsApi::seeded();
        let created = api
            .create_post(NewPost {
                title: "Hello".into(),
                body: "A new post body".into(),
                user_id: 1,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 7);
        assert_eq!(api.get_post(7).await.unwrap(), created);
    }

    #[tokio::test]
    async fn update_patches_fields() {
        let api = InMemoryPostsApi::seeded();
        let patch = PostPatch {
            body: Some("replaced".into()),
            ..Default::default()
        };
        let updated = api.update_post(2, patch.clone()).await.unwrap();
        assert_eq!(updated.body, "replaced");
        assert_eq!(updated.title, "Sample post 2");
        assert!(api.update_post(99, patch).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_are_counted() {
        let api = InMemoryPostsApi::seeded();
        api.fail_next(1);
        assert!(api.list_posts().await.is_err());
        assert!(api.list_posts().await.is_ok());
        assert_eq!(api.calls(Operation::ListPosts), 2);
        assert_eq!(api.calls(Operation::GetPost), 0);
    }
}
