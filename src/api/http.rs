//! HTTP implementation of [`PostsApi`] over reqwest.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{ApiError, Comment, NewPost, Operation, Post, PostId, PostPatch, PostsApi, Result};

/// Public JSONPlaceholder instance.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Clone, Debug)]
pub struct HttpPostsApi {
    base_url: String,
    client: Client,
}

impl HttpPostsApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, operation: Operation, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;
        let status = response.status();
        debug!(%operation, status = status.as_u16(), "api response");
        if !status.is_success() {
            return Err(ApiError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, operation: Operation, request: RequestBuilder) -> Result<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ApiError::Transport { operation, source })
    }
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let req = self.client.get(self.url("/posts"));
        self.json(Operation::ListPosts, req).await
    }

    async fn get_post(&self, id: PostId) -> Result<Post> {
        let req = self.client.get(self.url(&format!("/posts/{id}")));
        self.json(Operation::GetPost, req).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let req = self.client.post(self.url("/posts")).json(&post);
        self.json(Operation::CreatePost, req).await
    }

    async fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post> {
        let req = self
            .client
            .patch(self.url(&format!("/posts/{id}")))
            .json(&patch);
        self.json(Operation::UpdatePost, req).await
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        let req = self.client.delete(self.url(&format!("/posts/{id}")));
        self.send(Operation::DeletePost, req).await?;
        Ok(())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>> {
        let req = self.client.get(self.url("/comments"));
        self.json(Operation::ListComments, req).await
    }

    async fn list_post_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let req = self.client.get(self.url(&format!("/posts/{post_id}/comments")));
        self.json(Operation::ListPostComments, req).await
    }
}
