//! Wire types of the posts API. Field names follow the JSON the server
//! speaks (`userId`, `postId`).

use serde::{Deserialize, Serialize};

pub type PostId = u64;
pub type CommentId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub user_id: u64,
}

/// Body of a create request: a post without its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: u64,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

impl PostPatch {
    pub fn apply(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(user_id) = self.user_id {
            post.user_id = user_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_uses_camel_case_user_id() {
        let post: Post =
            serde_json::from_str(r#"{"userId":1,"id":3,"title":"t","body":"b"}"#).unwrap();
        assert_eq!(post.user_id, 1);
        assert_eq!(post.id, 3);
    }

    #[test]
    fn patch_omits_absent_fields() {
        let patch = PostPatch {
            title: Some("new".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"title":"new"}"#);

        let mut post = Post {
            id: 1,
            title: "old".into(),
            body: "kept".into(),
            user_id: 2,
        };
        patch.apply(&mut post);
        assert_eq!(post.title, "new");
        assert_eq!(post.body, "kept");
    }
}
