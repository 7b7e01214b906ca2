//! Post form validation.
//!
//! Creating a post is stricter than editing one: new posts need a title of
//! at least 3 characters and a body of at least 10 (after trimming); edits
//! only need both fields non-blank.

use std::fmt;

use crate::api::{NewPost, PostPatch};

const MIN_TITLE_LEN: usize = 3;
const MIN_BODY_LEN: usize = 10;

/// Author id assigned to posts created from the dashboard.
pub const DEFAULT_AUTHOR_ID: u64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub body: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }

    /// Validates for creation and builds the request body.
    pub fn to_new_post(&self) -> Result<NewPost, FormErrors> {
        let title = self.title.trim();
        let body = self.body.trim();
        let errors = FormErrors {
            title: if title.is_empty() {
                Some("Title is required".into())
            } else if title.chars().count() < MIN_TITLE_LEN {
                Some(format!(
                    "Title must be at least {MIN_TITLE_LEN} characters long"
                ))
            } else {
                None
            },
            body: if body.is_empty() {
                Some("Content is required".into())
            } else if body.chars().count() < MIN_BODY_LEN {
                Some(format!(
                    "Content must be at least {MIN_BODY_LEN} characters long"
                ))
            } else {
                None
            },
        };
        errors.into_result()?;
        Ok(NewPost {
            title: title.to_string(),
            body: body.to_string(),
            user_id: DEFAULT_AUTHOR_ID,
        })
    }

    /// Validates for editing and builds the patch.
    pub fn to_patch(&self) -> Result<PostPatch, FormErrors> {
        let title = self.title.trim();
        let body = self.body.trim();
        let errors = FormErrors {
            title: title.is_empty().then(|| "Title is required".to_string()),
            body: body.is_empty().then(|| "Content is required".to_string()),
        };
        errors.into_result()?;
        Ok(PostPatch {
            title: Some(title.to_string()),
            body: Some(body.to_string()),
            user_id: None,
        })
    }
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [self.title.as_deref(), self.body.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}
