//! Domain service for posts, comments and likes.

use serde::Deserialize;
use thiserror::Error;

use crate::db::{Comment, Post};
use crate::services::session::CurrentUser;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlogError {
    #[must_use]
    pub const fn post_not_found(id: i32) -> Self {
        Self::NotFound {
            resource: "Post",
            id,
        }
    }
}

impl From<sea_orm::DbErr> for BlogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for BlogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<String>,
}

/// Mutating operations take a [`CurrentUser`], which handlers only obtain
/// from the access gate.
#[async_trait::async_trait]
pub trait BlogService: Send + Sync {
    async fn create_post(&self, author: &CurrentUser, post: NewPost) -> Result<Post, BlogError>;

    /// Newest first; `search` filters on a title or content substring.
    async fn list_posts(&self, search: Option<&str>) -> Result<Vec<Post>, BlogError>;

    async fn get_post(&self, id: i32) -> Result<Post, BlogError>;

    /// Oldest first.
    async fn list_comments(&self, post_id: i32) -> Result<Vec<Comment>, BlogError>;

    async fn add_comment(
        &self,
        post_id: i32,
        author: &CurrentUser,
        content: &str,
    ) -> Result<Comment, BlogError>;

    /// Adds one like and returns the new total.
    async fn like_post(&self, post_id: i32, user: &CurrentUser) -> Result<i32, BlogError>;
}
