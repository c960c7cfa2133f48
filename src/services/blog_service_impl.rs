//! `SeaORM` implementation of the `BlogService` trait.

use crate::db::{Comment, Post, Store};
use crate::services::blog_service::{BlogError, BlogService, NewPost};
use crate::services::session::CurrentUser;
use async_trait::async_trait;
use tracing::info;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_TAGS_LENGTH: usize = 200;
const MAX_COMMENT_LENGTH: usize = 5000;

pub struct SeaOrmBlogService {
    store: Store,
}

impl SeaOrmBlogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    fn validate_post(post: &NewPost) -> Result<(), BlogError> {
        let title = post.title.trim();
        if title.is_empty() {
            return Err(BlogError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(BlogError::Validation(format!(
                "Title must be {MAX_TITLE_LENGTH} characters or less"
            )));
        }
        if post.content.trim().is_empty() {
            return Err(BlogError::Validation("Content is required".to_string()));
        }
        if post
            .tags
            .as_deref()
            .is_some_and(|t| t.chars().count() > MAX_TAGS_LENGTH)
        {
            return Err(BlogError::Validation(format!(
                "Tags must be {MAX_TAGS_LENGTH} characters or less"
            )));
        }
        Ok(())
    }

    fn validate_comment(content: &str) -> Result<(), BlogError> {
        if content.trim().is_empty() {
            return Err(BlogError::Validation("Comment cannot be empty".to_string()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(BlogError::Validation(format!(
                "Comment must be {MAX_COMMENT_LENGTH} characters or less"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlogService for SeaOrmBlogService {
    async fn create_post(&self, author: &CurrentUser, post: NewPost) -> Result<Post, BlogError> {
        Self::validate_post(&post)?;

        let tags = post
            .tags
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let created = self
            .store
            .create_post(author.id, post.title.trim(), &post.content, tags)
            .await?;

        Ok(created)
    }

    async fn list_posts(&self, search: Option<&str>) -> Result<Vec<Post>, BlogError> {
        let search = search.map(str::trim).filter(|q| !q.is_empty());
        Ok(self.store.list_posts(search).await?)
    }

    async fn get_post(&self, id: i32) -> Result<Post, BlogError> {
        self.store
            .get_post(id)
            .await?
            .ok_or(BlogError::post_not_found(id))
    }

    async fn list_comments(&self, post_id: i32) -> Result<Vec<Comment>, BlogError> {
        if !self.store.post_exists(post_id).await? {
            return Err(BlogError::post_not_found(post_id));
        }
        Ok(self.store.list_comments(post_id).await?)
    }

    async fn add_comment(
        &self,
        post_id: i32,
        author: &CurrentUser,
        content: &str,
    ) -> Result<Comment, BlogError> {
        Self::validate_comment(content)?;

        if !self.store.post_exists(post_id).await? {
            return Err(BlogError::post_not_found(post_id));
        }

        let comment = self
            .store
            .add_comment(post_id, author.id, content.trim())
            .await?;
        info!(post_id, user_id = author.id, "Comment added");

        Ok(comment)
    }

    async fn like_post(&self, post_id: i32, user: &CurrentUser) -> Result<i32, BlogError> {
        let likes = self
            .store
            .increment_post_likes(post_id)
            .await?
            .ok_or(BlogError::post_not_found(post_id))?;

        metrics::counter!("post_likes_total").increment(1);
        tracing::debug!(post_id, user_id = user.id, likes, "Post liked");

        Ok(likes)
    }
}
