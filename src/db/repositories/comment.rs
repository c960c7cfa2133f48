use crate::db::now_timestamp;
use crate::entities::{comments, prelude::*, users};
use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// Repository for comment operations
pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_comment_model((comment, author): (comments::Model, Option<users::Model>)) -> Comment {
        Comment {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author: author.map(|a| a.username).unwrap_or_default(),
            content: comment.content,
            created_at: comment.created_at,
        }
    }

    pub async fn create(&self, post_id: i32, author_id: i32, content: &str) -> Result<Comment> {
        let active_model = comments::ActiveModel {
            content: Set(content.to_string()),
            author_id: Set(author_id),
            post_id: Set(post_id),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let res = Comments::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert comment")?;

        let row = Comments::find_by_id(res.last_insert_id)
            .find_also_related(Users)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created comment"))?;

        Ok(Self::map_comment_model(row))
    }

    /// Oldest first, so threads read top to bottom.
    pub async fn list_for_post(&self, post_id: i32) -> Result<Vec<Comment>> {
        let rows = Comments::find()
            .filter(comments::Column::PostId.eq(post_id))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::Id)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to list comments")?;

        Ok(rows.into_iter().map(Self::map_comment_model).collect())
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub author: String,
    pub content: String,
    pub created_at: String,
}
