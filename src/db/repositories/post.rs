use crate::db::now_timestamp;
use crate::entities::{posts, prelude::*, users};
use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Repository for post operations
pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_post_model((post, author): (posts::Model, Option<users::Model>)) -> Post {
        Post {
            id: post.id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            likes: post.likes,
            author_id: post.author_id,
            author: author.map(|a| a.username).unwrap_or_default(),
            created_at: post.created_at,
        }
    }

    pub async fn create(
        &self,
        author_id: i32,
        title: &str,
        content: &str,
        tags: Option<&str>,
    ) -> Result<Post> {
        let active_model = posts::ActiveModel {
            title: Set(title.to_string()),
            content: Set(content.to_string()),
            tags: Set(tags.map(str::to_string)),
            likes: Set(0),
            author_id: Set(author_id),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let res = Posts::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert post")?;
        info!("Created post {} by user {}", res.last_insert_id, author_id);

        self.get(res.last_insert_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created post"))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Post>> {
        let row = Posts::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query post")?;

        Ok(row.map(Self::map_post_model))
    }

    pub async fn exists(&self, id: i32) -> Result<bool> {
        let row = Posts::find_by_id(id).one(&self.conn).await?;
        Ok(row.is_some())
    }

    /// Newest first. `search` matches a substring of the title or the content.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Post>> {
        let mut select = Posts::find();

        if let Some(query) = search {
            select = select.filter(
                Condition::any()
                    .add(posts::Column::Title.contains(query))
                    .add(posts::Column::Content.contains(query)),
            );
        }

        let rows = select
            .order_by_desc(posts::Column::CreatedAt)
            .order_by_desc(posts::Column::Id)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to list posts")?;

        Ok(rows.into_iter().map(Self::map_post_model).collect())
    }

    /// Adds one like and returns the new total, or `None` if the post does not exist.
    pub async fn increment_likes(&self, id: i32) -> Result<Option<i32>> {
        let txn = self.conn.begin().await?;

        let result = Posts::update_many()
            .col_expr(posts::Column::Likes, Expr::col(posts::Column::Likes).add(1))
            .filter(posts::Column::Id.eq(id))
            .exec(&txn)
            .await
            .context("Failed to increment likes")?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let likes = Posts::find_by_id(id).one(&txn).await?.map(|p| p.likes);
        txn.commit().await?;

        Ok(likes)
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub likes: i32,
    pub author_id: i32,
    pub author: String,
    pub created_at: String,
}
