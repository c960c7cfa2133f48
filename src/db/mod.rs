use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::comment::Comment;
pub use repositories::post::Post;
pub use repositories::user::User;

/// Timestamps are stored as fixed-width RFC 3339 strings so that
/// lexicographic order matches chronological order.
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // A shared in-memory database lives only as long as its connections,
        // and SQLite shared-cache mode locks whole tables between connections.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<User>> {
        self.user_repo().create(username, password_hash).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_password_hash(&self, id: i32) -> Result<Option<String>> {
        self.user_repo().get_password_hash(id).await
    }

    pub async fn create_post(
        &self,
        author_id: i32,
        title: &str,
        content: &str,
        tags: Option<&str>,
    ) -> Result<Post> {
        self.post_repo()
            .create(author_id, title, content, tags)
            .await
    }

    pub async fn get_post(&self, id: i32) -> Result<Option<Post>> {
        self.post_repo().get(id).await
    }

    pub async fn post_exists(&self, id: i32) -> Result<bool> {
        self.post_repo().exists(id).await
    }

    pub async fn list_posts(&self, search: Option<&str>) -> Result<Vec<Post>> {
        self.post_repo().list(search).await
    }

    pub async fn increment_post_likes(&self, id: i32) -> Result<Option<i32>> {
        self.post_repo().increment_likes(id).await
    }

    pub async fn add_comment(&self, post_id: i32, author_id: i32, content: &str) -> Result<Comment> {
        self.comment_repo().create(post_id, author_id, content).await
    }

    pub async fn list_comments(&self, post_id: i32) -> Result<Vec<Comment>> {
        self.comment_repo().list_for_post(post_id).await
    }
}
