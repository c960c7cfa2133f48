use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, BlogService, SeaOrmAuthService, SeaOrmBlogService, SessionManager,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub blog_service: Arc<dyn BlogService>,

    pub sessions: SessionManager,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), &config.security)?)
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let blog_service = Arc::new(SeaOrmBlogService::new(store.clone()))
            as Arc<dyn BlogService + Send + Sync + 'static>;

        let sessions = SessionManager::new(auth_service.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            blog_service,
            sessions,
        })
    }
}
