use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthError, AuthService, SeaOrmAuthService};

pub async fn cmd_create_user(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let auth = SeaOrmAuthService::new(store, &config.security)?;

    match auth.register(username, password).await {
        Ok(user) => {
            println!("✓ Created user '{}' (id {})", user.username, user.id);
            Ok(())
        }
        Err(AuthError::DuplicateUsername(name)) => {
            anyhow::bail!("User '{name}' already exists")
        }
        Err(e) => Err(e.into()),
    }
}
