pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;
pub mod state;

use std::path::Path;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use tracing_subscriber::EnvFilter;

/// Loads the config from an explicit path, or from the default search paths.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}

pub fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Init => cli::cmd_init(),
        Commands::Serve => {
            config.validate()?;
            init_tracing(&config);
            cli::cmd_serve(config).await
        }
        Commands::CreateUser { username, password } => {
            config.validate()?;
            cli::cmd_create_user(&config, &username, &password).await
        }
    }
}
