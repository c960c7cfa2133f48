//! Command-line interface for OpenBlog
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OpenBlog - a minimal blogging server
#[derive(Parser)]
#[command(name = "openblog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    Init,

    /// Register a user from the command line
    CreateUser {
        username: String,
        /// Password for the new user
        #[arg(long, env = "OPENBLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

pub use commands::*;
