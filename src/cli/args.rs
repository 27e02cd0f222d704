//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::model::ServerStatus;

/// tunnelsim - simulated VPN dashboard and API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file (default: ~/.config/tunnelsim/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the tunnelsim API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Username to identify as
    #[arg(long, short, global = true, value_name = "NAME")]
    pub user: Option<String>,

    /// Subcommand to execute; the dashboard runs when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Listen address
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// SQLite database file
        #[arg(long, value_name = "PATH")]
        database: Option<PathBuf>,
    },
    /// Create a user
    AddUser {
        /// Unique username
        username: String,
        /// SQLite database file
        #[arg(long, value_name = "PATH")]
        database: Option<PathBuf>,
    },
    /// Set a server's administrative status
    ServerStatus {
        /// Server id
        id: i64,
        /// available | maintenance
        status: ServerStatus,
        /// SQLite database file
        #[arg(long, value_name = "PATH")]
        database: Option<PathBuf>,
    },
}
