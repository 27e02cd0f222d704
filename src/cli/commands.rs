//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use tracing::info;

use crate::cli::args::Commands;
use crate::config::Config;
use crate::model::{Server, ServerStatus, User};
use crate::server::ApiServer;
use crate::store::{SqliteStorage, Storage};

/// Handles commands that don't start the dashboard.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn handle_command(command: &Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Serve { bind, database } => {
            let mut config = config.clone();
            if let Some(bind) = bind {
                config.bind.clone_from(bind);
            }
            if let Some(database) = database {
                config.database = Some(database.clone());
            }
            handle_serve(&config)
        }
        Commands::AddUser { username, database } => {
            let storage = open_storage(config, database.as_deref())?;
            let user = add_user(&storage, username)?;
            println!("✅ Created user '{}' (id {})", user.username, user.id);
            Ok(())
        }
        Commands::ServerStatus {
            id,
            status,
            database,
        } => {
            let storage = open_storage(config, database.as_deref())?;
            let server = set_server_status(&storage, *id, *status)?;
            println!("✅ {} is now {}", server.label(), server.status);
            Ok(())
        }
    }
}

fn database_path(config: &Config, database: Option<&Path>) -> Result<PathBuf> {
    match database {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config.database_path()?),
    }
}

fn open_storage(config: &Config, database: Option<&Path>) -> Result<SqliteStorage> {
    let path = database_path(config, database)?;
    SqliteStorage::open(&path).wrap_err_with(|| format!("opening database {}", path.display()))
}

/// Creates `username`.
fn add_user(storage: &dyn Storage, username: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    Ok(storage.create_user(username)?)
}

/// Sets the administrative status of server `id`.
fn set_server_status(storage: &dyn Storage, id: i64, status: ServerStatus) -> Result<Server> {
    // Make sure the catalog exists before addressing a row in it.
    storage.initialize_servers()?;
    storage
        .set_server_status(id, status)?
        .ok_or_else(|| eyre!("server {id} not found"))
}

/// Makes sure the dashboard's default identity exists.
fn ensure_user(storage: &dyn Storage, username: &str) -> Result<()> {
    if storage.get_user_by_username(username)?.is_none() {
        let user = storage.create_user(username)?;
        info!(user = %user.username, id = user.id, "created user");
    }
    Ok(())
}

/// Runs the API server until Ctrl-C.
fn handle_serve(config: &Config) -> Result<()> {
    crate::logging::init_server();

    let bind = config.bind_addr()?;
    let storage = open_storage(config, None)?;
    if storage.initialize_servers()? {
        info!("server catalog seeded");
    }
    ensure_user(&storage, &config.username)?;

    let storage: Arc<dyn Storage> = Arc::new(storage);
    let runtime = tokio::runtime::Runtime::new().wrap_err("starting async runtime")?;
    runtime.block_on(async move {
        ApiServer::new(bind, storage)
            .run(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown requested");
            })
            .await
    })?;

    Ok(())
}
