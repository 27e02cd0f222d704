//! Relational store for users, the server catalog and connection history.
//!
//! [`Storage`] is the port the HTTP API is written against; [`SqliteStorage`]
//! is its only adapter. All timestamps are stored as RFC 3339 text.

mod migration;
mod seed;

use seed::SEED_SERVERS;

use crate::model::{ConnectionHistory, NewConnection, Server, ServerStatus, User};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("user {user_id} already has open connection {connection_id}")]
    OpenConnection { user_id: i64, connection_id: i64 },

    #[error("connection {0} is already closed")]
    ConnectionClosed(i64),

    #[error("username '{0}' is taken")]
    DuplicateUser(String),

    #[error("database lock poisoned")]
    Lock,
}

/// Persistence operations needed by the API.
pub trait Storage: Send + Sync {
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    fn create_user(&self, username: &str) -> Result<User, StoreError>;

    /// Returns the catalog, seeding it first when it is empty.
    fn get_all_servers(&self) -> Result<Vec<Server>, StoreError>;
    fn get_server(&self, id: i64) -> Result<Option<Server>, StoreError>;
    /// Seeds the catalog when it is empty. Returns whether rows were added.
    fn initialize_servers(&self) -> Result<bool, StoreError>;
    fn set_server_status(&self, id: i64, status: ServerStatus)
        -> Result<Option<Server>, StoreError>;

    /// History for one user, newest first.
    fn get_connection_history(&self, user_id: i64) -> Result<Vec<ConnectionHistory>, StoreError>;
    fn get_connection(&self, id: i64) -> Result<Option<ConnectionHistory>, StoreError>;
    fn open_connection(&self, user_id: i64) -> Result<Option<ConnectionHistory>, StoreError>;
    /// Opens a history row. Fails with [`StoreError::OpenConnection`] if the
    /// user already has one.
    fn add_connection_history(&self, new: &NewConnection)
        -> Result<ConnectionHistory, StoreError>;
    /// Completes an open row. `None` if the row does not exist; fails with
    /// [`StoreError::ConnectionClosed`] if it was already completed.
    fn update_connection_history(
        &self,
        id: i64,
        disconnected_at: DateTime<Utc>,
        duration: i64,
        data_used: i64,
    ) -> Result<Option<ConnectionHistory>, StoreError>;
}

/// SQLite-backed [`Storage`].
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

const SERVER_COLUMNS: &str =
    "id, name, country, country_code, city, ping, load, latitude, longitude, status";
const HISTORY_COLUMNS: &str =
    "id, user_id, server_id, ip_address, connected_at, disconnected_at, duration, data_used";

impl SqliteStorage {
    /// Opens (or creates) a file-backed database and runs migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            ",
        )?;
        migration::run_migrations(&conn)?;

        info!("sqlite store ready at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migration::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to chronological order.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

struct RawUser {
    id: i64,
    username: String,
    created_at: String,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    fn into_model(self) -> Result<User, StoreError> {
        Ok(User {
            id: self.id,
            username: self.username,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

struct RawHistory {
    id: i64,
    user_id: i64,
    server_id: i64,
    ip_address: String,
    connected_at: String,
    disconnected_at: Option<String>,
    duration: Option<i64>,
    data_used: Option<i64>,
}

impl RawHistory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            server_id: row.get(2)?,
            ip_address: row.get(3)?,
            connected_at: row.get(4)?,
            disconnected_at: row.get(5)?,
            duration: row.get(6)?,
            data_used: row.get(7)?,
        })
    }

    fn into_model(self) -> Result<ConnectionHistory, StoreError> {
        Ok(ConnectionHistory {
            id: self.id,
            user_id: self.user_id,
            server_id: self.server_id,
            ip_address: self.ip_address,
            connected_at: parse_time(&self.connected_at)?,
            disconnected_at: self.disconnected_at.as_deref().map(parse_time).transpose()?,
            duration: self.duration,
            data_used: self.data_used,
        })
    }
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<(Server, String)> {
    let status: String = row.get(9)?;
    Ok((
        Server {
            id: row.get(0)?,
            name: row.get(1)?,
            country: row.get(2)?,
            country_code: row.get(3)?,
            city: row.get(4)?,
            ping: row.get(5)?,
            load: row.get(6)?,
            latitude: row.get(7)?,
            longitude: row.get(8)?,
            status: ServerStatus::Available,
        },
        status,
    ))
}

fn finish_server((mut server, status): (Server, String)) -> Result<Server, StoreError> {
    server.status = status.parse().map_err(StoreError::Corrupt)?;
    Ok(server)
}

fn select_servers(conn: &Connection) -> Result<Vec<Server>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {SERVER_COLUMNS} FROM servers ORDER BY id"))?;
    let rows = stmt
        .query_map([], server_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(finish_server).collect()
}

fn select_server(conn: &Connection, id: i64) -> Result<Option<Server>, StoreError> {
    conn.query_row(
        &format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?1"),
        [id],
        server_from_row,
    )
    .optional()?
    .map(finish_server)
    .transpose()
}

fn insert_seed(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "INSERT INTO servers (name, country, country_code, city, ping, load, latitude, longitude, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for s in &SEED_SERVERS {
        stmt.execute(params![
            s.name,
            s.country,
            s.country_code,
            s.city,
            s.ping,
            s.load,
            s.latitude,
            s.longitude,
            s.status.as_str(),
        ])?;
    }
    info!("seeded {} catalog servers", SEED_SERVERS.len());
    Ok(())
}

/// Seeds the catalog if it has no rows, in one transaction.
fn seed_if_empty(conn: &mut Connection) -> Result<bool, StoreError> {
    let tx = conn.transaction()?;
    let count: i64 = tx.query_row("SELECT COUNT(*) FROM servers", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(false);
    }
    insert_seed(&tx)?;
    tx.commit()?;
    Ok(true)
}

fn select_user(conn: &Connection, username: &str) -> Result<Option<User>, StoreError> {
    conn.query_row(
        "SELECT id, username, created_at FROM users WHERE username = ?1",
        [username],
        RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_model)
    .transpose()
}

fn select_connection(conn: &Connection, id: i64) -> Result<Option<ConnectionHistory>, StoreError> {
    conn.query_row(
        &format!("SELECT {HISTORY_COLUMNS} FROM connection_history WHERE id = ?1"),
        [id],
        RawHistory::from_row,
    )
    .optional()?
    .map(RawHistory::into_model)
    .transpose()
}

fn select_open(conn: &Connection, user_id: i64) -> Result<Option<ConnectionHistory>, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {HISTORY_COLUMNS} FROM connection_history
             WHERE user_id = ?1 AND disconnected_at IS NULL"
        ),
        [user_id],
        RawHistory::from_row,
    )
    .optional()?
    .map(RawHistory::into_model)
    .transpose()
}

impl Storage for SqliteStorage {
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        select_user(&conn, username)
    }

    fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.lock()?;
        if select_user(&conn, username)?.is_some() {
            return Err(StoreError::DuplicateUser(username.to_string()));
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, format_time(created_at)],
        )?;
        let id = conn.last_insert_rowid();
        info!(user_id = id, "created user '{username}'");

        Ok(User {
            id,
            username: username.to_string(),
            created_at,
        })
    }

    fn get_all_servers(&self) -> Result<Vec<Server>, StoreError> {
        // Check and seed under one lock so concurrent first requests seed once.
        let mut conn = self.lock()?;
        seed_if_empty(&mut conn)?;
        select_servers(&conn)
    }

    fn get_server(&self, id: i64) -> Result<Option<Server>, StoreError> {
        let conn = self.lock()?;
        select_server(&conn, id)
    }

    fn initialize_servers(&self) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        seed_if_empty(&mut conn)
    }

    fn set_server_status(
        &self,
        id: i64,
        status: ServerStatus,
    ) -> Result<Option<Server>, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE servers SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        info!(server_id = id, "server status set to {status}");
        select_server(&conn, id)
    }

    fn get_connection_history(&self, user_id: i64) -> Result<Vec<ConnectionHistory>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM connection_history
             WHERE user_id = ?1
             ORDER BY connected_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], RawHistory::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawHistory::into_model).collect()
    }

    fn get_connection(&self, id: i64) -> Result<Option<ConnectionHistory>, StoreError> {
        let conn = self.lock()?;
        select_connection(&conn, id)
    }

    fn open_connection(&self, user_id: i64) -> Result<Option<ConnectionHistory>, StoreError> {
        let conn = self.lock()?;
        select_open(&conn, user_id)
    }

    fn add_connection_history(
        &self,
        new: &NewConnection,
    ) -> Result<ConnectionHistory, StoreError> {
        let conn = self.lock()?;
        if let Some(open) = select_open(&conn, new.user_id)? {
            warn!(
                user_id = new.user_id,
                connection_id = open.id,
                "rejecting second open connection"
            );
            return Err(StoreError::OpenConnection {
                user_id: new.user_id,
                connection_id: open.id,
            });
        }

        conn.execute(
            "INSERT INTO connection_history (user_id, server_id, ip_address, connected_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.user_id,
                new.server_id,
                new.ip_address,
                format_time(new.connected_at)
            ],
        )?;
        let id = conn.last_insert_rowid();

        select_connection(&conn, id)?
            .ok_or_else(|| StoreError::Corrupt(format!("connection {id} vanished after insert")))
    }

    fn update_connection_history(
        &self,
        id: i64,
        disconnected_at: DateTime<Utc>,
        duration: i64,
        data_used: i64,
    ) -> Result<Option<ConnectionHistory>, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE connection_history
             SET disconnected_at = ?1, duration = ?2, data_used = ?3
             WHERE id = ?4 AND disconnected_at IS NULL",
            params![format_time(disconnected_at), duration, data_used, id],
        )?;
        if changed == 0 {
            return match select_connection(&conn, id)? {
                Some(_) => Err(StoreError::ConnectionClosed(id)),
                None => Ok(None),
            };
        }
        select_connection(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with_user() -> (SqliteStorage, User) {
        let store = SqliteStorage::open_in_memory().unwrap();
        store.get_all_servers().unwrap();
        let user = store.create_user("alice").unwrap();
        (store, user)
    }

    fn new_connection(user_id: i64, connected_at: DateTime<Utc>) -> NewConnection {
        NewConnection {
            user_id,
            server_id: 1,
            ip_address: "192.168.10.20".to_string(),
            connected_at,
        }
    }

    #[test]
    fn test_empty_catalog_is_seeded_once() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let first = store.get_all_servers().unwrap();
        assert_eq!(first.len(), 9);
        let second = store.get_all_servers().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_initialize_servers_is_idempotent() {
        let store = SqliteStorage::open_in_memory().unwrap();
        assert!(store.initialize_servers().unwrap());
        assert!(!store.initialize_servers().unwrap());
        assert_eq!(store.get_all_servers().unwrap().len(), SEED_SERVERS.len());
        assert!(!store.initialize_servers().unwrap());
    }

    #[test]
    fn test_seeded_catalog_matches_seed_table() {
        let store = SqliteStorage::open_in_memory().unwrap();
        let servers = store.get_all_servers().unwrap();
        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        let expected: Vec<&str> = SEED_SERVERS.iter().map(|s| s.name).collect();
        assert_eq!(names, expected);
        let sydney = servers.iter().find(|s| s.name == "Sydney").unwrap();
        assert_eq!(sydney.status, ServerStatus::Maintenance);
    }

    #[test]
    fn test_get_server_unknown_id() {
        let (store, _) = store_with_user();
        assert!(store.get_server(999).unwrap().is_none());
        assert_eq!(store.get_server(1).unwrap().unwrap().name, "New York");
    }

    #[test]
    fn test_set_server_status() {
        let (store, _) = store_with_user();
        let updated = store
            .set_server_status(2, ServerStatus::Maintenance)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ServerStatus::Maintenance);
        assert!(store
            .set_server_status(404, ServerStatus::Available)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_user_rejects_duplicates() {
        let (store, user) = store_with_user();
        assert!(matches!(
            store.create_user("alice"),
            Err(StoreError::DuplicateUser(_))
        ));
        let found = store.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.created_at, user.created_at);
        assert!(store.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_add_connection_opens_row() {
        let (store, user) = store_with_user();
        let row = store
            .add_connection_history(&new_connection(user.id, Utc::now()))
            .unwrap();
        assert!(row.is_open());
        assert!(row.duration.is_none());
        assert!(row.data_used.is_none());
        assert_eq!(store.open_connection(user.id).unwrap().unwrap().id, row.id);
    }

    #[test]
    fn test_second_open_connection_is_rejected() {
        let (store, user) = store_with_user();
        let first = store
            .add_connection_history(&new_connection(user.id, Utc::now()))
            .unwrap();
        let err = store
            .add_connection_history(&new_connection(user.id, Utc::now()))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::OpenConnection { connection_id, .. } if connection_id == first.id
        ));
    }

    #[test]
    fn test_update_closes_row_and_allows_reconnect() {
        let (store, user) = store_with_user();
        let connected_at = Utc::now() - Duration::seconds(42);
        let row = store
            .add_connection_history(&new_connection(user.id, connected_at))
            .unwrap();
        let disconnected_at = Utc::now();
        let closed = store
            .update_connection_history(
                row.id,
                disconnected_at,
                row.duration_until(disconnected_at),
                2048,
            )
            .unwrap()
            .unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.duration, Some(42));
        assert_eq!(closed.data_used, Some(2048));
        assert!(closed.disconnected_at.unwrap() >= closed.connected_at);
        assert!(store.open_connection(user.id).unwrap().is_none());

        store
            .add_connection_history(&new_connection(user.id, Utc::now()))
            .unwrap();
    }

    #[test]
    fn test_completed_row_is_never_rewritten() {
        let (store, user) = store_with_user();
        let row = store
            .add_connection_history(&new_connection(user.id, Utc::now()))
            .unwrap();
        let closed = store
            .update_connection_history(row.id, Utc::now(), 10, 1)
            .unwrap()
            .unwrap();

        let err = store
            .update_connection_history(row.id, Utc::now() + Duration::seconds(80), 90, 999)
            .unwrap_err();
        assert!(matches!(err, StoreError::ConnectionClosed(id) if id == row.id));
        let stored = store.get_connection(row.id).unwrap().unwrap();
        assert_eq!(stored, closed);
        assert_eq!(stored.duration, Some(10));
        assert_eq!(stored.data_used, Some(1));
    }

    #[test]
    fn test_update_unknown_row() {
        let (store, _) = store_with_user();
        assert!(store
            .update_connection_history(77, Utc::now(), 1, 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_history_is_per_user_and_newest_first() {
        let (store, alice) = store_with_user();
        let bob = store.create_user("bob").unwrap();
        let base = Utc::now() - Duration::hours(2);

        for offset in [0, 30, 60] {
            let at = base + Duration::minutes(offset);
            let row = store
                .add_connection_history(&new_connection(alice.id, at))
                .unwrap();
            store
                .update_connection_history(row.id, at + Duration::minutes(5), 300, 10)
                .unwrap();
        }
        store
            .add_connection_history(&new_connection(bob.id, base))
            .unwrap();

        let history = store.get_connection_history(alice.id).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|h| h.user_id == alice.id));
        assert!(history
            .windows(2)
            .all(|w| w[0].connected_at >= w[1].connected_at));
        assert_eq!(store.get_connection_history(bob.id).unwrap().len(), 1);
    }
}
