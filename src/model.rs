//! Shared data model for the catalog, users and connection history.
//!
//! These types cross the wire between the API server and the dashboard, so
//! they serialize with camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative status of a catalog server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Accepting connections.
    #[default]
    Available,
    /// Listed but under maintenance.
    Maintenance,
}

impl ServerStatus {
    /// Lowercase name as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Available => "available",
            ServerStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(ServerStatus::Available),
            "maintenance" => Ok(ServerStatus::Maintenance),
            other => Err(format!("unknown server status '{other}'")),
        }
    }
}

/// A simulated VPN endpoint from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub city: String,
    /// Advertised round-trip time in milliseconds.
    pub ping: i64,
    /// Advertised load in percent.
    pub load: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ServerStatus,
}

impl Server {
    /// Ranking score used for the recommended list; lower is better.
    pub fn score(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (ping, load) = (self.ping as f64, self.load as f64);
        ping * 0.7 + load * 0.3
    }

    /// `"{name}, {country}"`, the label used in notices and headers.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Returns up to `limit` available servers ordered by [`Server::score`].
pub fn recommended(servers: &[Server], limit: usize) -> Vec<&Server> {
    let mut available: Vec<&Server> = servers
        .iter()
        .filter(|s| s.status == ServerStatus::Available)
        .collect();
    available.sort_by(|a, b| a.score().total_cmp(&b.score()));
    available.truncate(limit);
    available
}

/// A catalog row before it has been assigned an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewServer {
    pub name: &'static str,
    pub country: &'static str,
    pub country_code: &'static str,
    pub city: &'static str,
    pub ping: i64,
    pub load: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ServerStatus,
}

/// A dashboard user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// One persisted connect/disconnect session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHistory {
    pub id: i64,
    pub user_id: i64,
    pub server_id: i64,
    pub ip_address: String,
    pub connected_at: DateTime<Utc>,
    pub disconnected_at: Option<DateTime<Utc>>,
    /// Session length in whole seconds.
    pub duration: Option<i64>,
    /// Bytes transferred during the session.
    pub data_used: Option<i64>,
}

impl ConnectionHistory {
    /// Whether the session has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.disconnected_at.is_none()
    }

    /// Seconds between `connected_at` and `at`, never negative.
    pub fn duration_until(&self, at: DateTime<Utc>) -> i64 {
        (at - self.connected_at).num_seconds().max(0)
    }
}

/// Fields needed to open a history row.
#[derive(Clone, Debug, PartialEq)]
pub struct NewConnection {
    pub user_id: i64,
    pub server_id: i64,
    pub ip_address: String,
    pub connected_at: DateTime<Utc>,
}

/// Body of `POST /api/connect`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub server_id: i64,
    pub ip_address: String,
}

/// Body of `POST /api/disconnect`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub connection_id: i64,
    pub data_used: i64,
}

#[cfg(test)]
pub(crate) fn sample_server(id: i64, ping: i64, load: i64, status: ServerStatus) -> Server {
    Server {
        id,
        name: format!("Node {id}"),
        country: "Testland".to_string(),
        country_code: "tl".to_string(),
        city: format!("Node {id}"),
        ping,
        load,
        latitude: 0.0,
        longitude: 0.0,
        status,
    }
}
