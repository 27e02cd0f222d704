//! Request handlers for the catalog and connection-history endpoints.

use std::net::Ipv4Addr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::constants::USER_HEADER;
use crate::model::{
    ConnectRequest, ConnectionHistory, DisconnectRequest, NewConnection, Server, ServerStatus,
    User,
};

/// The user named by the request's identity header.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let username = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))?;

        state
            .storage
            .get_user_by_username(username)?
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized(format!("unknown user '{username}'")))
    }
}

/// GET /api/servers
pub async fn list_servers(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Server>>, ApiError> {
    Ok(Json(state.storage.get_all_servers()?))
}

/// GET /api/connection-history
pub async fn connection_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ConnectionHistory>>, ApiError> {
    Ok(Json(state.storage.get_connection_history(user.id)?))
}

/// POST /api/connect
pub async fn connect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConnectionHistory>), ApiError> {
    let Json(body) = body?;
    let ip: Ipv4Addr = body
        .ip_address
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid IPv4 address '{}'", body.ip_address)))?;

    let server = state
        .storage
        .get_server(body.server_id)?
        .ok_or_else(|| ApiError::NotFound(format!("server {} not found", body.server_id)))?;

    // Connecting to a server under maintenance is allowed; see DESIGN.md.
    if server.status == ServerStatus::Maintenance {
        warn!(server_id = server.id, "connect to server under maintenance");
    }

    let row = state.storage.add_connection_history(&NewConnection {
        user_id: user.id,
        server_id: server.id,
        ip_address: ip.to_string(),
        connected_at: Utc::now(),
    })?;

    info!(
        user = %user.username,
        connection_id = row.id,
        "connected to {} as {ip}",
        server.label()
    );

    Ok((StatusCode::CREATED, Json(row)))
}

/// POST /api/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<DisconnectRequest>, JsonRejection>,
) -> Result<Json<ConnectionHistory>, ApiError> {
    let Json(body) = body?;
    if body.data_used < 0 {
        return Err(ApiError::BadRequest("dataUsed must not be negative".into()));
    }

    let not_found = || ApiError::NotFound(format!("connection {} not found", body.connection_id));

    // Rows owned by someone else are reported as missing.
    let row = state
        .storage
        .get_connection(body.connection_id)?
        .filter(|row| row.user_id == user.id)
        .ok_or_else(not_found)?;

    if !row.is_open() {
        return Err(ApiError::Conflict(format!(
            "connection {} is already closed",
            row.id
        )));
    }

    let disconnected_at = Utc::now();
    let duration = row.duration_until(disconnected_at);
    let updated = state
        .storage
        .update_connection_history(row.id, disconnected_at, duration, body.data_used)?
        .ok_or_else(not_found)?;

    info!(
        user = %user.username,
        connection_id = updated.id,
        duration,
        data_used = body.data_used,
        "disconnected"
    );

    Ok(Json(updated))
}
