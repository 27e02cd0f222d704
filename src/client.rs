//! Blocking HTTP client for the tunnelsim API.
//!
//! The dashboard never talks to the store directly; every read and write goes
//! through [`VpnApi`], which the background worker calls off the UI thread.

use crate::model::{ConnectRequest, ConnectionHistory, DisconnectRequest, Server};
use crate::server::error::ErrorResponse;
use reqwest::blocking::{Client, RequestBuilder};
use thiserror::Error;
use url::Url;

/// Client-side API errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
}

/// Operations the dashboard needs from the API.
pub trait VpnApi: Send + Sync {
    fn servers(&self) -> Result<Vec<Server>, ClientError>;
    fn history(&self) -> Result<Vec<ConnectionHistory>, ClientError>;
    fn connect(&self, server_id: i64, ip_address: &str) -> Result<ConnectionHistory, ClientError>;
    fn disconnect(
        &self,
        connection_id: i64,
        data_used: i64,
    ) -> Result<ConnectionHistory, ClientError>;
}

/// [`VpnApi`] over HTTP with `reqwest`.
pub struct HttpApi {
    client: Client,
    base: Url,
    username: String,
}

impl HttpApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, username: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(crate::constants::HTTP_TIMEOUT)
            .user_agent(format!(
                "{}/{}",
                crate::constants::APP_NAME,
                crate::constants::APP_VERSION
            ))
            .build()?;

        Ok(Self {
            client,
            base,
            username: username.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request
            .header(crate::constants::USER_HEADER, &self.username)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        let text = response.text().unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&text, status.canonical_reason()),
        })
    }
}

/// Pulls the `error` field out of an API error body, falling back to the raw
/// text or the status reason.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

impl VpnApi for HttpApi {
    fn servers(&self) -> Result<Vec<Server>, ClientError> {
        self.send(self.client.get(self.endpoint("api/servers")?))
    }

    fn history(&self) -> Result<Vec<ConnectionHistory>, ClientError> {
        self.send(self.client.get(self.endpoint("api/connection-history")?))
    }

    fn connect(&self, server_id: i64, ip_address: &str) -> Result<ConnectionHistory, ClientError> {
        let body = ConnectRequest {
            server_id,
            ip_address: ip_address.to_string(),
        };
        self.send(self.client.post(self.endpoint("api/connect")?).json(&body))
    }

    fn disconnect(
        &self,
        connection_id: i64,
        data_used: i64,
    ) -> Result<ConnectionHistory, ClientError> {
        let body = DisconnectRequest {
            connection_id,
            data_used,
        };
        self.send(self.client.post(self.endpoint("api/disconnect")?).json(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = HttpApi::new("http://127.0.0.1:5000/v1", "alice").unwrap();
        assert_eq!(
            api.endpoint("api/servers").unwrap().as_str(),
            "http://127.0.0.1:5000/v1/api/servers"
        );
    }

    #[test]
    fn test_endpoint_from_root() {
        let api = HttpApi::new("http://localhost:5000", "alice").unwrap();
        assert_eq!(
            api.endpoint("api/connect").unwrap().as_str(),
            "http://localhost:5000/api/connect"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpApi::new("not a url", "alice"),
            Err(ClientError::Url(_))
        ));
    }

    #[test]
    fn test_error_message_prefers_api_body() {
        let body = r#"{"error": "server 9 not found", "status": 404}"#;
        assert_eq!(error_message(body, Some("Not Found")), "server 9 not found");
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(error_message("  ", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("boom", None), "boom");
        assert_eq!(error_message("", None), "request failed");
    }
}
