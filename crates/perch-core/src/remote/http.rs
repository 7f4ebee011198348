//! HTTP implementation of the remote sync service

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{PushOutcome, RemoteRow, RemoteSyncService};
use crate::error::{Error, Result};
use crate::models::EntityKind;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach the remote store
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    base_url: String,
    auth_token: String,
}

impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteEndpoint")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl RemoteEndpoint {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let auth_token = auth_token.into().trim().to_string();
        if auth_token.is_empty() {
            return Err(Error::Validation("auth token must not be empty".into()));
        }
        Ok(Self {
            base_url,
            auth_token,
        })
    }
}

/// Remote sync client over HTTPS
#[derive(Clone)]
pub struct HttpRemote {
    endpoint: RemoteEndpoint,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(endpoint: RemoteEndpoint) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// A single remote call exceeding `timeout` is classified as transient
    pub fn with_timeout(endpoint: RemoteEndpoint, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    fn row_url(&self, kind: EntityKind, id: &str) -> String {
        format!("{}/v1/sync/{}/{id}", self.endpoint.base_url, kind.table())
    }

    fn kind_url(&self, kind: EntityKind) -> String {
        format!("{}/v1/sync/{}", self.endpoint.base_url, kind.table())
    }

    async fn read_push_outcome(response: reqwest::Response) -> Result<PushOutcome> {
        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Applied);
        }
        if status == StatusCode::CONFLICT {
            let current = response.json::<RemoteRow>().await.map_err(|error| {
                Error::Remote(format!("conflict response missing remote row: {error}"))
            })?;
            return Ok(PushOutcome::Conflict(current));
        }
        Err(Self::status_error(status, &response.text().await.unwrap_or_default()))
    }

    fn status_error(status: StatusCode, body: &str) -> Error {
        let message = parse_api_error(status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::Validation(message)
            }
            _ => Error::Remote(message),
        }
    }
}

impl RemoteSyncService for HttpRemote {
    async fn upsert(
        &self,
        kind: EntityKind,
        row: &RemoteRow,
        expected_version: i64,
    ) -> Result<PushOutcome> {
        let response = self
            .client
            .put(self.row_url(kind, &row.id))
            .bearer_auth(&self.endpoint.auth_token)
            .query(&[("expected_version", expected_version)])
            .json(row)
            .send()
            .await?;
        Self::read_push_outcome(response).await
    }

    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        expected_version: i64,
    ) -> Result<PushOutcome> {
        let response = self
            .client
            .delete(self.row_url(kind, id))
            .bearer_auth(&self.endpoint.auth_token)
            .query(&[("expected_version", expected_version)])
            .send()
            .await?;
        Self::read_push_outcome(response).await
    }

    async fn fetch_updated_since(
        &self,
        kind: EntityKind,
        since: Option<i64>,
    ) -> Result<Vec<RemoteRow>> {
        let mut request = self
            .client
            .get(self.kind_url(kind))
            .bearer_auth(&self.endpoint.auth_token);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(
                status,
                &response.text().await.unwrap_or_default(),
            ));
        }
        Ok(response.json::<Vec<RemoteRow>>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("remote base URL must not be empty".into()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(Error::Validation(
            "remote base URL must include http:// or https://".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url("https://api.example.com/".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn endpoint_debug_redacts_token() {
        let endpoint = RemoteEndpoint::new("https://api.example.com", "secret").unwrap();
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn auth_statuses_map_to_authentication_errors() {
        let error = HttpRemote::status_error(StatusCode::UNAUTHORIZED, r#"{"error":"expired"}"#);
        assert!(matches!(error, Error::Authentication(_)));

        let error = HttpRemote::status_error(StatusCode::UNPROCESSABLE_ENTITY, "bad payload");
        assert!(matches!(error, Error::Validation(_)));

        let error = HttpRemote::status_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(error, Error::Remote(_)));
    }
}
