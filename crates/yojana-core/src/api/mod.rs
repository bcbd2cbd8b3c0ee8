//! HTTP implementations of the service traits against the yojana backend.

pub mod auth;
pub mod documents;
pub mod qa;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::ServiceError;

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(&config.api_base_url(), config.request_timeout())
    }

    /// Same connection pool, authenticated as `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ServiceError> {
        let token = self.token.as_ref().ok_or(ServiceError::Unauthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = check_status(request.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = error_detail(&text);
    tracing::debug!(status = status.as_u16(), body = %body, "backend error");
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Backend errors come as `{"detail": ...}`; fall back to the raw text
fn error_detail(text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_detail_field() {
        assert_eq!(
            error_detail(r#"{"detail":"Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
        assert!(error_detail(r#"{"detail":[{"loc":["body","income"]}]}"#).contains("income"));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = BackendClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/api/ask"), "http://localhost:8000/api/ask");
        assert!(!client.is_authenticated());
        assert!(client.with_token("t").is_authenticated());
    }

    #[test]
    fn test_authorized_requires_token() {
        let client = BackendClient::new("http://localhost:8000", Duration::from_secs(1)).unwrap();
        let err = client.authorized(client.get("/api/profile")).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));
    }
}
