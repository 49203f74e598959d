//! HTTP plumbing shared by the service clients.
//!
//! One `reqwest::Client` (and so one connection pool) is built per process and cloned
//! into every service. Each request reads its response body to the end, whatever the
//! status, so the connection goes back to the pool before the next attempt.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use terra_core::CredentialProvider;

use crate::error::ApiError;
use crate::types::ErrorReport;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the process-wide HTTP client.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Authenticated JSON client for one service.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// # Arguments
    ///
    /// * `http` - The shared HTTP client
    /// * `base_url` - Root URL of the service (e.g. "https://sam.dsde-prod.broadinstitute.org")
    /// * `credentials` - Source of the bearer token sent with every request
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn headers(&self) -> Result<HeaderMap, ApiError> {
        let token = self.credentials.access_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ApiError::Credentials(terra_core::CredentialError::Missing(
                "access token contains invalid header characters".to_string(),
            ))
        })?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    /// Sends one request and returns the response body of a successful response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .headers(self.headers().await?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("API response ({}): {}", status, body);

        if status.is_success() {
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.credentials.mark_stale();
        }
        error!(
            "Service error status code: {}, response body: {}",
            status.as_u16(),
            body
        );
        Err(ApiError::api(status.as_u16(), error_message(status, &body)))
    }

    fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            ApiError::Json(e)
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.send::<()>(Method::GET, path, None).await?;
        Self::parse(&body)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::POST, path, Some(body)).await?;
        Self::parse(&body)
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.send::<()>(Method::POST, path, None).await?;
        Self::parse(&body)
    }

    /// POST whose response body is not needed.
    pub async fn post_no_content<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, path, Some(body)).await.map(drop)
    }

    pub async fn put_no_content(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::PUT, path, None).await.map(drop)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, None).await.map(drop)
    }
}

/// Human-readable message of an error response: the error report's message if the body
/// is one, otherwise the status and raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorReport>(body) {
        Ok(report) if !report.message.is_empty() => report.message,
        _ if body.trim().is_empty() => status.to_string(),
        _ => format!("Request failed: {}", body),
    }
}

/// Percent-encodes one path segment (emails, group names).
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_report() {
        let body = r#"{"message":"You must request an invite from an admin","statusCode":400}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "You must request an invite from an admin"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body_and_status() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "Request failed: upstream down"
        );
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "503 Service Unavailable"
        );
    }

    #[test]
    fn test_segment_encodes_email() {
        assert_eq!(segment("jane+test@example.com"), "jane%2Btest%40example.com");
    }
}
