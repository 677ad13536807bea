//! `reqwest`-backed [`Transport`].
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::trace;

use crate::{ApiError, ApiRequest, Method, RawResponse, RequestKind, Transport};

const API_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("ghr-agentd/", env!("CARGO_PKG_VERSION"));

const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_timeout: Duration,
    download_timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_timeout", &self.api_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeouts(DEFAULT_API_TIMEOUT, DEFAULT_DOWNLOAD_TIMEOUT)
    }

    pub fn with_timeouts(api_timeout: Duration, download_timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            api_timeout,
            download_timeout,
        })
    }

    fn headers(kind: RequestKind) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match kind {
            RequestKind::Api => {
                headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
                headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
            }
            RequestKind::Download => {
                headers.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));
            }
        }
        headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let timeout = match request.kind {
            RequestKind::Api => self.api_timeout,
            RequestKind::Download => self.download_timeout,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(Self::headers(request.kind))
            .timeout(timeout);
        if let Some(credential) = &request.bearer {
            builder = builder.bearer_auth(credential.expose());
        }

        trace!(method = %request.method, url = %request.url, "sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&request.url, e))?;

        trace!(url = %request.url, status, len = body.len(), "response received");
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_requests_carry_version_headers() {
        let headers = HttpTransport::headers(RequestKind::Api);
        assert_eq!(headers.get(ACCEPT).unwrap(), API_ACCEPT);
        assert_eq!(headers.get(API_VERSION_HEADER).unwrap(), API_VERSION);
    }

    #[test]
    fn downloads_do_not_send_api_headers() {
        let headers = HttpTransport::headers(RequestKind::Download);
        assert!(headers.get(API_VERSION_HEADER).is_none());
    }

    #[test]
    fn client_builds_with_defaults() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.api_timeout, DEFAULT_API_TIMEOUT);
        assert_eq!(transport.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT);
    }
}
