//! Resilient API client.
//!
//! Every call runs up to `policy.attempts` times with the policy's deterministic pauses in
//! between. An attempt fails when:
//! - the transport errors (connect, TLS, timeout, body read);
//! - for [`ApiClient::json`], the body is not valid JSON;
//! - for [`ApiClient::status`] and [`ApiClient::download`], the status is outside `200..300`.
//!
//! ## Retry boundary
//!
//! [`ApiClient::json`] judges *syntax only*. A well-formed error document such as
//! `{"message": "Bad credentials"}` ends the loop on the first attempt and is handed back
//! as-is; callers decide whether it is fatal. Authentication failures therefore surface
//! immediately instead of being retried as if the network were flaky.
//!
//! No call ever returns an error: after the last attempt the last observation is returned.
use std::{sync::Arc, time::Duration};

use ghr_model::{ApiMessage, Credential, RetryPolicy};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ApiRequest, Method, RawResponse, Transport};

/// Longest body excerpt included in diagnostics.
const BODY_EXCERPT_LEN: usize = 512;

/// Last observation of a JSON call.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    /// `None` when the transport never produced a response.
    pub status: Option<u16>,
    /// Raw body, or the transport error text when there was no response.
    pub body: String,
    /// Parsed body when it was valid JSON.
    pub json: Option<Value>,
}

impl ApiResponse {
    pub fn is_valid(&self) -> bool {
        self.json.is_some()
    }

    /// Deserialize the parsed body into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Option<T> {
        self.json
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The control plane's `message` field, if the body is an error document.
    pub fn message(&self) -> Option<String> {
        self.parse::<ApiMessage>().map(|m| m.message)
    }

    /// Short diagnostic line: status plus a truncated body.
    pub fn describe(&self) -> String {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".into());
        let mut excerpt: String = self.body.chars().take(BODY_EXCERPT_LEN).collect();
        if self.body.chars().count() > BODY_EXCERPT_LEN {
            excerpt.push_str("...");
        }
        format!("status={status} body={excerpt}")
    }
}

enum Verdict<R> {
    Accept(R),
    Reject { last: R, reason: String },
}

/// Retrying wrapper around a [`Transport`].
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("policy", &self.policy)
            .finish()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call expecting a JSON body.
    pub async fn json(&self, method: Method, url: &str, credential: Option<&Credential>) -> ApiResponse {
        let request = ApiRequest::api(method, url, credential);
        self.retrying(&request, |result| match result {
            Ok(raw) => {
                let body = String::from_utf8_lossy(&raw.body).into_owned();
                match serde_json::from_slice::<Value>(&raw.body) {
                    Ok(json) => Verdict::Accept(ApiResponse {
                        status: Some(raw.status),
                        body,
                        json: Some(json),
                    }),
                    Err(e) => Verdict::Reject {
                        reason: format!("status {} with non-JSON body: {e}", raw.status),
                        last: ApiResponse {
                            status: Some(raw.status),
                            body,
                            json: None,
                        },
                    },
                }
            }
            Err(e) => Verdict::Reject {
                reason: e.to_string(),
                last: ApiResponse {
                    status: None,
                    body: e.to_string(),
                    json: None,
                },
            },
        })
        .await
    }

    /// Call whose body is irrelevant; returns the last status seen.
    pub async fn status(&self, method: Method, url: &str, credential: Option<&Credential>) -> Option<u16> {
        let request = ApiRequest::api(method, url, credential);
        self.retrying(&request, |result| match result {
            Ok(raw) if raw.is_success() => Verdict::Accept(Some(raw.status)),
            Ok(raw) => Verdict::Reject {
                reason: format!("unexpected status {}", raw.status),
                last: Some(raw.status),
            },
            Err(e) => Verdict::Reject {
                reason: e.to_string(),
                last: None,
            },
        })
        .await
    }

    /// Fetch a binary asset; `None` once every attempt has failed.
    pub async fn download(&self, url: &str) -> Option<Vec<u8>> {
        let request = ApiRequest::download(url);
        self.retrying(&request, |result| match result {
            Ok(RawResponse { status, body }) if (200..300).contains(&status) => {
                Verdict::Accept(Some(body))
            }
            Ok(raw) => Verdict::Reject {
                reason: format!("unexpected status {}", raw.status),
                last: None,
            },
            Err(e) => Verdict::Reject {
                reason: e.to_string(),
                last: None,
            },
        })
        .await
    }

    async fn retrying<R>(
        &self,
        request: &ApiRequest,
        judge: impl Fn(Result<RawResponse, crate::ApiError>) -> Verdict<R>,
    ) -> R {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = judge(self.transport.send(request).await);
            match outcome {
                Verdict::Accept(value) => {
                    if attempt > 1 {
                        debug!(method = %request.method, url = %request.url, attempt, "request succeeded after retry");
                    }
                    return value;
                }
                Verdict::Reject { last, reason } if attempt >= attempts => {
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempts,
                        %reason,
                        "request attempts exhausted"
                    );
                    return last;
                }
                Verdict::Reject { reason, .. } => {
                    let delay: Duration = self.policy.delay_after(attempt);
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_truncates_long_bodies() {
        let resp = ApiResponse {
            status: Some(500),
            body: "x".repeat(BODY_EXCERPT_LEN + 10),
            json: None,
        };
        let line = resp.describe();
        assert!(line.starts_with("status=500 body=xxx"));
        assert!(line.ends_with("..."));
    }

    #[test]
    fn message_is_extracted_from_error_documents() {
        let resp = ApiResponse {
            status: Some(401),
            body: String::new(),
            json: Some(serde_json::json!({"message": "Bad credentials"})),
        };
        assert!(resp.is_valid());
        assert_eq!(resp.message().as_deref(), Some("Bad credentials"));
    }

    #[test]
    fn transport_only_failure_has_no_status() {
        let resp = ApiResponse::default();
        assert!(!resp.is_valid());
        assert_eq!(resp.describe(), "status=none body=");
    }
}
