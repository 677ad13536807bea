//! Scripted in-memory [`Transport`] for tests.
//!
//! Routes match on exact method + URL. Replies are consumed in order and the last one
//! repeats forever. Unrouted requests fail like a refused connection.
use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{ApiError, ApiRequest, Method, RawResponse, Transport};

#[derive(Debug, Clone)]
pub enum Reply {
    Response(RawResponse),
    Fail(String),
}

impl Reply {
    pub fn json(status: u16, value: Value) -> Self {
        Self::Response(RawResponse {
            status,
            body: value.to_string().into_bytes(),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::Response(RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        })
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self::Response(RawResponse { status, body })
    }

    pub fn status(status: u16) -> Self {
        Self::Response(RawResponse {
            status,
            body: Vec::new(),
        })
    }

    pub fn fail(reason: &str) -> Self {
        Self::Fail(reason.to_string())
    }
}

struct Route {
    method: Method,
    url: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the replies for `method url`. Replaces any earlier script for the same route.
    pub fn on(&self, method: Method, url: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        let replies: VecDeque<Reply> = replies.into_iter().collect();
        assert!(!replies.is_empty(), "a route needs at least one reply");

        let mut routes = self.routes.lock().unwrap();
        routes.retain(|r| !(r.method == method && r.url == url));
        routes.push(Route {
            method,
            url: url.to_string(),
            replies,
        });
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        self.log.lock().unwrap().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes
                .iter_mut()
                .find(|r| r.method == request.method && r.url == request.url);
            match route {
                Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
                Some(route) => route.replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Response(raw)) => Ok(raw),
            Some(Reply::Fail(reason)) => Err(ApiError::Transport {
                url: request.url.clone(),
                reason,
            }),
            None => Err(ApiError::Transport {
                url: request.url.clone(),
                reason: "connection refused (no scripted route)".into(),
            }),
        }
    }
}
