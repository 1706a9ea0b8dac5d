// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable marketplace stand-in for tests.
//!
//! Replies are queued per path; the last queued reply for a path repeats.
//! Every request is recorded with its cookie header and body.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub set_cookies: Vec<String>,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into(), set_cookies: vec![] }
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// Append a raw `Set-Cookie` header value.
    pub fn cookie(mut self, header: impl Into<String>) -> Self {
        self.set_cookies.push(header.into());
        self
    }
}

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// Whether the cookie header carried `name=value`.
    pub fn has_cookie(&self, name: &str, value: &str) -> bool {
        let wanted = format!("{name}={value}");
        self.cookie.as_deref().is_some_and(|c| c.split("; ").any(|pair| pair == wanted))
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Marketplace server bound to an ephemeral loopback port.
pub struct MockMarketplace {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockMarketplace {
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let router = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { addr, state, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a reply for `path`.
    pub fn reply(&self, path: &str, reply: MockReply) {
        lock(&self.state.replies).entry(path.to_owned()).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for `path`, in arrival order.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

impl Drop for MockMarketplace {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let path = uri.path().to_owned();
    lock(&state.requests).push(RecordedRequest {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        cookie: header(COOKIE),
        content_type: header(CONTENT_TYPE),
        body,
    });

    let reply = {
        let mut replies = lock(&state.replies);
        match replies.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };
    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, "no scripted reply").into_response();
    };

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = (status, Body::from(reply.body)).into_response();
    for cookie in &reply.set_cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            resp.headers_mut().append(SET_COOKIE, value);
        }
    }
    resp
}
