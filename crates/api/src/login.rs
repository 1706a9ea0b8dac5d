// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser login handoff.
//!
//! A one-route HTTP listener receives the session token that the marketplace
//! login page redirects to. The flow is
//! `bind` (listener up, login URL known) → `wait` (serve `/callback` until a
//! token, a malformed callback, or the deadline). The server is shut down on
//! every exit from `wait`, including when the `wait` future is dropped.

use std::future::IntoFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_LOGIN_TIMEOUT;
use crate::error::ApiError;
use crate::transport::Client;

const CONFIRMATION_HTML: &str = "<!doctype html><html><body>\
<h3>OpenSpend CLI authenticated.</h3><p>You can return to terminal.</p>\
</body></html>";

/// How long a cancelled callback server may take to drain before it is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Knobs for [`LoginHandoff::bind`].
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Host advertised in the callback URL.
    pub callback_host: String,
    /// Local address to listen on; port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Hard deadline for the callback to arrive.
    pub timeout: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            callback_host: "127.0.0.1".to_owned(),
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}

type Outcome = Result<String, ApiError>;

/// One-shot completion shared by the callback route; the first signal wins.
#[derive(Clone)]
pub struct CallbackSignal(Arc<Mutex<Option<oneshot::Sender<Outcome>>>>);

impl CallbackSignal {
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    fn fire(&self, outcome: Outcome) {
        let sender = self.0.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!("callback already signalled, ignoring"),
        }
    }
}

/// Router serving only `GET /callback`.
pub fn callback_router(signal: CallbackSignal) -> Router {
    Router::new()
        .route("/callback", get(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(signal)
}

/// The first `session_token` pair wins; repeats are ignored.
async fn callback(
    State(signal): State<CallbackSignal>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let token = match query {
        Ok(Query(pairs)) => pairs.into_iter().find(|(k, _)| k == "session_token").map(|(_, v)| v),
        Err(e) => {
            debug!(err = %e, "unparseable callback query");
            None
        }
    };
    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            signal.fire(Ok(token));
            Html(CONFIRMATION_HTML).into_response()
        }
        None => {
            warn!("login callback arrived without session_token");
            signal.fire(Err(ApiError::CallbackMalformed));
            (StatusCode::BAD_REQUEST, "missing session_token").into_response()
        }
    }
}

/// A bound callback listener and the login URL pointing back at it.
pub struct LoginHandoff {
    listener: TcpListener,
    callback_url: String,
    login_url: String,
    timeout: Duration,
}

impl LoginHandoff {
    pub async fn bind(client: &Client, options: LoginOptions) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(options.bind_addr).await?;
        let port = listener.local_addr()?.port();
        let callback_url = format!("http://{}:{port}/callback", options.callback_host);
        let login_url = client.login_url(&callback_url)?;
        debug!(%callback_url, "login callback listener bound");
        Ok(Self { listener, callback_url, login_url, timeout: options.timeout })
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// URL the operator opens in a browser.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve the callback and return the delivered session token.
    pub async fn wait(self) -> Result<String, ApiError> {
        let (signal, rx) = CallbackSignal::new();
        let shutdown = CancellationToken::new();
        let _release = shutdown.clone().drop_guard();

        let router = callback_router(signal);
        let mut server = tokio::spawn(
            axum::serve(self.listener, router)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .into_future(),
        );

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        shutdown.cancel();
        let served = match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(joined) => joined.ok(),
            Err(_) => {
                server.abort();
                None
            }
        };

        match outcome {
            Ok(Ok(Ok(token))) => {
                info!("login callback delivered a session token");
                Ok(token)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_closed)) => match served {
                Some(Err(e)) => Err(ApiError::Io(e)),
                _ => Err(ApiError::Io(std::io::Error::other("callback server stopped"))),
            },
            Err(_elapsed) => Err(ApiError::LoginTimeout(self.timeout)),
        }
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
