// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated transport: the ensure / refresh / retry-once protocol.
//!
//! Every session-bearing request first checks the held credential against
//! its known expiry, refreshing inside [`REFRESH_WINDOW`](crate::config::REFRESH_WINDOW).
//! Session cookies on any response are folded back into the credential. A
//! 401 triggers one forced refresh and one replay of the original request.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{ClientConfig, Endpoints, ERROR_BODY_LIMIT, REFRESH_ERROR_BODY_LIMIT};
use crate::error::{truncate_body, ApiError};
use crate::session::{Capture, Credential, Freshness, SetCookie};

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    /// Anything below 300 counts as success.
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 300
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self, limit: usize) -> String {
        truncate_body(&self.body, limit)
    }

    /// Map a non-success status to [`ApiError::RemoteRequestFailed`].
    pub fn require_success(self, operation: &'static str) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ApiError::RemoteRequestFailed {
            operation,
            status: self.status.as_u16(),
            body: self.text(ERROR_BODY_LIMIT),
        })
    }
}

/// Body of the session refresh endpoint.
#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    session: Option<SessionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// reqwest is built without a bundled TLS provider; use ring unless the
/// process already installed one.
fn ensure_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

/// Marketplace client owning one session credential.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
    search_requires_session: bool,
    credential: Credential,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        ensure_crypto_provider();
        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            endpoints: config.endpoints.normalized(),
            search_requires_session: config.search_requires_session,
            credential: config.credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn search_requires_session(&self) -> bool {
        self.search_requires_session
    }

    /// Current credential; callers persist this after each operation.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn token(&self) -> &str {
        &self.credential.token
    }

    pub fn cookie_name(&self) -> &str {
        &self.credential.cookie_name
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credential.expires_at
    }

    /// Install a token obtained from the login handoff. Its expiry is
    /// unknown until the next refresh.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.credential.token = token.into();
        self.credential.expires_at = None;
    }

    /// External login page that redirects back to `callback_url`.
    pub fn login_url(&self, callback_url: &str) -> Result<String, ApiError> {
        if callback_url.trim().is_empty() {
            return Err(ApiError::InvalidRequest("callback URL is required".to_owned()));
        }
        let sep = if self.endpoints.login.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{}{}{sep}redirect_uri={}",
            self.base_url,
            self.endpoints.login,
            urlencoding::encode(callback_url)
        ))
    }

    /// Explicit refresh; decode problems in the refresh body are reported.
    pub async fn sync_session(&mut self) -> Result<(), ApiError> {
        self.refresh(true).await
    }

    /// Issue a request, running the session protocol when `session` is set.
    ///
    /// The returned response may carry any status; classifying it is the
    /// caller's job.
    pub async fn request<B>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&B>,
        session: bool,
    ) -> Result<RawResponse, ApiError>
    where
        B: Serialize + ?Sized,
    {
        if session {
            self.ensure_session().await?;
        }
        let payload = body.map(serde_json::to_vec).transpose()?.map(Bytes::from);

        let resp = self.send(method.clone(), path, payload.clone(), session).await?;
        if !session || resp.status != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!(%method, path, "unauthorized, forcing session refresh before one retry");
        self.refresh(true).await?;
        self.send(method, path, payload, session).await
    }

    async fn ensure_session(&mut self) -> Result<(), ApiError> {
        match self.credential.freshness(Utc::now()) {
            Freshness::Missing => Err(ApiError::Unauthenticated),
            Freshness::Expired => Err(ApiError::SessionExpired),
            Freshness::ExpiringSoon => {
                debug!(expires_at = ?self.credential.expires_at, "session near expiry, refreshing");
                self.refresh(false).await
            }
            Freshness::Valid => Ok(()),
        }
    }

    async fn refresh(&mut self, force: bool) -> Result<(), ApiError> {
        let path = self.endpoints.session_refresh.clone();
        let resp = self.send(Method::GET, &path, None, true).await?;

        if !self.credential.is_authenticated() {
            return Err(ApiError::SessionExpired);
        }
        let status = resp.status.as_u16();
        if resp.status == StatusCode::UNAUTHORIZED || resp.status == StatusCode::FORBIDDEN {
            return Err(ApiError::SessionExpired);
        }
        if status >= 400 {
            return Err(ApiError::RefreshFailed { status, body: resp.text(REFRESH_ERROR_BODY_LIMIT) });
        }

        if resp.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::SessionExpired);
        }
        let envelope = match serde_json::from_slice::<Option<SessionEnvelope>>(&resp.body) {
            Ok(envelope) => envelope,
            Err(e) if force => return Err(e.into()),
            Err(e) => {
                debug!(err = %e, "ignoring undecodable refresh body");
                return Ok(());
            }
        };
        let Some(session) = envelope.and_then(|e| e.session) else {
            return Err(ApiError::SessionExpired);
        };
        if let Some(expires_at) = session.expires_at {
            self.credential.expires_at = Some(expires_at);
        }
        debug!(expires_at = ?self.credential.expires_at, force, "session refreshed");
        Ok(())
    }

    async fn send(
        &mut self,
        method: Method,
        path: &str,
        payload: Option<Bytes>,
        session: bool,
    ) -> Result<RawResponse, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.request(method.clone(), &url).header(CONTENT_TYPE, "application/json");
        if session {
            req = req.header(COOKIE, self.credential.cookie_header());
        }
        if let Some(payload) = payload {
            req = req.body(payload);
        }

        let resp = req.send().await?;
        let status = resp.status();
        trace!(%method, path, %status, "response");

        if session {
            let cookies: Vec<SetCookie> = resp.cookies().map(SetCookie::from).collect();
            match self.credential.capture(cookies, Utc::now()) {
                Capture::Cleared => debug!(path, "server invalidated session cookie"),
                Capture::Updated => debug!(path, cookie = %self.credential.cookie_name, "captured session cookie"),
                Capture::Unchanged => {}
            }
        }

        let body = resp.bytes().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
