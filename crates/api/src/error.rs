// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Failures surfaced by the marketplace client.
///
/// `Unauthenticated` and `SessionExpired` both mean the operator has to log
/// in again; everything else carries enough detail to be shown as-is.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authenticated; run openspend auth login")]
    Unauthenticated,

    #[error("session expired; run openspend auth login")]
    SessionExpired,

    #[error("session refresh failed: status={status} body={body}")]
    RefreshFailed { status: u16, body: String },

    #[error("timed out waiting for browser callback after {}s", .0.as_secs())]
    LoginTimeout(Duration),

    #[error("callback missing session_token")]
    CallbackMalformed,

    #[error("{operation} failed: status={status} body={body}")]
    RemoteRequestFailed { operation: &'static str, status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("callback server: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// True when the only remedy is a fresh `auth login`.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }

    /// HTTP status carried by the failure, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RefreshFailed { status, .. } | Self::RemoteRequestFailed { status, .. } => {
                Some(*status)
            }
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Trim and cap a response body for embedding in an error message.
pub(crate) fn truncate_body(body: &[u8], limit: usize) -> String {
    let end = body.len().min(limit);
    String::from_utf8_lossy(&body[..end]).trim().to_owned()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
