// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session credential held between invocations.
//!
//! The marketplace carries its session as a cookie whose canonical name has
//! changed between deployments, so the client sends the bearer value under
//! every known name and accepts an update under any of them.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::REFRESH_WINDOW;

/// Static fallback cookie names, consulted after the last captured name.
pub const SESSION_COOKIE_NAMES: &[&str] = &[
    "better-auth.session_token",
    "better-auth-session_token",
    "__Secure-better-auth.session_token",
    "__Secure-better-auth-session_token",
    "__Host-better-auth.session_token",
    "__Host-better-auth-session_token",
];

pub fn is_session_cookie_name(name: &str) -> bool {
    SESSION_COOKIE_NAMES.contains(&name)
}

/// Cookie name used when nothing has been captured yet.
pub const DEFAULT_SESSION_COOKIE: &str = "better-auth.session_token";

/// Bearer value plus the cookie name it arrived under and its expiry.
///
/// `expires_at == None` means the expiry is unknown and the token is trusted
/// until the server rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub cookie_name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for Credential {
    fn default() -> Self {
        Self { token: String::new(), cookie_name: DEFAULT_SESSION_COOKIE.to_owned(), expires_at: None }
    }
}

/// Where a credential stands relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No bearer value held.
    Missing,
    /// Known expiry has passed.
    Expired,
    /// Known expiry falls inside [`REFRESH_WINDOW`].
    ExpiringSoon,
    /// Expiry unknown or comfortably in the future.
    Valid,
}

/// Result of scanning one response for session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Unchanged,
    Updated,
    Cleared,
}

/// One `Set-Cookie` from a response, reduced to what capture needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Seconds; zero or negative is an explicit invalidation.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), max_age: None, expires: None }
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    fn is_invalidation(&self) -> bool {
        self.max_age.is_some_and(|secs| secs <= 0)
    }
}

impl From<reqwest::cookie::Cookie<'_>> for SetCookie {
    fn from(cookie: reqwest::cookie::Cookie<'_>) -> Self {
        // The cookie parser folds negative Max-Age into zero.
        let max_age = cookie.max_age().map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        Self {
            name: cookie.name().to_owned(),
            value: cookie.value().to_owned(),
            max_age,
            expires: cookie.expires().map(DateTime::<Utc>::from),
        }
    }
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), ..Self::default() }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        if !self.is_authenticated() {
            return Freshness::Missing;
        }
        let Some(expires_at) = self.expires_at else {
            return Freshness::Valid;
        };
        if now >= expires_at {
            return Freshness::Expired;
        }
        let window = TimeDelta::from_std(REFRESH_WINDOW).unwrap_or(TimeDelta::MAX);
        match now.checked_add_signed(window) {
            Some(edge) if edge <= expires_at => Freshness::Valid,
            _ => Freshness::ExpiringSoon,
        }
    }

    /// Cookie names to send, last captured name first, without duplicates.
    pub fn cookie_candidates(&self) -> Vec<&str> {
        let mut ordered = Vec::with_capacity(SESSION_COOKIE_NAMES.len() + 1);
        if !self.cookie_name.is_empty() {
            ordered.push(self.cookie_name.as_str());
        }
        for &name in SESSION_COOKIE_NAMES {
            if !ordered.contains(&name) {
                ordered.push(name);
            }
        }
        ordered
    }

    pub fn is_candidate(&self, name: &str) -> bool {
        self.cookie_name == name || is_session_cookie_name(name)
    }

    /// `Cookie` header value carrying the bearer under every candidate name.
    pub fn cookie_header(&self) -> String {
        self.cookie_candidates()
            .iter()
            .map(|name| format!("{name}={}", self.token))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Drop the bearer value and expiry; the cookie name is kept.
    pub fn clear(&mut self) {
        self.token.clear();
        self.expires_at = None;
    }

    /// Absorb session cookies from a response.
    ///
    /// An invalidating cookie clears the credential and ends the scan. Later
    /// cookies in the same response overwrite earlier ones.
    ///
    /// Recognised names are the fixed [`SESSION_COOKIE_NAMES`] plus the
    /// current `cookie_name`, so a configured custom name is captured and
    /// cleared too.
    pub fn capture<I>(&mut self, cookies: I, now: DateTime<Utc>) -> Capture
    where
        I: IntoIterator<Item = SetCookie>,
    {
        let mut outcome = Capture::Unchanged;
        for cookie in cookies {
            if !self.is_candidate(&cookie.name) {
                continue;
            }
            if cookie.is_invalidation() {
                self.clear();
                return Capture::Cleared;
            }
            if cookie.value.is_empty() {
                continue;
            }
            self.cookie_name = cookie.name;
            self.token = cookie.value;
            if let Some(expires) = cookie.expires {
                self.expires_at = Some(expires);
            } else if let Some(at) = cookie
                .max_age
                .filter(|secs| *secs > 0)
                .and_then(TimeDelta::try_seconds)
                .and_then(|delta| now.checked_add_signed(delta))
            {
                self.expires_at = Some(at);
            }
            outcome = Capture::Updated;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
