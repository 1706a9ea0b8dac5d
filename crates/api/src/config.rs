// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::session::Credential;

/// Lead time before a known expiry during which a refresh runs before use.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Default deadline for the browser login handoff.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

/// Default per-request timeout for marketplace calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Cap on response body bytes embedded in domain failures.
pub const ERROR_BODY_LIMIT: usize = 4096;

/// Cap on response body bytes embedded in refresh failures.
pub const REFRESH_ERROR_BODY_LIMIT: usize = 1024;

pub const DEFAULT_WHOAMI_PATH: &str = "/api/cli/whoami";
pub const DEFAULT_POLICY_INIT_PATH: &str = "/api/cli/policy/init";
pub const DEFAULT_AGENT_PATH: &str = "/api/cli/agent";
pub const DEFAULT_SEARCH_PATH: &str = "/api/search";
pub const DEFAULT_LOGIN_PATH: &str = "/api/cli/auth/login";
pub const DEFAULT_SESSION_REFRESH_PATH: &str = "/api/auth/get-session";

/// Remote endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub whoami: String,
    pub policy_init: String,
    pub agent: String,
    pub search: String,
    pub login: String,
    pub session_refresh: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            whoami: DEFAULT_WHOAMI_PATH.to_owned(),
            policy_init: DEFAULT_POLICY_INIT_PATH.to_owned(),
            agent: DEFAULT_AGENT_PATH.to_owned(),
            search: DEFAULT_SEARCH_PATH.to_owned(),
            login: DEFAULT_LOGIN_PATH.to_owned(),
            session_refresh: DEFAULT_SESSION_REFRESH_PATH.to_owned(),
        }
    }
}

impl Endpoints {
    /// Replace blank paths with their defaults.
    pub fn normalized(self) -> Self {
        let def = Self::default();
        Self {
            whoami: or_default(self.whoami, def.whoami),
            policy_init: or_default(self.policy_init, def.policy_init),
            agent: or_default(self.agent, def.agent),
            search: or_default(self.search, def.search),
            login: or_default(self.login, def.login),
            session_refresh: or_default(self.session_refresh, def.session_refresh),
        }
    }
}

/// Everything a [`Client`](crate::Client) needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Marketplace origin, e.g. `https://openspend.ai`.
    pub base_url: String,
    pub endpoints: Endpoints,
    /// Whether `search` carries the session cookie.
    pub search_requires_session: bool,
    pub request_timeout: Duration,
    /// Last persisted credential; empty token means logged out.
    pub credential: Credential,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints: Endpoints::default(),
            search_requires_session: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credential: Credential::default(),
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_search_session(mut self, required: bool) -> Self {
        self.search_requires_session = required;
        self
    }
}

fn or_default(value: String, default: String) -> String {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}
