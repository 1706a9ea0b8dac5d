// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk CLI configuration: `~/.config/openspend/config.toml`.
//!
//! Load order is file (or a migrated legacy file), then defaults for blank
//! values, then environment overrides. Only what was read from disk plus the
//! session fields learned from the client are ever written back.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use openspend_api::config::{
    DEFAULT_AGENT_PATH, DEFAULT_LOGIN_PATH, DEFAULT_POLICY_INIT_PATH, DEFAULT_SEARCH_PATH,
    DEFAULT_SESSION_REFRESH_PATH, DEFAULT_WHOAMI_PATH,
};
use openspend_api::session::DEFAULT_SESSION_COOKIE;
use openspend_api::{ClientConfig, Credential, Endpoints};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://openspend.ai";

/// Development URLs older releases wrote as defaults.
const DEPRECATED_BASE_URLS: &[&str] = &["http://192.0.0.2:5566", "http://localhost:5555"];

/// Where settings live.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub legacy_toml: Option<PathBuf>,
    pub legacy_json: Option<PathBuf>,
}

impl Paths {
    /// `$OPENSPEND_CONFIG`, else under `$HOME`.
    pub fn from_env() -> anyhow::Result<Self> {
        let home = home_dir();
        let config = match std::env::var_os("OPENSPEND_CONFIG").filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => home
                .as_deref()
                .map(config_under)
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?,
        };
        Ok(Self {
            config,
            legacy_toml: home.as_ref().map(|h| h.join(".openspend").join("config.toml")),
            legacy_json: home.as_ref().map(|h| h.join(".openspend").join("config.json")),
        })
    }

    pub fn under_home(home: &Path) -> Self {
        Self {
            config: config_under(home),
            legacy_toml: Some(home.join(".openspend").join("config.toml")),
            legacy_json: Some(home.join(".openspend").join("config.json")),
        }
    }
}

fn config_under(home: &Path) -> PathBuf {
    home.join(".config").join("openspend").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceSettings {
    pub base_url: String,
    pub whoami_path: String,
    pub policy_init_path: String,
    pub agent_path: String,
    pub search_path: String,
    pub search_requires_session: bool,
}

impl Default for MarketplaceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            whoami_path: DEFAULT_WHOAMI_PATH.to_owned(),
            policy_init_path: DEFAULT_POLICY_INIT_PATH.to_owned(),
            agent_path: DEFAULT_AGENT_PATH.to_owned(),
            search_path: DEFAULT_SEARCH_PATH.to_owned(),
            search_requires_session: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub browser_login_path: String,
    pub session_refresh_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_token: String,
    pub session_cookie: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expires_at: Option<DateTime<Utc>>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            browser_login_path: DEFAULT_LOGIN_PATH.to_owned(),
            session_refresh_path: DEFAULT_SESSION_REFRESH_PATH.to_owned(),
            session_token: String::new(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_owned(),
            session_expires_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub marketplace: MarketplaceSettings,
    pub auth: AuthSettings,
}

/// `~/.openspend/config.json` from the first releases.
#[derive(Debug, Default, Deserialize)]
struct LegacyJson {
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    session_token: String,
}

impl Settings {
    /// Read settings from `paths.config`, migrating a legacy file when the
    /// current one does not exist yet.
    pub fn load(paths: &Paths) -> anyhow::Result<Self> {
        let text = match std::fs::read_to_string(&paths.config) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::migrate(paths)),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", paths.config.display()))
            }
        };
        let mut settings: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", paths.config.display()))?;
        settings.fill_defaults();
        Ok(settings)
    }

    fn migrate(paths: &Paths) -> Self {
        let Some(mut legacy) = Self::load_legacy(paths) else {
            return Self::default();
        };
        legacy.fill_defaults();
        match legacy.save(&paths.config) {
            Ok(()) => info!(path = %paths.config.display(), "migrated legacy configuration"),
            Err(e) => warn!(err = %e, "failed to save migrated configuration"),
        }
        legacy
    }

    fn load_legacy(paths: &Paths) -> Option<Self> {
        if let Some(path) = &paths.legacy_toml {
            match std::fs::read_to_string(path).map(|t| toml::from_str::<Self>(&t)) {
                Ok(Ok(settings)) => return Some(settings),
                Ok(Err(e)) => debug!(path = %path.display(), err = %e, "skipping unreadable legacy toml"),
                Err(_) => {}
            }
        }
        let path = paths.legacy_json.as_ref()?;
        let text = std::fs::read_to_string(path).ok()?;
        let legacy: LegacyJson = match serde_json::from_str(&text) {
            Ok(legacy) => legacy,
            Err(e) => {
                debug!(path = %path.display(), err = %e, "skipping unreadable legacy json");
                return None;
            }
        };
        let mut settings = Self::default();
        if !legacy.base_url.is_empty() {
            settings.marketplace.base_url = legacy.base_url;
        }
        settings.auth.session_token = legacy.session_token;
        Some(settings)
    }

    /// Replace blank values with defaults and retire deprecated base URLs.
    pub fn fill_defaults(&mut self) {
        let market = MarketplaceSettings::default();
        let auth = AuthSettings::default();
        if self.marketplace.base_url.trim().is_empty()
            || DEPRECATED_BASE_URLS.contains(&self.marketplace.base_url.as_str())
        {
            self.marketplace.base_url = market.base_url;
        }
        fill(&mut self.marketplace.whoami_path, market.whoami_path);
        fill(&mut self.marketplace.policy_init_path, market.policy_init_path);
        fill(&mut self.marketplace.agent_path, market.agent_path);
        fill(&mut self.marketplace.search_path, market.search_path);
        fill(&mut self.auth.browser_login_path, auth.browser_login_path);
        fill(&mut self.auth.session_refresh_path, auth.session_refresh_path);
        fill(&mut self.auth.session_cookie, auth.session_cookie);
    }

    /// Apply `OPENSPEND_*` overrides; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if let Some(url) = var("OPENSPEND_MARKETPLACE_BASE_URL").or_else(|| var("OPENSPEND_BASE_URL")) {
            self.marketplace.base_url = url;
        }
        let overrides: [(&str, &mut String); 7] = [
            ("OPENSPEND_MARKETPLACE_WHOAMI_PATH", &mut self.marketplace.whoami_path),
            ("OPENSPEND_MARKETPLACE_POLICY_INIT_PATH", &mut self.marketplace.policy_init_path),
            ("OPENSPEND_MARKETPLACE_AGENT_PATH", &mut self.marketplace.agent_path),
            ("OPENSPEND_MARKETPLACE_SEARCH_PATH", &mut self.marketplace.search_path),
            ("OPENSPEND_AUTH_BROWSER_LOGIN_PATH", &mut self.auth.browser_login_path),
            ("OPENSPEND_AUTH_SESSION_REFRESH_PATH", &mut self.auth.session_refresh_path),
            ("OPENSPEND_AUTH_SESSION_COOKIE", &mut self.auth.session_cookie),
        ];
        for (name, slot) in overrides {
            if let Some(value) = var(name) {
                *slot = value;
            }
        }
        self.fill_defaults();
    }

    /// Write atomically (temp file in the same directory, then rename).
    /// The temp file is created owner-only, so the result is mode 0600.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let text = toml::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential {
            token: self.auth.session_token.clone(),
            cookie_name: self.auth.session_cookie.clone(),
            expires_at: self.auth.session_expires_at,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let endpoints = Endpoints {
            whoami: self.marketplace.whoami_path.clone(),
            policy_init: self.marketplace.policy_init_path.clone(),
            agent: self.marketplace.agent_path.clone(),
            search: self.marketplace.search_path.clone(),
            login: self.auth.browser_login_path.clone(),
            session_refresh: self.auth.session_refresh_path.clone(),
        };
        ClientConfig::new(self.marketplace.base_url.clone())
            .with_endpoints(endpoints)
            .with_search_session(self.marketplace.search_requires_session)
            .with_credential(self.credential())
    }

    /// Copy the session fields from `credential`; true when anything changed.
    pub fn absorb(&mut self, credential: &Credential) -> bool {
        let mut changed = false;
        if self.auth.session_token != credential.token {
            self.auth.session_token = credential.token.clone();
            changed = true;
        }
        if self.auth.session_cookie != credential.cookie_name {
            self.auth.session_cookie = credential.cookie_name.clone();
            changed = true;
        }
        if self.auth.session_expires_at != credential.expires_at {
            self.auth.session_expires_at = credential.expires_at;
            changed = true;
        }
        changed
    }
}

fn fill(slot: &mut String, default: String) {
    if slot.trim().is_empty() {
        *slot = default;
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
