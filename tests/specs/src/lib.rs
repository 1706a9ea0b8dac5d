// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary tests.
//!
//! Runs the real `openspend` binary with an isolated home directory against
//! a scripted marketplace.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Once;
use std::time::Duration;

use openspend::settings::Settings;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `openspend` binary.
pub fn openspend_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("openspend")
}

/// Environment variables that would leak the developer's setup into a run.
const SCRUBBED_ENV: &[&str] = &[
    "OPENSPEND_MARKETPLACE_BASE_URL",
    "OPENSPEND_BASE_URL",
    "OPENSPEND_MARKETPLACE_WHOAMI_PATH",
    "OPENSPEND_MARKETPLACE_POLICY_INIT_PATH",
    "OPENSPEND_MARKETPLACE_AGENT_PATH",
    "OPENSPEND_MARKETPLACE_SEARCH_PATH",
    "OPENSPEND_AUTH_BROWSER_LOGIN_PATH",
    "OPENSPEND_AUTH_SESSION_REFRESH_PATH",
    "OPENSPEND_AUTH_SESSION_COOKIE",
    "OPENSPEND_LOG",
    "OPENSPEND_LOG_FORMAT",
];

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct Outcome {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// An isolated home directory the binary reads and writes its config in.
pub struct Home {
    dir: tempfile::TempDir,
}

impl Home {
    pub fn new() -> anyhow::Result<Self> {
        ensure_crypto();
        Ok(Self { dir: tempfile::tempdir()? })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join(".config").join("openspend").join("config.toml")
    }

    /// Write a config holding `token` as the session.
    pub fn seed_session(&self, token: &str) -> anyhow::Result<()> {
        let mut settings = Settings::default();
        settings.auth.session_token = token.to_owned();
        settings.save(&self.config_path())
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let text = std::fs::read_to_string(self.config_path())?;
        Ok(toml::from_str(&text)?)
    }

    /// Command for `openspend --base-url <base_url> <args...>`.
    pub fn command(&self, base_url: &str, args: &[&str]) -> anyhow::Result<Command> {
        let binary = openspend_binary();
        anyhow::ensure!(binary.exists(), "openspend binary not found at {}", binary.display());

        let mut cmd = Command::new(binary);
        cmd.arg("--base-url").arg(base_url).args(args);
        for name in SCRUBBED_ENV {
            cmd.env_remove(name);
        }
        cmd.env("HOME", self.path())
            .env("OPENSPEND_CONFIG", self.config_path())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Run to completion and capture output.
    pub async fn run(&self, base_url: &str, args: &[&str]) -> anyhow::Result<Outcome> {
        let mut cmd = self.command(base_url, args)?;
        let output = tokio::time::timeout(Duration::from_secs(30), cmd.output()).await??;
        Ok(Outcome {
            status: output.status,
            stdout: String::from_utf8(output.stdout)?,
            stderr: String::from_utf8(output.stderr)?,
        })
    }

    /// Start a command that logs in; stdout is streamed so the login URL can
    /// be read before the process exits.
    pub fn spawn_login(&self, base_url: &str, args: &[&str]) -> anyhow::Result<LoginProcess> {
        let mut cmd = self.command(base_url, args)?;
        let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("no stdout pipe"))?;
        Ok(LoginProcess { child, stdout: BufReader::new(stdout), seen: String::new() })
    }
}

/// A running CLI waiting on the browser callback.
pub struct LoginProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    seen: String,
}

impl LoginProcess {
    /// Read stdout until the `Login URL:` line and return the decoded
    /// `redirect_uri` it carries.
    pub async fn callback_url(&mut self, timeout: Duration) -> anyhow::Result<String> {
        let read = async {
            let mut line = String::new();
            loop {
                line.clear();
                if self.stdout.read_line(&mut line).await? == 0 {
                    anyhow::bail!("stdout closed before login URL; saw: {}", self.seen);
                }
                self.seen.push_str(&line);
                if let Some(url) = line.trim().strip_prefix("Login URL: ") {
                    return redirect_uri(url);
                }
            }
        };
        tokio::time::timeout(timeout, read).await?
    }

    /// Wait for exit and return everything printed.
    pub async fn finish(mut self, timeout: Duration) -> anyhow::Result<Outcome> {
        let mut rest = String::new();
        let mut stderr = String::new();
        let waited = tokio::time::timeout(timeout, async {
            self.stdout.read_to_string(&mut rest).await?;
            if let Some(mut err) = self.child.stderr.take() {
                err.read_to_string(&mut stderr).await?;
            }
            anyhow::Ok(self.child.wait().await?)
        })
        .await??;
        self.seen.push_str(&rest);
        Ok(Outcome { status: waited, stdout: self.seen, stderr })
    }
}

/// Extract and decode `redirect_uri` from a login URL.
pub fn redirect_uri(login_url: &str) -> anyhow::Result<String> {
    let (_, query) = login_url
        .split_once('?')
        .ok_or_else(|| anyhow::anyhow!("login URL has no query: {login_url}"))?;
    let encoded = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("redirect_uri="))
        .ok_or_else(|| anyhow::anyhow!("login URL has no redirect_uri: {login_url}"))?;
    Ok(urlencoding::decode(encoded)?.into_owned())
}
