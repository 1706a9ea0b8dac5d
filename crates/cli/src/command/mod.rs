// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands and the settings-backed client they share.

pub mod agent;
pub mod auth;
pub mod onboarding;
pub mod policy;
pub mod search;
pub mod whoami;

use openspend_api::{ApiError, Client};
use tracing::debug;

use crate::config::{Cli, Command, DashboardCommand};
use crate::settings::{Paths, Settings};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let base_url = cli.base_url.as_deref();
    match cli.command {
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Auth(args) => auth::run(&args, Context::load(base_url)?).await,
        Command::Whoami => whoami::run(Context::load(base_url)?).await,
        Command::Search(args) => search::run(&args, Context::load(base_url)?).await,
        Command::Dashboard(args) => match args.command {
            DashboardCommand::Agent(args) => agent::run(&args, Context::load(base_url)?).await,
            DashboardCommand::Policy(args) => policy::run(&args, Context::load(base_url)?).await,
        },
        Command::Onboarding(args) => onboarding::run(&args, Context::load(base_url)?).await,
    }
}

/// A client built from settings, plus what is needed to write its session
/// back to disk.
///
/// Environment and `--base-url` overrides shape the client but are never
/// persisted; only the file's own contents and the session fields are.
pub struct Context {
    paths: Paths,
    stored: Settings,
    client: Client,
}

impl Context {
    pub fn load(base_url: Option<&str>) -> anyhow::Result<Self> {
        Self::from_paths(Paths::from_env()?, base_url)
    }

    pub fn from_paths(paths: Paths, base_url: Option<&str>) -> anyhow::Result<Self> {
        let stored = Settings::load(&paths)?;
        let mut effective = stored.clone();
        effective.apply_env(|name| std::env::var(name).ok());
        if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
            effective.marketplace.base_url = url.to_owned();
        }
        let client = Client::new(effective.client_config())?;
        debug!(base_url = client.base_url(), config = %paths.config.display(), "client ready");
        Ok(Self { paths, stored, client })
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Write the client's session fields back when they changed.
    pub fn persist(&mut self) -> anyhow::Result<()> {
        if self.stored.absorb(self.client.credential()) {
            self.stored.save(&self.paths.config)?;
        }
        Ok(())
    }

    /// Persist, then surface `result`. An operation error wins over a
    /// persistence error.
    pub fn settle<T>(&mut self, result: Result<T, ApiError>) -> anyhow::Result<T> {
        let persisted = self.persist();
        let value = result?;
        persisted?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
