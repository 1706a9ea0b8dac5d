// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};

use crate::command::agent::AgentArgs;
use crate::command::auth::AuthArgs;
use crate::command::onboarding::OnboardingArgs;
use crate::command::policy::PolicyArgs;
use crate::command::search::SearchArgs;

/// OpenSpend marketplace CLI.
#[derive(Debug, Parser)]
#[command(name = "openspend", version, about)]
pub struct Cli {
    /// Marketplace base URL (wins over config file and environment).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive).
    #[arg(long, global = true, env = "OPENSPEND_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format for stderr diagnostics.
    #[arg(long, global = true, env = "OPENSPEND_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication commands.
    Auth(AuthArgs),
    /// Dashboard management commands.
    Dashboard(DashboardArgs),
    /// Search marketplace services.
    Search(SearchArgs),
    /// Show current authenticated user and buyer subjects.
    Whoami,
    /// Guided onboarding flows.
    Onboarding(OnboardingArgs),
    /// Print CLI version.
    Version,
}

#[derive(Debug, clap::Args)]
pub struct DashboardArgs {
    #[command(subcommand)]
    pub command: DashboardCommand,
}

#[derive(Debug, Subcommand)]
pub enum DashboardCommand {
    /// Agent and subject commands.
    Agent(AgentArgs),
    /// Policy management.
    Policy(PolicyArgs),
}

/// Browser handling shared by every command that logs in.
#[derive(Debug, Clone, clap::Args)]
pub struct BrowserArgs {
    /// Automatically open browser without prompting.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Do not open browser automatically.
    #[arg(short = 'n', long)]
    pub no: bool,

    /// Host to advertise in callback URL.
    #[arg(long, default_value = "127.0.0.1")]
    pub callback_host: String,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
