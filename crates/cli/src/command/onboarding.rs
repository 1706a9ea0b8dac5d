// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openspend onboarding buyer-quickstart`: login, base policy, one agent.

use std::time::Duration;

use openspend_api::{CreateAgentRequest, InitPolicyRequest};
use tracing::info;

use super::agent::generated_external_key;
use super::auth::browser_login;
use super::Context;
use crate::config::BrowserArgs;

#[derive(Debug, clap::Args)]
pub struct OnboardingArgs {
    #[command(subcommand)]
    pub command: OnboardingCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum OnboardingCommand {
    /// Authenticate, initialize policy, and create one buyer agent.
    BuyerQuickstart(QuickstartArgs),
}

#[derive(Debug, clap::Args)]
pub struct QuickstartArgs {
    /// Buyer agent external key (generated if omitted).
    #[arg(long)]
    pub external_key: Option<String>,

    /// Buyer agent display name.
    #[arg(long, default_value = "Buyer Agent")]
    pub display_name: String,

    /// Browser login timeout in seconds.
    #[arg(long, default_value_t = 180)]
    pub login_timeout: u64,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

pub async fn run(args: &OnboardingArgs, mut ctx: Context) -> anyhow::Result<()> {
    let OnboardingCommand::BuyerQuickstart(quick) = &args.command;

    let external_key = quick
        .external_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map_or_else(generated_external_key, str::to_owned);
    let display_name = match quick.display_name.trim() {
        "" => "Buyer Agent".to_owned(),
        name => name.to_owned(),
    };

    browser_login(&mut ctx, &quick.browser, Duration::from_secs(quick.login_timeout)).await?;

    let result = ctx.client().init_policy(&InitPolicyRequest::default()).await;
    let policy = ctx.settle(result)?;
    info!(policy = %policy.policy.id, created = policy.created, "base policy ready");

    let agent = CreateAgentRequest {
        external_key,
        display_name: Some(display_name),
        kind: Some("agent".to_owned()),
        policy_id: None,
    };
    let result = ctx.client().create_agent(&agent).await;
    let created = ctx.settle(result)?;
    info!(subject = %created.subject.id, "buyer agent ready");

    let result = ctx.client().whoami().await;
    let who = ctx.settle(result)?;

    println!("Onboarding complete for user {}. Subjects: {}", who.user.id, who.subjects.len());
    println!("Next: run `openspend whoami` or start discovery/use-service flows.");
    Ok(())
}
