// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use openspend_api::InitPolicyRequest;

use super::Context;

pub const DEFAULT_POLICY_NAME: &str = "CLI Buyer Policy";
pub const DEFAULT_POLICY_DESCRIPTION: &str = "Default buyer policy created by OpenSpend CLI";

#[derive(Debug, clap::Args)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum PolicyCommand {
    /// Initialize a base policy.
    Init(PolicyInitArgs),
}

#[derive(Debug, clap::Args)]
pub struct PolicyInitArgs {
    /// Initialize a buyer policy.
    #[arg(long)]
    pub buyer: bool,

    /// Policy name.
    #[arg(long, default_value = DEFAULT_POLICY_NAME)]
    pub name: String,

    /// Policy description.
    #[arg(long, default_value = DEFAULT_POLICY_DESCRIPTION)]
    pub description: String,

    /// Preferred asset.
    #[arg(long)]
    pub asset: Option<String>,

    /// Preferred network.
    #[arg(long)]
    pub network: Option<String>,

    /// Comma-separated deny hosts.
    #[arg(long, value_delimiter = ',')]
    pub deny_hosts: Vec<String>,

    /// Max price in base units; zero means unset.
    #[arg(long, default_value_t = 0)]
    pub max_price: i64,
}

impl PolicyInitArgs {
    pub fn to_request(&self) -> anyhow::Result<InitPolicyRequest> {
        if !self.buyer {
            anyhow::bail!("only buyer initialization is supported for now; pass --buyer");
        }
        Ok(InitPolicyRequest {
            name: non_blank(&self.name),
            description: non_blank(&self.description),
            max_price: Some(self.max_price).filter(|p| *p > 0),
            asset: self.asset.as_deref().and_then(non_blank),
            network: self.network.as_deref().and_then(non_blank),
            deny_hosts: self
                .deny_hosts
                .iter()
                .map(|h| h.trim())
                .filter(|h| !h.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

pub async fn run(args: &PolicyArgs, mut ctx: Context) -> anyhow::Result<()> {
    match &args.command {
        PolicyCommand::Init(init) => {
            let req = init.to_request()?;
            let result = ctx.client().init_policy(&req).await;
            let res = ctx.settle(result)?;
            let state = if res.created { "created" } else { "updated" };
            println!("Buyer policy {state}: {} ({})", res.policy.name, res.policy.id);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
