// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use openspend_api::CreateAgentRequest;

use super::Context;

#[derive(Debug, clap::Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum AgentCommand {
    /// Create a buyer subject and bind to policy.
    Create(AgentUpsertArgs),
    /// Update an existing buyer subject and policy binding.
    Update(AgentUpsertArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct AgentUpsertArgs {
    /// Subject external key (generated on create if omitted).
    #[arg(long)]
    pub external_key: Option<String>,

    /// Display name.
    #[arg(long)]
    pub display_name: Option<String>,

    /// Subject kind.
    #[arg(long, default_value = "agent")]
    pub kind: String,

    /// Policy ID override.
    #[arg(long)]
    pub policy_id: Option<String>,
}

/// `buyer-agent-<unix seconds>`.
pub fn generated_external_key() -> String {
    format!("buyer-agent-{}", Utc::now().timestamp())
}

impl AgentUpsertArgs {
    /// Build the request; the flag says whether the key was generated.
    pub fn to_request(&self, allow_generated_key: bool) -> anyhow::Result<(CreateAgentRequest, bool)> {
        let given = self.external_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let (external_key, generated) = match given {
            Some(key) => (key.to_owned(), false),
            None if allow_generated_key => (generated_external_key(), true),
            None => anyhow::bail!("--external-key is required"),
        };
        let optional = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
        let req = CreateAgentRequest {
            external_key,
            display_name: optional(self.display_name.as_deref()),
            kind: optional(Some(self.kind.as_str())),
            policy_id: optional(self.policy_id.as_deref()),
        };
        Ok((req, generated))
    }
}

pub async fn run(args: &AgentArgs, mut ctx: Context) -> anyhow::Result<()> {
    let (upsert, create) = match &args.command {
        AgentCommand::Create(upsert) => (upsert, true),
        AgentCommand::Update(upsert) => (upsert, false),
    };
    let (req, generated) = upsert.to_request(create)?;
    if generated {
        println!("No --external-key provided; using generated key: {}", req.external_key);
    }

    let result = ctx.client().create_agent(&req).await;
    let res = ctx.settle(result)?;
    let outcome = if create { "ready" } else { "updated" };
    println!(
        "Agent subject {outcome}: {} (id={} external_key={} generated_external_key={generated}), bound policy={}",
        res.subject.display_name, res.subject.id, res.subject.external_key, res.policy_id
    );
    Ok(())
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
