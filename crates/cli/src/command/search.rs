// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;

use openspend_api::{SearchRequest, SearchResponse};

use super::Context;

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Search query; multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Network filter (repeatable or comma-separated).
    #[arg(long = "network", value_delimiter = ',')]
    pub networks: Vec<String>,

    /// Maximum number of results.
    #[arg(long, default_value_t = 9)]
    pub limit: u32,

    /// Maximum price budget filter; zero means unset.
    #[arg(long)]
    pub budget_max: Option<f64>,

    /// Budget asset filter (for example USDC).
    #[arg(long)]
    pub budget_asset: Option<String>,

    /// Minimum service score filter; zero means unset.
    #[arg(long)]
    pub min_service_score: Option<f64>,

    /// Minimum provider score filter; zero means unset.
    #[arg(long)]
    pub min_provider_score: Option<f64>,

    /// Minimum payment score filter; zero means unset.
    #[arg(long)]
    pub min_payment_score: Option<f64>,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn to_request(&self) -> SearchRequest {
        let set = |v: Option<f64>| v.filter(|v| *v != 0.0);
        SearchRequest {
            query: self.query.join(" ").trim().to_owned(),
            networks: self.networks.clone(),
            limit: self.limit,
            budget_max: self.budget_max.filter(|v| *v > 0.0),
            budget_asset: self.budget_asset.as_deref().map(str::trim).filter(|a| !a.is_empty()).map(str::to_owned),
            min_service_score: set(self.min_service_score),
            min_provider_score: set(self.min_provider_score),
            min_payment_score: set(self.min_payment_score),
        }
    }
}

pub async fn run(args: &SearchArgs, mut ctx: Context) -> anyhow::Result<()> {
    let req = args.to_request();
    let result = ctx.client().search(&req).await;
    let res = ctx.settle(result)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&res)?);
    } else {
        print!("{}", render(&res));
    }
    Ok(())
}

pub fn render(res: &SearchResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Results: {}", res.items.len());
    for (i, item) in res.items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item.resource_url);
        let _ = writeln!(
            out,
            "   score={:.3} min_price={} {} networks={}",
            item.score,
            item.min_price,
            item.asset,
            item.networks.join(",")
        );
        if !item.description.trim().is_empty() {
            let _ = writeln!(out, "   {}", item.description);
        }
        if !item.origin.url.trim().is_empty() {
            let _ = writeln!(out, "   origin={}", item.origin.url);
        }
    }
    out
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
