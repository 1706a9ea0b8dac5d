// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;

use openspend_api::WhoAmIResponse;

use super::Context;

pub async fn run(mut ctx: Context) -> anyhow::Result<()> {
    let result = ctx.client().whoami().await;
    let who = ctx.settle(result)?;
    print!("{}", render(&who));
    Ok(())
}

/// `User: id (email)` followed by one line per subject.
pub fn render(who: &WhoAmIResponse) -> String {
    let mut out = String::new();
    let email = who.user.email.as_deref().unwrap_or_default();
    let _ = writeln!(out, "User: {} ({email})", who.user.id);
    out.push_str("Subjects:\n");
    if who.subjects.is_empty() {
        out.push_str("  - none\n");
        return out;
    }
    for subject in &who.subjects {
        let _ = writeln!(
            out,
            "  - {} [{}] key={} policy={}",
            subject.display_name.as_deref().unwrap_or_default(),
            subject.kind,
            subject.external_key.as_deref().unwrap_or_default(),
            subject.policy_name.as_deref().unwrap_or_default(),
        );
    }
    out
}

#[cfg(test)]
#[path = "whoami_tests.rs"]
mod tests;
