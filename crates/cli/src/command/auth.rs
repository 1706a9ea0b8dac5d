// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `openspend auth login`: browser login through a local callback.

use std::time::Duration;

use openspend_api::{LoginHandoff, LoginOptions};
use tracing::warn;

use super::Context;
use crate::browser;
use crate::config::BrowserArgs;

#[derive(Debug, clap::Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum AuthCommand {
    /// Open marketplace login in browser and capture CLI session.
    Login(LoginArgs),
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Login timeout in seconds.
    #[arg(long, default_value_t = 180)]
    pub timeout: u64,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

pub async fn run(args: &AuthArgs, mut ctx: Context) -> anyhow::Result<()> {
    match &args.command {
        AuthCommand::Login(login) => {
            browser_login(&mut ctx, &login.browser, Duration::from_secs(login.timeout)).await?;
            println!("Logged in successfully against {}", ctx.base_url());
            Ok(())
        }
    }
}

/// Obtain a session token through the browser and save it.
pub async fn browser_login(ctx: &mut Context, args: &BrowserArgs, timeout: Duration) -> anyhow::Result<()> {
    let open = {
        let stdin = std::io::stdin();
        browser::resolve_open_choice(args, &mut stdin.lock(), &mut std::io::stdout())?
    };

    let options = LoginOptions { callback_host: args.callback_host.clone(), timeout, ..LoginOptions::default() };
    let handoff = LoginHandoff::bind(ctx.client(), options).await?;
    println!("Login URL: {}", handoff.login_url());
    if open {
        if let Err(e) = browser::open(handoff.login_url()) {
            warn!(err = %e, "browser launch failed");
            println!("Could not auto-open browser: {e}");
            println!("Open the URL manually.");
        }
    }

    let token = handoff.wait().await?;
    ctx.client().set_token(token);
    ctx.persist()
}
