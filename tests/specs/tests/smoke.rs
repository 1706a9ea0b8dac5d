// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `openspend` binary against a
//! scripted marketplace.

use std::time::Duration;

use serde_json::json;

use openspend_api::config::{
    DEFAULT_AGENT_PATH, DEFAULT_POLICY_INIT_PATH, DEFAULT_SEARCH_PATH,
    DEFAULT_SESSION_REFRESH_PATH, DEFAULT_WHOAMI_PATH,
};
use openspend_api::test_support::{MockMarketplace, MockReply};
use openspend_specs::Home;

const TIMEOUT: Duration = Duration::from_secs(15);
const COOKIE: &str = "better-auth.session_token";

fn whoami_body() -> serde_json::Value {
    json!({
        "user": { "id": "u1", "email": "buyer@example.com" },
        "subjects": [{
            "id": "s1",
            "kind": "agent",
            "externalKey": "buyer-1",
            "displayName": "Buyer One",
            "status": "active",
            "policyName": "Base policy",
        }],
    })
}

// -- basics -------------------------------------------------------------------

#[tokio::test]
async fn version_prints_package_version() -> anyhow::Result<()> {
    let home = Home::new()?;
    let out = home.run("http://127.0.0.1:9", &["version"]).await?;
    assert!(out.success(), "{out:?}");
    assert_eq!(out.stdout.trim(), env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn whoami_without_session_asks_for_login() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;

    let out = home.run(&market.base_url(), &["whoami"]).await?;
    assert_eq!(out.status.code(), Some(1), "{out:?}");
    assert!(out.stderr.contains("not authenticated; run openspend auth login"), "{}", out.stderr);
    assert!(market.requests().is_empty());
    Ok(())
}

// -- authenticated commands ---------------------------------------------------

#[tokio::test]
async fn whoami_persists_rotated_cookie() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok-old")?;
    let market = MockMarketplace::start().await?;
    market.reply(
        DEFAULT_WHOAMI_PATH,
        MockReply::json(200, whoami_body())
            .cookie("__Secure-better-auth.session_token=tok-new; Path=/; HttpOnly; Secure"),
    );

    let out = home.run(&market.base_url(), &["whoami"]).await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("User: u1 (buyer@example.com)"), "{}", out.stdout);
    assert!(out.stdout.contains("Buyer One [agent] key=buyer-1 policy=Base policy"));

    let sent = market.requests_to(DEFAULT_WHOAMI_PATH);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].has_cookie(COOKIE, "tok-old"));

    let stored = home.settings()?;
    assert_eq!(stored.auth.session_token, "tok-new");
    assert_eq!(stored.auth.session_cookie, "__Secure-better-auth.session_token");
    assert_ne!(stored.marketplace.base_url, market.base_url());
    Ok(())
}

#[tokio::test]
async fn expired_session_refreshes_and_retries() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok-stale")?;
    let market = MockMarketplace::start().await?;
    market.reply(DEFAULT_WHOAMI_PATH, MockReply::new(401, "expired"));
    market.reply(DEFAULT_WHOAMI_PATH, MockReply::json(200, whoami_body()));
    market.reply(
        DEFAULT_SESSION_REFRESH_PATH,
        MockReply::json(200, json!({ "session": { "expiresAt": "2099-01-01T00:00:00Z" } }))
            .cookie("better-auth.session_token=tok-fresh; Path=/; HttpOnly"),
    );

    let out = home.run(&market.base_url(), &["whoami"]).await?;
    assert!(out.success(), "{out:?}");

    let calls = market.requests_to(DEFAULT_WHOAMI_PATH);
    assert_eq!(calls.len(), 2);
    assert!(calls[1].has_cookie(COOKIE, "tok-fresh"));
    assert_eq!(market.hits(DEFAULT_SESSION_REFRESH_PATH), 1);
    assert_eq!(home.settings()?.auth.session_token, "tok-fresh");
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_exits_with_login_hint() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok-dead")?;
    let market = MockMarketplace::start().await?;
    market.reply(DEFAULT_WHOAMI_PATH, MockReply::new(401, "expired"));
    market.reply(DEFAULT_SESSION_REFRESH_PATH, MockReply::new(401, "nope"));

    let out = home.run(&market.base_url(), &["whoami"]).await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stderr.contains("session expired; run openspend auth login"), "{}", out.stderr);
    assert_eq!(market.hits(DEFAULT_WHOAMI_PATH), 1);
    Ok(())
}

#[tokio::test]
async fn search_renders_results() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;
    market.reply(
        DEFAULT_SEARCH_PATH,
        MockReply::json(
            200,
            json!({
                "items": [{
                    "id": "r1",
                    "resourceUrl": "https://api.example.com/weather",
                    "type": "http",
                    "networks": ["base", "solana"],
                    "description": "Weather data",
                    "minPrice": 0.01,
                    "asset": "USDC",
                    "origin": { "url": "https://example.com" },
                    "score": 0.9123,
                }],
                "pagination": { "total": 1, "limit": 9, "offset": 0 },
            }),
        ),
    );

    let out = home
        .run(&market.base_url(), &["search", "weather", "api", "--network", "base", "--limit", "3"])
        .await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("Results: 1"), "{}", out.stdout);
    assert!(out.stdout.contains("1. https://api.example.com/weather"));
    assert!(out.stdout.contains("score=0.912"));
    assert!(out.stdout.contains("networks=base,solana"));
    assert!(out.stdout.contains("origin=https://example.com"));

    let query = market.requests_to(DEFAULT_SEARCH_PATH)[0].query.clone().unwrap_or_default();
    assert!(query.contains("q=weather%20api"), "{query}");
    assert!(query.contains("network=base"), "{query}");
    assert!(query.contains("limit=3"), "{query}");
    Ok(())
}

#[tokio::test]
async fn search_json_is_machine_readable() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;
    market.reply(DEFAULT_SEARCH_PATH, MockReply::json(200, json!({ "items": [] })));

    let out = home.run(&market.base_url(), &["search", "nothing", "--json"]).await?;
    assert!(out.success(), "{out:?}");
    let parsed: serde_json::Value = serde_json::from_str(&out.stdout)?;
    assert_eq!(parsed["items"], json!([]));
    Ok(())
}

#[tokio::test]
async fn policy_init_sends_buyer_defaults() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok")?;
    let market = MockMarketplace::start().await?;
    market.reply(
        DEFAULT_POLICY_INIT_PATH,
        MockReply::json(200, json!({ "policy": { "id": "p1", "name": "Base" }, "created": true })),
    );

    let out = home
        .run(
            &market.base_url(),
            &["dashboard", "policy", "init", "--buyer", "--deny-hosts", "evil.example, ,bad.example"],
        )
        .await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("Buyer policy created: Base (p1)"), "{}", out.stdout);

    let sent = &market.requests_to(DEFAULT_POLICY_INIT_PATH)[0];
    let body: serde_json::Value = serde_json::from_str(&sent.body)?;
    assert_eq!(body["denyHosts"], json!(["evil.example", "bad.example"]));
    Ok(())
}

#[tokio::test]
async fn agent_create_generates_external_key() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok")?;
    let market = MockMarketplace::start().await?;
    market.reply(
        DEFAULT_AGENT_PATH,
        MockReply::json(
            200,
            json!({
                "subject": { "id": "s9", "externalKey": "ignored", "displayName": "Bot", "kind": "agent" },
                "policyId": "p1",
                "bound": true,
            }),
        ),
    );

    let out = home.run(&market.base_url(), &["dashboard", "agent", "create"]).await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("No --external-key provided; using generated key: buyer-agent-"));
    assert!(out.stdout.contains("Agent subject ready"), "{}", out.stdout);

    let body: serde_json::Value =
        serde_json::from_str(&market.requests_to(DEFAULT_AGENT_PATH)[0].body)?;
    let key = body["externalKey"].as_str().unwrap_or_default();
    assert!(key.starts_with("buyer-agent-"), "{key}");
    Ok(())
}

#[tokio::test]
async fn remote_failure_exits_nonzero_with_status() -> anyhow::Result<()> {
    let home = Home::new()?;
    home.seed_session("tok")?;
    let market = MockMarketplace::start().await?;
    market.reply(DEFAULT_AGENT_PATH, MockReply::new(500, "boom"));

    let out = home
        .run(&market.base_url(), &["dashboard", "agent", "update", "--external-key", "k1"])
        .await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stderr.contains("status=500"), "{}", out.stderr);
    assert!(out.stderr.contains("boom"), "{}", out.stderr);
    Ok(())
}

// -- browser login ------------------------------------------------------------

#[tokio::test]
async fn auth_login_stores_callback_token() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;

    let mut login = home.spawn_login(&market.base_url(), &["auth", "login", "-n", "--timeout", "10"])?;
    let callback = login.callback_url(TIMEOUT).await?;
    assert!(callback.starts_with("http://127.0.0.1:"), "{callback}");
    assert!(callback.ends_with("/callback"), "{callback}");

    let page = reqwest::get(format!("{callback}?session_token=tok-login")).await?;
    assert!(page.status().is_success());

    let out = login.finish(TIMEOUT).await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("Logged in successfully against"), "{}", out.stdout);
    assert_eq!(home.settings()?.auth.session_token, "tok-login");
    Ok(())
}

#[tokio::test]
async fn auth_login_times_out() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;

    let out = home.run(&market.base_url(), &["auth", "login", "-n", "--timeout", "1"]).await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stderr.contains("timed out"), "{}", out.stderr);
    Ok(())
}

#[tokio::test]
async fn buyer_quickstart_runs_every_step() -> anyhow::Result<()> {
    let home = Home::new()?;
    let market = MockMarketplace::start().await?;
    market.reply(
        DEFAULT_POLICY_INIT_PATH,
        MockReply::json(200, json!({ "policy": { "id": "p1", "name": "Base" }, "created": false })),
    );
    market.reply(
        DEFAULT_AGENT_PATH,
        MockReply::json(200, json!({ "subject": { "id": "s1" }, "policyId": "p1", "bound": true })),
    );
    market.reply(DEFAULT_WHOAMI_PATH, MockReply::json(200, whoami_body()));

    let mut run = home.spawn_login(
        &market.base_url(),
        &["onboarding", "buyer-quickstart", "-n", "--external-key", "qs-1", "--login-timeout", "10"],
    )?;
    let callback = run.callback_url(TIMEOUT).await?;
    reqwest::get(format!("{callback}?session_token=tok-qs")).await?;

    let out = run.finish(TIMEOUT).await?;
    assert!(out.success(), "{out:?}");
    assert!(out.stdout.contains("Onboarding complete for user u1. Subjects: 1"), "{}", out.stdout);

    for path in [DEFAULT_POLICY_INIT_PATH, DEFAULT_AGENT_PATH, DEFAULT_WHOAMI_PATH] {
        let sent = market.requests_to(path);
        assert_eq!(sent.len(), 1, "{path}");
        assert!(sent[0].has_cookie(COOKIE, "tok-qs"), "{path}");
    }
    let agent: serde_json::Value =
        serde_json::from_str(&market.requests_to(DEFAULT_AGENT_PATH)[0].body)?;
    assert_eq!(agent["externalKey"], "qs-1");
    assert_eq!(agent["displayName"], "Buyer Agent");
    Ok(())
}
