// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marketplace operations: identity, policy, agent, search.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::transport::Client;

/// `GET {whoami}` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub user: User,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A buyer subject bound to the operator's account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub external_key: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub policy_name: Option<String>,
    #[serde(default)]
    pub policy_mode: Option<String>,
    #[serde(default)]
    pub precedence: Option<i64>,
}

/// `POST {policy-init}` body. Unset fields are left to the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPolicyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitPolicyResponse {
    pub policy: PolicyRef,
    #[serde(default)]
    pub created: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `POST {agent}` body; upserts a subject by external key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub external_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentResponse {
    pub subject: AgentSubject,
    #[serde(default)]
    pub policy_id: String,
    #[serde(default)]
    pub bound: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSubject {
    pub id: String,
    #[serde(default)]
    pub external_key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub kind: String,
}

/// Search filters. Every optional threshold is omitted from the query when
/// `None`; a zero `limit` means "server default".
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub networks: Vec<String>,
    pub limit: u32,
    pub budget_max: Option<f64>,
    pub budget_asset: Option<String>,
    pub min_service_score: Option<f64>,
    pub min_provider_score: Option<f64>,
    pub min_payment_score: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    /// Encoded query string (without the leading `?`).
    pub fn query_string(&self) -> Result<String, ApiError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidRequest("query is required".to_owned()));
        }

        let mut params: Vec<(&str, String)> = vec![("q", query.to_owned())];
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        for network in self.networks.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            params.push(("network", network.to_owned()));
        }
        let budget_asset = self.budget_asset.as_deref().map(str::trim).filter(|a| !a.is_empty());
        let optional = [
            ("budgetMax", self.budget_max.map(|v| v.to_string())),
            ("budgetAsset", budget_asset.map(str::to_owned)),
            ("minServiceScore", self.min_service_score.map(|v| v.to_string())),
            ("minProviderScore", self.min_provider_score.map(|v| v.to_string())),
            ("minPaymentScore", self.min_payment_score.map(|v| v.to_string())),
        ];
        params.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));

        Ok(params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchResultItem>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    #[serde(default)]
    pub resource_url: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Client {
    /// Current user and the subjects bound to it.
    pub async fn whoami(&mut self) -> Result<WhoAmIResponse, ApiError> {
        let path = self.endpoints().whoami.clone();
        let resp = self.request::<()>(Method::GET, &path, None, true).await?;
        resp.require_success("whoami")?.json()
    }

    /// Create or update the operator's base buyer policy.
    pub async fn init_policy(&mut self, req: &InitPolicyRequest) -> Result<InitPolicyResponse, ApiError> {
        let path = self.endpoints().policy_init.clone();
        let resp = self.request(Method::POST, &path, Some(req), true).await?;
        resp.require_success("policy init")?.json()
    }

    /// Upsert a buyer subject and bind it to a policy.
    pub async fn create_agent(&mut self, req: &CreateAgentRequest) -> Result<CreateAgentResponse, ApiError> {
        let path = self.endpoints().agent.clone();
        let resp = self.request(Method::POST, &path, Some(req), true).await?;
        resp.require_success("agent create")?.json()
    }

    /// Search marketplace services.
    pub async fn search(&mut self, req: &SearchRequest) -> Result<SearchResponse, ApiError> {
        let path = format!("{}?{}", self.endpoints().search, req.query_string()?);
        let session = self.search_requires_session();
        let resp = self.request::<()>(Method::GET, &path, None, session).await?;
        resp.require_success("search")?.json()
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
