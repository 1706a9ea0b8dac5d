// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client library for the OpenSpend marketplace.
//!
//! [`Client`] owns a cookie-borne session [`Credential`] and keeps it fresh
//! across requests; [`LoginHandoff`] obtains the first token through a
//! browser redirect to a local callback.

pub mod config;
pub mod error;
pub mod login;
pub mod ops;
pub mod session;
pub mod test_support;
pub mod transport;

pub use config::{ClientConfig, Endpoints};
pub use error::ApiError;
pub use login::{LoginHandoff, LoginOptions};
pub use ops::{
    CreateAgentRequest, CreateAgentResponse, InitPolicyRequest, InitPolicyResponse, SearchRequest,
    SearchResponse, SearchResultItem, Subject, WhoAmIResponse,
};
pub use session::{Credential, SetCookie};
pub use transport::{Client, RawResponse};
