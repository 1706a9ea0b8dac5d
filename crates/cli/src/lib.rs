// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod browser;
pub mod command;
pub mod config;
pub mod settings;
pub mod test_support;
