// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Tollgate CLI

pub mod access;
pub mod config;
pub mod request;

pub use self::access::AccessCommand;
pub use self::config::ConfigCommand;
pub use self::request::RequestArgs;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tollgate_core::{ClientConfig, ClientConfigManifest};

use crate::session::AppSession;

/// Credentials used to log in before running a command
#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Log in as this user first
    #[arg(short, long, env = "TOLLGATE_USERNAME")]
    pub username: Option<String>,

    /// Password for --username
    #[arg(short, long, env = "TOLLGATE_PASSWORD", hide_env_values = true, requires = "username")]
    pub password: Option<String>,
}

/// Load, override and validate configuration for a command that talks to the API.
pub fn load_config(config_override: Option<PathBuf>) -> Result<ClientConfig> {
    let manifest = ClientConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    manifest
        .validate()
        .context("Configuration validation failed")?;
    Ok(manifest.spec)
}

/// Connect, logging in when credentials were given.
pub async fn open_session(config: ClientConfig, login: &LoginArgs) -> Result<AppSession> {
    let session = AppSession::connect(config)?;
    if let Some(username) = &login.username {
        let password = login.password.as_deref().unwrap_or_default();
        session.login(username, password).await?;
    }
    Ok(session)
}
