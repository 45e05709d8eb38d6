// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `tollgate request` - send one call through the authenticated pipeline

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use tollgate_core::HttpMethod;
use tollgate_sdk::{ApiRequest, ApiResponse};

use super::{load_config, open_session, LoginArgs};
use crate::session::AppSession;

#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    #[arg(value_name = "METHOD")]
    pub method: HttpMethod,

    /// Path relative to the configured base URL
    #[arg(value_name = "PATH")]
    pub path: String,

    /// JSON request body
    #[arg(short, long, value_name = "JSON")]
    pub data: Option<String>,

    /// Query parameters as key=value
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    #[command(flatten)]
    pub login: LoginArgs,
}

pub async fn handle_command(args: RequestArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;
    let session = open_session(config, &args.login).await?;

    let response = execute(&session, &args).await?;
    println!("{} {}", "✓".green(), format!("HTTP {}", response.status).bold());
    println!("{}", serde_json::to_string_pretty(&response.data)?);

    Ok(())
}

pub async fn execute(session: &AppSession, args: &RequestArgs) -> Result<ApiResponse> {
    let request = build_request(args)?;
    let response = session.client().send(request).await.with_context(|| {
        format!("{} {} failed", args.method, args.path)
    })?;
    Ok(response)
}

fn build_request(args: &RequestArgs) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(args.method, args.path.as_str());

    if let Some(data) = &args.data {
        let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.with_json(&body);
    }

    for pair in &args.query {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Query parameter '{}' must be key=value", pair))?;
        request = request.with_query(key, value);
    }

    Ok(request)
}
