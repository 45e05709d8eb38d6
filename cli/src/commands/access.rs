// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Access commands
//!
//! Commands: check, nav
//!
//! Both evaluate against a profile, read either from a saved JSON file
//! (`--profile`) or fetched live from the account endpoint.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use tollgate_core::{Capability, ClientConfig, HttpMethod, PermissionSet, SessionProfile};

use super::{load_config, open_session, LoginArgs};
use crate::session::{load_profile_file, visible_labels};

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileSource {
    /// Saved account response or profile JSON (default: fetch live)
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    #[command(flatten)]
    pub login: LoginArgs,
}

#[derive(Subcommand)]
pub enum AccessCommand {
    /// Check whether the profile may perform one action
    Check {
        #[arg(value_name = "METHOD")]
        method: HttpMethod,

        #[arg(value_name = "PATH")]
        path: String,

        #[arg(value_name = "MODULE")]
        module: String,

        #[command(flatten)]
        source: ProfileSource,
    },

    /// Show the navigation menu visible to the profile
    Nav {
        #[command(flatten)]
        source: ProfileSource,
    },
}

pub async fn handle_command(command: AccessCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_override)?;

    match command {
        AccessCommand::Check {
            method,
            path,
            module,
            source,
        } => {
            let permissions = resolve_permissions(&config, &source).await?;
            let capability = Capability::new(method, path, module);
            check(&permissions, &capability)
        }
        AccessCommand::Nav { source } => {
            let permissions = resolve_permissions(&config, &source).await?;
            for label in visible_labels(&config, &permissions) {
                println!("  {}", label);
            }
            Ok(())
        }
    }
}

fn check(permissions: &PermissionSet, capability: &Capability) -> Result<()> {
    if permissions.is_bypass() {
        println!("{} {} (bypass role)", "✓".green(), capability);
        return Ok(());
    }

    permissions.check(capability)?;
    println!("{} {}", "✓".green(), capability);
    Ok(())
}

async fn resolve_permissions(config: &ClientConfig, source: &ProfileSource) -> Result<PermissionSet> {
    let profile = load_profile(config, source).await?;
    let permissions = PermissionSet::from_profile(&profile, &config.access);
    println!(
        "{} {} ({}, {})",
        "Profile:".bold(),
        profile.email.as_deref().unwrap_or("(unknown)"),
        profile.role_name().unwrap_or("no role"),
        describe_grants(&permissions)
    );
    Ok(permissions)
}

fn describe_grants(permissions: &PermissionSet) -> String {
    if permissions.is_bypass() {
        return "all capabilities".to_string();
    }
    format!(
        "{} grants across {} modules",
        permissions.len(),
        permissions.granted_modules().len()
    )
}

async fn load_profile(config: &ClientConfig, source: &ProfileSource) -> Result<SessionProfile> {
    if let Some(path) = &source.profile {
        return load_profile_file(path, config);
    }

    let session = open_session(config.clone(), &source.login).await?;
    let (profile, _) = session
        .permissions()
        .await
        .context("Pass --profile or --username/--password")?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_denial() {
        let permissions = PermissionSet::new(
            &[Capability::new(HttpMethod::Get, "/api/v1/jobs/:id", "JOBS")],
            false,
        );

        assert!(check(
            &permissions,
            &Capability::new(HttpMethod::Get, "/api/v1/jobs/42", "jobs")
        )
        .is_ok());

        let err = check(
            &permissions,
            &Capability::new(HttpMethod::Delete, "/api/v1/jobs/42", "JOBS"),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Permission denied"));
    }

    #[test]
    fn test_describe_grants() {
        let permissions = PermissionSet::new(
            &[
                Capability::new(HttpMethod::Get, "/api/v1/jobs", "JOBS"),
                Capability::new(HttpMethod::Patch, "/api/v1/jobs/:id", "JOBS"),
                Capability::new(HttpMethod::Get, "/api/v1/users", "USERS"),
            ],
            false,
        );
        assert_eq!(describe_grants(&permissions), "3 grants across 2 modules");
        assert_eq!(describe_grants(&PermissionSet::unrestricted()), "all capabilities");
    }
}
