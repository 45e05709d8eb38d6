// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use tollgate_core::{ClientConfigManifest, NavigationEntry};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./tollgate-config.yaml)
        #[arg(short, long, default_value = "./tollgate-config.yaml")]
        output: PathBuf,

        /// Include a sample navigation menu and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let manifest = ClientConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;
    let config = &manifest.spec;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. TOLLGATE_CONFIG_PATH: {}",
            std::env::var("TOLLGATE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./tollgate-config.yaml");
        println!("  4. ~/.tollgate/config.yaml");
        println!("  5. /etc/tollgate/config.yaml");
        println!();
    }

    println!("{} {}", "Current configuration:".bold(), manifest.metadata.name);
    println!();

    println!("{}", "API:".bold());
    println!("  Base URL: {}", config.api.base_url);
    println!("  Timeout: {}s", config.api.timeout_seconds);
    println!();

    println!("{}", "Auth endpoints:".bold());
    println!("  Login: {}", config.auth.login_path);
    println!("  Register: {}", config.auth.register_path);
    println!("  Logout: {}", config.auth.logout_path);
    println!("  Refresh: {}", config.auth.refresh_path);
    println!("  Account: {}", config.auth.account_path);
    println!("  Token pointer: {}", config.auth.token_pointer);
    println!("  Account pointer: {}", config.auth.account_pointer);
    println!();

    println!("{}", "Access:".bold());
    println!("  Bypass roles: {}", config.access.bypass_roles.join(", "));
    println!();

    println!("{} {}", "Navigation:".bold(), navigation_summary(&config.navigation));
    if config.navigation.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for entry in &config.navigation {
        match &entry.required_module {
            Some(module) => println!("  {} → {} [{}]", entry.label, entry.route, module),
            None => println!("  {} → {}", entry.label, entry.route),
        }
    }
    println!();

    Ok(())
}

fn navigation_summary(entries: &[NavigationEntry]) -> String {
    let gated = entries.iter().filter(|entry| entry.is_gated()).count();
    format!("{} entries, {} gated", entries.len(), gated)
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let manifest = ClientConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    manifest
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_templates_are_valid() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let manifest = ClientConfigManifest::from_yaml_str(template).unwrap();
            manifest.validate().unwrap();
        }
    }

    #[test]
    fn test_navigation_summary_counts_gated_entries() {
        let entries = [
            NavigationEntry::new("Dashboard", "/admin"),
            NavigationEntry::gated("Jobs", "/admin/jobs", "JOBS"),
            NavigationEntry::gated("Roles", "/admin/roles", "ROLES"),
        ];
        assert_eq!(navigation_summary(&entries), "3 entries, 2 gated");
        assert_eq!(navigation_summary(&[]), "0 entries, 0 gated");
    }

    #[tokio::test]
    async fn test_generate_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tollgate-config.yaml");

        generate(output.clone(), true).await.unwrap();

        let manifest = ClientConfigManifest::from_yaml_file(&output).unwrap();
        assert_eq!(manifest.spec.navigation.len(), 7);
    }
}
