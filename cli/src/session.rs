// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application-layer session state
//!
//! Owns the [`ApiClient`] and registers the expiry handler with it. The client
//! reports every call that ends in terminal expiry; this layer turns a burst of
//! those into a single re-authentication notice.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::{info, warn};

use tollgate_core::{ClientConfig, NavigationFilter, PermissionSet, SessionProfile};
use tollgate_sdk::{ApiClient, InMemoryCredentialStore, SessionExpired, SessionExpiryHandler};

/// Collapses simultaneous expiry reports into one notice until the next login.
#[derive(Debug, Default)]
pub struct ExpiryNotice {
    expired: AtomicBool,
    reports: AtomicUsize,
    notices: AtomicUsize,
}

impl ExpiryNotice {
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Expiry reports received from the client.
    pub fn reports(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }

    /// Notices actually shown to the user.
    pub fn notices(&self) -> usize {
        self.notices.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.expired.store(false, Ordering::SeqCst);
    }
}

impl SessionExpiryHandler for ExpiryNotice {
    fn session_expired(&self, event: &SessionExpired) {
        self.reports.fetch_add(1, Ordering::SeqCst);
        if self.expired.swap(true, Ordering::SeqCst) {
            return;
        }

        self.notices.fetch_add(1, Ordering::SeqCst);
        warn!(method = %event.method, path = %event.path, "Session expired");
        eprintln!(
            "{}",
            "Session expired. Log in again with --username/--password.".yellow()
        );
    }
}

pub struct AppSession {
    client: ApiClient,
    notice: Arc<ExpiryNotice>,
    config: ClientConfig,
}

impl AppSession {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let notice = Arc::new(ExpiryNotice::default());
        let client = ApiClient::builder(config.clone())
            .credential_store(Arc::new(InMemoryCredentialStore::new()))
            .on_session_expired(notice.clone())
            .build()
            .context("Failed to build API client")?;

        Ok(Self {
            client,
            notice,
            config,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn notice(&self) -> &ExpiryNotice {
        &self.notice
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.client
            .login(&json!({ "username": username, "password": password }))
            .await
            .with_context(|| format!("Login failed for '{}'", username))?;
        self.notice.reset();
        info!("Logged in as {}", username);
        Ok(())
    }

    /// Fetch the live profile and derive its permission set.
    pub async fn permissions(&self) -> Result<(SessionProfile, PermissionSet)> {
        let profile = self
            .client
            .fetch_account()
            .await
            .context("Failed to fetch account")?;
        let permissions = PermissionSet::from_profile(&profile, &self.config.access);
        Ok((profile, permissions))
    }

    pub fn navigation(&self, permissions: &PermissionSet) -> Vec<String> {
        visible_labels(&self.config, permissions)
    }
}

/// Labels of the configured navigation entries visible under `permissions`.
pub fn visible_labels(config: &ClientConfig, permissions: &PermissionSet) -> Vec<String> {
    NavigationFilter::from_permissions(permissions)
        .filter(&config.navigation)
        .into_iter()
        .map(|entry| entry.label.clone())
        .collect()
}

/// Load a saved profile. Accepts either the full account response or the bare
/// profile object.
pub fn load_profile_file(path: &Path, config: &ClientConfig) -> Result<SessionProfile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {:?}", path))?;
    let body: Value = serde_json::from_str(&content)
        .with_context(|| format!("Profile {:?} is not valid JSON", path))?;

    match SessionProfile::from_account(&body, &config.auth.account_pointer) {
        Ok(profile) => Ok(profile),
        Err(_) => serde_json::from_value(body)
            .with_context(|| format!("Profile {:?} has no recognizable account", path)),
    }
}
