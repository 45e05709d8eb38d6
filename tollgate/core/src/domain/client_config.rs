// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Client Configuration Types
//
// Defines the configuration schema for a Tollgate session client:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - API base URL and per-call timeout
// - Auth endpoint layout and token locations in response bodies
// - Bypass roles for the permission evaluator
// - Static navigation menu

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::navigation::NavigationEntry;

pub const API_VERSION: &str = "tollgate.dev/v1";
pub const KIND: &str = "ClientConfig";

/// Top-level Kubernetes-style client configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfigManifest {
    /// API version (must be "tollgate.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ClientConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ClientConfig,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Client configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub access: AccessConfig,

    /// Ordered navigation menu; order is preserved by the navigation filter
    #[serde(default)]
    pub navigation: Vec<NavigationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, e.g. "http://localhost:8000"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every network call, renewal included
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_register_path")]
    pub register_path: String,

    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Renewal endpoint. Called with the cookie jar, never with the bearer header.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    #[serde(default = "default_account_path")]
    pub account_path: String,

    /// JSON pointer to the access token in login and renewal responses
    #[serde(default = "default_token_pointer")]
    pub token_pointer: String,

    /// JSON pointer to the user object in the account response
    #[serde(default = "default_account_pointer")]
    pub account_pointer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Role names that skip capability checks entirely
    #[serde(default = "default_bypass_roles")]
    pub bypass_roles: Vec<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_register_path() -> String {
    "/auth/register".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_account_path() -> String {
    "/auth/account".to_string()
}

fn default_token_pointer() -> String {
    "/data/access_token".to_string()
}

fn default_account_pointer() -> String {
    "/data/user".to_string()
}

fn default_bypass_roles() -> Vec<String> {
    vec!["SUPER_ADMIN".to_string()]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            register_path: default_register_path(),
            logout_path: default_logout_path(),
            refresh_path: default_refresh_path(),
            account_path: default_account_path(),
            token_pointer: default_token_pointer(),
            account_pointer: default_account_pointer(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            bypass_roles: default_bypass_roles(),
        }
    }
}

impl AuthConfig {
    /// Endpoints that issue credentials from user-supplied secrets. A 401 from
    /// these means the secrets were wrong, not that a session expired.
    pub fn credential_issuing_paths(&self) -> [&str; 2] {
        [self.login_path.as_str(), self.register_path.as_str()]
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!(
                "spec.api.base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            );
        }

        if self.api.timeout_seconds == 0 {
            anyhow::bail!("spec.api.timeout_seconds must be greater than zero");
        }

        let paths = [
            ("login_path", &self.auth.login_path),
            ("register_path", &self.auth.register_path),
            ("logout_path", &self.auth.logout_path),
            ("refresh_path", &self.auth.refresh_path),
            ("account_path", &self.auth.account_path),
        ];
        for (field, path) in paths {
            if !path.starts_with('/') {
                anyhow::bail!("spec.auth.{} must start with '/', got '{}'", field, path);
            }
        }

        let pointers = [
            ("token_pointer", &self.auth.token_pointer),
            ("account_pointer", &self.auth.account_pointer),
        ];
        for (field, pointer) in pointers {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                anyhow::bail!(
                    "spec.auth.{} must be a JSON pointer (empty or starting with '/'), got '{}'",
                    field,
                    pointer
                );
            }
        }

        for (index, entry) in self.navigation.iter().enumerate() {
            if entry.label.trim().is_empty() {
                anyhow::bail!("spec.navigation[{}].label cannot be empty", index);
            }
            if entry.route.trim().is_empty() {
                anyhow::bail!("spec.navigation[{}].route cannot be empty", index);
            }
        }

        Ok(())
    }
}

impl Default for ClientConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "default-client".to_string(),
                labels: None,
            },
            spec: ClientConfig::default(),
        }
    }
}

impl ClientConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TOLLGATE_CONFIG_PATH environment variable
    /// 2. ./tollgate-config.yaml (working directory)
    /// 3. ~/.tollgate/config.yaml (user home)
    /// 4. /etc/tollgate/config.yaml (system, Unix) or C:\ProgramData\Tollgate\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TOLLGATE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./tollgate-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tollgate").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/tollgate/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Tollgate\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TOLLGATE_BASE_URL") {
            if val.trim().is_empty() {
                tracing::warn!("Ignoring empty TOLLGATE_BASE_URL");
            } else {
                tracing::info!("Environment override: TOLLGATE_BASE_URL={}", val);
                self.spec.api.base_url = val;
            }
        }

        if let Ok(val) = std::env::var("TOLLGATE_TIMEOUT_SECONDS") {
            match val.trim().parse::<u64>() {
                Ok(seconds) if seconds > 0 => {
                    tracing::info!("Environment override: TOLLGATE_TIMEOUT_SECONDS={}", seconds);
                    self.spec.api.timeout_seconds = seconds;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for TOLLGATE_TIMEOUT_SECONDS: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = ClientConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.api.timeout_seconds, 10);
        assert_eq!(manifest.spec.auth.refresh_path, "/auth/refresh");
        assert_eq!(manifest.spec.auth.token_pointer, "/data/access_token");
        assert!(manifest.spec.navigation.is_empty());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_with_partial_spec_fills_defaults() {
        let yaml = r#"
apiVersion: tollgate.dev/v1
kind: ClientConfig
metadata:
  name: recruiting-admin
spec:
  api:
    base_url: https://api.example.com/api/v1
  navigation:
    - label: Dashboard
      route: /admin
    - label: Jobs
      route: /admin/job
      required_module: JOBS
    - label: Roles
      route: /admin/role
      requiredModule: ROLES
"#;
        let manifest = ClientConfigManifest::from_yaml_str(yaml).unwrap();

        assert_eq!(manifest.metadata.name, "recruiting-admin");
        assert_eq!(manifest.spec.api.base_url, "https://api.example.com/api/v1");
        assert_eq!(manifest.spec.api.timeout_seconds, 10);
        assert_eq!(manifest.spec.auth.login_path, "/auth/login");
        assert_eq!(manifest.spec.access.bypass_roles, vec!["SUPER_ADMIN".to_string()]);
        assert_eq!(manifest.spec.navigation.len(), 3);
        assert_eq!(manifest.spec.navigation[2].required_module.as_deref(), Some("ROLES"));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut manifest = ClientConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.api.base_url = "localhost:8000".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.api.base_url = "http://localhost:8000".to_string();

        manifest.spec.api.timeout_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.api.timeout_seconds = 10;

        manifest.spec.auth.refresh_path = "auth/refresh".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.auth.refresh_path = "/auth/refresh".to_string();

        manifest.spec.auth.token_pointer = "data.access_token".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.auth.token_pointer = "/data/access_token".to_string();

        manifest.spec.navigation.push(NavigationEntry::new("", "/admin"));
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate-config.yaml");

        let mut manifest = ClientConfigManifest::default();
        manifest.spec.navigation = vec![NavigationEntry::gated("Users", "/admin/user", "USERS")];
        manifest.to_yaml_file(&path).unwrap();

        let loaded = ClientConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.navigation, manifest.spec.navigation);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = ClientConfigManifest::load_or_default(Some(PathBuf::from("/nonexistent/tollgate.yaml")));
        assert!(result.is_err());
    }
}
