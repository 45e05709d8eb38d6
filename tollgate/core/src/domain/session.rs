// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Session Profile
//!
//! The identity service's view of the signed-in user: who they are, which role
//! they hold, and the flat list of [`Capability`] entries granted to them.
//!
//! The profile is consumed, never computed, by this crate. It is immutable for as
//! long as it is held; a refetch of the account produces a new profile.
//!
//! Permission entries are decoded leniently: an entry that does not fit the
//! [`Capability`] shape is dropped with a warning instead of failing the whole
//! profile, since a malformed grant can never match anything anyway.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::capability::Capability;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("No account object at JSON pointer '{0}'")]
    MissingAccount(String),

    #[error("Invalid account payload: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Role reference carried by the account payload.
///
/// Accepts either `{"_id": "...", "name": "ADMIN"}` or a bare `"ADMIN"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RoleWire")]
pub struct RoleRef {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleWire {
    Name(String),
    Object {
        #[serde(default, rename = "_id", alias = "id")]
        id: Option<String>,
        #[serde(default)]
        name: String,
    },
}

impl From<RoleWire> for RoleRef {
    fn from(wire: RoleWire) -> Self {
        match wire {
            RoleWire::Name(name) => RoleRef { id: None, name },
            RoleWire::Object { id, name } => RoleRef { id, name },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    #[serde(default, rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRef>,

    /// Granted capabilities. Malformed entries are skipped during decoding.
    #[serde(default, deserialize_with = "lenient_capabilities")]
    pub permissions: Vec<Capability>,
}

impl SessionProfile {
    /// Decode the profile found at `pointer` inside an account response body.
    ///
    /// An empty pointer selects the whole body.
    pub fn from_account(body: &Value, pointer: &str) -> Result<Self, ProfileError> {
        let account = body
            .pointer(pointer)
            .ok_or_else(|| ProfileError::MissingAccount(pointer.to_string()))?;
        Ok(Self::deserialize(account)?)
    }

    /// Whether the profile's role is one of the configured bypass roles
    /// (compared case-insensitively).
    pub fn is_bypass(&self, bypass_roles: &[String]) -> bool {
        match &self.role {
            Some(role) => bypass_roles
                .iter()
                .any(|bypass| bypass.trim().eq_ignore_ascii_case(role.name.trim())),
            None => false,
        }
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }
}

fn lenient_capabilities<'de, D>(deserializer: D) -> Result<Vec<Capability>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let capabilities = raw
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Capability>(entry.clone()) {
            Ok(capability) => Some(capability),
            Err(e) => {
                warn!("Skipping malformed permission entry {}: {}", entry, e);
                None
            }
        })
        .collect();
    Ok(capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capability::HttpMethod;
    use serde_json::json;

    fn account_body() -> Value {
        json!({
            "statusCode": 200,
            "message": "Get user account",
            "data": {
                "user": {
                    "_id": "6478a1f0c2b1e4d5f6a7b8c9",
                    "email": "hr@example.com",
                    "name": "HR Manager",
                    "role": { "_id": "6478a1f0c2b1e4d5f6a7b800", "name": "HR" },
                    "permissions": [
                        { "_id": "p1", "name": "List jobs", "apiPath": "/api/v1/jobs", "method": "GET", "module": "JOBS" },
                        { "_id": "p2", "name": "Broken", "apiPath": "/api/v1/jobs", "method": "FETCH", "module": "JOBS" },
                        { "_id": "p3", "name": "Missing path", "method": "GET", "module": "JOBS" },
                        { "_id": "p4", "name": "Update role", "apiPath": "/api/v1/roles/:id", "method": "PATCH", "module": "ROLES" }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_from_account_skips_malformed_permissions() {
        let profile = SessionProfile::from_account(&account_body(), "/data/user").unwrap();

        assert_eq!(profile.email.as_deref(), Some("hr@example.com"));
        assert_eq!(profile.role_name(), Some("HR"));
        assert_eq!(profile.permissions.len(), 2);
        assert_eq!(profile.permissions[1].method, HttpMethod::Patch);
    }

    #[test]
    fn test_missing_pointer_is_an_error() {
        let result = SessionProfile::from_account(&account_body(), "/data/account");
        assert!(matches!(result, Err(ProfileError::MissingAccount(_))));
    }

    #[test]
    fn test_role_as_plain_string() {
        let profile: SessionProfile = serde_json::from_value(json!({
            "role": "super_admin",
            "permissions": null
        }))
        .unwrap();

        assert!(profile.permissions.is_empty());
        assert!(profile.is_bypass(&["SUPER_ADMIN".to_string()]));
        assert!(!profile.is_bypass(&["ADMIN".to_string()]));
    }

    #[test]
    fn test_no_role_never_bypasses() {
        let profile = SessionProfile::default();
        assert!(!profile.is_bypass(&["SUPER_ADMIN".to_string()]));
    }
}
