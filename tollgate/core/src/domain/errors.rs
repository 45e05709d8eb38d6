// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Normalized API Error
//!
//! Every failure the transport layer hands back to a caller has the same shape,
//! `{status?, data?, message?}`, tagged with a [`FailureKind`] from the error
//! taxonomy. Recoverable failures (a 401 fixed by one renewal) never reach callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a failure as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Renewal failed or the renewal secret was rejected. The credential has been
    /// cleared and the session-expiry handler notified.
    TerminalSessionExpiry,
    /// No response was received (connection error or timeout).
    NetworkFailure,
    /// 401 from a credential-issuing endpoint: the submitted credentials are wrong.
    InvalidCredentials,
    /// 403 from the backend.
    PermissionDenied,
    /// Any other non-success status.
    Http,
    /// A response arrived but its body was not what the caller asked for.
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::TerminalSessionExpiry => "session expired",
            FailureKind::NetworkFailure => "network failure",
            FailureKind::InvalidCredentials => "invalid credentials",
            FailureKind::PermissionDenied => "permission denied",
            FailureKind::Http => "http error",
            FailureKind::Decode => "decode error",
        };
        f.write_str(name)
    }
}

/// The normalized error every caller receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {}", describe(.message, .status))]
pub struct ApiError {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Build the error for a non-success response.
    ///
    /// `message` comes from the body's `message` field when the backend supplied one.
    pub fn from_response(kind: FailureKind, status: u16, data: Value) -> Self {
        let message = message_from_body(&data);
        Self {
            kind,
            status: Some(status),
            data: (!data.is_null()).then_some(data),
            message,
        }
    }

    /// Build the error for a non-success response, picking the kind from the status.
    pub fn from_status(status: u16, data: Value) -> Self {
        let kind = match status {
            403 => FailureKind::PermissionDenied,
            _ => FailureKind::Http,
        };
        Self::from_response(kind, status, data)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NetworkFailure,
            status: None,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn decode(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Decode,
            status,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Re-tag this error as a terminal session expiry, keeping status and body.
    pub fn into_session_expired(mut self, reason: impl Into<String>) -> Self {
        self.kind = FailureKind::TerminalSessionExpiry;
        self.message = Some(reason.into());
        self
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == FailureKind::TerminalSessionExpiry
    }
}

fn describe(message: &Option<String>, status: &Option<u16>) -> String {
    match (message, status) {
        (Some(message), Some(status)) => format!("HTTP {}: {}", status, message),
        (Some(message), None) => message.clone(),
        (None, Some(status)) => format!("HTTP {}", status),
        (None, None) => "no details".to_string(),
    }
}

fn message_from_body(data: &Value) -> Option<String> {
    match data.get("message") {
        Some(Value::String(message)) => Some(message.clone()),
        // Validation errors often come back as a list of messages
        Some(Value::Array(items)) => {
            let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!joined.is_empty()).then(|| joined.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_taken_from_body() {
        let error = ApiError::from_status(404, json!({"statusCode": 404, "message": "Job not found"}));
        assert_eq!(error.kind, FailureKind::Http);
        assert_eq!(error.status, Some(404));
        assert_eq!(error.message.as_deref(), Some("Job not found"));
        assert_eq!(error.to_string(), "http error: HTTP 404: Job not found");
    }

    #[test]
    fn test_message_list_is_joined() {
        let error = ApiError::from_status(422, json!({"message": ["email must be an email", "name should not be empty"]}));
        assert_eq!(
            error.message.as_deref(),
            Some("email must be an email; name should not be empty")
        );
    }

    #[test]
    fn test_forbidden_maps_to_permission_denied() {
        let error = ApiError::from_status(403, Value::Null);
        assert_eq!(error.kind, FailureKind::PermissionDenied);
        assert!(error.data.is_none());
        assert!(error.message.is_none());
    }

    #[test]
    fn test_serialized_shape_omits_missing_fields() {
        let error = ApiError::network("request timed out");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value, json!({"kind": "network_failure", "message": "request timed out"}));
    }

    #[test]
    fn test_session_expired_keeps_status() {
        let error = ApiError::from_status(401, json!({"message": "Unauthorized"}))
            .into_session_expired("renewal rejected");
        assert!(error.is_session_expired());
        assert_eq!(error.status, Some(401));
        assert_eq!(error.message.as_deref(), Some("renewal rejected"));
    }
}
