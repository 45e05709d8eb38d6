// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

/// One item of the statically authored navigation menu.
///
/// Entries without `required_module` are always visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub label: String,
    pub route: String,
    #[serde(default, alias = "requiredModule", skip_serializing_if = "Option::is_none")]
    pub required_module: Option<String>,
}

impl NavigationEntry {
    pub fn new(label: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            route: route.into(),
            required_module: None,
        }
    }

    pub fn gated(label: impl Into<String>, route: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            route: route.into(),
            required_module: Some(module.into()),
        }
    }

    pub fn is_gated(&self) -> bool {
        self.required_module.is_some()
    }
}
