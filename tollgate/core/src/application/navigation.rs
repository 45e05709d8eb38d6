// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Navigation filtering.
//!
//! Derives the visible menu from the granted modules, using the same module
//! normalization as the permission evaluator. The output is always an ordered
//! subsequence of the input.

use std::collections::HashSet;

use crate::domain::capability::normalize_module;
use crate::domain::navigation::NavigationEntry;

use super::permission::PermissionSet;

#[derive(Debug, Clone, Default)]
pub struct NavigationFilter {
    granted_modules: HashSet<String>,
    bypass: bool,
}

impl NavigationFilter {
    pub fn new<I, S>(granted_modules: I, bypass: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let granted_modules = granted_modules
            .into_iter()
            .map(|module| normalize_module(module.as_ref()))
            .filter(|module| !module.is_empty())
            .collect();

        Self {
            granted_modules,
            bypass,
        }
    }

    pub fn from_permissions(permissions: &PermissionSet) -> Self {
        Self::new(permissions.granted_modules(), permissions.is_bypass())
    }

    pub fn is_visible(&self, entry: &NavigationEntry) -> bool {
        match &entry.required_module {
            None => true,
            Some(_) if self.bypass => true,
            // A blank module never matches, so such an entry stays hidden
            Some(module) => self.granted_modules.contains(&normalize_module(module)),
        }
    }

    pub fn filter<'e>(&self, entries: &'e [NavigationEntry]) -> Vec<&'e NavigationEntry> {
        entries.iter().filter(|entry| self.is_visible(entry)).collect()
    }
}
