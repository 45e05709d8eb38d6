// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Permission Evaluator
//!
//! Decides whether the signed-in identity may perform a requested action.
//!
//! ## Evaluation Order
//!
//! 1. Bypass role → allow.
//! 2. Empty granted list → deny (fail closed).
//! 3. Allow iff some granted capability has the same method, the same module
//!    (case-insensitive) and the same normalized path as the request.
//!
//! Evaluation is total: malformed input never errors, it just fails to match.
//! [`PermissionSet::check`] wraps a denial in [`PermissionDenied`] for callers that
//! want an error value, but the evaluator itself only ever returns booleans.
//!
//! [`has_permission`] is the one-shot form over a borrowed slice. [`PermissionSet`]
//! normalizes the granted list once and is meant to live as long as the session.

use std::collections::{BTreeSet, HashSet};

use crate::domain::capability::{normalize_module, Capability, NormalizedCapability};
use crate::domain::client_config::AccessConfig;
use crate::domain::session::SessionProfile;

/// Advisory denial for UI callers. Never produced by the boolean evaluators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Permission denied: {capability}")]
pub struct PermissionDenied {
    pub capability: Capability,
}

/// Evaluate one request against a borrowed granted list.
pub fn has_permission(requested: &Capability, granted: &[Capability], bypass: bool) -> bool {
    if bypass {
        return true;
    }
    if granted.is_empty() {
        return false;
    }

    let requested = requested.normalized();
    if !requested.is_well_formed() {
        return false;
    }

    granted.iter().any(|capability| {
        let candidate = capability.normalized();
        candidate.is_well_formed()
            && candidate.method == requested.method
            && candidate.module == requested.module
            && candidate.path == requested.path
    })
}

/// Pre-normalized granted capabilities of one session.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: HashSet<NormalizedCapability>,
    modules: BTreeSet<String>,
    bypass: bool,
}

impl PermissionSet {
    pub fn new(granted: &[Capability], bypass: bool) -> Self {
        let granted: HashSet<NormalizedCapability> = granted
            .iter()
            .map(Capability::normalized)
            .filter(NormalizedCapability::is_well_formed)
            .collect();
        let modules = granted.iter().map(|c| c.module.clone()).collect();

        Self {
            granted,
            modules,
            bypass,
        }
    }

    /// Build from the identity service's profile, deriving the bypass flag from
    /// the configured bypass roles.
    pub fn from_profile(profile: &SessionProfile, access: &AccessConfig) -> Self {
        Self::new(&profile.permissions, profile.is_bypass(&access.bypass_roles))
    }

    /// A set that grants everything.
    pub fn unrestricted() -> Self {
        Self {
            bypass: true,
            ..Self::default()
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    /// Number of distinct well-formed grants.
    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    /// Upper-cased names of every module with at least one grant.
    pub fn granted_modules(&self) -> &BTreeSet<String> {
        &self.modules
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(&normalize_module(module))
    }

    pub fn can(&self, requested: &Capability) -> bool {
        if self.bypass {
            return true;
        }
        if self.granted.is_empty() {
            return false;
        }

        let requested = requested.normalized();
        requested.is_well_formed() && self.granted.contains(&requested)
    }

    /// True iff at least one requested capability is granted. False for an empty list.
    pub fn any<'a>(&self, requested: impl IntoIterator<Item = &'a Capability>) -> bool {
        requested.into_iter().any(|capability| self.can(capability))
    }

    /// True iff every requested capability is granted. True for an empty list.
    pub fn all<'a>(&self, requested: impl IntoIterator<Item = &'a Capability>) -> bool {
        requested.into_iter().all(|capability| self.can(capability))
    }

    pub fn check(&self, requested: &Capability) -> Result<(), PermissionDenied> {
        if self.can(requested) {
            Ok(())
        } else {
            Err(PermissionDenied {
                capability: requested.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capability::HttpMethod;

    fn roles_by_id() -> Capability {
        Capability::new(HttpMethod::Get, "/roles/:id", "ROLES")
    }

    #[test]
    fn test_dynamic_segments_match_concrete_ids() {
        let granted = vec![roles_by_id()];
        let set = PermissionSet::new(&granted, false);

        for requested in [
            Capability::new(HttpMethod::Get, "/roles/64f9a3", "ROLES"),
            Capability::new(HttpMethod::Get, "/roles/000000", "ROLES"),
        ] {
            assert!(set.can(&requested));
            assert!(has_permission(&requested, &granted, false));
        }

        let delete = Capability::new(HttpMethod::Delete, "/roles/64f9a3", "ROLES");
        assert!(!set.can(&delete));
        assert!(!has_permission(&delete, &granted, false));
    }

    #[test]
    fn test_module_comparison_ignores_case() {
        let set = PermissionSet::new(&[roles_by_id()], false);
        assert!(set.can(&Capability::new(HttpMethod::Get, "/roles/12", "roles")));
        assert!(!set.can(&Capability::new(HttpMethod::Get, "/roles/12", "USERS")));
    }

    #[test]
    fn test_all_three_fields_must_match_on_one_grant() {
        // Method from one grant, path from another: no single grant covers it
        let granted = vec![
            Capability::new(HttpMethod::Post, "/jobs", "JOBS"),
            Capability::new(HttpMethod::Get, "/jobs/:id", "JOBS"),
        ];
        let set = PermissionSet::new(&granted, false);
        let requested = Capability::new(HttpMethod::Post, "/jobs/42", "JOBS");

        assert!(!set.can(&requested));
        assert!(!has_permission(&requested, &granted, false));
    }

    #[test]
    fn test_empty_grant_list_fails_closed() {
        let set = PermissionSet::new(&[], false);
        assert!(!set.can(&roles_by_id()));
        assert!(!has_permission(&roles_by_id(), &[], false));
    }

    #[test]
    fn test_bypass_grants_everything() {
        let anything = Capability::new(HttpMethod::Delete, "/users/1", "USERS");

        assert!(PermissionSet::new(&[], true).can(&anything));
        assert!(PermissionSet::unrestricted().can(&anything));
        assert!(has_permission(&anything, &[], true));
        assert!(has_permission(&anything, &[roles_by_id()], true));
    }

    #[test]
    fn test_malformed_entries_never_match() {
        let granted = vec![
            Capability::new(HttpMethod::Get, "", ""),
            Capability::new(HttpMethod::Get, "/jobs", "  "),
        ];
        let set = PermissionSet::new(&granted, false);

        assert!(set.is_empty());
        assert!(!set.can(&Capability::new(HttpMethod::Get, "", "")));
        assert!(!has_permission(&Capability::new(HttpMethod::Get, "", ""), &granted, false));
        assert!(!has_permission(&Capability::new(HttpMethod::Get, "/jobs", " "), &granted, false));
    }

    #[test]
    fn test_any_and_all() {
        let set = PermissionSet::new(&[roles_by_id()], false);
        let allowed = Capability::new(HttpMethod::Get, "/roles/7", "ROLES");
        let denied = Capability::new(HttpMethod::Patch, "/roles/7", "ROLES");

        assert!(set.any([&denied, &allowed]));
        assert!(!set.any([&denied]));
        assert!(!set.any(std::iter::empty::<&Capability>()));

        assert!(set.all([&allowed]));
        assert!(!set.all([&allowed, &denied]));
        assert!(set.all(std::iter::empty::<&Capability>()));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let set = PermissionSet::new(&[roles_by_id()], false);
        let requested = Capability::new(HttpMethod::Get, "/roles/64f9a3", "ROLES");
        let first = set.can(&requested);
        assert!((0..100).all(|_| set.can(&requested) == first));
    }

    #[test]
    fn test_check_returns_advisory_denial() {
        let set = PermissionSet::new(&[roles_by_id()], false);
        let denied = Capability::new(HttpMethod::Delete, "/roles/1", "ROLES");

        assert!(set.check(&roles_by_id()).is_ok());
        let err = set.check(&denied).unwrap_err();
        assert_eq!(err.capability, denied);
        assert_eq!(err.to_string(), "Permission denied: DELETE /roles/1 [ROLES]");
    }

    #[test]
    fn test_granted_modules_are_upper_cased() {
        let set = PermissionSet::new(
            &[
                Capability::new(HttpMethod::Get, "/jobs", "jobs"),
                Capability::new(HttpMethod::Get, "/users", "Users"),
            ],
            false,
        );

        let modules: Vec<&str> = set.granted_modules().iter().map(String::as_str).collect();
        assert_eq!(modules, vec!["JOBS", "USERS"]);
        assert!(set.has_module("users"));
    }
}
