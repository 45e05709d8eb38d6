// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod navigation;
pub mod permission;

pub use navigation::NavigationFilter;
pub use permission::{has_permission, PermissionDenied, PermissionSet};
