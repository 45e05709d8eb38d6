// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `tollgate-core`: Session Domain Crate
//!
//! Holds the types every other Tollgate crate speaks in, plus the pure
//! access-control services built on them. Nothing in here touches the network.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Credential`, `Capability`, `SessionProfile`, `NavigationEntry`, `ApiError`, config manifest |
//! | [`application`] | Application | `PermissionSet` evaluator, `NavigationFilter` |
//!
//! The transport layer (`tollgate-sdk`) depends on this crate; this crate never
//! depends back on it.

pub mod application;
pub mod domain;

pub use application::{has_permission, NavigationFilter, PermissionDenied, PermissionSet};
pub use domain::*;
