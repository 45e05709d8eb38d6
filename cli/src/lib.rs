// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tollgate CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Application Layer
//! - **Purpose:** Owns user-facing session state and wires it into the SDK client

pub mod commands;
pub mod session;
