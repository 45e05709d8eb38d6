// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod capability;
pub mod client_config;
pub mod credential;
pub mod errors;
pub mod navigation;
pub mod session;

pub use capability::{
    normalize_api_path, normalize_module, Capability, HttpMethod, NormalizedCapability,
    UnknownMethod, DYNAMIC_SEGMENT_MARKER,
};
pub use client_config::{AccessConfig, ApiConfig, AuthConfig, ClientConfig, ClientConfigManifest};
pub use credential::{Credential, CredentialStore};
pub use errors::{ApiError, FailureKind};
pub use navigation::NavigationEntry;
pub use session::{ProfileError, RoleRef, SessionProfile};
