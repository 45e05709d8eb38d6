// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tollgate Rust SDK
//!
//! Authenticated HTTP client that keeps calls authorized across credential expiry.
//!
//! - [`ApiClient`] attaches the current credential to every call and recovers a
//!   401 by renewing once and retrying once.
//! - [`RefreshCoordinator`] collapses concurrent renewals into one request.
//! - [`SessionExpiryHandler`] is how the client reports a session it could not save.

pub mod client;
pub mod credential_store;
pub mod pipeline;
pub mod refresh;
pub mod request;
pub mod session_events;

pub use client::{ApiClient, ApiClientBuilder, ClientBuildError};
pub use credential_store::InMemoryCredentialStore;
pub use pipeline::{classify, Disposition};
pub use refresh::{RefreshCoordinator, RenewalFailure};
pub use request::{ApiRequest, ApiResponse, SKIP_AUTH_REFRESH_HEADER};
pub use session_events::{
    ExpiryReason, LoggingExpiryHandler, SessionEventBus, SessionExpired, SessionExpiryHandler,
};

pub use tollgate_core::{ApiError, Credential, CredentialStore, FailureKind};
