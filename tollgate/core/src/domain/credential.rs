// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential Value Object
//!
//! A [`Credential`] is the short-lived bearer token attached to outgoing API calls.
//! It is opaque: the client never inspects or decodes it.
//!
//! ## Ownership
//!
//! Exactly one [`CredentialStore`] holds the current value. Only three paths may
//! write to it:
//!
//! | Writer | Operation |
//! |--------|-----------|
//! | Explicit login / registration | `set` |
//! | Refresh coordinator (successful renewal) | `set` |
//! | Explicit logout, terminal session expiry | `clear` |
//!
//! Every other component only reads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer token.
///
/// `Debug` and `Display` never print the token itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Holder of the current [`Credential`].
///
/// Implementations must make `set` and `clear` atomic with respect to `get`:
/// a reader observes either the previous value or the new one, never a mix.
pub trait CredentialStore: Send + Sync {
    /// Current credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replace the current credential.
    fn set(&self, credential: Credential);

    /// Drop the current credential.
    fn clear(&self);

    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}
