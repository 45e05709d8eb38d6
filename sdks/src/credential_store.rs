// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory credential store.

use parking_lot::RwLock;
use tollgate_core::{Credential, CredentialStore};

/// Process-local [`CredentialStore`].
///
/// Writes replace the whole value under the write lock, so readers never
/// observe a partial update.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a credential already present, e.g. one restored by the caller.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.slot.read().clone()
    }

    fn set(&self, credential: Credential) {
        *self.slot.write() = Some(credential);
    }

    fn clear(&self) {
        self.slot.write().take();
    }
}
