// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Single-Flight Credential Renewal
//
// However many calls fail with 401 at once, at most one renewal request is on the
// wire. The first entrant stores a shared future in the in-flight slot; every later
// entrant clones it and awaits the same outcome. Joining and starting are decided
// under one lock, so they never both happen for the same entrant.
//
// The slot is released by a guard inside the renewal future, after the new
// credential has been written. Failure, early return and cancellation all release
// it, so one bad renewal never blocks the next.
//
// A 401 that arrives after a renewal already finished does not start another one
// when the store holds a credential other than the one the call was sent with.
// Nor does it when the last renewal failed for that same credential: the late
// caller gets the recorded failure, so a rejected secret is presented only once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_core::{Credential, CredentialStore};
use tracing::{debug, info, warn};

use crate::request::SKIP_AUTH_REFRESH_HEADER;

/// Outcome every waiter observes when a renewal does not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenewalFailure {
    #[error("Renewal secret rejected (HTTP {status})")]
    SecretRejected { status: u16 },

    #[error("Renewal endpoint returned HTTP {status}")]
    Rejected { status: u16 },

    #[error("Renewal response has no token at '{pointer}'")]
    MissingToken { pointer: String },

    #[error("Renewal response is not JSON: {message}")]
    Malformed { message: String },

    #[error("Renewal endpoint unreachable: {message}")]
    Unreachable { message: String },
}

type RenewalFuture = Shared<BoxFuture<'static, Result<Credential, RenewalFailure>>>;

/// The credential a failed renewal was started for, with the failure it produced.
type FailedRenewal = (Option<Credential>, RenewalFailure);

struct CoordinatorInner {
    http: reqwest::Client,
    refresh_url: String,
    token_pointer: String,
    store: Arc<dyn CredentialStore>,
    in_flight: Mutex<Option<(u64, RenewalFuture)>>,
    last_failure: Mutex<Option<FailedRenewal>>,
    next_id: AtomicU64,
    renewals: AtomicU64,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    /// `http` should share the client's cookie jar; the renewal secret travels as a cookie.
    pub fn new(
        http: reqwest::Client,
        refresh_url: impl Into<String>,
        token_pointer: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                http,
                refresh_url: refresh_url.into(),
                token_pointer: token_pointer.into(),
                store,
                in_flight: Mutex::new(None),
                last_failure: Mutex::new(None),
                next_id: AtomicU64::new(0),
                renewals: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain a credential newer than `stale`, renewing at most once concurrently.
    ///
    /// `stale` is the credential the failing call was sent with (`None` if it was
    /// sent unauthenticated).
    pub async fn refresh(&self, stale: Option<&Credential>) -> Result<Credential, RenewalFailure> {
        let renewal = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some((id, in_flight)) => {
                    debug!(renewal = id, "Joining in-flight credential renewal");
                    in_flight.clone()
                }
                None => {
                    if let Some(current) = self.inner.store.get() {
                        if stale != Some(&current) && !current.is_empty() {
                            debug!("Credential already renewed, reusing it");
                            return Ok(current);
                        }
                    }

                    if let Some((failed_for, failure)) = self.inner.last_failure.lock().as_ref() {
                        if failed_for.as_ref() == stale {
                            debug!("Renewal already failed for this credential, reusing the failure");
                            return Err(failure.clone());
                        }
                    }

                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                    let renewal = renew(Arc::clone(&self.inner), id, stale.cloned())
                        .boxed()
                        .shared();
                    *slot = Some((id, renewal.clone()));
                    renewal
                }
            }
        };

        renewal.await
    }

    /// Physical renewal requests issued so far.
    pub fn renewal_count(&self) -> u64 {
        self.inner.renewals.load(Ordering::SeqCst)
    }

    pub fn is_renewing(&self) -> bool {
        self.inner.in_flight.lock().is_some()
    }

    /// Drop the recorded failure. Called once a new credential is issued outside renewal.
    pub fn forget_failure(&self) {
        self.inner.last_failure.lock().take();
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.inner.refresh_url)
            .field("renewals", &self.renewal_count())
            .field("renewing", &self.is_renewing())
            .finish()
    }
}

async fn renew(
    inner: Arc<CoordinatorInner>,
    id: u64,
    stale: Option<Credential>,
) -> Result<Credential, RenewalFailure> {
    let slot_owner = Arc::clone(&inner);
    let _release = scopeguard::guard((), move |_| {
        let mut slot = slot_owner.in_flight.lock();
        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
            *slot = None;
        }
    });

    // Recorded before the slot is released
    let outcome = request_credential(&inner, id).await;
    *inner.last_failure.lock() = match &outcome {
        Ok(_) => None,
        Err(failure) => Some((stale, failure.clone())),
    };
    outcome
}

async fn request_credential(inner: &CoordinatorInner, id: u64) -> Result<Credential, RenewalFailure> {
    inner.renewals.fetch_add(1, Ordering::SeqCst);
    info!(renewal = id, "Renewing credential");

    let response = inner
        .http
        .get(&inner.refresh_url)
        .header(SKIP_AUTH_REFRESH_HEADER, "true")
        .send()
        .await
        .map_err(|e| {
            warn!(renewal = id, "Renewal request failed: {}", e);
            RenewalFailure::Unreachable {
                message: e.to_string(),
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!(renewal = id, status = status.as_u16(), "Renewal rejected");
        return Err(match status.as_u16() {
            400 => RenewalFailure::SecretRejected { status: 400 },
            other => RenewalFailure::Rejected { status: other },
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| RenewalFailure::Malformed {
            message: e.to_string(),
        })?;

    let token = body
        .pointer(&inner.token_pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RenewalFailure::MissingToken {
            pointer: inner.token_pointer.clone(),
        })?;

    let credential = Credential::new(token);
    inner.store.set(credential.clone());
    info!(renewal = id, "Credential renewed");

    Ok(credential)
}
