// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Session-Expiry Notification
//
// The transport layer reports terminal session expiry through a handler that is
// injected when the client is built. The application layer that owns user-facing
// session state provides the handler; the transport layer never imports it.
//
// Two ready-made handlers:
// - LoggingExpiryHandler: default, logs and does nothing else
// - SessionEventBus: tokio broadcast channel for layers that prefer to subscribe
//
// Any `Fn(&SessionExpired) + Send + Sync` closure is a handler as well.
//
// The handler is invoked once per failing call. Collapsing several simultaneous
// expiries into one user-visible re-authentication is the application's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tollgate_core::HttpMethod;
use tracing::{debug, warn};

use crate::refresh::RenewalFailure;

/// Why the session could not be kept alive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExpiryReason {
    /// The renewal endpoint answered 400: the renewal secret is invalid or expired
    RenewalSecretRejected,
    /// The renewal attempt triggered by this call failed
    RenewalFailed { failure: RenewalFailure },
}

/// Payload delivered to the expiry handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExpired {
    pub method: HttpMethod,
    pub path: String,
    #[serde(flatten)]
    pub reason: ExpiryReason,
    pub occurred_at: DateTime<Utc>,
}

impl SessionExpired {
    pub fn new(method: HttpMethod, path: impl Into<String>, reason: ExpiryReason) -> Self {
        Self {
            method,
            path: path.into(),
            reason,
            occurred_at: Utc::now(),
        }
    }
}

/// Receiver side of the session-expiry notification.
pub trait SessionExpiryHandler: Send + Sync {
    fn session_expired(&self, event: &SessionExpired);
}

impl<F> SessionExpiryHandler for F
where
    F: Fn(&SessionExpired) + Send + Sync,
{
    fn session_expired(&self, event: &SessionExpired) {
        self(event)
    }
}

/// Handler used when the application registers none
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExpiryHandler;

impl SessionExpiryHandler for LoggingExpiryHandler {
    fn session_expired(&self, event: &SessionExpired) {
        warn!(
            method = %event.method,
            path = %event.path,
            "Session expired with no expiry handler registered: {:?}",
            event.reason
        );
    }
}

/// Broadcast channel of session-expiry events
#[derive(Clone)]
pub struct SessionEventBus {
    sender: Arc<broadcast::Sender<SessionExpired>>,
}

impl SessionEventBus {
    /// Create a new bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create bus with default capacity (64)
    pub fn with_default_capacity() -> Self {
        Self::new(64)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionExpired> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl SessionExpiryHandler for SessionEventBus {
    fn session_expired(&self, event: &SessionExpired) {
        // send() only fails when nobody is subscribed
        if self.sender.send(event.clone()).is_err() {
            debug!("No subscribers listening for session expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn expired() -> SessionExpired {
        SessionExpired::new(HttpMethod::Get, "/api/v1/jobs", ExpiryReason::RenewalSecretRejected)
    }

    #[test]
    fn test_closure_is_a_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: Arc<dyn SessionExpiryHandler> = Arc::new(move |_: &SessionExpired| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handler.session_expired(&expired());
        handler.session_expired(&expired());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = SessionEventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.session_expired(&expired());

        for receiver in [&mut first, &mut second] {
            let event = receiver.recv().await.unwrap();
            assert_eq!(event.path, "/api/v1/jobs");
            assert_eq!(event.reason, ExpiryReason::RenewalSecretRejected);
        }
    }

    #[test]
    fn test_event_bus_without_subscribers_does_not_panic() {
        SessionEventBus::default().session_expired(&expired());
    }

    #[test]
    fn test_serialized_reason_is_flattened() {
        let value = serde_json::to_value(expired()).unwrap();
        assert_eq!(value["reason"], "renewal_secret_rejected");
        assert_eq!(value["method"], "GET");
    }
}
