//! Ordered subscriber lists for car and lap updates.
//!
//! Subscribers run synchronously on the receive loop, in subscription order,
//! with a shared reference to the freshly updated snapshot. A failing
//! subscriber (an `Err` return or a panic) is logged and skipped; the
//! remaining subscribers still run and the receive loop is never affected.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use crate::error::ClientError;

/// Which snapshot an update carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Car,
    Lap,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateKind::Car => f.write_str("car"),
            UpdateKind::Lap => f.write_str("lap"),
        }
    }
}

/// Handle returned by [`EventDispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Outcome of one [`EventDispatcher::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// An explicit, ordered collection of subscribers for one update kind.
pub struct EventDispatcher<T> {
    kind: UpdateKind,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> EventDispatcher<T> {
    pub fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Append a subscriber; it runs after every subscriber already registered.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Invoke every current subscriber in order.
    ///
    /// The subscriber list is copied before the first call, so callbacks may
    /// subscribe or unsubscribe without deadlocking; such changes apply from
    /// the next notification.
    pub fn notify(&self, value: &T) -> DispatchReport {
        let subscribers: Vec<(SubscriptionId, Callback<T>)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut report = DispatchReport::default();
        for (id, callback) in subscribers {
            let message = match panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            report.failed += 1;
            let error = ClientError::SubscriberFailure {
                kind: self.kind,
                message,
            };
            warn!(subscription = id.get(), error = %error, "Subscriber failed; continuing dispatch");
        }
        report
    }
}

impl<T> fmt::Debug for EventDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("kind", &self.kind)
            .field("subscribers", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
