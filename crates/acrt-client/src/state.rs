//! Connection lifecycle states and receive-loop counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::dispatch::DispatchReport;

/// Lifecycle of an [`crate::AcUdpConnection`].
///
/// `Disconnected → Connecting → AwaitingHandshakeReply → Connected →
/// Disconnecting → Disconnected`. A socket failure in the receive loop
/// forces `Disconnected` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingHandshakeReply,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::AwaitingHandshakeReply
                | ConnectionState::Disconnecting
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingHandshakeReply => "awaiting_handshake_reply",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the receive-loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub datagrams_received: u64,
    pub datagrams_decoded: u64,
    pub malformed_datagrams: u64,
    pub ignored_datagrams: u64,
    pub events_dispatched: u64,
    pub subscriber_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    received: AtomicU64,
    decoded: AtomicU64,
    malformed: AtomicU64,
    ignored: AtomicU64,
    dispatched: AtomicU64,
    subscriber_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self, report: DispatchReport) {
        self.dispatched
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.subscriber_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            datagrams_received: self.received.load(Ordering::Relaxed),
            datagrams_decoded: self.decoded.load(Ordering::Relaxed),
            malformed_datagrams: self.malformed.load(Ordering::Relaxed),
            ignored_datagrams: self.ignored.load(Ordering::Relaxed),
            events_dispatched: self.dispatched.load(Ordering::Relaxed),
            subscriber_failures: self.subscriber_failures.load(Ordering::Relaxed),
        }
    }
}
