//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Lock-free metrics for the decoy responder
//!
//! Every recording method updates an in-process atomic and emits the same
//! event through the `metrics` facade under `hibernate.responder.*`, so an
//! installed recorder sees it too.

use crate::ExchangeOutcome;
use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free responder metrics
///
/// Use the `snapshot()` method to get a view of all counters at a point
/// in time.
#[derive(Debug, Default)]
pub struct ResponderMetrics {
    // Socket lifecycle
    bind_failures: AtomicU64,
    accept_timeouts: AtomicU64,

    // Exchanges
    connections: AtomicU64,
    legacy_pings: AtomicU64,
    status_served: AtomicU64,
    pings_echoed: AtomicU64,
    wake_requests: AtomicU64,
    dropped: AtomicU64,

    // Errors
    connection_errors: AtomicU64,
    protocol_errors: AtomicU64,
}

impl ResponderMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed bind attempt
    pub fn bind_failed(&self) {
        self.bind_failures.fetch_add(1, Ordering::Relaxed);
        counter!("hibernate.responder.bind_failures").increment(1);
    }

    /// Record the listening state
    pub fn listening(&self, listening: bool) {
        gauge!("hibernate.responder.listening").set(if listening { 1.0 } else { 0.0 });
    }

    /// Record an accept wait that ended without a client
    pub fn accept_timeout(&self) {
        self.accept_timeouts.fetch_add(1, Ordering::Relaxed);
        counter!("hibernate.responder.accept_timeouts").increment(1);
    }

    /// Record an accepted connection
    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        counter!("hibernate.responder.connections").increment(1);
    }

    /// Record a finished exchange
    pub fn exchange_finished(&self, outcome: ExchangeOutcome, duration: Duration) {
        histogram!("hibernate.responder.exchange_duration").record(duration.as_secs_f64());
        match outcome {
            ExchangeOutcome::LegacyPing => {
                self.legacy_pings.fetch_add(1, Ordering::Relaxed);
                counter!("hibernate.responder.legacy_pings").increment(1);
            }
            ExchangeOutcome::Status { pinged } => {
                self.status_served.fetch_add(1, Ordering::Relaxed);
                counter!("hibernate.responder.status_served").increment(1);
                if pinged {
                    self.pings_echoed.fetch_add(1, Ordering::Relaxed);
                    counter!("hibernate.responder.pings_echoed").increment(1);
                }
            }
            ExchangeOutcome::Join(_) => {
                self.wake_requests.fetch_add(1, Ordering::Relaxed);
                counter!("hibernate.responder.wake_requests").increment(1);
            }
            ExchangeOutcome::Dropped => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!("hibernate.responder.dropped").increment(1);
            }
        }
    }

    /// Record an exchange that ended in an I/O error, timeout or disconnect
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("hibernate.responder.connection_errors").increment(1);
    }

    /// Record an exchange that ended on malformed input
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
        counter!("hibernate.responder.protocol_errors").increment(1);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bind_failures: self.bind_failures.load(Ordering::Relaxed),
            accept_timeouts: self.accept_timeouts.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            legacy_pings: self.legacy_pings.load(Ordering::Relaxed),
            status_served: self.status_served.load(Ordering::Relaxed),
            pings_echoed: self.pings_echoed.load(Ordering::Relaxed),
            wake_requests: self.wake_requests.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of responder metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Failed bind attempts
    pub bind_failures: u64,
    /// Accept waits that ended without a client
    pub accept_timeouts: u64,
    /// Accepted connections
    pub connections: u64,
    /// Legacy probes answered
    pub legacy_pings: u64,
    /// Status documents served
    pub status_served: u64,
    /// Keep-alives echoed
    pub pings_echoed: u64,
    /// Joins that requested a wake-up
    pub wake_requests: u64,
    /// Connections closed without a response
    pub dropped: u64,
    /// I/O errors, timeouts and disconnects
    pub connection_errors: u64,
    /// Malformed input
    pub protocol_errors: u64,
}

impl MetricsSnapshot {
    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.connection_errors + self.protocol_errors
    }
}
