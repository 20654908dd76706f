//! Domain event sink — explicit events published by the loyalty engine in
//! place of hidden reactive observers, so causality stays testable.

use crate::loyalty::TransactionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Events emitted by engine operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LoyaltyEvent {
    PointsEarned {
        owner_id: String,
        points: u64,
        reservation_ref: String,
        new_balance: u64,
    },
    PointsRedeemed {
        owner_id: String,
        points: u64,
        discount_amount: f64,
        new_balance: u64,
    },
    PointsReversed {
        owner_id: String,
        points: u64,
        reservation_ref: String,
        new_balance: u64,
    },
    PointsExpired {
        owner_id: String,
        points: u64,
    },
    TierChanged {
        owner_id: String,
        from: Option<String>,
        to: String,
    },
}

impl LoyaltyEvent {
    /// Ledger kind this event corresponds to, when one exists.
    pub fn transaction_kind(&self) -> Option<TransactionKind> {
        match self {
            LoyaltyEvent::PointsEarned { .. } => Some(TransactionKind::Earn),
            LoyaltyEvent::PointsRedeemed { .. } => Some(TransactionKind::Redeem),
            LoyaltyEvent::PointsReversed { .. } => Some(TransactionKind::Reversal),
            LoyaltyEvent::PointsExpired { .. } => Some(TransactionKind::Expire),
            LoyaltyEvent::TierChanged { .. } => None,
        }
    }
}

/// A timestamped event as captured by a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event: LoyaltyEvent,
    pub timestamp: DateTime<Utc>,
}

/// Trait for emitting domain events. Implementations route events to
/// notification channels, analytics, or test capture buffers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LoyaltyEvent);
}

/// No-op sink for callers that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: LoyaltyEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<LoyaltyEvent> {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event sink mutex poisoned").len()
    }

    pub fn count_kind(&self, kind: TransactionKind) -> usize {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .iter()
            .filter(|r| r.event.transaction_kind() == Some(kind))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event sink mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: LoyaltyEvent) {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .push(RecordedEvent {
                event,
                timestamp: Utc::now(),
            });
    }
}

/// Convenience: a no-op sink for callers that don't need events.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
