// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Events published after a settlement commits.
//!
//! The engine knows nothing about how events travel; it hands each one to an
//! [`EventPublisher`]. Every successful settlement produces exactly two
//! events, [`SettlementEventKind::SettlementCreated`] followed by
//! [`SettlementEventKind::TransactionUpdated`], sharing one [`TraceId`].
//! Failed requests publish nothing.

use crate::base::{TraceId, TransactionId};
use crate::settlement::Settlement;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementEventKind {
    SettlementCreated,
    TransactionUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementEvent {
    pub kind: SettlementEventKind,
    pub transaction_id: TransactionId,
    pub settlement: Settlement,
    /// Transaction state right after the commit.
    #[serde(rename = "transaction_snapshot")]
    pub transaction: Transaction,
    pub trace_id: TraceId,
    pub timestamp: DateTime<Utc>,
}

/// Sink for settlement events.
///
/// Called while the transaction's exclusive lock is still held, so for any
/// one transaction events arrive in commit order. Implementations should
/// hand the event off quickly and must not call back into the engine for
/// the same transaction.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: SettlementEvent);
}

impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    fn publish(&self, event: SettlementEvent) {
        (**self).publish(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: SettlementEvent) {}
}

/// Forwards events into a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: Sender<SettlementEvent>,
}

impl ChannelPublisher {
    pub fn new(sender: Sender<SettlementEvent>) -> Self {
        Self { sender }
    }

    /// Creates a publisher backed by an unbounded channel and returns its receiver.
    pub fn unbounded() -> (Self, Receiver<SettlementEvent>) {
        let (sender, receiver) = channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: SettlementEvent) {
        // The settlement is already committed; a missing listener only loses the notification.
        if let Err(err) = self.sender.send(event) {
            tracing::warn!(
                trace_id = %err.0.trace_id,
                transaction_id = %err.0.transaction_id,
                kind = ?err.0.kind,
                "event receiver disconnected, dropping settlement event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{CashierId, SettlementId};
    use crate::settlement::PaymentMode;
    use crate::store::SettlementCommit;
    use rust_decimal_macros::dec;

    fn sample_event(kind: SettlementEventKind) -> SettlementEvent {
        let current = Transaction::new(TransactionId(1), dec!(100.00)).unwrap();
        let commit =
            SettlementCommit::new(&current, dec!(25.00), PaymentMode::Gcash, CashierId(9), Utc::now());
        let (settlement, transaction) = commit.into_settlement(SettlementId(1));
        SettlementEvent {
            kind,
            transaction_id: TransactionId(1),
            settlement,
            transaction,
            trace_id: TraceId::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn channel_publisher_delivers_in_order() {
        let (publisher, receiver) = ChannelPublisher::unbounded();
        publisher.publish(sample_event(SettlementEventKind::SettlementCreated));
        publisher.publish(sample_event(SettlementEventKind::TransactionUpdated));

        let kinds: Vec<SettlementEventKind> = receiver.try_iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SettlementEventKind::SettlementCreated,
                SettlementEventKind::TransactionUpdated
            ]
        );
    }

    #[test]
    fn channel_publisher_survives_dropped_receiver() {
        let (publisher, receiver) = ChannelPublisher::unbounded();
        drop(receiver);
        publisher.publish(sample_event(SettlementEventKind::SettlementCreated));
    }

    #[test]
    fn arc_publisher_forwards() {
        let (publisher, receiver) = ChannelPublisher::unbounded();
        let shared: Arc<dyn EventPublisher> = Arc::new(publisher);
        shared.publish(sample_event(SettlementEventKind::TransactionUpdated));
        assert_eq!(receiver.len(), 1);
    }

    #[test]
    fn event_serializes_snapshot() {
        let event = sample_event(SettlementEventKind::SettlementCreated);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "settlement_created");
        assert_eq!(json["transaction_id"], 1);
        assert_eq!(json["settlement"]["amount"], "25.00");
        assert_eq!(json["transaction_snapshot"]["paid_amount"], "25.00");
        assert_eq!(json["transaction_snapshot"]["balance_amount"], "75.00");
        assert_eq!(json["transaction_snapshot"]["payment_status"], "partial");
        assert!(json.get("transaction").is_none());
        assert_eq!(json["trace_id"], event.trace_id.to_string());
    }
}
