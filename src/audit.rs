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

//! Audit trail of settlement requests.
//!
//! Every settlement request produces an [`AuditStage::Initiated`] record when
//! it arrives and exactly one terminal record, [`AuditStage::Completed`] or
//! [`AuditStage::Failed`], when it returns. Both carry the request's
//! [`TraceId`].
//!
//! Records are written outside the transaction's atomic unit: a failed
//! request leaves an audit entry but no ledger row, and a lost audit entry
//! never undoes a commit.

use crate::base::{CashierId, SettlementId, TraceId, TransactionId};
use crate::error::ErrorKind;
use crate::settlement::PaymentMode;
use crate::status::PaymentStatus;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum AuditStage {
    /// Request received, nothing decided yet.
    Initiated,
    /// Settlement committed.
    Completed {
        settlement_id: SettlementId,
        paid_amount: Decimal,
        payment_status: PaymentStatus,
    },
    /// Request refused or rolled back.
    Failed { kind: ErrorKind, message: String },
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub trace_id: TraceId,
    pub transaction_id: TransactionId,
    /// Amount as requested, before validation.
    pub amount: Decimal,
    pub payment_mode: PaymentMode,
    pub cashier_id: CashierId,
    #[serde(flatten)]
    pub stage: AuditStage,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// `true` for the record that closes a request.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.stage, AuditStage::Initiated)
    }
}

/// Sink for audit records.
pub trait AuditRecorder: Send + Sync {
    fn record(&self, record: AuditRecord);
}

impl<A: AuditRecorder + ?Sized> AuditRecorder for Arc<A> {
    fn record(&self, record: AuditRecord) {
        (**self).record(record)
    }
}

/// Keeps no audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditRecorder;

impl AuditRecorder for NoopAuditRecorder {
    fn record(&self, _record: AuditRecord) {}
}

/// Forwards audit records into a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelAuditRecorder {
    sender: Sender<AuditRecord>,
}

impl ChannelAuditRecorder {
    pub fn new(sender: Sender<AuditRecord>) -> Self {
        Self { sender }
    }

    /// Creates a recorder backed by an unbounded channel and returns its receiver.
    pub fn unbounded() -> (Self, Receiver<AuditRecord>) {
        let (sender, receiver) = channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl AuditRecorder for ChannelAuditRecorder {
    fn record(&self, record: AuditRecord) {
        if let Err(err) = self.sender.send(record) {
            tracing::warn!(
                trace_id = %err.0.trace_id,
                transaction_id = %err.0.transaction_id,
                "audit receiver disconnected, record dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_record(stage: AuditStage) -> AuditRecord {
        AuditRecord {
            trace_id: TraceId::new(),
            transaction_id: TransactionId(4),
            amount: dec!(12.50),
            payment_mode: PaymentMode::Gcash,
            cashier_id: CashierId(9),
            stage,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn only_initiated_is_not_terminal() {
        assert!(!sample_record(AuditStage::Initiated).is_terminal());
        assert!(
            sample_record(AuditStage::Failed {
                kind: ErrorKind::Overpayment,
                message: "too much".into(),
            })
            .is_terminal()
        );
    }

    #[test]
    fn channel_recorder_delivers_in_order() {
        let (recorder, receiver) = ChannelAuditRecorder::unbounded();
        recorder.record(sample_record(AuditStage::Initiated));
        recorder.record(sample_record(AuditStage::Completed {
            settlement_id: SettlementId(1),
            paid_amount: dec!(12.50),
            payment_status: PaymentStatus::Partial,
        }));

        let stages: Vec<bool> = receiver.try_iter().map(|r| r.is_terminal()).collect();
        assert_eq!(stages, vec![false, true]);
    }

    #[test]
    fn channel_recorder_survives_dropped_receiver() {
        let (recorder, receiver) = ChannelAuditRecorder::unbounded();
        drop(receiver);
        recorder.record(sample_record(AuditStage::Initiated));
    }

    #[test]
    fn record_serializes_flat_with_stage_tag() {
        let record = sample_record(AuditStage::Failed {
            kind: ErrorKind::ConcurrencyTimeout,
            message: "timed out".into(),
        });
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["stage"], "failed");
        assert_eq!(json["kind"], "concurrency_timeout");
        assert_eq!(json["message"], "timed out");
        assert_eq!(json["amount"], "12.50");
        assert_eq!(json["payment_mode"], "gcash");
        assert_eq!(json["cashier_id"], 9);
    }
}
