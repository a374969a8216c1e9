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

//! Settlement processing engine.
//!
//! The [`SettlementEngine`] is the single entry point that changes how much of
//! a transaction has been paid. It wires together:
//!
//! - a [`LedgerStore`] holding transactions and their settlements,
//! - a [`ConcurrencyGuard`] serializing settlements per transaction,
//! - an [`EventPublisher`] notified after every successful commit,
//! - an [`AuditRecorder`] told about every request and how it ended.
//!
//! # Settlement Protocol
//!
//! 1. Validate the amount (positive, at most two decimal places) and check
//!    that the transaction exists.
//! 2. Take the transaction's exclusive lock, waiting at most
//!    [`EngineConfig::lock_timeout`].
//! 3. Load the committed transaction and compute the remaining balance.
//! 4. Reject with [`SettlementError::Overpayment`] if the amount exceeds it.
//! 5. Commit the settlement row and the new cached totals as one unit.
//! 6. Publish `SettlementCreated` and `TransactionUpdated`, then release the lock.
//!
//! The audit trail is written before step 1 and after the lock is released,
//! never inside the atomic unit.
//!
//! # Thread Safety
//!
//! Settlements on the same transaction are applied one at a time in lock
//! order; settlements on different transactions proceed in parallel.

use crate::audit::{AuditRecord, AuditRecorder, AuditStage, NoopAuditRecorder};
use crate::base::{CashierId, TraceId, TransactionId};
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::event::{EventPublisher, NoopPublisher, SettlementEvent, SettlementEventKind};
use crate::guard::ConcurrencyGuard;
use crate::memory_store::MemoryStore;
use crate::money;
use crate::settlement::{PaymentMode, Settlement};
use crate::store::{LedgerStore, SettlementCommit};
use crate::transaction::Transaction;
use crate::{ErrorKind, SettlementError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of a successful settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    /// The settlement that was just recorded.
    pub settlement: Settlement,
    /// The transaction right after the commit.
    pub transaction: Transaction,
    /// Full settlement history of the transaction, most recent first.
    pub settlements: Vec<Settlement>,
    /// Correlation id shared by both published events and the audit records.
    pub trace_id: TraceId,
}

/// Settlement engine over an injected store and event publisher.
///
/// # Invariants
///
/// - `paid_amount` equals the sum of the transaction's settlements.
/// - `paid_amount` never exceeds `amount_due`.
/// - `balance_amount == amount_due - paid_amount`.
/// - `payment_status` is always derived, never set.
pub struct SettlementEngine<S = MemoryStore, P = NoopPublisher, A = NoopAuditRecorder> {
    store: S,
    publisher: P,
    auditor: A,
    guard: ConcurrencyGuard,
    config: EngineConfig,
}

impl SettlementEngine {
    /// Creates an engine backed by an empty [`MemoryStore`] that publishes nowhere.
    pub fn new() -> Self {
        Self::with_parts(MemoryStore::new(), NoopPublisher, EngineConfig::default())
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LedgerStore, P: EventPublisher> SettlementEngine<S, P> {
    /// Creates an engine without an audit trail.
    pub fn with_parts(store: S, publisher: P, config: EngineConfig) -> Self {
        Self {
            store,
            publisher,
            auditor: NoopAuditRecorder,
            guard: ConcurrencyGuard::new(config.lock_timeout()),
            config,
        }
    }
}

impl<S: LedgerStore, P: EventPublisher, A: AuditRecorder> SettlementEngine<S, P, A> {
    /// Replaces the audit recorder.
    pub fn with_audit_recorder<B: AuditRecorder>(self, auditor: B) -> SettlementEngine<S, P, B> {
        SettlementEngine {
            store: self.store,
            publisher: self.publisher,
            auditor,
            guard: self.guard,
            config: self.config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records a new sale with nothing paid yet.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] - `amount_due` is not a positive amount in cents.
    /// - [`SettlementError::DuplicateTransaction`] - The id is already recorded.
    /// - [`SettlementError::Persistence`] - The store failed.
    pub fn create_transaction(
        &self,
        id: TransactionId,
        amount_due: Decimal,
    ) -> Result<Transaction, SettlementError> {
        let transaction = Transaction::new(id, amount_due)?;
        if !self.store.insert_transaction(transaction.clone())? {
            return Err(SettlementError::DuplicateTransaction(id));
        }
        tracing::debug!(transaction_id = %id, amount_due = %transaction.amount_due(), "transaction recorded");
        Ok(transaction)
    }

    /// Returns the latest committed state of a transaction.
    pub fn get_transaction(&self, id: TransactionId) -> Result<Transaction, SettlementError> {
        self.store
            .load_transaction(id)?
            .ok_or(SettlementError::TransactionNotFound(id))
    }

    /// Returns the committed settlements of a transaction, most recent first.
    ///
    /// The list is read together with the transaction, so its sum always
    /// equals the transaction's `paid_amount` at that moment.
    pub fn get_settlements(&self, id: TransactionId) -> Result<Vec<Settlement>, SettlementError> {
        self.store
            .load_ledger(id)?
            .map(|ledger| ledger.settlements)
            .ok_or(SettlementError::TransactionNotFound(id))
    }

    /// Applies a payment toward a transaction.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] - Amount is not positive or has sub-cent digits.
    /// - [`SettlementError::TransactionNotFound`] - Unknown transaction.
    /// - [`SettlementError::Overpayment`] - Amount exceeds the remaining balance.
    /// - [`SettlementError::ConcurrencyTimeout`] - Lock not acquired in time; retry later.
    /// - [`SettlementError::Persistence`] - Store failed; nothing was written.
    ///
    /// No state changes and no events are published on any error. The audit
    /// recorder sees an `Initiated` record and one terminal record either way.
    pub fn create_settlement(
        &self,
        transaction_id: TransactionId,
        amount: Decimal,
        payment_mode: PaymentMode,
        cashier_id: CashierId,
    ) -> Result<SettlementReceipt, SettlementError> {
        let trace_id = TraceId::new();
        let span = tracing::info_span!("create_settlement", %trace_id, %transaction_id);
        let _entered = span.enter();

        let audit = |stage| AuditRecord {
            trace_id,
            transaction_id,
            amount,
            payment_mode,
            cashier_id,
            stage,
            recorded_at: Utc::now(),
        };
        self.auditor.record(audit(AuditStage::Initiated));

        let result = money::validate_amount(amount).and_then(|amount| {
            // Unknown ids must not get a lock entry in the guard.
            if self.store.load_transaction(transaction_id)?.is_none() {
                return Err(SettlementError::TransactionNotFound(transaction_id));
            }
            self.guard.run_exclusive(transaction_id, || {
                self.settle_exclusive(trace_id, transaction_id, amount, payment_mode, cashier_id)
            })
        });

        match &result {
            Ok(receipt) => tracing::info!(
                settlement_id = %receipt.settlement.id(),
                amount = %receipt.settlement.amount(),
                %payment_mode,
                %cashier_id,
                paid_amount = %receipt.transaction.paid_amount(),
                payment_status = %receipt.transaction.payment_status(),
                "settlement committed"
            ),
            Err(err) => match err.kind() {
                ErrorKind::Overpayment => tracing::info!(%amount, "settlement rejected: {}", err),
                ErrorKind::ConcurrencyTimeout => tracing::warn!(%amount, "settlement not applied: {}", err),
                ErrorKind::Persistence => tracing::error!(%amount, "settlement rolled back: {}", err),
                ErrorKind::Validation | ErrorKind::NotFound => {
                    tracing::debug!(%amount, "settlement refused: {}", err)
                }
            },
        }

        self.auditor.record(audit(match &result {
            Ok(receipt) => AuditStage::Completed {
                settlement_id: receipt.settlement.id(),
                paid_amount: receipt.transaction.paid_amount(),
                payment_status: receipt.transaction.payment_status(),
            },
            Err(err) => AuditStage::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
        }));

        result
    }

    // Runs with the transaction's exclusive lock held.
    fn settle_exclusive(
        &self,
        trace_id: TraceId,
        transaction_id: TransactionId,
        amount: Decimal,
        payment_mode: PaymentMode,
        cashier_id: CashierId,
    ) -> Result<SettlementReceipt, SettlementError> {
        let current = self
            .store
            .load_transaction(transaction_id)?
            .ok_or(SettlementError::TransactionNotFound(transaction_id))?;

        let remaining = current.balance_amount();
        if self.config.trace_settlements {
            tracing::debug!(
                paid_amount = %current.paid_amount(),
                %remaining,
                "lock acquired, balance loaded"
            );
        }

        if amount > remaining {
            return Err(SettlementError::Overpayment { amount, remaining });
        }

        let created_at = Utc::now();
        let commit = SettlementCommit::new(&current, amount, payment_mode, cashier_id, created_at);
        let ledger = self.store.commit_settlement(commit)?;

        let Some(settlement) = ledger.settlements.first().cloned() else {
            return Err(SettlementError::Persistence(StoreError::Backend(format!(
                "commit on transaction {} returned an empty ledger",
                transaction_id
            ))));
        };
        if self.config.trace_settlements {
            tracing::debug!(settlement_id = %settlement.id(), "settlement row committed");
        }

        self.publish(trace_id, &settlement, &ledger.transaction, created_at);
        if self.config.trace_settlements {
            tracing::debug!("settlement events published");
        }

        Ok(SettlementReceipt {
            settlement,
            transaction: ledger.transaction,
            settlements: ledger.settlements,
            trace_id,
        })
    }

    fn publish(
        &self,
        trace_id: TraceId,
        settlement: &Settlement,
        transaction: &Transaction,
        timestamp: DateTime<Utc>,
    ) {
        for kind in [
            SettlementEventKind::SettlementCreated,
            SettlementEventKind::TransactionUpdated,
        ] {
            self.publisher.publish(SettlementEvent {
                kind,
                transaction_id: transaction.id(),
                settlement: settlement.clone(),
                transaction: transaction.clone(),
                trace_id,
                timestamp,
            });
        }
    }
}
