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

//! Storage seam for transactions and the settlement ledger.
//!
//! A [`LedgerStore`] persists two things per transaction: the transaction
//! record with its cached totals, and the append-only list of settlements.
//! The only write that touches cached totals is
//! [`LedgerStore::commit_settlement`], and its argument, [`SettlementCommit`],
//! can only be built by the engine.

use crate::base::{CashierId, SettlementId, TransactionId};
use crate::error::StoreError;
use crate::settlement::{PaymentMode, Settlement};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// A transaction together with its settlements, read from one consistent view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub transaction: Transaction,
    /// Most recent first.
    pub settlements: Vec<Settlement>,
}

impl LedgerSnapshot {
    /// Sum of all settlement amounts in the snapshot.
    pub fn settled_total(&self) -> Decimal {
        self.settlements.iter().map(Settlement::amount).sum()
    }
}

/// One validated settlement, ready to be committed.
///
/// Carries the paid amount observed during validation so the store can
/// refuse the commit if the transaction moved underneath it.
#[derive(Debug, Clone)]
pub struct SettlementCommit {
    expected_paid: Decimal,
    updated: Transaction,
    amount: Decimal,
    payment_mode: PaymentMode,
    cashier_id: CashierId,
    created_at: DateTime<Utc>,
}

impl SettlementCommit {
    pub(crate) fn new(
        current: &Transaction,
        amount: Decimal,
        payment_mode: PaymentMode,
        cashier_id: CashierId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            expected_paid: current.paid_amount(),
            updated: current.with_settlement(amount),
            amount,
            payment_mode,
            cashier_id,
            created_at,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.updated.id()
    }

    /// Paid amount the transaction must still have for the commit to apply.
    pub fn expected_paid(&self) -> Decimal {
        self.expected_paid
    }

    /// The transaction with its cached totals advanced by this settlement.
    pub fn updated_transaction(&self) -> &Transaction {
        &self.updated
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn cashier_id(&self) -> CashierId {
        self.cashier_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Builds the settlement row once the store has assigned an id.
    pub fn into_settlement(self, id: SettlementId) -> (Settlement, Transaction) {
        let settlement = Settlement::new(
            id,
            self.updated.id(),
            self.amount,
            self.payment_mode,
            self.cashier_id,
            self.created_at,
        );
        (settlement, self.updated)
    }
}

/// Persistence backend for transactions and settlements.
///
/// Implementations must make [`commit_settlement`](Self::commit_settlement)
/// all-or-nothing, and reads must never observe a settlement whose commit
/// has not completed.
pub trait LedgerStore: Send + Sync {
    /// Stores a new transaction. Returns `false` if the id is already taken.
    fn insert_transaction(&self, transaction: Transaction) -> Result<bool, StoreError>;

    /// Loads the latest committed state of a transaction.
    fn load_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Loads a transaction and its settlements, most recent first.
    fn load_ledger(&self, id: TransactionId) -> Result<Option<LedgerSnapshot>, StoreError>;

    /// Appends the settlement and replaces the cached transaction as one unit.
    ///
    /// Returns the ledger as it stands after the commit; the new settlement
    /// is first.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingTransaction`] if the transaction is unknown.
    /// - [`StoreError::Conflict`] if its paid amount differs from
    ///   [`SettlementCommit::expected_paid`]. Nothing is written.
    fn commit_settlement(&self, commit: SettlementCommit) -> Result<LedgerSnapshot, StoreError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn insert_transaction(&self, transaction: Transaction) -> Result<bool, StoreError> {
        (**self).insert_transaction(transaction)
    }

    fn load_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        (**self).load_transaction(id)
    }

    fn load_ledger(&self, id: TransactionId) -> Result<Option<LedgerSnapshot>, StoreError> {
        (**self).load_ledger(id)
    }

    fn commit_settlement(&self, commit: SettlementCommit) -> Result<LedgerSnapshot, StoreError> {
        (**self).commit_settlement(commit)
    }
}
