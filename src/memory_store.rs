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

//! Thread-safe in-memory ledger store.
//!
//! Each transaction owns an `RwLock`ed ledger entry holding its cached totals
//! and its settlements. A commit takes the write lock once and updates both,
//! so a reader sees either the whole commit or none of it.

use crate::base::{SettlementId, TransactionId};
use crate::error::StoreError;
use crate::settlement::Settlement;
use crate::store::{LedgerSnapshot, LedgerStore, SettlementCommit};
use crate::transaction::Transaction;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct LedgerEntry {
    transaction: Transaction,
    /// Commit order, oldest first.
    settlements: Vec<Settlement>,
}

impl LedgerEntry {
    fn assert_invariants(&self) {
        debug_assert_eq!(
            self.settlements.iter().map(Settlement::amount).sum::<Decimal>(),
            self.transaction.paid_amount(),
            "Invariant violated: ledger sum differs from cached paid amount for transaction {}",
            self.transaction.id()
        );
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            transaction: self.transaction.clone(),
            settlements: self.settlements.iter().rev().cloned().collect(),
        }
    }
}

/// In-memory [`LedgerStore`].
///
/// Uses a [`DashMap`] so lookups for different transactions do not contend;
/// the per-entry lock is only held for the duration of a read or a commit.
#[derive(Debug)]
pub struct MemoryStore {
    ledgers: DashMap<TransactionId, Arc<RwLock<LedgerEntry>>>,
    next_settlement_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
            next_settlement_id: AtomicU64::new(1),
        }
    }

    /// Returns every stored transaction, ordered by id.
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .ledgers
            .iter()
            .map(|entry| entry.value().read().transaction.clone())
            .collect();
        transactions.sort_by_key(Transaction::id);
        transactions
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    // Clone the Arc out so the shard lock is released before the entry lock is taken.
    fn entry(&self, id: TransactionId) -> Option<Arc<RwLock<LedgerEntry>>> {
        self.ledgers.get(&id).map(|entry| Arc::clone(entry.value()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_transaction(&self, transaction: Transaction) -> Result<bool, StoreError> {
        match self.ledgers.entry(transaction.id()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(RwLock::new(LedgerEntry {
                    transaction,
                    settlements: Vec::new(),
                })));
                Ok(true)
            }
        }
    }

    fn load_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.entry(id).map(|entry| entry.read().transaction.clone()))
    }

    fn load_ledger(&self, id: TransactionId) -> Result<Option<LedgerSnapshot>, StoreError> {
        Ok(self.entry(id).map(|entry| entry.read().snapshot()))
    }

    fn commit_settlement(&self, commit: SettlementCommit) -> Result<LedgerSnapshot, StoreError> {
        let transaction_id = commit.transaction_id();
        let entry = self
            .entry(transaction_id)
            .ok_or(StoreError::MissingTransaction(transaction_id))?;
        let mut ledger = entry.write();

        let found = ledger.transaction.paid_amount();
        if found != commit.expected_paid() {
            return Err(StoreError::Conflict {
                transaction_id,
                expected: commit.expected_paid(),
                found,
            });
        }

        let id = SettlementId(self.next_settlement_id.fetch_add(1, Ordering::SeqCst));
        let (settlement, updated) = commit.into_settlement(id);
        ledger.settlements.push(settlement);
        ledger.transaction = updated;
        ledger.assert_invariants();

        Ok(ledger.snapshot())
    }
}
