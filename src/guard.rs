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

//! Per-transaction mutual exclusion with a bounded wait.
//!
//! At most one closure runs under [`ConcurrencyGuard::run_exclusive`] for a
//! given transaction id at a time. Different ids use different locks and
//! never block each other.

use crate::SettlementError;
use crate::base::TransactionId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct ConcurrencyGuard {
    locks: DashMap<TransactionId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl ConcurrencyGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `f` while holding the exclusive lock for `transaction_id`.
    ///
    /// The lock is released when `f` returns, whatever it returns.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::ConcurrencyTimeout`] without running `f` if
    /// the lock is not acquired within the configured timeout. Otherwise
    /// returns whatever `f` returns.
    pub fn run_exclusive<T, F>(&self, transaction_id: TransactionId, f: F) -> Result<T, SettlementError>
    where
        F: FnOnce() -> Result<T, SettlementError>,
    {
        // The map's shard lock must not be held while waiting on the entry lock.
        let lock = Arc::clone(self.locks.entry(transaction_id).or_default().value());

        let Some(_exclusive) = lock.try_lock_for(self.timeout) else {
            return Err(SettlementError::ConcurrencyTimeout {
                transaction_id,
                waited_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            });
        };

        f()
    }

    /// Number of transactions that have been locked at least once.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}
