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

//! Error types for settlement processing.

use crate::base::TransactionId;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Broad classification of a [`SettlementError`].
///
/// Lets callers decide how to react (fix input, show the remaining balance,
/// retry later, alert) without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. The caller must correct it; never retried.
    Validation,
    /// The referenced transaction does not exist.
    NotFound,
    /// The amount exceeds the remaining balance. An expected business rejection.
    Overpayment,
    /// Exclusive access could not be obtained in time. Safe to retry.
    ConcurrencyTimeout,
    /// Storage failure. The atomic unit was rolled back.
    Persistence,
}

/// Settlement processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Amount is zero, negative, not a number, or has more than 2 decimal places
    #[error("invalid amount '{0}' (must be positive with at most 2 decimal places)")]
    InvalidAmount(String),

    /// Payment mode is not one of the supported modes
    #[error("unknown payment mode '{0}'")]
    UnknownPaymentMode(String),

    /// A transaction with this ID was already recorded
    #[error("duplicate transaction ID {0}")]
    DuplicateTransaction(TransactionId),

    /// Referenced transaction ID does not exist
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// Settlement would push the paid total past the amount due
    #[error("settlement amount {amount} exceeds remaining balance of {remaining}")]
    Overpayment { amount: Decimal, remaining: Decimal },

    /// Another settlement on the same transaction held the lock for too long
    #[error("timed out after {waited_ms}ms waiting for exclusive access to transaction {transaction_id}")]
    ConcurrencyTimeout {
        transaction_id: TransactionId,
        waited_ms: u64,
    },

    /// Underlying storage failed; nothing was written
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::UnknownPaymentMode(_) | Self::DuplicateTransaction(_) => {
                ErrorKind::Validation
            }
            Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::Overpayment { .. } => ErrorKind::Overpayment,
            Self::ConcurrencyTimeout { .. } => ErrorKind::ConcurrencyTimeout,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Returns `true` when retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyTimeout
    }

    /// Remaining balance reported by an overpayment rejection.
    pub fn remaining_balance(&self) -> Option<Decimal> {
        match self {
            Self::Overpayment { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }
}

/// Storage backend errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The cached paid amount changed between validation and commit
    #[error("commit conflict on transaction {transaction_id}: expected paid {expected}, found {found}")]
    Conflict {
        transaction_id: TransactionId,
        expected: Decimal,
        found: Decimal,
    },

    /// A commit referenced a transaction the store does not hold
    #[error("transaction {0} missing from store")]
    MissingTransaction(TransactionId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            SettlementError::InvalidAmount("-5".into()).to_string(),
            "invalid amount '-5' (must be positive with at most 2 decimal places)"
        );
        assert_eq!(
            SettlementError::UnknownPaymentMode("bitcoin".into()).to_string(),
            "unknown payment mode 'bitcoin'"
        );
        assert_eq!(
            SettlementError::TransactionNotFound(TransactionId(5)).to_string(),
            "transaction 5 not found"
        );
        assert_eq!(
            SettlementError::Overpayment {
                amount: dec!(500.00),
                remaining: dec!(400.00)
            }
            .to_string(),
            "settlement amount 500.00 exceeds remaining balance of 400.00"
        );
        assert_eq!(
            SettlementError::ConcurrencyTimeout {
                transaction_id: TransactionId(1),
                waited_ms: 250
            }
            .to_string(),
            "timed out after 250ms waiting for exclusive access to transaction 1"
        );
        assert_eq!(
            SettlementError::from(StoreError::Backend("disk full".into())).to_string(),
            "persistence failure: storage backend error: disk full"
        );
    }

    #[test]
    fn kinds_classify_variants() {
        assert_eq!(
            SettlementError::DuplicateTransaction(TransactionId(1)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SettlementError::TransactionNotFound(TransactionId(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SettlementError::Persistence(StoreError::MissingTransaction(TransactionId(1))).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn only_timeouts_are_retryable() {
        let timeout = SettlementError::ConcurrencyTimeout {
            transaction_id: TransactionId(1),
            waited_ms: 10,
        };
        let overpayment = SettlementError::Overpayment {
            amount: dec!(1),
            remaining: dec!(0),
        };
        assert!(timeout.is_retryable());
        assert!(!overpayment.is_retryable());
        assert!(!SettlementError::Persistence(StoreError::Backend("x".into())).is_retryable());
    }

    #[test]
    fn overpayment_exposes_remaining_balance() {
        let error = SettlementError::Overpayment {
            amount: dec!(600.00),
            remaining: dec!(400.00),
        };
        assert_eq!(error.remaining_balance(), Some(dec!(400.00)));
        assert_eq!(
            SettlementError::InvalidAmount("0".into()).remaining_balance(),
            None
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = SettlementError::TransactionNotFound(TransactionId(3));
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
