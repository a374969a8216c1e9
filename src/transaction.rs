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

//! Sale transactions and their cached payment totals.
//!
//! The cached fields (`paid_amount`, `balance_amount`, `payment_status`) are
//! private. Outside this crate a [`Transaction`] can only be created unpaid;
//! the only way to advance it is a committed settlement.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use settlement_engine_rs::{PaymentStatus, Transaction, TransactionId};
//!
//! let transaction = Transaction::new(TransactionId(1), dec!(1000.00)).unwrap();
//! assert_eq!(transaction.balance_amount(), dec!(1000.00));
//! assert_eq!(transaction.payment_status(), PaymentStatus::Unpaid);
//! ```

use crate::base::TransactionId;
use crate::money::{self, MONETARY_SCALE};
use crate::status::PaymentStatus;
use crate::SettlementError;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Snapshot of a sale and how much of it has been paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    amount_due: Decimal,
    paid_amount: Decimal,
    balance_amount: Decimal,
    payment_status: PaymentStatus,
}

impl Transaction {
    /// Records a new sale with nothing paid yet.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidAmount`] if `amount_due` is not a
    /// positive amount with at most two decimal places.
    pub fn new(id: TransactionId, amount_due: Decimal) -> Result<Self, SettlementError> {
        let amount_due = money::validate_amount(amount_due)?;
        Ok(Self {
            id,
            amount_due,
            paid_amount: Decimal::new(0, MONETARY_SCALE),
            balance_amount: amount_due,
            payment_status: PaymentStatus::Unpaid,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn amount_due(&self) -> Decimal {
        self.amount_due
    }

    pub fn paid_amount(&self) -> Decimal {
        self.paid_amount
    }

    /// Remaining balance: `amount_due - paid_amount`.
    pub fn balance_amount(&self) -> Decimal {
        self.balance_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns the transaction as it stands after `amount` is settled.
    ///
    /// The caller has already checked `amount <= balance_amount`.
    pub(crate) fn with_settlement(&self, amount: Decimal) -> Self {
        let paid_amount = money::to_cents(self.paid_amount + amount);
        let next = Self {
            id: self.id,
            amount_due: self.amount_due,
            paid_amount,
            balance_amount: money::to_cents(self.amount_due - paid_amount),
            payment_status: PaymentStatus::derive(paid_amount, self.amount_due),
        };
        debug_assert!(
            self.payment_status.can_transition_to(next.payment_status),
            "Invariant violated: status moved backwards from {} to {}",
            self.payment_status,
            next.payment_status
        );
        next.assert_invariants();
        next
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.paid_amount >= Decimal::ZERO,
            "Invariant violated: paid amount went negative: {}",
            self.paid_amount
        );
        debug_assert!(
            self.paid_amount <= self.amount_due,
            "Invariant violated: paid {} exceeds amount due {}",
            self.paid_amount,
            self.amount_due
        );
        debug_assert_eq!(
            self.balance_amount,
            self.amount_due - self.paid_amount,
            "Invariant violated: balance out of sync"
        );
        debug_assert_eq!(
            self.payment_status,
            PaymentStatus::derive(self.paid_amount, self.amount_due),
            "Invariant violated: status out of sync"
        );
    }
}

impl Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Transaction", 5)?;
        state.serialize_field("transaction", &self.id)?;
        state.serialize_field("amount_due", &money::to_cents(self.amount_due))?;
        state.serialize_field("paid_amount", &money::to_cents(self.paid_amount))?;
        state.serialize_field("balance_amount", &money::to_cents(self.balance_amount))?;
        state.serialize_field("payment_status", &self.payment_status)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_transaction_is_unpaid() {
        let tx = Transaction::new(TransactionId(1), dec!(1000)).unwrap();
        assert_eq!(tx.amount_due(), dec!(1000.00));
        assert_eq!(tx.paid_amount(), Decimal::ZERO);
        assert_eq!(tx.balance_amount(), dec!(1000.00));
        assert_eq!(tx.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn new_rejects_invalid_amount_due() {
        assert_eq!(
            Transaction::new(TransactionId(1), Decimal::ZERO),
            Err(SettlementError::InvalidAmount("0".into()))
        );
        assert!(Transaction::new(TransactionId(1), dec!(10.001)).is_err());
    }

    #[test]
    fn partial_settlement_updates_cached_fields() {
        let tx = Transaction::new(TransactionId(1), dec!(1000.00)).unwrap();
        let tx = tx.with_settlement(dec!(300.00));
        assert_eq!(tx.paid_amount(), dec!(300.00));
        assert_eq!(tx.balance_amount(), dec!(700.00));
        assert_eq!(tx.payment_status(), PaymentStatus::Partial);
    }

    #[test]
    fn exact_settlement_marks_paid() {
        let tx = Transaction::new(TransactionId(1), dec!(999.99)).unwrap();
        let tx = tx
            .with_settlement(dec!(333.33))
            .with_settlement(dec!(333.33))
            .with_settlement(dec!(333.33));
        assert_eq!(tx.paid_amount(), dec!(999.99));
        assert_eq!(tx.balance_amount(), dec!(0.00));
        assert_eq!(tx.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn with_settlement_leaves_original_untouched() {
        let tx = Transaction::new(TransactionId(1), dec!(50.00)).unwrap();
        let _ = tx.with_settlement(dec!(20.00));
        assert_eq!(tx.paid_amount(), Decimal::ZERO);
    }

    #[test]
    fn first_settlement_keeps_cent_scale() {
        let tx = Transaction::new(TransactionId(1), dec!(1000.00))
            .unwrap()
            .with_settlement(dec!(250.5));
        assert_eq!(tx.paid_amount().to_string(), "250.50");
        assert_eq!(tx.balance_amount().to_string(), "749.50");
    }

    #[test]
    fn serializer_writes_two_decimal_places() {
        let tx = Transaction::new(TransactionId(7), dec!(1000))
            .unwrap()
            .with_settlement(dec!(250.5));
        let json: serde_json::Value = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["transaction"], 7);
        assert_eq!(json["amount_due"], "1000.00");
        assert_eq!(json["paid_amount"], "250.50");
        assert_eq!(json["balance_amount"], "749.50");
        assert_eq!(json["payment_status"], "partial");
    }

    #[test]
    fn unpaid_transaction_serializes_zero_with_cents() {
        let tx = Transaction::new(TransactionId(8), dec!(12.5)).unwrap();
        let json: serde_json::Value = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["amount_due"], "12.50");
        assert_eq!(json["paid_amount"], "0.00");
        assert_eq!(json["balance_amount"], "12.50");
    }
}
