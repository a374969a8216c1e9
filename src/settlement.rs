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

//! Settlement records.
//!
//! A [`Settlement`] is one payment applied toward a transaction. Settlements
//! are immutable once committed and are never updated or deleted.

use crate::SettlementError;
use crate::base::{CashierId, SettlementId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a settlement was paid. Opaque to the engine beyond being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Gcash,
    Maya,
    CreditCard,
    BankTransfer,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 5] = [
        Self::Cash,
        Self::Gcash,
        Self::Maya,
        Self::CreditCard,
        Self::BankTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Gcash => "gcash",
            Self::Maya => "maya",
            Self::CreditCard => "credit_card",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| SettlementError::UnknownPaymentMode(s.to_string()))
    }
}

/// A committed payment toward a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    id: SettlementId,
    transaction_id: TransactionId,
    amount: Decimal,
    payment_mode: PaymentMode,
    cashier_id: CashierId,
    created_at: DateTime<Utc>,
}

impl Settlement {
    pub(crate) fn new(
        id: SettlementId,
        transaction_id: TransactionId,
        amount: Decimal,
        payment_mode: PaymentMode,
        cashier_id: CashierId,
        created_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(
            amount > Decimal::ZERO,
            "Invariant violated: settlement amount must be positive: {}",
            amount
        );
        Self {
            id,
            transaction_id,
            amount,
            payment_mode,
            cashier_id,
            created_at,
        }
    }

    pub fn id(&self) -> SettlementId {
        self.id
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
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
}
