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

//! Payment status state machine.
//!
//! The status is never set directly; it is always derived from the paid
//! total and the amount due:
//!
//! ```text
//!  Unpaid ──settlement──► Partial ──settlement──► Paid
//!     │                                            ▲
//!     └──────────── settlement of full amount ─────┘
//! ```
//!
//! Settlements are append-only and positive, so no backward edge exists.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status for a transaction.
    ///
    /// `0 → Unpaid`, `>= amount_due → Paid`, anything in between `→ Partial`.
    pub fn derive(paid_amount: Decimal, amount_due: Decimal) -> Self {
        if paid_amount <= Decimal::ZERO {
            Self::Unpaid
        } else if paid_amount >= amount_due {
            Self::Paid
        } else {
            Self::Partial
        }
    }

    /// Returns `true` if a committed settlement may move `self` to `next`.
    ///
    /// Staying in `Partial` is allowed; every other edge must move forward.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Partial, Self::Partial) => true,
            (current, next) => next > current,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_paid_is_unpaid() {
        assert_eq!(
            PaymentStatus::derive(Decimal::ZERO, dec!(1000.00)),
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn part_paid_is_partial() {
        assert_eq!(
            PaymentStatus::derive(dec!(0.01), dec!(1000.00)),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::derive(dec!(999.99), dec!(1000.00)),
            PaymentStatus::Partial
        );
    }

    #[test]
    fn fully_paid_is_paid() {
        assert_eq!(
            PaymentStatus::derive(dec!(999.99), dec!(999.99)),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn scale_does_not_affect_derivation() {
        assert_eq!(
            PaymentStatus::derive(dec!(1000), dec!(1000.00)),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn transitions_only_move_forward() {
        use PaymentStatus::*;
        assert!(Unpaid.can_transition_to(Partial));
        assert!(Unpaid.can_transition_to(Paid));
        assert!(Partial.can_transition_to(Partial));
        assert!(Partial.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Partial));
        assert!(!Paid.can_transition_to(Paid));
        assert!(!Partial.can_transition_to(Unpaid));
        assert!(!Unpaid.can_transition_to(Unpaid));
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }
}
