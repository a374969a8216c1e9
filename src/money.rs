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

//! Monetary amount validation.
//!
//! All amounts are exact [`Decimal`] values with [`MONETARY_SCALE`] fractional
//! digits. Binary floats are only accepted through [`amount_from_f64`], which
//! rounds them to cents before validating.

use crate::SettlementError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of fractional digits carried by every amount.
pub const MONETARY_SCALE: u32 = 2;

/// Checks that `amount` is positive with at most two fractional digits and
/// returns it rescaled to exactly two.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use settlement_engine_rs::money::validate_amount;
///
/// assert_eq!(validate_amount(dec!(12.5)).unwrap().to_string(), "12.50");
/// assert!(validate_amount(dec!(0.001)).is_err());
/// ```
pub fn validate_amount(amount: Decimal) -> Result<Decimal, SettlementError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > MONETARY_SCALE {
        return Err(SettlementError::InvalidAmount(amount.to_string()));
    }
    Ok(to_cents(amount))
}

/// Returns `amount` with exactly [`MONETARY_SCALE`] fractional digits,
/// padding with zeros where needed.
///
/// ```
/// use rust_decimal_macros::dec;
/// use settlement_engine_rs::money::to_cents;
///
/// assert_eq!(to_cents(dec!(250.5)).to_string(), "250.50");
/// ```
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(MONETARY_SCALE);
    amount
}

/// Parses a textual amount such as `"333.33"`.
pub fn parse_amount(raw: &str) -> Result<Decimal, SettlementError> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| SettlementError::InvalidAmount(raw.to_string()))?;
    validate_amount(amount)
}

/// Converts a float collected at the boundary into an exact amount.
///
/// Residual binary representation (`0.1 + 0.2`) is rounded to cents,
/// half away from zero, before validation.
pub fn amount_from_f64(value: f64) -> Result<Decimal, SettlementError> {
    let amount = Decimal::from_f64(value)
        .ok_or_else(|| SettlementError::InvalidAmount(value.to_string()))?
        .round_dp_with_strategy(MONETARY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    validate_amount(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn to_cents_pads_short_scales() {
        assert_eq!(to_cents(dec!(250.5)).to_string(), "250.50");
        assert_eq!(to_cents(dec!(7)).to_string(), "7.00");
        assert_eq!(to_cents(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(to_cents(dec!(0.10)).to_string(), "0.10");
    }

    #[test]
    fn accepts_two_decimal_places() {
        assert_eq!(validate_amount(dec!(333.33)), Ok(dec!(333.33)));
    }

    #[test]
    fn rescales_to_two_places() {
        let amount = validate_amount(dec!(1000)).unwrap();
        assert_eq!(amount.scale(), 2);
        assert_eq!(amount.to_string(), "1000.00");
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        assert_eq!(validate_amount(dec!(10.500)), Ok(dec!(10.50)));
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(
            validate_amount(Decimal::ZERO),
            Err(SettlementError::InvalidAmount("0".into()))
        );
        assert!(validate_amount(dec!(-1.00)).is_err());
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(
            validate_amount(dec!(1.005)),
            Err(SettlementError::InvalidAmount("1.005".into()))
        );
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_amount(" 150.00 "), Ok(dec!(150.00)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            parse_amount("12,00"),
            Err(SettlementError::InvalidAmount("12,00".into()))
        );
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn float_residue_is_normalised() {
        assert_eq!(amount_from_f64(0.1 + 0.2), Ok(dec!(0.30)));
        assert_eq!(amount_from_f64(333.33), Ok(dec!(333.33)));
    }

    #[test]
    fn float_rounds_half_away_from_zero() {
        assert_eq!(amount_from_f64(2.675000001), Ok(dec!(2.68)));
    }

    #[test]
    fn float_rejects_non_finite_and_dust() {
        assert!(amount_from_f64(f64::NAN).is_err());
        assert!(amount_from_f64(f64::INFINITY).is_err());
        // Rounds to 0.00, which is not positive.
        assert!(amount_from_f64(0.004).is_err());
    }
}
