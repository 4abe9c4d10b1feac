//! Rounding and display of monetary amounts and rates.
//!
//! Every amount the engine reports is rounded once, here, to two decimal
//! places with half-up (away from zero) rounding.

use super::error::EngineError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places for reported amounts
pub const MONEY_DP: u32 = 2;
/// Decimal places for derived rates (effective rate)
pub const RATE_DP: u32 = 6;

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Sum of `amounts`, an input error instead of a panic on overflow
pub fn checked_sum(
    what: &str,
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, EngineError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| out_of_range(what))
}

/// `amount x factor`, an input error instead of a panic on overflow
pub fn checked_product(what: &str, amount: Decimal, factor: Decimal) -> Result<Decimal, EngineError> {
    amount.checked_mul(factor).ok_or_else(|| out_of_range(what))
}

fn out_of_range(what: &str) -> EngineError {
    EngineError::invalid(format!("{what} is out of range"))
}

/// `amount` formatted with thousands separators and two decimals, e.g. `1,000,000.00`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let s = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Rate as a percentage without trailing zeros, e.g. `0.0005` -> `0.05%`
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * dec!(100)).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(0.135)), dec!(0.14));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(10)), dec!(10));
    }

    #[test]
    fn formats_amounts_with_separators() {
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(999.5)), "999.50");
        assert_eq!(format_amount(dec!(1000)), "1,000.00");
        assert_eq!(format_amount(dec!(1000000)), "1,000,000.00");
        assert_eq!(format_amount(dec!(22500)), "22,500.00");
        assert_eq!(format_amount(dec!(-1234567.891)), "-1,234,567.89");
    }

    #[test]
    fn formats_rates_as_percent() {
        assert_eq!(format_rate(dec!(0.05)), "5%");
        assert_eq!(format_rate(dec!(0.0005)), "0.05%");
        assert_eq!(format_rate(dec!(0.15)), "15%");
        assert_eq!(format_rate(dec!(0)), "0%");
    }

    #[test]
    fn overflow_is_an_input_error() {
        assert_eq!(checked_sum("total", [dec!(1), dec!(2.5)]).unwrap(), dec!(3.5));
        assert_eq!(checked_sum("total", []).unwrap(), Decimal::ZERO);

        let err = checked_sum("total", [Decimal::MAX, dec!(1)]).unwrap_err();
        assert_eq!(err, EngineError::invalid("total is out of range"));
        assert!(checked_product("duty", Decimal::MAX, dec!(2)).is_err());
        assert_eq!(checked_product("duty", dec!(100), dec!(0.5)).unwrap(), dec!(50));
    }

    #[test]
    fn rate_rounding_drops_trailing_zeros() {
        assert_eq!(round_rate(dec!(0.06)), dec!(0.06));
        assert_eq!(round_rate(dec!(0.0666666666)), dec!(0.066667));
    }
}
