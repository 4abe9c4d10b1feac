use super::error::EngineError;
use super::money::{checked_product, checked_sum, round_money, round_rate};
use super::rates::Bracket;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tax charged within one bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlice {
    pub lower: Decimal,
    pub upper: Option<Decimal>,
    pub rate: Decimal,
    pub taxable_in_bracket: Decimal,
    pub amount: Decimal,
}

impl BracketSlice {
    pub fn range_display(&self) -> String {
        match self.upper {
            Some(upper) => format!(
                "{} - {}",
                super::money::format_amount(self.lower),
                super::money::format_amount(upper)
            ),
            None => format!("{}+", super::money::format_amount(self.lower)),
        }
    }
}

/// Result of a progressive bracket evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub taxable_amount: Decimal,
    pub bracket_breakdown: Vec<BracketSlice>,
    /// Sum of `bracket_breakdown` amounts
    pub gross_tax: Decimal,
    /// `taxable_amount x minimum_tax_rate`; zero when the table has no minimum tax
    pub minimum_tax_floor: Decimal,
    pub payable_tax: Decimal,
    pub effective_rate: Decimal,
    pub marginal_rate: Decimal,
}

impl CalculationResult {
    /// True when the minimum-tax floor, not the brackets, set the payable amount
    pub fn floor_applied(&self) -> bool {
        self.minimum_tax_floor > self.gross_tax
    }
}

/// Walk `brackets` (ascending, contiguous, starting at 0) over `taxable_amount`.
///
/// Each slice amount is rounded before summing so the breakdown always adds
/// up to `gross_tax`. A taxable amount equal to a bracket's upper bound stays
/// in that bracket.
pub fn evaluate(
    taxable_amount: Decimal,
    brackets: &[Bracket],
    minimum_tax_rate: Option<Decimal>,
) -> Result<CalculationResult, EngineError> {
    if taxable_amount < Decimal::ZERO {
        return Err(EngineError::invalid(format!(
            "taxable amount {taxable_amount} is negative"
        )));
    }
    if brackets.is_empty() {
        return Err(EngineError::invalid("no brackets to evaluate"));
    }

    let mut breakdown = Vec::with_capacity(brackets.len());
    let mut gross_tax = Decimal::ZERO;
    let mut marginal_rate = Decimal::ZERO;

    for bracket in brackets {
        let top = bracket.upper.map_or(taxable_amount, |upper| taxable_amount.min(upper));
        let taxable_in_bracket = (top - bracket.lower).max(Decimal::ZERO);
        let amount = round_money(checked_product("bracket tax", taxable_in_bracket, bracket.rate)?);
        log::debug!(
            "Bracket {}..{:?} @ {}: taxable {} -> {}",
            bracket.lower,
            bracket.upper,
            bracket.rate,
            taxable_in_bracket,
            amount
        );

        gross_tax = checked_sum("gross tax", [gross_tax, amount])?;
        marginal_rate = bracket.rate;
        breakdown.push(BracketSlice {
            lower: bracket.lower,
            upper: bracket.upper,
            rate: bracket.rate,
            taxable_in_bracket,
            amount,
        });

        if bracket.reaches(taxable_amount) {
            break;
        }
    }

    let minimum_tax_floor = match minimum_tax_rate {
        Some(rate) => round_money(checked_product("minimum tax", taxable_amount, rate)?),
        None => Decimal::ZERO,
    };
    let payable_tax = gross_tax.max(minimum_tax_floor);
    let effective_rate = if taxable_amount.is_zero() {
        Decimal::ZERO
    } else {
        round_rate(payable_tax / taxable_amount)
    };

    Ok(CalculationResult {
        taxable_amount,
        bracket_breakdown: breakdown,
        gross_tax,
        minimum_tax_floor,
        payable_tax,
        effective_rate,
        marginal_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::fixtures::income_brackets;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rust_decimal_macros::dec;

    #[test]
    fn five_million_taxed_at_fifteen_percent_above_three_million() {
        let result = evaluate(dec!(5000000), &income_brackets(), None).unwrap();
        assert_eq!(result.gross_tax, dec!(300000));
        assert_eq!(result.payable_tax, dec!(300000));
        assert_eq!(result.marginal_rate, dec!(0.15));
        assert_eq!(result.effective_rate, dec!(0.06));
        assert_eq!(result.bracket_breakdown.len(), 2);
        assert_eq!(result.bracket_breakdown[0].amount, dec!(0));
        assert_eq!(result.bracket_breakdown[1].taxable_in_bracket, dec!(2000000));
        assert_eq!(result.bracket_breakdown[1].amount, dec!(300000));
    }

    #[test]
    fn boundary_amount_stays_in_lower_bracket() {
        let result = evaluate(dec!(3000000), &income_brackets(), None).unwrap();
        assert_eq!(result.bracket_breakdown.len(), 1);
        assert_eq!(result.marginal_rate, dec!(0));
        assert_eq!(result.gross_tax, dec!(0));

        let result = evaluate(dec!(6000000), &income_brackets(), None).unwrap();
        assert_eq!(result.bracket_breakdown.len(), 2);
        assert_eq!(result.marginal_rate, dec!(0.15));
        assert_eq!(result.gross_tax, dec!(450000));
    }

    #[test]
    fn top_bracket_is_unbounded() {
        let result = evaluate(dec!(10000000), &income_brackets(), None).unwrap();
        assert_eq!(result.bracket_breakdown.len(), 3);
        assert_eq!(result.bracket_breakdown[2].taxable_in_bracket, dec!(4000000));
        assert_eq!(result.gross_tax, dec!(1450000));
        assert_eq!(result.marginal_rate, dec!(0.25));
    }

    #[test]
    fn zero_taxable_amount() {
        let result = evaluate(dec!(0), &income_brackets(), Some(dec!(0.01))).unwrap();
        assert_eq!(result.gross_tax, dec!(0));
        assert_eq!(result.payable_tax, dec!(0));
        assert_eq!(result.effective_rate, dec!(0));
    }

    #[test]
    fn minimum_tax_floor_applies_when_higher() {
        let result = evaluate(dec!(2000000), &income_brackets(), Some(dec!(0.005))).unwrap();
        assert_eq!(result.gross_tax, dec!(0));
        assert_eq!(result.minimum_tax_floor, dec!(10000));
        assert_eq!(result.payable_tax, dec!(10000));
        assert!(result.floor_applied());
    }

    #[test]
    fn minimum_tax_floor_retained_when_lower() {
        let result = evaluate(dec!(5000000), &income_brackets(), Some(dec!(0.005))).unwrap();
        assert_eq!(result.minimum_tax_floor, dec!(25000));
        assert_eq!(result.payable_tax, dec!(300000));
        assert!(!result.floor_applied());
    }

    #[test]
    fn negative_taxable_rejected() {
        let err = evaluate(dec!(-1), &income_brackets(), None).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn minimum_tax_overflow_is_input_error() {
        let err = evaluate(Decimal::MAX, &income_brackets(), Some(dec!(2))).unwrap_err();
        assert_eq!(err, EngineError::invalid("minimum tax is out of range"));
    }

    #[test]
    fn slice_amounts_are_rounded() {
        let result = evaluate(dec!(3000000.03), &income_brackets(), None).unwrap();
        // 0.03 x 15% = 0.0045 -> 0.00
        assert_eq!(result.bracket_breakdown[1].amount, dec!(0));
        assert_eq!(result.gross_tax, dec!(0));
    }

    #[test]
    fn range_display() {
        let result = evaluate(dec!(7000000), &income_brackets(), None).unwrap();
        assert_eq!(result.bracket_breakdown[0].range_display(), "0.00 - 3,000,000.00");
        assert_eq!(result.bracket_breakdown[2].range_display(), "6,000,000.00+");
    }

    proptest! {
        #[test]
        fn prop_gross_tax_is_monotonic(a in 0u64..50_000_000, b in 0u64..50_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let low = evaluate(Decimal::from(lo), &income_brackets(), None).unwrap();
            let high = evaluate(Decimal::from(hi), &income_brackets(), None).unwrap();
            prop_assert!(low.gross_tax <= high.gross_tax);
        }

        #[test]
        fn prop_breakdown_sums_to_gross(cents in 0u64..5_000_000_000) {
            let amount = Decimal::new(cents as i64, 2);
            let result = evaluate(amount, &income_brackets(), None).unwrap();
            let sum: Decimal = result.bracket_breakdown.iter().map(|s| s.amount).sum();
            prop_assert_eq!(sum, result.gross_tax);
            let taxed: Decimal = result.bracket_breakdown.iter().map(|s| s.taxable_in_bracket).sum();
            prop_assert_eq!(taxed, amount);
        }

        #[test]
        fn prop_payable_is_max_of_gross_and_floor(amount in 0u64..50_000_000, bp in 0u32..300) {
            let rate = Decimal::new(bp as i64, 4);
            let result = evaluate(Decimal::from(amount), &income_brackets(), Some(rate)).unwrap();
            prop_assert_eq!(result.payable_tax, result.gross_tax.max(result.minimum_tax_floor));
            prop_assert!(result.payable_tax >= Decimal::ZERO);
        }
    }
}
