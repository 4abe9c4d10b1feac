use super::base::{GstBase, TaxableBase};
use super::error::EngineError;
use super::money::{checked_product, checked_sum, round_money};
use super::rates::RateTable;
use rust_decimal::Decimal;
use serde::Serialize;

/// GST return result. `net_gst_liability` and `refund_due` are never both non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GstResult {
    pub gst_rate: Decimal,
    pub taxable_supplies: Decimal,
    pub exempt_supplies: Decimal,
    pub zero_rated_supplies: Decimal,
    pub output_gst: Decimal,
    /// Self-assessed GST on imports, included in `total_output_gst`
    pub reverse_charge_gst: Decimal,
    pub total_output_gst: Decimal,
    pub input_tax: Decimal,
    /// Input tax attributable to taxable and zero-rated supplies
    pub creditable_input_tax: Decimal,
    /// Input tax attributable to exempt supplies
    pub disallowed_input_tax: Decimal,
    pub net_gst_liability: Decimal,
    pub refund_due: Decimal,
}

impl GstResult {
    pub fn payable(&self) -> Decimal {
        self.net_gst_liability
    }
}

pub fn calculate_gst(base: &GstBase, table: &RateTable) -> Result<GstResult, EngineError> {
    TaxableBase::Gst(base.clone()).validate()?;
    let gst_rate = table.gst_rate()?;

    // Exempt and zero-rated supplies carry no output tax
    let output_gst = round_money(checked_product("output GST", base.taxable_supplies, gst_rate)?);
    let reverse_charge_gst = if base.is_import {
        round_money(checked_product("reverse charge GST", base.import_value, gst_rate)?)
    } else {
        Decimal::ZERO
    };
    let total_output_gst = checked_sum("total output GST", [output_gst, reverse_charge_gst])?;

    // Zero-rated supplies keep their input credit, exempt supplies lose it
    let creditable_supplies = checked_sum(
        "creditable supplies",
        [base.taxable_supplies, base.zero_rated_supplies],
    )?;
    let all_supplies = checked_sum("GST supplies", [creditable_supplies, base.exempt_supplies])?;
    let creditable_input_tax = if base.exempt_supplies.is_zero() || all_supplies.is_zero() {
        base.input_tax
    } else {
        round_money(checked_product("creditable input tax", base.input_tax, creditable_supplies)? / all_supplies)
    };
    let disallowed_input_tax = base.input_tax - creditable_input_tax;

    let net = total_output_gst - creditable_input_tax;
    let (net_gst_liability, refund_due) = if net >= Decimal::ZERO {
        (net, Decimal::ZERO)
    } else {
        (Decimal::ZERO, -net)
    };

    log::debug!(
        "GST: output {} + reverse charge {} - creditable input {} (disallowed {}) => liability {}, refund {}",
        output_gst,
        reverse_charge_gst,
        creditable_input_tax,
        disallowed_input_tax,
        net_gst_liability,
        refund_due
    );

    Ok(GstResult {
        gst_rate,
        taxable_supplies: base.taxable_supplies,
        exempt_supplies: base.exempt_supplies,
        zero_rated_supplies: base.zero_rated_supplies,
        output_gst,
        reverse_charge_gst,
        total_output_gst,
        input_tax: base.input_tax,
        creditable_input_tax,
        disallowed_input_tax,
        net_gst_liability,
        refund_due,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::fixtures::gst_table;
    use proptest::prelude::{prop_assert, proptest};
    use rust_decimal_macros::dec;

    fn base(taxable: Decimal, input: Decimal) -> GstBase {
        GstBase {
            gross_sales: taxable,
            taxable_supplies: taxable,
            input_tax: input,
            ..GstBase::default()
        }
    }

    #[test]
    fn output_minus_input() {
        let result = calculate_gst(&base(dec!(10000000), dec!(600000)), &gst_table()).unwrap();
        assert_eq!(result.output_gst, dec!(1800000));
        assert_eq!(result.net_gst_liability, dec!(1200000));
        assert_eq!(result.refund_due, dec!(0));
    }

    #[test]
    fn excess_input_becomes_refund() {
        let result = calculate_gst(&base(dec!(1000000), dec!(500000)), &gst_table()).unwrap();
        assert_eq!(result.output_gst, dec!(180000));
        assert_eq!(result.net_gst_liability, dec!(0));
        assert_eq!(result.refund_due, dec!(320000));
    }

    #[test]
    fn reverse_charge_tracked_separately() {
        let mut input = base(dec!(1000000), dec!(0));
        input.is_import = true;
        input.import_value = dec!(2000000);
        let result = calculate_gst(&input, &gst_table()).unwrap();
        assert_eq!(result.output_gst, dec!(180000));
        assert_eq!(result.reverse_charge_gst, dec!(360000));
        assert_eq!(result.total_output_gst, dec!(540000));
        assert_eq!(result.net_gst_liability, dec!(540000));
    }

    #[test]
    fn import_value_ignored_without_import_flag() {
        let mut input = base(dec!(1000000), dec!(0));
        input.import_value = dec!(2000000);
        let result = calculate_gst(&input, &gst_table()).unwrap();
        assert_eq!(result.reverse_charge_gst, dec!(0));
    }

    #[test]
    fn zero_rated_keeps_input_credit() {
        let input = GstBase {
            gross_sales: dec!(5000000),
            zero_rated_supplies: dec!(5000000),
            input_tax: dec!(400000),
            ..GstBase::default()
        };
        let result = calculate_gst(&input, &gst_table()).unwrap();
        assert_eq!(result.output_gst, dec!(0));
        assert_eq!(result.creditable_input_tax, dec!(400000));
        assert_eq!(result.refund_due, dec!(400000));
    }

    #[test]
    fn exempt_supplies_lose_input_credit() {
        let input = GstBase {
            gross_sales: dec!(5000000),
            exempt_supplies: dec!(5000000),
            input_tax: dec!(400000),
            ..GstBase::default()
        };
        let result = calculate_gst(&input, &gst_table()).unwrap();
        assert_eq!(result.output_gst, dec!(0));
        assert_eq!(result.creditable_input_tax, dec!(0));
        assert_eq!(result.disallowed_input_tax, dec!(400000));
        assert_eq!(result.refund_due, dec!(0));
        assert_eq!(result.net_gst_liability, dec!(0));
    }

    #[test]
    fn mixed_supplies_apportion_input_tax() {
        let input = GstBase {
            gross_sales: dec!(4000000),
            taxable_supplies: dec!(2000000),
            zero_rated_supplies: dec!(1000000),
            exempt_supplies: dec!(1000000),
            input_tax: dec!(400000),
            ..GstBase::default()
        };
        let result = calculate_gst(&input, &gst_table()).unwrap();
        assert_eq!(result.creditable_input_tax, dec!(300000));
        assert_eq!(result.disallowed_input_tax, dec!(100000));
        assert_eq!(result.net_gst_liability, dec!(60000));
    }

    #[test]
    fn missing_gst_rate_is_rate_table_error() {
        let mut table = gst_table();
        table.parameters.gst_rate = None;
        let err = calculate_gst(&base(dec!(1), dec!(0)), &table).unwrap_err();
        assert_eq!(err.kind(), "InvalidRateTable");
    }

    #[test]
    fn overflowing_figures_are_input_errors() {
        let input = GstBase {
            gross_sales: Decimal::MAX,
            taxable_supplies: Decimal::MAX,
            exempt_supplies: dec!(1),
            ..GstBase::default()
        };
        let err = calculate_gst(&input, &gst_table()).unwrap_err();
        assert!(err.is_input_error());

        let mut table = gst_table();
        table.parameters.gst_rate = Some(dec!(2));
        let err = calculate_gst(&base(Decimal::MAX, dec!(0)), &table).unwrap_err();
        assert_eq!(err, EngineError::invalid("output GST is out of range"));
    }

    proptest! {
        #[test]
        fn prop_liability_and_refund_exclusive(
            taxable in 0u64..100_000_000,
            zero_rated in 0u64..100_000_000,
            exempt in 0u64..100_000_000,
            input in 0u64..50_000_000,
            import in 0u64..10_000_000,
        ) {
            let input = GstBase {
                gross_sales: Decimal::from(taxable + zero_rated + exempt),
                taxable_supplies: Decimal::from(taxable),
                zero_rated_supplies: Decimal::from(zero_rated),
                exempt_supplies: Decimal::from(exempt),
                input_tax: Decimal::from(input),
                is_import: import > 0,
                import_value: Decimal::from(import),
            };
            let result = calculate_gst(&input, &gst_table()).unwrap();
            prop_assert!(result.net_gst_liability >= Decimal::ZERO);
            prop_assert!(result.refund_due >= Decimal::ZERO);
            prop_assert!(result.net_gst_liability.is_zero() || result.refund_due.is_zero());
        }
    }
}
