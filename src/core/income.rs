use super::base::{IncomeBase, TaxableBase};
use super::brackets::{evaluate, CalculationResult};
use super::error::EngineError;
use super::money::checked_sum;
use super::rates::RateTable;
use rust_decimal::Decimal;
use serde::Serialize;

/// Income tax for one taxpayer and year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeTaxResult {
    pub gross_income: Decimal,
    pub deductions: Decimal,
    pub total_allowances: Decimal,
    pub calculation: CalculationResult,
}

impl IncomeTaxResult {
    pub fn payable(&self) -> Decimal {
        self.calculation.payable_tax
    }
}

/// taxable income = max(0, gross - deductions - allowances), then the brackets
pub fn calculate_income_tax(base: &IncomeBase, table: &RateTable) -> Result<IncomeTaxResult, EngineError> {
    TaxableBase::Income(base.clone()).validate()?;

    let total_allowances = checked_sum("allowances", base.allowances.iter().map(|a| a.amount))?;
    // Can only overflow below zero, where it clamps anyway
    let taxable = (base.gross_income - base.deductions)
        .checked_sub(total_allowances)
        .map_or(Decimal::ZERO, |taxable| taxable.max(Decimal::ZERO));
    log::debug!(
        "Income tax: gross {} - deductions {} - allowances {} = taxable {}",
        base.gross_income,
        base.deductions,
        total_allowances,
        taxable
    );

    let calculation = evaluate(taxable, &table.brackets, table.minimum_tax_rate())?;

    Ok(IncomeTaxResult {
        gross_income: base.gross_income,
        deductions: base.deductions,
        total_allowances,
        calculation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::base::Allowance;
    use crate::core::rates::fixtures::income_table;
    use rust_decimal_macros::dec;

    fn income(gross: Decimal, deductions: Decimal) -> IncomeBase {
        IncomeBase {
            gross_income: gross,
            deductions,
            allowances: vec![],
        }
    }

    #[test]
    fn worked_example() {
        let result = calculate_income_tax(&income(dec!(5000000), dec!(0)), &income_table()).unwrap();
        assert_eq!(result.calculation.taxable_amount, dec!(5000000));
        assert_eq!(result.payable(), dec!(300000));
    }

    #[test]
    fn deductions_and_allowances_reduce_taxable() {
        let mut base = income(dec!(7000000), dec!(500000));
        base.allowances = vec![
            Allowance {
                name: "housing".to_string(),
                amount: dec!(1000000),
            },
            Allowance {
                name: "transport".to_string(),
                amount: dec!(500000),
            },
        ];
        let result = calculate_income_tax(&base, &income_table()).unwrap();
        assert_eq!(result.total_allowances, dec!(1500000));
        assert_eq!(result.calculation.taxable_amount, dec!(5000000));
        assert_eq!(result.payable(), dec!(300000));
    }

    #[test]
    fn taxable_never_negative() {
        let result = calculate_income_tax(&income(dec!(100), dec!(1000)), &income_table()).unwrap();
        assert_eq!(result.calculation.taxable_amount, dec!(0));
        assert_eq!(result.payable(), dec!(0));
    }

    #[test]
    fn oversized_reliefs_clamp_to_zero() {
        let mut base = income(dec!(0), Decimal::MAX);
        base.allowances = vec![Allowance {
            name: "housing".to_string(),
            amount: Decimal::MAX,
        }];
        let result = calculate_income_tax(&base, &income_table()).unwrap();
        assert_eq!(result.calculation.taxable_amount, dec!(0));

        base.allowances.push(Allowance {
            name: "transport".to_string(),
            amount: dec!(1),
        });
        let err = calculate_income_tax(&base, &income_table()).unwrap_err();
        assert_eq!(err, EngineError::invalid("allowances is out of range"));
    }

    #[test]
    fn minimum_tax_from_table() {
        let mut table = income_table();
        table.parameters.minimum_tax_rate = Some(dec!(0.01));
        let result = calculate_income_tax(&income(dec!(2000000), dec!(0)), &table).unwrap();
        assert_eq!(result.calculation.gross_tax, dec!(0));
        assert_eq!(result.calculation.minimum_tax_floor, dec!(20000));
        assert_eq!(result.payable(), dec!(20000));
    }

    #[test]
    fn negative_income_rejected() {
        let err = calculate_income_tax(&income(dec!(-5), dec!(0)), &income_table()).unwrap_err();
        assert!(err.is_input_error());
    }
}
