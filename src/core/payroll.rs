use super::base::{PayrollBase, TaxableBase};
use super::brackets::{evaluate, CalculationResult};
use super::error::EngineError;
use super::money::{checked_product, checked_sum, round_money};
use super::rates::RateTable;
use rust_decimal::Decimal;
use serde::Serialize;

/// PAYE for one employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeePaye {
    pub employee_id: String,
    pub annual_salary: Decimal,
    pub taxable_salary: Decimal,
    pub paye: CalculationResult,
}

impl EmployeePaye {
    pub fn paye_amount(&self) -> Decimal {
        self.paye.payable_tax
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollResult {
    pub employees: Vec<EmployeePaye>,
    pub tax_free_threshold: Decimal,
    /// Gross payroll, the base of the skills levy
    pub total_payroll: Decimal,
    pub total_paye: Decimal,
    pub skills_levy_rate: Decimal,
    pub skills_development_levy: Decimal,
    pub total_payroll_tax: Decimal,
}

impl PayrollResult {
    pub fn payable(&self) -> Decimal {
        self.total_payroll_tax
    }
}

pub fn calculate_payroll_tax(base: &PayrollBase, table: &RateTable) -> Result<PayrollResult, EngineError> {
    TaxableBase::Payroll(base.clone()).validate()?;
    let threshold = table.tax_free_threshold();
    let levy_rate = table.skills_levy_rate()?;

    let mut employees = Vec::with_capacity(base.employees.len());
    for employee in &base.employees {
        let taxable_salary = (employee.annual_salary - threshold).max(Decimal::ZERO);
        // PAYE carries no minimum tax
        let paye = evaluate(taxable_salary, &table.brackets, None)?;
        log::debug!(
            "PAYE {}: salary {} taxable {} -> {}",
            employee.employee_id,
            employee.annual_salary,
            taxable_salary,
            paye.payable_tax
        );
        employees.push(EmployeePaye {
            employee_id: employee.employee_id.clone(),
            annual_salary: employee.annual_salary,
            taxable_salary,
            paye,
        });
    }

    let total_payroll = checked_sum("total payroll", base.employees.iter().map(|e| e.annual_salary))?;
    let total_paye = checked_sum("total PAYE", employees.iter().map(EmployeePaye::paye_amount))?;
    let skills_development_levy = round_money(checked_product("skills levy", total_payroll, levy_rate)?);
    let total_payroll_tax = checked_sum("total payroll tax", [total_paye, skills_development_levy])?;

    Ok(PayrollResult {
        employees,
        tax_free_threshold: threshold,
        total_payroll,
        total_paye,
        skills_levy_rate: levy_rate,
        skills_development_levy,
        total_payroll_tax,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::base::EmployeeSalary;
    use crate::core::rates::fixtures::payroll_table;
    use rust_decimal_macros::dec;

    fn payroll(salaries: &[(&str, Decimal)]) -> PayrollBase {
        PayrollBase {
            employees: salaries
                .iter()
                .map(|(id, salary)| EmployeeSalary {
                    employee_id: id.to_string(),
                    annual_salary: *salary,
                })
                .collect(),
        }
    }

    #[test]
    fn paye_per_employee_after_threshold() {
        // threshold 1m; brackets 0-3m @0, 3m-6m @15%, 6m+ @25%
        let base = payroll(&[("E1", dec!(6000000)), ("E2", dec!(2500000))]);
        let result = calculate_payroll_tax(&base, &payroll_table()).unwrap();

        assert_eq!(result.employees[0].taxable_salary, dec!(5000000));
        assert_eq!(result.employees[0].paye_amount(), dec!(300000));
        assert_eq!(result.employees[1].taxable_salary, dec!(1500000));
        assert_eq!(result.employees[1].paye_amount(), dec!(0));
        assert_eq!(result.total_paye, dec!(300000));
    }

    #[test]
    fn levy_on_gross_payroll_not_taxable_payroll() {
        let base = payroll(&[("E1", dec!(6000000)), ("E2", dec!(500000))]);
        let result = calculate_payroll_tax(&base, &payroll_table()).unwrap();
        assert_eq!(result.total_payroll, dec!(6500000));
        // 3.5% of 6,500,000
        assert_eq!(result.skills_development_levy, dec!(227500));
        assert_eq!(result.total_payroll_tax, dec!(527500));
    }

    #[test]
    fn salary_below_threshold_is_untaxed() {
        let base = payroll(&[("E1", dec!(800000))]);
        let result = calculate_payroll_tax(&base, &payroll_table()).unwrap();
        assert_eq!(result.employees[0].taxable_salary, dec!(0));
        assert_eq!(result.total_paye, dec!(0));
        assert_eq!(result.skills_development_levy, dec!(28000));
    }

    #[test]
    fn payroll_total_overflow_is_input_error() {
        let base = payroll(&[("E1", Decimal::MAX), ("E2", dec!(1))]);
        let err = calculate_payroll_tax(&base, &payroll_table()).unwrap_err();
        assert_eq!(err, EngineError::invalid("total payroll is out of range"));
    }

    #[test]
    fn negative_salary_rejected() {
        let base = payroll(&[("E1", dec!(-1))]);
        assert!(calculate_payroll_tax(&base, &payroll_table())
            .unwrap_err()
            .is_input_error());
    }
}
