use super::error::EngineError;
use super::money::checked_sum;
use super::tax_type::TaxType;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared figures for one tax type. One variant per tax type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tax_type", rename_all = "snake_case")]
pub enum TaxableBase {
    Income(IncomeBase),
    Gst(GstBase),
    Payroll(PayrollBase),
    Excise(ExciseBase),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeBase {
    #[schemars(with = "f64")]
    pub gross_income: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub deductions: Decimal,
    #[serde(default)]
    pub allowances: Vec<Allowance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Allowance {
    pub name: String,
    #[schemars(with = "f64")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GstBase {
    #[schemars(with = "f64")]
    pub gross_sales: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub taxable_supplies: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub exempt_supplies: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub zero_rated_supplies: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub input_tax: Decimal,
    #[serde(default)]
    pub is_import: bool,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub import_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PayrollBase {
    pub employees: Vec<EmployeeSalary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmployeeSalary {
    pub employee_id: String,
    #[schemars(with = "f64")]
    pub annual_salary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExciseBase {
    pub items: Vec<ExciseItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExciseItem {
    pub product_category: String,
    #[serde(default)]
    pub product_code: Option<String>,
    #[schemars(with = "f64")]
    pub quantity: Decimal,
    #[schemars(with = "f64")]
    pub value: Decimal,
}

impl TaxableBase {
    pub fn tax_type(&self) -> TaxType {
        match self {
            TaxableBase::Income(_) => TaxType::Income,
            TaxableBase::Gst(_) => TaxType::Gst,
            TaxableBase::Payroll(_) => TaxType::Payroll,
            TaxableBase::Excise(_) => TaxType::Excise,
        }
    }

    /// Reject negative amounts and missing required fields before any calculation runs
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            TaxableBase::Income(base) => {
                non_negative("gross_income", base.gross_income)?;
                non_negative("deductions", base.deductions)?;
                for allowance in &base.allowances {
                    if allowance.name.trim().is_empty() {
                        return Err(EngineError::invalid("allowance without a name"));
                    }
                    non_negative(&format!("allowance '{}'", allowance.name), allowance.amount)?;
                }
                checked_sum("allowances", base.allowances.iter().map(|a| a.amount))?;
            }
            TaxableBase::Gst(base) => {
                non_negative("gross_sales", base.gross_sales)?;
                non_negative("taxable_supplies", base.taxable_supplies)?;
                non_negative("exempt_supplies", base.exempt_supplies)?;
                non_negative("zero_rated_supplies", base.zero_rated_supplies)?;
                non_negative("input_tax", base.input_tax)?;
                non_negative("import_value", base.import_value)?;
                if base.is_import && base.import_value.is_zero() {
                    return Err(EngineError::invalid("import declared without an import_value"));
                }
                let supplies = checked_sum(
                    "GST supplies",
                    [
                        base.taxable_supplies,
                        base.exempt_supplies,
                        base.zero_rated_supplies,
                    ],
                )?;
                if supplies > base.gross_sales {
                    log::warn!(
                        "GST supplies total {} exceeds gross sales {}",
                        supplies,
                        base.gross_sales
                    );
                }
            }
            TaxableBase::Payroll(base) => {
                if base.employees.is_empty() {
                    return Err(EngineError::invalid("payroll has no employees"));
                }
                for employee in &base.employees {
                    if employee.employee_id.trim().is_empty() {
                        return Err(EngineError::invalid("employee without an id"));
                    }
                    non_negative(
                        &format!("salary of {}", employee.employee_id),
                        employee.annual_salary,
                    )?;
                }
                checked_sum("total payroll", base.employees.iter().map(|e| e.annual_salary))?;
            }
            TaxableBase::Excise(base) => {
                if base.items.is_empty() {
                    return Err(EngineError::invalid("excise return has no items"));
                }
                for item in &base.items {
                    if item.product_category.trim().is_empty() {
                        return Err(EngineError::invalid("excise item without a product category"));
                    }
                    non_negative(&format!("quantity of {}", item.product_category), item.quantity)?;
                    non_negative(&format!("value of {}", item.product_category), item.value)?;
                }
            }
        }
        Ok(())
    }
}

fn non_negative(field: &str, value: Decimal) -> Result<(), EngineError> {
    if value < Decimal::ZERO {
        Err(EngineError::invalid(format!("{field} is negative ({value})")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deserializes_tagged_base() {
        let json = r#"{"tax_type": "income", "gross_income": "5000000", "deductions": 0}"#;
        let base: TaxableBase = serde_json::from_str(json).unwrap();
        assert_eq!(base.tax_type(), TaxType::Income);
        match base {
            TaxableBase::Income(income) => {
                assert_eq!(income.gross_income, dec!(5000000));
                assert!(income.allowances.is_empty());
            }
            other => panic!("unexpected base {other:?}"),
        }
    }

    #[test]
    fn negative_amount_rejected() {
        let base = TaxableBase::Income(IncomeBase {
            gross_income: dec!(100),
            deductions: dec!(-1),
            allowances: vec![],
        });
        let err = base.validate().unwrap_err();
        assert_eq!(err, EngineError::invalid("deductions is negative (-1)"));
    }

    #[test]
    fn overflowing_supplies_rejected() {
        let base = TaxableBase::Gst(GstBase {
            gross_sales: Decimal::MAX,
            taxable_supplies: Decimal::MAX,
            exempt_supplies: dec!(1),
            ..GstBase::default()
        });
        assert_eq!(
            base.validate().unwrap_err(),
            EngineError::invalid("GST supplies is out of range")
        );
    }

    #[test]
    fn empty_payroll_rejected() {
        let base = TaxableBase::Payroll(PayrollBase { employees: vec![] });
        assert!(base.validate().unwrap_err().is_input_error());
    }

    #[test]
    fn import_requires_value() {
        let base = TaxableBase::Gst(GstBase {
            gross_sales: dec!(100),
            is_import: true,
            ..GstBase::default()
        });
        assert!(base.validate().is_err());
    }

    #[test]
    fn excise_item_requires_category() {
        let base = TaxableBase::Excise(ExciseBase {
            items: vec![ExciseItem {
                product_category: " ".to_string(),
                product_code: None,
                quantity: dec!(1),
                value: dec!(1),
            }],
        });
        assert!(base.validate().is_err());
    }
}
