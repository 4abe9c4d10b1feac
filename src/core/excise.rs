use super::base::{ExciseBase, TaxableBase};
use super::error::EngineError;
use super::money::{checked_product, checked_sum, round_money};
use super::rates::{DutyBasis, RateTable};
use rust_decimal::Decimal;
use serde::Serialize;

/// Duty on one line item. Both components are always present; an inapplicable one is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExciseLine {
    pub product_category: String,
    pub product_code: Option<String>,
    pub basis: DutyBasis,
    pub quantity: Decimal,
    pub specific_rate: Decimal,
    pub specific_duty: Decimal,
    pub value: Decimal,
    pub ad_valorem_rate: Decimal,
    pub ad_valorem_duty: Decimal,
    pub total_duty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExciseResult {
    pub lines: Vec<ExciseLine>,
    pub total_specific_duty: Decimal,
    pub total_ad_valorem_duty: Decimal,
    pub total_duty: Decimal,
}

impl ExciseResult {
    pub fn payable(&self) -> Decimal {
        self.total_duty
    }
}

pub fn calculate_excise(base: &ExciseBase, table: &RateTable) -> Result<ExciseResult, EngineError> {
    TaxableBase::Excise(base.clone()).validate()?;

    let mut lines = Vec::with_capacity(base.items.len());
    for item in &base.items {
        let rate = table.excise_rate_for(&item.product_category, item.product_code.as_deref())?;
        let specific_rate = rate.effective_specific_rate();
        let ad_valorem_rate = rate.effective_ad_valorem_rate();
        let specific_duty = round_money(checked_product("specific duty", item.quantity, specific_rate)?);
        let ad_valorem_duty = round_money(checked_product("ad valorem duty", item.value, ad_valorem_rate)?);
        let total_duty = checked_sum("line duty", [specific_duty, ad_valorem_duty])?;
        log::debug!(
            "Excise {} ({:?}): {} x {} + {} x {}",
            item.product_category,
            rate.basis,
            item.quantity,
            specific_rate,
            item.value,
            ad_valorem_rate
        );
        lines.push(ExciseLine {
            product_category: item.product_category.clone(),
            product_code: item.product_code.clone(),
            basis: rate.basis,
            quantity: item.quantity,
            specific_rate,
            specific_duty,
            value: item.value,
            ad_valorem_rate,
            ad_valorem_duty,
            total_duty,
        });
    }

    let total_specific_duty = checked_sum("specific duty", lines.iter().map(|l| l.specific_duty))?;
    let total_ad_valorem_duty = checked_sum("ad valorem duty", lines.iter().map(|l| l.ad_valorem_duty))?;
    let total_duty = checked_sum("excise duty", lines.iter().map(|l| l.total_duty))?;

    Ok(ExciseResult {
        lines,
        total_specific_duty,
        total_ad_valorem_duty,
        total_duty,
    })
}
