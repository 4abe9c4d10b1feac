use super::audit;
use super::error::EngineError;
use super::money::{checked_product, checked_sum, round_money};
use super::rates::DAYS_PER_MONTH;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How late-payment interest accrues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InterestMethod {
    /// `amount x daily_rate x days`
    Simple { daily_rate: Decimal },
    /// Compounds once per completed 30-day period, simple daily for the remainder
    MonthlyCompounding {
        daily_rate: Decimal,
        monthly_rate: Decimal,
    },
}

/// Penalty parameters resolved from a rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyTerms {
    pub late_filing_rate: Decimal,
    pub interest: InterestMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyInput {
    /// Unpaid amount the penalty is charged on
    pub tax_amount: Decimal,
    pub due_date: NaiveDate,
    /// Filing/payment date; `None` means not yet filed
    pub actual_date: Option<NaiveDate>,
    /// Stands in for a missing `actual_date`
    pub evaluation_date: NaiveDate,
}

impl PenaltyInput {
    pub fn days_late(&self) -> i64 {
        let actual = self.actual_date.unwrap_or(self.evaluation_date);
        (actual - self.due_date).num_days().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    LateFiling,
    SimpleInterest,
    CompoundInterest,
    RemainderInterest,
}

impl PenaltyKind {
    pub fn display(&self) -> &'static str {
        match self {
            PenaltyKind::LateFiling => "Late filing penalty",
            PenaltyKind::SimpleInterest => "Late payment interest",
            PenaltyKind::CompoundInterest => "Compound interest",
            PenaltyKind::RemainderInterest => "Interest on remaining days",
        }
    }

    pub fn is_interest(&self) -> bool {
        !matches!(self, PenaltyKind::LateFiling)
    }
}

/// One line of the penalty breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyComponent {
    pub kind: PenaltyKind,
    pub base_amount: Decimal,
    pub rate: Decimal,
    /// Days the component accrued over (interest) or days late (filing penalty)
    pub days: i64,
    /// Completed 30-day periods, compound interest only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<u32>,
    pub amount: Decimal,
    /// Human-readable working, e.g. `1,000,000.00 x 0.05% x 45 days = 22,500.00`
    pub calculation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyResult {
    pub days_late: i64,
    pub late_filing_penalty: Decimal,
    pub late_payment_interest: Decimal,
    pub total_penalty: Decimal,
    pub breakdown: Vec<PenaltyComponent>,
}

/// Late-filing penalty plus late-payment interest.
///
/// Zero days late yields an all-zero result with an empty breakdown.
pub fn calculate_penalty(input: &PenaltyInput, terms: &PenaltyTerms) -> Result<PenaltyResult, EngineError> {
    if input.tax_amount < Decimal::ZERO {
        return Err(EngineError::invalid(format!(
            "penalty base {} is negative",
            input.tax_amount
        )));
    }

    let days_late = input.days_late();
    if days_late == 0 {
        return Ok(PenaltyResult::default());
    }

    let mut breakdown = Vec::new();

    // Binary: charged once however late the filing is
    breakdown.push(component(
        PenaltyKind::LateFiling,
        input.tax_amount,
        terms.late_filing_rate,
        days_late,
        None,
        round_money(checked_product(
            "late filing penalty",
            input.tax_amount,
            terms.late_filing_rate,
        )?),
    ));

    match terms.interest {
        InterestMethod::Simple { daily_rate } => {
            breakdown.push(component(
                PenaltyKind::SimpleInterest,
                input.tax_amount,
                daily_rate,
                days_late,
                None,
                daily_interest(input.tax_amount, daily_rate, days_late)?,
            ));
        }
        InterestMethod::MonthlyCompounding {
            daily_rate,
            monthly_rate,
        } => {
            let full_months = u32::try_from(days_late / DAYS_PER_MONTH)
                .map_err(|_| EngineError::invalid(format!("{days_late} days late is out of range")))?;
            let remainder_days = days_late % DAYS_PER_MONTH;

            if full_months > 0 {
                let growth = compound_growth(monthly_rate, full_months)?;
                let amount = checked_product("compound interest", input.tax_amount, growth)?;
                breakdown.push(component(
                    PenaltyKind::CompoundInterest,
                    input.tax_amount,
                    monthly_rate,
                    full_months as i64 * DAYS_PER_MONTH,
                    Some(full_months),
                    round_money(amount),
                ));
            }
            if remainder_days > 0 {
                breakdown.push(component(
                    PenaltyKind::RemainderInterest,
                    input.tax_amount,
                    daily_rate,
                    remainder_days,
                    None,
                    daily_interest(input.tax_amount, daily_rate, remainder_days)?,
                ));
            }
        }
    }

    let late_filing_penalty = checked_sum(
        "late filing penalty",
        breakdown
            .iter()
            .filter(|c| !c.kind.is_interest())
            .map(|c| c.amount),
    )?;
    let late_payment_interest = checked_sum(
        "late payment interest",
        breakdown
            .iter()
            .filter(|c| c.kind.is_interest())
            .map(|c| c.amount),
    )?;
    let total_penalty = checked_sum("total penalty", [late_filing_penalty, late_payment_interest])?;

    for item in &mut breakdown {
        item.calculation = audit::describe_component(item);
    }

    log::debug!(
        "Penalty on {}: {} days late, filing {} + interest {}",
        input.tax_amount,
        days_late,
        late_filing_penalty,
        late_payment_interest
    );

    Ok(PenaltyResult {
        days_late,
        late_filing_penalty,
        late_payment_interest,
        total_penalty,
        breakdown,
    })
}

fn component(
    kind: PenaltyKind,
    base_amount: Decimal,
    rate: Decimal,
    days: i64,
    periods: Option<u32>,
    amount: Decimal,
) -> PenaltyComponent {
    PenaltyComponent {
        kind,
        base_amount,
        rate,
        days,
        periods,
        amount,
        calculation: String::new(),
    }
}

/// `amount x daily_rate x days`, rounded
fn daily_interest(amount: Decimal, daily_rate: Decimal, days: i64) -> Result<Decimal, EngineError> {
    let per_day = checked_product("late payment interest", amount, daily_rate)?;
    let interest = checked_product("late payment interest", per_day, Decimal::from(days))?;
    Ok(round_money(interest))
}

/// `(1 + rate)^periods - 1`
fn compound_growth(rate: Decimal, periods: u32) -> Result<Decimal, EngineError> {
    let factor = checked_sum("compound interest", [Decimal::ONE, rate])?;
    let mut growth = Decimal::ONE;
    for _ in 0..periods {
        growth = checked_product("compound interest", growth, factor)?;
    }
    Ok(growth - Decimal::ONE)
}
