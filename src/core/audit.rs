//! Human-readable working for penalty breakdowns.
//!
//! Only formats; all figures come from the structured components.

use super::money::{format_amount, format_rate};
use super::penalty::{PenaltyComponent, PenaltyKind, PenaltyResult};
use super::rates::DAYS_PER_MONTH;

pub fn describe_component(c: &PenaltyComponent) -> String {
    let base = format_amount(c.base_amount);
    let rate = format_rate(c.rate);
    let amount = format_amount(c.amount);
    match c.kind {
        PenaltyKind::LateFiling => format!(
            "{rate} of {base} (flat, {} late) = {amount}",
            plural(c.days, "day")
        ),
        PenaltyKind::SimpleInterest => {
            format!("{base} x {rate} x {} = {amount}", plural(c.days, "day"))
        }
        PenaltyKind::CompoundInterest => {
            let periods = c.periods.unwrap_or_default();
            format!(
                "{base} x ((1 + {rate})^{periods} - 1) over {} of {DAYS_PER_MONTH} days = {amount}",
                plural(periods as i64, "period")
            )
        }
        PenaltyKind::RemainderInterest => format!(
            "{base} x {rate} x {} remaining = {amount}",
            plural(c.days, "day")
        ),
    }
}

/// One line per component plus a total, for text reports
pub fn penalty_lines(result: &PenaltyResult) -> Vec<String> {
    if result.breakdown.is_empty() {
        return vec!["No penalty: filed on time".to_string()];
    }
    let mut lines: Vec<String> = result
        .breakdown
        .iter()
        .map(|c| format!("{}: {}", c.kind.display(), c.calculation))
        .collect();
    lines.push(format!(
        "Total penalty ({} late): {}",
        plural(result.days_late, "day"),
        format_amount(result.total_penalty)
    ));
    lines
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn component(kind: PenaltyKind, rate: Decimal, days: i64, periods: Option<u32>, amount: Decimal) -> PenaltyComponent {
        PenaltyComponent {
            kind,
            base_amount: dec!(1000000),
            rate,
            days,
            periods,
            amount,
            calculation: String::new(),
        }
    }

    #[test]
    fn late_filing_line() {
        let c = component(PenaltyKind::LateFiling, dec!(0.05), 45, None, dec!(50000));
        assert_eq!(
            describe_component(&c),
            "5% of 1,000,000.00 (flat, 45 days late) = 50,000.00"
        );
    }

    #[test]
    fn compound_line() {
        let c = component(PenaltyKind::CompoundInterest, dec!(0.015), 30, Some(1), dec!(15000));
        assert_eq!(
            describe_component(&c),
            "1,000,000.00 x ((1 + 1.5%)^1 - 1) over 1 period of 30 days = 15,000.00"
        );
    }

    #[test]
    fn remainder_line_singular_day() {
        let c = component(PenaltyKind::RemainderInterest, dec!(0.0005), 1, None, dec!(500));
        assert_eq!(
            describe_component(&c),
            "1,000,000.00 x 0.05% x 1 day remaining = 500.00"
        );
    }

    #[test]
    fn on_time_summary() {
        assert_eq!(
            penalty_lines(&PenaltyResult::default()),
            vec!["No penalty: filed on time".to_string()]
        );
    }

    #[test]
    fn summary_ends_with_total() {
        let mut filing = component(PenaltyKind::LateFiling, dec!(0.05), 45, None, dec!(50000));
        filing.calculation = describe_component(&filing);
        let result = PenaltyResult {
            days_late: 45,
            late_filing_penalty: dec!(50000),
            late_payment_interest: dec!(0),
            total_penalty: dec!(50000),
            breakdown: vec![filing],
        };
        let lines = penalty_lines(&result);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Late filing penalty: 5% of"));
        assert_eq!(lines[1], "Total penalty (45 days late): 50,000.00");
    }
}
