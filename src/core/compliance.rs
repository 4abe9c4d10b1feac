//! Compliance scoring.
//!
//! The weights, grade bands and remediation window live in [`ScoringPolicy`],
//! which callers may load from configuration. [`ScoringPolicy::default`] is a
//! starting point, not production calibration.

use super::error::EngineError;
use super::money::{format_amount, round_money};
use super::tax_type::TaxType;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// Lowest score that earns `grade`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GradeBand {
    pub grade: Grade,
    #[schemars(with = "f64")]
    pub min_score: Decimal,
}

/// A >= 90, B >= 75, C >= 60, D >= 40, F below
pub const GRADE_BANDS: [GradeBand; 5] = [
    GradeBand {
        grade: Grade::A,
        min_score: dec!(90),
    },
    GradeBand {
        grade: Grade::B,
        min_score: dec!(75),
    },
    GradeBand {
        grade: Grade::C,
        min_score: dec!(60),
    },
    GradeBand {
        grade: Grade::D,
        min_score: dec!(40),
    },
    GradeBand {
        grade: Grade::F,
        min_score: dec!(0),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Low < 7 days, Medium < 30, High < 90, Critical from 90
    pub fn from_days_late(days: i64) -> Severity {
        match days {
            ..=6 => Severity::Low,
            7..=29 => Severity::Medium,
            30..=89 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    LateFiling,
    MissingInputs,
    RateUnavailable,
    IncompleteDocuments,
    OutstandingPayments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_type: Option<TaxType>,
    pub description: String,
    pub recommended_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

/// Document and payment signals supplied by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompletenessSignals {
    #[serde(default)]
    pub documents_expected: u32,
    #[serde(default)]
    pub documents_submitted: u32,
    #[serde(default)]
    pub payments_expected: u32,
    #[serde(default)]
    pub payments_made: u32,
}

/// Longest remediation window a policy may set
pub const MAX_REMEDIATION_DAYS: i64 = 3650;

/// Weights (summing to 100), grade bands and remediation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScoringPolicy {
    #[schemars(with = "f64")]
    pub timeliness_weight: Decimal,
    #[schemars(with = "f64")]
    pub penalty_weight: Decimal,
    #[schemars(with = "f64")]
    pub documents_weight: Decimal,
    #[schemars(with = "f64")]
    pub payments_weight: Decimal,
    /// Days late at which a filing earns no timeliness credit
    pub late_horizon_days: i64,
    /// Most timeliness credit a late filing can earn (0..=1)
    #[schemars(with = "f64")]
    pub late_credit_cap: Decimal,
    /// Days from evaluation allowed to remedy an issue
    pub remediation_days: i64,
    pub grade_bands: Vec<GradeBand>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            timeliness_weight: dec!(40),
            penalty_weight: dec!(20),
            documents_weight: dec!(20),
            payments_weight: dec!(20),
            late_horizon_days: 90,
            late_credit_cap: dec!(0.5),
            remediation_days: 14,
            grade_bands: GRADE_BANDS.to_vec(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [
            self.timeliness_weight,
            self.penalty_weight,
            self.documents_weight,
            self.payments_weight,
        ];
        if weights.iter().any(|w| *w < Decimal::ZERO) {
            return Err(EngineError::invalid("scoring weights must be non-negative"));
        }
        let total: Decimal = weights.iter().sum();
        if total != dec!(100) {
            return Err(EngineError::invalid(format!(
                "scoring weights sum to {total}, expected 100"
            )));
        }
        if self.timeliness_weight <= self.penalty_weight {
            return Err(EngineError::invalid(
                "timeliness weight must exceed penalty weight",
            ));
        }
        if self.late_horizon_days <= 0 || self.remediation_days < 0 {
            return Err(EngineError::invalid("late horizon and remediation window must be positive"));
        }
        if self.remediation_days > MAX_REMEDIATION_DAYS {
            return Err(EngineError::invalid(format!(
                "remediation window of {} days exceeds {MAX_REMEDIATION_DAYS}",
                self.remediation_days
            )));
        }
        if self.late_credit_cap < Decimal::ZERO || self.late_credit_cap > Decimal::ONE {
            return Err(EngineError::invalid("late credit cap must be within 0..=1"));
        }
        let descending = self
            .grade_bands
            .windows(2)
            .all(|pair| pair[0].min_score > pair[1].min_score);
        let floor_covered = self
            .grade_bands
            .last()
            .is_some_and(|band| band.min_score <= Decimal::ZERO);
        if !descending || !floor_covered {
            return Err(EngineError::invalid(
                "grade bands must descend and end at a zero minimum",
            ));
        }
        Ok(())
    }

    pub fn grade_for(&self, score: Decimal) -> Grade {
        self.grade_bands
            .iter()
            .find(|band| score >= band.min_score)
            .map_or(Grade::F, |band| band.grade)
    }
}

/// What the scorer needs to know about one tax type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxTypeSignal {
    Assessed {
        tax_type: TaxType,
        /// Zero when no due date was supplied
        days_late: i64,
        liability: Decimal,
        penalty: Decimal,
    },
    Failed {
        tax_type: TaxType,
        error: EngineError,
    },
}

/// Each component is a fraction in 0..=1 before weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreComponents {
    pub timeliness: Decimal,
    pub penalty: Decimal,
    pub documents: Decimal,
    pub payments: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub score: Decimal,
    pub grade: Grade,
    pub components: ScoreComponents,
    pub issues: Vec<ComplianceIssue>,
}

pub fn score_compliance(
    signals: &[TaxTypeSignal],
    completeness: &CompletenessSignals,
    policy: &ScoringPolicy,
    evaluation_date: NaiveDate,
) -> Result<ComplianceReport, EngineError> {
    let components = ScoreComponents {
        timeliness: timeliness(signals, policy),
        penalty: penalty_magnitude(signals),
        documents: ratio(completeness.documents_submitted, completeness.documents_expected),
        payments: ratio(completeness.payments_made, completeness.payments_expected),
    };

    let weighted = policy.timeliness_weight * components.timeliness
        + policy.penalty_weight * components.penalty
        + policy.documents_weight * components.documents
        + policy.payments_weight * components.payments;
    let score = round_money(weighted).clamp(Decimal::ZERO, dec!(100));
    let grade = policy.grade_for(score);

    let deadline = u64::try_from(policy.remediation_days)
        .ok()
        .and_then(|days| evaluation_date.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            EngineError::invalid(format!(
                "remediation deadline {} day(s) after {evaluation_date} is out of range",
                policy.remediation_days
            ))
        })?;
    let mut issues: Vec<ComplianceIssue> = signals
        .iter()
        .filter_map(|signal| tax_type_issue(signal, deadline))
        .collect();
    issues.extend(completeness_issues(completeness, deadline));
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));

    log::info!(
        "Compliance score {} ({}) with {} issue(s)",
        score,
        grade,
        issues.len()
    );

    Ok(ComplianceReport {
        score,
        grade,
        components,
        issues,
    })
}

fn timeliness(signals: &[TaxTypeSignal], policy: &ScoringPolicy) -> Decimal {
    let horizon = Decimal::from(policy.late_horizon_days);
    let credits: Vec<Decimal> = signals
        .iter()
        .filter_map(|signal| match signal {
            TaxTypeSignal::Assessed { days_late: 0, .. } => Some(Decimal::ONE),
            TaxTypeSignal::Assessed { days_late, .. } => {
                let remaining = (Decimal::ONE - Decimal::from(*days_late) / horizon).max(Decimal::ZERO);
                Some(policy.late_credit_cap * remaining)
            }
            // Figures the taxpayer failed to supply count against them; rate gaps do not
            TaxTypeSignal::Failed { error, .. } if error.is_input_error() => Some(Decimal::ZERO),
            TaxTypeSignal::Failed { .. } => None,
        })
        .collect();

    if credits.is_empty() {
        return Decimal::ONE;
    }
    credits.iter().sum::<Decimal>() / Decimal::from(credits.len())
}

fn penalty_magnitude(signals: &[TaxTypeSignal]) -> Decimal {
    let (liability, penalty) = signals.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(liability, penalty), signal| match signal {
            TaxTypeSignal::Assessed {
                liability: l,
                penalty: p,
                ..
            } => (liability + l, penalty + p),
            TaxTypeSignal::Failed { .. } => (liability, penalty),
        },
    );
    if penalty.is_zero() {
        Decimal::ONE
    } else if liability.is_zero() {
        Decimal::ZERO
    } else {
        (Decimal::ONE - penalty / liability).max(Decimal::ZERO)
    }
}

fn ratio(done: u32, expected: u32) -> Decimal {
    if expected == 0 {
        Decimal::ONE
    } else {
        (Decimal::from(done) / Decimal::from(expected)).min(Decimal::ONE)
    }
}

fn tax_type_issue(signal: &TaxTypeSignal, deadline: NaiveDate) -> Option<ComplianceIssue> {
    match signal {
        TaxTypeSignal::Assessed { days_late: 0, .. } => None,
        TaxTypeSignal::Assessed {
            tax_type,
            days_late,
            liability,
            penalty,
        } => {
            let severity = Severity::from_days_late(*days_late);
            let recommended_action = match severity {
                Severity::Low | Severity::Medium => format!(
                    "Settle {} of {} plus {} in penalties and interest",
                    tax_type,
                    format_amount(*liability),
                    format_amount(*penalty)
                ),
                Severity::High | Severity::Critical => format!(
                    "Settle {} of {} plus {} in penalties immediately and agree a payment plan to stop further interest",
                    tax_type,
                    format_amount(*liability),
                    format_amount(*penalty)
                ),
            };
            Some(ComplianceIssue {
                issue_type: IssueType::LateFiling,
                severity,
                tax_type: Some(*tax_type),
                description: format!("{tax_type} filed {days_late} day(s) after the due date"),
                recommended_action,
                deadline: Some(deadline),
            })
        }
        TaxTypeSignal::Failed { tax_type, error } if error.is_input_error() => Some(ComplianceIssue {
            issue_type: IssueType::MissingInputs,
            severity: Severity::High,
            tax_type: Some(*tax_type),
            description: format!("{tax_type} could not be assessed: {error}"),
            recommended_action: format!("Correct the declared {tax_type} figures and resubmit"),
            deadline: Some(deadline),
        }),
        TaxTypeSignal::Failed { tax_type, error } => {
            let (severity, fix) = match error {
                EngineError::AmbiguousRate { count, .. } => (
                    Severity::Critical,
                    format!("retire all but one of the {count} overlapping {tax_type} rate tables"),
                ),
                EngineError::InvalidRateTable { table, reason } => {
                    (Severity::High, format!("fix rate table {table} ({reason})"))
                }
                EngineError::NoExciseRate { category } => (
                    Severity::High,
                    format!("add an excise rate for product category '{category}'"),
                ),
                EngineError::RateNotFound { .. } | EngineError::InvalidInput(_) => (
                    Severity::High,
                    format!("publish an effective {tax_type} rate table"),
                ),
            };
            Some(ComplianceIssue {
                issue_type: IssueType::RateUnavailable,
                severity,
                tax_type: Some(*tax_type),
                description: format!("{tax_type} could not be assessed: {error}"),
                recommended_action: format!("Have the rate administrator {fix}, then reassess"),
                deadline: None,
            })
        }
    }
}

fn completeness_issues(signals: &CompletenessSignals, deadline: NaiveDate) -> Vec<ComplianceIssue> {
    let mut issues = Vec::new();
    if signals.documents_submitted < signals.documents_expected {
        let missing = signals.documents_expected - signals.documents_submitted;
        let severity = if signals.documents_submitted * 2 >= signals.documents_expected {
            Severity::Medium
        } else {
            Severity::High
        };
        issues.push(ComplianceIssue {
            issue_type: IssueType::IncompleteDocuments,
            severity,
            tax_type: None,
            description: format!(
                "{missing} of {} required document(s) not submitted",
                signals.documents_expected
            ),
            recommended_action: "Upload the outstanding supporting documents".to_string(),
            deadline: Some(deadline),
        });
    }
    if signals.payments_made < signals.payments_expected {
        let missing = signals.payments_expected - signals.payments_made;
        issues.push(ComplianceIssue {
            issue_type: IssueType::OutstandingPayments,
            severity: Severity::High,
            tax_type: None,
            description: format!(
                "{missing} of {} expected payment(s) not made",
                signals.payments_expected
            ),
            recommended_action: "Make the outstanding payments to stop interest accruing".to_string(),
            deadline: Some(deadline),
        });
    }
    issues
}
