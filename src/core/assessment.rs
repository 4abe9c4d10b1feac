use super::base::TaxableBase;
use super::compliance::{
    score_compliance, ComplianceIssue, ComplianceReport, CompletenessSignals, Grade, ScoreComponents,
    ScoringPolicy, TaxTypeSignal,
};
use super::error::EngineError;
use super::excise::{calculate_excise, ExciseResult};
use super::gst::{calculate_gst, GstResult};
use super::income::{calculate_income_tax, IncomeTaxResult};
use super::money::checked_sum;
use super::payroll::{calculate_payroll_tax, PayrollResult};
use super::penalty::{calculate_penalty, PenaltyInput, PenaltyResult};
use super::rates::RateTable;
use super::repository::{RateQuery, RateSnapshot};
use super::tax_type::{TaxType, TaxpayerCategory};
use super::tax_year::TaxYear;
use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One tax type's declared figures and dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxFiling {
    pub base: TaxableBase,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Filing/payment date; absent means not yet filed
    #[serde(default)]
    pub actual_date: Option<NaiveDate>,
    /// Date for rate resolution; defaults to the tax year's last day
    #[serde(default)]
    pub rates_as_of: Option<NaiveDate>,
}

impl TaxFiling {
    pub fn tax_type(&self) -> TaxType {
        self.base.tax_type()
    }

    /// Rates resolve within the tax year; nothing falls due before it starts
    pub fn validate_dates(&self, tax_year: TaxYear) -> Result<(), EngineError> {
        if let Some(as_of) = self.rates_as_of {
            if !tax_year.contains(as_of) {
                return Err(EngineError::invalid(format!(
                    "rates_as_of {as_of} is outside tax year {tax_year}"
                )));
            }
        }
        if let Some(due_date) = self.due_date {
            if due_date < tax_year.start_date() {
                return Err(EngineError::invalid(format!(
                    "due date {due_date} precedes tax year {tax_year}"
                )));
            }
        }
        Ok(())
    }
}

/// Request for a single tax type calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CalculationRequest {
    #[serde(default)]
    pub category: Option<TaxpayerCategory>,
    pub tax_year: TaxYear,
    pub evaluation_date: NaiveDate,
    #[serde(flatten)]
    pub filing: TaxFiling,
}

/// Request for a comprehensive per-client, per-year assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentRequest {
    pub client_id: String,
    #[serde(default)]
    pub category: Option<TaxpayerCategory>,
    pub tax_year: TaxYear,
    /// Stands in for missing filing dates in penalty calculations
    pub evaluation_date: NaiveDate,
    pub filings: Vec<TaxFiling>,
    #[serde(default)]
    pub completeness: CompletenessSignals,
}

/// Batch input: many assessment requests
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentBatch {
    pub assessments: Vec<AssessmentRequest>,
}

/// Tax-type-specific result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tax_type", rename_all = "snake_case")]
pub enum TaxComputation {
    Income(IncomeTaxResult),
    Gst(GstResult),
    Payroll(PayrollResult),
    Excise(ExciseResult),
}

impl TaxComputation {
    pub fn tax_type(&self) -> TaxType {
        match self {
            TaxComputation::Income(_) => TaxType::Income,
            TaxComputation::Gst(_) => TaxType::Gst,
            TaxComputation::Payroll(_) => TaxType::Payroll,
            TaxComputation::Excise(_) => TaxType::Excise,
        }
    }

    /// Amount due; also the base for penalties
    pub fn liability(&self) -> Decimal {
        match self {
            TaxComputation::Income(r) => r.payable(),
            TaxComputation::Gst(r) => r.payable(),
            TaxComputation::Payroll(r) => r.payable(),
            TaxComputation::Excise(r) => r.payable(),
        }
    }

    pub fn refund(&self) -> Decimal {
        match self {
            TaxComputation::Gst(r) => r.refund_due,
            TaxComputation::Income(_) | TaxComputation::Payroll(_) | TaxComputation::Excise(_) => {
                Decimal::ZERO
            }
        }
    }
}

/// Result for one tax type, with its penalty when a due date was supplied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxCalculation {
    pub rate_table: String,
    pub computation: TaxComputation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<PenaltyResult>,
}

impl TaxCalculation {
    pub fn tax_type(&self) -> TaxType {
        self.computation.tax_type()
    }

    pub fn total_penalty(&self) -> Decimal {
        self.penalty.as_ref().map_or(Decimal::ZERO, |p| p.total_penalty)
    }

    pub fn days_late(&self) -> i64 {
        self.penalty.as_ref().map_or(0, |p| p.days_late)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaxOutcome {
    Assessed(TaxCalculation),
    Failed {
        tax_type: TaxType,
        kind: String,
        message: String,
        #[serde(skip)]
        error: EngineError,
    },
}

impl TaxOutcome {
    fn failed(tax_type: TaxType, error: EngineError) -> Self {
        TaxOutcome::Failed {
            tax_type,
            kind: error.kind().to_string(),
            message: error.to_string(),
            error,
        }
    }

    pub fn tax_type(&self) -> TaxType {
        match self {
            TaxOutcome::Assessed(calc) => calc.tax_type(),
            TaxOutcome::Failed { tax_type, .. } => *tax_type,
        }
    }

    pub fn calculation(&self) -> Option<&TaxCalculation> {
        match self {
            TaxOutcome::Assessed(calc) => Some(calc),
            TaxOutcome::Failed { .. } => None,
        }
    }

    fn signal(&self) -> TaxTypeSignal {
        match self {
            TaxOutcome::Assessed(calc) => TaxTypeSignal::Assessed {
                tax_type: calc.tax_type(),
                days_late: calc.days_late(),
                liability: calc.computation.liability(),
                penalty: calc.total_penalty(),
            },
            TaxOutcome::Failed {
                tax_type, error, ..
            } => TaxTypeSignal::Failed {
                tax_type: *tax_type,
                error: error.clone(),
            },
        }
    }
}

/// Everything assessed for one client and tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComprehensiveAssessment {
    pub client_id: String,
    pub tax_year: TaxYear,
    pub category: Option<TaxpayerCategory>,
    pub evaluation_date: NaiveDate,
    pub rate_snapshot: String,
    pub outcomes: Vec<TaxOutcome>,
    pub total_tax_liability: Decimal,
    pub total_refunds: Decimal,
    pub total_penalties: Decimal,
    pub grand_total: Decimal,
    pub compliance_score: Decimal,
    pub compliance_grade: Grade,
    pub score_components: ScoreComponents,
    pub issues: Vec<ComplianceIssue>,
}

impl ComprehensiveAssessment {
    /// False when any tax type failed; totals then cover only the assessed types
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, TaxOutcome::Assessed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaxOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaxOutcome::Failed { .. }))
    }
}

/// Dispatch a validated base to its calculator
pub fn compute(base: &TaxableBase, table: &RateTable) -> Result<TaxComputation, EngineError> {
    match base {
        TaxableBase::Income(b) => calculate_income_tax(b, table).map(TaxComputation::Income),
        TaxableBase::Gst(b) => calculate_gst(b, table).map(TaxComputation::Gst),
        TaxableBase::Payroll(b) => calculate_payroll_tax(b, table).map(TaxComputation::Payroll),
        TaxableBase::Excise(b) => calculate_excise(b, table).map(TaxComputation::Excise),
    }
}

/// Composes rate resolution, the calculators, penalties and scoring
pub struct AssessmentOrchestrator<'a> {
    rates: &'a RateSnapshot,
    policy: &'a ScoringPolicy,
}

impl<'a> AssessmentOrchestrator<'a> {
    pub fn new(rates: &'a RateSnapshot, policy: &'a ScoringPolicy) -> Self {
        AssessmentOrchestrator { rates, policy }
    }

    /// Calculate one tax type: validate, resolve rates, compute, then penalise
    pub fn calculate(
        &self,
        category: Option<TaxpayerCategory>,
        tax_year: TaxYear,
        evaluation_date: NaiveDate,
        filing: &TaxFiling,
    ) -> Result<TaxCalculation, EngineError> {
        filing.base.validate()?;
        filing.validate_dates(tax_year)?;

        let query = RateQuery {
            tax_type: filing.tax_type(),
            category,
            tax_year,
            as_of: filing.rates_as_of.unwrap_or_else(|| tax_year.end_date()),
        };
        let table = self.rates.resolve(&query)?;
        let computation = compute(&filing.base, table)?;

        let penalty = match filing.due_date {
            Some(due_date) => {
                let input = PenaltyInput {
                    tax_amount: computation.liability(),
                    due_date,
                    actual_date: filing.actual_date,
                    evaluation_date,
                };
                Some(calculate_penalty(&input, &table.penalty_terms()?)?)
            }
            None => None,
        };

        Ok(TaxCalculation {
            rate_table: table.label(),
            computation,
            penalty,
        })
    }

    pub fn calculate_request(&self, request: &CalculationRequest) -> Result<TaxCalculation, EngineError> {
        self.calculate(
            request.category,
            request.tax_year,
            request.evaluation_date,
            &request.filing,
        )
    }

    /// Assess every filing, score the result. Per-type failures become outcomes and issues.
    pub fn assess(&self, request: &AssessmentRequest) -> Result<ComprehensiveAssessment, EngineError> {
        self.policy.validate()?;
        if request.client_id.trim().is_empty() {
            return Err(EngineError::invalid("assessment without a client id"));
        }
        for (i, filing) in request.filings.iter().enumerate() {
            if request.filings[..i]
                .iter()
                .any(|other| other.tax_type() == filing.tax_type())
            {
                return Err(EngineError::invalid(format!(
                    "more than one {} filing for {}",
                    filing.tax_type(),
                    request.client_id
                )));
            }
        }

        let mut outcomes: Vec<TaxOutcome> = request
            .filings
            .par_iter()
            .map(|filing| {
                match self.calculate(request.category, request.tax_year, request.evaluation_date, filing) {
                    Ok(calc) => TaxOutcome::Assessed(calc),
                    Err(err) => {
                        log::warn!(
                            "{} {} for {}: {}",
                            request.client_id,
                            filing.tax_type(),
                            request.tax_year,
                            err
                        );
                        TaxOutcome::failed(filing.tax_type(), err)
                    }
                }
            })
            .collect();
        outcomes.sort_by_key(TaxOutcome::tax_type);

        let assessed: Vec<&TaxCalculation> = outcomes.iter().filter_map(TaxOutcome::calculation).collect();
        let total_tax_liability = checked_sum(
            "total tax liability",
            assessed.iter().map(|calc| calc.computation.liability()),
        )?;
        let total_refunds = checked_sum(
            "total refunds",
            assessed.iter().map(|calc| calc.computation.refund()),
        )?;
        let total_penalties = checked_sum(
            "total penalties",
            assessed.iter().map(|calc| calc.total_penalty()),
        )?;
        let grand_total = checked_sum("grand total", [total_tax_liability, total_penalties])?;

        let signals: Vec<TaxTypeSignal> = outcomes.iter().map(TaxOutcome::signal).collect();
        let ComplianceReport {
            score,
            grade,
            components,
            issues,
        } = score_compliance(
            &signals,
            &request.completeness,
            self.policy,
            request.evaluation_date,
        )?;

        let assessment = ComprehensiveAssessment {
            client_id: request.client_id.clone(),
            tax_year: request.tax_year,
            category: request.category,
            evaluation_date: request.evaluation_date,
            rate_snapshot: self.rates.fingerprint(),
            outcomes,
            total_tax_liability,
            total_refunds,
            total_penalties,
            grand_total,
            compliance_score: score,
            compliance_grade: grade,
            score_components: components,
            issues,
        };
        log::info!(
            "Assessed {} for {}: liability {}, penalties {}, grade {}{}",
            assessment.client_id,
            assessment.tax_year,
            assessment.total_tax_liability,
            assessment.total_penalties,
            assessment.compliance_grade,
            if assessment.is_complete() { "" } else { " (incomplete)" }
        );
        Ok(assessment)
    }

    /// Assess many clients in parallel; results keep request order
    pub fn assess_batch(
        &self,
        requests: &[AssessmentRequest],
    ) -> Vec<Result<ComprehensiveAssessment, EngineError>> {
        requests.par_iter().map(|request| self.assess(request)).collect()
    }
}
