//! Assess command - comprehensive assessment with compliance score

use super::calculate::print_calculation;
use super::{print_table, read_json, read_policy};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use taxengine::core::{
    format_amount, AssessmentBatch, AssessmentOrchestrator, AssessmentRequest,
    ComprehensiveAssessment, RateRepository, TaxOutcome,
};
use taxengine::rate_file;

#[derive(Args, Debug)]
pub struct AssessCommand {
    /// Assessment request (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Rate tables (JSON, or CSV by extension)
    #[arg(short, long)]
    rates: PathBuf,

    /// Scoring policy (JSON); defaults apply when omitted
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Input holds {"assessments": [...]}, assessed in parallel
    #[arg(long)]
    batch: bool,

    /// Show the full breakdown for every tax type
    #[arg(short, long)]
    detail: bool,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct BatchFailure {
    client_id: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    assessments: Vec<ComprehensiveAssessment>,
    failures: Vec<BatchFailure>,
}

impl AssessCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let repository = RateRepository::new(rate_file::load_snapshot(&self.rates)?);
        let snapshot = repository.snapshot();
        let policy = read_policy(self.policy.as_deref())?;
        let orchestrator = AssessmentOrchestrator::new(&snapshot, &policy);

        if !self.batch {
            let request: AssessmentRequest = read_json(&self.file)?;
            let assessment = orchestrator.assess(&request)?;
            if self.json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                self.print_assessment(&assessment);
            }
            return Ok(());
        }

        let batch: AssessmentBatch = read_json(&self.file)?;
        let results = orchestrator.assess_batch(&batch.assessments);
        let mut output = BatchOutput {
            assessments: Vec::new(),
            failures: Vec::new(),
        };
        for (request, result) in batch.assessments.iter().zip(results) {
            match result {
                Ok(assessment) => output.assessments.push(assessment),
                Err(err) => {
                    log::error!("Assessment of {} failed: {}", request.client_id, err);
                    output.failures.push(BatchFailure {
                        client_id: request.client_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for assessment in &output.assessments {
                self.print_assessment(assessment);
            }
            for failure in &output.failures {
                println!("{}: not assessed ({})", failure.client_id, failure.error);
            }
        }

        if !output.failures.is_empty() {
            anyhow::bail!(
                "{} of {} assessments failed",
                output.failures.len(),
                batch.assessments.len()
            );
        }
        Ok(())
    }

    fn print_assessment(&self, assessment: &ComprehensiveAssessment) {
        println!();
        println!(
            "ASSESSMENT {} - TAX YEAR {}",
            assessment.client_id, assessment.tax_year
        );
        println!();

        let rows: Vec<OutcomeRow> = assessment.outcomes.iter().map(OutcomeRow::from).collect();
        print_table(rows);

        print_table(vec![
            TotalRow::new("Total tax liability", format_amount(assessment.total_tax_liability)),
            TotalRow::new("Total refunds", format_amount(assessment.total_refunds)),
            TotalRow::new("Total penalties", format_amount(assessment.total_penalties)),
            TotalRow::new("Grand total", format_amount(assessment.grand_total)),
            TotalRow::new(
                "Compliance",
                format!(
                    "{} ({})",
                    assessment.compliance_score.normalize(),
                    assessment.compliance_grade
                ),
            ),
        ]);

        if !assessment.is_complete() {
            println!("INCOMPLETE: totals exclude the failed tax types above");
        }

        if !assessment.issues.is_empty() {
            println!();
            println!("ISSUES");
            let rows: Vec<IssueRow> = assessment
                .issues
                .iter()
                .map(|issue| IssueRow {
                    severity: issue.severity.to_string(),
                    tax_type: issue
                        .tax_type
                        .map_or("-".to_string(), |t| t.display().to_string()),
                    description: issue.description.clone(),
                    action: issue.recommended_action.clone(),
                    deadline: issue
                        .deadline
                        .map_or("-".to_string(), |d| d.format("%Y-%m-%d").to_string()),
                })
                .collect();
            print_table(rows);
        }

        if self.detail {
            for calculation in assessment.outcomes.iter().filter_map(TaxOutcome::calculation) {
                println!();
                println!(
                    "{} ({})",
                    calculation.tax_type().display().to_uppercase(),
                    calculation.rate_table
                );
                print_calculation(calculation);
            }
        }
        println!();
        println!("Rate snapshot: {}", assessment.rate_snapshot);
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Tax Type")]
    tax_type: String,
    #[tabled(rename = "Liability")]
    liability: String,
    #[tabled(rename = "Refund")]
    refund: String,
    #[tabled(rename = "Days Late")]
    days_late: String,
    #[tabled(rename = "Penalty")]
    penalty: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&TaxOutcome> for OutcomeRow {
    fn from(outcome: &TaxOutcome) -> Self {
        match outcome {
            TaxOutcome::Assessed(calc) => OutcomeRow {
                tax_type: calc.tax_type().display().to_string(),
                liability: format_amount(calc.computation.liability()),
                refund: format_amount(calc.computation.refund()),
                days_late: calc.days_late().to_string(),
                penalty: format_amount(calc.total_penalty()),
                status: "assessed".to_string(),
            },
            TaxOutcome::Failed { tax_type, kind, .. } => OutcomeRow {
                tax_type: tax_type.display().to_string(),
                liability: "-".to_string(),
                refund: "-".to_string(),
                days_late: "-".to_string(),
                penalty: "-".to_string(),
                status: format!("failed: {kind}"),
            },
        }
    }
}

#[derive(Tabled)]
struct TotalRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl TotalRow {
    fn new(label: &str, amount: String) -> Self {
        TotalRow {
            label: label.to_string(),
            amount,
        }
    }
}

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Tax Type")]
    tax_type: String,
    #[tabled(rename = "Issue")]
    description: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
}
