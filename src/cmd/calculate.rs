//! Calculate command - one tax type with its penalty

use super::{print_table, read_json};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tabled::Tabled;
use taxengine::core::{
    format_amount, format_rate, penalty_lines, AssessmentOrchestrator, CalculationRequest,
    CalculationResult, ScoringPolicy, TaxCalculation, TaxComputation,
};
use taxengine::rate_file;

#[derive(Args, Debug)]
pub struct CalculateCommand {
    /// Calculation request (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Rate tables (JSON, or CSV by extension)
    #[arg(short, long)]
    rates: PathBuf,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl CalculateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let request: CalculationRequest = read_json(&self.file)?;
        let snapshot = rate_file::load_snapshot(&self.rates)?;
        let policy = ScoringPolicy::default();
        let orchestrator = AssessmentOrchestrator::new(&snapshot, &policy);
        let calculation = orchestrator.calculate_request(&request)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&calculation)?);
        } else {
            println!();
            println!(
                "{} {} ({})",
                calculation.tax_type().display().to_uppercase(),
                request.tax_year,
                calculation.rate_table
            );
            print_calculation(&calculation);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct BracketRow {
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Taxable")]
    taxable: String,
    #[tabled(rename = "Tax")]
    tax: String,
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

#[derive(Tabled)]
struct EmployeeRow {
    #[tabled(rename = "Employee")]
    employee: String,
    #[tabled(rename = "Salary")]
    salary: String,
    #[tabled(rename = "Taxable")]
    taxable: String,
    #[tabled(rename = "PAYE")]
    paye: String,
}

#[derive(Tabled)]
struct ExciseRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Specific")]
    specific: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Ad Valorem")]
    ad_valorem: String,
    #[tabled(rename = "Duty")]
    duty: String,
}

fn line(item: &str, amount: Decimal) -> LineRow {
    LineRow {
        item: item.to_string(),
        amount: format_amount(amount),
    }
}

fn print_brackets(calc: &CalculationResult) {
    let rows: Vec<BracketRow> = calc
        .bracket_breakdown
        .iter()
        .map(|slice| BracketRow {
            range: slice.range_display(),
            rate: format_rate(slice.rate),
            taxable: format_amount(slice.taxable_in_bracket),
            tax: format_amount(slice.amount),
        })
        .collect();
    print_table(rows);
}

/// Breakdown tables for one tax type followed by its penalty working
pub fn print_calculation(calculation: &TaxCalculation) {
    match &calculation.computation {
        TaxComputation::Income(r) => {
            print_table(vec![
                line("Gross income", r.gross_income),
                line("Deductions", r.deductions),
                line("Allowances", r.total_allowances),
                line("Taxable income", r.calculation.taxable_amount),
            ]);
            print_brackets(&r.calculation);
            if r.calculation.floor_applied() {
                println!(
                    "Minimum tax of {} applies (brackets give {})",
                    format_amount(r.calculation.minimum_tax_floor),
                    format_amount(r.calculation.gross_tax)
                );
            }
            println!(
                "Income tax payable: {} (effective {}, marginal {})",
                format_amount(r.payable()),
                format_rate(r.calculation.effective_rate),
                format_rate(r.calculation.marginal_rate)
            );
        }
        TaxComputation::Gst(r) => {
            print_table(vec![
                line("Output GST", r.output_gst),
                line("Reverse charge GST", r.reverse_charge_gst),
                line("Input tax", r.input_tax),
                line("Disallowed input tax", r.disallowed_input_tax),
                line("Creditable input tax", r.creditable_input_tax),
                line("Net GST liability", r.net_gst_liability),
                line("Refund due", r.refund_due),
            ]);
        }
        TaxComputation::Payroll(r) => {
            let rows: Vec<EmployeeRow> = r
                .employees
                .iter()
                .map(|e| EmployeeRow {
                    employee: e.employee_id.clone(),
                    salary: format_amount(e.annual_salary),
                    taxable: format_amount(e.taxable_salary),
                    paye: format_amount(e.paye_amount()),
                })
                .collect();
            print_table(rows);
            print_table(vec![
                line("Total payroll", r.total_payroll),
                line("Total PAYE", r.total_paye),
                line(
                    &format!("Skills levy ({})", format_rate(r.skills_levy_rate)),
                    r.skills_development_levy,
                ),
                line("Total payroll tax", r.total_payroll_tax),
            ]);
        }
        TaxComputation::Excise(r) => {
            let rows: Vec<ExciseRow> = r
                .lines
                .iter()
                .map(|l| ExciseRow {
                    product: match &l.product_code {
                        Some(code) => format!("{} ({})", l.product_category, code),
                        None => l.product_category.clone(),
                    },
                    quantity: l.quantity.to_string(),
                    specific: format_amount(l.specific_duty),
                    value: format_amount(l.value),
                    ad_valorem: format_amount(l.ad_valorem_duty),
                    duty: format_amount(l.total_duty),
                })
                .collect();
            print_table(rows);
            println!("Excise duty payable: {}", format_amount(r.payable()));
        }
    }

    if let Some(penalty) = &calculation.penalty {
        println!();
        for text in penalty_lines(penalty) {
            println!("  {}", text);
        }
    }
    println!();
}
