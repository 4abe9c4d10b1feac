//! Rates command - inspect, resolve and convert rate tables

use super::{parse_category, parse_tax_type, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::io;
use std::path::PathBuf;
use tabled::Tabled;
use taxengine::core::{
    format_amount, format_rate, RateQuery, RateTable, TaxType, TaxYear, TaxpayerCategory,
};
use taxengine::rate_file;

#[derive(Args, Debug)]
pub struct RatesCommand {
    /// Rate tables (JSON, or CSV by extension)
    rates: PathBuf,

    /// Resolve the table effective for this tax type
    #[arg(short, long, value_parser = parse_tax_type)]
    tax_type: Option<TaxType>,

    /// Taxpayer category for resolution
    #[arg(short, long, value_parser = parse_category)]
    category: Option<TaxpayerCategory>,

    /// Tax year for resolution; defaults to the year of --as-of
    #[arg(short, long)]
    year: Option<i32>,

    /// Resolve as of this date (YYYY-MM-DD); defaults to the end of the tax year
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Write the validated tables to stdout in this format
    #[arg(long, value_enum, conflicts_with = "tax_type")]
    export: Option<ExportFormat>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl RatesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let snapshot = rate_file::load_snapshot(&self.rates)?;

        if let Some(format) = self.export {
            return match format {
                ExportFormat::Json => rate_file::write_json(snapshot.tables(), io::stdout()),
                ExportFormat::Csv => rate_file::write_csv(snapshot.tables(), io::stdout()),
            };
        }

        if let Some(tax_type) = self.tax_type {
            let tax_year = self
                .year
                .map(TaxYear)
                .or(self.as_of.map(TaxYear::from_date))
                .context("--year or --as-of is required to resolve a table")?;
            let query = RateQuery {
                tax_type,
                category: self.category,
                tax_year,
                as_of: self.as_of.unwrap_or_else(|| tax_year.end_date()),
            };
            let table = snapshot.resolve(&query)?;
            if self.json {
                println!("{}", serde_json::to_string_pretty(table)?);
            } else {
                print_rate_table(table);
            }
            return Ok(());
        }

        if self.json {
            rate_file::write_json(snapshot.tables(), io::stdout())?;
            println!();
            return Ok(());
        }

        let rows: Vec<TableRow> = snapshot.tables().iter().map(TableRow::from).collect();
        println!();
        println!("RATE TABLES ({})", rows.len());
        println!();
        print_table(rows);
        println!("Fingerprint: {}", snapshot.fingerprint());
        Ok(())
    }
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Table")]
    label: String,
    #[tabled(rename = "Tax Type")]
    tax_type: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Brackets")]
    brackets: usize,
}

impl From<&RateTable> for TableRow {
    fn from(table: &RateTable) -> Self {
        TableRow {
            label: table.label(),
            tax_type: table.tax_type.display().to_string(),
            category: table.category.map_or("*".to_string(), |c| c.to_string()),
            year: table.tax_year.to_string(),
            from: table.effective_from.to_string(),
            to: table.effective_to.map_or("-".to_string(), |d| d.to_string()),
            brackets: table.brackets.len(),
        }
    }
}

#[derive(Tabled)]
struct BracketRow {
    #[tabled(rename = "From")]
    lower: String,
    #[tabled(rename = "To")]
    upper: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn print_rate_table(table: &RateTable) {
    println!();
    println!("{} - {}", table.label(), table.tax_type.display());
    println!();

    if !table.brackets.is_empty() {
        let rows: Vec<BracketRow> = table
            .brackets
            .iter()
            .map(|b| BracketRow {
                lower: format_amount(b.lower),
                upper: b.upper.map_or("-".to_string(), format_amount),
                rate: format_rate(b.rate),
            })
            .collect();
        print_table(rows);
    }

    let p = &table.parameters;
    let rates = [
        ("GST rate", p.gst_rate),
        ("Skills levy rate", p.skills_levy_rate),
        ("Minimum tax rate", p.minimum_tax_rate),
        ("Late filing rate", p.late_filing_rate),
        ("Daily interest rate", p.daily_interest_rate),
        ("Monthly interest rate", p.monthly_interest_rate),
    ];
    let mut rows: Vec<ParameterRow> = rates
        .iter()
        .filter_map(|(name, value)| {
            value.map(|v| ParameterRow {
                name: name.to_string(),
                value: format_rate(v),
            })
        })
        .collect();
    if let Some(threshold) = p.tax_free_threshold {
        rows.push(ParameterRow {
            name: "Tax-free threshold".to_string(),
            value: format_amount(threshold),
        });
    }
    rows.push(ParameterRow {
        name: "Interest".to_string(),
        value: if p.monthly_compounding {
            "monthly compounding".to_string()
        } else {
            "simple".to_string()
        },
    });
    print_table(rows);

    for rate in &table.excise_rates {
        println!(
            "  {}{}: {} per unit + {} of value ({:?})",
            rate.product_category,
            rate.product_code
                .as_deref()
                .map_or(String::new(), |c| format!(" [{c}]")),
            format_amount(rate.specific_rate),
            format_rate(rate.ad_valorem_rate),
            rate.basis
        );
    }
}
