pub mod assess;
pub mod calculate;
pub mod rates;
pub mod schema;

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use taxengine::core::{ScoringPolicy, TaxType, TaxpayerCategory};

/// Read a JSON document from a file, or from stdin with "-"
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        BufReader::new(io::stdin().lock()).read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
        serde_json::from_slice(&buffer).context("parsing JSON from stdin")
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing JSON from {}", path.display()))
    }
}

/// Scoring policy from a JSON file, or the defaults
pub fn read_policy(path: Option<&Path>) -> anyhow::Result<ScoringPolicy> {
    let policy = match path {
        Some(path) => read_json(path)?,
        None => ScoringPolicy::default(),
    };
    policy.validate().context("invalid scoring policy")?;
    Ok(policy)
}

pub fn parse_tax_type(s: &str) -> Result<TaxType, String> {
    TaxType::from_str(s).ok_or_else(|| format!("unknown tax type '{s}'"))
}

pub fn parse_category(s: &str) -> Result<TaxpayerCategory, String> {
    TaxpayerCategory::from_str(s).ok_or_else(|| format!("unknown taxpayer category '{s}'"))
}

pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
