//! Reading and writing rate tables.
//!
//! JSON files carry complete tables, excise rates included. CSV files carry
//! one row per bracket or scalar parameter; rows sharing a table key are
//! grouped back into one table.

use crate::core::{
    Bracket, RateSnapshot, RateTable, TaxType, TaxYear, TaxpayerCategory,
};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use taxengine_derive::CsvSchema;

/// Description of one CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Top-level shape of a JSON rate file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RateFile {
    pub tables: Vec<RateTable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Bracket,
    Parameter,
}

/// One CSV rate row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CsvSchema)]
pub struct RateRecord {
    /// income, gst, payroll or excise
    pub tax_type: TaxType,
    /// Taxpayer category; empty for a table that applies to every category
    pub category: Option<TaxpayerCategory>,
    /// Calendar tax year, e.g. 2024
    pub tax_year: TaxYear,
    /// First day the table applies (YYYY-MM-DD)
    pub effective_from: NaiveDate,
    /// Day the table stops applying, exclusive (YYYY-MM-DD)
    pub effective_to: Option<NaiveDate>,
    /// bracket or parameter
    pub kind: RowKind,
    /// Parameter name, e.g. gst_rate or late_filing_rate (parameter rows)
    pub parameter: Option<String>,
    /// Bracket lower bound (bracket rows)
    pub lower: Option<Decimal>,
    /// Bracket upper bound, exclusive; empty for the top bracket (bracket rows)
    pub upper: Option<Decimal>,
    /// Bracket rate or parameter value; monthly_compounding takes 1 or 0
    pub value: Decimal,
}

type TableKey = (TaxType, Option<TaxpayerCategory>, TaxYear, NaiveDate, Option<NaiveDate>);

impl RateRecord {
    fn key(&self) -> TableKey {
        (
            self.tax_type,
            self.category,
            self.tax_year,
            self.effective_from,
            self.effective_to,
        )
    }

    fn apply(&self, table: &mut RateTable) -> anyhow::Result<()> {
        let label = table.label();
        match self.kind {
            RowKind::Bracket => {
                let lower = self
                    .lower
                    .with_context(|| format!("bracket row for {label} has no lower bound"))?;
                table.brackets.push(Bracket::new(lower, self.upper, self.value));
            }
            RowKind::Parameter => {
                let name = self
                    .parameter
                    .as_deref()
                    .with_context(|| format!("parameter row for {label} has no name"))?;
                let params = &mut table.parameters;
                let slot = match name {
                    "gst_rate" => &mut params.gst_rate,
                    "skills_levy_rate" => &mut params.skills_levy_rate,
                    "minimum_tax_rate" => &mut params.minimum_tax_rate,
                    "tax_free_threshold" => &mut params.tax_free_threshold,
                    "late_filing_rate" => &mut params.late_filing_rate,
                    "daily_interest_rate" => &mut params.daily_interest_rate,
                    "monthly_interest_rate" => &mut params.monthly_interest_rate,
                    "monthly_compounding" => {
                        params.monthly_compounding = !self.value.is_zero();
                        return Ok(());
                    }
                    other => bail!("unknown rate parameter '{other}' for {label}"),
                };
                if slot.replace(self.value).is_some() {
                    bail!("parameter '{name}' given twice for {label}");
                }
            }
        }
        Ok(())
    }
}

fn records_for(table: &RateTable) -> Vec<RateRecord> {
    let row = |kind, parameter: Option<&str>, lower, upper, value| RateRecord {
        tax_type: table.tax_type,
        category: table.category,
        tax_year: table.tax_year,
        effective_from: table.effective_from,
        effective_to: table.effective_to,
        kind,
        parameter: parameter.map(str::to_string),
        lower,
        upper,
        value,
    };

    let mut records: Vec<RateRecord> = table
        .brackets
        .iter()
        .map(|b| row(RowKind::Bracket, None, Some(b.lower), b.upper, b.rate))
        .collect();

    let p = &table.parameters;
    let named = [
        ("gst_rate", p.gst_rate),
        ("skills_levy_rate", p.skills_levy_rate),
        ("minimum_tax_rate", p.minimum_tax_rate),
        ("tax_free_threshold", p.tax_free_threshold),
        ("late_filing_rate", p.late_filing_rate),
        ("daily_interest_rate", p.daily_interest_rate),
        ("monthly_interest_rate", p.monthly_interest_rate),
    ];
    for (name, value) in named {
        if let Some(value) = value {
            records.push(row(RowKind::Parameter, Some(name), None, None, value));
        }
    }
    if p.monthly_compounding {
        records.push(row(
            RowKind::Parameter,
            Some("monthly_compounding"),
            None,
            None,
            Decimal::ONE,
        ));
    }
    records
}

/// Read rate tables from JSON
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<RateTable>> {
    let file: RateFile = serde_json::from_reader(reader)?;
    Ok(file.tables)
}

/// Read rate tables from CSV rows, grouping rows by table key in first-seen order
pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<RateTable>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut tables: Vec<(TableKey, RateTable)> = Vec::new();

    for (i, record) in rdr.deserialize::<RateRecord>().enumerate() {
        let record = record.with_context(|| format!("invalid rate row {}", i + 1))?;
        let key = record.key();
        let index = match tables.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                let mut table = RateTable::new(record.tax_type, record.tax_year, record.effective_from);
                table.category = record.category;
                table.effective_to = record.effective_to;
                tables.push((key, table));
                tables.len() - 1
            }
        };
        record.apply(&mut tables[index].1)?;
    }

    let mut tables: Vec<RateTable> = tables.into_iter().map(|(_, table)| table).collect();
    for table in &mut tables {
        table.brackets.sort_by_key(|b| b.lower);
    }
    log::debug!("Read {} rate tables from CSV", tables.len());
    Ok(tables)
}

pub fn write_json<W: Write>(tables: &[RateTable], writer: W) -> anyhow::Result<()> {
    let file = RateFile {
        tables: tables.to_vec(),
    };
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

/// Write rate tables as CSV rows. Excise rates have no CSV form.
pub fn write_csv<W: Write>(tables: &[RateTable], writer: W) -> anyhow::Result<()> {
    if let Some(table) = tables.iter().find(|t| !t.excise_rates.is_empty()) {
        bail!(
            "rate table {} has excise rates, which can only be written as JSON",
            table.label()
        );
    }
    let mut wtr = csv::Writer::from_writer(writer);
    for record in tables.iter().flat_map(records_for) {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load and validate a rate file; `.csv` files are read as rows, anything else as JSON
pub fn load_snapshot(path: &Path) -> anyhow::Result<RateSnapshot> {
    let file = File::open(path).with_context(|| format!("opening rate file {}", path.display()))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let tables = if is_csv {
        read_csv(file)
    } else {
        read_json(file)
    }
    .with_context(|| format!("reading rate file {}", path.display()))?;

    let snapshot = RateSnapshot::new(tables)
        .with_context(|| format!("validating rate file {}", path.display()))?;
    log::info!(
        "Loaded {} rate tables from {} ({})",
        snapshot.len(),
        path.display(),
        snapshot.fingerprint()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RateQuery, TaxType};
    use rust_decimal_macros::dec;

    const RATES_CSV: &str = "\
tax_type,category,tax_year,effective_from,effective_to,kind,parameter,lower,upper,value
income,,2024,2024-01-01,,bracket,,0,3000000,0
income,,2024,2024-01-01,,bracket,,3000000,6000000,0.15
income,,2024,2024-01-01,,bracket,,6000000,,0.25
income,,2024,2024-01-01,,parameter,late_filing_rate,,,0.05
income,,2024,2024-01-01,,parameter,daily_interest_rate,,,0.0005
gst,company,2024,2024-01-01,2024-07-01,parameter,gst_rate,,,0.18
gst,company,2024,2024-01-01,2024-07-01,parameter,monthly_compounding,,,1
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn csv_rows_grouped_into_tables() {
        let tables = read_csv(RATES_CSV.as_bytes()).unwrap();
        assert_eq!(tables.len(), 2);

        let income = &tables[0];
        assert_eq!(income.tax_type, TaxType::Income);
        assert_eq!(income.category, None);
        assert_eq!(income.brackets.len(), 3);
        assert_eq!(income.brackets[2].upper, None);
        assert_eq!(income.parameters.late_filing_rate, Some(dec!(0.05)));

        let gst = &tables[1];
        assert_eq!(gst.category, Some(TaxpayerCategory::Company));
        assert_eq!(gst.effective_to, Some(date(2024, 7, 1)));
        assert_eq!(gst.parameters.gst_rate, Some(dec!(0.18)));
        assert!(gst.parameters.monthly_compounding);
    }

    #[test]
    fn unknown_parameter_rejected() {
        let csv = "\
tax_type,category,tax_year,effective_from,effective_to,kind,parameter,lower,upper,value
gst,,2024,2024-01-01,,parameter,vat_rate,,,0.18
";
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unknown rate parameter"), "{err}");
    }

    #[test]
    fn repeated_parameter_rejected() {
        let csv = "\
tax_type,category,tax_year,effective_from,effective_to,kind,parameter,lower,upper,value
gst,,2024,2024-01-01,,parameter,gst_rate,,,0.18
gst,,2024,2024-01-01,,parameter,gst_rate,,,0.16
";
        assert!(read_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn csv_header_matches_record_fields() {
        assert_eq!(RateRecord::csv_header(), RATES_CSV.lines().next().unwrap());
        let required: Vec<_> = RateRecord::csv_fields()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(
            required,
            vec!["tax_type", "tax_year", "effective_from", "kind", "value"]
        );
    }

    #[test]
    fn json_round_trip_preserves_resolution_and_fingerprint() {
        let tables = read_csv(RATES_CSV.as_bytes()).unwrap();
        let original = RateSnapshot::new(tables.clone()).unwrap();

        let mut buf = Vec::new();
        write_json(&tables, &mut buf).unwrap();
        let reloaded = RateSnapshot::new(read_json(buf.as_slice()).unwrap()).unwrap();

        assert_eq!(original.fingerprint(), reloaded.fingerprint());
        let query = RateQuery {
            tax_type: TaxType::Gst,
            category: Some(TaxpayerCategory::Company),
            tax_year: TaxYear(2024),
            as_of: date(2024, 3, 1),
        };
        assert_eq!(
            original.resolve(&query).unwrap(),
            reloaded.resolve(&query).unwrap()
        );
    }

    #[test]
    fn csv_round_trip() {
        let tables = read_csv(RATES_CSV.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_csv(&tables, &mut buf).unwrap();
        assert_eq!(read_csv(buf.as_slice()).unwrap(), tables);
    }

    #[test]
    fn excise_tables_cannot_be_written_as_csv() {
        let mut table = RateTable::new(TaxType::Excise, TaxYear(2024), date(2024, 1, 1));
        table.excise_rates.push(crate::core::ExciseRate {
            product_category: "spirits".to_string(),
            product_code: None,
            specific_rate: dec!(500),
            ad_valorem_rate: dec!(0.1),
            basis: crate::core::DutyBasis::Both,
        });
        assert!(write_csv(&[table], Vec::new()).is_err());
    }
}
