//! Schema command - print expected input formats

use clap::Args;
use schemars::schema_for;
use taxengine::core::{AssessmentBatch, AssessmentRequest, CalculationRequest, ScoringPolicy};
use taxengine::rate_file::{RateFile, RateRecord};

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input format to describe
    #[arg(value_enum, default_value = "assessment")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for an assessment request
    Assessment,
    /// JSON Schema for a batch of assessment requests
    Batch,
    /// JSON Schema for a single tax type calculation request
    Calculation,
    /// JSON Schema for a rate file
    Rates,
    /// JSON Schema for a scoring policy
    Policy,
    /// CSV header row for rate rows
    CsvHeader,
    /// CSV rate row column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.format {
            SchemaFormat::Assessment => schema_for!(AssessmentRequest),
            SchemaFormat::Batch => schema_for!(AssessmentBatch),
            SchemaFormat::Calculation => schema_for!(CalculationRequest),
            SchemaFormat::Rates => schema_for!(RateFile),
            SchemaFormat::Policy => schema_for!(ScoringPolicy),
            SchemaFormat::CsvHeader => {
                println!("{}", RateRecord::csv_header());
                return Ok(());
            }
            SchemaFormat::CsvFields => {
                self.print_csv_fields();
                return Ok(());
            }
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_fields(&self) {
        println!("CSV Rate Format");
        println!("===============");
        println!();
        for field in RateRecord::csv_fields() {
            let req = if field.required { "required" } else { "optional" };
            println!("{:20} ({:8})  {}", field.name, req, field.description);
        }
        println!();
        println!("One row per bracket or parameter; rows with the same table key form one table.");
        println!("Excise rates can only be given in JSON rate files.");
    }
}
