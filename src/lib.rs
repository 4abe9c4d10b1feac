//! Tax calculation and penalty determination.
//!
//! [`core`] holds the engine: rate tables, the per-tax-type calculators,
//! penalties, compliance scoring and the assessment orchestrator.
//! [`rate_file`] reads and writes rate tables as JSON or CSV.

pub mod core;
pub mod rate_file;
