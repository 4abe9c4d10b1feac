use super::tax_type::{TaxType, TaxpayerCategory};
use super::tax_year::TaxYear;
use chrono::NaiveDate;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no rate table for {tax_type} ({}) in {tax_year} as of {as_of}", display_category(.category))]
    RateNotFound {
        tax_type: TaxType,
        category: Option<TaxpayerCategory>,
        tax_year: TaxYear,
        as_of: NaiveDate,
    },
    #[error("{count} rate tables effective for {tax_type} ({}) in {tax_year} as of {as_of}", display_category(.category))]
    AmbiguousRate {
        tax_type: TaxType,
        category: Option<TaxpayerCategory>,
        tax_year: TaxYear,
        as_of: NaiveDate,
        count: usize,
    },
    #[error("invalid rate table {table}: {reason}")]
    InvalidRateTable { table: String, reason: String },
    #[error("no excise rate for product category '{category}'")]
    NoExciseRate { category: String },
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    /// Short machine-readable name used in assessment output and issues
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "InvalidInput",
            EngineError::RateNotFound { .. } => "RateNotFound",
            EngineError::AmbiguousRate { .. } => "AmbiguousRate",
            EngineError::InvalidRateTable { .. } => "InvalidRateTable",
            EngineError::NoExciseRate { .. } => "NoExciseRate",
        }
    }

    /// Failures caused by the taxpayer's figures rather than by rate data
    pub fn is_input_error(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }
}

fn display_category(category: &Option<TaxpayerCategory>) -> String {
    category.map_or_else(|| "any category".to_string(), |c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_not_found_message_names_the_lookup() {
        let err = EngineError::RateNotFound {
            tax_type: TaxType::Gst,
            category: Some(TaxpayerCategory::Company),
            tax_year: TaxYear(2024),
            as_of: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "no rate table for GST (company) in 2024 as of 2024-12-31"
        );
        assert_eq!(err.kind(), "RateNotFound");
        assert!(!err.is_input_error());
    }

    #[test]
    fn missing_category_displays_as_any() {
        let err = EngineError::AmbiguousRate {
            tax_type: TaxType::Income,
            category: None,
            tax_year: TaxYear(2024),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            count: 2,
        };
        assert!(err.to_string().contains("(any category)"));
    }
}
