use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The four tax types the engine computes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    Income,
    Gst,
    Payroll,
    Excise,
}

impl TaxType {
    pub const ALL: [TaxType; 4] = [
        TaxType::Income,
        TaxType::Gst,
        TaxType::Payroll,
        TaxType::Excise,
    ];

    pub fn from_str(s: &str) -> Option<TaxType> {
        match s.trim().to_lowercase().as_str() {
            "income" | "income_tax" => Some(TaxType::Income),
            "gst" | "vat" => Some(TaxType::Gst),
            "payroll" | "paye" => Some(TaxType::Payroll),
            "excise" => Some(TaxType::Excise),
            _ => None,
        }
    }

    /// Serialized form, used in table labels and CSV rows
    pub fn code(&self) -> &'static str {
        match self {
            TaxType::Income => "income",
            TaxType::Gst => "gst",
            TaxType::Payroll => "payroll",
            TaxType::Excise => "excise",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            TaxType::Income => "Income Tax",
            TaxType::Gst => "GST",
            TaxType::Payroll => "Payroll Tax",
            TaxType::Excise => "Excise Duty",
        }
    }
}

impl std::fmt::Display for TaxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Taxpayer category used to pick category-specific rate tables
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxpayerCategory {
    Individual,
    SoleProprietor,
    Partnership,
    Company,
    NonProfit,
}

impl TaxpayerCategory {
    pub fn from_str(s: &str) -> Option<TaxpayerCategory> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "individual" => Some(TaxpayerCategory::Individual),
            "sole_proprietor" => Some(TaxpayerCategory::SoleProprietor),
            "partnership" => Some(TaxpayerCategory::Partnership),
            "company" => Some(TaxpayerCategory::Company),
            "non_profit" => Some(TaxpayerCategory::NonProfit),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaxpayerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaxpayerCategory::Individual => "individual",
            TaxpayerCategory::SoleProprietor => "sole_proprietor",
            TaxpayerCategory::Partnership => "partnership",
            TaxpayerCategory::Company => "company",
            TaxpayerCategory::NonProfit => "non_profit",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_type_from_str() {
        assert_eq!(TaxType::from_str("income"), Some(TaxType::Income));
        assert_eq!(TaxType::from_str("VAT"), Some(TaxType::Gst));
        assert_eq!(TaxType::from_str(" Paye "), Some(TaxType::Payroll));
        assert_eq!(TaxType::from_str("excise"), Some(TaxType::Excise));
        assert_eq!(TaxType::from_str("stamp"), None);
    }

    #[test]
    fn category_from_str_accepts_separators() {
        assert_eq!(
            TaxpayerCategory::from_str("Sole Proprietor"),
            Some(TaxpayerCategory::SoleProprietor)
        );
        assert_eq!(
            TaxpayerCategory::from_str("non-profit"),
            Some(TaxpayerCategory::NonProfit)
        );
        assert_eq!(TaxpayerCategory::from_str("trust"), None);
    }

    #[test]
    fn category_display_matches_serde() {
        for category in [
            TaxpayerCategory::Individual,
            TaxpayerCategory::SoleProprietor,
            TaxpayerCategory::Company,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
