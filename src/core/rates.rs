use super::error::EngineError;
use super::penalty::{InterestMethod, PenaltyTerms};
use super::tax_type::{TaxType, TaxpayerCategory};
use super::tax_year::TaxYear;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Days in a compounding period
pub const DAYS_PER_MONTH: i64 = 30;

/// A contiguous income range taxed at a single marginal rate.
/// `upper` is exclusive; `None` marks the unbounded top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bracket {
    #[schemars(with = "f64")]
    pub lower: Decimal,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub upper: Option<Decimal>,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl Bracket {
    pub fn new(lower: Decimal, upper: Option<Decimal>, rate: Decimal) -> Self {
        Bracket { lower, upper, rate }
    }

    /// True when `amount` tops out inside this bracket (boundary belongs to the lower bracket)
    pub fn reaches(&self, amount: Decimal) -> bool {
        self.upper.is_none_or(|upper| amount <= upper)
    }
}

/// Named scalar parameters of a rate table. Which ones are required depends on the tax type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RateParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub gst_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub skills_levy_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub minimum_tax_rate: Option<Decimal>,
    /// Annual salary exempt from PAYE before the brackets apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub tax_free_threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub late_filing_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub daily_interest_rate: Option<Decimal>,
    /// Only read when `monthly_compounding` is set; defaults to 30 x daily rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub monthly_interest_rate: Option<Decimal>,
    #[serde(default)]
    pub monthly_compounding: bool,
}

impl RateParameters {
    fn named(&self) -> [(&'static str, Option<Decimal>); 7] {
        [
            ("gst_rate", self.gst_rate),
            ("skills_levy_rate", self.skills_levy_rate),
            ("minimum_tax_rate", self.minimum_tax_rate),
            ("tax_free_threshold", self.tax_free_threshold),
            ("late_filing_rate", self.late_filing_rate),
            ("daily_interest_rate", self.daily_interest_rate),
            ("monthly_interest_rate", self.monthly_interest_rate),
        ]
    }

    /// Parameters that are fractions of an amount
    fn fractions(&self) -> [(&'static str, Option<Decimal>); 6] {
        [
            ("gst_rate", self.gst_rate),
            ("skills_levy_rate", self.skills_levy_rate),
            ("minimum_tax_rate", self.minimum_tax_rate),
            ("late_filing_rate", self.late_filing_rate),
            ("daily_interest_rate", self.daily_interest_rate),
            ("monthly_interest_rate", self.monthly_interest_rate),
        ]
    }
}

/// Which excise components apply to a product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DutyBasis {
    #[default]
    Both,
    SpecificOnly,
    AdValoremOnly,
}

/// Excise rate for a product category, optionally narrowed to one product code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExciseRate {
    pub product_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    /// Duty per unit of quantity
    #[serde(default)]
    #[schemars(with = "f64")]
    pub specific_rate: Decimal,
    /// Duty as a fraction of value
    #[serde(default)]
    #[schemars(with = "f64")]
    pub ad_valorem_rate: Decimal,
    #[serde(default)]
    pub basis: DutyBasis,
}

impl ExciseRate {
    /// Specific rate after applying the duty basis
    pub fn effective_specific_rate(&self) -> Decimal {
        match self.basis {
            DutyBasis::Both | DutyBasis::SpecificOnly => self.specific_rate,
            DutyBasis::AdValoremOnly => Decimal::ZERO,
        }
    }

    /// Ad-valorem rate after applying the duty basis
    pub fn effective_ad_valorem_rate(&self) -> Decimal {
        match self.basis {
            DutyBasis::Both | DutyBasis::AdValoremOnly => self.ad_valorem_rate,
            DutyBasis::SpecificOnly => Decimal::ZERO,
        }
    }

    fn matches(&self, category: &str, code: Option<&str>) -> bool {
        if !self.product_category.eq_ignore_ascii_case(category) {
            return false;
        }
        match (&self.product_code, code) {
            (None, _) => true,
            (Some(own), Some(code)) => own.eq_ignore_ascii_case(code),
            (Some(_), None) => false,
        }
    }
}

/// Effective-dated rate table for one tax type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RateTable {
    /// Optional label for audit output; generated from the key when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tax_type: TaxType,
    /// Absent means the table applies to any taxpayer category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaxpayerCategory>,
    pub tax_year: TaxYear,
    pub effective_from: NaiveDate,
    /// Exclusive end date; absent means open-ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub brackets: Vec<Bracket>,
    #[serde(default)]
    pub parameters: RateParameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excise_rates: Vec<ExciseRate>,
}

impl RateTable {
    pub fn new(tax_type: TaxType, tax_year: TaxYear, effective_from: NaiveDate) -> Self {
        RateTable {
            id: None,
            tax_type,
            category: None,
            tax_year,
            effective_from,
            effective_to: None,
            brackets: Vec::new(),
            parameters: RateParameters::default(),
            excise_rates: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!(
                "{}/{}/{}/{}",
                self.tax_type.code(),
                self.category.map_or("*".to_string(), |c| c.to_string()),
                self.tax_year,
                self.effective_from
            ),
        }
    }

    /// Effective on `as_of`: from <= as_of < to
    pub fn is_effective_on(&self, as_of: NaiveDate) -> bool {
        self.effective_from <= as_of && self.effective_to.is_none_or(|to| to > as_of)
    }

    fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::InvalidRateTable {
            table: self.label(),
            reason: reason.into(),
        }
    }

    /// Look up a required scalar parameter
    pub fn require(&self, name: &'static str, value: Option<Decimal>) -> Result<Decimal, EngineError> {
        value.ok_or_else(|| self.invalid(format!("missing {name}")))
    }

    pub fn gst_rate(&self) -> Result<Decimal, EngineError> {
        self.require("gst_rate", self.parameters.gst_rate)
    }

    pub fn skills_levy_rate(&self) -> Result<Decimal, EngineError> {
        self.require("skills_levy_rate", self.parameters.skills_levy_rate)
    }

    pub fn tax_free_threshold(&self) -> Decimal {
        self.parameters.tax_free_threshold.unwrap_or(Decimal::ZERO)
    }

    pub fn minimum_tax_rate(&self) -> Option<Decimal> {
        self.parameters.minimum_tax_rate
    }

    /// Penalty and interest parameters for this table
    pub fn penalty_terms(&self) -> Result<PenaltyTerms, EngineError> {
        let late_filing_rate = self.require("late_filing_rate", self.parameters.late_filing_rate)?;
        let daily_rate = self.require("daily_interest_rate", self.parameters.daily_interest_rate)?;
        let interest = if self.parameters.monthly_compounding {
            let monthly_rate = match self.parameters.monthly_interest_rate {
                Some(rate) => rate,
                None => daily_rate
                    .checked_mul(Decimal::from(DAYS_PER_MONTH))
                    .ok_or_else(|| self.invalid("daily_interest_rate is out of range"))?,
            };
            InterestMethod::MonthlyCompounding {
                daily_rate,
                monthly_rate,
            }
        } else {
            InterestMethod::Simple { daily_rate }
        };
        Ok(PenaltyTerms {
            late_filing_rate,
            interest,
        })
    }

    /// Excise rate for a product: an exact product-code match wins over a category-wide rate
    pub fn excise_rate_for(&self, category: &str, code: Option<&str>) -> Result<&ExciseRate, EngineError> {
        let coded = code.and_then(|code| {
            self.excise_rates
                .iter()
                .find(|r| r.product_code.is_some() && r.matches(category, Some(code)))
        });
        coded
            .or_else(|| {
                self.excise_rates
                    .iter()
                    .find(|r| r.product_code.is_none() && r.matches(category, None))
            })
            .ok_or_else(|| EngineError::NoExciseRate {
                category: category.to_string(),
            })
    }

    /// Check the structural invariants of the table
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(to) = self.effective_to {
            if to <= self.effective_from {
                return Err(self.invalid(format!(
                    "effective_to {to} is not after effective_from {}",
                    self.effective_from
                )));
            }
        }

        self.validate_brackets()?;

        for (name, value) in self.parameters.named() {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(self.invalid(format!("{name} is negative")));
            }
        }
        for (name, value) in self.parameters.fractions() {
            if let Some(rate) = value.filter(|v| *v > Decimal::ONE) {
                return Err(self.invalid(format!("{name} {rate} outside 0..=1")));
            }
        }

        match self.tax_type {
            TaxType::Income => {
                if self.brackets.is_empty() {
                    return Err(self.invalid("income tax table has no brackets"));
                }
            }
            TaxType::Payroll => {
                if self.brackets.is_empty() {
                    return Err(self.invalid("payroll table has no brackets"));
                }
                self.skills_levy_rate()?;
            }
            TaxType::Gst => {
                self.gst_rate()?;
            }
            TaxType::Excise => {
                if self.excise_rates.is_empty() {
                    return Err(self.invalid("excise table has no excise rates"));
                }
                self.validate_excise_rates()?;
            }
        }
        Ok(())
    }

    fn validate_brackets(&self) -> Result<(), EngineError> {
        let Some(first) = self.brackets.first() else {
            return Ok(());
        };
        if !first.lower.is_zero() {
            return Err(self.invalid(format!("first bracket starts at {}, not 0", first.lower)));
        }

        let last = self.brackets.len() - 1;
        for (i, bracket) in self.brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > dec!(1) {
                return Err(self.invalid(format!("bracket {i} rate {} outside 0..=1", bracket.rate)));
            }
            match bracket.upper {
                Some(upper) if upper <= bracket.lower => {
                    return Err(self.invalid(format!(
                        "bracket {i} upper bound {upper} is not above lower bound {}",
                        bracket.lower
                    )));
                }
                None if i != last => {
                    return Err(self.invalid(format!("bracket {i} is unbounded but not last")));
                }
                _ => {}
            }
            if let Some(next) = self.brackets.get(i + 1) {
                if bracket.upper != Some(next.lower) {
                    return Err(self.invalid(format!(
                        "brackets {i} and {} are not contiguous",
                        i + 1
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_excise_rates(&self) -> Result<(), EngineError> {
        for (i, rate) in self.excise_rates.iter().enumerate() {
            if rate.specific_rate < Decimal::ZERO || rate.ad_valorem_rate < Decimal::ZERO {
                return Err(self.invalid(format!(
                    "excise rate for '{}' is negative",
                    rate.product_category
                )));
            }
            if rate.ad_valorem_rate > Decimal::ONE {
                return Err(self.invalid(format!(
                    "ad valorem rate for '{}' outside 0..=1",
                    rate.product_category
                )));
            }
            let duplicate = self.excise_rates[..i].iter().any(|other| {
                other.product_category.eq_ignore_ascii_case(&rate.product_category)
                    && match (&other.product_code, &rate.product_code) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                        _ => false,
                    }
            });
            if duplicate {
                return Err(self.invalid(format!(
                    "duplicate excise rate for '{}'",
                    rate.product_category
                )));
            }
        }
        Ok(())
    }
}
