//! Effective-dated rate table lookup.
//!
//! Resolution is a pure function over an immutable [`RateSnapshot`]. The
//! [`RateRepository`] only publishes snapshots: a refresh swaps in a new
//! `Arc<RateSnapshot>` while readers holding the old one finish undisturbed.

use super::error::EngineError;
use super::rates::RateTable;
use super::tax_type::{TaxType, TaxpayerCategory};
use super::tax_year::TaxYear;
use arc_swap::ArcSwap;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Key for a rate table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuery {
    pub tax_type: TaxType,
    pub category: Option<TaxpayerCategory>,
    pub tax_year: TaxYear,
    pub as_of: NaiveDate,
}

impl RateQuery {
    fn not_found(&self) -> EngineError {
        EngineError::RateNotFound {
            tax_type: self.tax_type,
            category: self.category,
            tax_year: self.tax_year,
            as_of: self.as_of,
        }
    }
}

/// Resolve the single effective table for `query`.
///
/// Candidates must match tax type and year, be effective on `as_of`, and
/// carry either the queried category or no category. An exact category
/// match beats a category-wide table; among equally specific tables the
/// latest `effective_from` wins. A tie at the top is an [`EngineError::AmbiguousRate`].
pub fn resolve<'a>(tables: &'a [RateTable], query: &RateQuery) -> Result<&'a RateTable, EngineError> {
    let mut best: Option<(u8, NaiveDate)> = None;
    let mut winners: Vec<&RateTable> = Vec::new();

    for table in tables {
        if table.tax_type != query.tax_type
            || table.tax_year != query.tax_year
            || !table.is_effective_on(query.as_of)
        {
            continue;
        }
        let specificity = match (table.category, query.category) {
            (None, _) => 0,
            (Some(own), Some(wanted)) if own == wanted => 1,
            _ => continue,
        };
        let rank = (specificity, table.effective_from);
        match best {
            Some(current) if rank < current => {}
            Some(current) if rank == current => winners.push(table),
            _ => {
                best = Some(rank);
                winners.clear();
                winners.push(table);
            }
        }
    }

    match winners.as_slice() {
        [] => Err(query.not_found()),
        [table] => {
            log::debug!(
                "Resolved {} {} {} as of {} -> {}",
                query.tax_type,
                query.category.map_or("*".to_string(), |c| c.to_string()),
                query.tax_year,
                query.as_of,
                table.label()
            );
            Ok(table)
        }
        many => {
            let labels: Vec<_> = many.iter().map(|t| t.label()).collect();
            log::error!(
                "Ambiguous rate tables for {} in {} as of {}: {}",
                query.tax_type,
                query.tax_year,
                query.as_of,
                labels.join(", ")
            );
            Err(EngineError::AmbiguousRate {
                tax_type: query.tax_type,
                category: query.category,
                tax_year: query.tax_year,
                as_of: query.as_of,
                count: many.len(),
            })
        }
    }
}

/// Immutable, validated set of rate tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSnapshot {
    tables: Vec<RateTable>,
}

impl RateSnapshot {
    /// Validate and sort the tables. Any invalid table rejects the whole snapshot.
    pub fn new(mut tables: Vec<RateTable>) -> Result<Self, EngineError> {
        for table in &tables {
            table.validate()?;
        }
        tables.sort_by(|a, b| {
            (a.tax_type, a.tax_year, a.category, a.effective_from).cmp(&(
                b.tax_type,
                b.tax_year,
                b.category,
                b.effective_from,
            ))
        });
        Ok(RateSnapshot { tables })
    }

    pub fn tables(&self) -> &[RateTable] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn resolve(&self, query: &RateQuery) -> Result<&RateTable, EngineError> {
        resolve(&self.tables, query)
    }

    /// Hex SHA-256 of the canonical JSON form of the snapshot
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for table in &self.tables {
            // RateTable serialization cannot fail: plain data, string map keys only
            let json = serde_json::to_vec(table).unwrap_or_default();
            hasher.update(&json);
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Shared read-only access to the current rate snapshot
#[derive(Debug)]
pub struct RateRepository {
    current: ArcSwap<RateSnapshot>,
}

impl RateRepository {
    pub fn new(snapshot: RateSnapshot) -> Self {
        RateRepository {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot in effect now. Hold it for the duration of one assessment.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.current.load_full()
    }

    /// Publish a new snapshot; returns the one it replaced
    pub fn replace(&self, snapshot: RateSnapshot) -> Arc<RateSnapshot> {
        log::info!(
            "Publishing rate snapshot with {} tables ({})",
            snapshot.len(),
            snapshot.fingerprint()
        );
        self.current.swap(Arc::new(snapshot))
    }

    pub fn resolve(&self, query: &RateQuery) -> Result<RateTable, EngineError> {
        self.current.load().resolve(query).cloned()
    }
}

impl Default for RateRepository {
    fn default() -> Self {
        RateRepository::new(RateSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::fixtures::*;
    use rust_decimal_macros::dec;

    fn query(tax_type: TaxType, category: Option<TaxpayerCategory>, as_of: NaiveDate) -> RateQuery {
        RateQuery {
            tax_type,
            category,
            tax_year: TaxYear(2024),
            as_of,
        }
    }

    #[test]
    fn resolves_single_table() {
        let tables = vec![income_table(), gst_table()];
        let q = query(TaxType::Gst, None, date(2024, 12, 31));
        assert_eq!(resolve(&tables, &q).unwrap(), &gst_table());
    }

    #[test]
    fn missing_table_is_rate_not_found() {
        let tables = vec![income_table()];
        let q = query(TaxType::Excise, None, date(2024, 12, 31));
        assert_eq!(resolve(&tables, &q).unwrap_err().kind(), "RateNotFound");
    }

    #[test]
    fn not_yet_effective_table_ignored() {
        let tables = vec![income_table()];
        let mut q = query(TaxType::Income, None, date(2023, 12, 31));
        q.tax_year = TaxYear(2024);
        assert!(resolve(&tables, &q).is_err());
    }

    #[test]
    fn category_match_beats_generic() {
        let generic = income_table();
        let mut company = income_table();
        company.category = Some(TaxpayerCategory::Company);
        company.parameters.minimum_tax_rate = Some(dec!(0.005));
        let tables = vec![generic.clone(), company.clone()];

        let q = query(TaxType::Income, Some(TaxpayerCategory::Company), date(2024, 6, 1));
        assert_eq!(resolve(&tables, &q).unwrap(), &company);

        let q = query(TaxType::Income, Some(TaxpayerCategory::Individual), date(2024, 6, 1));
        assert_eq!(resolve(&tables, &q).unwrap(), &generic);

        let q = query(TaxType::Income, None, date(2024, 6, 1));
        assert_eq!(resolve(&tables, &q).unwrap(), &generic);
    }

    #[test]
    fn latest_effective_from_wins() {
        let mut first_half = income_table();
        first_half.id = Some("h1".to_string());
        let mut second_half = income_table();
        second_half.id = Some("h2".to_string());
        second_half.effective_from = date(2024, 7, 1);
        let tables = vec![second_half, first_half];

        let q = query(TaxType::Income, None, date(2024, 3, 1));
        assert_eq!(resolve(&tables, &q).unwrap().label(), "h1");
        let q = query(TaxType::Income, None, date(2024, 7, 1));
        assert_eq!(resolve(&tables, &q).unwrap().label(), "h2");
    }

    #[test]
    fn duplicate_tables_are_ambiguous() {
        let tables = vec![income_table(), income_table()];
        let q = query(TaxType::Income, None, date(2024, 6, 1));
        match resolve(&tables, &q) {
            Err(EngineError::AmbiguousRate { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected AmbiguousRate, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_rejects_invalid_table() {
        let mut broken = income_table();
        broken.brackets.clear();
        assert!(RateSnapshot::new(vec![broken]).is_err());
    }

    #[test]
    fn repeated_lookups_return_identical_tables() {
        let snapshot = RateSnapshot::new(vec![income_table(), gst_table()]).unwrap();
        let q = query(TaxType::Income, None, date(2024, 12, 31));
        let first = snapshot.resolve(&q).unwrap().clone();
        for _ in 0..10 {
            assert_eq!(snapshot.resolve(&q).unwrap(), &first);
        }
    }

    #[test]
    fn fingerprint_independent_of_input_order() {
        let a = RateSnapshot::new(vec![income_table(), gst_table()]).unwrap();
        let b = RateSnapshot::new(vec![gst_table(), income_table()]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut changed = gst_table();
        changed.parameters.gst_rate = Some(dec!(0.16));
        let c = RateSnapshot::new(vec![income_table(), changed]).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn replace_keeps_old_snapshot_alive_for_readers() {
        let repo = RateRepository::new(RateSnapshot::new(vec![income_table()]).unwrap());
        let held = repo.snapshot();

        let previous = repo.replace(RateSnapshot::new(vec![gst_table()]).unwrap());
        assert_eq!(previous.len(), 1);

        let q = query(TaxType::Income, None, date(2024, 12, 31));
        assert!(held.resolve(&q).is_ok());
        assert!(repo.resolve(&q).is_err());
        assert!(repo
            .resolve(&query(TaxType::Gst, None, date(2024, 12, 31)))
            .is_ok());
    }
}
