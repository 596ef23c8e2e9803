//! Rule repository abstraction.
//!
//! The engine never fetches data itself; callers obtain a [`RuleSet`] from a
//! [`RuleRepository`] before invoking the calculation.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use crate::error::EngineResult;

use super::rule_set::{RuleSet, RuleSource};

/// Normalizes a country code for lookups ("ke " -> "KE").
pub fn normalize_country_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Loads the statutory rules of a country in force on a date.
pub trait RuleRepository: Send + Sync {
    /// Returns the validated rules for `country_code` on `effective_date`.
    ///
    /// A country without configured rules yields an empty [`RuleSet`], not an
    /// error. Malformed data is reported as
    /// [`EngineError::InvalidRuleData`](crate::error::EngineError::InvalidRuleData).
    fn load_rules(&self, country_code: &str, effective_date: NaiveDate) -> EngineResult<RuleSet>;
}

/// An in-memory repository of rule sources keyed by country.
///
/// # Example
///
/// ```
/// use statutory_engine::config::{CountryProfile, RuleBook, RuleRepository, RuleSource};
/// use chrono::NaiveDate;
///
/// let mut book = RuleBook::new();
/// book.insert(RuleSource::new(CountryProfile::unconfigured("KE")));
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let rules = book.load_rules("ke", date).unwrap();
/// assert!(rules.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    sources: HashMap<String, RuleSource>,
}

impl RuleBook {
    /// Creates an empty rule book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule book from a set of sources.
    pub fn from_sources(sources: impl IntoIterator<Item = RuleSource>) -> Self {
        let mut book = Self::new();
        for source in sources {
            book.insert(source);
        }
        book
    }

    /// Adds or replaces the source of a country.
    pub fn insert(&mut self, source: RuleSource) {
        self.sources
            .insert(normalize_country_code(&source.country.code), source);
    }

    /// Returns the source of a country, if configured.
    pub fn source(&self, country_code: &str) -> Option<&RuleSource> {
        self.sources.get(&normalize_country_code(country_code))
    }

    /// Returns the configured country codes, sorted.
    pub fn countries(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl RuleRepository for RuleBook {
    fn load_rules(&self, country_code: &str, effective_date: NaiveDate) -> EngineResult<RuleSet> {
        let code = normalize_country_code(country_code);
        match self.sources.get(&code) {
            Some(source) => RuleSet::resolve(source, effective_date),
            None => {
                info!(country = %code, "No statutory rules configured; using empty rule set");
                Ok(RuleSet::empty(&code, effective_date))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::{DeductionKind, ValidityWindow};
    use crate::test_support::*;
    use rust_decimal_macros::dec;

    fn book() -> RuleBook {
        RuleBook::from_sources([source(
            vec![deduction_type("ssf", "SSF", DeductionKind::Contribution)],
            vec![percentage_band("ssf_1", "ssf", dec!(0), None, dec!(3))],
            vec![],
            vec![],
        )])
    }

    #[test]
    fn test_load_rules_is_case_insensitive() {
        let rules = book().load_rules(" ke", date(2025, 1, 31)).unwrap();
        assert_eq!(rules.deduction_types().len(), 1);
        assert_eq!(rules.country().code, "KE");
    }

    #[test]
    fn test_unknown_country_yields_empty_rule_set() {
        let rules = book().load_rules("ZZ", date(2025, 1, 31)).unwrap();
        assert!(rules.is_empty());
        assert_eq!(rules.country().code, "ZZ");
    }

    #[test]
    fn test_load_rules_before_any_rule_is_in_force() {
        let rules = book().load_rules("KE", date(2023, 6, 30)).unwrap();
        assert!(rules.is_empty());
        assert!(rules.rate_bands().is_empty());
    }

    #[test]
    fn test_load_rules_reports_malformed_window() {
        let mut book = book();
        let mut source = book.source("KE").unwrap().clone();
        source.deduction_types[0].validity = ValidityWindow {
            from: date(2025, 1, 1),
            to: Some(date(2024, 1, 1)),
        };
        book.insert(source);

        let result = book.load_rules("KE", date(2025, 1, 31));
        assert!(matches!(result, Err(EngineError::InvalidRuleData { .. })));
    }

    #[test]
    fn test_countries_are_sorted() {
        let mut book = book();
        book.insert(RuleSource::new(crate::config::CountryProfile::unconfigured("ug")));
        assert_eq!(book.countries(), vec!["KE", "UG"]);
    }
}
