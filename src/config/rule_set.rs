//! Validated statutory rule sets.
//!
//! A [`RuleSource`] holds every record configured for a country. Resolving it
//! for an effective date produces a [`RuleSet`]: only the records in force on
//! that date, with the band-ordering and exclusivity invariants checked once
//! so that the calculation never has to trust raw ordering.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationMethod, RateBand, ReliefFormula, ReliefRule, ReliefScheme, SchemeFormula,
    StatutoryDeductionType, TaxYear, ValidityWindow,
};

use super::types::CountryProfile;

/// Every rule record configured for one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    /// Country metadata.
    pub country: CountryProfile,
    /// Statutory deduction types.
    pub deduction_types: Vec<StatutoryDeductionType>,
    /// Rate bands of all deduction types.
    pub rate_bands: Vec<RateBand>,
    /// Reliefs derived from statutory contributions.
    pub relief_rules: Vec<ReliefRule>,
    /// Relief schemes employees can enroll in.
    pub relief_schemes: Vec<ReliefScheme>,
}

impl RuleSource {
    /// Creates an empty source for a country.
    pub fn new(country: CountryProfile) -> Self {
        Self {
            country,
            deduction_types: Vec::new(),
            rate_bands: Vec::new(),
            relief_rules: Vec::new(),
            relief_schemes: Vec::new(),
        }
    }

    /// Checks that no record's validity window ends before it starts.
    ///
    /// This runs over all records, not just those in force on some date, so a
    /// malformed window is reported instead of silently filtering the record out.
    pub fn validate_windows(&self) -> EngineResult<()> {
        let windows = self
            .deduction_types
            .iter()
            .map(|t| (t.id.as_str(), &t.validity))
            .chain(self.rate_bands.iter().map(|b| (b.id.as_str(), &b.validity)))
            .chain(self.relief_rules.iter().map(|r| (r.id.as_str(), &r.validity)))
            .chain(self.relief_schemes.iter().map(|s| (s.id.as_str(), &s.validity)));

        for (id, window) in windows {
            check_window(id, window)?;
        }
        Ok(())
    }
}

fn check_window(id: &str, window: &ValidityWindow) -> EngineResult<()> {
    match window.to {
        Some(to) if to < window.from => Err(EngineError::invalid_rule(
            id,
            format!(
                "validity window ends ({}) before it starts ({})",
                to, window.from
            ),
        )),
        _ => Ok(()),
    }
}

fn check_non_negative(id: &str, field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::invalid_rule(
            id,
            format!("'{}' must not be negative (got {})", field, value),
        ));
    }
    Ok(())
}

fn check_country(id: &str, country: &str, expected: &str) -> EngineResult<()> {
    if !country.eq_ignore_ascii_case(expected) {
        return Err(EngineError::invalid_rule(
            id,
            format!("belongs to country '{}' but is configured under '{}'", country, expected),
        ));
    }
    Ok(())
}

fn check_age_range(id: &str, min_age: u32, max_age: Option<u32>) -> EngineResult<()> {
    match max_age {
        Some(max) if max < min_age => Err(EngineError::invalid_rule(
            id,
            format!("max_age {} is below min_age {}", max, min_age),
        )),
        _ => Ok(()),
    }
}

fn check_band(band: &RateBand, type_ids: &HashSet<&str>) -> EngineResult<()> {
    let id = band.id.as_str();
    if !type_ids.contains(band.deduction_type_id.as_str()) {
        return Err(EngineError::invalid_rule(
            id,
            format!("references unknown deduction type '{}'", band.deduction_type_id),
        ));
    }
    check_non_negative(id, "min_amount", band.min_amount)?;
    if let Some(max) = band.max_amount {
        if max < band.min_amount {
            return Err(EngineError::invalid_rule(
                id,
                format!("max_amount {} is below min_amount {}", max, band.min_amount),
            ));
        }
    }
    check_age_range(id, band.min_age, band.max_age)?;

    let (employee, employer) = match band.calculation {
        CalculationMethod::Percentage {
            employee_rate,
            employer_rate,
        } => (employee_rate, employer_rate),
        CalculationMethod::PerUnit {
            employee_amount,
            employer_amount,
        }
        | CalculationMethod::Fixed {
            employee_amount,
            employer_amount,
        } => (employee_amount, employer_amount),
    };
    check_non_negative(id, "employee amount", employee)?;
    check_non_negative(id, "employer amount", employer)
}

fn check_records(source: &RuleSource) -> EngineResult<()> {
    let country = source.country.code.as_str();

    let mut type_ids = HashSet::new();
    for deduction_type in &source.deduction_types {
        check_country(&deduction_type.id, &deduction_type.country, country)?;
        if !type_ids.insert(deduction_type.id.as_str()) {
            return Err(EngineError::invalid_rule(
                &deduction_type.id,
                "duplicate deduction type id",
            ));
        }
    }

    for band in &source.rate_bands {
        check_band(band, &type_ids)?;
    }

    for rule in &source.relief_rules {
        check_country(&rule.id, &rule.country, country)?;
        let amount = match rule.formula {
            ReliefFormula::Percentage { rate } => rate,
            ReliefFormula::Fixed { amount } => amount,
        };
        check_non_negative(&rule.id, "relief amount", amount)?;
        if let Some(max) = rule.max_amount {
            check_non_negative(&rule.id, "max_amount", max)?;
        }
    }

    for scheme in &source.relief_schemes {
        check_country(&scheme.id, &scheme.country, country)?;
        check_age_range(&scheme.id, scheme.min_age, scheme.max_age)?;
        let amount = match scheme.formula {
            SchemeFormula::PercentageOfGross { rate }
            | SchemeFormula::PercentageOfContribution { rate } => rate,
            SchemeFormula::Fixed { amount } => amount,
        };
        check_non_negative(&scheme.id, "relief amount", amount)?;
        if let Some(max) = scheme.max_amount {
            check_non_negative(&scheme.id, "max_amount", max)?;
        }
    }

    Ok(())
}

/// Checks that an income tax schedule is a progressive, non-overlapping ladder.
fn check_progressive_schedule(schedule: &[&RateBand]) -> EngineResult<()> {
    if let Some(band) = schedule
        .iter()
        .find(|band| band.calculation.employee_rate().is_none())
    {
        return Err(EngineError::invalid_rule(
            &band.id,
            format!(
                "income tax bands must use the percentage method, not '{}'",
                band.calculation.name()
            ),
        ));
    }

    for pair in schedule.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        match lower.max_amount {
            None => {
                return Err(EngineError::invalid_rule(
                    &lower.id,
                    "only the highest income tax band may be open-ended",
                ));
            }
            Some(max) if upper.min_amount < max => {
                return Err(EngineError::invalid_rule(
                    &upper.id,
                    format!("overlaps income tax band '{}'", lower.id),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Checks that no two bands of a non-cumulative type can match the same employee.
fn check_exclusive_bands(schedule: &[&RateBand]) -> EngineResult<()> {
    for (index, first) in schedule.iter().enumerate() {
        for second in &schedule[index + 1..] {
            if first.amount_range_overlaps(second) && first.age_range_overlaps(second) {
                return Err(EngineError::invalid_rule(
                    &second.id,
                    format!("overlaps band '{}' of the same deduction type", first.id),
                ));
            }
        }
    }
    Ok(())
}

/// The statutory rules of one country in force on one date.
///
/// Only [`RuleSet::resolve`] builds a non-empty rule set, so every value of
/// this type has passed validation. Rate bands are ordered by deduction type
/// and ascending `min_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    country: CountryProfile,
    effective_date: NaiveDate,
    deduction_types: Vec<StatutoryDeductionType>,
    rate_bands: Vec<RateBand>,
    relief_rules: Vec<ReliefRule>,
    relief_schemes: Vec<ReliefScheme>,
}

impl RuleSet {
    /// Validates a country's records and selects those in force on `effective_date`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRuleData`] if:
    /// - any record's validity window ends before it starts
    /// - a band references an unknown deduction type or has an inverted range
    /// - more than one income tax type is in force
    /// - income tax bands overlap, are not percentage bands, or an open band is not last
    /// - two bands of another kind overlap in both amount and age range
    /// - two active relief rules share a source code
    pub fn resolve(source: &RuleSource, effective_date: NaiveDate) -> EngineResult<Self> {
        let country = source.country.clone();
        if !country.tax_year_start.is_valid() {
            return Err(EngineError::invalid_rule(
                &country.code,
                "tax_year_start is not a valid day of the year",
            ));
        }
        source.validate_windows()?;
        check_records(source)?;

        let deduction_types: Vec<StatutoryDeductionType> = source
            .deduction_types
            .iter()
            .filter(|t| t.validity.contains(effective_date))
            .cloned()
            .collect();

        let income_tax_count = deduction_types
            .iter()
            .filter(|t| t.kind.is_income_tax())
            .count();
        if income_tax_count > 1 {
            return Err(EngineError::invalid_rule(
                &country.code,
                format!(
                    "{} income tax types are in force on {}; at most one is allowed",
                    income_tax_count, effective_date
                ),
            ));
        }

        let type_ids: HashSet<&str> = deduction_types.iter().map(|t| t.id.as_str()).collect();
        let mut rate_bands: Vec<RateBand> = source
            .rate_bands
            .iter()
            .filter(|b| {
                b.validity.contains(effective_date)
                    && type_ids.contains(b.deduction_type_id.as_str())
            })
            .cloned()
            .collect();
        rate_bands.sort_by(|a, b| {
            a.deduction_type_id
                .cmp(&b.deduction_type_id)
                .then(a.min_amount.cmp(&b.min_amount))
        });

        for deduction_type in &deduction_types {
            let schedule: Vec<&RateBand> = rate_bands
                .iter()
                .filter(|b| b.is_active && b.deduction_type_id == deduction_type.id)
                .collect();
            if deduction_type.kind.is_income_tax() {
                check_progressive_schedule(&schedule)?;
            } else {
                check_exclusive_bands(&schedule)?;
            }
        }

        let relief_rules: Vec<ReliefRule> = source
            .relief_rules
            .iter()
            .filter(|r| r.validity.contains(effective_date))
            .cloned()
            .collect();
        let mut sources_seen: HashMap<&str, &str> = HashMap::new();
        for rule in relief_rules.iter().filter(|r| r.is_active) {
            if let Some(existing) = sources_seen.insert(rule.source_code.as_str(), rule.id.as_str()) {
                return Err(EngineError::invalid_rule(
                    &rule.id,
                    format!(
                        "relief rule for '{}' duplicates rule '{}'",
                        rule.source_code, existing
                    ),
                ));
            }
        }

        let relief_schemes: Vec<ReliefScheme> = source
            .relief_schemes
            .iter()
            .filter(|s| s.validity.contains(effective_date))
            .cloned()
            .collect();

        debug!(
            country = %country.code,
            effective_date = %effective_date,
            deduction_types = deduction_types.len(),
            rate_bands = rate_bands.len(),
            relief_rules = relief_rules.len(),
            relief_schemes = relief_schemes.len(),
            "Resolved rule set"
        );

        Ok(Self {
            country,
            effective_date,
            deduction_types,
            rate_bands,
            relief_rules,
            relief_schemes,
        })
    }

    /// A rule set for a country with no configured rules.
    pub fn empty(country_code: &str, effective_date: NaiveDate) -> Self {
        Self {
            country: CountryProfile::unconfigured(country_code),
            effective_date,
            deduction_types: Vec::new(),
            rate_bands: Vec::new(),
            relief_rules: Vec::new(),
            relief_schemes: Vec::new(),
        }
    }

    /// Returns the country metadata.
    pub fn country(&self) -> &CountryProfile {
        &self.country
    }

    /// Returns the date the rules were resolved for.
    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    /// Returns the tax year of the effective date.
    pub fn tax_year(&self) -> TaxYear {
        self.country.tax_year_start.tax_year_of(self.effective_date)
    }

    /// Returns the deduction types in force.
    pub fn deduction_types(&self) -> &[StatutoryDeductionType] {
        &self.deduction_types
    }

    /// Returns the rate bands in force, ordered by type and `min_amount`.
    pub fn rate_bands(&self) -> &[RateBand] {
        &self.rate_bands
    }

    /// Returns the statutory relief rules in force.
    pub fn relief_rules(&self) -> &[ReliefRule] {
        &self.relief_rules
    }

    /// Returns the relief schemes in force.
    pub fn relief_schemes(&self) -> &[ReliefScheme] {
        &self.relief_schemes
    }

    /// Returns the income tax type, if one is in force.
    pub fn income_tax_type(&self) -> Option<&StatutoryDeductionType> {
        self.deduction_types.iter().find(|t| t.kind.is_income_tax())
    }

    /// Returns the deduction types computed before income tax.
    pub fn non_tax_types(&self) -> impl Iterator<Item = &StatutoryDeductionType> {
        self.deduction_types.iter().filter(|t| !t.kind.is_income_tax())
    }

    /// Returns true if no deduction types are in force.
    pub fn is_empty(&self) -> bool {
        self.deduction_types.is_empty()
    }
}
