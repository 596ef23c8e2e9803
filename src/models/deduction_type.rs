//! Statutory deduction types and validity windows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The pipeline treatment of a statutory deduction.
///
/// `IncomeTax` is computed last and cumulatively over the tax year; every
/// other kind is computed first against the raw gross pay of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionKind {
    /// Income tax (PAYE-style withholding).
    IncomeTax,
    /// Social-insurance or pension contribution.
    Contribution,
    /// Housing, health or similar levy.
    Levy,
    /// Anything else mandated by statute.
    Other,
}

impl DeductionKind {
    /// Returns true if the deduction is computed cumulatively.
    pub fn is_income_tax(self) -> bool {
        self == DeductionKind::IncomeTax
    }
}

/// The period during which a rule record is in force.
///
/// The start is inclusive; an absent end means the record is open-ended,
/// otherwise the end is inclusive too.
///
/// # Example
///
/// ```
/// use statutory_engine::models::ValidityWindow;
/// use chrono::NaiveDate;
///
/// let window = ValidityWindow {
///     from: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
///     to: Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()),
/// };
/// assert!(window.contains(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
/// assert!(!window.contains(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First day the record applies.
    pub from: NaiveDate,
    /// Last day the record applies, if any.
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl ValidityWindow {
    /// A window starting on `from` with no end.
    pub fn open_from(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    /// Returns true unless the window ends before it starts.
    pub fn is_well_formed(&self) -> bool {
        self.to.is_none_or(|to| to >= self.from)
    }

    /// Returns true if `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && self.to.is_none_or(|to| date <= to)
    }
}

/// A government-mandated deduction category for a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryDeductionType {
    /// Unique identifier referenced by rate bands.
    pub id: String,
    /// Short code (e.g. "PAYE", "NSSF"), also used to match relief rules.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// How the deduction is treated by the pipeline.
    pub kind: DeductionKind,
    /// ISO country code the deduction belongs to.
    pub country: String,
    /// When the deduction type is in force.
    pub validity: ValidityWindow,
}
