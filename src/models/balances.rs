//! Year-to-date balances and tax years.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tax year, labelled by the calendar year in which it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxYear(pub i32);

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The day of the year on which a country's tax year starts.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{TaxYear, TaxYearStart};
/// use chrono::NaiveDate;
///
/// // A 6 April start
/// let start = TaxYearStart { month: 4, day: 6 };
/// let date = NaiveDate::from_ymd_opt(2025, 4, 5).unwrap();
/// assert_eq!(start.tax_year_of(date), TaxYear(2024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearStart {
    /// Month (1-12).
    pub month: u32,
    /// Day of month.
    pub day: u32,
}

impl Default for TaxYearStart {
    fn default() -> Self {
        Self { month: 1, day: 1 }
    }
}

impl TaxYearStart {
    /// Returns true if month/day form a date that exists in every year.
    pub fn is_valid(&self) -> bool {
        NaiveDate::from_ymd_opt(2001, self.month, self.day).is_some()
    }

    /// The tax year `date` belongs to.
    pub fn tax_year_of(&self, date: NaiveDate) -> TaxYear {
        if (date.month(), date.day()) >= (self.month, self.day) {
            TaxYear(date.year())
        } else {
            TaxYear(date.year() - 1)
        }
    }
}

/// Cumulative figures carried into a pay period.
///
/// This is a read-only snapshot: the engine derives a new value for the
/// caller to persist and never mutates the one it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalances {
    /// The employee the balances belong to.
    pub employee_id: String,
    /// The tax year the balances accumulate over.
    pub tax_year: TaxYear,
    /// Taxable income so far this tax year.
    pub ytd_taxable_income: Decimal,
    /// Income tax withheld so far this tax year.
    pub ytd_tax_paid: Decimal,
    /// Tax credits already applied this tax year.
    #[serde(default)]
    pub ytd_tax_credits: Decimal,
}

impl OpeningBalances {
    /// Balances for an employee's first period in a tax year.
    pub fn zero(employee_id: impl Into<String>, tax_year: TaxYear) -> Self {
        Self {
            employee_id: employee_id.into(),
            tax_year,
            ytd_taxable_income: Decimal::ZERO,
            ytd_tax_paid: Decimal::ZERO,
            ytd_tax_credits: Decimal::ZERO,
        }
    }

    /// Returns a copy with negative figures replaced by zero.
    pub fn clamped(&self) -> Self {
        Self {
            employee_id: self.employee_id.clone(),
            tax_year: self.tax_year,
            ytd_taxable_income: self.ytd_taxable_income.max(Decimal::ZERO),
            ytd_tax_paid: self.ytd_tax_paid.max(Decimal::ZERO),
            ytd_tax_credits: self.ytd_tax_credits.max(Decimal::ZERO),
        }
    }

    /// Returns true if any figure is negative.
    pub fn has_negative_figures(&self) -> bool {
        [
            self.ytd_taxable_income,
            self.ytd_tax_paid,
            self.ytd_tax_credits,
        ]
        .iter()
        .any(|figure| *figure < Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_tax_year() {
        let start = TaxYearStart::default();
        assert_eq!(start.tax_year_of(date(2025, 1, 1)), TaxYear(2025));
        assert_eq!(start.tax_year_of(date(2025, 12, 31)), TaxYear(2025));
    }

    #[test]
    fn test_july_tax_year() {
        let start = TaxYearStart { month: 7, day: 1 };
        assert_eq!(start.tax_year_of(date(2025, 6, 30)), TaxYear(2024));
        assert_eq!(start.tax_year_of(date(2025, 7, 1)), TaxYear(2025));
    }

    #[test]
    fn test_invalid_tax_year_start() {
        assert!(!TaxYearStart { month: 13, day: 1 }.is_valid());
        assert!(!TaxYearStart { month: 2, day: 29 }.is_valid());
        assert!(TaxYearStart { month: 4, day: 6 }.is_valid());
    }

    #[test]
    fn test_clamped_replaces_negative_figures() {
        let balances = OpeningBalances {
            employee_id: "emp_001".to_string(),
            tax_year: TaxYear(2025),
            ytd_taxable_income: dec!(-50),
            ytd_tax_paid: dec!(10),
            ytd_tax_credits: dec!(-1),
        };
        assert!(balances.has_negative_figures());

        let clamped = balances.clamped();
        assert_eq!(clamped.ytd_taxable_income, Decimal::ZERO);
        assert_eq!(clamped.ytd_tax_paid, dec!(10));
        assert_eq!(clamped.ytd_tax_credits, Decimal::ZERO);
        assert!(!clamped.has_negative_figures());
    }

    #[test]
    fn test_ytd_tax_credits_defaults_to_zero() {
        let json = r#"{
            "employee_id": "emp_001",
            "tax_year": 2025,
            "ytd_taxable_income": "100",
            "ytd_tax_paid": "10"
        }"#;
        let balances: OpeningBalances = serde_json::from_str(json).unwrap();
        assert_eq!(balances.tax_year, TaxYear(2025));
        assert_eq!(balances.ytd_tax_credits, Decimal::ZERO);
    }
}
