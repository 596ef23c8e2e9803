//! Relief rules, relief schemes and employee enrollments.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ValidityWindow;

/// What a relief does to the tax computation.
///
/// A relief is exactly one of the two; there is no state in which it both
/// reduces taxable income and counts as a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefEffect {
    /// Subtracted from gross pay before tax is computed.
    ReducesTaxableIncome,
    /// Subtracted from computed tax.
    TaxCredit,
}

/// Formula of a relief derived from a statutory contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum ReliefFormula {
    /// A percentage of the contribution's employee amount.
    Percentage {
        /// Rate in percent.
        rate: Decimal,
    },
    /// A fixed amount whenever the contribution is present.
    Fixed {
        /// The relief amount.
        amount: Decimal,
    },
}

/// Formula of a relief scheme an employee can enroll in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum SchemeFormula {
    /// A percentage of the period's gross pay.
    PercentageOfGross {
        /// Rate in percent.
        rate: Decimal,
    },
    /// A percentage of the enrollment's contribution amount.
    PercentageOfContribution {
        /// Rate in percent.
        rate: Decimal,
    },
    /// A fixed amount per period.
    Fixed {
        /// The relief amount.
        amount: Decimal,
    },
}

/// Ties a statutory contribution (by deduction code) to a relief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefRule {
    /// Unique identifier.
    pub id: String,
    /// Code of the statutory deduction the relief derives from.
    pub source_code: String,
    /// Whether the relief reduces taxable income or is a credit.
    pub effect: ReliefEffect,
    /// How the relief amount is computed.
    pub formula: ReliefFormula,
    /// Upper limit for the relief per period.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// ISO country code.
    pub country: String,
    /// When the rule is in force.
    pub validity: ValidityWindow,
    /// Inactive rules are ignored.
    pub is_active: bool,
}

/// A relief scheme (personal relief, insurance relief, pension, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefScheme {
    /// Unique identifier referenced by enrollments.
    pub id: String,
    /// Short code reported as the relief's source.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the relief reduces taxable income or is a credit.
    pub effect: ReliefEffect,
    /// How the relief amount is computed.
    pub formula: SchemeFormula,
    /// Upper limit for the relief per period.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Minimum employee age (inclusive).
    #[serde(default)]
    pub min_age: u32,
    /// Maximum employee age (inclusive), if restricted.
    #[serde(default)]
    pub max_age: Option<u32>,
    /// ISO country code.
    pub country: String,
    /// When the scheme is in force.
    pub validity: ValidityWindow,
    /// Inactive schemes are ignored.
    pub is_active: bool,
}

impl ReliefScheme {
    /// Returns true if the scheme's age restriction admits `age`.
    pub fn admits_age(&self, age: u32) -> bool {
        self.min_age <= age && self.max_age.is_none_or(|max| age <= max)
    }
}

fn default_active() -> bool {
    true
}

/// Links an employee to a relief scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeReliefEnrollment {
    /// Unique identifier.
    pub id: String,
    /// The enrolled employee.
    pub employee_id: String,
    /// The scheme enrolled in.
    pub scheme_id: String,
    /// Enrollment-specific contribution (e.g. a monthly premium).
    #[serde(default)]
    pub contribution_amount: Option<Decimal>,
    /// First day of the enrollment.
    pub start_date: NaiveDate,
    /// Last day of the enrollment, if ended.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Suspended enrollments are ignored.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl EmployeeReliefEnrollment {
    /// Returns true if the enrollment applies on `date`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
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
    fn test_enrollment_effective_within_dates() {
        let enrollment = EmployeeReliefEnrollment {
            id: "enr_1".to_string(),
            employee_id: "emp_001".to_string(),
            scheme_id: "ke_insurance_relief".to_string(),
            contribution_amount: Some(dec!(3000)),
            start_date: date(2025, 1, 1),
            end_date: Some(date(2025, 6, 30)),
            is_active: true,
        };
        assert!(enrollment.is_effective_on(date(2025, 1, 1)));
        assert!(enrollment.is_effective_on(date(2025, 6, 30)));
        assert!(!enrollment.is_effective_on(date(2024, 12, 31)));
        assert!(!enrollment.is_effective_on(date(2025, 7, 1)));
    }

    #[test]
    fn test_suspended_enrollment_is_never_effective() {
        let enrollment = EmployeeReliefEnrollment {
            id: "enr_1".to_string(),
            employee_id: "emp_001".to_string(),
            scheme_id: "ke_personal_relief".to_string(),
            contribution_amount: None,
            start_date: date(2025, 1, 1),
            end_date: None,
            is_active: false,
        };
        assert!(!enrollment.is_effective_on(date(2025, 3, 1)));
    }

    #[test]
    fn test_enrollment_defaults_to_active() {
        let json = r#"{
            "id": "enr_1",
            "employee_id": "emp_001",
            "scheme_id": "ke_personal_relief",
            "start_date": "2025-01-01"
        }"#;
        let enrollment: EmployeeReliefEnrollment = serde_json::from_str(json).unwrap();
        assert!(enrollment.is_active);
        assert_eq!(enrollment.contribution_amount, None);
    }

    #[test]
    fn test_scheme_formula_is_tagged() {
        let json = r#"{ "formula": "percentage_of_contribution", "rate": "15" }"#;
        let formula: SchemeFormula = serde_json::from_str(json).unwrap();
        assert_eq!(
            formula,
            SchemeFormula::PercentageOfContribution { rate: dec!(15) }
        );
    }

    #[test]
    fn test_relief_effect_serialization() {
        assert_eq!(
            serde_json::to_string(&ReliefEffect::ReducesTaxableIncome).unwrap(),
            "\"reduces_taxable_income\""
        );
        assert_eq!(
            serde_json::to_string(&ReliefEffect::TaxCredit).unwrap(),
            "\"tax_credit\""
        );
    }
}
