//! Rate bands and their calculation methods.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ValidityWindow;

/// How a band turns gross pay into a deduction.
///
/// Each variant carries only the fields it needs, so a band can never hold
/// e.g. a fixed amount alongside a rate. Rates are percentages (`3` = 3%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalculationMethod {
    /// A percentage of gross pay.
    Percentage {
        /// Employee rate in percent.
        employee_rate: Decimal,
        /// Employer rate in percent.
        #[serde(default)]
        employer_rate: Decimal,
    },
    /// A fixed amount per unit (e.g. per week in the period).
    PerUnit {
        /// Employee amount per unit.
        employee_amount: Decimal,
        /// Employer amount per unit.
        #[serde(default)]
        employer_amount: Decimal,
    },
    /// A fixed amount per period.
    Fixed {
        /// Employee amount.
        employee_amount: Decimal,
        /// Employer amount.
        #[serde(default)]
        employer_amount: Decimal,
    },
}

impl CalculationMethod {
    /// The employee rate, if this is a percentage method.
    pub fn employee_rate(&self) -> Option<Decimal> {
        match self {
            CalculationMethod::Percentage { employee_rate, .. } => Some(*employee_rate),
            _ => None,
        }
    }

    /// The snake_case name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            CalculationMethod::Percentage { .. } => "percentage",
            CalculationMethod::PerUnit { .. } => "per_unit",
            CalculationMethod::Fixed { .. } => "fixed",
        }
    }
}

fn default_active() -> bool {
    true
}

/// An income range of a deduction type with its calculation method.
///
/// For income-tax types the bands of a type form an ascending progressive
/// schedule; for all other kinds at most one band matches a given gross pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBand {
    /// Unique identifier.
    pub id: String,
    /// The deduction type this band belongs to.
    pub deduction_type_id: String,
    /// Lower bound of the band (inclusive).
    pub min_amount: Decimal,
    /// Upper bound of the band (inclusive); `None` is open-ended.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// How the deduction is computed within this band.
    pub calculation: CalculationMethod,
    /// Minimum employee age (inclusive).
    #[serde(default)]
    pub min_age: u32,
    /// Maximum employee age (inclusive), if restricted.
    #[serde(default)]
    pub max_age: Option<u32>,
    /// When the band is in force.
    pub validity: ValidityWindow,
    /// Inactive bands are ignored by the resolver.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl RateBand {
    /// Returns true if `amount` lies within `[min_amount, max_amount]`.
    pub fn contains_amount(&self, amount: Decimal) -> bool {
        self.min_amount <= amount && self.max_amount.is_none_or(|max| amount <= max)
    }

    /// Returns true if the band's age restriction admits `age`.
    pub fn admits_age(&self, age: u32) -> bool {
        self.min_age <= age && self.max_age.is_none_or(|max| age <= max)
    }

    /// Returns true if some amount falls within both bands.
    ///
    /// Both endpoints are inclusive, so bands sharing a boundary value overlap.
    pub fn amount_range_overlaps(&self, other: &RateBand) -> bool {
        let self_below_other_max = other.max_amount.is_none_or(|max| self.min_amount <= max);
        let other_below_self_max = self.max_amount.is_none_or(|max| other.min_amount <= max);
        self_below_other_max && other_below_self_max
    }

    /// Returns true if the age ranges of two bands intersect.
    pub fn age_range_overlaps(&self, other: &RateBand) -> bool {
        let self_below_other_max = other.max_age.is_none_or(|max| self.min_age <= max);
        let other_below_self_max = self.max_age.is_none_or(|max| other.min_age <= max);
        self_below_other_max && other_below_self_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn band(min: Decimal, max: Option<Decimal>) -> RateBand {
        RateBand {
            id: "band".to_string(),
            deduction_type_id: "type".to_string(),
            min_amount: min,
            max_amount: max,
            calculation: CalculationMethod::Percentage {
                employee_rate: dec!(3),
                employer_rate: dec!(0),
            },
            min_age: 0,
            max_age: None,
            validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            is_active: true,
        }
    }

    #[test]
    fn test_contains_amount_is_inclusive() {
        let band = band(dec!(100), Some(dec!(200)));
        assert!(band.contains_amount(dec!(100)));
        assert!(band.contains_amount(dec!(200)));
        assert!(!band.contains_amount(dec!(99.99)));
        assert!(!band.contains_amount(dec!(200.01)));
    }

    #[test]
    fn test_open_band_contains_any_larger_amount() {
        let band = band(dec!(100), None);
        assert!(band.contains_amount(dec!(1000000)));
    }

    #[test]
    fn test_admits_age_respects_both_limits() {
        let mut band = band(dec!(0), None);
        band.min_age = 18;
        band.max_age = Some(64);
        assert!(!band.admits_age(17));
        assert!(band.admits_age(18));
        assert!(band.admits_age(64));
        assert!(!band.admits_age(65));
    }

    #[test]
    fn test_bands_sharing_a_boundary_overlap() {
        // 1000 is contained by both
        let lower = band(dec!(0), Some(dec!(1000)));
        let upper = band(dec!(1000), None);
        assert!(lower.contains_amount(dec!(1000)) && upper.contains_amount(dec!(1000)));
        assert!(lower.amount_range_overlaps(&upper));
        assert!(upper.amount_range_overlaps(&lower));
    }

    #[test]
    fn test_bands_split_by_a_cent_do_not_overlap() {
        let lower = band(dec!(0), Some(dec!(999.99)));
        let upper = band(dec!(1000), None);
        assert!(!lower.amount_range_overlaps(&upper));
        assert!(!upper.amount_range_overlaps(&lower));
    }

    #[test]
    fn test_nested_bands_overlap() {
        let wide = band(dec!(0), None);
        let narrow = band(dec!(500), Some(dec!(600)));
        assert!(wide.amount_range_overlaps(&narrow));
        assert!(narrow.amount_range_overlaps(&wide));
    }

    #[test]
    fn test_disjoint_age_ranges_do_not_overlap() {
        let mut young = band(dec!(0), None);
        young.max_age = Some(59);
        let mut senior = band(dec!(0), None);
        senior.min_age = 60;
        assert!(!young.age_range_overlaps(&senior));
        assert!(!senior.age_range_overlaps(&young));
    }

    #[test]
    fn test_calculation_method_is_tagged() {
        let json = r#"{ "method": "per_unit", "employee_amount": "5" }"#;
        let method: CalculationMethod = serde_json::from_str(json).unwrap();
        assert_eq!(
            method,
            CalculationMethod::PerUnit {
                employee_amount: dec!(5),
                employer_amount: dec!(0),
            }
        );
        assert_eq!(method.name(), "per_unit");
        assert_eq!(method.employee_rate(), None);
    }
}
