//! Rate band resolution.
//!
//! Selects the single band of a deduction type that applies to a gross pay
//! amount and, optionally, an employee's age.

use rust_decimal::Decimal;

use crate::models::{AuditWarning, RateBand};

/// Warning code emitted when more than one band matches.
pub const AMBIGUOUS_BAND_WARNING: &str = "AMBIGUOUS_RATE_BAND";

/// The outcome of resolving a band.
#[derive(Debug, Clone)]
pub struct BandResolution<'a> {
    /// The applicable band, if any matched.
    pub band: Option<&'a RateBand>,
    /// Number of bands that matched before disambiguation.
    pub match_count: usize,
    /// Set when several bands matched and one had to be chosen.
    pub warning: Option<AuditWarning>,
}

/// Resolves the band of `deduction_type_id` that applies to `gross_pay`.
///
/// Candidates are the active bands of the type whose amount range contains
/// `gross_pay` (both ends inclusive, `max_amount` of `None` is open-ended).
/// When `employee_age` is given, bands whose age range excludes it are
/// dropped; without an age no age filtering happens.
///
/// If several bands still match, the one with the lowest `min_amount` wins
/// (the first in slice order on ties) and a data-quality warning is returned.
/// Amounts are never merged or averaged across bands.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::resolve_band;
/// use statutory_engine::models::{CalculationMethod, RateBand, ValidityWindow};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let band = RateBand {
///     id: "nssf_tier".to_string(),
///     deduction_type_id: "nssf".to_string(),
///     min_amount: Decimal::ZERO,
///     max_amount: None,
///     calculation: CalculationMethod::Percentage {
///         employee_rate: Decimal::from(6),
///         employer_rate: Decimal::from(6),
///     },
///     min_age: 0,
///     max_age: None,
///     validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
///     is_active: true,
/// };
///
/// let bands = [band];
/// let resolution = resolve_band(&bands, "nssf", Decimal::from(50000), Some(30));
/// assert_eq!(resolution.band.map(|b| b.id.as_str()), Some("nssf_tier"));
/// assert!(resolution.warning.is_none());
/// ```
pub fn resolve_band<'a>(
    bands: &'a [RateBand],
    deduction_type_id: &str,
    gross_pay: Decimal,
    employee_age: Option<u32>,
) -> BandResolution<'a> {
    let candidates: Vec<&RateBand> = bands
        .iter()
        .filter(|band| band.deduction_type_id == deduction_type_id && band.is_active)
        .filter(|band| band.contains_amount(gross_pay))
        .filter(|band| employee_age.is_none_or(|age| band.admits_age(age)))
        .collect();

    let band = candidates.iter().copied().min_by_key(|band| band.min_amount);

    let warning = match (band, candidates.len()) {
        (Some(chosen), count) if count > 1 => {
            let ids: Vec<&str> = candidates.iter().map(|b| b.id.as_str()).collect();
            Some(AuditWarning::new(
                AMBIGUOUS_BAND_WARNING,
                format!(
                    "{} bands of '{}' match gross pay {} ({}); using '{}'",
                    count,
                    deduction_type_id,
                    gross_pay,
                    ids.join(", "),
                    chosen.id
                ),
                "warning",
            ))
        }
        _ => None,
    };

    BandResolution {
        band,
        match_count: candidates.len(),
        warning,
    }
}

/// Returns the active bands of a type in ascending `min_amount` order.
pub fn schedule_for<'a>(bands: &'a [RateBand], deduction_type_id: &str) -> Vec<&'a RateBand> {
    let mut schedule: Vec<&RateBand> = bands
        .iter()
        .filter(|band| band.deduction_type_id == deduction_type_id && band.is_active)
        .collect();
    schedule.sort_by_key(|band| band.min_amount);
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use rust_decimal_macros::dec;

    fn shif_bands() -> Vec<RateBand> {
        vec![
            fixed_band("shif_min", "shif", dec!(0), Some(dec!(10909.09)), dec!(300)),
            percentage_band("shif_pct", "shif", dec!(10909.10), None, dec!(2.75)),
        ]
    }

    #[test]
    fn test_resolves_band_containing_gross_pay() {
        let bands = shif_bands();
        assert_eq!(
            resolve_band(&bands, "shif", dec!(8000), None).band.unwrap().id,
            "shif_min"
        );
        assert_eq!(
            resolve_band(&bands, "shif", dec!(100000), None).band.unwrap().id,
            "shif_pct"
        );
    }

    #[test]
    fn test_band_bounds_are_inclusive() {
        let bands = shif_bands();
        assert_eq!(
            resolve_band(&bands, "shif", dec!(10909.09), None).band.unwrap().id,
            "shif_min"
        );
        assert_eq!(
            resolve_band(&bands, "shif", dec!(10909.10), None).band.unwrap().id,
            "shif_pct"
        );
    }

    #[test]
    fn test_gap_between_bands_resolves_to_none() {
        let bands = shif_bands();
        let resolution = resolve_band(&bands, "shif", dec!(10909.095), None);
        assert!(resolution.band.is_none());
        assert_eq!(resolution.match_count, 0);
        assert!(resolution.warning.is_none());
    }

    #[test]
    fn test_other_types_and_inactive_bands_are_ignored() {
        let mut bands = shif_bands();
        bands[0].is_active = false;
        bands.push(fixed_band("other", "nhif", dec!(0), None, dec!(150)));

        assert!(resolve_band(&bands, "shif", dec!(8000), None).band.is_none());
    }

    #[test]
    fn test_age_filters_bands() {
        let mut young = percentage_band("young", "ssf", dec!(0), None, dec!(6));
        young.max_age = Some(59);
        let mut senior = percentage_band("senior", "ssf", dec!(0), None, dec!(3));
        senior.min_age = 60;
        let bands = vec![young, senior];

        assert_eq!(
            resolve_band(&bands, "ssf", dec!(1000), Some(30)).band.unwrap().id,
            "young"
        );
        assert_eq!(
            resolve_band(&bands, "ssf", dec!(1000), Some(65)).band.unwrap().id,
            "senior"
        );
    }

    #[test]
    fn test_multiple_matches_pick_lowest_min_amount_and_warn() {
        let bands = vec![
            percentage_band("upper", "ssf", dec!(500), None, dec!(5)),
            percentage_band("lower", "ssf", dec!(0), None, dec!(3)),
        ];

        let resolution = resolve_band(&bands, "ssf", dec!(1000), None);
        assert_eq!(resolution.band.unwrap().id, "lower");
        assert_eq!(resolution.match_count, 2);

        let warning = resolution.warning.unwrap();
        assert_eq!(warning.code, AMBIGUOUS_BAND_WARNING);
        assert!(warning.message.contains("'lower'"));
    }

    #[test]
    fn test_ties_pick_first_band_in_order() {
        let bands = vec![
            percentage_band("first", "ssf", dec!(0), None, dec!(3)),
            percentage_band("second", "ssf", dec!(0), None, dec!(5)),
        ];
        let resolution = resolve_band(&bands, "ssf", dec!(1000), None);
        assert_eq!(resolution.band.unwrap().id, "first");
        assert!(resolution.warning.is_some());
    }

    #[test]
    fn test_missing_age_matches_every_age_partition() {
        let mut young = percentage_band("young", "ssf", dec!(0), None, dec!(6));
        young.max_age = Some(59);
        let mut senior = percentage_band("senior", "ssf", dec!(0), None, dec!(3));
        senior.min_age = 60;
        let bands = vec![senior, young];

        let resolution = resolve_band(&bands, "ssf", dec!(1000), None);
        assert_eq!(resolution.band.unwrap().id, "senior");
        assert!(resolution.warning.is_some());
    }

    #[test]
    fn test_schedule_for_sorts_by_min_amount() {
        let mut bands = two_band_tax_schedule("tax");
        bands.reverse();
        bands.push(percentage_band("ssf", "ssf", dec!(0), None, dec!(3)));

        let ids: Vec<&str> = schedule_for(&bands, "tax").iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["tax_1", "tax_2"]);
    }
}
