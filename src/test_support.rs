//! Record builders shared by unit tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{CountryProfile, RuleSet, RuleSource};
use crate::models::{
    CalculationMethod, DeductionKind, EmployeeReliefEnrollment, RateBand, ReliefEffect,
    ReliefFormula, ReliefRule, ReliefScheme, SchemeFormula, StatutoryDeductionType, TaxYearStart,
    ValidityWindow,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn since_2024() -> ValidityWindow {
    ValidityWindow::open_from(date(2024, 1, 1))
}

pub fn deduction_type(id: &str, code: &str, kind: DeductionKind) -> StatutoryDeductionType {
    StatutoryDeductionType {
        id: id.to_string(),
        code: code.to_string(),
        name: format!("{} deduction", code),
        kind,
        country: "KE".to_string(),
        validity: since_2024(),
    }
}

fn band(
    id: &str,
    type_id: &str,
    min: Decimal,
    max: Option<Decimal>,
    calculation: CalculationMethod,
) -> RateBand {
    RateBand {
        id: id.to_string(),
        deduction_type_id: type_id.to_string(),
        min_amount: min,
        max_amount: max,
        calculation,
        min_age: 0,
        max_age: None,
        validity: since_2024(),
        is_active: true,
    }
}

pub fn percentage_band(
    id: &str,
    type_id: &str,
    min: Decimal,
    max: Option<Decimal>,
    employee_rate: Decimal,
) -> RateBand {
    band(
        id,
        type_id,
        min,
        max,
        CalculationMethod::Percentage {
            employee_rate,
            employer_rate: Decimal::ZERO,
        },
    )
}

pub fn fixed_band(
    id: &str,
    type_id: &str,
    min: Decimal,
    max: Option<Decimal>,
    amount: Decimal,
) -> RateBand {
    band(
        id,
        type_id,
        min,
        max,
        CalculationMethod::Fixed {
            employee_amount: amount,
            employer_amount: Decimal::ZERO,
        },
    )
}

pub fn per_unit_band(id: &str, type_id: &str, amount: Decimal) -> RateBand {
    band(
        id,
        type_id,
        Decimal::ZERO,
        None,
        CalculationMethod::PerUnit {
            employee_amount: amount,
            employer_amount: Decimal::ZERO,
        },
    )
}

pub fn relief_rule(
    id: &str,
    source_code: &str,
    effect: ReliefEffect,
    formula: ReliefFormula,
) -> ReliefRule {
    ReliefRule {
        id: id.to_string(),
        source_code: source_code.to_string(),
        effect,
        formula,
        max_amount: None,
        country: "KE".to_string(),
        validity: since_2024(),
        is_active: true,
    }
}

pub fn scheme(id: &str, code: &str, effect: ReliefEffect, formula: SchemeFormula) -> ReliefScheme {
    ReliefScheme {
        id: id.to_string(),
        code: code.to_string(),
        name: format!("{} scheme", code),
        effect,
        formula,
        max_amount: None,
        min_age: 0,
        max_age: None,
        country: "KE".to_string(),
        validity: since_2024(),
        is_active: true,
    }
}

pub fn enrollment(
    id: &str,
    employee_id: &str,
    scheme_id: &str,
    contribution_amount: Option<Decimal>,
) -> EmployeeReliefEnrollment {
    EmployeeReliefEnrollment {
        id: id.to_string(),
        employee_id: employee_id.to_string(),
        scheme_id: scheme_id.to_string(),
        contribution_amount,
        start_date: date(2024, 1, 1),
        end_date: None,
        is_active: true,
    }
}

pub fn source(
    deduction_types: Vec<StatutoryDeductionType>,
    rate_bands: Vec<RateBand>,
    relief_rules: Vec<ReliefRule>,
    relief_schemes: Vec<ReliefScheme>,
) -> RuleSource {
    RuleSource {
        country: CountryProfile {
            code: "KE".to_string(),
            name: "Kenya".to_string(),
            currency: Some("KES".to_string()),
            tax_year_start: TaxYearStart::default(),
        },
        deduction_types,
        rate_bands,
        relief_rules,
        relief_schemes,
    }
}

/// Resolves a source for 31 January 2025.
pub fn rule_set(
    deduction_types: Vec<StatutoryDeductionType>,
    rate_bands: Vec<RateBand>,
    relief_rules: Vec<ReliefRule>,
    relief_schemes: Vec<ReliefScheme>,
) -> RuleSet {
    RuleSet::resolve(
        &source(deduction_types, rate_bands, relief_rules, relief_schemes),
        date(2025, 1, 31),
    )
    .unwrap()
}

/// 0% up to 50, 20% above.
pub fn two_band_tax_schedule(type_id: &str) -> Vec<RateBand> {
    vec![
        percentage_band(
            "tax_1",
            type_id,
            Decimal::ZERO,
            Some(Decimal::from(50)),
            Decimal::ZERO,
        ),
        percentage_band("tax_2", type_id, Decimal::from(50), None, Decimal::from(20)),
    ]
}
