//! Configuration types for statutory rule data.
//!
//! This module contains the flat record structures deserialized from YAML
//! rule files and their validated conversion into the tagged domain models.
//! A record that mixes fields of different calculation methods, or a relief
//! that claims to be both a deduction and a credit, is rejected here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationMethod, RateBand, ReliefEffect, ReliefFormula, ReliefRule, ReliefScheme,
    SchemeFormula, StatutoryDeductionType, TaxYearStart, ValidityWindow,
};

/// Metadata about a country's statutory rules, from `country.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryProfile {
    /// ISO country code (e.g. "KE").
    pub code: String,
    /// Human-readable country name.
    pub name: String,
    /// Currency the rule amounts are expressed in.
    #[serde(default)]
    pub currency: Option<String>,
    /// The day the tax year starts.
    #[serde(default)]
    pub tax_year_start: TaxYearStart,
}

impl CountryProfile {
    /// A profile for a country without configured rules.
    pub fn unconfigured(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            currency: None,
            tax_year_start: TaxYearStart::default(),
        }
    }
}

/// `deduction_types.yaml` file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductionTypesFile {
    /// All deduction types of the country.
    pub deduction_types: Vec<StatutoryDeductionType>,
}

/// `rate_bands.yaml` file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct RateBandsFile {
    /// All rate bands of the country.
    pub rate_bands: Vec<RateBandRecord>,
}

/// `relief_rules.yaml` file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ReliefRulesFile {
    /// All statutory relief rules of the country.
    pub relief_rules: Vec<ReliefRuleRecord>,
}

/// `relief_schemes.yaml` file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ReliefSchemesFile {
    /// All relief schemes of the country.
    pub relief_schemes: Vec<ReliefSchemeRecord>,
}

/// Calculation method named by a flat band record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodName {
    /// Percentage of gross pay.
    Percentage,
    /// Amount per unit.
    PerUnit,
    /// Fixed amount.
    Fixed,
}

fn default_active() -> bool {
    true
}

/// A rate band as stored by rule administrators, with every method's fields optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBandRecord {
    /// Unique identifier.
    pub id: String,
    /// The deduction type the band belongs to.
    pub deduction_type_id: String,
    /// Lower bound (inclusive).
    #[serde(default)]
    pub min_amount: Decimal,
    /// Upper bound (inclusive), open-ended when absent.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Which of the amount fields apply.
    pub calculation_method: MethodName,
    /// Employee rate in percent (percentage bands).
    #[serde(default)]
    pub employee_rate: Option<Decimal>,
    /// Employer rate in percent (percentage bands).
    #[serde(default)]
    pub employer_rate: Option<Decimal>,
    /// Employee amount (fixed bands).
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    /// Employer amount (fixed bands).
    #[serde(default)]
    pub employer_fixed_amount: Option<Decimal>,
    /// Employee amount per unit (per-unit bands).
    #[serde(default)]
    pub per_unit_amount: Option<Decimal>,
    /// Employer amount per unit (per-unit bands).
    #[serde(default)]
    pub employer_per_unit_amount: Option<Decimal>,
    /// Minimum age (inclusive).
    #[serde(default)]
    pub min_age: u32,
    /// Maximum age (inclusive).
    #[serde(default)]
    pub max_age: Option<u32>,
    /// When the band is in force.
    pub validity: ValidityWindow,
    /// Inactive bands are kept but never resolved.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn require(id: &str, field: &str, value: Option<Decimal>) -> EngineResult<Decimal> {
    value.ok_or_else(|| {
        EngineError::invalid_rule(id, format!("missing required field '{}'", field))
    })
}

fn reject_present(id: &str, method: &str, fields: &[(&str, Option<Decimal>)]) -> EngineResult<()> {
    match fields.iter().find(|(_, value)| value.is_some()) {
        Some((field, _)) => Err(EngineError::invalid_rule(
            id,
            format!("{} band must not set '{}'", method, field),
        )),
        None => Ok(()),
    }
}

impl TryFrom<RateBandRecord> for RateBand {
    type Error = EngineError;

    fn try_from(record: RateBandRecord) -> EngineResult<Self> {
        let id = record.id.as_str();
        let calculation = match record.calculation_method {
            MethodName::Percentage => {
                reject_present(
                    id,
                    "percentage",
                    &[
                        ("fixed_amount", record.fixed_amount),
                        ("employer_fixed_amount", record.employer_fixed_amount),
                        ("per_unit_amount", record.per_unit_amount),
                        ("employer_per_unit_amount", record.employer_per_unit_amount),
                    ],
                )?;
                CalculationMethod::Percentage {
                    employee_rate: require(id, "employee_rate", record.employee_rate)?,
                    employer_rate: record.employer_rate.unwrap_or_default(),
                }
            }
            MethodName::PerUnit => {
                reject_present(
                    id,
                    "per_unit",
                    &[
                        ("employee_rate", record.employee_rate),
                        ("employer_rate", record.employer_rate),
                        ("fixed_amount", record.fixed_amount),
                        ("employer_fixed_amount", record.employer_fixed_amount),
                    ],
                )?;
                CalculationMethod::PerUnit {
                    employee_amount: require(id, "per_unit_amount", record.per_unit_amount)?,
                    employer_amount: record.employer_per_unit_amount.unwrap_or_default(),
                }
            }
            MethodName::Fixed => {
                reject_present(
                    id,
                    "fixed",
                    &[
                        ("employee_rate", record.employee_rate),
                        ("employer_rate", record.employer_rate),
                        ("per_unit_amount", record.per_unit_amount),
                        ("employer_per_unit_amount", record.employer_per_unit_amount),
                    ],
                )?;
                CalculationMethod::Fixed {
                    employee_amount: require(id, "fixed_amount", record.fixed_amount)?,
                    employer_amount: record.employer_fixed_amount.unwrap_or_default(),
                }
            }
        };

        Ok(RateBand {
            id: record.id,
            deduction_type_id: record.deduction_type_id,
            min_amount: record.min_amount,
            max_amount: record.max_amount,
            calculation,
            min_age: record.min_age,
            max_age: record.max_age,
            validity: record.validity,
            is_active: record.is_active,
        })
    }
}

/// Converts the two boolean flags of a flat relief record into an effect.
fn effect_from_flags(
    id: &str,
    reduces_taxable_income: bool,
    is_tax_credit: bool,
) -> EngineResult<ReliefEffect> {
    match (reduces_taxable_income, is_tax_credit) {
        (true, false) => Ok(ReliefEffect::ReducesTaxableIncome),
        (false, true) => Ok(ReliefEffect::TaxCredit),
        (true, true) => Err(EngineError::invalid_rule(
            id,
            "relief cannot both reduce taxable income and be a tax credit",
        )),
        (false, false) => Err(EngineError::invalid_rule(
            id,
            "relief must either reduce taxable income or be a tax credit",
        )),
    }
}

/// Relief type named by a flat relief rule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefTypeName {
    /// Percentage of the contribution.
    Percentage,
    /// Fixed amount.
    Fixed,
}

/// A statutory relief rule as stored by rule administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefRuleRecord {
    /// Unique identifier.
    pub id: String,
    /// Code of the statutory deduction the relief derives from.
    pub source_code: String,
    /// Relief is subtracted from taxable income.
    #[serde(default)]
    pub reduces_taxable_income: bool,
    /// Relief is subtracted from computed tax.
    #[serde(default)]
    pub is_tax_credit: bool,
    /// Which of the amount fields apply.
    pub relief_type: ReliefTypeName,
    /// Percentage of the contribution (percentage reliefs).
    #[serde(default)]
    pub percentage: Option<Decimal>,
    /// Relief amount (fixed reliefs).
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    /// Cap per period.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// ISO country code.
    pub country: String,
    /// When the rule is in force.
    pub validity: ValidityWindow,
    /// Inactive rules are ignored.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl TryFrom<ReliefRuleRecord> for ReliefRule {
    type Error = EngineError;

    fn try_from(record: ReliefRuleRecord) -> EngineResult<Self> {
        let id = record.id.as_str();
        let effect = effect_from_flags(id, record.reduces_taxable_income, record.is_tax_credit)?;
        let formula = match record.relief_type {
            ReliefTypeName::Percentage => {
                reject_present(id, "percentage", &[("fixed_amount", record.fixed_amount)])?;
                ReliefFormula::Percentage {
                    rate: require(id, "percentage", record.percentage)?,
                }
            }
            ReliefTypeName::Fixed => {
                reject_present(id, "fixed", &[("percentage", record.percentage)])?;
                ReliefFormula::Fixed {
                    amount: require(id, "fixed_amount", record.fixed_amount)?,
                }
            }
        };

        Ok(ReliefRule {
            id: record.id,
            source_code: record.source_code,
            effect,
            formula,
            max_amount: record.max_amount,
            country: record.country,
            validity: record.validity,
            is_active: record.is_active,
        })
    }
}

/// Scheme calculation named by a flat scheme record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeTypeName {
    /// Percentage of gross pay.
    PercentageOfGross,
    /// Percentage of the enrollment's contribution.
    PercentageOfContribution,
    /// Fixed amount.
    Fixed,
}

/// A relief scheme as stored by rule administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliefSchemeRecord {
    /// Unique identifier.
    pub id: String,
    /// Short code.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Relief is subtracted from taxable income.
    #[serde(default)]
    pub reduces_taxable_income: bool,
    /// Relief is subtracted from computed tax.
    #[serde(default)]
    pub is_tax_credit: bool,
    /// Which of the amount fields apply.
    pub calculation_type: SchemeTypeName,
    /// Rate in percent (percentage schemes).
    #[serde(default)]
    pub rate: Option<Decimal>,
    /// Relief amount (fixed schemes).
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Cap per period.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Minimum age (inclusive).
    #[serde(default)]
    pub min_age: u32,
    /// Maximum age (inclusive).
    #[serde(default)]
    pub max_age: Option<u32>,
    /// ISO country code.
    pub country: String,
    /// When the scheme is in force.
    pub validity: ValidityWindow,
    /// Inactive schemes are ignored.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl TryFrom<ReliefSchemeRecord> for ReliefScheme {
    type Error = EngineError;

    fn try_from(record: ReliefSchemeRecord) -> EngineResult<Self> {
        let id = record.id.as_str();
        let effect = effect_from_flags(id, record.reduces_taxable_income, record.is_tax_credit)?;
        let formula = match record.calculation_type {
            SchemeTypeName::PercentageOfGross => {
                reject_present(id, "percentage_of_gross", &[("amount", record.amount)])?;
                SchemeFormula::PercentageOfGross {
                    rate: require(id, "rate", record.rate)?,
                }
            }
            SchemeTypeName::PercentageOfContribution => {
                reject_present(id, "percentage_of_contribution", &[("amount", record.amount)])?;
                SchemeFormula::PercentageOfContribution {
                    rate: require(id, "rate", record.rate)?,
                }
            }
            SchemeTypeName::Fixed => {
                reject_present(id, "fixed", &[("rate", record.rate)])?;
                SchemeFormula::Fixed {
                    amount: require(id, "amount", record.amount)?,
                }
            }
        };

        Ok(ReliefScheme {
            id: record.id,
            code: record.code,
            name: record.name,
            effect,
            formula,
            max_amount: record.max_amount,
            min_age: record.min_age,
            max_age: record.max_age,
            country: record.country,
            validity: record.validity,
            is_active: record.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn band_record(method: MethodName) -> RateBandRecord {
        RateBandRecord {
            id: "band_1".to_string(),
            deduction_type_id: "type_1".to_string(),
            min_amount: Decimal::ZERO,
            max_amount: None,
            calculation_method: method,
            employee_rate: None,
            employer_rate: None,
            fixed_amount: None,
            employer_fixed_amount: None,
            per_unit_amount: None,
            employer_per_unit_amount: None,
            min_age: 0,
            max_age: None,
            validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            is_active: true,
        }
    }

    fn relief_record(reduces: bool, credit: bool) -> ReliefRuleRecord {
        ReliefRuleRecord {
            id: "relief_1".to_string(),
            source_code: "NSSF".to_string(),
            reduces_taxable_income: reduces,
            is_tax_credit: credit,
            relief_type: ReliefTypeName::Percentage,
            percentage: Some(dec!(100)),
            fixed_amount: None,
            max_amount: None,
            country: "KE".to_string(),
            validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_record_converts() {
        let mut record = band_record(MethodName::Percentage);
        record.employee_rate = Some(dec!(3));
        let band = RateBand::try_from(record).unwrap();
        assert_eq!(
            band.calculation,
            CalculationMethod::Percentage {
                employee_rate: dec!(3),
                employer_rate: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_fixed_record_with_rate_is_rejected() {
        let mut record = band_record(MethodName::Fixed);
        record.fixed_amount = Some(dec!(300));
        record.employee_rate = Some(dec!(2.75));

        match RateBand::try_from(record) {
            Err(EngineError::InvalidRuleData { rule_id, message }) => {
                assert_eq!(rule_id, "band_1");
                assert!(message.contains("employee_rate"));
            }
            other => panic!("Expected InvalidRuleData, got {:?}", other),
        }
    }

    #[test]
    fn test_per_unit_record_requires_amount() {
        let record = band_record(MethodName::PerUnit);
        match RateBand::try_from(record) {
            Err(EngineError::InvalidRuleData { message, .. }) => {
                assert!(message.contains("per_unit_amount"));
            }
            other => panic!("Expected InvalidRuleData, got {:?}", other),
        }
    }

    #[test]
    fn test_per_unit_record_converts_employer_amount() {
        let mut record = band_record(MethodName::PerUnit);
        record.per_unit_amount = Some(dec!(5));
        record.employer_per_unit_amount = Some(dec!(7));
        let band = RateBand::try_from(record).unwrap();
        assert_eq!(
            band.calculation,
            CalculationMethod::PerUnit {
                employee_amount: dec!(5),
                employer_amount: dec!(7),
            }
        );
    }

    #[test]
    fn test_relief_with_both_flags_is_rejected() {
        let result = ReliefRule::try_from(relief_record(true, true));
        assert!(matches!(result, Err(EngineError::InvalidRuleData { .. })));
    }

    #[test]
    fn test_relief_with_no_flags_is_rejected() {
        let result = ReliefRule::try_from(relief_record(false, false));
        assert!(matches!(result, Err(EngineError::InvalidRuleData { .. })));
    }

    #[test]
    fn test_relief_flags_map_to_effect() {
        let reducing = ReliefRule::try_from(relief_record(true, false)).unwrap();
        assert_eq!(reducing.effect, ReliefEffect::ReducesTaxableIncome);

        let credit = ReliefRule::try_from(relief_record(false, true)).unwrap();
        assert_eq!(credit.effect, ReliefEffect::TaxCredit);
    }

    #[test]
    fn test_fixed_scheme_with_rate_is_rejected() {
        let record = ReliefSchemeRecord {
            id: "scheme_1".to_string(),
            code: "PR".to_string(),
            name: "Personal relief".to_string(),
            reduces_taxable_income: false,
            is_tax_credit: true,
            calculation_type: SchemeTypeName::Fixed,
            rate: Some(dec!(10)),
            amount: Some(dec!(2400)),
            max_amount: None,
            min_age: 0,
            max_age: None,
            country: "KE".to_string(),
            validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            is_active: true,
        };
        assert!(matches!(
            ReliefScheme::try_from(record),
            Err(EngineError::InvalidRuleData { .. })
        ));
    }

    #[test]
    fn test_deserialize_band_record_from_yaml() {
        let yaml = r#"
id: ke_shif_minimum
deduction_type_id: ke_shif
min_amount: "0"
max_amount: "10909.09"
calculation_method: fixed
fixed_amount: "300"
validity:
  from: "2024-10-01"
"#;
        let record: RateBandRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.calculation_method, MethodName::Fixed);
        assert_eq!(record.max_amount, Some(dec!(10909.09)));
        assert!(record.is_active);
    }
}
