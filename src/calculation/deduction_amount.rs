//! Non-income-tax deduction amounts.
//!
//! Contributions and levies are computed against raw gross pay from the single
//! band their type resolves to, without any year-to-date state.

use rust_decimal::Decimal;

use crate::models::{
    AppliedMethod, AuditStep, AuditWarning, CalculatedStatutory, CalculationMethod, RateBand,
    StatutoryDeductionType,
};

use super::band_resolver::resolve_band;
use super::money::{finalize, percent_of};

/// Employee and employer amounts of one band, rounded and clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandAmounts {
    /// Amount withheld from the employee.
    pub employee: Decimal,
    /// Amount contributed by the employer.
    pub employer: Decimal,
}

impl BandAmounts {
    /// Applies a calculation method.
    ///
    /// - percentage: `gross_pay * rate / 100`
    /// - per unit: `amount * period_unit_count`
    /// - fixed: the amount itself, regardless of gross pay
    pub fn from_method(
        method: &CalculationMethod,
        gross_pay: Decimal,
        period_unit_count: u32,
    ) -> Self {
        let units = Decimal::from(period_unit_count);
        let (employee, employer) = match *method {
            CalculationMethod::Percentage {
                employee_rate,
                employer_rate,
            } => (
                percent_of(gross_pay, employee_rate),
                percent_of(gross_pay, employer_rate),
            ),
            CalculationMethod::PerUnit {
                employee_amount,
                employer_amount,
            } => (
                employee_amount * units,
                employer_amount * units,
            ),
            CalculationMethod::Fixed {
                employee_amount,
                employer_amount,
            } => (employee_amount, employer_amount),
        };

        Self {
            employee: finalize(employee),
            employer: finalize(employer),
        }
    }
}

/// The result of computing one non-income-tax deduction.
#[derive(Debug, Clone)]
pub struct DeductionResult {
    /// The deduction line, or `None` if no band matched.
    pub line: Option<CalculatedStatutory>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
    /// Data-quality warning raised while resolving the band.
    pub warning: Option<AuditWarning>,
}

/// Computes the deduction of a contribution, levy or other non-tax type.
///
/// A type with no matching band yields no line; that is not an error.
pub fn calculate_deduction(
    deduction_type: &StatutoryDeductionType,
    bands: &[RateBand],
    gross_pay: Decimal,
    period_unit_count: u32,
    employee_age: Option<u32>,
    step_number: u32,
) -> DeductionResult {
    let resolution = resolve_band(bands, &deduction_type.id, gross_pay, employee_age);
    let input = serde_json::json!({
        "deduction_type_id": deduction_type.id,
        "gross_pay": gross_pay.to_string(),
        "period_unit_count": period_unit_count,
        "employee_age": employee_age,
    });

    let Some(band) = resolution.band else {
        return DeductionResult {
            line: None,
            audit_step: AuditStep {
                step_number,
                rule_id: format!("{}_deduction", deduction_type.id),
                rule_name: deduction_type.name.clone(),
                reference: deduction_type.code.clone(),
                input,
                output: serde_json::json!({ "band_id": null, "skipped": true }),
                reasoning: format!(
                    "No active {} band matches gross pay {}; deduction skipped",
                    deduction_type.code, gross_pay
                ),
            },
            warning: None,
        };
    };

    let amounts = BandAmounts::from_method(&band.calculation, gross_pay, period_unit_count);
    let reasoning = match band.calculation {
        CalculationMethod::Percentage {
            employee_rate,
            employer_rate,
        } => format!(
            "{} x {}% = {} (employer {}% = {})",
            gross_pay.normalize(),
            employee_rate.normalize(),
            amounts.employee,
            employer_rate.normalize(),
            amounts.employer
        ),
        CalculationMethod::PerUnit {
            employee_amount, ..
        } => format!(
            "{} units x {} = {}",
            period_unit_count,
            employee_amount.normalize(),
            amounts.employee
        ),
        CalculationMethod::Fixed { .. } => format!(
            "Fixed amount {} (employer {})",
            amounts.employee, amounts.employer
        ),
    };

    let line = CalculatedStatutory {
        code: deduction_type.code.clone(),
        name: deduction_type.name.clone(),
        kind: deduction_type.kind,
        employee_amount: amounts.employee,
        employer_amount: amounts.employer,
        calculation_method: AppliedMethod::from(&band.calculation),
        band_id: Some(band.id.clone()),
        ytd_taxable_income: None,
        ytd_tax_paid: None,
        tax_relief_amount: None,
    };

    DeductionResult {
        audit_step: AuditStep {
            step_number,
            rule_id: format!("{}_deduction", deduction_type.id),
            rule_name: deduction_type.name.clone(),
            reference: deduction_type.code.clone(),
            input,
            output: serde_json::json!({
                "band_id": band.id,
                "method": band.calculation.name(),
                "employee_amount": amounts.employee.to_string(),
                "employer_amount": amounts.employer.to_string(),
            }),
            reasoning,
        },
        line: Some(line),
        warning: resolution.warning,
    }
}
