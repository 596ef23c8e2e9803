//! The deduction pipeline.
//!
//! [`calculate`] runs one employee's period through a fixed sequence:
//!
//! 1. every non-income-tax deduction against raw gross pay
//! 2. reliefs from those deductions and from enrolled schemes
//! 3. adjusted taxable income (gross pay less reducing reliefs, at least zero)
//! 4. cumulative income tax on the year to date, less tax credits
//! 5. totals and the closing balances for the next period
//!
//! The function is pure: year-to-date state comes in as [`OpeningBalances`]
//! and the updated balances go out in the result.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{RuleSet, normalize_country_code};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AppliedMethod, AuditStep, AuditTrace, AuditWarning, CalculatedStatutory,
    EmployeeReliefEnrollment, OpeningBalances, StatutoryCalculationResult, TaxYear,
};

use super::band_resolver::schedule_for;
use super::cumulative_tax::period_tax;
use super::deduction_amount::calculate_deduction;
use super::money::non_negative;
use super::relief_aggregator::{ReliefContext, compute_reliefs};

/// Warning code for opening balances of another tax year.
pub const STALE_BALANCES_WARNING: &str = "STALE_OPENING_BALANCES";
/// Warning code for opening balances with negative figures.
pub const NEGATIVE_BALANCES_WARNING: &str = "NEGATIVE_OPENING_BALANCES";

/// Everything the engine needs to know about one employee's period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationInput {
    /// The employee being calculated.
    pub employee_id: String,
    /// Country whose rules apply.
    pub country_code: String,
    /// Gross pay of the period.
    pub gross_pay: Decimal,
    /// Units worked in the period, used by per-unit bands.
    pub period_unit_count: u32,
    /// Age in years. `None` disables all age filtering.
    pub employee_age: Option<u32>,
    /// Year-to-date figures before this period. `None` starts from zero.
    pub opening_balances: Option<OpeningBalances>,
    /// The date the period is calculated for.
    pub effective_date: NaiveDate,
    /// The employee's relief scheme enrollments.
    pub enrollments: Vec<EmployeeReliefEnrollment>,
}

impl CalculationInput {
    /// Creates an input with one period unit, no age, balances or enrollments.
    pub fn new(
        employee_id: impl Into<String>,
        country_code: impl Into<String>,
        gross_pay: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            country_code: country_code.into(),
            gross_pay,
            period_unit_count: 1,
            employee_age: None,
            opening_balances: None,
            effective_date,
            enrollments: Vec::new(),
        }
    }

    fn validate(&self, rules: &RuleSet) -> EngineResult<()> {
        if self.employee_id.trim().is_empty() {
            return Err(EngineError::invalid_input("employee_id", "must not be empty"));
        }
        if self.gross_pay < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "gross_pay",
                format!("must not be negative (got {})", self.gross_pay),
            ));
        }
        if normalize_country_code(&self.country_code) != normalize_country_code(&rules.country().code)
        {
            return Err(EngineError::invalid_input(
                "country_code",
                format!(
                    "'{}' does not match the rules of '{}'",
                    self.country_code,
                    rules.country().code
                ),
            ));
        }
        if self.effective_date != rules.effective_date() {
            return Err(EngineError::invalid_input(
                "effective_date",
                format!(
                    "{} does not match the rules resolved for {}",
                    self.effective_date,
                    rules.effective_date()
                ),
            ));
        }
        if let Some(balances) = &self.opening_balances {
            if balances.employee_id != self.employee_id {
                return Err(EngineError::invalid_input(
                    "opening_balances.employee_id",
                    format!(
                        "balances of '{}' supplied for '{}'",
                        balances.employee_id, self.employee_id
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Selects the balances to reconcile against.
///
/// Balances of another tax year are replaced by zero; negative figures are
/// clamped. Both cases are reported as warnings.
fn opening_balances_for(
    input: &CalculationInput,
    tax_year: TaxYear,
    warnings: &mut Vec<AuditWarning>,
) -> OpeningBalances {
    let Some(balances) = &input.opening_balances else {
        return OpeningBalances::zero(input.employee_id.as_str(), tax_year);
    };

    if balances.tax_year != tax_year {
        warnings.push(AuditWarning::new(
            STALE_BALANCES_WARNING,
            format!(
                "Opening balances are for tax year {}, the period falls in {}; starting from zero",
                balances.tax_year, tax_year
            ),
            "info",
        ));
        return OpeningBalances::zero(input.employee_id.as_str(), tax_year);
    }

    if balances.has_negative_figures() {
        warnings.push(AuditWarning::new(
            NEGATIVE_BALANCES_WARNING,
            "Opening balances contain negative figures; treated as zero",
            "warning",
        ));
        return balances.clamped();
    }

    balances.clone()
}

/// Calculates every statutory deduction and relief of one employee's period.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] if the gross pay is
/// negative, the employee id is empty, the input's country or date do not
/// match `rules`, or the opening balances belong to another employee.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::{CalculationInput, calculate};
/// use statutory_engine::config::RuleSet;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let rules = RuleSet::empty("ZZ", date);
/// let input = CalculationInput::new("emp_001", "ZZ", Decimal::from(1000), date);
///
/// let result = calculate(&input, &rules).unwrap();
/// assert!(result.statutory.is_empty());
/// assert_eq!(result.total_employee_deductions, Decimal::ZERO);
/// ```
pub fn calculate(
    input: &CalculationInput,
    rules: &RuleSet,
) -> EngineResult<StatutoryCalculationResult> {
    input.validate(rules)?;

    let tax_year = rules.tax_year();
    let mut steps: Vec<AuditStep> = Vec::new();
    let mut warnings: Vec<AuditWarning> = Vec::new();
    let mut step_number: u32 = 1;

    let opening = opening_balances_for(input, tax_year, &mut warnings);

    // Non-income-tax deductions
    let mut statutory: Vec<CalculatedStatutory> = Vec::new();
    for deduction_type in rules.non_tax_types() {
        let result = calculate_deduction(
            deduction_type,
            rules.rate_bands(),
            input.gross_pay,
            input.period_unit_count,
            input.employee_age,
            step_number,
        );
        steps.push(result.audit_step);
        step_number += 1;
        warnings.extend(result.warning);
        statutory.extend(result.line);
    }

    // Reliefs
    let context = ReliefContext {
        employee_id: &input.employee_id,
        gross_pay: input.gross_pay,
        employee_age: input.employee_age,
        effective_date: input.effective_date,
    };
    let reliefs = compute_reliefs(
        &statutory,
        rules.relief_rules(),
        rules.relief_schemes(),
        &input.enrollments,
        &context,
        step_number,
    );
    step_number += reliefs.audit_steps.len() as u32;
    let total_reduction = reliefs.total_reduction();
    let total_tax_credits = reliefs.total_credits();

    // Adjusted taxable income
    let adjusted_taxable_income = non_negative(input.gross_pay - total_reduction);
    let adjustment_step = AuditStep {
        step_number,
        rule_id: "adjusted_taxable_income".to_string(),
        rule_name: "Adjusted Taxable Income".to_string(),
        reference: rules.country().code.clone(),
        input: serde_json::json!({
            "gross_pay": input.gross_pay.to_string(),
            "total_reduction": total_reduction.to_string(),
            "total_tax_credits": total_tax_credits.to_string(),
        }),
        output: serde_json::json!({
            "adjusted_taxable_income": adjusted_taxable_income.to_string(),
        }),
        reasoning: format!(
            "max(0, {} - {}) = {}",
            input.gross_pay, total_reduction, adjusted_taxable_income
        ),
    };
    steps.extend(reliefs.audit_steps);
    steps.push(adjustment_step);
    step_number += 1;
    warnings.extend(reliefs.warnings);

    // Income tax
    let mut tax_paid = Decimal::ZERO;
    let mut credits_applied = Decimal::ZERO;
    if let Some(tax_type) = rules.income_tax_type() {
        if schedule_for(rules.rate_bands(), &tax_type.id).is_empty() {
            debug!(deduction_type = %tax_type.id, "Income tax type has no bands; no tax line");
        } else {
            let tax = period_tax(
                adjusted_taxable_income,
                &opening,
                total_tax_credits,
                rules.rate_bands(),
                &tax_type.id,
                step_number,
            );
            steps.push(tax.audit_step);
            tax_paid = tax.final_tax;
            credits_applied = tax.credits_applied;

            statutory.push(CalculatedStatutory {
                code: tax_type.code.clone(),
                name: tax_type.name.clone(),
                kind: tax_type.kind,
                employee_amount: tax.final_tax,
                employer_amount: Decimal::ZERO,
                calculation_method: AppliedMethod::Cumulative,
                band_id: None,
                ytd_taxable_income: Some(tax.cumulative_income),
                ytd_tax_paid: Some(opening.ytd_tax_paid + tax.final_tax),
                tax_relief_amount: Some(tax.credits_applied),
            });
        }
    }

    let total_employee_deductions: Decimal = statutory.iter().map(|l| l.employee_amount).sum();
    let total_employer_contributions: Decimal = statutory.iter().map(|l| l.employer_amount).sum();

    let closing_balances = OpeningBalances {
        employee_id: input.employee_id.clone(),
        tax_year,
        ytd_taxable_income: opening.ytd_taxable_income + adjusted_taxable_income,
        ytd_tax_paid: opening.ytd_tax_paid + tax_paid,
        ytd_tax_credits: opening.ytd_tax_credits + credits_applied,
    };

    debug!(
        employee_id = %input.employee_id,
        country = %rules.country().code,
        gross_pay = %input.gross_pay,
        lines = statutory.len(),
        reliefs = reliefs.reliefs.len(),
        total_employee_deductions = %total_employee_deductions,
        warnings = warnings.len(),
        "Statutory calculation completed"
    );

    Ok(StatutoryCalculationResult {
        employee_id: input.employee_id.clone(),
        country_code: rules.country().code.clone(),
        effective_date: input.effective_date,
        tax_year,
        gross_pay: input.gross_pay,
        statutory,
        total_employee_deductions,
        total_employer_contributions,
        reliefs: reliefs.reliefs,
        adjusted_taxable_income,
        total_tax_credits,
        closing_balances,
        audit_trace: AuditTrace { steps, warnings },
    })
}
