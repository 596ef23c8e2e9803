//! Tax relief and credit aggregation.
//!
//! Reliefs come from two places, always in this order:
//! 1. statutory contributions already deducted this period, through the
//!    relief rule keyed by the contribution's code
//! 2. relief schemes the employee is enrolled in
//!
//! Each relief either reduces taxable income or is credited against tax.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{
    AuditStep, AuditWarning, CalculatedRelief, CalculatedStatutory, EmployeeReliefEnrollment,
    ReliefFormula, ReliefRule, ReliefScheme, ReliefSource, SchemeFormula,
};

use super::money::{finalize, percent_of};

/// Warning code for enrollments that point at a missing or inactive scheme.
pub const UNKNOWN_SCHEME_WARNING: &str = "UNKNOWN_RELIEF_SCHEME";
/// Warning code for enrollments that belong to another employee.
pub const FOREIGN_ENROLLMENT_WARNING: &str = "FOREIGN_ENROLLMENT";
/// Warning code for contribution-based schemes without a contribution amount.
pub const MISSING_CONTRIBUTION_WARNING: &str = "MISSING_CONTRIBUTION_AMOUNT";

/// Employee facts the reliefs depend on.
#[derive(Debug, Clone, Copy)]
pub struct ReliefContext<'a> {
    /// The employee being calculated.
    pub employee_id: &'a str,
    /// Gross pay of the period.
    pub gross_pay: Decimal,
    /// Age in years; `None` disables scheme age checks.
    pub employee_age: Option<u32>,
    /// The calculation date, used for enrollment windows.
    pub effective_date: NaiveDate,
}

/// The reliefs of one period with their audit trail.
#[derive(Debug, Clone, Default)]
pub struct ReliefOutcome {
    /// Non-zero reliefs in computation order.
    pub reliefs: Vec<CalculatedRelief>,
    /// One audit step per relief.
    pub audit_steps: Vec<AuditStep>,
    /// Data-quality warnings.
    pub warnings: Vec<AuditWarning>,
}

impl ReliefOutcome {
    /// Sum of reliefs that reduce taxable income.
    pub fn total_reduction(&self) -> Decimal {
        self.reliefs
            .iter()
            .filter(|relief| relief.reduces_taxable_income())
            .map(|relief| relief.amount)
            .sum()
    }

    /// Sum of reliefs credited against tax.
    pub fn total_credits(&self) -> Decimal {
        self.reliefs
            .iter()
            .filter(|relief| relief.is_tax_credit())
            .map(|relief| relief.amount)
            .sum()
    }
}

fn capped(amount: Decimal, max_amount: Option<Decimal>) -> Decimal {
    match max_amount {
        Some(max) => amount.min(max),
        None => amount,
    }
}

/// Computes every relief of the period.
///
/// `deductions` are the finalized non-income-tax lines. Relief rules and
/// schemes are expected to be those in force on the effective date; inactive
/// ones are ignored here as well. Zero-valued reliefs are not emitted.
pub fn compute_reliefs(
    deductions: &[CalculatedStatutory],
    relief_rules: &[ReliefRule],
    schemes: &[ReliefScheme],
    enrollments: &[EmployeeReliefEnrollment],
    context: &ReliefContext<'_>,
    first_step: u32,
) -> ReliefOutcome {
    let mut outcome = ReliefOutcome::default();
    let mut step_number = first_step;

    for deduction in deductions.iter().filter(|d| !d.kind.is_income_tax()) {
        let Some(rule) = relief_rules
            .iter()
            .find(|rule| rule.is_active && rule.source_code == deduction.code)
        else {
            continue;
        };

        let (raw, basis) = match rule.formula {
            ReliefFormula::Percentage { rate } => (
                percent_of(deduction.employee_amount, rate),
                format!(
                    "{}% of {} contribution {}",
                    rate.normalize(),
                    deduction.code,
                    deduction.employee_amount
                ),
            ),
            ReliefFormula::Fixed { amount } => (amount, format!("fixed {}", amount.normalize())),
        };
        let amount = finalize(capped(raw, rule.max_amount));
        if amount.is_zero() {
            continue;
        }

        outcome.audit_steps.push(AuditStep {
            step_number,
            rule_id: rule.id.clone(),
            rule_name: format!("{} Relief", deduction.code),
            reference: rule.source_code.clone(),
            input: serde_json::json!({
                "source_code": deduction.code,
                "contribution": deduction.employee_amount.to_string(),
                "max_amount": rule.max_amount.map(|m| m.to_string()),
            }),
            output: serde_json::json!({
                "amount": amount.to_string(),
                "effect": rule.effect,
            }),
            reasoning: format!("Relief = {} = {}", basis, amount),
        });
        step_number += 1;

        outcome.reliefs.push(CalculatedRelief {
            source_code: deduction.code.clone(),
            source: ReliefSource::StatutoryContribution,
            amount,
            effect: rule.effect,
        });
    }

    for enrollment in enrollments {
        if enrollment.employee_id != context.employee_id {
            outcome.warnings.push(AuditWarning::new(
                FOREIGN_ENROLLMENT_WARNING,
                format!(
                    "Enrollment '{}' belongs to employee '{}'; skipped",
                    enrollment.id, enrollment.employee_id
                ),
                "warning",
            ));
            continue;
        }
        if !enrollment.is_effective_on(context.effective_date) {
            continue;
        }

        let Some(scheme) = schemes
            .iter()
            .find(|scheme| scheme.id == enrollment.scheme_id && scheme.is_active)
        else {
            outcome.warnings.push(AuditWarning::new(
                UNKNOWN_SCHEME_WARNING,
                format!(
                    "Enrollment '{}' references unknown or inactive scheme '{}'; skipped",
                    enrollment.id, enrollment.scheme_id
                ),
                "warning",
            ));
            continue;
        };

        if context
            .employee_age
            .is_some_and(|age| !scheme.admits_age(age))
        {
            continue;
        }

        let (raw, basis) = match scheme.formula {
            SchemeFormula::PercentageOfGross { rate } => (
                percent_of(context.gross_pay, rate),
                format!("{}% of gross pay {}", rate.normalize(), context.gross_pay),
            ),
            SchemeFormula::PercentageOfContribution { rate } => {
                let Some(contribution) = enrollment.contribution_amount else {
                    outcome.warnings.push(AuditWarning::new(
                        MISSING_CONTRIBUTION_WARNING,
                        format!(
                            "Enrollment '{}' in '{}' has no contribution amount; no relief",
                            enrollment.id, scheme.code
                        ),
                        "warning",
                    ));
                    continue;
                };
                (
                    percent_of(contribution, rate),
                    format!("{}% of contribution {}", rate.normalize(), contribution),
                )
            }
            SchemeFormula::Fixed { amount } => (amount, format!("fixed {}", amount.normalize())),
        };
        let amount = finalize(capped(raw, scheme.max_amount));
        if amount.is_zero() {
            continue;
        }

        outcome.audit_steps.push(AuditStep {
            step_number,
            rule_id: scheme.id.clone(),
            rule_name: scheme.name.clone(),
            reference: scheme.code.clone(),
            input: serde_json::json!({
                "enrollment_id": enrollment.id,
                "gross_pay": context.gross_pay.to_string(),
                "contribution_amount": enrollment.contribution_amount.map(|c| c.to_string()),
                "max_amount": scheme.max_amount.map(|m| m.to_string()),
            }),
            output: serde_json::json!({
                "amount": amount.to_string(),
                "effect": scheme.effect,
            }),
            reasoning: format!("Relief = {} = {}", basis, amount),
        });
        step_number += 1;

        outcome.reliefs.push(CalculatedRelief {
            source_code: scheme.code.clone(),
            source: ReliefSource::Scheme,
            amount,
            effect: scheme.effect,
        });
    }

    outcome
}
