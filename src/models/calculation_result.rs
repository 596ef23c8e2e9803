//! Calculation result models for the statutory deduction engine.
//!
//! This module contains the [`StatutoryCalculationResult`] type and its associated
//! structures that capture all outputs of a deduction calculation: per-deduction
//! lines, reliefs, totals, closing balances and an audit trace.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CalculationMethod, DeductionKind, OpeningBalances, ReliefEffect, TaxYear};

/// How a deduction line was computed.
///
/// Mirrors [`CalculationMethod`] for band-resolved lines and adds the
/// cumulative method used for income tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedMethod {
    /// Percentage of gross pay.
    Percentage,
    /// Amount per unit in the period.
    PerUnit,
    /// Fixed amount per period.
    Fixed,
    /// Progressive bands over year-to-date income.
    Cumulative,
}

impl From<&CalculationMethod> for AppliedMethod {
    fn from(method: &CalculationMethod) -> Self {
        match method {
            CalculationMethod::Percentage { .. } => AppliedMethod::Percentage,
            CalculationMethod::PerUnit { .. } => AppliedMethod::PerUnit,
            CalculationMethod::Fixed { .. } => AppliedMethod::Fixed,
        }
    }
}

/// A single statutory deduction line.
///
/// The year-to-date fields are only populated on the income tax line.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{AppliedMethod, CalculatedStatutory, DeductionKind};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let line = CalculatedStatutory {
///     code: "NSSF".to_string(),
///     name: "National Social Security Fund".to_string(),
///     kind: DeductionKind::Contribution,
///     employee_amount: Decimal::from_str("480.00").unwrap(),
///     employer_amount: Decimal::from_str("480.00").unwrap(),
///     calculation_method: AppliedMethod::Percentage,
///     band_id: Some("ke_nssf_tiered".to_string()),
///     ytd_taxable_income: None,
///     ytd_tax_paid: None,
///     tax_relief_amount: None,
/// };
/// assert!(line.ytd_tax_paid.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedStatutory {
    /// Deduction code.
    pub code: String,
    /// Deduction name.
    pub name: String,
    /// Deduction kind.
    pub kind: DeductionKind,
    /// Amount withheld from the employee.
    pub employee_amount: Decimal,
    /// Amount contributed by the employer.
    pub employer_amount: Decimal,
    /// How the amount was computed.
    pub calculation_method: AppliedMethod,
    /// The band that produced the amount, for band-resolved lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_id: Option<String>,
    /// Closing year-to-date taxable income (income tax only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytd_taxable_income: Option<Decimal>,
    /// Closing year-to-date tax paid (income tax only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytd_tax_paid: Option<Decimal>,
    /// Tax credits applied against this line (income tax only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_relief_amount: Option<Decimal>,
}

/// Where a relief came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefSource {
    /// Derived from a statutory contribution of the same period.
    StatutoryContribution,
    /// Derived from an enrolled relief scheme.
    Scheme,
}

/// A relief or credit computed for the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedRelief {
    /// Deduction code or scheme code the relief derives from.
    pub source_code: String,
    /// Kind of source.
    pub source: ReliefSource,
    /// Relief amount (never negative).
    pub amount: Decimal,
    /// What the relief does.
    pub effect: ReliefEffect,
}

impl CalculatedRelief {
    /// Returns true if the relief reduces taxable income.
    pub fn reduces_taxable_income(&self) -> bool {
        self.effect == ReliefEffect::ReducesTaxableIncome
    }

    /// Returns true if the relief is a tax credit.
    pub fn is_tax_credit(&self) -> bool {
        self.effect == ReliefEffect::TaxCredit
    }
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The deduction, band or scheme the step refers to.
    pub reference: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A data-quality warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl AuditWarning {
    /// Creates a warning.
    pub fn new(code: &str, message: impl Into<String>, severity: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: severity.to_string(),
        }
    }
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
}

/// The complete result of a statutory deduction calculation.
///
/// Contains every realized deduction line, the reliefs that shaped the
/// taxable income and the closing balances the caller persists as the
/// opening balances of the next period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryCalculationResult {
    /// The employee the calculation is for.
    pub employee_id: String,
    /// The country whose rules were applied.
    pub country_code: String,
    /// The date the rules were resolved for.
    pub effective_date: NaiveDate,
    /// The tax year of the effective date.
    pub tax_year: TaxYear,
    /// Gross pay of the period.
    pub gross_pay: Decimal,
    /// Deduction lines, non-tax lines first, income tax last.
    pub statutory: Vec<CalculatedStatutory>,
    /// Sum of employee amounts over all lines.
    pub total_employee_deductions: Decimal,
    /// Sum of employer amounts over all lines.
    pub total_employer_contributions: Decimal,
    /// Every relief computed, in pipeline order.
    pub reliefs: Vec<CalculatedRelief>,
    /// Gross pay less taxable-income reliefs, never negative.
    pub adjusted_taxable_income: Decimal,
    /// Sum of tax-credit reliefs.
    pub total_tax_credits: Decimal,
    /// Year-to-date figures after this period.
    pub closing_balances: OpeningBalances,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

impl StatutoryCalculationResult {
    /// Returns the line for a deduction code, if it was realized.
    pub fn line(&self, code: &str) -> Option<&CalculatedStatutory> {
        self.statutory.iter().find(|line| line.code == code)
    }

    /// Returns the income tax line, if one was realized.
    pub fn income_tax(&self) -> Option<&CalculatedStatutory> {
        self.statutory.iter().find(|line| line.kind.is_income_tax())
    }

    /// Gross pay less employee deductions.
    pub fn net_pay(&self) -> Decimal {
        self.gross_pay - self.total_employee_deductions
    }
}
