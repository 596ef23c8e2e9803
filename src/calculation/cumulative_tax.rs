//! Cumulative (year-to-date) income tax.
//!
//! Income tax is computed on the taxable income accumulated over the tax year
//! and reconciled each period against the tax already withheld, so that
//! rounding and earlier under- or over-withholding correct themselves.

use rust_decimal::Decimal;

use crate::models::{AuditStep, OpeningBalances, RateBand};

use super::band_resolver::schedule_for;
use super::money::{finalize, non_negative, percent_of};

/// Total tax due on a cumulative income, unrounded.
///
/// Walks the active bands of `deduction_type_id` in ascending `min_amount`
/// order. Each band taxes the part of the income inside
/// `[min_amount, max_amount)` at its employee rate; the walk stops at the
/// first band whose `max_amount` is open or not below the income.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::cumulative_tax;
/// use statutory_engine::models::{CalculationMethod, RateBand, ValidityWindow};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let band = |id: &str, min: i64, max: Option<i64>, rate: i64| RateBand {
///     id: id.to_string(),
///     deduction_type_id: "paye".to_string(),
///     min_amount: Decimal::from(min),
///     max_amount: max.map(Decimal::from),
///     calculation: CalculationMethod::Percentage {
///         employee_rate: Decimal::from(rate),
///         employer_rate: Decimal::ZERO,
///     },
///     min_age: 0,
///     max_age: None,
///     validity: ValidityWindow::open_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
///     is_active: true,
/// };
/// let bands = vec![band("low", 0, Some(50), 0), band("high", 50, None, 20)];
///
/// assert_eq!(cumulative_tax(Decimal::from(200), &bands, "paye"), Decimal::from(30));
/// ```
pub fn cumulative_tax(
    cumulative_income: Decimal,
    bands: &[RateBand],
    deduction_type_id: &str,
) -> Decimal {
    let mut due = Decimal::ZERO;

    for band in schedule_for(bands, deduction_type_id) {
        if cumulative_income <= band.min_amount {
            break;
        }

        let upper = match band.max_amount {
            Some(max) => cumulative_income.min(max),
            None => cumulative_income,
        };
        let rate = band.calculation.employee_rate().unwrap_or(Decimal::ZERO);
        due += percent_of(upper - band.min_amount, rate);

        if band.max_amount.is_none_or(|max| cumulative_income <= max) {
            break;
        }
    }

    due
}

/// The income tax of one period after year-to-date reconciliation.
#[derive(Debug, Clone)]
pub struct PeriodTax {
    /// Taxable income to date including this period.
    pub cumulative_income: Decimal,
    /// Unrounded tax due on `cumulative_income`.
    pub total_tax_due: Decimal,
    /// Tax for the period before credits, rounded.
    pub period_tax: Decimal,
    /// Credits actually absorbed, never more than `period_tax`.
    pub credits_applied: Decimal,
    /// Tax withheld this period.
    pub final_tax: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Computes the period's income tax.
///
/// `period_tax = max(0, due(ytd_income + taxable) - ytd_tax_paid)`, then the
/// period's credits are subtracted and the result clamped at zero. A negative
/// `period_taxable_income` counts as zero.
///
/// Credits of earlier periods are not part of the reconciliation; the
/// opening `ytd_tax_credits` is only reported.
pub fn period_tax(
    period_taxable_income: Decimal,
    opening: &OpeningBalances,
    credits: Decimal,
    bands: &[RateBand],
    deduction_type_id: &str,
    step_number: u32,
) -> PeriodTax {
    let taxable = non_negative(period_taxable_income);
    let cumulative_income = opening.ytd_taxable_income + taxable;
    let total_tax_due = cumulative_tax(cumulative_income, bands, deduction_type_id);

    let period_tax = finalize(total_tax_due - opening.ytd_tax_paid);
    let credits = non_negative(credits);
    let credits_applied = credits.min(period_tax);
    let final_tax = finalize(period_tax - credits);

    let audit_step = AuditStep {
        step_number,
        rule_id: format!("{}_cumulative_tax", deduction_type_id),
        rule_name: "Cumulative Income Tax".to_string(),
        reference: deduction_type_id.to_string(),
        input: serde_json::json!({
            "period_taxable_income": taxable.to_string(),
            "ytd_taxable_income": opening.ytd_taxable_income.to_string(),
            "ytd_tax_paid": opening.ytd_tax_paid.to_string(),
            "ytd_tax_credits": opening.ytd_tax_credits.to_string(),
            "credits": credits.to_string(),
        }),
        output: serde_json::json!({
            "cumulative_income": cumulative_income.to_string(),
            "total_tax_due": total_tax_due.to_string(),
            "period_tax": period_tax.to_string(),
            "credits_applied": credits_applied.to_string(),
            "final_tax": final_tax.to_string(),
        }),
        reasoning: format!(
            "Tax on {} to date = {}; less {} paid = {}; less credits {} = {}",
            cumulative_income.normalize(),
            total_tax_due.normalize(),
            opening.ytd_tax_paid.normalize(),
            period_tax,
            credits.normalize(),
            final_tax
        ),
    };

    PeriodTax {
        cumulative_income,
        total_tax_due,
        period_tax,
        credits_applied,
        final_tax,
        audit_step,
    }
}
