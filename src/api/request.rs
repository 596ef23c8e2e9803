//! Request types for the statutory deduction API.
//!
//! This module defines the JSON request structures for the `/calculate` and
//! `/calculate/batch` endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::CalculationInput;
use crate::models::{EmployeeReliefEnrollment, OpeningBalances};

fn default_unit_count() -> u32 {
    1
}

/// Request body for the `/calculate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// ISO country code whose rules apply (e.g. "KE").
    pub country_code: String,
    /// Gross pay of the period.
    pub gross_pay: Decimal,
    /// The date the period is calculated for.
    pub effective_date: NaiveDate,
    /// Whole units worked in the period, for per-unit bands. Defaults to 1.
    #[serde(default = "default_unit_count")]
    pub period_unit_count: u32,
    /// The employee's age in years, if known.
    #[serde(default)]
    pub employee_age: Option<u32>,
    /// Year-to-date balances before this period.
    #[serde(default)]
    pub opening_balances: Option<OpeningBalances>,
    /// Relief scheme enrollments.
    #[serde(default)]
    pub enrollments: Vec<EmployeeReliefEnrollment>,
}

impl From<CalculationRequest> for CalculationInput {
    fn from(req: CalculationRequest) -> Self {
        CalculationInput {
            employee_id: req.employee_id,
            country_code: req.country_code,
            gross_pay: req.gross_pay,
            period_unit_count: req.period_unit_count,
            employee_age: req.employee_age,
            opening_balances: req.opening_balances,
            effective_date: req.effective_date,
            enrollments: req.enrollments,
        }
    }
}

/// One employee in a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEmployeeRequest {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// Gross pay of the period.
    pub gross_pay: Decimal,
    /// Whole units worked in the period. Defaults to 1.
    #[serde(default = "default_unit_count")]
    pub period_unit_count: u32,
    /// The employee's age in years, if known.
    #[serde(default)]
    pub employee_age: Option<u32>,
    /// Year-to-date balances before this period.
    #[serde(default)]
    pub opening_balances: Option<OpeningBalances>,
    /// Relief scheme enrollments.
    #[serde(default)]
    pub enrollments: Vec<EmployeeReliefEnrollment>,
}

impl BatchEmployeeRequest {
    /// Builds the calculation input within a batch's country and date.
    pub fn into_input(self, country_code: &str, effective_date: NaiveDate) -> CalculationInput {
        CalculationInput {
            employee_id: self.employee_id,
            country_code: country_code.to_string(),
            gross_pay: self.gross_pay,
            period_unit_count: self.period_unit_count,
            employee_age: self.employee_age,
            opening_balances: self.opening_balances,
            effective_date,
            enrollments: self.enrollments,
        }
    }
}

/// Request body for the `/calculate/batch` endpoint.
///
/// All employees share one country and effective date, so the rules are
/// resolved once for the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCalculationRequest {
    /// ISO country code whose rules apply.
    pub country_code: String,
    /// The date the period is calculated for.
    pub effective_date: NaiveDate,
    /// The employees to calculate.
    pub employees: Vec<BatchEmployeeRequest>,
    /// Optional cap on calculations in flight.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}
