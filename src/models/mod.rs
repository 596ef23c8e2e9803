//! Core data models for the statutory deduction engine.
//!
//! This module contains the rule records, year-to-date balances and result
//! types used throughout the engine.

mod balances;
mod calculation_result;
mod deduction_type;
mod rate_band;
mod relief;

pub use balances::{OpeningBalances, TaxYear, TaxYearStart};
pub use calculation_result::{
    AppliedMethod, AuditStep, AuditTrace, AuditWarning, CalculatedRelief, CalculatedStatutory,
    ReliefSource, StatutoryCalculationResult,
};
pub use deduction_type::{DeductionKind, StatutoryDeductionType, ValidityWindow};
pub use rate_band::{CalculationMethod, RateBand};
pub use relief::{
    EmployeeReliefEnrollment, ReliefEffect, ReliefFormula, ReliefRule, ReliefScheme,
    SchemeFormula,
};
