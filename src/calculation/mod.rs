//! Calculation logic for the statutory deduction engine.
//!
//! This module contains band resolution, non-tax deduction amounts, the
//! cumulative income tax walk, relief and credit aggregation, the deduction
//! pipeline that sequences them, and a batch runner for many employees.

mod band_resolver;
mod batch;
mod cumulative_tax;
mod deduction_amount;
mod money;
mod orchestrator;
mod relief_aggregator;

pub use band_resolver::{AMBIGUOUS_BAND_WARNING, BandResolution, resolve_band, schedule_for};
pub use batch::{BatchEntry, BatchOptions, BatchOutcome, BatchReport, run_batch};
pub use cumulative_tax::{PeriodTax, cumulative_tax, period_tax};
pub use deduction_amount::{BandAmounts, DeductionResult, calculate_deduction};
pub use money::{MONEY_DECIMAL_PLACES, finalize, non_negative, percent_of, round_money};
pub use orchestrator::{
    CalculationInput, NEGATIVE_BALANCES_WARNING, STALE_BALANCES_WARNING, calculate,
};
pub use relief_aggregator::{
    FOREIGN_ENROLLMENT_WARNING, MISSING_CONTRIBUTION_WARNING, ReliefContext, ReliefOutcome,
    UNKNOWN_SCHEME_WARNING, compute_reliefs,
};
