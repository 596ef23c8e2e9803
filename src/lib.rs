//! Statutory Deduction Engine
//!
//! This crate calculates government-mandated payroll deductions for one pay
//! period: contributions and levies resolved from rate bands, reliefs from
//! those contributions and from enrolled relief schemes, and cumulative
//! (year-to-date) income tax with tax credits.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

#[cfg(test)]
mod test_support;
