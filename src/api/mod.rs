//! HTTP API module for the statutory deduction engine.
//!
//! This module provides the REST API endpoints for calculating statutory
//! deductions for one employee or a batch of employees.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BatchCalculationRequest, BatchEmployeeRequest, CalculationRequest};
pub use response::{
    ApiError, ApiErrorResponse, BatchResponse, CalculationEnvelope, ENGINE_VERSION,
};
pub use state::AppState;
