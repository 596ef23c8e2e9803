//! HTTP request handlers for the statutory deduction API.
//!
//! This module contains the handler functions for all API endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{BatchOptions, CalculationInput, calculate, run_batch};

use super::request::{BatchCalculationRequest, CalculationRequest};
use super::response::{
    ApiError, ApiErrorResponse, BatchResponse, CalculationEnvelope, ENGINE_VERSION,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/calculate/batch", post(batch_handler))
        .with_state(state)
}

/// Wraps a body as a JSON response with an explicit content type.
fn json_response<T: serde::Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: ApiErrorResponse) -> Response {
    json_response(error.status, error.error)
}

/// Maps a JSON extraction failure to a 400 response.
fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's detailed message
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    error_response(ApiErrorResponse::bad_request(error))
}

/// Handler for POST /calculate endpoint.
///
/// Resolves the rules for the request's country and date, then runs the
/// deduction pipeline for one employee.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    let input: CalculationInput = request.into();

    let rules = match state
        .rules()
        .rules_for(&input.country_code, input.effective_date)
    {
        Ok(rules) => rules,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                country = %input.country_code,
                error = %err,
                "Rule loading failed"
            );
            return error_response(err.into());
        }
    };

    let start_time = Instant::now();
    match calculate(&input, &rules) {
        Ok(result) => {
            let duration_us = start_time.elapsed().as_micros() as u64;
            info!(
                correlation_id = %correlation_id,
                employee_id = %input.employee_id,
                country = %result.country_code,
                gross_pay = %result.gross_pay,
                total_employee_deductions = %result.total_employee_deductions,
                duration_us,
                "Calculation completed successfully"
            );
            json_response(
                StatusCode::OK,
                CalculationEnvelope {
                    calculation_id: correlation_id,
                    timestamp: Utc::now(),
                    engine_version: ENGINE_VERSION.to_string(),
                    duration_us,
                    result,
                },
            )
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Calculation failed"
            );
            error_response(err.into())
        }
    }
}

/// Handler for POST /calculate/batch endpoint.
///
/// Every employee shares the batch's country and date. Individual failures
/// are reported per employee and do not fail the request.
async fn batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchCalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        country = %request.country_code,
        employees = request.employees.len(),
        "Processing batch calculation request"
    );

    let rules = match state
        .rules()
        .rules_for(&request.country_code, request.effective_date)
    {
        Ok(rules) => rules,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                country = %request.country_code,
                error = %err,
                "Rule loading failed"
            );
            return error_response(err.into());
        }
    };

    let options = match request.max_concurrency {
        Some(max_concurrency) => BatchOptions { max_concurrency },
        None => BatchOptions::default(),
    };
    let country_code = request.country_code;
    let effective_date = request.effective_date;
    let inputs: Vec<CalculationInput> = request
        .employees
        .into_iter()
        .map(|employee| employee.into_input(&country_code, effective_date))
        .collect();

    let start_time = Instant::now();
    let (_cancel, cancelled) = watch::channel(false);
    let report = run_batch(Arc::clone(&rules), inputs, options, cancelled).await;
    let duration_us = start_time.elapsed().as_micros() as u64;

    info!(
        correlation_id = %correlation_id,
        completed = report.completed(),
        failed = report.failed(),
        duration_us,
        "Batch calculation completed"
    );

    json_response(
        StatusCode::OK,
        BatchResponse {
            batch_id: correlation_id,
            timestamp: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            country_code: rules.country().code.clone(),
            effective_date,
            duration_us,
            completed: report.completed(),
            failed: report.failed(),
            results: report.entries,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::BatchOutcome;
    use crate::config::RuleBook;
    use crate::models::DeductionKind;
    use crate::test_support::*;
    use axum::{body::Body, http::Request};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let book = RuleBook::from_sources([source(
            vec![
                deduction_type("ssf", "SSF", DeductionKind::Contribution),
                deduction_type("tax", "PAYE", DeductionKind::IncomeTax),
            ],
            [
                vec![percentage_band("ssf_1", "ssf", dec!(0), None, dec!(3))],
                two_band_tax_schedule("tax"),
            ]
            .concat(),
            vec![],
            vec![],
        )]);
        AppState::new(Arc::new(book))
    }

    fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_returns_200() {
        let router = create_router(create_test_state());
        let body = r#"{
            "employee_id": "emp_001",
            "country_code": "KE",
            "gross_pay": "1000",
            "effective_date": "2025-01-31"
        }"#;

        let response = router.oneshot(post("/calculate", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let envelope: CalculationEnvelope = body_json(response).await;
        assert_eq!(envelope.engine_version, ENGINE_VERSION);
        assert_eq!(envelope.result.employee_id, "emp_001");
        assert_eq!(envelope.result.line("SSF").unwrap().employee_amount, dec!(30));
        // No relief rule: 950 x 20%
        assert_eq!(envelope.result.income_tax().unwrap().employee_amount, dec!(190));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(post("/calculate", "{invalid json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let body = r#"{ "country_code": "KE", "gross_pay": "1000", "effective_date": "2025-01-31" }"#;

        let response = router.oneshot(post("/calculate", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("employee_id"));
    }

    #[tokio::test]
    async fn test_negative_gross_pay_returns_400() {
        let router = create_router(create_test_state());
        let body = r#"{
            "employee_id": "emp_001",
            "country_code": "KE",
            "gross_pay": "-1",
            "effective_date": "2025-01-31"
        }"#;

        let response = router.oneshot(post("/calculate", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("gross_pay"));
    }

    #[tokio::test]
    async fn test_invalid_rule_data_returns_422() {
        let mut broken = source(
            vec![deduction_type("ssf", "SSF", DeductionKind::Contribution)],
            vec![
                percentage_band("ssf_1", "ssf", dec!(0), None, dec!(3)),
                percentage_band("ssf_2", "ssf", dec!(100), None, dec!(5)),
            ],
            vec![],
            vec![],
        );
        broken.country.code = "UG".to_string();
        for deduction_type in &mut broken.deduction_types {
            deduction_type.country = "UG".to_string();
        }
        let router = create_router(AppState::new(Arc::new(RuleBook::from_sources([broken]))));

        let body = r#"{
            "employee_id": "emp_001",
            "country_code": "UG",
            "gross_pay": "1000",
            "effective_date": "2025-01-31"
        }"#;
        let response = router.oneshot(post("/calculate", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "INVALID_RULE_DATA");
        assert!(error.message.contains("ssf_2"));
    }

    #[tokio::test]
    async fn test_batch_returns_entry_per_employee() {
        let router = create_router(create_test_state());
        let body = r#"{
            "country_code": "KE",
            "effective_date": "2025-01-31",
            "max_concurrency": 2,
            "employees": [
                { "employee_id": "emp_001", "gross_pay": "1000" },
                { "employee_id": "emp_002", "gross_pay": "-5" },
                { "employee_id": "emp_003", "gross_pay": "100" }
            ]
        }"#;

        let response = router
            .oneshot(post("/calculate/batch", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let batch: BatchResponse = body_json(response).await;
        assert_eq!(batch.completed, 2);
        assert_eq!(batch.failed, 1);
        let ids: Vec<&str> = batch.results.iter().map(|e| e.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["emp_001", "emp_002", "emp_003"]);
        assert!(matches!(batch.results[1].outcome, BatchOutcome::Failed { .. }));
    }
}
