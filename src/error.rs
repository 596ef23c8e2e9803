//! Error types for the statutory deduction engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while loading rule data or
//! calculating deductions.

use thiserror::Error;

/// The main error type for the statutory deduction engine.
///
/// A missing rate band is deliberately *not* an error: deduction types without
/// an applicable band are skipped. Errors are reserved for conditions that
/// could otherwise produce wrong amounts.
///
/// # Example
///
/// ```
/// use statutory_engine::error::EngineError;
///
/// let error = EngineError::InvalidRuleData {
///     rule_id: "band_paye_2".to_string(),
///     message: "validity window ends before it starts".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Invalid rule data 'band_paye_2': validity window ends before it starts"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Rule data is malformed (bad validity window, overlapping bands, ...).
    #[error("Invalid rule data '{rule_id}': {message}")]
    InvalidRuleData {
        /// The identifier of the offending record.
        rule_id: String,
        /// A description of the defect.
        message: String,
    },

    /// A calculation input was invalid.
    #[error("Invalid input field '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidRuleData`].
    pub fn invalid_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidRuleData {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`EngineError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/country.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/country.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/ke/rate_bands.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/ke/rate_bands.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_invalid_rule_data_displays_id_and_message() {
        let error = EngineError::invalid_rule("band_nssf_1", "bands overlap");
        assert_eq!(
            error.to_string(),
            "Invalid rule data 'band_nssf_1': bands overlap"
        );
    }

    #[test]
    fn test_invalid_input_displays_field_and_message() {
        let error = EngineError::invalid_input("gross_pay", "must not be negative");
        assert_eq!(
            error.to_string(),
            "Invalid input field 'gross_pay': must not be negative"
        );
    }

    #[test]
    fn test_calculation_error_displays_message() {
        let error = EngineError::CalculationError {
            message: "schedule exhausted".to_string(),
        };
        assert_eq!(error.to_string(), "Calculation error: schedule exhausted");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_invalid_rule() -> EngineResult<()> {
            Err(EngineError::invalid_rule("x", "y"))
        }

        fn propagates_error() -> EngineResult<()> {
            returns_invalid_rule()?;
            Ok(())
        }

        assert!(matches!(
            propagates_error(),
            Err(EngineError::InvalidRuleData { .. })
        ));
    }
}
