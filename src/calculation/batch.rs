//! Parallel calculation of many employees over one shared rule set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::RuleSet;
use crate::models::StatutoryCalculationResult;

use super::orchestrator::{CalculationInput, calculate};

/// Limits applied to a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of calculations in flight. Zero is treated as one.
    pub max_concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// What happened to one employee in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The calculation succeeded.
    Completed {
        /// The calculation result.
        result: Box<StatutoryCalculationResult>,
    },
    /// The calculation was rejected.
    Failed {
        /// Why it failed.
        error: String,
    },
    /// The batch was cancelled before this employee was calculated.
    Cancelled,
}

/// One employee's entry in a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The employee the entry belongs to.
    pub employee_id: String,
    /// The outcome.
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// The outcome of every employee, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per input.
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Number of successful calculations.
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Completed { .. }))
    }

    /// Number of rejected calculations.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Failed { .. }))
    }

    /// Number of employees skipped by cancellation.
    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Cancelled))
    }

    fn count(&self, predicate: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

fn calculate_entry(input: &CalculationInput, rules: &RuleSet) -> BatchOutcome {
    match calculate(input, rules) {
        Ok(result) => BatchOutcome::Completed {
            result: Box::new(result),
        },
        Err(err) => BatchOutcome::Failed {
            error: err.to_string(),
        },
    }
}

/// Calculates every input as an independent task.
///
/// At most `options.max_concurrency` calculations run at once. Setting the
/// `cancel` channel to `true` stops the batch between employees: calculations
/// already running finish, the rest are reported as [`BatchOutcome::Cancelled`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use statutory_engine::calculation::{BatchOptions, CalculationInput, run_batch};
/// use statutory_engine::config::RuleSet;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use tokio::sync::watch;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let rules = Arc::new(RuleSet::empty("ZZ", date));
/// let inputs = vec![CalculationInput::new("emp_001", "ZZ", Decimal::from(1000), date)];
/// let (_cancel, cancelled) = watch::channel(false);
///
/// let report = run_batch(rules, inputs, BatchOptions::default(), cancelled).await;
/// assert_eq!(report.completed(), 1);
/// # });
/// ```
pub async fn run_batch(
    rules: Arc<RuleSet>,
    inputs: Vec<CalculationInput>,
    options: BatchOptions,
    cancel: watch::Receiver<bool>,
) -> BatchReport {
    let total = inputs.len();
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let employee_ids: Vec<String> = inputs.iter().map(|i| i.employee_id.clone()).collect();
    let mut outcomes: Vec<Option<BatchOutcome>> = vec![None; total];
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        if *cancel.borrow() {
            debug!(remaining = total - index, "Batch cancelled before dispatch");
            break;
        }

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let rules = Arc::clone(&rules);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let _permit = permit;
            if *cancel.borrow() {
                return (index, BatchOutcome::Cancelled);
            }
            (index, calculate_entry(&input, &rules))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(err) => error!(error = %err, "Batch calculation task failed"),
        }
    }

    let report = BatchReport {
        entries: employee_ids
            .into_iter()
            .zip(outcomes)
            .map(|(employee_id, outcome)| BatchEntry {
                employee_id,
                outcome: outcome.unwrap_or(BatchOutcome::Cancelled),
            })
            .collect(),
    };

    info!(
        total,
        completed = report.completed(),
        failed = report.failed(),
        cancelled = report.cancelled(),
        "Batch calculation finished"
    );
    report
}
