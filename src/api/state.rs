//! Application state for the statutory deduction API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::{RuleCache, RuleRepository};

/// Shared application state.
///
/// Holds the rule cache, so every request for the same country and date
/// reuses one resolved rule set.
#[derive(Clone)]
pub struct AppState {
    rules: Arc<RuleCache>,
}

impl AppState {
    /// Creates application state over a rule repository.
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self {
            rules: Arc::new(RuleCache::new(repository)),
        }
    }

    /// Returns the rule cache.
    pub fn rules(&self) -> &RuleCache {
        &self.rules
    }
}
