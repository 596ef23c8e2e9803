//! Rule data loading and management for the statutory deduction engine.
//!
//! This module loads statutory deduction types, rate bands, relief rules and
//! relief schemes from YAML files, validates them, and resolves the set in
//! force for a country on a given date. Server settings come from the
//! environment.
//!
//! # Example
//!
//! ```no_run
//! use statutory_engine::config::{ConfigLoader, RuleRepository};
//! use chrono::NaiveDate;
//!
//! let book = ConfigLoader::load("./config").unwrap();
//! let rules = book
//!     .load_rules("KE", NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
//!     .unwrap();
//! println!("Tax year: {}", rules.tax_year());
//! ```

mod cache;
mod loader;
mod repository;
mod rule_set;
mod settings;
mod types;

pub use cache::{DEFAULT_CACHE_CAPACITY, RuleCache};
pub use loader::ConfigLoader;
pub use repository::{RuleBook, RuleRepository, normalize_country_code};
pub use rule_set::{RuleSet, RuleSource};
pub use settings::{BIND_ADDR_VAR, CONFIG_DIR_VAR, LOG_FORMAT_VAR, ServerSettings};
pub use types::{
    CountryProfile, MethodName, RateBandRecord, ReliefRuleRecord, ReliefSchemeRecord,
    ReliefTypeName, SchemeTypeName,
};
