//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading statutory rule
//! data from YAML files into a [`RuleBook`].

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::models::{RateBand, ReliefRule, ReliefScheme};

use super::repository::RuleBook;
use super::rule_set::RuleSource;
use super::types::{
    CountryProfile, DeductionTypesFile, RateBandsFile, ReliefRulesFile, ReliefSchemesFile,
};

/// Loads statutory rule data from YAML files.
///
/// # Directory Structure
///
/// The configuration root holds one directory per country:
/// ```text
/// config/
/// └── ke/
///     ├── country.yaml          # Country metadata and tax year start
///     ├── deduction_types.yaml  # Statutory deduction types
///     ├── rate_bands.yaml       # Rate bands of all types
///     ├── relief_rules.yaml     # Reliefs from statutory contributions (optional)
///     └── relief_schemes.yaml   # Enrollable relief schemes (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use statutory_engine::config::{ConfigLoader, RuleRepository};
/// use chrono::NaiveDate;
///
/// let book = ConfigLoader::load("./config").unwrap();
/// let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let rules = book.load_rules("KE", date).unwrap();
/// println!("{} deduction types in force", rules.deduction_types().len());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads every country directory under `path`.
    ///
    /// Subdirectories without a `country.yaml` are ignored. Each country's
    /// validity windows are checked up front so that a malformed file is
    /// reported at startup rather than on the first calculation.
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if the root or a required file is missing
    /// - `ConfigParseError` if a file contains invalid YAML
    /// - `InvalidRuleData` if a record fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<RuleBook> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let entries = fs::read_dir(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let mut book = RuleBook::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: path_str.clone(),
            })?;

            let country_dir = entry.path();
            if country_dir.is_dir() && country_dir.join("country.yaml").exists() {
                let source = Self::load_country(&country_dir)?;
                source.validate_windows()?;
                book.insert(source);
            }
        }

        info!(path = %path_str, countries = ?book.countries(), "Loaded statutory rules");
        Ok(book)
    }

    /// Loads a single country directory.
    pub fn load_country<P: AsRef<Path>>(path: P) -> EngineResult<RuleSource> {
        let path = path.as_ref();

        let country = Self::load_yaml::<CountryProfile>(&path.join("country.yaml"))?;
        let types_file = Self::load_yaml::<DeductionTypesFile>(&path.join("deduction_types.yaml"))?;
        let bands_file = Self::load_yaml::<RateBandsFile>(&path.join("rate_bands.yaml"))?;

        let rate_bands = bands_file
            .rate_bands
            .into_iter()
            .map(RateBand::try_from)
            .collect::<EngineResult<Vec<_>>>()?;

        let relief_rules =
            match Self::load_optional::<ReliefRulesFile>(&path.join("relief_rules.yaml"))? {
                Some(file) => file
                    .relief_rules
                    .into_iter()
                    .map(ReliefRule::try_from)
                    .collect::<EngineResult<Vec<_>>>()?,
                None => Vec::new(),
            };

        let relief_schemes =
            match Self::load_optional::<ReliefSchemesFile>(&path.join("relief_schemes.yaml"))? {
                Some(file) => file
                    .relief_schemes
                    .into_iter()
                    .map(ReliefScheme::try_from)
                    .collect::<EngineResult<Vec<_>>>()?,
                None => Vec::new(),
            };

        debug!(
            country = %country.code,
            deduction_types = types_file.deduction_types.len(),
            rate_bands = rate_bands.len(),
            relief_rules = relief_rules.len(),
            relief_schemes = relief_schemes.len(),
            "Loaded country rules"
        );

        Ok(RuleSource {
            country,
            deduction_types: types_file.deduction_types,
            rate_bands,
            relief_rules,
            relief_schemes,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads a YAML file that may be absent.
    fn load_optional<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<Option<T>> {
        if path.exists() {
            Self::load_yaml(path).map(Some)
        } else {
            Ok(None)
        }
    }
}
