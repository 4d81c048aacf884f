//! File-backed configuration repository.
//!
//! [`YamlConfigurationRepository`] stores yearly configurations as
//! `<dir>/<year>.yaml` and company policies as
//! `<dir>/policies/<company>.yaml`. It backs the configuration store in
//! deployments that seed legal parameters from checked-in files, and in
//! tests.
//!
//! # Directory Structure
//!
//! ```text
//! config/colombia/
//! ├── 2024.yaml            # Legal parameters effective that year
//! ├── 2025.yaml
//! └── policies/
//!     └── <company-id>.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::types::{CompanyPayrollPolicy, YearlyConfiguration};
use crate::error::{EngineError, EngineResult};
use crate::repository::ConfigurationRepository;

/// A [`ConfigurationRepository`] reading and writing YAML files.
#[derive(Debug, Clone)]
pub struct YamlConfigurationRepository {
    dir: PathBuf,
}

impl YamlConfigurationRepository {
    /// Opens a repository rooted at the given directory, creating it
    /// (and its `policies` subdirectory) if missing.
    pub fn open<P: AsRef<Path>>(dir: P) -> EngineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("policies")).map_err(|e| EngineError::PersistenceFailure {
            operation: "create configuration directory".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    fn year_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{year}.yaml"))
    }

    fn policy_path(&self, company_id: Uuid) -> PathBuf {
        self.dir.join("policies").join(format!("{company_id}.yaml"))
    }

    fn write_yaml<T: serde::Serialize>(path: &Path, value: &T, operation: &str) -> EngineResult<()> {
        let yaml = serde_yaml::to_string(value).map_err(|e| EngineError::PersistenceFailure {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        fs::write(path, yaml).map_err(|e| EngineError::PersistenceFailure {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

impl ConfigurationRepository for YamlConfigurationRepository {
    fn get_configuration(&self, year: i32) -> EngineResult<Option<YearlyConfiguration>> {
        let path = self.year_path(year);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Configuration {
            year,
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: YearlyConfiguration =
            serde_yaml::from_str(&content).map_err(|e| EngineError::Configuration {
                year,
                message: format!("cannot parse {}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(Some(config))
    }

    fn save_configuration(&self, config: &YearlyConfiguration) -> EngineResult<()> {
        Self::write_yaml(
            &self.year_path(config.year),
            config,
            "save yearly configuration",
        )
    }

    fn available_years(&self) -> EngineResult<Vec<i32>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| EngineError::PersistenceFailure {
            operation: "list configuration years".to_string(),
            message: e.to_string(),
        })?;
        let mut years: Vec<i32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "yaml") {
                    path.file_stem()?.to_str()?.parse::<i32>().ok()
                } else {
                    None
                }
            })
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    fn get_policy(&self, company_id: Uuid) -> EngineResult<Option<CompanyPayrollPolicy>> {
        let path = self.policy_path(company_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| EngineError::PersistenceFailure {
            operation: "read company policy".to_string(),
            message: e.to_string(),
        })?;
        let policy =
            serde_yaml::from_str(&content).map_err(|e| EngineError::PersistenceFailure {
                operation: "parse company policy".to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(policy))
    }

    fn save_policy(&self, policy: &CompanyPayrollPolicy) -> EngineResult<()> {
        Self::write_yaml(
            &self.policy_path(policy.company_id),
            policy,
            "save company policy",
        )
    }
}
