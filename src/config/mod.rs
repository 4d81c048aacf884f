//! Yearly legal parameters and company payroll policy.
//!
//! This module contains the versioned configuration model, the statutory
//! defaults, the TTL-cached configuration store, and the file-backed
//! configuration repository.

pub mod defaults;
mod loader;
mod store;
mod types;

pub use loader::YamlConfigurationRepository;
pub use store::{ConfigurationStore, DEFAULT_CACHE_TTL};
pub use types::{
    ArlRiskRates, CompanyPayrollPolicy, ContributionRates, IbcMode, IncapacityPolicy,
    SolidarityBracket, WithholdingBracket, YearlyConfiguration,
};
