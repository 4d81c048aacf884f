//! Employee model and related types.
//!
//! This module defines the Employee struct and its supporting enums for
//! representing workers subject to payroll liquidation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The contract modality under which an employee works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Open-ended employment contract.
    Indefinite,
    /// Fixed-term employment contract.
    FixedTerm,
    /// Apprenticeship (SENA) contract.
    Apprenticeship,
    /// Services contract (contractor, pays own contributions).
    Services,
}

/// The current standing of an employee within the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Employed and included in payroll runs.
    Active,
    /// No longer employed; excluded from payroll runs.
    Inactive,
    /// Temporarily away (unpaid license, suspension).
    OnLeave,
}

/// The occupational risk class the employee is insured under.
///
/// Classes run from I (administrative work) to V (high-risk work) and
/// select the ARL contribution rate from the yearly configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArlRiskClass {
    /// Class I — minimal risk.
    I,
    /// Class II — low risk.
    II,
    /// Class III — medium risk.
    III,
    /// Class IV — high risk.
    IV,
    /// Class V — maximum risk.
    V,
}

/// Represents an employee subject to payroll liquidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: Uuid,
    /// The company the employee belongs to.
    pub company_id: Uuid,
    /// The employee's full name.
    pub full_name: String,
    /// Monthly base salary.
    pub base_salary: Decimal,
    /// The contract modality.
    pub contract_type: ContractType,
    /// Identifier of the health insurer (EPS) the employee is affiliated to.
    pub health_insurer: String,
    /// Identifier of the pension fund the employee is affiliated to.
    pub pension_fund: String,
    /// The occupational risk class for ARL contributions.
    pub arl_risk_class: ArlRiskClass,
    /// The employee's current standing.
    pub status: EmployeeStatus,
}

impl Employee {
    /// Returns the daily-equivalent salary (`base_salary / 30`).
    ///
    /// Colombian payroll arithmetic uses a 30-day commercial month
    /// regardless of the calendar length of the month.
    pub fn daily_salary(&self) -> Decimal {
        self.base_salary / Decimal::from(30)
    }

    /// Returns true if the employee is included in payroll runs.
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}
