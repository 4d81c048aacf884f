//! Per-employee payroll record model.
//!
//! This module contains the [`PayrollRecord`] produced by the liquidation
//! orchestrator for every (employee, period) pair, together with its
//! deduction and employer-contribution breakdown types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which implementation produced the statutory deduction figures.
///
/// The deduction calculator prefers its configured primary backend but
/// falls back to the bundled local algorithm when the backend is
/// unavailable. The path is recorded for audit either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationPath {
    /// The configured primary backend produced the figures.
    Primary,
    /// The primary backend failed; the local algorithm was used.
    LocalFallback,
}

/// The three solidarity-related deductions for high earners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidarityDeductions {
    /// Bracketed solidarity pension fund contribution (from 4 SMMLV).
    pub fund: Decimal,
    /// Flat additional solidarity contribution (from 16 SMMLV).
    pub additional: Decimal,
    /// Flat subsistence fund contribution (from 20 SMMLV).
    pub subsistence: Decimal,
}

impl SolidarityDeductions {
    /// An all-zero breakdown, for salaries below every threshold.
    pub fn zero() -> Self {
        Self {
            fund: Decimal::ZERO,
            additional: Decimal::ZERO,
            subsistence: Decimal::ZERO,
        }
    }

    /// Sum of the three components.
    pub fn total(&self) -> Decimal {
        self.fund + self.additional + self.subsistence
    }
}

/// Employer-side contributions and accruals for one employee record.
///
/// Contributions are percentages of the contribution base (the IBC);
/// benefit accruals additionally include the transport allowance in their
/// base as the severance rules require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerContributions {
    /// Employer health contribution.
    pub health: Decimal,
    /// Employer pension contribution.
    pub pension: Decimal,
    /// Occupational risk (ARL) contribution, by risk class.
    pub arl: Decimal,
    /// Family compensation fund contribution.
    pub family_fund: Decimal,
    /// ICBF contribution.
    pub icbf: Decimal,
    /// SENA contribution.
    pub sena: Decimal,
    /// Severance (cesantías) accrual.
    pub severance_accrual: Decimal,
    /// Interest on severance accrual.
    pub severance_interest_accrual: Decimal,
    /// Service bonus (prima) accrual.
    pub service_bonus_accrual: Decimal,
    /// Vacation accrual.
    pub vacation_accrual: Decimal,
}

impl EmployerContributions {
    /// Sum of every contribution and accrual.
    pub fn total(&self) -> Decimal {
        self.health
            + self.pension
            + self.arl
            + self.family_fund
            + self.icbf
            + self.sena
            + self.severance_accrual
            + self.severance_interest_accrual
            + self.service_bonus_accrual
            + self.vacation_accrual
    }
}

/// The liquidation result for one employee in one period.
///
/// Exactly one record exists per (employee, period) pair; re-liquidating
/// overwrites the previous record (upsert semantics keyed on that pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// The employee the record belongs to.
    pub employee_id: Uuid,
    /// The period the record belongs to.
    pub period_id: Uuid,
    /// The monthly base salary the liquidation used.
    pub base_salary_used: Decimal,
    /// Salary days accrued in the period.
    pub worked_days: u32,
    /// Salary prorated to the worked days.
    pub prorated_salary: Decimal,
    /// Transport allowance paid, zero above the two-minimum-wage cap.
    pub transport_allowance: Decimal,
    /// The income base for contributions after floor/ceiling clipping.
    pub ibc: Decimal,
    /// Employee health deduction.
    pub health_deduction: Decimal,
    /// Employee pension deduction.
    pub pension_deduction: Decimal,
    /// Solidarity-related deductions for high earners.
    pub solidarity_deductions: SolidarityDeductions,
    /// Withholding tax retained.
    pub withholding_tax: Decimal,
    /// Sum of novedad values classified as earnings.
    pub novedad_earnings: Decimal,
    /// Sum of novedad values classified as deductions.
    pub novedad_deductions: Decimal,
    /// Total pay before deductions.
    pub gross_pay: Decimal,
    /// Statutory plus novedad deductions.
    pub total_deductions: Decimal,
    /// Pay after all deductions.
    pub net_pay: Decimal,
    /// Employer-side contributions and accruals.
    pub employer_contributions: EmployerContributions,
    /// Which implementation produced the deduction figures.
    pub deduction_path: CalculationPath,
    /// Unresolved problems found while computing the record. A period
    /// cannot close while any record still carries entries here.
    #[serde(default)]
    pub validation_errors: Vec<String>,
    /// Payment voucher reference, when one has been issued.
    pub voucher_number: Option<String>,
}
