//! Configuration types for payroll calculation.
//!
//! This module contains the strongly-typed yearly legal parameters
//! (minimum wage, tax unit, contribution rates, bracket tables) and the
//! per-company payroll policy. Yearly configurations are versioned by
//! year and never mutated in place: a correction is a new version saved
//! through the configuration store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::ArlRiskClass;

/// Statutory contribution percentages, employee and employer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRates {
    /// Employee health contribution rate.
    pub employee_health: Decimal,
    /// Employee pension contribution rate.
    pub employee_pension: Decimal,
    /// Employer health contribution rate.
    pub employer_health: Decimal,
    /// Employer pension contribution rate.
    pub employer_pension: Decimal,
    /// Family compensation fund (caja) rate.
    pub family_fund: Decimal,
    /// ICBF rate.
    pub icbf: Decimal,
    /// SENA rate.
    pub sena: Decimal,
    /// Severance (cesantías) accrual rate.
    pub severance: Decimal,
    /// Interest-on-severance accrual rate.
    pub severance_interest: Decimal,
    /// Service bonus (prima) accrual rate.
    pub service_bonus: Decimal,
    /// Vacation accrual rate.
    pub vacation: Decimal,
}

/// One row of the solidarity pension fund bracket table.
///
/// Brackets are half-open ranges over base-salary multiples of the
/// minimum wage: a salary of exactly `max_smmlv` multiples falls in the
/// next bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidarityBracket {
    /// Lower bound in minimum-wage multiples (inclusive).
    pub min_smmlv: Decimal,
    /// Upper bound in minimum-wage multiples (exclusive); `None` is open.
    pub max_smmlv: Option<Decimal>,
    /// Contribution rate applied to the base salary.
    pub rate: Decimal,
}

/// One row of the monthly withholding-tax bracket table.
///
/// Ranges are half-open and expressed in UVT units of the withholding
/// base. The tax is `(base_uvt - base_offset_uvt) * marginal_rate * uvt`,
/// floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingBracket {
    /// Lower bound in UVT (inclusive).
    pub min_uvt: Decimal,
    /// Upper bound in UVT (exclusive); `None` is open.
    pub max_uvt: Option<Decimal>,
    /// Marginal rate for the portion above the offset.
    pub marginal_rate: Decimal,
    /// UVT offset subtracted from the base before applying the rate.
    pub base_offset_uvt: Decimal,
}

/// ARL contribution rates by occupational risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArlRiskRates {
    /// Rate for risk class I.
    pub class_i: Decimal,
    /// Rate for risk class II.
    pub class_ii: Decimal,
    /// Rate for risk class III.
    pub class_iii: Decimal,
    /// Rate for risk class IV.
    pub class_iv: Decimal,
    /// Rate for risk class V.
    pub class_v: Decimal,
}

impl ArlRiskRates {
    /// Looks up the rate for a risk class.
    pub fn rate_for(&self, class: ArlRiskClass) -> Decimal {
        match class {
            ArlRiskClass::I => self.class_i,
            ArlRiskClass::II => self.class_ii,
            ArlRiskClass::III => self.class_iii,
            ArlRiskClass::IV => self.class_iv,
            ArlRiskClass::V => self.class_v,
        }
    }
}

/// The legal payroll parameters for one year.
///
/// A configuration referenced by a closed period's totals is immutable;
/// corrections create a new version through the configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyConfiguration {
    /// The calendar year these parameters apply to.
    pub year: i32,
    /// Monthly legal minimum wage (SMMLV).
    pub minimum_wage: Decimal,
    /// Monthly transport allowance for salaries up to two minimum wages.
    pub transport_allowance: Decimal,
    /// Tax unit value (UVT) for withholding brackets.
    pub uvt: Decimal,
    /// Employee and employer contribution percentages.
    pub rates: ContributionRates,
    /// Ordered solidarity pension fund brackets.
    pub solidarity_brackets: Vec<SolidarityBracket>,
    /// Minimum-wage multiple from which the flat additional solidarity
    /// contribution applies.
    pub additional_solidarity_from_smmlv: Decimal,
    /// Flat additional solidarity contribution rate.
    pub additional_solidarity_rate: Decimal,
    /// Minimum-wage multiple from which the flat subsistence fund
    /// contribution applies.
    pub subsistence_from_smmlv: Decimal,
    /// Flat subsistence fund contribution rate.
    pub subsistence_rate: Decimal,
    /// Ordered monthly withholding-tax brackets.
    pub withholding_brackets: Vec<WithholdingBracket>,
    /// ARL rates by risk class.
    pub arl_risk_rates: ArlRiskRates,
}

impl YearlyConfiguration {
    /// Checks the configuration for internal consistency.
    ///
    /// Rejects non-positive wage/allowance/UVT values and bracket tables
    /// that are unordered or overlapping.
    pub fn validate(&self) -> EngineResult<()> {
        if self.minimum_wage <= Decimal::ZERO {
            return Err(self.invalid("minimum_wage must be positive"));
        }
        if self.transport_allowance < Decimal::ZERO {
            return Err(self.invalid("transport_allowance cannot be negative"));
        }
        if self.uvt <= Decimal::ZERO {
            return Err(self.invalid("uvt must be positive"));
        }
        Self::check_brackets(
            self.solidarity_brackets
                .iter()
                .map(|b| (b.min_smmlv, b.max_smmlv)),
        )
        .map_err(|m| self.invalid(format!("solidarity_brackets {m}")))?;
        Self::check_brackets(
            self.withholding_brackets
                .iter()
                .map(|b| (b.min_uvt, b.max_uvt)),
        )
        .map_err(|m| self.invalid(format!("withholding_brackets {m}")))?;
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> EngineError {
        EngineError::Configuration {
            year: self.year,
            message: message.into(),
        }
    }

    fn check_brackets(
        rows: impl Iterator<Item = (Decimal, Option<Decimal>)>,
    ) -> Result<(), String> {
        let mut previous_max: Option<Option<Decimal>> = None;
        for (index, (min, max)) in rows.enumerate() {
            if let Some(max) = max {
                if max <= min {
                    return Err(format!("row {index} has max <= min"));
                }
            }
            if let Some(prev) = previous_max {
                match prev {
                    // An open-ended row must be the last one.
                    None => return Err(format!("row {index} follows an open-ended row")),
                    Some(prev_max) => {
                        if min < prev_max {
                            return Err(format!("row {index} overlaps the previous row"));
                        }
                    }
                }
            }
            previous_max = Some(max);
        }
        Ok(())
    }

    /// Expresses a monthly salary as minimum-wage multiples.
    pub fn smmlv_multiples(&self, salary: Decimal) -> Decimal {
        salary / self.minimum_wage
    }

    /// Finds the solidarity bracket rate for a salary expressed in
    /// minimum-wage multiples, if any bracket matches.
    pub fn solidarity_rate_for(&self, multiples: Decimal) -> Option<Decimal> {
        self.solidarity_brackets
            .iter()
            .find(|b| multiples >= b.min_smmlv && b.max_smmlv.is_none_or(|max| multiples < max))
            .map(|b| b.rate)
    }

    /// Finds the withholding bracket containing a base expressed in UVT.
    pub fn withholding_bracket_for(&self, base_uvt: Decimal) -> Option<&WithholdingBracket> {
        self.withholding_brackets
            .iter()
            .find(|b| base_uvt >= b.min_uvt && b.max_uvt.is_none_or(|max| base_uvt < max))
    }
}

/// How the contribution base treats partial-period salaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IbcMode {
    /// The contribution base starts from the salary prorated to worked
    /// days.
    Proportional,
    /// The contribution base starts from the full monthly salary
    /// regardless of days worked.
    FullSalary,
}

/// Which sick-leave payment rule a company applies to general incapacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncapacityPolicy {
    /// First two days at full salary, the rest at two thirds with a
    /// daily minimum-wage floor.
    Standard2DayFullRestAtTwoThirds,
    /// Every day at two thirds with a daily minimum-wage floor.
    FromDay1AtTwoThirdsWithFloor,
}

/// Company-wide payroll policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyPayrollPolicy {
    /// The company the policy applies to.
    pub company_id: Uuid,
    /// How the contribution base treats partial periods.
    pub ibc_mode: IbcMode,
    /// Which sick-leave rule applies to general incapacity.
    pub incapacity_policy: IncapacityPolicy,
}

impl CompanyPayrollPolicy {
    /// The policy applied when a company has never configured one.
    pub fn default_for(company_id: Uuid) -> Self {
        Self {
            company_id,
            ibc_mode: IbcMode::Proportional,
            incapacity_policy: IncapacityPolicy::Standard2DayFullRestAtTwoThirds,
        }
    }
}
