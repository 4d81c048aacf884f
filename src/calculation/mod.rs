//! Calculation rules for payroll liquidation.
//!
//! This module contains the pure calculation functions of the engine:
//! novedad classification, salary proration and transport allowance, the
//! contribution income base, employee statutory deductions, employer
//! contributions, and incapacity valuation. Every function here is
//! side-effect-free; persistence belongs to the services layer.

mod classifier;
mod deductions;
mod employer;
mod income_base;
mod incapacity;
mod proration;

pub use classifier::{
    Flow, NovedadClass, NovedadTotals, classify, is_constitutive, partition_novedades,
};
pub use deductions::{
    DeductionBackend, DeductionBreakdown, DeductionCalculator, DeductionInput, DeductionResult,
    compute_statutory_deductions,
};
pub use employer::{EmployerContributionsResult, calculate_employer_contributions};
pub use income_base::{IBC_CEILING_SMMLV, IncomeBaseResult, calculate_income_base};
pub use incapacity::{IncapacityValue, calculate_incapacity_value};
pub use proration::{prorate_salary, transport_allowance};

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to the nearest peso, half away from zero.
pub fn round_to_peso(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
