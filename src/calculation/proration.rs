//! Salary proration and transport allowance.
//!
//! Proration uses the 30-day commercial month: an employee accrues
//! `base_salary / 30` per worked day regardless of the calendar length of
//! the month. The transport allowance is prorated the same way but only
//! paid to employees earning up to two minimum wages.

use rust_decimal::Decimal;

use crate::calculation::round_to_peso;
use crate::config::YearlyConfiguration;
use crate::error::{EngineError, EngineResult};

/// Prorates a monthly salary to the days worked in the period.
///
/// # Errors
///
/// Returns a `Validation` error for a negative salary or a day count
/// above 31.
pub fn prorate_salary(base_salary: Decimal, worked_days: u32) -> EngineResult<Decimal> {
    if base_salary < Decimal::ZERO {
        return Err(EngineError::negative_amount("base_salary", base_salary));
    }
    if worked_days > 31 {
        return Err(EngineError::validation(
            "worked_days",
            format!("cannot exceed 31 (was {worked_days})"),
        ));
    }
    Ok(round_to_peso(
        base_salary / Decimal::from(30) * Decimal::from(worked_days),
    ))
}

/// Computes the transport allowance for the period.
///
/// Employees earning more than two minimum wages receive nothing; the
/// rest receive the yearly allowance prorated to their worked days.
pub fn transport_allowance(
    base_salary: Decimal,
    worked_days: u32,
    config: &YearlyConfiguration,
) -> EngineResult<Decimal> {
    if base_salary < Decimal::ZERO {
        return Err(EngineError::negative_amount("base_salary", base_salary));
    }
    if base_salary > config.minimum_wage * Decimal::from(2) {
        return Ok(Decimal::ZERO);
    }
    Ok(round_to_peso(
        config.transport_allowance / Decimal::from(30) * Decimal::from(worked_days),
    ))
}
