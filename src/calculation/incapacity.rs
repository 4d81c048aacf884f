//! Sick-leave (incapacity) value calculation.
//!
//! The value of an incapacity novedad depends only on the daily salary,
//! the day count, the subtype, the company policy, and the minimum wage
//! in force — a pure function, so stored values can be recomputed during
//! audits and policy backfills and compared against what was paid.

use rust_decimal::Decimal;

use crate::calculation::round_to_peso;
use crate::config::IncapacityPolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationTrace, IncapacitySubtype};

/// The result of an incapacity value calculation.
#[derive(Debug, Clone)]
pub struct IncapacityValue {
    /// The total value, rounded to the nearest peso.
    pub value: Decimal,
    /// Days paid at the full daily salary.
    pub full_pay_days: u32,
    /// Days paid at the reduced (two-thirds, floored) daily rate.
    pub reduced_pay_days: u32,
    /// The full daily rate used.
    pub daily_full: Decimal,
    /// The reduced daily rate used (zero when no reduced days).
    pub daily_reduced: Decimal,
    /// Whether the daily minimum-wage floor lifted the reduced rate.
    pub floor_applied: bool,
    /// The audit trace for this calculation.
    pub trace: CalculationTrace,
}

/// Computes the pay value of an incapacity.
///
/// - `Occupational`: every day at 100% of the daily salary, regardless of
///   policy (the risk insurer pays from day one).
/// - `General` under the standard policy: the first two days at 100%,
///   the rest at two thirds with a daily minimum-wage floor.
/// - `General` under the from-day-one policy: every day at two thirds
///   with the same floor.
///
/// # Errors
///
/// Returns a `Validation` error for a negative daily salary or minimum
/// wage.
pub fn calculate_incapacity_value(
    daily_salary: Decimal,
    days: u32,
    subtype: IncapacitySubtype,
    policy: IncapacityPolicy,
    minimum_wage: Decimal,
) -> EngineResult<IncapacityValue> {
    if daily_salary < Decimal::ZERO {
        return Err(EngineError::negative_amount("daily_salary", daily_salary));
    }
    if minimum_wage <= Decimal::ZERO {
        return Err(EngineError::validation(
            "minimum_wage",
            "must be positive",
        ));
    }

    let daily_floor = minimum_wage / Decimal::from(30);
    let two_thirds = daily_salary * Decimal::from(2) / Decimal::from(3);
    let reduced_daily = two_thirds.max(daily_floor);
    let floor_lifts = daily_floor > two_thirds;

    let (full_pay_days, reduced_pay_days) = match (subtype, policy) {
        (IncapacitySubtype::Occupational, _) => (days, 0),
        (IncapacitySubtype::General, IncapacityPolicy::Standard2DayFullRestAtTwoThirds) => {
            let full = days.min(2);
            (full, days - full)
        }
        (IncapacitySubtype::General, IncapacityPolicy::FromDay1AtTwoThirdsWithFloor) => (0, days),
    };

    let daily_reduced = if reduced_pay_days > 0 {
        reduced_daily
    } else {
        Decimal::ZERO
    };
    let floor_applied = reduced_pay_days > 0 && floor_lifts;
    let raw = daily_salary * Decimal::from(full_pay_days)
        + daily_reduced * Decimal::from(reduced_pay_days);
    let value = round_to_peso(raw);

    let trace = CalculationTrace {
        rule_id: "incapacity_value".to_string(),
        rule_name: "Incapacity Value".to_string(),
        input: serde_json::json!({
            "daily_salary": daily_salary.to_string(),
            "days": days,
            "subtype": subtype,
            "policy": policy,
            "minimum_wage": minimum_wage.to_string(),
        }),
        output: serde_json::json!({
            "value": value.to_string(),
            "full_pay_days": full_pay_days,
            "reduced_pay_days": reduced_pay_days,
            "daily_reduced": daily_reduced.to_string(),
            "floor_applied": floor_applied,
        }),
        reasoning: format!(
            "{full_pay_days} day(s) at {daily_salary} + {reduced_pay_days} day(s) at {daily_reduced} = {value}"
        ),
    };

    Ok(IncapacityValue {
        value,
        full_pay_days,
        reduced_pay_days,
        daily_full: daily_salary,
        daily_reduced,
        floor_applied,
        trace,
    })
}
