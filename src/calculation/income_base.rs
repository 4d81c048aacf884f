//! Contribution income base (IBC) calculation.
//!
//! The IBC is the salary base statutory health and pension deductions are
//! computed on: the contribution salary plus every constitutive novedad
//! earning, clipped to the legal floor (one minimum wage) and ceiling
//! (twenty-five minimum wages).

use rust_decimal::Decimal;

use crate::calculation::classifier::{self, Flow};
use crate::config::YearlyConfiguration;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationTrace, Novedad};

/// The ceiling of the contribution base, in minimum-wage multiples.
pub const IBC_CEILING_SMMLV: u32 = 25;

/// The result of a contribution base calculation.
#[derive(Debug, Clone)]
pub struct IncomeBaseResult {
    /// The clipped contribution base.
    pub ibc: Decimal,
    /// The base before clipping, kept for audit.
    pub ibc_raw: Decimal,
    /// Sum of constitutive novedad earnings that entered the base.
    pub constitutive_total: Decimal,
    /// Whether the legal floor raised the base.
    pub floor_applied: bool,
    /// Whether the legal ceiling lowered the base.
    pub ceiling_applied: bool,
    /// The audit trace for this calculation.
    pub trace: CalculationTrace,
}

/// Computes the contribution income base.
///
/// `contribution_salary` is the salary the company policy feeds into the
/// base: prorated to worked days under the proportional mode, or the full
/// monthly salary otherwise. Only novedades that are earnings *and*
/// constitutive (by default or by override) are added; non-constitutive
/// earnings raise gross pay but never the base.
///
/// # Errors
///
/// Returns a `Validation` error for a negative contribution salary or a
/// negative novedad value.
pub fn calculate_income_base(
    contribution_salary: Decimal,
    novedades: &[Novedad],
    config: &YearlyConfiguration,
) -> EngineResult<IncomeBaseResult> {
    if contribution_salary < Decimal::ZERO {
        return Err(EngineError::negative_amount(
            "contribution_salary",
            contribution_salary,
        ));
    }
    if let Some(negative) = novedades.iter().find(|n| n.value < Decimal::ZERO) {
        return Err(EngineError::negative_amount(
            "novedad.value",
            negative.value,
        ));
    }

    let constitutive_total: Decimal = novedades
        .iter()
        .filter(|n| classifier::classify(&n.kind).flow == Flow::Earning)
        .filter(|n| classifier::is_constitutive(n))
        .map(|n| n.value)
        .sum();

    let ibc_raw = contribution_salary + constitutive_total;
    let floor = config.minimum_wage;
    let ceiling = config.minimum_wage * Decimal::from(IBC_CEILING_SMMLV);

    let (ibc, floor_applied, ceiling_applied) = if ibc_raw < floor {
        (floor, true, false)
    } else if ibc_raw > ceiling {
        (ceiling, false, true)
    } else {
        (ibc_raw, false, false)
    };

    let trace = CalculationTrace {
        rule_id: "income_base".to_string(),
        rule_name: "Contribution Income Base".to_string(),
        input: serde_json::json!({
            "contribution_salary": contribution_salary.to_string(),
            "constitutive_total": constitutive_total.to_string(),
            "floor": floor.to_string(),
            "ceiling": ceiling.to_string(),
        }),
        output: serde_json::json!({
            "ibc_raw": ibc_raw.to_string(),
            "ibc": ibc.to_string(),
            "floor_applied": floor_applied,
            "ceiling_applied": ceiling_applied,
        }),
        reasoning: format!(
            "{} + {} = {}, clipped to [{}, {}] -> {}",
            contribution_salary, constitutive_total, ibc_raw, floor, ceiling, ibc
        ),
    };

    Ok(IncomeBaseResult {
        ibc,
        ibc_raw,
        constitutive_total,
        floor_applied,
        ceiling_applied,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use crate::models::NovedadKind;
    use proptest::prelude::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config() -> YearlyConfiguration {
        defaults::for_year(2025)
    }

    fn novedad(kind: NovedadKind, value: Decimal) -> Novedad {
        Novedad::manual(Uuid::new_v4(), Uuid::new_v4(), kind, value, "test")
    }

    #[test]
    fn test_base_without_novedades_is_the_salary() {
        let result = calculate_income_base(dec("1423500"), &[], &config()).unwrap();
        assert_eq!(result.ibc, dec("1423500"));
        assert_eq!(result.ibc_raw, dec("1423500"));
        assert!(!result.floor_applied);
        assert!(!result.ceiling_applied);
    }

    #[test]
    fn test_constitutive_earnings_raise_the_base() {
        let novedades = vec![
            novedad(NovedadKind::Overtime, dec("120000")),
            novedad(NovedadKind::Bonus, dec("80000")),
        ];
        let result = calculate_income_base(dec("2000000"), &novedades, &config()).unwrap();
        assert_eq!(result.constitutive_total, dec("200000"));
        assert_eq!(result.ibc, dec("2200000"));
    }

    #[test]
    fn test_non_constitutive_earnings_do_not_raise_the_base() {
        let novedades = vec![novedad(
            NovedadKind::Incapacity {
                subtype: crate::models::IncapacitySubtype::General,
            },
            dec("300000"),
        )];
        let result = calculate_income_base(dec("2000000"), &novedades, &config()).unwrap();
        assert_eq!(result.constitutive_total, Decimal::ZERO);
        assert_eq!(result.ibc, dec("2000000"));
    }

    #[test]
    fn test_deduction_novedades_never_enter_the_base() {
        let novedades = vec![novedad(NovedadKind::Loan, dec("500000"))];
        let result = calculate_income_base(dec("2000000"), &novedades, &config()).unwrap();
        assert_eq!(result.ibc, dec("2000000"));
    }

    #[test]
    fn test_floor_applies_below_minimum_wage() {
        let result = calculate_income_base(dec("700000"), &[], &config()).unwrap();
        assert_eq!(result.ibc, dec("1423500"));
        assert_eq!(result.ibc_raw, dec("700000"));
        assert!(result.floor_applied);
        assert!(!result.ceiling_applied);
    }

    #[test]
    fn test_ceiling_applies_above_twenty_five_wages() {
        let salary = dec("1423500") * dec("30");
        let result = calculate_income_base(salary, &[], &config()).unwrap();
        assert_eq!(result.ibc, dec("1423500") * dec("25"));
        assert!(result.ceiling_applied);
        assert!(!result.floor_applied);
        assert_eq!(result.ibc_raw, salary);
    }

    #[test]
    fn test_override_pulls_earning_into_the_base() {
        let mut incapacity = novedad(
            NovedadKind::Incapacity {
                subtype: crate::models::IncapacitySubtype::General,
            },
            dec("100000"),
        );
        incapacity.constitutive_override = Some(true);
        let result = calculate_income_base(dec("2000000"), &[incapacity], &config()).unwrap();
        assert_eq!(result.ibc, dec("2100000"));
    }

    #[test]
    fn test_negative_salary_rejected() {
        let result = calculate_income_base(dec("-1"), &[], &config());
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_trace_records_clipping() {
        let result = calculate_income_base(dec("700000"), &[], &config()).unwrap();
        assert_eq!(result.trace.rule_id, "income_base");
        assert_eq!(result.trace.output["floor_applied"], true);
    }

    proptest! {
        /// The base always lands inside the legal band.
        #[test]
        fn prop_ibc_is_always_clipped(salary in 0u64..100_000_000_000, extra in 0u64..10_000_000_000) {
            let config = config();
            let novedades = vec![novedad(NovedadKind::Overtime, Decimal::from(extra))];
            let result =
                calculate_income_base(Decimal::from(salary), &novedades, &config).unwrap();
            let floor = config.minimum_wage;
            let ceiling = config.minimum_wage * Decimal::from(25);
            prop_assert!(result.ibc >= floor);
            prop_assert!(result.ibc <= ceiling);
        }

        /// The base never decreases when constitutive earnings grow.
        #[test]
        fn prop_ibc_monotonic_in_constitutive_earnings(
            salary in 1_423_500u64..40_000_000,
            smaller in 0u64..5_000_000,
            delta in 0u64..5_000_000,
        ) {
            let config = config();
            let with_smaller = calculate_income_base(
                Decimal::from(salary),
                &[novedad(NovedadKind::Overtime, Decimal::from(smaller))],
                &config,
            )
            .unwrap();
            let with_larger = calculate_income_base(
                Decimal::from(salary),
                &[novedad(NovedadKind::Overtime, Decimal::from(smaller + delta))],
                &config,
            )
            .unwrap();
            prop_assert!(with_larger.ibc >= with_smaller.ibc);
        }
    }
}
