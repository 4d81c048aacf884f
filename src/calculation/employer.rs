//! Employer-side contribution calculation.
//!
//! Employer contributions (health, pension, ARL, family fund, ICBF,
//! SENA) are configured percentages of the contribution base — the same
//! clipped IBC the employee deductions use, which excludes the transport
//! allowance. Benefit accruals (severance, its interest, service bonus,
//! vacation) additionally include the transport allowance in their base,
//! as the severance rules require.

use rust_decimal::Decimal;

use crate::calculation::round_to_peso;
use crate::config::YearlyConfiguration;
use crate::error::{EngineError, EngineResult};
use crate::models::{ArlRiskClass, CalculationTrace, EmployerContributions};

/// The result of an employer contribution calculation.
#[derive(Debug, Clone)]
pub struct EmployerContributionsResult {
    /// The itemized contributions and accruals.
    pub contributions: EmployerContributions,
    /// The audit trace for this calculation.
    pub trace: CalculationTrace,
}

/// Computes employer contributions and benefit accruals.
pub fn calculate_employer_contributions(
    ibc: Decimal,
    transport_allowance: Decimal,
    risk_class: ArlRiskClass,
    config: &YearlyConfiguration,
) -> EngineResult<EmployerContributionsResult> {
    if ibc < Decimal::ZERO {
        return Err(EngineError::negative_amount("ibc", ibc));
    }
    if transport_allowance < Decimal::ZERO {
        return Err(EngineError::negative_amount(
            "transport_allowance",
            transport_allowance,
        ));
    }

    let rates = &config.rates;
    let arl_rate = config.arl_risk_rates.rate_for(risk_class);
    // Vacation accrual excludes the allowance: transport is not paid
    // while on vacation.
    let benefit_base = ibc + transport_allowance;

    let contributions = EmployerContributions {
        health: round_to_peso(ibc * rates.employer_health),
        pension: round_to_peso(ibc * rates.employer_pension),
        arl: round_to_peso(ibc * arl_rate),
        family_fund: round_to_peso(ibc * rates.family_fund),
        icbf: round_to_peso(ibc * rates.icbf),
        sena: round_to_peso(ibc * rates.sena),
        severance_accrual: round_to_peso(benefit_base * rates.severance),
        severance_interest_accrual: round_to_peso(benefit_base * rates.severance_interest),
        service_bonus_accrual: round_to_peso(benefit_base * rates.service_bonus),
        vacation_accrual: round_to_peso(ibc * rates.vacation),
    };

    let trace = CalculationTrace {
        rule_id: "employer_contributions".to_string(),
        rule_name: "Employer Contributions".to_string(),
        input: serde_json::json!({
            "ibc": ibc.to_string(),
            "transport_allowance": transport_allowance.to_string(),
            "risk_class": risk_class,
            "arl_rate": arl_rate.to_string(),
            "year": config.year,
        }),
        output: serde_json::json!({
            "health": contributions.health.to_string(),
            "pension": contributions.pension.to_string(),
            "arl": contributions.arl.to_string(),
            "family_fund": contributions.family_fund.to_string(),
            "icbf": contributions.icbf.to_string(),
            "sena": contributions.sena.to_string(),
            "total": contributions.total().to_string(),
        }),
        reasoning: format!(
            "contributions on base {ibc}, accruals on base {benefit_base}, ARL class {risk_class:?} at {arl_rate}"
        ),
    };

    Ok(EmployerContributionsResult {
        contributions,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_contribution_percentages_on_the_base() {
        let config = defaults::for_year(2025);
        let result = calculate_employer_contributions(
            dec("2000000"),
            Decimal::ZERO,
            ArlRiskClass::I,
            &config,
        )
        .unwrap();

        assert_eq!(result.contributions.health, dec("170000"));
        assert_eq!(result.contributions.pension, dec("240000"));
        assert_eq!(result.contributions.family_fund, dec("80000"));
        assert_eq!(result.contributions.icbf, dec("60000"));
        assert_eq!(result.contributions.sena, dec("40000"));
        assert_eq!(result.contributions.arl, dec("10440"));
    }

    #[test]
    fn test_arl_rate_follows_risk_class() {
        let config = defaults::for_year(2025);
        let base = dec("1000000");
        let class_i =
            calculate_employer_contributions(base, Decimal::ZERO, ArlRiskClass::I, &config)
                .unwrap();
        let class_v =
            calculate_employer_contributions(base, Decimal::ZERO, ArlRiskClass::V, &config)
                .unwrap();

        assert_eq!(class_i.contributions.arl, dec("5220"));
        assert_eq!(class_v.contributions.arl, dec("69600"));
    }

    #[test]
    fn test_accruals_include_transport_allowance() {
        let config = defaults::for_year(2025);
        let without = calculate_employer_contributions(
            dec("1423500"),
            Decimal::ZERO,
            ArlRiskClass::I,
            &config,
        )
        .unwrap();
        let with = calculate_employer_contributions(
            dec("1423500"),
            dec("200000"),
            ArlRiskClass::I,
            &config,
        )
        .unwrap();

        assert!(with.contributions.severance_accrual > without.contributions.severance_accrual);
        assert!(
            with.contributions.service_bonus_accrual > without.contributions.service_bonus_accrual
        );
        // Contributions proper are unaffected by the allowance.
        assert_eq!(with.contributions.health, without.contributions.health);
        assert_eq!(with.contributions.vacation_accrual, without.contributions.vacation_accrual);
    }

    #[test]
    fn test_negative_base_rejected() {
        let config = defaults::for_year(2025);
        assert!(
            calculate_employer_contributions(dec("-1"), Decimal::ZERO, ArlRiskClass::I, &config)
                .is_err()
        );
    }
}
