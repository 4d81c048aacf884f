//! Hard-coded statutory defaults per year.
//!
//! The configuration store falls back to these values when the backing
//! store has no persisted record for a year, then lazily persists them.
//! Years after the last known table reuse the most recent one; years
//! before the first known table reuse the earliest.

use rust_decimal::Decimal;

use super::types::{
    ArlRiskRates, ContributionRates, SolidarityBracket, WithholdingBracket, YearlyConfiguration,
};

/// Years with a dedicated statutory table.
pub fn known_years() -> Vec<i32> {
    vec![2024, 2025]
}

/// Returns the statutory defaults for a year.
///
/// Unknown years borrow the closest known table, with the `year` field
/// set to the requested year so the caller can tell what was served.
pub fn for_year(year: i32) -> YearlyConfiguration {
    let mut config = if year >= 2025 {
        config_2025()
    } else {
        config_2024()
    };
    config.year = year;
    config
}

fn config_2025() -> YearlyConfiguration {
    YearlyConfiguration {
        year: 2025,
        minimum_wage: Decimal::new(1_423_500, 0),
        transport_allowance: Decimal::new(200_000, 0),
        uvt: Decimal::new(49_799, 0),
        rates: statutory_rates(),
        solidarity_brackets: solidarity_brackets(),
        additional_solidarity_from_smmlv: Decimal::from(16),
        additional_solidarity_rate: Decimal::new(2, 3),
        subsistence_from_smmlv: Decimal::from(20),
        subsistence_rate: Decimal::new(2, 3),
        withholding_brackets: withholding_brackets(),
        arl_risk_rates: arl_risk_rates(),
    }
}

fn config_2024() -> YearlyConfiguration {
    YearlyConfiguration {
        year: 2024,
        minimum_wage: Decimal::new(1_300_000, 0),
        transport_allowance: Decimal::new(162_000, 0),
        uvt: Decimal::new(47_065, 0),
        rates: statutory_rates(),
        solidarity_brackets: solidarity_brackets(),
        additional_solidarity_from_smmlv: Decimal::from(16),
        additional_solidarity_rate: Decimal::new(2, 3),
        subsistence_from_smmlv: Decimal::from(20),
        subsistence_rate: Decimal::new(2, 3),
        withholding_brackets: withholding_brackets(),
        arl_risk_rates: arl_risk_rates(),
    }
}

fn statutory_rates() -> ContributionRates {
    ContributionRates {
        employee_health: Decimal::new(4, 2),
        employee_pension: Decimal::new(4, 2),
        employer_health: Decimal::new(85, 3),
        employer_pension: Decimal::new(12, 2),
        family_fund: Decimal::new(4, 2),
        icbf: Decimal::new(3, 2),
        sena: Decimal::new(2, 2),
        severance: Decimal::new(833, 4),
        severance_interest: Decimal::new(1, 2),
        service_bonus: Decimal::new(833, 4),
        vacation: Decimal::new(417, 4),
    }
}

fn solidarity_brackets() -> Vec<SolidarityBracket> {
    vec![
        bracket(4, Some(16), Decimal::new(1, 2)),
        bracket(16, Some(17), Decimal::new(12, 3)),
        bracket(17, Some(18), Decimal::new(14, 3)),
        bracket(18, Some(19), Decimal::new(16, 3)),
        bracket(19, Some(20), Decimal::new(18, 3)),
        bracket(20, None, Decimal::new(2, 2)),
    ]
}

fn bracket(min: u32, max: Option<u32>, rate: Decimal) -> SolidarityBracket {
    SolidarityBracket {
        min_smmlv: Decimal::from(min),
        max_smmlv: max.map(Decimal::from),
        rate,
    }
}

fn withholding_brackets() -> Vec<WithholdingBracket> {
    vec![
        withholding_row(0, Some(95), Decimal::ZERO),
        withholding_row(95, Some(150), Decimal::new(19, 2)),
        withholding_row(150, Some(360), Decimal::new(28, 2)),
        withholding_row(360, Some(640), Decimal::new(33, 2)),
        withholding_row(640, Some(945), Decimal::new(35, 2)),
        withholding_row(945, Some(2300), Decimal::new(37, 2)),
        withholding_row(2300, None, Decimal::new(39, 2)),
    ]
}

fn withholding_row(min: u32, max: Option<u32>, rate: Decimal) -> WithholdingBracket {
    WithholdingBracket {
        min_uvt: Decimal::from(min),
        max_uvt: max.map(Decimal::from),
        marginal_rate: rate,
        base_offset_uvt: Decimal::from(min),
    }
}

fn arl_risk_rates() -> ArlRiskRates {
    ArlRiskRates {
        class_i: Decimal::new(522, 5),
        class_ii: Decimal::new(1044, 5),
        class_iii: Decimal::new(2436, 5),
        class_iv: Decimal::new(435, 4),
        class_v: Decimal::new(696, 4),
    }
}
