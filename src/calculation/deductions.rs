//! Employee-side statutory deduction calculation.
//!
//! This module computes health and pension deductions, the solidarity
//! pension fund and its high-earner companions, and withholding tax. The
//! arithmetic lives in one local function; a deployment may plug in a
//! primary [`DeductionBackend`] (for example a remote calculation
//! service), and the calculator falls back to the local algorithm when
//! that backend fails, recording which path produced the figures.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::calculation::round_to_peso;
use crate::config::YearlyConfiguration;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationPath, CalculationTrace, SolidarityDeductions};

/// Inputs to a deduction calculation.
#[derive(Debug, Clone)]
pub struct DeductionInput<'a> {
    /// The clipped contribution income base.
    pub ibc: Decimal,
    /// Gross pay for the period (salary + allowance + novedad earnings).
    pub gross_pay: Decimal,
    /// Full monthly base salary; solidarity brackets key on this.
    pub base_salary: Decimal,
    /// Sum of novedad-sourced deductions, passed through verbatim.
    pub novedad_deductions: Decimal,
    /// The yearly legal parameters in force.
    pub config: &'a YearlyConfiguration,
}

/// The itemized outcome of a deduction calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionBreakdown {
    /// Employee health deduction.
    pub health: Decimal,
    /// Employee pension deduction.
    pub pension: Decimal,
    /// Solidarity fund components.
    pub solidarity: SolidarityDeductions,
    /// Withholding tax.
    pub withholding_tax: Decimal,
    /// Novedad-sourced deductions, unchanged from the input.
    pub novedad_deductions: Decimal,
    /// Sum of everything above.
    pub total: Decimal,
}

/// A pluggable primary implementation of the deduction arithmetic.
///
/// Implementations must be numerically consistent with
/// [`compute_statutory_deductions`]; the trait exists so a deployment can
/// route the computation elsewhere, not so it can change the law.
pub trait DeductionBackend: Send + Sync {
    /// A short name for logs and traces.
    fn name(&self) -> &str;

    /// Computes the breakdown, or fails so the caller falls back.
    fn compute(&self, input: &DeductionInput<'_>) -> EngineResult<DeductionBreakdown>;
}

/// The authoritative local implementation of the deduction steps.
///
/// 1. Health and pension at the employee statutory rates on the IBC.
/// 2. Solidarity pension fund from the bracket table, keyed on the base
///    salary in minimum-wage multiples (zero below four).
/// 3. Flat additional-solidarity and subsistence contributions above
///    their thresholds, additive with the bracketed fund.
/// 4. Withholding tax on `gross - health - pension - solidarity`,
///    converted to UVT and taxed marginally above the bracket offset.
/// 5. Novedad-sourced deductions passed through verbatim.
pub fn compute_statutory_deductions(
    input: &DeductionInput<'_>,
) -> EngineResult<DeductionBreakdown> {
    if input.ibc < Decimal::ZERO {
        return Err(EngineError::negative_amount("ibc", input.ibc));
    }
    if input.gross_pay < Decimal::ZERO {
        return Err(EngineError::negative_amount("gross_pay", input.gross_pay));
    }
    if input.base_salary < Decimal::ZERO {
        return Err(EngineError::negative_amount(
            "base_salary",
            input.base_salary,
        ));
    }
    let config = input.config;

    let health = round_to_peso(input.ibc * config.rates.employee_health);
    let pension = round_to_peso(input.ibc * config.rates.employee_pension);

    let multiples = config.smmlv_multiples(input.base_salary);
    let fund = match config.solidarity_rate_for(multiples) {
        Some(rate) => round_to_peso(input.base_salary * rate),
        None => Decimal::ZERO,
    };
    let additional = if multiples >= config.additional_solidarity_from_smmlv {
        round_to_peso(input.base_salary * config.additional_solidarity_rate)
    } else {
        Decimal::ZERO
    };
    let subsistence = if multiples >= config.subsistence_from_smmlv {
        round_to_peso(input.base_salary * config.subsistence_rate)
    } else {
        Decimal::ZERO
    };
    let solidarity = SolidarityDeductions {
        fund,
        additional,
        subsistence,
    };

    let withholding_base =
        (input.gross_pay - health - pension - solidarity.total()).max(Decimal::ZERO);
    let base_uvt = withholding_base / config.uvt;
    let withholding_tax = match config.withholding_bracket_for(base_uvt) {
        Some(bracket) if bracket.marginal_rate > Decimal::ZERO => {
            let taxable_uvt = (base_uvt - bracket.base_offset_uvt).max(Decimal::ZERO);
            round_to_peso(taxable_uvt * bracket.marginal_rate * config.uvt)
        }
        _ => Decimal::ZERO,
    };

    let total = health + pension + solidarity.total() + withholding_tax + input.novedad_deductions;

    Ok(DeductionBreakdown {
        health,
        pension,
        solidarity,
        withholding_tax,
        novedad_deductions: input.novedad_deductions,
        total,
    })
}

/// The outcome of a deduction calculation, with its provenance.
#[derive(Debug, Clone)]
pub struct DeductionResult {
    /// The itemized deductions.
    pub breakdown: DeductionBreakdown,
    /// Which implementation produced the figures.
    pub path: CalculationPath,
    /// Why the primary backend was bypassed, when it was.
    pub fallback_reason: Option<String>,
    /// The audit trace for this calculation.
    pub trace: CalculationTrace,
}

/// Computes statutory deductions through a primary backend with a
/// mandatory local fallback.
#[derive(Clone)]
pub struct DeductionCalculator {
    backend: Option<Arc<dyn DeductionBackend>>,
}

impl DeductionCalculator {
    /// A calculator that runs the local algorithm directly.
    pub fn local() -> Self {
        Self { backend: None }
    }

    /// A calculator that prefers the given backend and falls back to the
    /// local algorithm when it fails.
    pub fn with_backend(backend: Arc<dyn DeductionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Runs the calculation, reporting which path produced the result.
    ///
    /// A backend failure is not an error for the caller: the local
    /// algorithm takes over and the result is flagged `LocalFallback` so
    /// the audit trail shows the primary path was unavailable.
    pub fn calculate(&self, input: &DeductionInput<'_>) -> EngineResult<DeductionResult> {
        let (breakdown, path, fallback_reason) = match &self.backend {
            Some(backend) => match backend.compute(input) {
                Ok(breakdown) => (breakdown, CalculationPath::Primary, None),
                Err(error) => {
                    let reason = format!("{} backend failed: {error}", backend.name());
                    tracing::warn!(%reason, "deduction backend unavailable, using local fallback");
                    (
                        compute_statutory_deductions(input)?,
                        CalculationPath::LocalFallback,
                        Some(reason),
                    )
                }
            },
            None => (
                compute_statutory_deductions(input)?,
                CalculationPath::Primary,
                None,
            ),
        };

        let trace = CalculationTrace {
            rule_id: "statutory_deductions".to_string(),
            rule_name: "Statutory Deductions".to_string(),
            input: serde_json::json!({
                "ibc": input.ibc.to_string(),
                "gross_pay": input.gross_pay.to_string(),
                "base_salary": input.base_salary.to_string(),
                "novedad_deductions": input.novedad_deductions.to_string(),
                "year": input.config.year,
            }),
            output: serde_json::json!({
                "health": breakdown.health.to_string(),
                "pension": breakdown.pension.to_string(),
                "solidarity_fund": breakdown.solidarity.fund.to_string(),
                "additional_solidarity": breakdown.solidarity.additional.to_string(),
                "subsistence_fund": breakdown.solidarity.subsistence.to_string(),
                "withholding_tax": breakdown.withholding_tax.to_string(),
                "total": breakdown.total.to_string(),
                "path": path,
                "fallback_reason": fallback_reason.clone(),
            }),
            reasoning: format!(
                "health {} + pension {} + solidarity {} + withholding {} + novedades {} = {}",
                breakdown.health,
                breakdown.pension,
                breakdown.solidarity.total(),
                breakdown.withholding_tax,
                breakdown.novedad_deductions,
                breakdown.total
            ),
        };

        Ok(DeductionResult {
            breakdown,
            path,
            fallback_reason,
            trace,
        })
    }
}
