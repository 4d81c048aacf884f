//! Novedad classification.
//!
//! This module maps each novedad kind to its side of the ledger (earning
//! or deduction) and to its default salary-constitutive treatment, both
//! fixed legal tables. A per-record override flag can flip the
//! constitutive default; unrecognized kinds are excluded from all totals
//! rather than guessed at.

use rust_decimal::Decimal;

use crate::models::{Novedad, NovedadKind};

/// The side of the payroll ledger a novedad lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Adds to gross pay.
    Earning,
    /// Subtracts from net pay.
    Deduction,
    /// Counted nowhere; used for unrecognized kinds.
    Excluded,
}

/// The classification of one novedad kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NovedadClass {
    /// Which side of the ledger the kind lands on.
    pub flow: Flow,
    /// Whether the kind counts toward the contribution base by default.
    pub constitutive_default: bool,
}

/// Classifies a novedad kind.
///
/// Overtime, night surcharge, habitual bonuses and commissions, enjoyed
/// vacation and paid leave are earnings that count toward the
/// contribution base. Transport subsidy adjustments and incapacity pay
/// are earnings that do not. Unpaid leave and the monetary events
/// (garnishments, loans, fines, voluntary deductions, manual withholding
/// and solidarity adjustments) are deductions. An unrecognized kind is
/// logged and excluded from every total: miscounting a legal amount is
/// worse than ignoring an unknown one.
pub fn classify(kind: &NovedadKind) -> NovedadClass {
    match kind {
        NovedadKind::Overtime
        | NovedadKind::NightSurcharge
        | NovedadKind::Bonus
        | NovedadKind::Commission
        | NovedadKind::Vacation
        | NovedadKind::PaidLeave => NovedadClass {
            flow: Flow::Earning,
            constitutive_default: true,
        },
        NovedadKind::Incapacity { .. } | NovedadKind::TransportSubsidyAdjustment => NovedadClass {
            flow: Flow::Earning,
            constitutive_default: false,
        },
        NovedadKind::UnpaidLeave
        | NovedadKind::Garnishment
        | NovedadKind::Loan
        | NovedadKind::Fine
        | NovedadKind::VoluntaryDeduction
        | NovedadKind::WithholdingAdjustment
        | NovedadKind::SolidarityFund => NovedadClass {
            flow: Flow::Deduction,
            constitutive_default: false,
        },
        NovedadKind::Other { label } => {
            tracing::warn!(%label, "unrecognized novedad kind excluded from totals");
            NovedadClass {
                flow: Flow::Excluded,
                constitutive_default: false,
            }
        }
    }
}

/// Whether a novedad counts toward the contribution base, honoring its
/// per-record override when present.
pub fn is_constitutive(novedad: &Novedad) -> bool {
    novedad
        .constitutive_override
        .unwrap_or_else(|| classify(&novedad.kind).constitutive_default)
}

/// Summed classification of a set of novedades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NovedadTotals {
    /// Sum of values classified as earnings.
    pub earnings: Decimal,
    /// Sum of values classified as deductions.
    pub deductions: Decimal,
    /// Sum of earning values that count toward the contribution base.
    pub constitutive_earnings: Decimal,
    /// How many novedades were excluded as unrecognized.
    pub excluded_count: u32,
}

/// Partitions a set of novedades into earning and deduction totals.
///
/// Only earnings can be constitutive: a deduction-side novedad never
/// feeds the contribution base even if its override flag says so.
pub fn partition_novedades(novedades: &[Novedad]) -> NovedadTotals {
    let mut totals = NovedadTotals::default();
    for novedad in novedades {
        match classify(&novedad.kind).flow {
            Flow::Earning => {
                totals.earnings += novedad.value;
                if is_constitutive(novedad) {
                    totals.constitutive_earnings += novedad.value;
                }
            }
            Flow::Deduction => totals.deductions += novedad.value,
            Flow::Excluded => totals.excluded_count += 1,
        }
    }
    totals
}
