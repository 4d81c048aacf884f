//! Novedad (payroll event) model.
//!
//! A novedad is an ad-hoc payroll event attached to one employee within one
//! period: overtime, a bonus, an incapacity, a garnishment, and so on. Each
//! novedad carries a structured calculation trace recording how its value
//! was derived.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::DateRange;

/// The origin of a sick-leave/disability event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncapacitySubtype {
    /// Common illness; payer split follows the company incapacity policy.
    General,
    /// Work-related illness or accident; ARL pays from day one.
    Occupational,
}

/// The kind of payroll event, as a closed tagged union.
///
/// Each variant carries only the fields valid for it: `Incapacity` has a
/// subtype, `Other` a free-text label, and the rest nothing. `Other` is the
/// escape hatch for event types the engine does not recognize; the
/// classifier excludes those from all totals rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NovedadKind {
    /// Extra hours worked beyond the ordinary schedule.
    Overtime,
    /// Surcharge for ordinary hours worked at night.
    NightSurcharge,
    /// A bonus payment.
    Bonus,
    /// Sales or performance commission.
    Commission,
    /// Vacation days enjoyed in the period.
    Vacation,
    /// Paid leave (licencia remunerada).
    PaidLeave,
    /// Unpaid leave; reduces pay for the days away.
    UnpaidLeave,
    /// Sick-leave/disability pay.
    Incapacity {
        /// Whether the incapacity is common or work-related.
        subtype: IncapacitySubtype,
    },
    /// Manual correction of the transport subsidy.
    TransportSubsidyAdjustment,
    /// Court-ordered wage garnishment.
    Garnishment,
    /// Installment of a company loan.
    Loan,
    /// Disciplinary fine.
    Fine,
    /// Employee-requested deduction (savings fund, union dues).
    VoluntaryDeduction,
    /// Manual withholding-tax adjustment.
    WithholdingAdjustment,
    /// Manual solidarity-fund adjustment.
    SolidarityFund,
    /// An event type the engine does not recognize.
    Other {
        /// The label the external system supplied.
        label: String,
    },
}

impl NovedadKind {
    /// Returns true for incapacity events of any subtype.
    pub fn is_incapacity(&self) -> bool {
        matches!(self, NovedadKind::Incapacity { .. })
    }
}

/// Day and/or hour quantities attached to a novedad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NovedadQuantity {
    /// Number of days the event spans, when day-based.
    pub days: Option<u32>,
    /// Number of hours, when hour-based (overtime, surcharges).
    pub hours: Option<Decimal>,
}

impl NovedadQuantity {
    /// A quantity expressed in days.
    pub fn days(days: u32) -> Self {
        Self {
            days: Some(days),
            hours: None,
        }
    }

    /// A quantity expressed in hours.
    pub fn hours(hours: Decimal) -> Self {
        Self {
            days: None,
            hours: Some(hours),
        }
    }
}

/// A structured record of how a value was derived.
///
/// Traces make every computed amount reproducible for audit replay: the
/// rule that produced it, its inputs, its outputs, and a human-readable
/// explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationTrace {
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for the calculation.
    pub input: serde_json::Value,
    /// The output data from the calculation.
    pub output: serde_json::Value,
    /// Human-readable explanation of the result.
    pub reasoning: String,
}

impl CalculationTrace {
    /// The trace attached to values typed in by a person rather than
    /// computed by a rule.
    pub fn manual_entry(value: Decimal, observation: &str) -> Self {
        Self {
            rule_id: "manual_entry".to_string(),
            rule_name: "Manual Entry".to_string(),
            input: serde_json::json!({ "observation": observation }),
            output: serde_json::json!({ "value": value.to_string() }),
            reasoning: "Value entered manually".to_string(),
        }
    }
}

/// An ad-hoc payroll event for one employee within one period.
///
/// Novedades may only be created or edited while their period is in
/// `Draft` or `Reopened` state; once the period closes they become
/// immutable except through the closed-period adjustment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Novedad {
    /// Unique identifier for the event.
    pub id: Uuid,
    /// The employee the event applies to.
    pub employee_id: Uuid,
    /// The period the event falls in.
    pub period_id: Uuid,
    /// The kind of event.
    pub kind: NovedadKind,
    /// Monetary value; positive for both earnings and deductions, the
    /// classifier decides which side of the ledger it lands on.
    pub value: Decimal,
    /// Day/hour quantities, when applicable.
    #[serde(default)]
    pub quantity: NovedadQuantity,
    /// Overrides the kind's default salary-constitutive classification.
    pub constitutive_override: Option<bool>,
    /// Free-text note from whoever registered the event.
    pub observation: String,
    /// The dates the event spans, when applicable.
    pub date_range: Option<DateRange>,
    /// How the value was derived.
    pub calculation_trace: CalculationTrace,
}

impl Novedad {
    /// Creates a manually-entered novedad with a manual-entry trace.
    pub fn manual(
        employee_id: Uuid,
        period_id: Uuid,
        kind: NovedadKind,
        value: Decimal,
        observation: impl Into<String>,
    ) -> Self {
        let observation = observation.into();
        Self {
            id: Uuid::new_v4(),
            employee_id,
            period_id,
            kind,
            value,
            quantity: NovedadQuantity::default(),
            constitutive_override: None,
            observation: observation.clone(),
            date_range: None,
            calculation_trace: CalculationTrace::manual_entry(value, &observation),
        }
    }

    /// Creates a novedad whose value was computed by an engine rule.
    pub fn computed(
        employee_id: Uuid,
        period_id: Uuid,
        kind: NovedadKind,
        value: Decimal,
        quantity: NovedadQuantity,
        trace: CalculationTrace,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id,
            period_id,
            kind,
            value,
            quantity,
            constitutive_override: None,
            observation: String::new(),
            date_range: None,
            calculation_trace: trace,
        }
    }
}
