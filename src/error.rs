//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during payroll calculation and
//! period lifecycle management.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PeriodState;

/// A single broken period rule, collected during invariant validation.
///
/// Lifecycle operations run every check and report all violations together
/// instead of stopping at the first one, so callers see the full picture
/// in a single round trip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeriodRuleViolation {
    /// Another period for the company is already in an editable state.
    #[error("company already has an open period: {period_id}")]
    OpenPeriodExists {
        /// The period that is currently open.
        period_id: Uuid,
    },

    /// The date range collides with an existing non-cancelled period.
    #[error("date range overlaps period {period_id}")]
    OverlappingPeriod {
        /// The period whose range overlaps.
        period_id: Uuid,
    },

    /// The company already has a period starting in the future.
    #[error("company already has a future-dated period: {period_id}")]
    FuturePeriodExists {
        /// The existing future-dated period.
        period_id: Uuid,
    },

    /// A close was attempted on a period with no employee records.
    #[error("period has no employee records")]
    NoEmployeeRecords,

    /// An employee record still carries unresolved validation errors.
    #[error("record for employee {employee_id} has unresolved validation errors: {details}")]
    RecordHasValidationErrors {
        /// The employee whose record is invalid.
        employee_id: Uuid,
        /// The unresolved error messages, joined for display.
        details: String,
    },

    /// An employee record is missing its payment voucher.
    #[error("record for employee {employee_id} is missing its voucher")]
    MissingVoucher {
        /// The employee whose record lacks a voucher.
        employee_id: Uuid,
    },

    /// A payroll record could not be computed for an employee during close.
    #[error("record for employee {employee_id} could not be computed: {reason}")]
    RecordComputationFailed {
        /// The employee whose liquidation failed.
        employee_id: Uuid,
        /// Why the computation failed.
        reason: String,
    },

    /// A reopen was attempted on a period already reported to the authority.
    #[error("period was already reported to an external authority")]
    PeriodAlreadyReported,
}

/// The main error type for the payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use nomina_engine::error::EngineError;
///
/// let error = EngineError::Validation {
///     field: "base_salary".to_string(),
///     message: "cannot be negative".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid field 'base_salary': cannot be negative");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input was malformed or out of range (negative salary, negative
    /// days, inverted date range, and similar).
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A write was attempted against a period that is not editable.
    #[error("Period {period_id} is not editable in state {state:?}")]
    PeriodNotEditable {
        /// The period that rejected the write.
        period_id: Uuid,
        /// The state the period was in.
        state: PeriodState,
    },

    /// The operation would break one or more period invariants.
    #[error("Period invariants violated: {}", format_violations(violations))]
    InvariantViolation {
        /// Every rule the operation would break, in check order.
        violations: Vec<PeriodRuleViolation>,
    },

    /// A compensatory adjustment was requested but the company has no
    /// open or future period to receive it.
    #[error("No open or future period available for company {company_id}")]
    NoActivePeriodAvailable {
        /// The company with nowhere to land the adjustment.
        company_id: Uuid,
    },

    /// An entity lookup found nothing.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// A yearly configuration could not be loaded or failed validation.
    #[error("Configuration for year {year} is invalid: {message}")]
    Configuration {
        /// The configuration year.
        year: i32,
        /// A description of the problem.
        message: String,
    },

    /// A repository write failed.
    #[error("Persistence failure during {operation}: {message}")]
    PersistenceFailure {
        /// The operation that was being performed.
        operation: String,
        /// A description of the failure.
        message: String,
    },

    /// The audit record for an adjustment could not be persisted.
    ///
    /// This is fatal for the adjustment: the paired novedad write is
    /// rolled back, because adjustments without an audit trail are not
    /// permitted.
    #[error("Adjustment audit record could not be persisted: {message}")]
    AdjustmentAuditFailure {
        /// A description of the failure.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    Calculation {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Builds a `Validation` error from a field name and message.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Builds a `Validation` error for a monetary amount that must not be
    /// negative.
    pub fn negative_amount(field: impl Into<String>, value: Decimal) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: format!("cannot be negative (was {value})"),
        }
    }
}

fn format_violations(violations: &[PeriodRuleViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
