//! Repository interfaces to the transactional record store.
//!
//! The engine never talks to a storage backend directly; it goes through
//! these traits. Production wires them to the persistence layer, tests
//! and demos use the [`memory`] implementations.

pub mod memory;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{CompanyPayrollPolicy, YearlyConfiguration};
use crate::error::EngineResult;
use crate::models::{Employee, Novedad, PayrollPeriod, PayrollRecord, PeriodState, PeriodTotals};

/// Read access to the company's employee roster.
pub trait EmployeeRepository: Send + Sync {
    /// Returns every active employee of a company.
    fn get_active_employees(&self, company_id: Uuid) -> EngineResult<Vec<Employee>>;

    /// Returns one employee by id, or `NotFound`.
    fn get_employee(&self, id: Uuid) -> EngineResult<Employee>;
}

/// Access to payroll events, gated by period editability.
///
/// `create`, `update` and `delete` refuse to touch a novedad whose period
/// is not in `Draft` or `Reopened` state. The `_adjustment`/`_unchecked`
/// entry points bypass that gate; they exist solely for the closed-period
/// adjustment service, which pairs every bypassing write with an audit
/// record.
pub trait NovedadRepository: Send + Sync {
    /// Returns the events for one employee within one period.
    fn get_by_employee_and_period(
        &self,
        employee_id: Uuid,
        period_id: Uuid,
    ) -> EngineResult<Vec<Novedad>>;

    /// Returns every event registered in a period.
    fn get_by_period(&self, period_id: Uuid) -> EngineResult<Vec<Novedad>>;

    /// Returns one event by id, or `NotFound`.
    fn get_novedad(&self, id: Uuid) -> EngineResult<Novedad>;

    /// Creates an event; fails with `PeriodNotEditable` for closed periods.
    fn create(&self, novedad: Novedad) -> EngineResult<()>;

    /// Updates an event; fails with `PeriodNotEditable` for closed periods.
    fn update(&self, novedad: Novedad) -> EngineResult<()>;

    /// Deletes an event; fails with `PeriodNotEditable` for closed periods.
    fn delete(&self, id: Uuid) -> EngineResult<()>;

    /// Creates an event inside a closed period. Callers must persist a
    /// matching audit record or roll the write back.
    fn create_adjustment(&self, novedad: Novedad) -> EngineResult<()>;

    /// Deletes an event regardless of period state. Only used to roll
    /// back an adjustment whose audit record could not be persisted.
    fn delete_unchecked(&self, id: Uuid) -> EngineResult<()>;
}

/// Access to payroll periods and their per-employee records.
pub trait PeriodRepository: Send + Sync {
    /// Returns one period by id, or `NotFound`.
    fn get_period(&self, id: Uuid) -> EngineResult<PayrollPeriod>;

    /// Returns every period of a company, in no particular order.
    fn periods_for_company(&self, company_id: Uuid) -> EngineResult<Vec<PayrollPeriod>>;

    /// Inserts a freshly created period.
    fn insert_period(&self, period: PayrollPeriod) -> EngineResult<()>;

    /// Transitions a period's state with an optimistic version check.
    ///
    /// The write succeeds only if the stored version equals
    /// `expected_version`; it bumps the version, optionally replaces the
    /// aggregate totals, appends to the closure history on close/reopen,
    /// and returns the updated period. A stale version fails with
    /// `PersistenceFailure`, which serializes concurrent close/reopen
    /// attempts on the same period.
    fn update_state(
        &self,
        period_id: Uuid,
        expected_version: u64,
        new_state: PeriodState,
        totals: Option<PeriodTotals>,
        actor: &str,
    ) -> EngineResult<PayrollPeriod>;

    /// Marks a period as reported to an external authority.
    fn set_reported(&self, period_id: Uuid, reported: bool) -> EngineResult<()>;

    /// Returns every employee record stored for a period.
    fn records_for_period(&self, period_id: Uuid) -> EngineResult<Vec<PayrollRecord>>;

    /// Returns the record for one (employee, period) pair, if present.
    fn get_record(&self, employee_id: Uuid, period_id: Uuid)
    -> EngineResult<Option<PayrollRecord>>;

    /// Inserts or overwrites records keyed by (employee, period).
    fn upsert_records(&self, records: &[PayrollRecord]) -> EngineResult<()>;

    /// Replaces the full record set of a period. Used by compensating
    /// rollbacks to restore a close-attempt snapshot.
    fn replace_records(&self, period_id: Uuid, records: Vec<PayrollRecord>) -> EngineResult<()>;
}

/// Access to yearly configurations and company policies.
pub trait ConfigurationRepository: Send + Sync {
    /// Returns the persisted configuration for a year, if any.
    fn get_configuration(&self, year: i32) -> EngineResult<Option<YearlyConfiguration>>;

    /// Persists a configuration version for its year.
    fn save_configuration(&self, config: &YearlyConfiguration) -> EngineResult<()>;

    /// Years with a persisted configuration, ascending.
    fn available_years(&self) -> EngineResult<Vec<i32>>;

    /// Returns the payroll policy for a company, if one was configured.
    fn get_policy(&self, company_id: Uuid) -> EngineResult<Option<CompanyPayrollPolicy>>;

    /// Persists a company payroll policy.
    fn save_policy(&self, policy: &CompanyPayrollPolicy) -> EngineResult<()>;
}

/// The category of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A novedad created directly inside a closed period.
    CorrectiveAdjustment,
    /// An adjustment landed in the open/future period instead.
    CompensatoryAdjustment,
    /// A novedad revalued by a policy backfill.
    PolicyBackfill,
}

/// One entry in the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier for the entry.
    pub id: Uuid,
    /// What kind of action was audited.
    pub action: AuditAction,
    /// The company the action belongs to.
    pub company_id: Uuid,
    /// The employee affected.
    pub employee_id: Uuid,
    /// The period the action originated from.
    pub source_period_id: Uuid,
    /// The period the write landed in, when different from the source.
    pub target_period_id: Option<Uuid>,
    /// The novedad created or updated by the action.
    pub novedad_id: Option<Uuid>,
    /// The value before the action, when one existed.
    pub before_value: Option<Decimal>,
    /// The value after the action.
    pub after_value: Decimal,
    /// Free-text justification supplied by the actor.
    pub justification: String,
    /// Who performed the action.
    pub actor: String,
    /// When the action was performed.
    pub timestamp: DateTime<Utc>,
}

/// Append-only sink for audit records.
pub trait AuditSink: Send + Sync {
    /// Appends one record. Failure is fatal for the audited action.
    fn append(&self, record: AuditRecord) -> EngineResult<()>;
}
