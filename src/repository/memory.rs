//! In-memory repository implementations.
//!
//! These back the engine in tests and demos. They enforce the same
//! contracts a production store must (editability gating, optimistic
//! version checks, upsert keyed on (employee, period)) and expose
//! failure-injection switches so the compensating-rollback paths of the
//! services can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::config::{CompanyPayrollPolicy, YearlyConfiguration};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ClosureEvent, Employee, Novedad, PayrollPeriod, PayrollRecord, PeriodState, PeriodTotals,
};
use crate::repository::{
    AuditRecord, AuditSink, ConfigurationRepository, EmployeeRepository, NovedadRepository,
    PeriodRepository,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn persistence_failure(operation: &str, message: &str) -> EngineError {
    EngineError::PersistenceFailure {
        operation: operation.to_string(),
        message: message.to_string(),
    }
}

/// In-memory employee roster.
#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: Mutex<HashMap<Uuid, Employee>>,
}

impl InMemoryEmployeeRepository {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an employee.
    pub fn insert(&self, employee: Employee) {
        lock(&self.employees).insert(employee.id, employee);
    }
}

impl EmployeeRepository for InMemoryEmployeeRepository {
    fn get_active_employees(&self, company_id: Uuid) -> EngineResult<Vec<Employee>> {
        Ok(lock(&self.employees)
            .values()
            .filter(|e| e.company_id == company_id && e.is_active())
            .cloned()
            .collect())
    }

    fn get_employee(&self, id: Uuid) -> EngineResult<Employee> {
        lock(&self.employees)
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "employee",
                id: id.to_string(),
            })
    }
}

/// In-memory period and record store with failure injection.
#[derive(Default)]
pub struct InMemoryPeriodRepository {
    periods: Mutex<HashMap<Uuid, PayrollPeriod>>,
    records: Mutex<HashMap<(Uuid, Uuid), PayrollRecord>>,
    fail_upsert_countdown: Mutex<Option<u32>>,
    fail_next_state_update: AtomicBool,
}

impl InMemoryPeriodRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th subsequent `upsert_records` call fail (1-based).
    pub fn fail_upsert_call(&self, n: u32) {
        *lock(&self.fail_upsert_countdown) = Some(n);
    }

    /// Makes the next `update_state` call fail.
    pub fn fail_next_state_update(&self) {
        self.fail_next_state_update.store(true, Ordering::SeqCst);
    }
}

impl PeriodRepository for InMemoryPeriodRepository {
    fn get_period(&self, id: Uuid) -> EngineResult<PayrollPeriod> {
        lock(&self.periods)
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "period",
                id: id.to_string(),
            })
    }

    fn periods_for_company(&self, company_id: Uuid) -> EngineResult<Vec<PayrollPeriod>> {
        Ok(lock(&self.periods)
            .values()
            .filter(|p| p.company_id == company_id)
            .cloned()
            .collect())
    }

    fn insert_period(&self, period: PayrollPeriod) -> EngineResult<()> {
        let mut periods = lock(&self.periods);
        if periods.contains_key(&period.id) {
            return Err(persistence_failure(
                "insert period",
                "period id already exists",
            ));
        }
        periods.insert(period.id, period);
        Ok(())
    }

    fn update_state(
        &self,
        period_id: Uuid,
        expected_version: u64,
        new_state: PeriodState,
        totals: Option<PeriodTotals>,
        actor: &str,
    ) -> EngineResult<PayrollPeriod> {
        if self.fail_next_state_update.swap(false, Ordering::SeqCst) {
            return Err(persistence_failure(
                "update period state",
                "injected failure",
            ));
        }
        let mut periods = lock(&self.periods);
        let period = periods.get_mut(&period_id).ok_or(EngineError::NotFound {
            entity: "period",
            id: period_id.to_string(),
        })?;
        if period.version != expected_version {
            return Err(persistence_failure(
                "update period state",
                &format!(
                    "version conflict: expected {expected_version}, found {}",
                    period.version
                ),
            ));
        }
        let now = Utc::now();
        match new_state {
            PeriodState::Closed => period.closure_history.push(ClosureEvent {
                closed_at: now,
                closed_by: actor.to_string(),
                reopened_at: None,
                reopened_by: None,
            }),
            PeriodState::Reopened => {
                if let Some(event) = period
                    .closure_history
                    .iter_mut()
                    .rev()
                    .find(|e| e.reopened_at.is_none())
                {
                    event.reopened_at = Some(now);
                    event.reopened_by = Some(actor.to_string());
                }
            }
            PeriodState::Draft | PeriodState::Cancelled => {}
        }
        period.state = new_state;
        period.version += 1;
        if let Some(totals) = totals {
            period.totals = totals;
        }
        Ok(period.clone())
    }

    fn set_reported(&self, period_id: Uuid, reported: bool) -> EngineResult<()> {
        let mut periods = lock(&self.periods);
        let period = periods.get_mut(&period_id).ok_or(EngineError::NotFound {
            entity: "period",
            id: period_id.to_string(),
        })?;
        period.reported_to_authority = reported;
        Ok(())
    }

    fn records_for_period(&self, period_id: Uuid) -> EngineResult<Vec<PayrollRecord>> {
        Ok(lock(&self.records)
            .values()
            .filter(|r| r.period_id == period_id)
            .cloned()
            .collect())
    }

    fn get_record(
        &self,
        employee_id: Uuid,
        period_id: Uuid,
    ) -> EngineResult<Option<PayrollRecord>> {
        Ok(lock(&self.records).get(&(employee_id, period_id)).cloned())
    }

    fn upsert_records(&self, records: &[PayrollRecord]) -> EngineResult<()> {
        {
            let mut countdown = lock(&self.fail_upsert_countdown);
            if let Some(n) = *countdown {
                if n <= 1 {
                    *countdown = None;
                    return Err(persistence_failure("upsert records", "injected failure"));
                }
                *countdown = Some(n - 1);
            }
        }
        let mut stored = lock(&self.records);
        for record in records {
            stored.insert((record.employee_id, record.period_id), record.clone());
        }
        Ok(())
    }

    fn replace_records(&self, period_id: Uuid, records: Vec<PayrollRecord>) -> EngineResult<()> {
        let mut stored = lock(&self.records);
        stored.retain(|_, r| r.period_id != period_id);
        for record in records {
            stored.insert((record.employee_id, record.period_id), record);
        }
        Ok(())
    }
}

/// In-memory novedad store gated by period editability.
pub struct InMemoryNovedadRepository {
    novedades: Mutex<HashMap<Uuid, Novedad>>,
    periods: Arc<dyn PeriodRepository>,
}

impl InMemoryNovedadRepository {
    /// Creates an empty store gated by the given period repository.
    pub fn new(periods: Arc<dyn PeriodRepository>) -> Self {
        Self {
            novedades: Mutex::new(HashMap::new()),
            periods,
        }
    }

    fn ensure_editable(&self, period_id: Uuid) -> EngineResult<()> {
        let period = self.periods.get_period(period_id)?;
        if !period.is_open() {
            return Err(EngineError::PeriodNotEditable {
                period_id,
                state: period.state,
            });
        }
        Ok(())
    }
}

impl NovedadRepository for InMemoryNovedadRepository {
    fn get_by_employee_and_period(
        &self,
        employee_id: Uuid,
        period_id: Uuid,
    ) -> EngineResult<Vec<Novedad>> {
        Ok(lock(&self.novedades)
            .values()
            .filter(|n| n.employee_id == employee_id && n.period_id == period_id)
            .cloned()
            .collect())
    }

    fn get_by_period(&self, period_id: Uuid) -> EngineResult<Vec<Novedad>> {
        Ok(lock(&self.novedades)
            .values()
            .filter(|n| n.period_id == period_id)
            .cloned()
            .collect())
    }

    fn get_novedad(&self, id: Uuid) -> EngineResult<Novedad> {
        lock(&self.novedades)
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound {
                entity: "novedad",
                id: id.to_string(),
            })
    }

    fn create(&self, novedad: Novedad) -> EngineResult<()> {
        self.ensure_editable(novedad.period_id)?;
        lock(&self.novedades).insert(novedad.id, novedad);
        Ok(())
    }

    fn update(&self, novedad: Novedad) -> EngineResult<()> {
        self.ensure_editable(novedad.period_id)?;
        let mut stored = lock(&self.novedades);
        if !stored.contains_key(&novedad.id) {
            return Err(EngineError::NotFound {
                entity: "novedad",
                id: novedad.id.to_string(),
            });
        }
        stored.insert(novedad.id, novedad);
        Ok(())
    }

    fn delete(&self, id: Uuid) -> EngineResult<()> {
        let novedad = self.get_novedad(id)?;
        self.ensure_editable(novedad.period_id)?;
        lock(&self.novedades).remove(&id);
        Ok(())
    }

    fn create_adjustment(&self, novedad: Novedad) -> EngineResult<()> {
        // Existence of the period is still required; its state is not.
        self.periods.get_period(novedad.period_id)?;
        lock(&self.novedades).insert(novedad.id, novedad);
        Ok(())
    }

    fn delete_unchecked(&self, id: Uuid) -> EngineResult<()> {
        lock(&self.novedades)
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::NotFound {
                entity: "novedad",
                id: id.to_string(),
            })
    }
}

/// In-memory configuration and policy store.
#[derive(Default)]
pub struct InMemoryConfigurationRepository {
    configurations: Mutex<HashMap<i32, YearlyConfiguration>>,
    policies: Mutex<HashMap<Uuid, CompanyPayrollPolicy>>,
}

impl InMemoryConfigurationRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigurationRepository for InMemoryConfigurationRepository {
    fn get_configuration(&self, year: i32) -> EngineResult<Option<YearlyConfiguration>> {
        Ok(lock(&self.configurations).get(&year).cloned())
    }

    fn save_configuration(&self, config: &YearlyConfiguration) -> EngineResult<()> {
        lock(&self.configurations).insert(config.year, config.clone());
        Ok(())
    }

    fn available_years(&self) -> EngineResult<Vec<i32>> {
        let mut years: Vec<i32> = lock(&self.configurations).keys().copied().collect();
        years.sort_unstable();
        Ok(years)
    }

    fn get_policy(&self, company_id: Uuid) -> EngineResult<Option<CompanyPayrollPolicy>> {
        Ok(lock(&self.policies).get(&company_id).copied())
    }

    fn save_policy(&self, policy: &CompanyPayrollPolicy) -> EngineResult<()> {
        lock(&self.policies).insert(policy.company_id, *policy);
        Ok(())
    }
}

/// In-memory append-only audit log with failure injection.
#[derive(Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    fail_next_append: AtomicBool,
}

impl InMemoryAuditSink {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `append` call fail.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Returns a copy of everything appended so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        lock(&self.records).clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, record: AuditRecord) -> EngineResult<()> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(persistence_failure("append audit record", "injected failure"));
        }
        lock(&self.records).push(record);
        Ok(())
    }
}
