//! Policy backfill over stored incapacity novedades.
//!
//! When a company switches its incapacity policy, incapacity novedades
//! already registered in still-open periods were valued under the old
//! rule. The [`PolicyBackfillService`] revalues them with the incapacity
//! calculator and the employee's current salary, skipping differences
//! within a one-peso tolerance so a repeated run is a no-op. Closed
//! periods are never touched.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use chrono::Datelike;

use chrono::Utc;

use crate::calculation::calculate_incapacity_value;
use crate::config::{ConfigurationStore, IncapacityPolicy};
use crate::error::EngineResult;
use crate::models::{Novedad, NovedadKind, NovedadQuantity, PayrollPeriod};
use crate::repository::{
    AuditAction, AuditRecord, AuditSink, EmployeeRepository, NovedadRepository, PeriodRepository,
};

/// The revaluation tolerance: differences of at most one peso are noise,
/// not policy effects.
pub const BACKFILL_TOLERANCE: Decimal = Decimal::ONE;

/// One novedad the backfill changed (or would change, in a dry run).
#[derive(Debug, Clone)]
pub struct BackfillItem {
    /// The revalued novedad.
    pub novedad_id: Uuid,
    /// Its employee.
    pub employee_id: Uuid,
    /// Its period.
    pub period_id: Uuid,
    /// The stored value before revaluation.
    pub old_value: Decimal,
    /// The value under the new policy.
    pub new_value: Decimal,
}

/// One novedad the backfill could not revalue.
#[derive(Debug, Clone)]
pub struct BackfillFailure {
    /// The novedad that failed.
    pub novedad_id: Uuid,
    /// Why it failed.
    pub reason: String,
}

/// The outcome of a backfill run.
#[derive(Debug, Clone)]
pub struct BackfillReport {
    /// Incapacity novedades examined across open periods.
    pub examined: usize,
    /// Items changed (or to be changed, when `dry_run`).
    pub updated: Vec<BackfillItem>,
    /// Items left alone because the difference was within tolerance.
    pub skipped: usize,
    /// Items that failed, with reasons.
    pub failures: Vec<BackfillFailure>,
    /// Whether this run wrote anything.
    pub dry_run: bool,
}

impl BackfillReport {
    /// A run succeeds overall when fewer than half its items failed.
    pub fn succeeded(&self) -> bool {
        self.examined == 0 || self.failures.len() * 2 < self.examined
    }
}

/// Recalculates incapacity novedades after a policy change.
pub struct PolicyBackfillService {
    novedades: Arc<dyn NovedadRepository>,
    periods: Arc<dyn PeriodRepository>,
    employees: Arc<dyn EmployeeRepository>,
    configuration: Arc<ConfigurationStore>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyBackfillService {
    /// Creates the service over its collaborators.
    pub fn new(
        novedades: Arc<dyn NovedadRepository>,
        periods: Arc<dyn PeriodRepository>,
        employees: Arc<dyn EmployeeRepository>,
        configuration: Arc<ConfigurationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            novedades,
            periods,
            employees,
            configuration,
            audit,
        }
    }

    /// Revalues every incapacity novedad of the company's open periods
    /// under `new_policy`.
    ///
    /// With `dry_run` the report lists intended changes but nothing is
    /// written. Per-item failures are collected, never fatal for the
    /// batch. On a successful non-dry run the new policy is persisted as
    /// the company policy.
    pub fn apply(
        &self,
        company_id: Uuid,
        new_policy: IncapacityPolicy,
        dry_run: bool,
    ) -> EngineResult<BackfillReport> {
        let open_periods: Vec<_> = self
            .periods
            .periods_for_company(company_id)?
            .into_iter()
            .filter(|p| p.is_open())
            .collect();

        let mut report = BackfillReport {
            examined: 0,
            updated: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
            dry_run,
        };

        for period in &open_periods {
            let year = period.range.start.year();
            let config = self.configuration.get(year)?;
            let incapacities: Vec<Novedad> = self
                .novedades
                .get_by_period(period.id)?
                .into_iter()
                .filter(|n| n.kind.is_incapacity())
                .collect();

            for novedad in incapacities {
                report.examined += 1;
                match self.revalue(&novedad, new_policy, config.minimum_wage) {
                    Ok(Some((new_value, updated))) => {
                        if !dry_run {
                            if let Err(error) = self.novedades.update(updated) {
                                report.failures.push(BackfillFailure {
                                    novedad_id: novedad.id,
                                    reason: error.to_string(),
                                });
                                continue;
                            }
                            if let Err(error) = self.append_audit(period, &novedad, new_value) {
                                report.failures.push(BackfillFailure {
                                    novedad_id: novedad.id,
                                    reason: format!("updated, but audit append failed: {error}"),
                                });
                                continue;
                            }
                        }
                        report.updated.push(BackfillItem {
                            novedad_id: novedad.id,
                            employee_id: novedad.employee_id,
                            period_id: novedad.period_id,
                            old_value: novedad.value,
                            new_value,
                        });
                    }
                    Ok(None) => report.skipped += 1,
                    Err(reason) => report.failures.push(BackfillFailure {
                        novedad_id: novedad.id,
                        reason,
                    }),
                }
            }
        }

        if !dry_run && report.succeeded() {
            let mut policy = self.configuration.policy_for(company_id)?;
            policy.incapacity_policy = new_policy;
            self.configuration.set_policy(&policy)?;
        }

        tracing::info!(
            %company_id,
            examined = report.examined,
            updated = report.updated.len(),
            skipped = report.skipped,
            failed = report.failures.len(),
            dry_run,
            "incapacity policy backfill finished"
        );
        Ok(report)
    }

    fn append_audit(
        &self,
        period: &PayrollPeriod,
        novedad: &Novedad,
        new_value: Decimal,
    ) -> EngineResult<()> {
        self.audit.append(AuditRecord {
            id: Uuid::new_v4(),
            action: AuditAction::PolicyBackfill,
            company_id: period.company_id,
            employee_id: novedad.employee_id,
            source_period_id: period.id,
            target_period_id: None,
            novedad_id: Some(novedad.id),
            before_value: Some(novedad.value),
            after_value: new_value,
            justification: "incapacity policy backfill".to_string(),
            actor: "policy-backfill".to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Recomputes one novedad; `Ok(None)` means within tolerance.
    fn revalue(
        &self,
        novedad: &Novedad,
        policy: IncapacityPolicy,
        minimum_wage: Decimal,
    ) -> Result<Option<(Decimal, Novedad)>, String> {
        let subtype = match &novedad.kind {
            NovedadKind::Incapacity { subtype } => *subtype,
            other => return Err(format!("not an incapacity novedad: {other:?}")),
        };
        let days = match novedad.quantity {
            NovedadQuantity { days: Some(days), .. } => days,
            _ => return Err("incapacity novedad has no day count".to_string()),
        };
        let employee = self
            .employees
            .get_employee(novedad.employee_id)
            .map_err(|e| e.to_string())?;

        let recomputed = calculate_incapacity_value(
            employee.daily_salary(),
            days,
            subtype,
            policy,
            minimum_wage,
        )
        .map_err(|e| e.to_string())?;

        let difference = (recomputed.value - novedad.value).abs();
        if difference <= BACKFILL_TOLERANCE {
            return Ok(None);
        }

        let mut updated = novedad.clone();
        updated.value = recomputed.value;
        updated.calculation_trace = recomputed.trace;
        Ok(Some((recomputed.value, updated)))
    }
}
