//! Payroll liquidation orchestration.
//!
//! The [`LiquidationOrchestrator`] turns (employee, period, novedades)
//! into a [`PayrollRecord`]: proration, transport allowance, novedad
//! partition, contribution base, statutory deductions, and employer
//! contributions, in that order. Each employee's calculation is pure
//! until its final write, so a period's employees can be liquidated
//! independently; writes are chunked to bound store load.

use std::sync::Arc;

use uuid::Uuid;

use crate::calculation::{
    DeductionCalculator, DeductionInput, calculate_employer_contributions, calculate_income_base,
    partition_novedades, prorate_salary, transport_allowance,
};
use crate::config::{ConfigurationStore, IbcMode};
use crate::error::{EngineError, EngineResult};
use crate::models::{Employee, PayrollPeriod, PayrollRecord};
use crate::repository::{EmployeeRepository, NovedadRepository, PeriodRepository};

use chrono::Datelike;

/// How many employee records are written per repository call.
pub const LIQUIDATION_BATCH_SIZE: usize = 100;

/// One employee that could not be liquidated, with the reason.
#[derive(Debug, Clone)]
pub struct LiquidationFailure {
    /// The employee whose liquidation failed.
    pub employee_id: Uuid,
    /// Why it failed.
    pub reason: String,
}

/// The outcome of liquidating a period's employee set.
///
/// Batch liquidation never collapses into a single opaque failure: the
/// report carries counts and a per-employee reason for everything that
/// went wrong.
#[derive(Debug, Clone)]
pub struct LiquidationReport {
    /// The period that was liquidated.
    pub period_id: Uuid,
    /// Active employees considered.
    pub total_employees: usize,
    /// Records successfully computed.
    pub computed: usize,
    /// Records successfully written.
    pub persisted: usize,
    /// Employees that failed, with reasons.
    pub failures: Vec<LiquidationFailure>,
}

/// Consolidates salary, novedades, deductions, and employer
/// contributions into per-employee payroll records.
pub struct LiquidationOrchestrator {
    employees: Arc<dyn EmployeeRepository>,
    novedades: Arc<dyn NovedadRepository>,
    periods: Arc<dyn PeriodRepository>,
    configuration: Arc<ConfigurationStore>,
    deductions: DeductionCalculator,
}

impl LiquidationOrchestrator {
    /// Creates an orchestrator using the local deduction calculator.
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        novedades: Arc<dyn NovedadRepository>,
        periods: Arc<dyn PeriodRepository>,
        configuration: Arc<ConfigurationStore>,
    ) -> Self {
        Self {
            employees,
            novedades,
            periods,
            configuration,
            deductions: DeductionCalculator::local(),
        }
    }

    /// Replaces the deduction calculator, e.g. to route through a
    /// primary backend with local fallback.
    pub fn with_deduction_calculator(mut self, deductions: DeductionCalculator) -> Self {
        self.deductions = deductions;
        self
    }

    /// Computes the payroll record for one employee in one period.
    ///
    /// Pure with respect to the record store: nothing is written. The
    /// period must be editable (`Draft` or `Reopened`).
    pub fn liquidate_employee(
        &self,
        period: &PayrollPeriod,
        employee: &Employee,
    ) -> EngineResult<PayrollRecord> {
        if !period.is_open() {
            return Err(EngineError::PeriodNotEditable {
                period_id: period.id,
                state: period.state,
            });
        }

        let config = self.configuration.get(period.range.start.year())?;
        let policy = self.configuration.policy_for(period.company_id)?;

        let worked_days = period.worked_days();
        let prorated_salary = prorate_salary(employee.base_salary, worked_days)?;
        let transport = transport_allowance(employee.base_salary, worked_days, &config)?;

        let novedades = self
            .novedades
            .get_by_employee_and_period(employee.id, period.id)?;
        let novedad_totals = partition_novedades(&novedades);

        let contribution_salary = match policy.ibc_mode {
            IbcMode::Proportional => prorated_salary,
            IbcMode::FullSalary => employee.base_salary,
        };
        let income_base = calculate_income_base(contribution_salary, &novedades, &config)?;

        let gross_pay = prorated_salary + transport + novedad_totals.earnings;
        let deductions = self.deductions.calculate(&DeductionInput {
            ibc: income_base.ibc,
            gross_pay,
            base_salary: employee.base_salary,
            novedad_deductions: novedad_totals.deductions,
            config: &config,
        })?;
        let net_pay = gross_pay - deductions.breakdown.total;

        let employer = calculate_employer_contributions(
            income_base.ibc,
            transport,
            employee.arl_risk_class,
            &config,
        )?;

        // A re-liquidation must not lose a voucher issued for the
        // previous version of the record.
        let voucher_number = self
            .periods
            .get_record(employee.id, period.id)?
            .and_then(|existing| existing.voucher_number);

        Ok(PayrollRecord {
            employee_id: employee.id,
            period_id: period.id,
            base_salary_used: employee.base_salary,
            worked_days,
            prorated_salary,
            transport_allowance: transport,
            ibc: income_base.ibc,
            health_deduction: deductions.breakdown.health,
            pension_deduction: deductions.breakdown.pension,
            solidarity_deductions: deductions.breakdown.solidarity,
            withholding_tax: deductions.breakdown.withholding_tax,
            novedad_earnings: novedad_totals.earnings,
            novedad_deductions: novedad_totals.deductions,
            gross_pay,
            total_deductions: deductions.breakdown.total,
            net_pay,
            employer_contributions: employer.contributions,
            deduction_path: deductions.path,
            validation_errors: Vec::new(),
            voucher_number,
        })
    }

    /// Computes records for every active employee of a period without
    /// writing anything. Per-employee failures are collected, not fatal.
    pub fn compute_period_records(
        &self,
        period: &PayrollPeriod,
    ) -> EngineResult<(Vec<PayrollRecord>, Vec<LiquidationFailure>)> {
        let employees = self.employees.get_active_employees(period.company_id)?;
        let mut records = Vec::with_capacity(employees.len());
        let mut failures = Vec::new();
        for employee in &employees {
            match self.liquidate_employee(period, employee) {
                Ok(record) => records.push(record),
                Err(error) => failures.push(LiquidationFailure {
                    employee_id: employee.id,
                    reason: error.to_string(),
                }),
            }
        }
        Ok((records, failures))
    }

    /// Liquidates a period: computes a record per active employee and
    /// upserts them in batches of [`LIQUIDATION_BATCH_SIZE`].
    ///
    /// A failing batch write marks its employees as failed and moves on;
    /// the report carries every per-item reason.
    pub fn liquidate_period(&self, period_id: Uuid) -> EngineResult<LiquidationReport> {
        let period = self.periods.get_period(period_id)?;
        if !period.is_open() {
            return Err(EngineError::PeriodNotEditable {
                period_id: period.id,
                state: period.state,
            });
        }

        let total_employees = self
            .employees
            .get_active_employees(period.company_id)?
            .len();
        let (records, mut failures) = self.compute_period_records(&period)?;
        let computed = records.len();

        let mut persisted = 0;
        for chunk in records.chunks(LIQUIDATION_BATCH_SIZE) {
            match self.periods.upsert_records(chunk) {
                Ok(()) => persisted += chunk.len(),
                Err(error) => {
                    let reason = error.to_string();
                    failures.extend(chunk.iter().map(|record| LiquidationFailure {
                        employee_id: record.employee_id,
                        reason: reason.clone(),
                    }));
                }
            }
        }

        tracing::info!(
            %period_id,
            total_employees,
            computed,
            persisted,
            failed = failures.len(),
            "period liquidation finished"
        );

        Ok(LiquidationReport {
            period_id,
            total_employees,
            computed,
            persisted,
            failures,
        })
    }
}
