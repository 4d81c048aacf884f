//! Period lifecycle management.
//!
//! The [`PeriodLifecycleManager`] owns every state transition of a
//! payroll period: create, close, reopen, cancel. Before any transition
//! it runs three independent invariant checks — single open period,
//! overlap-free ranges, at most one future period — and reports every
//! violation together instead of failing on the first.
//!
//! A future-dated period may coexist with the current open one (it is
//! the staging area for compensatory adjustments); the single-open rule
//! therefore counts only open periods that have already started.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, PeriodRuleViolation};
use crate::models::{PayrollPeriod, PeriodKind, PeriodState, PeriodTotals};
use crate::repository::PeriodRepository;
use crate::services::liquidation::{LIQUIDATION_BATCH_SIZE, LiquidationOrchestrator};

/// Options for a close operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseOptions {
    /// Reject the close while any record lacks a payment voucher.
    pub require_vouchers: bool,
}

/// State machine and invariant guard for payroll periods.
pub struct PeriodLifecycleManager {
    periods: Arc<dyn PeriodRepository>,
    orchestrator: Arc<LiquidationOrchestrator>,
}

impl PeriodLifecycleManager {
    /// Creates a manager over the given period store and orchestrator.
    pub fn new(
        periods: Arc<dyn PeriodRepository>,
        orchestrator: Arc<LiquidationOrchestrator>,
    ) -> Self {
        Self {
            periods,
            orchestrator,
        }
    }

    /// Creates a new Draft period after validating all period invariants.
    ///
    /// `today` anchors the future-dated checks; passing it explicitly
    /// keeps the manager deterministic and testable.
    pub fn create_period(
        &self,
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        kind: PeriodKind,
        today: NaiveDate,
    ) -> EngineResult<PayrollPeriod> {
        let candidate = PayrollPeriod::new(company_id, start, end, kind)?;
        let existing = self.periods.periods_for_company(company_id)?;

        let violations = Self::invariant_sweep(&existing, &candidate, true, today);
        if !violations.is_empty() {
            return Err(EngineError::InvariantViolation { violations });
        }

        self.periods.insert_period(candidate.clone())?;
        tracing::info!(period_id = %candidate.id, %company_id, "period created");
        Ok(candidate)
    }

    /// Closes a period: recomputes every employee record, writes them in
    /// batches, derives the aggregate totals from exactly those records,
    /// and transitions the state.
    ///
    /// Any failure after the first record write triggers a compensating
    /// rollback that restores the record set the period had before the
    /// attempt — there is no partially-closed state.
    pub fn close_period(
        &self,
        period_id: Uuid,
        options: CloseOptions,
        today: NaiveDate,
        actor: &str,
    ) -> EngineResult<PayrollPeriod> {
        let period = self.periods.get_period(period_id)?;
        if !period.is_open() {
            return Err(EngineError::PeriodNotEditable {
                period_id,
                state: period.state,
            });
        }

        let existing = self.periods.periods_for_company(period.company_id)?;
        let mut violations = Self::invariant_sweep(&existing, &period, false, today);

        let (records, compute_failures) = self.orchestrator.compute_period_records(&period)?;
        for failure in compute_failures {
            violations.push(PeriodRuleViolation::RecordComputationFailed {
                employee_id: failure.employee_id,
                reason: failure.reason,
            });
        }
        if records.is_empty() {
            violations.push(PeriodRuleViolation::NoEmployeeRecords);
        }
        for record in &records {
            if !record.validation_errors.is_empty() {
                violations.push(PeriodRuleViolation::RecordHasValidationErrors {
                    employee_id: record.employee_id,
                    details: record.validation_errors.join(", "),
                });
            }
            if options.require_vouchers && record.voucher_number.is_none() {
                violations.push(PeriodRuleViolation::MissingVoucher {
                    employee_id: record.employee_id,
                });
            }
        }
        if !violations.is_empty() {
            return Err(EngineError::InvariantViolation { violations });
        }

        let snapshot = self.periods.records_for_period(period_id)?;
        for chunk in records.chunks(LIQUIDATION_BATCH_SIZE) {
            if let Err(error) = self.periods.upsert_records(chunk) {
                self.rollback_records(period_id, snapshot);
                return Err(error);
            }
        }

        let totals = PeriodTotals::from_records(&records);
        match self.periods.update_state(
            period_id,
            period.version,
            PeriodState::Closed,
            Some(totals),
            actor,
        ) {
            Ok(closed) => {
                tracing::info!(
                    %period_id,
                    employees = totals.employee_count,
                    "period closed"
                );
                Ok(closed)
            }
            Err(error) => {
                self.rollback_records(period_id, snapshot);
                Err(error)
            }
        }
    }

    /// Reopens a Closed period for editing.
    ///
    /// Periods already reported to an external authority are immutable;
    /// a reopen is also rejected while another period is currently open.
    pub fn reopen_period(
        &self,
        period_id: Uuid,
        today: NaiveDate,
        actor: &str,
    ) -> EngineResult<PayrollPeriod> {
        let period = self.periods.get_period(period_id)?;
        if period.state != PeriodState::Closed {
            return Err(EngineError::validation(
                "state",
                format!("only closed periods can be reopened (was {:?})", period.state),
            ));
        }

        let existing = self.periods.periods_for_company(period.company_id)?;
        let mut violations = Self::invariant_sweep(&existing, &period, true, today);
        if period.reported_to_authority {
            violations.push(PeriodRuleViolation::PeriodAlreadyReported);
        }
        if !violations.is_empty() {
            return Err(EngineError::InvariantViolation { violations });
        }

        let reopened = self.periods.update_state(
            period_id,
            period.version,
            PeriodState::Reopened,
            None,
            actor,
        )?;
        tracing::info!(%period_id, "period reopened");
        Ok(reopened)
    }

    /// Cancels a Draft period that was never closed.
    pub fn cancel_period(&self, period_id: Uuid, actor: &str) -> EngineResult<PayrollPeriod> {
        let period = self.periods.get_period(period_id)?;
        if period.state != PeriodState::Draft {
            return Err(EngineError::validation(
                "state",
                format!("only draft periods can be cancelled (was {:?})", period.state),
            ));
        }
        self.periods.update_state(
            period_id,
            period.version,
            PeriodState::Cancelled,
            None,
            actor,
        )
    }

    /// Marks a period as reported to an external authority, freezing it
    /// against reopening.
    pub fn mark_reported(&self, period_id: Uuid) -> EngineResult<()> {
        self.periods.set_reported(period_id, true)
    }

    /// Runs the three invariant checks for `subject` against the
    /// company's periods, collecting every violation.
    ///
    /// `subject_opens` is true when the operation leaves the subject in
    /// an editable state (create, reopen) and false when it closes it.
    fn invariant_sweep(
        existing: &[PayrollPeriod],
        subject: &PayrollPeriod,
        subject_opens: bool,
        today: NaiveDate,
    ) -> Vec<PeriodRuleViolation> {
        let mut violations = Vec::new();
        let others: Vec<&PayrollPeriod> =
            existing.iter().filter(|p| p.id != subject.id).collect();

        // Check 1: a single open period at a time. Future-dated drafts
        // are governed by check 3 instead.
        if subject_opens && !subject.is_future(today) {
            for other in &others {
                if other.is_open() && !other.is_future(today) {
                    violations.push(PeriodRuleViolation::OpenPeriodExists {
                        period_id: other.id,
                    });
                }
            }
        }

        // Check 2: no overlapping ranges among non-cancelled periods.
        for other in &others {
            if other.state != PeriodState::Cancelled && subject.overlaps(other) {
                violations.push(PeriodRuleViolation::OverlappingPeriod {
                    period_id: other.id,
                });
            }
        }

        // Check 3: at most one future-dated period.
        if subject.is_future(today) {
            for other in &others {
                if other.state != PeriodState::Cancelled && other.is_future(today) {
                    violations.push(PeriodRuleViolation::FuturePeriodExists {
                        period_id: other.id,
                    });
                }
            }
        }

        violations
    }

    fn rollback_records(&self, period_id: Uuid, snapshot: Vec<crate::models::PayrollRecord>) {
        if let Err(error) = self.periods.replace_records(period_id, snapshot) {
            tracing::warn!(%period_id, %error, "compensating rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationStore;
    use crate::models::{ArlRiskClass, ContractType, Employee, EmployeeStatus};
    use crate::repository::memory::{
        InMemoryConfigurationRepository, InMemoryEmployeeRepository, InMemoryNovedadRepository,
        InMemoryPeriodRepository,
    };
    use rust_decimal::Decimal;

    const TODAY: (i32, u32, u32) = (2025, 4, 15);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    struct Fixture {
        company_id: Uuid,
        employees: Arc<InMemoryEmployeeRepository>,
        periods: Arc<InMemoryPeriodRepository>,
        manager: PeriodLifecycleManager,
    }

    fn fixture() -> Fixture {
        let employees = Arc::new(InMemoryEmployeeRepository::new());
        let periods = Arc::new(InMemoryPeriodRepository::new());
        let novedades = Arc::new(InMemoryNovedadRepository::new(periods.clone()));
        let configuration = Arc::new(ConfigurationStore::new(Arc::new(
            InMemoryConfigurationRepository::new(),
        )));
        let orchestrator = Arc::new(LiquidationOrchestrator::new(
            employees.clone(),
            novedades,
            periods.clone(),
            configuration,
        ));
        Fixture {
            company_id: Uuid::new_v4(),
            employees,
            periods: periods.clone(),
            manager: PeriodLifecycleManager::new(periods, orchestrator),
        }
    }

    fn add_employee(fixture: &Fixture) {
        fixture.employees.insert(Employee {
            id: Uuid::new_v4(),
            company_id: fixture.company_id,
            full_name: "Worker".to_string(),
            base_salary: Decimal::from(2_000_000),
            contract_type: ContractType::Indefinite,
            health_insurer: "EPS".to_string(),
            pension_fund: "AFP".to_string(),
            arl_risk_class: ArlRiskClass::I,
            status: EmployeeStatus::Active,
        });
    }

    fn create_april(fixture: &Fixture) -> PayrollPeriod {
        fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 4, 1),
                date(2025, 4, 30),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap()
    }

    fn violations_of(error: EngineError) -> Vec<PeriodRuleViolation> {
        match error {
            EngineError::InvariantViolation { violations } => violations,
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_create_first_period_succeeds() {
        let fixture = fixture();
        let period = create_april(&fixture);
        assert_eq!(period.state, PeriodState::Draft);
    }

    #[test]
    fn test_second_open_period_rejected() {
        let fixture = fixture();
        let april = create_april(&fixture);

        let error = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 3, 1),
                date(2025, 3, 31),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap_err();

        let violations = violations_of(error);
        assert!(violations.contains(&PeriodRuleViolation::OpenPeriodExists {
            period_id: april.id
        }));
    }

    #[test]
    fn test_overlapping_period_rejected() {
        let fixture = fixture();
        let april = create_april(&fixture);

        let error = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 4, 20),
                date(2025, 5, 19),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap_err();

        // Both the open-period and the overlap rule fire; all violations
        // are reported together.
        let violations = violations_of(error);
        assert!(violations.contains(&PeriodRuleViolation::OpenPeriodExists {
            period_id: april.id
        }));
        assert!(violations.contains(&PeriodRuleViolation::OverlappingPeriod {
            period_id: april.id
        }));
    }

    #[test]
    fn test_future_period_allowed_next_to_open_current() {
        let fixture = fixture();
        create_april(&fixture);

        let may = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 5, 1),
                date(2025, 5, 31),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap();
        assert_eq!(may.state, PeriodState::Draft);
        assert!(may.is_future(today()));
    }

    #[test]
    fn test_second_future_period_rejected() {
        let fixture = fixture();
        create_april(&fixture);
        let may = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 5, 1),
                date(2025, 5, 31),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap();

        let error = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 6, 1),
                date(2025, 6, 30),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap_err();

        let violations = violations_of(error);
        assert!(violations.contains(&PeriodRuleViolation::FuturePeriodExists {
            period_id: may.id
        }));
    }

    #[test]
    fn test_different_companies_do_not_interfere() {
        let fixture = fixture();
        create_april(&fixture);

        let other_company = Uuid::new_v4();
        let result = fixture.manager.create_period(
            other_company,
            date(2025, 4, 1),
            date(2025, 4, 30),
            PeriodKind::Monthly,
            today(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_cancelled_period_does_not_block_overlap() {
        let fixture = fixture();
        let april = create_april(&fixture);
        fixture.manager.cancel_period(april.id, "tester").unwrap();

        let replacement = fixture.manager.create_period(
            fixture.company_id,
            date(2025, 4, 1),
            date(2025, 4, 30),
            PeriodKind::Monthly,
            today(),
        );
        assert!(replacement.is_ok());
    }

    #[test]
    fn test_close_with_zero_records_rejected() {
        let fixture = fixture();
        let april = create_april(&fixture);

        let error = fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap_err();
        assert!(violations_of(error).contains(&PeriodRuleViolation::NoEmployeeRecords));
    }

    #[test]
    fn test_close_writes_records_and_totals() {
        let fixture = fixture();
        add_employee(&fixture);
        add_employee(&fixture);
        let april = create_april(&fixture);

        let closed = fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap();

        assert_eq!(closed.state, PeriodState::Closed);
        assert_eq!(closed.totals.employee_count, 2);

        let records = fixture.periods.records_for_period(april.id).unwrap();
        assert_eq!(records.len(), 2);
        let gross: Decimal = records.iter().map(|r| r.gross_pay).sum();
        let net: Decimal = records.iter().map(|r| r.net_pay).sum();
        let deductions: Decimal = records.iter().map(|r| r.total_deductions).sum();
        assert_eq!(closed.totals.gross_pay, gross);
        assert_eq!(closed.totals.net_pay, net);
        assert_eq!(closed.totals.total_deductions, deductions);
        assert_eq!(closed.closure_history.len(), 1);
    }

    #[test]
    fn test_close_requires_vouchers_when_asked() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);

        let error = fixture
            .manager
            .close_period(
                april.id,
                CloseOptions {
                    require_vouchers: true,
                },
                today(),
                "tester",
            )
            .unwrap_err();
        let violations = violations_of(error);
        assert!(matches!(
            violations[0],
            PeriodRuleViolation::MissingVoucher { .. }
        ));
    }

    #[test]
    fn test_close_rolls_back_records_when_transition_fails() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);

        fixture.periods.fail_next_state_update();
        let error = fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap_err();
        assert!(matches!(error, EngineError::PersistenceFailure { .. }));

        // No records may survive the failed attempt, and the period must
        // still be open.
        assert!(fixture.periods.records_for_period(april.id).unwrap().is_empty());
        let period = fixture.periods.get_period(april.id).unwrap();
        assert_eq!(period.state, PeriodState::Draft);
    }

    #[test]
    fn test_close_rolls_back_on_batch_write_failure() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);

        fixture.periods.fail_upsert_call(1);
        let error = fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap_err();
        assert!(matches!(error, EngineError::PersistenceFailure { .. }));
        assert!(fixture.periods.records_for_period(april.id).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_closed_period() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);
        fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap();

        let reopened = fixture
            .manager
            .reopen_period(april.id, today(), "tester")
            .unwrap();
        assert_eq!(reopened.state, PeriodState::Reopened);
        assert!(reopened.is_open());
        assert_eq!(reopened.closure_history.len(), 1);
        assert!(reopened.closure_history[0].reopened_at.is_some());
    }

    #[test]
    fn test_reopen_reported_period_rejected() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);
        fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap();
        fixture.manager.mark_reported(april.id).unwrap();

        let error = fixture
            .manager
            .reopen_period(april.id, today(), "tester")
            .unwrap_err();
        assert!(violations_of(error).contains(&PeriodRuleViolation::PeriodAlreadyReported));
    }

    #[test]
    fn test_reopen_blocked_while_another_period_open() {
        let fixture = fixture();
        add_employee(&fixture);
        let march = fixture
            .manager
            .create_period(
                fixture.company_id,
                date(2025, 3, 1),
                date(2025, 3, 31),
                PeriodKind::Monthly,
                today(),
            )
            .unwrap();
        fixture
            .manager
            .close_period(march.id, CloseOptions::default(), today(), "tester")
            .unwrap();
        let april = create_april(&fixture);

        let error = fixture
            .manager
            .reopen_period(march.id, today(), "tester")
            .unwrap_err();
        assert!(violations_of(error).contains(&PeriodRuleViolation::OpenPeriodExists {
            period_id: april.id
        }));
    }

    #[test]
    fn test_reopen_draft_is_a_validation_error() {
        let fixture = fixture();
        let april = create_april(&fixture);
        let error = fixture
            .manager
            .reopen_period(april.id, today(), "tester")
            .unwrap_err();
        assert!(matches!(error, EngineError::Validation { .. }));
    }

    #[test]
    fn test_closed_then_reopened_then_closed_again() {
        let fixture = fixture();
        add_employee(&fixture);
        let april = create_april(&fixture);

        fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap();
        fixture
            .manager
            .reopen_period(april.id, today(), "tester")
            .unwrap();
        let closed_again = fixture
            .manager
            .close_period(april.id, CloseOptions::default(), today(), "tester")
            .unwrap();

        assert_eq!(closed_again.state, PeriodState::Closed);
        assert_eq!(closed_again.closure_history.len(), 2);
    }
}
