//! Closed-period adjustments.
//!
//! Once a period closes, its novedades are immutable — except through
//! this service, which offers two audited escape hatches:
//!
//! - **Corrective**: the novedad is created directly inside the closed
//!   period, bypassing the editability gate.
//! - **Compensatory**: the closed period stays untouched; the novedad
//!   lands in the company's current open period, or the nearest future
//!   one.
//!
//! Every adjustment is paired with an audit record. If the audit record
//! cannot be persisted, the novedad write is rolled back: adjustments
//! without an audit trail are not permitted.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Novedad, NovedadKind, PayrollPeriod, PeriodState};
use crate::repository::{AuditAction, AuditRecord, AuditSink, NovedadRepository, PeriodRepository};

/// A requested adjustment for one employee.
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    /// The employee the adjustment applies to.
    pub employee_id: Uuid,
    /// The kind of novedad to create.
    pub kind: NovedadKind,
    /// The adjustment value.
    pub value: Decimal,
    /// Note shown on the payroll detail.
    pub observation: String,
    /// Free-text justification stored in the audit record.
    pub justification: String,
    /// Who is making the adjustment.
    pub actor: String,
    /// The novedad being corrected, when the adjustment amends one;
    /// its value becomes the audit record's before-value.
    pub corrects_novedad_id: Option<Uuid>,
}

/// The result of a successful adjustment.
#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    /// The novedad that was created.
    pub novedad: Novedad,
    /// The audit record documenting it.
    pub audit_record_id: Uuid,
    /// The period the novedad landed in.
    pub target_period_id: Uuid,
}

/// Applies corrective and compensatory adjustments to closed periods.
pub struct ClosedPeriodAdjustmentService {
    novedades: Arc<dyn NovedadRepository>,
    periods: Arc<dyn PeriodRepository>,
    audit: Arc<dyn AuditSink>,
}

impl ClosedPeriodAdjustmentService {
    /// Creates the service over its three collaborators.
    pub fn new(
        novedades: Arc<dyn NovedadRepository>,
        periods: Arc<dyn PeriodRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            novedades,
            periods,
            audit,
        }
    }

    /// Creates the adjustment novedad inside the closed period itself.
    pub fn corrective(
        &self,
        period_id: Uuid,
        request: AdjustmentRequest,
    ) -> EngineResult<AdjustmentOutcome> {
        let period = self.require_closed(period_id)?;
        let before_value = self.before_value(&request)?;

        let novedad = Novedad::manual(
            request.employee_id,
            period.id,
            request.kind.clone(),
            request.value,
            request.observation.clone(),
        );
        self.novedades.create_adjustment(novedad.clone())?;

        let audit_record_id = self.append_audit_or_rollback(
            AuditAction::CorrectiveAdjustment,
            &period,
            period.id,
            &novedad,
            before_value,
            &request,
            true,
        )?;

        tracing::info!(
            %period_id,
            novedad_id = %novedad.id,
            "corrective adjustment applied inside closed period"
        );
        Ok(AdjustmentOutcome {
            audit_record_id,
            target_period_id: period.id,
            novedad,
        })
    }

    /// Creates the adjustment novedad in the company's current open
    /// period, or the nearest future one, leaving the closed period
    /// untouched.
    ///
    /// Fails with `NoActivePeriodAvailable` when the company has neither.
    pub fn compensatory(
        &self,
        closed_period_id: Uuid,
        request: AdjustmentRequest,
        today: NaiveDate,
    ) -> EngineResult<AdjustmentOutcome> {
        let source = self.require_closed(closed_period_id)?;
        let target = self.find_target_period(source.company_id, today)?;
        let before_value = self.before_value(&request)?;

        let novedad = Novedad::manual(
            request.employee_id,
            target.id,
            request.kind.clone(),
            request.value,
            request.observation.clone(),
        );
        // The target is open (or a future draft), so the ordinary gated
        // write applies.
        self.novedades.create(novedad.clone())?;

        let audit_record_id = self.append_audit_or_rollback(
            AuditAction::CompensatoryAdjustment,
            &source,
            target.id,
            &novedad,
            before_value,
            &request,
            false,
        )?;

        tracing::info!(
            source_period = %closed_period_id,
            target_period = %target.id,
            novedad_id = %novedad.id,
            "compensatory adjustment applied"
        );
        Ok(AdjustmentOutcome {
            audit_record_id,
            target_period_id: target.id,
            novedad,
        })
    }

    fn require_closed(&self, period_id: Uuid) -> EngineResult<PayrollPeriod> {
        let period = self.periods.get_period(period_id)?;
        if period.state != PeriodState::Closed {
            return Err(EngineError::validation(
                "state",
                format!(
                    "adjustments target closed periods (period is {:?})",
                    period.state
                ),
            ));
        }
        Ok(period)
    }

    fn before_value(&self, request: &AdjustmentRequest) -> EngineResult<Option<Decimal>> {
        match request.corrects_novedad_id {
            Some(id) => Ok(Some(self.novedades.get_novedad(id)?.value)),
            None => Ok(None),
        }
    }

    /// Picks the current open period, else the nearest future one.
    fn find_target_period(
        &self,
        company_id: Uuid,
        today: NaiveDate,
    ) -> EngineResult<PayrollPeriod> {
        let periods = self.periods.periods_for_company(company_id)?;
        if let Some(open) = periods
            .iter()
            .find(|p| p.is_open() && !p.is_future(today))
        {
            return Ok(open.clone());
        }
        periods
            .into_iter()
            .filter(|p| p.is_open() && p.is_future(today))
            .min_by_key(|p| p.range.start)
            .ok_or(EngineError::NoActivePeriodAvailable { company_id })
    }

    #[allow(clippy::too_many_arguments)]
    fn append_audit_or_rollback(
        &self,
        action: AuditAction,
        source: &PayrollPeriod,
        target_period_id: Uuid,
        novedad: &Novedad,
        before_value: Option<Decimal>,
        request: &AdjustmentRequest,
        bypassed_gate: bool,
    ) -> EngineResult<Uuid> {
        let record_id = Uuid::new_v4();
        let record = AuditRecord {
            id: record_id,
            action,
            company_id: source.company_id,
            employee_id: request.employee_id,
            source_period_id: source.id,
            target_period_id: Some(target_period_id),
            novedad_id: Some(novedad.id),
            before_value,
            after_value: request.value,
            justification: request.justification.clone(),
            actor: request.actor.clone(),
            timestamp: Utc::now(),
        };

        if let Err(audit_error) = self.audit.append(record) {
            // No audit trail, no adjustment: undo the novedad write.
            let rollback = if bypassed_gate {
                self.novedades.delete_unchecked(novedad.id)
            } else {
                self.novedades.delete(novedad.id)
            };
            if let Err(rollback_error) = rollback {
                tracing::warn!(
                    novedad_id = %novedad.id,
                    %rollback_error,
                    "could not roll back adjustment novedad after audit failure"
                );
            }
            return Err(EngineError::AdjustmentAuditFailure {
                message: audit_error.to_string(),
            });
        }
        Ok(record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeriodKind;
    use crate::repository::memory::{
        InMemoryAuditSink, InMemoryNovedadRepository, InMemoryPeriodRepository,
    };
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 5, 10)
    }

    struct Fixture {
        company_id: Uuid,
        periods: Arc<InMemoryPeriodRepository>,
        novedades: Arc<InMemoryNovedadRepository>,
        audit: Arc<InMemoryAuditSink>,
        service: ClosedPeriodAdjustmentService,
    }

    fn fixture() -> Fixture {
        let periods = Arc::new(InMemoryPeriodRepository::new());
        let novedades = Arc::new(InMemoryNovedadRepository::new(periods.clone()));
        let audit = Arc::new(InMemoryAuditSink::new());
        let service = ClosedPeriodAdjustmentService::new(
            novedades.clone(),
            periods.clone(),
            audit.clone(),
        );
        Fixture {
            company_id: Uuid::new_v4(),
            periods,
            novedades,
            audit,
            service,
        }
    }

    fn closed_april(fixture: &Fixture) -> PayrollPeriod {
        let period = PayrollPeriod::new(
            fixture.company_id,
            date(2025, 4, 1),
            date(2025, 4, 30),
            PeriodKind::Monthly,
        )
        .unwrap();
        fixture.periods.insert_period(period.clone()).unwrap();
        fixture
            .periods
            .update_state(period.id, 0, PeriodState::Closed, None, "tester")
            .unwrap()
    }

    fn open_may(fixture: &Fixture) -> PayrollPeriod {
        let period = PayrollPeriod::new(
            fixture.company_id,
            date(2025, 5, 1),
            date(2025, 5, 31),
            PeriodKind::Monthly,
        )
        .unwrap();
        fixture.periods.insert_period(period.clone()).unwrap();
        period
    }

    fn discount_request() -> AdjustmentRequest {
        AdjustmentRequest {
            employee_id: Uuid::new_v4(),
            kind: NovedadKind::Fine,
            value: dec("50000"),
            observation: "overpaid overtime".to_string(),
            justification: "overtime was double counted in April".to_string(),
            actor: "analyst@acme".to_string(),
            corrects_novedad_id: None,
        }
    }

    #[test]
    fn test_corrective_creates_novedad_and_audit_inside_closed_period() {
        let fixture = fixture();
        let april = closed_april(&fixture);

        let outcome = fixture
            .service
            .corrective(april.id, discount_request())
            .unwrap();

        assert_eq!(outcome.target_period_id, april.id);
        let stored = fixture.novedades.get_by_period(april.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, dec("50000"));

        let audits = fixture.audit.records();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].action, AuditAction::CorrectiveAdjustment);
        assert_eq!(audits[0].source_period_id, april.id);
        assert_eq!(audits[0].target_period_id, Some(april.id));
        assert_eq!(audits[0].novedad_id, Some(stored[0].id));
        assert_eq!(audits[0].after_value, dec("50000"));
    }

    #[test]
    fn test_corrective_requires_a_closed_period() {
        let fixture = fixture();
        let may = open_may(&fixture);
        let error = fixture
            .service
            .corrective(may.id, discount_request())
            .unwrap_err();
        assert!(matches!(error, EngineError::Validation { .. }));
    }

    #[test]
    fn test_corrective_records_before_value_of_amended_novedad() {
        let fixture = fixture();
        let april = closed_april(&fixture);
        let original = Novedad::manual(
            Uuid::new_v4(),
            april.id,
            NovedadKind::Overtime,
            dec("120000"),
            "original",
        );
        fixture
            .novedades
            .create_adjustment(original.clone())
            .unwrap();

        let mut request = discount_request();
        request.corrects_novedad_id = Some(original.id);
        fixture.service.corrective(april.id, request).unwrap();

        let audits = fixture.audit.records();
        assert_eq!(audits.last().unwrap().before_value, Some(dec("120000")));
    }

    #[test]
    fn test_compensatory_lands_in_open_period() {
        let fixture = fixture();
        let april = closed_april(&fixture);
        let may = open_may(&fixture);

        let outcome = fixture
            .service
            .compensatory(april.id, discount_request(), today())
            .unwrap();

        assert_eq!(outcome.target_period_id, may.id);
        // The closed period stays untouched.
        assert!(fixture.novedades.get_by_period(april.id).unwrap().is_empty());
        assert_eq!(fixture.novedades.get_by_period(may.id).unwrap().len(), 1);

        let audits = fixture.audit.records();
        assert_eq!(audits[0].action, AuditAction::CompensatoryAdjustment);
        assert_eq!(audits[0].source_period_id, april.id);
        assert_eq!(audits[0].target_period_id, Some(may.id));
    }

    #[test]
    fn test_compensatory_falls_back_to_nearest_future_period() {
        let fixture = fixture();
        let april = closed_april(&fixture);
        let june = PayrollPeriod::new(
            fixture.company_id,
            date(2025, 6, 1),
            date(2025, 6, 30),
            PeriodKind::Monthly,
        )
        .unwrap();
        fixture.periods.insert_period(june.clone()).unwrap();

        let outcome = fixture
            .service
            .compensatory(april.id, discount_request(), today())
            .unwrap();
        assert_eq!(outcome.target_period_id, june.id);
    }

    #[test]
    fn test_compensatory_without_target_fails() {
        let fixture = fixture();
        let april = closed_april(&fixture);

        let error = fixture
            .service
            .compensatory(april.id, discount_request(), today())
            .unwrap_err();
        assert!(matches!(
            error,
            EngineError::NoActivePeriodAvailable { company_id } if company_id == fixture.company_id
        ));
    }

    #[test]
    fn test_corrective_audit_failure_rolls_back_novedad() {
        let fixture = fixture();
        let april = closed_april(&fixture);

        fixture.audit.fail_next_append();
        let error = fixture
            .service
            .corrective(april.id, discount_request())
            .unwrap_err();

        assert!(matches!(error, EngineError::AdjustmentAuditFailure { .. }));
        assert!(fixture.novedades.get_by_period(april.id).unwrap().is_empty());
        assert!(fixture.audit.records().is_empty());
    }

    #[test]
    fn test_compensatory_audit_failure_rolls_back_novedad() {
        let fixture = fixture();
        let april = closed_april(&fixture);
        let may = open_may(&fixture);

        fixture.audit.fail_next_append();
        let error = fixture
            .service
            .compensatory(april.id, discount_request(), today())
            .unwrap_err();

        assert!(matches!(error, EngineError::AdjustmentAuditFailure { .. }));
        assert!(fixture.novedades.get_by_period(may.id).unwrap().is_empty());
    }
}
