//! Payroll period model and state machine types.
//!
//! This module contains the [`PayrollPeriod`] aggregate together with its
//! state, kind, totals, and closure-history types. The transition rules
//! themselves live in the lifecycle service; this module only knows what a
//! period *is* and which date arithmetic belongs to it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::PayrollRecord;

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting an end date before the start date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if end < start {
            return Err(EngineError::validation(
                "date_range",
                format!("end date {end} is before start date {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Returns true if the date falls inside the range (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true if the two ranges share at least one day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days in the range, inclusive of both ends.
    pub fn calendar_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }
}

/// The cadence a payroll period is liquidated on.
///
/// The kind determines how many days of salary an employee accrues in the
/// period: weekly and biweekly periods use the commercial 7/15 day counts,
/// monthly periods use the real calendar length of the range, and custom
/// periods carry their day count explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// Seven-day period.
    Weekly,
    /// Fifteen-day (commercial half-month) period.
    Biweekly,
    /// Calendar-month period.
    Monthly,
    /// Arbitrary period with an explicit worked-day count.
    Custom {
        /// Days of salary accrued over the period.
        worked_days: u32,
    },
}

/// The lifecycle state of a payroll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
    /// Newly created; novedades and records may be edited.
    Draft,
    /// Liquidated and committed; immutable outside the adjustment service.
    Closed,
    /// Reopened after a close; editable again but retains closure history.
    Reopened,
    /// Abandoned before ever being closed; ignored by overlap checks.
    Cancelled,
}

/// Aggregate totals committed when a period closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Sum of gross pay across all employee records.
    pub gross_pay: Decimal,
    /// Sum of every deduction across all employee records.
    pub total_deductions: Decimal,
    /// Sum of net pay across all employee records.
    pub net_pay: Decimal,
    /// Number of employee records in the period.
    pub employee_count: u32,
}

impl PeriodTotals {
    /// An all-zero totals value, used for freshly created periods.
    pub fn zero() -> Self {
        Self {
            gross_pay: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            net_pay: Decimal::ZERO,
            employee_count: 0,
        }
    }

    /// Recomputes totals from a set of employee records.
    ///
    /// Close operations always derive totals from the records they just
    /// wrote; previously cached totals are never trusted.
    pub fn from_records(records: &[PayrollRecord]) -> Self {
        Self {
            gross_pay: records.iter().map(|r| r.gross_pay).sum(),
            total_deductions: records.iter().map(|r| r.total_deductions).sum(),
            net_pay: records.iter().map(|r| r.net_pay).sum(),
            employee_count: records.len() as u32,
        }
    }
}

/// One close (and optional subsequent reopen) of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureEvent {
    /// When the period was closed.
    pub closed_at: DateTime<Utc>,
    /// Who closed it.
    pub closed_by: String,
    /// When (and if) the close was undone by a reopen.
    pub reopened_at: Option<DateTime<Utc>>,
    /// Who reopened it, when reopened.
    pub reopened_by: Option<String>,
}

/// A payroll period for one company.
///
/// Periods are created by the lifecycle manager and move through
/// `Draft → Closed → Reopened → Closed`. The `version` field is an
/// optimistic-concurrency token: every state transition must present the
/// version it read, and the repository rejects stale writes so two
/// concurrent close/reopen operations cannot both succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// Unique identifier for the period.
    pub id: Uuid,
    /// The company this period belongs to.
    pub company_id: Uuid,
    /// The inclusive date range the period covers.
    pub range: DateRange,
    /// The liquidation cadence.
    pub kind: PeriodKind,
    /// The current lifecycle state.
    pub state: PeriodState,
    /// Aggregate totals, recomputed at close.
    pub totals: PeriodTotals,
    /// Optimistic-concurrency token, bumped on every state change.
    pub version: u64,
    /// Whether the period was reported to an external authority.
    /// Reported periods can never be reopened.
    pub reported_to_authority: bool,
    /// Every close/reopen cycle the period has been through.
    pub closure_history: Vec<ClosureEvent>,
}

impl PayrollPeriod {
    /// Creates a new Draft period, validating its date range and kind.
    pub fn new(
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        kind: PeriodKind,
    ) -> EngineResult<Self> {
        let range = DateRange::new(start, end)?;
        if let PeriodKind::Custom { worked_days } = kind {
            if worked_days == 0 {
                return Err(EngineError::validation(
                    "worked_days",
                    "custom period must cover at least one day",
                ));
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            company_id,
            range,
            kind,
            state: PeriodState::Draft,
            totals: PeriodTotals::zero(),
            version: 0,
            reported_to_authority: false,
            closure_history: Vec::new(),
        })
    }

    /// Returns true if novedades and records may currently be edited.
    pub fn is_open(&self) -> bool {
        matches!(self.state, PeriodState::Draft | PeriodState::Reopened)
    }

    /// Returns true if the period starts strictly after the given day.
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.range.start > today
    }

    /// Returns true if the two periods share at least one day.
    pub fn overlaps(&self, other: &PayrollPeriod) -> bool {
        self.range.overlaps(&other.range)
    }

    /// The number of salary days employees accrue over this period.
    pub fn worked_days(&self) -> u32 {
        match self.kind {
            PeriodKind::Weekly => 7,
            PeriodKind::Biweekly => 15,
            PeriodKind::Monthly => self.range.calendar_days(),
            PeriodKind::Custom { worked_days } => worked_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_period(start: NaiveDate, end: NaiveDate) -> PayrollPeriod {
        PayrollPeriod::new(Uuid::new_v4(), start, end, PeriodKind::Monthly).unwrap()
    }

    #[test]
    fn test_new_period_starts_as_draft_with_zero_totals() {
        let period = monthly_period(date(2025, 4, 1), date(2025, 4, 30));
        assert_eq!(period.state, PeriodState::Draft);
        assert_eq!(period.totals, PeriodTotals::zero());
        assert_eq!(period.version, 0);
        assert!(!period.reported_to_authority);
        assert!(period.closure_history.is_empty());
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        let result = PayrollPeriod::new(
            Uuid::new_v4(),
            date(2025, 4, 30),
            date(2025, 4, 1),
            PeriodKind::Monthly,
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_new_rejects_zero_day_custom_period() {
        let result = PayrollPeriod::new(
            Uuid::new_v4(),
            date(2025, 4, 1),
            date(2025, 4, 10),
            PeriodKind::Custom { worked_days: 0 },
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_worked_days_per_kind() {
        let weekly = PayrollPeriod::new(
            Uuid::new_v4(),
            date(2025, 4, 7),
            date(2025, 4, 13),
            PeriodKind::Weekly,
        )
        .unwrap();
        assert_eq!(weekly.worked_days(), 7);

        let biweekly = PayrollPeriod::new(
            Uuid::new_v4(),
            date(2025, 4, 1),
            date(2025, 4, 15),
            PeriodKind::Biweekly,
        )
        .unwrap();
        assert_eq!(biweekly.worked_days(), 15);

        let april = monthly_period(date(2025, 4, 1), date(2025, 4, 30));
        assert_eq!(april.worked_days(), 30);

        let february = monthly_period(date(2025, 2, 1), date(2025, 2, 28));
        assert_eq!(february.worked_days(), 28);

        let custom = PayrollPeriod::new(
            Uuid::new_v4(),
            date(2025, 4, 1),
            date(2025, 4, 20),
            PeriodKind::Custom { worked_days: 18 },
        )
        .unwrap();
        assert_eq!(custom.worked_days(), 18);
    }

    #[test]
    fn test_is_open_only_for_draft_and_reopened() {
        let mut period = monthly_period(date(2025, 4, 1), date(2025, 4, 30));
        assert!(period.is_open());
        period.state = PeriodState::Closed;
        assert!(!period.is_open());
        period.state = PeriodState::Reopened;
        assert!(period.is_open());
        period.state = PeriodState::Cancelled;
        assert!(!period.is_open());
    }

    #[test]
    fn test_is_future_compares_start_date() {
        let period = monthly_period(date(2025, 5, 1), date(2025, 5, 31));
        assert!(period.is_future(date(2025, 4, 30)));
        assert!(!period.is_future(date(2025, 5, 1)));
        assert!(!period.is_future(date(2025, 6, 1)));
    }

    #[test]
    fn test_overlap_detection() {
        let april = monthly_period(date(2025, 4, 1), date(2025, 4, 30));
        let late_april = monthly_period(date(2025, 4, 30), date(2025, 5, 29));
        let may = monthly_period(date(2025, 5, 1), date(2025, 5, 31));

        assert!(april.overlaps(&late_april));
        assert!(late_april.overlaps(&april));
        assert!(!april.overlaps(&may));
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2025, 4, 1), date(2025, 4, 30)).unwrap();
        assert!(range.contains(date(2025, 4, 1)));
        assert!(range.contains(date(2025, 4, 30)));
        assert!(!range.contains(date(2025, 3, 31)));
        assert!(!range.contains(date(2025, 5, 1)));
    }

    #[test]
    fn test_period_state_serialization() {
        assert_eq!(
            serde_json::to_string(&PeriodState::Draft).unwrap(),
            "\"draft\""
        );
        assert_eq!(
            serde_json::to_string(&PeriodState::Reopened).unwrap(),
            "\"reopened\""
        );
    }

    #[test]
    fn test_period_kind_custom_serialization() {
        let kind = PeriodKind::Custom { worked_days: 12 };
        let json = serde_json::to_string(&kind).unwrap();
        let back: PeriodKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, back);
    }
}
