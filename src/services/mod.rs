//! Orchestration services over the calculators and repositories.
//!
//! Liquidation, period lifecycle, closed-period adjustments, and policy
//! backfill. Services hold the repositories and the configuration store;
//! all arithmetic is delegated to the pure [`crate::calculation`] rules.

mod adjustment;
mod backfill;
mod lifecycle;
mod liquidation;

pub use adjustment::{AdjustmentOutcome, AdjustmentRequest, ClosedPeriodAdjustmentService};
pub use backfill::{
    BACKFILL_TOLERANCE, BackfillFailure, BackfillItem, BackfillReport, PolicyBackfillService,
};
pub use lifecycle::{CloseOptions, PeriodLifecycleManager};
pub use liquidation::{
    LIQUIDATION_BATCH_SIZE, LiquidationFailure, LiquidationOrchestrator, LiquidationReport,
};
