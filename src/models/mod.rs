//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod employee;
mod novedad;
mod payroll_record;
mod period;

pub use employee::{ArlRiskClass, ContractType, Employee, EmployeeStatus};
pub use novedad::{CalculationTrace, IncapacitySubtype, Novedad, NovedadKind, NovedadQuantity};
pub use payroll_record::{
    CalculationPath, EmployerContributions, PayrollRecord, SolidarityDeductions,
};
pub use period::{
    ClosureEvent, DateRange, PayrollPeriod, PeriodKind, PeriodState, PeriodTotals,
};
