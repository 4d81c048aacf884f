//! Payroll Calculation & Period Lifecycle Engine
//!
//! This crate computes periodic payroll under Colombian labor law and
//! manages the lifecycle of payroll periods: statutory deductions, net
//! pay and employer contributions per employee, plus the state machine
//! governing when a period may be edited, closed, reopened, or
//! retroactively adjusted.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
