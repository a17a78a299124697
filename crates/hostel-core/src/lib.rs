//! Core library for hostel bed operations: assignment lifecycle, conflict
//! detection, rule evaluation, greedy optimization, and room availability
//! tracking, plus the shared configuration and telemetry plumbing used by the
//! API service.

pub mod allocation;
pub mod config;
pub mod error;
pub mod telemetry;
