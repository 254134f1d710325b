//! Scheduler layer for the engine
//!
//! Coordinates pattern execution: pre-flight checks over the whole run, one
//! task per pattern, and collection of the per-pattern reports.

pub mod orchestrator;

pub use orchestrator::Orchestrator;
