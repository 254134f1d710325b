//! Core domain types
//!
//! These types are shared between the engine (which produces them) and the
//! provisioning clients and CLI (which consume them).

pub mod pattern;
pub mod run;
pub mod topology;
