//! Trellis Core
//!
//! Core types and abstractions for Trellis, the pattern-driven deployment tool.
//!
//! This crate contains:
//! - Domain types: patterns, topology requests and handles, run reports
//! - Pattern-set loading from JSON
//! - The error taxonomy shared by the engine and the CLI

pub mod domain;
pub mod error;
pub mod patterns;

pub use error::{DeployError, ErrorKind, LoadError, PreflightError, SourceFailure};
