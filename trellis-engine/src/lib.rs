//! Trellis Engine
//!
//! Runs deployment patterns end to end: stage the source, declare the
//! topology, clean up.
//!
//! Architecture:
//! - Configuration: work root and parallelism, from environment or defaults
//! - Source: clone/checkout of a repository into a per-pattern staging directory
//! - Topology: pattern config to resource declarations against a provisioner
//! - Scheduler: per-pattern lifecycle and the concurrent orchestrator
//!
//! Every pattern owns its staging directory for the duration of its pipeline
//! and the directory is removed on every exit path.

pub mod config;
pub mod lifecycle;
pub mod scheduler;
pub mod source;
pub mod staging;
pub mod topology;

#[cfg(test)]
pub(crate) mod testing;

pub use config::EngineConfig;
pub use scheduler::Orchestrator;
pub use source::{GitSource, SourceControl, SourceFetcher, StagedSource};
pub use staging::StagingDir;
pub use topology::TopologyBuilder;
