//! Pattern orchestrator
//!
//! Runs every pattern of a set through validate, fetch, declare and cleanup.
//! Each pattern runs in its own task; a semaphore bounds how many are in
//! flight at once.

use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use trellis_client::Provisioner;
use trellis_core::domain::pattern::{PatternConfig, validate_name};
use trellis_core::domain::run::{Failure, PatternReport, PatternState, RunReport, Stage};
use trellis_core::domain::topology::DeclaredTopology;
use trellis_core::{DeployError, ErrorKind, PreflightError};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::lifecycle::PatternLifecycle;
use crate::source::{SourceControl, SourceFetcher};
use crate::staging::{StagingDir, staging_path};
use crate::topology::TopologyBuilder;

/// Runs pattern sets end to end
pub struct Orchestrator {
    config: EngineConfig,
    fetcher: Arc<SourceFetcher>,
    builder: Arc<TopologyBuilder>,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    /// Creates a new orchestrator
    pub fn new(
        config: EngineConfig,
        scm: Arc<dyn SourceControl>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_patterns.max(1)));
        Self {
            fetcher: Arc::new(SourceFetcher::new(scm)),
            builder: Arc::new(TopologyBuilder::new(provisioner)),
            config,
            semaphore,
        }
    }

    /// Checks the whole set before anything is fetched
    ///
    /// Rejects unsafe or duplicate names and staging directories that already
    /// exist, then creates the work root.
    pub fn preflight(&self, patterns: &[PatternConfig]) -> Result<(), PreflightError> {
        let mut seen = HashSet::new();

        for pattern in patterns {
            // names become path components
            validate_name(&pattern.name).map_err(PreflightError::InvalidConfig)?;

            if !seen.insert(pattern.name.as_str()) {
                return Err(PreflightError::DuplicateName(pattern.name.clone()));
            }

            let path = staging_path(&self.config.work_root, &pattern.name);
            if path.symlink_metadata().is_ok() {
                return Err(PreflightError::DestinationConflict {
                    name: pattern.name.clone(),
                    path,
                });
            }
        }

        std::fs::create_dir_all(&self.config.work_root).map_err(|source| {
            PreflightError::WorkRoot {
                path: self.config.work_root.clone(),
                source,
            }
        })?;

        Ok(())
    }

    /// Runs every pattern and collects their reports in input order
    ///
    /// Only a preflight failure aborts the run; pattern failures are part of
    /// the report.
    pub async fn run(&self, patterns: Vec<PatternConfig>) -> Result<RunReport, PreflightError> {
        self.preflight(&patterns)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting run {} with {} pattern(s) (max parallel: {})",
            run_id,
            patterns.len(),
            self.config.max_parallel_patterns
        );

        let mut handles = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let name = pattern.name.clone();
            let kind = pattern.kind.label().to_string();
            let lifecycle = PatternLifecycle::new(&name);
            let handle = self.spawn_pattern_task(pattern, lifecycle.clone());
            handles.push((name, kind, lifecycle, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, kind, lifecycle, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Pattern task for '{}' panicked: {}", name, e);
                    reports.push(aborted_report(
                        name,
                        kind,
                        &lifecycle,
                        format!("pattern task aborted: {}", e),
                    ));
                }
            }
        }

        let run = RunReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            patterns: reports,
        };

        info!(
            "Run {} finished: {} succeeded, {} failed",
            run_id,
            run.patterns.len() - run.failed_patterns().count(),
            run.failed_patterns().count()
        );
        Ok(run)
    }

    /// Spawns the task of one pattern; the permit is held for its whole pipeline
    fn spawn_pattern_task(
        &self,
        pattern: PatternConfig,
        lifecycle: PatternLifecycle,
    ) -> tokio::task::JoinHandle<PatternReport> {
        let semaphore = Arc::clone(&self.semaphore);
        let fetcher = Arc::clone(&self.fetcher);
        let builder = Arc::clone(&self.builder);
        let work_root = self.config.work_root.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return aborted_report(
                        pattern.name.clone(),
                        pattern.kind.label().to_string(),
                        &lifecycle,
                        format!("scheduler closed: {}", e),
                    );
                }
            };
            Self::execute_pattern(pattern, lifecycle, &work_root, &fetcher, &builder).await
            // Permit is released when dropped
        })
    }

    /// Executes a single pattern
    async fn execute_pattern(
        pattern: PatternConfig,
        lifecycle: PatternLifecycle,
        work_root: &Path,
        fetcher: &SourceFetcher,
        builder: &TopologyBuilder,
    ) -> PatternReport {
        let started_at = Utc::now();
        info!("Starting {} pattern '{}'", pattern.kind.label(), pattern.name);

        let mut staging = StagingDir::new(work_root, &pattern.name);
        let mut topology = DeclaredTopology::default();
        let mut notes = Vec::new();

        let outcome = Self::stage_and_declare(
            &pattern,
            fetcher,
            builder,
            &mut staging,
            &lifecycle,
            &mut topology,
        )
        .await;

        let failure = match outcome {
            Ok(()) => None,
            Err((stage, e)) => {
                error!("Pattern '{}' failed at {}: {}", pattern.name, stage, e);
                if let Err(e) = lifecycle.advance(PatternState::Failed) {
                    warn!("{}", e);
                    notes.push(e.to_string());
                }
                if !topology.resources.is_empty() {
                    notes.push(format!(
                        "{} resource(s) were declared before the failure",
                        topology.resources.len()
                    ));
                }
                Some(Failure {
                    stage,
                    kind: e.kind(),
                    message: e.to_string(),
                })
            }
        };

        if !staging.is_owned() {
            notes.push(format!(
                "staging directory {} existed before this run and was left in place",
                staging.path().display()
            ));
        }

        // cleanup problems never replace the outcome
        if let Err(e) = staging.cleanup() {
            warn!(
                "Failed to remove staging directory {}: {}",
                staging.path().display(),
                e
            );
            notes.push(format!(
                "failed to remove staging directory {}: {}",
                staging.path().display(),
                e
            ));
        }

        if let Err(e) = lifecycle.advance(PatternState::Cleaned) {
            warn!("{}", e);
            notes.push(e.to_string());
        }

        if failure.is_none() {
            info!(
                "Pattern '{}' completed with {} resource(s)",
                pattern.name,
                topology.resources.len()
            );
        }

        PatternReport {
            name: pattern.name.clone(),
            kind: pattern.kind.label().to_string(),
            final_state: lifecycle.state(),
            transitions: lifecycle.transitions(),
            failure,
            resources: topology.resources,
            outputs: topology.outputs,
            notes,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Validate, fetch and declare, stopping at the first failure
    async fn stage_and_declare(
        pattern: &PatternConfig,
        fetcher: &SourceFetcher,
        builder: &TopologyBuilder,
        staging: &mut StagingDir,
        lifecycle: &PatternLifecycle,
        topology: &mut DeclaredTopology,
    ) -> Result<(), (Stage, DeployError)> {
        pattern.validate().map_err(|e| (Stage::Validate, e))?;

        let staged = match fetcher
            .fetch(
                &pattern.repository,
                &pattern.branch,
                staging.path(),
                pattern.revision.as_deref(),
            )
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                if matches!(e, DeployError::DestinationConflict { .. }) {
                    // the directory is not ours to remove
                    staging.release();
                }
                return Err((Stage::Fetch, e));
            }
        };
        lifecycle
            .advance(PatternState::SourceStaged)
            .map_err(|e| (Stage::Fetch, e))?;

        builder
            .declare_into(pattern, &staged, topology)
            .await
            .map_err(|e| (Stage::Declare, e))?;
        lifecycle
            .advance(PatternState::TopologyDeclared)
            .map_err(|e| (Stage::Declare, e))?;

        Ok(())
    }
}

/// Report of a pattern whose task never produced one
///
/// The staging guard is dropped when the task unwinds, so the lifecycle is
/// closed through `Failed` to `Cleaned`.
fn aborted_report(
    name: String,
    kind: String,
    lifecycle: &PatternLifecycle,
    message: String,
) -> PatternReport {
    lifecycle.abort();
    let now = Utc::now();
    PatternReport {
        name,
        kind,
        final_state: lifecycle.state(),
        transitions: lifecycle.transitions(),
        failure: Some(Failure {
            stage: Stage::Execute,
            kind: ErrorKind::Internal,
            message,
        }),
        resources: Vec::new(),
        outputs: Default::default(),
        notes: Vec::new(),
        started_at: now,
        completed_at: now,
    }
}
