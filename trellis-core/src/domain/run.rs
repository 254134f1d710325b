//! Run domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::topology::ResourceHandle;
use crate::error::ErrorKind;

/// Lifecycle state of one pattern within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternState {
    Pending,
    SourceStaged,
    TopologyDeclared,
    Failed,
    Cleaned,
}

impl PatternState {
    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(self, next: PatternState) -> bool {
        use PatternState::*;
        matches!(
            (self, next),
            (Pending, SourceStaged)
                | (Pending, Failed)
                | (SourceStaged, TopologyDeclared)
                | (SourceStaged, Failed)
                | (TopologyDeclared, Cleaned)
                | (Failed, Cleaned)
        )
    }
}

impl fmt::Display for PatternState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatternState::Pending => "pending",
            PatternState::SourceStaged => "source-staged",
            PatternState::TopologyDeclared => "topology-declared",
            PatternState::Failed => "failed",
            PatternState::Cleaned => "cleaned",
        };
        f.write_str(label)
    }
}

/// Pipeline stage at which a pattern failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Fetch,
    Declare,
    /// The pattern task itself aborted
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Declare => "declare",
            Stage::Execute => "execute",
        };
        f.write_str(label)
    }
}

/// Why a pattern failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub name: String,
    /// `function` or `service`
    pub kind: String,
    pub final_state: PatternState,
    pub transitions: Vec<PatternState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    pub resources: Vec<ResourceHandle>,
    pub outputs: BTreeMap<String, String>,
    /// Non-fatal remarks such as cleanup problems
    pub notes: Vec<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl PatternReport {
    /// True when the pattern reached `Cleaned` through `TopologyDeclared`
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
            && self.final_state == PatternState::Cleaned
            && self.transitions.contains(&PatternState::TopologyDeclared)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub patterns: Vec<PatternReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.patterns.iter().all(PatternReport::succeeded)
    }

    pub fn failed_patterns(&self) -> impl Iterator<Item = &PatternReport> {
        self.patterns.iter().filter(|p| !p.succeeded())
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(transitions: Vec<PatternState>, failure: Option<Failure>) -> PatternReport {
        PatternReport {
            name: "demo".to_string(),
            kind: "function".to_string(),
            final_state: *transitions.last().unwrap(),
            transitions,
            failure,
            resources: vec![],
            outputs: BTreeMap::new(),
            notes: vec![],
            started_at: chrono::Utc::now(),
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_state_machine_transitions() {
        use PatternState::*;
        assert!(Pending.can_advance_to(SourceStaged));
        assert!(Pending.can_advance_to(Failed));
        assert!(SourceStaged.can_advance_to(TopologyDeclared));
        assert!(TopologyDeclared.can_advance_to(Cleaned));
        assert!(Failed.can_advance_to(Cleaned));

        assert!(!Pending.can_advance_to(TopologyDeclared));
        assert!(!TopologyDeclared.can_advance_to(Failed));
        assert!(!Cleaned.can_advance_to(Pending));
    }

    #[test]
    fn test_run_exit_code() {
        use PatternState::*;
        let ok = report(vec![Pending, SourceStaged, TopologyDeclared, Cleaned], None);
        let failed = report(
            vec![Pending, Failed, Cleaned],
            Some(Failure {
                stage: Stage::Fetch,
                kind: ErrorKind::CloneFailed,
                message: "unreachable".to_string(),
            }),
        );

        let mut run = RunReport {
            run_id: Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            completed_at: chrono::Utc::now(),
            patterns: vec![ok.clone()],
        };
        assert!(run.succeeded());
        assert_eq!(run.exit_code(), 0);

        run.patterns.push(failed);
        assert!(!run.succeeded());
        assert_eq!(run.exit_code(), 1);
        assert_eq!(run.failed_patterns().count(), 1);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        use PatternState::*;
        let json = serde_json::to_value(report(vec![Pending, Failed, Cleaned], None)).unwrap();
        assert_eq!(json["finalState"], "cleaned");
        assert!(json.get("failure").is_none());
    }
}
