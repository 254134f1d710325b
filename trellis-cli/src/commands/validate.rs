//! Validate command

use anyhow::Result;
use colored::*;
use std::collections::HashSet;
use std::path::Path;
use std::process::ExitCode;
use trellis_core::DeployError;
use trellis_core::domain::pattern::{PatternConfig, PatternKind, Runtime, validate_name};

use super::load_patterns;
use crate::config::Config;

/// Checks names, uniqueness, invariants and runtimes of every pattern
pub fn run(config: &Config, file: &Path) -> Result<ExitCode> {
    let patterns = load_patterns(file, &config.environment)?;
    let problems = check(&patterns);

    for (index, pattern) in patterns.iter().enumerate() {
        match problems.iter().find(|(at, _)| *at == index) {
            Some((_, reason)) => println!(
                "  {} {} ({}): {}",
                "✗".red(),
                pattern.name.bold(),
                pattern.kind.label(),
                reason
            ),
            None => println!(
                "  {} {} ({})",
                "✓".green(),
                pattern.name.bold(),
                pattern.kind.label()
            ),
        }
    }

    if problems.is_empty() {
        println!(
            "{}",
            format!("✓ {} pattern(s) are valid", patterns.len())
                .green()
                .bold()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            format!("✗ {} problem(s) found", problems.len()).red().bold()
        );
        Ok(ExitCode::from(2))
    }
}

/// First problem of each offending pattern, keyed by its position in the set
///
/// Only the later entries of a duplicated name are flagged.
fn check(patterns: &[PatternConfig]) -> Vec<(usize, String)> {
    let mut seen = HashSet::new();
    let mut problems = Vec::new();

    for (index, pattern) in patterns.iter().enumerate() {
        if !seen.insert(pattern.name.as_str()) {
            problems.push((index, "name is used more than once".to_string()));
            continue;
        }
        if let Err(e) = check_pattern(pattern) {
            problems.push((index, e.to_string()));
        }
    }

    problems
}

fn check_pattern(pattern: &PatternConfig) -> Result<(), DeployError> {
    validate_name(&pattern.name)?;
    pattern.validate()?;
    if let PatternKind::Function(function) = &pattern.kind {
        function.runtime.parse::<Runtime>()?;
    }
    Ok(())
}
