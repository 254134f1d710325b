//! Human-readable rendering of run reports and plans

use colored::*;
use trellis_core::domain::run::{PatternReport, RunReport};
use trellis_core::domain::topology::ResourceRequest;

/// Print a run report
pub fn print_report(report: &RunReport) {
    let failed = report.failed_patterns().count();
    let elapsed = report.completed_at - report.started_at;

    println!("{}", format!("Run {}", report.run_id).bold());
    println!(
        "  Started:  {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    println!(
        "  Duration: {}",
        format!("{}.{:03}s", elapsed.num_seconds(), elapsed.num_milliseconds() % 1000).dimmed()
    );
    println!();

    for pattern in &report.patterns {
        print_pattern(pattern);
    }

    if failed == 0 {
        println!(
            "{}",
            format!("✓ {} pattern(s) deployed", report.patterns.len())
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "✗ {} of {} pattern(s) failed",
                failed,
                report.patterns.len()
            )
            .red()
            .bold()
        );
    }
}

fn print_pattern(pattern: &PatternReport) {
    let marker = if pattern.succeeded() {
        "▸".green()
    } else {
        "▸".red()
    };
    println!(
        "  {} {} {}",
        marker,
        pattern.name.bold(),
        format!("({})", pattern.kind).dimmed()
    );
    println!(
        "    States:    {}",
        pattern
            .transitions
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
            .dimmed()
    );

    if let Some(failure) = &pattern.failure {
        println!(
            "    Failed at: {} {}",
            failure.stage.to_string().yellow(),
            failure.kind.to_string().red()
        );
        println!("    Error:     {}", failure.message);
    }

    if !pattern.resources.is_empty() {
        println!("    Resources: {}", pattern.resources.len());
        for resource in &pattern.resources {
            println!(
                "      - {} {} {}",
                resource.logical_id.cyan(),
                format!("[{}]", resource.kind).dimmed(),
                resource.reference.dimmed()
            );
        }
    }

    for (key, value) in &pattern.outputs {
        println!("    Output:    {} = {}", key.cyan(), value.bold());
    }

    for note in &pattern.notes {
        println!("    {} {}", "note:".yellow(), note);
    }
    println!();
}

/// Print the declarations of a plan, in the order they were issued
pub fn print_declarations(declarations: &[ResourceRequest]) {
    if declarations.is_empty() {
        println!("{}", "No declarations.".yellow());
        return;
    }

    println!(
        "{}",
        format!("{} declaration(s):", declarations.len()).bold()
    );
    for request in declarations {
        println!(
            "  {} {} {}",
            "+".green(),
            request.logical_id().cyan(),
            format!("[{}]", request.kind()).dimmed()
        );
        if let Some(detail) = describe(request) {
            println!("      {}", detail.dimmed());
        }
    }
}

/// One-line summary of the interesting fields of a request
fn describe(request: &ResourceRequest) -> Option<String> {
    let detail = match request {
        ResourceRequest::ComputeUnit(spec) => {
            format!("runtime {} handler {}", spec.runtime, spec.handler)
        }
        ResourceRequest::ScheduleTrigger(spec) => format!("schedule {}", spec.expression),
        ResourceRequest::Image(spec) => format!("tag {}", spec.tag),
        ResourceRequest::Role(spec) => format!("assumed by {}", spec.assumed_by),
        ResourceRequest::TaskDefinition(spec) => format!(
            "cpu {} memory {} MiB",
            spec.cpu_units, spec.memory_mib
        ),
        ResourceRequest::LoadBalancedService(spec) => format!(
            "load balancer {} port {}",
            spec.load_balancer_name, spec.listener_port
        ),
        ResourceRequest::AutoscalingRule(spec) => format!(
            "{:?} {}% ({}..{})",
            spec.metric, spec.target_utilization_percent, spec.min_capacity, spec.max_capacity
        ),
        ResourceRequest::Output(spec) => format!("value {}", spec.value),
        _ => return None,
    };
    Some(detail)
}
