// Sweep Reporter
// Renders a sweep summary as terminal text, JSON, or a re-run list

use crate::execution::results::{RunResult, RunStatus, SweepSummary};

use serde_json::{json, Value};
use std::fmt;

/// Output format for sweep reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable terminal output
    #[default]
    Terminal,
    /// Machine-readable JSON document
    Json,
    /// One `group index` line per task that did not succeed
    Rerun,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Terminal => write!(f, "terminal"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Rerun => write!(f, "rerun"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "text" | "console" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            "rerun" | "failed" => Ok(ReportFormat::Rerun),
            _ => Err(format!(
                "Unknown report format '{}'. Valid formats: terminal, json, rerun",
                s
            )),
        }
    }
}

/// Sweep reporter that generates output in various formats
pub struct SweepReporter;

impl SweepReporter {
    /// Generate a report in the specified format
    pub fn report(summary: &SweepSummary, format: ReportFormat) -> String {
        match format {
            ReportFormat::Terminal => Self::to_terminal(summary),
            ReportFormat::Json => Self::to_json(summary),
            ReportFormat::Rerun => Self::to_rerun(summary),
        }
    }

    /// Totals followed by every failure with its (group, index) and error
    pub fn to_terminal(summary: &SweepSummary) -> String {
        let mut out = String::new();

        out.push_str(&format!("\nSweep: {}\n", summary.sweep_name));
        out.push_str(&"=".repeat(60));
        out.push('\n');

        out.push_str(&format!(
            "  total {}  succeeded {}  failed {}",
            summary.total(),
            summary.succeeded(),
            summary.failed()
        ));
        if summary.skipped() > 0 {
            out.push_str(&format!("  skipped {}", summary.skipped()));
        }
        if summary.cancelled() > 0 {
            out.push_str(&format!("  cancelled {}", summary.cancelled()));
        }
        out.push_str(&format!(" ({:.2}s)\n", summary.duration.as_secs_f64()));

        let failures: Vec<&RunResult> = summary.failures().collect();
        if !failures.is_empty() {
            out.push_str(&"-".repeat(60));
            out.push('\n');
            out.push_str("  Failures:\n");
            for result in failures {
                out.push_str(&format!("  [x] {}\n", result.task));
                if let Some(error) = &result.error {
                    out.push_str(&format!("       {}\n", error));
                }
                for line in result.stderr.lines() {
                    out.push_str(&format!("       | {}\n", line));
                }
            }
        }

        out.push_str(&"-".repeat(60));
        out.push('\n');
        if summary.success() {
            out.push_str(&format!("  All {} tasks completed\n", summary.total()));
        } else if summary.failed() > 0 {
            out.push_str(&format!(
                "  {} of {} tasks failed\n",
                summary.failed(),
                summary.total()
            ));
        } else {
            out.push_str("  Sweep cancelled before completion\n");
        }

        out.push('\n');
        out
    }

    /// JSON document with totals and one entry per task, in enumeration order
    pub fn to_json(summary: &SweepSummary) -> String {
        let tasks: Vec<Value> = summary.results.iter().map(task_json).collect();
        let document = json!({
            "sweep": summary.sweep_name,
            "success": summary.success(),
            "duration_secs": summary.duration.as_secs_f64(),
            "totals": {
                "total": summary.total(),
                "succeeded": summary.succeeded(),
                "failed": summary.failed(),
                "skipped": summary.skipped(),
                "cancelled": summary.cancelled(),
            },
            "tasks": tasks,
        });
        format!("{:#}\n", document)
    }

    /// `group index` for every task that failed or never ran
    pub fn to_rerun(summary: &SweepSummary) -> String {
        summary
            .results
            .iter()
            .filter(|r| matches!(r.status, RunStatus::Failed | RunStatus::Cancelled))
            .map(|r| format!("{} {}\n", r.task.group.dir, r.task.index))
            .collect()
    }
}

fn task_json(result: &RunResult) -> Value {
    json!({
        "group": result.task.group.dir,
        "mode": result.task.group.mode,
        "toggles": result.task.group.toggles,
        "index": result.task.index,
        "status": result.status,
        "exit_code": result.exit_code,
        "attempts": result.attempts,
        "duration_secs": result.duration.as_secs_f64(),
        "input": result.paths.as_ref().map(|p| p.input.display().to_string()),
        "output": result.paths.as_ref().map(|p| p.output.display().to_string()),
        "error": result.error.as_ref().map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;
    use crate::grid::{RunTask, SweepGroup};
    use crate::paths::ResolvedPaths;
    use std::time::Duration;

    fn task(toggles: Vec<String>, index: u32) -> RunTask {
        RunTask::new(SweepGroup::new("density", toggles), index)
    }

    fn paths(index: u32) -> ResolvedPaths {
        ResolvedPaths {
            input: format!("runs/density/{}.config", index).into(),
            output: format!("stats/density/{}.stats", index).into(),
        }
    }

    fn make_summary() -> SweepSummary {
        let nc = vec!["noise-correction".to_string()];
        SweepSummary {
            sweep_name: "density".to_string(),
            results: vec![
                RunResult::succeeded(task(vec![], 1), paths(1)),
                RunResult::failed(
                    task(nc.clone(), 2),
                    Some(paths(2)),
                    InvocationError::ExitStatus(1),
                )
                .with_stderr("Traceback (most recent call last)".to_string()),
                RunResult::cancelled(task(nc, 3), None),
            ],
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_terminal_output() {
        let terminal = SweepReporter::to_terminal(&make_summary());

        assert!(terminal.contains("Sweep: density"));
        assert!(terminal.contains("total 3  succeeded 1  failed 1  cancelled 1"));
        assert!(terminal.contains("[x] (density_noise-correction, 2)"));
        assert!(terminal.contains("| Traceback"));
        assert!(terminal.contains("1 of 3 tasks failed"));
    }

    #[test]
    fn test_terminal_all_succeed() {
        let summary = SweepSummary {
            sweep_name: "ok".to_string(),
            results: vec![RunResult::succeeded(task(vec![], 1), paths(1))],
            duration: Duration::ZERO,
        };
        let terminal = SweepReporter::to_terminal(&summary);
        assert!(terminal.contains("All 1 tasks completed"));
        assert!(!terminal.contains("Failures"));
    }

    #[test]
    fn test_json_output() {
        let json = SweepReporter::to_json(&make_summary());
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["sweep"], "density");
        assert_eq!(value["success"], false);
        assert_eq!(value["totals"]["failed"], 1);
        assert_eq!(value["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(value["tasks"][1]["group"], "density_noise-correction");
        assert_eq!(value["tasks"][1]["status"], "failed");
        assert_eq!(value["tasks"][1]["exit_code"], 1);
        assert!(value["tasks"][0]["error"].is_null());
        assert!(value["tasks"][2]["output"].is_null());
    }

    #[test]
    fn test_rerun_output() {
        let rerun = SweepReporter::to_rerun(&make_summary());
        assert_eq!(
            rerun,
            "density_noise-correction 2\ndensity_noise-correction 3\n"
        );
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!(
            "terminal".parse::<ReportFormat>().unwrap(),
            ReportFormat::Terminal
        );
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("rerun".parse::<ReportFormat>().unwrap(), ReportFormat::Rerun);
        assert!("junit".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_report_dispatches_correctly() {
        let summary = make_summary();
        assert!(SweepReporter::report(&summary, ReportFormat::Terminal).contains("Sweep:"));
        assert!(SweepReporter::report(&summary, ReportFormat::Json).starts_with('{'));
        assert!(SweepReporter::report(&summary, ReportFormat::Rerun).ends_with('\n'));
    }
}
