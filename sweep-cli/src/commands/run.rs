use crate::commands::{FilterArgs, ManifestArgs};
use crate::output;

use clap::Args;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::sync::watch;

use sweep_service::{
    progress_channel, LogLevel, ReportFormat, SweepEvent, SweepReporter,
};

/// Run every task of a sweep
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum concurrent invocations
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-invocation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Additional attempts for a failed invocation
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Skip tasks whose output already exists
    #[arg(long)]
    pub only_missing: bool,

    /// Final report format (terminal, json, rerun)
    #[arg(long, default_value = "terminal")]
    pub format: ReportFormat,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let (path, mut manifest) = args.manifest.load()?;

    if let Some(jobs) = args.jobs {
        manifest.max_parallel = jobs;
    }
    if let Some(timeout) = args.timeout {
        manifest.timeout_secs = Some(timeout);
    }
    if let Some(retries) = args.retries {
        manifest.retries = retries;
    }

    output::status("Loading", &format!("{}", path.display()));

    let mut executor = manifest
        .executor()
        .wrap_err("Invalid sweep configuration")?
        .with_filter(args.filter.to_filter());
    let mut config = executor.config().clone();
    config.only_missing = args.only_missing;
    executor = executor.with_config(config);

    // Surface filter problems before anything starts
    let planned = executor.plan().wrap_err("Invalid sweep configuration")?;
    output::info(&format!(
        "Sweep '{}': {} tasks, up to {} at a time",
        manifest.name,
        planned.len(),
        manifest.max_parallel
    ));

    let (tx, mut rx) = progress_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let executor = executor.with_progress(tx).with_cancellation(cancel_rx);

    tokio::spawn(async move {
        let mut received = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            received += 1;
            match Interrupt::nth(received) {
                Interrupt::Drain => {
                    output::warning(
                        "Interrupted, waiting for running tasks to finish (Ctrl-C again to abort)",
                    );
                    let _ = cancel_tx.send(true);
                }
                Interrupt::Abort => {
                    output::error("Interrupted again, aborting");
                    std::process::exit(130);
                }
            }
        }
    });

    let exec_handle = tokio::spawn(async move { executor.execute().await });

    while let Some(event) = rx.recv().await {
        render_event(&event);
    }

    let summary = exec_handle.await??;
    print!("{}", SweepReporter::report(&summary, args.format));

    if !summary.success() {
        std::process::exit(1);
    }

    Ok(())
}

/// What the n-th Ctrl-C of a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop new launches and let running programs finish
    Drain,
    /// Exit immediately
    Abort,
}

impl Interrupt {
    fn nth(received: usize) -> Self {
        if received <= 1 {
            Self::Drain
        } else {
            Self::Abort
        }
    }
}

fn render_event(event: &SweepEvent) {
    match event {
        SweepEvent::SweepStarted {
            sweep_name,
            total_groups,
            total_tasks,
        } => {
            eprintln!();
            output::header(&format!(
                "Sweep '{}' ({} groups, {} tasks)",
                sweep_name, total_groups, total_tasks
            ));
        }

        SweepEvent::GroupPrepared { group, output_dir } => {
            output::dim(&format!("  {} -> {}", group, output_dir.display()));
        }

        SweepEvent::GroupFailed { group, error } => {
            output::failure(&format!("Group '{}' unavailable: {}", group, error));
        }

        SweepEvent::TaskStarted { task, attempt, .. } => {
            if *attempt > 1 {
                output::warning(&format!("Retrying {} (attempt {})", task, attempt));
            }
        }

        SweepEvent::TaskCompleted {
            result,
            position,
            total,
        } => {
            let mut detail = format!("{:.2}s", result.duration.as_secs_f64());
            if let Some(code) = result.exit_code.filter(|c| *c != 0) {
                detail.push_str(&format!(" (exit code: {})", code));
            }
            output::task_line(
                *position,
                *total,
                result.is_success(),
                &result.task.to_string(),
                &detail,
            );
            if let Some(error) = &result.error {
                output::error(&error.to_string());
                for line in result.stderr.lines() {
                    output::program_error(line);
                }
            }
        }

        SweepEvent::TaskSkipped { task, reason, .. } => {
            output::dim(&format!("  {} skipped: {}", task, reason));
        }

        SweepEvent::SweepCompleted {
            success,
            total,
            failed,
            duration,
            ..
        } => {
            eprintln!();
            if *success {
                output::success(&format!(
                    "Sweep completed in {:.2}s",
                    duration.as_secs_f64()
                ));
            } else {
                output::failure(&format!(
                    "Sweep finished with {} of {} tasks failed ({:.2}s)",
                    failed,
                    total,
                    duration.as_secs_f64()
                ));
            }
        }

        SweepEvent::Log { level, message } => match level {
            LogLevel::Error => output::error(message),
            LogLevel::Warning => output::warning(message),
            LogLevel::Info => output::info(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_interrupt_aborts() {
        assert_eq!(Interrupt::nth(1), Interrupt::Drain);
        assert_eq!(Interrupt::nth(2), Interrupt::Abort);
        assert_eq!(Interrupt::nth(5), Interrupt::Abort);
    }
}
