use crate::commands::{FilterArgs, ManifestArgs};
use crate::output;

use std::sync::Arc;

use clap::Args;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

/// List the tasks of a sweep without running anything
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Only list tasks whose output does not exist yet
    #[arg(long)]
    pub only_missing: bool,
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let (path, manifest) = args.manifest.load()?;
    output::status("Planning", &format!("{}", path.display()));

    let planned = manifest
        .executor_with(Arc::new(manifest.invoker()))
        .wrap_err("Invalid sweep configuration")?
        .with_filter(args.filter.to_filter())
        .plan()
        .wrap_err("Invalid sweep configuration")?;

    let mut listed = 0;
    for item in &planned {
        let present = item.paths.output.is_file();
        if args.only_missing && present {
            continue;
        }
        listed += 1;
        println!(
            "{}\t{}\t{}{}",
            item.task,
            item.paths.input.display(),
            item.paths.output.display(),
            if present { "\t(present)" } else { "" }
        );
    }

    output::info(&format!("{} of {} tasks listed", listed, planned.len()));
    Ok(())
}
