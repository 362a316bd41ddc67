use crate::commands::ManifestArgs;
use crate::output;

use clap::Args;
use color_eyre::Result;

use sweep_service::ManifestParser;

/// Check a sweep manifest and report the grid shape
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Skip looking up the evaluation program
    #[arg(long)]
    pub skip_program: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let path = args.manifest.manifest_path()?;

    // Step 1: Parse YAML and expand the grid
    output::status("Validating", &format!("{}", path.display()));

    let mut manifest = match ManifestParser::parse_file(&path) {
        Ok(m) => m,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };
    args.manifest.apply(&mut manifest);

    output::check("YAML syntax valid");

    // Step 2: Grid shape
    let grid = match manifest.validate() {
        Ok(grid) => grid,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    output::check(&format!(
        "Grid: {} modes x {} variants = {} groups, indices {}, {} tasks",
        grid.modes.len(),
        grid.groups.len() / grid.modes.len().max(1),
        grid.groups.len(),
        grid.indices,
        grid.task_count()
    ));
    for group in &grid.groups {
        output::dim(&format!("      {}", group));
    }

    // Step 3: Program lookup
    if !args.skip_program {
        match manifest.program.resolve_executable() {
            Ok(program) => output::check(&format!("Program: {}", program.display())),
            Err(e) => {
                output::error(&e.to_string());
                std::process::exit(1);
            }
        }
    }

    eprintln!();
    output::success("Sweep manifest is valid");

    Ok(())
}
