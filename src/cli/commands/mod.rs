//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use std::path::PathBuf;

use clap::Subcommand;

pub mod check;
pub mod run;

use crate::app::AppContext;
use crate::error::Result;
use crate::script::Script;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run::run(ctx, args),
        Commands::Check(args) => check::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scripts against a skill endpoint
    Run(run::RunArgs),

    /// Load and validate scripts without contacting a skill
    Check(check::CheckArgs),
}

/// Load every script, keeping those that carry `tag` when one is given.
pub(crate) fn load_scripts(
    paths: &[PathBuf],
    marker: char,
    tag: Option<&str>,
) -> Result<Vec<(PathBuf, Script)>> {
    let mut scripts = Vec::with_capacity(paths.len());
    for path in paths {
        let script = Script::from_file(path, marker)?;
        if tag.is_some_and(|tag| !script.tags.iter().any(|t| t == tag)) {
            tracing::debug!(path = %path.display(), "skipping script without tag");
            continue;
        }
        scripts.push((path.clone(), script));
    }
    Ok(scripts)
}
