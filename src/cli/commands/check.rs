//! skillcheck check - Validate scripts without running them

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;

use super::load_scripts;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Script files to validate
    #[arg(required = true, value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,
}

#[derive(Serialize)]
struct CheckedScript {
    path: String,
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    sessions: usize,
}

pub fn run(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let scripts = load_scripts(&args.scripts, ctx.config.script.reference_marker, None)?;
    let checked: Vec<CheckedScript> = scripts
        .into_iter()
        .map(|(path, script)| CheckedScript {
            path: path.display().to_string(),
            name: script.name,
            description: script.description,
            tags: script.tags,
            sessions: script.sessions.len(),
        })
        .collect();

    if ctx.robot_mode {
        return emit_json(&robot_ok(checked));
    }

    let mut layout = HumanLayout::new();
    layout.title("Check");
    for script in &checked {
        layout.status(true, &format!("{} ({})", script.name, script.path));
        layout.kv("Sessions", &script.sessions.to_string());
        if !script.tags.is_empty() {
            layout.kv("Tags", &script.tags.join(", "));
        }
        if let Some(description) = &script.description {
            layout.kv("Description", description);
        }
    }
    emit_human(layout);
    Ok(())
}
