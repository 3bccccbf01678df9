//! skillcheck run - Run scripts against a skill endpoint

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::script::{RunReport, ScriptRunner};
use crate::session::ClosedSessionPolicy;
use crate::transport::HttpTransport;

use super::load_scripts;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script files to run, in order
    #[arg(required = true, value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,

    /// Skill endpoint URL (overrides [transport].endpoint)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Request locale (overrides [identity].locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Requests allowed after the skill ends a session
    #[arg(long, value_name = "POLICY")]
    pub closed_policy: Option<ClosedSessionPolicy>,

    /// Only run scripts carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Serialize)]
struct RunSummary {
    scripts: Vec<RunReport>,
    sessions: usize,
    requests: usize,
    checks: usize,
}

pub fn run(ctx: &AppContext, args: &RunArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(endpoint) = &args.endpoint {
        config.transport.endpoint = Some(endpoint.clone());
    }
    if let Some(locale) = &args.locale {
        config.identity.locale.clone_from(locale);
    }
    if let Some(policy) = args.closed_policy {
        config.session.closed_policy = policy;
    }
    config.validate()?;

    let scripts = load_scripts(
        &args.scripts,
        config.script.reference_marker,
        args.tag.as_deref(),
    )?;
    let runner = ScriptRunner::from_config(&config)?;
    let mut transport =
        HttpTransport::from_config(&config.transport, runner.identity().access_token.clone())?;

    let mut reports = Vec::with_capacity(scripts.len());
    for (path, script) in &scripts {
        tracing::info!(path = %path.display(), script = %script.name, "running script");
        reports.push(runner.execute_script(script, &mut transport)?);
    }

    let summary = RunSummary {
        sessions: reports.iter().map(|r| r.sessions).sum(),
        requests: reports.iter().map(|r| r.requests).sum(),
        checks: reports.iter().map(|r| r.checks).sum(),
        scripts: reports,
    };
    if ctx.robot_mode {
        return emit_json(&robot_ok(summary));
    }

    let mut layout = HumanLayout::new();
    layout.title("Run");
    layout.kv("Endpoint", transport.endpoint());
    layout.kv("Policy", config.session.closed_policy.as_str());
    if ctx.verbosity > 0 {
        let identity = runner.identity();
        layout.kv("Locale", &identity.locale);
        layout.kv("Application", &identity.application_id);
        layout.kv("User", &identity.user_id);
    }
    for report in &summary.scripts {
        layout.blank();
        layout.status(true, &report.script);
        layout.kv("Sessions", &report.sessions.to_string());
        layout.kv("Requests", &report.requests.to_string());
        layout.kv("Checks", &report.checks.to_string());
        layout.kv(
            "Conditions",
            &format!(
                "{} taken, {} skipped",
                report.conditions_taken, report.conditions_skipped
            ),
        );
    }
    if summary.scripts.is_empty() {
        layout.bullet("no scripts matched");
    }
    emit_human(layout);
    Ok(())
}
