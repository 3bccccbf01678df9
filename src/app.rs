use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;

pub struct AppContext {
    pub config: Config,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        Ok(Self {
            config,
            robot_mode: cli.robot,
            verbosity: cli.verbose,
        })
    }
}
