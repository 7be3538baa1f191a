//! `rw-page inspect` command implementation.

use std::path::PathBuf;

use clap::Args;
use rw_config::Config;

use super::{load_page, print_summary};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the inspect command.
#[derive(Args)]
pub(crate) struct InspectArgs {
    /// Rendered HTML page.
    page: PathBuf,

    /// Path to configuration file (default: auto-discover rw-page.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl InspectArgs {
    /// Execute the inspect command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        if let Some(path) = &config.config_path {
            output.detail(&format!("Config: {}", path.display()));
        }

        let page = load_page(&self.page, &config)?;
        let summary = page.summary();

        if self.json {
            output.data(&serde_json::to_string_pretty(&summary)?);
        } else {
            output.info(&format!("Page: {}", self.page.display()));
            print_summary(&output, &summary);
        }
        Ok(())
    }
}
