//! `rw-page simulate` command implementation.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use rw_config::{CliSettings, Config, RevertPolicy};

use super::{load_page, print_summary};
use crate::clipboard::{ClipboardMode, ScriptClipboard};
use crate::error::CliError;
use crate::output::Output;
use crate::script::{self, Script};

/// `--revert-policy` choices.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Overlap,
    Restart,
}

impl From<PolicyArg> for RevertPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Overlap => Self::Overlap,
            PolicyArg::Restart => Self::Restart,
        }
    }
}

/// Arguments for the simulate command.
#[derive(Args)]
pub(crate) struct SimulateArgs {
    /// Rendered HTML page.
    page: PathBuf,

    /// JSON interaction script.
    #[arg(short, long)]
    script: PathBuf,

    /// Clipboard backend.
    #[arg(long, value_enum, default_value_t = ClipboardMode::Memory)]
    clipboard: ClipboardMode,

    /// Path to configuration file (default: auto-discover rw-page.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scroll spy intersection threshold (overrides config).
    #[arg(long)]
    threshold: Option<f64>,

    /// Copy feedback duration in milliseconds (overrides config).
    #[arg(long)]
    revert_after_ms: Option<u64>,

    /// Handling of repeated copies (overrides config).
    #[arg(long, value_enum)]
    revert_policy: Option<PolicyArg>,

    /// Enable verbose output (log every step).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SimulateArgs {
    /// Execute the simulate command.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            threshold: self.threshold,
            revert_after_ms: self.revert_after_ms,
            revert_policy: self.revert_policy.map(RevertPolicy::from),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let script = Script::parse(&std::fs::read_to_string(&self.script)?)?;
        let clipboard = ScriptClipboard::open(self.clipboard)?;
        let mut page = load_page(&self.page, &config)?;

        output.info(&format!(
            "Replaying {} steps on {}",
            script.steps.len(),
            self.page.display()
        ));
        for (i, line) in script::run(&mut page, &script, &clipboard)
            .await?
            .iter()
            .enumerate()
        {
            output.info(&format!("  {}. {line}", i + 1));
        }

        print_summary(&output, &page.summary());

        let writes = clipboard.writes();
        output.heading(&format!("Clipboard writes: {}", writes.len()));
        for text in &writes {
            output.info(&format!("  {text:?}"));
        }

        output.success(&format!("Simulation finished at {} ms", page.now().as_millis()));
        Ok(())
    }
}
