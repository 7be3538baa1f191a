//! CLI command implementations.

pub(crate) mod inspect;
pub(crate) mod simulate;

pub(crate) use inspect::InspectArgs;
pub(crate) use simulate::SimulateArgs;

use std::path::Path;

use rw_behaviors::{Page, PageSummary, SyntheticObserver};
use rw_config::Config;
use rw_dom::Document;

use crate::error::CliError;
use crate::output::Output;
use crate::script::ScriptPage;

/// Read a rendered page and bind all behaviors to it.
fn load_page(path: &Path, config: &Config) -> Result<ScriptPage, CliError> {
    let html = std::fs::read_to_string(path)?;
    let document = Document::parse(&html)?;
    let root = document.root();
    tracing::debug!(path = %path.display(), "Page loaded");
    Ok(Page::initialize(
        document,
        &root,
        config,
        SyntheticObserver::new,
    )?)
}

/// Print a human-readable page summary.
fn print_summary(output: &Output, summary: &PageSummary) {
    output.heading(&format!("Tab groups: {}", summary.tab_groups.len()));
    for (i, group) in summary.tab_groups.iter().enumerate() {
        let tabs: Vec<String> = group
            .tabs
            .iter()
            .map(|tab| {
                if group.active.as_ref() == Some(tab) {
                    format!("{tab}*")
                } else {
                    tab.clone()
                }
            })
            .collect();
        output.info(&format!(
            "  [{i}] {} ({} panes)",
            tabs.join(", "),
            group.panes
        ));
    }

    let spy = &summary.scroll_spy;
    if spy.enabled {
        output.heading(&format!(
            "Scroll spy: {} links, {} sections",
            spy.links,
            spy.sections.len()
        ));
        output.info(&format!("  sections: {}", spy.sections.join(", ")));
        output.info(&format!(
            "  active: {}",
            spy.active.as_deref().unwrap_or("none")
        ));
    } else {
        output.heading("Scroll spy: disabled");
    }

    output.heading(&format!("Copy buttons: {}", summary.copy.buttons.len()));
    for (i, state) in summary.copy.buttons.iter().enumerate() {
        output.info(&format!("  [{i}] {state:?}"));
    }
    if let Some(due) = summary.copy.next_revert_ms {
        output.detail(&format!("  next revert at {due} ms"));
    }

    if !summary.warnings.is_empty() {
        output.heading(&format!("Warnings: {}", summary.warnings.len()));
        for warning in &summary.warnings {
            output.warning(&format!("  - {warning}"));
        }
    }
}
