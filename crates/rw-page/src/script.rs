//! Scripted interactions replayed against a page.
//!
//! ```json
//! {
//!   "steps": [
//!     { "click": { "selector": ".tab-button[data-tab=\"yarn\"]" } },
//!     { "visible": { "sections": [{ "id": "usage", "ratio": 0.8 }] } },
//!     { "click": { "selector": ".copy-button", "index": 1 } },
//!     { "advance": { "ms": 2000 } }
//!   ]
//! }
//! ```
//!
//! Clicks happen at the current page time; `advance` moves it forward.

use std::time::Duration;

use rw_behaviors::{Clipboard, CopyOutcome, Page, SyntheticObserver, VisibilityEntry};
use rw_dom::{Document, Dom, NodeId, Selector};
use serde::Deserialize;

use crate::error::CliError;

pub(crate) type ScriptPage = Page<Document, SyntheticObserver<NodeId>>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Step {
    /// Click the `index`-th element matching `selector`.
    Click {
        selector: String,
        #[serde(default)]
        index: usize,
    },
    /// Deliver one visibility batch, in the listed order.
    Visible { sections: Vec<SectionVisibility> },
    /// Move page time forward.
    Advance { ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SectionVisibility {
    pub id: String,
    pub ratio: f64,
}

impl Script {
    pub(crate) fn parse(json: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Replay `script` and describe each step.
pub(crate) async fn run<C: Clipboard>(
    page: &mut ScriptPage,
    script: &Script,
    clipboard: &C,
) -> Result<Vec<String>, CliError> {
    let mut log = Vec::with_capacity(script.steps.len());
    for (i, step) in script.steps.iter().enumerate() {
        let step_no = i + 1;
        let line = match step {
            Step::Click { selector, index } => {
                let parsed = Selector::parse(selector)?;
                let dom = page.dom();
                let target = dom
                    .query_all(&dom.root(), &parsed)
                    .into_iter()
                    .nth(*index)
                    .ok_or_else(|| CliError::Script {
                        step: step_no,
                        message: format!("no element matches `{selector}` at index {index}"),
                    })?;
                let now = page.now();
                let outcome = page.click(&target, clipboard, now).await;
                let mut effects = Vec::new();
                if outcome.tab {
                    effects.push("tab activated".to_owned());
                }
                match outcome.copy {
                    Some(CopyOutcome::Copied { revert_at, .. }) => {
                        effects.push(format!("copied, reverts at {} ms", revert_at.as_millis()));
                    }
                    Some(CopyOutcome::Failed) => effects.push("copy failed".to_owned()),
                    None => {}
                }
                if effects.is_empty() {
                    effects.push("no effect".to_owned());
                }
                format!("click {selector}[{index}]: {}", effects.join(", "))
            }
            Step::Visible { sections } => {
                let entries = sections
                    .iter()
                    .map(|section| {
                        let target = page.dom().element_by_id(&section.id).ok_or_else(|| {
                            CliError::Script {
                                step: step_no,
                                message: format!("no element with id `{}`", section.id),
                            }
                        })?;
                        Ok(VisibilityEntry {
                            target,
                            ratio: section.ratio,
                            is_intersecting: section.ratio > 0.0,
                        })
                    })
                    .collect::<Result<Vec<_>, CliError>>()?;
                page.visibility_changed(&entries);
                let active = page.scroll_spy().active_fragment().unwrap_or("none");
                format!("visible ({} sections): active link {active}", entries.len())
            }
            Step::Advance { ms } => {
                let now = page.now() + Duration::from_millis(*ms);
                let reverted = page.advance(now);
                format!(
                    "advance to {} ms: {reverted} revert(s) fired",
                    now.as_millis()
                )
            }
        };
        tracing::info!(step = step_no, "{line}");
        log.push(line);
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rw_behaviors::MemoryClipboard;
    use rw_config::Config;

    const PAGE: &str = r##"
<nav><a href="#install">Install</a><a href="#usage">Usage</a></nav>
<section id="install">
  <div class="tabs">
    <button class="tab-button" data-tab="npm">npm</button>
    <button class="tab-button" data-tab="yarn">yarn</button>
    <div class="tab-pane" data-tab="npm">npm</div>
    <div class="tab-pane" data-tab="yarn">yarn</div>
  </div>
</section>
<section id="usage">
  <div class="code-block"><pre><code>SELECT 1;</code></pre><button class="copy-button">Copy</button></div>
</section>"##;

    fn load() -> ScriptPage {
        let doc = Document::parse(PAGE).unwrap();
        let root = doc.root();
        Page::initialize(doc, &root, &Config::default(), SyntheticObserver::new).unwrap()
    }

    #[test]
    fn test_parse_script() {
        let script = Script::parse(
            r#"{"steps": [
                {"click": {"selector": ".copy-button"}},
                {"visible": {"sections": [{"id": "usage", "ratio": 0.6}]}},
                {"advance": {"ms": 2000}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            script.steps,
            vec![
                Step::Click {
                    selector: ".copy-button".to_owned(),
                    index: 0
                },
                Step::Visible {
                    sections: vec![SectionVisibility {
                        id: "usage".to_owned(),
                        ratio: 0.6
                    }]
                },
                Step::Advance { ms: 2000 },
            ]
        );
    }

    #[test]
    fn test_parse_unknown_step() {
        let result = Script::parse(r#"{"steps": [{"scroll": {"y": 10}}]}"#);
        assert!(matches!(result, Err(CliError::Json(_))));
    }

    #[test]
    fn test_run_script() {
        let mut page = load();
        let clipboard = MemoryClipboard::new();
        let script = Script::parse(
            r#"{"steps": [
                {"click": {"selector": ".tab-button", "index": 1}},
                {"visible": {"sections": [{"id": "install", "ratio": 0.3}, {"id": "usage", "ratio": 0.9}]}},
                {"click": {"selector": ".copy-button"}},
                {"advance": {"ms": 1999}},
                {"advance": {"ms": 1}}
            ]}"#,
        )
        .unwrap();

        let log = tokio_test::block_on(run(&mut page, &script, &clipboard)).unwrap();

        assert_eq!(
            log,
            vec![
                "click .tab-button[1]: tab activated",
                "visible (2 sections): active link usage",
                "click .copy-button[0]: copied, reverts at 2000 ms",
                "advance to 1999 ms: 0 revert(s) fired",
                "advance to 2000 ms: 1 revert(s) fired",
            ]
        );
        assert_eq!(clipboard.writes(), vec!["SELECT 1;"]);
        assert_eq!(page.summary().tab_groups[0].active.as_deref(), Some("yarn"));
    }

    #[test]
    fn test_run_script_denied_clipboard() {
        let mut page = load();
        let clipboard = MemoryClipboard::rejecting("permission denied");
        let script = Script::parse(r#"{"steps": [{"click": {"selector": ".copy-button"}}]}"#).unwrap();

        let log = tokio_test::block_on(run(&mut page, &script, &clipboard)).unwrap();

        assert_eq!(log, vec!["click .copy-button[0]: copy failed"]);
        assert_eq!(page.summary().copy.next_revert_ms, None);
    }

    #[test]
    fn test_run_script_missing_target() {
        let mut page = load();
        let clipboard = MemoryClipboard::new();
        let script = Script::parse(
            r#"{"steps": [{"advance": {"ms": 5}}, {"visible": {"sections": [{"id": "faq", "ratio": 1.0}]}}]}"#,
        )
        .unwrap();

        let err = tokio_test::block_on(run(&mut page, &script, &clipboard)).unwrap_err();
        assert_eq!(err.to_string(), "Script step 2: no element with id `faq`");
    }

    #[test]
    fn test_run_script_invalid_selector() {
        let mut page = load();
        let clipboard = MemoryClipboard::new();
        let script = Script::parse(r#"{"steps": [{"click": {"selector": "a:hover"}}]}"#).unwrap();

        let err = tokio_test::block_on(run(&mut page, &script, &clipboard)).unwrap_err();
        assert!(matches!(err, CliError::Selector(_)));
    }
}
