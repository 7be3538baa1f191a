//! Copy-to-clipboard buttons on code blocks.
//!
//! A click is handled in three steps so the document is never borrowed across
//! the clipboard await:
//!
//! 1. [`CopyControls::begin`] resolves the button and the code text.
//! 2. The host awaits [`Clipboard::write_text`].
//! 3. [`CopyControls::finish`] applies the result and schedules the revert.
//!
//! [`CopyControls::copy`] chains the three for hosts that can hold the
//! document across the await.
//!
//! Reverts are identified by [`RevertTicket`]. Hosts with real timers fire a
//! ticket when its timer expires ([`CopyControls::fire`]); hosts driving page
//! time by hand call [`CopyControls::revert_due`].

use std::time::Duration;

use rw_config::{CopyConfig, RevertPolicy};
use rw_dom::{Dom, Selector};

use crate::clipboard::{Clipboard, ClipboardError};
use crate::error::{BehaviorError, compile};

/// Visual state of one copy button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum CopyState {
    #[default]
    Idle,
    Copied,
}

/// Handle to a scheduled revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevertTicket(u64);

/// A resolved copy request waiting for the clipboard.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyRequest<N> {
    /// Bound button that was clicked.
    pub button: N,
    /// Exact text to write.
    pub text: String,
    binding: usize,
}

/// Result of [`CopyControls::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Button shows the copied state until `revert_at`.
    Copied {
        /// Ticket to fire when the revert timer expires.
        ticket: RevertTicket,
        /// Page time at which the revert is due.
        revert_at: Duration,
        /// Feedback duration the timer should wait.
        delay: Duration,
    },
    /// Clipboard write failed; nothing changed.
    Failed,
}

#[derive(Debug, Clone)]
struct CopyBinding<N> {
    button: N,
    default_icon: Option<N>,
    confirm_icon: Option<N>,
    state: CopyState,
}

#[derive(Debug, Clone, Copy)]
struct PendingRevert {
    ticket: RevertTicket,
    binding: usize,
    due: Duration,
}

/// Compiled `[copy]` settings.
#[derive(Debug, Clone)]
struct CopySettings {
    button: Selector,
    wrapper: Selector,
    code: Selector,
    copied_class: String,
    revert_after: Duration,
    policy: RevertPolicy,
}

/// Copy buttons on a page.
#[derive(Debug, Clone)]
pub struct CopyControls<N> {
    settings: CopySettings,
    bindings: Vec<CopyBinding<N>>,
    pending: Vec<PendingRevert>,
    next_ticket: u64,
    warnings: Vec<String>,
}

impl<N: Clone + PartialEq + std::fmt::Debug> CopyControls<N> {
    /// Bind every copy button below `root`.
    ///
    /// Buttons are bound even when their wrapper or code element is missing;
    /// clicking them does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError`] if a configured selector is invalid.
    pub fn discover<D>(dom: &D, root: &N, config: &CopyConfig) -> Result<Self, BehaviorError>
    where
        D: Dom<Node = N>,
    {
        let settings = CopySettings {
            button: compile(&config.button, "copy.button")?,
            wrapper: compile(&config.wrapper, "copy.wrapper")?,
            code: compile(&config.code, "copy.code")?,
            copied_class: config.copied_class.clone(),
            revert_after: config.revert_after(),
            policy: config.revert_policy,
        };
        let default_icon = compile(&config.default_icon, "copy.default_icon")?;
        let confirm_icon = compile(&config.confirm_icon, "copy.confirm_icon")?;

        let mut warnings = Vec::new();
        let bindings: Vec<CopyBinding<N>> = dom
            .query_all(root, &settings.button)
            .into_iter()
            .enumerate()
            .map(|(index, button)| {
                match dom.closest(&button, &settings.wrapper) {
                    None => warnings.push(format!("copy button {index} is not inside a code block")),
                    Some(wrapper) if dom.query_first(&wrapper, &settings.code).is_none() => {
                        warnings.push(format!("copy button {index}: code block has no code element"));
                    }
                    Some(_) => {}
                }
                CopyBinding {
                    default_icon: dom.query_first(&button, &default_icon),
                    confirm_icon: dom.query_first(&button, &confirm_icon),
                    button,
                    state: CopyState::Idle,
                }
            })
            .collect();

        tracing::debug!(buttons = bindings.len(), "Copy buttons bound");
        Ok(Self {
            settings,
            bindings,
            pending: Vec::new(),
            next_ticket: 0,
            warnings,
        })
    }

    /// Resolve a click on `target` (or a descendant of a button) to a request.
    ///
    /// Returns `None` if the click is not on a bound button or the button has
    /// no code to copy.
    pub fn begin<D>(&self, dom: &D, target: &N) -> Option<CopyRequest<N>>
    where
        D: Dom<Node = N>,
    {
        let button = dom.closest(target, &self.settings.button)?;
        let binding = self.bindings.iter().position(|b| b.button == button)?;

        let Some(wrapper) = dom.closest(&button, &self.settings.wrapper) else {
            tracing::debug!(binding, "Copy button outside a code block");
            return None;
        };
        let Some(code) = dom.query_first(&wrapper, &self.settings.code) else {
            tracing::debug!(binding, "Code block without code element");
            return None;
        };

        Some(CopyRequest {
            button,
            text: dom.text_content(&code),
            binding,
        })
    }

    /// Apply the clipboard result of `request` at page time `now`.
    ///
    /// On failure the error is logged and the button is left untouched.
    pub fn finish<D>(
        &mut self,
        dom: &mut D,
        request: &CopyRequest<N>,
        result: Result<(), ClipboardError>,
        now: Duration,
    ) -> CopyOutcome
    where
        D: Dom<Node = N>,
    {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to copy code to clipboard");
            return CopyOutcome::Failed;
        }

        let binding = request.binding;
        if binding >= self.bindings.len() {
            tracing::debug!(binding, "Copy finished for an unbound button");
            return CopyOutcome::Failed;
        }
        if self.settings.policy == RevertPolicy::Restart {
            self.pending.retain(|p| p.binding != binding);
        }

        let ticket = RevertTicket(self.next_ticket);
        self.next_ticket += 1;
        let revert_at = now + self.settings.revert_after;
        self.pending.push(PendingRevert {
            ticket,
            binding,
            due: revert_at,
        });

        self.bindings[binding].state = CopyState::Copied;
        self.render(dom, binding);
        tracing::trace!(binding, chars = request.text.len(), "Copied code to clipboard");

        CopyOutcome::Copied {
            ticket,
            revert_at,
            delay: self.settings.revert_after,
        }
    }

    /// Handle a click end to end: resolve, write, apply.
    ///
    /// Returns `None` if the click did not resolve to a copy request.
    pub async fn copy<D, C>(
        &mut self,
        dom: &mut D,
        target: &N,
        clipboard: &C,
        now: Duration,
    ) -> Option<CopyOutcome>
    where
        D: Dom<Node = N>,
        C: Clipboard,
    {
        let request = self.begin(&*dom, target)?;
        let result = clipboard.write_text(&request.text).await;
        Some(self.finish(dom, &request, result, now))
    }

    /// Fire a revert whose timer expired.
    ///
    /// Tickets that were superseded or already fired are ignored. Returns
    /// whether the ticket was still pending.
    pub fn fire<D>(&mut self, dom: &mut D, ticket: RevertTicket) -> bool
    where
        D: Dom<Node = N>,
    {
        let Some(pos) = self.pending.iter().position(|p| p.ticket == ticket) else {
            return false;
        };
        let pending = self.pending.remove(pos);
        self.revert(dom, pending.binding);
        true
    }

    /// Fire every pending revert due at or before `now`, oldest first.
    ///
    /// Returns the number of reverts fired, including ones that found the
    /// button already idle.
    pub fn revert_due<D>(&mut self, dom: &mut D, now: Duration) -> usize
    where
        D: Dom<Node = N>,
    {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending = pending;
        for revert in &due {
            self.revert(dom, revert.binding);
        }
        due.len()
    }

    /// Page time of the earliest pending revert.
    #[must_use]
    pub fn next_revert(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Return a button to idle. Reverting an idle button does nothing.
    fn revert<D>(&mut self, dom: &mut D, binding: usize)
    where
        D: Dom<Node = N>,
    {
        let Some(entry) = self.bindings.get_mut(binding) else {
            return;
        };
        if entry.state == CopyState::Idle {
            return;
        }
        entry.state = CopyState::Idle;
        self.render(dom, binding);
    }

    /// Map a button's state to its class and icon visibility.
    fn render<D>(&self, dom: &mut D, binding: usize)
    where
        D: Dom<Node = N>,
    {
        let entry = &self.bindings[binding];
        let copied = entry.state == CopyState::Copied;
        dom.set_class(&entry.button, &self.settings.copied_class, copied);
        if let Some(icon) = &entry.default_icon {
            dom.set_hidden(icon, copied);
        }
        if let Some(icon) = &entry.confirm_icon {
            dom.set_hidden(icon, !copied);
        }
    }

    /// Render copied buttons idle, then drop every binding and pending revert.
    pub fn clear<D>(&mut self, dom: &mut D)
    where
        D: Dom<Node = N>,
    {
        for binding in 0..self.bindings.len() {
            self.revert(dom, binding);
        }
        self.bindings.clear();
        self.pending.clear();
    }

    /// State of the button at `binding`, in discovery order.
    #[must_use]
    pub fn state(&self, binding: usize) -> Option<CopyState> {
        self.bindings.get(binding).map(|b| b.state)
    }

    #[must_use]
    pub fn button_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of buttons currently showing the copied state.
    #[must_use]
    pub fn copied_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.state == CopyState::Copied)
            .count()
    }

    /// Problems found during discovery.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use pretty_assertions::assert_eq;
    use rw_dom::{Document, NodeId};

    const PAGE: &str = r#"
<div class="code-block">
  <pre><code class="language-sql">SELECT 1;</code></pre>
  <button class="copy-button">
    <span class="copy-icon">Copy</span>
    <span class="check-icon" hidden>Done</span>
  </button>
</div>
<div class="code-block">
  <pre><code>ls -la</code></pre>
  <button class="copy-button"><span class="copy-icon">Copy</span></button>
</div>"#;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn setup(html: &str, config: &CopyConfig) -> (Document, CopyControls<NodeId>) {
        let doc = Document::parse(html).unwrap();
        let controls = CopyControls::discover(&doc, &doc.root(), config).unwrap();
        (doc, controls)
    }

    fn select(doc: &Document, selector: &str) -> Vec<NodeId> {
        doc.query_all(&doc.root(), &Selector::parse(selector).unwrap())
    }

    fn click(
        doc: &mut Document,
        controls: &mut CopyControls<NodeId>,
        target: NodeId,
        clipboard: &MemoryClipboard,
        now: Duration,
    ) -> Option<CopyOutcome> {
        tokio_test::block_on(controls.copy(doc, &target, clipboard, now))
    }

    /// (copied class, default icon hidden, confirm icon hidden) of the first button.
    fn first_button_view(doc: &Document) -> (bool, bool, bool) {
        let button = select(doc, ".copy-button")[0];
        let default_icon = select(doc, ".copy-icon")[0];
        let confirm_icon = select(doc, ".check-icon")[0];
        (
            doc.has_class(&button, "copied"),
            doc.is_hidden(&default_icon),
            doc.is_hidden(&confirm_icon),
        )
    }

    #[test]
    fn test_copy_writes_exact_code_text() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];

        let outcome = click(&mut doc, &mut controls, button, &clipboard, ms(0));

        assert!(matches!(outcome, Some(CopyOutcome::Copied { .. })));
        assert_eq!(clipboard.writes(), vec!["SELECT 1;"]);
    }

    #[test]
    fn test_copied_state_reverts_after_delay() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];

        click(&mut doc, &mut controls, button, &clipboard, ms(100));
        assert_eq!(first_button_view(&doc), (true, true, false));
        assert_eq!(controls.state(0), Some(CopyState::Copied));
        assert_eq!(controls.next_revert(), Some(ms(2100)));

        assert_eq!(controls.revert_due(&mut doc, ms(2099)), 0);
        assert_eq!(first_button_view(&doc), (true, true, false));

        assert_eq!(controls.revert_due(&mut doc, ms(2100)), 1);
        assert_eq!(first_button_view(&doc), (false, false, true));
        assert_eq!(controls.state(0), Some(CopyState::Idle));
        assert_eq!(controls.next_revert(), None);
    }

    #[test]
    fn test_click_on_icon_copies() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let icon = select(&doc, ".copy-icon")[1];

        click(&mut doc, &mut controls, icon, &clipboard, ms(0));

        assert_eq!(clipboard.contents().as_deref(), Some("ls -la"));
        assert_eq!(controls.state(1), Some(CopyState::Copied));
        assert_eq!(controls.state(0), Some(CopyState::Idle));
    }

    #[test]
    fn test_rejected_write_leaves_button_unchanged() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::rejecting("permission denied");
        let button = select(&doc, ".copy-button")[0];
        let before = doc.to_html();

        let outcome = click(&mut doc, &mut controls, button, &clipboard, ms(0));

        assert_eq!(outcome, Some(CopyOutcome::Failed));
        assert_eq!(doc.to_html(), before);
        assert_eq!(controls.copied_count(), 0);
        assert_eq!(controls.next_revert(), None);
    }

    #[test]
    fn test_overlap_policy_keeps_earlier_revert() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];

        click(&mut doc, &mut controls, button, &clipboard, ms(0));
        click(&mut doc, &mut controls, button, &clipboard, ms(1000));

        // The first timer still fires at 2s and clears the marker.
        assert_eq!(controls.revert_due(&mut doc, ms(2000)), 1);
        assert!(!first_button_view(&doc).0);

        // The second fires at 3s as a no-op.
        assert_eq!(controls.revert_due(&mut doc, ms(3000)), 1);
        assert_eq!(first_button_view(&doc), (false, false, true));
    }

    #[test]
    fn test_restart_policy_replaces_pending_revert() {
        let config = CopyConfig {
            revert_policy: RevertPolicy::Restart,
            ..CopyConfig::default()
        };
        let (mut doc, mut controls) = setup(PAGE, &config);
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];

        click(&mut doc, &mut controls, button, &clipboard, ms(0));
        click(&mut doc, &mut controls, button, &clipboard, ms(1000));

        assert_eq!(controls.revert_due(&mut doc, ms(2000)), 0);
        assert!(first_button_view(&doc).0);
        assert_eq!(controls.revert_due(&mut doc, ms(3000)), 1);
        assert!(!first_button_view(&doc).0);
    }

    #[test]
    fn test_buttons_revert_independently() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let buttons = select(&doc, ".copy-button");

        click(&mut doc, &mut controls, buttons[0], &clipboard, ms(0));
        click(&mut doc, &mut controls, buttons[1], &clipboard, ms(1500));
        assert_eq!(controls.copied_count(), 2);

        controls.revert_due(&mut doc, ms(2000));
        assert_eq!(controls.state(0), Some(CopyState::Idle));
        assert_eq!(controls.state(1), Some(CopyState::Copied));
    }

    #[test]
    fn test_fire_ticket() {
        let config = CopyConfig {
            revert_policy: RevertPolicy::Restart,
            ..CopyConfig::default()
        };
        let (mut doc, mut controls) = setup(PAGE, &config);
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];

        let Some(CopyOutcome::Copied { ticket: first, delay, .. }) =
            click(&mut doc, &mut controls, button, &clipboard, ms(0))
        else {
            panic!("expected copy");
        };
        assert_eq!(delay, ms(2000));
        let Some(CopyOutcome::Copied { ticket: second, .. }) =
            click(&mut doc, &mut controls, button, &clipboard, ms(500))
        else {
            panic!("expected copy");
        };

        assert!(!controls.fire(&mut doc, first));
        assert_eq!(controls.state(0), Some(CopyState::Copied));
        assert!(controls.fire(&mut doc, second));
        assert_eq!(controls.state(0), Some(CopyState::Idle));
        assert!(!controls.fire(&mut doc, second));
    }

    #[test]
    fn test_button_without_code_block() {
        let html = r#"<div><button class="copy-button">Copy</button></div>
<div class="code-block"><button class="copy-button">Copy</button></div>"#;
        let (mut doc, mut controls) = setup(html, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let buttons = select(&doc, ".copy-button");

        assert_eq!(controls.button_count(), 2);
        assert_eq!(
            controls.warnings(),
            &[
                "copy button 0 is not inside a code block",
                "copy button 1: code block has no code element"
            ]
        );

        for button in buttons {
            assert_eq!(
                click(&mut doc, &mut controls, button, &clipboard, ms(0)),
                None
            );
        }
        assert!(clipboard.writes().is_empty());
        assert_eq!(controls.copied_count(), 0);
    }

    #[test]
    fn test_click_outside_buttons_is_ignored() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let code = select(&doc, "code")[0];

        assert_eq!(click(&mut doc, &mut controls, code, &clipboard, ms(0)), None);
    }

    #[test]
    fn test_clear_drops_bindings() {
        let (mut doc, mut controls) = setup(PAGE, &CopyConfig::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&doc, ".copy-button")[0];
        click(&mut doc, &mut controls, button, &clipboard, ms(0));
        assert_eq!(first_button_view(&doc), (true, true, false));

        controls.clear(&mut doc);

        assert_eq!(first_button_view(&doc), (false, false, true));
        assert_eq!(controls.button_count(), 0);
        assert_eq!(controls.next_revert(), None);
        assert_eq!(click(&mut doc, &mut controls, button, &clipboard, ms(10)), None);
    }
}
