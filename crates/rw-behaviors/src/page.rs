//! Page runtime binding all behaviors to one document.

use std::time::Duration;

use rw_config::Config;
use rw_dom::Dom;

use crate::clipboard::{Clipboard, ClipboardError};
use crate::copy::{CopyControls, CopyOutcome, CopyRequest, CopyState, RevertTicket};
use crate::error::BehaviorError;
use crate::scroll_spy::{ScrollSpy, VisibilityEntry, VisibilityObserver};
use crate::tabs::TabController;

/// What a click did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// The click activated a tab.
    pub tab: bool,
    /// The click resolved to a copy request.
    pub copy: Option<CopyOutcome>,
}

/// Snapshot of every binding on a page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PageSummary {
    pub tab_groups: Vec<TabGroupSummary>,
    pub scroll_spy: ScrollSpySummary,
    pub copy: CopySummary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TabGroupSummary {
    /// Tab names in trigger order.
    pub tabs: Vec<String>,
    /// Active tab name.
    pub active: Option<String>,
    pub panes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScrollSpySummary {
    pub enabled: bool,
    pub links: usize,
    /// Observed section identifiers.
    pub sections: Vec<String>,
    /// Fragment of the active link.
    pub active: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CopySummary {
    /// Button states in document order.
    pub buttons: Vec<CopyState>,
    /// Page time of the next pending revert, in milliseconds.
    pub next_revert_ms: Option<u64>,
}

/// Every behavior bound to one document.
///
/// Owns the document so that handlers can mutate it. Hosts with their own
/// event loop feed clicks, visibility batches and page time through
/// [`click`](Self::click), [`visibility_changed`](Self::visibility_changed)
/// and [`advance`](Self::advance).
pub struct Page<D: Dom, O> {
    dom: D,
    tabs: TabController<D::Node>,
    spy: ScrollSpy<D::Node, O>,
    copy: CopyControls<D::Node>,
    now: Duration,
    disposed: bool,
}

impl<D, O> Page<D, O>
where
    D: Dom,
    O: VisibilityObserver<D::Node>,
{
    /// Discover and bind every behavior below `root`.
    ///
    /// Tab groups render their initial state immediately. `make_observer` is
    /// only called when the page has both navigation links and sections.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError`] if a configured selector is invalid.
    pub fn initialize<F>(
        mut dom: D,
        root: &D::Node,
        config: &Config,
        make_observer: F,
    ) -> Result<Self, BehaviorError>
    where
        F: FnOnce(f64) -> O,
    {
        let tabs = TabController::discover(&mut dom, root, &config.tabs)?;
        let spy = ScrollSpy::attach(&dom, root, &config.scroll_spy, make_observer)?;
        let copy = CopyControls::discover(&dom, root, &config.copy)?;

        tracing::info!(
            tab_groups = tabs.groups().len(),
            scroll_spy = spy.is_enabled(),
            copy_buttons = copy.button_count(),
            "Page behaviors initialized"
        );

        Ok(Self {
            dom,
            tabs,
            spy,
            copy,
            now: Duration::ZERO,
            disposed: false,
        })
    }

    /// Dispatch a click on `target` at page time `now`.
    ///
    /// Reverts due by `now` fire first. A click may both activate a tab and
    /// copy code when a copy button sits inside a trigger. The clipboard
    /// write is treated as completing at `now`; hosts whose clipboard takes
    /// real time use [`begin_click`](Self::begin_click) and
    /// [`finish_copy`](Self::finish_copy) instead.
    pub async fn click<C: Clipboard>(
        &mut self,
        target: &D::Node,
        clipboard: &C,
        now: Duration,
    ) -> ClickOutcome {
        let (tab, request) = self.begin_click(target, now);
        let copy = match request {
            Some(request) => {
                let result = clipboard.write_text(&request.text).await;
                Some(self.finish_copy(&request, result, now))
            }
            None => None,
        };
        ClickOutcome { tab, copy }
    }

    /// Synchronous half of [`click`](Self::click).
    ///
    /// Activates a tab if `target` is a trigger and resolves a copy request if
    /// it is a copy button. Hosts that cannot hold the page across the
    /// clipboard await write the request themselves and call
    /// [`finish_copy`](Self::finish_copy).
    pub fn begin_click(
        &mut self,
        target: &D::Node,
        now: Duration,
    ) -> (bool, Option<CopyRequest<D::Node>>) {
        self.advance(now);
        if self.disposed {
            return (false, None);
        }
        let tab = self.tabs.handle_click(&mut self.dom, target);
        (tab, self.copy.begin(&self.dom, target))
    }

    /// Apply a clipboard result that arrived at page time `now`.
    ///
    /// Page time advances to `now` first, so the revert is due
    /// `revert_after` past the moment the write completed.
    pub fn finish_copy(
        &mut self,
        request: &CopyRequest<D::Node>,
        result: Result<(), ClipboardError>,
        now: Duration,
    ) -> CopyOutcome {
        if self.disposed {
            return CopyOutcome::Failed;
        }
        self.advance(now);
        self.copy.finish(&mut self.dom, request, result, self.now)
    }

    /// Fire a revert whose timer expired.
    pub fn fire_revert(&mut self, ticket: RevertTicket) -> bool {
        self.copy.fire(&mut self.dom, ticket)
    }

    /// Apply a batch of visibility notifications.
    pub fn visibility_changed(&mut self, entries: &[VisibilityEntry<D::Node>]) {
        self.spy.on_visibility_change(&mut self.dom, entries);
    }

    /// Move page time forward to `now` and fire due reverts.
    ///
    /// Page time never goes backwards; an earlier `now` is ignored. Returns
    /// the number of reverts fired.
    pub fn advance(&mut self, now: Duration) -> usize {
        self.now = self.now.max(now);
        self.copy.revert_due(&mut self.dom, self.now)
    }

    /// Drop every binding. Later events are ignored.
    ///
    /// Buttons still showing the copied state are rendered idle first.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.spy.detach();
        self.copy.clear(&mut self.dom);
        self.disposed = true;
        tracing::debug!("Page behaviors disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Current page time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn dom(&self) -> &D {
        &self.dom
    }

    #[must_use]
    pub fn into_dom(self) -> D {
        self.dom
    }

    #[must_use]
    pub fn tabs(&self) -> &TabController<D::Node> {
        &self.tabs
    }

    #[must_use]
    pub fn scroll_spy(&self) -> &ScrollSpy<D::Node, O> {
        &self.spy
    }

    #[must_use]
    pub fn copy_controls(&self) -> &CopyControls<D::Node> {
        &self.copy
    }

    /// Discovery warnings of all behaviors.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.tabs
            .warnings()
            .iter()
            .chain(self.spy.warnings())
            .chain(self.copy.warnings())
            .map(String::as_str)
    }

    #[must_use]
    pub fn summary(&self) -> PageSummary {
        let tab_groups = self
            .tabs
            .groups()
            .iter()
            .map(|group| TabGroupSummary {
                tabs: group.trigger_names().map(str::to_owned).collect(),
                active: group.state().active_name.clone(),
                panes: group.pane_count(),
            })
            .collect();

        let scroll_spy = ScrollSpySummary {
            enabled: self.spy.is_enabled(),
            links: self.spy.link_count(),
            sections: self.spy.section_ids().map(str::to_owned).collect(),
            active: self.spy.active_fragment().map(str::to_owned),
        };

        let copy = CopySummary {
            buttons: (0..self.copy.button_count())
                .filter_map(|i| self.copy.state(i))
                .collect(),
            next_revert_ms: self
                .copy
                .next_revert()
                .map(|due| u64::try_from(due.as_millis()).unwrap_or(u64::MAX)),
        };

        PageSummary {
            tab_groups,
            scroll_spy,
            copy,
            warnings: self.warnings().map(str::to_owned).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::scroll_spy::SyntheticObserver;
    use pretty_assertions::assert_eq;
    use rw_dom::{Document, NodeId, Selector};

    const PAGE: &str = r##"
<nav>
  <a href="#install">Install</a>
  <a href="#usage">Usage</a>
</nav>
<section id="install">
  <div class="tabs">
    <button class="tab-button" data-tab="npm">npm</button>
    <button class="tab-button" data-tab="yarn">yarn</button>
    <div class="tab-pane" data-tab="npm">
      <div class="code-block">
        <pre><code>npm install rw</code></pre>
        <button class="copy-button"><span class="copy-icon">Copy</span><span class="check-icon" hidden>Done</span></button>
      </div>
    </div>
    <div class="tab-pane" data-tab="yarn">yarn add rw</div>
  </div>
</section>
<section id="usage">
  <div class="code-block">
    <pre><code>SELECT 1;</code></pre>
    <button class="copy-button"><span class="copy-icon">Copy</span><span class="check-icon" hidden>Done</span></button>
  </div>
</section>"##;

    type TestPage = Page<Document, SyntheticObserver<NodeId>>;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn load(html: &str, config: &Config) -> TestPage {
        let doc = Document::parse(html).unwrap();
        let root = doc.root();
        Page::initialize(doc, &root, config, SyntheticObserver::new).unwrap()
    }

    fn select(page: &TestPage, selector: &str) -> Vec<NodeId> {
        let dom = page.dom();
        dom.query_all(&dom.root(), &Selector::parse(selector).unwrap())
    }

    fn visible(page: &TestPage, id: &str, ratio: f64) -> VisibilityEntry<NodeId> {
        VisibilityEntry {
            target: page.dom().element_by_id(id).unwrap(),
            ratio,
            is_intersecting: ratio > 0.0,
        }
    }

    #[test]
    fn test_initialize_binds_all_behaviors() {
        let page = load(PAGE, &Config::default());
        let summary = page.summary();

        assert_eq!(
            summary.tab_groups,
            vec![TabGroupSummary {
                tabs: vec!["npm".to_owned(), "yarn".to_owned()],
                active: Some("npm".to_owned()),
                panes: 2,
            }]
        );
        assert_eq!(
            summary.scroll_spy,
            ScrollSpySummary {
                enabled: true,
                links: 2,
                sections: vec!["install".to_owned(), "usage".to_owned()],
                active: None,
            }
        );
        assert_eq!(summary.copy.buttons, vec![CopyState::Idle, CopyState::Idle]);
        assert!(summary.warnings.is_empty());

        let observer = page.scroll_spy().observer().unwrap();
        assert_eq!(observer.observed().len(), 2);
        assert!((observer.threshold() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_copy_then_revert_through_page_time() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&page, ".copy-button")[1];

        let outcome = tokio_test::block_on(page.click(&button, &clipboard, ms(500)));
        assert!(!outcome.tab);
        assert!(matches!(outcome.copy, Some(CopyOutcome::Copied { .. })));
        assert_eq!(clipboard.contents().as_deref(), Some("SELECT 1;"));
        assert!(page.dom().has_class(&button, "copied"));
        assert_eq!(page.summary().copy.next_revert_ms, Some(2500));

        assert_eq!(page.advance(ms(2499)), 0);
        assert!(page.dom().has_class(&button, "copied"));
        assert_eq!(page.advance(ms(2500)), 1);
        assert!(!page.dom().has_class(&button, "copied"));
    }

    #[test]
    fn test_click_fires_due_reverts_first() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::rejecting("denied");
        let allow = MemoryClipboard::new();
        let buttons = select(&page, ".copy-button");

        tokio_test::block_on(page.click(&buttons[1], &allow, ms(0)));
        let outcome = tokio_test::block_on(page.click(&buttons[0], &clipboard, ms(3000)));

        assert_eq!(outcome.copy, Some(CopyOutcome::Failed));
        assert_eq!(page.summary().copy.buttons, vec![CopyState::Idle, CopyState::Idle]);
    }

    #[test]
    fn test_tab_click_and_scroll_are_independent() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::new();
        let yarn = select(&page, ".tab-button")[1];

        let outcome = tokio_test::block_on(page.click(&yarn, &clipboard, ms(0)));
        assert_eq!(outcome, ClickOutcome { tab: true, copy: None });

        let entries = [visible(&page, "install", 0.2), visible(&page, "usage", 0.8)];
        page.visibility_changed(&entries);

        let summary = page.summary();
        assert_eq!(summary.tab_groups[0].active.as_deref(), Some("yarn"));
        assert_eq!(summary.scroll_spy.active.as_deref(), Some("usage"));
        assert!(clipboard.writes().is_empty());
    }

    #[test]
    fn test_split_click_with_timer_revert() {
        let mut page = load(PAGE, &Config::default());
        let button = select(&page, ".copy-button")[0];

        let (tab, request) = page.begin_click(&button, ms(10));
        assert!(!tab);
        let request = request.unwrap();
        assert_eq!(request.text, "npm install rw");

        let CopyOutcome::Copied {
            ticket,
            revert_at,
            delay,
        } = page.finish_copy(&request, Ok(()), ms(10))
        else {
            panic!("expected copy");
        };
        assert_eq!(delay, ms(2000));
        assert_eq!(revert_at, ms(2010));
        assert!(page.dom().has_class(&button, "copied"));

        assert!(page.fire_revert(ticket));
        assert!(!page.dom().has_class(&button, "copied"));
        assert!(!page.fire_revert(ticket));
    }

    #[test]
    fn test_finish_after_dispose_is_ignored() {
        let mut page = load(PAGE, &Config::default());
        let button = select(&page, ".copy-button")[0];
        let (_, request) = page.begin_click(&button, ms(0));

        page.dispose();

        assert_eq!(
            page.finish_copy(&request.unwrap(), Ok(()), ms(5)),
            CopyOutcome::Failed
        );
        assert!(!page.dom().has_class(&button, "copied"));
    }

    #[test]
    fn test_revert_measured_from_copy_completion() {
        let mut page = load(PAGE, &Config::default());
        let button = select(&page, ".copy-button")[1];
        let yarn = select(&page, ".tab-button")[1];

        let (_, request) = page.begin_click(&button, ms(0));
        let outcome = page.finish_copy(&request.unwrap(), Ok(()), ms(1500));
        assert!(matches!(
            outcome,
            CopyOutcome::Copied { revert_at, .. } if revert_at == ms(3500)
        ));
        assert_eq!(page.now(), ms(1500));

        let (tab, _) = page.begin_click(&yarn, ms(2100));
        assert!(tab);
        assert!(page.dom().has_class(&button, "copied"));

        assert_eq!(page.advance(ms(3499)), 0);
        assert!(page.dom().has_class(&button, "copied"));
        assert_eq!(page.advance(ms(3500)), 1);
        assert!(!page.dom().has_class(&button, "copied"));
    }

    #[test]
    fn test_finish_copy_fires_reverts_due_meanwhile() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::new();
        let buttons = select(&page, ".copy-button");

        tokio_test::block_on(page.click(&buttons[1], &clipboard, ms(0)));
        let (_, request) = page.begin_click(&buttons[0], ms(100));
        page.finish_copy(&request.unwrap(), Ok(()), ms(2500));

        assert_eq!(page.summary().copy.buttons, vec![CopyState::Copied, CopyState::Idle]);
        assert_eq!(page.summary().copy.next_revert_ms, Some(4500));
    }

    #[test]
    fn test_dispose_reverts_copied_buttons() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::new();
        let button = select(&page, ".copy-button")[1];
        let copy_icon = select(&page, ".copy-icon")[1];
        let check_icon = select(&page, ".check-icon")[1];

        tokio_test::block_on(page.click(&button, &clipboard, ms(0)));
        assert!(page.dom().has_class(&button, "copied"));

        page.dispose();

        assert!(!page.dom().has_class(&button, "copied"));
        assert!(!page.dom().is_hidden(&copy_icon));
        assert!(page.dom().is_hidden(&check_icon));
        assert_eq!(page.advance(ms(10_000)), 0);
        assert!(!page.dom().has_class(&button, "copied"));
    }

    #[test]
    fn test_page_time_is_monotonic() {
        let mut page = load(PAGE, &Config::default());
        page.advance(ms(1000));
        page.advance(ms(10));
        assert_eq!(page.now(), ms(1000));
    }

    #[test]
    fn test_dispose_ignores_events() {
        let mut page = load(PAGE, &Config::default());
        let clipboard = MemoryClipboard::new();
        let yarn = select(&page, ".tab-button")[1];
        let button = select(&page, ".copy-button")[1];

        page.dispose();
        let entries = [visible(&page, "usage", 1.0)];
        page.visibility_changed(&entries);
        let tab = tokio_test::block_on(page.click(&yarn, &clipboard, ms(0)));
        let copy = tokio_test::block_on(page.click(&button, &clipboard, ms(0)));

        assert!(page.is_disposed());
        assert_eq!(tab, ClickOutcome::default());
        assert_eq!(copy, ClickOutcome::default());
        assert!(clipboard.writes().is_empty());
        assert!(!page.scroll_spy().is_enabled());
        assert_eq!(page.summary().tab_groups[0].active.as_deref(), Some("npm"));
    }

    #[test]
    fn test_page_without_navigation_creates_no_observer() {
        let html = r#"<div class="code-block"><code>x</code><button class="copy-button">Copy</button></div>"#;
        let doc = Document::parse(html).unwrap();
        let root = doc.root();
        let mut created = false;
        let page: TestPage = Page::initialize(doc, &root, &Config::default(), |threshold| {
            created = true;
            SyntheticObserver::new(threshold)
        })
        .unwrap();

        assert!(!created);
        assert!(!page.summary().scroll_spy.enabled);
        assert_eq!(page.copy_controls().button_count(), 1);
    }

    #[test]
    fn test_warnings_are_collected() {
        let html = r##"<nav><a href="#missing">Missing</a></nav>
<div class="tabs"><button class="tab-button" data-tab="a">A</button></div>"##;
        let page = load(html, &Config::default());

        let warnings: Vec<&str> = page.warnings().collect();
        assert_eq!(
            warnings,
            vec![
                "tab group 0: tab `a` has no matching pane",
                "navigation link `#missing` has no section",
            ]
        );
    }

    #[test]
    fn test_into_dom_returns_rendered_document() {
        let page = load(PAGE, &Config::default());
        let html = page.into_dom().to_html();
        assert!(html.contains(r#"<button class="tab-button active" data-tab="npm">"#));
    }
}
