//! Navigation highlighting driven by section visibility.
//!
//! Sections are observed through a [`VisibilityObserver`]; the host feeds
//! visibility notifications back via [`ScrollSpy::on_visibility_change`].
//! Entries in a batch are processed in order and each one that meets the
//! threshold clears every link before marking its own, so the last qualifying
//! entry wins.

use rw_config::ScrollSpyConfig;
use rw_dom::{Dom, Selector};

use crate::error::{BehaviorError, compile};

/// Visibility notification for one observed element.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEntry<N> {
    /// Observed element.
    pub target: N,
    /// Visible fraction of the element, `0.0..=1.0`.
    pub ratio: f64,
    /// Whether the element intersects the viewport at all.
    pub is_intersecting: bool,
}

/// Push-based visibility tracking, e.g. an `IntersectionObserver`.
pub trait VisibilityObserver<N> {
    /// Start reporting visibility changes for `target`.
    fn observe(&mut self, target: &N);

    /// Stop reporting for all targets.
    fn disconnect(&mut self);
}

/// Observer that only records what it was asked to watch.
///
/// Used where visibility is fed in synthetically (tests, the CLI).
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticObserver<N> {
    threshold: f64,
    observed: Vec<N>,
    connected: bool,
}

impl<N: Clone> SyntheticObserver<N> {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            observed: Vec::new(),
            connected: true,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Targets observed so far, empty after disconnect.
    #[must_use]
    pub fn observed(&self) -> &[N] {
        &self.observed
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl<N: Clone> VisibilityObserver<N> for SyntheticObserver<N> {
    fn observe(&mut self, target: &N) {
        if self.connected {
            self.observed.push(target.clone());
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.observed.clear();
    }
}

/// Active navigation link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpyState {
    /// Index of the active link.
    pub active_link: Option<usize>,
}

#[derive(Debug, Clone)]
struct NavLink<N> {
    node: N,
    fragment: Option<String>,
}

#[derive(Debug, Clone)]
struct Section<N> {
    node: N,
    id: String,
}

/// Scroll spy over every navigation link and section on a page.
///
/// When either set is empty the spy is disabled: no observer is created and
/// notifications are ignored.
#[derive(Debug)]
pub struct ScrollSpy<N, O> {
    links: Vec<NavLink<N>>,
    sections: Vec<Section<N>>,
    observer: Option<O>,
    threshold: f64,
    active_class: String,
    state: SpyState,
    warnings: Vec<String>,
}

impl<N, O> ScrollSpy<N, O>
where
    N: Clone + PartialEq + std::fmt::Debug,
    O: VisibilityObserver<N>,
{
    /// Collect links and sections below `root` and start observing.
    ///
    /// `make_observer` receives the threshold and is only called when there
    /// is at least one link and one section.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError`] if a configured selector is invalid.
    pub fn attach<D, F>(
        dom: &D,
        root: &N,
        config: &ScrollSpyConfig,
        make_observer: F,
    ) -> Result<Self, BehaviorError>
    where
        D: Dom<Node = N>,
        F: FnOnce(f64) -> O,
    {
        let link_selector: Selector = compile(&config.links, "scroll_spy.links")?;
        let section_selector: Selector = compile(&config.sections, "scroll_spy.sections")?;

        let links: Vec<NavLink<N>> = dom
            .query_all(root, &link_selector)
            .into_iter()
            .map(|node| NavLink {
                fragment: dom
                    .attribute(&node, "href")
                    .as_deref()
                    .and_then(href_fragment)
                    .map(str::to_owned),
                node,
            })
            .collect();

        let sections: Vec<Section<N>> = dom
            .query_all(root, &section_selector)
            .into_iter()
            .filter_map(|node| {
                let id = dom.attribute(&node, "id").filter(|id| !id.is_empty())?;
                Some(Section { node, id })
            })
            .collect();

        let mut warnings = Vec::new();
        for section in &sections {
            if !links.iter().any(|l| l.fragment.as_deref() == Some(section.id.as_str())) {
                warnings.push(format!("section `{}` has no navigation link", section.id));
            }
        }
        for link in &links {
            match &link.fragment {
                Some(fragment) if !sections.iter().any(|s| &s.id == fragment) => {
                    warnings.push(format!("navigation link `#{fragment}` has no section"));
                }
                None => warnings.push("navigation link without fragment".to_owned()),
                Some(_) => {}
            }
        }

        let observer = if links.is_empty() || sections.is_empty() {
            tracing::debug!(
                links = links.len(),
                sections = sections.len(),
                "Scroll spy disabled"
            );
            None
        } else {
            let mut observer = make_observer(config.threshold);
            for section in &sections {
                observer.observe(&section.node);
            }
            tracing::debug!(
                links = links.len(),
                sections = sections.len(),
                "Scroll spy attached"
            );
            Some(observer)
        };

        Ok(Self {
            links,
            sections,
            observer,
            threshold: config.threshold,
            active_class: config.active_class.clone(),
            state: SpyState::default(),
            warnings,
        })
    }

    /// Apply a batch of visibility notifications.
    pub fn on_visibility_change<D>(&mut self, dom: &mut D, entries: &[VisibilityEntry<N>])
    where
        D: Dom<Node = N>,
    {
        if self.observer.is_none() {
            return;
        }

        for entry in entries {
            if !self.meets_threshold(entry) {
                continue;
            }
            let Some(section) = self.sections.iter().find(|s| s.node == entry.target) else {
                tracing::trace!(element = ?entry.target, "Visibility entry for unobserved element");
                continue;
            };
            let link = self
                .links
                .iter()
                .position(|l| l.fragment.as_deref() == Some(section.id.as_str()));

            tracing::trace!(section = %section.id, link = ?link, "Section in view");
            self.state.active_link = link;
            self.render(dom);
        }
    }

    fn meets_threshold(&self, entry: &VisibilityEntry<N>) -> bool {
        entry.is_intersecting && entry.ratio >= self.threshold
    }

    /// Map state to the active class on navigation links.
    fn render<D>(&self, dom: &mut D)
    where
        D: Dom<Node = N>,
    {
        for (i, link) in self.links.iter().enumerate() {
            dom.set_class(&link.node, &self.active_class, self.state.active_link == Some(i));
        }
    }

    /// Disconnect the observer and hand it back. Later notifications are
    /// ignored.
    ///
    /// Returns `None` if the spy was disabled or already detached.
    pub fn detach(&mut self) -> Option<O> {
        let mut observer = self.observer.take()?;
        observer.disconnect();
        Some(observer)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.observer.is_some()
    }

    #[must_use]
    pub fn observer(&self) -> Option<&O> {
        self.observer.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> SpyState {
        self.state
    }

    /// Identifiers of the observed sections, in document order.
    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.id.as_str())
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Fragment of the active link.
    #[must_use]
    pub fn active_fragment(&self) -> Option<&str> {
        self.state
            .active_link
            .and_then(|i| self.links.get(i))
            .and_then(|l| l.fragment.as_deref())
    }

    /// Problems found while attaching.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Fragment of an `href`: the text after the last `#`, if non-empty.
fn href_fragment(href: &str) -> Option<&str> {
    href.rsplit_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|f| !f.is_empty())
}
