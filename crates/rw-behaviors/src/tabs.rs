//! Tab groups with mutually exclusive panes.
//!
//! Each container matched by `tabs.container` is an independent group. A
//! trigger and a pane belong to the nearest enclosing container, so nested
//! groups never capture each other's elements.
//!
//! # Expected Markup
//!
//! ```html
//! <div class="tabs">
//!   <button class="tab-button active" data-tab="npm">npm</button>
//!   <button class="tab-button" data-tab="yarn">yarn</button>
//!   <div class="tab-pane active" data-tab="npm">npm install rw</div>
//!   <div class="tab-pane" data-tab="yarn">yarn add rw</div>
//! </div>
//! ```

use rw_config::TabsConfig;
use rw_dom::{Dom, Selector};

use crate::error::{BehaviorError, compile};

/// Active tab of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabState {
    /// Index of the active trigger within the group.
    pub active_trigger: Option<usize>,
    /// Tab name of the active trigger.
    pub active_name: Option<String>,
}

#[derive(Debug, Clone)]
struct Trigger<N> {
    node: N,
    name: String,
}

#[derive(Debug, Clone)]
struct Pane<N> {
    node: N,
    name: Option<String>,
}

/// One tab group: a container with its triggers and panes.
#[derive(Debug, Clone)]
pub struct TabGroup<N> {
    container: N,
    triggers: Vec<Trigger<N>>,
    panes: Vec<Pane<N>>,
    state: TabState,
}

impl<N> TabGroup<N> {
    #[must_use]
    pub fn container(&self) -> &N {
        &self.container
    }

    #[must_use]
    pub fn state(&self) -> &TabState {
        &self.state
    }

    /// Tab names of the triggers, in document order.
    pub fn trigger_names(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|t| t.name.as_str())
    }

    #[must_use]
    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// Index of the first pane whose name matches the active tab.
    fn active_pane(&self) -> Option<usize> {
        let name = self.state.active_name.as_deref()?;
        self.panes
            .iter()
            .position(|p| p.name.as_deref() == Some(name))
    }
}

/// Compiled `[tabs]` settings.
#[derive(Debug, Clone)]
struct TabSettings {
    container: Selector,
    trigger: Selector,
    pane: Selector,
    name_attribute: String,
    active_class: String,
}

/// Tab controller for every group on a page.
#[derive(Debug, Clone)]
pub struct TabController<N> {
    settings: TabSettings,
    groups: Vec<TabGroup<N>>,
    warnings: Vec<String>,
}

impl<N: Clone + PartialEq + std::fmt::Debug> TabController<N> {
    /// Discover tab groups below `root` and render their initial state.
    ///
    /// The initial tab of a group is the first trigger already carrying the
    /// active class, otherwise the first trigger.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviorError`] if a configured selector is invalid.
    pub fn discover<D>(dom: &mut D, root: &N, config: &TabsConfig) -> Result<Self, BehaviorError>
    where
        D: Dom<Node = N>,
    {
        let settings = TabSettings {
            container: compile(&config.container, "tabs.container")?,
            trigger: compile(&config.trigger, "tabs.trigger")?,
            pane: compile(&config.pane, "tabs.pane")?,
            name_attribute: config.name_attribute.clone(),
            active_class: config.active_class.clone(),
        };

        let mut warnings = Vec::new();
        let mut groups = Vec::new();

        for (index, container) in dom
            .query_all(root, &settings.container)
            .into_iter()
            .enumerate()
        {
            let owned = |node: &N| dom.closest(node, &settings.container).as_ref() == Some(&container);

            let mut triggers = Vec::new();
            for node in dom.query_all(&container, &settings.trigger) {
                if !owned(&node) {
                    continue;
                }
                match dom.attribute(&node, &settings.name_attribute) {
                    Some(name) if !name.is_empty() => triggers.push(Trigger { node, name }),
                    _ => warnings.push(format!(
                        "tab group {index}: trigger without `{}` attribute is not bound",
                        settings.name_attribute
                    )),
                }
            }

            let panes: Vec<Pane<N>> = dom
                .query_all(&container, &settings.pane)
                .into_iter()
                .filter(|node| owned(node))
                .map(|node| Pane {
                    name: dom.attribute(&node, &settings.name_attribute),
                    node,
                })
                .collect();

            if triggers.is_empty() {
                warnings.push(format!("tab group {index} has no triggers"));
            }
            for trigger in &triggers {
                if !panes.iter().any(|p| p.name.as_deref() == Some(trigger.name.as_str())) {
                    warnings.push(format!(
                        "tab group {index}: tab `{}` has no matching pane",
                        trigger.name
                    ));
                }
            }

            let initial = triggers
                .iter()
                .position(|t| dom.has_class(&t.node, &settings.active_class))
                .or(if triggers.is_empty() { None } else { Some(0) });

            groups.push(TabGroup {
                container,
                state: TabState {
                    active_trigger: initial,
                    active_name: initial.map(|i| triggers[i].name.clone()),
                },
                triggers,
                panes,
            });
        }

        let controller = Self {
            settings,
            groups,
            warnings,
        };
        for group in &controller.groups {
            if group.state.active_trigger.is_some() {
                controller.render(dom, group);
            }
        }

        tracing::debug!(groups = controller.groups.len(), "Tab groups bound");
        Ok(controller)
    }

    /// Handle a click on `target` or one of its ancestors.
    ///
    /// Returns `true` if the click landed on a bound trigger.
    pub fn handle_click<D>(&mut self, dom: &mut D, target: &N) -> bool
    where
        D: Dom<Node = N>,
    {
        let Some(trigger_node) = dom.closest(target, &self.settings.trigger) else {
            return false;
        };
        let found = self.groups.iter().enumerate().find_map(|(g, group)| {
            group
                .triggers
                .iter()
                .position(|t| t.node == trigger_node)
                .map(|t| (g, t))
        });
        let Some((group, trigger)) = found else {
            return false;
        };

        self.activate(dom, group, trigger);
        true
    }

    /// Make `trigger` the active tab of `group`.
    ///
    /// Out-of-range indices are ignored.
    pub fn activate<D>(&mut self, dom: &mut D, group: usize, trigger: usize)
    where
        D: Dom<Node = N>,
    {
        let Some(tab_group) = self.groups.get_mut(group) else {
            return;
        };
        let Some(name) = tab_group.triggers.get(trigger).map(|t| t.name.clone()) else {
            return;
        };

        tracing::trace!(group, tab = %name, "Activating tab");
        tab_group.state = TabState {
            active_trigger: Some(trigger),
            active_name: Some(name),
        };
        self.render(dom, &self.groups[group]);
    }

    /// Map a group's state to the active class on its triggers and panes.
    ///
    /// Touches only elements of this group.
    fn render<D>(&self, dom: &mut D, group: &TabGroup<N>)
    where
        D: Dom<Node = N>,
    {
        let class = &self.settings.active_class;
        for (i, trigger) in group.triggers.iter().enumerate() {
            dom.set_class(&trigger.node, class, group.state.active_trigger == Some(i));
        }
        let active_pane = group.active_pane();
        for (i, pane) in group.panes.iter().enumerate() {
            dom.set_class(&pane.node, class, active_pane == Some(i));
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[TabGroup<N>] {
        &self.groups
    }

    /// Problems found during discovery.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
