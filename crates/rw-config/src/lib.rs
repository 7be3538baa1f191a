//! Configuration management for RW page behaviors.
//!
//! Parses `rw-page.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Every key has a default, so an empty file (or no file at all) yields a
//! working configuration for pages rendered by RW. CLI settings can be applied
//! during load via [`CliSettings`].
//!
//! ```toml
//! [tabs]
//! container = ".tabs"
//! active_class = "active"
//!
//! [scroll_spy]
//! links = "nav.toc a[href^='#']"
//! threshold = 0.5
//!
//! [copy]
//! revert_after_ms = 2000
//! revert_policy = "overlap"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override scroll spy intersection threshold.
    pub threshold: Option<f64>,
    /// Override copy feedback duration.
    pub revert_after_ms: Option<u64>,
    /// Override copy revert policy.
    pub revert_policy: Option<RevertPolicy>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rw-page.toml";

/// Page behavior configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tab controller configuration.
    pub tabs: TabsConfig,
    /// Scroll spy configuration.
    pub scroll_spy: ScrollSpyConfig,
    /// Copy-to-clipboard configuration.
    pub copy: CopyConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Tab controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TabsConfig {
    /// Selector for tab group containers.
    pub container: String,
    /// Selector for trigger elements inside a container.
    pub trigger: String,
    /// Selector for content panes inside a container.
    pub pane: String,
    /// Attribute carrying the tab name on triggers and panes.
    pub name_attribute: String,
    /// Class marking the active trigger and pane.
    pub active_class: String,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            container: ".tabs".to_owned(),
            trigger: ".tab-button".to_owned(),
            pane: ".tab-pane".to_owned(),
            name_attribute: "data-tab".to_owned(),
            active_class: "active".to_owned(),
        }
    }
}

/// Scroll spy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollSpyConfig {
    /// Selector for navigation links.
    pub links: String,
    /// Selector for observed sections.
    pub sections: String,
    /// Visible fraction at which a section counts as in view.
    pub threshold: f64,
    /// Class marking the active link.
    pub active_class: String,
}

impl Default for ScrollSpyConfig {
    fn default() -> Self {
        Self {
            links: "nav a[href^=\"#\"]".to_owned(),
            sections: "section[id]".to_owned(),
            threshold: 0.5,
            active_class: "active".to_owned(),
        }
    }
}

/// Copy-to-clipboard configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Selector for copy buttons.
    pub button: String,
    /// Selector for the code block wrapper enclosing a button.
    pub wrapper: String,
    /// Selector for the code element inside the wrapper.
    pub code: String,
    /// Selector for the default icon inside the button.
    pub default_icon: String,
    /// Selector for the confirmation icon inside the button.
    pub confirm_icon: String,
    /// Class marking a button after a successful copy.
    pub copied_class: String,
    /// How long the copied state lasts.
    pub revert_after_ms: u64,
    /// Interaction of repeated successful copies with pending reverts.
    pub revert_policy: RevertPolicy,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            button: ".copy-button".to_owned(),
            wrapper: ".code-block".to_owned(),
            code: "code".to_owned(),
            default_icon: ".copy-icon".to_owned(),
            confirm_icon: ".check-icon".to_owned(),
            copied_class: "copied".to_owned(),
            revert_after_ms: 2000,
            revert_policy: RevertPolicy::default(),
        }
    }
}

impl CopyConfig {
    /// Copied state duration.
    #[must_use]
    pub fn revert_after(&self) -> Duration {
        Duration::from_millis(self.revert_after_ms)
    }
}

/// What happens to a pending revert when the same button copies again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevertPolicy {
    /// Every success schedules its own revert; earlier reverts still fire.
    #[default]
    Overlap,
    /// A new success replaces the button's pending revert.
    Restart,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a class name to be a single token.
fn require_class_name(value: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(value, field)?;
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a single class name"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rw-page.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(threshold) = settings.threshold {
            self.scroll_spy.threshold = threshold;
        }
        if let Some(revert_after_ms) = settings.revert_after_ms {
            self.copy.revert_after_ms = revert_after_ms;
        }
        if let Some(revert_policy) = settings.revert_policy {
            self.copy.revert_policy = revert_policy;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// Used where there is no filesystem to discover from, e.g. in the browser.
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails or the configuration is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Selector syntax is checked when behaviors compile their selectors;
    /// here only presence and ranges are checked.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_tabs()?;
        self.validate_scroll_spy()?;
        self.validate_copy()?;
        Ok(())
    }

    fn validate_tabs(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.tabs.container, "tabs.container")?;
        require_non_empty(&self.tabs.trigger, "tabs.trigger")?;
        require_non_empty(&self.tabs.pane, "tabs.pane")?;
        require_non_empty(&self.tabs.name_attribute, "tabs.name_attribute")?;
        require_class_name(&self.tabs.active_class, "tabs.active_class")?;
        Ok(())
    }

    fn validate_scroll_spy(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.scroll_spy.links, "scroll_spy.links")?;
        require_non_empty(&self.scroll_spy.sections, "scroll_spy.sections")?;
        require_class_name(&self.scroll_spy.active_class, "scroll_spy.active_class")?;

        let threshold = self.scroll_spy.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "scroll_spy.threshold must be in (0, 1], got {threshold}"
            )));
        }
        Ok(())
    }

    fn validate_copy(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.copy.button, "copy.button")?;
        require_non_empty(&self.copy.wrapper, "copy.wrapper")?;
        require_non_empty(&self.copy.code, "copy.code")?;
        require_non_empty(&self.copy.default_icon, "copy.default_icon")?;
        require_non_empty(&self.copy.confirm_icon, "copy.confirm_icon")?;
        require_class_name(&self.copy.copied_class, "copy.copied_class")?;

        if self.copy.revert_after_ms == 0 {
            return Err(ConfigError::Validation(
                "copy.revert_after_ms must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}
