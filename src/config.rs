//! Layout configuration and persisted layout state
//!
//! A `LayoutConfig` is both what a layout is created from and what
//! [`FlexingModel::get_layout_state`](crate::model::FlexingModel::get_layout_state)
//! returns. Files are YAML by default and JSON when the extension says so.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::link::{Link, LinkColor};
use crate::widget::WidgetId;

/// Docking engine behaviour switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
    pub has_headers: bool,
    pub constrain_drag_to_container: bool,
    pub reorder_enabled: bool,
    pub selection_enabled: bool,
    pub popout_whole_stack: bool,
    pub blocked_popouts_throw_error: bool,
    pub close_popouts_on_unload: bool,
    pub show_popout_icon: bool,
    pub show_maximise_icon: bool,
    pub show_close_icon: bool,
    pub responsive_mode: ResponsiveMode,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            has_headers: true,
            constrain_drag_to_container: true,
            reorder_enabled: true,
            selection_enabled: false,
            popout_whole_stack: false,
            blocked_popouts_throw_error: true,
            close_popouts_on_unload: true,
            show_popout_icon: false,
            show_maximise_icon: false,
            show_close_icon: false,
            responsive_mode: ResponsiveMode::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsiveMode {
    #[default]
    Always,
    None,
    Onload,
}

/// Sizes in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutDimensions {
    pub header_height: u32,
    pub min_item_width: u32,
    pub min_item_height: u32,
    pub drag_proxy_width: u32,
    pub drag_proxy_height: u32,
}

impl Default for LayoutDimensions {
    fn default() -> Self {
        Self {
            header_height: 20,
            min_item_width: 200,
            min_item_height: 200,
            drag_proxy_width: 0,
            drag_proxy_height: 0,
        }
    }
}

/// Tooltip texts of the engine's header buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutLabels {
    pub close: String,
    pub maximise: String,
    pub minimise: String,
    pub popout: String,
    pub popin: String,
    pub tab_dropdown: String,
}

impl Default for LayoutLabels {
    fn default() -> Self {
        Self {
            close: "close".to_string(),
            maximise: "maximise".to_string(),
            minimise: "minimise".to_string(),
            popout: "open in new window".to_string(),
            popin: "pop in".to_string(),
            tab_dropdown: "Additional tabs".to_string(),
        }
    }
}

/// Icon class names for link markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIcons {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener: Option<String>,
}

/// Configuration of one layout, including persisted widget state and links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub settings: LayoutSettings,
    pub dimensions: LayoutDimensions,
    pub labels: LayoutLabels,
    /// Item tree owned by the docking engine; kept verbatim
    pub content: Value,
    /// `instanceId -> state`, applied when that widget opens
    pub component_state: BTreeMap<WidgetId, Value>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<LinkIcons>,
}

fn default_content() -> Value {
    json!([{ "type": "stack" }])
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            settings: LayoutSettings::default(),
            dimensions: LayoutDimensions::default(),
            labels: LayoutLabels::default(),
            content: default_content(),
            component_state: BTreeMap::new(),
            links: Vec::new(),
            icons: None,
        }
    }
}

impl LayoutConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a layout file; `.json` is parsed as JSON, anything else as YAML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = if is_json(path) {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        tracing::info!(
            "Loaded layout from {} ({} links)",
            path.display(),
            config.links.len()
        );
        Ok(config)
    }

    /// Write a layout file in the format its extension names
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = if is_json(path) {
            self.to_json()?
        } else {
            self.to_yaml()?
        };
        std::fs::write(path, content)?;
        tracing::info!("Saved layout to {}", path.display());
        Ok(())
    }

    /// Problems in `links` that would break the single-upstream or
    /// distinct-colour rules when restored
    pub fn validate_links(&self) -> Vec<LinkIssue> {
        let mut issues = Vec::new();
        let mut upstream: HashMap<&WidgetId, &WidgetId> = HashMap::new();
        let mut sources: HashSet<&WidgetId> = HashSet::new();
        let mut colors: HashMap<LinkColor, &WidgetId> = HashMap::new();

        for link in &self.links {
            if !sources.insert(&link.source) {
                issues.push(LinkIssue::DuplicateSource {
                    source: link.source.clone(),
                });
            }
            if let Some(other) = colors.insert(link.color, &link.source) {
                if other != &link.source {
                    issues.push(LinkIssue::SharedColor {
                        color: link.color,
                        first: other.clone(),
                        second: link.source.clone(),
                    });
                }
            }
            for subscriber in &link.subscribers {
                if subscriber == &link.source {
                    issues.push(LinkIssue::SelfLink {
                        widget: subscriber.clone(),
                    });
                    continue;
                }
                if let Some(first) = upstream.insert(subscriber, &link.source) {
                    if first != &link.source {
                        issues.push(LinkIssue::MultipleSources {
                            subscriber: subscriber.clone(),
                            first: first.clone(),
                            second: link.source.clone(),
                        });
                    }
                }
            }
        }
        issues
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// A problem found by [`LayoutConfig::validate_links`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkIssue {
    /// The same widget is listed under two sources
    MultipleSources {
        subscriber: WidgetId,
        first: WidgetId,
        second: WidgetId,
    },
    SelfLink { widget: WidgetId },
    /// Two records for one source
    DuplicateSource { source: WidgetId },
    SharedColor {
        color: LinkColor,
        first: WidgetId,
        second: WidgetId,
    },
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkIssue::MultipleSources {
                subscriber,
                first,
                second,
            } => write!(f, "{subscriber} listens to both {first} and {second}"),
            LinkIssue::SelfLink { widget } => write!(f, "{widget} is linked to itself"),
            LinkIssue::DuplicateSource { source } => {
                write!(f, "{source} appears as a source more than once")
            }
            LinkIssue::SharedColor {
                color,
                first,
                second,
            } => write!(f, "{first} and {second} share colour {color}"),
        }
    }
}
