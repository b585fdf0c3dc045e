//! Debug tracing infrastructure for development diagnostics
//!
//! Provides structured logging with scoped filtering for debugging
//! subscription lifecycles and linking state transitions.
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=link=debug,message=debug` - scoped filtering
//! - `RUST_LOG=flexing::bus=trace` - module-level filtering, including every delivery
//!
//! # Log Files
//!
//! Logs are written to `~/.config/flexing/logs/flexing.log` with daily rotation.
//! File logging uses debug level by default for more verbose troubleshooting.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::layout::Layout;
use crate::link::LinkColor;
use crate::model::FlexingModel;
use crate::widget::WidgetId;

/// Initialize tracing subscriber with console and file logging
///
/// Console output respects RUST_LOG and defaults to `warn`.
/// File logging writes to `~/.config/flexing/logs/flexing.log` with daily rotation.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Console layer - respects RUST_LOG
    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "flexing.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Lightweight snapshot of every layout's link graph for diffing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSnapshot {
    pub layouts: Vec<LayoutLinks>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLinks {
    pub name: String,
    pub widget_count: usize,
    pub initiator: Option<WidgetId>,
    /// `(listener, source)`, sorted
    pub edges: Vec<(WidgetId, WidgetId)>,
    /// `(source, colour)`, sorted
    pub colors: Vec<(WidgetId, LinkColor)>,
}

impl LayoutLinks {
    pub fn from_layout(layout: &Layout) -> Self {
        let topology = layout.topology();
        let mut edges: Vec<(WidgetId, WidgetId)> = topology
            .edges()
            .map(|(listener, source)| (listener.clone(), source.clone()))
            .collect();
        edges.sort();
        let mut colors: Vec<(WidgetId, LinkColor)> = topology
            .colors()
            .map(|(source, color)| (source.clone(), color))
            .collect();
        colors.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: layout.name().to_string(),
            widget_count: layout.widgets().len(),
            initiator: layout.session().initiator().cloned(),
            edges,
            colors,
        }
    }
}

impl LinkSnapshot {
    pub fn from_model(model: &FlexingModel) -> Self {
        Self {
            layouts: model.layouts().iter().map(LayoutLinks::from_layout).collect(),
        }
    }

    /// Generate a diff description between two snapshots
    pub fn diff(&self, other: &LinkSnapshot) -> Option<String> {
        let mut changes = Vec::new();

        for before in &self.layouts {
            match other.layouts.iter().find(|l| l.name == before.name) {
                Some(after) => diff_layout(before, after, &mut changes),
                None => changes.push(format!("{}: removed", before.name)),
            }
        }
        for after in &other.layouts {
            if !self.layouts.iter().any(|l| l.name == after.name) {
                changes.push(format!("{}: created", after.name));
            }
        }

        if changes.is_empty() {
            None
        } else {
            Some(changes.join("; "))
        }
    }
}

fn diff_layout(before: &LayoutLinks, after: &LayoutLinks, changes: &mut Vec<String>) {
    let name = &after.name;
    if before.widget_count != after.widget_count {
        changes.push(format!(
            "{}: widgets {} → {}",
            name, before.widget_count, after.widget_count
        ));
    }
    if before.initiator != after.initiator {
        let show = |i: &Option<WidgetId>| {
            i.as_ref()
                .map_or_else(|| "idle".to_string(), |id| format!("linking {}", id))
        };
        changes.push(format!(
            "{}: {} → {}",
            name,
            show(&before.initiator),
            show(&after.initiator)
        ));
    }
    for (listener, source) in &before.edges {
        if !after.edges.contains(&(listener.clone(), source.clone())) {
            changes.push(format!("{}: -{}←{}", name, listener, source));
        }
    }
    for (listener, source) in &after.edges {
        if !before.edges.contains(&(listener.clone(), source.clone())) {
            changes.push(format!("{}: +{}←{}", name, listener, source));
        }
    }
    for (source, color) in &after.colors {
        if !before.colors.contains(&(source.clone(), *color)) {
            changes.push(format!("{}: {} wears {}", name, source, color));
        }
    }
    for (source, _) in &before.colors {
        if !after.colors.iter().any(|(s, _)| s == source) {
            changes.push(format!("{}: {} colour freed", name, source));
        }
    }
}
