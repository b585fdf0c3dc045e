//! Error taxonomy for the event bus and linking subsystem
//!
//! Only usage errors (wiring bugs in a widget definition) and I/O or parse
//! failures surface as [`FlexingError`]. Benign races such as subscribing to a
//! source that is not registered yet are absorbed by the callers as no-ops.

use crate::widget::WidgetId;

/// Errors returned by the library
#[derive(Debug, thiserror::Error)]
pub enum FlexingError {
    /// A value was emitted on an event the widget never registered.
    #[error("event '{event}' has not been registered in widget {widget}")]
    UnregisteredEvent { widget: WidgetId, event: String },

    /// An event was registered for a widget that has no relay entry.
    #[error("widget {0} is not registered with the event relay")]
    UnregisteredComponent(WidgetId),

    /// `unsubscribe` was called for a (listener, event) pair with no live subscription.
    #[error("widget {listener} has no subscription for event '{event}'")]
    NoSubscription { listener: WidgetId, event: String },

    /// A subscription was requested before the listener installed a callback.
    #[error("widget {listener} has no callback registered for event '{event}'")]
    MissingCallback { listener: WidgetId, event: String },

    /// No layout with this name exists.
    #[error("unknown layout '{0}'")]
    UnknownLayout(String),

    /// The layout has no widget definition with this component name.
    #[error("layout '{layout}' has no registered component '{component}'")]
    UnknownComponent { layout: String, component: String },

    /// The widget is not live in the layout.
    #[error("widget {widget} is not live in layout '{layout}'")]
    UnknownWidget { layout: String, widget: WidgetId },

    /// An instance id was requested that is already in use by a live widget.
    #[error("widget id {0} is already in use")]
    DuplicateWidget(WidgetId),

    /// A colour string could not be parsed.
    #[error("invalid colour '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlexingError {
    /// True for errors that indicate a wiring bug rather than bad input
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            FlexingError::UnregisteredEvent { .. }
                | FlexingError::UnregisteredComponent(_)
                | FlexingError::NoSubscription { .. }
                | FlexingError::MissingCallback { .. }
        )
    }
}

pub type Result<T, E = FlexingError> = std::result::Result<T, E>;
