//! Message types for the Elm-style architecture
//!
//! Raw UI events from the renderer enter the model through these messages.

use crate::widget::{ActionKind, WidgetId};

/// A key press relevant to linking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(String),
}

impl Key {
    /// Map a DOM-style key name
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Linking interaction messages
#[derive(Debug, Clone, PartialEq)]
pub enum LinkMsg {
    /// Widget asked to pick a source
    Start { layout: String, widget: WidgetId },
    /// A tab was activated (restarts a running session, redraws the tab)
    TabActivated { layout: String, widget: WidgetId },
    /// An overlay created by `Cmd::CreateAffordance` was clicked
    AffordanceClicked {
        layout: String,
        target: WidgetId,
        initiator: WidgetId,
    },
    /// Escape cancels a running session
    KeyPressed { layout: String, key: Key },
    Cancel { layout: String },
    Unlink { layout: String, widget: WidgetId },
}

/// Widget container messages
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetMsg {
    /// Any container of the layout was resized
    Resized {
        layout: String,
        width: f32,
        height: f32,
    },
    Popout { layout: String, widget: WidgetId },
    SetTitle {
        layout: String,
        widget: WidgetId,
        title: String,
    },
    /// A tab or menu action button was clicked
    ActionInvoked {
        layout: String,
        widget: WidgetId,
        kind: ActionKind,
        index: usize,
    },
    /// The docking engine destroyed the widget's container
    Closed { layout: String, widget: WidgetId },
}

/// Top-level message
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Link(LinkMsg),
    Widget(WidgetMsg),
}

impl From<LinkMsg> for Msg {
    fn from(msg: LinkMsg) -> Self {
        Msg::Link(msg)
    }
}

impl From<WidgetMsg> for Msg {
    fn from(msg: WidgetMsg) -> Self {
        Msg::Widget(msg)
    }
}
