//! Command types for the Elm-style architecture
//!
//! Commands are the side effects the renderer performs after an update:
//! overlays, tab icons, tab actions, titles and popouts. The core never
//! draws anything itself.

use crate::link::{Affordance, LinkColor};
use crate::widget::{ActionItem, WidgetId, WindowParams};

/// Renderer-facing description of an [`ActionItem`]
///
/// The renderer reports clicks back by index, see
/// [`WidgetMsg::ActionInvoked`](crate::messages::WidgetMsg::ActionInvoked).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionView {
    pub label: String,
    pub icon: Option<String>,
    pub icon_color: Option<String>,
}

impl From<&ActionItem> for ActionView {
    fn from(item: &ActionItem) -> Self {
        Self {
            label: item.label.clone(),
            icon: item.icon.clone(),
            icon_color: item.icon_color.clone(),
        }
    }
}

/// Side effects returned by update
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cmd {
    /// No command - do nothing
    #[default]
    None,
    /// Execute multiple commands, in order
    Batch(Vec<Cmd>),

    // === Linking overlays ===
    /// Show a clickable overlay over `target`; a click must be reported as
    /// `LinkMsg::AffordanceClicked` carrying the same fields
    CreateAffordance(Affordance),
    /// Remove every overlay in the layout
    RemoveAffordances { layout: String },

    // === Tab decorations ===
    /// Marker on a source's tab
    SetSourceIcon {
        layout: String,
        widget: WidgetId,
        color: LinkColor,
    },
    RemoveSourceIcon { layout: String, widget: WidgetId },
    /// Marker on a listener's tab, in its source's colour
    SetListenerIcon {
        layout: String,
        widget: WidgetId,
        color: LinkColor,
    },
    RemoveListenerIcon { layout: String, widget: WidgetId },
    SetTabActions {
        layout: String,
        widget: WidgetId,
        actions: Vec<ActionView>,
    },
    RemoveTabActions { layout: String, widget: WidgetId },
    SetMenuActions {
        layout: String,
        widget: WidgetId,
        actions: Vec<ActionView>,
    },
    SetTitle {
        layout: String,
        widget: WidgetId,
        title: String,
    },

    // === Windows ===
    /// Open the widget in a separate window
    Popout {
        layout: String,
        widget: WidgetId,
        window_params: Option<WindowParams>,
    },
}

impl Cmd {
    /// Combine commands, dropping `None`s
    ///
    /// Returns `Cmd::None` for an empty result and the command itself when
    /// only one remains.
    pub fn batch(cmds: impl IntoIterator<Item = Cmd>) -> Self {
        let mut cmds: Vec<Cmd> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.remove(0),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            Cmd::None => true,
            Cmd::Batch(cmds) => cmds.iter().all(Cmd::is_none),
            _ => false,
        }
    }

    /// All leaf commands in execution order
    pub fn flatten(self) -> Vec<Cmd> {
        match self {
            Cmd::None => Vec::new(),
            Cmd::Batch(cmds) => cmds.into_iter().flat_map(Cmd::flatten).collect(),
            cmd => vec![cmd],
        }
    }

    /// `Some(self)` unless there is nothing to do
    pub fn into_option(self) -> Option<Cmd> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

pub(crate) fn action_views(actions: &[ActionItem]) -> Vec<ActionView> {
    actions.iter().map(ActionView::from).collect()
}
