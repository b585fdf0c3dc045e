//! Widget definitions registered with a layout

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Component, WidgetId};

/// Listener callback: receives the event value and the listening widget's id
pub type Callback = Rc<dyn Fn(&Value, &WidgetId)>;

/// Builds a fresh component for every widget instance
pub type ComponentFactory = Rc<dyn Fn() -> Box<dyn Component>>;

/// Geometry for a popped-out window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowParams {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

/// Which action list an [`ActionItem`] lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Tab,
    Menu,
}

/// A tab or menu action offered by a widget
#[derive(Clone)]
pub struct ActionItem {
    pub label: String,
    /// Icon class name, as understood by the renderer
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub action: Rc<dyn Fn(&WidgetId)>,
}

impl ActionItem {
    pub fn new(label: impl Into<String>, action: impl Fn(&WidgetId) + 'static) -> Self {
        Self {
            label: label.into(),
            icon: None,
            icon_color: None,
            action: Rc::new(action),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_icon_color(mut self, color: impl Into<String>) -> Self {
        self.icon_color = Some(color.into());
        self
    }
}

impl fmt::Debug for ActionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionItem")
            .field("label", &self.label)
            .field("icon", &self.icon)
            .field("icon_color", &self.icon_color)
            .finish_non_exhaustive()
    }
}

/// Definition of a widget type a layout can instantiate
#[derive(Clone)]
pub struct WidgetDef {
    /// Name the docking engine refers to this definition by
    pub component_name: String,
    pub title: String,
    pub icon: Option<String>,
    pub factory: ComponentFactory,
    /// Initial state, applied before any persisted component state
    pub state: Option<Value>,
    /// Events this widget listens for when linked to a source
    pub listeners: Vec<(String, Callback)>,
    /// Events this widget listens for on its own outputs
    pub self_listeners: Vec<(String, Callback)>,
    pub tab_actions: Vec<ActionItem>,
    pub menu_actions: Vec<ActionItem>,
    pub window_params: Option<WindowParams>,
}

impl WidgetDef {
    pub fn new<C, F>(component_name: impl Into<String>, factory: F) -> Self
    where
        C: Component + 'static,
        F: Fn() -> C + 'static,
    {
        let component_name = component_name.into();
        Self {
            title: component_name.clone(),
            component_name,
            icon: None,
            factory: Rc::new(move || Box::new(factory()) as Box<dyn Component>),
            state: None,
            listeners: Vec::new(),
            self_listeners: Vec::new(),
            tab_actions: Vec::new(),
            menu_actions: Vec::new(),
            window_params: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_listener(
        mut self,
        event: impl Into<String>,
        callback: impl Fn(&Value, &WidgetId) + 'static,
    ) -> Self {
        self.listeners.push((event.into(), Rc::new(callback)));
        self
    }

    pub fn with_self_listener(
        mut self,
        event: impl Into<String>,
        callback: impl Fn(&Value, &WidgetId) + 'static,
    ) -> Self {
        self.self_listeners.push((event.into(), Rc::new(callback)));
        self
    }

    pub fn with_tab_action(mut self, action: ActionItem) -> Self {
        self.tab_actions.push(action);
        self
    }

    pub fn with_menu_action(mut self, action: ActionItem) -> Self {
        self.menu_actions.push(action);
        self
    }

    pub fn with_window_params(mut self, params: WindowParams) -> Self {
        self.window_params = Some(params);
        self
    }

    /// Instantiate the component
    pub fn build(&self) -> Box<dyn Component> {
        (self.factory)()
    }
}

impl fmt::Debug for WidgetDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: Vec<&str> = self.listeners.iter().map(|(e, _)| e.as_str()).collect();
        let self_listeners: Vec<&str> = self
            .self_listeners
            .iter()
            .map(|(e, _)| e.as_str())
            .collect();
        f.debug_struct("WidgetDef")
            .field("component_name", &self.component_name)
            .field("title", &self.title)
            .field("state", &self.state)
            .field("listeners", &listeners)
            .field("self_listeners", &self_listeners)
            .field("tab_actions", &self.tab_actions)
            .field("menu_actions", &self.menu_actions)
            .finish_non_exhaustive()
    }
}
