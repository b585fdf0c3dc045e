//! Live widget instances

use std::fmt;

use serde_json::Value;

use super::{ActionItem, Component, WidgetDef, WidgetId, WindowParams};

/// A live widget inside a layout
pub struct Widget {
    id: WidgetId,
    layout: String,
    component_name: String,
    title: String,
    component: Box<dyn Component>,
    /// Events this widget accepts from a linked source, in declaration order
    listens: Vec<String>,
    tab_actions: Vec<ActionItem>,
    menu_actions: Vec<ActionItem>,
    window_params: Option<WindowParams>,
}

impl Widget {
    /// Instantiate a widget from its definition and run the component's `init`
    pub(crate) fn new(def: &WidgetDef, id: WidgetId, layout: &str) -> Self {
        let mut component = def.build();
        component.init(&id);

        let mut widget = Self {
            id,
            layout: layout.to_string(),
            component_name: def.component_name.clone(),
            title: def.title.clone(),
            component,
            listens: Vec::new(),
            tab_actions: def.tab_actions.clone(),
            menu_actions: def.menu_actions.clone(),
            window_params: def.window_params,
        };
        for (event, _) in def.listeners.iter().chain(&def.self_listeners) {
            widget.add_listen(event);
        }
        if let Some(state) = &def.state {
            widget.set_state(state);
        }
        widget
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub fn component_mut(&mut self) -> &mut dyn Component {
        self.component.as_mut()
    }

    /// Event names this widget listens for
    pub fn listens(&self) -> &[String] {
        &self.listens
    }

    /// Declare interest in an event (no duplicates)
    pub fn add_listen(&mut self, event: &str) {
        if !self.listens.iter().any(|e| e == event) {
            self.listens.push(event.to_string());
        }
    }

    pub fn state(&self) -> Value {
        self.component.state()
    }

    pub fn set_state(&mut self, state: &Value) {
        self.component.set_state(state);
    }

    pub fn on_resize(&mut self, width: f32, height: f32) {
        self.component.on_resize(width, height);
    }

    pub fn tab_actions(&self) -> &[ActionItem] {
        &self.tab_actions
    }

    pub fn set_tab_actions(&mut self, actions: Vec<ActionItem>) {
        self.tab_actions = actions;
    }

    pub fn menu_actions(&self) -> &[ActionItem] {
        &self.menu_actions
    }

    pub fn set_menu_actions(&mut self, actions: Vec<ActionItem>) {
        self.menu_actions = actions;
    }

    pub fn window_params(&self) -> Option<WindowParams> {
        self.window_params
    }

    pub(crate) fn dispose(&mut self) {
        self.component.dispose();
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .field("component_name", &self.component_name)
            .field("title", &self.title)
            .field("listens", &self.listens)
            .finish_non_exhaustive()
    }
}
