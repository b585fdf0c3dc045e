//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use flexing::commands::Cmd;
use flexing::config::LayoutConfig;
use flexing::messages::{LinkMsg, Msg};
use flexing::relay::Channel;
use flexing::update::update;
use flexing::widget::{Component, WidgetDef, WidgetId};
use flexing::FlexingModel;
use serde_json::{json, Value};

pub const LAYOUT: &str = "main";

/// Output channels of every opened test component, by `(widget, event)`
pub type ChannelStore = Rc<RefCell<HashMap<(WidgetId, String), Channel>>>;

/// Every value delivered to a listener callback: `(listener, event, value)`
pub type Received = Rc<RefCell<Vec<(WidgetId, String, Value)>>>;

/// Test component with configurable outputs and a plain JSON state
pub struct Stub {
    channels: Vec<(String, Channel)>,
    store: ChannelStore,
    state: Value,
    resizes: Rc<Cell<usize>>,
    disposed: Rc<Cell<usize>>,
}

impl Component for Stub {
    fn outputs(&self) -> Vec<(String, Channel)> {
        self.channels.clone()
    }

    fn init(&mut self, id: &WidgetId) {
        let mut store = self.store.borrow_mut();
        for (event, channel) in &self.channels {
            store.insert((id.clone(), event.clone()), channel.clone());
        }
    }

    fn state(&self) -> Value {
        self.state.clone()
    }

    fn set_state(&mut self, state: &Value) {
        self.state = state.clone();
    }

    fn on_resize(&mut self, _width: f32, _height: f32) {
        self.resizes.set(self.resizes.get() + 1);
    }

    fn dispose(&mut self) {
        self.disposed.set(self.disposed.get() + 1);
    }
}

/// Model with one layout and a handful of stub widget definitions
///
/// | component | emits              | listens           |
/// |-----------|--------------------|-------------------|
/// | source    | data               |                   |
/// | viewer    |                    | data              |
/// | multi     | update, resize     |                   |
/// | picky     |                    | update, close     |
/// | chain     | data               | data              |
/// | echo      | data               | data (self)       |
pub struct Harness {
    pub model: FlexingModel,
    pub outputs: ChannelStore,
    pub received: Received,
    pub resizes: Rc<Cell<usize>>,
    pub disposed: Rc<Cell<usize>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        let outputs: ChannelStore = Rc::default();
        let received: Received = Rc::default();
        let resizes = Rc::new(Cell::new(0));
        let disposed = Rc::new(Cell::new(0));
        let mut model = FlexingModel::with_seed(7);
        let harness_defs = defs(&outputs, &received, &resizes, &disposed);
        model.create_layout(LAYOUT, config, harness_defs);
        Self {
            model,
            outputs,
            received,
            resizes,
            disposed,
        }
    }

    /// Definitions sharing this harness's recorders, for re-creating the layout
    pub fn defs(&self) -> Vec<WidgetDef> {
        defs(&self.outputs, &self.received, &self.resizes, &self.disposed)
    }

    pub fn open(&mut self, component: &str, id: &str) -> Cmd {
        let (_, cmd) = self
            .model
            .open_widget(LAYOUT, component, Some(WidgetId::new(id)))
            .unwrap();
        cmd
    }

    pub fn close(&mut self, id: &str) -> Cmd {
        self.model.close_widget(LAYOUT, &wid(id)).unwrap()
    }

    /// The component's own output channel (what the widget writes to)
    pub fn channel(&self, id: &str, event: &str) -> Channel {
        self.outputs
            .borrow()
            .get(&(wid(id), event.to_string()))
            .cloned()
            .unwrap()
    }

    pub fn emit(&self, id: &str, event: &str, value: Value) {
        self.channel(id, event).emit(value);
    }

    /// Values delivered to `listener`, as `(event, value)`
    pub fn received_by(&self, listener: &str) -> Vec<(String, Value)> {
        self.received
            .borrow()
            .iter()
            .filter(|(l, _, _)| l.as_str() == listener)
            .map(|(_, e, v)| (e.clone(), v.clone()))
            .collect()
    }

    pub fn clear_received(&self) {
        self.received.borrow_mut().clear();
    }

    pub fn send(&mut self, msg: impl Into<Msg>) -> Vec<Cmd> {
        update(&mut self.model, msg.into())
            .map(Cmd::flatten)
            .unwrap_or_default()
    }

    /// Run the full click-to-connect flow: start on `listener`, click `source`
    pub fn link(&mut self, listener: &str, source: &str) -> Vec<Cmd> {
        self.send(LinkMsg::Start {
            layout: LAYOUT.to_string(),
            widget: wid(listener),
        });
        self.send(LinkMsg::AffordanceClicked {
            layout: LAYOUT.to_string(),
            target: wid(source),
            initiator: wid(listener),
        })
    }

    pub fn layout(&self) -> &flexing::Layout {
        self.model.layout(LAYOUT).unwrap()
    }

    pub fn source_of(&self, listener: &str) -> Option<WidgetId> {
        self.layout().source_of(&wid(listener)).cloned()
    }
}

pub fn wid(id: &str) -> WidgetId {
    WidgetId::new(id)
}

pub fn record(received: &Received, event: &str) -> impl Fn(&Value, &WidgetId) + 'static {
    let received = Rc::clone(received);
    let event = event.to_string();
    move |value, listener| {
        received
            .borrow_mut()
            .push((listener.clone(), event.clone(), value.clone()))
    }
}

fn stub_def(
    name: &str,
    emits: &[&str],
    outputs: &ChannelStore,
    resizes: &Rc<Cell<usize>>,
    disposed: &Rc<Cell<usize>>,
) -> WidgetDef {
    let emits: Vec<String> = emits.iter().map(|s| s.to_string()).collect();
    let store = Rc::clone(outputs);
    let resizes = Rc::clone(resizes);
    let disposed = Rc::clone(disposed);
    WidgetDef::new(name, move || Stub {
        channels: emits.iter().map(|e| (e.clone(), Channel::new())).collect(),
        store: Rc::clone(&store),
        state: json!({}),
        resizes: Rc::clone(&resizes),
        disposed: Rc::clone(&disposed),
    })
}

fn defs(
    outputs: &ChannelStore,
    received: &Received,
    resizes: &Rc<Cell<usize>>,
    disposed: &Rc<Cell<usize>>,
) -> Vec<WidgetDef> {
    vec![
        stub_def("source", &["data"], outputs, resizes, disposed),
        stub_def("viewer", &[], outputs, resizes, disposed)
            .with_listener("data", record(received, "data")),
        stub_def("multi", &["update", "resize"], outputs, resizes, disposed),
        stub_def("picky", &[], outputs, resizes, disposed)
            .with_listener("update", record(received, "update"))
            .with_listener("close", record(received, "close")),
        stub_def("chain", &["data"], outputs, resizes, disposed)
            .with_listener("data", record(received, "data")),
        stub_def("echo", &["data"], outputs, resizes, disposed)
            .with_self_listener("data", record(received, "data")),
    ]
}

/// Shorthand for the layout name used in commands
pub fn layout_name() -> String {
    LAYOUT.to_string()
}
