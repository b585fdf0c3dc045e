//! Application model - the single context owning the event bus and every layout
//!
//! Widget authors and the host talk to `FlexingModel`; raw UI events go
//! through [`update`](crate::update::update) instead.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::commands::Cmd;
use crate::config::LayoutConfig;
use crate::error::{FlexingError, Result};
use crate::layout::Layout;
use crate::link::{ColorAllocator, Link};
use crate::relay::Channel;
use crate::widget::{ActionItem, ActionKind, WidgetDef, WidgetId};

/// The complete library state
#[derive(Debug)]
pub struct FlexingModel {
    bus: EventBus,
    /// Layouts in creation order
    layouts: Vec<Layout>,
    /// Instance id generator
    rng: StdRng,
    /// Fixed seed for colour allocation, for reproducible sessions
    color_seed: Option<u64>,
}

impl Default for FlexingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FlexingModel {
    pub fn new() -> Self {
        Self {
            bus: EventBus::new(),
            layouts: Vec::new(),
            rng: StdRng::from_entropy(),
            color_seed: None,
        }
    }

    /// Model with deterministic instance ids and link colours
    pub fn with_seed(seed: u64) -> Self {
        Self {
            bus: EventBus::new(),
            layouts: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            color_seed: Some(seed),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name() == name)
    }

    pub fn layout_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.layouts.iter_mut().find(|l| l.name() == name)
    }

    fn require(&self, name: &str) -> Result<&Layout> {
        self.layout(name)
            .ok_or_else(|| FlexingError::UnknownLayout(name.to_string()))
    }

    /// The layout and the shared bus, borrowed together
    pub(crate) fn parts(&mut self, name: &str) -> Result<(&mut Layout, &mut EventBus)> {
        let layout = self
            .layouts
            .iter_mut()
            .find(|l| l.name() == name)
            .ok_or_else(|| FlexingError::UnknownLayout(name.to_string()))?;
        Ok((layout, &mut self.bus))
    }

    /// Layout holding the live widget `id`, if any
    pub fn layout_of(&self, id: &WidgetId) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.contains(id))
    }

    fn allocator(&self) -> ColorAllocator {
        match self.color_seed {
            Some(seed) => ColorAllocator::seeded(seed.wrapping_add(self.layouts.len() as u64)),
            None => ColorAllocator::new(),
        }
    }

    // ========================================================================
    // Layouts
    // ========================================================================

    /// Create a layout from `config` with the given widget definitions
    ///
    /// An existing layout with the same name is destroyed first.
    pub fn create_layout(
        &mut self,
        name: &str,
        config: LayoutConfig,
        defs: Vec<WidgetDef>,
    ) -> Cmd {
        let cmd = if self.layout(name).is_some() {
            debug!(layout = name, "replacing existing layout");
            self.remove_layout(name).unwrap_or_default()
        } else {
            Cmd::None
        };
        let layout = Layout::new(name, config, defs, self.allocator());
        info!(layout = name, components = layout.defs().len(), "layout created");
        self.layouts.push(layout);
        cmd
    }

    /// Destroy every widget of a layout and forget it
    pub fn remove_layout(&mut self, name: &str) -> Result<Cmd> {
        let pos = self
            .layouts
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| FlexingError::UnknownLayout(name.to_string()))?;
        let mut layout = self.layouts.remove(pos);
        Ok(layout.destroy(&mut self.bus))
    }

    /// Snapshot a layout for persistence
    pub fn get_layout_state(&self, name: &str) -> Result<LayoutConfig> {
        Ok(self.require(name)?.state())
    }

    /// Rebuild a layout from a saved state, keeping its widget definitions
    ///
    /// Widgets are not reopened here; the host reopens them and saved links
    /// restore as their ends come back.
    pub fn set_layout_state(&mut self, name: &str, config: LayoutConfig) -> Result<Cmd> {
        let defs = self.require(name)?.defs().to_vec();
        Ok(self.create_layout(name, config, defs))
    }

    pub fn registered_components(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .require(name)?
            .registered_components()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn links(&self, name: &str) -> Result<Vec<Link>> {
        Ok(self.require(name)?.links())
    }

    // ========================================================================
    // Widgets
    // ========================================================================

    /// Open a widget, generating an instance id when none is given
    pub fn open_widget(
        &mut self,
        layout: &str,
        component: &str,
        id: Option<WidgetId>,
    ) -> Result<(WidgetId, Cmd)> {
        let id = match id {
            Some(id) => id,
            None => self.generate_id(),
        };
        if self.layout_of(&id).is_some() {
            return Err(FlexingError::DuplicateWidget(id));
        }
        let (layout, bus) = self.parts(layout)?;
        let cmd = layout.open_widget(bus, component, id.clone())?;
        Ok((id, cmd))
    }

    fn generate_id(&mut self) -> WidgetId {
        loop {
            let id = WidgetId::generate(&mut self.rng);
            if self.layout_of(&id).is_none() && !self.bus.is_registered(&id) {
                return id;
            }
        }
    }

    /// Close a widget; closing one that is not open does nothing
    pub fn close_widget(&mut self, layout: &str, id: &WidgetId) -> Result<Cmd> {
        let (layout, bus) = self.parts(layout)?;
        Ok(layout.close_widget(bus, id))
    }

    /// Install the callback `id` runs for `event` and declare that it listens for it
    pub fn on(
        &mut self,
        layout: &str,
        id: &WidgetId,
        event: &str,
        callback: impl Fn(&Value, &WidgetId) + 'static,
    ) -> Result<()> {
        let (layout, bus) = self.parts(layout)?;
        let name = layout.name().to_string();
        let widget = layout
            .widget_mut(id)
            .ok_or_else(|| FlexingError::UnknownWidget {
                layout: name,
                widget: id.clone(),
            })?;
        widget.add_listen(event);
        bus.set_callback(id, event, callback);
        Ok(())
    }

    /// Ad-hoc subscription outside the link graph
    ///
    /// Returns `Ok(false)` if `source` does not emit `event` yet.
    pub fn subscribe(&mut self, listener: &WidgetId, event: &str, source: &WidgetId) -> Result<bool> {
        self.bus.subscribe(event, listener, source)
    }

    /// Emit a value on one of a widget's outputs
    pub fn emit(&self, id: &WidgetId, event: &str, value: Value) -> Result<()> {
        self.bus.emit(id, event, value)
    }

    /// Register an output created after the widget opened
    pub fn add_dynamic_event(
        &mut self,
        layout: &str,
        id: &WidgetId,
        event: &str,
        source: &Channel,
    ) -> Result<()> {
        let (layout, bus) = self.parts(layout)?;
        layout.add_dynamic_event(bus, id, event, source)
    }

    /// Add a widget to a group channel
    pub fn join_channel(&mut self, channel_id: &str, id: &WidgetId) -> Result<()> {
        if !self.bus.is_registered(id) {
            return Err(FlexingError::UnregisteredComponent(id.clone()));
        }
        self.bus.join_channel(channel_id, id);
        Ok(())
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Start the click-to-connect flow with `id` as the listener
    pub fn link(&mut self, layout: &str, id: &WidgetId) -> Result<Cmd> {
        let (layout, bus) = self.parts(layout)?;
        layout.start_linking(bus, id)
    }

    /// Link `initiator` to `target` directly, as an overlay click would
    pub fn finalize_linking(&mut self, layout: &str, target: &WidgetId, initiator: &WidgetId) -> Result<Cmd> {
        let (layout, bus) = self.parts(layout)?;
        Ok(layout.finalize_linking(bus, target, initiator))
    }

    pub fn cancel_linking(&mut self, layout: &str) -> Result<Cmd> {
        let (layout, _) = self.parts(layout)?;
        Ok(layout.cancel_linking())
    }

    pub fn unlink(&mut self, layout: &str, id: &WidgetId) -> Result<Cmd> {
        let (layout, bus) = self.parts(layout)?;
        layout.unlink(bus, id)
    }

    // ========================================================================
    // Tabs, actions, windows
    // ========================================================================

    pub fn popout(&self, layout: &str, id: &WidgetId) -> Result<Cmd> {
        self.require(layout)?.popout(id)
    }

    pub fn set_title(&mut self, layout: &str, id: &WidgetId, title: &str) -> Result<Cmd> {
        let (layout, _) = self.parts(layout)?;
        layout.set_title(id, title)
    }

    pub fn set_tab_actions(&mut self, layout: &str, id: &WidgetId, actions: Vec<ActionItem>) -> Result<Cmd> {
        let (layout, _) = self.parts(layout)?;
        layout.set_tab_actions(id, actions)
    }

    pub fn set_menu_actions(&mut self, layout: &str, id: &WidgetId, actions: Vec<ActionItem>) -> Result<Cmd> {
        let (layout, _) = self.parts(layout)?;
        layout.set_menu_actions(id, actions)
    }

    pub fn invoke_action(&self, layout: &str, id: &WidgetId, kind: ActionKind, index: usize) -> Result<bool> {
        self.require(layout)?.invoke_action(id, kind, index)
    }

    pub fn resize(&mut self, layout: &str, width: f32, height: f32) -> Result<()> {
        let (layout, _) = self.parts(layout)?;
        layout.resize_all(width, height);
        Ok(())
    }
}
