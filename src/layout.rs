//! A single docking layout: its widget definitions, live widgets, link graph
//! and linking session
//!
//! ## Architecture
//!
//! - Widgets are kept in open order; link snapshots list sources in that order
//! - `LinkTopology` is the only place source/listener edges and colours change
//! - `LinkSession` holds the click-to-connect state; closing a widget that
//!   takes part in it cancels the session
//! - Links from a saved config are restored lazily, as soon as both ends of an
//!   edge are open, since the docking engine mounts widgets in no fixed order
//!
//! The event bus is shared between layouts and passed in by the owning model.
//! Every operation returns the [`Cmd`] the renderer has to apply.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::commands::{action_views, Cmd};
use crate::config::LayoutConfig;
use crate::error::{FlexingError, Result};
use crate::link::{Affordance, ColorAllocator, Link, LinkColor, LinkSession, LinkTopology, Unlinked};
use crate::widget::{matching_events, ActionItem, ActionKind, Widget, WidgetDef, WidgetId};

pub struct Layout {
    name: String,
    config: LayoutConfig,
    defs: Vec<WidgetDef>,
    /// Live widgets in open order
    widgets: Vec<Widget>,
    topology: LinkTopology,
    session: LinkSession,
    colors: ColorAllocator,
    /// Saved links whose ends are not all open yet
    pending_links: Vec<Link>,
}

impl Layout {
    pub fn new(
        name: impl Into<String>,
        config: LayoutConfig,
        defs: Vec<WidgetDef>,
        colors: ColorAllocator,
    ) -> Self {
        let name = name.into();
        for issue in config.validate_links() {
            warn!(layout = %name, "saved link problem: {}", issue);
        }
        Self {
            pending_links: config.links.clone(),
            name,
            config,
            defs,
            widgets: Vec::new(),
            topology: LinkTopology::new(),
            session: LinkSession::new(),
            colors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn defs(&self) -> &[WidgetDef] {
        &self.defs
    }

    /// Component names of every registered definition
    pub fn registered_components(&self) -> Vec<&str> {
        self.defs
            .iter()
            .map(|def| def.component_name.as_str())
            .collect()
    }

    pub fn def(&self, component: &str) -> Option<&WidgetDef> {
        self.defs.iter().find(|def| def.component_name == component)
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id() == id)
    }

    pub fn widget_mut(&mut self, id: &WidgetId) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id() == id)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.widget(id).is_some()
    }

    pub fn topology(&self) -> &LinkTopology {
        &self.topology
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    pub fn is_linking(&self) -> bool {
        self.session.is_linking()
    }

    pub fn source_of(&self, listener: &WidgetId) -> Option<&WidgetId> {
        self.topology.source_of(listener)
    }

    pub fn subscribers_of(&self, source: &WidgetId) -> &[WidgetId] {
        self.topology.subscribers_of(source)
    }

    pub fn color_of(&self, source: &WidgetId) -> Option<LinkColor> {
        self.topology.color_of(source)
    }

    /// Saved links still waiting for one of their ends to open
    pub fn pending_links(&self) -> &[Link] {
        &self.pending_links
    }

    fn require(&self, id: &WidgetId) -> Result<&Widget> {
        self.widget(id).ok_or_else(|| self.unknown(id))
    }

    fn require_mut(&mut self, id: &WidgetId) -> Result<&mut Widget> {
        let layout = self.name.clone();
        self.widget_mut(id).ok_or(FlexingError::UnknownWidget {
            layout,
            widget: id.clone(),
        })
    }

    fn unknown(&self, id: &WidgetId) -> FlexingError {
        FlexingError::UnknownWidget {
            layout: self.name.clone(),
            widget: id.clone(),
        }
    }

    // ========================================================================
    // Widget lifecycle
    // ========================================================================

    /// Instantiate `component` as widget `id` and wire it into the bus
    ///
    /// Persisted component state is applied after the definition's initial
    /// state. Self listeners are subscribed to the widget's own outputs, then
    /// any saved link that can now be completed is restored.
    pub fn open_widget(&mut self, bus: &mut EventBus, component: &str, id: WidgetId) -> Result<Cmd> {
        let def = self
            .def(component)
            .cloned()
            .ok_or_else(|| FlexingError::UnknownComponent {
                layout: self.name.clone(),
                component: component.to_string(),
            })?;
        if self.contains(&id) || bus.is_registered(&id) {
            return Err(FlexingError::DuplicateWidget(id));
        }

        let mut widget = Widget::new(&def, id.clone(), &self.name);
        if let Some(state) = self.config.component_state.get(&id) {
            widget.set_state(state);
        }
        bus.register_component(&id, widget.component().outputs())?;

        for (event, callback) in &def.listeners {
            bus.set_callback_rc(&id, event, callback.clone());
        }
        for (event, callback) in &def.self_listeners {
            bus.set_callback_rc(&id, event, callback.clone());
            if !bus.subscribe(event, &id, &id)? {
                debug!(widget = %id, event = %event, "self listener has no matching output yet");
            }
        }

        info!(layout = %self.name, widget = %id, component, "widget opened");
        self.widgets.push(widget);

        let mut cmds = self.tab_decorations(&id);
        cmds.extend(self.restore_pending_links(bus));
        Ok(Cmd::batch(cmds))
    }

    /// Close a widget and release everything it holds
    ///
    /// Cancels a linking session the widget takes part in, orphans its
    /// listeners and frees its colour. Closing an unknown id does nothing.
    pub fn close_widget(&mut self, bus: &mut EventBus, id: &WidgetId) -> Cmd {
        let mut cmds = Vec::new();
        if self.session.involves(id) {
            debug!(layout = %self.name, widget = %id, "closing widget cancels linking");
            cmds.push(self.cancel_linking());
        }

        let Some(pos) = self.widgets.iter().position(|w| w.id() == id) else {
            return Cmd::batch(cmds);
        };

        let detached = self.topology.detach(bus, id);
        if let Some(upstream) = &detached.upstream {
            if upstream.color_released {
                cmds.push(Cmd::RemoveSourceIcon {
                    layout: self.name.clone(),
                    widget: upstream.source.clone(),
                });
            }
        }
        for listener in &detached.orphaned {
            cmds.push(Cmd::RemoveListenerIcon {
                layout: self.name.clone(),
                widget: listener.clone(),
            });
        }

        bus.unregister_component(id);
        let mut widget = self.widgets.remove(pos);
        widget.dispose();
        self.forget_pending(id);
        self.config.component_state.remove(id);
        info!(layout = %self.name, widget = %id, "widget closed");
        Cmd::batch(cmds)
    }

    /// Close every widget and reset the linking state
    pub fn destroy(&mut self, bus: &mut EventBus) -> Cmd {
        let mut cmds = vec![self.cancel_linking()];
        let ids: Vec<WidgetId> = self.widgets.iter().map(|w| w.id().clone()).collect();
        for id in &ids {
            cmds.push(self.close_widget(bus, id));
        }
        self.topology.clear();
        self.pending_links.clear();
        info!(layout = %self.name, widgets = ids.len(), "layout destroyed");
        Cmd::batch(cmds)
    }

    /// Register an output added after the widget opened
    pub fn add_dynamic_event(
        &mut self,
        bus: &mut EventBus,
        id: &WidgetId,
        event: &str,
        source: &crate::relay::Channel,
    ) -> Result<()> {
        self.require(id)?;
        bus.register_event(id, event, source)?;
        debug!(layout = %self.name, widget = %id, event, "dynamic event added");
        Ok(())
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Enter linking mode for `initiator` and offer an overlay over every
    /// widget it could listen to
    ///
    /// A widget that already feeds listeners gets no overlays. Candidates
    /// must emit an event the initiator listens for and have no source of
    /// their own.
    pub fn start_linking(&mut self, bus: &EventBus, initiator: &WidgetId) -> Result<Cmd> {
        let listens = self.require(initiator)?.listens().to_vec();
        let mut cmds = vec![self.remove_affordances()];
        self.session.begin(initiator);

        if self.topology.has_subscribers(initiator) {
            debug!(layout = %self.name, %initiator, "initiator is a source, no overlays offered");
            return Ok(Cmd::batch(cmds));
        }

        let candidates: Vec<WidgetId> = self
            .widgets
            .iter()
            .map(Widget::id)
            .filter(|id| *id != initiator)
            .filter(|id| self.topology.source_of(id).is_none())
            .filter(|id| !matching_events(&listens, &bus.events(id)).is_empty())
            .cloned()
            .collect();

        debug!(layout = %self.name, %initiator, candidates = candidates.len(), "linking started");
        for target in candidates {
            let affordance = Affordance {
                layout: self.name.clone(),
                target,
                initiator: initiator.clone(),
            };
            self.session.offer(affordance.clone());
            cmds.push(Cmd::CreateAffordance(affordance));
        }
        Ok(Cmd::batch(cmds))
    }

    /// Link `initiator` to `target` and leave linking mode
    ///
    /// Either widget having closed in the meantime, or a widget asking to
    /// listen to itself, cancels the session without touching the link graph.
    pub fn finalize_linking(&mut self, bus: &mut EventBus, target: &WidgetId, initiator: &WidgetId) -> Cmd {
        if target == initiator || !self.contains(target) || !self.contains(initiator) {
            warn!(layout = %self.name, %target, %initiator, "stale link request, cancelling");
            return self.cancel_linking();
        }
        let mut cmds = vec![self.remove_affordances()];
        self.session.clear();
        self.drop_pending_subscriber(initiator);
        cmds.extend(self.link_edge(bus, target, initiator));
        info!(layout = %self.name, source = %target, listener = %initiator, "link finalized");
        Cmd::batch(cmds)
    }

    /// Overlay click from the renderer; ignored unless the overlay belongs
    /// to the running session
    pub fn affordance_clicked(&mut self, bus: &mut EventBus, target: &WidgetId, initiator: &WidgetId) -> Cmd {
        if !self.session.is_offered(target, initiator) {
            warn!(layout = %self.name, %target, %initiator, "click on an overlay that is no longer offered");
            return Cmd::None;
        }
        self.finalize_linking(bus, target, initiator)
    }

    /// Leave linking mode and remove every overlay
    pub fn cancel_linking(&mut self) -> Cmd {
        if self.session.clear() {
            debug!(layout = %self.name, "linking cancelled");
        }
        self.remove_affordances()
    }

    /// Remove `listener`'s link to its source; no-op if it has none
    pub fn unlink(&mut self, bus: &mut EventBus, listener: &WidgetId) -> Result<Cmd> {
        self.require(listener)?;
        Ok(match self.topology.unlink(bus, listener) {
            Some(unlinked) => Cmd::batch(self.unlinked_cmds(&unlinked)),
            None => Cmd::None,
        })
    }

    /// A tab was activated: restart a running linking session so overlays
    /// follow the visible widgets, then redraw the tab's decorations
    pub fn tab_activated(&mut self, bus: &EventBus, id: &WidgetId) -> Cmd {
        let mut cmds = Vec::new();
        if let Some(initiator) = self.session.initiator().cloned() {
            match self.start_linking(bus, &initiator) {
                Ok(cmd) => cmds.push(cmd),
                Err(e) => {
                    warn!(layout = %self.name, "linking restart failed: {}", e);
                    cmds.push(self.cancel_linking());
                }
            }
        }
        if self.contains(id) {
            cmds.push(Cmd::RemoveListenerIcon {
                layout: self.name.clone(),
                widget: id.clone(),
            });
            cmds.push(Cmd::RemoveSourceIcon {
                layout: self.name.clone(),
                widget: id.clone(),
            });
            cmds.push(Cmd::RemoveTabActions {
                layout: self.name.clone(),
                widget: id.clone(),
            });
            cmds.extend(self.tab_decorations(id));
        }
        Cmd::batch(cmds)
    }

    /// Saved-link records for every source with listeners, in open order
    pub fn links(&self) -> Vec<Link> {
        self.topology.links(self.widgets.iter().map(Widget::id))
    }

    fn link_edge(&mut self, bus: &mut EventBus, source: &WidgetId, listener: &WidgetId) -> Vec<Cmd> {
        let listens = self
            .widget(listener)
            .map(|w| w.listens().to_vec())
            .unwrap_or_default();

        let joined = self.topology.join(bus, source, listener, &listens);
        let mut cmds = joined
            .replaced
            .as_ref()
            .map(|unlinked| self.unlinked_cmds(unlinked))
            .unwrap_or_default();
        if joined.events.is_empty() {
            debug!(layout = %self.name, %source, %listener, "link has no matching events");
        }

        let (color, _) = self.topology.color_for(source, &mut self.colors);
        cmds.push(Cmd::SetSourceIcon {
            layout: self.name.clone(),
            widget: source.clone(),
            color,
        });
        cmds.push(Cmd::SetListenerIcon {
            layout: self.name.clone(),
            widget: listener.clone(),
            color,
        });
        cmds
    }

    fn unlinked_cmds(&self, unlinked: &Unlinked) -> Vec<Cmd> {
        let mut cmds = vec![Cmd::RemoveListenerIcon {
            layout: self.name.clone(),
            widget: unlinked.listener.clone(),
        }];
        if unlinked.color_released {
            cmds.push(Cmd::RemoveSourceIcon {
                layout: self.name.clone(),
                widget: unlinked.source.clone(),
            });
        }
        cmds
    }

    fn remove_affordances(&self) -> Cmd {
        Cmd::RemoveAffordances {
            layout: self.name.clone(),
        }
    }

    /// Icons and tab actions a widget's tab should show right now
    fn tab_decorations(&self, id: &WidgetId) -> Vec<Cmd> {
        let Some(widget) = self.widget(id) else {
            return Vec::new();
        };
        let mut cmds = Vec::new();
        if let Some(color) = self.topology.color_of(id) {
            cmds.push(Cmd::SetSourceIcon {
                layout: self.name.clone(),
                widget: id.clone(),
                color,
            });
        }
        if let Some(color) = self
            .topology
            .source_of(id)
            .and_then(|source| self.topology.color_of(source))
        {
            cmds.push(Cmd::SetListenerIcon {
                layout: self.name.clone(),
                widget: id.clone(),
                color,
            });
        }
        if !widget.tab_actions().is_empty() {
            cmds.push(Cmd::SetTabActions {
                layout: self.name.clone(),
                widget: id.clone(),
                actions: action_views(widget.tab_actions()),
            });
        }
        cmds
    }

    /// Restore every saved edge whose ends are both open
    fn restore_pending_links(&mut self, bus: &mut EventBus) -> Vec<Cmd> {
        let mut cmds = Vec::new();
        let pending = std::mem::take(&mut self.pending_links);
        for mut link in pending {
            if self.contains(&link.source) {
                let (ready, waiting): (Vec<WidgetId>, Vec<WidgetId>) = link
                    .subscribers
                    .iter()
                    .filter(|sub| **sub != link.source)
                    .cloned()
                    .partition(|sub| self.contains(sub));
                if !ready.is_empty() {
                    self.topology.restore_color(&link.source, link.color);
                }
                for listener in &ready {
                    debug!(layout = %self.name, source = %link.source, %listener, "restoring saved link");
                    cmds.extend(self.link_edge(bus, &link.source, listener));
                }
                link.subscribers = waiting;
            }
            if !link.subscribers.is_empty() {
                self.pending_links.push(link);
            }
        }
        cmds
    }

    /// A listener linked by hand no longer waits for its saved source
    fn drop_pending_subscriber(&mut self, id: &WidgetId) {
        self.pending_links.retain_mut(|link| {
            link.subscribers.retain(|sub| sub != id);
            !link.subscribers.is_empty()
        });
    }

    /// Drop a closed widget from the saved links still waiting to restore
    fn forget_pending(&mut self, id: &WidgetId) {
        self.pending_links.retain_mut(|link| {
            link.subscribers.retain(|sub| sub != id);
            &link.source != id && !link.subscribers.is_empty()
        });
    }

    // ========================================================================
    // Widget API
    // ========================================================================

    pub fn set_title(&mut self, id: &WidgetId, title: impl Into<String>) -> Result<Cmd> {
        let layout = self.name.clone();
        let widget = self.require_mut(id)?;
        widget.set_title(title);
        Ok(Cmd::SetTitle {
            layout,
            widget: id.clone(),
            title: widget.title().to_string(),
        })
    }

    pub fn set_tab_actions(&mut self, id: &WidgetId, actions: Vec<ActionItem>) -> Result<Cmd> {
        let layout = self.name.clone();
        let widget = self.require_mut(id)?;
        widget.set_tab_actions(actions);
        Ok(Cmd::SetTabActions {
            layout,
            widget: id.clone(),
            actions: action_views(widget.tab_actions()),
        })
    }

    pub fn set_menu_actions(&mut self, id: &WidgetId, actions: Vec<ActionItem>) -> Result<Cmd> {
        let layout = self.name.clone();
        let widget = self.require_mut(id)?;
        widget.set_menu_actions(actions);
        Ok(Cmd::SetMenuActions {
            layout,
            widget: id.clone(),
            actions: action_views(widget.menu_actions()),
        })
    }

    /// Run the action at `index`; returns false if there is none
    pub fn invoke_action(&self, id: &WidgetId, kind: ActionKind, index: usize) -> Result<bool> {
        let widget = self.require(id)?;
        let actions = match kind {
            ActionKind::Tab => widget.tab_actions(),
            ActionKind::Menu => widget.menu_actions(),
        };
        let Some(item) = actions.get(index) else {
            warn!(layout = %self.name, widget = %id, ?kind, index, "no such action");
            return Ok(false);
        };
        debug!(layout = %self.name, widget = %id, label = %item.label, "action invoked");
        (item.action)(id);
        Ok(true)
    }

    pub fn popout(&self, id: &WidgetId) -> Result<Cmd> {
        let widget = self.require(id)?;
        Ok(Cmd::Popout {
            layout: self.name.clone(),
            widget: id.clone(),
            window_params: widget.window_params(),
        })
    }

    /// Notify every widget of the layout that it was resized
    pub fn resize_all(&mut self, width: f32, height: f32) {
        for widget in &mut self.widgets {
            widget.on_resize(width, height);
        }
    }

    /// Snapshot for persistence
    ///
    /// Live widgets report their current state and links. Saved state and
    /// links of widgets that have not been reopened yet are carried over,
    /// so a snapshot taken before every widget is back loses nothing.
    pub fn state(&self) -> LayoutConfig {
        let mut config = self.config.clone();
        for widget in &self.widgets {
            config
                .component_state
                .insert(widget.id().clone(), widget.state());
        }

        let mut links = self.links();
        for pending in &self.pending_links {
            match links.iter_mut().find(|link| link.source == pending.source) {
                Some(live) => {
                    for sub in &pending.subscribers {
                        if !live.subscribers.contains(sub) {
                            live.subscribers.push(sub.clone());
                        }
                    }
                }
                None => links.push(pending.clone()),
            }
        }
        config.links = links;
        config
    }

    /// State of one widget
    pub fn widget_state(&self, id: &WidgetId) -> Result<Value> {
        Ok(self.require(id)?.state())
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout")
            .field("name", &self.name)
            .field("widgets", &self.widgets)
            .field("topology", &self.topology)
            .field("session", &self.session)
            .field("pending_links", &self.pending_links)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Channel;
    use serde_json::json;

    struct Emitter {
        out: Channel,
    }

    impl crate::widget::Component for Emitter {
        fn outputs(&self) -> Vec<(String, Channel)> {
            vec![("data".to_string(), self.out.clone())]
        }
    }

    struct Quiet;

    impl crate::widget::Component for Quiet {
        fn outputs(&self) -> Vec<(String, Channel)> {
            Vec::new()
        }
    }

    fn defs() -> Vec<WidgetDef> {
        vec![
            WidgetDef::new("emitter", || Emitter { out: Channel::new() }),
            WidgetDef::new("viewer", || Quiet).with_listener("data", |_, _| {}),
        ]
    }

    fn layout() -> Layout {
        Layout::new("main", LayoutConfig::default(), defs(), ColorAllocator::seeded(11))
    }

    fn id(s: &str) -> WidgetId {
        WidgetId::new(s)
    }

    #[test]
    fn test_open_unknown_component_fails() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        let err = layout.open_widget(&mut bus, "nope", id("x")).unwrap_err();
        assert!(matches!(err, FlexingError::UnknownComponent { .. }));
    }

    #[test]
    fn test_open_duplicate_id_fails() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        layout.open_widget(&mut bus, "emitter", id("a")).unwrap();
        let err = layout.open_widget(&mut bus, "viewer", id("a")).unwrap_err();
        assert!(matches!(err, FlexingError::DuplicateWidget(_)));
    }

    #[test]
    fn test_start_linking_offers_only_matching_sources() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        layout.open_widget(&mut bus, "emitter", id("a")).unwrap();
        layout.open_widget(&mut bus, "viewer", id("b")).unwrap();
        layout.open_widget(&mut bus, "viewer", id("c")).unwrap();

        let cmds = layout.start_linking(&bus, &id("b")).unwrap().flatten();
        assert_eq!(
            cmds,
            vec![
                Cmd::RemoveAffordances {
                    layout: "main".to_string()
                },
                Cmd::CreateAffordance(Affordance {
                    layout: "main".to_string(),
                    target: id("a"),
                    initiator: id("b"),
                }),
            ]
        );
        assert!(layout.is_linking());
    }

    #[test]
    fn test_source_gets_no_overlays() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        layout.open_widget(&mut bus, "emitter", id("a")).unwrap();
        layout.open_widget(&mut bus, "viewer", id("b")).unwrap();
        layout.start_linking(&bus, &id("b")).unwrap();
        layout.finalize_linking(&mut bus, &id("a"), &id("b"));

        let cmds = layout.start_linking(&bus, &id("a")).unwrap().flatten();
        assert!(cmds
            .iter()
            .all(|c| !matches!(c, Cmd::CreateAffordance(_))));
        assert!(layout.is_linking());
    }

    #[test]
    fn test_close_initiator_cancels_session() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        layout.open_widget(&mut bus, "emitter", id("a")).unwrap();
        layout.open_widget(&mut bus, "viewer", id("b")).unwrap();
        layout.start_linking(&bus, &id("b")).unwrap();

        layout.close_widget(&mut bus, &id("b"));
        assert!(!layout.is_linking());
        assert!(layout.session().affordances().is_empty());
        assert_eq!(layout.affordance_clicked(&mut bus, &id("a"), &id("b")), Cmd::None);
    }

    #[test]
    fn test_state_snapshot_includes_component_state() {
        let mut bus = EventBus::new();
        let mut layout = layout();
        layout.open_widget(&mut bus, "viewer", id("b")).unwrap();
        let state = layout.state();
        assert_eq!(state.component_state.get(&id("b")), Some(&json!({})));
        assert!(state.links.is_empty());
    }
}
