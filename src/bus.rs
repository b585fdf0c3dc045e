//! Event bus - routes named events from source widgets to listener callbacks
//!
//! The bus owns three registries keyed by widget id:
//!
//! - the [`EventRelay`] with every widget's replaying output channels
//! - listener callbacks, `listener -> event -> callback`
//! - live subscriptions, `listener -> event -> Subscription`
//!
//! Callbacks are looked up when a value is delivered, not when the
//! subscription is made, so replacing a callback takes effect on the next
//! value without re-subscribing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{FlexingError, Result};
use crate::relay::{Channel, EventRelay, Subscription};
use crate::widget::{Callback, WidgetId};

type CallbackMap = HashMap<String, Callback>;
type CallbackRegistry = Rc<RefCell<HashMap<WidgetId, CallbackMap>>>;

/// Publish/subscribe hub shared by every layout of a model
#[derive(Default)]
pub struct EventBus {
    relay: EventRelay,
    callbacks: CallbackRegistry,
    subscriptions: HashMap<WidgetId, HashMap<String, Subscription>>,
    /// Group channels: `channelId -> members`, in join order
    channels: HashMap<String, Vec<WidgetId>>,
    channel_membership: HashMap<WidgetId, String>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relay(&self) -> &EventRelay {
        &self.relay
    }

    /// Register a widget and bridge its declared outputs into the relay
    pub fn register_component(
        &mut self,
        id: &WidgetId,
        outputs: impl IntoIterator<Item = (String, Channel)>,
    ) -> Result<()> {
        self.relay.register(id);
        self.callbacks.borrow_mut().entry(id.clone()).or_default();
        self.subscriptions.entry(id.clone()).or_default();
        for (event, source) in outputs {
            self.relay.register_event(id, &event, &source)?;
        }
        debug!(widget = %id, events = ?self.relay.events(id), "component registered");
        Ok(())
    }

    /// Register one more output channel for an already registered widget
    pub fn register_event(&mut self, id: &WidgetId, event: &str, source: &Channel) -> Result<()> {
        self.relay.register_event(id, event, source)
    }

    /// Tear down everything the bus holds for a widget
    ///
    /// Disposes its relay channels, its own subscriptions and callbacks, and
    /// drops it from any group channel. Other listeners' handles to the
    /// closed channels are pruned. Calling this twice is a no-op.
    pub fn unregister_component(&mut self, id: &WidgetId) {
        let was_registered = self.relay.unregister(id);
        self.unsubscribe_all(id);
        self.subscriptions.remove(id);
        if was_registered {
            for (listener, subs) in self.subscriptions.iter_mut() {
                let before = subs.len();
                subs.retain(|_, sub| sub.is_active());
                if subs.len() != before {
                    trace!(%listener, source = %id, pruned = before - subs.len(), "dropped dead subscriptions");
                }
            }
        }
        self.callbacks.borrow_mut().remove(id);
        if let Some(channel_id) = self.channel_membership.remove(id) {
            if let Some(members) = self.channels.get_mut(&channel_id) {
                members.retain(|member| member != id);
            }
        }
        if was_registered {
            debug!(widget = %id, "component unregistered");
        }
    }

    pub fn is_registered(&self, id: &WidgetId) -> bool {
        self.relay.is_registered(id)
    }

    /// Emit a value on a widget's relay channel
    pub fn emit(&self, id: &WidgetId, event: &str, value: Value) -> Result<()> {
        self.relay.emit(id, event, value)
    }

    /// Events a widget currently emits
    pub fn events(&self, id: &WidgetId) -> Vec<String> {
        self.relay.events(id)
    }

    /// Install or replace the callback a listener runs for an event
    pub fn set_callback(
        &mut self,
        listener: &WidgetId,
        event: &str,
        callback: impl Fn(&Value, &WidgetId) + 'static,
    ) {
        self.set_callback_rc(listener, event, Rc::new(callback));
    }

    pub(crate) fn set_callback_rc(&mut self, listener: &WidgetId, event: &str, callback: Callback) {
        self.callbacks
            .borrow_mut()
            .entry(listener.clone())
            .or_default()
            .insert(event.to_string(), callback);
    }

    pub fn has_callback(&self, listener: &WidgetId, event: &str) -> bool {
        self.callbacks
            .borrow()
            .get(listener)
            .is_some_and(|map| map.contains_key(event))
    }

    /// Subscribe `listener` to `source`'s `event`
    ///
    /// Returns `Ok(false)` without doing anything if the source has not
    /// registered the event yet. A listener without a callback for the event
    /// is a wiring bug and fails. Any previous subscription for the same
    /// (listener, event) pair is disposed before the new one is stored.
    pub fn subscribe(&mut self, event: &str, listener: &WidgetId, source: &WidgetId) -> Result<bool> {
        let Some(channel) = self.relay.channel(source, event).cloned() else {
            trace!(%listener, %source, event, "source not ready, subscribe skipped");
            return Ok(false);
        };
        if !self.has_callback(listener, event) {
            return Err(FlexingError::MissingCallback {
                listener: listener.clone(),
                event: event.to_string(),
            });
        }

        let slot = self.subscriptions.entry(listener.clone()).or_default();
        if let Some(previous) = slot.remove(event) {
            previous.dispose();
        }

        let subscription = channel.subscribe(deliver(
            Rc::downgrade(&self.callbacks),
            listener.clone(),
            event.to_string(),
        ));
        self.subscriptions
            .entry(listener.clone())
            .or_default()
            .insert(event.to_string(), subscription);
        debug!(%listener, %source, event, "subscribed");
        Ok(true)
    }

    /// Subscribe `listener` to every event `source` emits right now
    ///
    /// Events the listener has no callback for are skipped. Events the
    /// source registers later are not picked up. Returns the number of
    /// subscriptions made.
    pub fn subscribe_all(&mut self, listener: &WidgetId, source: &WidgetId) -> usize {
        let mut count = 0;
        for event in self.relay.events(source) {
            match self.subscribe(&event, listener, source) {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => trace!(%listener, %source, "skipped: {}", e),
            }
        }
        count
    }

    /// Dispose one subscription; fails if there is none for the pair
    pub fn unsubscribe(&mut self, listener: &WidgetId, event: &str) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(listener)
            .and_then(|subs| subs.remove(event))
            .ok_or_else(|| FlexingError::NoSubscription {
                listener: listener.clone(),
                event: event.to_string(),
            })?;
        subscription.dispose();
        debug!(%listener, event, "unsubscribed");
        Ok(())
    }

    /// Dispose every subscription a listener holds
    pub fn unsubscribe_all(&mut self, listener: &WidgetId) {
        if let Some(subs) = self.subscriptions.get_mut(listener) {
            if !subs.is_empty() {
                debug!(%listener, count = subs.len(), "unsubscribing all");
            }
            subs.clear();
        }
    }

    /// Event names a listener is currently subscribed to (sorted)
    pub fn subscriptions(&self, listener: &WidgetId) -> Vec<String> {
        let mut events: Vec<String> = self
            .subscriptions
            .get(listener)
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        events.sort();
        events
    }

    pub fn is_subscribed(&self, listener: &WidgetId, event: &str) -> bool {
        self.subscriptions
            .get(listener)
            .and_then(|subs| subs.get(event))
            .is_some_and(Subscription::is_active)
    }

    /// Add a widget to a group channel
    ///
    /// The newcomer subscribes to every current member and every member
    /// subscribes to the newcomer. Membership is append-only.
    pub fn join_channel(&mut self, channel_id: &str, id: &WidgetId) {
        let members = self.channels.get(channel_id).cloned().unwrap_or_default();
        for member in &members {
            self.subscribe_all(member, id);
            self.subscribe_all(id, member);
        }
        self.channels
            .entry(channel_id.to_string())
            .or_default()
            .push(id.clone());
        self.channel_membership
            .insert(id.clone(), channel_id.to_string());
        debug!(widget = %id, channel = channel_id, members = members.len(), "joined channel");
    }

    pub fn channel_members(&self, channel_id: &str) -> &[WidgetId] {
        self.channels
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn channel_of(&self, id: &WidgetId) -> Option<&str> {
        self.channel_membership.get(id).map(String::as_str)
    }
}

/// Sink that forwards a relay value to the listener's current callback
fn deliver(
    callbacks: Weak<RefCell<HashMap<WidgetId, CallbackMap>>>,
    listener: WidgetId,
    event: String,
) -> impl Fn(&Value) + 'static {
    move |value| {
        let Some(callbacks) = callbacks.upgrade() else {
            return;
        };
        let callback = callbacks
            .borrow()
            .get(&listener)
            .and_then(|map| map.get(&event))
            .cloned();
        match callback {
            Some(callback) => {
                trace!(%listener, event = %event, "deliver");
                callback(value, &listener);
            }
            None => warn!(%listener, event = %event, "no callback for delivered event"),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("relay", &self.relay)
            .field("subscriptions", &self.subscriptions.len())
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> WidgetId {
        WidgetId::new(s)
    }

    fn recording(bus: &mut EventBus, listener: &str, event: &str) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.set_callback(&id(listener), event, move |v, _| sink.borrow_mut().push(v.clone()));
        seen
    }

    #[test]
    fn test_subscribe_unknown_source_is_noop() {
        let mut bus = EventBus::new();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        recording(&mut bus, "b", "data");
        assert!(!bus.subscribe("data", &id("b"), &id("a")).unwrap());
        assert!(bus.subscriptions(&id("b")).is_empty());
    }

    #[test]
    fn test_subscribe_without_callback_fails() {
        let mut bus = EventBus::new();
        let out = Channel::new();
        bus.register_component(&id("a"), vec![("data".to_string(), out)])
            .unwrap();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        let err = bus.subscribe("data", &id("b"), &id("a")).unwrap_err();
        assert!(matches!(err, FlexingError::MissingCallback { .. }));
    }

    #[test]
    fn test_resubscribe_disposes_previous_handle() {
        let mut bus = EventBus::new();
        let out = Channel::new();
        bus.register_component(&id("a"), vec![("data".to_string(), out.clone())])
            .unwrap();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        let seen = recording(&mut bus, "b", "data");

        assert!(bus.subscribe("data", &id("b"), &id("a")).unwrap());
        assert!(bus.subscribe("data", &id("b"), &id("a")).unwrap());
        assert_eq!(
            bus.relay().channel(&id("a"), "data").unwrap().subscriber_count(),
            1
        );

        out.emit(json!(1));
        assert_eq!(*seen.borrow(), vec![json!(1)]);
    }

    #[test]
    fn test_callback_replacement_applies_to_live_subscription() {
        let mut bus = EventBus::new();
        let out = Channel::new();
        bus.register_component(&id("a"), vec![("data".to_string(), out.clone())])
            .unwrap();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        let first = recording(&mut bus, "b", "data");
        bus.subscribe("data", &id("b"), &id("a")).unwrap();

        let second = recording(&mut bus, "b", "data");
        out.emit(json!("x"));
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec![json!("x")]);
    }

    #[test]
    fn test_unsubscribe_missing_pair_fails() {
        let mut bus = EventBus::new();
        let err = bus.unsubscribe(&id("b"), "data").unwrap_err();
        assert!(matches!(err, FlexingError::NoSubscription { .. }));
    }

    #[test]
    fn test_unsubscribe_all_without_subscriptions_is_noop() {
        let mut bus = EventBus::new();
        bus.unsubscribe_all(&id("nobody"));
        bus.register_component(&id("b"), Vec::new()).unwrap();
        bus.unsubscribe_all(&id("b"));
        assert!(bus.subscriptions(&id("b")).is_empty());
    }

    #[test]
    fn test_subscribe_all_is_a_snapshot() {
        let mut bus = EventBus::new();
        bus.register_component(
            &id("a"),
            vec![("one".to_string(), Channel::new()), ("two".to_string(), Channel::new())],
        )
        .unwrap();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        for event in ["one", "two", "three"] {
            recording(&mut bus, "b", event);
        }

        assert_eq!(bus.subscribe_all(&id("b"), &id("a")), 2);
        bus.register_event(&id("a"), "three", &Channel::new()).unwrap();
        assert_eq!(bus.subscriptions(&id("b")), vec!["one", "two"]);
    }

    #[test]
    fn test_join_channel_links_members_both_ways() {
        let mut bus = EventBus::new();
        let out_a = Channel::new();
        let out_b = Channel::new();
        bus.register_component(&id("a"), vec![("ping".to_string(), out_a.clone())])
            .unwrap();
        bus.register_component(&id("b"), vec![("ping".to_string(), out_b.clone())])
            .unwrap();
        let seen_a = recording(&mut bus, "a", "ping");
        let seen_b = recording(&mut bus, "b", "ping");

        bus.join_channel("team", &id("a"));
        bus.join_channel("team", &id("b"));
        assert_eq!(bus.channel_members("team"), [id("a"), id("b")]);

        out_a.emit(json!("from a"));
        out_b.emit(json!("from b"));
        assert_eq!(*seen_b.borrow(), vec![json!("from a")]);
        assert_eq!(*seen_a.borrow(), vec![json!("from b")]);
    }

    #[test]
    fn test_unregistering_source_prunes_listener_handles() {
        let mut bus = EventBus::new();
        bus.register_component(&id("a"), vec![("data".to_string(), Channel::new())])
            .unwrap();
        bus.register_component(&id("c"), vec![("tick".to_string(), Channel::new())])
            .unwrap();
        bus.register_component(&id("b"), Vec::new()).unwrap();
        recording(&mut bus, "b", "data");
        recording(&mut bus, "b", "tick");
        bus.subscribe("data", &id("b"), &id("a")).unwrap();
        bus.subscribe("tick", &id("b"), &id("c")).unwrap();

        bus.unregister_component(&id("a"));
        assert_eq!(bus.subscriptions(&id("b")), vec!["tick"]);
        assert!(!bus.is_subscribed(&id("b"), "data"));
        assert!(bus.is_subscribed(&id("b"), "tick"));
    }

    #[test]
    fn test_unregister_component_twice_is_noop() {
        let mut bus = EventBus::new();
        let out = Channel::new();
        bus.register_component(&id("a"), vec![("data".to_string(), out.clone())])
            .unwrap();
        bus.join_channel("team", &id("a"));

        bus.unregister_component(&id("a"));
        bus.unregister_component(&id("a"));
        assert!(!bus.is_registered(&id("a")));
        assert_eq!(out.subscriber_count(), 0);
        assert!(bus.channel_members("team").is_empty());
    }
}
