//! Per-widget registry of named relay channels
//!
//! Each registered widget owns an ordered list of relay entries. An entry
//! pairs the replay channel that listeners subscribe to with the forwarding
//! subscription that feeds it from the widget's own output channel.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use super::channel::{Channel, Subscription};
use crate::error::{FlexingError, Result};
use crate::widget::WidgetId;

struct RelayEntry {
    event: String,
    channel: Channel,
    /// Forwards the source channel into `channel`; dropping it detaches the bridge
    _forward: Subscription,
}

impl RelayEntry {
    fn teardown(self) {
        self.channel.close();
    }
}

/// `instanceId -> (eventName -> replay channel)`
#[derive(Default)]
pub struct EventRelay {
    entries: HashMap<WidgetId, Vec<RelayEntry>>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty event map for a widget
    ///
    /// Registering an id that is already present discards its previous
    /// channels; callers are expected to unregister first.
    pub fn register(&mut self, id: &WidgetId) {
        if let Some(previous) = self.entries.insert(id.clone(), Vec::new()) {
            tracing::warn!(widget = %id, events = previous.len(), "re-registered live widget, discarding relay channels");
            previous.into_iter().for_each(RelayEntry::teardown);
        } else {
            debug!(widget = %id, "relay registered");
        }
    }

    /// Create a replay channel for `event` fed by `source`
    ///
    /// Re-registering an event replaces its channel; listeners of the old
    /// channel stop receiving values.
    pub fn register_event(&mut self, id: &WidgetId, event: &str, source: &Channel) -> Result<()> {
        let entries = self
            .entries
            .get_mut(id)
            .ok_or_else(|| FlexingError::UnregisteredComponent(id.clone()))?;

        let channel = Channel::replay();
        let forward = {
            let relay = channel.clone();
            source.subscribe(move |value| relay.emit(value.clone()))
        };
        let entry = RelayEntry {
            event: event.to_string(),
            channel,
            _forward: forward,
        };

        if let Some(pos) = entries.iter().position(|e| e.event == event) {
            let previous = std::mem::replace(&mut entries[pos], entry);
            previous.teardown();
            debug!(widget = %id, event, "relay event replaced");
        } else {
            entries.push(entry);
            debug!(widget = %id, event, "relay event registered");
        }
        Ok(())
    }

    /// Push a value straight into a widget's relay channel
    pub fn emit(&self, id: &WidgetId, event: &str, value: Value) -> Result<()> {
        let channel = self
            .channel(id, event)
            .ok_or_else(|| FlexingError::UnregisteredEvent {
                widget: id.clone(),
                event: event.to_string(),
            })?;
        trace!(widget = %id, event, "relay emit");
        channel.emit(value);
        Ok(())
    }

    /// Dispose every channel and forwarding bridge of a widget
    ///
    /// Returns false (and does nothing) if the widget was not registered.
    pub fn unregister(&mut self, id: &WidgetId) -> bool {
        match self.entries.remove(id) {
            Some(entries) => {
                entries.into_iter().for_each(RelayEntry::teardown);
                debug!(widget = %id, "relay unregistered");
                true
            }
            None => false,
        }
    }

    /// Event names registered for a widget, in registration order
    pub fn events(&self, id: &WidgetId) -> Vec<String> {
        self.entries
            .get(id)
            .map(|entries| entries.iter().map(|e| e.event.clone()).collect())
            .unwrap_or_default()
    }

    pub fn channel(&self, id: &WidgetId, event: &str) -> Option<&Channel> {
        self.entries
            .get(id)?
            .iter()
            .find(|e| e.event == event)
            .map(|e| &e.channel)
    }

    pub fn is_registered(&self, id: &WidgetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn has_event(&self, id: &WidgetId, event: &str) -> bool {
        self.channel(id, event).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (id, entries) in &self.entries {
            let names: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
            map.entry(id, &names);
        }
        map.finish()
    }
}
