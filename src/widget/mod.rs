//! Widget system - hosted components inside a docking layout
//!
//! ## Architecture
//!
//! - `WidgetId`: opaque instance id assigned once per live widget
//! - `Component`: contract a hosted component fulfils (outputs, state, lifecycle)
//! - `WidgetDef`: registered definition a layout instantiates widgets from
//! - `Widget`: a live instance, owning its component and the event names it listens for
//!
//! Widgets never talk to the event bus directly; the owning layout wires them
//! up when they open and tears them down when they close.

mod def;
mod instance;

pub use def::{ActionItem, ActionKind, Callback, ComponentFactory, WidgetDef, WindowParams};
pub use instance::Widget;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::relay::Channel;

/// Length of generated instance ids
pub const INSTANCE_ID_LEN: usize = 13;

/// Opaque unique identifier of a live widget
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random lowercase base-36 id
    pub fn generate(rng: &mut impl Rng) -> Self {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let id = (0..INSTANCE_ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A component hosted inside a widget
///
/// Only `outputs` is required. The remaining hooks default to no-ops and an
/// empty object state.
pub trait Component {
    /// Declared output channels, bridged into the relay once when the widget opens
    fn outputs(&self) -> Vec<(String, Channel)>;

    /// Called after the widget id is assigned, before outputs are bridged
    fn init(&mut self, _id: &WidgetId) {}

    /// Serialisable state for layout persistence
    fn state(&self) -> Value {
        Value::Object(Map::new())
    }

    fn set_state(&mut self, _state: &Value) {}

    fn on_resize(&mut self, _width: f32, _height: f32) {}

    /// Called once when the widget closes
    fn dispose(&mut self) {}
}

/// Event names present in both `listens` and `emits`, in `listens` order
pub fn matching_events(listens: &[String], emits: &[String]) -> Vec<String> {
    listens
        .iter()
        .filter(|event| emits.contains(event))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generated_ids_are_base36() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = WidgetId::generate(&mut rng);
        assert_eq!(id.as_str().len(), INSTANCE_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(id, WidgetId::generate(&mut rng));
    }

    #[test]
    fn test_matching_events_exact_match() {
        let listens = names(&["update", "close"]);
        let emits = names(&["update", "resize"]);
        assert_eq!(matching_events(&listens, &emits), names(&["update"]));
    }

    #[test]
    fn test_matching_events_is_case_sensitive() {
        let listens = names(&["Update"]);
        let emits = names(&["update"]);
        assert!(matching_events(&listens, &emits).is_empty());
    }

    #[test]
    fn test_widget_id_serializes_as_plain_string() {
        let id = WidgetId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
    }
}
