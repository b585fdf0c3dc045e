//! Source/listener graph of one layout
//!
//! A listener has at most one source; a source may feed many listeners.
//! Every source with at least one listener owns a colour, released when
//! its last listener goes away. This type is the only mutator of those
//! relationships; it drives the event bus for the matching subscriptions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::color::{min_distance_for, ColorAllocator, LinkColor};
use crate::bus::EventBus;
use crate::widget::{matching_events, WidgetId};

/// Persisted shape of one source and its listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: WidgetId,
    pub color: LinkColor,
    #[serde(default)]
    pub subscribers: Vec<WidgetId>,
}

/// Result of removing a listener's upstream edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlinked {
    pub listener: WidgetId,
    pub source: WidgetId,
    /// The source lost its last listener and its colour was released
    pub color_released: bool,
}

/// Result of establishing an edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// Prior edge torn down to keep a single upstream
    pub replaced: Option<Unlinked>,
    /// Events actually subscribed
    pub events: Vec<String>,
}

/// Result of removing a widget from the graph entirely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detached {
    /// Edge from the widget to its own source, if it had one
    pub upstream: Option<Unlinked>,
    /// Listeners that lost this widget as their source
    pub orphaned: Vec<WidgetId>,
    /// The widget was a coloured source
    pub color_released: bool,
}

#[derive(Debug, Default)]
pub struct LinkTopology {
    /// listener -> source
    sources: HashMap<WidgetId, WidgetId>,
    /// source -> listeners, in link order
    subscribers: HashMap<WidgetId, Vec<WidgetId>>,
    colors: HashMap<WidgetId, LinkColor>,
}

impl LinkTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_of(&self, listener: &WidgetId) -> Option<&WidgetId> {
        self.sources.get(listener)
    }

    pub fn subscribers_of(&self, source: &WidgetId) -> &[WidgetId] {
        self.subscribers
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_subscribers(&self, source: &WidgetId) -> bool {
        !self.subscribers_of(source).is_empty()
    }

    pub fn color_of(&self, source: &WidgetId) -> Option<LinkColor> {
        self.colors.get(source).copied()
    }

    /// Every `(listener, source)` edge, in no particular order
    pub fn edges(&self) -> impl Iterator<Item = (&WidgetId, &WidgetId)> {
        self.sources.iter()
    }

    /// Every `(source, colour)` assignment, in no particular order
    pub fn colors(&self) -> impl Iterator<Item = (&WidgetId, LinkColor)> {
        self.colors.iter().map(|(source, color)| (source, *color))
    }

    /// Number of sources currently holding a colour
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    /// Link `listener` to `source`
    ///
    /// Any existing upstream of `listener` is unlinked first. Then one
    /// subscription is made per event that `listener` listens for and
    /// `source` emits. Joining the source a listener already has leaves the
    /// edge, its subscriptions and the source's colour as they are.
    pub fn join(
        &mut self,
        bus: &mut EventBus,
        source: &WidgetId,
        listener: &WidgetId,
        listens: &[String],
    ) -> Joined {
        if self.sources.get(listener) == Some(source) {
            trace!(%source, %listener, "already linked");
            return Joined {
                replaced: None,
                events: bus.subscriptions(listener),
            };
        }
        let replaced = self.unlink(bus, listener);

        let mut events = Vec::new();
        for event in matching_events(listens, &bus.events(source)) {
            match bus.subscribe(&event, listener, source) {
                Ok(true) => events.push(event),
                Ok(false) => {}
                Err(e) => warn!(%listener, %source, "link subscription failed: {}", e),
            }
        }

        self.sources.insert(listener.clone(), source.clone());
        let subs = self.subscribers.entry(source.clone()).or_default();
        if !subs.contains(listener) {
            subs.push(listener.clone());
        }
        debug!(%source, %listener, ?events, "linked");

        Joined { replaced, events }
    }

    /// Remove `listener`'s upstream edge and dispose all its subscriptions
    ///
    /// Returns `None` if the listener had no source.
    pub fn unlink(&mut self, bus: &mut EventBus, listener: &WidgetId) -> Option<Unlinked> {
        let source = self.sources.remove(listener)?;
        bus.unsubscribe_all(listener);
        let color_released = self.remove_subscriber(&source, listener);
        debug!(%source, %listener, color_released, "unlinked");
        Some(Unlinked {
            listener: listener.clone(),
            source,
            color_released,
        })
    }

    /// Drop `listener` from `source`'s set; release the colour if it was the last one
    fn remove_subscriber(&mut self, source: &WidgetId, listener: &WidgetId) -> bool {
        let now_empty = match self.subscribers.get_mut(source) {
            Some(subs) => {
                subs.retain(|s| s != listener);
                subs.is_empty()
            }
            None => true,
        };
        if now_empty {
            self.subscribers.remove(source);
            self.colors.remove(source).is_some()
        } else {
            false
        }
    }

    /// The source's colour, allocating one if it has none
    ///
    /// Returns the colour and whether it was newly allocated.
    pub fn color_for(&mut self, source: &WidgetId, allocator: &mut ColorAllocator) -> (LinkColor, bool) {
        if let Some(color) = self.colors.get(source) {
            return (*color, false);
        }
        let in_use: Vec<LinkColor> = self.colors.values().copied().collect();
        let color = allocator.allocate(&in_use);
        self.colors.insert(source.clone(), color);
        debug!(%source, %color, in_use = in_use.len(), "link colour allocated");
        (color, true)
    }

    /// Reuse a saved colour for a source that has none yet
    ///
    /// The colour is taken only if it is as far from every colour in use as
    /// a freshly allocated one would have to be. Returns whether it was taken.
    pub fn restore_color(&mut self, source: &WidgetId, color: LinkColor) -> bool {
        if self.colors.contains_key(source) {
            return false;
        }
        let threshold = min_distance_for(self.colors.len());
        if let Some((other, _)) = self
            .colors
            .iter()
            .find(|(_, used)| color.delta_e(used) < threshold)
        {
            debug!(%source, %color, clashes_with = %other, "saved link colour too close, reallocating");
            return false;
        }
        self.colors.insert(source.clone(), color);
        true
    }

    /// Remove a widget from the graph as both listener and source
    ///
    /// The widget's own subscriptions are disposed. Each of its listeners
    /// has all subscriptions disposed and its source pointer cleared.
    pub fn detach(&mut self, bus: &mut EventBus, id: &WidgetId) -> Detached {
        bus.unsubscribe_all(id);
        let upstream = self.sources.remove(id).map(|source| {
            let color_released = self.remove_subscriber(&source, id);
            Unlinked {
                listener: id.clone(),
                source,
                color_released,
            }
        });

        let color_released = self.colors.remove(id).is_some();
        let orphaned = self.subscribers.remove(id).unwrap_or_default();
        for listener in &orphaned {
            bus.unsubscribe_all(listener);
            self.sources.remove(listener);
        }
        if !orphaned.is_empty() || upstream.is_some() {
            debug!(widget = %id, orphaned = orphaned.len(), "detached from link graph");
        }

        Detached {
            upstream,
            orphaned,
            color_released,
        }
    }

    /// Link records for every source with listeners, in `order`
    pub fn links<'a>(&self, order: impl IntoIterator<Item = &'a WidgetId>) -> Vec<Link> {
        order
            .into_iter()
            .filter_map(|source| {
                let subscribers = self.subscribers.get(source)?;
                if subscribers.is_empty() {
                    return None;
                }
                let Some(color) = self.colors.get(source) else {
                    warn!(%source, "source with listeners has no colour, skipped in snapshot");
                    return None;
                };
                Some(Link {
                    source: source.clone(),
                    color: *color,
                    subscribers: subscribers.clone(),
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.subscribers.clear();
        self.colors.clear();
    }
}
