//! Single-threaded broadcast channel with an optional one-slot replay buffer
//!
//! A [`Channel`] is a cheap, clonable handle to shared state. Components keep
//! plain channels as their output emitters; the relay keeps replay channels
//! that remember the latest value and hand it to every new subscriber.
//!
//! Sinks are invoked synchronously in subscription order. The internal
//! `RefCell` is never borrowed while a sink runs, so a sink may emit, subscribe
//! or drop subscriptions on the same channel.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

type Sink = Rc<dyn Fn(&Value)>;

struct ChannelState {
    replay: bool,
    latest: Option<Value>,
    sinks: Vec<(u64, Sink)>,
    next_id: u64,
    closed: bool,
}

/// Broadcast channel handle
#[derive(Clone)]
pub struct Channel {
    state: Rc<RefCell<ChannelState>>,
}

impl Channel {
    /// Create a channel without replay (an output emitter)
    pub fn new() -> Self {
        Self::with_replay(false)
    }

    /// Create a channel that replays its most recent value to new subscribers
    pub fn replay() -> Self {
        Self::with_replay(true)
    }

    fn with_replay(replay: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(ChannelState {
                replay,
                latest: None,
                sinks: Vec::new(),
                next_id: 0,
                closed: false,
            })),
        }
    }

    /// Push a value to every subscriber, in subscription order
    ///
    /// Emitting on a closed channel is a no-op.
    pub fn emit(&self, value: Value) {
        let sinks: Vec<Sink> = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return;
            }
            if state.replay {
                state.latest = Some(value.clone());
            }
            state.sinks.iter().map(|(_, sink)| Rc::clone(sink)).collect()
        };

        for sink in sinks {
            sink(&value);
        }
    }

    /// Attach a sink
    ///
    /// On a replay channel that has already seen a value, the sink receives
    /// that value before this call returns. Subscribing to a closed channel
    /// yields an inert subscription.
    pub fn subscribe(&self, sink: impl Fn(&Value) + 'static) -> Subscription {
        let sink: Sink = Rc::new(sink);
        let (id, latest) = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Subscription::inert();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.sinks.push((id, Rc::clone(&sink)));
            (id, state.latest.clone())
        };

        if let Some(value) = latest {
            sink(&value);
        }

        Subscription {
            channel: Rc::downgrade(&self.state),
            id,
        }
    }

    /// The buffered value, if this is a replay channel that has emitted
    pub fn latest(&self) -> Option<Value> {
        self.state.borrow().latest.clone()
    }

    pub fn is_replay(&self) -> bool {
        self.state.borrow().replay
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().sinks.len()
    }

    /// Drop every sink and the buffered value; later emits are ignored
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.latest = None;
        state.sinks.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// True if both handles point at the same channel
    pub fn same_channel(&self, other: &Channel) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Channel")
                .field("replay", &state.replay)
                .field("latest", &state.latest)
                .field("subscribers", &state.sinks.len())
                .field("closed", &state.closed)
                .finish(),
            Err(_) => f.write_str("Channel { <borrowed> }"),
        }
    }
}

/// Handle to one sink on a [`Channel`]
///
/// Dropping the handle detaches the sink. The handle holds only a weak
/// reference, so it never keeps a channel alive.
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription {
    channel: Weak<RefCell<ChannelState>>,
    id: u64,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            channel: Weak::new(),
            id: 0,
        }
    }

    /// True while the sink is still attached to a live channel
    pub fn is_active(&self) -> bool {
        self.channel.upgrade().is_some_and(|state| {
            state
                .try_borrow()
                .map(|s| s.sinks.iter().any(|(id, _)| *id == self.id))
                .unwrap_or(true)
        })
    }

    /// Detach the sink now
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.channel.upgrade() else {
            return;
        };
        match state.try_borrow_mut() {
            Ok(mut state) => state.sinks.retain(|(id, _)| *id != self.id),
            Err(_) => tracing::warn!(id = self.id, "channel busy, subscription not detached"),
        };
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl Fn(&Value) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = {
            let seen = Rc::clone(&seen);
            move |v: &Value| seen.borrow_mut().push(v.clone())
        };
        (seen, sink)
    }

    #[test]
    fn test_plain_channel_does_not_replay() {
        let channel = Channel::new();
        channel.emit(json!(1));

        let (seen, sink) = recorder();
        let _sub = channel.subscribe(sink);
        assert!(seen.borrow().is_empty());

        channel.emit(json!(2));
        assert_eq!(*seen.borrow(), vec![json!(2)]);
    }

    #[test]
    fn test_replay_delivers_latest_then_live() {
        let channel = Channel::replay();
        channel.emit(json!(1));
        channel.emit(json!(2));

        let (seen, sink) = recorder();
        let _sub = channel.subscribe(sink);
        assert_eq!(*seen.borrow(), vec![json!(2)]);

        channel.emit(json!(3));
        assert_eq!(*seen.borrow(), vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_drop_detaches_sink() {
        let channel = Channel::new();
        let (seen, sink) = recorder();
        let sub = channel.subscribe(sink);
        assert!(sub.is_active());
        assert_eq!(channel.subscriber_count(), 1);

        sub.dispose();
        assert_eq!(channel.subscriber_count(), 0);

        channel.emit(json!("ignored"));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_dropping_one_handle_keeps_other_sinks() {
        let channel = Channel::replay();
        let (kept, kept_sink) = recorder();
        let _kept_sub = channel.subscribe(kept_sink);
        {
            let (_, sink) = recorder();
            let _scoped = channel.subscribe(sink);
            assert_eq!(channel.subscriber_count(), 2);
        }
        assert_eq!(channel.subscriber_count(), 1);

        channel.emit(json!("live"));
        assert_eq!(*kept.borrow(), vec![json!("live")]);
    }

    #[test]
    fn test_close_clears_sinks_and_buffer() {
        let channel = Channel::replay();
        channel.emit(json!(1));
        let (seen, sink) = recorder();
        let sub = channel.subscribe(sink);

        channel.close();
        assert!(!sub.is_active());
        assert_eq!(channel.latest(), None);

        channel.emit(json!(2));
        assert_eq!(*seen.borrow(), vec![json!(1)]);

        let late = channel.subscribe(|_| panic!("closed channel must not deliver"));
        assert!(!late.is_active());
    }

    #[test]
    fn test_sink_may_reenter_channel() {
        let channel = Channel::replay();
        let inner = channel.clone();
        let _sub = channel.subscribe(move |v| {
            if v == &json!(1) {
                inner.emit(json!(2));
            }
        });

        channel.emit(json!(1));
        assert_eq!(channel.latest(), Some(json!(2)));
    }

    #[test]
    fn test_subscription_outliving_channel_is_inert() {
        let channel = Channel::new();
        let sub = channel.subscribe(|_| {});
        drop(channel);
        assert!(!sub.is_active());
    }
}
