//! Event relay - named, replaying output channels per widget
//!
//! ## Architecture
//!
//! - `Channel`: single-threaded broadcast cell, optionally buffering the latest value
//! - `Subscription`: detaches its sink when dropped
//! - `EventRelay`: `instanceId -> eventName -> replay channel`, bridged from the
//!   widget component's own output channels
//!
//! A listener that subscribes after a source has emitted still sees the most
//! recent value first, then every later value in emission order.

mod channel;
mod registry;

pub use channel::{Channel, Subscription};
pub use registry::EventRelay;
