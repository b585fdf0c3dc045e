//! Flexing - event bus and widget linking for dockable, tabbed panel layouts
//!
//! This crate provides the core types and logic behind a docking layout's
//! widgets: a replaying per-widget event relay, a publish/subscribe bus, and
//! the click-to-connect linking flow, implemented in the Elm Architecture
//! pattern. Rendering is left to the host, which applies the returned
//! [`Cmd`]s and feeds UI events back in as [`Msg`]s.

pub mod bus;
pub mod cli;
pub mod commands;
pub mod config;
pub mod config_paths;
pub mod error;
pub mod layout;
pub mod link;
pub mod messages;
pub mod model;
pub mod relay;
pub mod tracing;
pub mod update;
pub mod widget;

// Re-export commonly used types
pub use bus::EventBus;
pub use commands::Cmd;
pub use config::LayoutConfig;
pub use error::{FlexingError, Result};
pub use layout::Layout;
pub use link::{Link, LinkColor};
pub use messages::Msg;
pub use model::FlexingModel;
pub use relay::Channel;
pub use widget::{Component, WidgetDef, WidgetId};
