//! Update functions for the Elm-style architecture
//!
//! Every raw UI event flows through [`update`]. Failures are logged and
//! absorbed: a stale or misrouted UI event must never take the host down.

mod link;
mod widget;

use crate::commands::Cmd;
use crate::messages::Msg;
use crate::model::FlexingModel;

#[cfg(debug_assertions)]
use crate::tracing::LinkSnapshot;
#[cfg(debug_assertions)]
use tracing::{debug, span, Level};

pub use link::update_link;
pub use widget::update_widget;

/// Main update function - dispatches to sub-handlers
///
/// In debug builds, this wraps with tracing instrumentation.
/// In release builds, it's a direct dispatch with zero overhead.
#[inline]
pub fn update(model: &mut FlexingModel, msg: Msg) -> Option<Cmd> {
    #[cfg(debug_assertions)]
    {
        update_traced(model, msg)
    }
    #[cfg(not(debug_assertions))]
    {
        update_inner(model, msg)
    }
}

/// Inner update logic (no tracing)
fn update_inner(model: &mut FlexingModel, msg: Msg) -> Option<Cmd> {
    match msg {
        Msg::Link(m) => link::update_link(model, m),
        Msg::Widget(m) => widget::update_widget(model, m),
    }
}

/// Traced update wrapper (debug builds only)
///
/// Captures the link graph before and after the message and logs the diff.
/// Resize messages arrive in bursts and are not logged.
#[cfg(debug_assertions)]
fn update_traced(model: &mut FlexingModel, msg: Msg) -> Option<Cmd> {
    use crate::messages::WidgetMsg;

    let is_noisy = matches!(&msg, Msg::Widget(WidgetMsg::Resized { .. }));

    let msg_name = msg_type_name(&msg);
    let _span = if is_noisy {
        None
    } else {
        Some(span!(Level::DEBUG, "update", msg = %msg_name).entered())
    };

    let before = LinkSnapshot::from_model(model);

    if !is_noisy {
        debug!(target: "message", msg = %msg_name, "processing");
    }

    let result = update_inner(model, msg);

    let after = LinkSnapshot::from_model(model);
    if let Some(diff) = before.diff(&after) {
        debug!(target: "link", %diff, "link graph changed");
    }

    result
}

/// Display name for a message, variant and arguments included
///
/// Example outputs:
/// - `Link::Start { layout: "main", widget: WidgetId("b") }`
/// - `Widget::Resized { layout: "main", width: 800.0, height: 600.0 }`
#[cfg(debug_assertions)]
fn msg_type_name(msg: &Msg) -> String {
    match msg {
        Msg::Link(m) => format!("Link::{:?}", m),
        Msg::Widget(m) => format!("Widget::{:?}", m),
    }
}
