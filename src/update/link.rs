//! Linking message handlers (start, overlay click, cancel, unlink)

use tracing::{debug, warn};

use crate::commands::Cmd;
use crate::messages::{Key, LinkMsg};
use crate::model::FlexingModel;

/// Handle linking interaction messages
pub fn update_link(model: &mut FlexingModel, msg: LinkMsg) -> Option<Cmd> {
    match msg {
        LinkMsg::Start { layout, widget } => match model.link(&layout, &widget) {
            Ok(cmd) => cmd.into_option(),
            Err(e) => {
                warn!("Cannot start linking: {}", e);
                None
            }
        },

        LinkMsg::TabActivated { layout, widget } => {
            let (layout, bus) = model.parts(&layout).ok()?;
            layout.tab_activated(bus, &widget).into_option()
        }

        LinkMsg::AffordanceClicked {
            layout,
            target,
            initiator,
        } => {
            let (layout, bus) = model.parts(&layout).ok()?;
            layout.affordance_clicked(bus, &target, &initiator).into_option()
        }

        LinkMsg::KeyPressed { layout, key } => {
            let (layout, _) = model.parts(&layout).ok()?;
            match key {
                Key::Escape if layout.is_linking() => layout.cancel_linking().into_option(),
                Key::Escape => None,
                Key::Other(name) => {
                    debug!(key = %name, "ignored key while linking");
                    None
                }
            }
        }

        LinkMsg::Cancel { layout } => {
            let (layout, _) = model.parts(&layout).ok()?;
            layout.cancel_linking().into_option()
        }

        LinkMsg::Unlink { layout, widget } => match model.unlink(&layout, &widget) {
            Ok(cmd) => cmd.into_option(),
            Err(e) => {
                warn!("Cannot unlink: {}", e);
                None
            }
        },
    }
}
