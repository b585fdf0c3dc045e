//! Widget container message handlers (resize, popout, titles, actions, close)

use tracing::warn;

use crate::commands::Cmd;
use crate::messages::WidgetMsg;
use crate::model::FlexingModel;

/// Handle widget container messages
pub fn update_widget(model: &mut FlexingModel, msg: WidgetMsg) -> Option<Cmd> {
    let result = match msg {
        WidgetMsg::Resized {
            layout,
            width,
            height,
        } => model.resize(&layout, width, height).map(|_| Cmd::None),

        WidgetMsg::Popout { layout, widget } => model.popout(&layout, &widget),

        WidgetMsg::SetTitle {
            layout,
            widget,
            title,
        } => model.set_title(&layout, &widget, &title),

        WidgetMsg::ActionInvoked {
            layout,
            widget,
            kind,
            index,
        } => model
            .invoke_action(&layout, &widget, kind, index)
            .map(|_| Cmd::None),

        WidgetMsg::Closed { layout, widget } => model.close_widget(&layout, &widget),
    };

    match result {
        Ok(cmd) => cmd.into_option(),
        Err(e) => {
            warn!("Widget message failed: {}", e);
            None
        }
    }
}
