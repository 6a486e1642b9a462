use crate::classifier::labels;
use crate::dispatch::{Action, ActionContext, ActionError, CommandDispatcher};

/// Boxes a closure as an [`Action`].
pub fn action<F>(f: F) -> Action
where
    F: FnMut(&mut ActionContext<'_>) -> Result<(), ActionError> + 'static,
{
    Box::new(f)
}

fn start_navigation() -> Action {
    action(|ctx| {
        ctx.navigator.start(ctx.now, ctx.feedback);
        Ok(())
    })
}

fn escape() -> Action {
    action(|ctx| {
        ctx.navigator.escape(ctx.feedback);
        Ok(())
    })
}

fn select_next() -> Action {
    action(|ctx| {
        require_active(ctx)?;
        ctx.navigator.select_next(ctx.feedback);
        Ok(())
    })
}

fn select_previous() -> Action {
    action(|ctx| {
        require_active(ctx)?;
        ctx.navigator.select_previous(ctx.feedback);
        Ok(())
    })
}

fn activate() -> Action {
    action(|ctx| {
        require_active(ctx)?;
        match ctx.navigator.activate_selected(ctx.feedback) {
            None => Err(ActionError::NothingSelected),
            // failures are announced by the navigator
            Some(_) => Ok(()),
        }
    })
}

fn scroll_down() -> Action {
    action(|ctx| {
        ctx.navigator.scroll_down(ctx.scroll_step, ctx.feedback);
        Ok(())
    })
}

fn scroll_up() -> Action {
    action(|ctx| {
        ctx.navigator.scroll_up(ctx.scroll_step, ctx.feedback);
        Ok(())
    })
}

fn announce_selection() -> Action {
    action(|ctx| {
        require_active(ctx)?;
        if ctx.navigator.announce_selection(ctx.feedback) {
            Ok(())
        } else {
            Err(ActionError::NothingSelected)
        }
    })
}

fn require_active(ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    if ctx.navigator.is_active() {
        Ok(())
    } else {
        Err(ActionError::NavigationInactive)
    }
}

/// The built-in label → action table.
pub fn default_bindings() -> Vec<(String, Action)> {
    [
        (labels::OPEN_HAND, start_navigation()),
        (labels::FIST, escape()),
        (labels::POINT, select_next()),
        (labels::FOUR, select_previous()),
        (labels::SWIPE_RIGHT, select_next()),
        (labels::SWIPE_LEFT, select_previous()),
        (labels::THUMBS_UP, activate()),
        (labels::PEACE, scroll_down()),
        (labels::THREE, scroll_up()),
        (labels::SWIPE_DOWN, scroll_down()),
        (labels::SWIPE_UP, scroll_up()),
        (labels::WAVE, start_navigation()),
        (labels::ROCK_ON, announce_selection()),
    ]
    .into_iter()
    .map(|(label, action)| (label.to_string(), action))
    .collect()
}

/// Installs [`default_bindings`] into `dispatcher`.
pub fn install_defaults(dispatcher: &mut CommandDispatcher) {
    dispatcher.register_all(default_bindings());
}
