use std::collections::BTreeMap;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::feedback::FeedbackSink;
use crate::navigator::{FocusNavigator, TreeError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("navigation is off")]
    NavigationInactive,
    #[error("nothing is selected")]
    NothingSelected,
    #[error("{0}")]
    Failed(String),
}

/// What an action gets to work with. Actions issue their own feedback.
pub struct ActionContext<'a> {
    pub navigator: &'a mut FocusNavigator,
    pub feedback: &'a mut dyn FeedbackSink,
    pub scroll_step: f64,
    pub now: Instant,
}

pub type Action = Box<dyn FnMut(&mut ActionContext<'_>) -> Result<(), ActionError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Invoked,
    Unbound,
    Failed(ActionError),
}

#[derive(Default)]
pub struct CommandDispatcher {
    bindings: BTreeMap<String, Action>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("labels", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `label`, returning the binding it replaced.
    pub fn register(&mut self, label: impl Into<String>, action: Action) -> Option<Action> {
        let label = label.into();
        let replaced = self.bindings.insert(label.clone(), action);
        if replaced.is_some() {
            debug!(%label, "binding replaced");
        }
        replaced
    }

    /// Overlays a set of bindings; later entries win.
    pub fn register_all<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (String, Action)>,
    {
        for (label, action) in bindings {
            self.register(label, action);
        }
    }

    pub fn unregister(&mut self, label: &str) -> bool {
        self.bindings.remove(label).is_some()
    }

    pub fn is_bound(&self, label: &str) -> bool {
        self.bindings.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn dispatch(&mut self, label: &str, ctx: &mut ActionContext<'_>) -> DispatchOutcome {
        let Some(action) = self.bindings.get_mut(label) else {
            debug!(label, "no binding");
            return DispatchOutcome::Unbound;
        };
        match action(ctx) {
            Ok(()) => DispatchOutcome::Invoked,
            Err(e) => {
                warn!(label, error = %e, "action failed");
                DispatchOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_tree::MemoryTree;
    use crate::feedback::RecordingFeedback;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter(hits: &Rc<Cell<u32>>) -> Action {
        let hits = Rc::clone(hits);
        Box::new(move |_ctx: &mut ActionContext<'_>| {
            hits.set(hits.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_bound_and_unbound() {
        let hits = Rc::new(Cell::new(0));
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register("fist", counter(&hits));

        let mut nav = FocusNavigator::new(Box::new(MemoryTree::new(800.0, 600.0, 600.0)));
        let mut fb = RecordingFeedback::new();
        let mut ctx = ActionContext {
            navigator: &mut nav,
            feedback: &mut fb,
            scroll_step: 120.0,
            now: Instant::now(),
        };

        assert_eq!(dispatcher.dispatch("fist", &mut ctx), DispatchOutcome::Invoked);
        assert_eq!(dispatcher.dispatch("peace", &mut ctx), DispatchOutcome::Unbound);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_register_replaces_and_unregister() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let mut dispatcher = CommandDispatcher::new();
        assert!(dispatcher.register("point", counter(&first)).is_none());
        assert!(dispatcher.register("point", counter(&second)).is_some());

        let mut nav = FocusNavigator::new(Box::new(MemoryTree::new(800.0, 600.0, 600.0)));
        let mut fb = RecordingFeedback::new();
        let mut ctx = ActionContext {
            navigator: &mut nav,
            feedback: &mut fb,
            scroll_step: 120.0,
            now: Instant::now(),
        };
        dispatcher.dispatch("point", &mut ctx);
        assert_eq!((first.get(), second.get()), (0, 1));

        assert!(dispatcher.unregister("point"));
        assert!(!dispatcher.unregister("point"));
        assert!(!dispatcher.is_bound("point"));
    }

    #[test]
    fn test_failure_is_reported() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(
            "thumbs_up",
            Box::new(|_ctx: &mut ActionContext<'_>| {
                Err(ActionError::Failed("lamp offline".into()))
            }),
        );
        let mut nav = FocusNavigator::new(Box::new(MemoryTree::new(800.0, 600.0, 600.0)));
        let mut fb = RecordingFeedback::new();
        let mut ctx = ActionContext {
            navigator: &mut nav,
            feedback: &mut fb,
            scroll_step: 120.0,
            now: Instant::now(),
        };
        assert_eq!(
            dispatcher.dispatch("thumbs_up", &mut ctx),
            DispatchOutcome::Failed(ActionError::Failed("lamp offline".into()))
        );
    }

    #[test]
    fn test_register_all_overlays() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_all(vec![
            ("a".to_string(), Box::new(|_: &mut ActionContext<'_>| Ok(())) as Action),
            ("b".to_string(), Box::new(|_: &mut ActionContext<'_>| Ok(())) as Action),
        ]);
        let labels: Vec<&str> = dispatcher.labels().collect();
        assert_eq!(labels, vec!["a", "b"]);
    }
}
