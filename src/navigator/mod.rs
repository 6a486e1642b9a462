pub mod tree;

use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::feedback::{patterns, FeedbackSink};

pub use tree::{ElementHandle, ElementTree, Rect, TargetKind, TreeError, Viewport};

/// Elements whose tops are within this many units share a row.
pub const ROW_TOLERANCE: f64 = 10.0;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_SCROLL_STEP: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FocusableTarget {
    pub element: ElementHandle,
    pub bounds: Rect,
    pub ordinal: usize,
    pub kind: TargetKind,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub is_active: bool,
    pub current_index: Option<usize>,
    pub targets: Vec<FocusableTarget>,
}

/// Overlay box drawn around the selected target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlight {
    rect: Option<Rect>,
}

impl Highlight {
    pub fn show(&mut self, rect: Rect) {
        self.rect = Some(rect);
    }

    pub fn hide(&mut self) {
        self.rect = None;
    }
}

/// What `activate_selected` did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    Focused(String),
    Triggered(String),
    Failed(TreeError),
}

/// Orders candidates top-to-bottom, grouping tops within [`ROW_TOLERANCE`]
/// into one row, then left-to-right inside each row.
pub fn order_targets(candidates: Vec<FocusableTarget>) -> Vec<FocusableTarget> {
    let mut rows: Vec<Vec<FocusableTarget>> = Vec::new();
    for target in candidates
        .into_iter()
        .sorted_by(|a, b| a.bounds.y.total_cmp(&b.bounds.y).then(a.bounds.x.total_cmp(&b.bounds.x)))
    {
        match rows.last_mut() {
            Some(row) if target.bounds.y - row[0].bounds.y <= ROW_TOLERANCE => row.push(target),
            _ => rows.push(vec![target]),
        }
    }

    rows.into_iter()
        .flat_map(|row| row.into_iter().sorted_by(|a, b| a.bounds.x.total_cmp(&b.bounds.x)))
        .enumerate()
        .map(|(ordinal, target)| FocusableTarget { ordinal, ..target })
        .collect()
}

pub struct FocusNavigator {
    tree: Box<dyn ElementTree>,
    state: NavigationState,
    highlight: Option<Highlight>,
    registered: Vec<(TargetKind, ElementHandle)>,
    refresh_interval: Duration,
    next_refresh: Option<Instant>,
    last_scroll_top: Option<f64>,
    can_scroll_up: bool,
    can_scroll_down: bool,
}

impl std::fmt::Debug for FocusNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusNavigator")
            .field("state", &self.state)
            .field("highlight", &self.highlight)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl FocusNavigator {
    pub fn new(tree: Box<dyn ElementTree>) -> Self {
        Self {
            tree,
            state: NavigationState::default(),
            highlight: None,
            registered: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            next_refresh: None,
            last_scroll_top: None,
            can_scroll_up: false,
            can_scroll_down: false,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    // ── Accessors ──────────────────────────────────────────

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.current_index
    }

    /// `-1` when nothing is selected.
    pub fn current_index_raw(&self) -> isize {
        self.state.current_index.map_or(-1, |i| i as isize)
    }

    pub fn targets(&self) -> &[FocusableTarget] {
        &self.state.targets
    }

    pub fn selected(&self) -> Option<&FocusableTarget> {
        self.state
            .current_index
            .and_then(|i| self.state.targets.get(i))
    }

    pub fn highlight_rect(&self) -> Option<Rect> {
        self.highlight.as_ref().and_then(|h| h.rect)
    }

    pub fn can_scroll_up(&self) -> bool {
        self.can_scroll_up
    }

    pub fn can_scroll_down(&self) -> bool {
        self.can_scroll_down
    }

    pub fn next_refresh(&self) -> Option<Instant> {
        self.next_refresh
    }

    pub fn refresh_due(&self, now: Instant) -> bool {
        self.state.is_active && self.next_refresh.is_some_and(|at| now >= at)
    }

    // ── Capability registry ────────────────────────────────

    /// Host-declared target merged into every rebuild, replacing any earlier
    /// registration for the same kind.
    pub fn register_target(&mut self, kind: TargetKind, handle: ElementHandle) {
        self.registered.retain(|(k, _)| *k != kind);
        self.registered.push((kind, handle));
    }

    pub fn unregister_target(&mut self, kind: TargetKind) -> bool {
        let before = self.registered.len();
        self.registered.retain(|(k, _)| *k != kind);
        self.registered.len() < before
    }

    pub fn registered_target(&self, kind: TargetKind) -> Option<ElementHandle> {
        self.registered
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, h)| *h)
    }

    // ── Lifecycle ──────────────────────────────────────────

    pub fn start(&mut self, now: Instant, feedback: &mut dyn FeedbackSink) {
        self.state.is_active = true;
        self.sync_scroll_bounds(true);
        self.rebuild_targets();
        self.next_refresh = Some(now + self.refresh_interval);

        if self.state.targets.is_empty() {
            self.state.current_index = None;
            self.hide_highlight();
            feedback.speak("Navigation on, no interactive elements");
            return;
        }

        debug!(targets = self.state.targets.len(), "navigation started");
        self.state.current_index = Some(0);
        feedback.speak("Navigation on");
        self.render_selection(feedback);
    }

    pub fn stop(&mut self) {
        if self.state.is_active {
            debug!("navigation stopped");
        }
        self.state.is_active = false;
        self.state.current_index = None;
        self.next_refresh = None;
        self.hide_highlight();
    }

    /// Leaves navigation mode with an announcement.
    pub fn escape(&mut self, feedback: &mut dyn FeedbackSink) {
        let was_active = self.state.is_active;
        self.stop();
        if was_active {
            feedback.speak("Navigation off");
            feedback.vibrate(patterns::TICK);
        }
    }

    // ── Selection ──────────────────────────────────────────

    pub fn select_next(&mut self, feedback: &mut dyn FeedbackSink) -> Option<usize> {
        let len = self.navigable_len()?;
        let next = match self.state.current_index {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.move_to(next, feedback)
    }

    pub fn select_previous(&mut self, feedback: &mut dyn FeedbackSink) -> Option<usize> {
        let len = self.navigable_len()?;
        let previous = match self.state.current_index {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.move_to(previous, feedback)
    }

    /// Selects a specific element if it is currently a target.
    pub fn select_element(
        &mut self,
        handle: ElementHandle,
        feedback: &mut dyn FeedbackSink,
    ) -> Option<usize> {
        self.navigable_len()?;
        let index = self.state.targets.iter().position(|t| t.element == handle)?;
        self.move_to(index, feedback)
    }

    pub fn activate_selected(
        &mut self,
        feedback: &mut dyn FeedbackSink,
    ) -> Option<ActivationOutcome> {
        if !self.state.is_active {
            return None;
        }
        let target = self.selected()?.clone();

        let result = if target.kind.takes_focus() {
            self.tree.focus(target.element)
        } else {
            self.tree.trigger(target.element)
        };

        let outcome = match result {
            Ok(()) if target.kind.takes_focus() => {
                feedback.speak(&format!("Editing {}", target.label));
                ActivationOutcome::Focused(target.label)
            }
            Ok(()) => {
                feedback.speak(&format!("Activated {}", target.label));
                ActivationOutcome::Triggered(target.label)
            }
            Err(err) => {
                warn!(%err, "activation failed");
                feedback.speak(&format!("Could not activate {}", target.label));
                ActivationOutcome::Failed(err)
            }
        };
        feedback.vibrate(match outcome {
            ActivationOutcome::Failed(_) => patterns::ERROR,
            _ => patterns::ACTIVATE,
        });
        Some(outcome)
    }

    /// Repeats the announcement for the current selection.
    pub fn announce_selection(&mut self, feedback: &mut dyn FeedbackSink) -> bool {
        if !self.state.is_active || self.selected().is_none() {
            return false;
        }
        self.render_selection(feedback);
        true
    }

    // ── Scrolling ──────────────────────────────────────────

    pub fn scroll_up(&mut self, amount: f64, feedback: &mut dyn FeedbackSink) -> bool {
        if !self.can_scroll_up {
            feedback.vibrate(patterns::BOUNDARY);
            return false;
        }
        self.scroll_by(-amount.abs(), feedback);
        true
    }

    pub fn scroll_down(&mut self, amount: f64, feedback: &mut dyn FeedbackSink) -> bool {
        if !self.can_scroll_down {
            feedback.vibrate(patterns::BOUNDARY);
            return false;
        }
        self.scroll_by(amount.abs(), feedback);
        true
    }

    fn scroll_by(&mut self, dy: f64, feedback: &mut dyn FeedbackSink) {
        self.tree.scroll_by(dy);
        if self.sync_scroll_bounds(false) && self.state.is_active {
            self.refresh_selection(feedback);
        }
    }

    /// Re-reads the viewport. Bounds are recomputed only when the scroll
    /// position moved, unless `force` is set. Returns whether it moved.
    pub fn sync_scroll_bounds(&mut self, force: bool) -> bool {
        let viewport = self.tree.viewport();
        let moved = self.last_scroll_top != Some(viewport.scroll_top);
        if moved || force {
            self.can_scroll_up = viewport.can_scroll_up();
            self.can_scroll_down = viewport.can_scroll_down();
            self.last_scroll_top = Some(viewport.scroll_top);
        }
        moved
    }

    // ── Refresh ────────────────────────────────────────────

    /// Periodic refresh; does nothing unless active and due.
    pub fn tick(&mut self, now: Instant, feedback: &mut dyn FeedbackSink) -> bool {
        if !self.refresh_due(now) {
            return false;
        }
        self.refresh(feedback);
        self.next_refresh = Some(now + self.refresh_interval);
        true
    }

    /// Recomputes targets and scroll bounds immediately.
    pub fn refresh(&mut self, feedback: &mut dyn FeedbackSink) {
        self.sync_scroll_bounds(true);
        if self.state.is_active {
            self.refresh_selection(feedback);
        }
    }

    /// Rebuilds targets, keeping the selected element when it survives.
    fn refresh_selection(&mut self, feedback: &mut dyn FeedbackSink) {
        let previous = self.selected().map(|t| t.element);
        let previous_index = self.state.current_index;
        self.rebuild_targets();

        let len = self.state.targets.len();
        self.state.current_index = match (previous, previous_index) {
            _ if len == 0 => None,
            (Some(handle), Some(index)) => self
                .state
                .targets
                .iter()
                .position(|t| t.element == handle)
                .or(Some(index.min(len - 1))),
            // targets came back after an empty refresh
            _ => Some(0),
        };

        match self.selected() {
            Some(target) if Some(target.element) == previous => {
                let rect = target.bounds;
                self.show_highlight(rect);
            }
            Some(_) => self.render_selection(feedback),
            None => self.hide_highlight(),
        }
    }

    fn rebuild_targets(&mut self) {
        let view = self.tree.viewport().rect();
        let mut handles = match self.tree.query_visible_interactive_elements() {
            Ok(handles) => handles,
            Err(err) => {
                warn!(%err, "element query failed, navigation disabled until next refresh");
                self.state.targets.clear();
                return;
            }
        };
        if handles.is_empty() {
            self.state.targets.clear();
            return;
        }
        for (_, handle) in &self.registered {
            if !handles.contains(handle) {
                handles.push(*handle);
            }
        }

        let candidates = handles
            .into_iter()
            .unique()
            .filter_map(|element| {
                let kind = self
                    .registered
                    .iter()
                    .find(|(_, h)| *h == element)
                    .map(|(k, _)| *k)
                    .unwrap_or_else(|| self.tree.kind(element));
                if !kind.is_interactive() {
                    return None;
                }
                let bounds = self.tree.bounding_box(element)?;
                if !bounds.intersects(&view) {
                    return None;
                }
                Some(FocusableTarget {
                    element,
                    bounds,
                    ordinal: 0,
                    kind,
                    label: self.tree.label(element),
                })
            })
            .collect();

        self.state.targets = order_targets(candidates);
    }

    // ── Internals ──────────────────────────────────────────

    fn navigable_len(&self) -> Option<usize> {
        if !self.state.is_active || self.state.targets.is_empty() {
            return None;
        }
        Some(self.state.targets.len())
    }

    fn move_to(&mut self, index: usize, feedback: &mut dyn FeedbackSink) -> Option<usize> {
        self.state.current_index = Some(index);
        let element = self.state.targets[index].element;
        self.tree.scroll_into_view(element);
        // scrolling into view may shift coordinates
        if let Some(bounds) = self.tree.bounding_box(element) {
            self.state.targets[index].bounds = bounds;
        }
        self.sync_scroll_bounds(false);
        self.render_selection(feedback);
        Some(index)
    }

    fn render_selection(&mut self, feedback: &mut dyn FeedbackSink) {
        let Some(target) = self.selected() else {
            self.hide_highlight();
            return;
        };
        let rect = target.bounds;
        let announcement = format!(
            "{}, {}, {} of {}",
            target.label,
            target.kind,
            target.ordinal + 1,
            self.state.targets.len()
        );
        self.show_highlight(rect);
        feedback.speak(&announcement);
        feedback.vibrate(patterns::TICK);
    }

    fn show_highlight(&mut self, rect: Rect) {
        self.highlight.get_or_insert_with(Highlight::default).show(rect);
    }

    fn hide_highlight(&mut self) {
        if let Some(h) = self.highlight.as_mut() {
            h.hide();
        }
    }
}
