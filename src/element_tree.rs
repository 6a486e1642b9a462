use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::model_store::StoreError;
use crate::navigator::{ElementHandle, ElementTree, Rect, TargetKind, TreeError, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryElement {
    pub id: u64,
    pub label: String,
    pub kind: TargetKind,
    pub rect: Rect,
    /// Present in the tree but not returned by the interactive query.
    #[serde(default)]
    pub hidden: bool,
}

impl MemoryElement {
    pub fn new(id: u64, label: impl Into<String>, kind: TargetKind, rect: Rect) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
            rect,
            hidden: false,
        }
    }

    pub fn handle(&self) -> ElementHandle {
        ElementHandle(self.id)
    }
}

/// Serialized page description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<MemoryElement>,
}

impl Layout {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Default)]
struct TreeState {
    viewport: Viewport,
    elements: Vec<MemoryElement>,
    unavailable: bool,
    rejected: Vec<(ElementHandle, String)>,
    focused: Option<ElementHandle>,
    triggered: Vec<ElementHandle>,
    scrolled_into_view: Vec<ElementHandle>,
}

impl TreeState {
    fn find(&self, handle: ElementHandle) -> Option<&MemoryElement> {
        self.elements.iter().find(|e| e.handle() == handle)
    }

    fn max_scroll(&self) -> f64 {
        (self.viewport.content_height - self.viewport.height).max(0.0)
    }

    fn check_action(&self, handle: ElementHandle) -> Result<(), TreeError> {
        if self.find(handle).is_none() {
            return Err(TreeError::Detached(handle));
        }
        if let Some((_, reason)) = self.rejected.iter().find(|(h, _)| *h == handle) {
            return Err(TreeError::Rejected(handle, reason.clone()));
        }
        Ok(())
    }
}

/// In-memory host UI. Clones share one tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    inner: Rc<RefCell<TreeState>>,
}

impl MemoryTree {
    pub fn new(width: f64, height: f64, content_height: f64) -> Self {
        Self::from_layout(Layout {
            viewport: Viewport {
                scroll_top: 0.0,
                width,
                height,
                content_height: content_height.max(height),
            },
            elements: Vec::new(),
        })
    }

    pub fn from_layout(layout: Layout) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TreeState {
                viewport: layout.viewport,
                elements: layout.elements,
                ..TreeState::default()
            })),
        }
    }

    pub fn with_element(self, element: MemoryElement) -> Self {
        self.add_element(element);
        self
    }

    pub fn with_hidden_element(self, element: MemoryElement) -> Self {
        self.add_element(MemoryElement {
            hidden: true,
            ..element
        });
        self
    }

    pub fn add_element(&self, element: MemoryElement) {
        self.inner.borrow_mut().elements.push(element);
    }

    pub fn remove_element(&self, handle: ElementHandle) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.elements.len();
        state.elements.retain(|e| e.handle() != handle);
        state.elements.len() < before
    }

    /// Makes every query fail, as a detached or crashed UI would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.borrow_mut().unavailable = unavailable;
    }

    /// Makes focus/trigger on `handle` fail with `reason`.
    pub fn reject_actions(&self, handle: ElementHandle, reason: impl Into<String>) {
        self.inner
            .borrow_mut()
            .rejected
            .push((handle, reason.into()));
    }

    pub fn focused(&self) -> Option<ElementHandle> {
        self.inner.borrow().focused
    }

    pub fn triggered(&self) -> Vec<ElementHandle> {
        self.inner.borrow().triggered.clone()
    }

    pub fn scrolled_into_view(&self) -> Vec<ElementHandle> {
        self.inner.borrow().scrolled_into_view.clone()
    }

    pub fn element_label(&self, handle: ElementHandle) -> Option<String> {
        self.inner.borrow().find(handle).map(|e| e.label.clone())
    }
}

impl ElementTree for MemoryTree {
    fn query_visible_interactive_elements(&self) -> Result<Vec<ElementHandle>, TreeError> {
        let state = self.inner.borrow();
        if state.unavailable {
            return Err(TreeError::Unavailable("tree detached".into()));
        }
        Ok(state
            .elements
            .iter()
            .filter(|e| !e.hidden)
            .map(MemoryElement::handle)
            .collect())
    }

    fn bounding_box(&self, handle: ElementHandle) -> Option<Rect> {
        self.inner.borrow().find(handle).map(|e| e.rect)
    }

    fn kind(&self, handle: ElementHandle) -> TargetKind {
        self.inner
            .borrow()
            .find(handle)
            .map_or(TargetKind::Other, |e| e.kind)
    }

    fn label(&self, handle: ElementHandle) -> String {
        self.element_label(handle).unwrap_or_default()
    }

    fn scroll_into_view(&mut self, handle: ElementHandle) {
        let mut state = self.inner.borrow_mut();
        state.scrolled_into_view.push(handle);
        let Some(rect) = state.find(handle).map(|e| e.rect) else {
            return;
        };
        let view = state.viewport.rect();
        let fully_visible = rect.y >= view.y && rect.bottom() <= view.bottom();
        if !fully_visible {
            let max = state.max_scroll();
            state.viewport.scroll_top = rect.y.clamp(0.0, max);
        }
    }

    fn focus(&mut self, handle: ElementHandle) -> Result<(), TreeError> {
        let mut state = self.inner.borrow_mut();
        state.check_action(handle)?;
        state.focused = Some(handle);
        Ok(())
    }

    fn trigger(&mut self, handle: ElementHandle) -> Result<(), TreeError> {
        let mut state = self.inner.borrow_mut();
        state.check_action(handle)?;
        state.triggered.push(handle);
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.inner.borrow().viewport
    }

    fn scroll_by(&mut self, dy: f64) {
        let mut state = self.inner.borrow_mut();
        let max = state.max_scroll();
        state.viewport.scroll_top = (state.viewport.scroll_top + dy).clamp(0.0, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> MemoryTree {
        MemoryTree::new(800.0, 600.0, 2000.0).with_element(MemoryElement::new(
            1,
            "Far",
            TargetKind::Button,
            Rect::new(0.0, 1500.0, 50.0, 20.0),
        ))
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut t = tree();
        t.scroll_by(-50.0);
        assert_eq!(t.viewport().scroll_top, 0.0);
        t.scroll_by(5000.0);
        assert_eq!(t.viewport().scroll_top, 1400.0);
    }

    #[test]
    fn test_scroll_into_view_moves_viewport() {
        let mut t = tree();
        t.scroll_into_view(ElementHandle(1));
        assert_eq!(t.viewport().scroll_top, 1400.0);
    }

    #[test]
    fn test_clones_share_state() {
        let t = tree();
        let mut other = t.clone();
        other.trigger(ElementHandle(1)).unwrap();
        assert_eq!(t.triggered(), vec![ElementHandle(1)]);
    }

    #[test]
    fn test_actions_on_missing_element_fail() {
        let mut t = tree();
        assert_eq!(
            t.trigger(ElementHandle(42)),
            Err(TreeError::Detached(ElementHandle(42)))
        );
    }

    #[test]
    fn test_layout_json() {
        let json = r#"{
            "viewport": {"scroll_top": 0, "width": 800, "height": 600, "content_height": 900},
            "elements": [
                {"id": 1, "label": "Lights", "kind": "button", "rect": {"x": 10, "y": 10, "width": 80, "height": 30}}
            ]
        }"#;
        let layout: Layout = serde_json::from_str(json).unwrap();
        let t = MemoryTree::from_layout(layout);
        assert_eq!(t.query_visible_interactive_elements().unwrap(), vec![ElementHandle(1)]);
        assert_eq!(t.kind(ElementHandle(1)), TargetKind::Button);
    }
}
