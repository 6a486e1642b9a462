use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque reference to a host UI element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetKind {
    Button,
    Link,
    Input,
    /// Explicitly marked selectable by the host.
    Selectable,
    /// Present in the tree but not navigable.
    Other,
}

impl TargetKind {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Input-like targets take focus instead of being triggered.
    pub fn takes_focus(&self) -> bool {
        matches!(self, Self::Input)
    }
}

/// Scroll geometry in element-tree units. `bounds` of elements are in the
/// same document coordinates as `scroll_top`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_top: f64,
    pub width: f64,
    pub height: f64,
    pub content_height: f64,
}

impl Viewport {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, self.scroll_top, self.width, self.height)
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll_top > 0.0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll_top + self.height < self.content_height
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    #[error("element tree unavailable: {0}")]
    Unavailable(String),
    #[error("element {0:?} no longer exists")]
    Detached(ElementHandle),
    #[error("element {0:?} rejected the action: {1}")]
    Rejected(ElementHandle, String),
}

/// Host UI tree.
pub trait ElementTree {
    /// Candidate elements currently rendered and visible.
    fn query_visible_interactive_elements(&self) -> Result<Vec<ElementHandle>, TreeError>;

    fn bounding_box(&self, handle: ElementHandle) -> Option<Rect>;

    fn kind(&self, handle: ElementHandle) -> TargetKind;

    /// Accessible name used for spoken feedback.
    fn label(&self, handle: ElementHandle) -> String;

    fn scroll_into_view(&mut self, handle: ElementHandle);

    fn focus(&mut self, handle: ElementHandle) -> Result<(), TreeError>;

    /// Runs the element's primary action.
    fn trigger(&mut self, handle: ElementHandle) -> Result<(), TreeError>;

    fn viewport(&self) -> Viewport;

    /// Moves the viewport; the tree clamps to its content.
    fn scroll_by(&mut self, dy: f64);
}
