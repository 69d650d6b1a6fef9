//! Render surface contracts
//!
//! Animations talk to a retained-mode vector scene through [`Surface`]: elements are
//! created once, mutated through attribute sets and removed on teardown.  Pixel
//! backends implement [`Canvas`] instead and get the scene replayed as immediate
//! draw commands every frame, see [`Scene::paint`].
//!
//! [`Surface`]: trait.Surface.html
//! [`Canvas`]: canvas/trait.Canvas.html
//! [`Scene::paint`]: scene/struct.Scene.html#method.paint
pub mod canvas;
pub mod scene;

pub use self::canvas::{Canvas, DrawCmd, DrawKind, DrawList, DrawStyle};
pub use self::scene::{Node, Scene};

use thiserror::Error;

/// Identity of an element on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Kind of a drawable primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Group,
    Circle,
    Ellipse,
    Rect,
    Line,
    Path,
    Polygon,
    Text,
}

impl Shape {
    /// SVG tag name
    pub fn tag(&self) -> &'static str {
        match self {
            Shape::Group => "g",
            Shape::Circle => "circle",
            Shape::Ellipse => "ellipse",
            Shape::Rect => "rect",
            Shape::Line => "line",
            Shape::Path => "path",
            Shape::Polygon => "polygon",
            Shape::Text => "text",
        }
    }
}

/// Attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f32),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", (n * 100.0).round() / 100.0),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Number(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// The surface refuses to hold more elements
    #[error("element budget of {0} exhausted")]
    CapacityExceeded(usize),

    /// The requested parent does not exist (anymore)
    #[error("parent element {0:?} does not exist")]
    UnknownParent(ElementId),
}

/// Retained-mode vector scene
pub trait Surface {
    /// Create an element, attached to `parent` or to the root
    fn create(
        &mut self,
        shape: Shape,
        parent: Option<ElementId>,
    ) -> Result<ElementId, SurfaceError>;

    /// Set an attribute.  Unknown elements are ignored.
    fn set(&mut self, id: ElementId, name: &'static str, value: Value);

    /// Remove an element and all its descendants.  Unknown elements are ignored.
    fn remove(&mut self, id: ElementId);

    /// Number of live elements, descendants included
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, S: Surface + ?Sized> Surface for &'a mut S {
    fn create(
        &mut self,
        shape: Shape,
        parent: Option<ElementId>,
    ) -> Result<ElementId, SurfaceError> {
        (**self).create(shape, parent)
    }

    fn set(&mut self, id: ElementId, name: &'static str, value: Value) {
        (**self).set(id, name, value)
    }

    fn remove(&mut self, id: ElementId) {
        (**self).remove(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
