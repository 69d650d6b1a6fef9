//! Immediate-mode drawing
use crate::surface::{Node, Shape, Value};

/// Paint attributes of a single draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
    pub stroke_opacity: f32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        DrawStyle {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
            fill_opacity: 1.0,
            stroke_opacity: 1.0,
        }
    }
}

impl DrawStyle {
    /// Whether anything would end up on the canvas
    pub fn visible(&self) -> bool {
        let fill = self.fill.as_deref().map_or(false, |f| f != "none") && self.fill_opacity > 0.0;
        let stroke =
            self.stroke.as_deref().map_or(false, |s| s != "none") && self.stroke_opacity > 0.0;

        self.opacity > 0.0 && (fill || stroke)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    Path { d: String },
    Arc { cx: f32, cy: f32, r: f32 },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
    Rect { x: f32, y: f32, width: f32, height: f32 },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    Polygon { points: String },
    Text { x: f32, y: f32, text: String },
}

/// One immediate draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCmd {
    pub kind: DrawKind,
    pub style: DrawStyle,
    /// Accumulated transform, SVG/canvas syntax
    pub transform: String,
}

impl DrawCmd {
    pub(crate) fn from_node(node: &Node, transform: String) -> Option<DrawCmd> {
        let num = |name: &str| {
            node.attrs
                .get(name)
                .and_then(Value::as_number)
                .unwrap_or(0.0)
        };
        let text = |name: &str| node.attrs.get(name).map(|v| v.to_string());
        let opacity = |name: &str| {
            node.attrs
                .get(name)
                .and_then(Value::as_number)
                .unwrap_or(1.0)
        };

        let kind = match node.shape {
            Shape::Group => return None,
            Shape::Path => DrawKind::Path {
                d: text("d").unwrap_or_default(),
            },
            Shape::Circle => DrawKind::Arc {
                cx: num("cx"),
                cy: num("cy"),
                r: num("r"),
            },
            Shape::Ellipse => DrawKind::Ellipse {
                cx: num("cx"),
                cy: num("cy"),
                rx: num("rx"),
                ry: num("ry"),
            },
            Shape::Rect => DrawKind::Rect {
                x: num("x"),
                y: num("y"),
                width: num("width"),
                height: num("height"),
            },
            Shape::Line => DrawKind::Line {
                x1: num("x1"),
                y1: num("y1"),
                x2: num("x2"),
                y2: num("y2"),
            },
            Shape::Polygon => DrawKind::Polygon {
                points: text("points").unwrap_or_default(),
            },
            Shape::Text => DrawKind::Text {
                x: num("x"),
                y: num("y"),
                text: text("text").unwrap_or_default(),
            },
        };

        let mut fill = text("fill");
        // SVG fills shapes black unless told otherwise
        if fill.is_none() && node.shape != Shape::Line {
            fill = Some("black".to_string());
        }

        Some(DrawCmd {
            kind,
            style: DrawStyle {
                fill,
                stroke: text("stroke"),
                stroke_width: node
                    .attrs
                    .get("stroke-width")
                    .and_then(Value::as_number)
                    .unwrap_or(1.0),
                opacity: opacity("opacity"),
                fill_opacity: opacity("fill-opacity"),
                stroke_opacity: opacity("stroke-opacity"),
            },
            transform,
        })
    }
}

/// Immediate-mode pixel surface
///
/// Every frame starts with a full clear followed by a sequence of draw calls.  No
/// element identity survives between frames.
pub trait Canvas {
    fn clear(&mut self);

    fn draw(&mut self, cmd: DrawCmd);
}

/// Canvas that records the draw calls of the current frame
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub cmds: Vec<DrawCmd>,
    /// Number of clears seen, ie. frames drawn
    pub frames: usize,
}

impl DrawList {
    pub fn new() -> DrawList {
        Default::default()
    }
}

impl Canvas for DrawList {
    fn clear(&mut self) {
        self.cmds.clear();
        self.frames += 1;
    }

    fn draw(&mut self, cmd: DrawCmd) {
        self.cmds.push(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Scene, Surface};

    #[test]
    fn test_paint() {
        let mut scene = Scene::new();

        let g = scene.create(Shape::Group, None).unwrap();
        scene.set(g, "transform", "translate(300,300)".into());
        let c = scene.create(Shape::Circle, Some(g)).unwrap();
        scene.set(c, "r", 10.0.into());
        scene.set(c, "fill", "white".into());
        let hidden = scene.create(Shape::Circle, Some(g)).unwrap();
        scene.set(hidden, "fill", "white".into());
        scene.set(hidden, "fill-opacity", 0.0.into());
        let line = scene.create(Shape::Line, None).unwrap();
        scene.set(line, "stroke", "white".into());
        scene.set(line, "x2", 5.0.into());

        let mut canvas = DrawList::new();
        scene.paint(&mut canvas);
        scene.paint(&mut canvas);

        assert_eq!(canvas.frames, 2);
        assert_eq!(canvas.cmds.len(), 2);
        assert_eq!(
            canvas.cmds[0].kind,
            DrawKind::Arc {
                cx: 0.0,
                cy: 0.0,
                r: 10.0
            }
        );
        assert_eq!(canvas.cmds[0].transform, "translate(300,300)");
        assert_eq!(
            canvas.cmds[1].kind,
            DrawKind::Line {
                x1: 0.0,
                y1: 0.0,
                x2: 5.0,
                y2: 0.0
            }
        );
        assert_eq!(canvas.cmds[1].transform, "");
    }

    #[test]
    fn test_unstroked_line_is_invisible() {
        let mut scene = Scene::new();
        scene.create(Shape::Line, None).unwrap();

        let mut canvas = DrawList::new();
        scene.paint(&mut canvas);
        assert!(canvas.cmds.is_empty());
    }
}
