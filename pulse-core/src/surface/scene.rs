//! In-memory retained scene
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::surface::{canvas, ElementId, Shape, Surface, SurfaceError, Value};

#[derive(Debug, Clone)]
pub struct Node {
    pub shape: Shape,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub attrs: BTreeMap<&'static str, Value>,
}

/// Retained scene kept in memory
///
/// Serves as the vector backend of the headless runner and as the surface tests
/// inspect.  An optional element budget makes creation fail once exhausted, the way
/// a constrained backend would.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: HashMap<ElementId, Node>,
    roots: Vec<ElementId>,
    next: u64,
    budget: Option<usize>,
}

impl Scene {
    pub fn new() -> Scene {
        Default::default()
    }

    /// Scene that refuses to hold more than `budget` elements
    pub fn with_budget(budget: usize) -> Scene {
        Scene {
            budget: Some(budget),
            ..Default::default()
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map(|n| &n.children[..])
            .unwrap_or(&[])
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&Value> {
        self.nodes.get(&id).and_then(|n| n.attrs.get(name))
    }

    pub fn number(&self, id: ElementId, name: &str) -> Option<f32> {
        self.attr(id, name).and_then(|v| v.as_number())
    }

    /// First element whose `id` attribute equals `name`
    pub fn find(&self, name: &str) -> Option<ElementId> {
        let mut stack = self.roots.iter().rev().cloned().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if node.attrs.get("id").and_then(|v| v.as_text()) == Some(name) {
                    return Some(id);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        None
    }

    /// All descendants of `id` (excluding itself) in document order
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = self.children(id).iter().rev().cloned().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Number of live elements of a given shape
    pub fn count(&self, shape: Shape) -> usize {
        self.nodes.values().filter(|n| n.shape == shape).count()
    }

    /// Serialize the scene as a standalone SVG document
    pub fn to_svg(&self, width: f32, height: f32) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}">"#,
            width, height
        );
        for id in self.roots.iter() {
            self.write_svg(&mut out, *id, 1);
        }
        out.push_str("</svg>\n");
        out
    }

    fn write_svg(&self, out: &mut String, id: ElementId, depth: usize) {
        let node = match self.nodes.get(&id) {
            Some(n) => n,
            None => return,
        };

        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, node.shape.tag());
        for (name, value) in node.attrs.iter() {
            if *name == "text" {
                continue;
            }
            let _ = write!(out, r#" {}="{}""#, name, escape(&value.to_string()));
        }

        let text = node.attrs.get("text").map(|v| v.to_string());
        if node.children.is_empty() && text.is_none() {
            out.push_str("/>\n");
            return;
        }

        out.push('>');
        if let Some(text) = text {
            out.push_str(&escape(&text));
        }
        if !node.children.is_empty() {
            out.push('\n');
            for child in node.children.iter() {
                self.write_svg(out, *child, depth + 1);
            }
            out.push_str(&indent);
        }
        let _ = writeln!(out, "</{}>", node.shape.tag());
    }

    /// Replay the scene as immediate draw commands
    ///
    /// The canvas is cleared first.  Groups contribute their `transform` to every
    /// descendant; invisible elements (zero opacity) are skipped.
    pub fn paint(&self, canvas: &mut dyn canvas::Canvas) {
        canvas.clear();

        let mut stack = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, String::new()))
            .collect::<Vec<_>>();

        while let Some((id, transform)) = stack.pop() {
            let node = match self.nodes.get(&id) {
                Some(n) => n,
                None => continue,
            };

            let transform = match node.attrs.get("transform") {
                Some(t) if transform.is_empty() => t.to_string(),
                Some(t) => format!("{} {}", transform, t),
                None => transform,
            };

            if node.shape == Shape::Group {
                if self.number(id, "opacity") == Some(0.0) {
                    continue;
                }
                for child in node.children.iter().rev() {
                    stack.push((*child, transform.clone()));
                }
                continue;
            }

            if let Some(cmd) = canvas::DrawCmd::from_node(node, transform) {
                if cmd.style.visible() {
                    canvas.draw(cmd);
                }
            }
        }
    }

    fn unlink(&mut self, id: ElementId, parent: Option<ElementId>) {
        let siblings = match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => &mut p.children,
            None => &mut self.roots,
        };
        if let Some(pos) = siblings.iter().position(|c| *c == id) {
            siblings.remove(pos);
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Surface for Scene {
    fn create(
        &mut self,
        shape: Shape,
        parent: Option<ElementId>,
    ) -> Result<ElementId, SurfaceError> {
        if let Some(budget) = self.budget {
            if self.nodes.len() >= budget {
                return Err(SurfaceError::CapacityExceeded(budget));
            }
        }

        let id = ElementId(self.next);
        match parent {
            Some(p) => self
                .nodes
                .get_mut(&p)
                .ok_or(SurfaceError::UnknownParent(p))?
                .children
                .push(id),
            None => self.roots.push(id),
        }
        self.next += 1;

        self.nodes.insert(
            id,
            Node {
                shape,
                parent,
                children: Vec::new(),
                attrs: BTreeMap::new(),
            },
        );

        Ok(id)
    }

    fn set(&mut self, id: ElementId, name: &'static str, value: Value) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.insert(name, value);
        }
    }

    fn remove(&mut self, id: ElementId) {
        let parent = match self.nodes.get(&id) {
            Some(n) => n.parent,
            None => return,
        };

        for d in self.descendants(id) {
            self.nodes.remove(&d);
        }
        self.nodes.remove(&id);
        self.unlink(id, parent);
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree() {
        let mut scene = Scene::new();

        let g = scene.create(Shape::Group, None).unwrap();
        let c = scene.create(Shape::Circle, Some(g)).unwrap();
        let inner = scene.create(Shape::Group, Some(g)).unwrap();
        let l = scene.create(Shape::Line, Some(inner)).unwrap();
        let p = scene.create(Shape::Path, None).unwrap();
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.roots(), &[g, p]);
        assert_eq!(scene.descendants(g), vec![c, inner, l]);

        scene.remove(inner);
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.children(g), &[c]);
        assert!(!scene.contains(l));

        scene.remove(g);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.roots(), &[p]);

        // Removing twice is fine
        scene.remove(g);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_attrs() {
        let mut scene = Scene::new();

        let c = scene.create(Shape::Circle, None).unwrap();
        scene.set(c, "id", "animation-ring".into());
        scene.set(c, "r", 120.0.into());
        assert_eq!(scene.number(c, "r"), Some(120.0));
        assert_eq!(scene.find("animation-ring"), Some(c));
        assert_eq!(scene.find("nope"), None);

        scene.remove(c);
        scene.set(c, "r", 5.0.into());
        assert_eq!(scene.attr(c, "r"), None);
    }

    #[test]
    fn test_budget() {
        let mut scene = Scene::with_budget(2);

        let g = scene.create(Shape::Group, None).unwrap();
        scene.create(Shape::Circle, Some(g)).unwrap();
        assert_eq!(
            scene.create(Shape::Circle, Some(g)),
            Err(SurfaceError::CapacityExceeded(2))
        );

        scene.remove(g);
        assert!(scene.create(Shape::Circle, None).is_ok());
    }

    #[test]
    fn test_unknown_parent() {
        let mut scene = Scene::new();

        assert_eq!(
            scene.create(Shape::Circle, Some(ElementId(42))),
            Err(SurfaceError::UnknownParent(ElementId(42)))
        );
        assert!(scene.is_empty());
    }

    #[test]
    fn test_svg() {
        let mut scene = Scene::new();

        let g = scene.create(Shape::Group, None).unwrap();
        scene.set(g, "transform", "translate(60,520)".into());
        let t = scene.create(Shape::Text, Some(g)).unwrap();
        scene.set(t, "text", "<1>".into());
        scene.set(t, "x", 3.0.into());

        let svg = scene.to_svg(600.0, 600.0);
        println!("{}", svg);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"<g transform="translate(60,520)">"#));
        assert!(svg.contains(r#"<text x="3">&lt;1&gt;</text>"#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
