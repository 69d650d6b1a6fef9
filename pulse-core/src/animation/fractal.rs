//! Recursive branching trees
//!
//! Every tree is a complete binary tree of line segments.  The segments are
//! allocated once per tree at build time (`2^depth - 1` lines) and only moved
//! afterwards.
use crate::animation::{put, Animation, Base};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const TREES: usize = 3;
const DEPTH: usize = 6;
/// Hard limit on recursion, independent of configuration
pub const MAX_DEPTH: usize = 10;
const TRUNK: f32 = 80.0;
const RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Remaining depth, the trunk has the largest
    pub depth: usize,
}

/// Append the branch starting at `(x, y)` and all of its children to `out`
///
/// Segments are emitted in pre-order so a given depth always maps to the same slots.
pub fn branch(
    out: &mut Vec<Segment>,
    x: f32,
    y: f32,
    length: f32,
    angle: f32,
    depth: usize,
    spread: f32,
) {
    if depth == 0 {
        return;
    }

    let x2 = x + angle.cos() * length;
    let y2 = y + angle.sin() * length;
    out.push(Segment {
        x1: x,
        y1: y,
        x2,
        y2,
        depth,
    });

    branch(out, x2, y2, length * RATIO, angle - spread, depth - 1, spread);
    branch(out, x2, y2, length * RATIO, angle + spread, depth - 1, spread);
}

#[derive(Debug)]
pub struct Fractal {
    base: Base,
    depth: usize,
    /// Line slots of every tree
    trees: Vec<Vec<Option<ElementId>>>,
    sway: f32,
    segments: Vec<Segment>,
}

impl Fractal {
    pub fn new(base: Base) -> Fractal {
        Fractal::with_depth(base, DEPTH)
    }

    /// Trees of `depth` levels, limited to `MAX_DEPTH`
    pub fn with_depth(base: Base, depth: usize) -> Fractal {
        if depth > MAX_DEPTH {
            log::warn!("fractal: depth {} limited to {}", depth, MAX_DEPTH);
        }

        Fractal {
            base,
            depth: depth.min(MAX_DEPTH),
            trees: Vec::new(),
            sway: 0.0,
            segments: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of segments in one tree
    pub fn segments_per_tree(&self) -> usize {
        (1 << self.depth) - 1
    }
}

impl Animation for Fractal {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let per_tree = self.segments_per_tree();

        self.trees = (0..TREES)
            .map(|i| {
                let group = self.base.create(
                    surface,
                    Shape::Group,
                    None,
                    &[
                        ("id", format!("animation-tree-{}", i).into()),
                        ("transform", format!("translate({},500)", 200 + i * 100).into()),
                    ],
                );
                (0..per_tree)
                    .map(|_| {
                        group.and_then(|g| {
                            self.base.create(
                                surface,
                                Shape::Line,
                                Some(g),
                                &[("stroke", "white".into())],
                            )
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        self.segments = Vec::with_capacity(per_tree);
        self.sway = 0.0;
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let energy = frame.energy();
        let spread = 0.5 + energy * 0.5;
        let opacity = (0.3 + energy * 0.4).min(1.0);
        self.sway += frame.dt * (0.5 + frame.mid);

        for (i, tree) in self.trees.iter().enumerate() {
            let angle = -std::f32::consts::FRAC_PI_2
                + (i as f32 - 1.0) * 0.3
                + self.sway.sin() * 0.05 * (1.0 + frame.bass);
            let length = TRUNK * (1.0 + frame.bass * 0.2);

            self.segments.clear();
            branch(&mut self.segments, 0.0, 0.0, length, angle, self.depth, spread);
            debug_assert_eq!(self.segments.len(), tree.len());

            let color = self.base.options().color(frame, i as f32 * 40.0);
            for (seg, line) in self.segments.iter().zip(tree.iter()) {
                put(surface, *line, "x1", seg.x1);
                put(surface, *line, "y1", seg.y1);
                put(surface, *line, "x2", seg.x2);
                put(surface, *line, "y2", seg.y2);
                put(surface, *line, "stroke-width", (seg.depth as f32 * 2.0).max(1.0));
                put(surface, *line, "stroke-opacity", opacity);
                put(surface, *line, "stroke", color.clone());
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.trees.clear();
        self.segments.clear();
        self.sway = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    #[test]
    fn test_branch_counts() {
        for depth in 0..=8 {
            let mut out = Vec::new();
            branch(&mut out, 0.0, 0.0, 80.0, -1.57, depth, 0.5);
            assert_eq!(out.len(), (1 << depth) - 1);
        }
    }

    #[test]
    fn test_branch_geometry() {
        let mut out = Vec::new();
        branch(&mut out, 0.0, 0.0, 100.0, 0.0, 2, 0.5);

        assert_eq!(out[0].depth, 2);
        assert!((out[0].x2 - 100.0).abs() < 1e-4);
        // Children start where the parent ends and are shorter
        for child in out[1..].iter() {
            assert_eq!(child.depth, 1);
            assert_eq!((child.x1, child.y1), (out[0].x2, out[0].y2));
            let len = ((child.x2 - child.x1).powi(2) + (child.y2 - child.y1).powi(2)).sqrt();
            assert!((len - 70.0).abs() < 1e-3);
        }
        assert!(out[1].y2 < 0.0 && out[2].y2 > 0.0);
    }

    #[test]
    fn test_depth_limit() {
        let fractal = Fractal::with_depth(Base::new(Style::Fractal, Options::default()), 40);
        assert_eq!(fractal.depth(), MAX_DEPTH);
        assert_eq!(fractal.segments_per_tree(), 1023);
    }

    #[test]
    fn test_trees() {
        let mut scene = Scene::new();
        let mut fractal = Fractal::new(Base::new(Style::Fractal, Options::default()));
        fractal.build(&mut scene);
        assert_eq!(scene.count(Shape::Line), TREES * 63);
        assert_eq!(scene.count(Shape::Group), TREES);

        testing::drive(&mut fractal, &mut scene, 30);
        let tree = scene.find("animation-tree-1").unwrap();
        let trunk = scene.children(tree)[0];
        assert_eq!(scene.number(trunk, "x1"), Some(0.0));
        assert_eq!(scene.number(trunk, "stroke-width"), Some(12.0));
        assert!(scene.number(trunk, "y2").unwrap() < 0.0);
    }
}
