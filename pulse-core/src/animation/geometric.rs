//! Shapes morphing back and forth between two parameter sets
use rand::Rng;

use crate::animation::{put, Animation, Base, CENTER};
use crate::frames::AudioFrame;
use crate::helpers::{ease_sine, lerp};
use crate::surface::{ElementId, Shape, Surface};

/// Extra progress added by a beat
const BEAT_KICK: f32 = 0.15;

#[derive(Debug, Clone)]
pub struct Morph {
    pub shape: Shape,
    pub current: Vec<f32>,
    pub target: Vec<f32>,
    /// Position between `current` and `target`, in `[0, 1)`
    pub progress: f32,
    pub swaps: usize,

    element: Option<ElementId>,
    shadow: Option<ElementId>,
}

impl Morph {
    fn new(shape: Shape, current: Vec<f32>, target: Vec<f32>) -> Morph {
        debug_assert_eq!(current.len(), target.len());
        Morph {
            shape,
            current,
            target,
            progress: 0.0,
            swaps: 0,
            element: None,
            shadow: None,
        }
    }

    /// Interpolated parameters at the current progress
    pub fn values(&self) -> Vec<f32> {
        let t = ease_sine(self.progress);
        self.current
            .iter()
            .zip(self.target.iter())
            .map(|(a, b)| lerp(*a, *b, t))
            .collect()
    }

    /// Move towards the target, swapping ends once it is reached
    pub fn step(&mut self, amount: f32) {
        self.progress += amount.max(0.0);
        while self.progress >= 1.0 {
            self.progress -= 1.0;
            std::mem::swap(&mut self.current, &mut self.target);
            self.swaps += 1;
        }
    }

    fn write(&self, surface: &mut dyn Surface, id: Option<ElementId>) {
        let v = self.values();
        match self.shape {
            Shape::Circle => {
                put(surface, id, "cx", v[0]);
                put(surface, id, "cy", v[1]);
                put(surface, id, "r", v[2]);
            }
            Shape::Rect => {
                put(surface, id, "x", v[0]);
                put(surface, id, "y", v[1]);
                put(surface, id, "width", v[2]);
                put(surface, id, "height", v[3]);
            }
            Shape::Ellipse => {
                put(surface, id, "cx", v[0]);
                put(surface, id, "cy", v[1]);
                put(surface, id, "rx", v[2]);
                put(surface, id, "ry", v[3]);
            }
            _ => {
                put(
                    surface,
                    id,
                    "points",
                    crate::helpers::points(v.chunks(2).map(|p| (p[0], p[1]))),
                );
            }
        }
    }
}

#[derive(Debug)]
pub struct Geometric {
    base: Base,
    shapes: Vec<Morph>,
    spin: f32,
}

impl Geometric {
    pub fn new(base: Base) -> Geometric {
        Geometric {
            base,
            shapes: Vec::new(),
            spin: 0.0,
        }
    }

    pub fn shapes(&self) -> &[Morph] {
        &self.shapes
    }

    fn targets(rng: &mut impl Rng) -> Vec<Morph> {
        let mut jitter = |v: f32, by: f32| v + rng.gen_range(-by..by);

        let diamond = vec![450.0, 200.0, 500.0, 150.0, 550.0, 200.0, 500.0, 250.0];
        let mut star = Vec::with_capacity(diamond.len());
        for (i, v) in diamond.iter().enumerate() {
            // Pull the corners towards the middle, alternating axes
            star.push(jitter(if i % 2 == 0 { *v - 40.0 } else { *v + 60.0 }, 20.0));
        }

        vec![
            Morph::new(
                Shape::Circle,
                vec![200.0, 200.0, 50.0],
                vec![jitter(220.0, 40.0), jitter(260.0, 40.0), jitter(80.0, 20.0)],
            ),
            Morph::new(
                Shape::Rect,
                vec![350.0, 150.0, 100.0, 100.0],
                vec![
                    jitter(330.0, 30.0),
                    jitter(330.0, 30.0),
                    jitter(140.0, 30.0),
                    jitter(60.0, 20.0),
                ],
            ),
            Morph::new(Shape::Polygon, diamond, star),
            Morph::new(
                Shape::Ellipse,
                vec![150.0, 400.0, 60.0, 40.0],
                vec![
                    jitter(180.0, 30.0),
                    jitter(430.0, 30.0),
                    jitter(30.0, 10.0),
                    jitter(90.0, 20.0),
                ],
            ),
        ]
    }
}

impl Animation for Geometric {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let depth = self.base.options().enable_3d;
        let group = self.base.group(surface, "animation-geometric");

        self.shapes = Geometric::targets(self.base.rng());
        for (i, morph) in self.shapes.iter_mut().enumerate() {
            if depth {
                morph.shadow = group.and_then(|g| {
                    self.base.create(
                        surface,
                        morph.shape,
                        Some(g),
                        &[
                            ("fill", "black".into()),
                            ("fill-opacity", 0.3.into()),
                            ("transform", "translate(8,8)".into()),
                        ],
                    )
                });
            }
            morph.element = group.and_then(|g| {
                self.base.create(
                    surface,
                    morph.shape,
                    Some(g),
                    &[
                        ("id", format!("animation-shape-{}", i).into()),
                        ("fill", "white".into()),
                        ("fill-opacity", 0.8.into()),
                    ],
                )
            });
            morph.write(surface, morph.shadow);
            morph.write(surface, morph.element);
        }
        self.spin = 0.0;
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let energy = frame.energy();
        let rate = 0.25 + frame.overall * 0.5;
        let kick = if frame.beat { BEAT_KICK } else { 0.0 };

        self.spin = (self.spin + frame.dt * (10.0 + energy * 40.0)) % 360.0;
        let scale = 1.0 + energy * 0.1;

        for (i, morph) in self.shapes.iter_mut().enumerate() {
            morph.step(frame.dt * rate + kick);
            morph.write(surface, morph.shadow);
            morph.write(surface, morph.element);

            let transform = format!(
                "rotate({:.2} {} {}) translate({} {}) scale({:.3}) translate({} {})",
                self.spin * if i % 2 == 0 { 1.0 } else { -1.0 },
                CENTER,
                CENTER,
                CENTER,
                CENTER,
                scale,
                -CENTER,
                -CENTER,
            );
            put(surface, morph.element, "transform", transform);
            put(surface, morph.element, "fill-opacity", 0.5 + energy / 3.0 * 0.5);
            put(
                surface,
                morph.element,
                "fill",
                self.base.options().color(frame, i as f32 * 90.0),
            );

            if frame.beat {
                put(surface, morph.element, "stroke", "white");
                put(surface, morph.element, "stroke-width", 3.0);
            } else {
                put(surface, morph.element, "stroke", "none");
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.shapes.clear();
        self.spin = 0.0;
    }
}
