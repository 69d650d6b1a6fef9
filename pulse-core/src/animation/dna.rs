//! Double helix with base-pair rungs
use std::f32::consts::PI;

use crate::animation::{put, Animation, Base, CENTER, VIEW};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const STRANDS: usize = 2;
const RUNGS: usize = 10;
const AMPLITUDE: f32 = 100.0;
const FREQUENCY: f32 = 0.02;

#[derive(Debug)]
pub struct Dna {
    base: Base,

    strands: Vec<Option<ElementId>>,
    rungs: Vec<Option<ElementId>>,
    /// Nucleotide dots at both rung ends
    nodes: Vec<(Option<ElementId>, Option<ElementId>)>,

    phase: f32,
}

impl Dna {
    pub fn new(base: Base) -> Dna {
        Dna {
            base,
            strands: Vec::new(),
            rungs: Vec::new(),
            nodes: Vec::new(),
            phase: 0.0,
        }
    }

    /// Height of strand `strand` at `x`
    pub fn strand_y(&self, strand: usize, x: f32, bass: f32) -> f32 {
        let offset = strand as f32 * PI;
        CENTER + (x * FREQUENCY + self.phase + offset).sin() * AMPLITUDE * (1.0 + bass * 0.5)
    }

    /// Depth of the strand at `x`, 1 is in front
    fn depth(&self, strand: usize, x: f32) -> f32 {
        let offset = strand as f32 * PI;
        ((x * FREQUENCY + self.phase + offset).cos() + 1.0) / 2.0
    }
}

impl Animation for Dna {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        self.strands = (0..STRANDS)
            .map(|i| {
                self.base.create(
                    surface,
                    Shape::Path,
                    None,
                    &[
                        ("id", format!("animation-dna-{}", i).into()),
                        ("fill", "none".into()),
                        ("stroke", "white".into()),
                        ("stroke-width", 2.0.into()),
                        ("stroke-opacity", 0.8.into()),
                    ],
                )
            })
            .collect();

        self.rungs = (0..RUNGS)
            .map(|i| {
                self.base.create(
                    surface,
                    Shape::Line,
                    None,
                    &[
                        ("id", format!("animation-dna-bar-{}", i).into()),
                        ("stroke", "white".into()),
                        ("stroke-width", 1.0.into()),
                        ("stroke-opacity", 0.6.into()),
                    ],
                )
            })
            .collect();

        if self.base.options().enable_3d {
            let group = self.base.group(surface, "animation-dna-nodes");
            let mut node = || {
                group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[("r", 4.0.into()), ("fill", "white".into())],
                    )
                })
            };
            self.nodes = (0..RUNGS).map(|_| (node(), node())).collect();
        }

        self.phase = 0.0;
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        self.phase += frame.dt * (1.0 + frame.mid);

        for strand in 0..STRANDS {
            let d = crate::helpers::polyline(
                (0..=VIEW as usize)
                    .step_by(10)
                    .map(|x| (x as f32, self.strand_y(strand, x as f32, frame.bass))),
            );
            let id = self.strands[strand];
            put(surface, id, "d", d);
            put(surface, id, "stroke-opacity", (0.5 + frame.energy() * 0.5).min(1.0));
            put(
                surface,
                id,
                "stroke",
                self.base.options().color(frame, strand as f32 * 120.0),
            );
        }

        for i in 0..RUNGS {
            let x = i as f32 / (RUNGS - 1) as f32 * VIEW;
            let y1 = self.strand_y(0, x, frame.bass);
            let y2 = self.strand_y(1, x, frame.bass);

            let rung = self.rungs[i];
            put(surface, rung, "x1", x);
            put(surface, rung, "y1", y1);
            put(surface, rung, "x2", x);
            put(surface, rung, "y2", y2);
            put(surface, rung, "stroke-opacity", (0.3 + frame.energy() * 0.4).min(1.0));

            if let Some((a, b)) = self.nodes.get(i) {
                for (strand, (id, y)) in [(*a, y1), (*b, y2)].iter().enumerate() {
                    let depth = self.depth(strand, x);
                    put(surface, *id, "cx", x);
                    put(surface, *id, "cy", *y);
                    put(surface, *id, "r", 2.0 + depth * 4.0 + frame.high * 2.0);
                    put(surface, *id, "fill-opacity", 0.3 + depth * 0.7);
                }
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.strands.clear();
        self.rungs.clear();
        self.nodes.clear();
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    #[test]
    fn test_strands_are_opposite() {
        let mut scene = Scene::new();
        let mut dna = Dna::new(Base::new(Style::Dna, Options::default()));
        dna.build(&mut scene);
        testing::drive(&mut dna, &mut scene, 50);

        for x in (0..=600).step_by(25) {
            let a = dna.strand_y(0, x as f32, 0.4) - CENTER;
            let b = dna.strand_y(1, x as f32, 0.4) - CENTER;
            assert!((a + b).abs() < 1e-3, "{} vs {}", a, b);
            assert!(a.abs() <= AMPLITUDE * 1.2 + 1e-3);
        }
    }

    #[test]
    fn test_rungs_connect_strands() {
        let mut scene = Scene::new();
        let mut dna = Dna::new(Base::new(Style::Dna, Options::default()));
        dna.build(&mut scene);
        assert_eq!(scene.count(Shape::Line), RUNGS);
        assert_eq!(scene.count(Shape::Circle), RUNGS * 2);

        dna.update(&testing::frame(1.0, 0.0, 0.0, false, 0.0), &mut scene)
            .unwrap();

        let last = scene.find("animation-dna-bar-9").unwrap();
        assert_eq!(scene.number(last, "x1"), Some(VIEW));
        let y1 = scene.number(last, "y1").unwrap();
        let y2 = scene.number(last, "y2").unwrap();
        assert!(((y1 + y2) / 2.0 - CENTER).abs() < 0.02);
    }
}
