//! Falling glyph rain
use rand::Rng;

use crate::animation::{put, Animation, Base, VIEW};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const GLYPHS: &str = "01アイウエオカキクケコサシスセソタチツテトナニヌネノハヒフヘホマミムメモヤユヨラリルレロワヲン";
const DROPS: usize = 20;
const TRAIL: usize = 4;
const SWAP_CHANCE: f64 = 0.1;
const FONT_SIZE: f32 = 16.0;

#[derive(Debug, Clone)]
pub struct Raindrop {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub glyph: char,

    head: Option<ElementId>,
    /// Fading copies above the head
    trail: Vec<Option<ElementId>>,
}

#[derive(Debug)]
pub struct Matrix {
    base: Base,
    drops: Vec<Raindrop>,
}

fn glyph(rng: &mut impl Rng) -> char {
    let n = GLYPHS.chars().count();
    GLYPHS.chars().nth(rng.gen_range(0..n)).unwrap_or('0')
}

impl Matrix {
    pub fn new(base: Base) -> Matrix {
        Matrix {
            base,
            drops: Vec::new(),
        }
    }

    pub fn drops(&self) -> &[Raindrop] {
        &self.drops
    }
}

impl Animation for Matrix {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let count = self.base.options().scaled(DROPS);
        let trail = if self.base.options().enable_glow {
            TRAIL
        } else {
            0
        };
        let group = self.base.group(surface, "animation-matrix");

        self.drops = (0..count)
            .map(|_| {
                let rng = self.base.rng();
                let x = rng.gen::<f32>() * VIEW;
                let y = rng.gen::<f32>() * VIEW;
                let speed = rng.gen::<f32>() * 3.0 + 1.0;
                let glyph = glyph(rng);

                let mut text = |opacity: f32| {
                    group.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Text,
                            Some(g),
                            &[
                                ("x", x.into()),
                                ("y", y.into()),
                                ("fill", "white".into()),
                                ("fill-opacity", opacity.into()),
                                ("font-size", FONT_SIZE.into()),
                                ("font-family", "monospace".into()),
                                ("text", glyph.to_string().into()),
                            ],
                        )
                    })
                };

                let trail = (0..trail)
                    .map(|t| text(0.5 / (t + 1) as f32))
                    .collect::<Vec<_>>();
                let head = text(1.0);

                Raindrop {
                    x,
                    y,
                    speed,
                    glyph,
                    head,
                    trail,
                }
            })
            .collect();
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let steps = frame.steps();
        let opacity = (0.3 + frame.energy() * 0.7).min(1.0);
        let color = self.base.options().color(frame, 120.0);
        let rng = &mut self.base.rng;

        for drop in self.drops.iter_mut() {
            drop.y += drop.speed * (1.0 + frame.bass * 0.5) * steps;
            if drop.y > VIEW {
                drop.y = -20.0;
                drop.x = rng.gen::<f32>() * VIEW;
            }
            if rng.gen_bool(SWAP_CHANCE) {
                drop.glyph = glyph(rng);
                put(surface, drop.head, "text", drop.glyph.to_string());
            }

            put(surface, drop.head, "x", drop.x);
            put(surface, drop.head, "y", drop.y);
            put(surface, drop.head, "fill-opacity", opacity);
            put(surface, drop.head, "fill", color.clone());

            for (t, id) in drop.trail.iter().enumerate() {
                put(surface, *id, "x", drop.x);
                put(surface, *id, "y", drop.y - (t + 1) as f32 * FONT_SIZE);
                put(surface, *id, "fill-opacity", opacity * 0.5 / (t + 1) as f32);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.drops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::{Scene, Value};

    #[test]
    fn test_drops_fall_and_wrap() {
        let mut scene = Scene::new();
        let mut matrix = Matrix::new(Base::new(Style::Matrix, Options::default()));
        matrix.build(&mut scene);
        assert_eq!(matrix.drops().len(), DROPS);
        assert_eq!(scene.count(Shape::Text), DROPS * (TRAIL + 1));

        for i in 0..1000 {
            let f = testing::frame(1.0, 0.0, 0.0, false, i as f32 / 60.0);
            matrix.update(&f, &mut scene).unwrap();
            for drop in matrix.drops() {
                assert!(drop.y >= -20.0 && drop.y <= VIEW);
                assert!(drop.x >= 0.0 && drop.x <= VIEW);
            }
        }
    }

    #[test]
    fn test_glyphs_change() {
        let mut scene = Scene::new();
        let mut matrix = Matrix::new(Base::new(Style::Matrix, Options::default()));
        matrix.build(&mut scene);

        let before = matrix.drops().iter().map(|d| d.glyph).collect::<Vec<_>>();
        testing::drive(&mut matrix, &mut scene, 100);
        let after = matrix.drops().iter().map(|d| d.glyph).collect::<Vec<_>>();
        assert_ne!(before, after);

        for drop in matrix.drops() {
            assert!(GLYPHS.contains(drop.glyph));
            match scene.attr(drop.head.unwrap(), "text") {
                Some(Value::Text(s)) => assert_eq!(s, &drop.glyph.to_string()),
                other => panic!("unexpected text {:?}", other),
            }
        }
    }
}
