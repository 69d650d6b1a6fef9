//! Beat-triggered firework bursts
//!
//! Bursts are the one place where primitives come and go while running: every burst
//! gets its own group below the container, its sparks count their `life` down and
//! are removed once it runs out.
use std::f32::consts::PI;

use nalgebra as na;
use rand::Rng;

use crate::animation::{put, Animation, Base, VIEW};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const SPARKS: usize = 20;
const LAUNCH_CHANCE: f64 = 0.3;
const GRAVITY: f32 = 0.1;
const DECAY: f32 = 0.02;
/// Bursts alive at the same time
const MAX_BURSTS: usize = 12;

#[derive(Debug, Clone)]
pub struct Spark {
    pub pos: na::Vector2<f32>,
    pub vel: na::Vector2<f32>,
    pub life: f32,
    element: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct Burst {
    pub sparks: Vec<Spark>,
    group: Option<ElementId>,
}

#[derive(Debug)]
pub struct Fireworks {
    base: Base,
    container: Option<ElementId>,
    flash: Option<ElementId>,
    bursts: Vec<Burst>,
    launched: usize,
}

impl Fireworks {
    pub fn new(base: Base) -> Fireworks {
        Fireworks {
            base,
            container: None,
            flash: None,
            bursts: Vec::new(),
            launched: 0,
        }
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    /// Bursts launched since the last build
    pub fn launched(&self) -> usize {
        self.launched
    }

    pub fn sparks(&self) -> usize {
        self.bursts.iter().map(|b| b.sparks.len()).sum()
    }

    /// Explode a burst at `(x, y)`
    pub fn launch(&mut self, surface: &mut dyn Surface, x: f32, y: f32) {
        if self.bursts.len() >= MAX_BURSTS {
            log::trace!("fireworks: dropping burst, {} alive", self.bursts.len());
            return;
        }
        let container = match self.container {
            Some(c) => c,
            None => return,
        };

        let group = self
            .base
            .create(surface, Shape::Group, Some(container), &[]);
        let count = self.base.options().scaled(SPARKS);
        let sparks = (0..count)
            .map(|i| {
                let angle = i as f32 / count as f32 * PI * 2.0;
                let speed = self.base.rng().gen::<f32>() * 5.0 + 2.0;
                let element = group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[
                            ("cx", x.into()),
                            ("cy", y.into()),
                            ("r", 3.0.into()),
                            ("fill", "white".into()),
                            ("fill-opacity", 0.8.into()),
                        ],
                    )
                });

                Spark {
                    pos: na::Vector2::new(x, y),
                    vel: na::Vector2::new(angle.cos(), angle.sin()) * speed,
                    life: 1.0,
                    element,
                }
            })
            .collect();

        self.bursts.push(Burst { sparks, group });
        self.launched += 1;
    }
}

impl Animation for Fireworks {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        if self.base.options().enable_glow {
            self.flash = self.base.create(
                surface,
                Shape::Rect,
                None,
                &[
                    ("x", 0.0.into()),
                    ("y", 0.0.into()),
                    ("width", VIEW.into()),
                    ("height", VIEW.into()),
                    ("fill", "white".into()),
                    ("fill-opacity", 0.0.into()),
                ],
            );
        }
        self.container = self.base.group(surface, "animation-fireworks");
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        if frame.beat && self.base.rng().gen_bool(LAUNCH_CHANCE) {
            let x = self.base.rng().gen::<f32>() * VIEW;
            let y = self.base.rng().gen::<f32>() * VIEW;
            self.launch(surface, x, y);
            put(surface, self.flash, "fill-opacity", 0.15 * frame.bass);
        } else {
            put(surface, self.flash, "fill-opacity", 0.0);
        }

        let steps = frame.steps();
        let color = self.base.options().color(frame, 0.0);
        let shrink = self.base.options().enable_3d;

        for burst in self.bursts.iter_mut() {
            for spark in burst.sparks.iter_mut() {
                spark.pos += spark.vel * steps;
                spark.vel.y += GRAVITY * steps;
                spark.life -= DECAY * steps;

                put(surface, spark.element, "cx", spark.pos.x);
                put(surface, spark.element, "cy", spark.pos.y);
                put(surface, spark.element, "fill-opacity", spark.life.max(0.0));
                put(surface, spark.element, "fill", color.clone());
                if shrink {
                    put(surface, spark.element, "r", 1.0 + 2.0 * spark.life.max(0.0));
                }
            }

            // Expired sparks
            for spark in burst.sparks.iter().filter(|s| s.life <= 0.0) {
                if let Some(id) = spark.element {
                    surface.remove(id);
                }
            }
            burst.sparks.retain(|s| s.life > 0.0);
        }

        for burst in self.bursts.iter().filter(|b| b.sparks.is_empty()) {
            if let Some(g) = burst.group {
                surface.remove(g);
            }
        }
        self.bursts.retain(|b| !b.sparks.is_empty());

        Ok(())
    }

    fn reset(&mut self) {
        self.container = None;
        self.flash = None;
        self.bursts.clear();
        self.launched = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    fn fireworks(scene: &mut Scene) -> Fireworks {
        let mut fw = Fireworks::new(Base::new(Style::Fireworks, Options::default()));
        fw.build(scene);
        fw
    }

    #[test]
    fn test_burst_lifecycle() {
        let mut scene = Scene::new();
        let mut fw = fireworks(&mut scene);
        let idle = scene.len();

        fw.launch(&mut scene, 300.0, 300.0);
        assert_eq!(fw.sparks(), SPARKS);
        assert_eq!(scene.len(), idle + 1 + SPARKS);

        let silent = testing::frame(0.0, 0.0, 0.0, false, 0.0);
        fw.update(&silent, &mut scene).unwrap();
        // The first spark starts out horizontally, gravity bends it down
        let spark = &fw.bursts()[0].sparks[0];
        assert!((spark.vel.y - GRAVITY).abs() < 1e-5);
        assert!((spark.life - (1.0 - DECAY)).abs() < 1e-5);

        // Life runs out after 1 / DECAY nominal steps
        for _ in 0..60 {
            fw.update(&silent, &mut scene).unwrap();
        }
        assert_eq!(fw.sparks(), 0);
        assert!(fw.bursts().is_empty());
        assert_eq!(scene.len(), idle);
    }

    #[test]
    fn test_beats_launch_sometimes() {
        let mut scene = Scene::new();
        let mut fw = fireworks(&mut scene);

        for i in 0..100 {
            fw.update(&testing::frame(0.8, 0.2, 0.2, true, i as f32 / 60.0), &mut scene)
                .unwrap();
            assert!(fw.bursts().len() <= MAX_BURSTS);
        }
        // 0.3 per beat, minus the ones dropped at the cap
        let launched = fw.launched();
        assert!(launched >= 10 && launched < 60, "launched {}", launched);

        fw.clear(&mut scene);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_no_container() {
        let mut scene = Scene::with_budget(1);
        let mut fw = fireworks(&mut scene);

        fw.launch(&mut scene, 100.0, 100.0);
        assert!(fw.bursts().is_empty());
        assert_eq!(scene.len(), 1);
    }
}
