//! Concentric rings expanding outwards
use crate::animation::{put, Animation, Base, CENTER};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface, Value};

const RINGS: usize = 5;
const START: f32 = 50.0;
const LIMIT: f32 = 300.0;

#[derive(Debug, Clone)]
struct Ring {
    radius: f32,
    speed: f32,
    element: Option<ElementId>,
    glow: Option<ElementId>,
}

#[derive(Debug)]
pub struct Circular {
    base: Base,
    rings: Vec<Ring>,
    core: Option<ElementId>,
}

impl Circular {
    pub fn new(base: Base) -> Circular {
        Circular {
            base,
            rings: Vec::new(),
            core: None,
        }
    }

    pub fn radii(&self) -> Vec<f32> {
        self.rings.iter().map(|r| r.radius).collect()
    }
}

impl Animation for Circular {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let glow = self.base.options().enable_glow;

        self.rings = (0..RINGS)
            .map(|i| {
                let attrs: [(&'static str, Value); 5] = [
                    ("cx", CENTER.into()),
                    ("cy", CENTER.into()),
                    ("r", START.into()),
                    ("fill", "none".into()),
                    ("stroke", "white".into()),
                ];

                let glow = if glow {
                    self.base.create(surface, Shape::Circle, None, &attrs).map(|id| {
                        surface.set(id, "stroke-width", 10.0.into());
                        surface.set(id, "stroke-opacity", 0.1.into());
                        id
                    })
                } else {
                    None
                };
                let element = self
                    .base
                    .create(surface, Shape::Circle, None, &attrs)
                    .map(|id| {
                        surface.set(id, "id", format!("animation-circle-{}", i).into());
                        surface.set(id, "stroke-width", 2.0.into());
                        surface.set(id, "stroke-opacity", 0.6.into());
                        id
                    });

                Ring {
                    radius: START,
                    speed: 1.0 + i as f32 * 0.5,
                    element,
                    glow,
                }
            })
            .collect();

        self.core = self.base.create(
            surface,
            Shape::Circle,
            None,
            &[
                ("cx", CENTER.into()),
                ("cy", CENTER.into()),
                ("r", 20.0.into()),
                ("fill", "white".into()),
                ("fill-opacity", 0.5.into()),
            ],
        );
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let steps = frame.steps();
        let opacity = (0.3 + frame.energy() * 0.4).min(1.0);

        for (i, ring) in self.rings.iter_mut().enumerate() {
            ring.radius += ring.speed * (1.0 + frame.bass * 0.5) * steps;
            if ring.radius > LIMIT {
                ring.radius = START;
            }

            // Rings fade out towards the edge
            let fade = 1.0 - (ring.radius - START) / (LIMIT - START);
            let color = self.base.options().color(frame, i as f32 * 30.0);

            put(surface, ring.element, "r", ring.radius);
            put(surface, ring.element, "stroke-opacity", opacity * (0.4 + 0.6 * fade));
            put(surface, ring.element, "stroke-width", if frame.beat { 5.0 } else { 2.0 });
            put(surface, ring.element, "stroke", color.clone());

            put(surface, ring.glow, "r", ring.radius);
            put(surface, ring.glow, "stroke-opacity", opacity * 0.2 * fade);
            put(surface, ring.glow, "stroke", color);
        }

        put(surface, self.core, "r", 20.0 + frame.bass * 30.0);
        put(surface, self.core, "fill", self.base.options().color(frame, 180.0));

        Ok(())
    }

    fn reset(&mut self) {
        self.rings.clear();
        self.core = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    #[test]
    fn test_rings_wrap() {
        let mut scene = Scene::new();
        let mut circular = Circular::new(Base::new(Style::Circular, Options::default()));
        circular.build(&mut scene);
        assert_eq!(circular.radii(), vec![START; RINGS]);

        for i in 0..2000 {
            let f = testing::frame(1.0, 0.5, 0.5, i % 30 == 0, i as f32 / 60.0);
            circular.update(&f, &mut scene).unwrap();
            for r in circular.radii() {
                assert!(r >= START && r <= LIMIT, "r = {}", r);
            }
        }
    }

    #[test]
    fn test_outer_rings_are_faster() {
        let mut scene = Scene::new();
        let mut circular = Circular::new(Base::new(Style::Circular, Options::default()));
        circular.build(&mut scene);

        let f = testing::frame(0.0, 0.0, 0.0, true, 0.0);
        circular.update(&f, &mut scene).unwrap();
        let radii = circular.radii();
        assert!(radii.windows(2).all(|w| w[0] < w[1]));

        let ring = scene.find("animation-circle-0").unwrap();
        assert_eq!(scene.number(ring, "stroke-width"), Some(5.0));
    }
}
