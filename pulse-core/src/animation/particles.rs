//! Particle system with a drifting gravity center
//!
//! Bass pulls the particles towards a slowly wandering center, walls reflect them
//! with some energy loss and every particle respawns once its lifespan is over.
//! Particles closer than `LINK_DISTANCE` get a link drawn between them, recomputed
//! from scratch every frame.  Beats inject a burst of new particles until the pool
//! is full.
use nalgebra as na;
use rand::Rng;

use crate::animation::{put, Animation, Base, CENTER, VIEW};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const MAX_PARTICLES: usize = 50;
const MAX_LINKS: usize = 60;
const LINK_DISTANCE: f32 = 80.0;
const RESTITUTION: f32 = 0.85;
const BURST: usize = 5;
const MAX_SPEED: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: na::Vector2<f32>,
    pub vel: na::Vector2<f32>,
    /// Depth in `[0, 1]`, only used for decoration
    pub z: f32,
    pub size: f32,
    pub age: f32,
    pub lifespan: f32,
    pub alive: bool,
    element: Option<ElementId>,
}

#[derive(Debug)]
pub struct Particles {
    base: Base,

    group: Option<ElementId>,
    links: Vec<Option<ElementId>>,
    core: Option<ElementId>,

    particles: Vec<Particle>,
    center: na::Vector2<f32>,
}

impl Particles {
    pub fn new(base: Base) -> Particles {
        Particles {
            base,
            group: None,
            links: Vec::new(),
            core: None,
            particles: Vec::new(),
            center: na::Vector2::new(CENTER, CENTER),
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn alive(&self) -> usize {
        self.particles.iter().filter(|p| p.alive).count()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.alive)
    }

    fn spawn(rng: &mut impl Rng, p: &mut Particle) {
        p.pos = na::Vector2::new(rng.gen::<f32>() * VIEW, rng.gen::<f32>() * VIEW);
        p.vel = na::Vector2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 4.0;
        p.z = rng.gen();
        p.size = rng.gen::<f32>() * 8.0 + 2.0;
        p.age = 0.0;
        p.lifespan = rng.gen_range(3.0..8.0);
        p.alive = true;
    }

    /// Reflect off the walls, the position ends up inside the view
    fn collide(p: &mut Particle) {
        for axis in 0..2 {
            if p.pos[axis] < 0.0 {
                p.pos[axis] = (-p.pos[axis]).min(VIEW);
                p.vel[axis] = p.vel[axis].abs() * RESTITUTION;
            } else if p.pos[axis] > VIEW {
                p.pos[axis] = (2.0 * VIEW - p.pos[axis]).max(0.0);
                p.vel[axis] = -p.vel[axis].abs() * RESTITUTION;
            }
        }
    }
}

impl Animation for Particles {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let cap = self.base.options().scaled(MAX_PARTICLES);
        let links = self.base.options().scaled(MAX_LINKS);

        self.group = self.base.group(surface, "animation-particles");
        let group = self.group;

        // Links first so they render below the particles
        self.links = (0..links)
            .map(|_| {
                group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Line,
                        Some(g),
                        &[
                            ("stroke", "white".into()),
                            ("stroke-width", 1.0.into()),
                            ("stroke-opacity", 0.0.into()),
                        ],
                    )
                })
            })
            .collect();

        if self.base.options().enable_glow {
            self.core = group.and_then(|g| {
                self.base.create(
                    surface,
                    Shape::Circle,
                    Some(g),
                    &[
                        ("cx", CENTER.into()),
                        ("cy", CENTER.into()),
                        ("r", 6.0.into()),
                        ("fill", "white".into()),
                        ("fill-opacity", 0.0.into()),
                    ],
                )
            });
        }

        // Pool starts 60% full, beats fill it up
        let initial = (cap * 3 / 5).max(1);
        self.particles = (0..cap)
            .map(|i| {
                let element = group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[
                            ("r", 0.0.into()),
                            ("fill", "white".into()),
                            ("fill-opacity", 0.0.into()),
                        ],
                    )
                });
                let mut p = Particle {
                    pos: na::Vector2::new(CENTER, CENTER),
                    vel: na::Vector2::zeros(),
                    z: 0.5,
                    size: 0.0,
                    age: 0.0,
                    lifespan: 1.0,
                    alive: false,
                    element,
                };
                if i < initial {
                    Particles::spawn(self.base.rng(), &mut p);
                    // Spread the ages so they do not all respawn at once
                    p.age = self.base.rng().gen::<f32>() * p.lifespan;
                }
                p
            })
            .collect();

        self.center = na::Vector2::new(CENTER, CENTER);
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let steps = frame.steps();
        let t = frame.time;

        self.center = na::Vector2::new(
            CENTER + (t * 0.3).sin() * 120.0,
            CENTER + (t * 0.23).cos() * 120.0,
        );

        if frame.beat {
            let mut spawned = 0;
            let rng = &mut self.base.rng;
            for p in self.particles.iter_mut().filter(|p| !p.alive).take(BURST) {
                Particles::spawn(rng, p);
                spawned += 1;
            }
            log::trace!("particles: burst of {}", spawned);
        }

        let pull = frame.bass * 0.15;
        let mut degenerate = false;
        for p in self.particles.iter_mut().filter(|p| p.alive) {
            let to_center = self.center - p.pos;
            let dist = to_center.norm().max(1.0);
            p.vel += to_center / dist * pull * steps;
            p.vel *= 0.995f32.powf(steps);
            let speed = p.vel.norm();
            if speed > MAX_SPEED {
                p.vel *= MAX_SPEED / speed;
            }

            let drive = na::Vector2::new(1.0 + frame.bass * 0.5, 1.0 + frame.mid * 0.3);
            p.pos += p.vel.component_mul(&drive) * steps;
            Particles::collide(p);

            p.age += frame.dt;
            if p.age > p.lifespan {
                Particles::spawn(&mut self.base.rng, p);
            }

            if !(p.pos.x.is_finite() && p.pos.y.is_finite()) {
                Particles::spawn(&mut self.base.rng, p);
                degenerate = true;
            }
        }

        let color = self.base.options().color(frame, 0.0);
        let depth = self.base.options().enable_3d;
        for p in self.particles.iter() {
            if !p.alive {
                put(surface, p.element, "fill-opacity", 0.0);
                continue;
            }
            let life = (p.age / p.lifespan).min(1.0);
            let scale = if depth { 0.6 + p.z * 0.8 } else { 1.0 };
            put(surface, p.element, "cx", p.pos.x);
            put(surface, p.element, "cy", p.pos.y);
            put(surface, p.element, "r", p.size * scale * (1.0 + frame.high * 0.5));
            put(surface, p.element, "fill-opacity", 0.8 * (1.0 - life * 0.5));
            put(surface, p.element, "fill", color.clone());
        }

        let alive = self
            .particles
            .iter()
            .filter(|p| p.alive)
            .collect::<Vec<_>>();
        let mut links = self.links.iter();
        'pairs: for (i, a) in alive.iter().enumerate() {
            for b in alive[i + 1..].iter() {
                let d = (a.pos - b.pos).norm();
                if d >= LINK_DISTANCE {
                    continue;
                }
                let link = match links.next() {
                    Some(l) => *l,
                    None => break 'pairs,
                };
                put(surface, link, "x1", a.pos.x);
                put(surface, link, "y1", a.pos.y);
                put(surface, link, "x2", b.pos.x);
                put(surface, link, "y2", b.pos.y);
                put(
                    surface,
                    link,
                    "stroke-opacity",
                    (1.0 - d / LINK_DISTANCE) * 0.5 * (0.5 + frame.high),
                );
            }
        }
        for link in links {
            put(surface, *link, "stroke-opacity", 0.0);
        }

        put(surface, self.core, "cx", self.center.x);
        put(surface, self.core, "cy", self.center.y);
        put(surface, self.core, "r", 6.0 + frame.bass * 18.0);
        put(surface, self.core, "fill-opacity", frame.bass * 0.6);

        if degenerate {
            return Err(crate::Error::Degenerate {
                style: "particles",
                what: "particle position",
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.group = None;
        self.core = None;
        self.links.clear();
        self.particles.clear();
        self.center = na::Vector2::new(CENTER, CENTER);
    }
}
