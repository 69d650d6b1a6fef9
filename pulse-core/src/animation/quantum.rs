//! Particles on quantized orbits
//!
//! Every particle sits on one of a few discrete energy levels.  Treble excites
//! particles to higher levels, they decay back on their own.  Between beats the
//! positions are smeared out (superposition), a beat collapses them onto their
//! orbit.  Particles come in entangled pairs: the follower always mirrors its
//! leader on the opposite side of the nucleus.
use std::f32::consts::PI;

use rand::Rng;

use crate::animation::{put, Animation, Base, CENTER};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

pub const LEVELS: usize = 4;
const PAIRS: usize = 12;
/// Excitation probability per second at full treble
const EXCITE_RATE: f32 = 0.8;
/// Spontaneous decay probability per second
const DECAY_RATE: f32 = 0.3;
/// Collapse fades out over this many seconds
const COLLAPSE_TIME: f32 = 0.66;
const UNCERTAINTY: f32 = 12.0;

pub fn orbit_radius(level: usize) -> f32 {
    60.0 + level as f32 * 50.0
}

#[derive(Debug, Clone)]
pub struct Qubit {
    pub level: usize,
    pub angle: f32,
    pub speed: f32,
    pub pos: (f32, f32),
    element: Option<ElementId>,
}

#[derive(Debug)]
pub struct Quantum {
    base: Base,

    nucleus: Option<ElementId>,
    clouds: Vec<Option<ElementId>>,
    links: Vec<Option<ElementId>>,

    /// Leaders at even, followers at odd indices
    qubits: Vec<Qubit>,
    /// 1 right after a beat, 0 in full superposition
    collapse: f32,
}

impl Quantum {
    pub fn new(base: Base) -> Quantum {
        Quantum {
            base,
            nucleus: None,
            clouds: Vec::new(),
            links: Vec::new(),
            qubits: Vec::new(),
            collapse: 0.0,
        }
    }

    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    pub fn collapse(&self) -> f32 {
        self.collapse
    }

    /// Number of particles on each level
    pub fn occupancy(&self) -> [usize; LEVELS] {
        let mut out = [0; LEVELS];
        for q in self.qubits.iter() {
            out[q.level] += 1;
        }
        out
    }
}

impl Animation for Quantum {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let pairs = self.base.options().scaled(PAIRS);

        let clouds = self.base.group(surface, "animation-quantum-clouds");
        self.clouds = (0..LEVELS)
            .map(|level| {
                clouds.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[
                            ("cx", CENTER.into()),
                            ("cy", CENTER.into()),
                            ("r", orbit_radius(level).into()),
                            ("fill", "none".into()),
                            ("stroke", "white".into()),
                            ("stroke-width", 30.0.into()),
                            ("stroke-opacity", 0.05.into()),
                        ],
                    )
                })
            })
            .collect();

        self.nucleus = self.base.create(
            surface,
            Shape::Circle,
            None,
            &[
                ("id", "animation-quantum-nucleus".into()),
                ("cx", CENTER.into()),
                ("cy", CENTER.into()),
                ("r", 14.0.into()),
                ("fill", "white".into()),
            ],
        );

        let links = self.base.group(surface, "animation-quantum-entanglement");
        self.links = (0..pairs)
            .map(|_| {
                links.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Line,
                        Some(g),
                        &[
                            ("stroke", "white".into()),
                            ("stroke-dasharray", "4 6".into()),
                            ("stroke-opacity", 0.2.into()),
                        ],
                    )
                })
            })
            .collect();

        let particles = self.base.group(surface, "animation-quantum-particles");
        self.qubits = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            let rng = self.base.rng();
            let level = rng.gen_range(0..LEVELS);
            let angle = rng.gen::<f32>() * PI * 2.0;
            let speed = rng.gen_range(0.6..1.4);

            for partner in 0..2 {
                let element = particles.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[("r", 5.0.into()), ("fill", "white".into())],
                    )
                });
                self.qubits.push(Qubit {
                    level,
                    angle: angle + partner as f32 * PI,
                    speed,
                    pos: (CENTER, CENTER),
                    element,
                });
            }
        }

        self.collapse = 0.0;
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let dt = frame.dt;
        if frame.beat {
            self.collapse = 1.0;
        } else {
            self.collapse = (self.collapse - dt / COLLAPSE_TIME).max(0.0);
        }

        let excite = (frame.high * EXCITE_RATE * dt).min(1.0) as f64;
        let decay = (DECAY_RATE * dt).min(1.0) as f64;
        let smear = (1.0 - self.collapse) * UNCERTAINTY * (0.5 + frame.high);
        let rng = &mut self.base.rng;

        for pair in self.qubits.chunks_mut(2) {
            let (leader, follower) = match pair {
                [l, f] => (l, f),
                _ => continue,
            };

            // Higher orbits are slower
            leader.angle = (leader.angle
                + dt * leader.speed * (1.0 + frame.mid) * 2.0 / (leader.level + 1) as f32)
                % (PI * 2.0);
            if leader.level + 1 < LEVELS && rng.gen_bool(excite) {
                leader.level += 1;
            } else if leader.level > 0 && rng.gen_bool(decay) {
                leader.level -= 1;
            }

            follower.level = leader.level;
            follower.angle = leader.angle + PI;

            for q in [leader, follower] {
                let r = orbit_radius(q.level) + (rng.gen::<f32>() - 0.5) * 2.0 * smear;
                q.pos = (CENTER + q.angle.cos() * r, CENTER + q.angle.sin() * r);
            }
        }

        let color = self.base.options().color(frame, 0.0);
        for q in self.qubits.iter() {
            put(surface, q.element, "cx", q.pos.0);
            put(surface, q.element, "cy", q.pos.1);
            put(surface, q.element, "r", 3.0 + self.collapse * 3.0 + frame.high * 2.0);
            put(surface, q.element, "fill", color.clone());
            put(surface, q.element, "fill-opacity", 0.5 + self.collapse * 0.5);
        }

        for (link, pair) in self.links.iter().zip(self.qubits.chunks(2)) {
            if let [a, b] = pair {
                put(surface, *link, "x1", a.pos.0);
                put(surface, *link, "y1", a.pos.1);
                put(surface, *link, "x2", b.pos.0);
                put(surface, *link, "y2", b.pos.1);
                put(surface, *link, "stroke-opacity", 0.1 + frame.mid * 0.4);
            }
        }

        let occupancy = self.occupancy();
        let total = self.qubits.len().max(1) as f32;
        for (level, cloud) in self.clouds.iter().enumerate() {
            let share = occupancy[level] as f32 / total;
            put(
                surface,
                *cloud,
                "stroke-opacity",
                0.03 + share * 0.5 * (1.0 - self.collapse * 0.5),
            );
            put(surface, *cloud, "stroke-width", 10.0 + smear * 2.0);
        }

        put(surface, self.nucleus, "r", 10.0 + frame.bass * 15.0);
        put(
            surface,
            self.nucleus,
            "fill",
            self.base.options().color(frame, 180.0),
        );

        Ok(())
    }

    fn reset(&mut self) {
        self.nucleus = None;
        self.clouds.clear();
        self.links.clear();
        self.qubits.clear();
        self.collapse = 0.0;
    }
}
