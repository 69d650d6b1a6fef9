//! Morphing blob inside a pulsing ring
use std::f32::consts::PI;

use crate::animation::{put, Animation, Base, CENTER};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const POINTS: usize = 60;
const RING_BASE: f32 = 120.0;
const BLOB_BASE: f32 = 120.0;
const SATELLITES: usize = 8;

#[derive(Debug)]
pub struct Blob {
    base: Base,

    ring: Option<ElementId>,
    blob: Option<ElementId>,
    glow: Option<ElementId>,
    satellites: Vec<Option<ElementId>>,

    phase: f32,
    /// Beat boost, 1 right after a beat and decaying to 0
    pulse: f32,
    radii: (f32, f32),
}

impl Blob {
    pub fn new(base: Base) -> Blob {
        Blob {
            base,
            ring: None,
            blob: None,
            glow: None,
            satellites: Vec::new(),
            phase: 0.0,
            pulse: 0.0,
            radii: (BLOB_BASE, BLOB_BASE),
        }
    }

    /// Radius of the blob outline at angle `t`
    fn radius(&self, t: f32, frame: &AudioFrame) -> f32 {
        let k_bass = 0.55 + frame.bass * 0.45 + self.pulse * 0.2;
        let k_mid = 0.55 + frame.mid * 0.35;
        let k_high = 0.5 + frame.high * 0.25;
        let p = self.phase;

        let wobble = (t * 3.0 + p).sin() * k_mid
            + (t * 5.0 - p * 0.7).cos() * k_high
            + (t * 2.0 + p * 0.5).sin() * k_bass * 0.5;

        let radius = BLOB_BASE * (0.9 + frame.bass * 0.15) * (1.0 + self.pulse * 0.08);
        radius * (1.0 + wobble * 0.15)
    }
}

impl Animation for Blob {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let center = format!("translate({},{})", CENTER, CENTER);

        self.ring = self.base.create(
            surface,
            Shape::Circle,
            None,
            &[
                ("id", "animation-ring".into()),
                ("cx", CENTER.into()),
                ("cy", CENTER.into()),
                ("r", RING_BASE.into()),
                ("fill", "none".into()),
                ("stroke", "white".into()),
                ("stroke-opacity", 0.85.into()),
                ("stroke-width", 8.0.into()),
            ],
        );

        if self.base.options().enable_glow {
            self.glow = self.base.create(
                surface,
                Shape::Path,
                None,
                &[
                    ("id", "animation-blob-glow".into()),
                    ("fill", "white".into()),
                    ("fill-opacity", 0.25.into()),
                    ("transform", center.clone().into()),
                ],
            );
        }

        self.blob = self.base.create(
            surface,
            Shape::Path,
            None,
            &[
                ("id", "animation-blob".into()),
                ("fill", "white".into()),
                ("fill-opacity", 0.92.into()),
                ("transform", center.into()),
            ],
        );

        if self.base.options().enable_particles {
            let group = self.base.group(surface, "animation-blob-satellites");
            self.satellites = (0..SATELLITES)
                .map(|_| {
                    group.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Circle,
                            Some(g),
                            &[("r", 4.0.into()), ("fill", "white".into())],
                        )
                    })
                })
                .collect();
        }
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        if frame.beat {
            self.pulse = 1.0;
        }
        self.pulse = (self.pulse - frame.dt * 4.0).max(0.0);
        self.phase += frame.dt * (0.8 + frame.mid * 1.5);

        let beat_ring = if frame.beat { 16.0 } else { self.pulse * 16.0 };
        put(surface, self.ring, "r", RING_BASE + frame.bass * 40.0 + beat_ring);
        put(surface, self.ring, "stroke-width", 6.0 + frame.mid * 12.0);
        put(surface, self.ring, "stroke", self.base.options().color(frame, 0.0));

        let mut min = std::f32::MAX;
        let mut max: f32 = 0.0;
        let coords = (0..POINTS)
            .map(|i| {
                let t = i as f32 / POINTS as f32 * PI * 2.0;
                let r = self.radius(t, frame);
                min = min.min(r);
                max = max.max(r);
                (t.cos() * r, t.sin() * r)
            })
            .collect::<Vec<_>>();
        self.radii = (min, max);

        let d = crate::helpers::closed_curve(&coords);
        put(surface, self.blob, "d", d.clone());
        put(surface, self.blob, "fill", self.base.options().color(frame, 30.0));

        if self.glow.is_some() {
            let scale = 1.08 + frame.high * 0.12 + self.pulse * 0.1;
            put(surface, self.glow, "d", d);
            put(
                surface,
                self.glow,
                "transform",
                format!("translate({},{}) scale({:.3})", CENTER, CENTER, scale),
            );
            put(surface, self.glow, "fill-opacity", 0.15 + frame.overall * 0.3);
        }

        let orbit = max + 30.0 + frame.bass * 20.0;
        for (i, s) in self.satellites.iter().enumerate() {
            let a = self.phase * (1.0 + i as f32 * 0.1) + i as f32 / SATELLITES as f32 * PI * 2.0;
            put(surface, *s, "cx", CENTER + a.cos() * orbit);
            put(surface, *s, "cy", CENTER + a.sin() * orbit);
            put(surface, *s, "r", 3.0 + frame.high * 4.0 + self.pulse * 2.0);
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.ring = None;
        self.blob = None;
        self.glow = None;
        self.satellites.clear();
        self.phase = 0.0;
        self.pulse = 0.0;
        self.radii = (BLOB_BASE, BLOB_BASE);
    }
}
