//! Crystal lattice with floating crystals, refraction rays and diffraction rings
//!
//! The lattice is a 3D grid of points projected onto the view.  Each point swings
//! around its rest position, one axis per band, and the lattice as a whole slowly
//! rotates.  Bonds connect grid neighbors and fade as they stretch.
use std::f32::consts::PI;

use nalgebra as na;
use rand::Rng;

use crate::animation::{put, Animation, Base, CENTER};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const GRID: (usize, usize, usize) = (6, 6, 4);
const SPACING: f32 = 60.0;
const SWING: f32 = 12.0;
const FOCAL: f32 = 600.0;
const CRYSTALS: usize = 12;
const RAYS: usize = 12;
const RINGS: usize = 5;

#[derive(Debug, Clone)]
pub struct LatticePoint {
    pub rest: na::Vector3<f32>,
    pub pos: na::Vector3<f32>,
    phase: f32,
    element: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    element: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct CrystalShard {
    pub pos: na::Vector2<f32>,
    pub vel: na::Vector2<f32>,
    pub rotation: f32,
    pub spin: f32,
    pub size: f32,
    group: Option<ElementId>,
    facet: Option<ElementId>,
}

#[derive(Debug, Clone)]
struct Ring {
    radius: f32,
    /// Remaining life, 0 means idle
    life: f32,
    element: Option<ElementId>,
}

#[derive(Debug)]
pub struct Crystal {
    base: Base,

    points: Vec<LatticePoint>,
    bonds: Vec<Bond>,
    shards: Vec<CrystalShard>,
    rays: Vec<Option<ElementId>>,
    rings: Vec<Ring>,

    /// Rotation of the lattice around the vertical axis
    yaw: f32,
    clock: f32,
}

/// Perspective projection of a point relative to the lattice center
pub fn project(p: &na::Vector3<f32>) -> (f32, f32, f32) {
    let scale = FOCAL / (FOCAL + p.z).max(1.0);
    (CENTER + p.x * scale, CENTER + p.y * scale, scale)
}

impl Crystal {
    pub fn new(base: Base) -> Crystal {
        Crystal {
            base,
            points: Vec::new(),
            bonds: Vec::new(),
            shards: Vec::new(),
            rays: Vec::new(),
            rings: Vec::new(),
            yaw: 0.0,
            clock: 0.0,
        }
    }

    pub fn points(&self) -> &[LatticePoint] {
        &self.points
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn shards(&self) -> &[CrystalShard] {
        &self.shards
    }

    /// Number of diffraction rings currently expanding
    pub fn active_rings(&self) -> usize {
        self.rings.iter().filter(|r| r.life > 0.0).count()
    }

    fn lattice(&mut self, surface: &mut dyn Surface) {
        let (nx, ny, nz) = GRID;
        let offset = na::Vector3::new(
            (nx - 1) as f32 * SPACING / 2.0,
            (ny - 1) as f32 * SPACING / 2.0,
            (nz - 1) as f32 * SPACING / 2.0,
        );
        let index = |x: usize, y: usize, z: usize| (z * ny + y) * nx + x;

        let group = self.base.group(surface, "animation-lattice");

        // Bonds first so the points render on top
        self.bonds = Vec::new();
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let a = index(x, y, z);
                    let mut neighbors = Vec::with_capacity(3);
                    if x + 1 < nx {
                        neighbors.push(index(x + 1, y, z));
                    }
                    if y + 1 < ny {
                        neighbors.push(index(x, y + 1, z));
                    }
                    if z + 1 < nz {
                        neighbors.push(index(x, y, z + 1));
                    }
                    for b in neighbors {
                        let element = group.and_then(|g| {
                            self.base.create(
                                surface,
                                Shape::Line,
                                Some(g),
                                &[("stroke", "white".into()), ("stroke-width", 1.0.into())],
                            )
                        });
                        self.bonds.push(Bond { a, b, element });
                    }
                }
            }
        }

        self.points = Vec::with_capacity(nx * ny * nz);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let rest = na::Vector3::new(x as f32, y as f32, z as f32) * SPACING - offset;
                    let phase = self.base.rng().gen::<f32>() * PI * 2.0;
                    let element = group.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Circle,
                            Some(g),
                            &[("r", 3.0.into()), ("fill", "white".into())],
                        )
                    });
                    self.points.push(LatticePoint {
                        rest,
                        pos: rest,
                        phase,
                        element,
                    });
                }
            }
        }
    }

    fn crystals(&mut self, surface: &mut dyn Surface) {
        let container = self.base.group(surface, "animation-crystals");
        let count = self.base.options().scaled(CRYSTALS);

        self.shards = (0..count)
            .map(|i| {
                let rng = self.base.rng();
                let pos = na::Vector2::new(rng.gen_range(60.0..540.0), rng.gen_range(60.0..540.0));
                let vel = na::Vector2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
                let spin = rng.gen_range(-1.0..1.0);
                let size = rng.gen_range(12.0..28.0);
                let sides = rng.gen_range(5..8);

                let outline = crate::helpers::points((0..sides).map(|k| {
                    let a = k as f32 / sides as f32 * PI * 2.0;
                    (a.cos() * size, a.sin() * size)
                }));
                let group = container.and_then(|c| {
                    self.base.create(
                        surface,
                        Shape::Group,
                        Some(c),
                        &[("id", format!("crystal-{}", i).into())],
                    )
                });
                group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Polygon,
                        Some(g),
                        &[
                            ("points", outline.into()),
                            ("fill", "white".into()),
                            ("fill-opacity", 0.25.into()),
                            ("stroke", "white".into()),
                        ],
                    )
                });
                let facet = group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Line,
                        Some(g),
                        &[
                            ("x1", (-size).into()),
                            ("y1", 0.0.into()),
                            ("x2", size.into()),
                            ("y2", 0.0.into()),
                            ("stroke", "white".into()),
                            ("stroke-opacity", 0.5.into()),
                        ],
                    )
                });

                CrystalShard {
                    pos,
                    vel,
                    rotation: 0.0,
                    spin,
                    size,
                    group,
                    facet,
                }
            })
            .collect();
    }
}

impl Animation for Crystal {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        self.lattice(surface);
        self.crystals(surface);

        let refraction = self.base.group(surface, "animation-refraction");
        self.rays = (0..RAYS)
            .map(|_| {
                refraction.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Line,
                        Some(g),
                        &[
                            ("x1", CENTER.into()),
                            ("y1", CENTER.into()),
                            ("stroke", "white".into()),
                            ("stroke-opacity", 0.0.into()),
                        ],
                    )
                })
            })
            .collect();

        let diffraction = self.base.group(surface, "animation-diffraction");
        self.rings = (0..RINGS)
            .map(|_| Ring {
                radius: 0.0,
                life: 0.0,
                element: diffraction.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[
                            ("cx", CENTER.into()),
                            ("cy", CENTER.into()),
                            ("r", 0.0.into()),
                            ("fill", "none".into()),
                            ("stroke", "white".into()),
                            ("stroke-opacity", 0.0.into()),
                        ],
                    )
                }),
            })
            .collect();

        self.yaw = 0.0;
        self.clock = 0.0;
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let dt = frame.dt;
        let steps = frame.steps();
        self.clock += dt;
        self.yaw = (self.yaw + dt * (0.2 + frame.mid * 0.8)) % (PI * 2.0);
        let rotation = na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), self.yaw);

        // Lattice
        let t = self.clock;
        for p in self.points.iter_mut() {
            let swing = na::Vector3::new(
                (t * 2.0 + p.phase).sin() * frame.bass,
                (t * 3.0 + p.phase).sin() * frame.mid,
                (t * 5.0 + p.phase).sin() * frame.high,
            ) * SWING;
            p.pos = rotation * (p.rest + swing);

            let (x, y, scale) = project(&p.pos);
            put(surface, p.element, "cx", x);
            put(surface, p.element, "cy", y);
            put(surface, p.element, "r", (2.0 + frame.high * 3.0) * scale);
            put(surface, p.element, "fill-opacity", (0.3 + 0.5 * scale).min(1.0));
        }

        let color = self.base.options().color(frame, 0.0);
        for bond in self.bonds.iter() {
            let (pa, pb) = (&self.points[bond.a].pos, &self.points[bond.b].pos);
            let stretch = ((pa - pb).norm() - SPACING).abs() / SPACING;
            let (x1, y1, _) = project(pa);
            let (x2, y2, _) = project(pb);
            put(surface, bond.element, "x1", x1);
            put(surface, bond.element, "y1", y1);
            put(surface, bond.element, "x2", x2);
            put(surface, bond.element, "y2", y2);
            put(
                surface,
                bond.element,
                "stroke-opacity",
                (0.4 - stretch * 2.0).max(0.05),
            );
            put(surface, bond.element, "stroke", color.clone());
        }

        // Crystals drift and bounce inside the view
        for (i, shard) in self.shards.iter_mut().enumerate() {
            shard.pos += shard.vel * steps * (1.0 + frame.bass);
            for axis in 0..2 {
                if shard.pos[axis] < shard.size {
                    shard.pos[axis] = shard.size;
                    shard.vel[axis] = shard.vel[axis].abs();
                } else if shard.pos[axis] > 600.0 - shard.size {
                    shard.pos[axis] = 600.0 - shard.size;
                    shard.vel[axis] = -shard.vel[axis].abs();
                }
            }
            shard.rotation = (shard.rotation + shard.spin * steps * (1.0 + frame.high * 3.0)) % 360.0;
            let scale = 1.0 + frame.bass * 0.3 + if frame.beat { 0.2 } else { 0.0 };

            put(
                surface,
                shard.group,
                "transform",
                format!(
                    "translate({:.1},{:.1}) rotate({:.1}) scale({:.2})",
                    shard.pos.x, shard.pos.y, shard.rotation, scale
                ),
            );
            put(
                surface,
                shard.facet,
                "stroke",
                self.base.options().color(frame, i as f32 * 30.0),
            );
        }

        // Rays from the center through the crystals
        for (k, ray) in self.rays.iter().enumerate() {
            match self.shards.get(k) {
                Some(shard) => {
                    let dir = shard.pos - na::Vector2::new(CENTER, CENTER);
                    let end = na::Vector2::new(CENTER, CENTER) + dir * 1.6;
                    put(surface, *ray, "x2", end.x);
                    put(surface, *ray, "y2", end.y);
                    put(surface, *ray, "stroke-opacity", frame.high * 0.6);
                    put(surface, *ray, "stroke-width", 1.0 + frame.high * 2.0);
                }
                None => put(surface, *ray, "stroke-opacity", 0.0),
            }
        }

        // Diffraction rings start on beats and fade out
        if frame.beat {
            if let Some(ring) = self.rings.iter_mut().find(|r| r.life <= 0.0) {
                ring.life = 1.0;
                ring.radius = 10.0;
            }
        }
        for ring in self.rings.iter_mut() {
            if ring.life <= 0.0 {
                put(surface, ring.element, "stroke-opacity", 0.0);
                continue;
            }
            ring.radius += steps * (3.0 + frame.bass * 4.0);
            ring.life = (ring.life - dt * 0.8).max(0.0);
            put(surface, ring.element, "r", ring.radius);
            put(surface, ring.element, "stroke-opacity", ring.life * 0.7);
            put(surface, ring.element, "stroke-width", 1.0 + ring.life * 3.0);
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.points.clear();
        self.bonds.clear();
        self.shards.clear();
        self.rays.clear();
        self.rings.clear();
        self.yaw = 0.0;
        self.clock = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    fn crystal(scene: &mut Scene) -> Crystal {
        let mut c = Crystal::new(Base::new(Style::Crystal, Options::default()));
        c.build(scene);
        c
    }

    #[test]
    fn test_containers() {
        let mut scene = Scene::new();
        let _c = crystal(&mut scene);

        for name in [
            "animation-crystals",
            "animation-lattice",
            "animation-refraction",
            "animation-diffraction",
        ]
        .iter()
        {
            assert!(scene.find(name).is_some(), "missing {}", name);
        }

        let lattice = scene.find("animation-lattice").unwrap();
        let points = scene
            .children(lattice)
            .iter()
            .filter(|id| scene.get(**id).unwrap().shape == Shape::Circle)
            .count();
        assert!(points >= 100);

        let crystals = scene.find("animation-crystals").unwrap();
        let shards = scene
            .children(crystals)
            .iter()
            .filter(|id| {
                scene
                    .attr(**id, "id")
                    .and_then(|v| v.as_text())
                    .map_or(false, |s| s.starts_with("crystal-"))
            })
            .count();
        assert!(shards >= 10);
    }

    #[test]
    fn test_bonds_connect_neighbors() {
        let mut scene = Scene::new();
        let c = crystal(&mut scene);
        let (nx, ny, nz) = GRID;
        assert_eq!(
            c.bonds().len(),
            (nx - 1) * ny * nz + nx * (ny - 1) * nz + nx * ny * (nz - 1)
        );
        for bond in c.bonds() {
            let d = (c.points()[bond.a].rest - c.points()[bond.b].rest).norm();
            assert!((d - SPACING).abs() < 1e-3);
        }
    }

    #[test]
    fn test_points_swing_around_rest() {
        let mut scene = Scene::new();
        let mut c = crystal(&mut scene);

        for i in 0..400 {
            let f = testing::frame(1.0, 1.0, 1.0, i % 10 == 0, i as f32 / 60.0);
            c.update(&f, &mut scene).unwrap();
            for p in c.points() {
                // Rotation keeps the distance from the center
                let max = p.rest.norm() + SWING * 3.0f32.sqrt();
                assert!(p.pos.norm() <= max + 1e-3);
            }
            for shard in c.shards() {
                assert!(shard.pos.x >= shard.size && shard.pos.x <= 600.0 - shard.size);
                assert!(shard.pos.y >= shard.size && shard.pos.y <= 600.0 - shard.size);
            }
        }
    }

    #[test]
    fn test_diffraction_rings() {
        let mut scene = Scene::new();
        let mut c = crystal(&mut scene);

        for i in 0..3 {
            c.update(&testing::frame(0.5, 0.5, 0.5, true, i as f32), &mut scene)
                .unwrap();
        }
        assert_eq!(c.active_rings(), 3);

        let mut f = testing::frame(0.5, 0.5, 0.5, false, 4.0);
        f.dt = 0.25;
        for _ in 0..6 {
            c.update(&f, &mut scene).unwrap();
        }
        assert_eq!(c.active_rings(), 0);
    }

    #[test]
    fn test_projection() {
        let (x, y, s) = project(&na::Vector3::new(0.0, 0.0, 0.0));
        assert_eq!((x, y, s), (CENTER, CENTER, 1.0));

        let (_, _, far) = project(&na::Vector3::new(0.0, 0.0, 300.0));
        let (_, _, near) = project(&na::Vector3::new(0.0, 0.0, -300.0));
        assert!(far < 1.0 && near > 1.0);
    }
}
