//! Star clusters drifting between gravity wells
//!
//! Nodes belong to clusters and swing around their rest offset inside it.  The
//! clusters themselves are pulled around by a few orbiting gravity wells.  Nearby
//! nodes get linked by short-lived connections which fade out over a few ticks.
use std::f32::consts::PI;

use nalgebra as na;
use rand::Rng;

use crate::animation::{put, Animation, Base, CENTER, VIEW};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const NODES: usize = 120;
const CLUSTERS: usize = 6;
const WELLS: usize = 3;
const WELL_ORBIT: f32 = 180.0;
const GRAVITY: f32 = 400.0;
/// Keeps the pull finite right on top of a well
const SOFTENING: f32 = 400.0;
const DAMPING: f32 = 0.98;
const MAX_SPEED: f32 = 4.0;
const MAX_CONNECTIONS: usize = 40;
const CONNECT_DISTANCE: f32 = 90.0;
/// Connection life lost per second
const FADE: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct Star {
    pub cluster: usize,
    /// Offset from the cluster center before rotation
    pub rest: na::Vector2<f32>,
    pub pos: na::Vector2<f32>,
    phase: f32,
    element: Option<ElementId>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub pos: na::Vector2<f32>,
    pub vel: na::Vector2<f32>,
    pub rotation: f32,
    pub spin: f32,
    group: Option<ElementId>,
    core: Option<ElementId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Well {
    pub pos: na::Vector2<f32>,
    pub mass: f32,
}

/// Transient link between two stars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    /// `(0, 1]` while alive
    pub life: f32,
}

/// Acceleration at `pos` caused by `wells`
pub fn pull(pos: &na::Vector2<f32>, wells: &[Well]) -> na::Vector2<f32> {
    wells.iter().fold(na::Vector2::zeros(), |acc, well| {
        let d = well.pos - pos;
        let r2 = d.norm_squared() + SOFTENING;
        acc + d * (GRAVITY * well.mass / (r2 * r2.sqrt()))
    })
}

#[derive(Debug)]
pub struct Galaxy {
    base: Base,

    stars: Vec<Star>,
    clusters: Vec<Cluster>,
    wells: Vec<Well>,
    well_elements: Vec<Option<ElementId>>,
    connections: Vec<Option<Connection>>,
    lines: Vec<Option<ElementId>>,

    orbit: f32,
    clock: f32,
}

impl Galaxy {
    pub fn new(base: Base) -> Galaxy {
        Galaxy {
            base,
            stars: Vec::new(),
            clusters: Vec::new(),
            wells: Vec::new(),
            well_elements: Vec::new(),
            connections: Vec::new(),
            lines: Vec::new(),
            orbit: 0.0,
            clock: 0.0,
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn wells(&self) -> &[Well] {
        &self.wells
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    fn place_wells(&mut self, bass: f32) {
        for (i, well) in self.wells.iter_mut().enumerate() {
            let a = self.orbit + i as f32 * PI * 2.0 / WELLS as f32;
            well.pos = na::Vector2::new(CENTER + a.cos() * WELL_ORBIT, CENTER + a.sin() * WELL_ORBIT);
            well.mass = 1.0 + bass * 2.0;
        }
    }

    fn linked(&self, a: usize, b: usize) -> bool {
        self.connections()
            .any(|c| (c.a == a && c.b == b) || (c.a == b && c.b == a))
    }

    /// Try to link `attempts` random star pairs that are close enough and not yet linked
    fn connect(&mut self, attempts: usize) {
        let n = self.stars.len();
        if n < 2 {
            return;
        }

        for _ in 0..attempts {
            let slot = match self.connections.iter().position(|c| c.is_none()) {
                Some(slot) => slot,
                None => return,
            };
            let a = self.base.rng.gen_range(0..n);
            let b = self.base.rng.gen_range(0..n);
            if a == b
                || (self.stars[a].pos - self.stars[b].pos).norm() > CONNECT_DISTANCE
                || self.linked(a, b)
            {
                continue;
            }
            self.connections[slot] = Some(Connection { a, b, life: 1.0 });
        }
    }
}

impl Animation for Galaxy {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        self.orbit = 0.0;
        self.clock = 0.0;

        let wells = self.base.group(surface, "animation-gravity-wells");
        self.wells = vec![
            Well {
                pos: na::Vector2::new(CENTER, CENTER),
                mass: 1.0,
            };
            WELLS
        ];
        self.place_wells(0.0);
        self.well_elements = self
            .wells
            .iter()
            .map(|well| {
                wells.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[
                            ("cx", well.pos.x.into()),
                            ("cy", well.pos.y.into()),
                            ("r", 20.0.into()),
                            ("fill", "black".into()),
                            ("stroke", "white".into()),
                            ("stroke-opacity", 0.3.into()),
                        ],
                    )
                })
            })
            .collect();

        let connections = self.base.group(surface, "animation-quantum-connections");
        self.lines = (0..MAX_CONNECTIONS)
            .map(|_| {
                connections.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Line,
                        Some(g),
                        &[("stroke", "white".into()), ("stroke-opacity", 0.0.into())],
                    )
                })
            })
            .collect();
        self.connections = vec![None; MAX_CONNECTIONS];

        let clusters = self.base.group(surface, "animation-galaxy-clusters");
        self.clusters = (0..CLUSTERS)
            .map(|i| {
                let rng = self.base.rng();
                let a = i as f32 / CLUSTERS as f32 * PI * 2.0;
                let pos = na::Vector2::new(CENTER + a.cos() * 120.0, CENTER + a.sin() * 120.0);
                // Start on a rough orbit around the center
                let vel = na::Vector2::new(-a.sin(), a.cos()) * rng.gen_range(0.5f32..1.5);
                let spin = rng.gen_range(-1.0..1.0);

                let group = clusters.and_then(|c| {
                    self.base.create(
                        surface,
                        Shape::Group,
                        Some(c),
                        &[("id", format!("galaxy-cluster-{}", i).into())],
                    )
                });
                let arm = crate::helpers::polyline((0..24).map(|k| {
                    let t = k as f32 / 23.0;
                    let r = t * 50.0;
                    let phi = t * PI * 3.0;
                    (phi.cos() * r, phi.sin() * r)
                }));
                group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Path,
                        Some(g),
                        &[
                            ("d", arm.into()),
                            ("fill", "none".into()),
                            ("stroke", "white".into()),
                            ("stroke-opacity", 0.3.into()),
                        ],
                    )
                });
                let core = group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Circle,
                        Some(g),
                        &[("r", 8.0.into()), ("fill", "white".into())],
                    )
                });

                Cluster {
                    pos,
                    vel,
                    rotation: 0.0,
                    spin,
                    group,
                    core,
                }
            })
            .collect();

        let nodes = self.base.group(surface, "animation-neural-galaxy");
        self.stars = (0..NODES)
            .map(|i| {
                let rng = self.base.rng();
                let r = rng.gen::<f32>().sqrt() * 70.0;
                let a = rng.gen::<f32>() * PI * 2.0;
                let phase = rng.gen::<f32>() * PI * 2.0;
                let cluster = i % CLUSTERS;
                let rest = na::Vector2::new(a.cos() * r, a.sin() * r);

                Star {
                    cluster,
                    rest,
                    pos: self.clusters[cluster].pos + rest,
                    phase,
                    element: nodes.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Circle,
                            Some(g),
                            &[("r", 2.0.into()), ("fill", "white".into())],
                        )
                    }),
                }
            })
            .collect();
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let dt = frame.dt;
        let steps = frame.steps();
        self.clock += dt;
        self.orbit = (self.orbit + dt * (0.1 + frame.mid * 0.3)) % (PI * 2.0);
        self.place_wells(frame.bass);

        for cluster in self.clusters.iter_mut() {
            let acc = pull(&cluster.pos, &self.wells);
            cluster.vel = (cluster.vel + acc * steps) * DAMPING.powf(steps);
            let speed = cluster.vel.norm();
            if speed > MAX_SPEED {
                cluster.vel *= MAX_SPEED / speed;
            }
            cluster.pos += cluster.vel * steps;
            for axis in 0..2 {
                if cluster.pos[axis] < 0.0 {
                    cluster.pos[axis] = 0.0;
                    cluster.vel[axis] = cluster.vel[axis].abs();
                } else if cluster.pos[axis] > VIEW {
                    cluster.pos[axis] = VIEW;
                    cluster.vel[axis] = -cluster.vel[axis].abs();
                }
            }
            cluster.rotation = (cluster.rotation + cluster.spin * dt * (1.0 + frame.high * 2.0)) % (PI * 2.0);

            if !cluster.pos.iter().all(|v| v.is_finite()) {
                return Err(crate::Error::Degenerate {
                    style: "galaxy",
                    what: "cluster position",
                });
            }
        }

        let t = self.clock;
        for star in self.stars.iter_mut() {
            let cluster = &self.clusters[star.cluster];
            let rotation = na::Rotation2::new(cluster.rotation);
            let swing = na::Vector2::new(
                (t * 2.0 + star.phase).sin() * frame.bass,
                (t * 3.0 + star.phase).cos() * frame.mid,
            ) * 8.0;
            let breathe = 1.0 + (t * 5.0 + star.phase).sin() * frame.high * 0.2;
            star.pos = cluster.pos + rotation * (star.rest * breathe + swing);
        }

        // Connections
        for c in self.connections.iter_mut() {
            if let Some(conn) = c {
                conn.life -= dt * FADE;
                if conn.life <= 0.0 {
                    *c = None;
                }
            }
        }
        let attempts = (frame.high * 6.0).round() as usize + if frame.beat { 8 } else { 0 };
        self.connect(attempts);

        for (slot, line) in self.connections.iter().zip(self.lines.iter()) {
            match slot {
                Some(conn) => {
                    let (a, b) = (&self.stars[conn.a].pos, &self.stars[conn.b].pos);
                    let strength = (1.0 - (a - b).norm() / (CONNECT_DISTANCE * 2.0)).max(0.0);
                    put(surface, *line, "x1", a.x);
                    put(surface, *line, "y1", a.y);
                    put(surface, *line, "x2", b.x);
                    put(surface, *line, "y2", b.y);
                    put(surface, *line, "stroke-opacity", conn.life * strength * 0.8);
                }
                None => put(surface, *line, "stroke-opacity", 0.0),
            }
        }

        // Render
        for star in self.stars.iter() {
            put(surface, star.element, "cx", star.pos.x);
            put(surface, star.element, "cy", star.pos.y);
            put(surface, star.element, "r", 1.5 + frame.high * 2.0);
        }

        for (i, cluster) in self.clusters.iter().enumerate() {
            put(
                surface,
                cluster.group,
                "transform",
                format!(
                    "translate({:.1},{:.1}) rotate({:.1})",
                    cluster.pos.x,
                    cluster.pos.y,
                    cluster.rotation.to_degrees()
                ),
            );
            put(surface, cluster.core, "r", 6.0 + frame.bass * 8.0);
            put(
                surface,
                cluster.core,
                "fill",
                self.base.options().color(frame, i as f32 * 60.0),
            );
        }

        for (well, element) in self.wells.iter().zip(self.well_elements.iter()) {
            put(surface, *element, "cx", well.pos.x);
            put(surface, *element, "cy", well.pos.y);
            put(surface, *element, "r", 10.0 + well.mass * 8.0);
            put(surface, *element, "stroke-opacity", 0.2 + frame.bass * 0.6);
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.stars.clear();
        self.clusters.clear();
        self.wells.clear();
        self.well_elements.clear();
        self.connections.clear();
        self.lines.clear();
        self.orbit = 0.0;
        self.clock = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    fn galaxy(scene: &mut Scene) -> Galaxy {
        let mut g = Galaxy::new(Base::new(Style::Galaxy, Options::default()));
        g.build(scene);
        g
    }

    #[test]
    fn test_containers() {
        let mut scene = Scene::new();
        let _g = galaxy(&mut scene);

        let nodes = scene.find("animation-neural-galaxy").unwrap();
        assert!(scene.children(nodes).len() >= 100);

        let clusters = scene.find("animation-galaxy-clusters").unwrap();
        let named = scene
            .children(clusters)
            .iter()
            .filter(|id| {
                scene
                    .attr(**id, "id")
                    .and_then(|v| v.as_text())
                    .map_or(false, |s| s.starts_with("galaxy-cluster-"))
            })
            .count();
        assert!(named >= 5);

        let wells = scene.find("animation-gravity-wells").unwrap();
        assert!(scene.children(wells).len() >= 3);
        assert!(scene.find("animation-quantum-connections").is_some());
    }

    #[test]
    fn test_pull_points_at_well() {
        let wells = [Well {
            pos: na::Vector2::new(100.0, 0.0),
            mass: 1.0,
        }];
        let acc = pull(&na::Vector2::new(0.0, 0.0), &wells);
        assert!(acc.x > 0.0 && acc.y.abs() < 1e-6);

        // Finite right on top of the well
        let on_top = pull(&na::Vector2::new(100.0, 0.0), &wells);
        assert_eq!(on_top, na::Vector2::zeros());

        let far = pull(&na::Vector2::new(-300.0, 0.0), &wells);
        assert!(far.norm() < acc.norm());
    }

    #[test]
    fn test_clusters_stay_in_view() {
        let mut scene = Scene::new();
        let mut g = galaxy(&mut scene);

        testing::drive(&mut g, &mut scene, 600);
        for cluster in g.clusters() {
            assert!(cluster.pos.x >= 0.0 && cluster.pos.x <= VIEW);
            assert!(cluster.pos.y >= 0.0 && cluster.pos.y <= VIEW);
            assert!(cluster.vel.norm() <= MAX_SPEED + 1e-3);
        }
        assert_eq!(g.wells().len(), WELLS);
    }

    #[test]
    fn test_pairs_link_once() {
        let mut scene = Scene::new();
        let mut g = galaxy(&mut scene);

        // Three stars on one spot leave exactly three possible pairs
        g.stars.truncate(3);
        for star in g.stars.iter_mut() {
            star.pos = na::Vector2::new(CENTER, CENTER);
        }
        g.connect(500);

        let mut pairs = g
            .connections()
            .map(|c| (c.a.min(c.b), c.a.max(c.b)))
            .collect::<Vec<_>>();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_connections_fade() {
        let mut scene = Scene::new();
        let mut g = galaxy(&mut scene);

        for i in 0..30 {
            g.update(&testing::frame(0.5, 0.5, 1.0, true, i as f32 / 60.0), &mut scene)
                .unwrap();
        }
        let alive = g.connections().count();
        assert!(alive > 0 && alive <= MAX_CONNECTIONS);
        let mut pairs = Vec::new();
        for c in g.connections() {
            assert!(c.life > 0.0 && c.life <= 1.0);
            assert_ne!(c.a, c.b);
            pairs.push((c.a.min(c.b), c.a.max(c.b)));
        }
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), alive);

        // Silence spawns nothing, so everything fades out
        let mut f = testing::frame(0.0, 0.0, 0.0, false, 1.0);
        f.dt = 0.1;
        for _ in 0..10 {
            g.update(&f, &mut scene).unwrap();
        }
        assert_eq!(g.connections().count(), 0);

        let connections = scene.find("animation-quantum-connections").unwrap();
        for line in scene.children(connections) {
            assert_eq!(scene.number(*line, "stroke-opacity"), Some(0.0));
        }
    }
}
