//! Layered network lighting up with the music
//!
//! The three bands feed the input layer, activations propagate forward through
//! randomly seeded weights.  Weights drift with a Hebbian rule (connections between
//! nodes that are active together grow) and decay back towards zero otherwise.
//! Beats send signal pulses travelling along the connections.
use nalgebra as na;
use rand::Rng;

use crate::animation::{put, Animation, Base};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const LAYERS: [usize; 4] = [3, 6, 6, 4];
const LEARNING_RATE: f32 = 0.5;
const WEIGHT_DECAY: f32 = 0.1;
const MAX_WEIGHT: f32 = 2.0;
const MAX_PULSES: usize = 24;
/// Connection traversals per second
const PULSE_SPEED: f32 = 2.0;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Pulse travelling from node `from` in `layer` to node `to` in `layer + 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub layer: usize,
    pub from: usize,
    pub to: usize,
    /// Position along the connection, `[0, 1)`
    pub t: f32,
}

#[derive(Debug)]
pub struct Neural {
    base: Base,

    /// `weights[l]` maps layer `l` to layer `l + 1`
    weights: Vec<na::DMatrix<f32>>,
    activations: Vec<na::DVector<f32>>,
    pulses: Vec<Pulse>,

    nodes: Vec<Vec<Option<ElementId>>>,
    edges: Vec<na::DMatrix<Option<ElementId>>>,
    pulse_dots: Vec<Option<ElementId>>,
}

impl Neural {
    pub fn new(base: Base) -> Neural {
        Neural {
            base,
            weights: Vec::new(),
            activations: Vec::new(),
            pulses: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            pulse_dots: Vec::new(),
        }
    }

    pub fn activations(&self) -> &[na::DVector<f32>] {
        &self.activations
    }

    pub fn weights(&self) -> &[na::DMatrix<f32>] {
        &self.weights
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Screen position of node `node` in layer `layer`
    pub fn position(layer: usize, node: usize) -> (f32, f32) {
        let x = 100.0 + layer as f32 * 400.0 / (LAYERS.len() - 1) as f32;
        let n = LAYERS[layer];
        let y = 300.0 + (node as f32 - (n - 1) as f32 / 2.0) * 70.0;
        (x, y)
    }

    /// Propagate `input` through the network
    pub fn forward(&mut self, input: [f32; 3]) {
        self.activations[0] = na::DVector::from_row_slice(&input);
        for l in 0..self.weights.len() {
            let z = &self.weights[l] * &self.activations[l];
            self.activations[l + 1] = z.map(|v| sigmoid(v * 2.0 - 1.0));
        }
    }

    /// Hebbian update over `dt` seconds
    fn learn(&mut self, dt: f32) {
        for (l, w) in self.weights.iter_mut().enumerate() {
            let pre = &self.activations[l];
            let post = &self.activations[l + 1];
            for i in 0..w.nrows() {
                for j in 0..w.ncols() {
                    let delta = LEARNING_RATE * post[i] * pre[j] - WEIGHT_DECAY * w[(i, j)];
                    w[(i, j)] = (w[(i, j)] + delta * dt).max(-MAX_WEIGHT).min(MAX_WEIGHT);
                }
            }
        }
    }

    fn spawn_pulses(&mut self, count: usize) {
        for _ in 0..count {
            if self.pulses.len() >= MAX_PULSES {
                break;
            }
            let rng = self.base.rng();
            let pulse = Pulse {
                layer: 0,
                from: rng.gen_range(0..LAYERS[0]),
                to: rng.gen_range(0..LAYERS[1]),
                t: 0.0,
            };
            self.pulses.push(pulse);
        }
    }

    /// Move pulses along, handing them to the next layer at each node
    fn travel(&mut self, dt: f32) {
        let last = LAYERS.len() - 1;
        let rng = &mut self.base.rng;

        for pulse in self.pulses.iter_mut() {
            pulse.t += dt * PULSE_SPEED;
            while pulse.t >= 1.0 && pulse.layer < last {
                pulse.t -= 1.0;
                pulse.layer += 1;
                if pulse.layer < last {
                    pulse.from = pulse.to;
                    pulse.to = rng.gen_range(0..LAYERS[pulse.layer + 1]);
                }
            }
        }
        self.pulses.retain(|p| p.layer < last);
    }
}

impl Animation for Neural {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let rng = self.base.rng();
        self.weights = LAYERS
            .windows(2)
            .map(|w| na::DMatrix::from_fn(w[1], w[0], |_, _| rng.gen_range(-1.0f32..1.0)))
            .collect();
        self.activations = LAYERS.iter().map(|n| na::DVector::zeros(*n)).collect();
        self.pulses.clear();

        let edges = self.base.group(surface, "animation-neural-edges");
        self.edges = LAYERS
            .windows(2)
            .enumerate()
            .map(|(l, w)| {
                na::DMatrix::from_fn(w[1], w[0], |to, from| {
                    let (x1, y1) = Neural::position(l, from);
                    let (x2, y2) = Neural::position(l + 1, to);
                    edges.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Line,
                            Some(g),
                            &[
                                ("x1", x1.into()),
                                ("y1", y1.into()),
                                ("x2", x2.into()),
                                ("y2", y2.into()),
                                ("stroke", "white".into()),
                                ("stroke-opacity", 0.1.into()),
                            ],
                        )
                    })
                })
            })
            .collect();

        let nodes = self.base.group(surface, "animation-neural-nodes");
        self.nodes = LAYERS
            .iter()
            .enumerate()
            .map(|(l, n)| {
                (0..*n)
                    .map(|i| {
                        let (x, y) = Neural::position(l, i);
                        nodes.and_then(|g| {
                            self.base.create(
                                surface,
                                Shape::Circle,
                                Some(g),
                                &[
                                    ("cx", x.into()),
                                    ("cy", y.into()),
                                    ("r", 8.0.into()),
                                    ("fill", "white".into()),
                                ],
                            )
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        if self.base.options().enable_particles {
            let group = self.base.group(surface, "animation-neural-pulses");
            self.pulse_dots = (0..MAX_PULSES)
                .map(|_| {
                    group.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Circle,
                            Some(g),
                            &[
                                ("r", 4.0.into()),
                                ("fill", "white".into()),
                                ("fill-opacity", 0.0.into()),
                            ],
                        )
                    })
                })
                .collect();
        }
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        self.forward([frame.bass, frame.mid, frame.high]);
        self.learn(frame.dt);

        if frame.beat {
            self.spawn_pulses(1 + (frame.bass * 4.0) as usize);
        }
        self.travel(frame.dt);

        for (l, layer) in self.nodes.iter().enumerate() {
            let color = self.base.options().color(frame, l as f32 * 50.0);
            for (i, node) in layer.iter().enumerate() {
                let a = self.activations[l][i];
                put(surface, *node, "r", 5.0 + a * 10.0);
                put(surface, *node, "fill-opacity", 0.3 + a * 0.7);
                put(surface, *node, "fill", color.clone());
            }
        }

        for (l, edges) in self.edges.iter().enumerate() {
            for to in 0..edges.nrows() {
                for from in 0..edges.ncols() {
                    let edge = edges[(to, from)];
                    let w = self.weights[l][(to, from)];
                    let strength = w.abs() / MAX_WEIGHT * self.activations[l][from];
                    put(surface, edge, "stroke-opacity", 0.05 + strength * 0.6);
                    put(surface, edge, "stroke-width", 0.5 + w.abs() * 1.5);
                    put(
                        surface,
                        edge,
                        "stroke",
                        if w >= 0.0 { "white" } else { "hsl(0, 80%, 60%)" },
                    );
                }
            }
        }

        for (k, dot) in self.pulse_dots.iter().enumerate() {
            match self.pulses.get(k) {
                Some(p) => {
                    let (x1, y1) = Neural::position(p.layer, p.from);
                    let (x2, y2) = Neural::position(p.layer + 1, p.to);
                    put(surface, *dot, "cx", crate::helpers::lerp(x1, x2, p.t));
                    put(surface, *dot, "cy", crate::helpers::lerp(y1, y2, p.t));
                    put(surface, *dot, "fill-opacity", 0.9);
                }
                None => put(surface, *dot, "fill-opacity", 0.0),
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.weights.clear();
        self.activations.clear();
        self.pulses.clear();
        self.nodes.clear();
        self.edges.clear();
        self.pulse_dots.clear();
    }
}
