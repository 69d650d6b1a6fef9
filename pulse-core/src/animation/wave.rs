//! Layered sine waves, one layer per band
use crate::animation::{put, Animation, Base, CENTER, VIEW};
use crate::frames::{AudioFrame, Band};
use crate::surface::{ElementId, Shape, Surface, Value};

const STEP: usize = 5;

#[derive(Debug, Clone)]
pub struct Layer {
    pub band: Band,
    /// Number of harmonics summed into the curve, 1 to 3
    pub harmonics: usize,
    /// Phase advance in radians per second at zero signal
    pub speed: f32,
    pub phase: f32,

    path: Option<ElementId>,
    glow: Option<ElementId>,
    reflection: Option<ElementId>,
}

impl Layer {
    fn new(band: Band, harmonics: usize, speed: f32) -> Layer {
        Layer {
            band,
            harmonics: harmonics.max(1).min(3),
            speed,
            phase: 0.0,
            path: None,
            glow: None,
            reflection: None,
        }
    }

    pub fn amplitude(level: f32) -> f32 {
        50.0 + level * 100.0
    }

    pub fn wavelength(level: f32) -> f32 {
        50.0 + (1.0 - level) * 100.0
    }

    /// Height of the curve at `x` for band level `level`
    pub fn sample(&self, x: f32, level: f32) -> f32 {
        let amplitude = Layer::amplitude(level);
        let wavelength = Layer::wavelength(level);

        CENTER
            + (1..=self.harmonics)
                .map(|k| {
                    let k = k as f32;
                    (x / (wavelength / k) + self.phase * k).sin() * amplitude / k
                })
                .sum::<f32>()
    }
}

#[derive(Debug)]
pub struct Waves {
    base: Base,
    layers: Vec<Layer>,
}

impl Waves {
    pub fn new(base: Base) -> Waves {
        Waves {
            base,
            layers: Vec::new(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Animation for Waves {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let options = self.base.options().clone();
        let group = self.base.group(surface, "animation-waves");

        self.layers = vec![
            Layer::new(Band::Bass, 1, 1.0),
            Layer::new(Band::Mid, 2, 1.6),
            Layer::new(Band::High, 3, 2.3),
        ];

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let base = &mut self.base;
            let mut create = |attrs: &[(&'static str, Value)]| {
                group.and_then(|g| base.create(surface, Shape::Path, Some(g), attrs))
            };

            if options.enable_3d {
                layer.reflection = create(&[
                    ("fill", "none".into()),
                    ("stroke", "white".into()),
                    ("stroke-width", 2.0.into()),
                    ("stroke-opacity", 0.1.into()),
                    ("transform", format!("translate(0,{}) scale(1,-1)", VIEW).into()),
                ]);
            }
            if options.enable_glow {
                layer.glow = create(&[
                    ("fill", "none".into()),
                    ("stroke", "white".into()),
                    ("stroke-width", 10.0.into()),
                    ("stroke-opacity", 0.15.into()),
                ]);
            }
            layer.path = create(&[
                ("id", format!("animation-wave-{}", i).into()),
                ("fill", "none".into()),
                ("stroke", "white".into()),
                ("stroke-width", 3.0.into()),
                ("stroke-opacity", 0.6.into()),
            ]);
        }
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let level = frame.band(layer.band);
            layer.phase += frame.dt * layer.speed * (1.0 + level);

            let d = crate::helpers::polyline(
                (0..=VIEW as usize)
                    .step_by(STEP)
                    .map(|x| (x as f32, layer.sample(x as f32, level))),
            );

            let color = self.base.options().color(frame, i as f32 * 40.0);
            let opacity = 0.3 + level * 0.7;

            put(surface, layer.path, "d", d.clone());
            put(surface, layer.path, "stroke", color.clone());
            put(surface, layer.path, "stroke-opacity", opacity);

            if layer.glow.is_some() {
                put(surface, layer.glow, "d", d.clone());
                put(surface, layer.glow, "stroke", color.clone());
                put(surface, layer.glow, "stroke-opacity", opacity * 0.3);
                put(surface, layer.glow, "stroke-width", 8.0 + frame.overall * 12.0);
            }
            if layer.reflection.is_some() {
                put(surface, layer.reflection, "d", d);
                put(surface, layer.reflection, "stroke", color);
                put(surface, layer.reflection, "stroke-opacity", opacity * 0.15);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    #[test]
    fn test_amplitude_and_wavelength() {
        assert_eq!(Layer::amplitude(0.0), 50.0);
        assert_eq!(Layer::amplitude(1.0), 150.0);
        assert_eq!(Layer::wavelength(0.0), 150.0);
        assert_eq!(Layer::wavelength(1.0), 50.0);
    }

    #[test]
    fn test_sample_bounds() {
        for harmonics in 1..=3 {
            let mut layer = Layer::new(Band::Bass, harmonics, 1.0);
            for i in 0..200 {
                layer.phase = i as f32 * 0.37;
                for x in (0..=600).step_by(5) {
                    let y = layer.sample(x as f32, 1.0);
                    // 150 * (1 + 1/2 + 1/3) = 275
                    assert!(y >= 24.0 && y <= 576.0, "y = {}", y);
                }
            }
        }
    }

    #[test]
    fn test_phase_is_monotonic() {
        let mut scene = Scene::new();
        let mut waves = Waves::new(Base::new(Style::Waves, Options::default()));
        waves.build(&mut scene);
        assert_eq!(
            waves.layers().iter().map(|l| l.harmonics).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let mut last = vec![0.0; 3];
        for i in 0..300 {
            let f = testing::frame(0.3, 0.6, 0.9, false, i as f32 / 60.0);
            waves.update(&f, &mut scene).unwrap();
            for (l, layer) in waves.layers().iter().enumerate() {
                assert!(layer.phase > last[l]);
                last[l] = layer.phase;
            }
        }

        // Layers run at their own speed
        assert!(last[0] < last[1] && last[1] < last[2]);
    }

    #[test]
    fn test_layers_and_decoration() {
        let mut scene = Scene::new();
        let mut waves = Waves::new(Base::new(Style::Waves, Options::default()));
        waves.build(&mut scene);
        // group + 3 * (path, glow, reflection)
        assert_eq!(scene.len(), 10);

        waves
            .update(&testing::frame(1.0, 0.0, 0.0, false, 0.0), &mut scene)
            .unwrap();
        let bass = scene.find("animation-wave-0").unwrap();
        let high = scene.find("animation-wave-2").unwrap();
        assert!((scene.number(bass, "stroke-opacity").unwrap() - 1.0).abs() < 1e-6);
        assert!((scene.number(high, "stroke-opacity").unwrap() - 0.3).abs() < 1e-6);

        let d = scene.attr(bass, "d").unwrap().to_string();
        assert!(d.starts_with("M0"));
        assert_eq!(d.matches('L').count(), 120);

        let plain = Options {
            enable_3d: false,
            enable_glow: false,
            ..Default::default()
        };
        let mut scene = Scene::new();
        let mut waves = Waves::new(Base::new(Style::Waves, plain));
        waves.build(&mut scene);
        assert_eq!(scene.len(), 4);
    }
}
