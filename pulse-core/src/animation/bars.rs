//! Spectrum bars with falling peak caps
use crate::animation::{put, Animation, Base};
use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface};

const BARS: usize = 32;
const WIDTH: f32 = 480.0;
const MAX_HEIGHT: f32 = 260.0;
const MIN_HEIGHT: f32 = 6.0;
/// Acceleration of a falling peak cap, per nominal step squared
const GRAVITY: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
struct Peak {
    height: f32,
    velocity: f32,
}

impl Peak {
    /// Follow `height` upwards immediately, fall towards it otherwise
    fn track(&mut self, height: f32, steps: f32) {
        if height >= self.height {
            self.height = height;
            self.velocity = 0.0;
        } else {
            self.velocity += GRAVITY * steps;
            self.height = (self.height - self.velocity * steps).max(height);
        }
    }
}

#[derive(Debug)]
pub struct Bars {
    base: Base,

    bars: Vec<Option<ElementId>>,
    caps: Vec<Option<ElementId>>,

    levels: Vec<f32>,
    peaks: Vec<Peak>,
}

impl Bars {
    pub fn new(base: Base) -> Bars {
        Bars {
            base,
            bars: Vec::new(),
            caps: Vec::new(),
            levels: Vec::new(),
            peaks: Vec::new(),
        }
    }

    fn height(level: f32) -> f32 {
        (level * MAX_HEIGHT).max(MIN_HEIGHT)
    }
}

impl Animation for Bars {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn populate(&mut self, surface: &mut dyn Surface) {
        let slot = WIDTH / BARS as f32;
        let group = self.base.create(
            surface,
            Shape::Group,
            None,
            &[
                ("id", "animation-bars".into()),
                ("transform", "translate(60,520)".into()),
            ],
        );

        self.bars = (0..BARS)
            .map(|i| {
                group.and_then(|g| {
                    self.base.create(
                        surface,
                        Shape::Rect,
                        Some(g),
                        &[
                            ("x", (i as f32 * slot).into()),
                            ("y", (-MIN_HEIGHT - 2.0).into()),
                            ("width", (slot - 4.0).into()),
                            ("height", MIN_HEIGHT.into()),
                            ("rx", 3.0.into()),
                            ("fill", "white".into()),
                            ("fill-opacity", 0.85.into()),
                        ],
                    )
                })
            })
            .collect();

        if self.base.options().enable_3d {
            self.caps = (0..BARS)
                .map(|i| {
                    group.and_then(|g| {
                        self.base.create(
                            surface,
                            Shape::Rect,
                            Some(g),
                            &[
                                ("x", (i as f32 * slot).into()),
                                ("y", (-MIN_HEIGHT - 6.0).into()),
                                ("width", (slot - 4.0).into()),
                                ("height", 3.0.into()),
                                ("fill", "white".into()),
                            ],
                        )
                    })
                })
                .collect();
        }

        self.levels = vec![0.0; BARS];
        self.peaks = vec![Peak::default(); BARS];
    }

    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        let spectrum = frame.spectrum();
        let scale = spectrum.scale();
        spectrum.fill_buckets(&mut self.levels[..]);

        let steps = frame.steps();
        for (i, raw) in self.levels.iter().enumerate() {
            let level = if scale > 0.0 {
                crate::helpers::unit(raw / scale)
            } else {
                0.0
            };
            let height = Bars::height(level);

            put(surface, self.bars[i], "y", -height);
            put(surface, self.bars[i], "height", height);
            put(surface, self.bars[i], "fill-opacity", 0.3 + level * 0.7);
            put(
                surface,
                self.bars[i],
                "fill",
                self.base.options().color(frame, i as f32 / BARS as f32 * 120.0),
            );

            if let Some(cap) = self.caps.get(i) {
                self.peaks[i].track(height, steps);
                put(surface, *cap, "y", -self.peaks[i].height - 6.0);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.bars.clear();
        self.caps.clear();
        self.levels.clear();
        self.peaks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{testing, Options, Style};
    use crate::surface::Scene;

    #[test]
    fn test_heights_follow_spectrum() {
        let mut scene = Scene::new();
        let mut bars = Bars::new(Base::new(Style::Bars, Options::default()));
        bars.build(&mut scene);
        assert_eq!(scene.count(Shape::Rect), 64);

        let mut spectrum = vec![0.0; 128];
        for (i, v) in spectrum.iter_mut().enumerate() {
            *v = if i < 64 { 255.0 } else { 0.0 };
        }
        let mut f = testing::frame(0.5, 0.5, 0.5, false, 0.0);
        f.spectrum = &spectrum;
        bars.update(&f, &mut scene).unwrap();

        let first = bars.bars[0].unwrap();
        let last = bars.bars[BARS - 1].unwrap();
        assert_eq!(scene.number(first, "height"), Some(MAX_HEIGHT));
        assert_eq!(scene.number(first, "y"), Some(-MAX_HEIGHT));
        assert_eq!(scene.number(last, "height"), Some(MIN_HEIGHT));
    }

    #[test]
    fn test_empty_spectrum() {
        let mut scene = Scene::new();
        let mut bars = Bars::new(Base::new(Style::Bars, Options::default()));
        bars.build(&mut scene);

        let mut f = testing::frame(0.0, 0.0, 0.0, false, 0.0);
        f.spectrum = &[];
        bars.update(&f, &mut scene).unwrap();

        for bar in bars.bars.iter() {
            assert_eq!(scene.number(bar.unwrap(), "height"), Some(MIN_HEIGHT));
        }
    }

    #[test]
    fn test_peak_falls() {
        let mut peak = Peak::default();
        peak.track(200.0, 1.0);
        assert_eq!(peak.height, 200.0);

        let mut last = peak.height;
        let mut falls = Vec::new();
        for _ in 0..10 {
            peak.track(MIN_HEIGHT, 1.0);
            falls.push(last - peak.height);
            last = peak.height;
        }
        // Accelerating fall
        assert!(falls.windows(2).all(|w| w[1] >= w[0]));

        for _ in 0..100 {
            peak.track(MIN_HEIGHT, 1.0);
        }
        assert_eq!(peak.height, MIN_HEIGHT);

        peak.track(100.0, 1.0);
        assert_eq!(peak.height, 100.0);
        assert_eq!(peak.velocity, 0.0);
    }

    #[test]
    fn test_without_caps() {
        let options = Options {
            enable_3d: false,
            ..Default::default()
        };
        let mut scene = Scene::new();
        let mut bars = Bars::new(Base::new(Style::Bars, options));
        bars.build(&mut scene);
        assert_eq!(scene.count(Shape::Rect), BARS);
        testing::drive(&mut bars, &mut scene, 30);
    }
}
