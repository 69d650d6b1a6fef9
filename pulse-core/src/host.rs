//! Animation host
//!
//! Owns the render surface, the analysis state and the one active animation.  Every
//! tick turns a raw spectrum into an [`AudioFrame`] and hands it to the active
//! animation, nothing else ever sees it.
//!
//! [`AudioFrame`]: ../frames/struct.AudioFrame.html
use crate::analyzer;
use crate::animation::{self, Animation, Style};
use crate::frames::{AudioFrame, Backdrop};
use crate::surface::Surface;

/// Builder for AnimationHost
#[derive(Debug, Default, Clone)]
pub struct HostBuilder {
    pub bands: analyzer::BandsBuilder,
    pub beat: analyzer::BeatBuilder,

    /// Options every style is constructed with
    ///
    /// Read from the `"animation"` config section if not set.
    pub options: Option<animation::Options>,

    /// Maximum animation updates per second
    ///
    /// Can also be set from config as `"host.fps"`.
    pub fps: Option<f32>,

    /// Upper bound for the time step handed to an animation, in seconds
    ///
    /// Can also be set from config as `"host.max_dt"`.
    pub max_dt: Option<f32>,
}

impl HostBuilder {
    pub fn new() -> HostBuilder {
        Default::default()
    }

    pub fn bands(&mut self, bands: analyzer::BandsBuilder) -> &mut HostBuilder {
        self.bands = bands;
        self
    }

    pub fn beat(&mut self, beat: analyzer::BeatBuilder) -> &mut HostBuilder {
        self.beat = beat;
        self
    }

    pub fn options(&mut self, options: animation::Options) -> &mut HostBuilder {
        self.options = Some(options);
        self
    }

    pub fn fps(&mut self, fps: f32) -> &mut HostBuilder {
        self.fps = Some(fps);
        self
    }

    pub fn max_dt(&mut self, max_dt: f32) -> &mut HostBuilder {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn build<S: Surface>(&mut self, surface: S) -> crate::Result<AnimationHost<S>> {
        AnimationHost::from_builder(self, surface)
    }
}

/// Drives one animation at a time against a render surface
#[derive(Debug)]
pub struct AnimationHost<S: Surface> {
    surface: S,
    active: Option<Box<dyn Animation>>,
    options: animation::Options,

    aggregator: analyzer::Aggregator,
    beat: analyzer::BeatDetector,
    spectrum: analyzer::Spectrum<Vec<analyzer::SignalStrength>>,

    interval: f32,
    max_dt: f32,
    start: std::time::Instant,
    last_update: Option<f32>,

    frames: usize,
    dt: f32,
    bands: analyzer::Bands,
    backdrop: Backdrop,
}

impl<S: Surface> AnimationHost<S> {
    pub fn from_builder(build: &HostBuilder, surface: S) -> crate::Result<AnimationHost<S>> {
        let aggregator = analyzer::Aggregator::from_builder(&build.bands)?;
        let beat = analyzer::BeatDetector::from_builder(&build.beat);

        let options = match build.options {
            Some(ref options) => {
                options.validate()?;
                options.clone()
            }
            None => animation::Options::from_config()?,
        };

        let fps = build
            .fps
            .unwrap_or_else(|| crate::config_or!("host.fps", 60.0));
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(crate::Error::InvalidOption {
                name: "host.fps",
                reason: format!("must be positive, got {}", fps),
            });
        }

        let max_dt = build
            .max_dt
            .unwrap_or_else(|| crate::config_or!("host.max_dt", 0.1));
        if !(max_dt > 0.0 && max_dt.is_finite()) {
            return Err(crate::Error::InvalidOption {
                name: "host.max_dt",
                reason: format!("must be positive, got {}", max_dt),
            });
        }

        log::debug!("Host: {} fps, max dt {:.3}s", fps, max_dt);

        Ok(AnimationHost {
            surface,
            active: None,
            options,

            spectrum: analyzer::Spectrum::new(Vec::new(), aggregator.max_magnitude()),
            aggregator,
            beat,

            interval: 1.0 / fps,
            max_dt,
            start: std::time::Instant::now(),
            last_update: None,

            frames: 0,
            dt: 0.0,
            bands: Default::default(),
            backdrop: Default::default(),
        })
    }

    /// Switch to the style with identifier `id`
    ///
    /// Unknown identifiers are rejected and the current style keeps running.
    pub fn switch_to(&mut self, id: &str) -> crate::Result<()> {
        let style = id.parse::<Style>().map_err(|e| {
            log::warn!("Refusing switch: {}", e);
            e
        })?;
        self.switch_to_style(style)
    }

    /// Tear down the active style and build `style` in its place
    pub fn switch_to_style(&mut self, style: Style) -> crate::Result<()> {
        // Construct first so a failure leaves the current style untouched
        let mut next = style.create(&self.options)?;

        if let Some(mut old) = self.active.take() {
            old.clear(&mut self.surface);
        }
        next.build(&mut self.surface);
        self.active = Some(next);
        self.last_update = None;

        log::info!("Switched to {} ({})", style.name(), style);
        Ok(())
    }

    /// Switch to the style after the active one
    pub fn next_style(&mut self) -> crate::Result<Style> {
        let next = self.active_style().map_or(Style::ALL[0], |s| s.next());
        self.switch_to_style(next)?;
        Ok(next)
    }

    pub fn active_style(&self) -> Option<Style> {
        self.active.as_ref().map(|a| a.style())
    }

    /// Tear down the active style, the surface is left empty
    pub fn stop(&mut self) {
        if let Some(mut old) = self.active.take() {
            old.clear(&mut self.surface);
            log::info!("Stopped {}", old.style());
        }
        self.last_update = None;
    }

    /// Forget beat history and spectrum length, eg. when the track changes
    pub fn reset_session(&mut self) {
        log::debug!("Resetting session after {} beats", self.beat.beats());
        self.beat.reset();
        self.spectrum.reset();
        self.last_update = None;
    }

    /// Run one tick at time `now` (seconds)
    ///
    /// Returns whether the active animation was updated.  Ticks closer together than
    /// `1 / fps` are skipped; the animation then sees the full elapsed time on its
    /// next update, capped at `max_dt`.
    pub fn tick(&mut self, raw: &[analyzer::SignalStrength], now: f32) -> bool {
        let active = match self.active {
            Some(ref mut active) => active,
            None => return false,
        };

        let dt = match self.last_update {
            // A clock running backwards means a new session
            Some(last) if now >= last => {
                let elapsed = now - last;
                // Allow for jitter of the scheduling clock
                if elapsed < self.interval * 0.95 {
                    log::trace!("Throttled tick @{:.3}", now);
                    return false;
                }
                elapsed.min(self.max_dt)
            }
            _ => self.interval.min(self.max_dt),
        };

        self.spectrum.fill_from_raw(raw);
        let bands = self.aggregator.aggregate(&self.spectrum);
        let beat = self.beat.detect(bands.bass, now);

        let frame = AudioFrame::new(bands, beat, now, dt, self.spectrum.as_ref());
        if let Err(e) = active.update(&frame, &mut self.surface) {
            log::warn!("{}: update failed: {}", active.style(), e);
        }

        self.backdrop = Backdrop::from_frame(&frame.clamped());
        self.bands = bands;
        self.dt = dt;
        self.frames += 1;
        self.last_update = Some(now);

        true
    }

    /// Run one tick, sampling the host's own clock
    pub fn tick_now(&mut self, raw: &[analyzer::SignalStrength]) -> bool {
        let now = crate::helpers::time(self.start);
        self.tick(raw, now)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Stop the active style and hand back the surface
    pub fn into_surface(mut self) -> S {
        self.stop();
        self.surface
    }

    pub fn options(&self) -> &animation::Options {
        &self.options
    }

    /// Bands of the last update
    pub fn bands(&self) -> analyzer::Bands {
        self.bands
    }

    /// Background tint of the last update
    pub fn backdrop(&self) -> Backdrop {
        self.backdrop
    }

    /// Time step of the last update
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of updates since the host was created
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Beats detected in this session
    pub fn beats(&self) -> u64 {
        self.beat.beats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Scene;

    fn host() -> AnimationHost<Scene> {
        HostBuilder::new()
            .options(animation::Options::default())
            .fps(60.0)
            .max_dt(0.1)
            .build(Scene::new())
            .unwrap()
    }

    #[test]
    fn test_no_style_no_update() {
        let mut host = host();
        assert!(!host.tick(&[255.0; 64], 0.0));
        assert_eq!(host.frames(), 0);
        assert!(host.surface().is_empty());
    }

    #[test]
    fn test_throttle_and_dt() {
        let mut host = host();
        host.switch_to("waves").unwrap();
        let spectrum = [100.0; 64];

        assert!(host.tick(&spectrum, 1.0));
        assert!((host.dt() - 1.0 / 60.0).abs() < 1e-6);

        // Too early
        assert!(!host.tick(&spectrum, 1.005));
        assert_eq!(host.frames(), 1);

        assert!(host.tick(&spectrum, 1.0 + 1.0 / 60.0));
        assert!((host.dt() - 1.0 / 60.0).abs() < 1e-4);

        // Long stall is capped
        assert!(host.tick(&spectrum, 5.0));
        assert_eq!(host.dt(), 0.1);
        assert_eq!(host.frames(), 3);
    }

    #[test]
    fn test_bands_and_beats() {
        let mut host = host();
        host.switch_to("blob").unwrap();

        let mut spectrum = vec![0.0; 100];
        assert!(host.tick(&spectrum, 0.0));
        assert_eq!(host.bands(), analyzer::Bands::default());
        assert_eq!(host.beats(), 0);

        for b in spectrum.iter_mut().take(8) {
            *b = 255.0;
        }
        assert!(host.tick(&spectrum, 0.5));
        assert_eq!(host.bands().bass, 1.0);
        assert_eq!(host.beats(), 1);
        assert!(host.backdrop().lightness_a > Backdrop::default().lightness_a);

        // Plateau does not re-fire
        assert!(host.tick(&spectrum, 1.0));
        assert_eq!(host.beats(), 1);

        host.reset_session();
        assert_eq!(host.beats(), 0);
    }

    #[test]
    fn test_degenerate_spectrum() {
        let mut host = host();
        host.switch_to("particles").unwrap();

        let junk = [std::f32::NAN, -4.0, std::f32::INFINITY, 1e9];
        for i in 0..60 {
            assert!(host.tick(&junk, i as f32 / 30.0));
            let bands = host.bands();
            for v in [bands.bass, bands.mid, bands.high, bands.overall].iter() {
                assert!(*v >= 0.0 && *v <= 1.0);
            }
        }
        assert!(host.tick(&[], 3.0));
        assert_eq!(host.bands(), analyzer::Bands::default());
    }

    #[test]
    fn test_switching() {
        let mut host = host();
        assert_eq!(host.active_style(), None);

        host.switch_to("dna").unwrap();
        assert_eq!(host.active_style(), Some(Style::Dna));
        let dna = host.surface().len();

        assert_eq!(
            host.switch_to("disco"),
            Err(crate::Error::UnknownStyle("disco".to_string()))
        );
        assert_eq!(host.active_style(), Some(Style::Dna));
        assert_eq!(host.surface().len(), dna);

        assert_eq!(host.next_style().unwrap(), Style::Fractal);
        assert_eq!(host.active_style(), Some(Style::Fractal));

        host.stop();
        assert_eq!(host.active_style(), None);
        assert!(host.surface().is_empty());
        assert!(!host.tick(&[1.0; 16], 10.0));

        assert_eq!(host.next_style().unwrap(), Style::ALL[0]);
    }

    #[test]
    fn test_into_surface_tears_down() {
        let mut host = host();
        host.switch_to("galaxy").unwrap();
        assert!(!host.surface().is_empty());
        assert!(host.into_surface().is_empty());
    }

    #[test]
    fn test_invalid_builder() {
        assert!(HostBuilder::new()
            .fps(0.0)
            .options(Default::default())
            .build(Scene::new())
            .is_err());
        assert!(HostBuilder::new()
            .max_dt(std::f32::NAN)
            .options(Default::default())
            .build(Scene::new())
            .is_err());

        let mut bands = analyzer::BandsBuilder::new();
        bands.bass_fraction(0.5).mid_fraction(0.2);
        assert!(HostBuilder::new()
            .bands(bands)
            .options(Default::default())
            .build(Scene::new())
            .is_err());
    }
}
