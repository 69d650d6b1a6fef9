//! Animation styles
//!
//! Every style owns a private set of primitives on the render surface and runs its
//! own simulation.  They share one lifecycle:
//!
//! ```text
//! Uninitialized --build--> Built --update--> Running --clear--> Cleared --build--> Built
//! ```
//!
//! `build` allocates everything the style will draw and seeds the simulation,
//! `update` advances it by one frame and writes the result to the owned primitives,
//! `clear` removes all of them again.  Implementations only provide the
//! style-specific halves ([`populate`], [`advance`], [`reset`]); the lifecycle
//! bookkeeping lives in the provided methods of [`Animation`].
//!
//! [`populate`]: trait.Animation.html#tymethod.populate
//! [`advance`]: trait.Animation.html#tymethod.advance
//! [`reset`]: trait.Animation.html#tymethod.reset
//! [`Animation`]: trait.Animation.html
pub mod bars;
pub mod blob;
pub mod circular;
pub mod crystal;
pub mod dna;
pub mod fireworks;
pub mod fractal;
pub mod galaxy;
pub mod geometric;
pub mod matrix;
pub mod neural;
pub mod particles;
pub mod quantum;
pub mod wave;

use rand::SeedableRng;

use crate::frames::AudioFrame;
use crate::surface::{ElementId, Shape, Surface, Value};

/// Side length of the square view all styles draw into
pub const VIEW: f32 = 600.0;
/// Center of the view
pub const CENTER: f32 = VIEW / 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Built,
    Running,
    Cleared,
}

/// How colors respond to the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Plain white
    Mono,
    /// Hue follows the band balance
    Frequency,
    /// Hue cycles over time
    Rainbow,
}

impl std::str::FromStr for ColorMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<ColorMode> {
        match s {
            "mono" => Ok(ColorMode::Mono),
            "frequency" => Ok(ColorMode::Frequency),
            "rainbow" => Ok(ColorMode::Rainbow),
            _ => Err(crate::Error::InvalidOption {
                name: "color_mode",
                reason: format!("expected mono, frequency or rainbow, got `{}`", s),
            }),
        }
    }
}

/// Capability flags of an animation, fixed once it is constructed
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Depth decoration (reflections, perspective, peak caps)
    pub enable_3d: bool,
    /// Glow layers
    pub enable_glow: bool,
    /// Particle sub-systems (satellites, sparks)
    pub enable_particles: bool,
    pub color_mode: ColorMode,
    /// Multiplier for entity counts, in `(0, 4]`
    pub density: f32,
    /// Seed for all randomness.  Rebuilding a style replays the same scene.
    pub seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            enable_3d: true,
            enable_glow: true,
            enable_particles: true,
            color_mode: ColorMode::Frequency,
            density: 1.0,
            seed: 0x5eed,
        }
    }
}

impl Options {
    /// Read options from config
    ///
    /// Keys live below `"animation"`, eg. `"animation.color_mode"`.
    pub fn from_config() -> crate::Result<Options> {
        let def = Options::default();
        let color_mode: String = crate::config_or!("animation.color_mode", "frequency".to_string());
        let seed: i64 = crate::config_or!("animation.seed", def.seed as i64);

        let options = Options {
            enable_3d: crate::config_or!("animation.enable_3d", def.enable_3d),
            enable_glow: crate::config_or!("animation.enable_glow", def.enable_glow),
            enable_particles: crate::config_or!("animation.enable_particles", def.enable_particles),
            color_mode: color_mode.parse()?,
            density: crate::config_or!("animation.density", def.density),
            seed: seed as u64,
        };
        options.validate()?;

        Ok(options)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(self.density > 0.0 && self.density <= 4.0) {
            return Err(crate::Error::InvalidOption {
                name: "density",
                reason: format!("must be in (0, 4], got {}", self.density),
            });
        }
        Ok(())
    }

    /// Scale an entity count by `density`, never below one
    pub fn scaled(&self, n: usize) -> usize {
        ((n as f32 * self.density).round() as usize).max(1)
    }

    /// Color for an element, `offset` shifts the hue
    pub fn color(&self, frame: &AudioFrame, offset: f32) -> String {
        match self.color_mode {
            ColorMode::Mono => "white".to_string(),
            ColorMode::Frequency => crate::helpers::hsl(
                200.0 + frame.bass * 120.0 + frame.mid * 60.0 - frame.high * 40.0 + offset,
                80.0,
                60.0 + frame.high * 20.0,
            ),
            ColorMode::Rainbow => crate::helpers::hsl(frame.time * 40.0 + offset, 90.0, 60.0),
        }
    }
}

/// Identifier of an animation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Blob,
    Particles,
    Waves,
    Geometric,
    Bars,
    Circular,
    Matrix,
    Fireworks,
    Dna,
    Fractal,
    Neural,
    Quantum,
    Crystal,
    Galaxy,
}

impl Style {
    pub const ALL: [Style; 14] = [
        Style::Blob,
        Style::Particles,
        Style::Waves,
        Style::Geometric,
        Style::Bars,
        Style::Circular,
        Style::Matrix,
        Style::Fireworks,
        Style::Dna,
        Style::Fractal,
        Style::Neural,
        Style::Quantum,
        Style::Crystal,
        Style::Galaxy,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Style::Blob => "blob",
            Style::Particles => "particles",
            Style::Waves => "waves",
            Style::Geometric => "geometric",
            Style::Bars => "bars",
            Style::Circular => "circular",
            Style::Matrix => "matrix",
            Style::Fireworks => "fireworks",
            Style::Dna => "dna",
            Style::Fractal => "fractal",
            Style::Neural => "neural",
            Style::Quantum => "quantum",
            Style::Crystal => "crystal",
            Style::Galaxy => "galaxy",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Style::Blob => "Enhanced Blob",
            Style::Particles => "Enhanced Particles",
            Style::Waves => "Enhanced Waves",
            Style::Geometric => "Enhanced Geometric",
            Style::Bars => "Enhanced Spectrum",
            Style::Circular => "Circular",
            Style::Matrix => "Matrix",
            Style::Fireworks => "Fireworks",
            Style::Dna => "DNA Helix",
            Style::Fractal => "Fractal",
            Style::Neural => "Neural Network",
            Style::Quantum => "Quantum Particles",
            Style::Crystal => "Crystal Lattice Symphony",
            Style::Galaxy => "Neural Galaxy Evolution",
        }
    }

    fn index(&self) -> usize {
        Style::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// The style after this one, wrapping around
    pub fn next(&self) -> Style {
        Style::ALL[(self.index() + 1) % Style::ALL.len()]
    }

    /// Construct a fresh, unbuilt animation of this style
    pub fn create(&self, options: &Options) -> crate::Result<Box<dyn Animation>> {
        options.validate()?;
        let base = Base::new(*self, options.clone());

        Ok(match self {
            Style::Blob => Box::new(blob::Blob::new(base)),
            Style::Particles => Box::new(particles::Particles::new(base)),
            Style::Waves => Box::new(wave::Waves::new(base)),
            Style::Geometric => Box::new(geometric::Geometric::new(base)),
            Style::Bars => Box::new(bars::Bars::new(base)),
            Style::Circular => Box::new(circular::Circular::new(base)),
            Style::Matrix => Box::new(matrix::Matrix::new(base)),
            Style::Fireworks => Box::new(fireworks::Fireworks::new(base)),
            Style::Dna => Box::new(dna::Dna::new(base)),
            Style::Fractal => Box::new(fractal::Fractal::new(base)),
            Style::Neural => Box::new(neural::Neural::new(base)),
            Style::Quantum => Box::new(quantum::Quantum::new(base)),
            Style::Crystal => Box::new(crystal::Crystal::new(base)),
            Style::Galaxy => Box::new(galaxy::Galaxy::new(base)),
        })
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Style {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Style> {
        Style::ALL
            .iter()
            .find(|style| style.id() == s)
            .cloned()
            .ok_or_else(|| crate::Error::UnknownStyle(s.to_string()))
    }
}

/// State every animation carries
///
/// Tracks the elements the animation owns so teardown never leaks any, and holds
/// the seeded RNG that is rewound on every build.
#[derive(Debug)]
pub struct Base {
    style: Style,
    options: Options,
    lifecycle: Lifecycle,
    owned: Vec<ElementId>,
    rng: rand::rngs::StdRng,
}

impl Base {
    pub fn new(style: Style, options: Options) -> Base {
        let rng = rand::rngs::StdRng::seed_from_u64(options.seed ^ style.index() as u64);

        Base {
            style,
            options,
            lifecycle: Lifecycle::Uninitialized,
            owned: Vec::new(),
            rng,
        }
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn rng(&mut self) -> &mut rand::rngs::StdRng {
        &mut self.rng
    }

    /// Number of elements owned directly (children of owned groups not counted)
    pub fn owned(&self) -> usize {
        self.owned.len()
    }

    fn reseed(&mut self) {
        self.rng = rand::rngs::StdRng::seed_from_u64(self.options.seed ^ self.style.index() as u64);
    }

    /// Create an element and set its initial attributes
    ///
    /// Surface failures are logged and yield `None`; the animation then carries on
    /// without that primitive.  Top-level elements are remembered for teardown,
    /// children go away with their parent.
    pub fn create(
        &mut self,
        surface: &mut dyn Surface,
        shape: Shape,
        parent: Option<ElementId>,
        attrs: &[(&'static str, Value)],
    ) -> Option<ElementId> {
        match surface.create(shape, parent) {
            Ok(id) => {
                for (name, value) in attrs.iter() {
                    surface.set(id, name, value.clone());
                }
                if parent.is_none() {
                    self.owned.push(id);
                }
                Some(id)
            }
            Err(e) => {
                log::warn!("{}: dropping {} element: {}", self.style, shape.tag(), e);
                None
            }
        }
    }

    /// Create a top-level group with an `id` attribute
    pub fn group(&mut self, surface: &mut dyn Surface, name: &str) -> Option<ElementId> {
        self.create(surface, Shape::Group, None, &[("id", name.into())])
    }

    fn release(&mut self, surface: &mut dyn Surface) {
        for id in self.owned.drain(..) {
            surface.remove(id);
        }
    }
}

/// Set an attribute on an element that may not exist
pub fn put<V: Into<Value>>(
    surface: &mut dyn Surface,
    id: Option<ElementId>,
    name: &'static str,
    value: V,
) {
    if let Some(id) = id {
        surface.set(id, name, value.into());
    }
}

/// An animation style
pub trait Animation {
    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    /// Allocate all primitives and seed the simulation
    fn populate(&mut self, surface: &mut dyn Surface);

    /// Advance the simulation by `frame.dt` and write the result to the primitives
    ///
    /// `frame` is already clamped into its valid ranges.
    fn advance(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()>;

    /// Drop all simulation state
    fn reset(&mut self);

    fn style(&self) -> Style {
        self.base().style()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.base().lifecycle()
    }

    /// Create the scene from scratch
    ///
    /// Building an already built animation tears the old scene down first.
    fn build(&mut self, surface: &mut dyn Surface) {
        match self.lifecycle() {
            Lifecycle::Built | Lifecycle::Running => self.clear(surface),
            Lifecycle::Uninitialized | Lifecycle::Cleared => (),
        }

        self.base_mut().reseed();
        self.populate(surface);
        self.base_mut().lifecycle = Lifecycle::Built;

        log::debug!(
            "{}: built with {} top-level elements",
            self.style(),
            self.base().owned()
        );
    }

    /// Advance one frame
    ///
    /// Updating an animation that is not built is a bug in the caller.  Debug builds
    /// panic, release builds return `Error::NotBuilt` without touching anything.
    fn update(&mut self, frame: &AudioFrame, surface: &mut dyn Surface) -> crate::Result<()> {
        match self.lifecycle() {
            Lifecycle::Built | Lifecycle::Running => (),
            Lifecycle::Uninitialized | Lifecycle::Cleared => {
                debug_assert!(false, "{}: update before build", self.style());
                return Err(crate::Error::NotBuilt(self.style().id()));
            }
        }

        self.base_mut().lifecycle = Lifecycle::Running;
        self.advance(&frame.clamped(), surface)
    }

    /// Remove every owned primitive and drop the simulation state
    ///
    /// Safe to call repeatedly and before `build`.
    fn clear(&mut self, surface: &mut dyn Surface) {
        self.base_mut().release(surface);
        self.reset();

        if self.lifecycle() != Lifecycle::Uninitialized {
            self.base_mut().lifecycle = Lifecycle::Cleared;
        }
    }
}

impl std::fmt::Debug for dyn Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("style", &self.style())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Scene;

    #[test]
    fn test_style_ids() {
        for style in Style::ALL.iter() {
            assert_eq!(style.id().parse::<Style>().unwrap(), *style);
        }
        assert_eq!(
            "nope".parse::<Style>(),
            Err(crate::Error::UnknownStyle("nope".to_string()))
        );
        assert_eq!(Style::Galaxy.next(), Style::Blob);
        assert_eq!(Style::Blob.next(), Style::Particles);
    }

    #[test]
    fn test_options() {
        assert!(Options::default().validate().is_ok());

        let bad = Options {
            density: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(Style::Blob.create(&bad).is_err());

        assert_eq!("rainbow".parse::<ColorMode>().unwrap(), ColorMode::Rainbow);
        assert!("purple".parse::<ColorMode>().is_err());

        let dense = Options {
            density: 0.01,
            ..Default::default()
        };
        assert_eq!(dense.scaled(50), 1);
    }

    #[test]
    fn test_from_config_defaults() {
        assert_eq!(Options::from_config().unwrap(), Options::default());
    }

    #[test]
    fn test_all_styles_lifecycle() {
        for style in Style::ALL.iter() {
            println!("Style: {}", style);
            testing::check_lifecycle(*style);
        }
    }

    #[test]
    fn test_all_styles_robust() {
        for style in Style::ALL.iter() {
            println!("Style: {}", style);
            testing::check_robustness(*style);
        }
    }

    #[test]
    fn test_degraded_scene() {
        for style in Style::ALL.iter() {
            println!("Style: {}", style);
            let mut scene = Scene::with_budget(7);
            let mut anim = style.create(&Options::default()).unwrap();

            anim.build(&mut scene);
            assert!(scene.len() <= 7);
            testing::drive(&mut *anim, &mut scene, 60);
            assert!(scene.len() <= 7);

            anim.clear(&mut scene);
            assert!(scene.is_empty());
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "update before build")]
    fn test_update_before_build() {
        let mut scene = Scene::new();
        let mut anim = Style::Waves.create(&Options::default()).unwrap();

        let _ = anim.update(&testing::frame(0.5, 0.5, 0.5, false, 0.0), &mut scene);
    }
}
