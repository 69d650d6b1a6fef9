//! Audio-reactive animation engine.
//!
//! A raw magnitude spectrum goes in, a small set of semantic signals comes out
//! (bass/mid/high energy, loudness and beat pulses) and drives one of several
//! interchangeable animation styles that mutate a render surface frame by frame.
//!
//! # Example
//! ```rust
//! use pulse_core::surface::Surface;
//! use pulse_core::{animation, surface, HostBuilder};
//!
//! // Initialize the logger.  Take a look at the sources if you want to customize
//! // the logger.
//! # if false {
//! pulse_core::default_log();
//! # }
//!
//! // Load the default config source.  Without it, every tunable falls back to the
//! // defaults coded into the builders.
//! # if false {
//! pulse_core::default_config();
//! # }
//!
//! let mut host = HostBuilder::new()
//!     .options(animation::Options::default())
//!     .build(surface::Scene::new())
//!     .unwrap();
//!
//! host.switch_to("blob").unwrap();
//!
//! // 1024 buckets in byte scale, as delivered by the spectral analysis upstream
//! let spectrum = vec![96.0; 1024];
//! for i in 0..10 {
//!     host.tick(&spectrum, i as f32 / 30.0);
//! }
//!
//! assert!(host.surface().len() > 0);
//! ```
pub mod analyzer;
pub mod animation;
pub mod error;
pub mod frames;
pub mod helpers;
pub mod host;
pub mod surface;

#[doc(inline)]
pub use crate::error::{Error, Result};
#[doc(inline)]
pub use crate::frames::{AudioFrame, SpectrumFeed};
#[doc(inline)]
pub use crate::host::{AnimationHost, HostBuilder};

use std::sync::atomic;

/// `ezconf` configuration
///
/// Usually you will call [`default_config`](fn.default_config.html) in the beginning
/// which will populate this object, but you can also specify your own custom config
/// sources.  Read values through [`config_or!`](macro.config_or.html) so code keeps
/// working while no config was loaded.
///
/// # Example
/// ```rust
/// # pulse_core::default_config();
/// let some_configurable_value = pulse_core::config_or!(
///     // Toml path to value
///     "foo.bar",
///     // Default value.  Type gets inferred from this
///     123,
/// );
/// # assert_eq!(some_configurable_value, 123);
/// ```
pub static CONFIG: ezconf::Config = ezconf::INIT;

static CONFIG_LOADED: atomic::AtomicBool = atomic::AtomicBool::new(false);

/// Initialize config from default sources
///
/// The default sources are:
/// * `./pulsecolor.toml`
/// * `./config/pulsecolor.toml`
/// * Defaults from code
pub fn default_config() {
    if CONFIG_LOADED.swap(true, atomic::Ordering::SeqCst) {
        log::debug!("Config already loaded");
        return;
    }

    CONFIG
        .init(
            [
                ezconf::Source::File("pulsecolor.toml"),
                ezconf::Source::File("config/pulsecolor.toml"),
            ]
            .iter(),
        )
        .expect("Can't load config");

    log::debug!("Config loaded");
}

/// Whether [`default_config`](fn.default_config.html) has populated `CONFIG`
pub fn config_loaded() -> bool {
    CONFIG_LOADED.load(atomic::Ordering::SeqCst)
}

/// Read a value from `CONFIG`, or use the default if no config was loaded
#[macro_export]
macro_rules! config_or {
    ($path:expr, $default:expr $(,)?) => {
        if $crate::config_loaded() {
            $crate::CONFIG.get_or($path, $default)
        } else {
            $default
        }
    };
}

/// Initialize logger
///
/// By default, enable debug output in debug-builds.
pub fn default_log() {
    #[cfg(not(debug_assertions))]
    env_logger::init();

    #[cfg(debug_assertions)]
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    color_backtrace::install();
}
