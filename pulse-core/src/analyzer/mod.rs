//! Audio feature extraction
//!
//! Reduces the magnitude spectrum delivered by the upstream analysis into band
//! energies and classifies beats from the bass band.
pub mod bands;
pub mod beat;
pub mod spectrum;

pub use self::bands::{Aggregator, Bands, BandsBuilder};
pub use self::beat::{BeatBuilder, BeatDetector, BeatState};
pub use self::spectrum::{SignalStrength, Spectrum};
