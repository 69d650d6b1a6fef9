//! Band Aggregation
use crate::analyzer;

/// Normalized band energies of one spectrum
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bands {
    pub bass: analyzer::SignalStrength,
    pub mid: analyzer::SignalStrength,
    pub high: analyzer::SignalStrength,
    pub overall: analyzer::SignalStrength,
}

/// Builder for Aggregator
#[derive(Debug, Default, Clone)]
pub struct BandsBuilder {
    /// Fraction of the buckets counted as bass
    ///
    /// Can also be set from config as `"analyzer.bass_fraction"`.
    pub bass_fraction: Option<f32>,

    /// Fraction of the buckets where the mid band ends
    ///
    /// Can also be set from config as `"analyzer.mid_fraction"`.
    pub mid_fraction: Option<f32>,

    /// Maximum representable magnitude
    ///
    /// Can also be set from config as `"analyzer.max_magnitude"`.
    pub max_magnitude: Option<analyzer::SignalStrength>,
}

impl BandsBuilder {
    pub fn new() -> BandsBuilder {
        Default::default()
    }

    pub fn bass_fraction(&mut self, fraction: f32) -> &mut BandsBuilder {
        self.bass_fraction = Some(fraction);
        self
    }

    pub fn mid_fraction(&mut self, fraction: f32) -> &mut BandsBuilder {
        self.mid_fraction = Some(fraction);
        self
    }

    pub fn max_magnitude(&mut self, max: analyzer::SignalStrength) -> &mut BandsBuilder {
        self.max_magnitude = Some(max);
        self
    }

    pub fn build(&mut self) -> crate::Result<Aggregator> {
        Aggregator::from_builder(self)
    }
}

/// Stateless reduction of a spectrum into [`Bands`](struct.Bands.html)
///
/// The buckets are split by index fraction: `[0, bass)` is bass, `[bass, mid)` is mid and
/// the remainder is high.  Each band is the mean normalized magnitude of its buckets,
/// `overall` the mean over all of them.  Empty partitions read as 0.
#[derive(Debug, Clone)]
pub struct Aggregator {
    bass_fraction: f32,
    mid_fraction: f32,
    max_magnitude: analyzer::SignalStrength,
}

impl Aggregator {
    pub fn from_builder(build: &BandsBuilder) -> crate::Result<Aggregator> {
        let bass_fraction = build
            .bass_fraction
            .unwrap_or_else(|| crate::config_or!("analyzer.bass_fraction", 0.08));
        let mid_fraction = build
            .mid_fraction
            .unwrap_or_else(|| crate::config_or!("analyzer.mid_fraction", 0.4));
        let max_magnitude = build
            .max_magnitude
            .unwrap_or_else(|| crate::config_or!("analyzer.max_magnitude", 255.0));

        if !(bass_fraction > 0.0 && bass_fraction < mid_fraction && mid_fraction <= 1.0) {
            return Err(crate::Error::InvalidOption {
                name: "analyzer.bass_fraction",
                reason: format!(
                    "need 0 < bass ({}) < mid ({}) <= 1",
                    bass_fraction, mid_fraction
                ),
            });
        }

        if !(max_magnitude > 0.0 && max_magnitude.is_finite()) {
            return Err(crate::Error::InvalidOption {
                name: "analyzer.max_magnitude",
                reason: format!("must be positive, got {}", max_magnitude),
            });
        }

        Ok(Aggregator {
            bass_fraction,
            mid_fraction,
            max_magnitude,
        })
    }

    pub fn max_magnitude(&self) -> analyzer::SignalStrength {
        self.max_magnitude
    }

    /// Wrap raw magnitudes in a spectrum using this aggregator's scale
    pub fn spectrum<'a>(
        &self,
        raw: &'a [analyzer::SignalStrength],
    ) -> analyzer::Spectrum<&'a [analyzer::SignalStrength]> {
        analyzer::Spectrum::new(raw, self.max_magnitude)
    }

    pub fn aggregate<S: analyzer::spectrum::Storage>(
        &self,
        spectrum: &analyzer::Spectrum<S>,
    ) -> Bands {
        let scaled = analyzer::Spectrum::new(spectrum.as_slice(), self.max_magnitude);

        Bands {
            bass: scaled.slice(0.0, self.bass_fraction).mean(),
            mid: scaled.slice(self.bass_fraction, self.mid_fraction).mean(),
            high: scaled.slice(self.mid_fraction, 1.0).mean(),
            overall: scaled.mean(),
        }
    }

    pub fn aggregate_raw(&self, raw: &[analyzer::SignalStrength]) -> Bands {
        self.aggregate(&self.spectrum(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn aggregator() -> Aggregator {
        BandsBuilder::new()
            .bass_fraction(0.08)
            .mid_fraction(0.4)
            .max_magnitude(255.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_silence() {
        let bands = aggregator().aggregate_raw(&[0.0; 128]);

        assert_eq!(bands, Bands::default());
    }

    #[test]
    fn test_empty() {
        let bands = aggregator().aggregate_raw(&[]);

        assert_eq!(bands, Bands::default());
    }

    #[test]
    fn test_partition() {
        // 100 buckets: 8 bass, 32 mid, 60 high
        let mut raw = vec![0.0; 100];
        for b in raw[..8].iter_mut() {
            *b = 255.0;
        }
        for b in raw[8..40].iter_mut() {
            *b = 127.5;
        }

        let bands = aggregator().aggregate_raw(&raw);
        println!("{:?}", bands);

        assert!((bands.bass - 1.0).abs() < 1e-6);
        assert!((bands.mid - 0.5).abs() < 1e-6);
        assert_eq!(bands.high, 0.0);
        assert!((bands.overall - 0.24).abs() < 1e-6);
    }

    #[test]
    fn test_tiny_spectrum() {
        // A single bucket has no bass partition, which must read as 0 and not NaN
        let bands = aggregator().aggregate_raw(&[255.0]);

        assert_eq!(bands.bass, 0.0);
        assert_eq!(bands.mid, 0.0);
        assert_eq!(bands.high, 1.0);
        assert_eq!(bands.overall, 1.0);
    }

    #[test]
    fn test_degenerate_values() {
        let raw = [std::f32::NAN, -20.0, std::f32::INFINITY, 1000.0];
        let bands = aggregator().aggregate_raw(&raw);

        for v in [bands.bass, bands.mid, bands.high, bands.overall].iter() {
            assert!(v.is_finite());
            assert!(*v >= 0.0 && *v <= 1.0);
        }
    }

    #[test]
    fn test_invalid_fractions() {
        assert!(BandsBuilder::new()
            .bass_fraction(0.5)
            .mid_fraction(0.4)
            .build()
            .is_err());
        assert!(BandsBuilder::new()
            .bass_fraction(0.0)
            .mid_fraction(0.4)
            .build()
            .is_err());
        assert!(BandsBuilder::new()
            .bass_fraction(0.1)
            .mid_fraction(0.4)
            .max_magnitude(0.0)
            .build()
            .is_err());
    }

    proptest! {
        #[test]
        fn bands_stay_in_unit_range(raw in proptest::collection::vec(-500.0f32..800.0, 0..600)) {
            let bands = aggregator().aggregate_raw(&raw);

            for v in [bands.bass, bands.mid, bands.high, bands.overall].iter() {
                prop_assert!(*v >= 0.0 && *v <= 1.0, "{:?}", bands);
            }
        }
    }
}
