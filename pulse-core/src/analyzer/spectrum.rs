//! Spectrum Storage Type

/// Type Alias for Signal Strengths
pub type SignalStrength = f32;

/// Trait for types that can be used as storage for a spectrum
pub trait Storage: std::ops::Deref<Target = [SignalStrength]> {}

/// Trait for types that can be used as mutable storage for a spectrum
pub trait StorageMut: std::ops::Deref<Target = [SignalStrength]> + std::ops::DerefMut {}

impl<T> Storage for T where T: std::ops::Deref<Target = [SignalStrength]> {}

impl<T> StorageMut for T where T: Storage + std::ops::DerefMut {}

/// Magnitude spectrum as delivered by the upstream spectral analysis
///
/// Buckets are ordered from low to high frequencies.  `scale` is the largest
/// representable magnitude (255 for byte spectra), used to normalize into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Spectrum<S: Storage> {
    buckets: S,
    scale: SignalStrength,
}

impl<S: Storage> std::ops::Index<usize> for Spectrum<S> {
    type Output = SignalStrength;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buckets[index]
    }
}

impl<S: StorageMut> std::ops::IndexMut<usize> for Spectrum<S> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.buckets[index]
    }
}

impl Default for Spectrum<Vec<SignalStrength>> {
    fn default() -> Self {
        Spectrum {
            buckets: Vec::new(),
            scale: 255.0,
        }
    }
}

impl<S: Storage> Spectrum<S> {
    /// Create a new spectrum
    ///
    /// Takes a storage buffer which is potentially prefilled with spectral data and
    /// the maximum representable magnitude.
    ///
    /// # Example
    /// ```
    /// # use pulse_core::analyzer;
    /// const N: usize = 128;
    /// let spectrum = analyzer::Spectrum::new(vec![0.0; N], 255.0);
    /// # assert_eq!(spectrum.len(), N);
    /// ```
    pub fn new(data: S, scale: SignalStrength) -> Spectrum<S> {
        Spectrum {
            buckets: data,
            scale,
        }
    }

    /// Largest representable magnitude
    #[inline]
    pub fn scale(&self) -> SignalStrength {
        self.scale
    }

    /// Iterate over the buckets of this spectrum
    pub fn iter<'a>(&'a self) -> std::slice::Iter<'a, SignalStrength> {
        self.buckets.iter()
    }

    /// Return the number of buckets in this spectrum
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn as_slice(&self) -> &[SignalStrength] {
        &self.buckets
    }

    pub fn as_ref<'a>(&'a self) -> Spectrum<&'a [SignalStrength]> {
        Spectrum {
            buckets: &self.buckets,
            scale: self.scale,
        }
    }

    /// Normalized magnitude of a bucket, in `[0, 1]`
    ///
    /// NaN and negative magnitudes read as silence.
    #[inline]
    pub fn level(&self, index: usize) -> SignalStrength {
        if self.scale > 0.0 {
            crate::helpers::unit(self.buckets[index] / self.scale)
        } else {
            0.0
        }
    }

    /// Return the highest normalized signal strength in this spectrum
    ///
    /// Empty spectra are silent.
    pub fn max(&self) -> SignalStrength {
        (0..self.len()).map(|i| self.level(i)).fold(0.0, f32::max)
    }

    /// Return the average normalized signal strength in this spectrum
    ///
    /// Empty spectra are silent.
    pub fn mean(&self) -> SignalStrength {
        if self.is_empty() {
            return 0.0;
        }

        (0..self.len()).map(|i| self.level(i)).sum::<SignalStrength>() / self.len() as f32
    }

    /// Index range covering the fraction `[low, high)` of the buckets
    pub fn fraction_range(&self, low: f32, high: f32) -> std::ops::Range<usize> {
        let len = self.len();
        let start = ((len as f32 * low.max(0.0)).floor() as usize).min(len);
        let end = ((len as f32 * high.min(1.0)).floor() as usize).min(len);

        start..end.max(start)
    }

    /// Return a spectrum with the buckets in the fraction `[low, high)`
    ///
    /// Requires **no** allocation!
    ///
    /// # Example
    /// ```
    /// # use pulse_core::analyzer;
    /// let spectrum = analyzer::Spectrum::new(vec![0.0; 400], 255.0);
    /// let bass = spectrum.slice(0.0, 0.08);
    /// # assert_eq!(bass.len(), 32);
    /// ```
    pub fn slice<'a>(&'a self, low: f32, high: f32) -> Spectrum<&'a [SignalStrength]> {
        let range = self.fraction_range(low, high);

        Spectrum {
            buckets: &self.buckets[range],
            scale: self.scale,
        }
    }

    /// Allocate a buffer and fill it with data from this spectrum
    ///
    /// Will merge adjacent buckets to fit data into the new buffer.
    pub fn fill_buckets_alloc(&self, n: usize) -> Spectrum<Vec<f32>> {
        self.fill_buckets(vec![0.0; n])
    }

    /// Fill a given buffer with data from this spectrum
    ///
    /// Adjacent buckets are averaged when downscaling.  When upscaling, buckets are
    /// repeated.  Values stay in the scale of this spectrum.
    ///
    /// # Example
    /// ```
    /// # use pulse_core::analyzer;
    /// let spectrum = analyzer::Spectrum::new(vec![10.0; 400], 255.0);
    /// let downscaled = spectrum.fill_buckets(vec![0.0; 20]);
    /// # assert_eq!(downscaled.len(), 20);
    /// # assert_eq!(downscaled[3], 10.0);
    /// ```
    pub fn fill_buckets<S2: StorageMut>(&self, mut buf: S2) -> Spectrum<S2> {
        let n = buf.len();
        let len = self.len();

        for (bucket, b) in buf.iter_mut().enumerate() {
            if len == 0 {
                *b = 0.0;
                continue;
            }

            let start = bucket * len / n;
            let end = ((bucket + 1) * len / n).max(start + 1).min(len);
            let sum = (start..end)
                .map(|i| self.level(i) * self.scale)
                .sum::<SignalStrength>();
            *b = sum / (end - start) as SignalStrength;
        }

        Spectrum {
            buckets: buf,
            scale: self.scale,
        }
    }
}

impl<S: StorageMut> Spectrum<S> {
    /// Iterate over this spectrums buckets mutably
    pub fn iter_mut<'a>(&'a mut self) -> std::slice::IterMut<'a, SignalStrength> {
        self.buckets.iter_mut()
    }
}

impl<'a> Spectrum<&'a [SignalStrength]> {
    /// Unwrap a borrowed spectrum into the slice it borrows from
    pub fn into_slice(self) -> &'a [SignalStrength] {
        self.buckets
    }
}

impl Spectrum<Vec<SignalStrength>> {
    /// Copy raw magnitudes into this spectrum, clamping them into `[0, scale]`
    ///
    /// NaN becomes silence.  The first call fixes the length; later calls with a
    /// different length are truncated or zero-padded so the length stays constant
    /// for the session.
    pub fn fill_from_raw(&mut self, raw: &[SignalStrength]) {
        if self.buckets.is_empty() {
            self.buckets.resize(raw.len(), 0.0);
        } else if raw.len() != self.buckets.len() {
            log::trace!(
                "Spectrum length changed from {} to {}, adjusting",
                self.buckets.len(),
                raw.len()
            );
        }

        let scale = self.scale;
        for (i, b) in self.buckets.iter_mut().enumerate() {
            *b = match raw.get(i) {
                Some(v) if v.is_nan() => 0.0,
                Some(v) => v.max(0.0).min(scale),
                None => 0.0,
            };
        }
    }

    /// Forget the session length
    pub fn reset(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn do_tests<F: FnMut(usize, Spectrum<Vec<f32>>)>(mut f: F) {
        for n in [0, 1, 7, 100, 128, 512, 1024, 1337].iter().cloned() {
            println!("Parameters: N: {:5}", n);
            let spectrum = Spectrum::new(
                (0..n).map(|x| (x % 256) as f32).collect::<Vec<_>>(),
                255.0,
            );

            f(n, spectrum)
        }
    }

    #[test]
    fn test_iter() {
        do_tests(|_, spectrum| {
            let bucket_list = spectrum.iter().cloned().collect::<Vec<f32>>();

            assert_eq!(bucket_list, &*spectrum.buckets);
        })
    }

    #[test]
    fn test_into_slice() {
        let owned = Spectrum::new(vec![1.0, 2.0, 3.0, 4.0], 255.0);
        let slice = {
            let view = owned.slice(0.5, 1.0);
            view.into_slice()
        };
        assert_eq!(slice, &[3.0, 4.0]);
    }

    #[test]
    fn test_ranges() {
        do_tests(|n, spectrum| {
            println!("- Fractions partition the spectrum");
            let a = spectrum.fraction_range(0.0, 0.08);
            let b = spectrum.fraction_range(0.08, 0.4);
            let c = spectrum.fraction_range(0.4, 1.0);
            assert_eq!(a.start, 0);
            assert_eq!(a.end, b.start);
            assert_eq!(b.end, c.start);
            assert_eq!(c.end, n);

            println!("- Out of range fractions are clamped");
            assert_eq!(spectrum.fraction_range(-1.0, 2.0), 0..n);
            assert_eq!(spectrum.fraction_range(0.7, 0.2).len(), 0);
        })
    }

    #[test]
    fn test_levels() {
        do_tests(|_, spectrum| {
            let mean = spectrum.mean();
            let max = spectrum.max();
            assert!(mean >= 0.0 && mean <= 1.0);
            assert!(max >= 0.0 && max <= 1.0);
            assert!(mean <= max);
        })
    }

    #[test]
    fn test_fill() {
        let mut buf = Some(vec![50.0; 20]);
        do_tests(|n, spectrum| {
            let buckets = spectrum.fill_buckets(buf.take().unwrap());
            assert_eq!(buckets.len(), 20);

            if n == 0 {
                assert!(buckets.iter().all(|b| *b == 0.0));
            } else {
                let max = spectrum.iter().cloned().fold(0.0, f32::max);
                assert!(buckets.iter().all(|b| *b >= 0.0 && *b <= max));
            }

            buf = Some(buckets.buckets);
        })
    }

    #[test]
    fn test_fill_upscale() {
        let spectrum = Spectrum::new(vec![0.0, 255.0], 255.0);
        let up = spectrum.fill_buckets_alloc(4);

        assert_eq!(up.as_slice(), &[0.0, 0.0, 255.0, 255.0]);
    }

    #[test]
    fn test_fill_from_raw() {
        let mut spectrum = Spectrum::default();

        spectrum.fill_from_raw(&[-4.0, std::f32::NAN, 300.0, 17.0]);
        assert_eq!(spectrum.as_slice(), &[0.0, 0.0, 255.0, 17.0]);

        // Length stays fixed for the session
        spectrum.fill_from_raw(&[1.0, 2.0]);
        assert_eq!(spectrum.as_slice(), &[1.0, 2.0, 0.0, 0.0]);

        spectrum.reset();
        spectrum.fill_from_raw(&[3.0]);
        assert_eq!(spectrum.as_slice(), &[3.0]);
    }
}
