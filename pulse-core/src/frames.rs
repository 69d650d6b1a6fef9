use crate::analyzer;

/// Named band of an [`AudioFrame`](struct.AudioFrame.html)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mid,
    High,
    Overall,
}

/// Audio features for one animation tick
///
/// Recreated by the host every tick.  Scalars are in `[0, 1]`; `spectrum` holds the
/// sanitized raw magnitudes in `[0, scale]` and keeps its length within a session.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    pub bass: analyzer::SignalStrength,
    pub mid: analyzer::SignalStrength,
    pub high: analyzer::SignalStrength,
    pub overall: analyzer::SignalStrength,
    pub beat: bool,

    /// Seconds since the host started
    pub time: f32,
    /// Seconds since the previous update of the active animation
    pub dt: f32,

    pub spectrum: &'a [analyzer::SignalStrength],
    pub scale: analyzer::SignalStrength,
}

impl<'a> AudioFrame<'a> {
    pub fn new(
        bands: analyzer::Bands,
        beat: bool,
        time: f32,
        dt: f32,
        spectrum: analyzer::Spectrum<&'a [analyzer::SignalStrength]>,
    ) -> AudioFrame<'a> {
        AudioFrame {
            bass: bands.bass,
            mid: bands.mid,
            high: bands.high,
            overall: bands.overall,
            beat,
            time,
            dt,
            scale: spectrum.scale(),
            spectrum: spectrum.into_slice(),
        }
    }

    /// A frame without any signal, eg. for priming a freshly built scene
    pub fn silent(time: f32, dt: f32) -> AudioFrame<'static> {
        AudioFrame {
            bass: 0.0,
            mid: 0.0,
            high: 0.0,
            overall: 0.0,
            beat: false,
            time,
            dt,
            spectrum: &[],
            scale: 255.0,
        }
    }

    /// Copy of this frame with every scalar forced into its valid range
    pub fn clamped(&self) -> AudioFrame<'a> {
        use crate::helpers::unit;

        AudioFrame {
            bass: unit(self.bass),
            mid: unit(self.mid),
            high: unit(self.high),
            overall: unit(self.overall),
            time: if self.time.is_finite() { self.time } else { 0.0 },
            dt: if self.dt.is_finite() {
                self.dt.max(0.0)
            } else {
                0.0
            },
            ..*self
        }
    }

    pub fn band(&self, band: Band) -> analyzer::SignalStrength {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::High => self.high,
            Band::Overall => self.overall,
        }
    }

    /// Sum of bass, mid and high
    pub fn energy(&self) -> f32 {
        self.bass + self.mid + self.high
    }

    pub fn spectrum(&self) -> analyzer::Spectrum<&'a [analyzer::SignalStrength]> {
        analyzer::Spectrum::new(self.spectrum, self.scale)
    }

    /// Nominal 60Hz steps covered by this frame
    pub fn steps(&self) -> f32 {
        self.dt * 60.0
    }
}

/// Background tint derived from a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backdrop {
    pub hue_a: f32,
    pub lightness_a: f32,
    pub hue_b: f32,
    pub glow: f32,
}

impl Default for Backdrop {
    fn default() -> Self {
        Backdrop {
            hue_a: 200.0,
            lightness_a: 60.0,
            hue_b: 160.0,
            glow: 0.2,
        }
    }
}

impl Backdrop {
    pub fn from_frame(frame: &AudioFrame) -> Backdrop {
        use crate::helpers::lerp;

        let boost = if frame.beat { 0.2 } else { 0.0 };
        Backdrop {
            hue_a: lerp(200.0, 320.0, frame.mid + boost).floor(),
            lightness_a: 60.0 + if frame.beat { 20.0 } else { 0.0 },
            hue_b: lerp(160.0, 260.0, frame.high).floor(),
            glow: 0.2 + frame.mid * 0.6,
        }
    }

    pub fn colors(&self) -> (String, String) {
        (
            crate::helpers::hsl(self.hue_a, 95.0, self.lightness_a),
            crate::helpers::hsl(self.hue_b, 95.0, 60.0),
        )
    }
}

/// Producer side of a spectrum hand-off
///
/// The spectral analysis runs asynchronously to the render loop.  It publishes into
/// a triple buffer, the render loop always reads the latest complete spectrum
/// without ever blocking.
pub struct SpectrumFeed {
    input: triple_buffer::Input<Vec<analyzer::SignalStrength>>,
    len: usize,
}

/// Consumer side of a spectrum hand-off
pub struct SpectrumTap {
    output: triple_buffer::Output<Vec<analyzer::SignalStrength>>,
}

impl std::fmt::Debug for SpectrumFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SpectrumFeed").field("len", &self.len).finish()
    }
}

impl std::fmt::Debug for SpectrumTap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SpectrumTap").finish()
    }
}

impl SpectrumFeed {
    /// Create a hand-off for spectra of `len` buckets
    pub fn new(len: usize) -> (SpectrumFeed, SpectrumTap) {
        let (input, output) = triple_buffer::TripleBuffer::new(vec![0.0; len]).split();

        (SpectrumFeed { input, len }, SpectrumTap { output })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Publish a new spectrum
    ///
    /// Data longer than the feed is truncated, shorter data is zero-padded.
    pub fn publish(&mut self, data: &[analyzer::SignalStrength]) {
        let len = self.len;
        self.publish_with(|buf| {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = data.get(i).cloned().unwrap_or(0.0);
            }
            debug_assert_eq!(buf.len(), len);
        });
    }

    /// Fill the back buffer in place and publish it
    pub fn publish_with<F: FnOnce(&mut [analyzer::SignalStrength])>(&mut self, f: F) {
        let buf = self.input.raw_input_buffer();
        buf.resize(self.len, 0.0);
        f(&mut buf[..]);
        self.input.raw_publish();
    }

    /// Move this feed to a producer thread running at `rate` spectra per second
    ///
    /// The producer closure fills the buffer; returning `false` ends the thread.
    pub fn spawn<F>(
        mut self,
        rate: usize,
        mut producer: F,
    ) -> std::io::Result<std::thread::JoinHandle<()>>
    where
        F: FnMut(&mut [analyzer::SignalStrength]) -> bool + Send + 'static,
    {
        let conv_time = std::time::Duration::new(0, (1_000_000_000 / rate.max(1)) as u32);

        std::thread::Builder::new()
            .name("spectrum".into())
            .spawn(move || {
                let mut start = std::time::Instant::now();
                loop {
                    let mut running = true;
                    self.publish_with(|buf| running = producer(buf));
                    if !running {
                        log::debug!("Spectrum producer finished");
                        break;
                    }

                    let now = std::time::Instant::now();
                    let duration = now - start;
                    log::trace!("Spectrum Time: {:?}", duration);
                    start = now;

                    if duration < conv_time {
                        std::thread::sleep(conv_time - duration);
                    }
                }
            })
    }
}

impl SpectrumTap {
    /// The most recently published spectrum
    pub fn latest(&mut self) -> &[analyzer::SignalStrength] {
        self.output.read()
    }
}
