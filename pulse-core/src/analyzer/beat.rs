use crate::analyzer;

#[derive(Debug, Default, Clone)]
pub struct BeatBuilder {
    /// Bass level that has to be exceeded for a beat
    ///
    /// Can also be set from config as `"beat.threshold"`.
    pub threshold: Option<analyzer::SignalStrength>,

    /// Seconds after a beat during which no new beat is accepted, inclusive
    ///
    /// Can also be set from config as `"beat.cooldown"`.
    pub cooldown: Option<f32>,
}

impl BeatBuilder {
    pub fn new() -> BeatBuilder {
        Default::default()
    }

    pub fn threshold(&mut self, threshold: analyzer::SignalStrength) -> &mut BeatBuilder {
        self.threshold = Some(threshold);
        self
    }

    pub fn cooldown(&mut self, cooldown: f32) -> &mut BeatBuilder {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn build(&mut self) -> BeatDetector {
        BeatDetector::from_builder(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatState {
    /// Ready to fire
    Armed,
    /// A beat was accepted at `since`, further beats are suppressed
    Refractory { since: f32 },
}

/// Edge-triggered beat classifier over the bass band
///
/// A beat fires when bass is above the threshold *and* higher than the previous
/// sample, and strictly more than the cooldown has passed since the last accepted
/// beat.  A flat plateau never re-fires; a new beat needs the bass to dip and rise
/// again.  Over `d` seconds this gives at most `floor(d / cooldown)` beats after the
/// first one.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    threshold: analyzer::SignalStrength,
    cooldown: f32,

    last_bass: analyzer::SignalStrength,
    last_beat: Option<f32>,
    beats: u64,
}

impl BeatDetector {
    pub fn from_builder(build: &BeatBuilder) -> BeatDetector {
        BeatDetector {
            threshold: build
                .threshold
                .unwrap_or_else(|| crate::config_or!("beat.threshold", 0.35)),
            cooldown: build
                .cooldown
                .unwrap_or_else(|| crate::config_or!("beat.cooldown", 0.2))
                .max(0.0),

            last_bass: 0.0,
            last_beat: None,
            beats: 0,
        }
    }

    pub fn last_bass(&self) -> analyzer::SignalStrength {
        self.last_bass
    }

    /// Number of beats accepted since the last reset
    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn state(&self, now: f32) -> BeatState {
        match self.last_beat {
            Some(since) if self.cooling(since, now) => BeatState::Refractory { since },
            _ => BeatState::Armed,
        }
    }

    fn cooling(&self, since: f32, now: f32) -> bool {
        // A clock that jumped backwards belongs to a new session
        now >= since && now - since <= self.cooldown
    }

    pub fn detect(&mut self, bass: analyzer::SignalStrength, now: f32) -> bool {
        let bass = crate::helpers::unit(bass);
        let rising = bass > self.last_bass;
        self.last_bass = bass;

        if let BeatState::Refractory { .. } = self.state(now) {
            return false;
        }

        if rising && bass > self.threshold {
            log::trace!("Beat@{:.3}: {:.3}", now, bass);
            self.last_beat = Some(now);
            self.beats += 1;
            true
        } else {
            false
        }
    }

    /// Forget all history, eg. on track change
    pub fn reset(&mut self) {
        self.last_bass = 0.0;
        self.last_beat = None;
        self.beats = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detector() -> BeatDetector {
        BeatBuilder::new().threshold(0.35).cooldown(0.2).build()
    }

    #[test]
    fn test_single_rise() {
        let mut beat = detector();
        let mut fired = 0;

        for i in 0..100 {
            let bass = if i < 10 { 0.1 } else { 0.8 };
            if beat.detect(bass, i as f32 * 0.016) {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(beat.beats(), 1);
    }

    #[test]
    fn test_plateau_does_not_refire() {
        let mut beat = detector();

        let fired = (0..10)
            .map(|i| beat.detect(0.9, i as f32 * 0.25))
            .filter(|b| *b)
            .count();

        assert_eq!(fired, 1);
    }

    #[test]
    fn test_reascension_after_cooldown() {
        let mut beat = detector();

        assert!(beat.detect(0.9, 0.0));
        assert!(!beat.detect(0.2, 0.1));
        // Rising, but still in the refractory window
        assert!(!beat.detect(0.9, 0.15));
        assert_eq!(beat.state(0.15), BeatState::Refractory { since: 0.0 });
        assert!(!beat.detect(0.2, 0.25));
        assert_eq!(beat.state(0.25), BeatState::Armed);
        assert!(beat.detect(0.9, 0.3));
    }

    #[test]
    fn test_below_threshold() {
        let mut beat = detector();

        for i in 0..50 {
            let bass = (i % 5) as f32 * 0.08;
            assert!(!beat.detect(bass, i as f32 * 0.3));
        }
    }

    #[test]
    fn test_degenerate_input() {
        let mut beat = detector();

        assert!(!beat.detect(std::f32::NAN, 0.0));
        assert!(!beat.detect(-1.0, 0.5));
        assert!(beat.detect(std::f32::INFINITY, 1.0));
        assert_eq!(beat.last_bass(), 1.0);
    }

    #[test]
    fn test_reset() {
        let mut beat = detector();

        assert!(beat.detect(0.9, 10.0));
        beat.reset();
        assert_eq!(beat.state(10.05), BeatState::Armed);
        assert!(beat.detect(0.9, 10.05));
    }

    #[test]
    fn test_refire_needs_more_than_cooldown() {
        let mut beat = detector();

        let fired = (0..5)
            .map(|i| i as f32 * 0.1)
            .filter(|now| {
                let bass = if (*now * 10.0).round() as usize % 2 == 0 { 0.9 } else { 0.1 };
                beat.detect(bass, *now)
            })
            .collect::<Vec<_>>();

        // 0.2 is exactly one cooldown after the first beat
        assert_eq!(fired, vec![0.0, 0.4]);
        assert_eq!(fired.len(), (0.4f32 / beat.cooldown()).floor() as usize);
    }

    proptest! {
        #[test]
        fn fast_oscillation_is_bounded(
            windows in 1usize..8,
            subdivision in 0u32..4,
        ) {
            // Dyadic steps keep every timestamp exact
            let cooldown = 0.25;
            let dt = cooldown / (1 << subdivision) as f32;
            let mut beat = BeatBuilder::new().threshold(0.35).cooldown(cooldown).build();

            let samples = windows << subdivision;
            let fired = (0..=samples)
                .filter(|i| beat.detect(if i % 2 == 0 { 0.9 } else { 0.1 }, *i as f32 * dt))
                .count();

            let duration = samples as f32 * dt;
            prop_assert!(fired >= 1);
            prop_assert!(fired <= (duration / cooldown).floor() as usize);
        }

        #[test]
        fn beats_are_bounded_by_cooldown(
            levels in proptest::collection::vec(0.0f32..1.0, 1..400),
            dt in 0.005f32..0.19,
        ) {
            let mut beat = detector();
            let mut last = None;
            let mut fired = 0usize;

            for (i, bass) in levels.iter().enumerate() {
                let now = i as f32 * dt;
                if beat.detect(*bass, now) {
                    if let Some(prev) = last {
                        prop_assert!(now - prev > beat.cooldown());
                    }
                    last = Some(now);
                    fired += 1;
                }
            }

            // The first sample may fire at once, every later beat waits out a cooldown
            let span = (levels.len() - 1) as f32 * dt;
            let refires = fired.saturating_sub(1);
            prop_assert!(
                refires <= (span / beat.cooldown() + 1e-3).floor() as usize,
                "{} beats in {}s",
                fired,
                span
            );
        }
    }
}
