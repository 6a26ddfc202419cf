//! The pattern scheduler: random sweeps and holds until a duration is filled.
//!
//! [`ToneWanderer`] owns the tunable parameters, a segment synthesizer, and
//! an injected RNG. `play_for` derives speed-scaled duration ranges once per
//! call, opens the output device scoped to the call, then cycles two
//! patterns, writing every rendered block immediately:
//!
//! - **A**: base → a → base, with optional holds at a and at base
//! - **B**: base → b → c → base, with optional holds at b and c
//!
//! Every target frequency is uniform in `[min_freq, max_freq]`; every
//! duration is uniform in its scaled range. The call stops after the first
//! whole segment that pushes accumulated intended time past the target, so
//! it may overshoot by up to one segment but never cuts a block short.
//!
//! The RNG is constructor-injected so tests can seed a `StdRng` and replay
//! the exact segment sequence.

use rand::Rng;

use wandertone_core::segment::SegmentSynth;

use crate::device::{OutputDevice, OutputStream};
use crate::error::Error;

/// Generator parameters. Durations are seconds, frequencies Hz.
///
/// `speed` divides the base duration bounds: larger values make the tone
/// wander faster. Sweep durations never drop below `floor` no matter how
/// high `speed` goes; hold durations may shrink all the way to zero.
#[derive(Copy, Clone, Debug)]
pub struct WanderConfig {
    pub sample_rate: u32,
    pub base_freq: f64,
    pub min_freq: f64,
    pub max_freq: f64,
    pub amplitude: f32,
    pub speed: f64,
    pub sweep_min: f64,
    pub sweep_max: f64,
    pub hold_min: f64,
    pub hold_max: f64,
    pub floor: f64,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            base_freq: 100.0,
            min_freq: 100.0,
            max_freq: 8_000.0,
            amplitude: 0.2,
            speed: 1.0,
            sweep_min: 0.04,
            sweep_max: 0.25,
            hold_min: 0.0,
            hold_max: 0.05,
            floor: 0.003,
        }
    }
}

/// Read-only snapshot of the externally visible parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WanderState {
    pub base_freq: f64,
    pub min_freq: f64,
    pub max_freq: f64,
    pub amplitude: f32,
    pub speed: f64,
}

/// Duration bounds for one playback call, already divided by `speed`.
#[derive(Copy, Clone, Debug, PartialEq)]
struct SegmentTimes {
    sweep_min: f64,
    sweep_max: f64,
    hold_min: f64,
    hold_max: f64,
}

/// Transient state of one `play_for` call.
struct Session {
    elapsed: f64,
    target: f64,
}

impl Session {
    #[inline]
    fn done(&self) -> bool {
        self.elapsed >= self.target
    }
}

/// The wandering-tone generator. One oscillator phase lives inside, carried
/// across `play_for` calls, so successive calls pick up where the last one
/// left off without a click.
pub struct ToneWanderer<R: Rng> {
    cfg: WanderConfig,
    synth: SegmentSynth,
    rng: R,
}

impl<R: Rng> ToneWanderer<R> {
    /// Validate `config` and build a generator around `rng`.
    pub fn new(cfg: WanderConfig, rng: R) -> Result<Self, Error> {
        if cfg.sample_rate == 0 {
            return Err(Error::InvalidParameter { what: "sample_rate must be > 0" });
        }
        if cfg.speed <= 0.0 {
            return Err(Error::InvalidParameter { what: "speed must be > 0" });
        }
        if cfg.max_freq < cfg.min_freq {
            return Err(Error::InvalidParameter { what: "max_freq must be >= min_freq" });
        }
        if cfg.floor <= 0.0 {
            return Err(Error::InvalidParameter { what: "floor must be > 0" });
        }
        if cfg.sweep_min < 0.0 || cfg.sweep_max < 0.0 || cfg.hold_min < 0.0 || cfg.hold_max < 0.0 {
            return Err(Error::InvalidParameter { what: "duration bounds must be >= 0" });
        }
        Ok(Self {
            synth: SegmentSynth::new(cfg.sample_rate, cfg.amplitude),
            cfg,
            rng,
        })
    }

    /// Replace `speed`. Fails (state unchanged) when `speed <= 0`.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), Error> {
        if speed <= 0.0 {
            return Err(Error::InvalidParameter { what: "speed must be > 0" });
        }
        self.cfg.speed = speed;
        Ok(())
    }

    /// Replace `max_freq`. Fails (state unchanged) when below `min_freq`.
    pub fn set_max_freq(&mut self, max_freq: f64) -> Result<(), Error> {
        if max_freq < self.cfg.min_freq {
            return Err(Error::InvalidParameter { what: "max_freq must be >= min_freq" });
        }
        self.cfg.max_freq = max_freq;
        Ok(())
    }

    /// Current parameter snapshot. No side effects.
    pub fn state(&self) -> WanderState {
        WanderState {
            base_freq: self.cfg.base_freq,
            min_freq: self.cfg.min_freq,
            max_freq: self.cfg.max_freq,
            amplitude: self.cfg.amplitude,
            speed: self.cfg.speed,
        }
    }

    /// Play randomized sweep/hold patterns on `device` until the accumulated
    /// intended duration reaches `seconds`. No-op for `seconds <= 0`.
    ///
    /// The device stream is held only for the span of this call and is
    /// released on every exit path. A write failure aborts the rest of the
    /// pattern; phase state up to the last accepted block stays valid for a
    /// later call.
    pub fn play_for<D: OutputDevice>(&mut self, device: &D, seconds: f64) -> Result<(), Error> {
        if seconds <= 0.0 {
            return Ok(());
        }

        let times = self.scaled_times();
        let base = self.cfg.base_freq;
        let mut stream = device.open_mono(self.cfg.sample_rate)?;
        let mut session = Session { elapsed: 0.0, target: seconds };

        loop {
            // Pattern A: base -> a -> base
            let a = self.draw_freq();
            self.sweep_step(&mut stream, &mut session, &times, base, a)?;
            if session.done() {
                break;
            }
            self.hold_step(&mut stream, &mut session, &times, a)?;
            if session.done() {
                break;
            }
            self.sweep_step(&mut stream, &mut session, &times, a, base)?;
            if session.done() {
                break;
            }
            self.hold_step(&mut stream, &mut session, &times, base)?;
            if session.done() {
                break;
            }

            // Pattern B: base -> b -> c -> base
            let b = self.draw_freq();
            let c = self.draw_freq();
            self.sweep_step(&mut stream, &mut session, &times, base, b)?;
            if session.done() {
                break;
            }
            self.hold_step(&mut stream, &mut session, &times, b)?;
            if session.done() {
                break;
            }
            self.sweep_step(&mut stream, &mut session, &times, b, c)?;
            if session.done() {
                break;
            }
            self.hold_step(&mut stream, &mut session, &times, c)?;
            if session.done() {
                break;
            }
            self.sweep_step(&mut stream, &mut session, &times, c, base)?;
            if session.done() {
                break;
            }
        }
        Ok(())
    }

    /// Base duration bounds divided by `speed`. Sweeps are clamped to the
    /// floor, holds only to zero.
    fn scaled_times(&self) -> SegmentTimes {
        let c = &self.cfg;
        SegmentTimes {
            sweep_min: (c.sweep_min / c.speed).max(c.floor),
            sweep_max: (c.sweep_max / c.speed).max(c.floor),
            hold_min: (c.hold_min / c.speed).max(0.0),
            hold_max: (c.hold_max / c.speed).max(0.0),
        }
    }

    #[inline]
    fn draw_freq(&mut self) -> f64 {
        draw_uniform(&mut self.rng, self.cfg.min_freq, self.cfg.max_freq)
    }

    fn sweep_step<S: OutputStream>(
        &mut self,
        stream: &mut S,
        session: &mut Session,
        times: &SegmentTimes,
        f0: f64,
        f1: f64,
    ) -> Result<(), Error> {
        let dur = draw_uniform(&mut self.rng, times.sweep_min, times.sweep_max);
        let block = self.synth.sweep(f0, f1, dur);
        stream.write(&block)?;
        session.elapsed += dur;
        log::debug!(
            "sweep {f0:.1} -> {f1:.1} Hz, {dur:.3}s ({:.3}/{:.3})",
            session.elapsed,
            session.target
        );
        Ok(())
    }

    fn hold_step<S: OutputStream>(
        &mut self,
        stream: &mut S,
        session: &mut Session,
        times: &SegmentTimes,
        freq: f64,
    ) -> Result<(), Error> {
        let dur = draw_uniform(&mut self.rng, times.hold_min, times.hold_max);
        if dur <= 0.0 {
            // zero-length holds are skipped outright, never synthesized
            return Ok(());
        }
        let block = self.synth.hold(freq, dur);
        stream.write(&block)?;
        session.elapsed += dur;
        log::debug!(
            "hold {freq:.1} Hz, {dur:.3}s ({:.3}/{:.3})",
            session.elapsed,
            session.target
        );
        Ok(())
    }
}

/// Uniform draw over `[lo, hi]`; a degenerate or inverted range collapses to
/// its `lo` endpoint.
#[inline]
fn draw_uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

// --------------------------------- Tests ------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::DeviceError;

    /// In-memory device: records every written block, optionally failing at
    /// open or after a number of accepted writes.
    #[derive(Default)]
    struct MemDevice {
        blocks: Rc<RefCell<Vec<Vec<f32>>>>,
        fail_open: bool,
        fail_after: Option<usize>,
    }

    struct MemStream {
        blocks: Rc<RefCell<Vec<Vec<f32>>>>,
        fail_after: Option<usize>,
        writes: usize,
    }

    impl OutputDevice for MemDevice {
        type Stream = MemStream;

        fn open_mono(&self, _sample_rate: u32) -> Result<MemStream, DeviceError> {
            if self.fail_open {
                return Err(DeviceError::NoDevice);
            }
            Ok(MemStream {
                blocks: Rc::clone(&self.blocks),
                fail_after: self.fail_after,
                writes: 0,
            })
        }
    }

    impl OutputStream for MemStream {
        fn write(&mut self, block: &[f32]) -> Result<(), DeviceError> {
            if Some(self.writes) == self.fail_after {
                return Err(DeviceError::Closed);
            }
            self.writes += 1;
            self.blocks.borrow_mut().push(block.to_vec());
            Ok(())
        }
    }

    fn wanderer(cfg: WanderConfig) -> ToneWanderer<StdRng> {
        ToneWanderer::new(cfg, StdRng::seed_from_u64(0xda7a)).unwrap()
    }

    #[test]
    fn constructor_rejects_bad_config() {
        let rng = StdRng::seed_from_u64(1);
        let bad = WanderConfig { speed: 0.0, ..WanderConfig::default() };
        assert!(matches!(
            ToneWanderer::new(bad, rng.clone()),
            Err(Error::InvalidParameter { .. })
        ));
        let bad = WanderConfig { max_freq: 50.0, ..WanderConfig::default() };
        assert!(ToneWanderer::new(bad, rng.clone()).is_err());
        let bad = WanderConfig { sample_rate: 0, ..WanderConfig::default() };
        assert!(ToneWanderer::new(bad, rng.clone()).is_err());
        let bad = WanderConfig { floor: 0.0, ..WanderConfig::default() };
        assert!(ToneWanderer::new(bad, rng).is_err());
    }

    #[test]
    fn set_speed_round_trips_and_rejects() {
        let mut w = wanderer(WanderConfig::default());
        w.set_speed(0.7).unwrap();
        assert_eq!(w.state().speed, 0.7);

        let before = w.state();
        assert!(w.set_speed(0.0).is_err());
        assert!(w.set_speed(-1.5).is_err());
        assert_eq!(w.state(), before);
    }

    #[test]
    fn set_max_freq_honors_min_freq() {
        let mut w = wanderer(WanderConfig::default());
        w.set_max_freq(500.0).unwrap();
        assert_eq!(w.state().max_freq, 500.0);
        // equal to min_freq is allowed
        w.set_max_freq(100.0).unwrap();
        assert_eq!(w.state().max_freq, 100.0);

        let before = w.state();
        assert!(w.set_max_freq(99.9).is_err());
        assert_eq!(w.state(), before);
    }

    #[test]
    fn nonpositive_duration_writes_nothing() {
        let mut w = wanderer(WanderConfig::default());
        let dev = MemDevice::default();
        w.play_for(&dev, 0.0).unwrap();
        w.play_for(&dev, -1.0).unwrap();
        assert!(dev.blocks.borrow().is_empty());
    }

    #[test]
    fn play_fills_requested_duration() {
        let cfg = WanderConfig::default();
        let mut w = wanderer(cfg);
        let dev = MemDevice::default();
        w.play_for(&dev, 0.5).unwrap();

        let blocks = dev.blocks.borrow();
        assert!(!blocks.is_empty());
        // block lengths round the intended durations to whole samples, so
        // allow half a sample of slack per segment
        let total: usize = blocks.iter().map(Vec::len).sum();
        let played = total as f64 / f64::from(cfg.sample_rate);
        let slack = blocks.len() as f64 * 0.5 / f64::from(cfg.sample_rate);
        assert!(played + slack >= 0.5, "played {played}");
        // and the overshoot is bounded by one segment
        assert!(played <= 0.5 + cfg.sweep_max + slack, "played {played}");
    }

    #[test]
    fn samples_stay_within_amplitude() {
        let cfg = WanderConfig::default();
        let mut w = wanderer(cfg);
        let dev = MemDevice::default();
        w.play_for(&dev, 0.3).unwrap();
        for block in dev.blocks.borrow().iter() {
            for &x in block {
                assert!(x.abs() <= cfg.amplitude + 1e-6, "x={x}");
            }
        }
    }

    #[test]
    fn degenerate_range_plays_a_flat_tone() {
        // min == max == base: every drawn frequency is 100 Hz, so the very
        // first segment is a flat sweep — identical to a faded pure tone
        let cfg = WanderConfig {
            min_freq: 100.0,
            max_freq: 100.0,
            ..WanderConfig::default()
        };
        let mut w = wanderer(cfg);
        let dev = MemDevice::default();
        w.play_for(&dev, 0.05).unwrap();

        let blocks = dev.blocks.borrow();
        let first = &blocks[0];
        let n = first.len();
        let fade = (n / 8).min(256);
        let inc = core::f64::consts::TAU * 100.0 / f64::from(cfg.sample_rate);
        for (i, &x) in first.iter().enumerate() {
            let mut want = (f64::from(cfg.amplitude) * ((i + 1) as f64 * inc).sin()) as f32;
            if fade >= 2 {
                let denom = (fade - 1) as f32;
                if i < fade {
                    want *= i as f32 / denom;
                }
                if i >= n - fade {
                    want *= (n - 1 - i) as f32 / denom;
                }
            }
            assert!((x - want).abs() < 1e-6, "i={i} x={x} want={want}");
        }
    }

    #[test]
    fn speed_divides_times_down_to_the_floor() {
        let mut w = wanderer(WanderConfig::default());
        let base = w.scaled_times();
        assert_eq!(
            base,
            SegmentTimes { sweep_min: 0.04, sweep_max: 0.25, hold_min: 0.0, hold_max: 0.05 }
        );

        w.set_speed(2.0).unwrap();
        let t = w.scaled_times();
        assert_eq!(
            t,
            SegmentTimes { sweep_min: 0.02, sweep_max: 0.125, hold_min: 0.0, hold_max: 0.025 }
        );

        // extreme speed: sweeps bottom out at the floor, holds at zero
        w.set_speed(1_000.0).unwrap();
        let t = w.scaled_times();
        assert_eq!(t.sweep_min, 0.003);
        assert_eq!(t.sweep_max, 0.003);
        assert_eq!(t.hold_min, 0.0);
        assert!(t.hold_max < 0.001);
    }

    #[test]
    fn draw_collapses_degenerate_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(draw_uniform(&mut rng, 5.0, 5.0), 5.0);
        // inverted range (possible under extreme speeds) yields the lo end
        assert_eq!(draw_uniform(&mut rng, 5.0, 2.0), 5.0);
        let x = draw_uniform(&mut rng, 1.0, 2.0);
        assert!((1.0..=2.0).contains(&x));
    }

    #[test]
    fn open_failure_aborts_before_any_samples() {
        let mut w = wanderer(WanderConfig::default());
        let dev = MemDevice { fail_open: true, ..MemDevice::default() };
        let err = w.play_for(&dev, 1.0).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NoDevice)));
        assert!(dev.blocks.borrow().is_empty());
    }

    #[test]
    fn write_failure_aborts_but_instance_survives() {
        let mut w = wanderer(WanderConfig::default());
        let dev = MemDevice { fail_after: Some(2), ..MemDevice::default() };
        let err = w.play_for(&dev, 5.0).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::Closed)));
        assert_eq!(dev.blocks.borrow().len(), 2);

        // phase state is still valid; a fresh device plays fine
        let dev = MemDevice::default();
        w.play_for(&dev, 0.1).unwrap();
        assert!(!dev.blocks.borrow().is_empty());
    }

    #[test]
    fn playback_sequence_is_deterministic_under_a_seed() {
        let run = |seed: u64| {
            let mut w = ToneWanderer::new(
                WanderConfig::default(),
                StdRng::seed_from_u64(seed),
            )
            .unwrap();
            let dev = MemDevice::default();
            w.play_for(&dev, 0.4).unwrap();
            let blocks = dev.blocks.borrow();
            blocks.iter().map(Vec::len).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
