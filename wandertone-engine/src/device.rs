//! Output device collaborator: a blocking mono `f32` block sink.
//!
//! The scheduler only needs two things from audio output:
//! - open a mono stream at a given sample rate, scoped to one playback call
//! - `write` a rendered block, blocking until the device has accepted it
//!
//! Those live in the [`OutputDevice`] / [`OutputStream`] traits so tests can
//! substitute an in-memory sink. The real implementation, [`CpalOutput`]
//! (behind the `realtime` feature), feeds a CPAL stream through a bounded
//! channel: `write` pushes samples into the channel and blocks when it is
//! full, which paces the scheduler to the device's drain rate. Dropping the
//! stream handle releases the device.

use crate::error::DeviceError;

/// A source of scoped output streams. Opening does not outlive the playback
/// call that requested it; release happens when the stream handle drops.
pub trait OutputDevice {
    type Stream: OutputStream;

    /// Open a mono `f32` stream at `sample_rate` Hz.
    fn open_mono(&self, sample_rate: u32) -> Result<Self::Stream, DeviceError>;
}

/// One open stream. `write` blocks until the block has been accepted.
pub trait OutputStream {
    fn write(&mut self, block: &[f32]) -> Result<(), DeviceError>;
}

#[cfg(feature = "realtime")]
pub use cpal_impl::{CpalOutput, CpalStream};

#[cfg(feature = "realtime")]
mod cpal_impl {
    use std::sync::mpsc::{Receiver, SyncSender};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};

    use super::{OutputDevice, OutputStream};
    use crate::error::DeviceError;

    /// The default host's default output device.
    #[derive(Debug, Default)]
    pub struct CpalOutput;

    impl CpalOutput {
        pub fn new() -> Self {
            Self
        }
    }

    impl OutputDevice for CpalOutput {
        type Stream = CpalStream;

        fn open_mono(&self, sample_rate: u32) -> Result<CpalStream, DeviceError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
            if let Ok(name) = device.name() {
                log::info!("output device: {name}");
            }

            let sup_cfg = choose_config(&device, sample_rate)?;
            let sample_format = sup_cfg.sample_format();
            let cfg = sup_cfg.config();
            log::info!(
                "stream config: {} Hz, {} ch, format {sample_format:?}",
                cfg.sample_rate.0,
                cfg.channels
            );

            match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg),
                other => Err(DeviceError::Stream(format!(
                    "unsupported device sample format: {other:?}"
                ))),
            }
        }
    }

    /// Pick a supported config range that can run at `sample_rate`.
    fn choose_config(
        device: &cpal::Device,
        sample_rate: u32,
    ) -> Result<cpal::SupportedStreamConfig, DeviceError> {
        let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
        for range in device.supported_output_configs()? {
            let sr_min = range.min_sample_rate().0;
            let sr_max = range.max_sample_rate().0;

            // distance from the requested rate; 0 when the range contains it,
            // with a small channel-count tiebreak (fewer channels preferred)
            let sr_pen = if (sr_min..=sr_max).contains(&sample_rate) {
                0
            } else {
                u64::from(sr_min.abs_diff(sample_rate).min(sr_max.abs_diff(sample_rate)))
            };
            let score = sr_pen.saturating_mul(100_000) + u64::from(range.channels());
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, range));
            }
        }

        let (score, range) = best.ok_or(DeviceError::UnsupportedConfig { sample_rate })?;
        if score >= 100_000 {
            // nothing contains the requested rate
            return Err(DeviceError::UnsupportedConfig { sample_rate });
        }
        Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        cfg: &cpal::StreamConfig,
    ) -> Result<CpalStream, DeviceError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = cfg.channels as usize;
        // about a quarter second of buffered audio between scheduler and
        // callback; `write` blocks once this is full
        let capacity = (cfg.sample_rate.0 / 4).max(1) as usize;
        let (tx, rx) = std::sync::mpsc::sync_channel::<f32>(capacity);

        let err_fn = |e: cpal::StreamError| log::error!("cpal stream error: {e}");
        let stream = device.build_output_stream(
            cfg,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_frames(output, channels, &rx)
            },
            err_fn,
            None,
        )?;
        stream.play()?;

        Ok(CpalStream { tx, _stream: stream })
    }

    /// Drain queued mono samples into the interleaved device buffer,
    /// duplicating each across all channels. Once the producer side is gone
    /// the remainder is filled with silence.
    fn fill_frames<T>(output: &mut [T], channels: usize, rx: &Receiver<f32>)
    where
        T: SizedSample + FromSample<f32>,
    {
        for frame in output.chunks_mut(channels) {
            let s = rx.recv().unwrap_or(0.0);
            let v: T = T::from_sample(s);
            for slot in frame.iter_mut() {
                *slot = v;
            }
        }
    }

    /// An open CPAL stream. Owns the backend stream handle; dropping this
    /// stops playback and releases the device.
    pub struct CpalStream {
        tx: SyncSender<f32>,
        _stream: cpal::Stream,
    }

    impl OutputStream for CpalStream {
        fn write(&mut self, block: &[f32]) -> Result<(), DeviceError> {
            for &sample in block {
                self.tx.send(sample).map_err(|_| DeviceError::Closed)?;
            }
            Ok(())
        }
    }
}
