//! Error taxonomy for the engine.
//!
//! Two kinds, both surfaced synchronously to the immediate caller:
//! - [`Error::InvalidParameter`] : a setter/constructor invariant was
//!   violated; generator state is left untouched
//! - [`Error::Device`]           : the output device could not be opened or a
//!   write failed mid-stream; the call aborts, no retry
//!
//! Segment rendering itself never fails, so nothing else exists here.

use core::fmt;

/// Top-level engine error.
#[derive(Debug)]
pub enum Error {
    /// A parameter violated its invariant (e.g. `speed <= 0`,
    /// `max_freq < min_freq`). Names the offending constraint.
    InvalidParameter { what: &'static str },
    /// The output device failed; see [`DeviceError`].
    Device(DeviceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter { what } => write!(f, "invalid parameter: {what}"),
            Error::Device(e) => write!(f, "output device error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Device(e) => Some(e),
            Error::InvalidParameter { .. } => None,
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

/// What went wrong with the output device. Backend-agnostic so the engine's
/// public surface does not depend on the `realtime` feature.
#[derive(Debug)]
pub enum DeviceError {
    /// No output device is available on the host.
    NoDevice,
    /// The device exposes no stream configuration usable at this rate.
    UnsupportedConfig { sample_rate: u32 },
    /// The backend failed to build or start the stream.
    Stream(String),
    /// The stream went away mid-call; a pending write was not accepted.
    Closed,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoDevice => write!(f, "no output device available"),
            DeviceError::UnsupportedConfig { sample_rate } => {
                write!(f, "no supported output config at {sample_rate} Hz")
            }
            DeviceError::Stream(msg) => write!(f, "stream error: {msg}"),
            DeviceError::Closed => write!(f, "output stream closed"),
        }
    }
}

impl std::error::Error for DeviceError {}

#[cfg(feature = "realtime")]
mod cpal_conv {
    use super::DeviceError;

    impl From<cpal::SupportedStreamConfigsError> for DeviceError {
        fn from(e: cpal::SupportedStreamConfigsError) -> Self {
            DeviceError::Stream(e.to_string())
        }
    }

    impl From<cpal::BuildStreamError> for DeviceError {
        fn from(e: cpal::BuildStreamError) -> Self {
            DeviceError::Stream(e.to_string())
        }
    }

    impl From<cpal::PlayStreamError> for DeviceError {
        fn from(e: cpal::PlayStreamError) -> Self {
            DeviceError::Stream(e.to_string())
        }
    }
}
