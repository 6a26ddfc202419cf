//! Wandertone Engine — randomized pattern scheduling + realtime output glue.
//!
//! Crate layout:
//! - [`wanderer`] : `ToneWanderer`, the scheduler that sequences random
//!   sweeps and holds until a requested playback duration is filled
//! - [`device`]   : `OutputDevice`/`OutputStream` traits and the CPAL-backed
//!   blocking mono sink (behind the `realtime` feature)
//! - [`error`]    : the two-kind error taxonomy (invalid parameter / device)
//!
//! The scheduler is synchronous and single-threaded: `play_for` renders one
//! segment at a time and blocks on each device write. The device's own
//! buffering provides backpressure, which is the intended realtime pacing;
//! there is no producer/consumer queue here.

pub mod device;
pub mod error;
pub mod wanderer;

// Re-export some commonly used items to make downstream imports ergonomic.
#[cfg(feature = "realtime")]
pub use device::CpalOutput;
pub use device::{OutputDevice, OutputStream};
pub use error::{DeviceError, Error};
pub use wanderer::{ToneWanderer, WanderConfig, WanderState};
