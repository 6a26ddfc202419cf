#![cfg_attr(not(feature = "std"), no_std)]
//! Wandertone Core — phase-continuous segment synthesis for a wandering sine tone.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use the `libm` math backend
//! - `fast-math`: polynomial sine approximation in the render loop
//!
//! Modules
//! - [`dsp`]     : math backend selection, phase wrapping, sine evaluation
//! - [`segment`] : the sweep/hold block renderer with a running oscillator phase
//!
//! Design
//! - Phase is accumulated in `f64` and carried across every rendered segment,
//!   so adjacent blocks join without a discontinuity in instantaneous phase.
//! - Blocks are mono `f32` and sized from the requested duration; a block is
//!   never empty.

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod dsp;
pub mod segment;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{sin_phase, wrap_phase_tau, TAU};
    pub use crate::segment::SegmentSynth;
}
