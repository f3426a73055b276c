//! Single-hand landmark tracking.
//!
//! The entry point is [`hand::pipeline::HandPipeline`]. It is fed one frame at a time and yields
//! 21 hand landmarks in the frame's coordinate system, or [`None`] when no hand is visible.
//!
//! Running the palm detector on every frame is expensive, so the pipeline tracks a single region
//! of interest (see [`tracker::RegionTracker`]) and only re-runs detection when tracking is lost
//! or a configurable number of frames have been processed without it. Before the landmark
//! network is run, the frame is rotated so that the hand points upwards; the estimated landmarks
//! are mapped back through every transform applied on the way in.
//!
//! # Coordinates
//!
//! 2D positions use image coordinates: X points right, Y points *down*. Landmark Z values are
//! passed through from the landmark network without any adjustment.
//!
//! # Environment Variables
//!
//! * `HANDPOSE_PACKED_CONV`: overrides whether the landmark network is asked to use packed
//!   convolutions while it runs (`1`/`true` or `0`/`false`). Networks that do not support packed
//!   convolutions ignore this. This includes [`nn::OnnxLandmarkNetwork`]: `tract` has no such
//!   switch, so the variable only affects custom [`hand::landmark::LandmarkNetwork`]
//!   implementations.
//! * `RUST_LOG`: standard [`env_logger`] filter, applied on top of [`init_logger!`].

pub mod detection;
pub mod hand;
pub mod iter;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod region;
pub mod rotation;
pub mod timer;
pub mod tracker;


pub use handpose_image as image;

use log::LevelFilter;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and `handpose` will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
