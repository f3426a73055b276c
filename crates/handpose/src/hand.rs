//! Hand detection, landmark estimation and tracking.
//!
//! - [`detection`] finds palms in a full frame.
//! - [`landmark`] describes the landmark network and the resulting [`landmark::HandEstimate`].
//! - [`pipeline`] ties both together with region tracking.

pub mod detection;
pub mod landmark;
pub mod pipeline;
