//! CPU image buffers and axis-aligned box geometry.
//!
//! # Overview
//!
//! [`Image`] is an owned 8-bit sRGBA image. It only supports the handful of operations a
//! landmark tracker needs on its input frames: rotating the whole frame about an arbitrary point,
//! and cutting out a (possibly out-of-bounds) rectangle resampled to a fixed network input size.
//! Pixels that fall outside of the source image read as [`Color::NONE`].
//!
//! [`rect::Rect`] is the box type used throughout the tracker. All of its operations return new
//! values instead of mutating in place.
//!
//! # Coordinates
//!
//! Image coordinates are continuous: pixel `(x, y)` covers the area from `(x, y)` to
//! `(x + 1, y + 1)`, so its center lies at `(x + 0.5, y + 0.5)`. X points right, Y points down.

pub mod rect;

mod color;
mod image;
mod resolution;


pub use color::Color;
pub use self::image::*;
pub use resolution::Resolution;
