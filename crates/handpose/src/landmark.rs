//! Landmark collections.

use handpose_image::rect::Rect;
use nalgebra::{Point2, Point3};

/// A fixed-size list of 3D landmark positions.
///
/// X and Y are in image coordinates, Z is whatever depth value the landmark network produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: Box<[Point3<f64>]>,
}

impl Landmarks {
    /// Creates a new [`Landmarks`] collection containing `len` preallocated landmarks.
    ///
    /// All landmarks will start with all coordinates at `0.0`.
    pub fn new(len: usize) -> Self {
        Self {
            positions: vec![Point3::origin(); len].into_boxed_slice(),
        }
    }

    /// Creates a collection from a flat list of `x, y, z` triples.
    ///
    /// # Panics
    ///
    /// Panics if the length of `coords` is not a multiple of 3.
    pub fn from_flat(coords: &[f32]) -> Self {
        assert!(
            coords.len() % 3 == 0,
            "flat landmark list has length {}, which is not a multiple of 3",
            coords.len()
        );
        Self {
            positions: coords
                .chunks_exact(3)
                .map(|c| Point3::new(c[0].into(), c[1].into(), c[2].into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Point3<f64> {
        self.positions[index]
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    pub fn map_positions(&mut self, mut f: impl FnMut(Point3<f64>) -> Point3<f64>) {
        for pos in self.positions_mut() {
            *pos = f(*pos);
        }
    }

    /// Returns the X/Y coordinates of every landmark.
    pub fn positions_2d(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.positions.iter().map(|p| p.xy())
    }

    pub fn average_position(&self) -> Point3<f64> {
        let len = self.positions.len() as f64;
        let sum = self
            .positions
            .iter()
            .fold(Point3::origin(), |acc, p| acc + p.coords);
        sum / len
    }

    /// Computes the axis-aligned bounding rectangle of the landmarks' X/Y coordinates.
    ///
    /// Returns [`None`] if there are no landmarks.
    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::bounding(self.positions_2d())
    }
}
