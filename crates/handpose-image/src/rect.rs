//! Axis-aligned rectangles.
//!
//! [`Rect`] is used for regions of interest, palm boxes, and crop areas. Its operations never
//! modify `self`; they return the transformed rectangle instead.

use std::{fmt, ops::RangeInclusive};

use nalgebra::{Point2, Vector2};

/// An axis-aligned rectangle spanning from a start corner to an end corner.
///
/// The start corner is component-wise less than or equal to the end corner. Rectangles are
/// allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    start: Point2<f64>,
    end: Point2<f64>,
}

impl Rect {
    /// Creates a rectangle from its top-left (`start`) and bottom-right (`end`) corners.
    ///
    /// # Panics
    ///
    /// Panics if `start` is not component-wise less than or equal to `end`.
    pub fn from_corners(start: impl Into<Point2<f64>>, end: impl Into<Point2<f64>>) -> Self {
        let (start, end) = (start.into(), end.into());
        assert!(
            start.x <= end.x && start.y <= end.y,
            "invalid rectangle corners: start={start}, end={end}"
        );
        Self { start, end }
    }

    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        let half = Vector2::new(width, height) * 0.5;
        let center = Point2::new(x_center, y_center);
        Self::from_corners(center - half, center + half)
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f64, top_left_y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(
            [top_left_x, top_left_y],
            [top_left_x + width, top_left_y + height],
        )
    }

    /// Constructs a [`Rect`] that spans a range of X and Y coordinates.
    pub fn from_ranges(x: RangeInclusive<f64>, y: RangeInclusive<f64>) -> Self {
        Self::from_corners([*x.start(), *y.start()], [*x.end(), *y.end()])
    }

    /// Computes the axis-aligned bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = T>, T: Into<Point2<f64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let first: Point2<f64> = iter.next()?.into();
        let (mut min, mut max) = (first, first);

        for pt in iter {
            let pt = pt.into();
            min = min.inf(&pt);
            max = max.sup(&pt);
        }

        Some(Self::from_corners(min, max))
    }

    /// Returns the top-left corner.
    #[inline]
    pub fn start(&self) -> Point2<f64> {
        self.start
    }

    /// Returns the bottom-right corner.
    #[inline]
    pub fn end(&self) -> Point2<f64> {
        self.end
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f64 {
        self.start.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f64 {
        self.start.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.end.x - self.start.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.end.y - self.start.y
    }

    /// Returns the component-wise difference between the end and start corner.
    #[inline]
    pub fn size(&self) -> Vector2<f64> {
        self.end - self.start
    }

    /// Returns the midpoint between the start and end corner.
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.start, &self.end)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Translates the rectangle by `offset`, given in absolute units.
    #[must_use]
    pub fn move_by(&self, offset: impl Into<Vector2<f64>>) -> Self {
        let offset = offset.into();
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Translates the rectangle by `factor` multiplied component-wise with its own size.
    ///
    /// A factor of `[0.0, -0.5]` moves the rectangle up by half its height.
    #[must_use]
    pub fn shift_rel(&self, factor: impl Into<Vector2<f64>>) -> Self {
        self.move_by(self.size().component_mul(&factor.into()))
    }

    /// Grows the shorter side of the rectangle so that width and height are equal.
    ///
    /// The center of the rectangle remains the same.
    #[must_use]
    pub fn squarify(&self) -> Self {
        let center = self.center();
        let edge = self.width().max(self.height());
        Self::from_center(center.x, center.y, edge, edge)
    }

    /// Scales the width and height of this [`Rect`] by the given factor.
    ///
    /// The center position of the [`Rect`] remains the same.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        let center = self.center();
        let size = self.size() * factor;
        Self::from_center(center.x, center.y, size.x, size.y)
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.start.sup(&other.start);
        let max = self.end.inf(&other.end);
        if min.x > max.x || min.y > max.y {
            return None;
        }

        Some(Rect::from_corners(min, max))
    }

    fn intersection_area(&self, other: &Self) -> f64 {
        self.intersection(other).map_or(0.0, |rect| rect.area())
    }

    fn union_area(&self, other: &Self) -> f64 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Disjoint rectangles have an IOU of 0. If both rectangles have zero area, the result is 0
    /// as well.
    pub fn iou(&self, other: &Self) -> f64 {
        let union = self.union_area(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / union
    }

    pub fn contains_point(&self, point: impl Into<Point2<f64>>) -> bool {
        let p = point.into();
        self.start.x <= p.x && self.start.y <= p.y && self.end.x >= p.x && self.end.y >= p.y
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect ({},{})-({},{})",
            self.start.x, self.start.y, self.end.x, self.end.y
        )
    }
}
