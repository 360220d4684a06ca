use crate::clamp;
use bytemuck::{Pod, Zeroable};
use std::{
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

pub type Scalar = f64;
pub const EPSILON: f64 = f64::EPSILON;
pub const EPSILON_SQRT: f64 = 1.490_116_119_384_765_6e-8;
pub const PI: f64 = std::f64::consts::PI;

/// Format floats in a compact way suitable for debug output
pub fn scalar_fmt(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    let value_abs = value.abs();
    if value_abs.fract() < EPSILON {
        write!(f, "{}", value.trunc() as i64)
    } else if value_abs > 9999.0 || value_abs <= 0.0001 {
        write!(f, "{:.3e}", value)
    } else {
        let ten: Scalar = 10.0;
        let round = ten.powi(6 - (value_abs.trunc() + 1.0).log10().ceil() as i32);
        write!(f, "{}", (value * round).round() / round)
    }
}

/// Value representing a 2D point or vector.
///
/// Layout is identical to `[Scalar; 2]`, flat scalar buffers can be viewed as
/// point buffers with `bytemuck::cast_slice`.
#[derive(Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Point(pub [Scalar; 2]);

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Point([x, y]) = self;
        scalar_fmt(f, *x)?;
        write!(f, ",")?;
        scalar_fmt(f, *y)?;
        Ok(())
    }
}

impl Point {
    #[inline]
    pub const fn new(x: Scalar, y: Scalar) -> Self {
        Self([x, y])
    }

    /// Get `x` component of the point
    #[inline]
    pub fn x(&self) -> Scalar {
        self.0[0]
    }

    /// Get `y` component of the point
    #[inline]
    pub fn y(self) -> Scalar {
        self.0[1]
    }

    /// Get length of the vector (distance from the origin)
    pub fn length(self) -> Scalar {
        let Self([x, y]) = self;
        x.hypot(y)
    }

    /// Distance between two points
    pub fn dist(self, other: Self) -> Scalar {
        (self - other).length()
    }

    /// Dot product between two vectors
    pub fn dot(self, other: Self) -> Scalar {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        x0 * x1 + y0 * y1
    }

    /// Cross product between two vectors
    pub fn cross(self, other: Self) -> Scalar {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        x0 * y1 - y0 * x1
    }

    /// Convert vector to a unit size vector, if length is not zero
    pub fn normalize(self) -> Option<Point> {
        let Self([x, y]) = self;
        let length = self.length();
        if length < EPSILON || !length.is_finite() {
            None
        } else {
            Some(Self([x / length, y / length]))
        }
    }

    /// Calculate angle (from self to the other) between two vectors
    pub fn angle_between(self, other: Self) -> Option<Scalar> {
        let angle = clamp(self.cos_between(other)?, -1.0, 1.0).acos();
        if self.cross(other) < 0.0 {
            Some(-angle)
        } else {
            Some(angle)
        }
    }

    /// Cosine of the angle (from self to the other) between to vectors
    pub fn cos_between(self, other: Self) -> Option<Scalar> {
        let lengths = self.length() * other.length();
        if lengths < EPSILON {
            None
        } else {
            Some(self.dot(other) / lengths)
        }
    }

    /// Linear interpolation between self (`t = 0`) and other (`t = 1`)
    pub fn lerp(self, other: Self, t: Scalar) -> Self {
        (1.0 - t) * self + t * other
    }

    /// Both coordinates are finite
    pub fn is_finite(self) -> bool {
        let Self([x, y]) = self;
        x.is_finite() && y.is_finite()
    }

    /// Determine if self is close to the other within the margin of error (EPSILON)
    pub fn is_close_to(self, other: Point) -> bool {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        (x0 - x1).abs() < EPSILON && (y0 - y1).abs() < EPSILON
    }
}

impl From<(Scalar, Scalar)> for Point {
    #[inline]
    fn from(xy: (Scalar, Scalar)) -> Self {
        Self([xy.0, xy.1])
    }
}

impl From<[Scalar; 2]> for Point {
    #[inline]
    fn from(xy: [Scalar; 2]) -> Self {
        Self(xy)
    }
}

impl From<&Point> for Point {
    #[inline]
    fn from(point: &Point) -> Self {
        *point
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;

    #[inline]
    fn mul(self, other: Point) -> Self::Output {
        let Point([x, y]) = other;
        Point([self * x, self * y])
    }
}

impl Div<Scalar> for Point {
    type Output = Point;

    #[inline]
    fn div(self, rhs: Scalar) -> Self::Output {
        let Point([x, y]) = self;
        Point([x / rhs, y / rhs])
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 + x1, y0 + y1])
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 - x1, y0 - y1])
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline]
    fn neg(self) -> Self::Output {
        let Point([x, y]) = self;
        Point([-x, -y])
    }
}

/// 2D affine transformation
///
/// Stored as an array [m00, m01, m02, m10, m11, m12] but semantically corresponds to
/// a matrix:
/// ┌             ┐
/// │ m00 m01 m02 │
/// │ m10 m11 m12 │
/// │   0   0   1 │
/// └             ┘
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform([Scalar; 6]);

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn new(
        m00: Scalar,
        m01: Scalar,
        m02: Scalar,
        m10: Scalar,
        m11: Scalar,
        m12: Scalar,
    ) -> Self {
        Self([m00, m01, m02, m10, m11, m12])
    }

    pub const fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    pub const fn new_translate(tx: Scalar, ty: Scalar) -> Self {
        Self([1.0, 0.0, tx, 0.0, 1.0, ty])
    }

    pub const fn new_scale(sx: Scalar, sy: Scalar) -> Self {
        Self([sx, 0.0, 0.0, 0.0, sy, 0.0])
    }

    /// Rotation by `a` radians around the origin
    pub fn new_rotate(a: Scalar) -> Self {
        let (sin, cos) = a.sin_cos();
        Self([cos, -sin, 0.0, sin, cos, 0.0])
    }

    /// Build transformation from a row-major 3x3 matrix
    ///
    /// Perspective is not supported, the last row is ignored.
    pub fn from_matrix(m: [Scalar; 9]) -> Self {
        let [m00, m01, m02, m10, m11, m12, p0, p1, p2] = m;
        if p0 != 0.0 || p1 != 0.0 || p2 != 1.0 {
            tracing::debug!(?m, "perspective row ignored");
        }
        Self([m00, m01, m02, m10, m11, m12])
    }

    /// Build transformation from either 6 or 9 row-major values
    pub fn from_slice(values: &[Scalar]) -> Option<Self> {
        match *values {
            [m00, m01, m02, m10, m11, m12] => Some(Self([m00, m01, m02, m10, m11, m12])),
            [m00, m01, m02, m10, m11, m12, p0, p1, p2] => Some(Self::from_matrix([
                m00, m01, m02, m10, m11, m12, p0, p1, p2,
            ])),
            _ => None,
        }
    }

    /// Matrix values in the row-major order
    pub fn values(&self) -> [Scalar; 6] {
        self.0
    }

    /// Apply this transformation to a point
    pub fn apply(&self, point: Point) -> Point {
        let Self([m00, m01, m02, m10, m11, m12]) = self;
        let Point([x, y]) = point;
        Point([x * m00 + y * m01 + m02, x * m10 + y * m11 + m12])
    }

    /// Apply translation by `[tx, ty]` before self
    pub fn translate(&self, tx: Scalar, ty: Scalar) -> Self {
        self.matmul(Self::new_translate(tx, ty))
    }

    /// Apply scale transformation by `[sx, sy]` before self
    pub fn scale(&self, sx: Scalar, sy: Scalar) -> Self {
        self.matmul(Self::new_scale(sx, sy))
    }

    /// Apply rotation by `a` angle around the origin before self
    pub fn rotate(&self, a: Scalar) -> Self {
        self.matmul(Self::new_rotate(a))
    }

    /// Multiply transformations in matrix form
    pub fn matmul(&self, other: Transform) -> Self {
        let Self([s00, s01, s02, s10, s11, s12]) = self;
        let Self([o00, o01, o02, o10, o11, o12]) = other;

        // s00, s01, s02 | o00, o01, o02
        // s10, s11, s12 | o10, o11, o12
        // 0  , 0  , 1   | 0  , 0  , 1
        Self([
            s00 * o00 + s01 * o10,
            s00 * o01 + s01 * o11,
            s00 * o02 + s01 * o12 + s02,
            s10 * o00 + s11 * o10,
            s10 * o01 + s11 * o11,
            s10 * o02 + s11 * o12 + s12,
        ])
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    fn mul(self, other: Transform) -> Self::Output {
        self.matmul(other)
    }
}

impl From<[Scalar; 6]> for Transform {
    fn from(values: [Scalar; 6]) -> Self {
        Self(values)
    }
}

impl From<[Scalar; 9]> for Transform {
    fn from(values: [Scalar; 9]) -> Self {
        Self::from_matrix(values)
    }
}

/// Bounding box with sides directed along the axes
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    /// Point with minimal x and y values
    min: Point,
    /// Point with maximum x and y values
    max: Point,
}

impl BBox {
    /// Construct bounding box which includes points `p0` and `p1`
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let Point([x0, y0]) = p0.into();
        let Point([x1, y1]) = p1.into();
        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            min: Point([x0, y0]),
            max: Point([x1, y1]),
        }
    }

    /// Construct bounding box from `left, top, right, bottom` values
    pub fn from_ltrb(left: Scalar, top: Scalar, right: Scalar, bottom: Scalar) -> Self {
        Self::new((left, top), (right, bottom))
    }

    /// Point with minimum values of x and y coordinates
    #[inline]
    pub fn min(&self) -> Point {
        self.min
    }

    /// Point with maximum values of x and y coordinates
    #[inline]
    pub fn max(&self) -> Point {
        self.max
    }

    /// `x` coordinate of the point with the minimal value
    #[inline]
    pub fn x(&self) -> Scalar {
        self.min.x()
    }

    /// `y` coordinate of the point with the minimal value
    #[inline]
    pub fn y(&self) -> Scalar {
        self.min.y()
    }

    /// Width of the bounding box
    #[inline]
    pub fn width(&self) -> Scalar {
        self.max.x() - self.min.x()
    }

    /// Height of the bounding box
    #[inline]
    pub fn height(&self) -> Scalar {
        self.max.y() - self.min.y()
    }

    pub fn center(&self) -> Point {
        0.5 * (self.min + self.max)
    }

    /// Sides as `[left, top, right, bottom]`
    pub fn ltrb(&self) -> [Scalar; 4] {
        [self.min.x(), self.min.y(), self.max.x(), self.max.y()]
    }

    /// Determine if the point is inside of the bounding box
    pub fn contains(&self, point: Point) -> bool {
        let Point([x, y]) = point;
        self.min.x() <= x && x <= self.max.x() && self.min.y() <= y && y <= self.max.y()
    }

    /// Determine if the other box is completely inside of this bounding box
    pub fn contains_bbox(&self, other: BBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Extend bounding box so it would contains provided point
    pub fn extend(&self, point: Point) -> Self {
        let Point([x, y]) = point;
        let Point([x0, y0]) = self.min;
        let Point([x1, y1]) = self.max;
        Self {
            min: Point([x0.min(x), y0.min(y)]),
            max: Point([x1.max(x), y1.max(y)]),
        }
    }

    /// Create bounding box the spans both bbox-es
    pub fn union(&self, other: BBox) -> Self {
        self.extend(other.min).extend(other.max)
    }

    pub fn union_opt(&self, other: Option<BBox>) -> Self {
        match other {
            Some(other) => self.union(other),
            None => *self,
        }
    }
}

impl From<[Scalar; 4]> for BBox {
    fn from(ltrb: [Scalar; 4]) -> Self {
        let [left, top, right, bottom] = ltrb;
        Self::from_ltrb(left, top, right, bottom)
    }
}

impl fmt::Debug for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox x=")?;
        scalar_fmt(f, self.x())?;
        write!(f, ", y=")?;
        scalar_fmt(f, self.y())?;
        write!(f, ", w=")?;
        scalar_fmt(f, self.width())?;
        write!(f, ", h=")?;
        scalar_fmt(f, self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_transform() {
        let tr = Transform::identity()
            .translate(1.0, 2.0)
            .rotate(PI / 3.0)
            .scale(3.0, 2.0);
        let p0 = Point::new(1.0, 1.0);

        let p1 = tr.apply(p0);
        assert_approx_eq!(p1.x(), 2.5 - 3.0_f64.sqrt(), 1e-9);
        assert_approx_eq!(p1.y(), 3.0 + 1.5 * 3.0_f64.sqrt(), 1e-9);
    }

    #[test]
    fn test_transform_from_values() {
        let tr = Transform::from([2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(tr, Transform::new_scale(2.0, 2.0));
        assert_eq!(
            Transform::from_slice(&[1.0, 0.0, 5.0, 0.0, 1.0, 7.0]),
            Some(Transform::new_translate(5.0, 7.0))
        );
        assert_eq!(Transform::from_slice(&[1.0, 0.0, 5.0]), None);
        assert_eq!(
            Transform::new_translate(1.0, 2.0) * Transform::new_scale(2.0, 3.0),
            Transform::identity().translate(1.0, 2.0).scale(2.0, 3.0)
        );
    }

    #[test]
    fn test_bbox() {
        let bbox = BBox::from([10.0, 20.0, 0.0, 5.0]);
        assert_eq!(bbox.ltrb(), [0.0, 5.0, 10.0, 20.0]);
        assert_eq!(bbox.center(), Point::new(5.0, 12.5));
        let bbox = bbox.extend(Point::new(-1.0, 30.0));
        assert_eq!(bbox.ltrb(), [-1.0, 5.0, 10.0, 30.0]);
        assert!(bbox.contains_bbox(BBox::new((0.0, 6.0), (9.0, 29.0))));
        assert!(!bbox.contains(Point::new(11.0, 6.0)));
    }

    #[test]
    fn test_point() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(p.length(), 5.0);
        assert_eq!(p.normalize(), Some(Point::new(0.6, 0.8)));
        assert_eq!(Point::new(0.0, 0.0).normalize(), None);
        assert_eq!(p.lerp(Point::new(5.0, 8.0), 0.5), Point::new(4.0, 6.0));
        assert_approx_eq!(
            Point::new(1.0, 0.0)
                .angle_between(Point::new(0.0, 1.0))
                .unwrap(),
            PI / 2.0
        );
    }
}
