//! All the things you need to handle bezier curves

use crate::{
    ArrayIter, BBox, EPSILON, M3x3, M4x4, Point, Scalar, clamp, gauss_legendre, quadratic_solve,
};
use std::fmt;

pub type CurveExtremities = ArrayIter<[Option<Scalar>; 4]>;

/// Default absolute tolerance used by arc length calculations
pub const DEFAULT_LENGTH_TOLERANCE: Scalar = 1e-6;

/// Maximum depth of the adaptive arc length subdivision
const LENGTH_MAX_DEPTH: usize = 12;

/// Maximum number of iterations used to invert arc length
const PARAM_MAX_ITERATIONS: usize = 64;

/// Set of operations common to all bezier curves.
pub trait Curve: Sized + Copy + Into<Segment> {
    /// Convert curve to an iterator over line segments with desired flatness
    fn flatten(&self, flatness: Scalar) -> CurveFlattenIter {
        CurveFlattenIter::new(*self, flatness)
    }

    /// Correspond to maximum deviation of the curve from the straight line
    /// `f = max |curve(t) - line(curve_start, curve_end)(t)|`. This function
    /// actually returns `16.0 * f^2` to avoid unneeded division and square root.
    fn flatness(&self) -> Scalar;

    /// Point at which curve starts
    fn start(&self) -> Point;

    /// Point at which curve ends
    fn end(&self) -> Point;

    /// Evaluate curve at parameter value `t` in (0.0..=1.0)
    fn at(&self, t: Scalar) -> Point;

    /// Derivative with respect to t evaluated at `t`
    fn deriv_at(&self, t: Scalar) -> Point;

    /// Optimized version of `Curve::split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        self.split_at(0.5)
    }

    /// Split the curve at parameter value `t`
    fn split_at(&self, t: Scalar) -> (Self, Self);

    /// Create sub-curve starting at parameter value `a` and ending at value `b`
    fn cut(&self, a: Scalar, b: Scalar) -> Self;

    /// Extend provided `init` bounding box with the bounding box of the curve
    fn bbox(&self, init: Option<BBox>) -> BBox;

    /// Find all extremities of the curve `curve'(t)_x = 0 || curve'(t)_y = 0`
    fn extremities(&self) -> CurveExtremities;

    /// Unit tangent at parameter `t`
    ///
    /// Where derivative vanishes (coincident control points) the direction is taken
    /// from a slightly shifted parameter and then from the chord.
    fn tangent_at(&self, t: Scalar) -> Option<Point> {
        self.deriv_at(t)
            .normalize()
            .or_else(|| self.deriv_at(clamp(t, 1e-4, 1.0 - 1e-4)).normalize())
            .or_else(|| (self.end() - self.start()).normalize())
    }

    /// Arc length of the curve between parameter values `t0` and `t1`
    ///
    /// Integrates the speed `|curve'(t)|` with Gauss-Legendre quadrature, subdividing
    /// until two consecutive estimates agree. Result is negative if `t1 < t0`.
    fn length(&self, t0: Scalar, t1: Scalar) -> Scalar {
        let speed = |t: Scalar| self.deriv_at(t).length();
        let whole = gauss_legendre(t0, t1, speed);
        if !whole.is_finite() {
            return whole;
        }
        length_rec(&speed, t0, t1, whole, 0)
    }

    /// Find parameter value `t` at which `self.length(0.0, t) == length`
    ///
    /// `error` is the acceptable deviation of the length at the found parameter,
    /// defaults to `DEFAULT_LENGTH_TOLERANCE`.
    fn param_at_length(&self, length: Scalar, error: Option<Scalar>) -> Scalar {
        let total = self.length(0.0, 1.0);
        if length <= 0.0 || total <= EPSILON {
            return 0.0;
        }
        if length >= total {
            return 1.0;
        }
        let error = error.unwrap_or(DEFAULT_LENGTH_TOLERANCE);
        let (mut lo, mut hi) = (0.0, 1.0);
        let mut t = length / total;
        let mut t_length = self.length(0.0, t);
        for _ in 0..PARAM_MAX_ITERATIONS {
            let diff = t_length - length;
            if diff.abs() < error {
                break;
            }
            if diff < 0.0 {
                lo = t;
            } else {
                hi = t;
            }
            // newton step, falling back to bisection when it leaves the bracket
            let speed = self.deriv_at(t).length();
            let mut next = if speed > EPSILON { t - diff / speed } else { lo };
            if next <= lo || next >= hi {
                next = 0.5 * (lo + hi);
            }
            t_length += self.length(t, next);
            t = next;
        }
        t
    }
}

fn length_rec(
    speed: &impl Fn(Scalar) -> Scalar,
    a: Scalar,
    b: Scalar,
    whole: Scalar,
    depth: usize,
) -> Scalar {
    let mid = 0.5 * (a + b);
    let left = gauss_legendre(a, mid, speed);
    let right = gauss_legendre(mid, b, speed);
    let sum = left + right;
    if depth >= LENGTH_MAX_DEPTH || (sum - whole).abs() <= 1e-9 * (1.0 + sum.abs()) {
        sum
    } else {
        length_rec(speed, a, mid, left, depth + 1) + length_rec(speed, mid, b, right, depth + 1)
    }
}

/// Maximum subdivision depth of the flattening, at most `2^16` lines per curve
const FLATTEN_MAX_DEPTH: usize = 16;

pub struct CurveFlattenIter {
    flatness: Scalar,
    stack: Vec<(Segment, usize)>,
}

impl CurveFlattenIter {
    pub fn new(segment: impl Into<Segment>, flatness: Scalar) -> Self {
        Self {
            flatness: 16.0 * flatness * flatness,
            stack: vec![(segment.into(), 0)],
        }
    }
}

impl Iterator for CurveFlattenIter {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (segment, depth) = self.stack.pop()?;
            let flatness = segment.flatness();
            // non-finite control points are emitted as a chord
            if depth >= FLATTEN_MAX_DEPTH || !flatness.is_finite() || flatness < self.flatness {
                return Some(Line([segment.start(), segment.end()]));
            }
            let (s0, s1) = segment.split();
            self.stack.push((s1, depth + 1));
            self.stack.push((s0, depth + 1));
        }
    }
}

// -----------------------------------------------------------------------------
// Line
// -----------------------------------------------------------------------------

/// Line segment curve
#[derive(Clone, Copy, PartialEq)]
pub struct Line(pub [Point; 2]);

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Line([p0, p1]) = self;
        write!(f, "Line {:?} {:?}", p0, p1)
    }
}

impl Line {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into()])
    }

    /// Start and end points of the line
    pub fn points(&self) -> [Point; 2] {
        self.0
    }

    /// Direction vector associated with the line segment
    pub fn direction(&self) -> Point {
        self.end() - self.start()
    }
}

impl Curve for Line {
    fn flatness(&self) -> Scalar {
        0.0
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[1]
    }

    fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1]) = self;
        p0.lerp(*p1, t)
    }

    fn deriv_at(&self, _t: Scalar) -> Point {
        self.direction()
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        let Self([p0, p1]) = self;
        let mid = self.at(t);
        (Self([*p0, mid]), Self([mid, *p1]))
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        Self([self.at(a), self.at(b)])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1]) = *self;
        BBox::new(p0, p1).union_opt(init)
    }

    fn extremities(&self) -> CurveExtremities {
        CurveExtremities::new()
    }

    fn length(&self, t0: Scalar, t1: Scalar) -> Scalar {
        self.direction().length() * (t1 - t0)
    }

    fn param_at_length(&self, length: Scalar, _error: Option<Scalar>) -> Scalar {
        let total = self.direction().length();
        if total <= EPSILON {
            0.0
        } else {
            clamp(length / total, 0.0, 1.0)
        }
    }
}

// -----------------------------------------------------------------------------
// Quadratic bezier curve
// -----------------------------------------------------------------------------

// Matrix form for quadratic bezier curve
#[rustfmt::skip]
const Q: M3x3 = M3x3([
    1.0,  0.0, 0.0,
   -2.0,  2.0, 0.0,
    1.0, -2.0, 1.0,
]);

// Inverted matrix form for quadratic bezier curve
#[rustfmt::skip]
const QI: M3x3 = M3x3([
    1.0, 0.0, 0.0,
    1.0, 0.5, 0.0,
    1.0, 1.0, 1.0,
]);

/// Matrix which maps control points of a quadratic curve to control points
/// of its `[a, b]` sub-curve.
fn quad_cut_matrix(a: Scalar, b: Scalar) -> M3x3 {
    // Given curve as Q(t) = [1 t t^2] M Q
    // we can change parameter t -> a + (b - a) * t which will produced desired curve
    // it is possible to decompose it as
    //             ┌                         ┐
    // ┌         ┐ │  1  a       a^2         │
    // │ 1 t t^2 │ │  0  (b - a) 2*a*(b - a) │ = [1 t t^2] T
    // └         ┘ │  0  0       (b - a)^2   │
    //             └                         ┘
    // we can convert it back to desired curve by Q[a, b](t) = [1 t t^2] Q (QI T Q) P
    let ba = b - a;
    #[rustfmt::skip]
    let t = M3x3([
        1.0, a  , a * a       ,
        0.0, ba , 2.0 * a * ba,
        0.0, 0.0, ba * ba     ,
    ]);
    QI * t * Q
}

/// Quadratic bezier curve
///
/// Polynomial form:
/// `(1 - t) ^ 2 * p0 + 2 * (1 - t) * t * p1 + t ^ 2 * p2`
/// Matrix from:
///             ┌          ┐ ┌    ┐
/// ┌         ┐ │  1  0  0 │ │ p0 │
/// │ 1 t t^2 │ │ -2  2  0 │ │ p1 │
/// └         ┘ │  1 -2  1 │ │ p2 │
///             └          ┘ └    ┘
#[derive(Clone, Copy, PartialEq)]
pub struct Quad(pub [Point; 3]);

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Quad([p0, p1, p2]) = self;
        write!(f, "Quad {:?} {:?} {:?}", p0, p1, p2)
    }
}

impl Quad {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>, p2: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into(), p2.into()])
    }

    pub fn points(&self) -> [Point; 3] {
        self.0
    }
}

impl Curve for Quad {
    /// Flatness criteria for the quadratic curve
    ///
    /// It is equal to `f = max d(t) where d(t) = |q(t) - l(t)|, l(t) = (1 - t) * p0 + t * p2`
    /// for q(t) bezier2 curve with p{0..2} control points, in other words maximum distance
    /// from parametric line to bezier2 curve for the same parameter t.
    ///
    /// Line can be represented as bezier2 curve, if `p1 = (p0 + p2) / 2.0`.
    /// Grouping polynomial coefficients:
    ///     q(t) = t^2 p2 + 2 (1 - t) t p1 + (1 - t)^2 p0
    ///     l(t) = t^2 p2 + (1 - t) t (p0 + p2) + (1 - t)^2 p0
    ///     d(t) = |q(t) - l(t)| = (1 - t) t |2 * p1 - p0 - p2|
    ///     f    = 1 / 4 * | 2 p1 - p0 - p2 |
    ///     f^2  = 1/16 |2 * p1 - p0 - p2|^2
    ///
    fn flatness(&self) -> Scalar {
        let Self([p0, p1, p2]) = *self;
        let Point([x, y]) = 2.0 * p1 - p0 - p2;
        x * x + y * y
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[2]
    }

    fn at(&self, t: Scalar) -> Point {
        // at(t) =
        //   (1 - t) ^ 2 * p0 +
        //   2 * (1 - t) * t * p1 +
        //   t ^ 2 * p2
        let Self([p0, p1, p2]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        t_2 * p0 + 2.0 * t1 * t_1 * p1 + t2 * p2
    }

    fn deriv_at(&self, t: Scalar) -> Point {
        let Self([p0, p1, p2]) = *self;
        2.0 * ((1.0 - t) * (p1 - p0) + t * (p2 - p1))
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2]) = *self;
        let mid = 0.25 * (p0 + 2.0 * p1 + p2);
        (
            Self([p0, 0.5 * (p0 + p1), mid]),
            Self([mid, 0.5 * (p1 + p2), p2]),
        )
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2]) = *self;
        let t_1 = 1.0 - t;
        let mid = self.at(t);
        (
            Self([p0, t_1 * p0 + t * p1, mid]),
            Self([mid, t_1 * p1 + t * p2, p2]),
        )
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        let Self([p0, p1, p2]) = *self;
        #[rustfmt::skip]
        let M3x3([
            m00, m01, m02,
            m10, m11, m12,
            m20, m21, m22,
        ]) = quad_cut_matrix(a, b);
        let q0 = m00 * p0 + m01 * p1 + m02 * p2;
        let q1 = m10 * p0 + m11 * p1 + m12 * p2;
        let q2 = m20 * p0 + m21 * p1 + m22 * p2;
        Self([q0, q1, q2])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2]) = self;
        let bbox = BBox::new(*p0, *p2).union_opt(init);
        if bbox.contains(*p1) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn extremities(&self) -> CurveExtremities {
        let mut result = CurveExtremities::new();
        let Self([p0, p1, p2]) = self;
        let Point([a0, a1]) = *p2 - 2.0 * *p1 + *p0;
        let Point([b0, b1]) = *p1 - *p0;
        // curve'(t)_x = 0
        if a0.abs() > EPSILON {
            let t0 = -b0 / a0;
            if (0.0..=1.0).contains(&t0) {
                result.push(t0)
            }
        }
        // curve'(t)_y = 0
        if a1.abs() > EPSILON {
            let t1 = -b1 / a1;
            if (0.0..=1.0).contains(&t1) {
                result.push(t1)
            }
        }
        result
    }
}

// -----------------------------------------------------------------------------
// Conic (rational quadratic bezier curve)
// -----------------------------------------------------------------------------

/// Rational quadratic bezier curve
///
/// Rational form:
/// `((1 - t) ^ 2 * p0 + 2 * w * (1 - t) * t * p1 + t ^ 2 * p2) / D(t)`
/// where `D(t) = (1 - t) ^ 2 + 2 * w * (1 - t) * t + t ^ 2`.
/// `w < 1` gives elliptical arcs, `w == 1` a parabola (plain quad) and `w > 1` hyperbolas.
/// Weight is preserved by affine transformations.
#[derive(Clone, Copy, PartialEq)]
pub struct Conic {
    points: [Point; 3],
    weight: Scalar,
}

impl fmt::Debug for Conic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [p0, p1, p2] = self.points;
        write!(f, "Conic {:?} {:?} {:?} w={:?}", p0, p1, p2, self.weight)
    }
}

impl Conic {
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        weight: Scalar,
    ) -> Self {
        Self {
            points: [p0.into(), p1.into(), p2.into()],
            weight,
        }
    }

    pub fn points(&self) -> [Point; 3] {
        self.points
    }

    pub fn weight(&self) -> Scalar {
        self.weight
    }

    /// Control points in homogeneous coordinates `[x * w, y * w, w]`
    fn homogeneous(&self) -> [[Scalar; 3]; 3] {
        let [Point([x0, y0]), Point([x1, y1]), Point([x2, y2])] = self.points;
        let w = self.weight;
        [[x0, y0, 1.0], [x1 * w, y1 * w, w], [x2, y2, 1.0]]
    }

    /// Build conic from homogeneous control points, normalizing end weights to `1`
    fn from_homogeneous(hs: [[Scalar; 3]; 3]) -> Self {
        let [[x0, y0, w0], [x1, y1, w1], [x2, y2, w2]] = hs;
        Self {
            points: [
                Point::new(x0 / w0, y0 / w0),
                Point::new(x1 / w1, y1 / w1),
                Point::new(x2 / w2, y2 / w2),
            ],
            weight: w1 / (w0 * w2).sqrt(),
        }
    }

    /// Approximate conic with `2 ^ pow2` quadratic curves
    pub fn to_quads(&self, pow2: usize) -> Vec<Quad> {
        let count = 1usize << pow2;
        (0..count)
            .map(|index| {
                let a = index as Scalar / count as Scalar;
                let b = (index + 1) as Scalar / count as Scalar;
                let Conic {
                    points: [p0, p1, p2],
                    ..
                } = self.cut(a, b);
                Quad([p0, p1, p2])
            })
            .collect()
    }

    /// Smallest power of two of quadratic pieces that approximate the conic within `tolerance`
    pub fn quad_pow2(&self, tolerance: Scalar) -> usize {
        // Error of the quad built on the same control points is proportional to
        // `|w - 1|`, and drops by a factor of 4 with each halving.
        const MAX_POW2: usize = 5;
        let [p0, p1, p2] = self.points;
        let a = self.weight - 1.0;
        let k = a / (4.0 * (2.0 + a));
        let Point([x, y]) = k * (p0 - 2.0 * p1 + p2);
        let mut error = x.hypot(y);
        let mut pow2 = 0;
        while pow2 < MAX_POW2 && !(error <= tolerance) {
            error *= 0.25;
            pow2 += 1;
        }
        pow2
    }
}

impl Curve for Conic {
    /// Flatness is measured at the parameter midpoint where deviation of the conic
    /// from its chord is `w / (2 * (1 + w)) * |2 p1 - p0 - p2|`.
    fn flatness(&self) -> Scalar {
        let [p0, p1, p2] = self.points;
        let w = self.weight;
        let k = w / (1.0 + w);
        let Point([x, y]) = 2.0 * p1 - p0 - p2;
        // 16 * (k / 2) ^ 2 * |2 p1 - p0 - p2| ^ 2
        4.0 * k * k * (x * x + y * y)
    }

    fn start(&self) -> Point {
        self.points[0]
    }

    fn end(&self) -> Point {
        self.points[2]
    }

    fn at(&self, t: Scalar) -> Point {
        let [p0, p1, p2] = self.points;
        let w = self.weight;
        let (t1, t_1) = (t, 1.0 - t);
        let (c0, c1, c2) = (t_1 * t_1, 2.0 * w * t1 * t_1, t1 * t1);
        (c0 * p0 + c1 * p1 + c2 * p2) / (c0 + c1 + c2)
    }

    fn deriv_at(&self, t: Scalar) -> Point {
        // curve'(t) = (N'(t) * D(t) - N(t) * D'(t)) / D(t) ^ 2
        let [p0, p1, p2] = self.points;
        let w = self.weight;
        let t_1 = 1.0 - t;
        let n = t_1 * t_1 * p0 + 2.0 * w * t * t_1 * p1 + t * t * p2;
        let d = 1.0 + 2.0 * (w - 1.0) * t * t_1;
        let n_deriv = 2.0 * (t_1 * (w * p1 - p0) + t * (p2 - w * p1));
        let d_deriv = 2.0 * (w - 1.0) * (1.0 - 2.0 * t);
        (d * n_deriv - d_deriv * n) / (d * d)
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        (self.cut(0.0, t), self.cut(t, 1.0))
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        // Homogeneous coordinates of a conic are an ordinary quadratic curve,
        // so the same cut matrix applies component-wise.
        let [h0, h1, h2] = self.homogeneous();
        let M3x3(m) = quad_cut_matrix(a, b);
        let mut out = [[0.0; 3]; 3];
        for (row, out) in out.iter_mut().enumerate() {
            for (component, value) in out.iter_mut().enumerate() {
                *value = m[3 * row] * h0[component]
                    + m[3 * row + 1] * h1[component]
                    + m[3 * row + 2] * h2[component];
            }
        }
        Self::from_homogeneous(out)
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let [p0, p1, p2] = self.points;
        let bbox = BBox::new(p0, p2).union_opt(init);
        if bbox.contains(p1) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn extremities(&self) -> CurveExtremities {
        // Solve `curve'(t)_x = 0 || curve'(t)_y = 0`, numerator of the derivative
        // for each coordinate is `A t^2 + B t + C` with
        //   A = w * p20 - p20, B = p20 - 2 * w * p10, C = w * p10
        let [p0, p1, p2] = self.points;
        let w = self.weight;
        let p20 = p2 - p0;
        let p10 = p1 - p0;
        let wp10 = w * p10;
        let a = w * p20 - p20;
        let b = p20 - 2.0 * wp10;
        quadratic_solve(a.x(), b.x(), wp10.x())
            .chain(quadratic_solve(a.y(), b.y(), wp10.y()))
            .filter(|t| (0.0..=1.0).contains(t))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// Cubic bezier curve
// -----------------------------------------------------------------------------

/// Matrix form for cubic bezier curve
#[rustfmt::skip]
const C: M4x4 = M4x4([
    1.0,  0.0,  0.0, 0.0,
   -3.0,  3.0,  0.0, 0.0,
    3.0, -6.0,  3.0, 0.0,
   -1.0,  3.0, -3.0, 1.0,
]);

/// Inverted matrix form for cubic bezier curve
#[rustfmt::skip]
const CI: M4x4 = M4x4([
    1.0, 0.0      , 0.0      , 0.0,
    1.0, 1.0 / 3.0, 0.0      , 0.0,
    1.0, 2.0 / 3.0, 1.0 / 3.0, 0.0,
    1.0, 1.0      , 1.0      , 1.0,
]);

/// Cubic bezier curve
///
/// Polynomial form:
/// `(1 - t) ^ 3 * p0 + 3 * (1 - t) ^ 2 * t * p1 + 3 * (1 - t) * t ^ 2 * p2 + t ^ 3 * p3`
/// Matrix from:
///                 ┌             ┐ ┌    ┐
/// ┌             ┐ │  1  0  0  0 │ │ p0 │
/// │ 1 t t^2 t^3 │ │ -3  3  0  0 │ │ p1 │
/// └             ┘ │  3 -6  3  0 │ │ p2 │
///                 │ -1  3 -3  1 │ │ p3 │
///                 └             ┘ └    ┘
#[derive(Clone, Copy, PartialEq)]
pub struct Cubic(pub [Point; 4]);

impl fmt::Debug for Cubic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Cubic([p0, p1, p2, p3]) = self;
        write!(f, "Cubic {:?} {:?} {:?} {:?}", p0, p1, p2, p3)
    }
}

impl Cubic {
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        Self([p0.into(), p1.into(), p2.into(), p3.into()])
    }

    pub fn points(&self) -> [Point; 4] {
        self.0
    }
}

impl Curve for Cubic {
    /// Flatness criteria for the cubic curve
    /// This function actually returns `16 * flatness^2`
    ///
    /// It is equal to `f = max d(t) where d(t) = |c(t) - l(t)|, l(t) = (1 - t) * c0 + t * c3`
    /// for c(t) bezier3 curve with c{0..3} control points, in other words maximum distance
    /// from parametric line to bezier3 curve for the same parameter t. It is shown in the article
    /// that:
    ///     f^2 <= 1/16 (max{u_x^2, v_x^2} + max{u_y^2, v_y^2})
    /// where:
    ///     u = 3 * b1 - 2 * b0 - b3
    ///     v = 3 * b2 - b0 - 2 * b3
    /// `f == 0` means completely flat so estimating upper bound is sufficient as splitting more
    /// than needed is not a problem.
    ///
    /// [Linear Approximation of Bezier Curve](https://hcklbrrfnn.files.wordpress.com/2012/08/bez.pdf)
    fn flatness(&self) -> Scalar {
        let Self([p0, p1, p2, p3]) = *self;
        let u = 3.0 * p1 - 2.0 * p0 - p3;
        let v = 3.0 * p2 - p0 - 2.0 * p3;
        (u.x() * u.x()).max(v.x() * v.x()) + (u.y() * u.y()).max(v.y() * v.y())
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[3]
    }

    fn at(&self, t: Scalar) -> Point {
        // at(t) =
        //   (1 - t) ^ 3 * p0 +
        //   3 * (1 - t) ^ 2 * t * p1 +
        //   3 * (1 - t) * t ^ 2 * p2 +
        //   t ^ 3 * p3
        let Self([p0, p1, p2, p3]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let (t3, t_3) = (t2 * t1, t_2 * t_1);
        t_3 * p0 + 3.0 * t1 * t_2 * p1 + 3.0 * t2 * t_1 * p2 + t3 * p3
    }

    fn deriv_at(&self, t: Scalar) -> Point {
        let Self([p0, p1, p2, p3]) = *self;
        let t_1 = 1.0 - t;
        3.0 * (t_1 * t_1 * (p1 - p0) + 2.0 * t * t_1 * (p2 - p1) + t * t * (p3 - p2))
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2, p3]) = *self;
        let mid = 0.125 * p0 + 0.375 * p1 + 0.375 * p2 + 0.125 * p3;
        let c0 = Self([
            p0,
            0.5 * p0 + 0.5 * p1,
            0.25 * p0 + 0.5 * p1 + 0.25 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            0.25 * p1 + 0.5 * p2 + 0.25 * p3,
            0.5 * p2 + 0.5 * p3,
            p3,
        ]);
        (c0, c1)
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2, p3]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let mid = self.at(t);
        let c0 = Self([
            p0,
            t_1 * p0 + t * p1,
            t_2 * p0 + 2.0 * t * t_1 * p1 + t2 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            t_2 * p1 + 2.0 * t * t_1 * p2 + t2 * p3,
            t_1 * p2 + t * p3,
            p3,
        ]);
        (c0, c1)
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        // Given curve as C(t) = [1 t t^2 t^3] M C
        // we can change parameter t -> a + (b - a) * t which will produced desired curve
        // it is possible to decompose it as
        //                 ┌                                       ┐
        // ┌             ┐ │  1  a       a^2         a^3           │
        // │ 1 t t^2 t^3 │ │  0  (b - a) 2*a*(b - a) 3*a^2*(b - a) │ = [1 t t^2 t^3] T
        // └             ┘ │  0  0       (b - a)^2   3*a*(b - a)^2 │
        //                 │  0  0       0           (b - a)^3     │
        //                 └                                       ┘
        // we can convert it back to desired curve by C[a, b](t) = [1 t t^2 t^3] C (CI T C) P
        let Self([p0, p1, p2, p3]) = *self;
        let ba = b - a;
        #[rustfmt::skip]
        let t = M4x4([
            1.0, a  , a * a       , a * a * a        ,
            0.0, ba , 2.0 * a * ba, 3.0 * a * a * ba ,
            0.0, 0.0, ba * ba     , 3.0 * a * ba * ba,
            0.0, 0.0, 0.0         , ba * ba * ba     ,
        ]);
        #[rustfmt::skip]
        let M4x4([
            m00, m01, m02, m03,
            m10, m11, m12, m13,
            m20, m21, m22, m23,
            m30, m31, m32, m33,
        ]) = CI * t * C;
        let c0 = m00 * p0 + m01 * p1 + m02 * p2 + m03 * p3;
        let c1 = m10 * p0 + m11 * p1 + m12 * p2 + m13 * p3;
        let c2 = m20 * p0 + m21 * p1 + m22 * p2 + m23 * p3;
        let c3 = m30 * p0 + m31 * p1 + m32 * p2 + m33 * p3;
        Self([c0, c1, c2, c3])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2, p3]) = self;
        let bbox = BBox::new(*p0, *p3).union_opt(init);
        if bbox.contains(*p1) && bbox.contains(*p2) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn extremities(&self) -> CurveExtremities {
        let Self([p0, p1, p2, p3]) = *self;
        let Point([a0, a1]) = -1.0 * p0 + 3.0 * p1 - 3.0 * p2 + 1.0 * p3;
        let Point([b0, b1]) = 2.0 * p0 - 4.0 * p1 + 2.0 * p2;
        let Point([c0, c1]) = -1.0 * p0 + p1;

        // Solve for `curve'(t)_x = 0 || curve'(t)_y = 0`
        quadratic_solve(a0, b0, c0)
            .chain(quadratic_solve(a1, b1, c1))
            .filter(|t| *t >= 0.0 && *t <= 1.0)
            .collect::<CurveExtremities>()
    }
}

// -----------------------------------------------------------------------------
// Segment
// -----------------------------------------------------------------------------

/// `Segment` is an enum of either `Line`, `Quad`, `Conic` or `Cubic`
#[derive(Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Line),
    Quad(Quad),
    Conic(Conic),
    Cubic(Cubic),
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Line(line) => line.fmt(f),
            Segment::Quad(quad) => quad.fmt(f),
            Segment::Conic(conic) => conic.fmt(f),
            Segment::Cubic(cubic) => cubic.fmt(f),
        }
    }
}

macro_rules! segment_dispatch {
    ($self:expr, $curve:ident => $body:expr) => {
        match $self {
            Segment::Line($curve) => $body,
            Segment::Quad($curve) => $body,
            Segment::Conic($curve) => $body,
            Segment::Cubic($curve) => $body,
        }
    };
}

impl Curve for Segment {
    fn flatness(&self) -> Scalar {
        segment_dispatch!(self, curve => curve.flatness())
    }

    fn start(&self) -> Point {
        segment_dispatch!(self, curve => curve.start())
    }

    fn end(&self) -> Point {
        segment_dispatch!(self, curve => curve.end())
    }

    fn at(&self, t: Scalar) -> Point {
        segment_dispatch!(self, curve => curve.at(t))
    }

    fn deriv_at(&self, t: Scalar) -> Point {
        segment_dispatch!(self, curve => curve.deriv_at(t))
    }

    fn split(&self) -> (Self, Self) {
        segment_dispatch!(self, curve => {
            let (s0, s1) = curve.split();
            (s0.into(), s1.into())
        })
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        segment_dispatch!(self, curve => {
            let (s0, s1) = curve.split_at(t);
            (s0.into(), s1.into())
        })
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        segment_dispatch!(self, curve => curve.cut(a, b).into())
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        segment_dispatch!(self, curve => curve.bbox(init))
    }

    fn extremities(&self) -> CurveExtremities {
        segment_dispatch!(self, curve => curve.extremities())
    }

    fn length(&self, t0: Scalar, t1: Scalar) -> Scalar {
        segment_dispatch!(self, curve => curve.length(t0, t1))
    }

    fn param_at_length(&self, length: Scalar, error: Option<Scalar>) -> Scalar {
        segment_dispatch!(self, curve => curve.param_at_length(length, error))
    }
}

impl From<Line> for Segment {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

impl From<Quad> for Segment {
    fn from(quad: Quad) -> Self {
        Self::Quad(quad)
    }
}

impl From<Conic> for Segment {
    fn from(conic: Conic) -> Self {
        Self::Conic(conic)
    }
}

impl From<Cubic> for Segment {
    fn from(cubic: Cubic) -> Self {
        Self::Cubic(cubic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_FLATNESS, assert_approx_eq};

    #[test]
    fn test_split() {
        let cubic = Cubic::new((3.0, 7.0), (2.0, 8.0), (0.0, 3.0), (6.0, 5.0));
        let (c0, c1) = cubic.split_at(0.3);
        assert!(c0.end().is_close_to(cubic.at(0.3)));
        assert!(c1.start().is_close_to(cubic.at(0.3)));
        for t in [0.1, 0.5, 0.9] {
            assert!(c0.at(t).dist(cubic.at(0.3 * t)) < 1e-9);
            assert!(c1.at(t).dist(cubic.at(0.3 + 0.7 * t)) < 1e-9);
        }

        let quad = Quad::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0));
        let (q0, q1) = quad.split();
        assert_eq!(q0.end(), Point::new(1.0, 1.0));
        assert_eq!(q1.start(), Point::new(1.0, 1.0));
        let cut = quad.cut(0.25, 0.75);
        assert!(cut.start().dist(quad.at(0.25)) < 1e-12);
        assert!(cut.end().dist(quad.at(0.75)) < 1e-12);
        assert!(cut.at(0.5).dist(quad.at(0.5)) < 1e-9);
    }

    #[test]
    fn test_conic_circle() {
        // quarter of the unit circle
        let conic = Conic::new((1.0, 0.0), (1.0, 1.0), (0.0, 1.0), 0.5f64.sqrt());
        for i in 0..=10 {
            let t = i as Scalar / 10.0;
            assert_approx_eq!(conic.at(t).length(), 1.0, 1e-12);
            // tangent is perpendicular to the radius
            assert_approx_eq!(conic.deriv_at(t).dot(conic.at(t)), 0.0, 1e-9);
        }
        assert_approx_eq!(conic.length(0.0, 1.0), crate::PI / 2.0, 1e-9);

        let (c0, c1) = conic.split();
        assert!(c0.end().dist(c1.start()) < 1e-12);
        assert_approx_eq!(c0.at(0.5).length(), 1.0, 1e-12);
        assert_approx_eq!(c1.at(0.3).length(), 1.0, 1e-12);
        assert_approx_eq!(c0.length(0.0, 1.0), crate::PI / 4.0, 1e-9);

        let cut = conic.cut(0.2, 0.7);
        assert!(cut.start().dist(conic.at(0.2)) < 1e-12);
        assert!(cut.end().dist(conic.at(0.7)) < 1e-12);
        assert_approx_eq!(cut.at(0.5).length(), 1.0, 1e-12);
    }

    #[test]
    fn test_conic_quads() {
        let conic = Conic::new((1.0, 0.0), (1.0, 1.0), (0.0, 1.0), 0.5f64.sqrt());
        let pow2 = conic.quad_pow2(0.25);
        assert_eq!(pow2, 0);
        let pow2 = conic.quad_pow2(0.001);
        let quads = conic.to_quads(pow2);
        assert_eq!(quads.len(), 1 << pow2);
        assert_eq!(quads[0].start(), conic.start());
        assert!(quads[quads.len() - 1].end().dist(conic.end()) < 1e-12);
        for quad in quads {
            assert_approx_eq!(quad.at(0.5).length(), 1.0, 0.001);
        }
    }

    #[test]
    fn test_length() {
        let line = Line::new((10.0, 10.0), (40.0, 50.0));
        assert_eq!(line.length(0.0, 1.0), 50.0);
        assert_eq!(line.param_at_length(25.0, None), 0.5);

        // degenerate quad is a line traversed non-uniformly
        let quad = Quad::new((0.0, 0.0), (9.0, 0.0), (10.0, 0.0));
        assert_approx_eq!(quad.length(0.0, 1.0), 10.0, 1e-9);
        let t = quad.param_at_length(5.0, None);
        assert_approx_eq!(quad.at(t).x(), 5.0, 1e-5);

        let cubic = Cubic::new((158.0, 70.0), (210.0, 250.0), (25.0, 190.0), (219.0, 89.0));
        let length = cubic.length(0.0, 1.0);
        let flat: Scalar = cubic
            .flatten(1e-3)
            .map(|line| line.direction().length())
            .sum();
        assert_approx_eq!(length, flat, 1e-3);
        let t = cubic.param_at_length(length / 3.0, Some(1e-9));
        assert_approx_eq!(cubic.length(0.0, t), length / 3.0, 1e-6);
        assert_approx_eq!(cubic.length(t, 0.0), -length / 3.0, 1e-6);
    }

    #[test]
    fn test_tangent() {
        let cubic = Cubic::new((0.0, 0.0), (0.0, 0.0), (10.0, 10.0), (20.0, 10.0));
        let tangent = cubic.tangent_at(0.0).unwrap();
        assert_approx_eq!(tangent.x(), 0.5f64.sqrt(), 1e-3);
        assert_approx_eq!(tangent.y(), 0.5f64.sqrt(), 1e-3);
        let line = Line::new((1.0, 1.0), (1.0, 1.0));
        assert_eq!(line.tangent_at(0.5), None);
    }

    #[test]
    fn test_bbox() {
        let cubic = Cubic::new((106.0, 0.0), (0.0, 100.0), (382.0, 216.0), (324.0, 14.0));
        let bbox = cubic.bbox(None);
        assert_approx_eq!(bbox.x(), 87.308, 0.001);
        assert_approx_eq!(bbox.y(), 0.0, 0.001);
        assert_approx_eq!(bbox.width(), 242.724, 0.001);
        assert_approx_eq!(bbox.height(), 125.140, 0.001);

        let quad = Quad::new((30.0, 90.0), (220.0, 200.0), (120.0, 50.0));
        let bbox = quad.bbox(None);
        assert_approx_eq!(bbox.x(), 30.0, 0.001);
        assert_approx_eq!(bbox.y(), 50.0, 0.001);
        assert_approx_eq!(bbox.width(), 124.483, 0.001);
        assert_approx_eq!(bbox.height(), 86.538, 0.001);

        let conic = Conic::new((1.0, 0.0), (1.0, -1.0), (-1.0, 0.0), 0.5);
        let bbox = conic.bbox(None);
        let samples = (0..=1000).map(|i| conic.at(i as Scalar / 1000.0));
        let reference = samples.fold(BBox::new(conic.start(), conic.end()), |b, p| b.extend(p));
        assert_approx_eq!(bbox.x(), reference.x(), 1e-4);
        assert_approx_eq!(bbox.y(), reference.y(), 1e-4);
        assert_approx_eq!(bbox.width(), reference.width(), 1e-4);
        assert_approx_eq!(bbox.height(), reference.height(), 1e-4);
    }

    #[test]
    fn test_flatten() {
        let quad = Quad::new((0.0, 0.0), (5.0, 10.0), (10.0, 0.0));
        let lines: Vec<_> = quad.flatten(0.05).collect();
        assert!(lines.len() > 1);
        assert_eq!(lines[0].start(), quad.start());
        assert_eq!(lines[lines.len() - 1].end(), quad.end());
        for ls in lines.windows(2) {
            assert!(ls[0].end().is_close_to(ls[1].start()));
        }
    }

    #[test]
    fn test_flatten_degenerate() {
        // non-finite control points produce a single chord
        let cubic = Cubic::new(
            (1.0, Scalar::INFINITY),
            (1.0, 1.0),
            (Scalar::NAN, 2.0),
            (3.0, 3.0),
        );
        let lines: Vec<_> = cubic.flatten(DEFAULT_FLATNESS).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].end(), Point::new(3.0, 3.0));

        // zero flatness stops at the depth limit
        let quad = Quad::new((0.0, 0.0), (5.0, 10.0), (10.0, 0.0));
        assert_eq!(quad.flatten(0.0).count(), 1 << FLATTEN_MAX_DEPTH);
    }
}
