//! Construction operations on `Path`
//!
//! All operations mutate the path in place and return `&mut Self` so they can be chained.
//! Drawing operations on an empty path, or right after `close`, start a new contour at the
//! start point of the last contour (origin for an empty path).
use crate::{AsPoints, BBox, Conic, EllipArc, FillRule, Path, Point, RRect, Scalar, Transform, Verb};

/// Weight of the conic which represents a quarter of a circle
const QUARTER_WEIGHT: Scalar = std::f64::consts::FRAC_1_SQRT_2;

/// Winding direction of the closed shapes (in y-down coordinate system)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Cw,
    Ccw,
}

impl Path {
    /// Contour was closed or not started yet
    fn need_move(&self) -> bool {
        matches!(self.verbs.last(), None | Some(Verb::Close))
    }

    fn inject_move_to(&mut self) {
        if self.need_move() {
            let start = self
                .points
                .get(self.contour_start)
                .copied()
                .unwrap_or_default();
            self.move_to(start);
        }
    }

    /// Current point, origin for an empty path
    fn current(&mut self) -> Point {
        self.inject_move_to();
        self.last_point().unwrap_or_default()
    }

    /// Start new contour at point `p`
    pub fn move_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.contour_start = self.points.len();
        self.verbs.push(Verb::Move);
        self.points.push(p.into());
        self
    }

    /// Start new contour at offset `d` from the last point
    pub fn r_move_to(&mut self, d: impl Into<Point>) -> &mut Self {
        let last = self.last_point().unwrap_or_default();
        self.move_to(last + d.into())
    }

    /// Add line segment
    pub fn line_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.inject_move_to();
        self.verbs.push(Verb::Line);
        self.points.push(p.into());
        self
    }

    pub fn r_line_to(&mut self, d: impl Into<Point>) -> &mut Self {
        let last = self.current();
        self.line_to(last + d.into())
    }

    /// Add quadratic bezier curve
    pub fn quad_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>) -> &mut Self {
        self.inject_move_to();
        self.verbs.push(Verb::Quad);
        self.points.extend([p1.into(), p2.into()]);
        self
    }

    pub fn r_quad_to(&mut self, d1: impl Into<Point>, d2: impl Into<Point>) -> &mut Self {
        let last = self.current();
        self.quad_to(last + d1.into(), last + d2.into())
    }

    /// Add conic curve
    ///
    /// Weight of `1` produces a quadratic curve. Weight which is not greater than zero
    /// produces a line to `p2`, infinite weight produces two lines through `p1`.
    pub fn conic_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>, w: Scalar) -> &mut Self {
        let (p1, p2) = (p1.into(), p2.into());
        if !(w > 0.0) {
            tracing::trace!(w, "conic with non-positive weight is a line");
            self.line_to(p2)
        } else if !w.is_finite() {
            tracing::trace!(w, "conic with infinite weight is a pair of lines");
            self.line_to(p1).line_to(p2)
        } else if w == 1.0 {
            self.quad_to(p1, p2)
        } else {
            self.inject_move_to();
            self.verbs.push(Verb::Conic);
            self.points.extend([p1, p2]);
            self.weights.push(w);
            self
        }
    }

    pub fn r_conic_to(
        &mut self,
        d1: impl Into<Point>,
        d2: impl Into<Point>,
        w: Scalar,
    ) -> &mut Self {
        let last = self.current();
        self.conic_to(last + d1.into(), last + d2.into(), w)
    }

    /// Add cubic bezier curve
    pub fn cubic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> &mut Self {
        self.inject_move_to();
        self.verbs.push(Verb::Cubic);
        self.points.extend([p1.into(), p2.into(), p3.into()]);
        self
    }

    pub fn r_cubic_to(
        &mut self,
        d1: impl Into<Point>,
        d2: impl Into<Point>,
        d3: impl Into<Point>,
    ) -> &mut Self {
        let last = self.current();
        self.cubic_to(last + d1.into(), last + d2.into(), last + d3.into())
    }

    /// Close current contour
    pub fn close(&mut self) -> &mut Self {
        if !self.need_move() {
            self.verbs.push(Verb::Close);
        }
        self
    }

    fn conics_to(&mut self, conics: impl IntoIterator<Item = Conic>) -> &mut Self {
        for conic in conics {
            let [_, p1, p2] = conic.points();
            self.conic_to(p1, p2, conic.weight());
        }
        self
    }

    /// Add a line and a circular arc tangent to both lines `current -> p1` and `p1 -> p2`
    ///
    /// Degenerates to a line to `p1` if radius is not positive, or if lines are
    /// collinear or empty.
    pub fn arc_to_tangent(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        radius: Scalar,
    ) -> &mut Self {
        let (p1, p2) = (p1.into(), p2.into());
        let start = self.current();
        let (before, after) = match ((p1 - start).normalize(), (p2 - p1).normalize()) {
            (Some(before), Some(after)) if radius > 0.0 => (before, after),
            _ => {
                tracing::trace!(?p1, radius, "tangent arc degenerates to a line");
                return self.line_to(p1);
            }
        };
        let cos = before.dot(after);
        let sin = before.cross(after);
        if sin.abs() <= crate::EPSILON_SQRT {
            tracing::trace!(?p1, "tangent arc on collinear lines");
            return self.line_to(p1);
        }
        let dist = (radius * (1.0 - cos) / sin).abs();
        self.line_to(p1 - dist * before);
        self.conic_to(p1, p1 + dist * after, (0.5 + 0.5 * cos).sqrt())
    }

    /// Add an arc of the ellipse inscribed into `oval`
    ///
    /// Angles are in degrees. Arc starts a new contour if `force_move_to` is set or path
    /// is empty, otherwise it is connected to the current point with a line.
    pub fn arc_to_oval(
        &mut self,
        oval: impl Into<BBox>,
        start_deg: Scalar,
        sweep_deg: Scalar,
        force_move_to: bool,
    ) -> &mut Self {
        let sweep_deg = sweep_deg.clamp(-360.0, 360.0);
        let arc = EllipArc::new_oval(oval.into(), start_deg, sweep_deg);
        let start = arc.start();
        if force_move_to || self.verbs.is_empty() {
            self.move_to(start);
        } else if self.need_move() || self.last_point().is_none_or(|last| !last.is_close_to(start)) {
            self.line_to(start);
        }
        if sweep_deg == 0.0 {
            return self;
        }
        self.conics_to(arc.to_conics())
    }

    /// Add SVG style elliptical arc from the current point to `end`
    ///
    /// Degenerates to a line if any of the radii is zero or `end` is the current point.
    pub fn arc_to_rotated(
        &mut self,
        radii: impl Into<Point>,
        x_axis_rotate_deg: Scalar,
        use_small_arc: bool,
        ccw: bool,
        end: impl Into<Point>,
    ) -> &mut Self {
        let Point([rx, ry]) = radii.into();
        let end = end.into();
        let start = self.current();
        match EllipArc::new_param(
            start,
            end,
            rx,
            ry,
            x_axis_rotate_deg,
            !use_small_arc,
            !ccw,
        ) {
            Some(arc) => self.conics_to(arc.to_conics()),
            None => {
                tracing::trace!(?end, rx, ry, "elliptical arc degenerates to a line");
                self.line_to(end)
            }
        }
    }

    /// Relative version of `arc_to_rotated`, `d` is the offset of the end point
    pub fn r_arc_to(
        &mut self,
        radii: impl Into<Point>,
        x_axis_rotate_deg: Scalar,
        use_small_arc: bool,
        ccw: bool,
        d: impl Into<Point>,
    ) -> &mut Self {
        let last = self.current();
        self.arc_to_rotated(radii, x_axis_rotate_deg, use_small_arc, ccw, last + d.into())
    }

    /// Add circular arc connected to the current contour
    ///
    /// Sweep is `end_deg - start_deg`, decreased by full turn if `ccw` is set.
    pub fn arc(
        &mut self,
        center: impl Into<Point>,
        radius: Scalar,
        start_deg: Scalar,
        end_deg: Scalar,
        ccw: bool,
    ) -> &mut Self {
        let Point([x, y]) = center.into();
        let oval = BBox::from_ltrb(x - radius, y - radius, x + radius, y + radius);
        let sweep = end_deg - start_deg - if ccw { 360.0 } else { 0.0 };
        let mut arc = Path::new();
        arc.add_arc(oval, start_deg, sweep);
        self.extend_path(&arc)
    }

    /// Append `other` connecting its first contour to the current contour with a line
    fn extend_path(&mut self, other: &Path) -> &mut Self {
        let mut cmds = other.commands();
        if let Some(crate::PathCmd::Move(p)) = cmds.next() {
            if self.verbs.is_empty() {
                self.move_to(p);
            } else if self.need_move() || self.last_point().is_none_or(|last| !last.is_close_to(p)) {
                self.line_to(p);
            }
        }
        for cmd in cmds {
            match cmd {
                crate::PathCmd::Move(p) => self.move_to(p),
                crate::PathCmd::Line(p) => self.line_to(p),
                crate::PathCmd::Quad(p1, p2) => self.quad_to(p1, p2),
                crate::PathCmd::Conic(p1, p2, w) => self.conic_to(p1, p2, w),
                crate::PathCmd::Cubic(p1, p2, p3) => self.cubic_to(p1, p2, p3),
                crate::PathCmd::Close => self.close(),
            };
        }
        self
    }

    /// Add closed rectangle contour
    ///
    /// `start_index` selects the first corner: top-left, top-right, bottom-right, bottom-left.
    pub fn add_rect(&mut self, rect: impl Into<BBox>, dir: Direction, start_index: usize) -> &mut Self {
        let [l, t, r, b] = rect.into().ltrb();
        let corners = [
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ];
        let mut index = start_index % 4;
        self.move_to(corners[index]);
        for _ in 0..3 {
            index = step(index, 4, dir);
            self.line_to(corners[index]);
        }
        self.close()
    }

    /// Add closed contour of the ellipse inscribed into `oval`
    ///
    /// `start_index` selects the first point: top, right, bottom, left.
    pub fn add_oval(&mut self, oval: impl Into<BBox>, dir: Direction, start_index: usize) -> &mut Self {
        let [l, t, r, b] = oval.into().ltrb();
        let (cx, cy) = ((l + r) / 2.0, (t + b) / 2.0);
        let points = [
            Point::new(cx, t),
            Point::new(r, cy),
            Point::new(cx, b),
            Point::new(l, cy),
        ];
        let corners = [
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ];
        let mut index = start_index % 4;
        self.move_to(points[index]);
        for _ in 0..4 {
            let next = step(index, 4, dir);
            let corner = match dir {
                Direction::Cw => corners[next],
                Direction::Ccw => corners[index],
            };
            self.conic_to(corner, points[next], QUARTER_WEIGHT);
            index = next;
        }
        self.close()
    }

    /// Add closed rounded rectangle contour
    ///
    /// Contour starts on the left side, at its bottom end when clockwise and at its top end
    /// otherwise. Square or fully rounded rectangles produce the same contours as `add_rect`
    /// and `add_oval`.
    pub fn add_rrect(&mut self, rrect: impl Into<RRect>, dir: Direction) -> &mut Self {
        let rrect = rrect.into();
        let [l, t, r, b] = rrect.rect().ltrb();
        if rrect.is_rect() {
            let start = match dir {
                Direction::Cw => 3,
                Direction::Ccw => 0,
            };
            return self.add_rect(rrect.rect(), dir, start);
        }
        if rrect.is_oval() {
            return self.add_oval(rrect.rect(), dir, 3);
        }
        let [tl, tr, br, bl] = rrect.radii();
        // points where sides meet corner arcs, clockwise from the top side
        let points = [
            Point::new(l + tl.x(), t),
            Point::new(r - tr.x(), t),
            Point::new(r, t + tr.y()),
            Point::new(r, b - br.y()),
            Point::new(r - br.x(), b),
            Point::new(l + bl.x(), b),
            Point::new(l, b - bl.y()),
            Point::new(l, t + tl.y()),
        ];
        // corner following odd point in clockwise order
        let corner = |index: usize| match index {
            1 => Point::new(r, t),
            3 => Point::new(r, b),
            5 => Point::new(l, b),
            _ => Point::new(l, t),
        };
        let mut index = match dir {
            Direction::Cw => 6,
            Direction::Ccw => 7,
        };
        self.move_to(points[index]);
        // sides and corners alternate, starting with the left side
        for _ in 0..8 {
            let next = step(index, 8, dir);
            let arc_from = match dir {
                Direction::Cw => index,
                Direction::Ccw => next,
            };
            if arc_from % 2 == 1 {
                self.conic_to(corner(arc_from), points[next], QUARTER_WEIGHT);
            } else {
                self.line_to(points[next]);
            }
            index = next;
        }
        self.close()
    }

    /// Add arc of the ellipse inscribed into `oval` as a new contour
    ///
    /// Full turn sweeps starting at a multiple of right angle produce an oval.
    pub fn add_arc(&mut self, oval: impl Into<BBox>, start_deg: Scalar, sweep_deg: Scalar) -> &mut Self {
        let oval = oval.into();
        if oval.width() <= 0.0 || oval.height() <= 0.0 || sweep_deg == 0.0 {
            return self;
        }
        if sweep_deg.abs() >= 360.0 {
            let start_over = start_deg / 90.0;
            let start_round = start_over.round();
            if (start_over - start_round).abs() < 1.0 / 4096.0 {
                // index 1 is at zero angle
                let start_index = (start_round + 1.0).rem_euclid(4.0) as usize;
                let dir = if sweep_deg > 0.0 {
                    Direction::Cw
                } else {
                    Direction::Ccw
                };
                return self.add_oval(oval, dir, start_index);
            }
        }
        self.arc_to_oval(oval, start_deg, sweep_deg, true)
    }

    /// Add polyline contour
    pub fn add_poly(&mut self, points: &(impl AsPoints + ?Sized), close: bool) -> &mut Self {
        let Some((first, rest)) = points.as_points().split_first() else {
            return self;
        };
        self.move_to(*first);
        for point in rest {
            self.line_to(*point);
        }
        if close {
            self.close();
        }
        self
    }

    /// Append all contours of `other`
    pub fn add_path(&mut self, other: &Path) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        let offset = self.points.len();
        self.verbs.extend_from_slice(&other.verbs);
        self.points.extend_from_slice(&other.points);
        self.weights.extend_from_slice(&other.weights);
        self.contour_start = offset + other.contour_start;
        self
    }

    /// Append all contours of `other` transformed by `tr`
    pub fn add_path_transformed(&mut self, other: &Path, tr: Transform) -> &mut Self {
        let mut other = other.clone();
        other.transform(tr);
        self.add_path(&other)
    }

    /// Apply transformation to every point of the path
    pub fn transform(&mut self, tr: Transform) -> &mut Self {
        for point in self.points.iter_mut() {
            *point = tr.apply(*point);
        }
        self
    }

    /// Translate every point of the path
    pub fn offset(&mut self, dx: Scalar, dy: Scalar) -> &mut Self {
        self.transform(Transform::new_translate(dx, dy))
    }

    /// Append commands from raw verb, point and weight buffers
    ///
    /// Processing stops at the first unknown verb, or verb which does not have enough
    /// points or weights left.
    pub fn add_verbs_points_weights(
        &mut self,
        verbs: &[u8],
        points: &(impl AsPoints + ?Sized),
        weights: &[Scalar],
    ) -> &mut Self {
        let points = points.as_points();
        let (mut point_index, mut weight_index) = (0, 0);
        for (index, tag) in verbs.iter().enumerate() {
            let Ok(verb) = Verb::try_from(*tag) else {
                tracing::debug!(index, tag, "unknown verb, path is truncated");
                break;
            };
            let Some(ps) = points.get(point_index..point_index + verb.points_count()) else {
                tracing::debug!(index, ?verb, "not enough points, path is truncated");
                break;
            };
            let weight = if verb.has_weight() {
                let Some(weight) = weights.get(weight_index) else {
                    tracing::debug!(index, ?verb, "not enough weights, path is truncated");
                    break;
                };
                weight_index += 1;
                *weight
            } else {
                1.0
            };
            point_index += ps.len();
            match (verb, ps) {
                (Verb::Move, [p]) => self.move_to(*p),
                (Verb::Line, [p]) => self.line_to(*p),
                (Verb::Quad, [p1, p2]) => self.quad_to(*p1, *p2),
                (Verb::Conic, [p1, p2]) => self.conic_to(*p1, *p2, weight),
                (Verb::Cubic, [p1, p2, p3]) => self.cubic_to(*p1, *p2, *p3),
                _ => self.close(),
            };
        }
        self
    }

    /// Remove everything from the path
    pub fn rewind(&mut self) -> &mut Self {
        self.verbs.clear();
        self.points.clear();
        self.weights.clear();
        self.fill_rule = FillRule::default();
        self.contour_start = 0;
        self
    }
}

/// Next index on a cycle of `size` elements in direction `dir`
fn step(index: usize, size: usize, dir: Direction) -> usize {
    match dir {
        Direction::Cw => (index + 1) % size,
        Direction::Ccw => (index + size - 1) % size,
    }
}
