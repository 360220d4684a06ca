use crate::{BBox, Conic, PI, Point, Scalar, Transform};
use std::fmt;

/// Elliptical Arc
#[derive(Clone, Copy, PartialEq)]
pub struct EllipArc {
    /// center of the ellipse
    center: Point,
    /// radius along x-axis before the rotation
    rx: Scalar,
    /// radius along y-axis before the rotation
    ry: Scalar,
    /// rotation
    phi: Scalar,
    /// angular start
    eta: Scalar,
    /// angular size
    eta_delta: Scalar,
}

impl fmt::Debug for EllipArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Arc center:{:?} radius:{:?} phi:{:.3?} eta:{:.3?} eta_delta:{:.3?}",
            self.center,
            Point([self.rx, self.ry]),
            self.phi,
            self.eta,
            self.eta_delta
        )
    }
}

impl EllipArc {
    /// Convert arc from SVG arguments to parametric curve
    ///
    /// This code mostly comes from arc implementation notes from svg spec
    /// (Arc to Parametric)[https://www.w3.org/TR/SVG/implnote.html#ArcImplementationNotes]
    pub fn new_param(
        src: Point,
        dst: Point,
        rx: Scalar,
        ry: Scalar,
        x_axis_rot: Scalar,
        large_flag: bool,
        sweep_flag: bool,
    ) -> Option<Self> {
        let rx = rx.abs();
        let ry = ry.abs();
        if rx == 0.0 || ry == 0.0 || src.is_close_to(dst) {
            return None;
        }
        let phi = x_axis_rot * PI / 180.0;

        // Eq 5.1
        let Point([x1, y1]) = Transform::new_rotate(-phi).apply(0.5 * (src - dst));
        // scale/normalize radii
        let s = (x1 / rx).powi(2) + (y1 / ry).powi(2);
        let (rx, ry) = if s > 1.0 {
            let s = s.sqrt();
            (rx * s, ry * s)
        } else {
            (rx, ry)
        };
        // Eq 5.2
        let sq = ((rx * ry).powi(2) / ((rx * y1).powi(2) + (ry * x1).powi(2)) - 1.0)
            .max(0.0)
            .sqrt();
        let sq = if large_flag == sweep_flag { -sq } else { sq };
        let center = sq * Point([rx * y1 / ry, -ry * x1 / rx]);
        let Point([cx, cy]) = center;
        // Eq 5.3 convert center to initial coordinates
        let center = Transform::new_rotate(phi).apply(center) + 0.5 * (dst + src);
        // Eq 5.5-6
        let v0 = Point([1.0, 0.0]);
        let v1 = Point([(x1 - cx) / rx, (y1 - cy) / ry]);
        let v2 = Point([(-x1 - cx) / rx, (-y1 - cy) / ry]);
        // initial angle
        let eta = v0.angle_between(v1)?;
        // delta angle to be covered when t changes from 0..1
        let eta_delta = v1.angle_between(v2)?.rem_euclid(2.0 * PI);
        let eta_delta = if !sweep_flag && eta_delta > 0.0 {
            eta_delta - 2.0 * PI
        } else if sweep_flag && eta_delta < 0.0 {
            eta_delta + 2.0 * PI
        } else {
            eta_delta
        };

        // overflow of extreme radii or coordinates
        let params = [rx, ry, eta, eta_delta];
        if !center.is_finite() || params.iter().any(|param| !param.is_finite()) {
            return None;
        }
        Some(Self {
            center,
            rx,
            ry,
            phi,
            eta,
            eta_delta,
        })
    }

    /// Arc of the axis aligned ellipse inscribed into `oval`
    ///
    /// Angles are in degrees, measured clockwise from the positive x-axis in y-down
    /// coordinates, positive sweep goes clockwise.
    pub fn new_oval(oval: BBox, start_deg: Scalar, sweep_deg: Scalar) -> Self {
        Self {
            center: oval.center(),
            rx: oval.width() / 2.0,
            ry: oval.height() / 2.0,
            phi: 0.0,
            eta: start_deg.to_radians(),
            eta_delta: sweep_deg.to_radians(),
        }
    }

    pub fn at(&self, t: Scalar) -> Point {
        self.at_angle(self.eta + t * self.eta_delta)
    }

    fn at_angle(&self, angle: Scalar) -> Point {
        let (angle_sin, angle_cos) = angle.sin_cos();
        let point = Point([self.rx * angle_cos, self.ry * angle_sin]);
        Transform::new_rotate(self.phi).apply(point) + self.center
    }

    pub fn start(&self) -> Point {
        self.at(0.0)
    }

    pub fn end(&self) -> Point {
        self.at(1.0)
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Angular size of the arc in radians, negative for counter-clockwise arcs
    pub fn sweep(&self) -> Scalar {
        self.eta_delta
    }

    /// Convert elliptic arc to an iterator over conic segments
    pub fn to_conics(&self) -> EllipArcConicIter {
        EllipArcConicIter::new(*self)
    }
}

/// Exact representation of an arc with a sequence of conics
///
/// Arc is split into pieces of at most `pi / 2`. For a piece from `eta_1` to `eta_2` of the
/// unit circle with `half = (eta_2 - eta_1) / 2` and `mid = eta_1 + half`:
///     P0 = A(eta_1)
///     P1 = [cos(mid), sin(mid)] / cos(half)
///     P2 = A(eta_2)
///     w  = cos(half)
/// P1 is the intersection of the tangents at both ends. Ellipse is an affine image of the
/// unit circle so the same construction applies after scaling by radii and rotating.
pub struct EllipArcConicIter {
    arc: EllipArc,
    phi_tr: Transform,
    segment_delta: Scalar,
    segment_index: Scalar,
    segment_count: Scalar,
}

impl EllipArcConicIter {
    fn new(arc: EllipArc) -> Self {
        let phi_tr = Transform::new_rotate(arc.phi);
        let segment_max_angle = PI / 2.0; // maximum `eta_delta` of a segment
        let segment_count = (arc.eta_delta.abs() / segment_max_angle - 1e-9)
            .ceil()
            .max(1.0);
        let segment_delta = arc.eta_delta / segment_count;
        Self {
            arc,
            phi_tr,
            segment_delta,
            segment_index: 0.0,
            segment_count: segment_count - 1.0,
        }
    }
}

impl Iterator for EllipArcConicIter {
    type Item = Conic;

    fn next(&mut self) -> Option<Self::Item> {
        if self.segment_index > self.segment_count {
            return None;
        }
        let eta_1 = self.arc.eta + self.segment_delta * self.segment_index;
        let eta_2 = eta_1 + self.segment_delta;
        self.segment_index += 1.0;

        let half = (eta_2 - eta_1) / 2.0;
        let weight = half.cos();
        let (mid_sin, mid_cos) = (eta_1 + half).sin_cos();
        let control = self.phi_tr.apply(Point([
            self.arc.rx * mid_cos / weight,
            self.arc.ry * mid_sin / weight,
        ])) + self.arc.center;
        Some(Conic::new(
            self.arc.at_angle(eta_1),
            control,
            self.arc.at_angle(eta_2),
            weight,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curve, assert_approx_eq};

    #[test]
    fn test_param() {
        let arc = EllipArc::new_param(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            5.0,
            5.0,
            0.0,
            false,
            true,
        )
        .unwrap();
        assert_approx_eq!(arc.center().x(), 5.0, 1e-9);
        assert_approx_eq!(arc.center().y(), 0.0, 1e-9);
        assert_approx_eq!(arc.sweep(), PI, 1e-9);
        assert!(arc.start().dist(Point::new(0.0, 0.0)) < 1e-9);
        assert!(arc.end().dist(Point::new(10.0, 0.0)) < 1e-9);
        // clockwise in y-down coordinates passes through the top
        assert!(arc.at(0.5).dist(Point::new(5.0, -5.0)) < 1e-9);

        assert!(
            EllipArc::new_param(
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                0.0,
                5.0,
                0.0,
                false,
                true
            )
            .is_none()
        );
    }

    #[test]
    fn test_conics() {
        let oval = BBox::from_ltrb(0.0, 0.0, 40.0, 20.0);
        let arc = EllipArc::new_oval(oval, 0.0, 360.0);
        let conics: Vec<_> = arc.to_conics().collect();
        assert_eq!(conics.len(), 4);
        for conic in conics.iter() {
            assert_approx_eq!(conic.weight(), 0.5f64.sqrt(), 1e-12);
            for i in 0..=8 {
                // every point lies on the ellipse
                let Point([x, y]) = conic.at(i as Scalar / 8.0) - Point::new(20.0, 10.0);
                assert_approx_eq!((x / 20.0).powi(2) + (y / 10.0).powi(2), 1.0, 1e-9);
            }
        }
        assert!(conics[0].start().dist(Point::new(40.0, 10.0)) < 1e-9);
        assert!(conics[0].end().dist(Point::new(20.0, 20.0)) < 1e-9);

        let arc = EllipArc::new_oval(oval, 0.0, -100.0);
        let conics: Vec<_> = arc.to_conics().collect();
        assert_eq!(conics.len(), 2);
        assert!(conics[1].end().dist(arc.end()) < 1e-9);
    }
}
