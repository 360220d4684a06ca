use crate::{BBox, Point, Scalar};

/// Rounded rectangle
///
/// Corner radii `(rx, ry)` are stored in top-left, top-right, bottom-right, bottom-left order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RRect {
    rect: BBox,
    radii: [Point; 4],
}

impl RRect {
    /// Create rounded rectangle
    ///
    /// Negative and non-finite radii become zero, a corner with one zero radius is square.
    /// If radii of two adjacent corners do not fit into a side, all radii are scaled down
    /// by the same factor.
    pub fn new(rect: impl Into<BBox>, radii: [Point; 4]) -> Self {
        let rect = rect.into();
        let mut radii = radii.map(|Point([rx, ry])| {
            let valid = |r: Scalar| if r.is_finite() && r > 0.0 { r } else { 0.0 };
            let (rx, ry) = (valid(rx), valid(ry));
            if rx == 0.0 || ry == 0.0 {
                Point::new(0.0, 0.0)
            } else {
                Point::new(rx, ry)
            }
        });

        let [tl, tr, br, bl] = radii;
        let (width, height) = (rect.width(), rect.height());
        let scale = [
            (width, tl.x() + tr.x()),
            (height, tr.y() + br.y()),
            (width, br.x() + bl.x()),
            (height, bl.y() + tl.y()),
        ]
        .into_iter()
        .fold(1.0, |scale: Scalar, (side, sum)| {
            if sum > side {
                scale.min(side / sum)
            } else {
                scale
            }
        });
        if scale < 1.0 {
            tracing::trace!(scale, "rrect radii scaled down");
            for radius in radii.iter_mut() {
                *radius = scale * *radius;
            }
        }
        Self { rect, radii }
    }

    /// Create rounded rectangle with the same radii for every corner
    pub fn new_xy(rect: impl Into<BBox>, rx: Scalar, ry: Scalar) -> Self {
        Self::new(rect, [Point::new(rx, ry); 4])
    }

    pub fn rect(&self) -> BBox {
        self.rect
    }

    pub fn radii(&self) -> [Point; 4] {
        self.radii
    }

    /// All corners are square
    pub fn is_rect(&self) -> bool {
        self.radii.iter().all(|r| r.x() == 0.0 && r.y() == 0.0)
    }

    /// Every corner is a quarter of the inscribed ellipse
    pub fn is_oval(&self) -> bool {
        let half = Point::new(self.rect.width() / 2.0, self.rect.height() / 2.0);
        !self.is_rect() && self.radii.iter().all(|r| *r == half)
    }
}

impl From<[Scalar; 12]> for RRect {
    /// `[left, top, right, bottom, tl_x, tl_y, tr_x, tr_y, br_x, br_y, bl_x, bl_y]`
    fn from(values: [Scalar; 12]) -> Self {
        let [l, t, r, b, r0, r1, r2, r3, r4, r5, r6, r7] = values;
        Self::new(
            BBox::from_ltrb(l, t, r, b),
            [
                Point::new(r0, r1),
                Point::new(r2, r3),
                Point::new(r4, r5),
                Point::new(r6, r7),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radii() {
        let rrect = RRect::new_xy([100.0, 10.0, 140.0, 62.0], 10.0, 4.0);
        assert_eq!(rrect.radii(), [Point::new(10.0, 4.0); 4]);
        assert!(!rrect.is_rect());
        assert!(!rrect.is_oval());

        // 60 + 60 does not fit into the side of 100
        let rrect = RRect::from([
            0.0, 0.0, 100.0, 200.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0,
        ]);
        for radius in rrect.radii() {
            assert_eq!(radius, Point::new(50.0, 50.0));
        }

        let rrect = RRect::new(
            [0.0, 0.0, 10.0, 10.0],
            [
                Point::new(-1.0, 2.0),
                Point::new(Scalar::NAN, 2.0),
                Point::new(0.0, 2.0),
                Point::new(2.0, 0.0),
            ],
        );
        assert!(rrect.is_rect());

        let rrect = RRect::new_xy([0.0, 0.0, 10.0, 20.0], 5.0, 10.0);
        assert!(rrect.is_oval());
    }
}
