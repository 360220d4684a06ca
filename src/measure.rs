//! Arc length parameterization of path contours
use crate::{Curve, DEFAULT_LENGTH_TOLERANCE, Line, Path, PathEvent, Point, Scalar, Segment};
use std::{
    iter::{FusedIterator, Peekable},
    vec,
};

/// Measurement of a single contour
///
/// Owns a copy of the contour geometry so it stays valid after the source path is
/// modified or dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourMeasure {
    segments: Vec<Segment>,
    /// cumulative length at the end of each segment
    lengths: Vec<Scalar>,
    closed: bool,
    tolerance: Scalar,
}

impl ContourMeasure {
    /// Build measure from contour segments, `None` if contour has zero length
    fn new(segments: Vec<Segment>, closed: bool, tolerance: Scalar) -> Option<Self> {
        let mut total = 0.0;
        let mut lengths = Vec::with_capacity(segments.len());
        let mut kept = Vec::with_capacity(segments.len());
        for segment in segments {
            let length = segment.length(0.0, 1.0);
            // zero length and degenerate segments do not contribute
            if !(length > 0.0) || !length.is_finite() {
                continue;
            }
            total += length;
            lengths.push(total);
            kept.push(segment);
        }
        if kept.is_empty() {
            return None;
        }
        Some(Self {
            segments: kept,
            lengths,
            closed,
            tolerance,
        })
    }

    /// Total length of the contour
    pub fn length(&self) -> Scalar {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Whether contour was closed (explicitly or by `force_closed`)
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Segments of non-zero length the contour consists of
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Find segment index and its parameter at the distance along the contour
    ///
    /// When distance falls exactly on the boundary of two segments, `prefer_next` selects
    /// the start of the following segment instead of the end of the previous one.
    fn locate(&self, distance: Scalar, prefer_next: bool) -> (usize, Scalar) {
        let last = self.segments.len() - 1;
        let index = if prefer_next {
            self.lengths.partition_point(|length| *length <= distance)
        } else {
            self.lengths.partition_point(|length| *length < distance)
        }
        .min(last);
        let offset = if index == 0 {
            0.0
        } else {
            self.lengths[index - 1]
        };
        let segment = &self.segments[index];
        let t = segment.param_at_length(distance - offset, Some(self.tolerance));
        (index, t)
    }

    /// Position and unit tangent at the distance along the contour
    ///
    /// Distance is clamped to `[0, length]`.
    pub fn pos_tan(&self, distance: Scalar) -> (Point, Point) {
        let distance = if distance.is_nan() {
            0.0
        } else {
            distance.clamp(0.0, self.length())
        };
        let (index, t) = self.locate(distance, false);
        let segment = &self.segments[index];
        let tangent = segment.tangent_at(t).unwrap_or_default();
        (segment.at(t), tangent)
    }

    /// Append part of the contour between `start` and `stop` distances to `dst`
    ///
    /// Distances are clamped to `[0, length]`, returns `false` (and `dst` is left untouched)
    /// if the range is empty. If `start_with_move_to` is set, the piece starts a new contour,
    /// otherwise it continues the last contour of `dst`.
    pub fn segment_to(
        &self,
        start: Scalar,
        stop: Scalar,
        start_with_move_to: bool,
        dst: &mut Path,
    ) -> bool {
        if start.is_nan() || stop.is_nan() {
            return false;
        }
        let start = start.max(0.0);
        let stop = stop.min(self.length());
        if start > stop {
            return false;
        }
        let (start_index, start_t) = self.locate(start, true);
        let (stop_index, stop_t) = self.locate(stop, false);
        if start_with_move_to {
            dst.move_to(self.segments[start_index].at(start_t));
        }

        if start == stop || start_index > stop_index {
            // zero length piece is a zero length line
            if let Some(last) = dst.last_point() {
                dst.line_to(last);
            }
        } else if start_index == stop_index {
            segment_append(self.segments[start_index].cut(start_t, stop_t), dst);
        } else {
            segment_append(self.segments[start_index].cut(start_t, 1.0), dst);
            for segment in &self.segments[start_index + 1..stop_index] {
                segment_append(*segment, dst);
            }
            segment_append(self.segments[stop_index].cut(0.0, stop_t), dst);
        }
        true
    }

    /// Part of the contour between `start` and `stop` distances as a new path
    pub fn segment(&self, start: Scalar, stop: Scalar, start_with_move_to: bool) -> Option<Path> {
        let mut path = Path::new();
        if self.segment_to(start, stop, start_with_move_to, &mut path) {
            Some(path)
        } else {
            None
        }
    }
}

fn segment_append(segment: Segment, dst: &mut Path) {
    match segment {
        Segment::Line(line) => dst.line_to(line.end()),
        Segment::Quad(quad) => {
            let [_, p1, p2] = quad.points();
            dst.quad_to(p1, p2)
        }
        Segment::Conic(conic) => {
            let [_, p1, p2] = conic.points();
            dst.conic_to(p1, p2, conic.weight())
        }
        Segment::Cubic(cubic) => {
            let [_, p1, p2, p3] = cubic.points();
            dst.cubic_to(p1, p2, p3)
        }
    };
}

/// Iterator over measures of all contours of the path
///
/// Contours with zero length are skipped. Path geometry is copied on creation.
pub struct ContourMeasureIter {
    events: Peekable<vec::IntoIter<PathEvent>>,
    force_closed: bool,
    tolerance: Scalar,
}

impl ContourMeasureIter {
    /// Create contour iterator
    ///
    /// If `force_closed` is set open contours are measured as if they were closed.
    /// `res_scale` controls precision, values greater than `1` increase it.
    pub fn new(path: &Path, force_closed: bool, res_scale: Scalar) -> Self {
        let res_scale = if res_scale.is_finite() && res_scale > 0.0 {
            res_scale
        } else {
            1.0
        };
        Self {
            events: path.iter().collect::<Vec<_>>().into_iter().peekable(),
            force_closed,
            tolerance: DEFAULT_LENGTH_TOLERANCE / res_scale,
        }
    }

    /// Collect segments of the next contour, `None` if path is exhausted
    fn next_contour(&mut self) -> Option<(Vec<Segment>, bool)> {
        let mut segments = Vec::new();
        let mut start: Option<Point> = None;
        let mut last = Point::default();
        let mut closed = false;
        while let Some(event) = self.events.peek().copied() {
            match event {
                PathEvent::Move(p) => {
                    if start.is_some() {
                        break;
                    }
                    start = Some(p);
                    last = p;
                }
                PathEvent::Segment(segment) => {
                    start.get_or_insert(segment.start());
                    last = segment.end();
                    segments.push(segment);
                }
                PathEvent::Close { from, to } => {
                    self.events.next();
                    segments.push(Line([from, to]).into());
                    closed = true;
                    break;
                }
            }
            self.events.next();
        }
        let start = start?;
        if self.force_closed && !closed {
            segments.push(Line([last, start]).into());
            closed = true;
        }
        Some((segments, closed))
    }
}

impl Iterator for ContourMeasureIter {
    type Item = ContourMeasure;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (segments, closed) = self.next_contour()?;
            match ContourMeasure::new(segments, closed, self.tolerance) {
                Some(measure) => return Some(measure),
                None => tracing::trace!("zero length contour skipped"),
            }
        }
    }
}

impl FusedIterator for ContourMeasureIter {}

/// Stateful measurement cursor over contours of the path
///
/// Positioned on the first contour on creation, `next_contour` advances it.
pub struct PathMeasure {
    contours: ContourMeasureIter,
    current: Option<ContourMeasure>,
}

impl PathMeasure {
    pub fn new(path: &Path, force_closed: bool, res_scale: Scalar) -> Self {
        let mut contours = ContourMeasureIter::new(path, force_closed, res_scale);
        let current = contours.next();
        Self { contours, current }
    }

    /// Measure of the current contour
    pub fn current(&self) -> Option<&ContourMeasure> {
        self.current.as_ref()
    }

    /// Length of the current contour, `0` if there are no more contours
    pub fn length(&self) -> Scalar {
        self.current.as_ref().map_or(0.0, ContourMeasure::length)
    }

    pub fn is_closed(&self) -> bool {
        self.current.as_ref().is_some_and(ContourMeasure::is_closed)
    }

    pub fn pos_tan(&self, distance: Scalar) -> Option<(Point, Point)> {
        Some(self.current.as_ref()?.pos_tan(distance))
    }

    pub fn segment(&self, start: Scalar, stop: Scalar, start_with_move_to: bool) -> Option<Path> {
        self.current
            .as_ref()?
            .segment(start, stop, start_with_move_to)
    }

    /// Move to the next contour, returns `false` if there are no more contours
    pub fn next_contour(&mut self) -> bool {
        self.current = self.contours.next();
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, PI, PathCmd, Verb, assert_approx_eq};

    fn two_contours() -> Path {
        let mut path = Path::new();
        path.move_to((10.0, 10.0)).line_to((40.0, 50.0));
        path.move_to((80.0, 0.0))
            .line_to((80.0, 10.0))
            .line_to((100.0, 5.0))
            .line_to((80.0, 0.0));
        path
    }

    #[test]
    fn test_contour_measure_iter() {
        let path = two_contours();
        let mut iter = ContourMeasureIter::new(&path, false, 1.0);

        let contour = iter.next().unwrap();
        assert_approx_eq!(contour.length(), 50.0, 1e-3);
        let (pos, tan) = contour.pos_tan(28.7);
        assert_approx_eq!(pos.x(), 27.22, 1e-3);
        assert_approx_eq!(pos.y(), 32.96, 1e-3);
        assert_approx_eq!(tan.x(), 0.6, 1e-3);
        assert_approx_eq!(tan.y(), 0.8, 1e-3);
        assert!(!contour.is_closed());

        let segment = contour.segment(20.0, 40.0, true).unwrap();
        let cmds = segment.to_cmds();
        assert_eq!(cmds.len(), 2);
        if let (PathCmd::Move(p0), PathCmd::Line(p1)) = (cmds[0], cmds[1]) {
            assert!(p0.dist(Point::new(22.0, 26.0)) < 1e-9);
            assert!(p1.dist(Point::new(34.0, 42.0)) < 1e-9);
        } else {
            panic!("unexpected segment: {:?}", segment);
        }

        let contour = iter.next().unwrap();
        assert_approx_eq!(contour.length(), 51.231, 1e-3);

        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_path_measure() {
        let path = two_contours();
        let mut measure = PathMeasure::new(&path, false, 1.0);
        assert_approx_eq!(measure.length(), 50.0, 1e-3);
        let (pos, tan) = measure.pos_tan(28.7).unwrap();
        assert_approx_eq!(pos.x(), 27.22, 1e-3);
        assert_approx_eq!(pos.y(), 32.96, 1e-3);
        assert_approx_eq!(tan.x(), 0.6, 1e-3);
        assert_approx_eq!(tan.y(), 0.8, 1e-3);
        assert!(measure.segment(20.0, 40.0, true).is_some());

        assert!(measure.next_contour());
        assert_approx_eq!(measure.length(), 51.231, 1e-3);

        assert!(!measure.next_contour());
        assert_eq!(measure.length(), 0.0);
        assert!(measure.pos_tan(1.0).is_none());
        assert!(measure.segment(0.0, 1.0, true).is_none());
        assert!(!measure.next_contour());
    }

    #[test]
    fn test_closed() {
        let path = two_contours();
        let mut iter = ContourMeasureIter::new(&path, true, 1.0);
        let contour = iter.next().unwrap();
        // line there and back
        assert_approx_eq!(contour.length(), 100.0, 1e-9);
        assert!(contour.is_closed());
        // zero length closing line does not count
        let contour = iter.next().unwrap();
        assert_approx_eq!(contour.length(), 51.231, 1e-3);

        let mut path = Path::new();
        path.add_poly(&[[0.0, 0.0], [30.0, 0.0], [30.0, 40.0]], true);
        let contour = ContourMeasureIter::new(&path, false, 1.0).next().unwrap();
        assert!(contour.is_closed());
        assert_approx_eq!(contour.length(), 120.0, 1e-9);
        let (pos, tan) = contour.pos_tan(95.0);
        assert!(pos.dist(Point::new(15.0, 20.0)) < 1e-9);
        assert!(tan.dist(Point::new(-0.6, -0.8)) < 1e-9);
    }

    #[test]
    fn test_skip_empty() {
        let mut path = Path::new();
        assert!(ContourMeasureIter::new(&path, false, 1.0).next().is_none());
        path.move_to((0.0, 0.0))
            .move_to((5.0, 5.0))
            .line_to((5.0, 5.0))
            .move_to((0.0, 0.0))
            .line_to((3.0, 4.0))
            .move_to((7.0, 7.0));
        let lengths: Vec<_> = ContourMeasureIter::new(&path, false, 1.0)
            .map(|contour| contour.length())
            .collect();
        assert_eq!(lengths, vec![5.0]);
    }

    #[test]
    fn test_curves() {
        let mut path = Path::new();
        path.add_oval([0.0, 0.0, 20.0, 20.0], Direction::Cw, 0);
        let contour = ContourMeasureIter::new(&path, false, 1.0).next().unwrap();
        assert_approx_eq!(contour.length(), 20.0 * PI, 1e-6);
        // quarter of the way from the top point is the right point
        let (pos, tan) = contour.pos_tan(5.0 * PI);
        assert!(pos.dist(Point::new(20.0, 10.0)) < 1e-5);
        assert!(tan.dist(Point::new(0.0, 1.0)) < 1e-5);
        let (pos, _) = contour.pos_tan(contour.length() / 8.0);
        assert_approx_eq!(pos.dist(Point::new(10.0, 10.0)), 10.0, 1e-9);

        // segment spanning several conics keeps them as conics
        let piece = contour.segment(2.0, 40.0, true).unwrap();
        assert_eq!(piece.verbs()[0], Verb::Move);
        assert!(piece.verbs()[1..].iter().all(|verb| *verb == Verb::Conic));
        let piece_length: Scalar = ContourMeasureIter::new(&piece, false, 1.0)
            .map(|contour| contour.length())
            .sum();
        assert_approx_eq!(piece_length, 38.0, 1e-5);

        let mut path = Path::new();
        path.move_to((158.0, 70.0))
            .cubic_to((210.0, 250.0), (25.0, 190.0), (219.0, 89.0));
        let contour = ContourMeasureIter::new(&path, false, 4.0).next().unwrap();
        let piece = contour.segment(10.0, 60.0, false).unwrap();
        let piece_length = ContourMeasureIter::new(&piece, false, 4.0)
            .next()
            .unwrap()
            .length();
        assert_approx_eq!(piece_length, 50.0, 1e-5);
    }

    #[test]
    fn test_segment_edges() {
        let path = two_contours();
        let contour = ContourMeasureIter::new(&path, false, 1.0).next().unwrap();
        // reversed range is empty
        let mut dst = Path::new();
        assert!(!contour.segment_to(30.0, 20.0, true, &mut dst));
        assert!(dst.is_empty());
        assert!(!contour.segment_to(Scalar::NAN, 20.0, true, &mut dst));

        // ranges are clamped
        let piece = contour.segment(-10.0, 100.0, true).unwrap();
        assert_eq!(
            piece.to_cmds(),
            vec![
                PathCmd::Move(Point::new(10.0, 10.0)),
                PathCmd::Line(Point::new(40.0, 50.0))
            ]
        );

        // equal distances produce zero length line
        let piece = contour.segment(10.0, 10.0, true).unwrap();
        assert_eq!(piece.verbs(), &[Verb::Move, Verb::Line]);
        assert_eq!(piece.points()[0], piece.points()[1]);

        // continuation without move
        let mut dst = Path::new();
        dst.move_to((0.0, 0.0));
        assert!(contour.segment_to(0.0, 25.0, false, &mut dst));
        assert_eq!(dst.verbs(), &[Verb::Move, Verb::Line]);

        // piece starting at the boundary of two segments
        let contour = ContourMeasureIter::new(&path, false, 1.0).nth(1).unwrap();
        let piece = contour.segment(10.0, 20.0, true).unwrap();
        assert_eq!(piece.verbs(), &[Verb::Move, Verb::Line]);
        assert!(piece.points()[0].dist(Point::new(80.0, 10.0)) < 1e-9);
    }
}
