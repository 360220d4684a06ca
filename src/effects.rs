//! Path effects built on top of contour measurement
use crate::{ContourMeasure, ContourMeasureIter, Path, Scalar};

/// Maximum number of dashes produced by a single `Path::dash` call
const DASH_MAX_COUNT: Scalar = 1_000_000.0;

impl Path {
    /// Keep only part of the path between `start` and `stop` fractions of its total length
    ///
    /// Fractions are clamped to `[0, 1]`, total length is the sum of lengths of all contours.
    /// With `complement` set, the parts outside of the range are kept instead. If either
    /// fraction is not finite the path is left unchanged.
    pub fn trim(&mut self, start: Scalar, stop: Scalar, complement: bool) -> &mut Self {
        if !start.is_finite() || !stop.is_finite() {
            tracing::debug!(start, stop, "trim ignored: non-finite range");
            return self;
        }
        if !complement && start <= 0.0 && stop >= 1.0 {
            return self;
        }
        let start = start.clamp(0.0, 1.0);
        let stop = stop.clamp(0.0, 1.0);
        if complement && start >= stop {
            return self;
        }

        let contours: Vec<ContourMeasure> = ContourMeasureIter::new(self, false, 1.0).collect();
        let total: Scalar = contours.iter().map(ContourMeasure::length).sum();
        let (arc_start, arc_stop) = (total * start, total * stop);
        let mut dst = Path::new();
        if !complement {
            if start < stop {
                segments_between(&contours, arc_start, arc_stop, &mut dst);
            }
        } else {
            if arc_start > 0.0 {
                segments_between(&contours, 0.0, arc_start, &mut dst);
            }
            if arc_stop < total {
                segments_between(&contours, arc_stop, total, &mut dst);
            }
        }
        self.replace_geometry(dst)
    }

    /// Replace path with dashed version of itself
    ///
    /// Dash pattern consists of `on` drawn and `off` skipped lengths repeated along every
    /// contour, `phase` offsets the pattern start. Dashes of closed contours wrap around
    /// their start. Path is left unchanged for negative or non-finite intervals, for an
    /// empty pattern and when more than a million dashes would be produced.
    pub fn dash(&mut self, on: Scalar, off: Scalar, phase: Scalar) -> &mut Self {
        let intervals = [on, off];
        let period = on + off;
        if intervals.iter().any(|i| !i.is_finite() || *i < 0.0)
            || !(period > 0.0)
            || !period.is_finite()
            || !phase.is_finite()
        {
            tracing::debug!(on, off, phase, "dash ignored: invalid intervals");
            return self;
        }
        let contours: Vec<ContourMeasure> = ContourMeasureIter::new(self, false, 1.0).collect();
        let count: Scalar = contours
            .iter()
            .map(|contour| contour.length() / period)
            .sum();
        if !(count <= DASH_MAX_COUNT) {
            tracing::debug!(on, off, count, "dash ignored: too many dashes");
            return self;
        }
        let (initial_index, initial_length) = dash_first_interval(&intervals, phase % period);

        let mut dst = Path::new();
        for contour in contours {
            let length = contour.length();
            let mut distance = 0.0;
            let mut index = initial_index;
            let mut dash_length = initial_length;
            // first dash of a closed contour is joined with its last dash
            let mut skip_first = contour.is_closed();
            let mut added = false;
            while distance < length {
                added = false;
                if index % 2 == 0 && !skip_first {
                    added = true;
                    contour.segment_to(distance, distance + dash_length, true, &mut dst);
                }
                distance += dash_length;
                skip_first = false;
                index = (index + 1) % intervals.len();
                dash_length = intervals[index];
            }
            if contour.is_closed() && initial_index % 2 == 0 && initial_length >= 0.0 {
                contour.segment_to(0.0, initial_length, !added, &mut dst);
            }
        }
        self.replace_geometry(dst)
    }

    /// Replace streams with the ones of `other`, fill rule is preserved
    fn replace_geometry(&mut self, other: Path) -> &mut Self {
        let fill_rule = self.fill_rule;
        *self = other;
        self.fill_rule = fill_rule;
        self
    }
}

/// Append pieces of contours between distances along the whole path
fn segments_between(contours: &[ContourMeasure], start: Scalar, stop: Scalar, dst: &mut Path) {
    let mut offset = 0.0;
    for contour in contours {
        let next_offset = offset + contour.length();
        if start < next_offset {
            contour.segment_to(start - offset, stop - offset, true, dst);
            if stop <= next_offset {
                break;
            }
        }
        offset = next_offset;
    }
}

/// Find interval index and remaining length of the interval at the pattern phase
fn dash_first_interval(intervals: &[Scalar], phase: Scalar) -> (usize, Scalar) {
    let mut phase = if phase < 0.0 {
        let period: Scalar = intervals.iter().sum();
        let phase = period + phase;
        if phase == period { 0.0 } else { phase }
    } else {
        phase
    };
    for (index, interval) in intervals.iter().copied().enumerate() {
        if phase > interval || (phase == interval && interval != 0.0) {
            phase -= interval;
        } else {
            return (index, interval - phase);
        }
    }
    // accumulated rounding error, restart the pattern
    (0, intervals[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, FillRule, PathMeasure, Point, Verb, assert_approx_eq};

    fn total_length(path: &Path) -> Scalar {
        ContourMeasureIter::new(path, false, 1.0)
            .map(|contour| contour.length())
            .sum()
    }

    fn assert_points(actual: &[Point], expected: &[(Scalar, Scalar)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(a.dist((*e).into()) < 1e-9, "{:?} != {:?}", a, e);
        }
    }

    #[test]
    fn test_dash() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((100.0, 0.0));
        path.dash(3.0, 1.0, 0.0);
        assert_eq!(ContourMeasureIter::new(&path, false, 1.0).count(), 25);
        assert_eq!(path.count_verbs(), 50);
        assert_approx_eq!(total_length(&path), 75.0, 1e-9);
        assert_points(
            &path.points()[..4],
            &[(0.0, 0.0), (3.0, 0.0), (4.0, 0.0), (7.0, 0.0)],
        );

        // phase shifts the pattern
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((10.0, 0.0));
        path.dash(3.0, 1.0, 2.0);
        assert_points(
            &path.points()[..4],
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (5.0, 0.0)],
        );

        // negative phase wraps around the period
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((10.0, 0.0));
        path.dash(3.0, 1.0, -1.0);
        assert_points(&path.points()[..2], &[(1.0, 0.0), (4.0, 0.0)]);
    }

    #[test]
    fn test_dash_closed() {
        let mut path = Path::new();
        path.add_rect([0.0, 0.0, 10.0, 10.0], Direction::Cw, 0);
        path.dash(6.0, 4.0, 5.0);
        // last dash continues through the start of the contour
        let contours: Vec<_> = ContourMeasureIter::new(&path, false, 1.0)
            .map(|contour| contour.length())
            .collect();
        assert_eq!(contours.len(), 4);
        for length in contours {
            assert_approx_eq!(length, 6.0, 1e-9);
        }
        assert_points(&path.points()[..1], &[(5.0, 0.0)]);
        assert_points(
            &path.points()[path.count_points() - 3..],
            &[(0.0, 5.0), (0.0, 0.0), (1.0, 0.0)],
        );
    }

    #[test]
    fn test_dash_invalid() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((100.0, 0.0));
        let orig = path.clone();
        path.dash(0.0, 0.0, 0.0);
        assert_eq!(path, orig);
        path.dash(-1.0, 2.0, 0.0);
        assert_eq!(path, orig);
        path.dash(1.0, Scalar::INFINITY, 0.0);
        assert_eq!(path, orig);
        path.dash(1.0, 1.0, Scalar::NAN);
        assert_eq!(path, orig);
    }

    #[test]
    fn test_dash_limit() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((100.0, 0.0));
        let orig = path.clone();
        path.dash(1e-20, 1e-20, 0.0);
        assert_eq!(path, orig);

        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((1e6, 0.0));
        let orig = path.clone();
        path.dash(0.01, 0.01, 0.0);
        assert_eq!(path, orig);

        // tiny "on" interval is fine as long as the period is not
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((100.0, 0.0));
        path.dash(1e-20, 10.0, 0.0);
        assert_eq!(path.count_verbs(), 20);
        assert!(total_length(&path) < 1e-9);
    }

    #[test]
    fn test_non_finite() {
        let mut path = Path::new();
        path.move_to((Scalar::NAN, 0.0))
            .line_to((1.0, Scalar::INFINITY))
            .cubic_to((1.0, 1.0), (Scalar::NAN, 2.0), (3.0, 3.0))
            .move_to((0.0, 0.0))
            .line_to((10.0, 0.0));
        assert_approx_eq!(total_length(&path), 10.0, 1e-9);

        let mut dashed = path.clone();
        dashed.dash(2.0, 3.0, 0.0);
        assert_approx_eq!(total_length(&dashed), 4.0, 1e-9);

        let mut trimmed = path.clone();
        trimmed.trim(0.0, 0.5, false);
        assert_approx_eq!(total_length(&trimmed), 5.0, 1e-9);
    }

    #[test]
    fn test_trim() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((100.0, 0.0));
        path.move_to((0.0, 10.0)).line_to((100.0, 10.0));
        path.set_fill_rule(FillRule::EvenOdd);
        let orig = path.clone();

        let mut full = path.clone();
        full.trim(0.0, 1.0, false);
        assert_eq!(full, orig);
        assert_approx_eq!(total_length(&full), 200.0, 1e-9);

        let mut half = path.clone();
        half.trim(0.25, 0.75, false);
        assert_eq!(half.fill_rule(), FillRule::EvenOdd);
        assert_approx_eq!(total_length(&half), 100.0, 1e-9);
        assert_eq!(
            half.verbs(),
            &[Verb::Move, Verb::Line, Verb::Move, Verb::Line]
        );
        assert_eq!(half.points()[0], Point::new(50.0, 0.0));
        assert_eq!(half.points()[3], Point::new(50.0, 10.0));

        let mut rest = path.clone();
        rest.trim(0.25, 0.75, true);
        assert_approx_eq!(total_length(&rest), 100.0, 1e-9);
        assert_eq!(rest.points()[0], Point::new(0.0, 0.0));
        assert_eq!(rest.points()[1], Point::new(50.0, 0.0));

        // empty range
        let mut empty = path.clone();
        empty.trim(0.6, 0.4, false);
        assert!(empty.is_empty());
        let mut whole = path.clone();
        whole.trim(0.6, 0.4, true);
        assert_eq!(whole, orig);

        // non-finite range is ignored
        let mut same = path.clone();
        same.trim(Scalar::NAN, 0.5, false);
        assert_eq!(same, orig);
    }

    #[test]
    fn test_trim_curve() {
        let mut path = Path::new();
        path.add_oval([0.0, 0.0, 20.0, 20.0], Direction::Cw, 0);
        let length = total_length(&path);
        path.trim(0.0, 0.5, false);
        let measure = PathMeasure::new(&path, false, 1.0);
        assert_approx_eq!(measure.length(), length / 2.0, 1e-5);
        let (end, _) = measure.pos_tan(measure.length()).unwrap();
        assert!(end.dist(Point::new(10.0, 20.0)) < 1e-5);
    }
}
