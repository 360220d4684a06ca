use crate::{BBox, Conic, Cubic, Curve, CurveFlattenIter, Line, Point, Quad, Scalar, Segment};
use std::fmt;

/// flatness of 0.05px gives good accuracy tradeoff
pub const DEFAULT_FLATNESS: Scalar = 0.05;

/// Path verb, numeric values are the tags used by command lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Verb {
    Move = 0,
    Line = 1,
    Quad = 2,
    Conic = 3,
    Cubic = 4,
    Close = 5,
}

impl Verb {
    /// Number of points consumed by the verb
    pub fn points_count(self) -> usize {
        match self {
            Verb::Move | Verb::Line => 1,
            Verb::Quad | Verb::Conic => 2,
            Verb::Cubic => 3,
            Verb::Close => 0,
        }
    }

    /// Whether verb consumes a weight
    pub fn has_weight(self) -> bool {
        self == Verb::Conic
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Verb {
    type Error = PathCmdError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        let verb = match tag {
            0 => Verb::Move,
            1 => Verb::Line,
            2 => Verb::Quad,
            3 => Verb::Conic,
            4 => Verb::Cubic,
            5 => Verb::Close,
            _ => return Err(PathCmdError::UnknownVerb(tag as Scalar)),
        };
        Ok(verb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmdError {
    /// Command is empty
    Empty,
    /// Verb tag does not name any verb
    UnknownVerb(Scalar),
    /// Number of arguments does not match the verb
    ArgumentCount {
        verb: Verb,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for PathCmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCmdError::Empty => write!(f, "empty path command"),
            PathCmdError::UnknownVerb(tag) => write!(f, "unknown path verb: {}", tag),
            PathCmdError::ArgumentCount {
                verb,
                expected,
                found,
            } => write!(
                f,
                "{:?} expects {} arguments, {} provided",
                verb, expected, found
            ),
        }
    }
}

impl std::error::Error for PathCmdError {}

/// Single path command, verb with all its arguments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    Move(Point),
    Line(Point),
    Quad(Point, Point),
    Conic(Point, Point, Scalar),
    Cubic(Point, Point, Point),
    Close,
}

impl PathCmd {
    pub fn verb(&self) -> Verb {
        match self {
            PathCmd::Move(..) => Verb::Move,
            PathCmd::Line(..) => Verb::Line,
            PathCmd::Quad(..) => Verb::Quad,
            PathCmd::Conic(..) => Verb::Conic,
            PathCmd::Cubic(..) => Verb::Cubic,
            PathCmd::Close => Verb::Close,
        }
    }

    /// Flat form `[tag, ...points, weight?]`
    pub fn to_vec(&self) -> Vec<Scalar> {
        let mut out = vec![self.verb().tag() as Scalar];
        match *self {
            PathCmd::Move(p) | PathCmd::Line(p) => out.extend(p.0),
            PathCmd::Quad(p1, p2) => {
                out.extend(p1.0);
                out.extend(p2.0);
            }
            PathCmd::Conic(p1, p2, w) => {
                out.extend(p1.0);
                out.extend(p2.0);
                out.push(w);
            }
            PathCmd::Cubic(p1, p2, p3) => {
                out.extend(p1.0);
                out.extend(p2.0);
                out.extend(p3.0);
            }
            PathCmd::Close => {}
        }
        out
    }
}

impl TryFrom<&[Scalar]> for PathCmd {
    type Error = PathCmdError;

    fn try_from(values: &[Scalar]) -> Result<Self, Self::Error> {
        let (tag, args) = values.split_first().ok_or(PathCmdError::Empty)?;
        if tag.fract() != 0.0 || !(0.0..=255.0).contains(tag) {
            return Err(PathCmdError::UnknownVerb(*tag));
        }
        let verb = Verb::try_from(*tag as u8).map_err(|_| PathCmdError::UnknownVerb(*tag))?;
        let expected = 2 * verb.points_count() + verb.has_weight() as usize;
        if args.len() != expected {
            return Err(PathCmdError::ArgumentCount {
                verb,
                expected,
                found: args.len(),
            });
        }
        let p = |index: usize| Point::new(args[2 * index], args[2 * index + 1]);
        let cmd = match verb {
            Verb::Move => PathCmd::Move(p(0)),
            Verb::Line => PathCmd::Line(p(0)),
            Verb::Quad => PathCmd::Quad(p(0), p(1)),
            Verb::Conic => PathCmd::Conic(p(0), p(1), args[4]),
            Verb::Cubic => PathCmd::Cubic(p(0), p(1), p(2)),
            Verb::Close => PathCmd::Close,
        };
        Ok(cmd)
    }
}

#[cfg(feature = "serde")]
mod cmd_serde {
    use super::{PathCmd, Scalar};
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer, de::Error as _, ser::SerializeSeq,
    };

    /// Integral values are written as integers so JSON reads `[0,205,5]`
    struct Number(Scalar);

    impl Serialize for Number {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let value = self.0;
            if value.fract() == 0.0 && value.abs() < (1u64 << 53) as Scalar {
                serializer.serialize_i64(value as i64)
            } else {
                serializer.serialize_f64(value)
            }
        }
    }

    impl Serialize for PathCmd {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let values = self.to_vec();
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&Number(value))?;
            }
            seq.end()
        }
    }

    impl<'de> Deserialize<'de> for PathCmd {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let values = Vec::<Scalar>::deserialize(deserializer)?;
            PathCmd::try_from(values.as_slice()).map_err(D::Error::custom)
        }
    }
}

/// Fill rule used to determine whether a point is inside of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Any buffer that can be viewed as a slice of points
///
/// Flat scalar buffers are interpreted as `[x0, y0, x1, y1, ...]`, a trailing unpaired
/// scalar is ignored.
pub trait AsPoints {
    fn as_points(&self) -> &[Point];
}

impl AsPoints for [Point] {
    fn as_points(&self) -> &[Point] {
        self
    }
}

impl AsPoints for [[Scalar; 2]] {
    fn as_points(&self) -> &[Point] {
        bytemuck::cast_slice(self)
    }
}

impl AsPoints for [Scalar] {
    fn as_points(&self) -> &[Point] {
        let pairs = self.len() / 2;
        bytemuck::cast_slice(&self[..2 * pairs])
    }
}

impl<T> AsPoints for Vec<T>
where
    [T]: AsPoints,
{
    fn as_points(&self) -> &[Point] {
        self.as_slice().as_points()
    }
}

impl<T, const N: usize> AsPoints for [T; N]
where
    [T]: AsPoints,
{
    fn as_points(&self) -> &[Point] {
        self.as_slice().as_points()
    }
}

impl<T: AsPoints + ?Sized> AsPoints for &T {
    fn as_points(&self) -> &[Point] {
        (**self).as_points()
    }
}

/// Sequence of contours stored as parallel verb, point and weight streams
#[derive(Clone, Default)]
pub struct Path {
    pub(crate) verbs: Vec<Verb>,
    pub(crate) points: Vec<Point>,
    pub(crate) weights: Vec<Scalar>,
    pub(crate) fill_rule: FillRule,
    /// Index of the point which started the last contour
    pub(crate) contour_start: usize,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.verbs == other.verbs && self.points == other.points && self.weights == other.weights
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verbs.is_empty() {
            return write!(f, "Empty");
        }
        f.debug_list().entries(self.commands()).finish()
    }
}

impl Path {
    /// Create empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create path by replaying commands through the builder
    pub fn from_cmds(cmds: &[PathCmd]) -> Self {
        let mut path = Self::new();
        for cmd in cmds {
            match *cmd {
                PathCmd::Move(p) => path.move_to(p),
                PathCmd::Line(p) => path.line_to(p),
                PathCmd::Quad(p1, p2) => path.quad_to(p1, p2),
                PathCmd::Conic(p1, p2, w) => path.conic_to(p1, p2, w),
                PathCmd::Cubic(p1, p2, p3) => path.cubic_to(p1, p2, p3),
                PathCmd::Close => path.close(),
            };
        }
        path
    }

    /// Create path from raw verb, point and weight buffers
    ///
    /// Stops at the first verb which does not have enough points or weights left, the
    /// path contains all commands consumed so far.
    pub fn from_verbs_points_weights(
        verbs: &[u8],
        points: &(impl AsPoints + ?Sized),
        weights: &[Scalar],
    ) -> Self {
        let mut path = Self::new();
        path.add_verbs_points_weights(verbs, points, weights);
        path
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn count_verbs(&self) -> usize {
        self.verbs.len()
    }

    pub fn count_points(&self) -> usize {
        self.points.len()
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn weights(&self) -> &[Scalar] {
        &self.weights
    }

    /// Last point of the path, if any
    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn set_fill_rule(&mut self, fill_rule: FillRule) -> &mut Self {
        self.fill_rule = fill_rule;
        self
    }

    /// Iterate over path as sequence of commands
    pub fn commands(&self) -> PathCmdIter<'_> {
        PathCmdIter {
            path: self,
            verb: 0,
            point: 0,
            weight: 0,
        }
    }

    /// Path as a list of commands
    pub fn to_cmds(&self) -> Vec<PathCmd> {
        self.commands().collect()
    }

    /// Iterate over path as sequence of segments
    pub fn iter(&self) -> PathIter<'_> {
        PathIter {
            cmds: self.commands(),
            start: Point::default(),
            last: Point::default(),
        }
    }

    /// Number of drawing segments (close lines are not counted)
    pub fn segments_count(&self) -> usize {
        self.iter()
            .filter(|event| matches!(event, PathEvent::Segment(_)))
            .count()
    }

    /// Convert path to an iterator over line segments
    ///
    /// If `close` is true every contour is implicitly closed.
    pub fn flatten(&self, flatness: Scalar, close: bool) -> PathFlattenIter<'_> {
        PathFlattenIter {
            events: self.iter(),
            flatness,
            close,
            curve: None,
            start: Point::default(),
            last: Point::default(),
            open: false,
        }
    }

    /// Bounding box of all points including control points
    pub fn bounds(&self) -> Option<BBox> {
        let (first, rest) = self.points.split_first()?;
        Some(
            rest.iter()
                .fold(BBox::new(*first, *first), |bbox, p| bbox.extend(*p)),
        )
    }

    /// Bounding box of the geometry, curve extremities are found analytically
    pub fn tight_bounds(&self) -> Option<BBox> {
        self.iter().fold(None, |bbox, event| match event {
            PathEvent::Move(p) => Some(match bbox {
                None => BBox::new(p, p),
                Some(bbox) => bbox.extend(p),
            }),
            PathEvent::Segment(segment) => Some(segment.bbox(bbox)),
            PathEvent::Close { .. } => bbox,
        })
    }

    /// Check if point is inside of the path according to its fill rule
    ///
    /// All contours are treated as closed.
    pub fn contains(&self, point: impl Into<Point>) -> bool {
        let point = point.into();
        let y = point.y();
        let mut winding = 0i32;
        for Line([p0, p1]) in self.flatten(DEFAULT_FLATNESS, true) {
            let side = (p1 - p0).cross(point - p0);
            if p0.y() <= y {
                if p1.y() > y && side > 0.0 {
                    winding += 1;
                }
            } else if p1.y() <= y && side < 0.0 {
                winding -= 1;
            }
        }
        match self.fill_rule {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }

    /// Serialize path as JSON list of flat commands `[[tag, ...args], ...]`
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_cmds())
    }

    /// Load path from JSON list of flat commands
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let cmds: Vec<PathCmd> = serde_json::from_str(json)?;
        Ok(Self::from_cmds(&cmds))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.commands())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Path {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cmds = Vec::<PathCmd>::deserialize(deserializer)?;
        Ok(Self::from_cmds(&cmds))
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = PathEvent;
    type IntoIter = PathIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over path commands
pub struct PathCmdIter<'a> {
    path: &'a Path,
    verb: usize,
    point: usize,
    weight: usize,
}

impl Iterator for PathCmdIter<'_> {
    type Item = PathCmd;

    fn next(&mut self) -> Option<Self::Item> {
        let verb = *self.path.verbs.get(self.verb)?;
        let points = self
            .path
            .points
            .get(self.point..self.point + verb.points_count())?;
        let cmd = match (verb, points) {
            (Verb::Move, [p]) => PathCmd::Move(*p),
            (Verb::Line, [p]) => PathCmd::Line(*p),
            (Verb::Quad, [p1, p2]) => PathCmd::Quad(*p1, *p2),
            (Verb::Conic, [p1, p2]) => {
                let weight = *self.path.weights.get(self.weight)?;
                self.weight += 1;
                PathCmd::Conic(*p1, *p2, weight)
            }
            (Verb::Cubic, [p1, p2, p3]) => PathCmd::Cubic(*p1, *p2, *p3),
            (Verb::Close, []) => PathCmd::Close,
            _ => return None,
        };
        self.verb += 1;
        self.point += points.len();
        Some(cmd)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.path.verbs.len() - self.verb))
    }
}

/// Path element produced by `PathIter`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathEvent {
    /// Start of a new contour
    Move(Point),
    /// Drawing segment, includes its start point
    Segment(Segment),
    /// Contour was closed, `from` and `to` are points of the implicit closing line
    Close { from: Point, to: Point },
}

/// Iterator over path segments
pub struct PathIter<'a> {
    cmds: PathCmdIter<'a>,
    start: Point,
    last: Point,
}

impl Iterator for PathIter<'_> {
    type Item = PathEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let last = self.last;
        let event = match self.cmds.next()? {
            PathCmd::Move(p) => {
                self.start = p;
                PathEvent::Move(p)
            }
            PathCmd::Line(p) => PathEvent::Segment(Line([last, p]).into()),
            PathCmd::Quad(p1, p2) => PathEvent::Segment(Quad([last, p1, p2]).into()),
            PathCmd::Conic(p1, p2, w) => PathEvent::Segment(Conic::new(last, p1, p2, w).into()),
            PathCmd::Cubic(p1, p2, p3) => PathEvent::Segment(Cubic([last, p1, p2, p3]).into()),
            PathCmd::Close => PathEvent::Close {
                from: last,
                to: self.start,
            },
        };
        self.last = match event {
            PathEvent::Move(p) => p,
            PathEvent::Segment(segment) => segment.end(),
            PathEvent::Close { to, .. } => to,
        };
        Some(event)
    }
}

/// Iterator over path flattened to line segments
pub struct PathFlattenIter<'a> {
    events: PathIter<'a>,
    flatness: Scalar,
    close: bool,
    curve: Option<CurveFlattenIter>,
    start: Point,
    last: Point,
    /// contour has segments and was not closed yet
    open: bool,
}

impl PathFlattenIter<'_> {
    fn close_line(&mut self) -> Option<Line> {
        let open = std::mem::replace(&mut self.open, false);
        (self.close && open).then(|| Line([self.last, self.start]))
    }
}

impl Iterator for PathFlattenIter<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.curve.as_mut().and_then(Iterator::next) {
                return Some(line);
            }
            self.curve = None;
            match self.events.next() {
                Some(PathEvent::Move(p)) => {
                    let line = self.close_line();
                    self.start = p;
                    self.last = p;
                    if line.is_some() {
                        return line;
                    }
                }
                Some(PathEvent::Segment(segment)) => {
                    self.open = true;
                    self.last = segment.end();
                    self.curve = Some(segment.flatten(self.flatness));
                }
                Some(PathEvent::Close { from, to }) => {
                    self.open = false;
                    self.last = to;
                    return Some(Line([from, to]));
                }
                None => return self.close_line(),
            }
        }
    }
}
