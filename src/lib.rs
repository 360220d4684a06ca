//! 2D vector path geometry library
//!
//! Main features:
//!  - Path construction with lines, quadratic, conic and cubic curves, arcs and shapes
//!  - Transformation, bounds and hit testing
//!  - Arc length measurement, trimming and dashing
//!  - SVG path parsing and generation
//!

mod builder;
mod curve;
mod effects;
mod ellipse;
mod geometry;
mod measure;
mod path;
mod rrect;
mod svg;
mod utils;

pub use builder::Direction;
pub use curve::{
    Conic, Cubic, Curve, CurveExtremities, CurveFlattenIter, DEFAULT_LENGTH_TOLERANCE, Line, Quad,
    Segment,
};
pub use ellipse::{EllipArc, EllipArcConicIter};
pub use geometry::{BBox, EPSILON, EPSILON_SQRT, PI, Point, Scalar, Transform, scalar_fmt};
pub use measure::{ContourMeasure, ContourMeasureIter, PathMeasure};
pub use path::{
    AsPoints, DEFAULT_FLATNESS, FillRule, Path, PathCmd, PathCmdError, PathCmdIter, PathEvent,
    PathFlattenIter, PathIter, Verb,
};
pub use rrect::RRect;
pub use svg::{SvgParserError, SvgPathCmd, SvgPathParser};
use utils::{ArrayIter, M3x3, M4x4, clamp, gauss_legendre, quadratic_solve};
