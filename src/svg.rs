//! SVG path data parser and encoder
//!
//! See [SVG Path Specification](https://www.w3.org/TR/SVG11/paths.html#PathData)
use crate::{Curve, Path, PathEvent, Point, Scalar, Segment};
use std::{
    fmt::{self, Write as _},
    io::{Cursor, Read, Write},
    str::FromStr,
};

/// Maximum deviation of quads approximating a conic in the encoded path
const CONIC_TOLERANCE: Scalar = 0.25;

/// Possible SVG path commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SvgPathCmd {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    ArcTo {
        radii: Point,
        x_axis_rot: Scalar,
        large: bool,
        sweep: bool,
        dst: Point,
    },
    Close(Point),
}

impl SvgPathCmd {
    /// Get destination point of the SVG command
    pub fn dst(&self) -> Point {
        use SvgPathCmd::*;
        *match self {
            MoveTo(dst) => dst,
            LineTo(dst) => dst,
            QuadTo(_, dst) => dst,
            CubicTo(_, _, dst) => dst,
            ArcTo { dst, .. } => dst,
            Close(dst) => dst,
        }
    }

    /// Apply SVG command to the path
    pub fn apply(&self, path: &mut Path) {
        use SvgPathCmd::*;
        match self {
            MoveTo(p) => path.move_to(p),
            LineTo(p) => path.line_to(p),
            QuadTo(p1, p2) => path.quad_to(p1, p2),
            CubicTo(p1, p2, p3) => path.cubic_to(p1, p2, p3),
            Close(_) => path.close(),
            ArcTo {
                radii,
                x_axis_rot,
                large,
                sweep,
                dst,
            } => path.arc_to_rotated(radii, *x_axis_rot, !*large, !*sweep, dst),
        };
    }
}

struct Parser<I> {
    input: I,
    input_buffer: Option<u8>,
    // text of the scalar being parsed
    scalar_buffer: Vec<u8>,
}

impl<I: Read> Parser<I> {
    fn new(input: I) -> Self {
        Self {
            input,
            input_buffer: None,
            scalar_buffer: Vec::new(),
        }
    }

    // consume single byte from the input
    fn parse_byte(&mut self) -> Result<Option<u8>, SvgParserError> {
        match self.input_buffer.take() {
            None => {
                let mut byte = [0; 1];
                if self.input.read(&mut byte)? != 0 {
                    Ok(Some(byte[0]))
                } else {
                    Ok(None)
                }
            }
            byte => Ok(byte),
        }
    }

    // put byte into input buffer, at most one byte is cached
    fn unparse_byte(&mut self, byte: u8) {
        debug_assert!(self.input_buffer.is_none());
        self.input_buffer = Some(byte);
    }

    // consume input while `pred` predicate is true
    fn parse_while(
        &mut self,
        mut pred: impl FnMut(u8) -> bool,
        mut proc: impl FnMut(u8),
    ) -> Result<usize, SvgParserError> {
        let mut count = 0;
        loop {
            let byte = match self.parse_byte()? {
                None => break,
                Some(byte) => byte,
            };
            if !pred(byte) {
                self.unparse_byte(byte);
                break;
            }
            count += 1;
            proc(byte);
        }
        Ok(count)
    }

    // consume at most one byte from the input, if predicate returns true
    fn parse_once(
        &mut self,
        pred: impl FnOnce(u8) -> bool,
        proc: impl FnOnce(u8),
    ) -> Result<bool, SvgParserError> {
        let byte = match self.parse_byte()? {
            None => return Ok(false),
            Some(byte) => byte,
        };
        if pred(byte) {
            proc(byte);
            Ok(true)
        } else {
            self.unparse_byte(byte);
            Ok(false)
        }
    }

    // consume separators from the input
    fn parse_separators(&mut self) -> Result<(), SvgParserError> {
        self.parse_while(
            |byte| matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b','),
            |_| {},
        )?;
        Ok(())
    }

    // make sure input is not exhausted
    fn parse_not_end(&mut self) -> Result<(), SvgParserError> {
        match self.parse_byte()? {
            None => Err(SvgParserError::UnexpectedEnd),
            Some(byte) => {
                self.unparse_byte(byte);
                Ok(())
            }
        }
    }

    // parse single scalar value from the input
    fn parse_scalar(&mut self) -> Result<Scalar, SvgParserError> {
        self.parse_separators()?;
        self.parse_not_end()?;

        let mut buffer = std::mem::take(&mut self.scalar_buffer);
        buffer.clear();
        let is_sign = |byte| matches!(byte, b'-' | b'+');

        self.parse_once(is_sign, |byte| buffer.push(byte))?;
        let whole = self.parse_while(|byte| byte.is_ascii_digit(), |byte| buffer.push(byte))?;
        let frac = if self.parse_once(|byte| byte == b'.', |byte| buffer.push(byte))? {
            self.parse_while(|byte| byte.is_ascii_digit(), |byte| buffer.push(byte))?
        } else {
            0
        };
        if whole + frac == 0 {
            return Err(SvgParserError::InvalidScalar);
        }
        if self.parse_once(|byte| matches!(byte, b'e' | b'E'), |byte| buffer.push(byte))? {
            self.parse_once(is_sign, |byte| buffer.push(byte))?;
            let exp = self.parse_while(|byte| byte.is_ascii_digit(), |byte| buffer.push(byte))?;
            if exp == 0 {
                return Err(SvgParserError::InvalidScalar);
            }
        }

        let value = lexical_core::parse::<Scalar>(&buffer)
            .map_err(|_| SvgParserError::InvalidScalar)?;
        self.scalar_buffer = buffer;
        Ok(value)
    }
}

/// Path parser for SVG encoded path
///
/// Input is consumed byte by byte, wrap unbuffered readers into `BufReader`.
/// See [SVG Path Specification](https://www.w3.org/TR/SVG11/paths.html#PathData)
pub struct SvgPathParser<I> {
    parser: Parser<I>,
    // previous operation
    prev_op: Option<u8>,
    // previous command (used to determine smooth points)
    prev_cmd: Option<SvgPathCmd>,
    // current position from which next relative curve will start
    position: Point,
    // current sub-path starting position
    subpath_start: Point,
}

impl<I: Read> SvgPathParser<I> {
    pub fn new(input: I) -> Self {
        Self {
            parser: Parser::new(input),
            prev_op: None,
            prev_cmd: None,
            position: Point::new(0.0, 0.0),
            subpath_start: Point::new(0.0, 0.0),
        }
    }

    // parse pair of scalars and convert it to a point
    fn parse_point(&mut self) -> Result<Point, SvgParserError> {
        let point = Point::new(self.parser.parse_scalar()?, self.parser.parse_scalar()?);
        match self.prev_op {
            Some(cmd) if cmd.is_ascii_lowercase() => Ok(point + self.position),
            _ => Ok(point),
        }
    }

    // parse flag `0|1` used by elliptic arc command
    fn parse_flag(&mut self) -> Result<bool, SvgParserError> {
        self.parser.parse_separators()?;
        match self.parser.parse_byte()? {
            Some(b'0') => Ok(false),
            Some(b'1') => Ok(true),
            Some(byte) => {
                self.parser.unparse_byte(byte);
                Err(SvgParserError::InvalidFlag)
            }
            None => Err(SvgParserError::UnexpectedEnd),
        }
    }

    // parse svg command, none indicates end of input
    fn parse_op(&mut self) -> Result<Option<u8>, SvgParserError> {
        let op = match self.parser.parse_byte()? {
            None => return Ok(None),
            Some(op) => op,
        };
        match op {
            b'M' | b'm' | b'L' | b'l' | b'V' | b'v' | b'H' | b'h' | b'C' | b'c' | b'S' | b's'
            | b'Q' | b'q' | b'T' | b't' | b'A' | b'a' | b'Z' | b'z' => {
                self.prev_op = if op == b'm' {
                    Some(b'l')
                } else if op == b'M' {
                    Some(b'L')
                } else if op == b'Z' || op == b'z' {
                    None
                } else {
                    Some(op)
                };
                Ok(Some(op))
            }
            b'0'..=b'9' | b'.' | b'-' | b'+' => {
                // implicit repetition of the previous command
                self.parser.unparse_byte(op);
                match self.prev_op {
                    Some(prev_op) => Ok(Some(prev_op)),
                    None => Err(SvgParserError::InvalidCmd(op)),
                }
            }
            _ => Err(SvgParserError::InvalidCmd(op)),
        }
    }

    /// Parse single SVG path command from the input
    pub fn parse_cmd(&mut self) -> Result<Option<SvgPathCmd>, SvgParserError> {
        self.parser.parse_separators()?;
        let op = match self.parse_op()? {
            None => return Ok(None),
            Some(op) => op,
        };
        let cmd = match op {
            b'M' | b'm' => {
                let dst = self.parse_point()?;
                self.subpath_start = dst;
                SvgPathCmd::MoveTo(dst)
            }
            b'L' | b'l' => SvgPathCmd::LineTo(self.parse_point()?),
            b'V' | b'v' => {
                let y = self.parser.parse_scalar()?;
                let p0 = self.position;
                let p1 = if op == b'v' {
                    Point::new(p0.x(), p0.y() + y)
                } else {
                    Point::new(p0.x(), y)
                };
                SvgPathCmd::LineTo(p1)
            }
            b'H' | b'h' => {
                let x = self.parser.parse_scalar()?;
                let p0 = self.position;
                let p1 = if op == b'h' {
                    Point::new(p0.x() + x, p0.y())
                } else {
                    Point::new(x, p0.y())
                };
                SvgPathCmd::LineTo(p1)
            }
            b'Q' | b'q' => SvgPathCmd::QuadTo(self.parse_point()?, self.parse_point()?),
            b'T' | b't' => {
                let p1 = match self.prev_cmd {
                    Some(SvgPathCmd::QuadTo(p1, p2)) => 2.0 * p2 - p1,
                    _ => self.position,
                };
                let p2 = self.parse_point()?;
                SvgPathCmd::QuadTo(p1, p2)
            }
            b'C' | b'c' => SvgPathCmd::CubicTo(
                self.parse_point()?,
                self.parse_point()?,
                self.parse_point()?,
            ),
            b'S' | b's' => {
                let p1 = match self.prev_cmd {
                    Some(SvgPathCmd::CubicTo(_, p2, p3)) => 2.0 * p3 - p2,
                    _ => self.position,
                };
                let p2 = self.parse_point()?;
                let p3 = self.parse_point()?;
                SvgPathCmd::CubicTo(p1, p2, p3)
            }
            b'A' | b'a' => {
                let rx = self.parser.parse_scalar()?;
                let ry = self.parser.parse_scalar()?;
                let x_axis_rot = self.parser.parse_scalar()?;
                let large_flag = self.parse_flag()?;
                let sweep_flag = self.parse_flag()?;
                let dst = self.parse_point()?;
                SvgPathCmd::ArcTo {
                    radii: Point::new(rx, ry),
                    x_axis_rot,
                    large: large_flag,
                    sweep: sweep_flag,
                    dst,
                }
            }
            b'Z' | b'z' => SvgPathCmd::Close(self.subpath_start),
            _ => return Err(SvgParserError::InvalidCmd(op)),
        };
        self.position = cmd.dst();
        self.prev_cmd = Some(cmd);
        Ok(self.prev_cmd)
    }
}

impl<I: Read> Iterator for SvgPathParser<I> {
    type Item = Result<SvgPathCmd, SvgParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_cmd().transpose()
    }
}

impl Path {
    /// Parse path from the SVG path data string
    pub fn from_svg_path(text: &str) -> Result<Self, SvgParserError> {
        Self::read_svg_path(Cursor::new(text))
    }

    /// Read path in the SVG path data format
    ///
    /// Whole input must be valid, no partial path is produced on error.
    pub fn read_svg_path(input: impl Read) -> Result<Self, SvgParserError> {
        let mut path = Path::new();
        for cmd in SvgPathParser::new(input) {
            cmd?.apply(&mut path);
        }
        Ok(path)
    }

    /// Write path in the SVG path data format
    pub fn write_svg_path(&self, mut out: impl Write) -> std::io::Result<()> {
        write!(out, "{}", self)
    }

    /// Convert path to SVG path data string
    pub fn to_svg_path(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Path {
    type Err = SvgParserError;

    fn from_str(text: &str) -> Result<Path, Self::Err> {
        Path::from_svg_path(text)
    }
}

/// Formats path as SVG path data with absolute commands
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in self.iter() {
            match event {
                PathEvent::Move(p) => write_cmd(f, 'M', &[p])?,
                PathEvent::Segment(Segment::Line(line)) => write_cmd(f, 'L', &[line.end()])?,
                PathEvent::Segment(Segment::Quad(quad)) => {
                    let [_, p1, p2] = quad.points();
                    write_cmd(f, 'Q', &[p1, p2])?;
                }
                PathEvent::Segment(Segment::Conic(conic)) => {
                    let pow2 = conic.quad_pow2(CONIC_TOLERANCE);
                    for quad in conic.to_quads(pow2) {
                        let [_, p1, p2] = quad.points();
                        write_cmd(f, 'Q', &[p1, p2])?;
                    }
                }
                PathEvent::Segment(Segment::Cubic(cubic)) => {
                    let [_, p1, p2, p3] = cubic.points();
                    write_cmd(f, 'C', &[p1, p2, p3])?;
                }
                PathEvent::Close { .. } => f.write_char('Z')?,
            }
        }
        Ok(())
    }
}

fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: char, points: &[Point]) -> fmt::Result {
    f.write_char(cmd)?;
    for (index, value) in points.iter().flat_map(|point| point.0).enumerate() {
        if index != 0 {
            f.write_char(' ')?;
        }
        write_scalar(f, value)?;
    }
    Ok(())
}

// integral values are written without fractional part, others in shortest round-trip form
fn write_scalar(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        let mut buffer = [0u8; lexical_core::BUFFER_SIZE];
        let bytes = lexical_core::write(value, &mut buffer);
        f.write_str(std::str::from_utf8(bytes).map_err(|_| fmt::Error)?)
    }
}

/// Error while parsing path in the SVG format
#[derive(Debug)]
pub enum SvgParserError {
    /// Failed to parse SVG command
    InvalidCmd(u8),
    /// Failed to parse scalar value
    InvalidScalar,
    /// Failed to parse flag value
    InvalidFlag,
    /// Input ended in the middle of a command
    UnexpectedEnd,
    /// IO error propagated while reading input stream
    IoError(std::io::Error),
}

impl fmt::Display for SvgParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgParserError::InvalidCmd(cmd) => {
                write!(f, "SvgPathParser::InvalidCmd({:?})", char::from(*cmd))
            }
            _ => write!(f, "SvgPathParser::{:?}", self),
        }
    }
}

impl From<std::io::Error> for SvgParserError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<SvgParserError> for std::io::Error {
    fn from(error: SvgParserError) -> Self {
        match error {
            SvgParserError::IoError(error) => error,
            _ => Self::new(std::io::ErrorKind::InvalidData, error),
        }
    }
}

impl std::error::Error for SvgParserError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, PathCmd, Verb, assert_approx_eq};

    const SQUIRREL: &str = r#"
    M12 1C9.79 1 8 2.31 8 3.92c0 1.94.5 3.03 0 6.08 0-4.5-2.77-6.34-4-6.34.05-.5-.48
    -.66-.48-.66s-.22.11-.3.34c-.27-.31-.56-.27-.56-.27l-.13.58S.7 4.29 .68 6.87c.2.33
    1.53.6 2.47.43.89.05.67.79.47.99C2.78 9.13 2 8 1 8S0 9 1 9s1 1 3 1c-3.09 1.2 0 4 0 4
    H3c-1 0-1 1-1 1h6c3 0 5-1 5-3.47 0-.85-.43-1.79 -1-2.53-1.11-1.46.23-2.68 1-2
    .77.68 3 1 3-2 0-2.21-1.79-4-4-4zM2.5 6 c-.28 0-.5-.22-.5-.5s.22-.5.5-.5.5.22.5.5
    -.22.5-.5.5z
    "#;

    #[test]
    fn test_parse_scalar() -> Result<(), SvgParserError> {
        let mut parser = Parser::new(Cursor::new("1 .22e0.32 3.21e-3-1.24 1e4 +7"));
        assert_eq!(parser.parse_scalar()?, 1.0);
        assert_eq!(parser.parse_scalar()?, 0.22);
        assert_eq!(parser.parse_scalar()?, 0.32);
        assert_eq!(parser.parse_scalar()?, 3.21e-3);
        assert_eq!(parser.parse_scalar()?, -1.24);
        assert_eq!(parser.parse_scalar()?, 1e4);
        assert_eq!(parser.parse_scalar()?, 7.0);
        assert!(matches!(
            parser.parse_scalar(),
            Err(SvgParserError::UnexpectedEnd)
        ));
        Ok(())
    }

    #[test]
    fn test_parse() -> Result<(), SvgParserError> {
        let path: Path = " M0,0L1-1L1,0ZL0,1 L1,1Z ".parse()?;
        let mut reference = Path::new();
        reference
            .move_to((0.0, 0.0))
            .line_to((1.0, -1.0))
            .line_to((1.0, 0.0))
            .close()
            .line_to((0.0, 1.0))
            .line_to((1.0, 1.0))
            .close();
        assert_eq!(path, reference);

        let path: Path = "m1 2 3 4h5v-6H0V0zl1 1".parse()?;
        assert_eq!(
            path.to_cmds(),
            vec![
                PathCmd::Move(Point::new(1.0, 2.0)),
                PathCmd::Line(Point::new(4.0, 6.0)),
                PathCmd::Line(Point::new(9.0, 6.0)),
                PathCmd::Line(Point::new(9.0, 0.0)),
                PathCmd::Line(Point::new(0.0, 0.0)),
                PathCmd::Line(Point::new(0.0, 0.0)),
                PathCmd::Close,
                PathCmd::Move(Point::new(1.0, 2.0)),
                PathCmd::Line(Point::new(2.0, 3.0)),
            ]
        );

        // smooth curves reflect previous control point
        let path: Path = "M0 0Q1 1 2 0T4 0C5 1 6 1 7 0S9 -1 10 0".parse()?;
        assert_eq!(
            path.to_cmds()[2],
            PathCmd::Quad(Point::new(3.0, -1.0), Point::new(4.0, 0.0))
        );
        assert_eq!(
            path.to_cmds()[4],
            PathCmd::Cubic(
                Point::new(8.0, -1.0),
                Point::new(9.0, -1.0),
                Point::new(10.0, 0.0)
            )
        );

        let path: Path = SQUIRREL.parse()?;
        assert_eq!(path.verbs().iter().filter(|v| **v == Verb::Move).count(), 2);
        assert_eq!(path.verbs().iter().filter(|v| **v == Verb::Close).count(), 2);
        Ok(())
    }

    #[test]
    fn test_parse_arc() -> Result<(), SvgParserError> {
        let path: Path = "M0 0A5 5 0 0 1 10 0".parse()?;
        assert!(path.verbs()[1..].iter().all(|verb| *verb == Verb::Conic));
        assert!(path.last_point().unwrap().dist(Point::new(10.0, 0.0)) < 1e-9);
        let [l, t, r, b] = path.tight_bounds().unwrap().ltrb();
        assert_approx_eq!(l, 0.0, 1e-9);
        assert_approx_eq!(t, -5.0, 1e-9);
        assert_approx_eq!(r, 10.0, 1e-9);
        assert_approx_eq!(b, 0.0, 1e-9);

        // flags do not require separators, zero radius degenerates to line
        let path: Path = "M0 0a5 5 0 1010 0L0 0A0 5 0 0 0 3 3".parse()?;
        let [_, t, _, b] = path.tight_bounds().unwrap().ltrb();
        assert_approx_eq!(t, 0.0, 1e-9);
        assert_approx_eq!(b, 5.0, 1e-9);
        assert_eq!(path.verbs().last(), Some(&Verb::Line));
        Ok(())
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            "M0 0X1".parse::<Path>(),
            Err(SvgParserError::InvalidCmd(b'X'))
        ));
        assert!(matches!(
            "1 2".parse::<Path>(),
            Err(SvgParserError::InvalidCmd(b'1'))
        ));
        assert!(matches!(
            "M0 0Z 1 1".parse::<Path>(),
            Err(SvgParserError::InvalidCmd(b'1'))
        ));
        assert!(matches!(
            "M0 0L1".parse::<Path>(),
            Err(SvgParserError::UnexpectedEnd)
        ));
        assert!(matches!(
            "M0 0L1 .".parse::<Path>(),
            Err(SvgParserError::InvalidScalar)
        ));
        assert!(matches!(
            "M0 0L1e 2".parse::<Path>(),
            Err(SvgParserError::InvalidScalar)
        ));
        assert!(matches!(
            "M0 0A1 1 0 2 0 1 1".parse::<Path>(),
            Err(SvgParserError::InvalidFlag)
        ));

        let error = "M0 0X1".parse::<Path>().unwrap_err();
        assert_eq!(error.to_string(), "SvgPathParser::InvalidCmd('X')");
        let error = std::io::Error::from(error);
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_encode() -> Result<(), SvgParserError> {
        let mut path = Path::new();
        path.move_to((205.0, 5.0))
            .line_to((795.0, 5.0))
            .line_to((595.0, 295.0))
            .line_to((5.0, 295.0))
            .line_to((205.0, 5.0))
            .close();
        assert_eq!(path.to_svg_path(), "M205 5L795 5L595 295L5 295L205 5Z");
        assert_eq!(path.to_string(), path.to_svg_path());

        let mut path = Path::new();
        path.move_to((0.5, -0.25))
            .quad_to((1.5, 3.0), (-2.0, 0.0))
            .cubic_to((1.0, 2.0), (3.0, 4.0), (5.0, 6.0));
        assert_eq!(path.to_svg_path(), "M0.5 -0.25Q1.5 3 -2 0C1 2 3 4 5 6");

        let mut out = Vec::new();
        path.write_svg_path(&mut out).map_err(SvgParserError::from)?;
        assert_eq!(Path::read_svg_path(Cursor::new(out))?, path);

        assert_eq!(Path::new().to_svg_path(), "");
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<(), SvgParserError> {
        let path: Path = SQUIRREL.parse()?;
        let path_load: Path = path.to_svg_path().parse()?;
        assert_eq!(path, path_load);
        Ok(())
    }

    #[test]
    fn test_encode_conic() -> Result<(), SvgParserError> {
        let mut path = Path::new();
        path.add_oval([0.0, 0.0, 100.0, 100.0], Direction::Cw, 0);
        let text = path.to_svg_path();
        assert!(!text.contains(['L', 'C', 'A']));
        let quads: Path = text.parse()?;
        assert!(quads.verbs().iter().any(|verb| *verb == Verb::Quad));
        assert!(!quads.verbs().iter().any(|verb| *verb == Verb::Conic));
        // quads stay within a quarter unit of the circle
        for line in quads.flatten(0.01, true) {
            let dist = line.start().dist(Point::new(50.0, 50.0));
            assert!((dist - 50.0).abs() < 0.25, "distance {}", dist);
        }
        Ok(())
    }
}
