//! Path data representation
//!
//! A [`PathData`] is the parsed, normalized form of an SVG path string: one
//! [`Segment`] per command, with implicit command repetitions expanded and
//! the relative/absolute flag preserved. Formatting a `PathData` yields the
//! canonical string form used by every utility in this crate.

use crate::error::{PathError, Result};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Path command kind, independent of relative/absolute addressing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    MoveTo,
    LineTo,
    HorizontalTo,
    VerticalTo,
    CubicTo,
    SmoothCubicTo,
    QuadTo,
    SmoothQuadTo,
    ArcTo,
    Close,
}

impl CommandKind {
    /// Parse a command letter into its kind and relative flag
    pub fn from_letter(letter: char) -> Option<(CommandKind, bool)> {
        let kind = match letter.to_ascii_uppercase() {
            'M' => CommandKind::MoveTo,
            'L' => CommandKind::LineTo,
            'H' => CommandKind::HorizontalTo,
            'V' => CommandKind::VerticalTo,
            'C' => CommandKind::CubicTo,
            'S' => CommandKind::SmoothCubicTo,
            'Q' => CommandKind::QuadTo,
            'T' => CommandKind::SmoothQuadTo,
            'A' => CommandKind::ArcTo,
            'Z' => CommandKind::Close,
            _ => return None,
        };
        Some((kind, letter.is_ascii_lowercase()))
    }

    pub fn letter(self, relative: bool) -> char {
        let upper = match self {
            CommandKind::MoveTo => 'M',
            CommandKind::LineTo => 'L',
            CommandKind::HorizontalTo => 'H',
            CommandKind::VerticalTo => 'V',
            CommandKind::CubicTo => 'C',
            CommandKind::SmoothCubicTo => 'S',
            CommandKind::QuadTo => 'Q',
            CommandKind::SmoothQuadTo => 'T',
            CommandKind::ArcTo => 'A',
            CommandKind::Close => 'Z',
        };
        if relative {
            upper.to_ascii_lowercase()
        } else {
            upper
        }
    }

    /// Number of numeric parameters the command takes
    pub fn arity(self) -> usize {
        match self {
            CommandKind::Close => 0,
            CommandKind::HorizontalTo | CommandKind::VerticalTo => 1,
            CommandKind::MoveTo | CommandKind::LineTo | CommandKind::SmoothQuadTo => 2,
            CommandKind::SmoothCubicTo | CommandKind::QuadTo => 4,
            CommandKind::CubicTo => 6,
            CommandKind::ArcTo => 7,
        }
    }

    /// Whether parameter `index` is a boolean flag (arc large-arc/sweep)
    pub fn is_flag(self, index: usize) -> bool {
        self == CommandKind::ArcTo && (index == 3 || index == 4)
    }
}

/// A single path command with its parameters
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub kind: CommandKind,
    pub relative: bool,
    pub args: SmallVec<[f32; 7]>,
}

impl Segment {
    /// Segments built with fewer parameters than `kind` takes are skipped
    /// when the path is measured or resolved
    pub fn new(kind: CommandKind, relative: bool, args: &[f32]) -> Self {
        Self {
            kind,
            relative,
            args: SmallVec::from_slice(args),
        }
    }

    pub fn letter(&self) -> char {
        self.kind.letter(self.relative)
    }

    /// Whether two segments can be interpolated parameter by parameter
    pub fn same_structure(&self, other: &Segment) -> bool {
        self.kind == other.kind && self.relative == other.relative
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write_number(f, *arg)?;
        }
        Ok(())
    }
}

/// Write a number without trailing zeros or a negative zero
fn write_number(f: &mut impl fmt::Write, value: f32) -> fmt::Result {
    let rounded = (value * 1000.0).round() / 1000.0;
    // Adding zero folds -0.0 into 0.0
    write!(f, "{}", rounded + 0.0)
}

/// Parsed path data
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathData {
    segments: Vec<Segment>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse SVG path data
    pub fn parse(data: &str) -> Result<Self> {
        crate::parser::parse(data)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check that `other` has the same command structure as `self`
    pub fn check_compatible(&self, other: &PathData) -> Result<()> {
        if self.segments.len() != other.segments.len() {
            return Err(PathError::SegmentCount {
                from: self.segments.len(),
                to: other.segments.len(),
            });
        }
        for (index, (a, b)) in self.segments.iter().zip(&other.segments).enumerate() {
            if !a.same_structure(b) {
                return Err(PathError::StructureMismatch {
                    index,
                    from: a.letter(),
                    to: b.letter(),
                });
            }
        }
        Ok(())
    }

    /// Interpolate every numeric parameter between two structurally equal paths
    ///
    /// `t <= 0` returns `self` and `t >= 1` returns `other` unchanged. Arc
    /// flags are not interpolable and switch at the midpoint.
    pub fn interpolate(&self, other: &PathData, t: f32) -> Result<PathData> {
        self.check_compatible(other)?;
        if t <= 0.0 {
            return Ok(self.clone());
        }
        if t >= 1.0 {
            return Ok(other.clone());
        }

        let segments = self
            .segments
            .iter()
            .zip(&other.segments)
            .map(|(a, b)| {
                let args = a
                    .args
                    .iter()
                    .zip(&b.args)
                    .enumerate()
                    .map(|(i, (x, y))| {
                        if a.kind.is_flag(i) {
                            if t < 0.5 {
                                *x
                            } else {
                                *y
                            }
                        } else {
                            x + (y - x) * t
                        }
                    })
                    .collect();
                Segment {
                    kind: a.kind,
                    relative: a.relative,
                    args,
                }
            })
            .collect();
        Ok(PathData { segments })
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for PathData {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self> {
        PathData::parse(s)
    }
}

/// Builder for constructing absolute path data
#[derive(Default)]
pub struct PathBuilder {
    segments: Vec<Segment>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, x: f32, y: f32) -> Self {
        self.segments
            .push(Segment::new(CommandKind::MoveTo, false, &[x, y]));
        self
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.segments
            .push(Segment::new(CommandKind::LineTo, false, &[x, y]));
        self
    }

    pub fn quad_to(mut self, cx: f32, cy: f32, x: f32, y: f32) -> Self {
        self.segments
            .push(Segment::new(CommandKind::QuadTo, false, &[cx, cy, x, y]));
        self
    }

    pub fn cubic_to(mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) -> Self {
        self.segments.push(Segment::new(
            CommandKind::CubicTo,
            false,
            &[c1x, c1y, c2x, c2y, x, y],
        ));
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn arc_to(
        mut self,
        rx: f32,
        ry: f32,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) -> Self {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        self.segments.push(Segment::new(
            CommandKind::ArcTo,
            false,
            &[rx, ry, rotation, flag(large_arc), flag(sweep), x, y],
        ));
        self
    }

    pub fn close(mut self) -> Self {
        self.segments.push(Segment::new(CommandKind::Close, false, &[]));
        self
    }

    pub fn build(self) -> PathData {
        PathData {
            segments: self.segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_compact() {
        let path = PathBuilder::new()
            .move_to(0.0, 0.0)
            .line_to(10.5, -0.0)
            .close()
            .build();
        assert_eq!(path.to_string(), "M0 0 L10.5 0 Z");
    }

    #[test]
    fn interpolate_midpoint() {
        let a = PathData::parse("M0 0 L10 10").unwrap();
        let b = PathData::parse("M10 10 L30 50").unwrap();
        let mid = a.interpolate(&b, 0.5).unwrap();
        assert_eq!(mid.to_string(), "M5 5 L20 30");
    }

    #[test]
    fn incompatible_structures_are_rejected() {
        let a = PathData::parse("M0 0 L10 10").unwrap();
        let b = PathData::parse("M0 0 Q5 5 10 10").unwrap();
        assert_eq!(
            a.check_compatible(&b),
            Err(PathError::StructureMismatch {
                index: 1,
                from: 'L',
                to: 'Q'
            })
        );

        let c = PathData::parse("M0 0").unwrap();
        assert!(matches!(
            a.check_compatible(&c),
            Err(PathError::SegmentCount { from: 2, to: 1 })
        ));
    }
}
