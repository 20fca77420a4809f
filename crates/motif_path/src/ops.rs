//! Path utilities over path-data strings and path-like targets

use crate::error::{PathError, Result};
use crate::geometry::{self, Curve, Pen, Subpath};
use crate::path::{CommandKind, PathBuilder, PathData, Segment};
use motif_core::{AnimationTarget, Point};

/// Something path geometry can be read from
#[derive(Clone, Copy)]
pub enum PathInput<'a> {
    /// SVG path data
    Data(&'a str),
    /// A path-like target; native queries are preferred over its path data
    Element(&'a dyn AnimationTarget),
}

impl<'a> From<&'a str> for PathInput<'a> {
    fn from(data: &'a str) -> Self {
        PathInput::Data(data)
    }
}

impl<'a> From<&'a String> for PathInput<'a> {
    fn from(data: &'a String) -> Self {
        PathInput::Data(data.as_str())
    }
}

impl<'a> From<&'a dyn AnimationTarget> for PathInput<'a> {
    fn from(target: &'a dyn AnimationTarget) -> Self {
        PathInput::Element(target)
    }
}

fn element_subpaths(target: &dyn AnimationTarget) -> Result<Vec<Subpath>> {
    let data = target.path_data().ok_or(PathError::NoGeometry)?;
    Ok(geometry::resolve(&PathData::parse(&data)?))
}

/// Total length of a path
///
/// Elements answer through their native length query when they have one.
pub fn path_length<'a>(input: impl Into<PathInput<'a>>) -> Result<f32> {
    match input.into() {
        PathInput::Data(data) => Ok(geometry::total_length(&geometry::resolve(
            &PathData::parse(data)?,
        ))),
        PathInput::Element(target) => match target.total_length() {
            Some(length) => Ok(length),
            None => Ok(geometry::total_length(&element_subpaths(target)?)),
        },
    }
}

/// Point at `distance` along a path
///
/// The distance is clamped to the path's extent. An empty path yields the
/// origin.
pub fn point_at_length<'a>(input: impl Into<PathInput<'a>>, distance: f32) -> Result<Point> {
    let subpaths = match input.into() {
        PathInput::Data(data) => geometry::resolve(&PathData::parse(data)?),
        PathInput::Element(target) => {
            if let Some(point) = target.point_at_length(distance) {
                return Ok(point);
            }
            element_subpaths(target)?
        }
    };
    Ok(geometry::point_at_length(&subpaths, distance).unwrap_or(Point::ZERO))
}

/// Interpolate between two structurally identical paths
///
/// Returns the normalized form of `from` at `progress <= 0` and of `to` at
/// `progress >= 1`. Paths whose command letters differ are rejected rather
/// than aligned.
pub fn interpolate_path(from: &str, to: &str, progress: f32) -> Result<String> {
    let a = PathData::parse(from)?;
    let b = PathData::parse(to)?;
    Ok(a.interpolate(&b, progress)?.to_string())
}

/// Split a path into independent subpaths at each moveto
///
/// A relative moveto that starts a later subpath is rewritten as absolute so
/// every returned piece draws in place on its own.
pub fn split_path(data: &str) -> Result<Vec<String>> {
    let path = PathData::parse(data)?;
    let mut pen = Pen::default();
    let mut pieces: Vec<Vec<Segment>> = Vec::new();

    for segment in path.segments() {
        if segment.kind == CommandKind::MoveTo {
            pen.advance(segment.kind, segment.relative, &segment.args);
            let start = pen.current;
            pieces.push(vec![Segment::new(
                CommandKind::MoveTo,
                false,
                &[start.x, start.y],
            )]);
            continue;
        }
        pen.advance(segment.kind, segment.relative, &segment.args);
        if let Some(piece) = pieces.last_mut() {
            piece.push(segment.clone());
        }
    }

    Ok(pieces
        .into_iter()
        .map(|segments| PathData::from_segments(segments).to_string())
        .collect())
}

/// Reverse the direction a path is traced in
///
/// Subpath order is reversed and every curve is traced from its end back to
/// its start. The output is absolute; `reverse_path(reverse_path(p))` draws
/// the same shape as `p`.
pub fn reverse_path(data: &str) -> Result<String> {
    let subpaths = geometry::resolve(&PathData::parse(data)?);
    let reversed = subpaths
        .iter()
        .rev()
        .fold(PathBuilder::new(), reverse_subpath)
        .build();
    Ok(reversed.to_string())
}

fn reverse_subpath(builder: PathBuilder, subpath: &Subpath) -> PathBuilder {
    let mut builder = if subpath.closed {
        // Start where the subpath started and walk the closing line backwards
        let builder = builder.move_to(subpath.start.x, subpath.start.y);
        match subpath.closing_line() {
            Some(Curve::Line { from, .. }) => builder.line_to(from.x, from.y),
            _ => builder,
        }
    } else {
        let end = subpath.end();
        builder.move_to(end.x, end.y)
    };

    for curve in subpath.curves.iter().rev() {
        builder = push_curve(builder, &curve.reversed());
    }

    if subpath.closed {
        builder.close()
    } else {
        builder
    }
}

fn push_curve(builder: PathBuilder, curve: &Curve) -> PathBuilder {
    match *curve {
        Curve::Line { to, .. } => builder.line_to(to.x, to.y),
        Curve::Quad { ctrl, to, .. } => builder.quad_to(ctrl.x, ctrl.y, to.x, to.y),
        Curve::Cubic {
            ctrl1, ctrl2, to, ..
        } => builder.cubic_to(ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y),
        Curve::Arc {
            to,
            radii,
            rotation,
            large_arc,
            sweep,
            ..
        } => builder.arc_to(radii.x, radii.y, rotation, large_arc, sweep, to.x, to.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_core::RecordingTarget;

    const SHAPES: &[&str] = &[
        "M0 0 L100 0",
        "M10 10 h50 v50 h-50 z",
        "M0 0 C20 40 60 40 80 0 S140 -40 160 0",
        "M0 0 Q25 50 50 0 T100 0",
        "M0 0 A50 50 0 0 1 100 0 L100 50",
        "M0 0 L10 0 M20 20 l10 10 z",
    ];

    fn endpoints(data: &str) -> (Point, Point) {
        let total = path_length(data).unwrap();
        (
            point_at_length(data, 0.0).unwrap(),
            point_at_length(data, total).unwrap(),
        )
    }

    #[test]
    fn length_of_lines_and_closed_shapes() {
        assert!((path_length("M0 0 L3 4").unwrap() - 5.0).abs() < 1e-5);
        assert!((path_length("M0 0 H10 V10 H0 Z").unwrap() - 40.0).abs() < 1e-4);
        assert_eq!(path_length("").unwrap(), 0.0);
    }

    #[test]
    fn element_length_prefers_native_query() {
        let native = RecordingTarget::with_length(42.0);
        assert_eq!(path_length(&native as &dyn AnimationTarget).unwrap(), 42.0);

        let with_data = RecordingTarget::with_path_data("M0 0 L0 25");
        assert_eq!(
            path_length(&with_data as &dyn AnimationTarget).unwrap(),
            25.0
        );

        let bare = RecordingTarget::new();
        assert_eq!(
            path_length(&bare as &dyn AnimationTarget),
            Err(PathError::NoGeometry)
        );
    }

    #[test]
    fn point_walks_across_segments() {
        let p = point_at_length("M0 0 L10 0 L10 10", 15.0).unwrap();
        assert!(p.approx_eq(Point::new(10.0, 5.0), 1e-5));
    }

    #[test]
    fn interpolate_endpoints_are_verbatim() {
        let a = "M0 0 C10 20 30 20 40 0";
        let b = "M5 5 C15 -20 35 -20 45 5";
        assert_eq!(interpolate_path(a, b, 0.0).unwrap(), a);
        assert_eq!(interpolate_path(a, b, 1.0).unwrap(), b);
        assert_eq!(
            interpolate_path(a, b, 0.5).unwrap(),
            "M2.5 2.5 C12.5 0 32.5 0 42.5 2.5"
        );
    }

    #[test]
    fn interpolate_rejects_mismatched_structure() {
        let err = interpolate_path("M0 0 L10 10", "M0 0 l10 10", 0.5).unwrap_err();
        assert_eq!(
            err,
            PathError::StructureMismatch {
                index: 1,
                from: 'L',
                to: 'l'
            }
        );
    }

    #[test]
    fn split_on_movetos() {
        let pieces = split_path("M0 0 L10 0 m5 5 l5 5 M100 100 Z").unwrap();
        assert_eq!(pieces, vec!["M0 0 L10 0", "M15 5 l5 5", "M100 100 Z"]);
        assert_eq!(split_path("M1 1").unwrap().len(), 1);
        assert!(split_path("").unwrap().is_empty());
    }

    #[test]
    fn reverse_open_path() {
        assert_eq!(reverse_path("M0 0 L10 0 L10 10").unwrap(), "M10 10 L10 0 L0 0");
        assert_eq!(
            reverse_path("M0 0 C0 10 10 10 10 0").unwrap(),
            "M10 0 C10 10 0 10 0 0"
        );
    }

    #[test]
    fn reverse_swaps_endpoints() {
        for shape in SHAPES {
            let (start, end) = endpoints(shape);
            let reversed = reverse_path(shape).unwrap();
            let (r_start, r_end) = endpoints(&reversed);
            let length = path_length(*shape).unwrap();
            let r_length = path_length(&reversed).unwrap();

            assert!((length - r_length).abs() < 0.05, "{shape}: {length} vs {r_length}");
            let single_open = shape.matches('M').count() == 1 && !shape.contains('z');
            if single_open {
                assert!(r_start.approx_eq(end, 1e-3), "{shape}");
                assert!(r_end.approx_eq(start, 1e-3), "{shape}");
            }
        }
    }

    #[test]
    fn double_reverse_is_identity_up_to_normalization() {
        for shape in SHAPES {
            let twice = reverse_path(&reverse_path(shape).unwrap()).unwrap();
            let (start, end) = endpoints(shape);
            let (t_start, t_end) = endpoints(&twice);

            assert!(start.approx_eq(t_start, 1e-3), "{shape} -> {twice}");
            assert!(end.approx_eq(t_end, 1e-3), "{shape} -> {twice}");
            assert!(
                (path_length(*shape).unwrap() - path_length(&twice).unwrap()).abs() < 0.05,
                "{shape} -> {twice}"
            );
        }
    }
}
