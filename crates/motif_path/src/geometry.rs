//! Absolute path geometry
//!
//! Resolves parsed segments into absolute curves grouped by subpath, and
//! measures them. Curves are measured by flattening into a fixed number of
//! chords; length and point-at-length use the same flattening so the two
//! always agree.

use crate::path::{CommandKind, PathData};
use motif_core::Point;
use std::f32::consts::PI;

/// Chords per curved segment when flattening
const CURVE_SAMPLES: usize = 64;

/// An absolute drawing primitive
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    Line {
        from: Point,
        to: Point,
    },
    Quad {
        from: Point,
        ctrl: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        ctrl1: Point,
        ctrl2: Point,
        to: Point,
    },
    Arc {
        from: Point,
        to: Point,
        radii: Point,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
    },
}

impl Curve {
    pub fn start(&self) -> Point {
        match *self {
            Curve::Line { from, .. }
            | Curve::Quad { from, .. }
            | Curve::Cubic { from, .. }
            | Curve::Arc { from, .. } => from,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Curve::Line { to, .. }
            | Curve::Quad { to, .. }
            | Curve::Cubic { to, .. }
            | Curve::Arc { to, .. } => to,
        }
    }

    /// The same curve traced from end to start
    pub fn reversed(&self) -> Curve {
        match *self {
            Curve::Line { from, to } => Curve::Line { from: to, to: from },
            Curve::Quad { from, ctrl, to } => Curve::Quad {
                from: to,
                ctrl,
                to: from,
            },
            Curve::Cubic {
                from,
                ctrl1,
                ctrl2,
                to,
            } => Curve::Cubic {
                from: to,
                ctrl1: ctrl2,
                ctrl2: ctrl1,
                to: from,
            },
            Curve::Arc {
                from,
                to,
                radii,
                rotation,
                large_arc,
                sweep,
            } => Curve::Arc {
                from: to,
                to: from,
                radii,
                rotation,
                large_arc,
                sweep: !sweep,
            },
        }
    }

    /// Evaluate the curve at parameter `t` (0.0 to 1.0)
    pub fn sample(&self, t: f32) -> Point {
        match *self {
            Curve::Line { from, to } => from.lerp(to, t),
            Curve::Quad { from, ctrl, to } => {
                let mt = 1.0 - t;
                Point::new(
                    mt * mt * from.x + 2.0 * mt * t * ctrl.x + t * t * to.x,
                    mt * mt * from.y + 2.0 * mt * t * ctrl.y + t * t * to.y,
                )
            }
            Curve::Cubic {
                from,
                ctrl1,
                ctrl2,
                to,
            } => {
                let mt = 1.0 - t;
                let a = mt * mt * mt;
                let b = 3.0 * mt * mt * t;
                let c = 3.0 * mt * t * t;
                let d = t * t * t;
                Point::new(
                    a * from.x + b * ctrl1.x + c * ctrl2.x + d * to.x,
                    a * from.y + b * ctrl1.y + c * ctrl2.y + d * to.y,
                )
            }
            Curve::Arc { .. } => match ArcParams::from_curve(self) {
                Some(arc) => arc.point(arc.start_angle + arc.sweep_angle * t),
                None => self.start().lerp(self.end(), t),
            },
        }
    }

    fn samples(&self) -> usize {
        match self {
            Curve::Line { .. } => 1,
            _ => CURVE_SAMPLES,
        }
    }

    /// Approximate arc length
    pub fn length(&self) -> f32 {
        let n = self.samples();
        let mut prev = self.start();
        let mut total = 0.0;
        for i in 1..=n {
            let p = self.sample(i as f32 / n as f32);
            total += prev.distance(p);
            prev = p;
        }
        total
    }

    /// Point at `distance` along this curve, measured with the same chords as [`Curve::length`]
    pub fn point_at_length(&self, distance: f32) -> Point {
        let n = self.samples();
        let mut prev = self.start();
        let mut walked = 0.0;
        for i in 1..=n {
            let p = self.sample(i as f32 / n as f32);
            let chord = prev.distance(p);
            if walked + chord >= distance && chord > 0.0 {
                return prev.lerp(p, (distance - walked) / chord);
            }
            walked += chord;
            prev = p;
        }
        self.end()
    }
}

/// Center parameterization of an elliptical arc
struct ArcParams {
    center: Point,
    rx: f32,
    ry: f32,
    cos_phi: f32,
    sin_phi: f32,
    start_angle: f32,
    sweep_angle: f32,
}

impl ArcParams {
    /// Endpoint to center conversion (SVG implementation notes, F.6.5)
    fn from_curve(curve: &Curve) -> Option<ArcParams> {
        let Curve::Arc {
            from,
            to,
            radii,
            rotation,
            large_arc,
            sweep,
        } = *curve
        else {
            return None;
        };

        let mut rx = radii.x.abs();
        let mut ry = radii.y.abs();
        if rx == 0.0 || ry == 0.0 || from.approx_eq(to, 1e-6) {
            return None;
        }

        let phi = rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let dx2 = (from.x - to.x) / 2.0;
        let dy2 = (from.y - to.y) / 2.0;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let scale = lambda.sqrt();
            rx *= scale;
            ry *= scale;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
        let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let mut coef = if den > 0.0 {
            (num / den).max(0.0).sqrt()
        } else {
            0.0
        };
        if large_arc == sweep {
            coef = -coef;
        }
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;

        let center = Point::new(
            cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0,
            sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0,
        );

        let u = Point::new((x1p - cxp) / rx, (y1p - cyp) / ry);
        let v = Point::new((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let start_angle = angle_between(Point::new(1.0, 0.0), u);
        let mut sweep_angle = angle_between(u, v);
        if !sweep && sweep_angle > 0.0 {
            sweep_angle -= 2.0 * PI;
        } else if sweep && sweep_angle < 0.0 {
            sweep_angle += 2.0 * PI;
        }

        Some(ArcParams {
            center,
            rx,
            ry,
            cos_phi,
            sin_phi,
            start_angle,
            sweep_angle,
        })
    }

    fn point(&self, theta: f32) -> Point {
        let (sin_t, cos_t) = theta.sin_cos();
        Point::new(
            self.center.x + self.rx * self.cos_phi * cos_t - self.ry * self.sin_phi * sin_t,
            self.center.y + self.rx * self.sin_phi * cos_t + self.ry * self.cos_phi * sin_t,
        )
    }
}

fn angle_between(u: Point, v: Point) -> f32 {
    (u.x * v.y - u.y * v.x).atan2(u.x * v.x + u.y * v.y)
}

/// A run of curves starting at a moveto
#[derive(Clone, Debug, PartialEq)]
pub struct Subpath {
    pub start: Point,
    pub curves: Vec<Curve>,
    /// Whether the subpath ends with a closepath
    pub closed: bool,
}

impl Subpath {
    fn new(start: Point) -> Self {
        Self {
            start,
            curves: Vec::new(),
            closed: false,
        }
    }

    /// The last drawn point before any closing line
    pub fn end(&self) -> Point {
        self.curves.last().map(Curve::end).unwrap_or(self.start)
    }

    /// The implicit line drawn by a closepath, if it has any extent
    pub fn closing_line(&self) -> Option<Curve> {
        let end = self.end();
        (self.closed && !end.approx_eq(self.start, 1e-6)).then_some(Curve::Line {
            from: end,
            to: self.start,
        })
    }

    /// All curves including the closing line
    pub fn all_curves(&self) -> impl Iterator<Item = Curve> + '_ {
        self.curves.iter().copied().chain(self.closing_line())
    }

    pub fn length(&self) -> f32 {
        self.all_curves().map(|c| c.length()).sum()
    }
}

/// Tracks the pen position while walking relative path data
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Pen {
    pub current: Point,
    pub subpath_start: Point,
    last_cubic_ctrl: Option<Point>,
    last_quad_ctrl: Option<Point>,
}

impl Pen {
    fn absolute(&self, relative: bool, x: f32, y: f32) -> Point {
        if relative {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x, y)
        }
    }

    /// Advance the pen over one segment, returning the curve it draws
    ///
    /// A segment with fewer parameters than its command takes draws nothing
    /// and leaves the pen where it is.
    pub fn advance(&mut self, kind: CommandKind, relative: bool, a: &[f32]) -> Option<Curve> {
        if a.len() < kind.arity() {
            return None;
        }
        let from = self.current;
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        let curve = match kind {
            CommandKind::MoveTo => {
                let to = self.absolute(relative, a[0], a[1]);
                self.current = to;
                self.subpath_start = to;
                None
            }
            CommandKind::LineTo => Some(Curve::Line {
                from,
                to: self.absolute(relative, a[0], a[1]),
            }),
            CommandKind::HorizontalTo => {
                let x = if relative { from.x + a[0] } else { a[0] };
                Some(Curve::Line {
                    from,
                    to: Point::new(x, from.y),
                })
            }
            CommandKind::VerticalTo => {
                let y = if relative { from.y + a[0] } else { a[0] };
                Some(Curve::Line {
                    from,
                    to: Point::new(from.x, y),
                })
            }
            CommandKind::CubicTo => {
                let ctrl1 = self.absolute(relative, a[0], a[1]);
                let ctrl2 = self.absolute(relative, a[2], a[3]);
                cubic_ctrl = Some(ctrl2);
                Some(Curve::Cubic {
                    from,
                    ctrl1,
                    ctrl2,
                    to: self.absolute(relative, a[4], a[5]),
                })
            }
            CommandKind::SmoothCubicTo => {
                let ctrl1 = self
                    .last_cubic_ctrl
                    .map(|c| c.reflect_about(from))
                    .unwrap_or(from);
                let ctrl2 = self.absolute(relative, a[0], a[1]);
                cubic_ctrl = Some(ctrl2);
                Some(Curve::Cubic {
                    from,
                    ctrl1,
                    ctrl2,
                    to: self.absolute(relative, a[2], a[3]),
                })
            }
            CommandKind::QuadTo => {
                let ctrl = self.absolute(relative, a[0], a[1]);
                quad_ctrl = Some(ctrl);
                Some(Curve::Quad {
                    from,
                    ctrl,
                    to: self.absolute(relative, a[2], a[3]),
                })
            }
            CommandKind::SmoothQuadTo => {
                let ctrl = self
                    .last_quad_ctrl
                    .map(|c| c.reflect_about(from))
                    .unwrap_or(from);
                quad_ctrl = Some(ctrl);
                Some(Curve::Quad {
                    from,
                    ctrl,
                    to: self.absolute(relative, a[0], a[1]),
                })
            }
            CommandKind::ArcTo => {
                let to = self.absolute(relative, a[5], a[6]);
                if a[0] == 0.0 || a[1] == 0.0 {
                    Some(Curve::Line { from, to })
                } else {
                    Some(Curve::Arc {
                        from,
                        to,
                        radii: Point::new(a[0], a[1]),
                        rotation: a[2],
                        large_arc: a[3] != 0.0,
                        sweep: a[4] != 0.0,
                    })
                }
            }
            CommandKind::Close => {
                self.current = self.subpath_start;
                None
            }
        };

        if let Some(curve) = curve {
            self.current = curve.end();
        }
        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
        curve
    }
}

/// Resolve path data into absolute subpaths
pub fn resolve(path: &PathData) -> Vec<Subpath> {
    let mut pen = Pen::default();
    let mut subpaths: Vec<Subpath> = Vec::new();
    let mut open: Option<Subpath> = None;

    for segment in path.segments() {
        match segment.kind {
            CommandKind::MoveTo => {
                pen.advance(segment.kind, segment.relative, &segment.args);
                if let Some(done) = open.take() {
                    subpaths.push(done);
                }
                open = Some(Subpath::new(pen.current));
            }
            CommandKind::Close => {
                pen.advance(segment.kind, segment.relative, &segment.args);
                if let Some(mut done) = open.take() {
                    done.closed = true;
                    subpaths.push(done);
                }
            }
            _ => {
                // Drawing after a closepath starts a new subpath at the pen
                let sub = open.get_or_insert_with(|| Subpath::new(pen.current));
                if let Some(curve) = pen.advance(segment.kind, segment.relative, &segment.args) {
                    sub.curves.push(curve);
                }
            }
        }
    }

    if let Some(done) = open {
        subpaths.push(done);
    }
    subpaths
}

/// Total length of all subpaths
pub fn total_length(subpaths: &[Subpath]) -> f32 {
    subpaths.iter().map(Subpath::length).sum()
}

/// Walk the subpaths to `distance`, clamping to the path's extent
pub fn point_at_length(subpaths: &[Subpath], distance: f32) -> Option<Point> {
    let first = subpaths.first()?;
    let mut remaining = distance.max(0.0);
    let mut last = first.start;

    for subpath in subpaths {
        last = subpath.start;
        for curve in subpath.all_curves() {
            let len = curve.length();
            if remaining <= len {
                return Some(curve.point_at_length(remaining));
            }
            remaining -= len;
            last = curve.end();
        }
    }
    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Segment;

    fn resolve_str(d: &str) -> Vec<Subpath> {
        resolve(&PathData::parse(d).unwrap())
    }

    #[test]
    fn short_segments_are_skipped() {
        let path = PathData::from_segments(vec![
            Segment::new(CommandKind::MoveTo, false, &[0.0, 0.0]),
            Segment::new(CommandKind::CubicTo, false, &[1.0, 2.0]),
            Segment::new(CommandKind::ArcTo, true, &[]),
            Segment::new(CommandKind::LineTo, false, &[3.0, 4.0]),
        ]);
        let subpaths = resolve(&path);
        assert_eq!(subpaths.len(), 1);
        assert_eq!(subpaths[0].curves.len(), 1);
        assert!(subpaths[0].end().approx_eq(Point::new(3.0, 4.0), 1e-6));
        assert!((subpaths[0].length() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn relative_commands_resolve_to_absolute() {
        let subs = resolve_str("m10 10 l5 0 v5 h-5 z");
        assert_eq!(subs.len(), 1);
        let sub = &subs[0];
        assert_eq!(sub.start, Point::new(10.0, 10.0));
        assert_eq!(sub.end(), Point::new(10.0, 15.0));
        assert!(sub.closed);
        assert!((sub.length() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let subs = resolve_str("M0 0 C0 10 10 10 10 0 S20 -10 20 0");
        match subs[0].curves[1] {
            Curve::Cubic { ctrl1, .. } => assert_eq!(ctrl1, Point::new(10.0, -10.0)),
            other => panic!("expected cubic, got {:?}", other),
        }
    }

    #[test]
    fn semicircle_arc_length() {
        let subs = resolve_str("M0 0 A50 50 0 0 1 100 0");
        let expected = PI * 50.0;
        assert!((total_length(&subs) - expected).abs() < 0.1);

        // The apex of the semicircle sits above the chord for a positive sweep
        let apex = point_at_length(&subs, expected / 2.0).unwrap();
        assert!((apex.x - 50.0).abs() < 0.5);
        assert!((apex.y.abs() - 50.0).abs() < 0.5);
    }

    #[test]
    fn point_at_length_clamps() {
        let subs = resolve_str("M0 0 L10 0");
        assert_eq!(point_at_length(&subs, -5.0), Some(Point::new(0.0, 0.0)));
        assert_eq!(point_at_length(&subs, 50.0), Some(Point::new(10.0, 0.0)));
        assert_eq!(point_at_length(&subs, 2.5), Some(Point::new(2.5, 0.0)));
    }

    #[test]
    fn drawing_after_close_starts_new_subpath() {
        let subs = resolve_str("M0 0 L10 0 Z L0 10");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].start, Point::new(0.0, 0.0));
    }
}
