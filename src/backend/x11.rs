//! X11 output, as drawing requests handed to an [`XRequestSink`].
//!
//! Three graphics contexts are mirrored: one for stroking, one for
//! filling and one for the background. Before each request only the GC
//! fields that differ from what was last sent are changed.
//!
//! Thin solid lines are drawn while the path is built, segment by
//! segment, so that an interactive window shows them immediately. Such a
//! path is not stroked again when it ends unless it must also be filled.

use std::fmt;

use glam::DVec2;

use super::raster::stroke_style;
use super::{Backend, Cx, DeviceRange, Dot, NativeArc, Polyline};
use crate::caps::{self, Capabilities};
use crate::collab::{Gc, GcChange, XLineStyle, XRequest, XRequestSink};
use crate::errors::{PlotError, Warning};
use crate::log::debug;
use crate::paint;
use crate::params::PlotterParams;
use crate::path::{Path, Segment};
use crate::state::DrawState;
use crate::state::modes::{CapStyle, JoinStyle};
use crate::types::{IPoint, iround};

/// A full circle in 64ths of a degree.
const FULL_CIRCLE: i32 = 64 * 360;

fn to_i16(v: i32) -> Option<i16> {
    i16::try_from(v).ok()
}

fn to_u16(v: i32) -> Option<u16> {
    u16::try_from(v).ok()
}

/// X has no triangular caps or joins.
fn x_cap(cap: CapStyle) -> CapStyle {
    match cap {
        CapStyle::Triangular => CapStyle::Round,
        c => c,
    }
}

fn x_join(join: JoinStyle) -> JoinStyle {
    match join {
        JoinStyle::Triangular => JoinStyle::Round,
        j => j,
    }
}

/// Record `want` as sent, returning it only if it differs from what was.
fn changed<T: Clone + PartialEq>(sent: &mut Option<T>, want: Option<T>) -> Option<T> {
    match want {
        Some(v) if sent.as_ref() != Some(&v) => {
            *sent = Some(v.clone());
            Some(v)
        }
        _ => None,
    }
}

/// Whether the path is drawn segment by segment as it is built.
fn is_prepainted(state: &DrawState, path: &Path) -> bool {
    paint::prepaint_eligible(state, path) && !path.segments().iter().any(Segment::is_curve)
}

/// The X rectangle covered by a closed axis-aligned quadrilateral that
/// starts at its lower left corner.
fn as_rectangle(q: &[(i16, i16)]) -> Option<(i16, i16, u16, u16)> {
    if q.len() != 5 || q[0] != q[4] {
        return None;
    }
    let ok = q[0].0 == q[3].0 && q[1].0 == q[2].0 && q[0].1 == q[1].1 && q[2].1 == q[3].1;
    if !ok || q[0].0 >= q[1].0 || q[0].1 <= q[2].1 {
        return None;
    }
    let width = (q[1].0 as i32 - q[0].0 as i32) as u16;
    let height = (q[0].1 as i32 - q[2].1 as i32) as u16;
    Some((q[3].0, q[3].1, width, height))
}

pub struct X11Backend {
    sink: Box<dyn XRequestSink>,
    stroke_gc: GcChange,
    fill_gc: GcChange,
    bg_gc: GcChange,
}

impl fmt::Debug for X11Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Backend")
            .field("stroke_gc", &self.stroke_gc)
            .field("fill_gc", &self.fill_gc)
            .field("bg_gc", &self.bg_gc)
            .finish_non_exhaustive()
    }
}

impl X11Backend {
    pub fn new(sink: Box<dyn XRequestSink>) -> Self {
        X11Backend {
            sink,
            stroke_gc: GcChange::default(),
            fill_gc: GcChange::default(),
            bg_gc: GcChange::default(),
        }
    }

    fn send(&mut self, req: XRequest) {
        self.sink.send(req);
    }

    fn sync(&mut self, gc: Gc, want: GcChange) {
        let sent = match gc {
            Gc::Stroke => &mut self.stroke_gc,
            Gc::Fill => &mut self.fill_gc,
            Gc::Background => &mut self.bg_gc,
        };
        let change = GcChange {
            foreground: changed(&mut sent.foreground, want.foreground),
            line_width: changed(&mut sent.line_width, want.line_width),
            line_style: changed(&mut sent.line_style, want.line_style),
            cap: changed(&mut sent.cap, want.cap),
            join: changed(&mut sent.join, want.join),
            dashes: changed(&mut sent.dashes, want.dashes),
            fill_rule: changed(&mut sent.fill_rule, want.fill_rule),
        };
        if !change.is_empty() {
            self.send(XRequest::ChangeGc(gc, change));
        }
    }

    /// Pen color, width, cap, join and dashing.
    fn sync_stroke(&mut self, state: &DrawState) {
        let style = stroke_style(state);
        let (line_style, dashes) = if style.dashes.is_empty() {
            (XLineStyle::Solid, None)
        } else {
            let lens = style.dashes.iter().map(|&d| d.clamp(1, 255) as u8).collect();
            (XLineStyle::OnOffDash, Some((style.dash_offset, lens)))
        };
        self.sync(
            Gc::Stroke,
            GcChange {
                foreground: Some(state.fg_color.to_rgb24()),
                line_width: Some(style.width),
                line_style: Some(line_style),
                cap: Some(x_cap(state.cap)),
                join: Some(x_join(state.join)),
                dashes,
                fill_rule: None,
            },
        );
    }

    fn sync_fill(&mut self, state: &DrawState) {
        self.sync(
            Gc::Fill,
            GcChange {
                foreground: Some(state.fill_color.to_rgb24()),
                fill_rule: Some(state.fill_rule),
                ..GcChange::default()
            },
        );
    }

    /// Device points as X coordinates, cut short at the first point
    /// outside the 16-bit range or at the request size limit.
    fn x_points(&self, cx: &mut Cx<'_>, device: &[DVec2]) -> Vec<(i16, i16)> {
        let max = cx.params.x_max_request;
        let mut out = Vec::with_capacity(device.len().min(max));
        for &d in device {
            let p = IPoint::round(d);
            let (Some(x), Some(y)) = (to_i16(p.x), to_i16(p.y)) else {
                cx.warn(Warning::Truncated { what: "polyline" });
                break;
            };
            out.push((x, y));
            if out.len() >= max && out.len() < device.len() {
                cx.warn(Warning::Truncated { what: "polyline" });
                break;
            }
        }
        out
    }

    /// Fill and edge an axis-aligned elliptic arc, angles in 64ths of a
    /// degree counterclockwise from three o'clock.
    #[allow(clippy::too_many_arguments)]
    fn arc(&mut self, cx: &mut Cx<'_>, x: i32, y: i32, w: i32, h: i32, angle1: i32, angle2: i32) {
        let (Some(xi), Some(yi), Some(wu), Some(hu)) = (to_i16(x), to_i16(y), to_u16(w), to_u16(h)) else {
            cx.warn(Warning::Truncated { what: "arc" });
            return;
        };
        let tiny = w <= 1 || h <= 1;
        let state = cx.state;
        if state.fill_type != 0 {
            self.sync_fill(state);
            if tiny {
                self.send(XRequest::DrawPoint(xi, yi));
            } else {
                self.send(XRequest::FillArc {
                    x: xi,
                    y: yi,
                    width: wu,
                    height: hu,
                    angle1,
                    angle2,
                });
            }
        }
        if state.pen_type != 0 {
            self.sync_stroke(state);
            if tiny {
                self.disk(state, IPoint::new(x, y));
            } else {
                self.send(XRequest::DrawArc {
                    x: xi,
                    y: yi,
                    width: wu,
                    height: hu,
                    angle1,
                    angle2,
                });
            }
        }
    }

    /// A pixel, or a disk as wide as the line.
    fn disk(&mut self, state: &DrawState, at: IPoint) {
        let qlw = state.quantized_device_line_width.max(0);
        let size = qlw.max(1);
        let offset = (qlw + 1) / 2;
        let (Some(x), Some(y)) = (to_i16(at.x - offset), to_i16(at.y - offset)) else {
            return;
        };
        if size == 1 {
            if let (Some(px), Some(py)) = (to_i16(at.x), to_i16(at.y)) {
                self.send(XRequest::DrawPoint(px, py));
            }
        } else {
            self.send(XRequest::FillArc {
                x,
                y,
                width: size as u16,
                height: size as u16,
                angle1: 0,
                angle2: FULL_CIRCLE,
            });
        }
    }
}

impl Backend for X11Backend {
    fn caps(&self) -> &'static Capabilities {
        &caps::X11
    }

    fn device_range(&self, params: &PlotterParams) -> DeviceRange {
        let (w, h) = params.bitmap_size;
        DeviceRange::pixels(0, w as i32 - 1, h as i32 - 1, 0)
    }

    fn begin_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.stroke_gc = GcChange::default();
        self.fill_gc = GcChange::default();
        self.bg_gc = GcChange::default();
        Ok(())
    }

    fn end_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.send(XRequest::Flush);
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let (w, h) = cx.params.bitmap_size;
        self.sync(
            Gc::Background,
            GcChange {
                foreground: Some(cx.state.bg_color.to_rgb24()),
                ..GcChange::default()
            },
        );
        self.send(XRequest::FillRectangle {
            gc: Gc::Background,
            x: 0,
            y: 0,
            width: w.min(u16::MAX as u32) as u16,
            height: h.min(u16::MAX as u32) as u16,
        });
        Ok(())
    }

    fn paint_path(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        let state = cx.state;
        if state.fill_type == 0 && is_prepainted(state, path) {
            if !state.transform.is_singular() {
                paint::accumulate_bbox(cx, path);
            }
            return Ok(());
        }
        paint::paint_path(self, cx, path)
    }

    fn maybe_prepaint_segments(&mut self, cx: &mut Cx<'_>, path: &Path, prev_num_segments: usize) -> Result<(), PlotError> {
        let segs = path.segments();
        let state = cx.state;
        if segs.len() < 2 || segs.len() == prev_num_segments || !is_prepainted(state, path) {
            return Ok(());
        }
        if state.transform.is_singular() {
            return Ok(());
        }
        self.sync_stroke(state);
        for i in prev_num_segments.max(1)..segs.len() {
            if matches!(segs[i], Segment::MoveTo(_)) {
                continue;
            }
            let (u0, u1) = (segs[i - 1].endpoint(), segs[i].endpoint());
            let (a, b) = (IPoint::round(cx.to_device(u0)), IPoint::round(cx.to_device(u1)));
            let (Some(ax), Some(ay), Some(bx), Some(by)) = (to_i16(a.x), to_i16(a.y), to_i16(b.x), to_i16(b.y)) else {
                cx.warn(Warning::Truncated { what: "line segment" });
                continue;
            };
            if a != b {
                self.send(XRequest::DrawLines(vec![(ax, ay), (bx, by)]));
            } else if !(state.cap == CapStyle::Butt && u0 == u1) {
                self.send(XRequest::DrawPoint(ax, ay));
            }
        }
        Ok(())
    }

    fn path_is_flushable(&self, state: &DrawState) -> bool {
        // a prepainted path has nothing left to flush
        !(state.pen_type != 0 && state.is_plain_line() && state.quantized_device_line_width == 0)
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        let state = cx.state;
        if state.pen_type == 0 {
            return Ok(());
        }
        let d = IPoint::round(cx.to_device(p));
        let (Some(x), Some(y)) = (to_i16(d.x), to_i16(d.y)) else {
            return Ok(());
        };
        self.sync(
            Gc::Stroke,
            GcChange {
                foreground: Some(state.fg_color.to_rgb24()),
                ..GcChange::default()
            },
        );
        self.send(XRequest::DrawPoint(x, y));
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let points = self.x_points(cx, &poly.device);
        if points.is_empty() {
            return Ok(());
        }
        let state = cx.state;
        let rect = as_rectangle(&points);
        if state.fill_type != 0 {
            self.sync_fill(state);
            match rect {
                Some((x, y, width, height)) => self.send(XRequest::FillRectangle {
                    gc: Gc::Fill,
                    x,
                    y,
                    width,
                    height,
                }),
                None => self.send(XRequest::FillPolygon {
                    points: points.clone(),
                    convex: poly.primitive,
                }),
            }
        }
        if state.pen_type != 0 {
            self.sync_stroke(state);
            debug!(points = points.len(), "XDrawLines");
            self.send(XRequest::DrawLines(points));
        }
        Ok(())
    }

    fn draw_dot(&mut self, cx: &mut Cx<'_>, dot: Dot) -> Result<(), PlotError> {
        let state = cx.state;
        if state.pen_type == 0 {
            return Ok(());
        }
        self.sync_stroke(state);
        self.disk(state, IPoint::round(dot.device));
        Ok(())
    }

    fn draw_arc(&mut self, cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
        let (c, r) = (arc.device_center, arc.device_radii);
        let angle1 = iround(64.0 * arc.angles.start);
        let angle2 = iround(64.0 * arc.angles.sweep);
        self.arc(
            cx,
            iround(c.x - r.x),
            iround(c.y - r.y),
            iround(2.0 * r.x),
            iround(2.0 * r.y),
            angle1,
            angle2,
        );
        Ok(())
    }

    fn draw_ellipse(
        &mut self,
        cx: &mut Cx<'_>,
        center: DVec2,
        radii: DVec2,
        angle_deg: f64,
        _clockwise: bool,
    ) -> Result<(), PlotError> {
        // only axis-aligned ellipses reach here
        let quarter_turns = iround(angle_deg / 90.0);
        let radii = if quarter_turns % 2 != 0 {
            DVec2::new(radii.y, radii.x)
        } else {
            radii
        };
        let m = &cx.state.transform.m;
        let c = cx.to_device(center);
        let rx = (m.0[0] * radii.x).abs();
        let ry = (m.0[3] * radii.y).abs();
        self.arc(
            cx,
            iround(c.x - rx),
            iround(c.y - ry),
            iround(2.0 * rx),
            iround(2.0 * ry),
            0,
            FULL_CIRCLE,
        );
        Ok(())
    }
}
