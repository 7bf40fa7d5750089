//! Render preparation and the raster drawing surface.
//!
//! [`prepare_segments`] turns parsed positions and edges into colored line
//! segments, coloring each edge by its length relative to the longest edge
//! in the drawing. [`Canvas`] collects segments and rasterizes them with
//! tiny-skia.

use crate::colormap::{Colormap, Rgba};
use crate::config::{FigureSize, VisConfig};
use crate::error::{Result, VisError};
use crate::layout_parser::ParsedLayout;
use crate::topology::{Edge, NodeId};
use crate::{Bounds, Point};
use std::path::Path;
use tiny_skia::{Color, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{debug, info};

/// A drawable edge
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub edge: Edge,
    pub start: Point,
    pub end: Point,
    /// Euclidean length in layout units
    pub length: f64,
    /// length / longest length, in (0, 1]
    pub normalized: f64,
    pub color: Rgba,
}

/// Segments ready for drawing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSegmentSet {
    pub segments: Vec<Segment>,
    /// Box around every positioned node, None when nothing is positioned
    pub bounds: Option<Bounds>,
    /// Edges skipped because both endpoints coincide
    pub dropped_zero_length: usize,
}

impl RenderSegmentSet {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn max_length(&self) -> Option<f64> {
        self.segments.iter().map(|s| s.length).reduce(f64::max)
    }
}

fn position<'a>(layout: &'a ParsedLayout, id: &NodeId) -> Result<&'a Point> {
    layout
        .position(id)
        .ok_or_else(|| VisError::MissingPosition(id.to_string()))
}

/// Compute segments, normalized lengths and colors for every edge.
///
/// Every edge endpoint must have a position. Zero-length edges are
/// dropped and counted; the rest are normalized by the single longest
/// edge so the longest gets the top of the colormap.
pub fn prepare_segments(layout: &ParsedLayout, colormap: &Colormap) -> Result<RenderSegmentSet> {
    let mut segments = Vec::with_capacity(layout.edges.len());
    let mut dropped_zero_length = 0;

    for edge in &layout.edges {
        let start = *position(layout, &edge.tail)?;
        let end = *position(layout, &edge.head)?;
        let length = start.distance(&end);
        if length == 0.0 {
            dropped_zero_length += 1;
            continue;
        }
        segments.push(Segment {
            edge: edge.clone(),
            start,
            end,
            length,
            normalized: 0.0,
            color: Rgba::BLACK,
        });
    }

    let max = segments.iter().map(|s| s.length).fold(0.0, f64::max);
    for segment in &mut segments {
        segment.normalized = segment.length / max;
        segment.color = colormap.sample(segment.normalized);
    }

    if dropped_zero_length > 0 {
        debug!(dropped = dropped_zero_length, "skipped zero-length edges");
    }

    Ok(RenderSegmentSet {
        segments,
        bounds: Bounds::from_points(layout.positions.values()),
        dropped_zero_length,
    })
}

/// Raster output settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveOptions {
    pub dpi: f32,
    /// Leave the background unpainted
    pub transparent: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            dpi: 100.0,
            transparent: false,
        }
    }
}

/// Fraction of each side left as padding around the plot area
const PLOT_MARGIN: f64 = 0.05;

/// Largest surface rasterize will allocate (400 MB of RGBA)
pub const MAX_PIXELS: u64 = 100_000_000;

/// Color of the frame drawn when axes are visible
const AXIS_COLOR: Rgba = Rgba::rgb(128, 128, 128);

/// Drawing surface in figure coordinates.
///
/// Geometry accumulates through [`Canvas::add_segments`]; nothing is drawn
/// until [`Canvas::rasterize`] or [`Canvas::save_png`].
#[derive(Debug, Clone)]
pub struct Canvas {
    figure: FigureSize,
    background: Rgba,
    /// Stroke width in points
    line_width: f32,
    extent: Option<Bounds>,
    square: bool,
    axes_visible: bool,
    segments: Vec<Segment>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(FigureSize::default(), Rgba::WHITE)
    }
}

impl Canvas {
    pub fn new(figure: FigureSize, background: Rgba) -> Self {
        Self {
            figure,
            background,
            line_width: 1.0,
            extent: None,
            square: false,
            axes_visible: true,
            segments: Vec::new(),
        }
    }

    pub fn from_config(config: &VisConfig) -> Self {
        let mut canvas = Self::new(config.figure, config.background);
        canvas.line_width = config.line_width;
        canvas
    }

    pub fn figure(&self) -> FigureSize {
        self.figure
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn set_background(&mut self, color: Rgba) {
        self.background = color;
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    pub fn extent(&self) -> Option<Bounds> {
        self.extent
    }

    pub fn set_extent(&mut self, extent: Bounds) {
        self.extent = Some(extent);
    }

    pub fn set_square_aspect(&mut self, square: bool) {
        self.square = square;
    }

    pub fn is_square_aspect(&self) -> bool {
        self.square
    }

    pub fn set_axes_visible(&mut self, visible: bool) {
        self.axes_visible = visible;
    }

    pub fn axes_visible(&self) -> bool {
        self.axes_visible
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append segments and grow the extent to cover their bounding box.
    pub fn add_segments(&mut self, set: &RenderSegmentSet) {
        self.segments.extend(set.segments.iter().cloned());
        if let Some(b) = set.bounds {
            self.extent = Some(match self.extent {
                Some(e) => Bounds {
                    x_min: e.x_min.min(b.x_min),
                    x_max: e.x_max.max(b.x_max),
                    y_min: e.y_min.min(b.y_min),
                    y_max: e.y_max.max(b.y_max),
                },
                None => b,
            });
        }
    }

    /// Pixel dimensions at the given DPI
    pub fn pixel_size(&self, dpi: f32) -> Result<(u32, u32)> {
        let w = (self.figure.width * dpi).round();
        let h = (self.figure.height * dpi).round();
        if !(w >= 1.0 && h >= 1.0) || w > u32::MAX as f32 || h > u32::MAX as f32 {
            return Err(VisError::Render(format!(
                "figure {}x{} in at {dpi} dpi is not a drawable size",
                self.figure.width, self.figure.height
            )));
        }
        if (w as f64) * (h as f64) > MAX_PIXELS as f64 {
            return Err(VisError::Render(format!(
                "{w}x{h} pixels exceeds the {MAX_PIXELS} pixel limit; lower the dpi or figure size"
            )));
        }
        Ok((w as u32, h as u32))
    }

    /// Layout-to-pixel transform: (scale_x, scale_y, offset_x, offset_y).
    /// The y axis is flipped so layout "up" is image "up".
    fn projection(&self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let extent = self.extent.unwrap_or(Bounds {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        });
        let (w, h) = (width as f64, height as f64);
        let plot_w = w * (1.0 - 2.0 * PLOT_MARGIN);
        let plot_h = h * (1.0 - 2.0 * PLOT_MARGIN);
        let span_x = if extent.width() > 0.0 { extent.width() } else { 1.0 };
        let span_y = if extent.height() > 0.0 { extent.height() } else { 1.0 };

        let (mut sx, mut sy) = (plot_w / span_x, plot_h / span_y);
        if self.square {
            let s = sx.min(sy);
            sx = s;
            sy = s;
        }
        let cx = (extent.x_min + extent.x_max) / 2.0;
        let cy = (extent.y_min + extent.y_max) / 2.0;
        (sx, -sy, w / 2.0 - cx * sx, h / 2.0 + cy * sy)
    }

    /// Draw every segment into a new pixmap.
    pub fn rasterize(&self, options: &SaveOptions) -> Result<Pixmap> {
        let (width, height) = self.pixel_size(options.dpi)?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            VisError::Render(format!("failed to allocate {width}x{height} surface"))
        })?;
        if !options.transparent {
            let bg = self.background;
            pixmap.fill(Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        }

        let (sx, sy, ox, oy) = self.projection(width, height);
        let project = |p: &Point| ((p.x * sx + ox) as f32, (p.y * sy + oy) as f32);
        let stroke = Stroke {
            width: self.line_width * options.dpi / 72.0,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        for segment in &self.segments {
            let (x0, y0) = project(&segment.start);
            let (x1, y1) = project(&segment.end);
            let mut pb = PathBuilder::new();
            pb.move_to(x0, y0);
            pb.line_to(x1, y1);
            let Some(path) = pb.finish() else {
                continue;
            };
            let c = segment.color;
            paint.set_color_rgba8(c.r, c.g, c.b, c.a);
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        if self.axes_visible {
            let m = PLOT_MARGIN as f32;
            let (w, h) = (width as f32, height as f32);
            let mut pb = PathBuilder::new();
            pb.move_to(w * m, h * m);
            pb.line_to(w * (1.0 - m), h * m);
            pb.line_to(w * (1.0 - m), h * (1.0 - m));
            pb.line_to(w * m, h * (1.0 - m));
            pb.close();
            if let Some(frame) = pb.finish() {
                paint.set_color_rgba8(AXIS_COLOR.r, AXIS_COLOR.g, AXIS_COLOR.b, AXIS_COLOR.a);
                let frame_stroke = Stroke {
                    width: options.dpi / 72.0,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&frame, &paint, &frame_stroke, Transform::identity(), None);
            }
        }

        debug!(
            width,
            height,
            segments = self.segments.len(),
            "rasterized canvas"
        );
        Ok(pixmap)
    }

    pub fn encode_png(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        self.rasterize(options)?
            .encode_png()
            .map_err(|e| VisError::Render(format!("failed to encode PNG: {e}")))
    }

    pub fn save_png(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        let path = path.as_ref();
        let png = self.encode_png(options)?;
        std::fs::write(path, png)?;
        info!(path = %path.display(), dpi = options.dpi, "wrote image");
        Ok(())
    }
}
