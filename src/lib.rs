//! visla: easy and attractive visualizations of sparse matrices and graphs
//!
//! Core library for turning a sparse matrix into a force-directed drawing:
//! matrix ingestion, topology construction, Graphviz layout, layout-output
//! parsing and edge-length colored rendering.

pub mod colormap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod layout_parser;
pub mod render;
pub mod session;
pub mod telemetry;
pub mod topology;

pub use error::{Result, VisError};
pub use session::VisGraph;

use serde::{Deserialize, Serialize};

/// A node position in the layout plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build a point from a coordinate vector of two or more components.
    /// Components beyond the second are ignored.
    pub fn from_components(components: &[f64]) -> Option<Self> {
        match components {
            [x, y, ..] => Some(Self { x: *x, y: *y }),
            _ => None,
        }
    }

    /// Euclidean distance between two points
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Axis-aligned bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Smallest box containing every point, or None for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            x_min: first.x,
            x_max: first.x,
            y_min: first.y,
            y_max: first.y,
        };
        for p in iter {
            bounds.x_min = bounds.x_min.min(p.x);
            bounds.x_max = bounds.x_max.max(p.x);
            bounds.y_min = bounds.y_min.min(p.y);
            bounds.y_max = bounds.y_max.max(p.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Expand the shorter side so both sides have equal length, keeping the center.
    pub fn squared(&self) -> Self {
        let side = self.width().max(self.height());
        let cx = (self.x_min + self.x_max) / 2.0;
        let cy = (self.y_min + self.y_max) / 2.0;
        Self {
            x_min: cx - side / 2.0,
            x_max: cx + side / 2.0,
            y_min: cy - side / 2.0,
            y_max: cy + side / 2.0,
        }
    }
}
