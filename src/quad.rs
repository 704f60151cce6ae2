//! Quadrilateral corners and their ordering contract
//!
//! Every quad in this crate stores its corners in the order
//! **top-right, bottom-right, top-left, bottom-left**. The corner source must
//! supply destination points in exactly this order: a reordered quad still
//! produces a mesh, just a geometrically wrong one.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpError};

/// A 2D point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Corner slot of a quad, in storage order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopRight = 0,
    BottomRight = 1,
    TopLeft = 2,
    BottomLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopRight,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::TopRight => "Top Right",
            Corner::BottomRight => "Bottom Right",
            Corner::TopLeft => "Top Left",
            Corner::BottomLeft => "Bottom Left",
        }
    }

    /// The corner across the diagonal
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::TopLeft => Corner::BottomRight,
            Corner::BottomLeft => Corner::TopRight,
        }
    }
}

/// Exactly four points, ordered top-right, bottom-right, top-left, bottom-left
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PointQuad(pub [Point; 4]);

impl PointQuad {
    /// Canonical shape-space quad the mesh is warped from
    pub const CANONICAL: PointQuad = PointQuad([
        Point::new(-1.0, 1.0),
        Point::new(1.0, 1.0),
        Point::new(-1.0, -1.0),
        Point::new(1.0, -1.0),
    ]);

    pub fn new(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// Build from a flat `[x0, y0, x1, y1, x2, y2, x3, y3]` slice
    pub fn from_flat(values: &[f64]) -> Result<Self> {
        if values.len() != 8 {
            return Err(WarpError::InvalidCoordinateCount(values.len()));
        }
        Ok(Self(std::array::from_fn(|i| {
            Point::new(values[2 * i], values[2 * i + 1])
        })))
    }

    /// Flatten to 8 reals in corner order
    pub fn flatten(&self) -> [f64; 8] {
        let mut out = [0.0; 8];
        for (i, p) in self.0.iter().enumerate() {
            out[2 * i] = p.x;
            out[2 * i + 1] = p.y;
        }
        out
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.0[corner.index()]
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Scale every coordinate around the origin
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.map(|p| Point::new(p.x * factor, p.y * factor)))
    }
}

impl std::ops::Index<Corner> for PointQuad {
    type Output = Point;

    fn index(&self, corner: Corner) -> &Point {
        &self.0[corner.index()]
    }
}
