//! Warp assembly: grid + triangulation + transform -> vertex buffer
//!
//! The destination quad is given in pixel space, ordered top-right,
//! bottom-right, top-left, bottom-left. The canonical source quad
//! [`PointQuad::CANONICAL`] uses the same order, so the corner at index `i` of
//! the shape grid always lands on destination corner `i`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, WarpError};
use crate::matrix::DEFAULT_PIVOT_EPSILON;
use crate::mesh::{build_grid_in, GridBounds};
use crate::quad::{Corner, Point, PointQuad};
use crate::transform::{EstimateStatus, Homography};
use crate::triangulation::{GridTriangulator, Triangulator};
use crate::vertex::{VertexBuffer, VertexRecord};

/// Default points per grid axis
pub const DEFAULT_MESH_RESOLUTION: usize = 10;

/// Default texture coordinate extent `K`
pub const DEFAULT_TEXTURE_EXTENT: f64 = 8192.0;

/// How texture coordinates are made perspective-correct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WarpStrategy {
    /// Warp a tessellated grid through the estimated homography
    #[default]
    Homography,
    /// Two triangles with projective `q` weights taken from the diagonal
    /// intersection. Kept as an alternative; it does not agree with the
    /// homography warp on interior points.
    DiagonalRatio,
}

impl WarpStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarpStrategy::Homography => "homography",
            WarpStrategy::DiagonalRatio => "diagonal-ratio",
        }
    }
}

impl std::str::FromStr for WarpStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "homography" => Ok(WarpStrategy::Homography),
            "diagonal-ratio" => Ok(WarpStrategy::DiagonalRatio),
            other => Err(format!("unknown warp strategy: {}", other)),
        }
    }
}

/// Per-request warp settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarpOptions {
    /// Grid points per axis (homography strategy only)
    pub resolution: usize,
    /// Scale `K` applied to texture coordinates before quantization
    pub texture_extent: f64,
    pub strategy: WarpStrategy,
    /// Pivot tolerance for the normal-equation inverse
    pub pivot_epsilon: f64,
}

impl Default for WarpOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_MESH_RESOLUTION,
            texture_extent: DEFAULT_TEXTURE_EXTENT,
            strategy: WarpStrategy::default(),
            pivot_epsilon: DEFAULT_PIVOT_EPSILON,
        }
    }
}

/// Output of one warp request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarpMesh {
    strategy: WarpStrategy,
    status: EstimateStatus,
    vertices: VertexBuffer,
}

impl WarpMesh {
    pub fn strategy(&self) -> WarpStrategy {
        self.strategy
    }

    pub fn status(&self) -> EstimateStatus {
        self.status
    }

    /// True when degenerate corners forced an unwarped mapping
    pub fn is_fallback(&self) -> bool {
        self.status == EstimateStatus::Fallback
    }

    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    pub fn into_vertices(self) -> VertexBuffer {
        self.vertices
    }
}

/// Builds warped triangle lists for destination quads
#[derive(Debug, Clone)]
pub struct WarpAssembler<T = GridTriangulator> {
    options: WarpOptions,
    triangulator: T,
}

impl WarpAssembler<GridTriangulator> {
    pub fn new(options: WarpOptions) -> Self {
        Self::with_triangulator(options, GridTriangulator)
    }
}

impl Default for WarpAssembler<GridTriangulator> {
    fn default() -> Self {
        Self::new(WarpOptions::default())
    }
}

impl<T: Triangulator> WarpAssembler<T> {
    pub fn with_triangulator(options: WarpOptions, triangulator: T) -> Self {
        Self {
            options,
            triangulator,
        }
    }

    pub fn options(&self) -> &WarpOptions {
        &self.options
    }

    /// Warp the texture onto `dest`, whose corners must be ordered
    /// top-right, bottom-right, top-left, bottom-left.
    pub fn assemble(&self, dest: &PointQuad) -> Result<WarpMesh> {
        let k = self.options.texture_extent;
        if !(k > 0.0 && k <= i16::MAX as f64) {
            return Err(WarpError::InvalidTextureExtent(k));
        }

        let mesh = match self.options.strategy {
            WarpStrategy::Homography => self.assemble_homography(dest)?,
            WarpStrategy::DiagonalRatio => self.assemble_diagonal_ratio(dest),
        };

        if mesh.is_fallback() {
            warn!(
                "Degenerate destination quad {:?}, rendering unwarped ({})",
                dest.flatten(),
                mesh.strategy.as_str()
            );
        }
        debug!(
            "Assembled {} triangles with {} strategy",
            mesh.vertices.triangle_count(),
            mesh.strategy.as_str()
        );
        Ok(mesh)
    }

    fn assemble_homography(&self, dest: &PointQuad) -> Result<WarpMesh> {
        let n = self.options.resolution;
        let k = self.options.texture_extent;

        let shape = build_grid_in(n, GridBounds::SHAPE)?;
        let texture = build_grid_in(n, GridBounds::TEXTURE)?;
        let triangles = self.triangulator.triangulate(shape.points());

        // One coefficient set for every vertex of the request
        let h = Homography::estimate(&PointQuad::CANONICAL, dest, self.options.pivot_epsilon);
        let warped: Vec<Point> = shape
            .points()
            .par_iter()
            .map(|&p| h.apply_point(p))
            .collect();

        let records = triangles
            .iter()
            .flatten()
            .map(|&i| {
                let pos = warped[i];
                let uv = texture[i];
                VertexRecord::new(pos.x, pos.y, [uv.x * k, uv.y * k, k])
            })
            .collect();

        Ok(WarpMesh {
            strategy: WarpStrategy::Homography,
            status: h.status(),
            vertices: VertexBuffer::from_records(records),
        })
    }

    fn assemble_diagonal_ratio(&self, dest: &PointQuad) -> WarpMesh {
        let k = self.options.texture_extent;
        let (weights, status) = match diagonal_weights(dest, self.options.pivot_epsilon) {
            Some(w) => (w, EstimateStatus::Solved),
            None => ([1.0; 4], EstimateStatus::Fallback),
        };

        let max_w = weights.iter().cloned().fold(0.0, f64::max) * k;
        if max_w > i16::MAX as f64 {
            warn!(
                "Projective texture weight {:.0} exceeds the i16 range; lower texture_extent",
                max_w
            );
        }

        const ORDER: [Corner; 6] = [
            Corner::TopRight,
            Corner::BottomRight,
            Corner::TopLeft,
            Corner::TopLeft,
            Corner::BottomRight,
            Corner::BottomLeft,
        ];

        let records = ORDER
            .iter()
            .map(|&corner| {
                let pos = dest[corner];
                let uv = texture_corner(corner);
                let q = weights[corner.index()];
                VertexRecord::new(pos.x, pos.y, [uv.x * q * k, uv.y * q * k, q * k])
            })
            .collect();

        WarpMesh {
            strategy: WarpStrategy::DiagonalRatio,
            status,
            vertices: VertexBuffer::from_records(records),
        }
    }
}

/// Warp `dest` with default options
pub fn assemble(dest: &PointQuad, options: WarpOptions) -> Result<WarpMesh> {
    WarpAssembler::new(options).assemble(dest)
}

/// Normalized texture coordinate pinned to each corner of the two-triangle quad
fn texture_corner(corner: Corner) -> Point {
    match corner {
        Corner::TopRight => Point::new(1.0, 0.0),
        Corner::BottomRight => Point::new(1.0, 1.0),
        Corner::TopLeft => Point::new(0.0, 0.0),
        Corner::BottomLeft => Point::new(0.0, 1.0),
    }
}

/// Intersection of the segments `a0-a1` and `b0-b1`, if they cross strictly
/// inside both
fn segment_intersection(a0: Point, a1: Point, b0: Point, b1: Point, epsilon: f64) -> Option<Point> {
    let r = Point::new(a1.x - a0.x, a1.y - a0.y);
    let s = Point::new(b1.x - b0.x, b1.y - b0.y);
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() <= epsilon {
        return None;
    }

    let d = Point::new(b0.x - a0.x, b0.y - a0.y);
    let t = (d.x * s.y - d.y * s.x) / denom;
    let u = (d.x * r.y - d.y * r.x) / denom;
    if t <= 0.0 || t >= 1.0 || u <= 0.0 || u >= 1.0 {
        return None;
    }
    Some(Point::new(a0.x + t * r.x, a0.y + t * r.y))
}

/// Per-corner projective weights `q_i = (d_i + d_opp) / d_opp`, where `d` is
/// the distance from a corner to the diagonal intersection. Normalized so the
/// smallest weight is 1.
fn diagonal_weights(dest: &PointQuad, epsilon: f64) -> Option<[f64; 4]> {
    let center = segment_intersection(
        dest[Corner::TopRight],
        dest[Corner::BottomLeft],
        dest[Corner::BottomRight],
        dest[Corner::TopLeft],
        epsilon,
    )?;

    let dist = Corner::ALL.map(|c| dest[c].distance(&center));
    let mut weights = [1.0; 4];
    for corner in Corner::ALL {
        let d = dist[corner.index()];
        let d_opp = dist[corner.opposite().index()];
        weights[corner.index()] = (d + d_opp) / d_opp;
    }

    let min = weights.iter().cloned().fold(f64::INFINITY, f64::min);
    Some(weights.map(|w| w / min))
}
