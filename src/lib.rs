//! quadwarp - perspective-correct texture warping onto arbitrary quads
//!
//! A flat texture is mapped onto a destination quadrilateral by estimating the
//! homography from a canonical square, warping a tessellated parameter grid
//! through it, and packing the result into a 16-bit vertex buffer.

pub mod assembler;
pub mod config;
pub mod error;
pub mod matrix;
pub mod mesh;
pub mod quad;
pub mod transform;
pub mod triangulation;
pub mod vertex;

pub use assembler::{assemble, WarpAssembler, WarpMesh, WarpOptions, WarpStrategy};
pub use error::WarpError;
pub use quad::{Corner, Point, PointQuad};
pub use transform::{map_forward, map_inverse, EstimateStatus, Homography, PerspectiveTransform};
pub use triangulation::{GridTriangulator, Triangulator};
pub use vertex::{AttributeLayout, VertexBuffer, VertexRecord};
