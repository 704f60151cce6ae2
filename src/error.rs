//! Error types shared by the warp pipeline

use thiserror::Error;

/// Errors raised while estimating a warp or building its mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    /// Matrix shapes are incompatible for the requested operation.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// No pivot above the tolerance was found while inverting.
    #[error("matrix is singular (no usable pivot in column {column})")]
    SingularMatrix { column: usize },

    /// The four correspondences do not define a projective mapping.
    #[error("degenerate point correspondence")]
    DegenerateCorrespondence,

    /// Grid resolution must be at least 2.
    #[error("grid size must be >= 2, got {0}")]
    InvalidGridSize(usize),

    /// A flattened quad needs exactly eight coordinates.
    #[error("expected 8 coordinates (4 corner points), got {0}")]
    InvalidCoordinateCount(usize),

    /// Texture extent must fit the positive i16 range.
    #[error("texture extent must be in (0, 32767], got {0}")]
    InvalidTextureExtent(f64),
}

pub type Result<T> = std::result::Result<T, WarpError>;
