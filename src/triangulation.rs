//! Triangulation of parameter grids
//!
//! The assembler only depends on the [`Triangulator`] trait. Implementations
//! must be pure: the same point sequence always yields the same triangles,
//! since the indices are reused against a second grid of texture coordinates.

use tracing::warn;

use crate::quad::Point;

/// Produces index triples covering an ordered point set
pub trait Triangulator {
    fn triangulate(&self, points: &[Point]) -> Vec<[usize; 3]>;
}

impl<F> Triangulator for F
where
    F: Fn(&[Point]) -> Vec<[usize; 3]>,
{
    fn triangulate(&self, points: &[Point]) -> Vec<[usize; 3]> {
        self(points)
    }
}

/// Splits every cell of a square row-major lattice into two triangles
#[derive(Debug, Clone, Copy, Default)]
pub struct GridTriangulator;

impl Triangulator for GridTriangulator {
    fn triangulate(&self, points: &[Point]) -> Vec<[usize; 3]> {
        let n = (points.len() as f64).sqrt().round() as usize;
        if n < 2 || n * n != points.len() {
            warn!(
                "Cannot triangulate {} points as a square lattice",
                points.len()
            );
            return Vec::new();
        }

        let mut triangles = Vec::with_capacity(2 * (n - 1) * (n - 1));
        for i in 0..n - 1 {
            for j in 0..n - 1 {
                let a = i * n + j;
                let b = a + 1;
                let c = a + n;
                let d = c + 1;
                triangles.push([a, b, c]);
                triangles.push([b, d, c]);
            }
        }
        triangles
    }
}
