//! Uniform parameter grids for triangulation

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpError};
use crate::quad::Point;

/// `count` evenly spaced values from `start` to `stop`, both inclusive
pub fn linspace(start: f64, stop: f64, count: usize) -> Result<Vec<f64>> {
    if count < 2 {
        return Err(WarpError::InvalidGridSize(count));
    }
    let step = (stop - start) / (count - 1) as f64;
    let mut values: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    // Pin the endpoint so accumulated rounding never overshoots the range
    values[count - 1] = stop;
    Ok(values)
}

/// Axis-aligned range a grid is spread over
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl GridBounds {
    /// Canonical shape space the mesh is warped from
    pub const SHAPE: GridBounds = GridBounds::new(-1.0, 1.0, -1.0, 1.0);
    /// Normalized texture space
    pub const TEXTURE: GridBounds = GridBounds::new(0.0, 1.0, 0.0, 1.0);

    pub const fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::TEXTURE
    }
}

/// `count²` points, first axis outer, second axis inner
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    count: usize,
    points: Vec<Point>,
}

impl ParameterGrid {
    /// Points per axis
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }
}

impl std::ops::Index<usize> for ParameterGrid {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

/// Cartesian product of two `linspace` axes
pub fn build_grid(count: usize, xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<ParameterGrid> {
    let xs = linspace(xmin, xmax, count)?;
    let ys = linspace(ymin, ymax, count)?;

    let points = xs
        .iter()
        .flat_map(|&x| ys.iter().map(move |&y| Point::new(x, y)))
        .collect();

    Ok(ParameterGrid { count, points })
}

/// [`build_grid`] over named bounds
pub fn build_grid_in(count: usize, bounds: GridBounds) -> Result<ParameterGrid> {
    build_grid(count, bounds.xmin, bounds.xmax, bounds.ymin, bounds.ymax)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-1.0, 1.0, 5).unwrap();
        assert_eq!(v, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_linspace_rejects_small_counts() {
        assert_eq!(linspace(0.0, 1.0, 1), Err(WarpError::InvalidGridSize(1)));
        assert_eq!(linspace(0.0, 1.0, 0), Err(WarpError::InvalidGridSize(0)));
    }

    #[test]
    fn test_unit_grid_order() {
        let grid = build_grid(2, 0.0, 1.0, 0.0, 1.0).unwrap();
        assert_eq!(
            grid.points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
            ]
        );
    }

    #[test]
    fn test_shape_and_texture_grids_align() {
        let shape = build_grid_in(7, GridBounds::SHAPE).unwrap();
        let texture = build_grid_in(7, GridBounds::TEXTURE).unwrap();
        assert_eq!(shape.len(), 49);
        assert_eq!(texture.len(), 49);
        for (s, t) in shape.points().iter().zip(texture.points()) {
            assert!(((s.x + 1.0) / 2.0 - t.x).abs() < 1e-12);
            assert!(((s.y + 1.0) / 2.0 - t.y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_grid_rejects_small_counts() {
        assert!(build_grid_in(1, GridBounds::SHAPE).is_err());
    }
}
