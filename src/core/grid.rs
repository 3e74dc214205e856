use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::spatial;

/// Row-major cell index into a [`Grid`].
pub type CellId = u64;

/// A 3D grid spanning the periodic box, flattened in row-major order.
/// Access is O(1) via `index = (i * ny + j) * nz + k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    dims: [u64; 3],
    box_size: Vector3<f64>,
}

impl Grid {
    /// `dims` must be non-zero on every axis and `box_size` positive.
    pub fn new(dims: [u64; 3], box_size: Vector3<f64>) -> Self {
        Self { dims, box_size }
    }

    /// Same resolution on every axis.
    pub fn cubic(resolution: u64, box_size: Vector3<f64>) -> Self {
        Self::new([resolution; 3], box_size)
    }

    #[inline]
    pub fn dims(&self) -> [u64; 3] {
        self.dims
    }

    #[inline]
    pub fn num_cells(&self) -> u64 {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Flattens 3D indices. Indices wrap around each dimension.
    #[inline(always)]
    pub fn three_to_one(&self, i: u64, j: u64, k: u64) -> CellId {
        let [nx, ny, nz] = self.dims;
        let (i, j, k) = (i % nx, j % ny, k % nz);
        (i * ny + j) * nz + k
    }

    /// Inverse of [`Grid::three_to_one`].
    pub fn one_to_three(&self, cell: CellId) -> [u64; 3] {
        let [nx, ny, nz] = self.dims;
        let cell = cell % (nx * ny * nz);
        let i = cell / (ny * nz);
        let rem = cell - i * ny * nz;
        let j = rem / nz;
        let k = rem - j * nz;
        [i, j, k]
    }

    /// Cell containing `p`. The point is wrapped into the box first, so
    /// particles that drifted slightly outside still land in a valid cell.
    pub fn cell_of(&self, p: &Point3<f64>) -> CellId {
        let w = spatial::wrap_into_box(p, &self.box_size);
        let mut idx = [0u64; 3];
        for axis in 0..3 {
            let n = self.dims[axis];
            let scaled = (w[axis] * n as f64 / self.box_size[axis]).floor();
            // Clamp guards the w == L edge produced by float rounding
            idx[axis] = (scaled.max(0.0) as u64).min(n - 1);
        }
        self.three_to_one(idx[0], idx[1], idx[2])
    }
}
