//! Neighbourhood kernels, boundary modes, and neighbour counting.

use crate::error::ConfigError;
use crate::grid::Grid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How neighbour lookups behave at the edge of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Boundary {
    /// Toroidal topology: edges wrap around to the opposite side.
    #[default]
    Wrap,
    /// Cells beyond the edge hold a fixed value.
    Constant(u8),
}

/// A neighbourhood weight kernel.
///
/// The kernel is centered on each cell in turn; the neighbour count of a cell
/// is the weighted sum of the grid values under the kernel. Every axis length
/// is odd so the center is well defined. The built-in neighbourhoods give the
/// center weight zero; [`Kernel::from_weights`] callers may include the
/// center explicitly when a rule wants self-inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    shape: Vec<usize>,
    weights: Vec<u16>,
    /// Nonzero taps as (offset from center, weight), precomputed.
    taps: Vec<(Vec<isize>, u16)>,
}

impl Kernel {
    /// Moore neighbourhood: every cell within Chebyshev distance 1.
    ///
    /// Shape `(3,)*ndim`, all weights 1 except the center, which is 0. This
    /// gives `3^ndim - 1` neighbours: the classic 8 for 2D Life.
    pub fn moore(ndim: usize) -> Result<Self, ConfigError> {
        if ndim == 0 {
            return Err(ConfigError::EmptyShape);
        }
        let len = 3usize.pow(ndim as u32);
        let mut weights = vec![1u16; len];
        weights[len / 2] = 0;
        Self::build(vec![3; ndim], weights)
    }

    /// Von Neumann neighbourhood: orthogonally adjacent cells only.
    ///
    /// Shape `(3,)*ndim` with weight 1 at Manhattan distance exactly 1,
    /// giving `2*ndim` neighbours.
    pub fn von_neumann(ndim: usize) -> Result<Self, ConfigError> {
        if ndim == 0 {
            return Err(ConfigError::EmptyShape);
        }
        let len = 3usize.pow(ndim as u32);
        let mut weights = vec![0u16; len];
        for flat in 0..len {
            let mut rem = flat;
            let mut distance = 0;
            for _ in 0..ndim {
                distance += (rem % 3).abs_diff(1);
                rem /= 3;
            }
            if distance == 1 {
                weights[flat] = 1;
            }
        }
        Self::build(vec![3; ndim], weights)
    }

    /// Custom kernel from explicit weights in row-major order.
    ///
    /// Every axis length must be odd and positive, and `weights` must have
    /// exactly one entry per kernel cell.
    pub fn from_weights(shape: &[usize], weights: &[u16]) -> Result<Self, ConfigError> {
        Self::build(shape.to_vec(), weights.to_vec())
    }

    fn build(shape: Vec<usize>, weights: Vec<u16>) -> Result<Self, ConfigError> {
        if shape.is_empty() {
            return Err(ConfigError::EmptyShape);
        }
        for (axis, &len) in shape.iter().enumerate() {
            if len == 0 {
                return Err(ConfigError::ZeroAxis { axis });
            }
            if len % 2 == 0 {
                return Err(ConfigError::EvenKernelAxis { axis, len });
            }
        }
        let expected: usize = shape.iter().product();
        if weights.len() != expected {
            return Err(ConfigError::WeightCountMismatch {
                expected,
                got: weights.len(),
            });
        }

        // Precompute the nonzero taps as offsets from the kernel center.
        let mut taps = Vec::new();
        for (flat, &weight) in weights.iter().enumerate() {
            if weight == 0 {
                continue;
            }
            let mut offset = vec![0isize; shape.len()];
            let mut rem = flat;
            for axis in (0..shape.len()).rev() {
                let len = shape[axis];
                offset[axis] = (rem % len) as isize - (len / 2) as isize;
                rem /= len;
            }
            taps.push((offset, weight));
        }

        Ok(Self {
            shape,
            weights,
            taps,
        })
    }

    /// Returns the kernel axis lengths.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Sum of all weights: the largest count a fully-alive binary
    /// neighbourhood can produce.
    pub fn weight_sum(&self) -> u32 {
        self.weights.iter().map(|&w| u32::from(w)).sum()
    }

    pub(crate) fn taps(&self) -> &[(Vec<isize>, u16)] {
        &self.taps
    }
}

/// Computes the weighted neighbour count of every cell in one pass.
///
/// This is the correlation primitive behind [`crate::State::step`]: the
/// kernel slides over the grid under the given boundary mode and the counts
/// come back in the grid's row-major order. Counts saturate at `u16::MAX`;
/// [`crate::State`] construction rejects configurations that could reach it.
pub fn count_neighbors(
    grid: &Grid,
    kernel: &Kernel,
    boundary: Boundary,
) -> Result<Vec<u16>, ConfigError> {
    if grid.ndim() != kernel.ndim() {
        return Err(ConfigError::DimensionMismatch {
            grid: grid.ndim(),
            kernel: kernel.ndim(),
        });
    }
    let mut counts = Vec::new();
    count_neighbors_into(grid, kernel, boundary, &mut counts);
    Ok(counts)
}

/// Correlation pass into a reusable buffer. Dimensions must already match.
pub(crate) fn count_neighbors_into(
    grid: &Grid,
    kernel: &Kernel,
    boundary: Boundary,
    out: &mut Vec<u16>,
) {
    let shape = grid.shape();
    let ndim = shape.len();
    let cells = grid.cells();
    out.clear();
    out.resize(cells.len(), 0);

    let mut coord = vec![0usize; ndim];
    for idx in 0..cells.len() {
        let mut sum = 0u32;
        'taps: for (offset, weight) in kernel.taps() {
            let mut flat = 0usize;
            let mut stride = 1usize;
            for axis in (0..ndim).rev() {
                let len = shape[axis] as isize;
                let mut c = coord[axis] as isize + offset[axis];
                if c < 0 || c >= len {
                    match boundary {
                        Boundary::Wrap => c = c.rem_euclid(len),
                        Boundary::Constant(value) => {
                            // The whole tap reads the padding value.
                            sum += u32::from(*weight) * u32::from(value);
                            continue 'taps;
                        }
                    }
                }
                flat += c as usize * stride;
                stride *= shape[axis];
            }
            sum += u32::from(*weight) * u32::from(cells[flat]);
        }
        out[idx] = sum.min(u32::from(u16::MAX)) as u16;

        for axis in (0..ndim).rev() {
            coord[axis] += 1;
            if coord[axis] < shape[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
}
