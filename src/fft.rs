// wavesim - A domain-decomposed modified Born series solver
// Copyright (C) 2026 The wavesim developers

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! 3-D FFT over flat complex buffers
//!
//! Volumes are stored row-major with the last axis fastest. The last axis
//! is transformed on contiguous lanes; the other axes gather each strided
//! lane into a scratch lane, transform it, and scatter it back. A buffer
//! holding several field components is transformed component by
//! component (its length must be a multiple of the cell count).

use std::sync::Arc;

use num_complex::Complex64;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

/// Per-axis FFT plans plus scratch storage for one subdomain shape.
pub(crate) struct FftPlans {
    shape: [usize; 3],
    forward: Vec<Arc<dyn Fft<f64>>>,
    inverse: Vec<Arc<dyn Fft<f64>>>,
    scratch: Vec<Complex64>,
    lane: Vec<Complex64>,
}

impl FftPlans {
    pub fn new(shape: [usize; 3]) -> Self {
        let mut planner = FftPlanner::new();
        let forward: Vec<_> = shape
            .iter()
            .map(|&n| planner.plan_fft_forward(n))
            .collect();
        let inverse: Vec<_> = shape
            .iter()
            .map(|&n| planner.plan_fft_inverse(n))
            .collect();
        let scratch_len = forward
            .iter()
            .chain(inverse.iter())
            .map(|plan| plan.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);
        let lane_len = shape[0].max(shape[1]).max(shape[2]);
        Self {
            shape,
            forward,
            inverse,
            scratch: vec![Complex64::zero(); scratch_len],
            lane: vec![Complex64::zero(); lane_len],
        }
    }

    /// In-place forward 3-D FFT of every component volume in `data`.
    pub fn fftn(&mut self, data: &mut [Complex64]) {
        for axis in 0..3 {
            self.transform_axis(data, axis, false);
        }
    }

    /// In-place inverse 3-D FFT, normalized by the cell count.
    pub fn ifftn(&mut self, data: &mut [Complex64]) {
        for axis in 0..3 {
            self.transform_axis(data, axis, true);
        }
        let norm = 1.0 / (self.shape[0] * self.shape[1] * self.shape[2]) as f64;
        for value in data.iter_mut() {
            *value *= norm;
        }
    }

    fn transform_axis(&mut self, data: &mut [Complex64], axis: usize, inverse: bool) {
        let n = self.shape[axis];
        if n == 1 {
            return;
        }
        let plan = if inverse {
            self.inverse[axis].clone()
        } else {
            self.forward[axis].clone()
        };
        let [nx, ny, nz] = self.shape;
        if axis == 2 {
            for chunk in data.chunks_exact_mut(nz) {
                plan.process_with_scratch(chunk, &mut self.scratch);
            }
            return;
        }
        let cells = nx * ny * nz;
        debug_assert_eq!(data.len() % cells, 0);
        let stride = if axis == 0 { ny * nz } else { nz };
        let (outer, inner) = if axis == 0 { (ny, nz) } else { (nx, nz) };
        let lane = &mut self.lane;
        let scratch = &mut self.scratch;
        for volume in data.chunks_exact_mut(cells) {
            for a in 0..outer {
                for b in 0..inner {
                    let base = if axis == 0 { a * nz + b } else { a * ny * nz + b };
                    for i in 0..n {
                        lane[i] = volume[base + i * stride];
                    }
                    plan.process_with_scratch(&mut lane[..n], scratch);
                    for i in 0..n {
                        volume[base + i * stride] = lane[i];
                    }
                }
            }
        }
    }
}
