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

//! Shared helpers for the end-to-end tests: absorbing boundary layers
//! around a refractive-index map, and error norms against reference
//! fields.

use num_complex::Complex64;

/// Linear anti-reflection absorption profile over the full padded axis:
/// ramps from almost 0 at the outer edge to 1 at the region of interest.
fn axis_filter(interior: usize, width: usize) -> Vec<f64> {
    let mut filter = Vec::with_capacity(interior + 2 * width);
    for i in 0..width {
        filter.push(((i + 1) as f64 - 0.21) / (width as f64 + 0.66));
    }
    filter.extend(std::iter::repeat(1.0).take(interior));
    for i in (0..width).rev() {
        filter.push(((i + 1) as f64 - 0.21) / (width as f64 + 0.66));
    }
    filter
}

/// Pad a refractive-index map with absorbing boundary layers.
///
/// The map is edge-replicated into the padding and an imaginary
/// permittivity ramp `i·(1−w)` is added there, so the padded medium
/// swallows outgoing waves. Returns the padded map and its shape.
pub fn add_absorbing_boundaries(
    n: &[Complex64],
    shape: [usize; 3],
    widths: [usize; 3],
) -> (Vec<Complex64>, [usize; 3]) {
    let padded_shape = [
        shape[0] + 2 * widths[0],
        shape[1] + 2 * widths[1],
        shape[2] + 2 * widths[2],
    ];
    let filters = [
        axis_filter(shape[0], widths[0]),
        axis_filter(shape[1], widths[1]),
        axis_filter(shape[2], widths[2]),
    ];
    let clamp = |p: usize, width: usize, len: usize| -> usize {
        if p < width {
            0
        } else if p >= width + len {
            len - 1
        } else {
            p - width
        }
    };
    let mut padded = Vec::with_capacity(padded_shape[0] * padded_shape[1] * padded_shape[2]);
    for x in 0..padded_shape[0] {
        let sx = clamp(x, widths[0], shape[0]);
        for y in 0..padded_shape[1] {
            let sy = clamp(y, widths[1], shape[1]);
            for z in 0..padded_shape[2] {
                let sz = clamp(z, widths[2], shape[2]);
                let refractive = n[(sx * shape[1] + sy) * shape[2] + sz];
                let weight = filters[0][x] * filters[1][y] * filters[2][z];
                let permittivity = refractive * refractive + Complex64::new(0.0, 1.0 - weight);
                padded.push(permittivity.sqrt());
            }
        }
    }
    (padded, padded_shape)
}

/// `‖a − b‖₂ / ‖b‖₂`
pub fn relative_error(a: &[Complex64], b: &[Complex64]) -> f64 {
    let diff: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm_sqr())
        .sum::<f64>()
        .sqrt();
    let norm: f64 = b.iter().map(|y| y.norm_sqr()).sum::<f64>().sqrt();
    diff / norm
}
