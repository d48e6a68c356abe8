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

//! Grid coordinate axes and Laplace kernel construction
//!
//! All functions here are pure: they take an axis length and a grid
//! spacing and return one axis worth of data. The 3-D kernels used by the
//! subdomains are assembled from these per-axis results.

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Signed FFT index: `0, 1, …, ⌈n/2⌉−1, −⌊n/2⌋, …, −1`.
#[inline(always)]
fn fft_wrap(m: usize, n: usize) -> i64 {
    if m < (n + 1) / 2 {
        m as i64
    } else {
        m as i64 - n as i64
    }
}

/// Fourier-space coordinates of an axis: `p[m] = 2π·wrap(m)/(n·pixel_size)`.
pub fn coordinates_f(n: usize, pixel_size: f64) -> Vec<f64> {
    let step = 2.0 * PI / (pixel_size * n as f64);
    (0..n).map(|m| fft_wrap(m, n) as f64 * step).collect()
}

/// Real-space coordinates of a periodic axis: `x[m] = wrap(m)·pixel_size`,
/// so that the second half of the axis carries negative coordinates.
pub fn coordinates_periodic(n: usize, pixel_size: f64) -> Vec<f64> {
    (0..n)
        .map(|m| fft_wrap(m, n) as f64 * pixel_size)
        .collect()
}

/// Real-space kernel of the exact (band-limited) operator `−∂²` along one
/// axis, sampled on the periodic grid.
///
/// The kernel is the second derivative of the sinc interpolant evaluated
/// at the grid points,
/// `k(x) = 2cos(x)/x² − 2sin(x)/x³ + sin(x)/x` with `x = wrap(m)·π` and
/// `k(0) = 1/3`, scaled to units of the grid spacing. Its Fourier symbol
/// is `+p²` (up to the wrap-around artifacts of the truncation, which are
/// exactly what the wrap-correction matrices compensate). An axis of
/// length 1 contributes nothing.
pub fn laplace_kernel_real(n: usize, pixel_size: f64) -> Vec<f64> {
    if n == 1 {
        return vec![0.0];
    }
    let scale = PI * PI / (pixel_size * pixel_size);
    (0..n)
        .map(|m| {
            if m == 0 {
                scale / 3.0
            } else {
                let x = fft_wrap(m, n) as f64 * PI;
                scale * (2.0 * x.cos() / (x * x) - 2.0 * x.sin() / (x * x * x) + x.sin() / x)
            }
        })
        .collect()
}

/// Fourier transform of a per-axis real-space kernel.
///
/// The kernel is even, so its transform is real; the (numerically tiny)
/// imaginary part is discarded.
pub fn laplace_kernel_fourier(real_kernel: &[f64]) -> Vec<f64> {
    let n = real_kernel.len();
    if n == 1 {
        return vec![0.0];
    }
    let mut buffer: Vec<Complex64> = real_kernel
        .iter()
        .map(|&k| Complex64::new(k, 0.0))
        .collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);
    buffer.iter().map(|c| c.re).collect()
}

/// Dense wrap-correction matrix for one non-periodic axis.
///
/// Convolving a single-pixel impulse at the far corner of the subdomain
/// with the inverse propagator kernel places the wrap-around artifacts on
/// the opposite faces; the strips of the impulse response that land there
/// are `kernel[(m+1) mod n]`. Packed row-wise this gives
/// `W[r][c] = kernel[n_boundary − r + c]`.
pub fn wrap_matrix(real_kernel: &[f64], n_boundary: usize) -> Vec<f64> {
    let n = real_kernel.len();
    let mut matrix = vec![0.0; n_boundary * n_boundary];
    for r in 0..n_boundary {
        for c in 0..n_boundary {
            matrix[r * n_boundary + c] = real_kernel[(n_boundary - r + c) % n];
        }
    }
    matrix
}

/// Operator 2-norm (largest singular value) of a small dense row-major
/// matrix, by power iteration on `WᵀW`.
pub fn spectral_norm(matrix: &[f64], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let mut x = vec![1.0 / (n as f64).sqrt(); n];
    let mut y = vec![0.0; n];
    let mut lambda = 0.0;
    for _ in 0..50 {
        // y = W·x
        for r in 0..n {
            y[r] = matrix[r * n..(r + 1) * n]
                .iter()
                .zip(x.iter())
                .map(|(w, v)| w * v)
                .sum();
        }
        // x = Wᵀ·y, then normalize; the norm converges to σ_max²
        for c in 0..n {
            x[c] = (0..n).map(|r| matrix[r * n + c] * y[r]).sum();
        }
        lambda = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        if lambda == 0.0 {
            return 0.0;
        }
        for v in x.iter_mut() {
            *v /= lambda;
        }
    }
    lambda.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fourier_coordinates_wrap() {
        let p = coordinates_f(4, 0.5);
        let step = 2.0 * PI / (0.5 * 4.0);
        assert_abs_diff_eq!(p[0], 0.0);
        assert_abs_diff_eq!(p[1], step);
        assert_abs_diff_eq!(p[2], -2.0 * step);
        assert_abs_diff_eq!(p[3], -step);
    }

    #[test]
    fn singleton_axis_contributes_nothing() {
        assert_eq!(laplace_kernel_real(1, 0.25), vec![0.0]);
        assert_eq!(laplace_kernel_fourier(&[0.0]), vec![0.0]);
    }

    #[test]
    fn laplace_kernel_is_even() {
        let kernel = laplace_kernel_real(16, 0.25);
        for m in 1..16 {
            assert_abs_diff_eq!(kernel[m], kernel[16 - m], epsilon = 1e-12);
        }
    }

    #[test]
    fn fourier_kernel_matches_squared_coordinate() {
        // Away from the Nyquist edge the transform of the real-space
        // kernel approximates p² closely; the difference is the wrap
        // artifact that the correction matrices remove.
        let n = 128;
        let pixel_size = 0.25;
        let kernel = laplace_kernel_fourier(&laplace_kernel_real(n, pixel_size));
        let p = coordinates_f(n, pixel_size);
        let m = n / 5;
        let expected = p[m] * p[m];
        assert!((kernel[m] - expected).abs() < 0.01 * expected);
    }

    #[test]
    fn wrap_matrix_entries_index_the_kernel() {
        let kernel: Vec<f64> = (0..32).map(|i| i as f64).collect();
        let nb = 4;
        let w = wrap_matrix(&kernel, nb);
        for r in 0..nb {
            for c in 0..nb {
                assert_eq!(w[r * nb + c], kernel[nb - r + c]);
            }
        }
    }

    #[test]
    fn spectral_norm_of_diagonal() {
        // diag(1, -3, 2) has operator norm 3
        let m = vec![1.0, 0.0, 0.0, 0.0, -3.0, 0.0, 0.0, 0.0, 2.0];
        assert_abs_diff_eq!(spectral_norm(&m, 3), 3.0, epsilon = 1e-10);
    }

    #[test]
    fn spectral_norm_of_zero_matrix() {
        assert_eq!(spectral_norm(&[0.0; 9], 3), 0.0);
    }
}
