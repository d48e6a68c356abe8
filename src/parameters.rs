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

//! Configuration of the simulation grid and of the iteration

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Parameters describing the simulation grid and its decomposition into
/// subdomains.
#[derive(Clone)]
pub struct DomainParameters {
    /// Grid spacing in wavelength units
    pub pixel_size: f64,
    /// Wavelength in the units of the coordinate axes. When `None`, the
    /// wavenumber is taken as `k₀ = 2π·pixel_size`, i.e. the wavelength is
    /// `1/pixel_size` pixels.
    pub wavelength: Option<f64>,
    /// Per-axis periodicity. A periodic axis gets no wrap-around
    /// correction and no transfer correction across its boundary.
    pub periodic: [bool; 3],
    /// Number of subdomains along each axis
    pub n_domains: [usize; 3],
    /// Number of boundary pixels used for the wrap and transfer
    /// corrections. Setting this to 0 disables all corrections.
    pub n_boundary: usize,
    /// Number of scratch slots allocated per subdomain (at least 2; the
    /// bundled iteration driver needs 3)
    pub n_slots: usize,
    /// Number of worker threads driving the subdomains. Subdomain
    /// primitives are fanned out over these workers with a barrier after
    /// each primitive.
    pub num_threads: usize,
}

impl Default for DomainParameters {
    fn default() -> Self {
        Self {
            pixel_size: 0.25,
            wavelength: None,
            periodic: [false, false, false],
            n_domains: [1, 1, 1],
            n_boundary: 8,
            n_slots: 3,
            num_threads: 1,
        }
    }
}

/// Parameters of the preconditioned Richardson iteration.
#[derive(Clone)]
pub struct IterationParameters {
    /// Richardson step size, in (0, 1]
    pub alpha: f64,
    /// Hard cap on the number of iterations
    pub max_iterations: usize,
    /// Convergence threshold on the normalized residual
    pub threshold: f64,
    /// Normalized residual above which the iteration is reported as
    /// diverged
    pub divergence_limit: f64,
    /// Width of the absorbing boundary layers added by the caller, per
    /// axis. The computed field is cropped by this amount on both sides of
    /// each axis before it is returned.
    pub boundary_widths: [usize; 3],
    /// Optional cancellation flag, checked once per iteration after the
    /// residual reduction
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for IterationParameters {
    fn default() -> Self {
        Self {
            alpha: 0.75,
            max_iterations: 1000,
            threshold: 1e-6,
            divergence_limit: 1e6,
            boundary_widths: [0, 0, 0],
            cancel: None,
        }
    }
}
