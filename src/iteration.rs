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

//! The preconditioned Richardson iteration
//!
//! Each update computes `t = B((L+1)⁻¹(B·u + scale·s) − u)` through the
//! slot operations of a [`MultiDomain`] and steps `u ← u − α·t`. The
//! residual `‖t‖`, normalized by the preconditioned source norm
//! `‖B·(L+1)⁻¹·(scale·s)‖`, drives the termination checks.

use std::sync::atomic::Ordering;

use log::{debug, info};
use num_complex::Complex64;

use crate::error::SolverError;
use crate::multidomain::MultiDomain;
use crate::parameters::IterationParameters;
use crate::source::{extract_box, Source};

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The normalized residual dropped below the threshold
    Converged,
    /// The normalized residual exceeded the divergence limit
    Diverged,
    /// The iteration cap was reached without convergence
    MaxIterations,
    /// A cancellation request was observed
    Cancelled,
}

/// Field and diagnostics returned by [`run_algorithm`].
pub struct SolveResult {
    /// Computed field, cropped to the region of interest
    /// (component-major)
    pub field: Vec<Complex64>,
    /// Shape of the cropped field
    pub shape: [usize; 3],
    /// Field components per grid point
    pub components: usize,
    /// Number of iterations performed
    pub iterations: usize,
    /// Last normalized residual
    pub residual_norm: f64,
    /// How the iteration ended
    pub termination: Termination,
    /// Normalized residual after every iteration
    pub residual_history: Vec<f64>,
    /// Normalized residual per subdomain (tile order), one entry per
    /// iteration
    pub subdomain_residuals: Vec<Vec<f64>>,
}

/// One update of the fixed-point iteration, using slots 0 (the field u),
/// 1 and 2.
///
/// When `compute_norm` is set, the per-subdomain inner products
/// `⟨t,t⟩` of the preconditioned residual are returned (empty otherwise);
/// their real parts sum to `‖t‖²` over the full grid.
pub fn preconditioned_iteration(
    domain: &mut MultiDomain,
    alpha: f64,
    compute_norm: bool,
) -> Vec<Complex64> {
    let scale = domain.scale();
    domain.clear(1);
    domain.add_source(1, scale); // [1] = c·s
    domain.medium(0, 2); // [2] = B·u
    domain.mix(1.0, 1, 1.0, 2, 1); // [1] = B·u + c·s
    domain.propagator(1, 1); // [1] = (L+1)⁻¹ (B·u + c·s)
    domain.mix(1.0, 0, -1.0, 1, 2); // [2] = u − [1]
    domain.medium(2, 1); // [1] = B(u − [1])
    let partials = if compute_norm {
        domain.inner_products(1, 1)
    } else {
        Vec::new()
    };
    domain.mix(1.0, 0, -alpha, 1, 0); // u ← u − α·[1]
    partials
}

/// Run the iteration to termination.
///
/// The field starts from zero; to iterate from an existing field, drive
/// [`preconditioned_iteration`] directly. The returned field is cropped
/// by `boundary_widths` on both sides of each axis.
pub fn run_algorithm(
    domain: &mut MultiDomain,
    source: &Source,
    params: &IterationParameters,
) -> Result<SolveResult, SolverError> {
    if domain.n_slots() < 3 {
        return Err(SolverError::TooFewSlots {
            n_slots: domain.n_slots(),
            min: 3,
        });
    }
    let shape = domain.shape();
    for axis in 0..3 {
        if 2 * params.boundary_widths[axis] >= shape[axis] {
            return Err(SolverError::InvalidParameter {
                reason: format!(
                    "boundary width {} leaves no region of interest on axis {} of length {}",
                    params.boundary_widths[axis], axis, shape[axis]
                ),
            });
        }
    }
    domain.set_source(source)?;
    domain.clear(0);

    // norm of the preconditioned source, used to normalize the residual
    domain.clear(1);
    domain.add_source(1, domain.scale());
    domain.propagator(1, 1);
    domain.medium(1, 1);
    let init = domain.inner_product(1, 1).re.max(0.0).sqrt();
    // a zero source leaves nothing to normalize by; fall back to
    // absolute residuals
    let init_norm = if init > 0.0 { init } else { 1.0 };
    debug!("initial preconditioned source norm {:.4e}", init);

    let n_subdomains = domain.domains().len();
    let mut residual_history = Vec::new();
    let mut subdomain_residuals = vec![Vec::new(); n_subdomains];
    let mut termination = Termination::MaxIterations;
    let mut residual_norm = 0.0;
    let mut iterations = 0;

    for iteration in 0..params.max_iterations {
        let partials = preconditioned_iteration(domain, params.alpha, true);
        let norm_sq: f64 = partials.iter().map(|p| p.re.max(0.0)).sum();
        let residual = norm_sq.sqrt() / init_norm;
        residual_history.push(residual);
        for (history, partial) in subdomain_residuals.iter_mut().zip(partials.iter()) {
            history.push(partial.re.max(0.0).sqrt() / init_norm);
        }
        iterations = iteration + 1;
        residual_norm = residual;
        debug!("iteration {}: residual {:.3e}", iterations, residual);

        if !residual.is_finite() || residual >= params.divergence_limit {
            termination = Termination::Diverged;
            break;
        }
        if residual <= params.threshold {
            termination = Termination::Converged;
            break;
        }
        if let Some(cancel) = &params.cancel {
            if cancel.load(Ordering::Relaxed) {
                termination = Termination::Cancelled;
                break;
            }
        }
    }
    info!(
        "{:?} after {} iteration(s), residual {:.3e}",
        termination, iterations, residual_norm
    );

    let full = domain.get(0);
    let widths = params.boundary_widths;
    let roi_shape = [
        shape[0] - 2 * widths[0],
        shape[1] - 2 * widths[1],
        shape[2] - 2 * widths[2],
    ];
    let field = extract_box(
        &full,
        shape,
        domain.components(),
        widths,
        roi_shape,
    );

    Ok(SolveResult {
        field,
        shape: roi_shape,
        components: domain.components(),
        iterations,
        residual_norm,
        termination,
        residual_history,
        subdomain_residuals,
    })
}
