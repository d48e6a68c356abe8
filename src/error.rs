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

//! Error type for solver construction and configuration

use thiserror::Error;

/// Configuration errors, raised before any large allocation takes place.
///
/// Divergence and stagnation of the iteration are not errors: they are
/// reported through [`Termination`](crate::Termination) in the solver
/// output.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The refractive index map does not match the declared grid shape
    #[error("refractive index map has {len} values, expected {expected} for shape {shape:?}")]
    InvalidShape {
        shape: [usize; 3],
        len: usize,
        expected: usize,
    },
    /// The boundary correction size exceeds half the subdomain length on a
    /// non-periodic axis
    #[error(
        "boundary correction size {n_boundary} is too large for domain length {len} along axis {axis}"
    )]
    BoundaryTooLarge {
        axis: usize,
        n_boundary: usize,
        len: usize,
    },
    /// Fewer scratch slots than the requested operation needs
    #[error("at least {min} slots are required, got {n_slots}")]
    TooFewSlots { n_slots: usize, min: usize },
    /// The source does not fit the simulation grid
    #[error("source shape {got:?} does not match the grid shape {expected:?}")]
    SourceShapeMismatch {
        got: [usize; 3],
        expected: [usize; 3],
    },
    /// Catch-all for invalid scalar parameters
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}
