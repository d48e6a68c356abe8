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

//! This crate contains an iterative solver for the scalar Helmholtz
//! equation and the vector Maxwell equation on regular 3-D grids, based
//! on the preconditioned modified Born series. The grid can be split
//! into subdomains that are driven concurrently; dense wrap-correction
//! matrices make each subdomain's FFT-based propagator behave as if it
//! were convolved with the non-periodic Green's function, and transfer
//! corrections between neighbouring subdomains keep the decomposed
//! operator equal to the undecomposed one.
//!
//! Usage
//! -----
//! Build a [`MultiDomain`] from a refractive-index map, give it a
//! [`Source`], and run the iteration:
//!
//! ```no_run
//! use num_complex::Complex64;
//! use wavesim::{run_algorithm, DomainParameters, IterationParameters, MultiDomain, Source};
//!
//! // a 1-D homogeneous medium with a point source in the middle
//! let shape = [256, 1, 1];
//! let n = vec![Complex64::new(1.0, 0.0); 256];
//! let params = DomainParameters {
//!     periodic: [true, true, true],
//!     ..DomainParameters::default()
//! };
//! let mut domain = MultiDomain::helmholtz(&n, shape, &params).unwrap();
//! let source = Source::point(shape, [128, 0, 0], 0, Complex64::new(1.0, 0.0)).unwrap();
//! let result = run_algorithm(&mut domain, &source, &IterationParameters::default()).unwrap();
//! println!(
//!     "{:?} in {} iterations, residual {:.2e}",
//!     result.termination, result.iterations, result.residual_norm
//! );
//! ```
//!
//! The caller is expected to pad the refractive-index map with absorbing
//! boundary layers where the simulation should be open; the solver crops
//! the returned field back to the region of interest.

pub mod grid;

mod domain;
mod error;
mod fft;
mod helmholtz;
mod iteration;
mod maxwell;
mod multidomain;
mod parameters;
mod source;

pub use domain::{Domain, EdgeSet};
pub use error::*;
pub use helmholtz::*;
pub use iteration::*;
pub use maxwell::*;
pub use multidomain::*;
pub use parameters::*;
pub use source::Source;
