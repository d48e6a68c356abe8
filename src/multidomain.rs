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

//! Composition of subdomains into one simulation grid
//!
//! A `MultiDomain` tiles the full grid with subdomains, fans every slot
//! operation out to all of them (one worker per subdomain, with a barrier
//! after each primitive) and stitches the tiles together inside the
//! composite `medium` operation: the wrap-around artifacts of each
//! subdomain's periodic FFT are cancelled with its own edge corrections,
//! and the coupling between neighbouring subdomains is restored with
//! their transfer corrections.

use log::debug;
use num_complex::Complex64;
use num_traits::Zero;
use scoped_threadpool::Pool;

use crate::domain::{Domain, EdgeSet};
use crate::error::SolverError;
use crate::helmholtz::HelmholtzDomain;
use crate::maxwell::MaxwellDomain;
use crate::parameters::DomainParameters;
use crate::source::{extract_box, insert_box, Source};

/// Wrap corrections are the subdomain's own edges with opposite faces
/// swapped: the artifact the FFT creates at the low face is the
/// contribution that belongs at the high face, and vice versa.
const OPPOSITE_FACE: [usize; 6] = [1, 0, 3, 2, 5, 4];

/// A full simulation grid decomposed into a 3-D tile of subdomains.
///
/// Construction partitions the refractive-index map, builds one
/// subdomain per tile and runs the shift/scale calibration exactly once;
/// after that the operator set mirrors the per-subdomain one, with
/// `medium` additionally carrying the wrap and transfer corrections.
pub struct MultiDomain {
    domains: Vec<Box<dyn Domain>>,
    n_domains: [usize; 3],
    shape: [usize; 3],
    tile_size: [usize; 3],
    components: usize,
    n_slots: usize,
    scale: Complex64,
    shift: Complex64,
    pool: Pool,
}

fn tile_index(n_domains: [usize; 3], tile: [usize; 3]) -> usize {
    (tile[0] * n_domains[1] + tile[1]) * n_domains[2] + tile[2]
}

fn tile_coordinates(n_domains: [usize; 3], index: usize) -> [usize; 3] {
    let x2 = index % n_domains[2];
    let rest = index / n_domains[2];
    [rest / n_domains[1], rest % n_domains[1], x2]
}

impl MultiDomain {
    /// Build a scalar Helmholtz simulation from a refractive-index map.
    pub fn helmholtz(
        refractive_index: &[Complex64],
        shape: [usize; 3],
        params: &DomainParameters,
    ) -> Result<Self, SolverError> {
        Self::build(refractive_index, shape, 1, params, |slab, tile_shape, params| {
            HelmholtzDomain::new(slab, tile_shape, params)
                .map(|domain| Box::new(domain) as Box<dyn Domain>)
        })
    }

    /// Build a vector Maxwell simulation from a refractive-index map.
    pub fn maxwell(
        refractive_index: &[Complex64],
        shape: [usize; 3],
        params: &DomainParameters,
    ) -> Result<Self, SolverError> {
        Self::build(refractive_index, shape, 3, params, |slab, tile_shape, params| {
            MaxwellDomain::new(slab, tile_shape, params)
                .map(|domain| Box::new(domain) as Box<dyn Domain>)
        })
    }

    fn build<F>(
        refractive_index: &[Complex64],
        shape: [usize; 3],
        components: usize,
        params: &DomainParameters,
        make: F,
    ) -> Result<Self, SolverError>
    where
        F: Fn(Vec<Complex64>, [usize; 3], &DomainParameters) -> Result<Box<dyn Domain>, SolverError>,
    {
        let cells = shape[0] * shape[1] * shape[2];
        if cells == 0 || refractive_index.len() != cells {
            return Err(SolverError::InvalidShape {
                shape,
                len: refractive_index.len(),
                expected: cells,
            });
        }
        if params.n_slots < 2 {
            return Err(SolverError::TooFewSlots {
                n_slots: params.n_slots,
                min: 2,
            });
        }
        let n_domains = params.n_domains;
        for axis in 0..3 {
            if n_domains[axis] == 0 || n_domains[axis] > shape[axis] {
                return Err(SolverError::InvalidParameter {
                    reason: format!(
                        "{} domains along axis {} of length {}",
                        n_domains[axis], axis, shape[axis]
                    ),
                });
            }
            if !params.periodic[axis]
                && params.n_boundary > shape[axis] / n_domains[axis] / 2
            {
                return Err(SolverError::BoundaryTooLarge {
                    axis,
                    n_boundary: params.n_boundary,
                    len: shape[axis] / n_domains[axis],
                });
            }
        }

        // subdomain size ⌈grid/n_domains⌉; the last tile along each axis
        // may be smaller
        let mut tile_size = [0usize; 3];
        for axis in 0..3 {
            tile_size[axis] = (shape[axis] + n_domains[axis] - 1) / n_domains[axis];
        }

        let total = n_domains[0] * n_domains[1] * n_domains[2];
        let mut domains: Vec<Box<dyn Domain>> = Vec::with_capacity(total);
        for index in 0..total {
            let tile = tile_coordinates(n_domains, index);
            let origin = [
                tile[0] * tile_size[0],
                tile[1] * tile_size[1],
                tile[2] * tile_size[2],
            ];
            let size = [
                tile_size[0].min(shape[0] - origin[0]),
                tile_size[1].min(shape[1] - origin[1]),
                tile_size[2].min(shape[2] - origin[2]),
            ];
            let mut slab = extract_box(refractive_index, shape, 1, origin, size);
            for value in slab.iter_mut() {
                *value = *value * *value;
            }
            domains.push(make(slab, size, params)?);
        }

        // two-phase calibration: a shift that centers the scattering
        // potential of all subdomains, then a scale that puts V inside
        // the unit ball and rotates L+V into the right half-plane
        let mut bounds = domains[0].v_bounds();
        for domain in domains.iter().skip(1) {
            let b = domain.v_bounds();
            bounds[0] = bounds[0].min(b[0]);
            bounds[1] = bounds[1].max(b[1]);
            bounds[2] = bounds[2].min(b[2]);
            bounds[3] = bounds[3].max(b[3]);
        }
        let center = Complex64::new(0.5 * (bounds[0] + bounds[1]), 0.5 * (bounds[2] + bounds[3]));
        let mut v_scat_norm = 0.0f64;
        let mut v_wrap_norm = 0.0f64;
        for domain in domains.iter_mut() {
            v_scat_norm = v_scat_norm.max(domain.initialize_shift(center));
            v_wrap_norm = v_wrap_norm.max(domain.wrap_norm());
        }
        let norm = v_scat_norm + v_wrap_norm;
        let scale = if norm > 0.0 {
            Complex64::new(0.0, 0.95) / norm
        } else {
            // uniform potential: V vanishes after the shift and any
            // accretive-making rotation works
            Complex64::new(0.0, 0.95)
        };
        for domain in domains.iter_mut() {
            domain.initialize_scale(scale);
        }
        debug!(
            "calibrated {} subdomain(s): shift {:.4e}{:+.4e}i, scale {:.4e}{:+.4e}i, |V| {:.3}, |Vwrap| {:.3}",
            total, center.re, center.im, scale.re, scale.im, v_scat_norm, v_wrap_norm
        );

        Ok(Self {
            domains,
            n_domains,
            shape,
            tile_size,
            components,
            n_slots: params.n_slots,
            scale,
            shift: center,
            pool: Pool::new(params.num_threads.max(1) as u32),
        })
    }

    /// Full grid shape.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Field components per grid point (1 for Helmholtz, 3 for Maxwell).
    pub fn components(&self) -> usize {
        self.components
    }

    /// Scratch slots per subdomain.
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Calibration scale factor.
    pub fn scale(&self) -> Complex64 {
        self.scale
    }

    /// Calibration shift.
    pub fn shift(&self) -> Complex64 {
        self.shift
    }

    /// Subdomain tile counts per axis.
    pub fn n_domains(&self) -> [usize; 3] {
        self.n_domains
    }

    /// The subdomains, in row-major tile order.
    pub fn domains(&self) -> &[Box<dyn Domain>] {
        &self.domains
    }

    fn tile_origin(&self, tile: [usize; 3]) -> [usize; 3] {
        [
            tile[0] * self.tile_size[0],
            tile[1] * self.tile_size[1],
            tile[2] * self.tile_size[2],
        ]
    }

    fn tile_shape(&self, tile: [usize; 3]) -> [usize; 3] {
        let origin = self.tile_origin(tile);
        [
            self.tile_size[0].min(self.shape[0] - origin[0]),
            self.tile_size[1].min(self.shape[1] - origin[1]),
            self.tile_size[2].min(self.shape[2] - origin[2]),
        ]
    }

    /// Run `f` on every subdomain, concurrently when more than one worker
    /// is available. The call returns when all subdomains are done, which
    /// is the barrier between consecutive primitives.
    fn fan_out<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut dyn Domain) + Sync,
    {
        let MultiDomain { pool, domains, .. } = self;
        if pool.thread_count() < 2 || domains.len() == 1 {
            for (index, domain) in domains.iter_mut().enumerate() {
                f(index, domain.as_mut());
            }
        } else {
            let f = &f;
            pool.scoped(|scope| {
                for (index, domain) in domains.iter_mut().enumerate() {
                    scope.execute(move || f(index, domain.as_mut()));
                }
            });
        }
    }

    /// Zero a slot on every subdomain.
    pub fn clear(&mut self, slot: usize) {
        self.fan_out(|_, domain| domain.clear(slot));
    }

    /// `slot += weight · source` on every subdomain that holds a piece of
    /// the source.
    pub fn add_source(&mut self, slot: usize, weight: Complex64) {
        self.fan_out(|_, domain| domain.add_source(slot, weight));
    }

    /// `slot_out = weight_a·slot_a + weight_b·slot_b` on every subdomain.
    pub fn mix(
        &mut self,
        weight_a: f64,
        slot_a: usize,
        weight_b: f64,
        slot_b: usize,
        slot_out: usize,
    ) {
        self.fan_out(|_, domain| domain.mix(weight_a, slot_a, weight_b, slot_b, slot_out));
    }

    /// Apply `(L+1)⁻¹` on every subdomain.
    pub fn propagator(&mut self, slot_in: usize, slot_out: usize) {
        self.fan_out(|_, domain| domain.propagator(slot_in, slot_out));
    }

    /// Apply `(L+1)` on every subdomain.
    pub fn inverse_propagator(&mut self, slot_in: usize, slot_out: usize) {
        self.fan_out(|_, domain| domain.inverse_propagator(slot_in, slot_out));
    }

    /// Apply the medium operator `B`, including the wrap and transfer
    /// corrections.
    ///
    /// The four phases run in a fixed partial order: every subdomain
    /// computes its edge corrections from `slot_in`, then applies its
    /// local `B`, then the edges are exchanged and applied to `slot_out`.
    pub fn medium(&mut self, slot_in: usize, slot_out: usize) {
        self.fan_out(|_, domain| domain.compute_corrections(slot_in));
        self.fan_out(|_, domain| domain.medium(slot_in, slot_out));

        let all_edges: Vec<EdgeSet> = self
            .domains
            .iter()
            .map(|domain| domain.edges().clone())
            .collect();
        let n_domains = self.n_domains;
        let edges = &all_edges;
        self.fan_out(|index, domain| {
            let tile = tile_coordinates(n_domains, index);
            let own = &edges[index];
            let mut wrap: [Option<&[Complex64]>; 6] = [None; 6];
            for face in 0..6 {
                wrap[face] = own[OPPOSITE_FACE[face]].as_deref();
            }
            // each neighbour contributes its facing edge: the neighbour
            // on the low side donates its high-face slab, and vice versa
            let mut transfer: [Option<&[Complex64]>; 6] = [None; 6];
            for face in 0..6 {
                let axis = face / 2;
                let mut neighbour = tile;
                if face % 2 == 0 {
                    if tile[axis] == 0 {
                        continue;
                    }
                    neighbour[axis] -= 1;
                } else {
                    if tile[axis] + 1 == n_domains[axis] {
                        continue;
                    }
                    neighbour[axis] += 1;
                }
                let donor = tile_index(n_domains, neighbour);
                transfer[face] = edges[donor][OPPOSITE_FACE[face]].as_deref();
            }
            domain.apply_corrections(&wrap, &transfer, slot_out);
        });
    }

    /// Global inner product `Σ conj(a)·b` over the whole grid.
    pub fn inner_product(&mut self, slot_a: usize, slot_b: usize) -> Complex64 {
        self.inner_products(slot_a, slot_b)
            .into_iter()
            .fold(Complex64::zero(), |acc, p| acc + p)
    }

    /// Per-subdomain partial inner products, in tile order.
    pub fn inner_products(&mut self, slot_a: usize, slot_b: usize) -> Vec<Complex64> {
        let mut partials = vec![Complex64::zero(); self.domains.len()];
        let MultiDomain { pool, domains, .. } = self;
        if pool.thread_count() < 2 || domains.len() == 1 {
            for (domain, out) in domains.iter().zip(partials.iter_mut()) {
                *out = domain.inner_product(slot_a, slot_b);
            }
        } else {
            pool.scoped(|scope| {
                for (domain, out) in domains.iter().zip(partials.iter_mut()) {
                    scope.execute(move || *out = domain.inner_product(slot_a, slot_b));
                }
            });
        }
        partials
    }

    /// Split a source into subdomain-shaped pieces; tiles without any
    /// source data get `None`.
    pub fn partition(&self, source: &Source) -> Vec<Option<Source>> {
        (0..self.domains.len())
            .map(|index| {
                let tile = tile_coordinates(self.n_domains, index);
                source.restrict(
                    self.tile_origin(tile),
                    self.tile_shape(tile),
                    source.components(),
                )
            })
            .collect()
    }

    /// Partition the source over the subdomains and store it.
    pub fn set_source(&mut self, source: &Source) -> Result<(), SolverError> {
        if source.shape() != self.shape {
            return Err(SolverError::SourceShapeMismatch {
                got: source.shape(),
                expected: self.shape,
            });
        }
        if source.components() > self.components {
            return Err(SolverError::InvalidParameter {
                reason: format!(
                    "source has {} components, the field has {}",
                    source.components(),
                    self.components
                ),
            });
        }
        let parts = self.partition(source);
        for (domain, part) in self.domains.iter_mut().zip(parts) {
            domain.set_source(part);
        }
        Ok(())
    }

    /// Gather a slot from all subdomains into one full-grid buffer
    /// (component-major).
    pub fn get(&self, slot: usize) -> Vec<Complex64> {
        let cells = self.shape[0] * self.shape[1] * self.shape[2];
        let mut full = vec![Complex64::zero(); self.components * cells];
        for (index, domain) in self.domains.iter().enumerate() {
            let tile = tile_coordinates(self.n_domains, index);
            insert_box(
                &mut full,
                self.shape,
                self.components,
                self.tile_origin(tile),
                self.tile_shape(tile),
                domain.get(slot),
            );
        }
        full
    }

    /// Scatter a full-grid buffer (component-major) over the subdomains.
    pub fn set(&mut self, slot: usize, data: &[Complex64]) -> Result<(), SolverError> {
        let cells = self.shape[0] * self.shape[1] * self.shape[2];
        let expected = self.components * cells;
        if data.len() != expected {
            return Err(SolverError::InvalidShape {
                shape: self.shape,
                len: data.len(),
                expected,
            });
        }
        for (index, domain) in self.domains.iter_mut().enumerate() {
            let tile = tile_coordinates(self.n_domains, index);
            let origin = [
                tile[0] * self.tile_size[0],
                tile[1] * self.tile_size[1],
                tile[2] * self.tile_size[2],
            ];
            let size = [
                self.tile_size[0].min(self.shape[0] - origin[0]),
                self.tile_size[1].min(self.shape[1] - origin[1]),
                self.tile_size[2].min(self.shape[2] - origin[2]),
            ];
            let slab = extract_box(data, self.shape, self.components, origin, size);
            domain.set(slot, &slab);
        }
        Ok(())
    }
}
