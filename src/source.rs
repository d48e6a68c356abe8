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

//! Source terms and their partitioning over subdomains
//!
//! A source is either a dense volume (component-major, like the field
//! slots) or a coordinate-sparse set of points. After partitioning, a
//! subdomain whose share of the source is empty gets `None` so it can
//! skip `add_source` entirely.

use num_complex::Complex64;
use num_traits::Zero;

use crate::error::SolverError;

/// A dense or coordinate-sparse source of the field shape.
///
/// For Maxwell simulations the source carries one volume per polarization
/// component; for Helmholtz `components == 1`.
#[derive(Clone)]
pub enum Source {
    /// Full volume, `components·nx·ny·nz` values, component-major
    Dense {
        shape: [usize; 3],
        components: usize,
        values: Vec<Complex64>,
    },
    /// Sparse points `[x, y, z, component]` with one value per point
    Coo {
        shape: [usize; 3],
        components: usize,
        indices: Vec<[usize; 4]>,
        values: Vec<Complex64>,
    },
}

impl Source {
    /// Dense source from a component-major value buffer.
    pub fn dense(
        shape: [usize; 3],
        components: usize,
        values: Vec<Complex64>,
    ) -> Result<Self, SolverError> {
        let expected = components * shape[0] * shape[1] * shape[2];
        if values.len() != expected {
            return Err(SolverError::InvalidShape {
                shape,
                len: values.len(),
                expected,
            });
        }
        Ok(Source::Dense {
            shape,
            components,
            values,
        })
    }

    /// Coordinate-sparse source.
    pub fn coo(
        shape: [usize; 3],
        components: usize,
        indices: Vec<[usize; 4]>,
        values: Vec<Complex64>,
    ) -> Result<Self, SolverError> {
        if indices.len() != values.len() {
            return Err(SolverError::InvalidParameter {
                reason: format!(
                    "sparse source has {} indices but {} values",
                    indices.len(),
                    values.len()
                ),
            });
        }
        for index in &indices {
            let in_bounds = index[0] < shape[0]
                && index[1] < shape[1]
                && index[2] < shape[2]
                && index[3] < components;
            if !in_bounds {
                return Err(SolverError::InvalidParameter {
                    reason: format!("sparse source index {:?} outside shape {:?}", index, shape),
                });
            }
        }
        Ok(Source::Coo {
            shape,
            components,
            indices,
            values,
        })
    }

    /// Single point source.
    pub fn point(
        shape: [usize; 3],
        position: [usize; 3],
        component: usize,
        value: Complex64,
    ) -> Result<Self, SolverError> {
        Self::coo(
            shape,
            component + 1,
            vec![[position[0], position[1], position[2], component]],
            vec![value],
        )
    }

    pub fn shape(&self) -> [usize; 3] {
        match self {
            Source::Dense { shape, .. } | Source::Coo { shape, .. } => *shape,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            Source::Dense { components, .. } | Source::Coo { components, .. } => *components,
        }
    }

    /// A source whose values all vanish behaves like no source at all.
    pub fn is_zero(&self) -> bool {
        match self {
            Source::Dense { values, .. } | Source::Coo { values, .. } => {
                values.iter().all(|v| v.is_zero())
            }
        }
    }

    /// Restrict the source to a subdomain box, re-basing coordinates to
    /// the box origin. Returns `None` when nothing of the source falls
    /// inside the box (or the restriction is identically zero).
    pub(crate) fn restrict(
        &self,
        origin: [usize; 3],
        size: [usize; 3],
        components: usize,
    ) -> Option<Source> {
        match self {
            Source::Dense { shape, values, .. } => {
                let part = extract_box(values, *shape, components, origin, size);
                if part.iter().all(|v| v.is_zero()) {
                    None
                } else {
                    Some(Source::Dense {
                        shape: size,
                        components,
                        values: part,
                    })
                }
            }
            Source::Coo {
                indices, values, ..
            } => {
                let mut part_indices = Vec::new();
                let mut part_values = Vec::new();
                for (index, value) in indices.iter().zip(values.iter()) {
                    let inside = (0..3).all(|d| {
                        index[d] >= origin[d] && index[d] < origin[d] + size[d]
                    });
                    if inside && !value.is_zero() {
                        part_indices.push([
                            index[0] - origin[0],
                            index[1] - origin[1],
                            index[2] - origin[2],
                            index[3],
                        ]);
                        part_values.push(*value);
                    }
                }
                if part_indices.is_empty() {
                    None
                } else {
                    Some(Source::Coo {
                        shape: size,
                        components,
                        indices: part_indices,
                        values: part_values,
                    })
                }
            }
        }
    }
}

/// Copy a box out of a component-major volume.
pub(crate) fn extract_box(
    values: &[Complex64],
    shape: [usize; 3],
    components: usize,
    origin: [usize; 3],
    size: [usize; 3],
) -> Vec<Complex64> {
    let [_, ny, nz] = shape;
    let cells = shape[0] * ny * nz;
    let mut out = Vec::with_capacity(components * size[0] * size[1] * size[2]);
    for comp in 0..components {
        let volume = &values[comp * cells..(comp + 1) * cells];
        for x in origin[0]..origin[0] + size[0] {
            for y in origin[1]..origin[1] + size[1] {
                let row = (x * ny + y) * nz + origin[2];
                out.extend_from_slice(&volume[row..row + size[2]]);
            }
        }
    }
    out
}

/// Copy a box into a component-major volume (inverse of [`extract_box`]).
pub(crate) fn insert_box(
    values: &mut [Complex64],
    shape: [usize; 3],
    components: usize,
    origin: [usize; 3],
    size: [usize; 3],
    part: &[Complex64],
) {
    let [_, ny, nz] = shape;
    let cells = shape[0] * ny * nz;
    let part_cells = size[0] * size[1] * size[2];
    for comp in 0..components {
        let volume = &mut values[comp * cells..(comp + 1) * cells];
        let part_volume = &part[comp * part_cells..(comp + 1) * part_cells];
        let mut read = 0;
        for x in origin[0]..origin[0] + size[0] {
            for y in origin[1]..origin[1] + size[1] {
                let row = (x * ny + y) * nz + origin[2];
                volume[row..row + size[2]].copy_from_slice(&part_volume[read..read + size[2]]);
                read += size[2];
            }
        }
    }
}
