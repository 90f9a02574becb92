use ndarray::Array3;

use crate::{Matrix3, UnitCell, Vector3D};

/// Upper bound on the total number of bins, so that a small unit cell with
/// a large cutoff does not allocate an unbounded grid.
const MAX_NUMBER_OF_BINS: f64 = 1e5;

/// Express an integer cell shift in cartesian coordinates, using the cell
/// matrix (row major, one cell vector per row).
pub(crate) fn shift_cartesian(cell: &Matrix3, shift: [i32; 3]) -> Vector3D {
    let a = Vector3D::from(cell[0]);
    let b = Vector3D::from(cell[1]);
    let c = Vector3D::from(cell[2]);
    return a * f64::from(shift[0]) + b * f64::from(shift[1]) + c * f64::from(shift[2]);
}

/// Candidate pair produced by the cell list. The distance still has to be
/// checked: the grid search over-approximates the cutoff sphere.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CandidatePair {
    pub first: usize,
    pub second: usize,
    /// cell shift to apply to the second atom
    pub shift: [i32; 3],
}

/// An atom sorted into a bin, together with the shift wrapping it back
/// inside the unit cell.
#[derive(Debug, Clone)]
struct BinnedAtom {
    index: usize,
    shift: [i32; 3],
}

/// Grid of bins over the unit cell, sized so that all neighbors below the
/// cutoff of an atom live in a bounded number of surrounding bins. This
/// keeps the candidate search at O(N) on average instead of the O(N²) of a
/// direct double loop.
#[derive(Debug, Clone)]
pub(crate) struct CellList {
    /// number of bins to search in each direction around an atom's bin so
    /// that the full cutoff sphere is covered
    n_search: [i32; 3],
    bins: Array3<Vec<BinnedAtom>>,
    cell: UnitCell,
}

impl CellList {
    /// Create an empty cell list for the given cell and cutoff.
    pub fn new(cell: UnitCell, cutoff: f64) -> CellList {
        let distances_between_faces = if cell.is_infinite() {
            // pseudo cell of size one; `n_search` below still covers the
            // cutoff sphere
            Vector3D::new(1.0, 1.0, 1.0)
        } else {
            cell.distances_between_faces()
        };

        let mut n_bins = [
            f64::max(f64::trunc(distances_between_faces[0] / cutoff), 1.0),
            f64::max(f64::trunc(distances_between_faces[1] / cutoff), 1.0),
            f64::max(f64::trunc(distances_between_faces[2] / cutoff), 1.0),
        ];

        let n_bins_total = n_bins[0] * n_bins[1] * n_bins[2];
        if n_bins_total > MAX_NUMBER_OF_BINS {
            // rescale down to the maximum, keeping the ratios between the
            // directions roughly constant
            let ratio_x_y = n_bins[0] / n_bins[1];
            let ratio_y_z = n_bins[1] / n_bins[2];

            n_bins[2] = f64::trunc(f64::cbrt(MAX_NUMBER_OF_BINS / (ratio_x_y * ratio_y_z * ratio_y_z)));
            n_bins[1] = f64::trunc(ratio_y_z * n_bins[2]);
            n_bins[0] = f64::trunc(ratio_x_y * n_bins[1]);
        }

        let mut n_search = [
            f64::ceil(cutoff * n_bins[0] / distances_between_faces[0]) as i32,
            f64::ceil(cutoff * n_bins[1] / distances_between_faces[1]) as i32,
            f64::ceil(cutoff * n_bins[2] / distances_between_faces[2]) as i32,
        ];

        let n_bins = [n_bins[0] as usize, n_bins[1] as usize, n_bins[2] as usize];

        for xyz in 0..3 {
            if n_search[xyz] < 1 {
                n_search[xyz] = 1;
            }

            // a single bin without periodic boundaries has no neighboring
            // bins to search
            if n_bins[xyz] == 1 && cell.is_infinite() {
                n_search[xyz] = 0;
            }
        }

        CellList {
            n_search: n_search,
            bins: Array3::from_elem(n_bins, Vec::new()),
            cell: cell,
        }
    }

    /// Add the atom with the given index and position to the list.
    pub fn add_atom(&mut self, index: usize, position: Vector3D) {
        let fractional = if self.cell.is_infinite() {
            position
        } else {
            self.cell.fractional(position)
        };

        let shape = self.bins.shape();
        let n_bins = [shape[0], shape[1], shape[2]];

        let bin = [
            f64::floor(fractional[0] * n_bins[0] as f64) as i32,
            f64::floor(fractional[1] * n_bins[1] as f64) as i32,
            f64::floor(fractional[2] * n_bins[2] as f64) as i32,
        ];

        // atoms outside the cell are wrapped back inside, recording the
        // shift needed to do so
        let (shift, bin) = if self.cell.is_infinite() {
            let bin = [
                usize::clamp(bin[0].max(0) as usize, 0, n_bins[0] - 1),
                usize::clamp(bin[1].max(0) as usize, 0, n_bins[1] - 1),
                usize::clamp(bin[2].max(0) as usize, 0, n_bins[2] - 1),
            ];
            ([0, 0, 0], bin)
        } else {
            divmod_3(bin, n_bins)
        };

        self.bins[bin].push(BinnedAtom {
            index: index,
            shift: shift,
        });
    }

    /// Enumerate candidate pairs, one per undirected pair of atom images.
    ///
    /// Only candidates with `first <= second` are produced; a pair between
    /// an atom and one of its own periodic images is produced for exactly
    /// one of the two opposite shifts (the one in the positive half-space).
    /// Zero-shift self pairs are never produced.
    pub fn candidates(&self) -> Vec<CandidatePair> {
        let mut candidates = Vec::new();

        let shape = self.bins.shape();
        let n_bins = [shape[0], shape[1], shape[2]];

        for ((bin_x, bin_y, bin_z), bin) in self.bins.indexed_iter() {
            for delta_x in -self.n_search[0]..=self.n_search[0] {
                for delta_y in -self.n_search[1]..=self.n_search[1] {
                    for delta_z in -self.n_search[2]..=self.n_search[2] {
                        let neighbor_bin = [
                            bin_x as i32 + delta_x,
                            bin_y as i32 + delta_y,
                            bin_z as i32 + delta_z,
                        ];
                        let (bin_shift, neighbor_bin) = divmod_3(neighbor_bin, n_bins);

                        for atom_i in bin {
                            for atom_j in &self.bins[neighbor_bin] {
                                if atom_i.index > atom_j.index {
                                    // the other direction is produced when
                                    // the roles of the two bins are swapped
                                    continue;
                                }

                                let shift = [
                                    bin_shift[0] + atom_i.shift[0] - atom_j.shift[0],
                                    bin_shift[1] + atom_i.shift[1] - atom_j.shift[1],
                                    bin_shift[2] + atom_i.shift[2] - atom_j.shift[2],
                                ];
                                let shift_is_zero = shift == [0, 0, 0];

                                if atom_i.index == atom_j.index {
                                    if shift_is_zero {
                                        // an atom is never a zero-shift
                                        // neighbor of itself
                                        continue;
                                    }

                                    if !positive_half_space(shift) {
                                        // the search visits self-image pairs
                                        // once per opposite shift (e.g.
                                        // [0, 1, 1] and [0, -1, -1]), keep a
                                        // single representative
                                        continue;
                                    }
                                }

                                if self.cell.is_infinite() && !shift_is_zero {
                                    // no pairs across the boundaries of an
                                    // infinite cell
                                    continue;
                                }

                                candidates.push(CandidatePair {
                                    first: atom_i.index,
                                    second: atom_j.index,
                                    shift: shift,
                                });
                            }
                        }
                    }
                }
            }
        }

        return candidates;
    }
}

/// Select one representative out of two opposite cell shifts: the one in
/// the strictly positive half-space, breaking ties on the boundary plane
/// by the sign of the last non-zero component.
pub(crate) fn positive_half_space(shift: [i32; 3]) -> bool {
    let sum = shift[0] + shift[1] + shift[2];
    if sum != 0 {
        return sum > 0;
    }
    if shift[2] != 0 {
        return shift[2] > 0;
    }
    if shift[1] != 0 {
        return shift[1] > 0;
    }
    return shift[0] > 0;
}

/// Quotient and remainder of `a / b` with the remainder always in
/// `0..b` (python-style division).
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}

/// [`divmod`] applied to all three components of a bin index
fn divmod_3(a: [i32; 3], b: [usize; 3]) -> ([i32; 3], [usize; 3]) {
    let (qx, rx) = divmod(a[0], b[0]);
    let (qy, ry) = divmod(a[1], b[1]);
    let (qz, rz) = divmod(a[2], b[2]);
    return ([qx, qy, qz], [rx, ry, rz]);
}
