use std::ops::Range;

use indexmap::IndexMap;
use log::warn;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::cell_list::{shift_cartesian, CellList};
use super::{check_built, check_order, offsets_range, pair_atoms, pair_offsets};
use super::{BuildState, ClusterSource, Pair};

/// A periodic image of a real atom, created so that neighbor search near
/// the cell boundaries sees every atom within the cutoff sphere.
///
/// Ghost atoms are owned by the [`NeighborListAdaptor`] that created them
/// and are rebuilt from scratch on every update; downstream stages only
/// ever hold indices into the ghost table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostAtom {
    /// tag of the real atom this ghost is an image of
    pub tag: usize,
    /// species code, copied from the source atom
    pub species: i32,
    /// cartesian position of the image
    pub position: Vector3D,
    /// lattice translation from the source atom to this image
    pub cell_shift: [i32; 3],
}

/// Adaptor producing the full pair list of a structure for a given cutoff
/// radius, including pairs with periodic images.
///
/// Pairs are emitted in both directions (`i-j` and `j-i`), sorted by
/// ascending first atom, then ascending second atom index. An atom can be
/// its own neighbor through a genuine periodic image, but the
/// zero-translation self pair is never created here (see
/// [`super::CenterContributionAdaptor`]).
#[derive(Debug)]
pub struct NeighborListAdaptor<M> {
    manager: M,
    cutoff: f64,
    ghosts: Vec<GhostAtom>,
    /// flat order-1 cluster storage over real and ghost atoms
    atoms: Vec<usize>,
    pairs: Vec<Pair>,
    /// flat order-2 cluster storage (stride 2)
    pair_atoms: Vec<usize>,
    /// per-atom offsets into `pairs`, ghosts included with empty ranges
    pair_offsets: Vec<usize>,
    layers: [usize; 2],
    state: BuildState,
}

impl<M: ClusterSource> NeighborListAdaptor<M> {
    /// Stack a neighbor list with the given cutoff on top of `manager`,
    /// which must not already carry one.
    pub fn new(manager: M, cutoff: f64) -> Result<NeighborListAdaptor<M>, Error> {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(Error::Configuration(format!(
                "expected a positive cutoff for the neighbor list, got {}", cutoff
            )));
        }

        if manager.max_order() != 1 {
            return Err(Error::Configuration(format!(
                "the neighbor list adaptor expects an atoms-only manager, \
                 but the underlying manager already has clusters up to order {}",
                manager.max_order()
            )));
        }

        let layers = [manager.layer(1)? + 1, 0];
        return Ok(NeighborListAdaptor {
            manager: manager,
            cutoff: cutoff,
            ghosts: Vec::new(),
            atoms: Vec::new(),
            pairs: Vec::new(),
            pair_atoms: Vec::new(),
            pair_offsets: Vec::new(),
            layers: layers,
            state: BuildState::Uninitialized,
        });
    }

    /// All ghost atoms created by the last update
    pub fn ghosts(&self) -> &[GhostAtom] {
        &self.ghosts
    }

    /// The cutoff radius of this neighbor list
    pub fn list_cutoff(&self) -> f64 {
        self.cutoff
    }

    #[time_graph::instrument(name = "NeighborListAdaptor::update_self")]
    fn update_self(&mut self) -> Result<(), Error> {
        let n_real = self.manager.size();
        let cell = self.manager.cell();
        let matrix = cell.matrix();

        let mut cell_list = CellList::new(cell, self.cutoff);
        for atom in 0..n_real {
            cell_list.add_atom(atom, self.manager.position(atom)?);
        }

        self.ghosts.clear();
        self.pairs.clear();

        // ghosts are deduplicated by source atom and shift; insertion order
        // is the creation order, which is deterministic for a fixed input
        let mut ghost_indices: IndexMap<(usize, [i32; 3]), usize> = IndexMap::new();

        let cutoff2 = self.cutoff * self.cutoff;
        for candidate in cell_list.candidates() {
            let first_position = self.manager.position(candidate.first)?;
            let mut vector = self.manager.position(candidate.second)? - first_position;
            vector += shift_cartesian(&matrix, candidate.shift);

            let distance2 = vector * vector;
            if distance2 > cutoff2 {
                continue;
            }

            if distance2 < 1e-3 {
                warn!(
                    "atoms {} and {} are very close to one another ({} A)",
                    candidate.first, candidate.second, distance2.sqrt()
                );
            }
            let distance = distance2.sqrt();

            let shift = candidate.shift;
            let opposite = [-shift[0], -shift[1], -shift[2]];

            // i-j direction: the second atom is a ghost whenever the pair
            // crosses the cell boundary
            let second = self.ghost_or_real(&mut ghost_indices, candidate.second, shift, n_real)?;
            self.pairs.push(Pair {
                first: candidate.first,
                second: second,
                distance: distance,
                vector: vector,
                cell_shift_indices: shift,
            });

            // j-i direction, with the opposite shift applied to the first
            // atom instead
            let second = self.ghost_or_real(&mut ghost_indices, candidate.first, opposite, n_real)?;
            self.pairs.push(Pair {
                first: candidate.second,
                second: second,
                distance: distance,
                vector: -vector,
                cell_shift_indices: opposite,
            });
        }

        // the shift participates in the sort key to keep the output stable
        // when the same two atoms are neighbors through multiple images
        self.pairs.sort_unstable_by_key(|pair| {
            (pair.first, pair.second, pair.cell_shift_indices)
        });

        let n_total = n_real + self.ghosts.len();
        self.atoms.clear();
        self.atoms.extend(0..n_total);
        self.pair_atoms = pair_atoms(&self.pairs);
        self.pair_offsets = pair_offsets(&self.pairs, n_total);

        self.state = BuildState::Built;
        return Ok(());
    }

    /// Resolve the atom index standing for `atom` translated by `shift`:
    /// the atom itself for a zero shift, a (possibly new) ghost otherwise.
    fn ghost_or_real(
        &mut self,
        ghost_indices: &mut IndexMap<(usize, [i32; 3]), usize>,
        atom: usize,
        shift: [i32; 3],
        n_real: usize,
    ) -> Result<usize, Error> {
        if shift == [0, 0, 0] {
            return Ok(atom);
        }

        let tag = self.manager.tag(atom)?;
        if let Some(&index) = ghost_indices.get(&(tag, shift)) {
            return Ok(index);
        }

        let position = self.manager.position(atom)? + shift_cartesian(&self.manager.cell().matrix(), shift);
        let ghost = GhostAtom {
            tag: tag,
            species: self.manager.species(atom)?,
            position: position,
            cell_shift: shift,
        };

        let index = n_real + self.ghosts.len();
        self.ghosts.push(ghost);
        ghost_indices.insert((tag, shift), index);
        return Ok(index);
    }

    fn ghost(&self, atom: usize) -> Result<&GhostAtom, Error> {
        check_built(self.state, "the neighbor list")?;
        self.ghosts.get(atom - self.manager.size()).ok_or_else(|| Error::Index(format!(
            "atom index {} is out of bounds for {} atoms",
            atom, self.size_with_ghosts()
        )))
    }
}

impl<M: ClusterSource> ClusterSource for NeighborListAdaptor<M> {
    fn size(&self) -> usize {
        self.manager.size()
    }

    fn size_with_ghosts(&self) -> usize {
        self.manager.size() + self.ghosts.len()
    }

    fn max_order(&self) -> usize {
        2
    }

    fn cell(&self) -> UnitCell {
        self.manager.cell()
    }

    fn state(&self) -> BuildState {
        self.state
    }

    fn cutoff(&self) -> Option<f64> {
        Some(self.cutoff)
    }

    fn tag(&self, atom: usize) -> Result<usize, Error> {
        if atom < self.manager.size() {
            return self.manager.tag(atom);
        }
        return Ok(self.ghost(atom)?.tag);
    }

    fn position(&self, atom: usize) -> Result<Vector3D, Error> {
        if atom < self.manager.size() {
            return self.manager.position(atom);
        }
        return Ok(self.ghost(atom)?.position);
    }

    fn species(&self, atom: usize) -> Result<i32, Error> {
        if atom < self.manager.size() {
            return self.manager.species(atom);
        }
        return Ok(self.ghost(atom)?.species);
    }

    fn cell_shift(&self, atom: usize) -> Result<[i32; 3], Error> {
        if atom < self.manager.size() {
            return self.manager.cell_shift(atom);
        }
        return Ok(self.ghost(atom)?.cell_shift);
    }

    fn layer(&self, order: usize) -> Result<usize, Error> {
        check_order(2, order)?;
        return Ok(self.layers[order - 1]);
    }

    fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        check_built(self.state, "the neighbor list")?;
        check_order(2, order)?;
        match order {
            1 => Ok(self.atoms.len()),
            _ => Ok(self.pairs.len()),
        }
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the neighbor list")?;
        check_order(2, order)?;
        let (storage, stride) = match order {
            1 => (&self.atoms, 1),
            _ => (&self.pair_atoms, 2),
        };
        let start = index * stride;
        if start + stride > storage.len() {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for {} clusters of order {}",
                index, storage.len() / stride, order
            )));
        }
        return Ok(&storage[start..start + stride]);
    }

    fn pairs(&self) -> Result<&[Pair], Error> {
        check_built(self.state, "the neighbor list")?;
        return Ok(&self.pairs);
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        check_built(self.state, "the neighbor list")?;
        check_order(2, order)?;
        if order != 1 {
            return Err(Error::Index(
                "this manager has no clusters above order 2, stack a max \
                 order adaptor to extend pairs".into()
            ));
        }
        return offsets_range(&self.pair_offsets, index);
    }

    fn update(&mut self, structure: Option<Structure>) -> Result<(), Error> {
        self.state = BuildState::Stale;
        self.manager.update(structure)?;
        return self.update_self();
    }
}
