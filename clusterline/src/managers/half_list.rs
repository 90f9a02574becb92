use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::cell_list::positive_half_space;
use super::{check_built, check_order, offsets_range, pair_atoms, pair_offsets};
use super::{BuildState, ClusterSource, Pair};

/// Adaptor keeping a single canonical direction per undirected pair.
///
/// For two distinct atoms the `i-j` direction with `tag(i) < tag(j)` is
/// kept; for pairs between an atom and its own periodic image the
/// representative with the cell shift in the positive half-space survives.
/// This halves the combinatorial work of downstream stages when full pair
/// symmetry is not needed.
pub struct HalfListAdaptor<M> {
    manager: M,
    pairs: Vec<Pair>,
    pair_atoms: Vec<usize>,
    pair_offsets: Vec<usize>,
    layers: [usize; 2],
    state: BuildState,
}

impl<M: ClusterSource> HalfListAdaptor<M> {
    /// Stack a half list reduction on top of `manager`, which must be a
    /// pair manager.
    pub fn new(manager: M) -> Result<HalfListAdaptor<M>, Error> {
        if manager.max_order() != 2 {
            return Err(Error::Configuration(format!(
                "the half list adaptor expects a pair manager, got one with \
                 max order {}", manager.max_order()
            )));
        }

        let layers = [manager.layer(1)?, manager.layer(2)? + 1];
        return Ok(HalfListAdaptor {
            manager: manager,
            pairs: Vec::new(),
            pair_atoms: Vec::new(),
            pair_offsets: Vec::new(),
            layers: layers,
            state: BuildState::Uninitialized,
        });
    }

    fn update_self(&mut self) -> Result<(), Error> {
        self.pairs.clear();
        for pair in self.manager.pairs()? {
            let first = self.manager.tag(pair.first)?;
            let second = self.manager.tag(pair.second)?;

            let keep = if first == second {
                positive_half_space(pair.cell_shift_indices)
                    || pair.cell_shift_indices == [0, 0, 0]
            } else {
                first < second
            };

            if keep {
                self.pairs.push(*pair);
            }
        }

        self.pair_atoms = pair_atoms(&self.pairs);
        self.pair_offsets = pair_offsets(&self.pairs, self.manager.size_with_ghosts());

        self.state = BuildState::Built;
        return Ok(());
    }
}

impl<M: ClusterSource> ClusterSource for HalfListAdaptor<M> {
    fn size(&self) -> usize {
        self.manager.size()
    }

    fn size_with_ghosts(&self) -> usize {
        self.manager.size_with_ghosts()
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
        self.manager.cutoff()
    }

    fn tag(&self, atom: usize) -> Result<usize, Error> {
        self.manager.tag(atom)
    }

    fn position(&self, atom: usize) -> Result<Vector3D, Error> {
        self.manager.position(atom)
    }

    fn species(&self, atom: usize) -> Result<i32, Error> {
        self.manager.species(atom)
    }

    fn cell_shift(&self, atom: usize) -> Result<[i32; 3], Error> {
        self.manager.cell_shift(atom)
    }

    fn layer(&self, order: usize) -> Result<usize, Error> {
        check_order(2, order)?;
        return Ok(self.layers[order - 1]);
    }

    fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        check_built(self.state, "the half list")?;
        check_order(2, order)?;
        match order {
            1 => self.manager.cluster_count(1),
            _ => Ok(self.pairs.len()),
        }
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the half list")?;
        check_order(2, order)?;
        if order == 1 {
            return self.manager.cluster_atoms(1, index);
        }
        let start = index * 2;
        if start + 2 > self.pair_atoms.len() {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for {} pairs", index, self.pairs.len()
            )));
        }
        return Ok(&self.pair_atoms[start..start + 2]);
    }

    fn pairs(&self) -> Result<&[Pair], Error> {
        check_built(self.state, "the half list")?;
        return Ok(&self.pairs);
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        check_built(self.state, "the half list")?;
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
