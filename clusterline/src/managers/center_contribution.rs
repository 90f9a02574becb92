use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::{check_built, check_order, offsets_range, pair_atoms, pair_offsets};
use super::{BuildState, ClusterSource, Pair};

/// Adaptor inserting the `(i, i)` self pair for every real atom, with zero
/// translation and zero distance.
///
/// Calculators with a central-atom self term iterate these pairs exactly
/// like any other; the upstream pair set is passed through unchanged.
pub struct CenterContributionAdaptor<M> {
    manager: M,
    pairs: Vec<Pair>,
    pair_atoms: Vec<usize>,
    pair_offsets: Vec<usize>,
    layers: [usize; 2],
    state: BuildState,
}

impl<M: ClusterSource> CenterContributionAdaptor<M> {
    /// Stack self pair insertion on top of `manager`, which must be a pair
    /// manager.
    pub fn new(manager: M) -> Result<CenterContributionAdaptor<M>, Error> {
        if manager.max_order() != 2 {
            return Err(Error::Configuration(format!(
                "the center contribution adaptor expects a pair manager, got \
                 one with max order {}", manager.max_order()
            )));
        }

        let layers = [manager.layer(1)?, manager.layer(2)? + 1];
        return Ok(CenterContributionAdaptor {
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
        self.pairs.extend_from_slice(self.manager.pairs()?);
        for atom in 0..self.manager.size() {
            self.pairs.push(Pair {
                first: atom,
                second: atom,
                distance: 0.0,
                vector: Vector3D::zero(),
                cell_shift_indices: [0, 0, 0],
            });
        }

        self.pairs.sort_unstable_by_key(|pair| {
            (pair.first, pair.second, pair.cell_shift_indices)
        });

        self.pair_atoms = pair_atoms(&self.pairs);
        self.pair_offsets = pair_offsets(&self.pairs, self.manager.size_with_ghosts());

        self.state = BuildState::Built;
        return Ok(());
    }
}

impl<M: ClusterSource> ClusterSource for CenterContributionAdaptor<M> {
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
        check_built(self.state, "the center contribution list")?;
        check_order(2, order)?;
        match order {
            1 => self.manager.cluster_count(1),
            _ => Ok(self.pairs.len()),
        }
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the center contribution list")?;
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
        check_built(self.state, "the center contribution list")?;
        return Ok(&self.pairs);
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        check_built(self.state, "the center contribution list")?;
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

#[cfg(test)]
mod tests {
    use crate::managers::{NeighborListAdaptor, RootManager};
    use super::*;

    #[test]
    fn self_pairs_for_real_atoms_only() {
        let mut structure = Structure::new(UnitCell::cubic(3.0).unwrap());
        structure.add_atom(1, Vector3D::new(0.0, 0.0, 0.0));
        structure.add_atom(8, Vector3D::new(1.5, 1.5, 1.5));

        let list = NeighborListAdaptor::new(RootManager::new(structure), 2.7).unwrap();
        let mut with_self = CenterContributionAdaptor::new(list).unwrap();
        with_self.update(None).unwrap();

        let upstream = with_self.manager.pairs().unwrap().len();
        let pairs = with_self.pairs().unwrap();
        // one self pair per real atom, ghosts get none
        assert_eq!(pairs.len(), upstream + 2);

        let self_pairs: Vec<_> = pairs.iter().filter(|p| p.first == p.second).collect();
        assert_eq!(self_pairs.len(), 2);
        for pair in self_pairs {
            assert!(pair.first < with_self.size());
            assert_eq!(pair.distance, 0.0);
            assert_eq!(pair.cell_shift_indices, [0, 0, 0]);
        }

        // pairs stay sorted by (first, second) with the insertions
        let sorted = pairs.windows(2).all(|w| {
            (w[0].first, w[0].second) <= (w[1].first, w[1].second)
        });
        assert!(sorted);
    }
}
