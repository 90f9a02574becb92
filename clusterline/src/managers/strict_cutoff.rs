use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::{check_built, check_order, offsets_range, pair_atoms, pair_offsets};
use super::{BuildState, ClusterSource, Pair};

/// Adaptor re-filtering the upstream pair list against an exact cutoff.
///
/// The distance of every pair is recomputed from the current atom
/// positions and pairs above the cutoff are dropped. This guarantees
/// bit-exact cutoff semantics regardless of how loosely the upstream
/// neighbor search over-approximated its candidates.
#[derive(Debug)]
pub struct StrictCutoffAdaptor<M> {
    manager: M,
    cutoff: f64,
    pairs: Vec<Pair>,
    pair_atoms: Vec<usize>,
    pair_offsets: Vec<usize>,
    layers: [usize; 2],
    state: BuildState,
}

impl<M: ClusterSource> StrictCutoffAdaptor<M> {
    /// Stack an exact cutoff filter on top of `manager`, which must be a
    /// pair manager. The cutoff can not exceed the upstream neighbor list
    /// cutoff: pairs the upstream search never produced can not be
    /// recovered here.
    pub fn new(manager: M, cutoff: f64) -> Result<StrictCutoffAdaptor<M>, Error> {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(Error::Configuration(format!(
                "expected a positive cutoff for the strict cutoff filter, got {}",
                cutoff
            )));
        }

        if manager.max_order() != 2 {
            return Err(Error::Configuration(format!(
                "the strict cutoff adaptor expects a pair manager, got one \
                 with max order {}", manager.max_order()
            )));
        }

        if let Some(upstream) = manager.cutoff() {
            if cutoff > upstream {
                return Err(Error::Configuration(format!(
                    "strict cutoff ({}) can not exceed the upstream neighbor \
                     list cutoff ({})", cutoff, upstream
                )));
            }
        }

        let layers = [manager.layer(1)?, manager.layer(2)? + 1];
        return Ok(StrictCutoffAdaptor {
            manager: manager,
            cutoff: cutoff,
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
            // ghost positions already carry their lattice translation, the
            // exact separation is a plain difference of positions
            let vector = self.manager.position(pair.second)? - self.manager.position(pair.first)?;
            let distance = vector.norm();
            if distance <= self.cutoff {
                self.pairs.push(Pair {
                    first: pair.first,
                    second: pair.second,
                    distance: distance,
                    vector: vector,
                    cell_shift_indices: pair.cell_shift_indices,
                });
            }
        }

        self.pair_atoms = pair_atoms(&self.pairs);
        self.pair_offsets = pair_offsets(&self.pairs, self.manager.size_with_ghosts());

        self.state = BuildState::Built;
        return Ok(());
    }
}

impl<M: ClusterSource> ClusterSource for StrictCutoffAdaptor<M> {
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
        Some(self.cutoff)
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
        check_built(self.state, "the strict cutoff list")?;
        check_order(2, order)?;
        match order {
            1 => self.manager.cluster_count(1),
            _ => Ok(self.pairs.len()),
        }
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the strict cutoff list")?;
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
        check_built(self.state, "the strict cutoff list")?;
        return Ok(&self.pairs);
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        check_built(self.state, "the strict cutoff list")?;
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
    use approx::assert_ulps_eq;

    use crate::managers::{NeighborListAdaptor, RootManager};
    use super::*;

    fn chain_structure() -> Structure {
        let mut structure = Structure::new(UnitCell::infinite());
        structure.add_atom(6, Vector3D::new(0.0, 0.0, 0.0));
        structure.add_atom(6, Vector3D::new(1.4, 0.0, 0.0));
        structure.add_atom(6, Vector3D::new(2.8, 0.0, 0.0));
        structure.add_atom(6, Vector3D::new(4.2, 0.0, 0.0));
        return structure;
    }

    #[test]
    fn drops_pairs_beyond_cutoff() {
        let list = NeighborListAdaptor::new(RootManager::new(chain_structure()), 3.0).unwrap();
        let mut strict = StrictCutoffAdaptor::new(list, 1.5).unwrap();
        strict.update(None).unwrap();

        // only nearest neighbors along the chain survive
        let pairs = strict.pairs().unwrap();
        assert_eq!(pairs.len(), 6);
        for pair in pairs {
            assert_ulps_eq!(pair.distance, 1.4);
        }

        // upstream pairs also contain the 1.4 * 2 = 2.8 second neighbors
        assert_eq!(strict.manager.pairs().unwrap().len(), 10);
    }

    #[test]
    fn cutoff_validation() {
        let list = NeighborListAdaptor::new(RootManager::new(chain_structure()), 3.0).unwrap();
        let error = StrictCutoffAdaptor::new(list, 3.5).unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let list = NeighborListAdaptor::new(RootManager::new(chain_structure()), 3.0).unwrap();
        let error = StrictCutoffAdaptor::new(list, -1.0).unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }
}
