use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::{check_built, check_order, BuildState, ClusterSource, Pair};

/// Base of every manager stack: wraps a [`Structure`] and exposes its
/// atoms as order-1 clusters, in tag order, with no neighbor information.
#[derive(Debug, Clone)]
pub struct RootManager {
    structure: Structure,
    /// flat order-1 cluster storage, one entry per atom
    atoms: Vec<usize>,
    state: BuildState,
}

impl RootManager {
    /// Wrap a structure. The manager is unusable until the first call to
    /// [`ClusterSource::update`].
    pub fn new(structure: Structure) -> RootManager {
        RootManager {
            structure: structure,
            atoms: Vec::new(),
            state: BuildState::Uninitialized,
        }
    }

    /// The wrapped structure
    pub fn structure(&self) -> &Structure {
        &self.structure
    }
}

impl ClusterSource for RootManager {
    fn size(&self) -> usize {
        self.structure.size()
    }

    fn size_with_ghosts(&self) -> usize {
        // the root never creates ghost atoms
        self.structure.size()
    }

    fn max_order(&self) -> usize {
        1
    }

    fn cell(&self) -> UnitCell {
        self.structure.cell()
    }

    fn state(&self) -> BuildState {
        self.state
    }

    fn cutoff(&self) -> Option<f64> {
        None
    }

    fn tag(&self, atom: usize) -> Result<usize, Error> {
        if atom >= self.size() {
            return Err(Error::Index(format!(
                "atom index {} is out of bounds for {} atoms", atom, self.size()
            )));
        }
        return Ok(atom);
    }

    fn position(&self, atom: usize) -> Result<Vector3D, Error> {
        self.structure.position(atom)
    }

    fn species(&self, atom: usize) -> Result<i32, Error> {
        self.structure.species_of(atom)
    }

    fn cell_shift(&self, atom: usize) -> Result<[i32; 3], Error> {
        self.tag(atom)?;
        return Ok([0, 0, 0]);
    }

    fn layer(&self, order: usize) -> Result<usize, Error> {
        check_order(1, order)?;
        return Ok(0);
    }

    fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        check_built(self.state, "the root manager")?;
        check_order(1, order)?;
        return Ok(self.atoms.len());
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the root manager")?;
        check_order(1, order)?;
        if index >= self.atoms.len() {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for {} atoms", index, self.atoms.len()
            )));
        }
        return Ok(&self.atoms[index..index + 1]);
    }

    fn pairs(&self) -> Result<&[Pair], Error> {
        Err(Error::Index(
            "this manager only has atoms, stack a neighbor list adaptor to get pairs".into()
        ))
    }

    fn extension_range(&self, order: usize, _index: usize) -> Result<Range<usize>, Error> {
        check_order(1, order)?;
        return Err(Error::Index(
            "this manager only has atoms, there are no order 2 clusters to extend to".into()
        ));
    }

    fn update(&mut self, structure: Option<Structure>) -> Result<(), Error> {
        self.state = BuildState::Stale;
        if let Some(structure) = structure {
            self.structure = structure;
        }

        // rebuild the order-1 cluster list from the (possibly new) structure
        self.atoms.clear();
        self.atoms.extend(0..self.structure.size());

        self.state = BuildState::Built;
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure() -> Structure {
        let mut structure = Structure::new(UnitCell::cubic(5.0).unwrap());
        structure.add_atom(1, Vector3D::new(0.0, 0.0, 0.0));
        structure.add_atom(8, Vector3D::new(1.0, 1.0, 1.0));
        return structure;
    }

    #[test]
    fn atoms_in_tag_order() {
        let mut root = RootManager::new(structure());
        assert_eq!(root.state(), BuildState::Uninitialized);
        assert!(root.cluster_count(1).is_err());

        root.update(None).unwrap();
        assert_eq!(root.state(), BuildState::Built);
        assert_eq!(root.max_order(), 1);
        assert_eq!(root.cluster_count(1).unwrap(), 2);
        assert_eq!(root.cluster_atoms(1, 0).unwrap(), &[0]);
        assert_eq!(root.cluster_atoms(1, 1).unwrap(), &[1]);
        assert_eq!(root.layer(1).unwrap(), 0);

        assert_eq!(root.tag(1).unwrap(), 1);
        assert_eq!(root.species(1).unwrap(), 8);
        assert!(matches!(root.tag(2), Err(Error::Index(_))));
    }

    #[test]
    fn no_pairs() {
        let mut root = RootManager::new(structure());
        root.update(None).unwrap();
        assert!(matches!(root.pairs(), Err(Error::Index(_))));
        assert!(matches!(root.extension_range(1, 0), Err(Error::Index(_))));
    }

    #[test]
    fn replace_structure() {
        let mut root = RootManager::new(structure());
        root.update(None).unwrap();
        assert_eq!(root.size(), 2);

        let mut bigger = structure();
        bigger.add_atom(1, Vector3D::new(2.0, 2.0, 2.0));
        root.update(Some(bigger)).unwrap();
        assert_eq!(root.size(), 3);
        assert_eq!(root.cluster_count(1).unwrap(), 3);
    }
}
