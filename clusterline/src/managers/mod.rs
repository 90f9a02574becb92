//! Structure managers: a composable stack of stages building and
//! maintaining multi-order neighbor relationships (atoms, pairs, triplets,
//! ...) over an atomic structure.
//!
//! The stack starts from a [`RootManager`] wrapping a [`Structure`], and
//! each adaptor consumes the previous stage to produce an augmented one:
//! [`NeighborListAdaptor`] adds pairs and ghost atoms, the filter adaptors
//! narrow or augment the pair set, and [`MaxOrderAdaptor`] synthesizes the
//! next cluster order. All stages expose the same [`ClusterSource`]
//! capability, so downstream code can iterate clusters without knowing the
//! shape of the stack.

use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

mod root;
pub use self::root::RootManager;

mod cell_list;

mod neighbor_list;
pub use self::neighbor_list::{GhostAtom, NeighborListAdaptor};

mod half_list;
pub use self::half_list::HalfListAdaptor;

mod center_contribution;
pub use self::center_contribution::CenterContributionAdaptor;

mod strict_cutoff;
pub use self::strict_cutoff::StrictCutoffAdaptor;

mod max_order;
pub use self::max_order::MaxOrderAdaptor;

mod stack;
pub use self::stack::{AdaptorParameters, ManagerStack};

/// Pair of atoms (order-2 cluster) in a manager stack.
///
/// `first` is always a real atom; `second` can be a ghost atom standing for
/// a periodic image. The vector is `position[second] - position[first]`,
/// which equals `position_in_cell[second] - position[first] + H * shift`
/// with `H` the cell matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair {
    /// index of the first atom in the pair
    pub first: usize,
    /// index of the second atom in the pair
    pub second: usize,
    /// distance between the two atoms
    pub distance: f64,
    /// vector from the first atom to the second atom
    pub vector: Vector3D,
    /// cell shift applied to the second atom to create this pair
    pub cell_shift_indices: [i32; 3],
}

/// Build state of a single stage in a manager stack.
///
/// Stages move from `Uninitialized` to `Built` on the first successful
/// update, fall back to `Stale` the instant an update is requested, and
/// only return to `Built` after a full rebuild. There are no partial
/// states: every update rebuilds the whole stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// The stage has never been built
    Uninitialized,
    /// The stage is consistent with the current structure
    Built,
    /// The structure changed (or a rebuild failed) since the last
    /// successful build of this stage
    Stale,
}

/// Common capability of every stage in a manager stack.
///
/// Atoms are addressed by *index* in `0..size_with_ghosts()`; indices below
/// `size()` are real atoms, the rest are ghost images. The *tag* of an
/// atom is the index of the real atom it stands for, so ghost images share
/// the tag of their source atom.
///
/// Clusters of a given order are enumerable in a stable order, and
/// addressed by a per-order index which is only meaningful at the layer
/// reported by [`ClusterSource::layer`] for that order.
pub trait ClusterSource: Send + Sync {
    /// Number of real (non-ghost) atoms
    fn size(&self) -> usize;

    /// Number of atoms including ghost images
    fn size_with_ghosts(&self) -> usize;

    /// Highest cluster order available from this stage
    fn max_order(&self) -> usize;

    /// Unit cell of the underlying structure
    fn cell(&self) -> UnitCell;

    /// Build state of this stage
    fn state(&self) -> BuildState;

    /// Cutoff radius of the pair list, if this stage carries one
    fn cutoff(&self) -> Option<f64>;

    /// Tag of the atom at the given index
    fn tag(&self, atom: usize) -> Result<usize, Error>;

    /// Cartesian position of the atom at the given index
    fn position(&self, atom: usize) -> Result<Vector3D, Error>;

    /// Species code of the atom at the given index
    fn species(&self, atom: usize) -> Result<i32, Error>;

    /// Cell shift of the atom at the given index (zero for real atoms)
    fn cell_shift(&self, atom: usize) -> Result<[i32; 3], Error>;

    /// Layer of the given cluster order: how many stages have re-indexed
    /// this order since it was introduced. Cluster indices are only
    /// comparable between stacks at equal layer.
    fn layer(&self, order: usize) -> Result<usize, Error>;

    /// Number of clusters of the given order
    fn cluster_count(&self, order: usize) -> Result<usize, Error>;

    /// Atom indices making up the cluster at `index` of the given order
    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error>;

    /// All pairs (order-2 clusters) of this stage, sorted by
    /// `(first, second)`
    fn pairs(&self) -> Result<&[Pair], Error>;

    /// The pair at the given order-2 cluster index
    fn pair(&self, index: usize) -> Result<&Pair, Error> {
        let pairs = self.pairs()?;
        let count = pairs.len();
        pairs.get(index).ok_or_else(|| Error::Index(format!(
            "pair index {} is out of bounds for {} pairs", index, count
        )))
    }

    /// Range of order `order + 1` cluster indices extending the cluster at
    /// `index` of the given order (the offsets table). Clusters with no
    /// extensions yield an empty range.
    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error>;

    /// Rebuild every stage below this one and then this stage itself,
    /// optionally replacing the structure at the root of the stack.
    ///
    /// On error the stack is left with every successfully rebuilt stage
    /// `Built` and this stage (and everything above) `Stale`; cluster data
    /// of stale stages is unavailable until the next successful update.
    fn update(&mut self, structure: Option<Structure>) -> Result<(), Error>;
}

impl<M: ClusterSource + ?Sized> ClusterSource for Box<M> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn size_with_ghosts(&self) -> usize {
        (**self).size_with_ghosts()
    }

    fn max_order(&self) -> usize {
        (**self).max_order()
    }

    fn cell(&self) -> UnitCell {
        (**self).cell()
    }

    fn state(&self) -> BuildState {
        (**self).state()
    }

    fn cutoff(&self) -> Option<f64> {
        (**self).cutoff()
    }

    fn tag(&self, atom: usize) -> Result<usize, Error> {
        (**self).tag(atom)
    }

    fn position(&self, atom: usize) -> Result<Vector3D, Error> {
        (**self).position(atom)
    }

    fn species(&self, atom: usize) -> Result<i32, Error> {
        (**self).species(atom)
    }

    fn cell_shift(&self, atom: usize) -> Result<[i32; 3], Error> {
        (**self).cell_shift(atom)
    }

    fn layer(&self, order: usize) -> Result<usize, Error> {
        (**self).layer(order)
    }

    fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        (**self).cluster_count(order)
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        (**self).cluster_atoms(order, index)
    }

    fn pairs(&self) -> Result<&[Pair], Error> {
        (**self).pairs()
    }

    fn pair(&self, index: usize) -> Result<&Pair, Error> {
        (**self).pair(index)
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        (**self).extension_range(order, index)
    }

    fn update(&mut self, structure: Option<Structure>) -> Result<(), Error> {
        (**self).update(structure)
    }
}

/// Handle to a single cluster of a manager stack, giving access to its
/// atoms, tags, species and (for pairs) geometric data.
#[derive(Clone, Copy)]
pub struct ClusterRef<'a> {
    source: &'a dyn ClusterSource,
    order: usize,
    layer: usize,
    index: usize,
    atoms: &'a [usize],
}

impl<'a> ClusterRef<'a> {
    /// Order of this cluster (1 = atom, 2 = pair, 3 = triplet, ...)
    pub fn order(&self) -> usize {
        self.order
    }

    /// Layer-correct cluster index, usable to address attached properties
    pub fn index(&self) -> usize {
        self.index
    }

    /// Layer at which this cluster's index is valid
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Indices of the atoms making up this cluster
    pub fn atoms(&self) -> &'a [usize] {
        self.atoms
    }

    /// Tags of the atoms making up this cluster (ghost images are mapped
    /// back to their source atom)
    pub fn tags(&self) -> Result<Vec<usize>, Error> {
        self.atoms.iter().map(|&atom| self.source.tag(atom)).collect()
    }

    /// Species codes of the atoms making up this cluster
    pub fn species(&self) -> Result<Vec<i32>, Error> {
        self.atoms.iter().map(|&atom| self.source.species(atom)).collect()
    }

    /// Full pair data for this cluster, only available at order 2
    pub fn pair(&self) -> Result<&'a Pair, Error> {
        if self.order != 2 {
            return Err(Error::Index(format!(
                "pair data is only available for clusters of order 2, not {}",
                self.order
            )));
        }
        self.source.pair(self.index)
    }

    /// Distance between the two atoms of this pair, only available at
    /// order 2
    pub fn distance(&self) -> Result<f64, Error> {
        Ok(self.pair()?.distance)
    }

    /// Displacement vector of this pair, only available at order 2
    pub fn vector(&self) -> Result<Vector3D, Error> {
        Ok(self.pair()?.vector)
    }

    /// Indices of the order + 1 clusters extending this cluster
    pub fn extensions(&self) -> Result<Range<usize>, Error> {
        self.source.extension_range(self.order, self.index)
    }
}

impl std::fmt::Debug for ClusterRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterRef")
            .field("order", &self.order)
            .field("layer", &self.layer)
            .field("index", &self.index)
            .field("atoms", &self.atoms)
            .finish()
    }
}

/// Iterator over all clusters of a given order in a manager stack.
///
/// The sequence is finite and restartable: re-creating the iterator after
/// no update yields the clusters in the same order.
pub struct Clusters<'a> {
    source: &'a dyn ClusterSource,
    order: usize,
    layer: usize,
    index: usize,
    count: usize,
}

impl<'a> Clusters<'a> {
    /// Iterate the clusters of the given order exposed by `source`
    pub fn new(source: &'a dyn ClusterSource, order: usize) -> Result<Clusters<'a>, Error> {
        let count = source.cluster_count(order)?;
        let layer = source.layer(order)?;
        return Ok(Clusters {
            source: source,
            order: order,
            layer: layer,
            index: 0,
            count: count,
        });
    }
}

impl<'a> Iterator for Clusters<'a> {
    type Item = ClusterRef<'a>;

    fn next(&mut self) -> Option<ClusterRef<'a>> {
        if self.index >= self.count {
            return None;
        }

        // the constructor validated the order and the cluster count can not
        // change while we hold a borrow of the source
        let atoms = self.source.cluster_atoms(self.order, self.index).ok()?;
        let cluster = ClusterRef {
            source: self.source,
            order: self.order,
            layer: self.layer,
            index: self.index,
            atoms: atoms,
        };
        self.index += 1;
        return Some(cluster);
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Clusters<'_> {}

/// Validate a cluster order against the highest order of a stage
pub(crate) fn check_order(max_order: usize, order: usize) -> Result<(), Error> {
    if order == 0 || order > max_order {
        return Err(Error::Index(format!(
            "cluster order {} is not available from this manager (max order is {})",
            order, max_order
        )));
    }
    return Ok(());
}

/// Refuse to hand out cluster data from a stage that is not built
pub(crate) fn check_built(state: BuildState, stage: &str) -> Result<(), Error> {
    match state {
        BuildState::Built => Ok(()),
        BuildState::Uninitialized => Err(Error::Internal(format!(
            "{} has never been built, call update first", stage
        ))),
        BuildState::Stale => Err(Error::Internal(format!(
            "{} is stale, call update before accessing clusters", stage
        ))),
    }
}

/// Look up the `[start, stop)` slot range of the entry at `index` in an
/// offsets table
pub(crate) fn offsets_range(offsets: &[usize], index: usize) -> Result<Range<usize>, Error> {
    if index + 1 >= offsets.len() {
        return Err(Error::Index(format!(
            "cluster index {} is out of bounds for {} clusters",
            index,
            offsets.len().saturating_sub(1)
        )));
    }
    return Ok(offsets[index]..offsets[index + 1]);
}

/// Build the offsets table of pairs sorted by their first atom: entry `i`
/// is the slot where the pairs with `first == i` start. Atoms without
/// pairs (ghosts included) get an empty range.
pub(crate) fn pair_offsets(pairs: &[Pair], n_atoms: usize) -> Vec<usize> {
    let mut offsets = vec![0; n_atoms + 1];
    for pair in pairs {
        offsets[pair.first + 1] += 1;
    }
    for i in 1..offsets.len() {
        offsets[i] += offsets[i - 1];
    }
    return offsets;
}

/// Flatten pairs into order-2 cluster storage (stride 2)
pub(crate) fn pair_atoms(pairs: &[Pair]) -> Vec<usize> {
    let mut atoms = Vec::with_capacity(2 * pairs.len());
    for pair in pairs {
        atoms.push(pair.first);
        atoms.push(pair.second);
    }
    return atoms;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets() {
        let pairs = [
            Pair { first: 0, second: 1, distance: 1.0, vector: Vector3D::zero(), cell_shift_indices: [0, 0, 0] },
            Pair { first: 0, second: 2, distance: 1.0, vector: Vector3D::zero(), cell_shift_indices: [0, 0, 0] },
            Pair { first: 2, second: 0, distance: 1.0, vector: Vector3D::zero(), cell_shift_indices: [0, 0, 0] },
        ];

        // atom 1 and the trailing ghost atom 3 have no pairs as first atom
        let offsets = pair_offsets(&pairs, 4);
        assert_eq!(offsets, [0, 2, 2, 3, 3]);

        assert_eq!(offsets_range(&offsets, 0).unwrap(), 0..2);
        assert_eq!(offsets_range(&offsets, 1).unwrap(), 2..2);
        assert_eq!(offsets_range(&offsets, 3).unwrap(), 3..3);
        assert!(offsets_range(&offsets, 4).is_err());
    }

    #[test]
    fn order_validation() {
        assert!(check_order(2, 1).is_ok());
        assert!(check_order(2, 2).is_ok());
        assert!(matches!(check_order(2, 0), Err(Error::Index(_))));
        assert!(matches!(check_order(2, 3), Err(Error::Index(_))));
    }
}
