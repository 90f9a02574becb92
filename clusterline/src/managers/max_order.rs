use std::ops::Range;

use crate::{Error, Structure, UnitCell, Vector3D};

use super::{check_built, check_order, offsets_range};
use super::{BuildState, ClusterSource, Pair};

/// Adaptor synthesizing the next cluster order from an existing one:
/// triplets from pairs, quadruplets from triplets, and so on.
///
/// Every order-k cluster of the underlying manager is extended with the
/// candidates drawn from the pair partners of its constituent atoms,
/// minus the atoms already in the tuple; one order k+1 cluster is emitted
/// per candidate, in ascending atom index order. The adaptor is agnostic
/// to the source order and can be stacked on top of itself.
///
/// Ghost atoms can be members of a cluster but contribute no extension
/// candidates of their own: they carry no neighbor list, only their source
/// atom does.
#[derive(Debug)]
pub struct MaxOrderAdaptor<M> {
    manager: M,
    /// the order introduced by this adaptor
    order: usize,
    /// flat cluster storage, stride `order`
    clusters: Vec<usize>,
    /// per predecessor cluster offsets into `clusters`
    offsets: Vec<usize>,
    layers: Vec<usize>,
    state: BuildState,
}

impl<M: ClusterSource> MaxOrderAdaptor<M> {
    /// Stack a max order increase on top of `manager`, which needs at
    /// least a pair list.
    pub fn new(manager: M) -> Result<MaxOrderAdaptor<M>, Error> {
        if manager.max_order() < 2 {
            return Err(Error::Configuration(
                "can not increase the max order: no pair list in the \
                 underlying manager".into()
            ));
        }

        let order = manager.max_order() + 1;
        let mut layers = Vec::with_capacity(order);
        for lower in 1..order {
            layers.push(manager.layer(lower)?);
        }
        // the new order has not been re-indexed by anything yet
        layers.push(0);

        return Ok(MaxOrderAdaptor {
            manager: manager,
            order: order,
            clusters: Vec::new(),
            offsets: Vec::new(),
            layers: layers,
            state: BuildState::Uninitialized,
        });
    }

    #[time_graph::instrument(name = "MaxOrderAdaptor::update_self")]
    fn update_self(&mut self) -> Result<(), Error> {
        let n_real = self.manager.size();
        let n_total = self.manager.size_with_ghosts();

        // pair partners of every real atom, from both directions of the
        // upstream list. With a full list the reverse direction is
        // redundant and removed by the dedup; with a half list it is what
        // makes the partner sets complete.
        let mut partners: Vec<Vec<usize>> = vec![Vec::new(); n_total];
        for pair in self.manager.pairs()? {
            partners[pair.first].push(pair.second);
            if pair.second < n_real && pair.second != pair.first {
                partners[pair.second].push(pair.first);
            }
        }
        for list in &mut partners {
            list.sort_unstable();
            list.dedup();
        }

        let source_order = self.order - 1;
        let n_clusters = self.manager.cluster_count(source_order)?;

        self.clusters.clear();
        self.offsets.clear();
        self.offsets.push(0);

        let mut candidates = Vec::new();
        for cluster in 0..n_clusters {
            let tuple = self.manager.cluster_atoms(source_order, cluster)?;

            candidates.clear();
            for &atom in tuple {
                if atom < n_real {
                    candidates.extend_from_slice(&partners[atom]);
                }
            }
            candidates.sort_unstable();
            candidates.dedup();
            candidates.retain(|atom| !tuple.contains(atom));

            for &extension in &candidates {
                self.clusters.extend_from_slice(tuple);
                self.clusters.push(extension);
            }

            // clusters without extensions still get their (empty) entry in
            // the offsets table
            let last = *self.offsets.last().unwrap_or(&0);
            self.offsets.push(last + candidates.len());
        }

        self.check_closure()?;

        self.state = BuildState::Built;
        return Ok(());
    }

    /// Verify that the first `order - 1` atoms of every emitted cluster
    /// are exactly the predecessor cluster it extends.
    fn check_closure(&self) -> Result<(), Error> {
        let source_order = self.order - 1;
        for cluster in 0..self.offsets.len().saturating_sub(1) {
            let tuple = self.manager.cluster_atoms(source_order, cluster)?;
            for index in self.offsets[cluster]..self.offsets[cluster + 1] {
                let atoms = &self.clusters[index * self.order..(index + 1) * self.order];
                if &atoms[..source_order] != tuple {
                    return Err(Error::Consistency(format!(
                        "order {} cluster {} does not extend its order {} \
                         predecessor {}", self.order, index, source_order, cluster
                    )));
                }
            }
        }
        return Ok(());
    }
}

impl<M: ClusterSource> ClusterSource for MaxOrderAdaptor<M> {
    fn size(&self) -> usize {
        self.manager.size()
    }

    fn size_with_ghosts(&self) -> usize {
        self.manager.size_with_ghosts()
    }

    fn max_order(&self) -> usize {
        self.order
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
        check_order(self.order, order)?;
        return Ok(self.layers[order - 1]);
    }

    fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        check_built(self.state, "the max order adaptor")?;
        check_order(self.order, order)?;
        if order < self.order {
            return self.manager.cluster_count(order);
        }
        return Ok(self.clusters.len() / self.order);
    }

    fn cluster_atoms(&self, order: usize, index: usize) -> Result<&[usize], Error> {
        check_built(self.state, "the max order adaptor")?;
        check_order(self.order, order)?;
        if order < self.order {
            return self.manager.cluster_atoms(order, index);
        }
        let start = index * self.order;
        if start + self.order > self.clusters.len() {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for {} clusters of order {}",
                index, self.clusters.len() / self.order, order
            )));
        }
        return Ok(&self.clusters[start..start + self.order]);
    }

    fn pairs(&self) -> Result<&[Pair], Error> {
        self.manager.pairs()
    }

    fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        check_built(self.state, "the max order adaptor")?;
        check_order(self.order, order)?;
        if order + 1 < self.order {
            return self.manager.extension_range(order, index);
        } else if order == self.order {
            return Err(Error::Index(format!(
                "this manager has no clusters above order {}, stack another \
                 max order adaptor to extend further", self.order
            )));
        }
        return offsets_range(&self.offsets, index);
    }

    fn update(&mut self, structure: Option<Structure>) -> Result<(), Error> {
        self.state = BuildState::Stale;
        self.manager.update(structure)?;
        return self.update_self();
    }
}
