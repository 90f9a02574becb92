//! Property containers: flat numeric storage attached to the clusters of a
//! manager stack.
//!
//! Containers are created and owned by consumers (descriptor calculators),
//! never by the stack itself. They address clusters through the
//! layer-correct cluster index guaranteed by the
//! [`ClusterSource`](crate::ClusterSource) contract, and they become
//! invalid whenever an update changes the cluster count of their order:
//! the owning calculator resizes and refills them before the next read.

use indexmap::IndexMap;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

use crate::{ClusterSource, Error};

/// Numeric values attached to every cluster of one order, as a dense
/// `(clusters, components)` array.
#[derive(Debug, Clone)]
pub struct Property {
    order: usize,
    layer: usize,
    values: Array2<f64>,
}

impl Property {
    /// Create an empty property for clusters of the given order, at the
    /// given layer, with `components` values per cluster.
    pub fn new(order: usize, layer: usize, components: usize) -> Property {
        Property {
            order: order,
            layer: layer,
            values: Array2::zeros((0, components)),
        }
    }

    /// Create a property sized for the clusters `source` currently
    /// exposes at the given order, taking the layer from the source.
    pub fn for_source(source: &dyn ClusterSource, order: usize, components: usize) -> Result<Property, Error> {
        let mut property = Property::new(order, source.layer(order)?, components);
        property.resize_for(source.cluster_count(order)?);
        return Ok(property);
    }

    /// Cluster order this property is attached to
    pub fn order(&self) -> usize {
        self.order
    }

    /// Layer at which the cluster indices of this property are valid
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Number of clusters this property currently holds values for
    pub fn count(&self) -> usize {
        self.values.nrows()
    }

    /// Number of values stored per cluster
    pub fn components(&self) -> usize {
        self.values.ncols()
    }

    /// Resize the storage for `count` clusters. All previously stored
    /// values are discarded and reset to zero.
    pub fn resize_for(&mut self, count: usize) {
        self.values = Array2::zeros((count, self.components()));
    }

    /// Values of the cluster at the given index
    pub fn at(&self, index: usize) -> Result<ArrayView1<'_, f64>, Error> {
        if index >= self.count() {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for a property with {} entries",
                index, self.count()
            )));
        }
        return Ok(self.values.row(index));
    }

    /// Mutable values of the cluster at the given index
    pub fn at_mut(&mut self, index: usize) -> Result<ArrayViewMut1<'_, f64>, Error> {
        let count = self.count();
        if index >= count {
            return Err(Error::Index(format!(
                "cluster index {} is out of bounds for a property with {} entries",
                index, count
            )));
        }
        return Ok(self.values.row_mut(index));
    }

    /// The full `(clusters, components)` value array
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Check that this property can be used to address the clusters
    /// `source` currently exposes: same layer, same cluster count.
    pub fn check_compatible(&self, source: &dyn ClusterSource) -> Result<(), Error> {
        let layer = source.layer(self.order)?;
        if layer != self.layer {
            return Err(Error::Internal(format!(
                "property created at layer {} can not address clusters of \
                 order {} at layer {}", self.layer, self.order, layer
            )));
        }
        let count = source.cluster_count(self.order)?;
        if count != self.count() {
            return Err(Error::Internal(format!(
                "property holds {} entries but the manager now has {} \
                 clusters of order {}, resize it after the update",
                self.count(), count, self.order
            )));
        }
        return Ok(());
    }
}

/// Numeric values attached to clusters of one order, split in blocks by a
/// secondary sparse key (the species pair of the cluster).
///
/// Blocks are created lazily the first time a key is written; each block
/// has its own number of rows, since each species pair addresses its own
/// subset of clusters.
#[derive(Debug, Clone)]
pub struct SparseProperty {
    order: usize,
    layer: usize,
    components: usize,
    blocks: IndexMap<(i32, i32), Array2<f64>>,
}

impl SparseProperty {
    /// Create an empty sparse property for clusters of the given order, at
    /// the given layer, with `components` values per entry.
    pub fn new(order: usize, layer: usize, components: usize) -> SparseProperty {
        SparseProperty {
            order: order,
            layer: layer,
            components: components,
            blocks: IndexMap::new(),
        }
    }

    /// Cluster order this property is attached to
    pub fn order(&self) -> usize {
        self.order
    }

    /// Layer at which the cluster indices of this property are valid
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Number of values stored per entry
    pub fn components(&self) -> usize {
        self.components
    }

    /// Keys of all blocks created so far, in creation order
    pub fn keys(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.blocks.keys().copied()
    }

    /// The block for the given species pair, if it was created
    pub fn block(&self, key: (i32, i32)) -> Option<ArrayView2<'_, f64>> {
        self.blocks.get(&key).map(Array2::view)
    }

    /// Get the block for the given species pair with `count` rows,
    /// creating or resizing it as needed. Resizing discards previously
    /// stored values.
    pub fn block_mut(&mut self, key: (i32, i32), count: usize) -> ArrayViewMut2<'_, f64> {
        let components = self.components;
        let block = self.blocks.entry(key).or_insert_with(|| Array2::zeros((0, components)));
        if block.nrows() != count {
            *block = Array2::zeros((count, components));
        }
        return block.view_mut();
    }

    /// Drop all blocks. Called by the owning consumer when an update
    /// invalidated the cluster indexing.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
