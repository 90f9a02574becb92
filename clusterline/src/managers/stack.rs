use std::ops::Range;

use crate::{Error, Structure, UnitCell};

use super::{
    CenterContributionAdaptor, ClusterSource, Clusters, HalfListAdaptor,
    MaxOrderAdaptor, NeighborListAdaptor, Pair, RootManager, StrictCutoffAdaptor,
};

/// Configuration record for a single adaptor in a manager stack.
///
/// A stack is declared as an ordered list of these records; see
/// [`ManagerStack::new`]. The records serialize to/from JSON as a tagged
/// enum:
///
/// ```json
/// [
///     {"adaptor": "neighbor_list", "cutoff": 3.5},
///     {"adaptor": "strict_cutoff", "cutoff": 3.0},
///     {"adaptor": "max_order"}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(tag = "adaptor", rename_all = "snake_case", deny_unknown_fields)]
pub enum AdaptorParameters {
    /// Build the full pair list within a spherical cutoff, creating ghost
    /// atoms for periodic images
    NeighborList {
        /// Cutoff radius for the pair search
        cutoff: f64,
    },
    /// Keep a single canonical direction per undirected pair
    HalfList,
    /// Insert the zero-distance self pair for every real atom
    CenterContribution,
    /// Re-filter pairs against an exact cutoff radius
    StrictCutoff {
        /// Exact cutoff radius, at most the upstream neighbor list cutoff
        cutoff: f64,
    },
    /// Synthesize the next cluster order (pairs to triplets, triplets to
    /// quadruplets, ...)
    MaxOrder,
}

/// A fully built manager stack: a root manager wrapping a [`Structure`]
/// with a runtime-configured chain of adaptors on top.
///
/// This is the consumer-facing entry point of the crate. For statically
/// known stacks the adaptor types can also be composed directly, e.g.
/// `MaxOrderAdaptor<NeighborListAdaptor<RootManager>>`.
pub struct ManagerStack {
    parameters: Vec<AdaptorParameters>,
    top: Box<dyn ClusterSource>,
}

impl std::fmt::Debug for ManagerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerStack")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ManagerStack {
    /// Build and update a manager stack over `structure` from the given
    /// adaptor configuration records.
    ///
    /// Each record is validated against its predecessor: the neighbor list
    /// requires an atoms-only manager below it, the pair filters and the
    /// max order adaptor require a pair-capable one.
    pub fn new(structure: Structure, parameters: &[AdaptorParameters]) -> Result<ManagerStack, Error> {
        let mut top: Box<dyn ClusterSource> = Box::new(RootManager::new(structure));
        for adaptor in parameters {
            top = match *adaptor {
                AdaptorParameters::NeighborList { cutoff } => {
                    Box::new(NeighborListAdaptor::new(top, cutoff)?)
                }
                AdaptorParameters::HalfList => {
                    Box::new(HalfListAdaptor::new(top)?)
                }
                AdaptorParameters::CenterContribution => {
                    Box::new(CenterContributionAdaptor::new(top)?)
                }
                AdaptorParameters::StrictCutoff { cutoff } => {
                    Box::new(StrictCutoffAdaptor::new(top, cutoff)?)
                }
                AdaptorParameters::MaxOrder => {
                    Box::new(MaxOrderAdaptor::new(top)?)
                }
            };
        }

        let mut stack = ManagerStack {
            parameters: parameters.to_vec(),
            top: top,
        };
        stack.update(None)?;
        return Ok(stack);
    }

    /// Build a manager stack from a JSON array of configuration records
    pub fn from_json(structure: Structure, parameters: &str) -> Result<ManagerStack, Error> {
        let parameters: Vec<AdaptorParameters> = serde_json::from_str(parameters)?;
        return ManagerStack::new(structure, &parameters);
    }

    /// The configuration records this stack was built from
    pub fn parameters(&self) -> &[AdaptorParameters] {
        &self.parameters
    }

    /// The configuration records of this stack, as JSON
    pub fn parameters_json(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    /// Rebuild the whole stack, optionally replacing the structure.
    ///
    /// On error the stack holds no usable cluster data and must be rebuilt
    /// with a valid structure before the next read.
    pub fn update(&mut self, structure: Option<Structure>) -> Result<(), Error> {
        self.top.update(structure)
    }

    /// Access the topmost stage of the stack
    pub fn source(&self) -> &dyn ClusterSource {
        &*self.top
    }

    /// Highest cluster order available
    pub fn max_order(&self) -> usize {
        self.top.max_order()
    }

    /// Number of real atoms
    pub fn size(&self) -> usize {
        self.top.size()
    }

    /// Number of atoms including ghost images
    pub fn size_with_ghosts(&self) -> usize {
        self.top.size_with_ghosts()
    }

    /// Unit cell of the underlying structure
    pub fn cell(&self) -> UnitCell {
        self.top.cell()
    }

    /// Layer of the given cluster order
    pub fn layer(&self, order: usize) -> Result<usize, Error> {
        self.top.layer(order)
    }

    /// Number of clusters of the given order
    pub fn cluster_count(&self, order: usize) -> Result<usize, Error> {
        self.top.cluster_count(order)
    }

    /// Iterate over all clusters of the given order
    pub fn clusters(&self, order: usize) -> Result<Clusters<'_>, Error> {
        Clusters::new(&*self.top, order)
    }

    /// All pairs of the stack, sorted by `(first, second)`
    pub fn pairs(&self) -> Result<&[Pair], Error> {
        self.top.pairs()
    }

    /// Range of order + 1 clusters extending the given cluster
    pub fn extension_range(&self, order: usize, index: usize) -> Result<Range<usize>, Error> {
        self.top.extension_range(order, index)
    }
}
