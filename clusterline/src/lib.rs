#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Incremental neighbor lists and multi-order atomic clusters over
//! periodic structures.
//!
//! A [`Structure`] (positions, species, unit cell) is wrapped in a stack
//! of composable structure managers: a [`managers::RootManager`] exposing
//! atoms, a [`managers::NeighborListAdaptor`] adding pairs and ghost
//! atoms, filter adaptors reshaping the pair set, and
//! [`managers::MaxOrderAdaptor`] stages synthesizing triplets,
//! quadruplets and beyond. Every stage implements [`ClusterSource`], so
//! downstream numerical code iterates atoms, pairs and higher tuples
//! through one interface, and attaches per-cluster data through the
//! layer-indexed [`Property`] containers.

pub mod types;
pub use types::{Matrix3, Vector3D};

mod errors;
pub use self::errors::Error;

pub mod structure;
pub use structure::{CellShape, Structure, UnitCell};

pub mod managers;
pub use managers::{AdaptorParameters, ManagerStack};
pub use managers::{BuildState, ClusterRef, ClusterSource, Clusters, Pair};

pub mod properties;
pub use properties::{Property, SparseProperty};
