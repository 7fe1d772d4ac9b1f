//! Deep-merge and single-inheritance resolution for named configuration
//! documents.
//!
//! This crate is pure: it never touches the filesystem. Loading,
//! metadata stamping and publication live in `profile-registry`.

pub mod error;
pub mod merge;
pub mod resolve;

pub use error::ResolveError;
pub use merge::{deep_merge, inherit, merge_layers, Document, ListMerge, ITEM_ID_KEY};
pub use resolve::{base_reference, resolve, resolve_all, ChainFailure, ResolvedSet};
