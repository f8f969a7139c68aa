//! Facet state for the result-table explorer.
//!
//! This crate holds the synchronous, rendering-free half of the explorer:
//! - Hierarchical checkbox trees with parent/child propagation
//! - Dual-handle numeric range facets
//! - Facet forms that bundle the facets shown next to one table
//! - The sync bus that keeps the same facet consistent across forms

pub mod error;
pub mod form;
pub mod range;
pub mod sync;
pub mod tree;

// Re-export main types
pub use error::{FacetError, Result};
pub use form::{FacetChip, FacetForm, FacetSelection};
pub use range::{RangeCommit, RangeFacet, RangeHandle};
pub use sync::{ChangeOrigin, FacetSubscriber, FacetSyncBus, FacetSyncMessage, FacetValue};
pub use tree::{CategoryNode, CheckState, CheckboxTree, FacetNode, LINEAGE_SEPARATOR};
