//! Node cache and reuse engine for virtualized repeat lists.
//!
//! A virtualized repeat renders a few on-screen items out of a possibly huge
//! list. [`RepeatCaches`] decides, for every index the layout pass asks for,
//! whether the node already exists, whether an off-screen node of the same
//! template can be rewritten for it, or whether a new node must be built. The
//! host supplies the data through an [`ItemSource`] and owns the node type.
//!
//! ```rust,ignore
//! let mut caches = RepeatCaches::new(source);
//! caches.set_active_range(first_visible, last_visible);
//! for index in first_visible..=last_visible {
//!     if let Some(node) = caches.get_or_create_node(index)? {
//!         place(node);
//!     }
//! }
//! caches.recycle_out_of_range();
//! // later, when idle
//! caches.purge();
//! ```

mod active;
pub mod caches;
pub mod collections;
pub mod config;
mod dump;
pub mod error;
pub mod range;
pub mod resolver;
pub mod source;
mod store;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use caches::{CacheStats, RepeatCaches};
pub use config::{RepeatCacheConfig, DEFAULT_FETCH_AHEAD};
pub use error::CacheError;
pub use range::{ActiveRange, RangeTracker, ScrollDirection};
pub use resolver::IndexKeyTypeResolver;
pub use source::{CacheKey, CallbackSource, ItemSource, NodeSink, RecyclableNode};
pub use store::CacheItem;

/// Identity of a host node, as reported by [`RecyclableNode::node_id`].
pub type NodeId = usize;
