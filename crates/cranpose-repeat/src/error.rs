use std::fmt;

/// Failures reported by [`RepeatCaches`](crate::RepeatCaches).
///
/// None of these are fatal: a failed fetch resolves to "no node" for the
/// current pass and the next pass retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The key or type callback returned nothing for the requested range.
    EmptyFetch { from: usize, to: usize },
    /// The key and type callbacks disagreed on the number of items.
    FetchLengthMismatch {
        from: usize,
        to: usize,
        keys: usize,
        types: usize,
    },
    /// No key or template type could be resolved for the index.
    UnresolvedIndex { index: usize },
    /// `build_node` did not emit exactly one node.
    BuildContract { index: usize, produced: usize },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::EmptyFetch { from, to } => {
                write!(f, "item source returned no keys or types for [{from}, {to}]")
            }
            CacheError::FetchLengthMismatch {
                from,
                to,
                keys,
                types,
            } => write!(
                f,
                "item source returned {keys} keys but {types} types for [{from}, {to}]"
            ),
            CacheError::UnresolvedIndex { index } => {
                write!(f, "no key or template type for index {index}")
            }
            CacheError::BuildContract { index, produced } => write!(
                f,
                "build_node for index {index} produced {produced} nodes; expected exactly one"
            ),
        }
    }
}

impl std::error::Error for CacheError {}
