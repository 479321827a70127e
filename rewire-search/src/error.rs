//! Error types for substitution and search

use thiserror::Error;

use rewire_graph::GraphError;

/// Errors raised by substitution authoring and the search driver.
///
/// Malformed substitutions are programmer bugs: they surface as errors and
/// abort the search. Rewrites rejected for shape reasons are not errors; the
/// rewriter reports those as an absent result and the search moves on.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The substitution references ports or pattern nodes that do not exist,
    /// or its destination constructors disagree with its declared kinds
    #[error("malformed substitution '{xfer}': {reason}")]
    MalformedPattern { xfer: String, reason: String },

    /// Applying the substitution produced a cyclic graph
    #[error("substitution '{xfer}' produced a cyclic graph")]
    CyclicRewrite { xfer: String },

    /// Graph-level failure (measurement, structural queries)
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SearchError {
    pub(crate) fn malformed(xfer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPattern {
            xfer: xfer.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for search results
pub type SearchResult<T> = Result<T, SearchError>;
