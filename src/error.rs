//! Crate error types. Library-facing failure modes get precise `thiserror`
//! variants; callers that just need to propagate glue-code failures reach
//! for `eyre::Result` the way the rest of this codebase does.

use crate::query::Span;

/// Failure compiling a parsed query into a matcher tree. Query syntax
/// errors (`Node::Error`) are not a `CompileError` at all - the compiler
/// just drops them - so the only way to fail here is a leaf that parsed
/// fine but doesn't construct, e.g. a malformed regex literal.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid regex at {span:?}: {source}")]
    InvalidRegex {
        span: Span,
        #[source]
        source: regex::Error,
    },
}

/// Failure operating on a [`crate::search::SearchManager`] or the
/// [`crate::search::ManagerRegistry`] that owns it.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The system query failed to compile; the manager transitions to its
    /// Broken state and every subsequent `search()` fails the same way
    /// until a new, valid system query text replaces it.
    #[error("query failed to compile: {message}")]
    Broken { message: String },

    #[error("no manager registered for widget {0:?}")]
    NotFound(String),
}

impl From<CompileError> for ManagerError {
    fn from(err: CompileError) -> Self {
        ManagerError::Broken {
            message: err.to_string(),
        }
    }
}
