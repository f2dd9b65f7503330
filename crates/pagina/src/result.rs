//! Result and error types for Pagina.

use thiserror::Error;

/// Result type for Pagina operations
pub type PaginaResult<T> = Result<T, PaginaError>;

/// Errors that can occur in Pagina
#[derive(Debug, Error)]
pub enum PaginaError {
    /// Neither plural form of a tag exists on the provider surface
    #[error("cannot pluralize '{tag}': neither '{tag}s' nor '{tag}es' is on the provider surface")]
    CannotPluralize {
        /// Tag that could not be pluralized
        tag: String,
    },

    /// Region class inference has no namespace to resolve against
    #[error("cannot infer a class for region '{region}': the declaring schema has no namespace")]
    AmbiguousNamespace {
        /// Region whose class could not be inferred
        region: String,
    },

    /// An inferred or named region class is not registered in the namespace
    #[error("region class '{class}' for region '{region}' is not registered in the namespace")]
    RegionClassNotFound {
        /// Class name that failed to resolve
        class: String,
        /// Region that referenced the class
        region: String,
    },

    /// A finder accessor matched zero entities
    #[error("no region in '{region}' matches {criteria}")]
    NoMatchingRegion {
        /// Region collection that was searched
        region: String,
        /// Criteria that matched nothing
        criteria: String,
    },

    /// No element with the given name is declared on the schema
    #[error("no element named '{name}' is declared")]
    UnknownElement {
        /// Element name
        name: String,
    },

    /// No region with the given name is declared on the schema
    #[error("no region named '{name}' is declared")]
    UnknownRegion {
        /// Region name
        name: String,
    },

    /// No finder with the given name is declared on the schema
    #[error("no finder named '{name}' is declared")]
    UnknownFinder {
        /// Finder name
        name: String,
    },

    /// The element's tag does not carry the capability for this operation
    #[error("element '{name}' does not support {operation}")]
    UnsupportedAccessor {
        /// Element name
        name: String,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// A read/click/set accessor was invoked on an absent element
    #[error("element '{name}' ({tag}) is absent")]
    ElementAbsent {
        /// Element name
        name: String,
        /// Element tag
        tag: String,
    },

    /// A one-region accessor was used on a collection declaration or vice versa
    #[error("region '{region}' is declared as {declared}")]
    CardinalityMismatch {
        /// Region name
        region: String,
        /// How the region was declared
        declared: &'static str,
    },

    /// Element provider error, propagated unmodified
    #[error("element provider error: {message}")]
    Provider {
        /// Provider diagnostic message
        message: String,
    },

    /// Element provider timed out waiting for an element
    #[error("operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },
}
