//! Resolution errors

/// Why a document's inheritance chain could not be resolved.
///
/// These are recoverable per root name: the loader reports them and
/// carries on with unrelated documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A document is its own ancestor. `path` runs from the first
    /// occurrence of the repeated name to its second occurrence.
    #[error("circular inheritance: {}", .path.join(" -> "))]
    Circular { path: Vec<String> },

    /// A referenced base document does not exist in the loaded set.
    #[error(
        "base document '{base}' not found (required by {})",
        .required_by.as_deref().unwrap_or("<root>")
    )]
    MissingBase {
        base: String,
        required_by: Option<String>,
    },

    /// The base reference is neither a string nor empty.
    #[error("document '{name}': base reference must be a string, found {found}")]
    InvalidBase { name: String, found: String },
}
