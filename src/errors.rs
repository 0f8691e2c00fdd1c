//! Error types with rich diagnostics using miette.
//!
//! Two families: `SceneError` for precondition violations on the live tree
//! (rejected synchronously, before any mutation), and `ArchiveError` for
//! anything that goes wrong turning bytes into a tree or back. Archive
//! parse errors carry source spans for labeled diagnostics.
//!
//! Geometry degeneracies (zero-size frame decomposition and the like) are
//! deliberately *not* errors; they fall back to a roll-only solution.
//! Unknown legacy enum spellings on read are logged and defaulted, never
//! fatal.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Source context for archive error reporting.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Name of the source (filename or "<input>")
    pub name: String,
    /// The full source text
    pub source: String,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Create a NamedSource for miette.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.source.clone())
    }
}

// ============================================================================
// Structural (live-tree) errors
// ============================================================================

/// Precondition violations on tree mutation. No partial state: when one of
/// these is returned the tree is exactly as it was before the call.
#[derive(Error, Diagnostic, Debug)]
pub enum SceneError {
    #[error("child index {index} out of range (len {len})")]
    #[diagnostic(code(scenedoc::scene::index_out_of_range))]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot remove the last remaining layer")]
    #[diagnostic(
        code(scenedoc::scene::last_layer),
        help("a page always keeps at least one layer; add a replacement first")
    )]
    LastLayer,

    #[error("cannot remove the last remaining page")]
    #[diagnostic(
        code(scenedoc::scene::last_page),
        help("a document always keeps at least one page; add a replacement first")
    )]
    LastPage,

    #[error("no layer named {name:?}")]
    #[diagnostic(code(scenedoc::scene::unknown_layer))]
    UnknownLayer { name: String },

    #[error("adding this child would create a cycle")]
    #[diagnostic(code(scenedoc::scene::would_cycle))]
    WouldCreateCycle,

    #[error("node is not attached to this scene")]
    #[diagnostic(code(scenedoc::scene::stale_node))]
    StaleNode,

    #[error("operation requires a {expected} node, got {got}")]
    #[diagnostic(code(scenedoc::scene::wrong_kind))]
    WrongKind {
        expected: &'static str,
        got: &'static str,
    },
}

// ============================================================================
// Archive errors
// ============================================================================

/// Errors reading or writing the archive format. A read that returns one of
/// these never hands back a partially built tree.
#[derive(Error, Diagnostic, Debug)]
pub enum ArchiveError {
    #[error("malformed document markup")]
    #[diagnostic(code(scenedoc::archive::parse))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("unknown element tag: {tag}")]
    #[diagnostic(
        code(scenedoc::archive::unknown_tag),
        help("the tag is not in the class registry; the document may be from a newer version")
    )]
    UnknownTag { tag: String },

    #[error("element <{tag}> is missing required attribute {attr:?}")]
    #[diagnostic(code(scenedoc::archive::missing_attribute))]
    MissingAttribute { tag: String, attr: &'static str },

    #[error("invalid value {value:?} for attribute {attr:?} on <{tag}>")]
    #[diagnostic(code(scenedoc::archive::bad_attribute))]
    BadAttribute {
        tag: String,
        attr: String,
        value: String,
    },

    #[error("unresolved reference id {id:?} after finish pass")]
    #[diagnostic(
        code(scenedoc::archive::unresolved_reference),
        help("a link target (e.g. a linked-text successor) never appeared in the document")
    )]
    UnresolvedReference { id: String },

    #[error("cannot read source {name:?}")]
    #[diagnostic(code(scenedoc::archive::unreadable_source))]
    UnreadableSource {
        name: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("resource {name:?} is missing or undecodable")]
    #[diagnostic(code(scenedoc::archive::bad_resource))]
    BadResource { name: String },

    #[error("document root must be <document>, got <{tag}>")]
    #[diagnostic(code(scenedoc::archive::bad_root))]
    BadRoot { tag: String },
}
