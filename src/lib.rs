//! # man-index Library
//!
//! Scans DocBook `refentry` manual-page sources, extracts identifying
//! metadata (name, section, one-line purpose) from each, and assembles a
//! single aggregate index document cross-referencing every page, grouped
//! alphabetically with a trailing summary count.
//!
//! The XML access layer ([`parser`], [`entities`], [`xinclude`],
//! [`serialize`]) wraps parsing and pretty-printing, including the redirect
//! of the one custom external entity file the DocBook sources reference.

pub mod cli;
pub mod entities;
pub mod error;
pub mod index;
pub mod parser;
pub mod render;
pub mod serialize;
pub mod tree;
pub mod xinclude;

pub use cli::Cli;
pub use entities::{ENTITY_FILE_MARKER, EntityCatalog};
pub use error::{IndexError, Result};
pub use index::{
    Index, NameEntry, PageMetadata, build_index, check_identity, extract_metadata,
    normalize_whitespace, totals,
};
pub use parser::XmlLoader;
pub use render::{assemble, render_index};
pub use serialize::to_bytes;
pub use tree::{Document, Element, Node};
