//! Source-specific extractors
//!
//! Each submodule implements the plugin/cursor contract for one category of
//! source structure.

pub mod document;
pub mod relational;
