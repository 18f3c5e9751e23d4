//! Tag reader capability.
//!
//! Tag parsing itself lives in external plugins; the core only defines the
//! contract so a reader can be bound through the plugin registry.

use std::path::Path;

/// Interface string a tag reader must report to be bound.
pub const TAG_READER_INTERFACE: &str = "Wavedeck/TagReader/0.7";

pub trait TagReader: Send + Sync {
    /// Points the reader at a new media file.
    fn set_source(&self, path: &Path);

    /// True when the current source was parsed successfully.
    fn is_valid(&self) -> bool;

    /// Expands a title format string such as `"%a - %t"` against the current
    /// source.
    fn format(&self, pattern: &str) -> String;
}
