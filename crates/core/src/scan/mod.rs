//! Expansion of dropped files and directories into playable file paths.

use std::path::{Path, PathBuf};

use url::Url;
use walkdir::WalkDir;

use crate::settings::{SettingsProvider, FILE_FILTERS_KEY};

/// MIME type of a drag payload listing URIs, one per line.
pub const URI_LIST_MIME: &str = "text/uri-list";

/// Case-insensitive file-extension allow-list.
///
/// Patterns may be written `*.mp3`, `.mp3` or `mp3`. An empty list accepts
/// every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = patterns
            .into_iter()
            .map(|pattern| {
                pattern
                    .as_ref()
                    .trim()
                    .trim_start_matches('*')
                    .trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    /// Reads the allow-list stored under [`FILE_FILTERS_KEY`].
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self::new(settings.string_list(FILE_FILTERS_KEY))
    }

    pub fn accepts_all(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.accepts_all() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Lists `path` recursively: a file yields itself, a directory yields every
/// matching file beneath it in name order, descending into sub-directories
/// where they appear.
pub fn dir_list_recursive(path: &Path, filter: &ExtensionFilter) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && filter.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files
}

/// Parses a `text/uri-list` payload into local paths. Comment lines and
/// non-`file` URIs are skipped.
pub fn parse_uri_list(payload: &str) -> Vec<PathBuf> {
    payload
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match Url::parse(line) {
            Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
            Ok(url) => {
                tracing::debug!(%url, "ignoring non-local uri");
                None
            }
            Err(err) => {
                tracing::debug!(line, error = %err, "ignoring malformed uri");
                None
            }
        })
        .collect()
}

/// Expands every dropped path, preserving drop order.
pub fn expand_drop(paths: &[PathBuf], filter: &ExtensionFilter) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| dir_list_recursive(path, filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn normalises_patterns() {
        let filter = ExtensionFilter::new(["*.MP3", ".flac", "ogg", "  "]);
        assert!(filter.matches(Path::new("a.mp3")));
        assert!(filter.matches(Path::new("b.FLAC")));
        assert!(filter.matches(Path::new("c.ogg")));
        assert!(!filter.matches(Path::new("d.txt")));
        assert!(!filter.matches(Path::new("noext")));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = ExtensionFilter::default();
        assert!(filter.matches(Path::new("notes.txt")));
    }

    #[test]
    fn lists_matching_files_in_traversal_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        touch(&root.join("a.mp3"));
        touch(&root.join("b.txt"));
        touch(&root.join("c/d.mp3"));

        let files = dir_list_recursive(root, &ExtensionFilter::new(["mp3"]));
        assert_eq!(files, vec![root.join("a.mp3"), root.join("c/d.mp3")]);
    }

    #[test]
    fn single_files_are_filtered_too() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let song = dir.path().join("song.mp3");
        let notes = dir.path().join("notes.txt");
        touch(&song);
        touch(&notes);

        let filter = ExtensionFilter::new(["mp3"]);
        assert_eq!(dir_list_recursive(&song, &filter), vec![song]);
        assert!(dir_list_recursive(&notes, &filter).is_empty());
    }

    #[test]
    fn parses_uri_lists() {
        let payload = "# dragged from a file manager\r\nfile:///music/a%20b.mp3\r\nhttp://example.com/c.mp3\r\n\r\nnot a uri\r\n";
        let paths = parse_uri_list(payload);
        if cfg!(windows) {
            assert!(paths.len() <= 1);
        } else {
            assert_eq!(paths, vec![PathBuf::from("/music/a b.mp3")]);
        }
    }
}
