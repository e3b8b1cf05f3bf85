//! Stream link persistence
//!
//! Writes one `.strmlnk` file per harvested episode under a fixed
//! `TV/<show>/S<season>E<episode>` layout below the configured base
//! directory.

use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting a stream link
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to create the parent directory for a record
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to write the record file itself
    #[error("Failed to create stream link {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// A fully populated episode tuple ready to be written.
///
/// All four fields are guaranteed non-empty by construction; adapters that
/// cannot fill one skip the element instead of emitting a partial record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLink {
    /// Series title, used verbatim as a path segment
    pub show: String,
    /// Bare season digits
    pub season: String,
    /// Bare episode digits
    pub episode: String,
    /// Absolute URL to the playable resource
    pub url: String,
}

impl EpisodeLink {
    /// Builds a link from the four canonical fields, rejecting any empty one.
    pub fn new(show: &str, season: &str, episode: &str, url: &str) -> Option<Self> {
        if show.is_empty() || season.is_empty() || episode.is_empty() || url.is_empty() {
            return None;
        }
        Some(Self {
            show: show.to_string(),
            season: season.to_string(),
            episode: episode.to_string(),
            url: url.to_string(),
        })
    }
}

/// Writes stream link records below a configured base directory.
#[derive(Debug, Clone)]
pub struct StreamLinkSink {
    base_dir: PathBuf,
}

impl StreamLinkSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The path a link will be written to:
    /// `<base>/TV/<show>/S<season>E<episode>.strmlnk`.
    pub fn path_for(&self, link: &EpisodeLink) -> PathBuf {
        self.base_dir
            .join("TV")
            .join(&link.show)
            .join(format!("S{}E{}.strmlnk", link.season, link.episode))
    }

    /// Persists a single record, overwriting any previous content at the
    /// same path. Missing parent directories are created first.
    pub fn write(&self, link: &EpisodeLink) -> Result<PathBuf, SinkError> {
        let path = self.path_for(link);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, format!("{}\n", link.url)).map_err(|source| SinkError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
