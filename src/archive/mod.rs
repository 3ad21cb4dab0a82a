//! Session archive format: a gzip-compressed tar with a top-level
//! `manifest.json` followed by one `projects/<dir>/<id>.jsonl` member per
//! session. The member layout mirrors the store, so an archive can also be
//! unpacked with plain `tar -xzf` into `~/.claude` in a pinch.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod export;
pub mod import;
pub mod manifest;

pub use export::{ExportSummary, default_output_path, export_archive};
pub use import::{ImportSummary, import_archive};
pub use manifest::{MANIFEST_NAME, Manifest, ManifestEntry};

/// Errors that make an archive unusable as a whole.
///
/// Per-session payload problems inside an otherwise valid archive are not
/// represented here; the importer counts them and keeps going.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive has no {MANIFEST_NAME} entry")]
    MissingManifest,

    #[error("invalid {MANIFEST_NAME}: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    #[error("failed to read archive: {0}")]
    Io(#[from] io::Error),
}
