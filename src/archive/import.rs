//! Archive importer: materialize sessions from an archive into the local
//! store, skipping ids that are already present.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::store::{SessionStore, is_session_id};

use super::ArchiveError;
use super::manifest::{MANIFEST_NAME, Manifest, ManifestEntry};

/// Per-archive import counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSummary {
    /// Sessions written into the store.
    pub imported: usize,
    /// Sessions whose id was already present; left untouched.
    pub skipped: usize,
    /// Manifest entries whose payload was missing or unreadable.
    pub failed: usize,
}

/// Read and parse `manifest.json` out of an archive.
///
/// A missing file, invalid gzip/tar stream, or absent manifest entry is
/// fatal for the whole archive.
pub(crate) fn read_manifest(archive_path: &Path) -> Result<Manifest, ArchiveError> {
    let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_manifest = entry.path()?.as_ref() == Path::new(MANIFEST_NAME);
        if is_manifest {
            let mut json = String::new();
            entry.read_to_string(&mut json)?;
            return Ok(Manifest::parse(&json)?);
        }
    }
    Err(ArchiveError::MissingManifest)
}

/// Import an archive into `store`.
///
/// Conflict policy is skip-if-present: an id already in the store is counted
/// as skipped and never overwritten, even if the archived copy differs (the
/// mismatch is logged at warn level). A payload that the manifest promises
/// but the tar cannot deliver is counted as failed without aborting the
/// remaining entries. Manifest strings are untrusted: entries whose id is
/// not a session UUID or whose project_dir is not a plain directory name
/// are rejected as failed, so a hostile manifest can never write outside
/// the store.
pub fn import_archive(
    store: &SessionStore,
    archive_path: &Path,
) -> Result<ImportSummary, ArchiveError> {
    let manifest = read_manifest(archive_path)?;
    let mut summary = ImportSummary::default();

    // Decide per entry up front; the tar is stream-only, so the second pass
    // just pulls the members we still want.
    let mut wanted: HashMap<String, ManifestEntry> = HashMap::new();
    for entry in manifest.sessions {
        if !is_safe_entry(&entry) {
            summary.failed += 1;
            tracing::warn!(
                id = %entry.id,
                project_dir = %entry.project_dir,
                "rejecting manifest entry with unsafe id or path"
            );
        } else if store.contains(&entry.id) {
            summary.skipped += 1;
            note_conflict(store, &entry);
        } else {
            wanted.insert(entry.path.clone(), entry);
        }
    }

    if wanted.is_empty() {
        tracing::info!(skipped = summary.skipped, "nothing new to import");
        return Ok(summary);
    }

    let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let member = entry.path()?.to_string_lossy().into_owned();
        let Some(meta) = wanted.remove(&member) else {
            continue;
        };
        let dest = store.session_path(&meta.project_dir, &meta.id);
        match write_payload(&mut entry, &dest) {
            Ok(()) => {
                summary.imported += 1;
                tracing::debug!(id = %meta.id, dest = %dest.display(), "imported session");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(id = %meta.id, error = %e, "failed to import session payload");
            }
        }
    }

    // Entries the manifest listed but the tar never produced.
    for meta in wanted.values() {
        summary.failed += 1;
        tracing::warn!(id = %meta.id, member = %meta.path, "payload missing from archive");
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        failed = summary.failed,
        "import complete"
    );
    Ok(summary)
}

/// A manifest entry may only name a session UUID and a single directory
/// component under `projects/`; anything else could resolve outside the
/// store root.
fn is_safe_entry(entry: &ManifestEntry) -> bool {
    is_session_id(&entry.id)
        && !entry.project_dir.is_empty()
        && entry.project_dir != "."
        && entry.project_dir != ".."
        && !entry.project_dir.contains(['/', '\\'])
}

/// Write one payload via a temp file + rename in the destination directory.
fn write_payload(reader: &mut impl Read, dest: &Path) -> std::io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| std::io::Error::other("payload destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let tmp = dest.with_extension("jsonl.partial");
    let mut out = File::create(&tmp)?;
    if let Err(e) = std::io::copy(reader, &mut out) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, dest)
}

/// Same id already in the store: keep the local copy, but warn when the
/// archived one clearly differs so the operator can diff by hand.
fn note_conflict(store: &SessionStore, entry: &ManifestEntry) {
    let local = store.session_path(&entry.project_dir, &entry.id);
    match fs::metadata(&local) {
        Ok(meta) if meta.len() != entry.size_bytes => {
            tracing::warn!(
                id = %entry.id,
                local_bytes = meta.len(),
                archived_bytes = entry.size_bytes,
                "session already present with different content; keeping local copy"
            );
        }
        _ => {
            tracing::debug!(id = %entry.id, "session already present; skipping");
        }
    }
}
