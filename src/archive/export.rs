//! Archive builder: serialize selected sessions plus a manifest into a
//! gzip-compressed tar on disk.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::store::{Selector, SessionStore};

use super::manifest::{MANIFEST_NAME, Manifest};

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Sessions written into the archive (0 is valid; the archive still
    /// exists with an empty manifest).
    pub count: usize,
    pub path: PathBuf,
}

/// Output path used when `-o` is not given:
/// `claude-sessions-<YYYYMMDD-HHMMSS>.tar.gz` in the working directory.
pub fn default_output_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("claude-sessions-{stamp}.tar.gz"))
}

/// Export the sessions matched by `selector` to `output`.
///
/// The manifest is written first so readers can decide what they want before
/// touching any payload. Zero matches still succeed with an empty manifest.
pub fn export_archive(
    store: &SessionStore,
    selector: &Selector,
    output: &Path,
) -> Result<ExportSummary> {
    let sessions = store.select(selector)?;
    let manifest = Manifest::new(&sessions);

    let file = File::create(output)
        .with_context(|| format!("create archive {}", output.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let json = manifest.to_json().context("serialize manifest")?;
    let mut header = tar::Header::new_gnu();
    header.set_size(json.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(manifest.created_at.max(0) as u64);
    header.set_cksum();
    builder
        .append_data(&mut header, MANIFEST_NAME, json.as_bytes())
        .context("write manifest entry")?;

    for (session, entry) in sessions.iter().zip(&manifest.sessions) {
        let mut payload = File::open(&session.path)
            .with_context(|| format!("open session {}", session.path.display()))?;
        builder
            .append_file(&entry.path, &mut payload)
            .with_context(|| format!("archive session {}", session.id))?;
        tracing::debug!(id = %session.id, member = %entry.path, "archived session");
    }

    let encoder = builder.into_inner().context("finish tar stream")?;
    encoder.finish().context("finish gzip stream")?;

    tracing::info!(
        count = sessions.len(),
        path = %output.display(),
        "export complete"
    );

    Ok(ExportSummary {
        count: sessions.len(),
        path: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::import::read_manifest;
    use std::fs;

    const ID: &str = "abcdef12-0000-4000-8000-000000000001";

    fn seeded_store(tmp: &tempfile::TempDir) -> SessionStore {
        let dir = tmp.path().join("claude/projects/-home-u-app");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{ID}.jsonl")), "{\"type\":\"user\"}\n").unwrap();
        SessionStore::open(tmp.path().join("claude"))
    }

    #[test]
    fn export_all_writes_manifest_and_payloads() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&tmp);
        let out = tmp.path().join("backup.tar.gz");

        let summary = export_archive(&store, &Selector::All, &out).unwrap();
        assert_eq!(summary.count, 1);
        assert!(out.exists());

        let manifest = read_manifest(&out).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.sessions[0].id, ID);
    }

    #[test]
    fn empty_store_exports_empty_manifest() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = SessionStore::open(tmp.path().join("claude"));
        let out = tmp.path().join("empty.tar.gz");

        let summary = export_archive(&store, &Selector::All, &out).unwrap();
        assert_eq!(summary.count, 0);
        assert!(out.exists());
        assert!(read_manifest(&out).unwrap().is_empty());
    }

    #[test]
    fn export_by_id_prefix() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&tmp);
        let out = tmp.path().join("one.tar.gz");

        let summary =
            export_archive(&store, &Selector::Session("abcdef12".into()), &out).unwrap();
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn default_output_path_is_tar_gz() {
        let p = default_output_path();
        let name = p.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("claude-sessions-"));
        assert!(name.ends_with(".tar.gz"));
    }
}
