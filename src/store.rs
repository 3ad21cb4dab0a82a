//! Read-only view of the local Claude Code session store.
//!
//! Claude Code keeps one `.jsonl` transcript per session under
//! `~/.claude/projects/<escaped-project-dir>/<session-uuid>.jsonl`, where the
//! escaped directory name is the absolute project path with `/` replaced by
//! `-`. This module enumerates those files into [`Session`] records; payloads
//! are treated as opaque blobs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

/// One saved session on disk.
#[derive(Debug, Clone)]
pub struct Session {
    /// Full session UUID (the filename stem).
    pub id: String,
    /// Unescaped project path, e.g. `/home/user/src/app`.
    pub project: String,
    /// Escaped directory name as it appears under `projects/`.
    pub project_dir: String,
    /// Absolute path to the `.jsonl` payload.
    pub path: PathBuf,
    /// Modification time, unix seconds.
    pub modified_at: i64,
    pub size_bytes: u64,
}

impl Session {
    /// Short id used in listings (first 8 hex chars of the UUID).
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Which sessions an export/push/pull operates on.
#[derive(Debug, Clone, Default)]
pub enum Selector {
    #[default]
    All,
    /// Exact id or unique prefix.
    Session(String),
    /// Substring match on the project path.
    Project(String),
}

impl Selector {
    /// Build a selector from the `--session` / `--project` flags. The CLI
    /// rejects passing both; for direct callers `--session` wins.
    pub fn from_flags(session: Option<String>, project: Option<String>) -> Self {
        match (session, project) {
            (Some(id), _) => Self::Session(id),
            (None, Some(name)) => Self::Project(name),
            (None, None) => Self::All,
        }
    }
}

/// Handle on a session directory. The directory does not need to exist;
/// a missing store just enumerates as empty.
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn open(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: claude_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Destination path for a session payload inside this store.
    pub fn session_path(&self, project_dir: &str, id: &str) -> PathBuf {
        self.projects_dir()
            .join(project_dir)
            .join(format!("{id}.jsonl"))
    }

    /// Enumerate all sessions, newest first.
    ///
    /// A missing `projects/` directory yields an empty list. I/O errors on an
    /// existing directory (e.g. permissions) are fatal.
    pub fn sessions(&self) -> Result<Vec<Session>> {
        let projects = self.projects_dir();
        if !projects.exists() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(&projects).min_depth(2).max_depth(2) {
            let entry = entry
                .with_context(|| format!("read session store under {}", projects.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_session_id(id) {
                continue;
            }
            let project_dir = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            let meta = entry
                .metadata()
                .with_context(|| format!("stat {}", path.display()))?;
            let modified_at = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            out.push(Session {
                id: id.to_string(),
                project: unescape_project(&project_dir),
                project_dir,
                path: path.to_path_buf(),
                modified_at,
                size_bytes: meta.len(),
            });
        }

        out.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    /// True if a session with exactly this id exists.
    pub fn contains(&self, id: &str) -> bool {
        let projects = self.projects_dir();
        if !projects.exists() {
            return false;
        }
        let file_name = format!("{id}.jsonl");
        WalkDir::new(&projects)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .flatten()
            .any(|e| e.file_type().is_file() && e.file_name().to_str() == Some(&file_name))
    }

    /// Resolve a selector against the store.
    ///
    /// Unmatched selectors yield an empty set (callers report the count);
    /// an ambiguous session-id prefix is an error.
    pub fn select(&self, selector: &Selector) -> Result<Vec<Session>> {
        let all = self.sessions()?;
        match selector {
            Selector::All => Ok(all),
            Selector::Session(query) => {
                let q = query.to_ascii_lowercase();
                let matches: Vec<Session> = all
                    .into_iter()
                    .filter(|s| s.id == q || s.id.starts_with(&q))
                    .collect();
                if matches.len() > 1 {
                    bail!(
                        "session id '{query}' is ambiguous ({} matches); use more characters",
                        matches.len()
                    );
                }
                Ok(matches)
            }
            Selector::Project(name) => Ok(all
                .into_iter()
                .filter(|s| s.project.contains(name.as_str()) || s.project_dir == *name)
                .collect()),
        }
    }
}

/// Check that a filename stem looks like a session UUID
/// (8-4-4-4-12 hex groups).
pub(crate) fn is_session_id(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 5 {
        return false;
    }
    let expected = [8, 4, 4, 4, 12];
    parts
        .iter()
        .zip(expected)
        .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Decode an escaped project directory name back into a path.
/// Claude Code replaces `/` with `-`, so `-home-user-app` -> `/home/user/app`.
pub(crate) fn unescape_project(dir_name: &str) -> String {
    dir_name.replace('-', "/")
}
