//! The `manifest.json` descriptor bundled at the top of every archive.

use serde::{Deserialize, Serialize};

use crate::store::Session;

pub const MANIFEST_NAME: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// One session listed in an archive manifest. Carries enough metadata that
/// the importer never has to scan the tar to decide what to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub project: String,
    pub project_dir: String,
    /// Archive-internal member path, `projects/<project_dir>/<id>.jsonl`.
    pub path: String,
    pub modified_at: i64,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Unix seconds at export time.
    pub created_at: i64,
    pub sessions: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest for a set of selected sessions. An empty selection
    /// is valid and produces an empty session list.
    pub fn new(sessions: &[Session]) -> Self {
        Self {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            sessions: sessions
                .iter()
                .map(|s| ManifestEntry {
                    id: s.id.clone(),
                    project: s.project.clone(),
                    project_dir: s.project_dir.clone(),
                    path: member_path(&s.project_dir, &s.id),
                    modified_at: s.modified_at,
                    size_bytes: s.size_bytes,
                })
                .collect(),
        }
    }

    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Tar member path for a session payload.
pub fn member_path(project_dir: &str, id: &str) -> String {
    format!("projects/{project_dir}/{id}.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            project: "/home/u/app".into(),
            project_dir: "-home-u-app".into(),
            path: PathBuf::from("/tmp/x.jsonl"),
            modified_at: 1_700_000_000,
            size_bytes: 42,
        }
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let m = Manifest::new(&[session("abcdef12-0000-4000-8000-000000000001")]);
        let parsed = Manifest::parse(&m.to_json().unwrap()).unwrap();
        assert_eq!(parsed.version, MANIFEST_VERSION);
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed.sessions[0].path,
            "projects/-home-u-app/abcdef12-0000-4000-8000-000000000001.jsonl"
        );
    }

    #[test]
    fn empty_manifest_is_valid() {
        let m = Manifest::new(&[]);
        assert!(m.is_empty());
        let parsed = Manifest::parse(&m.to_json().unwrap()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Manifest::parse("not json").is_err());
        assert!(Manifest::parse("{\"version\":1}").is_err());
    }
}
