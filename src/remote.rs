//! Remote transport adapter: list, push, and pull sessions against a
//! `user@host` target over SSH.
//!
//! Every operation shells out to the system `ssh`/`scp` binaries in batch
//! mode, so non-interactive key auth must already be configured for the
//! target. Failures are surfaced verbatim from the transport's stderr and
//! nothing is retried; the operator re-invokes.
//!
//! `push` and `pull` reuse the local archive format over the wire: push
//! exports to a temp archive, copies it across, and runs `claude-sync
//! import` on the remote; pull does the converse. The remote end therefore
//! needs `claude-sync` on its PATH.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;

use crate::archive::{ImportSummary, export_archive, import_archive};
use crate::store::{Selector, SessionStore, is_session_id, unescape_project};

/// Errors from remote operations. Connection and auth failures carry the
/// ssh stderr verbatim.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh connection to {host} failed: {detail}")]
    Connection { host: String, detail: String },

    #[error("scp transfer failed: {0}")]
    Transfer(String),

    #[error("claude-sync is not installed on {0}; install it there to use push/pull")]
    RemoteToolMissing(String),

    #[error("remote command failed: {0}")]
    RemoteCommand(String),
}

/// A session as reported by a remote host's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub id: String,
    pub project: String,
}

impl RemoteSession {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Result of a push: how many sessions went over, plus the remote import
/// summary line for display.
#[derive(Debug, Clone)]
pub struct PushReport {
    pub count: usize,
    pub remote_summary: String,
}

/// Listing command run on the remote host. `|| true` keeps a missing store
/// from looking like a transport failure.
const REMOTE_LIST_CMD: &str = "find ~/.claude/projects -type f -name '*.jsonl' 2>/dev/null || true";

/// SSH-backed transport to a single remote at a time.
pub struct Transport {
    connect_timeout: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            connect_timeout: 10,
        }
    }

    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = seconds;
        self
    }

    fn ssh_opts(&self) -> Vec<String> {
        vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.connect_timeout),
            "-o".into(),
            "StrictHostKeyChecking=accept-new".into(),
        ]
    }

    fn ssh_output(&self, host: &str, remote_cmd: &str) -> Result<Output, TransportError> {
        tracing::debug!(host = %host, cmd = %remote_cmd, "running remote command");
        Command::new("ssh")
            .args(self.ssh_opts())
            .arg("--")
            .arg(host)
            .arg(remote_cmd)
            .output()
            .map_err(|source| TransportError::Spawn {
                tool: "ssh",
                source,
            })
    }

    fn scp(&self, from: &str, to: &str) -> Result<(), TransportError> {
        let output = Command::new("scp")
            .arg("-q")
            .args(self.ssh_opts())
            .arg(from)
            .arg(to)
            .output()
            .map_err(|source| TransportError::Spawn {
                tool: "scp",
                source,
            })?;
        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(from = %from, to = %to, error = %detail, "scp failed");
            return Err(TransportError::Transfer(detail));
        }
        Ok(())
    }

    /// List sessions on the remote host's store.
    pub fn list_remote(&self, host: &str) -> Result<Vec<RemoteSession>, TransportError> {
        let output = self.ssh_output(host, REMOTE_LIST_CMD)?;
        if !output.status.success() {
            return Err(classify_failure(host, &output));
        }
        let listing = String::from_utf8_lossy(&output.stdout);
        let sessions = parse_remote_listing(&listing);
        tracing::info!(host = %host, count = sessions.len(), "listed remote sessions");
        Ok(sessions)
    }

    /// Export the selected local sessions and import them on the remote.
    ///
    /// The local store is never mutated; the only local side effect is a
    /// temp archive, removed on the way out.
    pub fn push(
        &self,
        store: &SessionStore,
        host: &str,
        selector: &Selector,
    ) -> anyhow::Result<PushReport> {
        let local_tmp = temp_archive_path("push");
        let summary = export_archive(store, selector, &local_tmp)?;

        let result = self.push_archive(host, &local_tmp);
        let _ = fs::remove_file(&local_tmp);
        let remote_summary = result?;

        Ok(PushReport {
            count: summary.count,
            remote_summary,
        })
    }

    fn push_archive(&self, host: &str, archive: &Path) -> Result<String, TransportError> {
        let remote_tmp = remote_temp_path(archive);
        self.scp(
            &archive.display().to_string(),
            &format!("{host}:{remote_tmp}"),
        )?;

        let import_cmd = shell_join(["claude-sync", "import", remote_tmp.as_str()]);
        let cleanup = shell_join(["rm", "-f", remote_tmp.as_str()]);
        let output = self.ssh_output(host, &format!("{import_cmd}; rc=$?; {cleanup}; exit $rc"))?;
        if !output.status.success() {
            if remote_tool_missing(&output) {
                return Err(TransportError::RemoteToolMissing(host.to_string()));
            }
            return Err(classify_failure(host, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Export the selected sessions on the remote and import them locally.
    pub fn pull(
        &self,
        store: &SessionStore,
        host: &str,
        selector: &Selector,
    ) -> anyhow::Result<ImportSummary> {
        let remote_tmp = format!(
            "/tmp/claude-sync-pull-{}-{}.tar.gz",
            std::process::id(),
            chrono::Utc::now().timestamp()
        );

        let mut export_cmd = vec!["claude-sync", "export", "-o", remote_tmp.as_str()];
        match selector {
            Selector::All => {}
            Selector::Session(id) => export_cmd.extend(["--session", id.as_str()]),
            Selector::Project(name) => export_cmd.extend(["--project", name.as_str()]),
        }

        let output = self.ssh_output(host, &shell_join(export_cmd))?;
        if !output.status.success() {
            if remote_tool_missing(&output) {
                return Err(TransportError::RemoteToolMissing(host.to_string()).into());
            }
            return Err(classify_failure(host, &output).into());
        }

        let local_tmp = temp_archive_path("pull");
        let fetched = self.scp(
            &format!("{host}:{remote_tmp}"),
            &local_tmp.display().to_string(),
        );
        // Best-effort remote cleanup whether or not the copy worked.
        let _ = self.ssh_output(host, &shell_join(["rm", "-f", remote_tmp.as_str()]));
        fetched?;

        let summary = import_archive(store, &local_tmp);
        let _ = fs::remove_file(&local_tmp);
        Ok(summary?)
    }
}

/// Decide whether a failed ssh invocation was a connection/auth problem or
/// the remote command itself failing.
fn classify_failure(host: &str, output: &Output) -> TransportError {
    let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if is_connection_failure(&detail) {
        TransportError::Connection {
            host: host.to_string(),
            detail,
        }
    } else {
        TransportError::RemoteCommand(detail)
    }
}

fn is_connection_failure(stderr: &str) -> bool {
    [
        "Connection refused",
        "Connection timed out",
        "Operation timed out",
        "Could not resolve hostname",
        "No route to host",
        "Permission denied",
        "Host key verification failed",
    ]
    .iter()
    .any(|needle| stderr.contains(needle))
}

fn remote_tool_missing(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr);
    output.status.code() == Some(127) || stderr.contains("command not found")
}

/// Parse `find` output from the remote store into session records,
/// sorted by project then id. Lines that don't look like session payload
/// paths are ignored.
fn parse_remote_listing(listing: &str) -> Vec<RemoteSession> {
    let mut out: Vec<RemoteSession> = listing
        .lines()
        .filter_map(|line| {
            let path = Path::new(line.trim());
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                return None;
            }
            let id = path.file_stem()?.to_str()?;
            if !is_session_id(id) {
                return None;
            }
            let project_dir = path.parent()?.file_name()?.to_str()?;
            Some(RemoteSession {
                id: id.to_string(),
                project: unescape_project(project_dir),
            })
        })
        .collect();
    out.sort_by(|a, b| a.project.cmp(&b.project).then(a.id.cmp(&b.id)));
    out
}

/// Quote a remote command line so paths with spaces survive the login shell.
fn shell_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    shell_words::join(parts)
}

fn temp_archive_path(kind: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "claude-sync-{kind}-{}-{}.tar.gz",
        std::process::id(),
        chrono::Utc::now().timestamp()
    ))
}

fn remote_temp_path(local: &Path) -> String {
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("claude-sync-transfer.tar.gz");
    format!("/tmp/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_find_output_into_sessions() {
        let listing = "\
/home/u/.claude/projects/-home-u-app/abcdef12-0000-4000-8000-000000000001.jsonl
/home/u/.claude/projects/-home-u-app/not-a-session.jsonl
/home/u/.claude/projects/-home-u-zzz/12345678-0000-4000-8000-000000000002.jsonl
/home/u/.claude/projects/-home-u-app/sessions-index.json
";
        let sessions = parse_remote_listing(listing);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].project, "/home/u/app");
        assert_eq!(sessions[0].short_id(), "abcdef12");
        assert_eq!(sessions[1].project, "/home/u/zzz");
    }

    #[test]
    fn empty_listing_parses_empty() {
        assert!(parse_remote_listing("").is_empty());
        assert!(parse_remote_listing("\n\n").is_empty());
    }

    #[test]
    fn connection_failures_are_recognized() {
        assert!(is_connection_failure(
            "ssh: Could not resolve hostname bad-host: Name or service not known"
        ));
        assert!(is_connection_failure("Permission denied (publickey)."));
        assert!(is_connection_failure("connect to host x port 22: Connection refused"));
        assert!(!is_connection_failure("tar: manifest.json: not found"));
    }

    #[test]
    fn shell_quoting_keeps_simple_args_bare() {
        assert_eq!(
            shell_join(["claude-sync", "import", "/tmp/a.tar.gz"]),
            "claude-sync import /tmp/a.tar.gz"
        );
        assert_eq!(
            shell_join(["--project", "my project"]),
            "--project 'my project'"
        );
    }

    #[test]
    fn transport_timeout_is_configurable() {
        let t = Transport::new().with_connect_timeout(30);
        assert!(t.ssh_opts().contains(&"ConnectTimeout=30".to_string()));
    }

    #[test]
    fn remote_temp_path_uses_archive_name() {
        let p = temp_archive_path("push");
        let r = remote_temp_path(&p);
        assert!(r.starts_with("/tmp/claude-sync-push-"));
        assert!(r.ends_with(".tar.gz"));
    }
}
