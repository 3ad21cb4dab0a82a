//! Command-line front end: argument parsing, dispatch, and the
//! human-readable rendering of listings and summaries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::archive::{ImportSummary, default_output_path, export_archive, import_archive};
use crate::config::Config;
use crate::remote::Transport;
use crate::store::{Selector, SessionStore};

#[derive(Parser, Debug)]
#[command(
    name = "claude-sync",
    version,
    about = "Back up, restore, and sync Claude Code sessions between machines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Claude data directory (defaults to ~/.claude)
    #[arg(long, global = true, env = "CLAUDE_SYNC_CLAUDE_DIR", value_name = "PATH")]
    pub claude_dir: Option<PathBuf>,

    /// Show timestamp and size columns in local listings (remote listings
    /// only carry id and project)
    #[arg(long, global = true)]
    pub details: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List local sessions, or sessions on a remote host (the default)
    List {
        /// Remote host as user@host; lists the local store when omitted
        remote: Option<String>,
    },

    /// Write sessions to a compressed .tar.gz archive
    Export {
        /// Only the session with this id (or unique id prefix)
        #[arg(long, value_name = "ID", conflicts_with = "project")]
        session: Option<String>,

        /// Only sessions whose project path contains this name
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Archive path to write (defaults to claude-sessions-<timestamp>.tar.gz)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Import sessions from an archive, skipping ids already present
    Import {
        /// Archive produced by `claude-sync export`
        archive: PathBuf,
    },

    /// Export local sessions and import them on a remote host
    Push {
        /// Only the session with this id (or unique id prefix)
        #[arg(long, value_name = "ID", conflicts_with = "project")]
        session: Option<String>,

        /// Only sessions whose project path contains this name
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Remote host as user@host (defaults to default_remote from config)
        remote: Option<String>,
    },

    /// Export sessions on a remote host and import them locally
    Pull {
        /// Only the session with this id (or unique id prefix)
        #[arg(long, value_name = "ID", conflicts_with = "project")]
        session: Option<String>,

        /// Only sessions whose project path contains this name
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Remote host as user@host (defaults to default_remote from config)
        remote: Option<String>,
    },
}

/// Run one parsed invocation to completion.
pub fn execute(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let claude_dir = cli
        .claude_dir
        .or_else(|| config.claude_dir.clone())
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".claude"));
    let store = SessionStore::open(claude_dir);
    let transport = Transport::new().with_connect_timeout(config.connect_timeout_secs);

    match cli.command.unwrap_or(Command::List { remote: None }) {
        Command::List { remote: None } => list_local(&store, cli.details),
        Command::List {
            remote: Some(remote),
        } => {
            if cli.details {
                tracing::warn!("--details has no effect on remote listings");
            }
            list_remote(&transport, &remote)
        }

        Command::Export {
            session,
            project,
            output,
        } => {
            let selector = Selector::from_flags(session, project);
            let output = output.unwrap_or_else(default_output_path);
            let summary = export_archive(&store, &selector, &output)?;
            println!(
                "Exported {} {} to {}",
                summary.count,
                sessions_word(summary.count),
                summary.path.display()
            );
            Ok(())
        }

        Command::Import { archive } => {
            let summary = import_archive(&store, &archive)?;
            render_import(&summary);
            Ok(())
        }

        Command::Push {
            session,
            project,
            remote,
        } => {
            let host = resolve_remote(remote, &config)?;
            let selector = Selector::from_flags(session, project);
            let report = transport.push(&store, &host, &selector)?;
            println!(
                "Pushed {} {} to {}",
                report.count,
                sessions_word(report.count),
                host
            );
            if !report.remote_summary.is_empty() {
                println!("{}", report.remote_summary);
            }
            Ok(())
        }

        Command::Pull {
            session,
            project,
            remote,
        } => {
            let host = resolve_remote(remote, &config)?;
            let selector = Selector::from_flags(session, project);
            let summary = transport.pull(&store, &host, &selector)?;
            render_import(&summary);
            Ok(())
        }
    }
}

fn list_local(store: &SessionStore, details: bool) -> Result<()> {
    let sessions = store.sessions()?;
    if sessions.is_empty() {
        println!("No sessions found");
        return Ok(());
    }

    println!(
        "{}",
        format!("Sessions in {}", display_dir(store.root())).bold()
    );
    for session in &sessions {
        if details {
            println!(
                "  {}  {}  {:>9}  {}",
                session.short_id(),
                format_time(session.modified_at),
                format_size(session.size_bytes),
                session.project
            );
        } else {
            println!("  {}  {}", session.short_id(), session.project);
        }
    }
    println!();
    println!("{} {}", sessions.len(), sessions_word(sessions.len()));
    Ok(())
}

fn list_remote(transport: &Transport, remote: &str) -> Result<()> {
    let sessions = transport.list_remote(remote)?;
    println!("{}", format!("Sessions on {remote}:").bold());
    if sessions.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for session in &sessions {
        println!("  {}  {}", session.short_id(), session.project);
    }
    println!();
    println!("{} {}", sessions.len(), sessions_word(sessions.len()));
    Ok(())
}

fn render_import(summary: &ImportSummary) {
    println!(
        "Imported {} {}, skipped {}",
        summary.imported,
        sessions_word(summary.imported),
        summary.skipped
    );
    if summary.failed > 0 {
        println!(
            "{} {} could not be imported (see warnings above)",
            summary.failed,
            sessions_word(summary.failed)
        );
    }
}

fn resolve_remote(positional: Option<String>, config: &Config) -> Result<String> {
    positional.or_else(|| config.default_remote.clone()).context(
        "no remote specified; pass user@host or set default_remote in \
         ~/.config/claude-sync/config.toml",
    )
}

fn sessions_word(n: usize) -> &'static str {
    if n == 1 { "session" } else { "sessions" }
}

/// Render a store path with the home directory abbreviated to `~`, so the
/// default store shows as `~/.claude`.
fn display_dir(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

fn format_time(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_parses_as_default_list() {
        let cli = Cli::parse_from(["claude-sync"]);
        assert!(cli.command.is_none());
        assert!(!cli.details);
    }

    #[test]
    fn details_flag_works_with_and_without_subcommand() {
        let cli = Cli::parse_from(["claude-sync", "--details"]);
        assert!(cli.details);
        let cli = Cli::parse_from(["claude-sync", "list", "--details"]);
        assert!(cli.details);
    }

    #[test]
    fn export_flags_parse() {
        let cli = Cli::parse_from([
            "claude-sync",
            "export",
            "--session",
            "abcdef12",
            "-o",
            "/tmp/x.tar.gz",
        ]);
        match cli.command {
            Some(Command::Export {
                session, output, ..
            }) => {
                assert_eq!(session.as_deref(), Some("abcdef12"));
                assert_eq!(output, Some(PathBuf::from("/tmp/x.tar.gz")));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn session_and_project_filters_conflict() {
        for sub in ["export", "push", "pull"] {
            let err = Cli::try_parse_from([
                "claude-sync",
                sub,
                "--session",
                "abcdef12",
                "--project",
                "app",
            ])
            .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn sessions_word_pluralizes() {
        assert_eq!(sessions_word(0), "sessions");
        assert_eq!(sessions_word(1), "session");
        assert_eq!(sessions_word(2), "sessions");
    }
}
