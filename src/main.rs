use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use media_organizer::models::{MediaLibrary, Operation, OutcomeStatus};
use media_organizer::reconcile::IdentifyReport;
use media_organizer::session::{DEFAULT_SESSION_FILE, Session};
use media_organizer::tree::HierarchicalNode;
use media_organizer::{ApiClient, AppState, ClientConfig, RenameSummary, Timeout, load_config};

#[derive(Debug, Parser)]
#[command(
    name = "media-organizer",
    version,
    about = "Scan, identify and rename media files through a media organizer backend"
)]
struct Cli {
    /// TOML file with base_url, timeout and headers
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "MEDIA_ORGANIZER_URL", global = true)]
    base_url: Option<String>,

    /// Seconds, or "never"
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Timeout>,

    /// Where the file list is kept between runs
    #[arg(long, global = true, default_value = DEFAULT_SESSION_FILE)]
    session: PathBuf,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan every configured library and start a new file list
    Scan {
        /// Include files that already look organized
        #[arg(long)]
        full: bool,
    },
    /// Change which files take part in identify and rename
    Select {
        #[arg(long, conflicts_with_all = ["none", "pattern", "paths"])]
        all: bool,
        #[arg(long, conflicts_with_all = ["pattern", "paths"])]
        none: bool,
        /// Select files whose path matches this regex
        #[arg(long, conflicts_with = "paths")]
        pattern: Option<String>,
        paths: Vec<String>,
    },
    /// Identify selected files, or only the given paths
    Identify { paths: Vec<String> },
    /// Rename every selected, identified file
    Rename,
    /// Scan, identify and rename in one go
    Organize {
        #[arg(long)]
        full: bool,
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Show the current file list
    Status,
    /// List directories on the backend host
    Dirs { path: Option<String> },
    /// Show size and timestamps of a file on the backend host
    Details { path: String },
    /// Delete a file on the backend host
    Delete { path: String },
    #[command(subcommand)]
    Config(ConfigAction),
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Test,
    AddLibrary {
        #[arg(long)]
        path: String,
        #[arg(long = "type")]
        kind: String,
    },
    RemoveLibrary {
        #[arg(long)]
        path: String,
    },
}

fn parse_timeout(raw: &str) -> Result<Timeout, String> {
    if raw.eq_ignore_ascii_case("never") {
        return Ok(Timeout::Never);
    }
    match raw.parse::<u64>() {
        Ok(0) => Err("use \"never\" instead of 0".to_string()),
        Ok(secs) => Ok(Timeout::Seconds(secs)),
        Err(_) => Err(format!("'{}' is neither a number of seconds nor \"never\"", raw)),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "media_organizer=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = client_config(&cli)?;
    let client = ApiClient::new(&config).context("Failed to set up the backend client")?;
    let mut state = AppState::new(client);
    state.restore(Session::load(&cli.session)?);

    println!("Media Organizer");
    println!("===============");
    println!("Backend: {} (timeout: {})\n", state.client().endpoints().base(), config.timeout);

    execute(&cli.command, &mut state, &cli.session).await
}

impl Command {
    fn changes_files(&self) -> bool {
        matches!(
            self,
            Command::Scan { .. }
                | Command::Select { .. }
                | Command::Identify { .. }
                | Command::Rename
                | Command::Organize { .. }
        )
    }
}

/// Runs one command and saves the session afterwards, also when a later step
/// of the command failed.
async fn execute(command: &Command, state: &mut AppState, session: &Path) -> Result<()> {
    let result = run(command, state).await;

    let saved = if command.changes_files() {
        state
            .snapshot()
            .save(session)
            .with_context(|| format!("Failed to save session to {}", session.display()))
    } else {
        Ok(())
    };
    result.and(saved)
}

async fn run(command: &Command, state: &mut AppState) -> Result<()> {
    match command {
        Command::Scan { full } => {
            let count = state.scan(*full).await.context("Scan failed")?;
            println!("✓ Found {} file(s)", count);
        }
        Command::Select {
            all,
            none,
            pattern,
            paths,
        } => {
            let selected = if *all {
                state.select_all();
                state.files().len()
            } else if *none {
                state.select_none();
                0
            } else if let Some(pattern) = pattern {
                let re = Regex::new(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
                state.select_matching(&re)
            } else if !paths.is_empty() {
                state.select_paths(paths)
            } else {
                bail!("Nothing to select: pass --all, --none, --pattern or paths");
            };
            println!("{} of {} file(s) selected", selected, state.files().len());
        }
        Command::Identify { paths } => {
            if !paths.is_empty() {
                state.set_files_to_identify(paths.clone());
            }
            let report = state.identify().await.context("Identification failed")?;
            print_identify_report(&report);
        }
        Command::Rename => {
            state.initialize().await?;
            let summary = state.rename().await.context("Rename failed")?;
            print_rename_summary(&summary);
        }
        Command::Organize { full, pattern } => {
            let count = state.scan(*full).await.context("Scan failed")?;
            println!("✓ Found {} file(s)", count);
            if count == 0 {
                return Ok(());
            }
            if let Some(pattern) = pattern {
                let re = Regex::new(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
                let selected = state.select_matching(&re);
                println!("{} file(s) match '{}'", selected, pattern);
            }

            let report = state.identify().await.context("Identification failed")?;
            print_identify_report(&report);

            let summary = state.rename().await.context("Rename failed")?;
            print_rename_summary(&summary);
        }
        Command::Status => print_status(state),
        Command::Dirs { path } => {
            let dirs = state.get_directories(path.as_deref().unwrap_or("")).await?;
            for dir in &dirs {
                println!("{:<30} {}", dir.name, dir.path);
            }
            println!("\n{} director(ies)", dirs.len());
        }
        Command::Details { path } => {
            let details = state.file_details(path).await?;
            println!("Path:     {}", details.full_path);
            println!("Size:     {} bytes", details.size);
            println!("Created:  {}", details.creation_time);
            println!("Modified: {}", details.modification_time);
        }
        Command::Delete { path } => {
            let response = state.delete_file(path).await?;
            if response.success {
                println!("✓ {}", response.message);
            } else {
                println!("✗ {}", response.message);
            }
        }
        Command::Config(action) => run_config(action, state).await?,
    }
    Ok(())
}

async fn run_config(action: &ConfigAction, state: &mut AppState) -> Result<()> {
    state.initialize().await?;
    match action {
        ConfigAction::Show => {
            let settings = state.settings();
            if settings.media_libraries.is_empty() {
                println!("No media libraries configured");
            }
            for library in &settings.media_libraries {
                println!("{:<8} {}", library.kind, library.path);
            }
            println!("\n{}", serde_json::to_string_pretty(settings)?);
        }
        ConfigAction::Test => {
            state.test_connection().await.context("Connection test failed")?;
            println!("✓ Connection test passed");
        }
        ConfigAction::AddLibrary { path, kind } => {
            state
                .add_library(MediaLibrary::new(path.clone(), kind.clone()))
                .await
                .context("Failed to save configuration")?;
            println!("✓ Added {} library at {}", kind, path);
        }
        ConfigAction::RemoveLibrary { path } => {
            state.remove_library(path).await.context("Failed to save configuration")?;
            println!("✓ Removed library at {}", path);
        }
    }
    Ok(())
}

fn print_identify_report(report: &IdentifyReport) {
    println!("✓ Identified {} file(s)", report.merged);
    for (path, error) in &report.failed {
        println!("✗ {}: {}", path, error);
    }
    if !report.unmatched.is_empty() {
        println!("⚠ {} result(s) did not match any file in the list", report.unmatched.len());
    }
    for collision in &report.collisions {
        println!("⚠ {} files would go into '{}'", collision.count, collision.sub_folder);
    }
}

fn print_rename_summary(summary: &RenameSummary) {
    for outcome in &summary.results {
        let mark = match outcome.status {
            OutcomeStatus::Success => "✓",
            OutcomeStatus::Warning => "⚠",
            _ => "✗",
        };
        let action = match outcome.operation {
            Operation::Delete => "removed",
            _ => "renamed",
        };
        match (&outcome.new_path, &outcome.message) {
            (Some(new_path), _) => println!("{} {} {} -> {}", mark, action, outcome.file, new_path),
            (None, Some(message)) => println!("{} {}: {}", mark, outcome.file, message),
            (None, None) => println!("{} {}", mark, outcome.file),
        }
    }

    println!("===============");
    println!("{}", summary.message);
    if summary.errors == 0 && summary.success > 0 {
        println!("✓ All files renamed successfully!");
    } else if summary.success > 0 {
        println!("⚠ Some files were renamed, but there were errors with others.");
    } else {
        println!("✗ No files were renamed.");
    }
}

fn print_status(state: &AppState) {
    fn walk(nodes: &[HierarchicalNode], depth: usize) {
        for node in nodes {
            let indent = "  ".repeat(depth);
            match node {
                HierarchicalNode::Folder { name, children } => {
                    println!("{}{}/", indent, name);
                    walk(children, depth + 1);
                }
                HierarchicalNode::Leaf(entry) => {
                    let mark = if entry.selected { "[x]" } else { "[ ]" };
                    let note = if entry.renamed {
                        " (renamed)".to_string()
                    } else if !entry.new_name.is_empty() {
                        format!(" -> {}/{}", entry.new_sub_folder, entry.new_name)
                    } else {
                        String::new()
                    };
                    println!("{}{} {}{}", indent, mark, entry.file_name(), note);
                }
            }
        }
    }

    if state.files().is_empty() {
        println!("No files. Run `scan` first.");
        return;
    }
    walk(&state.tree(), 0);

    let ready = state.files().iter().filter(|f| f.is_rename_ready()).count();
    println!(
        "\n{} file(s), {} selected, {} ready to rename",
        state.files().len(),
        state.selected_files().len(),
        ready
    );
    if let Some(summary) = state.rename_results() {
        println!("Last rename: {}", summary.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_organizer::FileEntry;
    use tempfile::tempdir;

    fn offline_state() -> AppState {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::default().with_base_url(format!("http://{}/api", addr));
        AppState::new(ApiClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_failed_command_still_saves_session() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session.json");
        let mut state = offline_state();
        state.restore(Session {
            files: vec![FileEntry::discovered("/lib/A.mkv")],
            ..Session::default()
        });

        let command = Command::Identify {
            paths: vec!["/lib/A.mkv".to_string()],
        };
        assert!(execute(&command, &mut state, &session).await.is_err());

        let saved = Session::load(&session).unwrap();
        assert_eq!(saved.files, state.files());
        assert_eq!(saved.files_to_identify, vec!["/lib/A.mkv".to_string()]);
    }

    #[tokio::test]
    async fn test_read_only_command_skips_session() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session.json");
        let mut state = offline_state();

        execute(&Command::Status, &mut state, &session).await.unwrap();
        assert!(!session.exists());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("never"), Ok(Timeout::Never));
        assert_eq!(parse_timeout("NEVER"), Ok(Timeout::Never));
        assert_eq!(parse_timeout("30"), Ok(Timeout::Seconds(30)));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }
}
