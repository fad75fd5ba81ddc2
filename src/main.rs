//! tide - file-manager engine from the command line.
//!
//! Usage:
//!   tide stat PATH                 Show file metadata
//!   tide ls [PATH]                 List a directory
//!   tide preflight SRC... --to DIR Plan a copy and report type conflicts
//!   tide copy SRC... --to DIR      Copy trees into a directory
//!   tide move SRC... --to DIR      Move trees into a directory
//!   tide delete PATH...            Delete trees
//!   tide watch DIR...              Report directory listing changes
//!   tide --help                    Show help

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tidefile_core::{
    EngineConfig, FileStat, LinkOption, Path, Progress, Target, list_children, lstat,
};
use tidefile_ops::{Engine, TaskKind, TaskState};
use tidefile_scan::{ScanProgress, preflight};
use tidefile_watch::{WatchConfig, WatchService};

#[derive(Parser)]
#[command(
    name = "tide",
    version,
    about = "Copy, move, delete and watch file trees",
    long_about = "tide drives the tidefile engine: byte-exact paths, \
                  conflict-free copies with numbered names, cancellable \
                  tree operations and debounced directory watching.\n\n\
                  Set TIDEFILE_LOG (e.g. `debug`) to see engine logs on stderr."
)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show metadata for a path
    Stat {
        path: PathBuf,

        /// Describe a symbolic link itself rather than its target
        #[arg(short = 'P', long)]
        no_follow: bool,
    },

    /// List a directory, sorted by name
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
    },

    /// Walk the sources and report entries whose destination has the other type
    Preflight {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: PathBuf,
    },

    /// Copy sources into a directory
    Copy {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Move sources into a directory
    Move {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Delete paths and everything beneath them
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print a line each time a directory's listing changes
    Watch {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Coalescing window in milliseconds
        #[arg(short, long, default_value = "75")]
        debounce_ms: u64,

        /// Poll at this interval in milliseconds instead of using inotify
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Stop after this many seconds (default: run until interrupted)
        #[arg(short, long)]
        seconds: Option<u64>,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Worker threads (0 = number of CPUs)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Do not carry modification times over to copies
    #[arg(long)]
    no_preserve_times: bool,
}

impl EngineArgs {
    fn config(&self) -> Result<EngineConfig> {
        EngineConfig::builder()
            .max_workers(self.workers)
            .preserve_timestamps(!self.no_preserve_times)
            .progress_interval(Duration::from_millis(250))
            .build()
            .context("Invalid engine configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Command::Stat { path, no_follow } => run_stat(&path, no_follow, json),
        Command::Ls { path, all } => run_ls(&path, all, json),
        Command::Preflight { sources, to } => run_preflight(&sources, &to, json),
        Command::Copy {
            sources,
            to,
            engine,
        } => {
            let target = Target::new(sources.iter().map(|s| Path::from(s.as_path())), to);
            run_task(engine.config()?, TaskKind::Copy, target, json).await
        }
        Command::Move {
            sources,
            to,
            engine,
        } => {
            let target = Target::new(sources.iter().map(|s| Path::from(s.as_path())), to);
            run_task(engine.config()?, TaskKind::Move, target, json).await
        }
        Command::Delete { paths, engine } => {
            let target = Target::for_delete(paths.iter().map(|p| Path::from(p.as_path())));
            run_task(engine.config()?, TaskKind::Delete, target, json).await
        }
        Command::Watch {
            dirs,
            debounce_ms,
            poll_ms,
            seconds,
        } => run_watch(&dirs, debounce_ms, poll_ms, seconds, json).await,
    }
}

/// Logs go to stderr so they never mix with command output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("TIDEFILE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_stat(path: &std::path::Path, no_follow: bool, json: bool) -> Result<()> {
    let option = if no_follow {
        LinkOption::NoFollow
    } else {
        LinkOption::Follow
    };
    let path = Path::from(path);
    let stat = FileStat::of(&path, option).with_context(|| format!("Cannot stat {path}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
        return Ok(());
    }

    println!("  Path: {path}");
    println!("  Kind: {}", stat.kind);
    println!("  Size: {} ({} bytes)", format_size(stat.size), stat.size);
    println!("  Mode: {} ({:04o})", stat.mode_string(), stat.mode);
    println!(" Inode: {} on device {}", stat.inode, stat.device);
    println!(" Links: {}", stat.nlink);
    println!(" Owner: {}:{}", stat.uid, stat.gid);
    for (label, time) in [
        ("Access", stat.accessed),
        ("Modify", stat.modified),
        ("Change", stat.changed),
    ] {
        match time.to_datetime() {
            Some(at) => println!("{label}: {at}"),
            None => println!("{label}: {}s", time.secs),
        }
    }
    Ok(())
}

fn run_ls(path: &std::path::Path, all: bool, json: bool) -> Result<()> {
    let dir = Path::from(path);
    let children = list_children(&dir).with_context(|| format!("Cannot list {dir}"))?;

    let mut rows = Vec::new();
    for child in children.into_iter().filter(|c| all || !c.is_hidden()) {
        match lstat(&child) {
            Ok(stat) => rows.push((child, stat)),
            // Entries may vanish between listing and stat.
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err).with_context(|| format!("Cannot stat {child}")),
        }
    }

    if json {
        let entries: Vec<_> = rows
            .iter()
            .map(|(path, stat)| {
                serde_json::json!({
                    "name": path.name().map(|n| n.to_string()),
                    "path": path,
                    "stat": stat,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (path, stat) in &rows {
        let name = path.name().map(|n| n.to_string()).unwrap_or_default();
        let marker = if stat.is_dir() { "/" } else { "" };
        println!(
            "{} {:>10}  {}{}",
            stat.mode_string(),
            format_size(stat.size),
            name,
            marker
        );
    }
    Ok(())
}

fn run_preflight(sources: &[PathBuf], to: &std::path::Path, json: bool) -> Result<()> {
    let target = Target::new(sources.iter().map(|s| Path::from(s.as_path())), to);
    let config = EngineConfig::default();
    let cancel = CancellationToken::new();

    let report = |p: &ScanProgress| {
        if !json {
            eprint!("\rScanned {} entries ({:.0}/s)", p.entries_scanned, p.entries_per_second());
        }
    };
    let Some(map) = preflight(&target, &config, &cancel, report).context("Pre-flight failed")? else {
        bail!("Pre-flight was cancelled");
    };
    if !json {
        eprintln!();
    }

    if json {
        let entries: Vec<_> = map.entries().collect();
        let output = serde_json::json!({
            "entries": entries,
            "errors": map.errors(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let conflicts: Vec<_> = map.conflicts().collect();
    println!("{} entries planned, {} conflicts", map.len(), conflicts.len());
    for entry in conflicts {
        println!("  {} ({}) -> {}", entry.source, entry.kind, entry.destination);
    }
    for err in map.errors() {
        println!("  error: {err}");
    }
    Ok(())
}

async fn run_task(config: EngineConfig, kind: TaskKind, target: Target, json: bool) -> Result<()> {
    let engine = Engine::new(config);
    let task = engine
        .submit(kind, target)
        .with_context(|| format!("Cannot start {kind}"))?;
    debug!(task = %task, "Task submitted");

    // Terminal states other than cancellation carry no counters, so the
    // summary uses the last running snapshot.
    let mut last = Default::default();
    let mut states = engine.observe(task)?;
    while let Some(state) = states.next().await {
        if let Some(progress) = state.progress() {
            last = progress;
        }
        if !json {
            print_progress(&state);
        }
        if state.is_finished() {
            break;
        }
    }
    let state = engine.wait(task).await?;
    debug!(task = %task, state = state.name(), "Task finished");
    if !json {
        eprintln!();
    }

    let (items, bytes): (Progress, Progress) = state.progress().unwrap_or(last);
    if json {
        let output = serde_json::json!({
            "task": task.to_string(),
            "state": state.name(),
            "items": items,
            "bytes": bytes,
            "failures": state.failures(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{task}: {} ({} items, {})",
            state.name(),
            items.processed(),
            format_size(bytes.processed())
        );
        for failure in state.failures() {
            println!("  {failure}");
        }
    }

    match state {
        TaskState::Success { .. } => Ok(()),
        TaskState::Failed { failures, .. } => bail!("{} entries failed", failures.len()),
        other => bail!("Task ended as {}", other.name()),
    }
}

fn print_progress(state: &TaskState) {
    let TaskState::Running { .. } = state else {
        return;
    };
    let Some((items, bytes)) = state.progress() else {
        return;
    };
    let now = Instant::now();
    let eta = state
        .estimated_time_remaining(now)
        .map(|d| format!(", {}s left", d.as_secs()))
        .unwrap_or_default();
    eprint!(
        "\r{}/{} items  {}/{}  {:>5.1}%{}",
        items.processed(),
        items.total(),
        format_size(bytes.processed()),
        format_size(bytes.total()),
        bytes.processed_percentage(),
        eta
    );
}

async fn run_watch(
    dirs: &[PathBuf],
    debounce_ms: u64,
    poll_ms: Option<u64>,
    seconds: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = WatchConfig::builder()
        .debounce(Duration::from_millis(debounce_ms))
        .poll_interval(poll_ms.map(Duration::from_millis))
        .build()
        .context("Invalid watch configuration")?;
    let service = WatchService::new(config).context("Cannot start watch service")?;

    for dir in dirs {
        service
            .register(dir.as_path(), move |changed: &Path| {
                if json {
                    println!("{}", serde_json::json!({ "changed": changed }));
                } else {
                    println!("changed: {changed}");
                }
            })
            .with_context(|| format!("Cannot watch {}", dir.display()))?;
        debug!(path = %dir.display(), "Registered watch");
    }
    eprintln!("Watching {} director{}", dirs.len(), if dirs.len() == 1 { "y" } else { "ies" });

    match seconds {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => std::future::pending::<()>().await,
    }
    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
