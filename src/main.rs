// ABOUTME: Main entry point for the worktree-compose CLI - composes, rescans and inspects workspaces as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use worktree_compose::git::get_repo_display_name;
use worktree_compose::models::Workspace;
use worktree_compose::store::UiMetadataStore;
use worktree_compose::{
    AppConfig, GitCliWorktreeSource, JsonFileStore, NestedRepoDetector, WorkspaceComposer,
};

#[derive(Parser, Debug)]
#[command(name = "worktree-compose", version, about = "Compose git worktrees with their UI state")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct WorkspaceArgs {
    /// Path to the repository's main worktree
    repo: PathBuf,

    /// Defaults to an id derived from the repository directory name
    #[arg(long)]
    workspace_id: Option<String>,

    #[arg(long)]
    main_branch: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composed workspace state
    Compose(WorkspaceArgs),
    /// Rescan worktrees, report drift and reconcile stored metadata
    Rescan(WorkspaceArgs),
    /// List git repositories nested under a path
    Nested { path: PathBuf },
    /// Store default tabs for a freshly created worktree
    InitWorktree {
        repo: PathBuf,
        worktree: PathBuf,
        branch: String,
        #[arg(long)]
        workspace_id: Option<String>,
    },
    /// Show global settings, optionally updating them
    Settings {
        #[arg(long)]
        default_terminal_command: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NestedRepo {
    path: PathBuf,
    display_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Logging is best effort; the CLI still works without a log file.
    if let Err(e) = setup_logging(&config.log_dir()) {
        eprintln!("Logging disabled: {e:#}");
    }

    if let Err(e) = run(cli.command, &config).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let store = Arc::new(
        JsonFileStore::new(config.data_dir())
            .await
            .context("Failed to open UI metadata store")?,
    );
    let composer = WorkspaceComposer::new(Arc::new(GitCliWorktreeSource::new()), store.clone())
        .with_config(config.reconcile.clone());

    match command {
        Command::Compose(args) => {
            let (workspace, main_branch) = resolve_workspace(&args, config)?;
            let state = composer
                .compose_workspace_state(&workspace, Some(&main_branch))
                .await?;
            print_json(&state)
        }
        Command::Rescan(args) => {
            let (workspace, main_branch) = resolve_workspace(&args, config)?;
            let result = composer
                .rescan_workspace(&workspace, Some(&main_branch))
                .await?;
            if result.has_drift() {
                info!("Workspace {} drifted since last compose", workspace.id);
            }
            print_json(&result)
        }
        Command::Nested { path } => {
            let root = absolute(&path)?;
            let detector = NestedRepoDetector::new(config.nested_scan.clone());
            let repos: Vec<NestedRepo> = detector
                .detect_nested_repos(&root)
                .await
                .iter()
                .map(|repo| NestedRepo {
                    path: repo.clone(),
                    display_name: get_repo_display_name(&root, repo),
                })
                .collect();
            print_json(&repos)
        }
        Command::InitWorktree {
            repo,
            worktree,
            branch,
            workspace_id,
        } => {
            let repo = path_string(&absolute(&repo)?);
            let worktree = path_string(&absolute(&worktree)?);
            let workspace_id = workspace_id.unwrap_or_else(|| Workspace::id_for_repo(&repo));
            let metadata = composer
                .initialize_worktree_defaults(&workspace_id, &worktree, &branch)
                .await?;
            print_json(&metadata)
        }
        Command::Settings {
            default_terminal_command,
        } => {
            let mut settings = store.read_settings().await?;
            if default_terminal_command.is_some() {
                settings.default_terminal_command = default_terminal_command;
                settings = store.write_settings(settings).await?;
            }
            print_json(&settings)
        }
    }
}

fn resolve_workspace(args: &WorkspaceArgs, config: &AppConfig) -> Result<(Workspace, String)> {
    let repo = path_string(&absolute(&args.repo)?);
    let id = args
        .workspace_id
        .clone()
        .unwrap_or_else(|| Workspace::id_for_repo(&repo));
    let main_branch = args
        .main_branch
        .clone()
        .unwrap_or_else(|| config.default_main_branch.clone());

    let mut workspace = Workspace::new(id, repo);
    workspace.default_branch.clone_from(&main_branch);
    Ok((workspace, main_branch))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(log_dir: &Path) -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;

    // Create log file with timestamp
    let log_file = log_dir.join(format!(
        "worktree-compose-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false), // No ANSI colors in log file
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worktree_compose=info".into()),
        )
        .init();

    Ok(())
}
