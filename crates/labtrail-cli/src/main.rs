#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use labtrail_core::{ErrorCode, LabError};
use labtrail_core::api::LabApi;
use labtrail_core::api::http::HttpLabApi;
use labtrail_core::api::memory::MemoryLab;
use labtrail_core::config::{EffectiveConfig, find_project_root, resolve_config};
use labtrail_core::model::SampleId;
use labtrail_core::workspace::SampleWorkspace;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "labtrail: labels, assignees, lifecycle and activity of lab samples",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format. Defaults to pretty on a terminal and text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Lab service base URL. Overrides LABTRAIL_API_URL and config files.
    #[arg(long, global = true, value_name = "URL", conflicts_with = "fixture")]
    api: Option<String>,

    /// Work against a JSON fixture instead of the lab service. Mutations are
    /// written back to the file.
    #[arg(long, global = true, value_name = "PATH")]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show one sample",
        long_about = "Show a sample with its effective labels, assignees and the transitions it offers.",
        after_help = "EXAMPLES:\n    # Show a sample\n    lt show s-100\n\n    # Emit machine-readable output\n    lt show s-100 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a sample's activity timeline",
        long_about = "Render the sample's recorded events as a narrative timeline, grouped by day.",
        after_help = "EXAMPLES:\n    # Show the timeline\n    lt timeline s-101\n\n    # One tab-separated line per entry\n    lt timeline s-101 --format text"
    )]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Show or replace a sample's labels",
        long_about = "Show the effective labels of a sample, or replace its own labels. Labels inherited from the order cannot be removed here.",
        after_help = "EXAMPLES:\n    # Show labels\n    lt labels s-100\n\n    # Keep exactly these own labels\n    lt labels s-100 --set lbl-1 --set lbl-3\n\n    # Add or drop one label, keeping the rest\n    lt labels s-100 --toggle lbl-1\n\n    # Remove all own labels\n    lt labels s-100 --clear"
    )]
    Labels(cmd::labels::LabelsArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Replace a sample's assignees",
        long_about = "Set the users assigned to a sample. Users not listed are unassigned; nothing is sent if the set is unchanged.",
        after_help = "EXAMPLES:\n    # Assign two users\n    lt assign s-100 u-ana u-luis\n\n    # Unassign everyone\n    lt assign s-100 --clear"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move a sample to another state",
        long_about = "Request a lifecycle transition. READY, DAMAGED and CANCELLED are final.",
        after_help = "EXAMPLES:\n    # Start processing\n    lt move s-100 PROCESSING\n\n    # Mark as damaged\n    lt move s-101 damaged"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Show, replace or clear a sample's notes",
        after_help = "EXAMPLES:\n    # Replace notes\n    lt notes s-100 \"Hemólisis leve\"\n\n    # Clear notes\n    lt notes s-100 --clear"
    )]
    Notes(cmd::notes::NotesArgs),

    #[command(
        next_help_heading = "Images",
        about = "Upload images to a sample",
        long_about = "Upload one or more image files. The first image of a RECEIVED sample moves it to PROCESSING.",
        after_help = "EXAMPLES:\n    # Upload two images\n    lt upload s-100 frotis.jpg tincion.png"
    )]
    Upload(cmd::upload::UploadArgs),

    #[command(
        next_help_heading = "Images",
        about = "List or delete a sample's images",
        after_help = "EXAMPLES:\n    # List images\n    lt images s-101\n\n    # Delete one\n    lt images s-101 --delete img-1"
    )]
    Images(cmd::images::ImagesArgs),

    #[command(
        next_help_heading = "Lab",
        about = "List or extend the label catalog",
        after_help = "EXAMPLES:\n    # List labels\n    lt catalog\n\n    # Create a label\n    lt catalog create --name Urgente --color '#ef4444'"
    )]
    Catalog(cmd::catalog::CatalogArgs),

    #[command(next_help_heading = "Lab", about = "List lab users")]
    Users,
}

impl Commands {
    /// The sample a command operates on, if any.
    fn sample(&self) -> Option<&str> {
        let sample = match self {
            Self::Show(args) => &args.sample,
            Self::Timeline(args) => &args.sample,
            Self::Labels(args) => &args.sample,
            Self::Assign(args) => &args.sample,
            Self::Move(args) => &args.sample,
            Self::Notes(args) => &args.sample,
            Self::Upload(args) => &args.sample,
            Self::Images(args) => &args.sample,
            Self::Catalog(_) | Self::Users => return None,
        };
        Some(sample)
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LABTRAIL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "labtrail=debug,info"
        } else {
            "labtrail=info,warn"
        })
    });

    let format = env::var("LABTRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output only.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Run one command against `api` and hand the collaborator back, so fixture
/// changes can be persisted even when the command failed part way.
async fn execute<A: LabApi>(api: A, command: &Commands, ctx: &cmd::Context) -> (A, anyhow::Result<()>) {
    let Some(sample) = command.sample() else {
        let result = match command {
            Commands::Catalog(args) => cmd::catalog::run_catalog(&api, args, ctx).await,
            Commands::Users => cmd::users::run_users(&api, ctx).await,
            _ => Ok(()),
        };
        return (api, result);
    };

    let ws = SampleWorkspace::new(api, SampleId::new(sample), ctx.timeline.clone());
    let result = match command {
        Commands::Show(args) => cmd::show::run_show(&ws, args, ctx).await,
        Commands::Timeline(args) => cmd::timeline::run_timeline(&ws, args, ctx).await,
        Commands::Labels(args) => cmd::labels::run_labels(&ws, args, ctx).await,
        Commands::Assign(args) => cmd::assign::run_assign(&ws, args, ctx).await,
        Commands::Move(args) => cmd::move_cmd::run_move(&ws, args, ctx).await,
        Commands::Notes(args) => cmd::notes::run_notes(&ws, args, ctx).await,
        Commands::Upload(args) => cmd::upload::run_upload(&ws, args, ctx).await,
        Commands::Images(args) => cmd::images::run_images(&ws, args, ctx).await,
        Commands::Catalog(_) | Commands::Users => Ok(()),
    };
    (ws.into_api(), result)
}

async fn run(cli: &Cli, config: &EffectiveConfig, ctx: &cmd::Context) -> anyhow::Result<()> {
    if let Some(path) = &cli.fixture {
        let lab = MemoryLab::load(path)?;
        let (lab, result) = execute(lab, &cli.command, ctx).await;
        if !lab.mutations().is_empty() {
            lab.save(path)?;
            debug!(fixture = %path.display(), "fixture updated");
        }
        return result;
    }

    let Some(base_url) = config.api_url.clone() else {
        return Err(NoBackend.into());
    };
    let Some(credentials) = config.project.api.credentials() else {
        anyhow::bail!(
            "no API token: set {} to a bearer token for {base_url}",
            config.project.api.token_env
        );
    };
    let api = HttpLabApi::new(base_url, &credentials, config.project.api.timeout())
        .map_err(LabError::from)?;
    info!(api = %api.base_url(), "using lab service");
    execute(api, &cli.command, ctx).await.1
}

/// Neither `--fixture` nor an API URL was given.
#[derive(Debug, Error)]
#[error("no lab service configured")]
struct NoBackend;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let cwd = env::current_dir()?;
    let project_root = find_project_root(&cwd);
    let config = resolve_config(project_root.as_deref(), cli.api.as_deref())?;
    let output = output::resolve_output_mode(cli.format, cli.json, config.user.output.as_deref());
    let ctx = cmd::Context {
        output,
        timeline: config.timeline(),
        default_color: config.project.labels.default_color.clone(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    if let Err(err) = runtime.block_on(run(&cli, &config, &ctx)) {
        let cli_err = if err.is::<NoBackend>() {
            CliError::coded(ErrorCode::BackendMissing, err.to_string())
        } else {
            CliError::from(&err)
        };
        render_error(output, &cli_err)?;
        std::process::exit(1);
    }
    Ok(())
}
