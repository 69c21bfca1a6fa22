use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use webclip_core::config::{ClipConfig, load_config};
use webclip_core::logging::init_logging;
use webclip_core::refresh::{RefreshOptions, RefreshReport, add_url, refresh_all};
use webclip_core::runtime::{PathOverrides, ResolutionContext, ResolvedPaths, resolve_paths};

#[derive(Debug, Parser)]
#[command(
    name = "webclip",
    version,
    about = "Fetch web pages as Markdown documents with a deduplicated catalog"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Add a URL to urls.txt and fetch it once")]
    Add(AddArgs),
    #[command(about = "Fetch every URL from urls.txt")]
    Refresh(FetchArgs),
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(help = "URL to add and fetch")]
    url: String,
    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[arg(long, help = "Rewrite documents even when content is unchanged")]
    force: bool,
    #[arg(long, value_name = "SECONDS", help = "Per-fetch timeout in seconds")]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = resolve_runtime_paths(&cli)?;
    init_logging(&paths.logs_dir)?;
    if cli.diagnostics {
        println!("[diagnostics]\n{}", paths.diagnostics());
    }

    let config = load_config(&paths.config_path)?;
    match cli.command {
        Commands::Add(args) => {
            let timeout = fetch_timeout(&config, &args.fetch);
            let report = add_url(&paths, &config, &args.url, &refresh_options(&args.fetch), timeout)?;
            print_report("add", &report);
        }
        Commands::Refresh(args) => {
            let timeout = fetch_timeout(&config, &args);
            let report = refresh_all(&paths, &config, &refresh_options(&args), timeout)?;
            print_report("refresh", &report);
        }
    }
    Ok(())
}

fn refresh_options(args: &FetchArgs) -> RefreshOptions {
    RefreshOptions {
        force: args.force,
        ..RefreshOptions::default()
    }
}

fn fetch_timeout(config: &ClipConfig, args: &FetchArgs) -> Duration {
    Duration::from_secs(args.timeout.unwrap_or_else(|| config.timeout_seconds()))
}

fn print_report(command_name: &str, report: &RefreshReport) {
    println!("{command_name} report");
    println!("urls.total: {}", report.total());
    println!("urls.written: {}", report.written());
    println!("urls.unchanged: {}", report.unchanged());
    println!("urls.empty_skipped: {}", report.empty_skipped());
    println!("urls.failed: {}", report.failed());
    println!("requests: {}", report.request_count);
    for (url, reason) in report.failures() {
        println!("failure: {url}: {reason}");
    }
}

fn resolve_runtime_paths(cli: &Cli) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: cli.project_root.clone(),
        config: cli.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}
