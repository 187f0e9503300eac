//! Web Publisher CLI
//!
//! Build a web project, pick a hosted target and publish it

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use web_publisher::core::traits::{BuildArtifact, BuildProvider, ProgressFn};
use web_publisher::{
    Collaborators, CommandBuildProvider, ConfigLoadOptions, ConfigLoader, DirectoryPublisher,
    EnvCredentialProvider, LocalRepositoryDirectory, PrebuiltBuildProvider, PublishAction,
    PublishError, PublishEvent, PublishOrchestrator, PublishSupervisor, PublisherConfig,
    SecureTokenManager, StaticIdentity, TargetOptions,
};

/// Publish web builds to a hosted site
#[derive(Parser)]
#[command(name = "web-publisher")]
#[command(version = "0.1.0")]
#[command(about = "Build, deploy and share web projects", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish the project
    Publish {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Option number from `targets` to publish to
        #[arg(short, long, conflicts_with = "new")]
        target: Option<usize>,

        /// Always create a new site
        #[arg(long)]
        new: bool,

        /// Non-interactive mode (CI/CD), uses the default option
        #[arg(long)]
        non_interactive: bool,
    },

    /// Re-publish to the last published site
    Update {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// List the sites this project can be published to
    Targets {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// Show the last published site
    Status {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// Forget the last published site so the next publish creates a new one
    Reset {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    // JSON logs with WEB_PUBLISHER_LOG_JSON=1, human-readable otherwise
    let json_logs = std::env::var("WEB_PUBLISHER_LOG_JSON").unwrap_or_default() == "1";
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("web_publisher={}", level)));

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Publish {
            project_path,
            target,
            new,
            non_interactive,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            publish_command(path, target, new, non_interactive).await
        }
        Commands::Update { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            update_command(path).await
        }
        Commands::Targets { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            targets_command(path).await
        }
        Commands::Status { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            status_command(path).await
        }
        Commands::Reset {
            project_path,
            force,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            reset_command(path, force).await
        }
    }
}

async fn publish_command(
    project_path: PathBuf,
    target: Option<usize>,
    new: bool,
    non_interactive: bool,
) -> Result<i32> {
    println!("\n🌐 web-publisher\n");

    let Some(supervisor) = open(&project_path).await else {
        return Ok(1);
    };
    if let Err(e) = supervisor.orchestrator().check_preconditions() {
        print_error(&e);
        return Ok(1);
    }

    let mut options = supervisor.orchestrator().resolve_targets().await;
    print_options(&options);

    let index = if new {
        options.len() - 1
    } else if let Some(number) = target {
        option_index(number)
    } else if non_interactive {
        options.selected
    } else {
        prompt_choice(&options).await?
    };

    if let Err(e) = supervisor.select_target(&mut options, index) {
        print_error(&e);
        return Ok(1);
    }

    run_supervised(&supervisor, PublishAction::Publish).await
}

async fn update_command(project_path: PathBuf) -> Result<i32> {
    println!("\n🌐 web-publisher (Update)\n");

    let Some(supervisor) = open(&project_path).await else {
        return Ok(1);
    };

    let session = supervisor.snapshot();
    if !session.is_complete() {
        println!("⚠️  Nothing has been published from this project yet");
        println!("   Run `web-publisher publish` first");
        return Ok(1);
    }

    println!("Updating {}\n", session.target.display_url);
    run_supervised(&supervisor, PublishAction::Update).await
}

async fn targets_command(project_path: PathBuf) -> Result<i32> {
    let Some(supervisor) = open(&project_path).await else {
        return Ok(1);
    };

    let options = supervisor.orchestrator().resolve_targets().await;
    print_options(&options);
    Ok(0)
}

async fn status_command(project_path: PathBuf) -> Result<i32> {
    let Some(supervisor) = open(&project_path).await else {
        return Ok(1);
    };
    let session = supervisor.snapshot();

    println!("\n📋 Publish Status\n");
    println!("  Project: {}", supervisor.orchestrator().base_name());
    println!("  Step:    {}", session.step);
    println!("  Target:  {}", session.target.repository_name);

    match &session.result_url {
        Some(url) => println!("  Live at: {}", url),
        None => println!("  Not published yet"),
    }

    match supervisor.orchestrator().check_preconditions() {
        Ok(handle) => println!("  Ready to publish as {}", handle),
        Err(e) => println!("  ⚠️  {}", e),
    }

    Ok(0)
}

async fn reset_command(project_path: PathBuf, force: bool) -> Result<i32> {
    let Some(supervisor) = open(&project_path).await else {
        return Ok(1);
    };

    if let Some(url) = supervisor.snapshot().result_url {
        println!("The site at {} stays online.", url);
    }
    if !force && !confirm("Forget it and publish as a new site next time?").await? {
        println!("Reset cancelled");
        return Ok(0);
    }

    match supervisor.reset().await {
        Ok(session) => {
            println!(
                "✅ Reset. The next publish creates {}",
                session.target.display_url
            );
            Ok(0)
        }
        Err(e) => {
            print_error(&e);
            Ok(1)
        }
    }
}

/// Load configuration and wire up the local collaborators
async fn open(project_path: &Path) -> Option<PublishSupervisor> {
    let config = match ConfigLoader::load(ConfigLoadOptions::from_env(project_path)).await {
        Ok(config) => config,
        Err(e) => {
            print_error(&e);
            return None;
        }
    };

    let tokens = SecureTokenManager::new();
    let handle = config.creator_handle().unwrap_or_default().to_string();
    let hosting_root = hosting_root(&config, project_path);
    let domain = config.domain().to_string();

    let collaborators = Collaborators {
        identity: Arc::new(StaticIdentity::new(
            config.creator_handle().map(str::to_string),
            tokens.clone(),
        )),
        credentials: Arc::new(EnvCredentialProvider::new(tokens)),
        builder: build_provider(&config, project_path),
        directory: Arc::new(LocalRepositoryDirectory::new(&hosting_root, &handle, &domain)),
        publisher: Arc::new(DirectoryPublisher::new(&hosting_root, &domain)),
    };

    let orchestrator = PublishOrchestrator::new(project_path, config, collaborators);
    Some(PublishSupervisor::initialize(orchestrator).await)
}

fn hosting_root(config: &PublisherConfig, project_path: &Path) -> PathBuf {
    if let Some(root) = config.hosting_root() {
        return root.clone();
    }

    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| project_path.to_path_buf())
        .join(".web-publisher")
        .join("sites")
}

fn build_provider(config: &PublisherConfig, project_path: &Path) -> Arc<dyn BuildProvider> {
    let Some(build) = config.build.as_ref() else {
        return Arc::new(UnconfiguredBuild);
    };

    if let Some(command) = &build.command {
        let args = build.args.clone().unwrap_or_default();
        return Arc::new(
            CommandBuildProvider::new(project_path, command, args)
                .with_timeout(Duration::from_secs(config.build_timeout_secs())),
        );
    }

    match &build.source_dir {
        Some(source_dir) => Arc::new(PrebuiltBuildProvider::new(project_path.join(source_dir))),
        None => Arc::new(UnconfiguredBuild),
    }
}

/// Fails every build with a pointer to the configuration
struct UnconfiguredBuild;

#[async_trait]
impl BuildProvider for UnconfiguredBuild {
    async fn build(&self, _output_path: &Path, _on_progress: &ProgressFn) -> Result<BuildArtifact> {
        anyhow::bail!("no build configured; set build.command or build.sourceDir in .web-publisher.yaml")
    }
}

async fn run_supervised(supervisor: &PublishSupervisor, action: PublishAction) -> Result<i32> {
    let mut events = match supervisor.start(action) {
        Ok(events) => events,
        Err(e) => {
            print_error(&e);
            return Ok(1);
        }
    };

    while let Some(event) = events.recv().await {
        match event {
            PublishEvent::StepChanged { status, .. } => println!("▶ {}", status),
            PublishEvent::Status(message) => println!("  {}", message),
            PublishEvent::Finished { .. } => {}
        }
    }

    let session = match supervisor.wait().await {
        Ok(session) => session,
        Err(e) => {
            print_error(&e);
            return Ok(1);
        }
    };

    match &session.result_url {
        Some(url) if session.is_complete() => {
            println!("\n✅ Published successfully!");
            println!("   {}", url);
            Ok(0)
        }
        _ => {
            eprintln!("\n❌ {}", session.status_message);
            if session.result_url.is_some() {
                eprintln!("   Your previously published site has not been changed");
            }
            Ok(1)
        }
    }
}

fn print_options(options: &TargetOptions) {
    if let Some(error) = &options.directory_error {
        println!("⚠️  {}", error);
        println!("   Only a new site can be created right now\n");
    }

    println!("Publish targets:");
    for (i, option) in options.options.iter().enumerate() {
        let marker = if i == options.selected { "*" } else { " " };
        println!("{} {}. {}", marker, i + 1, option.display_name);
        println!("     {} ({})", option.display_url, option.description);
        if let Some(updated) = option.last_updated {
            println!("     last updated {}", updated.format("%Y-%m-%d %H:%M"));
        }
    }
    println!();
}

fn print_error(error: &PublishError) {
    eprintln!("\n❌ {}", error);
    for action in error.suggested_actions() {
        eprintln!("  • {}", action);
    }
}

/// Prompt for an option number, Enter keeps the default
async fn prompt_choice(options: &TargetOptions) -> Result<usize> {
    print!("Choose a target [{}]: ", options.selected + 1);
    io::stdout().flush().await?;

    let mut reader = BufReader::new(io::stdin());
    let mut answer = String::new();
    reader.read_line(&mut answer).await?;

    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(options.selected);
    }

    Ok(answer.parse::<usize>().map_or(usize::MAX, option_index))
}

/// Index for a 1-based option number
///
/// Zero maps out of range so the selection rejects it.
fn option_index(number: usize) -> usize {
    number.checked_sub(1).unwrap_or(usize::MAX)
}

/// Prompt user for confirmation
async fn confirm(message: &str) -> Result<bool> {
    print!("{} (yes/no): ", message);
    io::stdout().flush().await?;

    let mut reader = BufReader::new(io::stdin());
    let mut answer = String::new();
    reader.read_line(&mut answer).await?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}
