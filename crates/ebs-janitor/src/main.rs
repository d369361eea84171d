//! ebs-janitor: two-phase cleanup of unreferenced EBS volumes and snapshots
//!
//! `stage` records what is eligible for deletion and when; a later `delete`
//! removes whatever has outlived its grace period.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ebs_janitor::aws::{AwsContext, Ec2Client};
use ebs_janitor::config::JanitorConfig;
use ebs_janitor::orchestrator::{self, RunContext, SecurityGroupAction};
use ebs_janitor::report::Sink;
use ebs_janitor::state::StateStore;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ebs-janitor")]
#[command(about = "Staged cleanup of detached EBS volumes, stale snapshots and security groups")]
#[command(version)]
struct Args {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS region (overrides the config file)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS profile to use (overrides the config file)
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// Directory holding the pending-delete state files
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record eligible volumes and snapshots in the pending-delete state
    Stage {
        /// Compute and report without writing tags or state
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete pending resources whose grace period has elapsed
    Delete {
        /// Report the ready set without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the pending-delete state
    Pending,

    /// Unlock or delete security groups matched by description
    SecurityGroups {
        #[command(subcommand)]
        action: SecurityGroupCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SecurityGroupCommand {
    /// Revoke ingress rules that reference other security groups
    Unlock(SecurityGroupArgs),

    /// Delete the matching security groups
    Delete(SecurityGroupArgs),
}

#[derive(clap::Args, Debug)]
struct SecurityGroupArgs {
    /// Exact security group description to match
    #[arg(long)]
    description: String,

    /// Actually change resources (default is dry-run)
    #[arg(long)]
    execute: bool,
}

impl SecurityGroupCommand {
    fn split(self) -> (SecurityGroupAction, SecurityGroupArgs) {
        match self {
            SecurityGroupCommand::Unlock(args) => (SecurityGroupAction::Unlock, args),
            SecurityGroupCommand::Delete(args) => (SecurityGroupAction::Delete, args),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into())
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_sdk_ec2=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Load the config file (if any) and apply CLI overrides
fn load_config(args: &Args) -> Result<JanitorConfig> {
    let mut config = match &args.config {
        Some(path) => JanitorConfig::load(path)?,
        None => JanitorConfig::default(),
    };
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(profile) = &args.aws_profile {
        config.aws_profile = Some(profile.clone());
    }
    if let Some(state_dir) = &args.state_dir {
        config.state_dir = state_dir.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cancel the token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the in-flight request");
            token.cancel();
        }
    });
    cancel
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = load_config(&args)?;
    let store = StateStore::from_config(&config);

    if let Command::Pending = args.command {
        match orchestrator::pending_table(&store, Utc::now()) {
            Some(table) => println!("{table}"),
            None => println!("No pending deletions"),
        }
        return Ok(());
    }

    let aws = AwsContext::new(&config.region, config.aws_profile.as_deref()).await;
    let ec2 = Ec2Client::from_context(&aws);
    let sink = Sink::from_config(config.slack.as_ref())?;
    info!(region = %config.region, state_dir = %config.state_dir.display(), "Starting");

    match args.command {
        Command::Stage { dry_run } => {
            let ctx = RunContext {
                config: &config,
                store: &store,
                now: Utc::now(),
                dry_run,
                cancel: cancel_on_interrupt(),
            };
            orchestrator::run_stage(&ec2, &sink, &ctx).await?;
        }
        Command::Delete { dry_run } => {
            let ctx = RunContext {
                config: &config,
                store: &store,
                now: Utc::now(),
                dry_run,
                cancel: cancel_on_interrupt(),
            };
            orchestrator::run_delete(&ec2, &sink, &ctx).await?;
        }
        Command::SecurityGroups { action } => {
            let (action, sg_args) = action.split();
            orchestrator::run_security_groups(
                &ec2,
                &sink,
                action,
                &sg_args.description,
                sg_args.execute,
                config.rate_limit_per_sec,
            )
            .await?;
            if !sg_args.execute {
                println!("Run with --execute to actually change security groups.");
            }
        }
        Command::Pending => {}
    }

    Ok(())
}
