//! Binary entry point for the `sanctl` CLI.

use std::io::{self, IsTerminal, Write};
use std::process;

use clap::Parser;
use dialoguer::Confirm;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use sanctl::{
    ApiConfig, DEFAULT_CANCEL_REASON, DEFAULT_SNAPSHOT_NOTES, ManagerError, RestClient,
    StorageApi, StorageManager,
};

mod cli;
mod output;

use cli::{Cli, Command, OutputFormat, SnapshotCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error("missing datacenter: pass --datacenter or configure default_datacenter")]
    MissingDatacenter,
    #[error("aborted")]
    Aborted,
    #[error("confirmation prompt failed: {0}")]
    Prompt(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config =
        ApiConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let default_datacenter = config.default_datacenter.clone();
    let client = RestClient::new(config).map_err(|err| CliError::Config(err.to_string()))?;
    let manager = StorageManager::new(client);

    run_command(&manager, cli.command, cli.output, default_datacenter).await
}

async fn run_command<A: StorageApi>(
    manager: &StorageManager<A>,
    command: Command,
    format: OutputFormat,
    default_datacenter: Option<String>,
) -> Result<(), CliError> {
    match command {
        Command::List => {
            let volumes = manager.volumes().await?;
            emit(&output::render_volumes(format, &volumes));
        }
        Command::Create(args) => {
            let datacenter = args
                .datacenter
                .or(default_datacenter)
                .ok_or(CliError::MissingDatacenter)?;
            manager.create(args.size, &datacenter).await?;
            emit(&format!(
                "order placed for a {}GB volume in {datacenter}",
                args.size
            ));
        }
        Command::Detail(args) => {
            let volume = manager.volume(args.volume_id, None).await?;
            emit(&output::render_volume_detail(format, &volume, args.passwords));
        }
        Command::Cancel(args) => {
            confirm_cancel(args.volume_id, args.yes)?;
            let reason = args.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
            manager.cancel(args.volume_id, reason, args.immediate).await?;
            emit(&format!("cancellation submitted for volume {}", args.volume_id));
        }
        Command::Snapshot(snapshot) => run_snapshot_command(manager, snapshot, format).await?,
    }
    Ok(())
}

async fn run_snapshot_command<A: StorageApi>(
    manager: &StorageManager<A>,
    command: SnapshotCommand,
    format: OutputFormat,
) -> Result<(), CliError> {
    match command {
        SnapshotCommand::Create(args) => {
            let notes = args.notes.as_deref().unwrap_or(DEFAULT_SNAPSHOT_NOTES);
            manager.create_snapshot(args.volume_id, notes).await?;
            emit(&format!("snapshot requested for volume {}", args.volume_id));
        }
        SnapshotCommand::List(args) => {
            let snapshots = manager.snapshots(args.volume_id).await?;
            emit(&output::render_snapshots(format, &snapshots));
        }
        SnapshotCommand::Delete(args) => {
            manager.delete_snapshot(args.snapshot_id).await?;
            emit(&format!("snapshot {} deleted", args.snapshot_id));
        }
        SnapshotCommand::Restore(args) => {
            manager
                .restore_from_snapshot(args.volume_id, args.snapshot_id)
                .await?;
            emit(&format!(
                "volume {} restored from snapshot {}",
                args.volume_id, args.snapshot_id
            ));
        }
        SnapshotCommand::OrderSpace(args) => {
            manager
                .order_snapshot_space(args.volume_id, args.capacity)
                .await?;
            emit(&format!(
                "snapshot space ordered for volume {}",
                args.volume_id
            ));
        }
    }
    Ok(())
}

/// Asks for interactive confirmation before a cancellation, unless the
/// caller passed `--yes` or stdin is not a terminal.
fn confirm_cancel(volume_id: i64, assume_yes: bool) -> Result<(), CliError> {
    if assume_yes {
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::Aborted);
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Cancel volume {volume_id}? This cannot be undone"
        ))
        .default(false)
        .interact()
        .map_err(|err| CliError::Prompt(err.to_string()))?;

    if confirmed {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}

fn emit(text: &str) {
    writeln!(io::stdout(), "{text}").ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
