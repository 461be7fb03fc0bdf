//! Command-line interface definitions for the `sanctl` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `sanctl` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sanctl",
    about = "Manage iSCSI SAN volumes and snapshots through the provider API",
    version,
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Emit debug-level diagnostics on stderr.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
    /// Output rendering for listing and detail commands.
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Output rendering selected with `--output`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable tables.
    Table,
    /// Pretty-printed JSON for scripting.
    Json,
}

/// Volume-level subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the account's iSCSI volumes.
    #[command(name = "list")]
    List,
    /// Order a new iSCSI volume.
    #[command(name = "create")]
    Create(CreateCommand),
    /// Show details for one volume.
    #[command(name = "detail")]
    Detail(DetailCommand),
    /// Cancel a volume through its billing item.
    #[command(name = "cancel")]
    Cancel(CancelCommand),
    /// Manage snapshots of a volume.
    #[command(subcommand, name = "snapshot")]
    Snapshot(SnapshotCommand),
}

/// Arguments for `sanctl create`.
#[derive(Debug, Parser)]
pub(crate) struct CreateCommand {
    /// Volume capacity in gigabytes.
    #[arg(long, value_name = "GB")]
    pub(crate) size: u32,
    /// Datacenter short name (falls back to the configured default).
    #[arg(long, value_name = "NAME")]
    pub(crate) datacenter: Option<String>,
}

/// Arguments for `sanctl detail`.
#[derive(Debug, Parser)]
pub(crate) struct DetailCommand {
    /// Volume identifier.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
    /// Include CHAP credentials in the output.
    #[arg(long)]
    pub(crate) passwords: bool,
}

/// Arguments for `sanctl cancel`.
#[derive(Debug, Parser)]
pub(crate) struct CancelCommand {
    /// Volume identifier.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
    /// Cancel immediately instead of at the billing anniversary.
    #[arg(long)]
    pub(crate) immediate: bool,
    /// Reason recorded with the cancellation.
    #[arg(long, value_name = "TEXT")]
    pub(crate) reason: Option<String>,
    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub(crate) yes: bool,
}

/// Snapshot subcommands under `sanctl snapshot`.
#[derive(Debug, Subcommand)]
pub(crate) enum SnapshotCommand {
    /// Create a snapshot of a volume.
    #[command(name = "create")]
    Create(SnapshotCreateCommand),
    /// List the snapshots of a volume.
    #[command(name = "list")]
    List(SnapshotListCommand),
    /// Delete a snapshot.
    #[command(name = "delete")]
    Delete(SnapshotDeleteCommand),
    /// Restore a volume's contents from a snapshot.
    #[command(name = "restore")]
    Restore(SnapshotRestoreCommand),
    /// Order snapshot space for a volume.
    #[command(name = "order-space")]
    OrderSpace(SnapshotOrderSpaceCommand),
}

/// Arguments for `sanctl snapshot create`.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotCreateCommand {
    /// Parent volume identifier.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
    /// Notes attached to the snapshot.
    #[arg(long, value_name = "TEXT")]
    pub(crate) notes: Option<String>,
}

/// Arguments for `sanctl snapshot list`.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotListCommand {
    /// Parent volume identifier.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
}

/// Arguments for `sanctl snapshot delete`.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotDeleteCommand {
    /// Snapshot identifier.
    #[arg(value_name = "SNAPSHOT_ID")]
    pub(crate) snapshot_id: i64,
}

/// Arguments for `sanctl snapshot restore`.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotRestoreCommand {
    /// Volume whose contents will be overwritten.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
    /// Snapshot to restore from.
    #[arg(value_name = "SNAPSHOT_ID")]
    pub(crate) snapshot_id: i64,
}

/// Arguments for `sanctl snapshot order-space`.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotOrderSpaceCommand {
    /// Volume the snapshot space is reserved for.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: i64,
    /// Minimum snapshot capacity in gigabytes.
    #[arg(long, value_name = "GB")]
    pub(crate) capacity: u32,
}
