//! Table and JSON rendering for CLI output.

use sanctl::{SnapshotSummary, Volume};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;

/// Row in the `sanctl list` table.
#[derive(Serialize, Tabled)]
struct VolumeRow {
    id: i64,
    datacenter: String,
    size: String,
    username: String,
    password: String,
    server: String,
}

impl VolumeRow {
    fn from_volume(volume: &Volume) -> Self {
        Self {
            id: volume.id,
            datacenter: volume
                .service_resource
                .as_ref()
                .and_then(|resource| resource.datacenter.as_ref())
                .and_then(|datacenter| datacenter.name.clone())
                .unwrap_or_default(),
            size: volume
                .capacity_gb
                .map(|capacity| format!("{capacity}GB"))
                .unwrap_or_default(),
            username: volume.username.clone().unwrap_or_default(),
            password: volume.password.clone().unwrap_or_default(),
            server: volume
                .service_resource_backend_ip_address
                .clone()
                .unwrap_or_default(),
        }
    }
}

/// Key/value row in the `sanctl detail` table.
#[derive(Serialize, Tabled)]
struct DetailRow {
    name: &'static str,
    value: String,
}

/// Row in the `sanctl snapshot list` table.
#[derive(Serialize, Tabled)]
struct SnapshotRow {
    id: i64,
    created: String,
    name: String,
    description: String,
}

/// Renders the account volume listing.
pub(crate) fn render_volumes(format: OutputFormat, volumes: &[Volume]) -> String {
    match format {
        OutputFormat::Table => {
            if volumes.is_empty() {
                return String::from("No volumes found");
            }
            Table::new(volumes.iter().map(VolumeRow::from_volume)).to_string()
        }
        OutputFormat::Json => to_pretty_json(volumes),
    }
}

/// Renders one volume as a key/value table or a JSON document.
///
/// CHAP credentials are redacted unless `show_passwords` is set, in both
/// output formats.
pub(crate) fn render_volume_detail(
    format: OutputFormat,
    volume: &Volume,
    show_passwords: bool,
) -> String {
    let mut shown = volume.clone();
    if !show_passwords {
        shown.username = None;
        shown.password = None;
    }

    match format {
        OutputFormat::Table => Table::new(detail_rows(&shown)).to_string(),
        OutputFormat::Json => to_pretty_json(&shown),
    }
}

/// Renders the snapshot listing of a volume.
pub(crate) fn render_snapshots(format: OutputFormat, snapshots: &[SnapshotSummary]) -> String {
    match format {
        OutputFormat::Table => {
            if snapshots.is_empty() {
                return String::from("No snapshots found");
            }
            Table::new(snapshots.iter().map(|snapshot| SnapshotRow {
                id: snapshot.id,
                created: snapshot.create_date.clone(),
                name: snapshot.name.clone(),
                description: snapshot.description.clone(),
            }))
            .to_string()
        }
        OutputFormat::Json => to_pretty_json(snapshots),
    }
}

fn detail_rows(volume: &Volume) -> Vec<DetailRow> {
    let mut rows = vec![DetailRow {
        name: "id",
        value: volume.id.to_string(),
    }];
    push_row(&mut rows, "name", volume.service_resource_name.as_deref());
    push_row(&mut rows, "created", volume.create_date.as_deref());
    push_row(&mut rows, "type", volume.nas_type.as_deref());
    push_row(
        &mut rows,
        "capacity",
        volume
            .capacity_gb
            .map(|capacity| format!("{capacity}GB"))
            .as_deref(),
    );
    push_row(
        &mut rows,
        "snapshot capacity",
        volume
            .snapshot_capacity_gb
            .map(|capacity| format!("{capacity}GB"))
            .as_deref(),
    );
    push_row(&mut rows, "mountable", volume.mountable_flag.as_deref());
    push_row(
        &mut rows,
        "target ip",
        volume.service_resource_backend_ip_address.as_deref(),
    );
    if let Some(billing_item) = volume.billing_item.as_ref() {
        rows.push(DetailRow {
            name: "billing item",
            value: billing_item.id.to_string(),
        });
        push_row(&mut rows, "price", billing_item.recurring_fee.as_deref());
    }
    push_row(&mut rows, "username", volume.username.as_deref());
    push_row(&mut rows, "password", volume.password.as_deref());
    push_row(&mut rows, "notes", volume.notes.as_deref());
    rows
}

fn push_row(rows: &mut Vec<DetailRow>, name: &'static str, value: Option<&str>) {
    if let Some(text) = value {
        rows.push(DetailRow {
            name,
            value: text.to_owned(),
        });
    }
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| err.to_string())
}
