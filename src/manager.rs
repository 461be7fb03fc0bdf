//! Thin resource manager translating CLI-level operations into remote calls.
//!
//! Each operation issues one or two calls through the injected
//! [`StorageApi`] handle and returns either a decoded record or a unit
//! result. There is no caching: the datacenter list, volume records, and
//! price catalog are fetched fresh on every invocation.

use serde::Serialize;
use thiserror::Error;

use crate::api::{ApiError, Partnership, StorageApi, Volume};
use crate::order::{self, OrderError};

/// Default cancellation reason submitted to the billing system.
pub const DEFAULT_CANCEL_REASON: &str = "unNeeded";

/// Default notes attached to a new snapshot.
pub const DEFAULT_SNAPSHOT_NOTES: &str = "unNeeded";

/// Object mask applied when no caller-supplied mask is given.
pub const DEFAULT_VOLUME_MASK: &str = "mask[id,serviceResourceName,createDate,nasType,capacityGb,snapshotCapacityGb,mountableFlag,serviceResourceBackendIpAddress,billingItem,notes,username,password]";

/// Mask for the account-wide volume listing.
const LIST_VOLUME_MASK: &str =
    "mask[id,capacityGb,username,password,serviceResourceBackendIpAddress,serviceResource[datacenter[name]]]";

/// Mask used when fetching a volume to locate its billing item.
const CANCEL_VOLUME_MASK: &str = "mask[id,capacityGb,username,password,billingItem[id]]";

/// Mask used when fetching a volume to locate its datacenter.
const SNAPSHOT_SPACE_VOLUME_MASK: &str = "mask[id,capacityGb,serviceResource[datacenter]]";

/// Mask for snapshot partnership records.
const PARTNERSHIP_MASK: &str = "volumeId,partnerVolumeId,createDate,type";

/// Mask for the datacenter listing used during name resolution.
const DATACENTER_MASK: &str = "mask[id,name,longName]";

/// Errors raised by manager operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ManagerError {
    /// A required input was missing or unusable before any remote call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The requested datacenter name is not in the provider's list.
    #[error("unknown datacenter '{name}'")]
    InvalidDatacenter {
        /// Name that failed to resolve.
        name: String,
    },
    /// The price catalog returned nothing usable for the request.
    #[error("no price found for {capacity}GB")]
    NoPriceFound {
        /// Requested capacity in gigabytes.
        capacity: u32,
    },
    /// Every price candidate was rejected by the ordering system.
    #[error("order failed: all {attempts} price candidate(s) were rejected")]
    OrderFailed {
        /// Number of candidates that were attempted.
        attempts: usize,
    },
    /// The remote lookup returned nothing for the given id.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind that was looked up.
        resource: &'static str,
        /// Identifier that failed to resolve.
        id: i64,
    },
    /// Opaque propagation of an API boundary failure.
    #[error(transparent)]
    Remote(ApiError),
}

impl From<ApiError> for ManagerError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::NotFound { resource, id } => Self::NotFound { resource, id },
            other => Self::Remote(other),
        }
    }
}

impl From<OrderError> for ManagerError {
    fn from(value: OrderError) -> Self {
        match value {
            OrderError::Exhausted { attempts } => Self::OrderFailed { attempts },
        }
    }
}

/// Snapshot listing row shaped from a partnership record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    /// Snapshot identifier.
    pub id: i64,
    /// Partnership creation timestamp, blank when the provider omits it.
    pub create_date: String,
    /// Partnership type name, blank when omitted.
    pub name: String,
    /// Partnership type description, blank when omitted.
    pub description: String,
}

impl SnapshotSummary {
    /// Shapes a partnership record into a listing row.
    ///
    /// Records without a partner volume id carry nothing worth listing and
    /// are dropped.
    #[must_use]
    pub fn from_partnership(partnership: Partnership) -> Option<Self> {
        let id = partnership.partner_volume_id?;
        let kind = partnership.kind.unwrap_or_default();
        Some(Self {
            id,
            create_date: partnership.create_date.unwrap_or_default(),
            name: kind.name.unwrap_or_default(),
            description: kind.description.unwrap_or_default(),
        })
    }
}

/// Manages iSCSI volumes and snapshots through an injected API handle.
#[derive(Clone, Debug)]
pub struct StorageManager<A: StorageApi> {
    api: A,
}

impl<A: StorageApi> StorageManager<A> {
    /// Creates a manager around the given API handle.
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// Returns a reference to the underlying API handle.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Orders a new volume of `capacity` gigabytes in the named datacenter.
    ///
    /// The datacenter list is fetched fresh and matched by exact name; the
    /// price catalog is then queried and every candidate tried in
    /// cheapest-first order.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidArgument`] for unusable inputs before
    /// any remote call, [`ManagerError::InvalidDatacenter`] when the name
    /// does not resolve, [`ManagerError::NoPriceFound`] when the catalog has
    /// no matching capacity, and [`ManagerError::OrderFailed`] when every
    /// candidate is rejected.
    pub async fn create(&self, capacity: u32, datacenter: &str) -> Result<(), ManagerError> {
        if capacity == 0 {
            return Err(ManagerError::InvalidArgument(String::from(
                "capacity must be at least 1GB",
            )));
        }
        if datacenter.trim().is_empty() {
            return Err(ManagerError::InvalidArgument(String::from(
                "datacenter name must not be empty",
            )));
        }

        let location = self.resolve_datacenter(datacenter).await?;
        tracing::debug!(capacity, datacenter, location, "ordering new volume");

        let candidates = order::find_storage_prices(&self.api, capacity).await?;
        if candidates.is_empty() {
            return Err(ManagerError::NoPriceFound { capacity });
        }

        order::place_order_with_fallback(&self.api, &candidates, location)
            .await
            .map_err(ManagerError::from)
    }

    /// Fetches one volume record, applying the default mask when none is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the id does not resolve.
    pub async fn volume(&self, volume_id: i64, mask: Option<&str>) -> Result<Volume, ManagerError> {
        let applied = mask.unwrap_or(DEFAULT_VOLUME_MASK);
        Ok(self.api.volume(volume_id, applied).await?)
    }

    /// Lists the account's volumes for tabular display.
    ///
    /// # Errors
    ///
    /// Propagates remote failures as [`ManagerError::Remote`].
    pub async fn volumes(&self) -> Result<Vec<Volume>, ManagerError> {
        Ok(self.api.volumes(LIST_VOLUME_MASK).await?)
    }

    /// Cancels a volume by cancelling its billing item.
    ///
    /// The volume record is fetched first to obtain the billing item id;
    /// cancelling the volume id itself would be rejected by the billing
    /// system.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the volume does not exist and
    /// propagates billing failures unmodified.
    pub async fn cancel(
        &self,
        volume_id: i64,
        reason: &str,
        immediate: bool,
    ) -> Result<(), ManagerError> {
        let volume = self.api.volume(volume_id, CANCEL_VOLUME_MASK).await?;
        let billing_item = volume
            .billing_item
            .as_ref()
            .ok_or(ApiError::MissingField {
                field: "billingItem.id",
            })?;
        tracing::debug!(
            volume_id,
            billing_item = billing_item.id,
            immediate,
            "cancelling volume"
        );
        self.api
            .cancel_item(immediate, true, reason, billing_item.id)
            .await?;
        Ok(())
    }

    /// Creates a snapshot of `volume_id` with the given notes.
    ///
    /// # Errors
    ///
    /// Propagates remote failures unmodified.
    pub async fn create_snapshot(&self, volume_id: i64, notes: &str) -> Result<(), ManagerError> {
        self.api.create_snapshot(notes, volume_id).await?;
        Ok(())
    }

    /// Orders snapshot space of at least `capacity` gigabytes for
    /// `volume_id`, in the volume's own datacenter.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoPriceFound`] when no tier is large enough,
    /// [`ManagerError::NotFound`] when the volume does not exist, and
    /// [`ManagerError::OrderFailed`] when the ordering system rejects the
    /// order.
    pub async fn order_snapshot_space(
        &self,
        volume_id: i64,
        capacity: u32,
    ) -> Result<(), ManagerError> {
        let price_id = order::find_snapshot_space_price(&self.api, capacity)
            .await?
            .ok_or(ManagerError::NoPriceFound { capacity })?;

        let volume = self
            .api
            .volume(volume_id, SNAPSHOT_SPACE_VOLUME_MASK)
            .await?;
        let location = volume
            .service_resource
            .as_ref()
            .and_then(|resource| resource.datacenter.as_ref())
            .and_then(|datacenter| datacenter.id)
            .ok_or(ApiError::MissingField {
                field: "serviceResource.datacenter.id",
            })?;

        let payload = order::snapshot_space_order(price_id, location, volume_id);
        tracing::debug!(volume_id, capacity, price_id, location, "ordering snapshot space");

        if let Err(err) = self.api.verify_order(&payload).await {
            tracing::debug!(error = %err, "snapshot space verification rejected");
            return Err(ManagerError::OrderFailed { attempts: 1 });
        }
        if let Err(err) = self.api.place_order(&payload).await {
            tracing::debug!(error = %err, "snapshot space placement rejected");
            return Err(ManagerError::OrderFailed { attempts: 1 });
        }
        Ok(())
    }

    /// Deletes snapshot `snapshot_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when the id does not resolve.
    pub async fn delete_snapshot(&self, snapshot_id: i64) -> Result<(), ManagerError> {
        self.api.delete_snapshot(snapshot_id).await?;
        Ok(())
    }

    /// Overwrites `volume_id`'s contents from `snapshot_id`.
    ///
    /// The volume keeps its identity; only the data is rolled back.
    ///
    /// # Errors
    ///
    /// Propagates remote failures unmodified.
    pub async fn restore_from_snapshot(
        &self,
        volume_id: i64,
        snapshot_id: i64,
    ) -> Result<(), ManagerError> {
        self.api.restore_from_snapshot(snapshot_id, volume_id).await?;
        Ok(())
    }

    /// Lists the snapshots of `volume_id` as shaped summary rows.
    ///
    /// # Errors
    ///
    /// Propagates remote failures as [`ManagerError::Remote`].
    pub async fn snapshots(&self, volume_id: i64) -> Result<Vec<SnapshotSummary>, ManagerError> {
        let partnerships = self.api.partnerships(PARTNERSHIP_MASK, volume_id).await?;
        Ok(partnerships
            .into_iter()
            .filter_map(SnapshotSummary::from_partnership)
            .collect())
    }

    /// Resolves a datacenter name to its location id by exact match against
    /// the freshly fetched list. First match wins.
    async fn resolve_datacenter(&self, name: &str) -> Result<i64, ManagerError> {
        let datacenters = self.api.datacenters(DATACENTER_MASK).await?;
        datacenters
            .iter()
            .find(|datacenter| datacenter.name == name)
            .map(|datacenter| datacenter.id)
            .ok_or_else(|| ManagerError::InvalidDatacenter {
                name: name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PartnershipType;
    use crate::test_support::fixture_partnership;

    #[test]
    fn api_not_found_maps_to_manager_not_found() {
        let err = ManagerError::from(ApiError::NotFound {
            resource: "volume",
            id: 42,
        });

        assert_eq!(
            err,
            ManagerError::NotFound {
                resource: "volume",
                id: 42
            }
        );
    }

    #[test]
    fn other_api_errors_stay_remote() {
        let err = ManagerError::from(ApiError::Transport {
            message: String::from("connection refused"),
        });

        assert!(matches!(err, ManagerError::Remote(_)));
    }

    #[test]
    fn snapshot_summary_shapes_partnership_fields() {
        let summary = SnapshotSummary::from_partnership(fixture_partnership(100, 101))
            .expect("partner volume id present");

        assert_eq!(summary.id, 101);
        assert_eq!(summary.name, "SNAPSHOT");
        assert_eq!(summary.description, "Snapshot of storage volume");
    }

    #[test]
    fn snapshot_summary_drops_records_without_partner_id() {
        let partnership = Partnership {
            volume_id: Some(100),
            partner_volume_id: None,
            create_date: None,
            kind: Some(PartnershipType::default()),
        };

        assert_eq!(SnapshotSummary::from_partnership(partnership), None);
    }
}
