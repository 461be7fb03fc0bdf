//! Typed boundary to the provider's storage API.
//!
//! Responses from the provider arrive as loosely shaped nested JSON. Every
//! record is decoded exactly once, here, into structs with named optional
//! fields so the rest of the crate never digs through untyped maps. The
//! [`StorageApi`] trait captures the remote call shapes; the real REST
//! client and the test fixtures both implement it.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Future returned by every [`StorageApi`] operation.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Billing handle attached to a provisioned volume.
///
/// Cancellation goes through this id, never through the volume id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingItem {
    /// Billing-system identifier for the resource.
    pub id: i64,
    /// Monthly recurring fee as a decimal string, when the mask requests it.
    #[serde(default)]
    pub recurring_fee: Option<String>,
}

/// Datacenter reference embedded in a volume's service resource.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterRef {
    /// Location identifier used in order payloads.
    #[serde(default)]
    pub id: Option<i64>,
    /// Short datacenter name (for example `sng01`).
    #[serde(default)]
    pub name: Option<String>,
}

/// Backend service resource hosting a volume.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResource {
    /// Datacenter hosting the resource.
    #[serde(default)]
    pub datacenter: Option<DatacenterRef>,
}

/// An iSCSI storage record.
///
/// Snapshots share this shape; the provider models them as storage objects
/// with a different `nasType`. Fields outside the requested object mask are
/// absent, so everything beyond the id is optional.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Opaque storage identifier.
    pub id: i64,
    /// Provisioned capacity in gigabytes.
    #[serde(default)]
    pub capacity_gb: Option<u32>,
    /// Reserved snapshot capacity in gigabytes. The wire value is sometimes
    /// a quoted string, so it decodes from either representation.
    #[serde(default, deserialize_with = "quoted_u32")]
    pub snapshot_capacity_gb: Option<u32>,
    /// Storage type descriptor (for example `ISCSI`).
    #[serde(default)]
    pub nas_type: Option<String>,
    /// Creation timestamp as reported by the provider.
    #[serde(default)]
    pub create_date: Option<String>,
    /// Name of the backend service resource.
    #[serde(default)]
    pub service_resource_name: Option<String>,
    /// Backend IP address used to reach the target.
    #[serde(default)]
    pub service_resource_backend_ip_address: Option<String>,
    /// Whether the volume can currently be mounted.
    #[serde(default)]
    pub mountable_flag: Option<String>,
    /// CHAP username.
    #[serde(default)]
    pub username: Option<String>,
    /// CHAP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Free-form notes stored on the volume.
    #[serde(default)]
    pub notes: Option<String>,
    /// Billing handle, required for cancellation.
    #[serde(default)]
    pub billing_item: Option<BillingItem>,
    /// Hosting service resource, carrying the datacenter id.
    #[serde(default)]
    pub service_resource: Option<ServiceResource>,
}

/// Catalog item attached to a price.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItem {
    /// Capacity tier in gigabytes. Decodes from a bare number or the quoted
    /// string the catalog sometimes returns.
    #[serde(default, deserialize_with = "quoted_u32")]
    pub capacity: Option<u32>,
    /// Human-readable item description matched by catalog queries.
    pub description: String,
}

/// A price catalog entry pairing a capacity tier with a billable price id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPrice {
    /// Price identifier referenced by order payloads.
    pub id: i64,
    /// Monthly recurring fee as a decimal string; absent means free.
    #[serde(default)]
    pub recurring_fee: Option<String>,
    /// The catalog item this price applies to.
    pub item: PriceItem,
}

impl ItemPrice {
    /// Numeric recurring fee, treating a missing or malformed value as zero.
    #[must_use]
    pub fn fee(&self) -> f64 {
        self.recurring_fee
            .as_deref()
            .and_then(|fee| fee.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

/// Reference to a chosen price inside an order payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PriceReference {
    /// Price identifier.
    pub id: i64,
}

/// Product order payload submitted to the ordering system.
///
/// Serialises camelCase; `volumeId` is omitted entirely unless the order
/// targets an existing volume (snapshot space orders do).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOrder {
    /// Order-type tag understood by the ordering system.
    pub complex_type: String,
    /// Datacenter/location identifier.
    pub location: i64,
    /// Product package the price belongs to.
    pub package_id: i64,
    /// The single chosen price.
    pub prices: Vec<PriceReference>,
    /// Always `1`; the ordering system rejects anything else for storage.
    pub quantity: u32,
    /// Target volume for snapshot space orders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_id: Option<i64>,
}

/// Type descriptor on a snapshot partnership record.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnershipType {
    /// Short type name.
    #[serde(default)]
    pub name: Option<String>,
    /// Longer type description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Partnership record linking a volume to one of its snapshots.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Partnership {
    /// Parent volume identifier.
    #[serde(default)]
    pub volume_id: Option<i64>,
    /// Snapshot (partner volume) identifier.
    #[serde(default)]
    pub partner_volume_id: Option<i64>,
    /// Partnership creation timestamp.
    #[serde(default)]
    pub create_date: Option<String>,
    /// Partnership type descriptor.
    #[serde(default, rename = "type")]
    pub kind: Option<PartnershipType>,
}

/// A datacenter as returned by the location service.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    /// Location identifier used in order payloads.
    pub id: i64,
    /// Short name matched against user input (for example `dal05`).
    pub name: String,
    /// Human-friendly long name.
    #[serde(default)]
    pub long_name: Option<String>,
}

/// Errors raised at the API boundary.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// The remote lookup returned nothing for the given id.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind that was looked up.
        resource: &'static str,
        /// Identifier that failed to resolve.
        id: i64,
    },
    /// The provider reported an application-level error.
    #[error("provider error: {message}")]
    Provider {
        /// Provider error code, when one was supplied.
        code: Option<String>,
        /// Message returned by the provider.
        message: String,
    },
    /// The HTTP transport failed before a response was decoded.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
    /// A response body could not be decoded into its record type.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded.
        what: &'static str,
        /// Parser error message.
        message: String,
    },
    /// A response decoded cleanly but lacked a field the operation needs.
    #[error("response missing expected field {field}")]
    MissingField {
        /// Dotted path of the missing field.
        field: &'static str,
    },
}

/// Remote call shapes consumed by the order builder and resource manager.
///
/// Methods return boxed [`Send`] futures so implementations can be chosen at
/// runtime and test doubles stay trivial to write.
pub trait StorageApi {
    /// Fetches one storage record restricted to `mask`.
    fn volume<'a>(&'a self, id: i64, mask: &'a str) -> ApiFuture<'a, Volume>;

    /// Lists the account's iSCSI storage records restricted to `mask`.
    fn volumes<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Volume>>;

    /// Queries the price catalog of `package_id` for items whose description
    /// matches `description` (case-insensitive substring).
    fn item_prices<'a>(&'a self, package_id: i64, description: &'a str)
    -> ApiFuture<'a, Vec<ItemPrice>>;

    /// Asks the ordering system to validate an order without placing it.
    fn verify_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()>;

    /// Places a previously verified order.
    fn place_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()>;

    /// Cancels a billing item. `cancel_associated` extends the cancellation
    /// to children billed together with the item.
    fn cancel_item<'a>(
        &'a self,
        immediate: bool,
        cancel_associated: bool,
        reason: &'a str,
        id: i64,
    ) -> ApiFuture<'a, ()>;

    /// Creates a snapshot of volume `id`, returning the new snapshot record.
    fn create_snapshot<'a>(&'a self, notes: &'a str, id: i64) -> ApiFuture<'a, Volume>;

    /// Deletes snapshot `id`.
    fn delete_snapshot<'a>(&'a self, id: i64) -> ApiFuture<'a, ()>;

    /// Overwrites volume `id`'s contents from snapshot `snapshot_id`.
    fn restore_from_snapshot<'a>(&'a self, snapshot_id: i64, id: i64) -> ApiFuture<'a, ()>;

    /// Fetches the snapshot partnership records of volume `id`.
    fn partnerships<'a>(&'a self, mask: &'a str, id: i64) -> ApiFuture<'a, Vec<Partnership>>;

    /// Fetches the provider's datacenter list restricted to `mask`.
    fn datacenters<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Datacenter>>;
}

/// Decodes an optional integer that the provider may quote as a string.
fn quoted_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_decodes_quoted_snapshot_capacity() {
        let volume: Volume = serde_json::from_str(
            r#"{"id": 100, "capacityGb": 20, "snapshotCapacityGb": "40"}"#,
        )
        .expect("decode volume");

        assert_eq!(volume.id, 100);
        assert_eq!(volume.capacity_gb, Some(20));
        assert_eq!(volume.snapshot_capacity_gb, Some(40));
        assert!(volume.billing_item.is_none());
    }

    #[test]
    fn price_item_decodes_numeric_and_quoted_capacity() {
        let quoted: PriceItem =
            serde_json::from_str(r#"{"capacity": "20", "description": "20GB iSCSI SAN Storage"}"#)
                .expect("decode quoted capacity");
        let numeric: PriceItem =
            serde_json::from_str(r#"{"capacity": 20, "description": "20GB iSCSI SAN Storage"}"#)
                .expect("decode numeric capacity");

        assert_eq!(quoted.capacity, Some(20));
        assert_eq!(numeric.capacity, Some(20));
    }

    #[test]
    fn item_price_fee_defaults_to_zero() {
        let price: ItemPrice = serde_json::from_str(
            r#"{"id": 22441, "item": {"capacity": 20, "description": "20GB iSCSI SAN Storage"}}"#,
        )
        .expect("decode price");

        assert_eq!(price.fee(), 0.0);
    }

    #[test]
    fn item_price_fee_parses_decimal_string() {
        let price: ItemPrice = serde_json::from_str(
            r#"{"id": 22441, "recurringFee": ".35", "item": {"capacity": 20, "description": "20GB iSCSI SAN Storage"}}"#,
        )
        .expect("decode price");

        assert_eq!(price.fee(), 0.35);
    }

    #[test]
    fn order_serialises_camel_case_without_volume_id() {
        let order = StorageOrder {
            complex_type: String::from("Container_Product_Order_Network_Storage_Iscsi"),
            location: 138_124,
            package_id: 0,
            prices: vec![PriceReference { id: 22_441 }],
            quantity: 1,
            volume_id: None,
        };
        let json = serde_json::to_string(&order).expect("serialise order");

        assert!(json.contains(r#""packageId":0"#));
        assert!(json.contains(r#""prices":[{"id":22441}]"#));
        assert!(!json.contains("volumeId"));
    }

    #[test]
    fn order_serialises_volume_id_when_set() {
        let order = StorageOrder {
            complex_type: String::from(
                "Container_Product_Order_Network_Storage_Iscsi_SnapshotSpace",
            ),
            location: 138_124,
            package_id: 0,
            prices: vec![PriceReference { id: 22_501 }],
            quantity: 1,
            volume_id: Some(100),
        };
        let json = serde_json::to_string(&order).expect("serialise order");

        assert!(json.contains(r#""volumeId":100"#));
    }

    #[test]
    fn partnership_decodes_type_descriptor() {
        let partnership: Partnership = serde_json::from_str(
            r#"{"volumeId": 100, "partnerVolumeId": 101, "createDate": "2014-03-27T03:51:11-04:00", "type": {"name": "SNAPSHOT", "description": "Snapshot of storage volume"}}"#,
        )
        .expect("decode partnership");

        assert_eq!(partnership.partner_volume_id, Some(101));
        let kind = partnership.kind.expect("type present");
        assert_eq!(kind.name.as_deref(), Some("SNAPSHOT"));
    }
}
