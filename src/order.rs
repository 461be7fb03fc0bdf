//! Product order construction and price selection.
//!
//! Storage is provisioned by ordering a price out of the provider's product
//! catalog. The helpers here query the catalog, narrow it down to usable
//! candidates, build the order payload, and walk the candidate list until
//! the ordering system accepts one.

use thiserror::Error;

use crate::api::{ApiError, ItemPrice, PriceReference, StorageApi, StorageOrder};

/// Product package holding every iSCSI storage price.
pub const STORAGE_PACKAGE_ID: i64 = 0;

/// Order-type tag for new volume orders.
pub const STORAGE_ORDER_TYPE: &str = "Container_Product_Order_Network_Storage_Iscsi";

/// Order-type tag for snapshot space orders.
pub const SNAPSHOT_SPACE_ORDER_TYPE: &str =
    "Container_Product_Order_Network_Storage_Iscsi_SnapshotSpace";

/// Catalog description pattern matching volume prices.
pub const STORAGE_PRICE_PATTERN: &str = "GB iSCSI SAN Storage";

/// Catalog description pattern matching snapshot space prices.
pub const SNAPSHOT_SPACE_PRICE_PATTERN: &str = "iSCSI SAN Snapshot Space";

/// Errors raised while placing an order.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OrderError {
    /// Every price candidate was rejected by the ordering system.
    #[error("order failed: all {attempts} price candidate(s) were rejected")]
    Exhausted {
        /// Number of candidates that were attempted.
        attempts: usize,
    },
}

/// Finds price ids for a volume of exactly `capacity` gigabytes.
///
/// Candidates are sorted ascending by capacity then recurring fee, so the
/// cheapest match comes first. An empty result means no catalog entry fits;
/// callers decide whether that is an error.
///
/// # Errors
///
/// Returns [`ApiError`] when the catalog query fails.
pub async fn find_storage_prices<A>(api: &A, capacity: u32) -> Result<Vec<i64>, ApiError>
where
    A: StorageApi + ?Sized,
{
    let mut prices = api
        .item_prices(STORAGE_PACKAGE_ID, STORAGE_PRICE_PATTERN)
        .await?;
    prices.retain(|price| price.item.capacity == Some(capacity));
    sort_by_capacity_then_fee(&mut prices);
    Ok(prices.into_iter().map(|price| price.id).collect())
}

/// Finds the cheapest snapshot space price of at least `capacity` gigabytes.
///
/// Candidates are sorted ascending by capacity alone; the smallest
/// sufficient tier wins. Returns `None` when no tier satisfies the minimum.
///
/// # Errors
///
/// Returns [`ApiError`] when the catalog query fails.
pub async fn find_snapshot_space_price<A>(api: &A, capacity: u32) -> Result<Option<i64>, ApiError>
where
    A: StorageApi + ?Sized,
{
    let mut prices = api
        .item_prices(STORAGE_PACKAGE_ID, SNAPSHOT_SPACE_PRICE_PATTERN)
        .await?;
    prices.retain(|price| price.item.capacity.is_some_and(|tier| tier >= capacity));
    prices.sort_by_key(|price| price.item.capacity);
    Ok(prices.first().map(|price| price.id))
}

/// Builds a new-volume order payload. Pure construction, no I/O.
#[must_use]
pub fn storage_order(price_id: i64, location: i64) -> StorageOrder {
    StorageOrder {
        complex_type: String::from(STORAGE_ORDER_TYPE),
        location,
        package_id: STORAGE_PACKAGE_ID,
        prices: vec![PriceReference { id: price_id }],
        quantity: 1,
        volume_id: None,
    }
}

/// Builds a snapshot space order targeting `volume_id`. Pure construction.
#[must_use]
pub fn snapshot_space_order(price_id: i64, location: i64, volume_id: i64) -> StorageOrder {
    StorageOrder {
        complex_type: String::from(SNAPSHOT_SPACE_ORDER_TYPE),
        location,
        package_id: STORAGE_PACKAGE_ID,
        prices: vec![PriceReference { id: price_id }],
        quantity: 1,
        volume_id: Some(volume_id),
    }
}

/// Walks `candidates` in order, verifying and placing an order for each
/// until one is accepted.
///
/// Failures are swallowed per candidate: a rejected verification skips
/// straight to the next price, and a failed placement does the same. This is
/// a best-effort fallback, not a retry policy — a transient transport
/// failure is indistinguishable from an invalid price id here.
///
/// # Errors
///
/// Returns [`OrderError::Exhausted`] once every candidate has been rejected.
pub async fn place_order_with_fallback<A>(
    api: &A,
    candidates: &[i64],
    location: i64,
) -> Result<(), OrderError>
where
    A: StorageApi + ?Sized,
{
    for &price_id in candidates {
        let order = storage_order(price_id, location);

        if let Err(err) = api.verify_order(&order).await {
            tracing::debug!(price_id, error = %err, "order verification rejected, trying next price");
            continue;
        }

        match api.place_order(&order).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::debug!(price_id, error = %err, "order placement rejected, trying next price");
            }
        }
    }

    Err(OrderError::Exhausted {
        attempts: candidates.len(),
    })
}

/// Sorts prices ascending by capacity, breaking ties on recurring fee.
fn sort_by_capacity_then_fee(prices: &mut [ItemPrice]) {
    prices.sort_by(|lhs, rhs| {
        lhs.item
            .capacity
            .cmp(&rhs.item.capacity)
            .then_with(|| lhs.fee().total_cmp(&rhs.fee()))
    });
}
