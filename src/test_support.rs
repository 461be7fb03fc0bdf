//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::future;
use std::sync::{Arc, Mutex, MutexGuard as StateGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::api::{
    ApiError, ApiFuture, BillingItem, Datacenter, DatacenterRef, ItemPrice, Partnership,
    PartnershipType, PriceItem, ServiceResource, StorageApi, StorageOrder, Volume,
};

/// Scripted [`StorageApi`] double backed by canned records.
///
/// Every call is recorded so tests can assert on exact call shapes, and
/// verify/place rejections can be scripted per price id to drive the order
/// fallback paths without a real ordering system.
#[derive(Clone, Debug, Default)]
pub struct FixtureApi {
    inner: Arc<Mutex<FixtureState>>,
}

#[derive(Debug, Default)]
struct FixtureState {
    volumes: Vec<Volume>,
    prices: Vec<ItemPrice>,
    datacenters: Vec<Datacenter>,
    partnerships: Vec<(i64, Partnership)>,
    snapshot_ids: BTreeSet<i64>,
    verify_rejects: BTreeSet<i64>,
    place_rejects: BTreeSet<i64>,
    calls: Vec<RecordedCall>,
}

/// Records a single invocation made through [`FixtureApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordedCall {
    /// A single-volume lookup.
    Volume {
        /// Requested volume id.
        id: i64,
        /// Object mask passed by the caller.
        mask: String,
    },
    /// An account-wide volume listing.
    Volumes {
        /// Object mask passed by the caller.
        mask: String,
    },
    /// A price catalog query.
    ItemPrices {
        /// Product package queried.
        package_id: i64,
        /// Description pattern passed by the caller.
        description: String,
    },
    /// An order verification attempt.
    VerifyOrder(StorageOrder),
    /// An order placement attempt.
    PlaceOrder(StorageOrder),
    /// A billing item cancellation.
    CancelItem {
        /// Whether immediate cancellation was requested.
        immediate: bool,
        /// Whether associated children were included.
        cancel_associated: bool,
        /// Cancellation reason.
        reason: String,
        /// Billing item id the call targeted.
        id: i64,
    },
    /// A snapshot creation request.
    CreateSnapshot {
        /// Notes attached to the snapshot.
        notes: String,
        /// Parent volume id.
        id: i64,
    },
    /// A snapshot deletion request.
    DeleteSnapshot {
        /// Snapshot id.
        id: i64,
    },
    /// A restore-from-snapshot request.
    RestoreFromSnapshot {
        /// Source snapshot id.
        snapshot_id: i64,
        /// Target volume id.
        id: i64,
    },
    /// A partnership listing.
    Partnerships {
        /// Object mask passed by the caller.
        mask: String,
        /// Parent volume id.
        id: i64,
    },
    /// A datacenter listing.
    Datacenters {
        /// Object mask passed by the caller.
        mask: String,
    },
}

impl FixtureApi {
    /// Creates a fixture with no canned records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StateGuard<'_, FixtureState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds a volume record.
    pub fn push_volume(&self, volume: Volume) {
        self.state().volumes.push(volume);
    }

    /// Seeds a price catalog entry.
    pub fn push_price(&self, price: ItemPrice) {
        self.state().prices.push(price);
    }

    /// Seeds a datacenter record.
    pub fn push_datacenter(&self, datacenter: Datacenter) {
        self.state().datacenters.push(datacenter);
    }

    /// Seeds a partnership record under `volume_id`.
    pub fn push_partnership(&self, volume_id: i64, partnership: Partnership) {
        self.state().partnerships.push((volume_id, partnership));
    }

    /// Registers a snapshot id so deletion of it succeeds.
    pub fn push_snapshot(&self, snapshot_id: i64) {
        self.state().snapshot_ids.insert(snapshot_id);
    }

    /// Scripts verification to reject orders carrying `price_id`.
    pub fn reject_verify(&self, price_id: i64) {
        self.state().verify_rejects.insert(price_id);
    }

    /// Scripts placement to reject orders carrying `price_id`.
    pub fn reject_place(&self, price_id: i64) {
        self.state().place_rejects.insert(price_id);
    }

    /// Returns a snapshot of all recorded calls so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    fn record(&self, call: RecordedCall) {
        self.state().calls.push(call);
    }

    fn order_price_id(order: &StorageOrder) -> Option<i64> {
        order.prices.first().map(|price| price.id)
    }
}

impl StorageApi for FixtureApi {
    fn volume<'a>(&'a self, id: i64, mask: &'a str) -> ApiFuture<'a, Volume> {
        self.record(RecordedCall::Volume {
            id,
            mask: mask.to_owned(),
        });
        let result = self
            .state()
            .volumes
            .iter()
            .find(|volume| volume.id == id)
            .cloned()
            .ok_or(ApiError::NotFound {
                resource: "volume",
                id,
            });
        Box::pin(future::ready(result))
    }

    fn volumes<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        self.record(RecordedCall::Volumes {
            mask: mask.to_owned(),
        });
        let result = Ok(self.state().volumes.clone());
        Box::pin(future::ready(result))
    }

    fn item_prices<'a>(
        &'a self,
        package_id: i64,
        description: &'a str,
    ) -> ApiFuture<'a, Vec<ItemPrice>> {
        self.record(RecordedCall::ItemPrices {
            package_id,
            description: description.to_owned(),
        });
        let needle = description.to_lowercase();
        let result = Ok(self
            .state()
            .prices
            .iter()
            .filter(|price| price.item.description.to_lowercase().contains(&needle))
            .cloned()
            .collect());
        Box::pin(future::ready(result))
    }

    fn verify_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()> {
        self.record(RecordedCall::VerifyOrder(order.clone()));
        let rejected = Self::order_price_id(order)
            .is_some_and(|price_id| self.state().verify_rejects.contains(&price_id));
        let result = if rejected {
            Err(ApiError::Provider {
                code: None,
                message: String::from("scripted verification rejection"),
            })
        } else {
            Ok(())
        };
        Box::pin(future::ready(result))
    }

    fn place_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()> {
        self.record(RecordedCall::PlaceOrder(order.clone()));
        let rejected = Self::order_price_id(order)
            .is_some_and(|price_id| self.state().place_rejects.contains(&price_id));
        let result = if rejected {
            Err(ApiError::Provider {
                code: None,
                message: String::from("scripted placement rejection"),
            })
        } else {
            Ok(())
        };
        Box::pin(future::ready(result))
    }

    fn cancel_item<'a>(
        &'a self,
        immediate: bool,
        cancel_associated: bool,
        reason: &'a str,
        id: i64,
    ) -> ApiFuture<'a, ()> {
        self.record(RecordedCall::CancelItem {
            immediate,
            cancel_associated,
            reason: reason.to_owned(),
            id,
        });
        Box::pin(future::ready(Ok(())))
    }

    fn create_snapshot<'a>(&'a self, notes: &'a str, id: i64) -> ApiFuture<'a, Volume> {
        self.record(RecordedCall::CreateSnapshot {
            notes: notes.to_owned(),
            id,
        });
        Box::pin(future::ready(Ok(fixture_snapshot())))
    }

    fn delete_snapshot<'a>(&'a self, id: i64) -> ApiFuture<'a, ()> {
        self.record(RecordedCall::DeleteSnapshot { id });
        let result = if self.state().snapshot_ids.contains(&id) {
            Ok(())
        } else {
            Err(ApiError::NotFound {
                resource: "snapshot",
                id,
            })
        };
        Box::pin(future::ready(result))
    }

    fn restore_from_snapshot<'a>(&'a self, snapshot_id: i64, id: i64) -> ApiFuture<'a, ()> {
        self.record(RecordedCall::RestoreFromSnapshot { snapshot_id, id });
        Box::pin(future::ready(Ok(())))
    }

    fn partnerships<'a>(&'a self, mask: &'a str, id: i64) -> ApiFuture<'a, Vec<Partnership>> {
        self.record(RecordedCall::Partnerships {
            mask: mask.to_owned(),
            id,
        });
        let result = Ok(self
            .state()
            .partnerships
            .iter()
            .filter(|(volume_id, _)| *volume_id == id)
            .map(|(_, partnership)| partnership.clone())
            .collect());
        Box::pin(future::ready(result))
    }

    fn datacenters<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Datacenter>> {
        self.record(RecordedCall::Datacenters {
            mask: mask.to_owned(),
        });
        let result = Ok(self.state().datacenters.clone());
        Box::pin(future::ready(result))
    }
}

/// Canned volume record mirroring a provider response. The billing item id
/// deliberately differs from the volume id.
#[must_use]
pub fn fixture_volume() -> Volume {
    Volume {
        id: 100,
        capacity_gb: Some(20),
        snapshot_capacity_gb: Some(40),
        nas_type: Some(String::from("ISCSI")),
        create_date: Some(String::from("2014-03-14T06:50:15-04:00")),
        service_resource_name: Some(String::from("storagesng0101")),
        service_resource_backend_ip_address: Some(String::from("10.2.37.21")),
        mountable_flag: Some(String::from("1")),
        username: Some(String::from("IBMI278184-201")),
        password: Some(String::from("YAQSb9s3FbEz")),
        notes: Some(String::from("integration test volume")),
        billing_item: Some(BillingItem {
            id: 6327,
            recurring_fee: Some(String::from("0.35")),
        }),
        service_resource: Some(ServiceResource {
            datacenter: Some(DatacenterRef {
                id: Some(138_124),
                name: Some(String::from("sng01")),
            }),
        }),
    }
}

/// Canned snapshot record returned by [`FixtureApi`] snapshot creation.
#[must_use]
pub fn fixture_snapshot() -> Volume {
    Volume {
        id: 101,
        capacity_gb: Some(20),
        snapshot_capacity_gb: None,
        nas_type: Some(String::from("ISCSI_SNAPSHOT")),
        create_date: Some(String::from("2014-03-27T03:51:11-04:00")),
        service_resource_name: Some(String::from("storagesng0101")),
        service_resource_backend_ip_address: None,
        mountable_flag: None,
        username: None,
        password: None,
        notes: None,
        billing_item: None,
        service_resource: None,
    }
}

/// Canned datacenter list containing the fixture volume's datacenter.
#[must_use]
pub fn fixture_datacenters() -> Vec<Datacenter> {
    vec![
        Datacenter {
            id: 138_124,
            name: String::from("sng01"),
            long_name: Some(String::from("Singapore 1")),
        },
        Datacenter {
            id: 154_820,
            name: String::from("dal05"),
            long_name: Some(String::from("Dallas 5")),
        },
    ]
}

/// Builds a volume price catalog entry for `capacity` gigabytes.
#[must_use]
pub fn storage_price(id: i64, capacity: u32, fee: &str) -> ItemPrice {
    ItemPrice {
        id,
        recurring_fee: Some(fee.to_owned()),
        item: PriceItem {
            capacity: Some(capacity),
            description: format!("{capacity}GB iSCSI SAN Storage"),
        },
    }
}

/// Builds a snapshot space price catalog entry for `capacity` gigabytes.
#[must_use]
pub fn snapshot_space_price(id: i64, capacity: u32, fee: &str) -> ItemPrice {
    ItemPrice {
        id,
        recurring_fee: Some(fee.to_owned()),
        item: PriceItem {
            capacity: Some(capacity),
            description: format!("{capacity}GB iSCSI SAN Snapshot Space"),
        },
    }
}

/// Builds a snapshot partnership record for `partner_volume_id`.
#[must_use]
pub fn fixture_partnership(volume_id: i64, partner_volume_id: i64) -> Partnership {
    Partnership {
        volume_id: Some(volume_id),
        partner_volume_id: Some(partner_volume_id),
        create_date: Some(String::from("2014-03-27T03:51:11-04:00")),
        kind: Some(PartnershipType {
            name: Some(String::from("SNAPSHOT")),
            description: Some(String::from("Snapshot of storage volume")),
        }),
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }

    /// Sets a single environment variable while holding the global mutex.
    pub async fn set_var(key: &str, value: &str) -> Self {
        Self::set_vars(&[(key, value)]).await
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
