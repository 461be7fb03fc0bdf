//! Behavioural tests for the resource manager against the scripted fixture
//! API, asserting on exact remote call shapes.

use rstest::{fixture, rstest};

use sanctl::test_support::{
    FixtureApi, RecordedCall, fixture_datacenters, fixture_partnership, fixture_volume,
    snapshot_space_price, storage_price,
};
use sanctl::{
    DEFAULT_CANCEL_REASON, DEFAULT_SNAPSHOT_NOTES, DEFAULT_VOLUME_MASK, ManagerError,
    StorageManager,
};

#[fixture]
fn api() -> FixtureApi {
    let api = FixtureApi::new();
    api.push_volume(fixture_volume());
    for datacenter in fixture_datacenters() {
        api.push_datacenter(datacenter);
    }
    api
}

fn manager(api: &FixtureApi) -> StorageManager<FixtureApi> {
    StorageManager::new(api.clone())
}

#[rstest]
#[tokio::test]
async fn get_applies_the_default_mask(api: FixtureApi) {
    let volume = manager(&api)
        .volume(100, None)
        .await
        .expect("fixture volume resolves");

    assert_eq!(volume.id, 100);
    assert_eq!(volume.capacity_gb, Some(20));
    assert_eq!(volume.billing_item.map(|item| item.id), Some(6327));
    assert_eq!(
        api.calls(),
        vec![RecordedCall::Volume {
            id: 100,
            mask: DEFAULT_VOLUME_MASK.to_owned(),
        }]
    );
}

#[rstest]
#[tokio::test]
async fn get_unknown_volume_is_not_found(api: FixtureApi) {
    let err = manager(&api)
        .volume(999, None)
        .await
        .expect_err("unknown id");

    assert_eq!(
        err,
        ManagerError::NotFound {
            resource: "volume",
            id: 999
        }
    );
}

#[rstest]
#[tokio::test]
async fn cancel_targets_the_billing_item_not_the_volume(api: FixtureApi) {
    manager(&api)
        .cancel(100, DEFAULT_CANCEL_REASON, true)
        .await
        .expect("cancel succeeds");

    let cancel_calls: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, RecordedCall::CancelItem { .. }))
        .collect();
    assert_eq!(
        cancel_calls,
        vec![RecordedCall::CancelItem {
            immediate: true,
            cancel_associated: true,
            reason: DEFAULT_CANCEL_REASON.to_owned(),
            id: 6327,
        }]
    );
}

#[rstest]
#[tokio::test]
async fn cancel_defaults_to_anniversary_cancellation(api: FixtureApi) {
    manager(&api)
        .cancel(100, DEFAULT_CANCEL_REASON, false)
        .await
        .expect("cancel succeeds");

    assert!(api.calls().iter().any(|call| matches!(
        call,
        RecordedCall::CancelItem {
            immediate: false,
            cancel_associated: true,
            ..
        }
    )));
}

#[rstest]
#[tokio::test]
async fn cancel_of_unknown_volume_is_not_found(api: FixtureApi) {
    let err = manager(&api)
        .cancel(999, DEFAULT_CANCEL_REASON, false)
        .await
        .expect_err("unknown id");

    assert!(matches!(err, ManagerError::NotFound { id: 999, .. }));
    assert!(
        !api.calls()
            .iter()
            .any(|call| matches!(call, RecordedCall::CancelItem { .. })),
        "no cancellation should be attempted"
    );
}

#[rstest]
#[tokio::test]
async fn create_orders_the_cheapest_matching_price(api: FixtureApi) {
    api.push_price(storage_price(22_443, 20, "0.50"));
    api.push_price(storage_price(22_441, 20, "0.35"));

    manager(&api)
        .create(20, "sng01")
        .await
        .expect("order placed");

    let placed: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::PlaceOrder(order) => Some(order),
            _ => None,
        })
        .collect();
    assert_eq!(placed.len(), 1);
    let order = placed.first().expect("one placement");
    assert_eq!(order.location, 138_124);
    assert_eq!(order.quantity, 1);
    assert_eq!(
        order.prices.first().map(|price| price.id),
        Some(22_441),
        "cheapest candidate should be placed first"
    );
}

#[rstest]
#[tokio::test]
async fn create_with_unknown_datacenter_skips_the_price_catalog(api: FixtureApi) {
    api.push_price(storage_price(22_441, 20, "0.35"));

    let err = manager(&api)
        .create(20, "ams03")
        .await
        .expect_err("unknown datacenter");

    assert_eq!(
        err,
        ManagerError::InvalidDatacenter {
            name: String::from("ams03")
        }
    );
    assert!(
        !api.calls()
            .iter()
            .any(|call| matches!(call, RecordedCall::ItemPrices { .. })),
        "the price catalog must not be queried"
    );
}

#[rstest]
#[tokio::test]
async fn create_without_matching_capacity_reports_no_price(api: FixtureApi) {
    api.push_price(storage_price(22_460, 40, "0.60"));

    let err = manager(&api)
        .create(20, "sng01")
        .await
        .expect_err("no matching tier");

    assert_eq!(err, ManagerError::NoPriceFound { capacity: 20 });
}

#[rstest]
#[tokio::test]
async fn create_reports_order_failed_once_candidates_are_exhausted(api: FixtureApi) {
    api.push_price(storage_price(22_441, 20, "0.35"));
    api.push_price(storage_price(22_443, 20, "0.50"));
    api.reject_place(22_441);
    api.reject_place(22_443);

    let err = manager(&api)
        .create(20, "sng01")
        .await
        .expect_err("every candidate rejected");

    assert_eq!(err, ManagerError::OrderFailed { attempts: 2 });
    let placements = api
        .calls()
        .iter()
        .filter(|call| matches!(call, RecordedCall::PlaceOrder(_)))
        .count();
    assert_eq!(placements, 2, "one placement attempt per candidate");
}

#[rstest]
#[case::zero_capacity(0, "sng01")]
#[case::blank_datacenter(20, "  ")]
#[tokio::test]
async fn create_validates_arguments_before_any_remote_call(
    api: FixtureApi,
    #[case] capacity: u32,
    #[case] datacenter: &str,
) {
    let err = manager(&api)
        .create(capacity, datacenter)
        .await
        .expect_err("local validation should fail");

    assert!(matches!(err, ManagerError::InvalidArgument(_)));
    assert!(api.calls().is_empty(), "no remote call should be made");
}

#[rstest]
#[tokio::test]
async fn order_snapshot_space_builds_the_composite_payload(api: FixtureApi) {
    api.push_price(snapshot_space_price(22_510, 40, "0.70"));
    api.push_price(snapshot_space_price(22_501, 20, "0.45"));

    manager(&api)
        .order_snapshot_space(100, 20)
        .await
        .expect("snapshot space ordered");

    let placed: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::PlaceOrder(order) => Some(order),
            _ => None,
        })
        .collect();
    let order = placed.first().expect("one placement");
    assert_eq!(order.location, 138_124, "volume's own datacenter");
    assert_eq!(order.volume_id, Some(100));
    assert_eq!(order.prices.first().map(|price| price.id), Some(22_501));
    assert!(order.complex_type.contains("SnapshotSpace"));
}

#[rstest]
#[tokio::test]
async fn order_snapshot_space_without_a_large_enough_tier_reports_no_price(api: FixtureApi) {
    api.push_price(snapshot_space_price(22_495, 10, "0.30"));

    let err = manager(&api)
        .order_snapshot_space(100, 80)
        .await
        .expect_err("no sufficient tier");

    assert_eq!(err, ManagerError::NoPriceFound { capacity: 80 });
}

#[rstest]
#[tokio::test]
async fn order_snapshot_space_maps_placement_rejection_to_order_failed(api: FixtureApi) {
    api.push_price(snapshot_space_price(22_501, 20, "0.45"));
    api.reject_place(22_501);

    let err = manager(&api)
        .order_snapshot_space(100, 20)
        .await
        .expect_err("placement rejected");

    assert_eq!(err, ManagerError::OrderFailed { attempts: 1 });
}

#[rstest]
#[tokio::test]
async fn create_snapshot_passes_notes_through(api: FixtureApi) {
    manager(&api)
        .create_snapshot(100, DEFAULT_SNAPSHOT_NOTES)
        .await
        .expect("snapshot requested");

    assert_eq!(
        api.calls(),
        vec![RecordedCall::CreateSnapshot {
            notes: DEFAULT_SNAPSHOT_NOTES.to_owned(),
            id: 100,
        }]
    );
}

#[rstest]
#[tokio::test]
async fn delete_snapshot_resolves_known_ids(api: FixtureApi) {
    api.push_snapshot(101);

    manager(&api)
        .delete_snapshot(101)
        .await
        .expect("known snapshot deletes");

    let err = manager(&api)
        .delete_snapshot(999)
        .await
        .expect_err("unknown snapshot");
    assert_eq!(
        err,
        ManagerError::NotFound {
            resource: "snapshot",
            id: 999
        }
    );
}

#[rstest]
#[tokio::test]
async fn restore_sends_snapshot_then_volume(api: FixtureApi) {
    manager(&api)
        .restore_from_snapshot(100, 101)
        .await
        .expect("restore succeeds");

    assert_eq!(
        api.calls(),
        vec![RecordedCall::RestoreFromSnapshot {
            snapshot_id: 101,
            id: 100,
        }]
    );
}

#[rstest]
#[tokio::test]
async fn snapshot_listing_shapes_partnership_records(api: FixtureApi) {
    api.push_partnership(100, fixture_partnership(100, 101));
    api.push_partnership(100, fixture_partnership(100, 102));
    api.push_partnership(200, fixture_partnership(200, 301));

    let snapshots = manager(&api)
        .snapshots(100)
        .await
        .expect("partnerships resolve");

    let ids: Vec<i64> = snapshots.iter().map(|snapshot| snapshot.id).collect();
    assert_eq!(ids, vec![101, 102]);
    assert!(
        snapshots
            .iter()
            .all(|snapshot| snapshot.name == "SNAPSHOT"),
        "type name should be carried through"
    );
}

#[rstest]
#[tokio::test]
async fn snapshot_listing_is_empty_for_volumes_without_snapshots(api: FixtureApi) {
    let snapshots = manager(&api)
        .snapshots(100)
        .await
        .expect("empty listing succeeds");

    assert!(snapshots.is_empty());
}
