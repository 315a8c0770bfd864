use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use safestep_domain::error::DomainError;
use safestep_domain::geofence_synchronizer::GeofenceSynchronizer;
use safestep_domain::store::{DeviceStore, GeofenceStore};
use safestep_domain::subscription::SnapshotEvent;
use safestep_domain::types::{
    Coordinate, CreateGeofenceInput, RecordLocationInput, RegisterDeviceInput,
};
use safestep_store::MemoryStore;

fn register_input(device_id: &str, owner_id: &str) -> RegisterDeviceInput {
    RegisterDeviceInput {
        device_id: device_id.to_string(),
        owner_id: owner_id.to_string(),
        name: format!("tracker {device_id}"),
    }
}

fn fence_input(owner_id: &str, name: &str) -> CreateGeofenceInput {
    CreateGeofenceInput {
        owner_id: owner_id.to_string(),
        name: name.to_string(),
        center: Coordinate::new(40.0, -74.0).unwrap(),
        radius_m: 120.0,
    }
}

#[tokio::test]
async fn snapshots_are_owner_filtered() {
    let store = MemoryStore::new();
    store.register_device(register_input("hw-1", "owner-a")).await.unwrap();
    store.register_device(register_input("hw-2", "owner-b")).await.unwrap();

    let mut sub = store.subscribe_devices("owner-a").await.unwrap();
    match sub.recv().await.unwrap() {
        SnapshotEvent::Snapshot(docs) => {
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].device_id, "hw-1");
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn geofence_snapshots_are_created_at_descending() {
    let store = MemoryStore::new();
    store.create_geofence(fence_input("owner-a", "first")).await.unwrap();
    store.create_geofence(fence_input("owner-a", "second")).await.unwrap();

    let mut sub = store.subscribe_geofences("owner-a").await.unwrap();
    match sub.recv().await.unwrap() {
        SnapshotEvent::Snapshot(docs) => {
            assert_eq!(docs.len(), 2);
            assert_eq!(docs[0].name, "second");
            assert_eq!(docs[1].name, "first");
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn mutation_notifies_standing_subscription() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe_geofences("owner-a").await.unwrap();

    // Initial snapshot is empty.
    assert_eq!(sub.recv().await, Some(SnapshotEvent::Snapshot(vec![])));

    let fence = store.create_geofence(fence_input("owner-a", "Yard")).await.unwrap();
    match sub.recv().await.unwrap() {
        SnapshotEvent::Snapshot(docs) => {
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].geofence_id, fence.geofence_id);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    store.delete_geofence(&fence.geofence_id).await.unwrap();
    assert_eq!(sub.recv().await, Some(SnapshotEvent::Snapshot(vec![])));
}

#[tokio::test]
async fn cancelled_subscription_sees_nothing_more() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe_geofences("owner-a").await.unwrap();
    assert_eq!(sub.recv().await, Some(SnapshotEvent::Snapshot(vec![])));

    sub.cancel();
    store.create_geofence(fence_input("owner-a", "Yard")).await.unwrap();
    assert_eq!(sub.recv().await, None);
}

#[tokio::test]
async fn record_location_requires_existing_device() {
    let store = MemoryStore::new();
    let result = store
        .record_location(RecordLocationInput {
            device_id: "ghost".to_string(),
            coordinate: Coordinate::new(1.0, 1.0).unwrap(),
            battery_level: None,
        })
        .await;
    assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
}

#[tokio::test]
async fn record_location_updates_doc_and_appends_history() {
    let store = MemoryStore::new();
    store.register_device(register_input("hw-1", "owner-a")).await.unwrap();

    store
        .record_location(RecordLocationInput {
            device_id: "hw-1".to_string(),
            coordinate: Coordinate::new(40.0, -74.0).unwrap(),
            battery_level: Some(91.0),
        })
        .await
        .unwrap();
    store
        .record_location(RecordLocationInput {
            device_id: "hw-1".to_string(),
            coordinate: Coordinate::new(41.0, -74.0).unwrap(),
            battery_level: None,
        })
        .await
        .unwrap();

    let doc = store.get_device("hw-1").await.unwrap().unwrap();
    assert_eq!(doc.latest_location, Some((41.0, -74.0)));
    assert!(doc.last_seen.is_some());
    // Battery survives an update that omitted it.
    assert_eq!(doc.battery_level, Some(91.0));

    let since = Utc::now() - Duration::hours(12);
    let history = store.location_history("hw-1", since).await.unwrap();
    assert_eq!(history.len(), 2);
    // Most recent first.
    assert_eq!(history[0].coordinate.lat, 41.0);
}

#[tokio::test]
async fn history_window_excludes_old_points() {
    let store = MemoryStore::new();
    store.register_device(register_input("hw-1", "owner-a")).await.unwrap();
    store
        .record_location(RecordLocationInput {
            device_id: "hw-1".to_string(),
            coordinate: Coordinate::new(40.0, -74.0).unwrap(),
            battery_level: None,
        })
        .await
        .unwrap();

    // A window starting in the future sees nothing.
    let since = Utc::now() + Duration::hours(1);
    let history = store.location_history("hw-1", since).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn failed_subscription_freezes_synchronizer_cache() {
    let store = MemoryStore::new();
    store.create_geofence(fence_input("owner-a", "Yard")).await.unwrap();

    let synchronizer = GeofenceSynchronizer::new();
    let handle = synchronizer.handle();
    let sub = store.subscribe_geofences("owner-a").await.unwrap();
    let ctx = CancellationToken::new();
    let run_ctx = ctx.clone();
    let join = tokio::spawn(async move { synchronizer.run(sub, run_ctx).await });
    tokio::task::yield_now().await;
    assert_eq!(handle.current().len(), 1);

    store.fail_subscriptions("permission denied");
    join.await.unwrap();

    assert_eq!(handle.current().len(), 1);
    assert_eq!(handle.error().as_deref(), Some("permission denied"));

    // Later writes no longer reach the frozen cache.
    store.create_geofence(fence_input("owner-a", "Park")).await.unwrap();
    assert_eq!(handle.current().len(), 1);
}
