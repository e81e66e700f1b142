//! Scenario tests for the presence-tracking engine.
//!
//! Exercises: trigger events → PresenceRegion → RegionRegistry
//! → VisitRecordStore, with in-memory ports and a hand-driven clock.

use presence_core::testing::{ManualClock, MemoryStore, RecordingVolumes, StaticDirectory};
use presence_core::{
    EventOutcome, HostEvent, RegionDescriptorStore, RegionGeometry, RegionRegistry, TimeBreakdown,
    TrackingError, Transform, Vector3, VisitRecordStore,
};
use serde_json::json;
use std::sync::Arc;

const REGION_KEY: &str = "locationBoxes";
const VISIT_KEY: &str = "locationTracking";

// ── Helpers ────────────────────────────────────────────────────────────

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    users: Arc<StaticDirectory>,
    volumes: Arc<RecordingVolumes>,
    registry: RegionRegistry,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(Arc::new(MemoryStore::new())).await
    }

    async fn start_with(store: Arc<MemoryStore>) -> Self {
        let clock = Arc::new(ManualClock::default());
        let users = Arc::new(StaticDirectory::with_users(["u1", "u2"]));
        let volumes = Arc::new(RecordingVolumes::new());
        let mut registry = RegionRegistry::new(
            RegionDescriptorStore::new(store.clone(), REGION_KEY),
            VisitRecordStore::new(store.clone(), VISIT_KEY),
            clock.clone(),
            users.clone(),
            volumes.clone(),
        );
        registry.startup().await.unwrap();
        Self {
            store,
            clock,
            users,
            volumes,
            registry,
        }
    }

    async fn enter(&mut self, region: &str, occupant: &str) -> EventOutcome {
        self.registry
            .dispatch(HostEvent::TriggerEnter {
                region_id: region.to_string(),
                occupant: occupant.to_string(),
            })
            .await
            .unwrap()
    }

    async fn exit(&mut self, region: &str, occupant: &str) -> EventOutcome {
        self.registry
            .dispatch(HostEvent::TriggerExit {
                region_id: region.to_string(),
                occupant: occupant.to_string(),
            })
            .await
            .unwrap()
    }
}

fn time(days: u64, hours: u8, minutes: u8, seconds: f64) -> TimeBreakdown {
    TimeBreakdown {
        days,
        hours,
        minutes,
        seconds,
    }
}

// ── Visits ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_visits_accumulate_count_and_time() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    h.enter("lobby", "u1").await;
    h.clock.advance(125.0);
    h.exit("lobby", "u1").await;

    let record = h.registry.visit_record("u1", "lobby");
    assert_eq!(record.number_of_visits, 1);
    assert_eq!(record.time_spent, time(0, 0, 2, 5.0));

    h.enter("lobby", "u1").await;
    h.clock.advance(3_600.0);
    h.exit("lobby", "u1").await;

    let record = h.registry.visit_record("u1", "lobby");
    assert_eq!(record.number_of_visits, 2);
    assert_eq!(record.time_spent, time(0, 1, 2, 5.0));

    let document = h.store.document(VISIT_KEY).unwrap();
    assert_eq!(
        document["u1"]["lobby"],
        json!({
            "numberOfVisits": 2,
            "daysSpent": 0,
            "hoursSpent": 1,
            "minutesSpent": 2,
            "secondsSpent": 5.0
        })
    );
}

#[tokio::test]
async fn double_enter_counts_one_visit_from_the_first_entry() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    assert_eq!(h.enter("lobby", "u1").await, EventOutcome::Entered);
    h.clock.advance(20.0);
    assert_eq!(h.enter("lobby", "u1").await, EventOutcome::AlreadyPresent);
    h.clock.advance(40.0);
    h.exit("lobby", "u1").await;

    let record = h.registry.visit_record("u1", "lobby");
    assert_eq!(record.number_of_visits, 1);
    assert_eq!(record.time_spent, time(0, 0, 1, 0.0));
}

#[tokio::test]
async fn exit_without_entry_records_nothing() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    let writes_before = h.store.write_count();

    assert_eq!(h.exit("lobby", "u1").await, EventOutcome::Ignored);
    assert_eq!(h.registry.visit_record("u1", "lobby").number_of_visits, 0);
    assert_eq!(h.store.write_count(), writes_before);
}

#[tokio::test]
async fn non_user_colliders_are_ignored() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    assert_eq!(h.enter("lobby", "ResizeButtonlobby").await, EventOutcome::Ignored);
    assert!(h.registry.occupants("lobby").unwrap().is_empty());
}

#[tokio::test]
async fn each_region_tracks_its_own_sessions() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    h.registry.create_region("hall", None, None).await.unwrap();

    h.enter("lobby", "u1").await;
    h.enter("hall", "u2").await;
    h.clock.advance(30.0);
    h.exit("lobby", "u1").await;
    h.clock.advance(30.0);
    h.exit("hall", "u2").await;

    assert_eq!(h.registry.visit_record("u1", "lobby").time_spent, time(0, 0, 0, 30.0));
    assert_eq!(h.registry.visit_record("u2", "hall").time_spent, time(0, 0, 1, 0.0));
    assert_eq!(h.registry.visit_record("u1", "hall").number_of_visits, 0);
}

// ── Forced closure ─────────────────────────────────────────────────────

#[tokio::test]
async fn user_leaving_closes_open_sessions() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    h.registry.create_region("hall", None, None).await.unwrap();

    h.enter("lobby", "u1").await;
    h.enter("hall", "u1").await;
    h.enter("hall", "u2").await;
    h.clock.advance(90.0);

    let outcome = h
        .registry
        .dispatch(HostEvent::UserLeft {
            user_id: "u1".to_string(),
        })
        .await
        .unwrap();
    h.users.disconnect("u1");

    match outcome {
        EventOutcome::SessionsClosed { visits } => assert_eq!(visits.len(), 2),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(h.registry.visit_record("u1", "lobby").time_spent, time(0, 0, 1, 30.0));
    assert_eq!(h.registry.visit_record("u1", "hall").number_of_visits, 1);
    assert!(h.registry.region("hall").unwrap().is_present("u2"));

    // A late exit for the departed user does not count twice.
    assert_eq!(h.exit("lobby", "u1").await, EventOutcome::Ignored);
    assert_eq!(h.registry.visit_record("u1", "lobby").number_of_visits, 1);
}

#[tokio::test]
async fn user_leaving_without_sessions_records_nothing() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    let closed = h.registry.on_user_left("u1").await.unwrap();
    assert!(closed.is_empty());
    assert!(h.registry.visits_for_user("u1").is_empty());
}

#[tokio::test]
async fn joining_does_not_create_occupancy() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    let outcome = h
        .registry
        .dispatch(HostEvent::UserJoined {
            user_id: "u1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Joined);
    assert!(h.registry.occupants("lobby").unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_region_closes_sessions_first() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    h.enter("lobby", "u1").await;
    h.clock.advance(45.0);

    let closed = h.registry.delete_region("lobby").await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(h.registry.visit_record("u1", "lobby").time_spent, time(0, 0, 0, 45.0));

    // Nothing further can happen in a deleted region.
    let result = h
        .registry
        .dispatch(HostEvent::TriggerExit {
            region_id: "lobby".to_string(),
            occupant: "u1".to_string(),
        })
        .await;
    assert!(matches!(result, Err(TrackingError::NotFound(_))));
    assert_eq!(h.registry.visit_record("u1", "lobby").number_of_visits, 1);

    assert!(h.volumes.live("lobby").is_none());
    assert_eq!(h.store.document(REGION_KEY).unwrap(), json!({}));
}

#[tokio::test]
async fn deleting_an_unknown_region_is_not_found() {
    let mut h = Harness::start().await;
    assert!(matches!(
        h.registry.delete_region("ghost").await,
        Err(TrackingError::NotFound(_))
    ));
}

#[tokio::test]
async fn shutdown_closes_every_session() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    h.enter("lobby", "u1").await;
    h.enter("lobby", "u2").await;
    h.clock.advance(10.0);

    let closed = h.registry.close_all_sessions().await.unwrap();
    assert_eq!(closed.len(), 2);
    assert!(h.registry.occupants("lobby").unwrap().is_empty());
    assert_eq!(h.registry.visit_record("u2", "lobby").number_of_visits, 1);
}

// ── Region lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_region_id_is_refused() {
    let mut h = Harness::start().await;
    h.registry
        .create_region(
            "A",
            Some(RegionGeometry {
                height: 3.0,
                width: 3.0,
                depth: 3.0,
            }),
            None,
        )
        .await
        .unwrap();
    h.enter("A", "u1").await;

    let result = h.registry.create_region("A", None, None).await;
    assert!(matches!(result, Err(TrackingError::DuplicateId(id)) if id == "A"));

    let region = h.registry.region("A").unwrap();
    assert_eq!(region.descriptor().geometry.height, 3.0);
    assert!(region.is_present("u1"));
}

#[tokio::test]
async fn invalid_creation_input_is_rejected() {
    let mut h = Harness::start().await;

    assert!(matches!(
        h.registry.create_region("  ", None, None).await,
        Err(TrackingError::InvalidInput(_))
    ));
    assert!(matches!(
        h.registry
            .create_region(
                "flat",
                Some(RegionGeometry {
                    height: 0.0,
                    width: 1.0,
                    depth: 1.0,
                }),
                None,
            )
            .await,
        Err(TrackingError::InvalidInput(_))
    ));
    assert!(h.registry.regions().is_empty());
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn creation_applies_defaults_and_persists() {
    let mut h = Harness::start().await;
    let descriptor = h.registry.create_region("lobby", None, None).await.unwrap();

    assert_eq!(descriptor.geometry, RegionGeometry::default());
    assert_eq!(descriptor.transform, Transform::default());
    assert!(h.volumes.live("lobby").is_some());

    let document = h.store.document(REGION_KEY).unwrap();
    assert_eq!(document["lobby"]["width"], 2.0);
    assert_eq!(document["lobby"]["transform"]["position"]["x"], 2.0);
}

#[tokio::test]
async fn resizing_keeps_occupants_and_rebuilds_the_volume() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    h.enter("lobby", "u1").await;
    h.clock.advance(30.0);

    let bigger = RegionGeometry {
        height: 4.0,
        width: 8.0,
        depth: 6.0,
    };
    h.registry.resize_region("lobby", bigger).await.unwrap();
    assert_eq!(h.volumes.rebuild_count("lobby"), 1);
    assert_eq!(h.volumes.live("lobby").unwrap().geometry, bigger);
    assert_eq!(h.store.document(REGION_KEY).unwrap()["lobby"]["width"], 8.0);

    h.clock.advance(30.0);
    h.exit("lobby", "u1").await;
    let record = h.registry.visit_record("u1", "lobby");
    assert_eq!(record.number_of_visits, 1);
    assert_eq!(record.time_spent, time(0, 0, 1, 0.0));
}

#[tokio::test]
async fn moving_persists_the_new_transform() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();

    let dropped = Transform {
        position: Vector3 {
            x: -4.0,
            y: 0.0,
            z: 12.5,
        },
        ..Transform::default()
    };
    h.registry.move_region("lobby", dropped).await.unwrap();

    let document = h.store.document(REGION_KEY).unwrap();
    assert_eq!(document["lobby"]["transform"]["position"]["z"], 12.5);
    assert!(matches!(
        h.registry.move_region("ghost", dropped).await,
        Err(TrackingError::NotFound(_))
    ));
}

// ── Restart ────────────────────────────────────────────────────────────

#[tokio::test]
async fn restart_restores_regions_and_records_but_not_occupancy() {
    let store = Arc::new(MemoryStore::new());
    {
        let mut h = Harness::start_with(store.clone()).await;
        h.registry
            .create_region(
                "lobby",
                Some(RegionGeometry {
                    height: 2.5,
                    width: 3.5,
                    depth: 4.5,
                }),
                None,
            )
            .await
            .unwrap();
        h.enter("lobby", "u1").await;
        h.clock.advance(60.0);
        h.exit("lobby", "u1").await;
        // Left open when the process dies.
        h.enter("lobby", "u2").await;
    }

    let mut h = Harness::start_with(store).await;
    let region = h.registry.region("lobby").unwrap();
    assert_eq!(region.descriptor().geometry.width, 3.5);
    assert_eq!(region.occupant_count(), 0);
    assert_eq!(h.volumes.live_count(), 1);
    assert_eq!(h.registry.visit_record("u1", "lobby").number_of_visits, 1);

    // The stale session of u2 never produces a visit.
    assert_eq!(h.exit("lobby", "u2").await, EventOutcome::Ignored);
    assert_eq!(h.registry.visit_record("u2", "lobby").number_of_visits, 0);
}

// ── Persistence failure ────────────────────────────────────────────────

#[tokio::test]
async fn failed_visit_write_is_surfaced_and_kept_in_memory() {
    let mut h = Harness::start().await;
    h.registry.create_region("lobby", None, None).await.unwrap();
    h.enter("lobby", "u1").await;
    h.clock.advance(5.0);

    h.store.fail_next_writes(2);
    let result = h.registry.on_exit("lobby", "u1").await;
    assert!(matches!(result, Err(TrackingError::Persistence(_))));

    assert!(!h.registry.region("lobby").unwrap().is_present("u1"));
    assert_eq!(h.registry.visit_record("u1", "lobby").number_of_visits, 1);
}

// ── Saved region document ──────────────────────────────────────────────

fn saved_region(id: &str, height: f64, width: f64) -> serde_json::Value {
    json!({
        "id": id,
        "height": height,
        "width": width,
        "depth": 2.0,
        "transform": {
            "position": {"x": 0.0, "y": 0.0, "z": 0.0},
            "rotation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}
        }
    })
}

#[tokio::test]
async fn saved_regions_with_bad_dimensions_are_not_restored() {
    let store = Arc::new(MemoryStore::new().with_document(
        REGION_KEY,
        json!({
            "flat": saved_region("flat", 0.0, -3.0),
            "lobby": saved_region("lobby", 2.0, 2.0)
        }),
    ));
    let mut h = Harness::start_with(store).await;

    assert!(h.registry.region("flat").is_none());
    assert!(h.volumes.live("flat").is_none());
    assert_eq!(h.volumes.live_count(), 1);
    assert_eq!(h.enter("lobby", "u1").await, EventOutcome::Entered);
}

#[tokio::test]
async fn deleting_a_region_saved_under_another_key_removes_it_for_good() {
    let store = Arc::new(MemoryStore::new().with_document(
        REGION_KEY,
        json!({ "lobby": saved_region("hall", 2.0, 2.0) }),
    ));
    {
        let mut h = Harness::start_with(store.clone()).await;
        h.registry.delete_region("hall").await.unwrap();
        assert_eq!(store.document(REGION_KEY).unwrap(), json!({}));
    }

    let h = Harness::start_with(store).await;
    assert!(h.registry.regions().is_empty());
}

#[tokio::test]
async fn padded_ids_address_the_trimmed_region() {
    let mut h = Harness::start().await;
    let descriptor = h.registry.create_region(" lobby ", None, None).await.unwrap();
    assert_eq!(descriptor.id, "lobby");

    assert_eq!(h.enter(" lobby", "u1").await, EventOutcome::Entered);
    h.clock.advance(15.0);
    h.registry
        .move_region("lobby ", Transform::default())
        .await
        .unwrap();

    let closed = h.registry.delete_region(" lobby ").await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(h.registry.visit_record("u1", " lobby ").number_of_visits, 1);
    assert!(h.registry.regions().is_empty());
}
