//! Integration tests for the viewing session lifecycle.

use explodeview::*;

const DT: f32 = 1.0 / 60.0;

const ENGINE: &str = r#"{
    "modelId": "v-twin",
    "title": "V-Twin Engine",
    "parts": [
        { "partId": "block", "displayNameKo": "실린더 블록", "glbUrl": "/block.glb" },
        { "partId": "piston", "displayNameKo": "피스톤", "glbUrl": "/piston.glb",
          "materialType": "aluminium" },
        { "partId": "pin", "displayNameKo": "피스톤 핀", "glbUrl": "/pin.glb" }
    ],
    "nodes": [
        { "nodeId": "block-1", "partId": "block", "parentNodeId": null,
          "assembled": { "pos": [0, 0, 0] } },
        { "nodeId": "piston-1", "partId": "piston", "parentNodeId": "block-1",
          "assembled": { "pos": [0, 1, 0] },
          "explode": { "dir": [0, 1, 0], "distance": 2 } },
        { "nodeId": "pin-1", "partId": "pin", "parentNodeId": "piston-1",
          "assembled": { "pos": [0, 0, 0] },
          "explode": { "dir": [1, 0, 0], "distance": 0.5 } }
    ]
}"#;

fn engine() -> Model {
    Model::from_json_str(ENGINE).unwrap()
}

fn unit_parts() -> UniformBounds {
    UniformBounds(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)))
}

fn run_frames<S: ViewStateStore>(session: &mut ViewerSession<S>, frames: usize) {
    let geometry = unit_parts();
    for _ in 0..frames {
        session.on_frame(DT, &geometry);
    }
}

#[test]
fn test_live_pose_follows_explode_factor() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    let assembled = session.assembled_world_transform("pin-1").unwrap();
    assert_eq!(session.world_transform("pin-1").unwrap(), assembled);

    session.set_explode_factor(1.0);
    let target = session.target_world_transform("pin-1").unwrap();
    assert!((target.translation - Vec3::new(0.5, 3.0, 0.0)).length() < 1e-5);

    let mut previous = session.motion_remaining();
    assert!(previous > 0.0);
    for _ in 0..30 {
        run_frames(&mut session, 1);
        let remaining = session.motion_remaining();
        assert!(remaining < previous);
        previous = remaining;
    }
    run_frames(&mut session, 90);
    assert!(session.motion_remaining() < 1e-3);
    let live = session.world_transform("pin-1").unwrap();
    assert!((live.translation - target.translation).length() < 1e-3);

    session.set_explode_factor(0.0);
    run_frames(&mut session, 240);
    let live = session.world_transform("pin-1").unwrap();
    assert!((live.translation - assembled.translation).length() < 1e-3);
}

#[test]
fn test_latest_input_wins_between_frames() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    session.set_explode_factor(1.0);
    session.set_explode_factor(0.2);
    assert_eq!(session.set_explode_percent(40.0), ExplodeFactor::new(0.4));
    run_frames(&mut session, 300);
    let expected = session.target_world_transform("piston-1").unwrap();
    assert!((expected.translation.y - (1.0 + 2.0 * 0.4)).abs() < 1e-5);
    let live = session.world_transform("piston-1").unwrap();
    assert!((live.translation - expected.translation).length() < 1e-3);
}

#[test]
fn test_factor_is_clamped() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    assert_eq!(session.set_explode_factor(3.0), ExplodeFactor::EXPLODED);
    assert_eq!(session.set_explode_factor(-1.0), ExplodeFactor::ASSEMBLED);
    assert_eq!(session.set_explode_factor(f32::NAN), ExplodeFactor::ASSEMBLED);
}

#[test]
fn test_unknown_node_queries() {
    let session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    assert!(matches!(
        session.world_transform("crank-1"),
        Err(ExplodeViewError::NodeNotFound(_))
    ));
    assert!(matches!(
        session.target_world_transform("crank-1"),
        Err(ExplodeViewError::NodeNotFound(_))
    ));
}

#[test]
fn test_framing_waits_for_geometry() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    for _ in 0..10 {
        session.on_frame(DT, &NoGeometry);
    }
    assert!(session.framing().is_none());

    session.on_frame(DT, &unit_parts());
    let framing = session.framing().unwrap();
    // Union of three unit cubes stacked from y = -0.5 to y = 1.5.
    let max_dim = 2.0;
    assert!((framing.min_distance - 0.3 * max_dim).abs() < 1e-5);
    assert!((framing.max_distance - 6.0 * max_dim).abs() < 1e-5);
    assert!((framing.target - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);

    let distance = session.camera().distance();
    assert!(distance >= framing.min_distance - 1e-4);
    assert!(distance <= framing.max_distance + 1e-4);
    let above = session.camera().position.y > framing.target.y;
    assert!(above, "default view looks down on the assembly");
}

#[test]
fn test_framing_falls_back_after_budget() {
    let mut options = Options::default();
    options.framing.frame_budget = 5;
    let fallback = fallback_framing(&options.framing);
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), options).unwrap();

    for _ in 0..4 {
        session.on_frame(DT, &NoGeometry);
        assert!(session.framing().is_none());
    }
    session.on_frame(DT, &NoGeometry);
    assert_eq!(session.framing(), Some(fallback));
    assert_eq!(session.camera().position, fallback.position);

    // Explicit reframing still works once geometry shows up.
    let framing = session.frame_camera(&unit_parts()).unwrap();
    assert_eq!(session.framing(), Some(framing));
    assert_ne!(framing, fallback);
}

#[test]
fn test_zoom_percent_round_trip() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    session.frame_camera(&unit_parts()).unwrap();
    let framing = session.framing().unwrap();

    session.set_zoom_percent(0.0);
    assert!((session.camera().distance() - framing.max_distance).abs() < 1e-3);
    session.set_zoom_percent(100.0);
    assert!((session.camera().distance() - framing.min_distance).abs() < 1e-3);
    session.set_zoom_percent(40.0);
    assert!((session.zoom_percent() - 40.0).abs() < 1e-3);
}

#[test]
fn test_auto_rotation_keeps_distance() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    session.frame_camera(&unit_parts()).unwrap();
    let start = session.camera().position;
    let distance = session.camera().distance();

    session.set_rotation(Some(RotateDirection::Left));
    run_frames(&mut session, 30);
    assert_ne!(session.camera().position, start);
    assert!((session.camera().distance() - distance).abs() < 1e-3);

    session.set_rotation(None);
    let stopped = session.camera().position;
    run_frames(&mut session, 10);
    assert_eq!(session.camera().position, stopped);
}

#[test]
fn test_explode_persisted_after_quiet_period() {
    let mut store = MemoryStore::new();
    {
        let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
        for percent in [10.0, 20.0, 30.0] {
            session.set_explode_percent(percent);
            run_frames(&mut session, 1);
        }
        let written = session
            .store()
            .get("v-twin")
            .unwrap()
            .map(|s| s.explode_value);
        assert!(written.map_or(true, |v| (v - 30.0).abs() > 1e-3));

        run_frames(&mut session, 5);
        let state = session.store().get("v-twin").unwrap().unwrap();
        assert!((state.explode_value - 30.0).abs() < 1e-3);
        assert!(state.camera.is_some());
    }
    assert!(!store.is_empty());
}

#[test]
fn test_reopen_restores_explode_and_camera() {
    let mut store = MemoryStore::new();
    let saved_position;
    {
        let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
        run_frames(&mut session, 1);
        session.orbit(0.4, 0.1);
        session.set_explode_percent(60.0);
        saved_position = session.camera().position;
        session.flush();
        session.close();
    }

    let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
    assert!((session.explode_factor().value() - 0.6).abs() < 1e-5);
    // Live pose starts at the restored target instead of animating from assembly.
    assert!(session.motion_remaining() < 1e-6);

    run_frames(&mut session, 1);
    assert!((session.camera().position - saved_position).length() < 1e-4);
}

#[test]
fn test_close_cancels_pending_writes() {
    let mut store = MemoryStore::new();
    {
        let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
        session.set_explode_factor(1.0);
        session.close();
        assert!(session.is_closed());

        // Closed sessions ignore further input.
        session.set_notes("ignored");
        run_frames(&mut session, 10);
    }
    assert!(store.get("v-twin").unwrap().is_none());
}

#[test]
fn test_queries_after_close_report_assembled_pose() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    session.set_explode_factor(1.0);
    run_frames(&mut session, 120);
    session.close();

    let assembled = session.assembled_world_transform("pin-1").unwrap();
    assert_eq!(session.world_transform("pin-1").unwrap(), assembled);
    assert_eq!(session.world_transforms().len(), session.graph().len());
    assert!(session.target_world_transform("pin-1").is_ok());
    assert!(matches!(
        session.world_transform("crank-1"),
        Err(ExplodeViewError::NodeNotFound(_))
    ));
    assert_eq!(session.motion_remaining(), 0.0);
}

#[test]
fn test_huge_frame_delta_does_not_panic() {
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), Options::default()).unwrap();
    session.set_explode_factor(1.0);
    session.on_frame(f32::MAX, &unit_parts());
    session.on_frame(1.0e30, &unit_parts());
    let target = session.target_world_transform("piston-1").unwrap();
    let live = session.world_transform("piston-1").unwrap();
    assert!((live.translation - target.translation).length() < 1e-5);
}

#[test]
fn test_reversed_framing_options_are_repaired() {
    let mut options = Options::default();
    options.framing.min_distance_factor = 8.0;
    options.framing.fallback_min_distance = 50.0;
    let mut session = ViewerSession::open(engine(), MemoryStore::new(), options).unwrap();
    assert!(session.options().framing.min_distance_factor <= session.options().framing.max_distance_factor);

    run_frames(&mut session, 1);
    let framing = session.framing().unwrap();
    assert!(framing.min_distance <= framing.max_distance);
    session.set_zoom_percent(50.0);
    assert!(session.camera().position.is_finite());
}

#[test]
fn test_corrupt_state_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    std::fs::write(store.path_for("v-twin"), "{\"explodeValue\": oops").unwrap();

    let mut session = ViewerSession::open(engine(), store, Options::default()).unwrap();
    assert_eq!(session.explode_factor(), ExplodeFactor::ASSEMBLED);
    assert!(session.notes().is_empty());

    session.set_notes("rebuilt");
    let state = session.store().get("v-twin").unwrap().unwrap();
    assert_eq!(state.notes, "rebuilt");
}

#[test]
fn test_annotations_persist_immediately() {
    let mut store = MemoryStore::new();
    {
        let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
        assert_eq!(session.select_node("piston-1").unwrap().part_id, "piston");
        session.select_part("pin").unwrap();
        session.select_part("pin").unwrap();
        assert!(matches!(
            session.select_part("crankshaft"),
            Err(ExplodeViewError::PartNotFound(_))
        ));
        session.set_notes("check ring gap");
        session.push_chat_message(ChatMessage::user("what does the pin do?"));
        session.push_chat_message(ChatMessage::assistant("it links piston and rod"));
        session.close();
    }

    let state = store.get("v-twin").unwrap().unwrap();
    assert_eq!(state.selected_parts, vec!["piston", "pin"]);
    assert_eq!(state.notes, "check ring gap");
    assert_eq!(state.chat_history.len(), 2);

    let mut session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
    assert_eq!(session.selected_parts(), ["piston", "pin"]);
    assert!(session.deselect_part("piston"));
    assert!(!session.deselect_part("piston"));
    session.clear_chat();
    drop(session);

    let state = store.get("v-twin").unwrap().unwrap();
    assert_eq!(state.selected_parts, vec!["pin"]);
    assert!(state.chat_history.is_empty());
}

#[test]
fn test_stale_selection_dropped_on_open() {
    let mut store = MemoryStore::new();
    store
        .set(
            "v-twin",
            ViewStatePatch {
                selected_parts: Some(vec!["pin".to_string(), "removed-part".to_string()]),
                ..ViewStatePatch::default()
            },
        )
        .unwrap();
    let session = ViewerSession::open(engine(), &mut store, Options::default()).unwrap();
    assert_eq!(session.selected_parts(), ["pin"]);
}

#[test]
fn test_catalog_open_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("v-twin.json"), ENGINE).unwrap();

    let catalog = Catalog::load_dir(dir.path()).unwrap();
    let summary = &catalog.list()[0];
    assert_eq!(summary.title, "V-Twin Engine");
    assert_eq!(summary.part_count, 3);

    let session = catalog
        .open("v-twin", MemoryStore::new(), Options::default())
        .unwrap();
    assert_eq!(
        session.part_for_node("piston-1").unwrap().material_type.as_deref(),
        Some("aluminium")
    );
}
