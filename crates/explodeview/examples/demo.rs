#![allow(clippy::cast_precision_loss)]
//! Headless explode/assemble demonstration.
//!
//! This demo shows:
//! - Building an assembly model in code
//! - Deferred camera framing while part meshes "load"
//! - Animating the explode slider and reading live world poses
//! - Orbit, zoom and persisted view state
//!
//! Run with: cargo run --example demo

use std::collections::HashMap;

use explodeview::*;

const DT: f32 = 1.0 / 60.0;

/// Mesh bounds that arrive one part at a time, as if streamed from disk.
#[derive(Default)]
struct LoadedMeshes {
    bounds: HashMap<String, Aabb>,
}

impl GeometrySource for LoadedMeshes {
    fn local_bounds(&self, _node: &SceneNode, part: &Part) -> Option<Aabb> {
        self.bounds.get(&part.part_id).copied()
    }
}

fn part(id: &str, name: &str, material: Option<&str>) -> Part {
    Part {
        part_id: id.to_string(),
        display_name_ko: name.to_string(),
        glb_url: format!("/models/inline-four/{id}.glb"),
        summary: String::new(),
        material_type: material.map(str::to_string),
    }
}

fn node(id: &str, part_id: &str, parent: Option<&str>, pos: Vec3, explode: ExplodeSpec) -> Node {
    Node {
        node_id: id.to_string(),
        part_id: part_id.to_string(),
        parent_node_id: parent.map(str::to_string),
        assembled: AssembledPose {
            pos,
            ..AssembledPose::default()
        },
        explode,
    }
}

/// An inline-four engine: head on top, pistons rising out of the block.
fn inline_four() -> Model {
    let mut nodes = vec![
        node("block", "block", None, Vec3::ZERO, ExplodeSpec::default()),
        node(
            "head",
            "head",
            Some("block"),
            Vec3::new(0.0, 1.2, 0.0),
            ExplodeSpec::along(Vec3::Y, 2.5),
        ),
        node(
            "crank",
            "crank",
            Some("block"),
            Vec3::new(0.0, -0.8, 0.0),
            ExplodeSpec {
                start: Some(0.5),
                ..ExplodeSpec::along(Vec3::NEG_Y, 1.5)
            },
        ),
    ];
    for i in 0..4 {
        let x = (i as f32 - 1.5) * 0.9;
        let piston = format!("piston-{i}");
        nodes.push(node(
            &piston,
            "piston",
            Some("block"),
            Vec3::new(x, 0.4, 0.0),
            ExplodeSpec {
                start: Some(0.2),
                duration: Some(0.6),
                ..ExplodeSpec::along(Vec3::Y, 1.2)
            },
        ));
        nodes.push(node(
            &format!("pin-{i}"),
            "pin",
            Some(&piston),
            Vec3::ZERO,
            ExplodeSpec::along(Vec3::Z, 0.6),
        ));
    }

    Model {
        model_id: "inline-four".to_string(),
        title: "Inline-Four Engine".to_string(),
        thumbnail_url: "/thumbnails/inline-four.png".to_string(),
        overview: "Four cylinders in a single bank driving one crankshaft.".to_string(),
        theory: "Four-stroke cycle: intake, compression, power, exhaust.".to_string(),
        parts: vec![
            part("block", "실린더 블록", Some("cast iron")),
            part("head", "실린더 헤드", Some("aluminium")),
            part("crank", "크랭크축", Some("forged steel")),
            part("piston", "피스톤", Some("aluminium")),
            part("pin", "피스톤 핀", None),
        ],
        nodes,
    }
}

fn print_poses<S: ViewStateStore>(label: &str, session: &ViewerSession<S>) {
    println!("-- {label} (explode {:.0}%)", session.explode_factor().percent());
    let poses = session.world_transforms();
    for (index, node) in session.graph().nodes() {
        let t = poses[index.0].translation;
        println!("  {:<10} [{:>6.3}, {:>6.3}, {:>6.3}]", node.id(), t.x, t.y, t.z);
    }
}

fn main() -> Result<()> {
    init_logging();

    let mut store = MemoryStore::new();
    let mut meshes = LoadedMeshes::default();
    let mut session = ViewerSession::open(inline_four(), &mut store, Options::default())?;
    println!("{session:?}");

    // Meshes trickle in; framing waits until every part has bounds.
    let sizes = [
        ("block", Vec3::new(3.6, 1.6, 1.2)),
        ("head", Vec3::new(3.6, 0.6, 1.2)),
        ("crank", Vec3::new(3.8, 0.4, 0.4)),
        ("piston", Vec3::new(0.7, 0.8, 0.7)),
        ("pin", Vec3::new(0.15, 0.15, 0.8)),
    ];
    for (id, size) in sizes {
        meshes
            .bounds
            .insert(id.to_string(), Aabb::new(-size * 0.5, size * 0.5));
        session.on_frame(DT, &meshes);
        println!("loaded {id}: framed = {}", session.framing().is_some());
    }
    if let Some(framing) = session.framing() {
        println!(
            "camera at {:?}, orbit distance {:.2} in [{:.2}, {:.2}]",
            framing.position,
            framing.distance(),
            framing.min_distance,
            framing.max_distance
        );
    }

    print_poses("assembled", &session);

    for percent in [25.0, 50.0, 100.0] {
        session.set_explode_percent(percent);
        for _ in 0..90 {
            session.on_frame(DT, &meshes);
        }
        print_poses(&format!("settled at {percent}%"), &session);
    }

    let pin = session.part_for_node("pin-2")?;
    println!("pin-2 is a {} ({})", pin.display_name_ko, pin.part_id);

    session.orbit(0.6, 0.2);
    session.set_zoom_percent(70.0);
    println!("zoom {:.0}%", session.zoom_percent());

    session.set_rotation(Some(RotateDirection::Right));
    for _ in 0..60 {
        session.on_frame(DT, &meshes);
    }
    session.set_rotation(None);

    session.select_node("piston-0")?;
    session.set_notes("inspect ring grooves on cylinder 1");
    session.push_chat_message(ChatMessage::user("why are the pistons aluminium?"));
    session.flush();
    session.close();
    drop(session);

    if let Some(state) = store.get("inline-four")? {
        println!("{}", serde_json::to_string_pretty(&state).unwrap_or_default());
    }
    Ok(())
}
