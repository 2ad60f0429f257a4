//! explodeview: a headless explode/assemble engine for 3D assembly viewers.
//!
//! The engine takes an assembly document (parts plus a tree of nodes, each
//! with an assembled pose and an explode vector) and drives it from a host
//! render loop. The host owns rendering, mesh loading and UI; explodeview
//! owns everything between the explode slider and the per-node poses.
//!
//! # Quick Start
//!
//! ```no_run
//! use explodeview::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let catalog = Catalog::load_dir("models")?;
//!     let mut session = catalog.open("v4-engine", JsonFileStore::open_default()?, Options::default())?;
//!
//!     // UI slider moved to 60%
//!     session.set_explode_percent(60.0);
//!
//!     // Once per rendered frame
//!     let geometry = UniformBounds(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)));
//!     session.on_frame(1.0 / 60.0, &geometry);
//!
//!     let poses = session.world_transforms();
//!     for (index, node) in session.graph().nodes() {
//!         println!("{}: {:?}", node.id(), poses[index.0].translation);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`SceneGraph`] validates the node tree and composes world transforms
//! - [`ExplodeDriver`] maps the explode factor to per-node targets
//! - [`TransformInterpolator`] smooths live transforms toward the targets
//! - [`Framer`] and [`Camera`] frame the assembly and clamp user zoom
//! - [`ViewerSession`] ties them to a render clock and persisted view state

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

pub mod catalog;
pub mod persistence;
pub mod session;
pub mod throttle;

// Re-export core types
pub use explodeview_core::{
    advance, target_local, target_world, Aabb, AssembledPose, ExplodeDriver, ExplodeFactor,
    ExplodeSpec, ExplodeViewError, FramingOptions, Mat4, Model, Node, NodeIndex, Options, Part,
    Quat, Result, SceneGraph, SceneNode, Transform, TransformInterpolator, Vec3, DEFAULT_DAMPING,
};

// Re-export camera types
pub use explodeview_camera::{
    assembly_bounds, distance_from_zoom_percent, fallback_framing, frame_bounds,
    zoom_percent_from_distance, Camera, CameraState, Framer, Framing, FramingStatus,
    GeometrySource, NoGeometry, RotateDirection, UniformBounds,
};

pub use catalog::{Catalog, ModelSummary};
pub use persistence::{
    default_store_dir, ChatMessage, ChatRole, JsonFileStore, MemoryStore, ViewState,
    ViewStatePatch, ViewStateStore,
};
pub use session::ViewerSession;
pub use throttle::Throttle;

/// Initializes `env_logger` once; later calls are ignored.
///
/// Log output is controlled by `RUST_LOG` as usual.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Opens the JSON store configured in `options`, or the default location.
pub fn open_store(options: &Options) -> Result<JsonFileStore> {
    match &options.store_dir {
        Some(dir) => JsonFileStore::open(dir.clone()),
        None => JsonFileStore::open_default(),
    }
}
