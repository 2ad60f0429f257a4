//! Per-model viewing session.
//!
//! A [`ViewerSession`] is the explicit context for one open model: the scene
//! graph, explode driver, live transforms, camera and the user annotations
//! layered on top. The host calls [`ViewerSession::on_frame`] once per
//! rendered frame; input setters may be called any number of times between
//! frames and the next frame observes the most recent value.
//!
//! ```
//! use explodeview::*;
//!
//! let model = Model::from_json_str(r#"{
//!     "modelId": "gearbox", "title": "Gearbox",
//!     "parts": [{ "partId": "gear", "displayNameKo": "기어", "glbUrl": "/gear.glb" }],
//!     "nodes": [{ "nodeId": "g1", "partId": "gear", "parentNodeId": null,
//!                 "explode": { "dir": [1, 0, 0], "distance": 2 } }]
//! }"#)?;
//! let mut session = ViewerSession::open(model, MemoryStore::new(), Options::default())?;
//! session.set_explode_factor(1.0);
//! let geometry = UniformBounds(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)));
//! for _ in 0..240 {
//!     session.on_frame(1.0 / 60.0, &geometry);
//! }
//! let pose = session.world_transform("g1")?;
//! assert!((pose.translation.x - 2.0).abs() < 1e-3);
//! # Ok::<(), ExplodeViewError>(())
//! ```

use std::time::Duration;

use explodeview_camera::{
    assembly_bounds, frame_bounds, Camera, CameraState, Framer, Framing, FramingStatus,
    GeometrySource, RotateDirection,
};
use explodeview_core::{
    target_local, target_world, ExplodeDriver, ExplodeFactor, Model, Options, Part, Result,
    SceneGraph, Transform, TransformInterpolator,
};

use crate::persistence::{ChatMessage, ViewState, ViewStatePatch, ViewStateStore};
use crate::throttle::Throttle;

/// The open viewing context for a single model.
pub struct ViewerSession<S: ViewStateStore> {
    model: Model,
    graph: SceneGraph,
    driver: ExplodeDriver,
    interpolator: TransformInterpolator,
    camera: Camera,
    framer: Framer,
    framing: Option<Framing>,
    /// Persisted pose waiting for framing to establish orbit bounds.
    restore_camera: Option<CameraState>,
    rotation: Option<RotateDirection>,
    clock: Duration,
    camera_sync: Throttle<CameraState>,
    explode_sync: Throttle<f32>,
    notes: String,
    chat_history: Vec<ChatMessage>,
    selected_parts: Vec<String>,
    store: S,
    options: Options,
    closed: bool,
}

impl<S: ViewStateStore> ViewerSession<S> {
    /// Opens a model, restoring its persisted view state.
    ///
    /// Fails only if the model itself is invalid. Unreadable persisted state
    /// is logged and replaced by defaults.
    pub fn open(model: Model, store: S, mut options: Options) -> Result<Self> {
        options.framing.repair();
        let graph = SceneGraph::from_model(&model)?;

        let saved = match store.get(&model.model_id) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                log::warn!(
                    "could not read view state for '{}', using defaults: {e}",
                    model.model_id
                );
                ViewState::default()
            }
        };

        let factor = ExplodeFactor::from_percent(saved.explode_value);
        let driver = ExplodeDriver::new(&graph, factor);
        // Reopening shows the saved pose immediately instead of animating to it.
        let interpolator = TransformInterpolator::new(driver.targets(), options.damping);

        let mut camera = Camera::new(options.framing.aspect_ratio);
        camera.set_fov(options.framing.fov_deg.to_radians());

        let selected_parts = saved
            .selected_parts
            .into_iter()
            .filter(|id| graph.part(id).is_ok())
            .collect();

        let quiet = Duration::from_millis(options.throttle_ms);
        log::info!(
            "opened model '{}' ({} parts, {} nodes) at explode {:.0}%",
            model.model_id,
            graph.parts().len(),
            graph.len(),
            factor.percent()
        );

        Ok(Self {
            framer: Framer::new(options.framing.clone()),
            model,
            graph,
            driver,
            interpolator,
            camera,
            framing: None,
            restore_camera: saved.camera,
            rotation: None,
            clock: Duration::ZERO,
            camera_sync: Throttle::new(quiet),
            explode_sync: Throttle::new(quiet),
            notes: saved.notes,
            chat_history: saved.chat_history,
            selected_parts,
            store,
            options,
            closed: false,
        })
    }

    /// The model being viewed.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The validated scene graph.
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Session options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Time accumulated from frame deltas.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ---------------------------------------------------------------------
    // Explode
    // ---------------------------------------------------------------------

    /// Sets the explode factor (`[0, 1]`, clamped). Returns the applied factor.
    pub fn set_explode_factor(&mut self, value: f32) -> ExplodeFactor {
        let factor = ExplodeFactor::new(value);
        if !self.closed && self.driver.set_factor(factor) {
            self.explode_sync.push(factor.percent(), self.clock);
        }
        self.driver.factor()
    }

    /// Sets the explode factor from a 0-100 slider value.
    pub fn set_explode_percent(&mut self, percent: f32) -> ExplodeFactor {
        self.set_explode_factor(ExplodeFactor::from_percent(percent).value())
    }

    /// The current explode factor.
    #[must_use]
    pub fn explode_factor(&self) -> ExplodeFactor {
        self.driver.factor()
    }

    // ---------------------------------------------------------------------
    // Frame loop
    // ---------------------------------------------------------------------

    /// Advances the session by one rendered frame of `dt` seconds.
    pub fn on_frame(&mut self, dt: f32, geometry: &dyn GeometrySource) {
        if self.closed {
            return;
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let step = Duration::try_from_secs_f32(dt).unwrap_or(Duration::MAX);
        self.clock = self.clock.saturating_add(step);

        if self.framer.is_pending() {
            let bounds = assembly_bounds(&self.graph, geometry);
            match self.framer.tick(bounds) {
                FramingStatus::Pending => {}
                FramingStatus::Framed(framing) | FramingStatus::FellBack(framing) => {
                    self.adopt_framing(framing, true);
                }
            }
        }

        self.driver.update(&self.graph);
        self.interpolator.tick(self.driver.targets(), dt);

        if let Some(direction) = self.rotation {
            self.camera
                .auto_rotate(direction, self.options.rotate_speed, dt);
            self.camera_sync.push(self.camera.state(), self.clock);
        }

        self.flush_due();
    }

    /// Live world pose of a node as currently rendered.
    ///
    /// After [`close`](Self::close) the live poses are gone and the
    /// assembled pose is reported.
    pub fn world_transform(&self, node_id: &str) -> Result<Transform> {
        let index = self.graph.lookup(node_id)?;
        Ok(self.graph.world_in(index, self.interpolator.live()))
    }

    /// Live world poses of every node, by arena index. Assembled after close.
    #[must_use]
    pub fn world_transforms(&self) -> Vec<Transform> {
        self.graph.compose_world(self.interpolator.live())
    }

    /// World pose a node is moving toward at the current explode factor.
    pub fn target_world_transform(&self, node_id: &str) -> Result<Transform> {
        target_world(&self.graph, node_id, self.driver.factor())
    }

    /// World pose of a node when fully assembled.
    pub fn assembled_world_transform(&self, node_id: &str) -> Result<Transform> {
        self.graph.world_transform(node_id)
    }

    /// Largest distance between any live transform and its target.
    #[must_use]
    pub fn motion_remaining(&self) -> f32 {
        let targets: Vec<Transform> = if self.driver.is_dirty() {
            self.graph
                .nodes()
                .map(|(_, n)| target_local(n.assembled(), n.explode(), self.driver.factor()))
                .collect()
        } else {
            self.driver.targets().to_vec()
        };
        self.interpolator.max_distance_to(&targets)
    }

    // ---------------------------------------------------------------------
    // Camera
    // ---------------------------------------------------------------------

    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The framing currently bounding the camera, once established.
    #[must_use]
    pub fn framing(&self) -> Option<Framing> {
        self.framing
    }

    /// Frames the camera around the assembled model now.
    ///
    /// If geometry is not available yet, framing is retried on subsequent
    /// frames and `None` is returned.
    pub fn frame_camera(&mut self, geometry: &dyn GeometrySource) -> Option<Framing> {
        if self.closed {
            return None;
        }
        match assembly_bounds(&self.graph, geometry) {
            Some(bounds) => {
                let framing = frame_bounds(&bounds, &self.options.framing);
                self.framer.cancel();
                self.adopt_framing(framing, false);
                Some(framing)
            }
            None => {
                log::debug!("framing deferred for '{}'", self.model.model_id);
                self.framer.restart();
                None
            }
        }
    }

    /// Orbits the camera around its target.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.camera.orbit(delta_x, delta_y);
        self.camera_changed();
    }

    /// Pans the camera.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        self.camera.pan(delta_x, delta_y);
        self.camera_changed();
    }

    /// Zooms toward (positive) or away from the target, within orbit bounds.
    pub fn zoom(&mut self, delta: f32) {
        self.camera.zoom(delta);
        self.camera_changed();
    }

    /// Current zoom as a 0-100 percentage.
    #[must_use]
    pub fn zoom_percent(&self) -> f32 {
        self.camera.zoom_percent()
    }

    /// Sets zoom from a 0-100 percentage.
    pub fn set_zoom_percent(&mut self, percent: f32) {
        self.camera.set_zoom_percent(percent);
        self.camera_changed();
    }

    /// Starts (`Some`) or stops (`None`) held-button auto rotation.
    pub fn set_rotation(&mut self, direction: Option<RotateDirection>) {
        self.rotation = direction;
    }

    /// The active auto-rotation direction.
    #[must_use]
    pub fn rotation(&self) -> Option<RotateDirection> {
        self.rotation
    }

    // ---------------------------------------------------------------------
    // Inspection and annotations
    // ---------------------------------------------------------------------

    /// The part instantiated by a node.
    pub fn part_for_node(&self, node_id: &str) -> Result<&Part> {
        self.graph.part_of(node_id)
    }

    /// Adds a part to the selection. Selecting twice is a no-op.
    pub fn select_part(&mut self, part_id: &str) -> Result<()> {
        self.graph.part(part_id)?;
        if !self.selected_parts.iter().any(|p| p == part_id) {
            self.selected_parts.push(part_id.to_string());
            self.persist_selection();
        }
        Ok(())
    }

    /// Selects the part instantiated by a node and returns it.
    pub fn select_node(&mut self, node_id: &str) -> Result<&Part> {
        let part_id = self.graph.part_of(node_id)?.part_id.clone();
        self.select_part(&part_id)?;
        self.graph.part(&part_id)
    }

    /// Removes a part from the selection. Returns whether it was selected.
    pub fn deselect_part(&mut self, part_id: &str) -> bool {
        let before = self.selected_parts.len();
        self.selected_parts.retain(|p| p != part_id);
        let removed = self.selected_parts.len() != before;
        if removed {
            self.persist_selection();
        }
        removed
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        if !self.selected_parts.is_empty() {
            self.selected_parts.clear();
            self.persist_selection();
        }
    }

    /// Selected part ids in selection order.
    #[must_use]
    pub fn selected_parts(&self) -> &[String] {
        &self.selected_parts
    }

    /// User notes for this model.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Replaces the user notes.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        let patch = ViewStatePatch {
            notes: Some(self.notes.clone()),
            ..ViewStatePatch::default()
        };
        self.persist(patch);
    }

    /// The assistant conversation for this model.
    #[must_use]
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Appends a message to the conversation.
    pub fn push_chat_message(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
        self.persist_chat();
    }

    /// Clears the conversation.
    pub fn clear_chat(&mut self) {
        self.chat_history.clear();
        self.persist_chat();
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Writes any throttled camera/explode changes now.
    pub fn flush(&mut self) {
        if self.closed {
            return;
        }
        if let Some(state) = self.camera_sync.flush() {
            self.persist(ViewStatePatch::camera(state));
        }
        if let Some(value) = self.explode_sync.flush() {
            self.persist(ViewStatePatch::explode_value(value));
        }
    }

    /// Tears the session down.
    ///
    /// Pending throttled writes are cancelled, live transforms are dropped,
    /// and later frames and setters have no effect. Call [`flush`](Self::flush)
    /// first to keep the last camera/explode change.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let dropped_camera = self.camera_sync.cancel();
        let dropped_explode = self.explode_sync.cancel();
        if dropped_camera || dropped_explode {
            log::debug!(
                "cancelled pending writes for '{}' (camera: {dropped_camera}, explode: {dropped_explode})",
                self.model.model_id
            );
        }
        self.framer.cancel();
        self.interpolator.reset();
        self.rotation = None;
        self.closed = true;
        log::info!("closed model '{}'", self.model.model_id);
    }

    fn adopt_framing(&mut self, framing: Framing, restore_saved: bool) {
        self.camera.apply_framing(&framing);
        self.framing = Some(framing);
        if restore_saved {
            if let Some(saved) = self.restore_camera.take() {
                if self.camera.restore(&saved) {
                    log::debug!("restored camera for '{}'", self.model.model_id);
                    return;
                }
                log::warn!(
                    "ignoring unusable stored camera for '{}'",
                    self.model.model_id
                );
            }
        } else {
            self.restore_camera = None;
        }
        self.camera_changed();
    }

    fn camera_changed(&mut self) {
        if !self.closed {
            self.camera_sync.push(self.camera.state(), self.clock);
        }
    }

    fn flush_due(&mut self) {
        if let Some(state) = self.camera_sync.poll(self.clock) {
            self.persist(ViewStatePatch::camera(state));
        }
        if let Some(value) = self.explode_sync.poll(self.clock) {
            self.persist(ViewStatePatch::explode_value(value));
        }
    }

    fn persist_selection(&mut self) {
        let patch = ViewStatePatch {
            selected_parts: Some(self.selected_parts.clone()),
            ..ViewStatePatch::default()
        };
        self.persist(patch);
    }

    fn persist_chat(&mut self) {
        let patch = ViewStatePatch {
            chat_history: Some(self.chat_history.clone()),
            ..ViewStatePatch::default()
        };
        self.persist(patch);
    }

    fn persist(&mut self, patch: ViewStatePatch) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store.set(&self.model.model_id, patch) {
            log::warn!(
                "failed to persist view state for '{}': {e}",
                self.model.model_id
            );
        }
    }
}

impl<S: ViewStateStore> Drop for ViewerSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: ViewStateStore> std::fmt::Debug for ViewerSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("model_id", &self.model.model_id)
            .field("nodes", &self.graph.len())
            .field("explode", &self.driver.factor().value())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
