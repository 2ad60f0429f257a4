//! Camera support for explodeview.
//!
//! - [`Camera`] orbit controls clamped to per-model distance bounds
//! - [`Framer`] auto-framing with deferred retry while geometry loads
//! - zoom-percent mapping between orbit distance and the UI slider

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

pub mod camera;
pub mod framing;
pub mod zoom;

pub use camera::{Camera, CameraState, RotateDirection};
pub use framing::{
    assembly_bounds, fallback_framing, frame_bounds, Framer, Framing, FramingStatus,
    GeometrySource, NoGeometry, UniformBounds,
};
pub use zoom::{distance_from_zoom_percent, zoom_percent_from_distance};
