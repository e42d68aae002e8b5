//! Core abstractions for cloudscope.
//!
//! This crate provides the building blocks the volume tool is wired into:
//! - [`Volume`] entities with a shape-dependent space computation and a label
//! - The [`Scene`] registry that owns volumes and notifies listeners
//! - The [`InputHandler`] drag/selection dispatcher
//! - [`Renderer`] and [`PointCloudPicker`] seams for the host engine
//! - The [`Viewer`] host and its [`ViewerPlugin`] hooks

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Pixel and counter conversions are bounded in practice
#![allow(clippy::cast_precision_loss)]

pub mod camera;
pub mod error;
pub mod events;
pub mod format;
pub mod input;
pub mod options;
pub mod picking;
pub mod render;
pub mod scene;
pub mod transform;
pub mod units;
pub mod viewer;
pub mod volume;

pub use camera::{projected_radius, Camera, ProjectionMode, Ray};
pub use error::{CloudscopeError, Result};
pub use events::{EventDispatcher, EventReceiver, EventStream, ListenerId, OneShotHandlers};
pub use format::{add_commas, format_space, to_fixed_3};
pub use input::{DragState, Entity, Hit, InputEvent, InputHandler, InteractiveScene};
pub use options::ViewerOptions;
pub use picking::{PickOptions, PointCloudPicker, PointSetPicker};
pub use render::{HeadlessRenderer, RenderCall, RenderScene, RenderTargetId, Renderer, VolumeUniforms};
pub use scene::{Scene, SceneEvent, SceneId};
pub use transform::Transform;
pub use units::LengthUnit;
pub use viewer::{ScenePass, Viewer, ViewerEvent, ViewerPlugin};
pub use volume::{Label, Volume, VolumeHandle, VolumeId, VolumeKind, VolumeRecord, WeakVolumeHandle};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};
