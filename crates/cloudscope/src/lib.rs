//! cloudscope: interactive volume measurement for point-cloud viewers.
//!
//! The [`VolumeTool`] lets a user drop boxes and spheres onto a point cloud and
//! shows the space each one encloses as a live label.
//!
//! # Quick Start
//!
//! ```no_run
//! use cloudscope::*;
//!
//! init_logging();
//!
//! let picker = PointSetPicker::new(vec![Vec3::new(0.0, 0.0, -5.0)]);
//! let mut viewer = Viewer::new(Box::new(HeadlessRenderer::new(800, 600)), Box::new(picker));
//! viewer
//!     .scene_mut()
//!     .set_active_camera(Some(Camera::new(800.0 / 600.0)));
//!
//! let mut tool = VolumeTool::new(&mut viewer);
//! let volume = tool.start_insertion(&mut viewer, InsertionOptions::new());
//!
//! viewer.pointer_moved(Vec2::new(400.0, 300.0), &mut [&mut tool]);
//! viewer.pointer_released(Vec2::new(400.0, 300.0), &mut [&mut tool]);
//! viewer.frame(&mut [&mut tool], &ScenePass::default());
//!
//! println!("{}", volume.borrow().label().text());
//! ```
//!
//! # Architecture
//!
//! - [`cloudscope_core`] holds the host side: volumes, the scene registry, the
//!   input handler, the camera and the renderer/picker seams.
//! - This crate adds the tool itself: the [`OverlayScene`] mirror, the
//!   [`InsertionSession`] state machine and [`VolumeTool`].

pub mod options;
pub mod overlay;
pub mod session;
pub mod tool;

pub use cloudscope_core::{
    add_commas, format_space, projected_radius, Camera, CloudscopeError, DragState, Entity,
    EventDispatcher, EventReceiver, EventStream, HeadlessRenderer, Hit, InputEvent, InputHandler,
    InteractiveScene, Label, LengthUnit, ListenerId, Mat4, PickOptions, PointCloudPicker,
    PointSetPicker, ProjectionMode, Quat, Ray, RenderCall, RenderScene, RenderTargetId, Renderer,
    Result, Scene, SceneEvent, SceneId, ScenePass, Transform, UVec2, Vec2, Vec3, Vec4, Viewer,
    ViewerEvent, ViewerOptions, ViewerPlugin, Volume, VolumeHandle, VolumeId, VolumeKind,
    VolumeRecord, VolumeUniforms, WeakVolumeHandle,
};

pub use options::VolumeToolOptions;
pub use overlay::{OverlayScene, OVERLAY_SCENE_NAME, VOLUME_COLOR};
pub use session::{
    placement_scale, InsertionSession, SessionInput, SessionOutcome, SessionState,
    DEFAULT_PLACEMENT_DEPTH_DIVISOR,
};
pub use tool::{InsertionOptions, VolumeTool, VolumeToolEvent};

/// Initializes `env_logger` once. Later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
