//! The viewer host: active scene, input, renderer and plugin hooks.
//!
//! The viewer owns the collaborators a tool needs and drives plugins through
//! the [`ViewerPlugin`] hooks. Plugins are passed in per call rather than
//! stored, so a plugin can receive `&mut Viewer` while the host keeps direct
//! access to it.

use std::fmt;

use glam::{Vec2, Vec3};

use crate::events::{EventDispatcher, ListenerId, OneShotHandlers};
use crate::input::{InputEvent, InputHandler};
use crate::options::ViewerOptions;
use crate::picking::{PickOptions, PointCloudPicker};
use crate::render::{RenderTargetId, Renderer};
use crate::scene::{Scene, SceneId};
use crate::volume::VolumeId;

/// Viewer-level notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Per-frame tick.
    Update,
    /// The scene render pass is running.
    RenderPassScene {
        /// Explicit target for the pass, if any.
        render_target: Option<RenderTargetId>,
    },
    /// The active scene was replaced.
    SceneChanged {
        /// The previous scene.
        old_scene: SceneId,
        /// The new active scene.
        scene: SceneId,
    },
    /// Every in-flight insertion should be aborted.
    CancelInsertions,
}

/// Parameters of a scene render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenePass {
    /// Explicit target for the pass (`None` = whatever is bound).
    pub render_target: Option<RenderTargetId>,
}

/// Hooks a tool implements to take part in the viewer's loop.
pub trait ViewerPlugin {
    /// Called once per frame before rendering.
    fn update(&mut self, _viewer: &mut Viewer) {}

    /// Called during the scene render pass.
    fn render_scene_pass(&mut self, _viewer: &mut Viewer, _pass: &ScenePass) {}

    /// Called after the active scene was replaced; `old_scene` is the previous one.
    fn scene_changed(&mut self, _viewer: &mut Viewer, _old_scene: &mut Scene) {}

    /// Called for every input event.
    fn input(&mut self, _viewer: &mut Viewer, _event: &InputEvent) {}

    /// Called when in-flight insertions must be aborted.
    fn cancel_insertions(&mut self, _viewer: &mut Viewer) {}
}

/// The point-cloud viewer hosting measurement tools.
pub struct Viewer {
    scene: Scene,
    input: InputHandler,
    renderer: Box<dyn Renderer>,
    picker: Box<dyn PointCloudPicker>,
    options: ViewerOptions,
    listeners: EventDispatcher<ViewerEvent>,
    cancel_handlers: OneShotHandlers<InputHandler>,
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewer")
            .field("scene", &self.scene)
            .field("input", &self.input)
            .field("options", &self.options)
            .field("listeners", &self.listeners)
            .field("cancel_handlers", &self.cancel_handlers)
            .finish_non_exhaustive()
    }
}

impl Viewer {
    /// Creates a viewer with an empty default scene.
    pub fn new(renderer: Box<dyn Renderer>, picker: Box<dyn PointCloudPicker>) -> Self {
        Self {
            scene: Scene::default(),
            input: InputHandler::new(),
            renderer,
            picker,
            options: ViewerOptions::default(),
            listeners: EventDispatcher::new(),
            cancel_handlers: OneShotHandlers::new(),
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: ViewerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the initial scene without notifying anyone.
    #[must_use]
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    /// Returns the active scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Returns the active scene for modification.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Returns the input handler.
    #[must_use]
    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    /// Returns the input handler for modification.
    pub fn input_mut(&mut self) -> &mut InputHandler {
        &mut self.input
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Returns the renderer for modification.
    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Returns the options for modification.
    pub fn options_mut(&mut self) -> &mut ViewerOptions {
        &mut self.options
    }

    /// Picks the point cloud at a pixel using the active camera.
    ///
    /// Returns `None` without a camera or without a hit.
    #[must_use]
    pub fn pick_point_cloud(&self, pointer: Vec2, options: &PickOptions) -> Option<Vec3> {
        let camera = self.scene.active_camera()?;
        self.picker
            .pick(pointer, camera, self.renderer.size(), options)
    }

    /// Subscribes to viewer-level events.
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewerEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Removes a viewer-level listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Delivers an event to viewer-level listeners only.
    pub fn dispatch_event(&mut self, event: &ViewerEvent) {
        self.listeners.dispatch(event);
    }

    /// Registers a handler run once on the next cancel broadcast.
    ///
    /// Insertion sessions use this to be cancelled when any tool starts a new
    /// insertion. The handler gets the input handler so it can end its drag.
    pub fn on_cancel_insertions(
        &mut self,
        handler: impl FnOnce(&mut InputHandler) + 'static,
    ) -> ListenerId {
        self.cancel_handlers.register(handler)
    }

    /// Removes a pending cancel handler. Returns `false` if it already ran.
    pub fn remove_cancel_handler(&mut self, id: ListenerId) -> bool {
        self.cancel_handlers.remove(id)
    }

    /// Returns the number of pending cancel handlers.
    #[must_use]
    pub fn pending_cancel_handlers(&self) -> usize {
        self.cancel_handlers.len()
    }

    /// Dispatches `CancelInsertions` to listeners, then runs and clears every
    /// pending cancel handler.
    pub fn broadcast_cancel_insertions(&mut self) {
        self.dispatch_event(&ViewerEvent::CancelInsertions);
        self.cancel_handlers.run_all(&mut self.input);
    }

    /// Runs one frame: the update tick followed by the scene render pass.
    pub fn frame(&mut self, plugins: &mut [&mut dyn ViewerPlugin], pass: &ScenePass) {
        self.dispatch_event(&ViewerEvent::Update);
        for plugin in plugins.iter_mut() {
            plugin.update(self);
        }

        self.dispatch_event(&ViewerEvent::RenderPassScene {
            render_target: pass.render_target,
        });
        for plugin in plugins.iter_mut() {
            plugin.render_scene_pass(self, pass);
        }
    }

    /// Replaces the active scene and returns the previous one.
    pub fn set_scene(&mut self, scene: Scene, plugins: &mut [&mut dyn ViewerPlugin]) -> Scene {
        let mut old_scene = std::mem::replace(&mut self.scene, scene);
        log::info!("active scene changed: {} -> {}", old_scene.id(), self.scene.id());

        for plugin in plugins.iter_mut() {
            plugin.scene_changed(self, &mut old_scene);
        }
        self.dispatch_event(&ViewerEvent::SceneChanged {
            old_scene: old_scene.id(),
            scene: self.scene.id(),
        });
        old_scene
    }

    /// Broadcasts that all in-flight insertions must stop.
    pub fn cancel_insertions(&mut self, plugins: &mut [&mut dyn ViewerPlugin]) {
        self.broadcast_cancel_insertions();
        for plugin in plugins.iter_mut() {
            plugin.cancel_insertions(self);
        }
    }

    /// Forwards an input event to the plugins.
    pub fn forward_input(&mut self, event: &InputEvent, plugins: &mut [&mut dyn ViewerPlugin]) {
        for plugin in plugins.iter_mut() {
            plugin.input(self, event);
        }
    }

    /// Handles a pointer press: hit-tests interactive scenes under the pointer.
    pub fn pointer_pressed(&mut self, position: Vec2) -> Option<VolumeId> {
        let ray = self
            .scene
            .active_camera()
            .and_then(|camera| camera.screen_ray(position, self.renderer.size()))?;
        self.input.pointer_pressed(position, &ray)
    }

    /// Handles a pointer move and forwards the resulting drag, if any.
    pub fn pointer_moved(&mut self, position: Vec2, plugins: &mut [&mut dyn ViewerPlugin]) {
        if let Some(event) = self.input.pointer_moved(position) {
            self.forward_input(&event, plugins);
        }
    }

    /// Handles a pointer release and forwards the resulting drop, if any.
    pub fn pointer_released(&mut self, position: Vec2, plugins: &mut [&mut dyn ViewerPlugin]) {
        if let Some(event) = self.input.pointer_released(position) {
            self.forward_input(&event, plugins);
        }
    }

    /// Deletes the current selection and forwards the delete event.
    pub fn delete_selection(&mut self, plugins: &mut [&mut dyn ViewerPlugin]) {
        if let Some(event) = self.input.delete_selection() {
            self.forward_input(&event, plugins);
        }
    }
}
