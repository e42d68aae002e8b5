//! The volume tool: insertion, scene mirroring, labels and overlay rendering.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use cloudscope_core::{
    format_space, projected_radius, CloudscopeError, Entity, EventDispatcher, EventReceiver,
    EventStream, InputEvent, InputHandler, InteractiveScene, ListenerId, PickOptions, RenderScene,
    Result, Scene, SceneId, ScenePass, Viewer, ViewerPlugin, Volume, VolumeHandle, VolumeId,
    VolumeKind,
};
use glam::Vec2;

use crate::options::VolumeToolOptions;
use crate::overlay::OverlayScene;
use crate::session::{InsertionSession, SessionInput, SessionOutcome};

/// Parameters of [`VolumeTool::start_insertion`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertionOptions {
    /// Shape of the new volume (default: box).
    pub kind: Option<VolumeKind>,
    /// Whether the new volume clips the point cloud (default: no).
    pub clip: Option<bool>,
    /// Display name (default: the tool's default name).
    pub name: Option<String>,
}

impl InsertionOptions {
    /// Options with every field left to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a shape given by name, e.g. `"sphere"`.
    pub fn from_kind_name(kind: &str) -> Result<Self> {
        Ok(Self::new().with_kind(kind.parse()?))
    }

    /// Sets the shape.
    #[must_use]
    pub fn with_kind(mut self, kind: VolumeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the clip flag.
    #[must_use]
    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Lifecycle events of volume insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeToolEvent {
    /// A volume is about to be placed.
    StartInsertingVolume {
        /// The new volume.
        volume: VolumeHandle,
    },
    /// Placement of a volume ended, by drop or cancellation.
    InsertingVolumeDone {
        /// The placed volume.
        volume: VolumeHandle,
    },
}

impl VolumeToolEvent {
    /// Returns the volume the event is about.
    #[must_use]
    pub fn volume(&self) -> &VolumeHandle {
        match self {
            VolumeToolEvent::StartInsertingVolume { volume }
            | VolumeToolEvent::InsertingVolumeDone { volume } => volume,
        }
    }

    /// Returns the event's wire name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            VolumeToolEvent::StartInsertingVolume { .. } => "start_inserting_volume",
            VolumeToolEvent::InsertingVolumeDone { .. } => "inserting_volume_done",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Mirror {
    scene: SceneId,
    listener: ListenerId,
}

type SharedSession = Rc<RefCell<Option<InsertionSession>>>;
type SharedEvents = Rc<RefCell<EventStream<VolumeToolEvent>>>;

/// Places measurement volumes and keeps their labels current.
///
/// The tool mirrors the active scene's volumes into a private
/// [`OverlayScene`], which it registers with the input handler for
/// hit-testing and draws during the scene render pass.
///
/// An insertion in flight registers a one-shot cancel handler on the viewer,
/// so any cancel broadcast ends it. Starting an insertion broadcasts first,
/// which cancels the in-flight insertions of every tool on the viewer.
pub struct VolumeTool {
    overlay: Rc<RefCell<OverlayScene>>,
    mirror: Option<Mirror>,
    mirrored: Rc<Cell<Option<SceneId>>>,
    session: SharedSession,
    cancel_handler: Option<ListenerId>,
    listeners: EventDispatcher<VolumeToolEvent>,
    events: SharedEvents,
    options: VolumeToolOptions,
}

impl std::fmt::Debug for VolumeTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeTool")
            .field("overlay", &self.overlay.borrow().len())
            .field("mirror", &self.mirror)
            .field("session", &self.session.borrow())
            .field("cancel_handler", &self.cancel_handler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl VolumeTool {
    /// Creates the tool and attaches it to the viewer's active scene.
    pub fn new(viewer: &mut Viewer) -> Self {
        Self::with_options(viewer, VolumeToolOptions::default())
    }

    /// Creates the tool with custom options.
    pub fn with_options(viewer: &mut Viewer, options: VolumeToolOptions) -> Self {
        let overlay = Rc::new(RefCell::new(OverlayScene::new()));
        let interactive: Rc<RefCell<dyn InteractiveScene>> = overlay.clone();
        viewer.input_mut().register_interactive_scene(interactive);
        overlay.borrow_mut().reseed(viewer.scene());

        let mut tool = Self {
            overlay,
            mirror: None,
            mirrored: Rc::new(Cell::new(None)),
            session: Rc::new(RefCell::new(None)),
            cancel_handler: None,
            listeners: EventDispatcher::new(),
            events: Rc::new(RefCell::new(EventStream::new())),
            options,
        };
        tool.attach(viewer.scene_mut());
        log::info!(
            "volume tool attached to {} with {} volumes",
            viewer.scene().id(),
            viewer.scene().len()
        );
        tool
    }

    /// Detaches the tool from the viewer.
    ///
    /// Cancels any insertion, stops mirroring and unregisters the overlay.
    pub fn shutdown(mut self, viewer: &mut Viewer) {
        self.cancel_insertions(viewer);
        if !self.detach(viewer.scene_mut()) {
            self.mirrored.set(None);
        }
        let interactive: Rc<RefCell<dyn InteractiveScene>> = self.overlay.clone();
        viewer.input_mut().unregister_interactive_scene(&interactive);
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &VolumeToolOptions {
        &self.options
    }

    /// Returns the overlay scene.
    #[must_use]
    pub fn overlay(&self) -> Ref<'_, OverlayScene> {
        self.overlay.borrow()
    }

    /// Returns the id of the scene being mirrored.
    #[must_use]
    pub fn mirrored_scene(&self) -> Option<SceneId> {
        self.mirror.map(|m| m.scene)
    }

    /// Returns whether a volume is being placed.
    #[must_use]
    pub fn is_inserting(&self) -> bool {
        self.session
            .borrow()
            .as_ref()
            .is_some_and(InsertionSession::is_active)
    }

    /// Returns the volume being placed, if any.
    #[must_use]
    pub fn inserting_volume(&self) -> Option<VolumeHandle> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.volume().clone())
    }

    /// Subscribes to lifecycle events as a queue.
    ///
    /// The receiver only sees events emitted after this call and buffers them
    /// until drained.
    pub fn subscribe_events(&mut self) -> EventReceiver<VolumeToolEvent> {
        self.events.borrow_mut().subscribe()
    }

    /// Subscribes a callback to lifecycle events emitted from now on.
    pub fn subscribe_events_with(
        &mut self,
        listener: impl FnMut(&VolumeToolEvent) + 'static,
    ) -> ListenerId {
        self.events.borrow_mut().subscribe_with(listener)
    }

    /// Removes a callback registered with [`VolumeTool::subscribe_events_with`].
    pub fn unsubscribe_events(&mut self, id: ListenerId) -> bool {
        self.events.borrow_mut().unsubscribe(id)
    }

    /// Registers a listener for `StartInsertingVolume` notifications.
    pub fn add_event_listener(
        &mut self,
        listener: impl FnMut(&VolumeToolEvent) + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Removes a listener registered with [`VolumeTool::add_event_listener`].
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Starts placing a new volume and returns it right away.
    ///
    /// Every insertion in flight on the viewer is cancelled first. The volume
    /// is added to the scene immediately and follows the pointer until it is
    /// dropped.
    pub fn start_insertion(
        &mut self,
        viewer: &mut Viewer,
        options: InsertionOptions,
    ) -> VolumeHandle {
        viewer.broadcast_cancel_insertions();

        let volume = Volume::new(options.kind.unwrap_or_default())
            .with_clip(options.clip.unwrap_or(false))
            .with_name(
                options
                    .name
                    .unwrap_or_else(|| self.options.default_name.clone()),
            );
        let handle = VolumeHandle::new(volume);
        log::info!(
            "start inserting {} volume {}",
            handle.borrow().kind(),
            handle.id()
        );

        let event = VolumeToolEvent::StartInsertingVolume {
            volume: handle.clone(),
        };
        self.listeners.dispatch(&event);
        self.events.borrow_mut().emit(&event);

        viewer.scene_mut().add_volume(handle.clone());
        self.overlay.borrow_mut().add(&handle);

        *self.session.borrow_mut() = Some(InsertionSession::new(
            handle.clone(),
            self.options.placement_depth_divisor,
        ));
        viewer.input_mut().start_dragging(&handle);

        let shared = Rc::clone(&self.session);
        let events = Rc::clone(&self.events);
        let id = handle.id();
        self.cancel_handler = Some(viewer.on_cancel_insertions(move |input| {
            let taken = {
                let mut slot = shared.borrow_mut();
                match slot.as_ref() {
                    Some(active) if active.volume().id() == id => slot.take(),
                    _ => None,
                }
            };
            if let Some(mut session) = taken {
                if session.cancel() {
                    finish_session(&session, input, &events);
                }
            }
        }));

        handle
    }

    /// Parses a shape name and starts inserting it.
    pub fn start_insertion_of(
        &mut self,
        viewer: &mut Viewer,
        kind: &str,
        name: Option<&str>,
    ) -> Result<VolumeHandle> {
        let mut options = InsertionOptions::from_kind_name(kind)?;
        options.name = name.map(str::to_string);
        Ok(self.start_insertion(viewer, options))
    }

    /// Cancels this tool's insertion in flight. Returns `false` if there was none.
    pub fn cancel_insertions(&mut self, viewer: &mut Viewer) -> bool {
        self.remove_cancel_handler(viewer);
        let taken = self.session.borrow_mut().take();
        let Some(mut session) = taken else {
            return false;
        };
        if !session.cancel() {
            return false;
        }
        finish_session(&session, viewer.input_mut(), &self.events);
        true
    }

    /// Removes a volume from the active scene.
    pub fn remove_volume(&mut self, viewer: &mut Viewer, id: VolumeId) -> Result<VolumeHandle> {
        if self.inserting_volume().as_ref().map(VolumeHandle::id) == Some(id) {
            self.cancel_insertions(viewer);
        }
        viewer
            .scene_mut()
            .remove_volume(id)
            .ok_or(CloudscopeError::VolumeNotFound(id))
    }

    /// Handles an input event from the viewer.
    pub fn handle_input(&mut self, viewer: &mut Viewer, event: &InputEvent) {
        match event {
            InputEvent::Drag { volume, end, .. } => self.drag(viewer, *volume, *end),
            InputEvent::Drop { volume, .. } => self.drop_volume(viewer, *volume),
            InputEvent::Delete { selection } => {
                for volume in selection.iter().filter_map(Entity::as_volume) {
                    if let Err(err) = self.remove_volume(viewer, volume.id()) {
                        log::debug!("skipping deleted entity: {err}");
                    }
                }
            }
        }
    }

    /// Refreshes every volume's label scale and text.
    ///
    /// Skipped when the scene has no active camera.
    pub fn update(&mut self, viewer: &Viewer) {
        let Some(camera) = viewer.scene().active_camera() else {
            return;
        };
        let viewport = viewer.renderer().size();
        let internal = &viewer.options().length_unit;
        let display = &viewer.options().length_unit_display;

        for handle in viewer.scene().volumes() {
            let mut volume = handle.borrow_mut();

            let distance = volume.label_position().distance(camera.position);
            let radius = projected_radius(
                self.options.label_reference_radius,
                camera,
                distance,
                viewport,
            );
            if radius.is_finite() && radius > 0.0 {
                volume
                    .label_mut()
                    .set_scale(self.options.label_screen_size / radius);
            }

            let text = format_space(volume.space(), internal, display);
            volume.label_mut().set_text(text);
        }
    }

    /// Draws the overlay scene with the active camera.
    ///
    /// The previously bound render target is restored afterwards, also when
    /// the renderer fails.
    pub fn render(&mut self, viewer: &mut Viewer, pass: &ScenePass) {
        let Some(camera) = viewer.scene().active_camera().cloned() else {
            return;
        };
        let items = self.overlay.borrow().draw_items();
        let scene = RenderScene {
            name: crate::overlay::OVERLAY_SCENE_NAME,
            items: &items,
        };

        let renderer = viewer.renderer_mut();
        let previous = renderer.render_target();
        if let Some(target) = pass.render_target {
            renderer.set_render_target(Some(target));
        }
        let result = renderer.render(&scene, &camera);
        renderer.set_render_target(previous);

        if let Err(err) = result {
            log::warn!("failed to render volume overlay: {err}");
        }
    }

    /// Moves mirroring from `old_scene` to the viewer's active scene.
    pub fn on_scene_changed(&mut self, viewer: &mut Viewer, old_scene: &mut Scene) {
        if !self.detach(old_scene) && !self.detach(viewer.scene_mut()) {
            if let Some(mirror) = self.mirror.take() {
                log::warn!(
                    "volume tool mirrored {}, which is neither {} nor {}; its listener stays inert",
                    mirror.scene,
                    old_scene.id(),
                    viewer.scene().id()
                );
            }
        }

        let stale = self
            .inserting_volume()
            .is_some_and(|volume| !viewer.scene().contains(volume.id()));
        if stale {
            self.cancel_insertions(viewer);
        }

        self.overlay.borrow_mut().reseed(viewer.scene());
        self.attach(viewer.scene_mut());
    }

    fn attach(&mut self, scene: &mut Scene) {
        let scene_id = scene.id();
        let overlay = Rc::clone(&self.overlay);
        let mirrored = Rc::clone(&self.mirrored);
        let listener = scene.subscribe(move |event| {
            if mirrored.get() == Some(scene_id) {
                overlay.borrow_mut().apply(event);
            }
        });
        self.mirrored.set(Some(scene_id));
        self.mirror = Some(Mirror {
            scene: scene.id(),
            listener,
        });
    }

    /// Stops mirroring `scene`.
    ///
    /// Returns `false` without touching anything when `scene` is not the
    /// mirrored one, so the listener can still be removed from the right scene.
    fn detach(&mut self, scene: &mut Scene) -> bool {
        match self.mirror {
            Some(mirror) if mirror.scene == scene.id() => {
                scene.unsubscribe(mirror.listener);
                self.mirror = None;
                self.mirrored.set(None);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    fn drag(&mut self, viewer: &Viewer, id: VolumeId, pointer: Vec2) {
        let mut slot = self.session.borrow_mut();
        let Some(session) = slot.as_mut().filter(|s| s.volume().id() == id) else {
            return;
        };
        let Some(camera) = viewer.scene().active_camera() else {
            log::debug!("no active camera, ignoring drag of volume {id}");
            return;
        };
        let view = camera.view_matrix();
        let pick = PickOptions {
            pick_clipped: false,
            ..viewer.options().pick
        };
        let hit = viewer.pick_point_cloud(pointer, &pick);
        session.dispatch(SessionInput::Drag { hit, view });
    }

    fn drop_volume(&mut self, viewer: &mut Viewer, id: VolumeId) {
        let finished = {
            let mut slot = self.session.borrow_mut();
            match slot.as_mut() {
                Some(session) if session.volume().id() == id => matches!(
                    session.dispatch(SessionInput::Drop),
                    SessionOutcome::Finished(_)
                ),
                _ => false,
            }
        };
        if !finished {
            return;
        }
        self.remove_cancel_handler(viewer);
        let taken = self.session.borrow_mut().take();
        if let Some(session) = taken {
            finish_session(&session, viewer.input_mut(), &self.events);
        }
    }

    fn remove_cancel_handler(&mut self, viewer: &mut Viewer) {
        if let Some(id) = self.cancel_handler.take() {
            viewer.remove_cancel_handler(id);
        }
    }
}

/// Ends the drag of a finished session and emits its done event.
fn finish_session(
    session: &InsertionSession,
    input: &mut InputHandler,
    events: &RefCell<EventStream<VolumeToolEvent>>,
) {
    let volume = session.volume();
    if input.drag().map(|d| d.volume) == Some(volume.id()) {
        input.stop_dragging();
    }
    log::info!("inserting volume {} done ({:?})", volume.id(), session.state());
    events.borrow_mut().emit(&VolumeToolEvent::InsertingVolumeDone {
        volume: volume.clone(),
    });
}

impl ViewerPlugin for VolumeTool {
    fn update(&mut self, viewer: &mut Viewer) {
        VolumeTool::update(self, viewer);
    }

    fn render_scene_pass(&mut self, viewer: &mut Viewer, pass: &ScenePass) {
        self.render(viewer, pass);
    }

    fn scene_changed(&mut self, viewer: &mut Viewer, old_scene: &mut Scene) {
        self.on_scene_changed(viewer, old_scene);
    }

    fn input(&mut self, viewer: &mut Viewer, event: &InputEvent) {
        self.handle_input(viewer, event);
    }

    fn cancel_insertions(&mut self, viewer: &mut Viewer) {
        VolumeTool::cancel_insertions(self, viewer);
    }
}
