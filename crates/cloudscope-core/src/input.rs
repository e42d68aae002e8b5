//! Pointer drag gestures, selection and hit-testing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::camera::Ray;
use crate::volume::{VolumeHandle, VolumeId};

/// Something the user can select.
#[derive(Debug, Clone)]
pub enum Entity {
    /// A measurement volume.
    Volume(VolumeHandle),
    /// Any other scene item, identified by name.
    Other(String),
}

impl Entity {
    /// Returns the volume if this entity is one.
    #[must_use]
    pub fn as_volume(&self) -> Option<&VolumeHandle> {
        match self {
            Entity::Volume(volume) => Some(volume),
            Entity::Other(_) => None,
        }
    }
}

/// A volume hit by a ray.
#[derive(Debug, Clone)]
pub struct Hit {
    /// The hit volume.
    pub volume: VolumeHandle,
    /// Ray parameter of the hit point.
    pub distance: f32,
}

/// A collection of volumes the input handler can hit-test.
pub trait InteractiveScene {
    /// Returns the nearest volume along the ray.
    fn hit_test(&self, ray: &Ray) -> Option<Hit>;
}

/// Events produced by the input handler.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// The pointer moved while dragging a volume.
    Drag {
        /// The dragged volume.
        volume: VolumeId,
        /// Pointer position where the gesture started.
        start: Vec2,
        /// Current pointer position.
        end: Vec2,
    },
    /// The pointer was released, ending a drag.
    Drop {
        /// The dragged volume.
        volume: VolumeId,
        /// Pointer position at release.
        end: Vec2,
    },
    /// The user deleted the current selection.
    Delete {
        /// Selected entities at the time of deletion.
        selection: Vec<Entity>,
    },
}

/// State of an ongoing drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// The dragged volume.
    pub volume: VolumeId,
    /// Pointer position where the gesture started.
    pub start: Vec2,
    /// Latest pointer position.
    pub end: Vec2,
}

/// Tracks the pointer, the selection and drag gestures.
#[derive(Default)]
pub struct InputHandler {
    interactive_scenes: Vec<Rc<RefCell<dyn InteractiveScene>>>,
    selection: Vec<Entity>,
    drag: Option<DragState>,
    pointer: Vec2,
}

impl fmt::Debug for InputHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHandler")
            .field("interactive_scenes", &self.interactive_scenes.len())
            .field("selection", &self.selection.len())
            .field("drag", &self.drag)
            .field("pointer", &self.pointer)
            .finish()
    }
}

impl InputHandler {
    /// Creates an input handler with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene to be hit-tested on pointer presses.
    pub fn register_interactive_scene(&mut self, scene: Rc<RefCell<dyn InteractiveScene>>) {
        if !self
            .interactive_scenes
            .iter()
            .any(|registered| Rc::ptr_eq(registered, &scene))
        {
            self.interactive_scenes.push(scene);
        }
    }

    /// Unregisters a scene. Returns `false` if it was not registered.
    pub fn unregister_interactive_scene(&mut self, scene: &Rc<RefCell<dyn InteractiveScene>>) -> bool {
        let before = self.interactive_scenes.len();
        self.interactive_scenes
            .retain(|registered| !Rc::ptr_eq(registered, scene));
        self.interactive_scenes.len() != before
    }

    /// Returns the number of registered interactive scenes.
    #[must_use]
    pub fn interactive_scene_count(&self) -> usize {
        self.interactive_scenes.len()
    }

    /// Returns the last known pointer position.
    #[must_use]
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Returns the current selection.
    #[must_use]
    pub fn selection(&self) -> &[Entity] {
        &self.selection
    }

    /// Replaces the selection.
    pub fn set_selection(&mut self, selection: Vec<Entity>) {
        self.selection = selection;
    }

    /// Adds an entity to the selection.
    pub fn select(&mut self, entity: Entity) {
        self.selection.push(entity);
    }

    /// Returns the ongoing drag, if any.
    #[must_use]
    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Returns whether a drag gesture is active.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Starts dragging a volume from the current pointer position.
    ///
    /// A gesture that is already running is replaced.
    pub fn start_dragging(&mut self, volume: &VolumeHandle) {
        log::debug!("start dragging volume {}", volume.id());
        self.drag = Some(DragState {
            volume: volume.id(),
            start: self.pointer,
            end: self.pointer,
        });
    }

    /// Ends the drag gesture without producing a drop.
    pub fn stop_dragging(&mut self) -> Option<DragState> {
        self.drag.take()
    }

    /// Hit-tests the registered scenes at `ray`.
    ///
    /// The nearest hit across all scenes wins.
    #[must_use]
    pub fn hit_test(&self, ray: &Ray) -> Option<Hit> {
        self.interactive_scenes
            .iter()
            .filter_map(|scene| scene.borrow().hit_test(ray))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Handles a pointer press.
    ///
    /// A hit volume becomes the selection and starts being dragged.
    pub fn pointer_pressed(&mut self, position: Vec2, ray: &Ray) -> Option<VolumeId> {
        self.pointer = position;
        match self.hit_test(ray) {
            Some(hit) => {
                let id = hit.volume.id();
                self.start_dragging(&hit.volume);
                self.selection = vec![Entity::Volume(hit.volume)];
                Some(id)
            }
            None => {
                self.selection.clear();
                None
            }
        }
    }

    /// Handles a pointer move, yielding a drag event while dragging.
    pub fn pointer_moved(&mut self, position: Vec2) -> Option<InputEvent> {
        self.pointer = position;
        let drag = self.drag.as_mut()?;
        drag.end = position;
        Some(InputEvent::Drag {
            volume: drag.volume,
            start: drag.start,
            end: drag.end,
        })
    }

    /// Handles a pointer release, yielding a drop event if a drag ends.
    pub fn pointer_released(&mut self, position: Vec2) -> Option<InputEvent> {
        self.pointer = position;
        let drag = self.drag.take()?;
        Some(InputEvent::Drop {
            volume: drag.volume,
            end: position,
        })
    }

    /// Takes the selection and yields a delete event for it.
    pub fn delete_selection(&mut self) -> Option<InputEvent> {
        if self.selection.is_empty() {
            return None;
        }
        Some(InputEvent::Delete {
            selection: std::mem::take(&mut self.selection),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::volume::{Volume, VolumeKind};

    struct Single(VolumeHandle);

    impl InteractiveScene for Single {
        fn hit_test(&self, ray: &Ray) -> Option<Hit> {
            let distance = self.0.borrow().intersect_ray(ray)?;
            Some(Hit {
                volume: self.0.clone(),
                distance,
            })
        }
    }

    fn volume_at(z: f32) -> VolumeHandle {
        let v = VolumeHandle::new(Volume::new(VolumeKind::Box));
        v.borrow_mut().set_position(Vec3::new(0.0, 0.0, z));
        v
    }

    #[test]
    fn test_drag_lifecycle() {
        let mut input = InputHandler::new();
        let v = volume_at(0.0);
        assert!(input.pointer_moved(Vec2::new(1.0, 1.0)).is_none());

        input.start_dragging(&v);
        match input.pointer_moved(Vec2::new(5.0, 6.0)) {
            Some(InputEvent::Drag { volume, start, end }) => {
                assert_eq!(volume, v.id());
                assert_eq!(start, Vec2::new(1.0, 1.0));
                assert_eq!(end, Vec2::new(5.0, 6.0));
            }
            other => panic!("expected drag, got {other:?}"),
        }

        assert!(matches!(
            input.pointer_released(Vec2::new(5.0, 6.0)),
            Some(InputEvent::Drop { volume, .. }) if volume == v.id()
        ));
        assert!(!input.is_dragging());
        assert!(input.pointer_released(Vec2::ZERO).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let mut input = InputHandler::new();
        let far = volume_at(-10.0);
        let near = volume_at(-3.0);
        input.register_interactive_scene(Rc::new(RefCell::new(Single(far))));
        input.register_interactive_scene(Rc::new(RefCell::new(Single(near.clone()))));

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let picked = input.pointer_pressed(Vec2::ZERO, &ray);
        assert_eq!(picked, Some(near.id()));
        assert_eq!(input.drag().map(|d| d.volume), Some(near.id()));
        assert_eq!(input.selection().len(), 1);
    }

    #[test]
    fn test_register_twice_is_ignored() {
        let mut input = InputHandler::new();
        let scene: Rc<RefCell<dyn InteractiveScene>> =
            Rc::new(RefCell::new(Single(volume_at(0.0))));
        input.register_interactive_scene(Rc::clone(&scene));
        input.register_interactive_scene(Rc::clone(&scene));
        assert_eq!(input.interactive_scene_count(), 1);
        assert!(input.unregister_interactive_scene(&scene));
        assert_eq!(input.interactive_scene_count(), 0);
    }

    #[test]
    fn test_delete_takes_selection() {
        let mut input = InputHandler::new();
        assert!(input.delete_selection().is_none());

        input.select(Entity::Volume(volume_at(0.0)));
        input.select(Entity::Other("annotation".to_string()));
        match input.delete_selection() {
            Some(InputEvent::Delete { selection }) => assert_eq!(selection.len(), 2),
            other => panic!("expected delete, got {other:?}"),
        }
        assert!(input.selection().is_empty());
    }
}
