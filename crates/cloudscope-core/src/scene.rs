//! Scene registry for the volumes of the active scene.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::camera::Camera;
use crate::error::Result;
use crate::events::{EventDispatcher, ListenerId};
use crate::volume::{Volume, VolumeHandle, VolumeId, VolumeRecord};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Notification emitted when the registry's membership changes.
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// A volume was added.
    VolumeAdded {
        /// The added volume.
        volume: VolumeHandle,
    },
    /// A volume was removed.
    VolumeRemoved {
        /// The removed volume.
        volume: VolumeHandle,
    },
}

impl SceneEvent {
    /// Returns the volume the event is about.
    #[must_use]
    pub fn volume(&self) -> &VolumeHandle {
        match self {
            SceneEvent::VolumeAdded { volume } | SceneEvent::VolumeRemoved { volume } => volume,
        }
    }
}

/// The canonical collection of volumes in a scene.
///
/// Volumes keep insertion order. Every membership change is reported to
/// subscribed listeners after the registry has been updated.
pub struct Scene {
    id: SceneId,
    name: String,
    volumes: Vec<VolumeHandle>,
    camera: Option<Camera>,
    listeners: EventDispatcher<SceneEvent>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("volumes", &self.volumes.len())
            .field("camera", &self.camera.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("scene")
    }
}

impl Scene {
    /// Creates an empty scene without a camera.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            volumes: Vec::new(),
            camera: None,
            listeners: EventDispatcher::new(),
        }
    }

    /// Sets the active camera.
    #[must_use]
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Returns the scene id.
    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Returns the scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the active camera, if any.
    #[must_use]
    pub fn active_camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Returns the active camera for modification, if any.
    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Replaces the active camera.
    pub fn set_active_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    /// Subscribes to membership changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&SceneEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Removes a membership listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Returns the number of membership listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Adds a volume and notifies listeners.
    ///
    /// Adding a volume that is already present does nothing.
    pub fn add_volume(&mut self, volume: VolumeHandle) {
        if self.contains(volume.id()) {
            log::debug!("volume {} already in {}", volume.id(), self.id);
            return;
        }
        log::debug!("adding volume {} to {}", volume.id(), self.id);
        self.volumes.push(volume.clone());
        self.listeners.dispatch(&SceneEvent::VolumeAdded { volume });
    }

    /// Removes a volume and notifies listeners.
    pub fn remove_volume(&mut self, id: VolumeId) -> Option<VolumeHandle> {
        let index = self.volumes.iter().position(|v| v.id() == id)?;
        let volume = self.volumes.remove(index);
        log::debug!("removed volume {} from {}", id, self.id);
        self.listeners.dispatch(&SceneEvent::VolumeRemoved {
            volume: volume.clone(),
        });
        Some(volume)
    }

    /// Removes every volume, notifying listeners once per volume.
    pub fn clear_volumes(&mut self) {
        let ids: Vec<VolumeId> = self.volumes.iter().map(VolumeHandle::id).collect();
        for id in ids {
            self.remove_volume(id);
        }
    }

    /// Returns whether a volume is in the registry.
    #[must_use]
    pub fn contains(&self, id: VolumeId) -> bool {
        self.volumes.iter().any(|v| v.id() == id)
    }

    /// Gets a volume by id.
    #[must_use]
    pub fn get(&self, id: VolumeId) -> Option<&VolumeHandle> {
        self.volumes.iter().find(|v| v.id() == id)
    }

    /// Returns the volumes in insertion order.
    #[must_use]
    pub fn volumes(&self) -> &[VolumeHandle] {
        &self.volumes
    }

    /// Returns the number of volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Returns true if the registry holds no volume.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Serializes all volumes as a JSON array.
    pub fn volumes_to_json(&self) -> Result<String> {
        let records: Vec<VolumeRecord> = self
            .volumes
            .iter()
            .map(|v| v.borrow().to_record())
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Adds the volumes of a JSON array produced by [`Scene::volumes_to_json`].
    ///
    /// Returns the handles of the new volumes.
    pub fn load_volumes_json(&mut self, json: &str) -> Result<Vec<VolumeHandle>> {
        let records: Vec<VolumeRecord> = serde_json::from_str(json)?;
        let handles: Vec<VolumeHandle> = records
            .into_iter()
            .map(|record| VolumeHandle::new(Volume::from_record(record)))
            .collect();
        for handle in &handles {
            self.add_volume(handle.clone());
        }
        log::info!("loaded {} volumes into {}", handles.len(), self.id);
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;
    use crate::error::CloudscopeError;
    use crate::volume::VolumeKind;

    fn handle() -> VolumeHandle {
        VolumeHandle::new(Volume::new(VolumeKind::Box))
    }

    #[test]
    fn test_add_and_remove_notify() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new("test");
        let log = Rc::clone(&seen);
        scene.subscribe(move |e| {
            let tag = match e {
                SceneEvent::VolumeAdded { .. } => "added",
                SceneEvent::VolumeRemoved { .. } => "removed",
            };
            log.borrow_mut().push((tag, e.volume().id()));
        });

        let v = handle();
        scene.add_volume(v.clone());
        assert!(scene.contains(v.id()));
        assert!(scene.remove_volume(v.id()).is_some());
        assert!(scene.is_empty());

        assert_eq!(*seen.borrow(), vec![("added", v.id()), ("removed", v.id())]);
    }

    #[test]
    fn test_duplicate_add_is_ignored() {
        let count = Rc::new(RefCell::new(0));
        let mut scene = Scene::new("test");
        let c = Rc::clone(&count);
        scene.subscribe(move |_| *c.borrow_mut() += 1);

        let v = handle();
        scene.add_volume(v.clone());
        scene.add_volume(v);
        assert_eq!(scene.len(), 1);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_remove_missing_volume() {
        let mut scene = Scene::new("test");
        let v = handle();
        assert!(scene.remove_volume(v.id()).is_none());
        assert!(scene.get(v.id()).is_none());
    }

    #[test]
    fn test_unsubscribed_listener_is_silent() {
        let count = Rc::new(RefCell::new(0));
        let mut scene = Scene::new("test");
        let c = Rc::clone(&count);
        let id = scene.subscribe(move |_| *c.borrow_mut() += 1);
        assert!(scene.unsubscribe(id));

        scene.add_volume(handle());
        assert_eq!(*count.borrow(), 0);
        assert_eq!(scene.listener_count(), 0);
    }

    #[test]
    fn test_json_export_import() {
        let mut scene = Scene::new("source");
        let v = handle();
        v.borrow_mut().set_name("pile");
        v.borrow_mut().set_scale(Vec3::new(2.0, 2.0, 2.0));
        scene.add_volume(v);

        let json = scene.volumes_to_json().unwrap();
        let mut other = Scene::new("target");
        let loaded = other.load_volumes_json(&json).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(other.len(), 1);
        let restored = loaded[0].borrow();
        assert_eq!(restored.name(), "pile");
        assert!((restored.space() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut scene = Scene::new("test");
        assert!(matches!(
            scene.load_volumes_json("not json"),
            Err(CloudscopeError::JsonError(_))
        ));
    }
}
