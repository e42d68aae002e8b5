//! The overlay scene: a render-only mirror of the registry's volumes.

use std::collections::HashSet;

use cloudscope_core::{
    Hit, InteractiveScene, Ray, Scene, SceneEvent, VolumeHandle, VolumeId, VolumeUniforms,
    WeakVolumeHandle,
};

/// Name of the overlay scene submitted to the renderer.
pub const OVERLAY_SCENE_NAME: &str = "scene_volume";

/// Base color of measurement volumes.
pub const VOLUME_COLOR: [f32; 3] = [0.0, 1.0, 0.0];

/// Holds non-owning references to the volumes the tool draws.
///
/// Membership follows the scene registry through [`OverlayScene::apply`];
/// [`OverlayScene::is_mirror_of`] checks that it does.
#[derive(Debug, Clone)]
pub struct OverlayScene {
    name: String,
    nodes: Vec<WeakVolumeHandle>,
}

impl Default for OverlayScene {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayScene {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self {
            name: OVERLAY_SCENE_NAME.to_string(),
            nodes: Vec::new(),
        }
    }

    /// Returns the overlay's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a render node for a volume. Returns `false` if it was already present.
    pub fn add(&mut self, volume: &VolumeHandle) -> bool {
        if self.contains(volume.id()) {
            return false;
        }
        self.nodes.push(volume.downgrade());
        true
    }

    /// Removes the render node of a volume. Returns `false` if it was absent.
    pub fn remove(&mut self, id: VolumeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id() != id);
        self.nodes.len() != before
    }

    /// Removes every render node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Applies a registry membership change.
    pub fn apply(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::VolumeAdded { volume } => {
                self.add(volume);
            }
            SceneEvent::VolumeRemoved { volume } => {
                self.remove(volume.id());
            }
        }
    }

    /// Replaces the overlay content with the volumes of `scene`.
    pub fn reseed(&mut self, scene: &Scene) {
        self.nodes = scene.volumes().iter().map(VolumeHandle::downgrade).collect();
    }

    /// Returns whether a volume has a render node.
    #[must_use]
    pub fn contains(&self, id: VolumeId) -> bool {
        self.nodes.iter().any(|node| node.id() == id)
    }

    /// Returns the number of render nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no render nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the ids of all render nodes.
    pub fn ids(&self) -> impl Iterator<Item = VolumeId> + '_ {
        self.nodes.iter().map(WeakVolumeHandle::id)
    }

    /// Returns the volumes that are still alive.
    pub fn volumes(&self) -> impl Iterator<Item = VolumeHandle> + '_ {
        self.nodes.iter().filter_map(WeakVolumeHandle::upgrade)
    }

    /// Returns whether the overlay holds exactly the volumes of `scene`.
    #[must_use]
    pub fn is_mirror_of(&self, scene: &Scene) -> bool {
        let mirrored: HashSet<VolumeId> = self.ids().collect();
        let registered: HashSet<VolumeId> = scene.volumes().iter().map(VolumeHandle::id).collect();
        mirrored.len() == self.nodes.len() && mirrored == registered
    }

    /// Builds the draw items of the visible volumes.
    #[must_use]
    pub fn draw_items(&self) -> Vec<VolumeUniforms> {
        self.volumes()
            .filter_map(|handle| {
                let volume = handle.borrow();
                if !volume.is_visible() {
                    return None;
                }
                let uniforms = VolumeUniforms {
                    model: volume.transform().to_matrix().to_cols_array_2d(),
                    color: VOLUME_COLOR,
                    clip: if volume.clip() { 1.0 } else { 0.0 },
                };
                Some(uniforms)
            })
            .collect()
    }
}

impl InteractiveScene for OverlayScene {
    fn hit_test(&self, ray: &Ray) -> Option<Hit> {
        self.volumes()
            .filter_map(|handle| {
                let distance = {
                    let volume = handle.borrow();
                    if !volume.is_visible() {
                        return None;
                    }
                    volume.intersect_ray(ray)?
                };
                Some(Hit {
                    volume: handle,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[cfg(test)]
mod tests {
    use cloudscope_core::{Vec3, Volume, VolumeKind};

    use super::*;

    fn volume_at(z: f32) -> VolumeHandle {
        let handle = VolumeHandle::new(Volume::new(VolumeKind::Box));
        handle.borrow_mut().set_position(Vec3::new(0.0, 0.0, z));
        handle
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut overlay = OverlayScene::new();
        let v = volume_at(0.0);
        assert!(overlay.add(&v));
        assert!(!overlay.add(&v));
        assert_eq!(overlay.len(), 1);
        assert!(overlay.remove(v.id()));
        assert!(!overlay.remove(v.id()));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_apply_and_mirror_check() {
        let mut scene = Scene::new("test");
        let mut overlay = OverlayScene::new();
        let a = volume_at(0.0);
        let b = volume_at(1.0);

        scene.add_volume(a.clone());
        overlay.apply(&SceneEvent::VolumeAdded { volume: a.clone() });
        assert!(overlay.is_mirror_of(&scene));

        scene.add_volume(b.clone());
        assert!(!overlay.is_mirror_of(&scene));
        overlay.apply(&SceneEvent::VolumeAdded { volume: b });
        assert!(overlay.is_mirror_of(&scene));

        scene.remove_volume(a.id());
        overlay.apply(&SceneEvent::VolumeRemoved { volume: a });
        assert!(overlay.is_mirror_of(&scene));
    }

    #[test]
    fn test_reseed() {
        let mut scene = Scene::new("test");
        scene.add_volume(volume_at(0.0));
        scene.add_volume(volume_at(2.0));

        let mut overlay = OverlayScene::new();
        overlay.add(&volume_at(5.0));
        overlay.reseed(&scene);
        assert!(overlay.is_mirror_of(&scene));
    }

    #[test]
    fn test_draw_items_skip_hidden_volumes() {
        let mut overlay = OverlayScene::new();
        let shown = volume_at(0.0);
        shown.borrow_mut().set_clip(true);
        let hidden = volume_at(1.0);
        hidden.borrow_mut().set_visible(false);
        overlay.add(&shown);
        overlay.add(&hidden);

        let items = overlay.draw_items();
        assert_eq!(items.len(), 1);
        assert!((items[0].clip - 1.0).abs() < f32::EPSILON);
        assert_eq!(items[0].color, VOLUME_COLOR);
    }

    #[test]
    fn test_dropped_volumes_are_not_drawn() {
        let mut overlay = OverlayScene::new();
        {
            let temporary = volume_at(0.0);
            overlay.add(&temporary);
        }
        assert_eq!(overlay.len(), 1);
        assert!(overlay.draw_items().is_empty());
    }

    #[test]
    fn test_hit_test_returns_nearest() {
        let mut overlay = OverlayScene::new();
        let far = volume_at(-10.0);
        let near = volume_at(-4.0);
        overlay.add(&far);
        overlay.add(&near);

        let hit = overlay.hit_test(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).unwrap();
        assert_eq!(hit.volume.id(), near.id());
        assert!((hit.distance - 3.5).abs() < 1e-4);
    }
}
