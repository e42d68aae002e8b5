//! Measurement volumes.
//!
//! A [`Volume`] is a unit shape placed in the scene by a [`Transform`]. Its
//! space is derived from the shape and the scale, and it carries a text
//! [`Label`] that the volume tool keeps up to date.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Ray;
use crate::error::{CloudscopeError, Result};
use crate::transform::Transform;

static NEXT_VOLUME_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(u64);

impl VolumeId {
    fn next() -> Self {
        Self(NEXT_VOLUME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The supported volume shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Unit cube centered at the origin.
    #[default]
    Box,
    /// Sphere of radius one centered at the origin.
    Sphere,
}

impl VolumeKind {
    /// Returns the lowercase name used in configuration and files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            VolumeKind::Box => "box",
            VolumeKind::Sphere => "sphere",
        }
    }

    /// Computes the space enclosed by this shape under `scale`.
    #[must_use]
    pub fn space(self, scale: Vec3) -> f64 {
        let product = (f64::from(scale.x) * f64::from(scale.y) * f64::from(scale.z)).abs();
        match self {
            VolumeKind::Box => product,
            VolumeKind::Sphere => 4.0 / 3.0 * std::f64::consts::PI * product,
        }
    }

    /// Intersects a ray given in the shape's local space.
    ///
    /// `direction` does not need to be normalized; the returned parameter is
    /// relative to its length.
    fn intersect_local(self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match self {
            VolumeKind::Box => {
                let mut t_min = f32::NEG_INFINITY;
                let mut t_max = f32::INFINITY;
                for axis in 0..3 {
                    let o = origin[axis];
                    let d = direction[axis];
                    if d.abs() < 1e-12 {
                        if !(-0.5..=0.5).contains(&o) {
                            return None;
                        }
                        continue;
                    }
                    let t1 = (-0.5 - o) / d;
                    let t2 = (0.5 - o) / d;
                    t_min = t_min.max(t1.min(t2));
                    t_max = t_max.min(t1.max(t2));
                }
                nearest_non_negative(t_min, t_max)
            }
            VolumeKind::Sphere => {
                let a = direction.dot(direction);
                if a < 1e-12 {
                    return None;
                }
                let b = 2.0 * origin.dot(direction);
                let c = origin.dot(origin) - 1.0;
                let discriminant = b * b - 4.0 * a * c;
                if discriminant < 0.0 {
                    return None;
                }
                let sqrt_d = discriminant.sqrt();
                nearest_non_negative((-b - sqrt_d) / (2.0 * a), (-b + sqrt_d) / (2.0 * a))
            }
        }
    }
}

fn nearest_non_negative(t_enter: f32, t_exit: f32) -> Option<f32> {
    if t_enter > t_exit || t_exit < 0.0 {
        None
    } else if t_enter >= 0.0 {
        Some(t_enter)
    } else {
        Some(t_exit)
    }
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VolumeKind {
    type Err = CloudscopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(VolumeKind::Box),
            "sphere" => Ok(VolumeKind::Sphere),
            _ => Err(CloudscopeError::UnknownVolumeKind(s.to_string())),
        }
    }
}

/// A text sprite anchored at the volume's center.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    text: String,
    scale: f32,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            scale: 1.0,
        }
    }
}

impl Label {
    /// Returns the displayed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the displayed text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Returns the uniform render scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Sets the uniform render scale.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }
}

/// A measurement volume.
#[derive(Debug, Clone)]
pub struct Volume {
    name: String,
    kind: VolumeKind,
    clip: bool,
    visible: bool,
    transform: Transform,
    label: Label,
}

impl Volume {
    /// Creates a volume of the given kind with an identity transform.
    pub fn new(kind: VolumeKind) -> Self {
        Self {
            name: "Volume".to_string(),
            kind,
            clip: false,
            visible: true,
            transform: Transform::identity(),
            label: Label::default(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets whether the volume clips the point cloud.
    #[must_use]
    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    /// Sets the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the shape of this volume.
    #[must_use]
    pub fn kind(&self) -> VolumeKind {
        self.kind
    }

    /// Returns whether the volume participates in point-cloud clipping.
    #[must_use]
    pub fn clip(&self) -> bool {
        self.clip
    }

    /// Sets whether the volume participates in point-cloud clipping.
    pub fn set_clip(&mut self, clip: bool) {
        self.clip = clip;
    }

    /// Returns whether the volume is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sets whether the volume is drawn.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Returns the transform.
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Returns the transform for modification.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Returns the world position of the volume's center.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    /// Moves the volume's center.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
    }

    /// Returns the scale.
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Sets the scale.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    /// Returns the enclosed space in the scene's length unit, cubed.
    #[must_use]
    pub fn space(&self) -> f64 {
        self.kind.space(self.transform.scale)
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Returns the label for modification.
    pub fn label_mut(&mut self) -> &mut Label {
        &mut self.label
    }

    /// Returns the world position of the label anchor.
    #[must_use]
    pub fn label_position(&self) -> Vec3 {
        self.transform.translation
    }

    /// Returns the ray parameter of the nearest hit, if any.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let world_to_local = self.transform.inverse_matrix()?;
        let origin = world_to_local.transform_point3(ray.origin);
        let direction = world_to_local.transform_vector3(ray.direction);
        self.kind.intersect_local(origin, direction)
    }

    /// Captures the persistent state of this volume.
    #[must_use]
    pub fn to_record(&self) -> VolumeRecord {
        VolumeRecord {
            name: self.name.clone(),
            kind: self.kind,
            clip: self.clip,
            visible: self.visible,
            position: self.transform.translation,
            rotation: self.transform.rotation,
            scale: self.transform.scale,
        }
    }

    /// Rebuilds a volume from a record.
    pub fn from_record(record: VolumeRecord) -> Self {
        Self {
            name: record.name,
            kind: record.kind,
            clip: record.clip,
            visible: record.visible,
            transform: Transform {
                translation: record.position,
                rotation: record.rotation,
                scale: record.scale,
            },
            label: Label::default(),
        }
    }
}

/// Serialized form of a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Display name.
    pub name: String,
    /// Shape.
    pub kind: VolumeKind,
    /// Clipping flag.
    #[serde(default)]
    pub clip: bool,
    /// Visibility flag.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Center position.
    pub position: Vec3,
    /// Orientation.
    #[serde(default = "default_rotation")]
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

fn default_visible() -> bool {
    true
}

fn default_rotation() -> Quat {
    Quat::IDENTITY
}

/// Shared ownership of a volume.
///
/// The scene registry owns volumes through handles; the id is fixed for the
/// handle's lifetime, so it can be read without borrowing the volume.
#[derive(Debug, Clone)]
pub struct VolumeHandle {
    id: VolumeId,
    inner: Rc<RefCell<Volume>>,
}

impl VolumeHandle {
    /// Wraps a volume and assigns it a fresh id.
    pub fn new(volume: Volume) -> Self {
        Self {
            id: VolumeId::next(),
            inner: Rc::new(RefCell::new(volume)),
        }
    }

    /// Returns the volume's id.
    #[must_use]
    pub fn id(&self) -> VolumeId {
        self.id
    }

    /// Borrows the volume.
    ///
    /// # Panics
    ///
    /// Panics if the volume is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Volume> {
        self.inner.borrow()
    }

    /// Borrows the volume mutably.
    ///
    /// # Panics
    ///
    /// Panics if the volume is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Volume> {
        self.inner.borrow_mut()
    }

    /// Creates a non-owning reference.
    #[must_use]
    pub fn downgrade(&self) -> WeakVolumeHandle {
        WeakVolumeHandle {
            id: self.id,
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for VolumeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VolumeHandle {}

/// Non-owning reference to a volume.
#[derive(Debug, Clone)]
pub struct WeakVolumeHandle {
    id: VolumeId,
    inner: Weak<RefCell<Volume>>,
}

impl WeakVolumeHandle {
    /// Returns the volume's id.
    #[must_use]
    pub fn id(&self) -> VolumeId {
        self.id
    }

    /// Returns the volume if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<VolumeHandle> {
        self.inner.upgrade().map(|inner| VolumeHandle { id: self.id, inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_space() {
        let mut volume = Volume::new(VolumeKind::Box);
        volume.set_scale(Vec3::new(2.0, 3.0, 4.0));
        assert!((volume.space() - 24.0).abs() < 1e-9);

        volume.set_scale(Vec3::new(-2.0, 3.0, 4.0));
        assert!((volume.space() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_space() {
        let volume = Volume::new(VolumeKind::Sphere);
        assert!((volume.space() - 4.0 / 3.0 * std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("box".parse::<VolumeKind>().unwrap(), VolumeKind::Box);
        assert_eq!(" Sphere ".parse::<VolumeKind>().unwrap(), VolumeKind::Sphere);
        let err = "cylinder".parse::<VolumeKind>().unwrap_err();
        assert!(matches!(err, CloudscopeError::UnknownVolumeKind(ref s) if s == "cylinder"));
    }

    #[test]
    fn test_defaults() {
        let volume = Volume::new(VolumeKind::default());
        assert_eq!(volume.kind(), VolumeKind::Box);
        assert_eq!(volume.name(), "Volume");
        assert!(!volume.clip());
        assert!(volume.is_visible());
    }

    #[test]
    fn test_box_ray_intersection() {
        let mut volume = Volume::new(VolumeKind::Box);
        volume.set_position(Vec3::new(0.0, 0.0, -5.0));
        volume.set_scale(Vec3::splat(2.0));

        let hit = volume.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).unwrap();
        assert!((hit - 4.0).abs() < 1e-4);

        let miss = volume.intersect_ray(&Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Z));
        assert!(miss.is_none());

        let behind = volume.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::Z));
        assert!(behind.is_none());
    }

    #[test]
    fn test_sphere_ray_intersection() {
        let mut volume = Volume::new(VolumeKind::Sphere);
        volume.set_position(Vec3::new(0.0, 0.0, -10.0));
        volume.set_scale(Vec3::splat(3.0));

        let hit = volume.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).unwrap();
        assert!((hit - 7.0).abs() < 1e-4);

        // From inside the sphere the exit point is reported
        let inside = volume
            .intersect_ray(&Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::X))
            .unwrap();
        assert!((inside - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_handle_identity() {
        let a = VolumeHandle::new(Volume::new(VolumeKind::Box));
        let b = VolumeHandle::new(Volume::new(VolumeKind::Box));
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());

        let weak = a.downgrade();
        assert_eq!(weak.upgrade().map(|h| h.id()), Some(a.id()));
        drop(a);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_record_roundtrip_keeps_state() {
        let volume = Volume::new(VolumeKind::Sphere)
            .with_name("tank")
            .with_clip(true)
            .with_transform(Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let json = serde_json::to_string(&volume.to_record()).unwrap();
        let restored = Volume::from_record(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.name(), "tank");
        assert_eq!(restored.kind(), VolumeKind::Sphere);
        assert!(restored.clip());
        assert_eq!(restored.position(), Vec3::new(1.0, 2.0, 3.0));
    }
}
