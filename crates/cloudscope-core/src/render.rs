//! Renderer seam and GPU-facing draw data.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, UVec2, Vec3};

use crate::camera::Camera;
use crate::error::{CloudscopeError, Result};

/// Identifies an offscreen render target owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u64);

/// GPU-compatible per-volume uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeUniforms {
    /// Model matrix of the unit shape.
    pub model: [[f32; 4]; 4],
    /// Base color.
    pub color: [f32; 3],
    /// 1.0 for clip volumes, 0.0 otherwise.
    pub clip: f32,
}

impl Default for VolumeUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0, 1.0, 1.0],
            clip: 0.0,
        }
    }
}

/// A batch of draw items submitted in one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderScene<'a> {
    /// Name of the submitted scene.
    pub name: &'a str,
    /// Per-volume uniforms.
    pub items: &'a [VolumeUniforms],
}

/// The host's rendering engine.
pub trait Renderer {
    /// Returns the drawable size in pixels.
    fn size(&self) -> UVec2;

    /// Returns the currently bound render target (`None` = screen).
    fn render_target(&self) -> Option<RenderTargetId>;

    /// Binds a render target (`None` = screen).
    fn set_render_target(&mut self, target: Option<RenderTargetId>);

    /// Draws a scene with the given camera into the bound target.
    fn render(&mut self, scene: &RenderScene<'_>, camera: &Camera) -> Result<()>;
}

/// A recorded [`HeadlessRenderer::render`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    /// Name of the rendered scene.
    pub scene_name: String,
    /// Number of draw items.
    pub item_count: usize,
    /// Target bound while rendering.
    pub target: Option<RenderTargetId>,
    /// Camera position used.
    pub camera_position: Vec3,
}

/// A renderer that records calls instead of drawing.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    size: UVec2,
    target: Option<RenderTargetId>,
    calls: Vec<RenderCall>,
    failing: bool,
}

impl HeadlessRenderer {
    /// Creates a headless renderer with the given drawable size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
            target: None,
            calls: Vec::new(),
            failing: false,
        }
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Makes every following render call fail (after being recorded).
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl Renderer for HeadlessRenderer {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn render_target(&self) -> Option<RenderTargetId> {
        self.target
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.target = target;
    }

    fn render(&mut self, scene: &RenderScene<'_>, camera: &Camera) -> Result<()> {
        self.calls.push(RenderCall {
            scene_name: scene.name.to_string(),
            item_count: scene.items.len(),
            target: self.target,
            camera_position: camera.position,
        });
        if self.failing {
            return Err(CloudscopeError::RenderError(format!(
                "headless renderer set to fail while drawing '{}'",
                scene.name
            )));
        }
        Ok(())
    }
}

/// Lets a host keep a handle to a renderer it gave to the viewer.
impl<R: Renderer> Renderer for Rc<RefCell<R>> {
    fn size(&self) -> UVec2 {
        self.borrow().size()
    }

    fn render_target(&self) -> Option<RenderTargetId> {
        self.borrow().render_target()
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.borrow_mut().set_render_target(target);
    }

    fn render(&mut self, scene: &RenderScene<'_>, camera: &Camera) -> Result<()> {
        self.borrow_mut().render(scene, camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_are_plain_data() {
        let uniforms = VolumeUniforms::default();
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(bytes.len(), std::mem::size_of::<VolumeUniforms>());
        assert_eq!(bytes.len(), 80);
    }

    #[test]
    fn test_headless_records_calls() {
        let mut renderer = HeadlessRenderer::new(640, 480);
        renderer.set_render_target(Some(RenderTargetId(3)));
        let items = [VolumeUniforms::default(); 2];
        renderer
            .render(&RenderScene { name: "overlay", items: &items }, &Camera::default())
            .unwrap();

        assert_eq!(renderer.calls().len(), 1);
        assert_eq!(renderer.calls()[0].item_count, 2);
        assert_eq!(renderer.calls()[0].target, Some(RenderTargetId(3)));
    }

    #[test]
    fn test_failing_renderer() {
        let mut renderer = HeadlessRenderer::new(1, 1);
        renderer.set_failing(true);
        let result = renderer.render(&RenderScene { name: "x", items: &[] }, &Camera::default());
        assert!(matches!(result, Err(CloudscopeError::RenderError(_))));
    }
}
