#![allow(clippy::cast_precision_loss)]
//! Volume measurement demonstration on a synthetic terrain.
//!
//! This demo shows:
//! - Inserting a box and dropping it on the point cloud
//! - Replacing an in-flight insertion with a sphere
//! - Label text in internal and display units
//! - Deleting a volume and exporting the scene
//!
//! Run with: cargo run --example `volume_demo`

use std::cell::RefCell;
use std::rc::Rc;

use cloudscope::*;

/// Generate a gently rolling terrain as a grid of points.
fn generate_terrain(size: usize, spacing: f32) -> Vec<Vec3> {
    let half = size as f32 * spacing / 2.0;
    let mut points = Vec::with_capacity(size * size);
    for i in 0..size {
        for j in 0..size {
            let x = i as f32 * spacing - half;
            let z = j as f32 * spacing - half;
            let y = (x * 0.3).sin() * (z * 0.2).cos();
            points.push(Vec3::new(x, y, z));
        }
    }
    points
}

fn print_labels(viewer: &Viewer) {
    for handle in viewer.scene().volumes() {
        let volume = handle.borrow();
        println!(
            "  {} {} ({}): {}  [label scale {:.2}]",
            volume.kind(),
            handle.id(),
            volume.name(),
            volume.label().text(),
            volume.label().scale()
        );
    }
}

fn main() -> Result<()> {
    init_logging();

    let renderer = Rc::new(RefCell::new(HeadlessRenderer::new(1280, 720)));
    let picker = PointSetPicker::new(generate_terrain(64, 0.5));
    let camera = Camera::new(1280.0 / 720.0).looking_at(Vec3::new(0.0, 12.0, 18.0), Vec3::ZERO);
    let mut viewer = Viewer::new(Box::new(Rc::clone(&renderer)), Box::new(picker))
        .with_scene(Scene::new("terrain").with_camera(camera));

    let mut tool = VolumeTool::new(&mut viewer);
    let events = tool.subscribe_events();

    // Box dropped at the center of the screen
    let stockpile = tool.start_insertion(
        &mut viewer,
        InsertionOptions::new().with_name("Stockpile"),
    );
    viewer.pointer_moved(Vec2::new(640.0, 360.0), &mut [&mut tool]);
    viewer.pointer_released(Vec2::new(640.0, 360.0), &mut [&mut tool]);
    stockpile.borrow_mut().set_scale(Vec3::new(4.0, 1.5, 3.0));

    // A sphere whose insertion is replaced by a clip box
    tool.start_insertion(
        &mut viewer,
        InsertionOptions::new().with_kind(VolumeKind::Sphere),
    );
    viewer.pointer_moved(Vec2::new(500.0, 420.0), &mut [&mut tool]);
    let clip = tool.start_insertion_of(&mut viewer, "box", Some("Clip"))?;
    clip.borrow_mut().set_clip(true);
    viewer.pointer_moved(Vec2::new(800.0, 300.0), &mut [&mut tool]);
    viewer.pointer_released(Vec2::new(800.0, 300.0), &mut [&mut tool]);

    viewer.frame(&mut [&mut tool], &ScenePass::default());
    println!("Volumes in meters:");
    print_labels(&viewer);

    viewer.options_mut().length_unit_display = LengthUnit::feet();
    viewer.frame(
        &mut [&mut tool],
        &ScenePass {
            render_target: Some(RenderTargetId(1)),
        },
    );
    println!("Volumes in feet:");
    print_labels(&viewer);

    tool.remove_volume(&mut viewer, clip.id())?;
    println!(
        "After deleting the clip box: {} volumes, overlay mirrors scene: {}",
        viewer.scene().len(),
        tool.overlay().is_mirror_of(viewer.scene())
    );

    println!("Events:");
    for event in events.drain() {
        println!("  {} {}", event.name(), event.volume().id());
    }

    println!("Render calls:");
    for call in renderer.borrow().calls() {
        println!(
            "  {} with {} items into {:?}",
            call.scene_name, call.item_count, call.target
        );
    }

    println!("Scene export:\n{}", viewer.scene().volumes_to_json()?);

    tool.shutdown(&mut viewer);
    Ok(())
}
