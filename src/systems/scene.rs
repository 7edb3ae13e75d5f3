//! Camera, sun and viewport bookkeeping. The earth and the starfield are
//! composed by their own plugins.

use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};

use crate::config::{
    CAMERA_DISTANCE, CAMERA_FAR, CAMERA_FOV_DEG, CAMERA_NEAR, ORBIT_DAMPING, SUN_ILLUMINANCE,
    SUN_POSITION,
};
use crate::systems::camera::OrbitCamera;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::BLACK))
            .init_resource::<OutputSurface>()
            .add_systems(Startup, start)
            .add_systems(Update, on_window_resized);
    }
}

/// Size of the surface the camera renders into, in logical pixels
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct OutputSurface {
    pub width: f32,
    pub height: f32,
}

pub fn camera_projection(aspect_ratio: f32) -> Projection {
    Projection::Perspective(PerspectiveProjection {
        fov: CAMERA_FOV_DEG.to_radians(),
        aspect_ratio,
        near: CAMERA_NEAR,
        far: CAMERA_FAR,
        ..default()
    })
}

/// Keep projection and surface in step with a new viewport size.
/// Degenerate sizes (minimised windows) are ignored.
pub fn apply_viewport(
    projection: &mut Projection,
    surface: &mut OutputSurface,
    width: f32,
    height: f32,
) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }

    if let Projection::Perspective(perspective) = projection {
        perspective.aspect_ratio = width / height;
    }
    surface.width = width;
    surface.height = height;
}

fn start(
    mut commands: Commands,
    mut surface: ResMut<OutputSurface>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let mut projection = camera_projection(1.0);
    if let Ok(window) = windows.single() {
        apply_viewport(&mut projection, &mut surface, window.width(), window.height());
    }

    // spawn camera
    commands.spawn((
        Camera3d::default(),
        projection,
        Tonemapping::AcesFitted,
        Transform::from_xyz(0.0, 0.0, CAMERA_DISTANCE).looking_at(Vec3::ZERO, Vec3::Y),
        OrbitCamera::new(CAMERA_DISTANCE, 0.5)
            .with_target(Vec3::ZERO)
            .with_damping(ORBIT_DAMPING),
    ));

    // sun light, fixed direction
    commands.spawn((
        DirectionalLight {
            illuminance: SUN_ILLUMINANCE,
            ..default()
        },
        Transform::from_translation(Vec3::from(SUN_POSITION)).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    info!("Scene composed: {}x{} viewport", surface.width, surface.height);
}

// every resize event is applied, no debouncing
pub fn on_window_resized(
    mut events: EventReader<WindowResized>,
    mut cameras: Query<&mut Projection, With<OrbitCamera>>,
    mut surface: ResMut<OutputSurface>,
) {
    for event in events.read() {
        for mut projection in cameras.iter_mut() {
            apply_viewport(&mut projection, &mut surface, event.width, event.height);
        }
    }
}
