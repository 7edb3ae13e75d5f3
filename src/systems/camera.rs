use bevy::prelude::*;
use bevy::input::mouse::MouseWheel;

use crate::config::{ORBIT_DAMPING, ORBIT_MAX_RADIUS, ORBIT_MIN_RADIUS};
use crate::systems::frame::FrameSet;

pub struct OrbitCamPlugin;

impl Plugin for OrbitCamPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, update.in_set(FrameSet::Controls));
    }
}

// camera component
#[derive(Component, Debug)]
pub struct OrbitCamera {
    pub radius: f32,
    pub speed: f32,
    pub angle: f32,
    pub v_angle: f32,
    pub is_dragging: bool,
    pub target: Vec3,

    pub min_radius: f32,
    pub max_radius: f32,

    // damping: input lands in the pending deltas and bleeds out over ticks
    pub damping: f32,
    pub pending_angle: f32,
    pub pending_v_angle: f32,
    pub pending_radius: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            radius: 5.0,
            speed: 0.5,
            angle: std::f32::consts::FRAC_PI_2,
            v_angle: 0.0,
            is_dragging: false,
            target: Vec3::ZERO,

            min_radius: ORBIT_MIN_RADIUS,
            max_radius: ORBIT_MAX_RADIUS,

            damping: ORBIT_DAMPING,
            pending_angle: 0.0,
            pending_v_angle: 0.0,
            pending_radius: 0.0,
        }
    }
}

impl OrbitCamera {
    pub fn new(radius: f32, speed: f32) -> Self {
        Self {
            radius,
            speed,
            ..default()
        }
    }

    // set target point for the camera to orbit
    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    // queue a drag, in pixels
    pub fn drag(&mut self, delta: Vec2) {
        self.pending_angle += delta.x * self.speed * 0.01;
        self.pending_v_angle += delta.y * self.speed * 0.01;
    }

    // queue a zoom, positive scroll moves closer
    pub fn zoom(&mut self, scroll: f32) {
        self.pending_radius -= scroll * self.radius * 0.1;
    }

    /// Apply one tick worth of the pending motion and decay the rest.
    /// Without damping the whole delta is applied at once.
    pub fn step(&mut self) {
        let factor = if self.damping > 0.0 { self.damping } else { 1.0 };

        self.angle += self.pending_angle * factor;
        self.v_angle = (self.v_angle + self.pending_v_angle * factor).clamp(-1.5, 1.5);
        self.radius = (self.radius + self.pending_radius * factor)
            .clamp(self.min_radius, self.max_radius);

        let keep = 1.0 - factor;
        self.pending_angle *= keep;
        self.pending_v_angle *= keep;
        self.pending_radius *= keep;
    }

    // calculate world position from spherical coordinates
    // https://en.wikipedia.org/wiki/Spherical_coordinate_system#Cartesian_coordinates
    pub fn calculate_position(&self) -> Vec3 {
        let x = self.radius * self.v_angle.cos() * self.angle.cos();
        let y = self.radius * self.v_angle.sin();
        let z = self.radius * self.v_angle.cos() * self.angle.sin();

        self.target + Vec3::new(x, y, z)
    }
}

fn update(
    mut camera_query: Query<(&mut Transform, &mut OrbitCamera)>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<CursorMoved>,
    mut scroll_events: EventReader<MouseWheel>,
    ui_nodes: Query<&Interaction>,
) {
    // the panel owns the pointer while it hovers a widget
    let over_ui = ui_nodes.iter().any(|interaction| *interaction != Interaction::None);

    let drag: Vec2 = mouse_motion.read().filter_map(|motion| motion.delta).sum();
    let scroll: f32 = scroll_events.read().map(|scroll| scroll.y).sum();

    for (mut transform, mut camera) in camera_query.iter_mut() {
        // handle mouse drag
        if mouse_buttons.just_pressed(MouseButton::Left) && !over_ui {
            camera.is_dragging = true;
        }
        if !mouse_buttons.pressed(MouseButton::Left) {
            camera.is_dragging = false;
        }

        if camera.is_dragging {
            camera.drag(drag);
        }
        if !over_ui {
            camera.zoom(scroll);
        }

        camera.step();

        // update camera position/orientation
        transform.translation = camera.calculate_position();
        transform.look_at(camera.target, Vec3::Y);
    }
}
