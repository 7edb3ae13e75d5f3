//! Per-frame update loop. Bevy's Update schedule is the frame timer, one run
//! per displayed frame. Spin is accumulated per tick, not per second, so the
//! apparent speed follows the display refresh rate.

use std::f64::consts::TAU;

use bevy::prelude::*;

use crate::config::{CLOUD_SPEED_FACTOR, STARFIELD_SPIN};
use crate::systems::params::EarthParams;

pub struct FramePlugin;

impl Plugin for FramePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FrameTicks>()
            .configure_sets(Update, (FrameSet::Spin, FrameSet::Controls).chain())
            .add_systems(Update, (count_ticks, spin_bodies).in_set(FrameSet::Spin))
            .add_systems(Update, request_shutdown)
            .add_systems(Last, log_shutdown);
    }
}

/// Ordering of the per-tick work; rendering follows after Update.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Spin,
    Controls,
}

#[derive(Resource, Default, Debug)]
pub struct FrameTicks(pub u64);

/// How fast a body turns about its local Y axis each tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpinRate {
    /// multiple of the live rotation speed parameter
    Scaled(f32),
    /// constant radians per tick, ignores the panel
    Fixed(f32),
}

impl SpinRate {
    pub const BASE: SpinRate = SpinRate::Scaled(1.0);
    pub const CLOUDS: SpinRate = SpinRate::Scaled(CLOUD_SPEED_FACTOR);
    pub const STARFIELD: SpinRate = SpinRate::Fixed(STARFIELD_SPIN);

    pub fn per_tick(self, rotation_speed: f32) -> f32 {
        match self {
            SpinRate::Scaled(factor) => rotation_speed * factor,
            SpinRate::Fixed(rate) => rate,
        }
    }
}

/// Accumulated spin of one body.
/// The total is kept in f64 so per-tick increments survive long runs;
/// the transform only ever sees it wrapped into one turn.
#[derive(Component, Clone, Copy, Debug)]
pub struct Spin {
    pub rate: SpinRate,
    pub angle: f64,
}

impl Spin {
    pub fn new(rate: SpinRate) -> Self {
        Self { rate, angle: 0.0 }
    }
}

fn count_ticks(mut ticks: ResMut<FrameTicks>) {
    ticks.0 += 1;
}

pub fn spin_bodies(params: Res<EarthParams>, mut bodies: Query<(&mut Transform, &mut Spin)>) {
    let speed = params.rotation_speed();

    for (mut transform, mut spin) in bodies.iter_mut() {
        spin.angle += f64::from(spin.rate.per_tick(speed));
        transform.rotation = Quat::from_rotation_y(spin.angle.rem_euclid(TAU) as f32);
    }
}

// explicit stop hook, closing the window goes through the same exit path
fn request_shutdown(keys: Res<ButtonInput<KeyCode>>, mut exit: EventWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}

fn log_shutdown(mut exits: EventReader<AppExit>, ticks: Res<FrameTicks>) {
    if exits.read().next().is_some() {
        info!("Shutting down after {} ticks", ticks.0);
    }
}
