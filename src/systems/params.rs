//! Live tunable parameter set shared by the panel and the frame loop.
//! Values only ever enter through `EarthParams::set`, which clamps and snaps,
//! so the stored state is always inside each control's declared range.

use bevy::prelude::*;

use crate::settings::InitialParams;

pub struct ParamsPlugin;

impl Plugin for ParamsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ParamChanged>()
            .add_systems(Update, log_param_changes);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    StarsCount,
    RotationSpeed,
    TiltAngle,
    GlowScale,
}

impl ParamKey {
    pub const ALL: [ParamKey; 4] = [
        ParamKey::StarsCount,
        ParamKey::RotationSpeed,
        ParamKey::TiltAngle,
        ParamKey::GlowScale,
    ];

    pub fn spec(self) -> &'static ParamSpec {
        match self {
            ParamKey::StarsCount => &STARS_COUNT,
            ParamKey::RotationSpeed => &ROTATION_SPEED,
            ParamKey::TiltAngle => &TILT_ANGLE,
            ParamKey::GlowScale => &GLOW_SCALE,
        }
    }
}

/// Declared range of one control
#[derive(Debug, PartialEq)]
pub struct ParamSpec {
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: Option<f32>,
    /// increment of a single panel button press
    pub nudge: f32,
    /// decimals shown in the panel
    pub precision: usize,
}

const STARS_COUNT: ParamSpec = ParamSpec {
    label: "Stars Count",
    min: 1000.0,
    max: 20_000.0,
    step: Some(100.0),
    nudge: 100.0,
    precision: 0,
};

const ROTATION_SPEED: ParamSpec = ParamSpec {
    label: "Planet Rotation Speed",
    min: 0.001,
    max: 0.01,
    step: None,
    nudge: 0.0005,
    precision: 4,
};

const TILT_ANGLE: ParamSpec = ParamSpec {
    label: "Planet Tilt",
    min: -90.0,
    max: 90.0,
    step: None,
    nudge: 1.0,
    precision: 1,
};

const GLOW_SCALE: ParamSpec = ParamSpec {
    label: "Glow Scale",
    min: 1.01,
    max: 1.05,
    step: Some(0.01),
    nudge: 0.01,
    precision: 2,
};

impl ParamSpec {
    /// Clamp into range and snap onto the step grid.
    /// Values already on the grid come back bit-exact.
    pub fn constrain(&self, value: f32) -> f32 {
        let mut value = value.clamp(self.min, self.max);

        if let Some(step) = self.step {
            let snapped = self.min + ((value - self.min) / step).round() * step;
            if (snapped - value).abs() > step * 1e-3 {
                value = snapped.clamp(self.min, self.max);
            }
        }

        value
    }

    /// Position of `value` inside the range, in [0, 1]
    pub fn fraction(&self, value: f32) -> f32 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Emitted whenever a control stores a new value.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct ParamChanged {
    pub key: ParamKey,
    pub value: f32,
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct EarthParams {
    stars_count: u32,
    rotation_speed: f32,
    tilt_angle: f32,
    glow_scale: f32,
}

impl Default for EarthParams {
    fn default() -> Self {
        Self::from(&InitialParams::default())
    }
}

impl From<&InitialParams> for EarthParams {
    fn from(initial: &InitialParams) -> Self {
        let mut params = Self {
            stars_count: STARS_COUNT.min as u32,
            rotation_speed: ROTATION_SPEED.min,
            tilt_angle: 0.0,
            glow_scale: GLOW_SCALE.min,
        };

        // seed through the same path the panel uses
        params.set(ParamKey::StarsCount, initial.stars_count as f32);
        params.set(ParamKey::RotationSpeed, initial.rotation_speed);
        params.set(ParamKey::TiltAngle, initial.tilt_angle);
        params.set(ParamKey::GlowScale, initial.glow_scale);
        params
    }
}

impl EarthParams {
    pub fn stars_count(&self) -> u32 {
        self.stars_count
    }
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }
    pub fn glow_scale(&self) -> f32 {
        self.glow_scale
    }

    pub fn get(&self, key: ParamKey) -> f32 {
        match key {
            ParamKey::StarsCount => self.stars_count as f32,
            ParamKey::RotationSpeed => self.rotation_speed,
            ParamKey::TiltAngle => self.tilt_angle,
            ParamKey::GlowScale => self.glow_scale,
        }
    }

    /// Store a new value for `key`.
    /// Returns the stored value if it differs from the previous one.
    pub fn set(&mut self, key: ParamKey, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }

        let value = key.spec().constrain(value);
        if value == self.get(key) {
            return None;
        }

        match key {
            ParamKey::StarsCount => self.stars_count = value.round() as u32,
            ParamKey::RotationSpeed => self.rotation_speed = value,
            ParamKey::TiltAngle => self.tilt_angle = value,
            ParamKey::GlowScale => self.glow_scale = value,
        }

        Some(self.get(key))
    }

    /// Move `key` by `direction` panel increments.
    pub fn nudge(&mut self, key: ParamKey, direction: f32) -> Option<f32> {
        let spec = key.spec();
        self.set(key, self.get(key) + spec.nudge * direction)
    }
}

fn log_param_changes(mut changes: EventReader<ParamChanged>) {
    for change in changes.read() {
        info!("{} -> {}", change.key.spec().label, change.value);
    }
}
