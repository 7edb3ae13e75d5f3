use bevy::prelude::*;

pub mod materials;
pub mod textures;

use materials::{clouds_material, night_lights_material, surface_material, FresnelMaterial};
use textures::{bind_shell_textures, has_pending_textures, poll_texture_loads, ShellTextures};
use crate::config::{AXIAL_TILT_DEG, CLOUD_SCALE, EARTH_RADIUS, ICO_SUBDIVISIONS};
use crate::settings::Settings;
use crate::systems::frame::{FrameSet, Spin, SpinRate};
use crate::systems::params::{EarthParams, ParamChanged, ParamKey};

pub struct EarthPlugin;

impl Plugin for EarthPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<FresnelMaterial>::default())
            .add_systems(Startup, (spawn_earth, request_shell_textures))
            .add_systems(Update, (
                (poll_texture_loads, bind_shell_textures)
                    .chain()
                    .run_if(has_pending_textures),
                (apply_tilt, apply_glow_scale).before(FrameSet::Spin),
            ));
    }
}

// group tag, carries the shared axial tilt
#[derive(Component)]
pub struct EarthGroup;

/// One concentric layer of the earth composite
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Surface,
    NightLights,
    Clouds,
    Glow,
}

// materials that texture loads write into
#[derive(Resource, Clone)]
pub struct ShellMaterials {
    pub surface: Handle<StandardMaterial>,
    pub night_lights: Handle<StandardMaterial>,
    pub clouds: Handle<StandardMaterial>,
}

/// Rotation of the earth group for a tilt angle in degrees
pub fn tilt_rotation(tilt_deg: f32) -> Quat {
    Quat::from_rotation_z(-tilt_deg.to_radians())
}

pub fn earth_mesh() -> Result<Mesh> {
    let mut mesh = Sphere::new(EARTH_RADIUS).mesh().ico(ICO_SUBDIVISIONS)?;
    // normal mapping needs tangents
    mesh.generate_tangents()?;
    Ok(mesh)
}

fn spawn_earth(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut fresnel_materials: ResMut<Assets<FresnelMaterial>>,
    params: Res<EarthParams>,
) -> Result {
    // one mesh, shared by all four shells
    let mesh = meshes.add(earth_mesh()?);

    let shells = ShellMaterials {
        surface: materials.add(surface_material()),
        night_lights: materials.add(night_lights_material()),
        clouds: materials.add(clouds_material()),
    };

    let group = commands
        .spawn((
            EarthGroup,
            Transform::from_rotation(tilt_rotation(AXIAL_TILT_DEG)),
            Visibility::default(),
        ))
        .id();

    let layers = [
        (Shell::Surface, shells.surface.clone(), 1.0),
        (Shell::NightLights, shells.night_lights.clone(), 1.0),
        (Shell::Clouds, shells.clouds.clone(), CLOUD_SCALE),
    ];
    for (shell, material, scale) in layers {
        commands.spawn((
            shell,
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material),
            Transform::from_scale(Vec3::splat(scale)),
            Spin::new(shell.spin_rate()),
            ChildOf(group),
        ));
    }

    commands.spawn((
        Shell::Glow,
        Mesh3d(mesh),
        MeshMaterial3d(fresnel_materials.add(FresnelMaterial::default())),
        Transform::from_scale(Vec3::splat(params.glow_scale())),
        Spin::new(Shell::Glow.spin_rate()),
        ChildOf(group),
    ));

    commands.insert_resource(shells);

    info!("Earth spawned");
    Ok(())
}

// textures resolve later, shells render with fallbacks until then
fn request_shell_textures(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    settings: Res<Settings>,
) {
    commands.insert_resource(ShellTextures::request(&asset_server, &settings.textures));
}

impl Shell {
    pub fn spin_rate(self) -> SpinRate {
        match self {
            Shell::Clouds => SpinRate::CLOUDS,
            _ => SpinRate::BASE,
        }
    }
}

// tilt change replaces the group rotation, it never accumulates
pub fn apply_tilt(
    mut changes: EventReader<ParamChanged>,
    mut groups: Query<&mut Transform, With<EarthGroup>>,
) {
    let Some(tilt) = changes
        .read()
        .filter(|change| change.key == ParamKey::TiltAngle)
        .map(|change| change.value)
        .last()
    else {
        return;
    };

    for mut transform in groups.iter_mut() {
        transform.rotation = tilt_rotation(tilt);
    }
}

// absolute scale, successive changes do not compound
pub fn apply_glow_scale(
    mut changes: EventReader<ParamChanged>,
    mut shells: Query<(&mut Transform, &Shell)>,
) {
    let Some(scale) = changes
        .read()
        .filter(|change| change.key == ParamKey::GlowScale)
        .map(|change| change.value)
        .last()
    else {
        return;
    };

    for (mut transform, shell) in shells.iter_mut() {
        if *shell == Shell::Glow {
            transform.scale = Vec3::splat(scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction_app() -> App {
        let mut app = App::new();
        app.add_event::<ParamChanged>()
            .add_systems(Update, (apply_tilt, apply_glow_scale));
        app
    }

    fn change(app: &mut App, key: ParamKey, value: f32) {
        app.world_mut().send_event(ParamChanged { key, value });
        app.update();
    }

    #[test]
    fn initial_tilt_is_axial_tilt() {
        let (axis, angle) = tilt_rotation(AXIAL_TILT_DEG).to_axis_angle();
        let signed = angle * axis.z.signum();
        assert!((signed + 23.4_f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn tilt_change_sets_negated_radians() {
        let mut app = reaction_app();
        let group = app
            .world_mut()
            .spawn((EarthGroup, Transform::from_rotation(tilt_rotation(AXIAL_TILT_DEG))))
            .id();

        for tilt in [45.0_f32, -10.0, 90.0, 0.0] {
            change(&mut app, ParamKey::TiltAngle, tilt);
            let rotation = app.world().get::<Transform>(group).unwrap().rotation;
            assert!(rotation.abs_diff_eq(Quat::from_rotation_z(-tilt.to_radians()), 1e-6));
        }
    }

    #[test]
    fn glow_scale_is_absolute() {
        let mut app = reaction_app();
        let glow = app
            .world_mut()
            .spawn((Shell::Glow, Transform::from_scale(Vec3::splat(1.01))))
            .id();
        let surface = app.world_mut().spawn((Shell::Surface, Transform::default())).id();

        for scale in [1.03_f32, 1.05, 1.03, 1.02] {
            change(&mut app, ParamKey::GlowScale, scale);
            assert_eq!(app.world().get::<Transform>(glow).unwrap().scale, Vec3::splat(scale));
        }
        assert_eq!(app.world().get::<Transform>(surface).unwrap().scale, Vec3::ONE);
    }

    #[test]
    fn other_params_leave_shells_alone() {
        let mut app = reaction_app();
        let group = app.world_mut().spawn((EarthGroup, Transform::default())).id();

        change(&mut app, ParamKey::RotationSpeed, 0.005);
        assert_eq!(app.world().get::<Transform>(group).unwrap().rotation, Quat::IDENTITY);
    }

    #[test]
    fn only_clouds_spin_faster() {
        assert_eq!(Shell::Surface.spin_rate(), SpinRate::BASE);
        assert_eq!(Shell::NightLights.spin_rate(), SpinRate::BASE);
        assert_eq!(Shell::Glow.spin_rate(), SpinRate::BASE);
        assert_eq!(Shell::Clouds.spin_rate(), SpinRate::CLOUDS);
    }

    #[test]
    fn earth_is_four_shells_under_one_tilted_group() {
        let mut params = EarthParams::default();
        params.set(ParamKey::GlowScale, 1.03);

        let mut app = App::new();
        app.init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<Assets<FresnelMaterial>>()
            .insert_resource(params)
            .add_systems(Update, spawn_earth);
        app.update();

        let world = app.world_mut();
        let mut groups = world.query_filtered::<(&Transform, &Children), With<EarthGroup>>();
        let groups: Vec<_> = groups
            .iter(world)
            .map(|(transform, children)| (*transform, children.to_vec()))
            .collect();
        assert_eq!(groups.len(), 1);

        let (group_transform, children) = &groups[0];
        assert!(group_transform
            .rotation
            .abs_diff_eq(Quat::from_rotation_z(-23.4_f32.to_radians()), 1e-6));
        assert_eq!(children.len(), 4);

        let mut shells = Vec::new();
        let mut meshes = Vec::new();
        for &child in children {
            let shell = *world.get::<Shell>(child).unwrap();
            let transform = world.get::<Transform>(child).unwrap();
            match shell {
                Shell::Glow => assert_eq!(transform.scale, Vec3::splat(1.03)),
                Shell::Clouds => assert_eq!(transform.scale, Vec3::splat(CLOUD_SCALE)),
                _ => assert_eq!(transform.scale, Vec3::ONE),
            }
            assert_eq!(world.get::<Spin>(child).unwrap().rate, shell.spin_rate());
            shells.push(shell);
            meshes.push(world.get::<Mesh3d>(child).unwrap().0.clone());
        }

        for shell in [Shell::Surface, Shell::NightLights, Shell::Clouds, Shell::Glow] {
            assert_eq!(shells.iter().filter(|s| **s == shell).count(), 1);
        }
        assert!(meshes.iter().all(|mesh| *mesh == meshes[0]));
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 1);
        assert!(world.contains_resource::<ShellMaterials>());
    }

    #[test]
    fn earth_mesh_has_tangents_and_uvs() {
        let mesh = earth_mesh().unwrap();
        assert!(mesh.attribute(Mesh::ATTRIBUTE_TANGENT).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
    }
}
