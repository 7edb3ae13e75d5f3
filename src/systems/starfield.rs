//! Random point cloud backdrop. Exactly one starfield entity exists at a time;
//! a stars count change swaps it out in a single command batch.

use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;
use rand::Rng;

use crate::config::{STARFIELD_INNER_RADIUS, STARFIELD_OUTER_RADIUS};
use crate::systems::frame::{Spin, SpinRate};
use crate::systems::params::{EarthParams, ParamChanged, ParamKey};

pub struct StarfieldPlugin;

impl Plugin for StarfieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, start)
            .add_systems(Update, replace_starfield.run_if(resource_exists::<ActiveStarfield>));
    }
}

// starfield tag
#[derive(Component)]
pub struct Starfield;

/// The one starfield currently attached to the scene.
#[derive(Resource, Debug)]
pub struct ActiveStarfield {
    pub entity: Entity,
    pub count: u32,
    material: Handle<StandardMaterial>,
}

/// Random points, uniform in direction, radius uniform in the star shell
pub fn star_positions(count: u32, rng: &mut impl Rng) -> Vec<Vec3> {
    (0..count)
        .map(|_| {
            let radius = rng.random_range(STARFIELD_INNER_RADIUS..STARFIELD_OUTER_RADIUS);
            let theta = rng.random::<f32>() * std::f32::consts::TAU;
            let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();

            Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            )
        })
        .collect()
}

pub fn generate_starfield_mesh(count: u32, rng: &mut impl Rng) -> Mesh {
    let positions: Vec<[f32; 3]> = star_positions(count, rng)
        .into_iter()
        .map(|p| p.to_array())
        .collect();

    let mut mesh = Mesh::new(
        PrimitiveTopology::PointList,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);

    mesh
}

fn star_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        ..default()
    }
}

fn spawn_starfield(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    count: u32,
) -> Entity {
    let mesh = generate_starfield_mesh(count, &mut rand::rng());

    commands
        .spawn((
            Starfield,
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(material),
            Transform::default(),
            Spin::new(SpinRate::STARFIELD),
        ))
        .id()
}

fn start(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    params: Res<EarthParams>,
) {
    let material = materials.add(star_material());
    let count = params.stars_count();
    let entity = spawn_starfield(&mut commands, &mut meshes, material.clone(), count);

    info!("Starfield spawned with {count} stars");
    commands.insert_resource(ActiveStarfield {
        entity,
        count,
        material,
    });
}

// detach the old cloud and attach the new one in the same command batch,
// so no frame ever renders zero or two starfields
fn replace_starfield(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut changes: EventReader<ParamChanged>,
    mut active: ResMut<ActiveStarfield>,
) {
    // only the last count of the frame matters
    let Some(count) = changes
        .read()
        .filter(|change| change.key == ParamKey::StarsCount)
        .map(|change| change.value as u32)
        .last()
    else {
        return;
    };

    if count == active.count {
        return;
    }

    commands.entity(active.entity).despawn();
    let entity = spawn_starfield(&mut commands, &mut meshes, active.material.clone(), count);

    debug!("Starfield replaced: {} -> {} stars", active.count, count);
    active.entity = entity;
    active.count = count;
}
