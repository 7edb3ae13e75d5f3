//! Shell textures are requested at startup and bound into the shell materials
//! whenever they finish loading. A shell whose texture never arrives keeps its
//! fallback material; nothing is retried.
//!
//! Bevy's StandardMaterial has no bump, specular or separate alpha slot, so
//! those maps are baked with the `image` crate into what it does accept:
//! a normal map, a metallic/roughness map and an RGBA cloud texture.

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};

use super::materials::clouds_bound_color;
use super::ShellMaterials;
use crate::config::{BUMP_SCALE, LAND_ROUGHNESS, OCEAN_ROUGHNESS};
use crate::settings::TexturePaths;

#[derive(Debug, thiserror::Error)]
pub enum BakeError {
    #[error("image is not in main world memory")]
    Missing,

    #[error("unsupported pixel data: {0}")]
    Convert(String),

    #[error("image has no pixels")]
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    SurfaceColor,
    SurfaceSpecular,
    SurfaceBump,
    NightLights,
    CloudColor,
    CloudAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Pending,
    Loaded,
    Failed,
}

/// One material update that can be performed now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    SurfaceColor,
    SurfaceSpecular,
    SurfaceBump,
    NightLights,
    Clouds { with_alpha: bool },
}

#[derive(Debug)]
pub struct TextureEntry {
    pub slot: TextureSlot,
    pub path: String,
    pub handle: Handle<Image>,
    pub outcome: LoadOutcome,
    pub bound: bool,
}

/// In-flight texture requests, one per slot.
#[derive(Resource, Debug, Default)]
pub struct ShellTextures {
    entries: Vec<TextureEntry>,
}

impl ShellTextures {
    pub fn request(asset_server: &AssetServer, paths: &TexturePaths) -> Self {
        let requests = [
            (TextureSlot::SurfaceColor, &paths.surface_color),
            (TextureSlot::SurfaceSpecular, &paths.surface_specular),
            (TextureSlot::SurfaceBump, &paths.surface_bump),
            (TextureSlot::NightLights, &paths.night_lights),
            (TextureSlot::CloudColor, &paths.cloud_color),
            (TextureSlot::CloudAlpha, &paths.cloud_alpha),
        ];

        let mut textures = Self::default();
        for (slot, path) in requests {
            textures.track(slot, path.clone(), asset_server.load(path.as_str()));
        }
        textures
    }

    pub fn track(&mut self, slot: TextureSlot, path: String, handle: Handle<Image>) {
        self.entries.push(TextureEntry {
            slot,
            path,
            handle,
            outcome: LoadOutcome::Pending,
            bound: false,
        });
    }

    fn entry(&self, slot: TextureSlot) -> Option<&TextureEntry> {
        self.entries.iter().find(|entry| entry.slot == slot)
    }

    pub fn outcome(&self, slot: TextureSlot) -> LoadOutcome {
        self.entry(slot)
            .map_or(LoadOutcome::Failed, |entry| entry.outcome)
    }

    pub fn handle(&self, slot: TextureSlot) -> Option<&Handle<Image>> {
        self.entry(slot).map(|entry| &entry.handle)
    }

    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut TextureEntry> {
        self.entries
            .iter_mut()
            .filter(|entry| entry.outcome == LoadOutcome::Pending)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nothing left to wait for.
    /// An alpha map is moot once its colour map has failed.
    pub fn is_settled(&self) -> bool {
        let clouds_failed = self.outcome(TextureSlot::CloudColor) == LoadOutcome::Failed;
        self.entries.iter().all(|entry| {
            entry.bound
                || entry.outcome == LoadOutcome::Failed
                || (entry.slot == TextureSlot::CloudAlpha && clouds_failed)
        })
    }

    /// Material updates whose inputs are ready.
    /// The cloud colour waits until the alpha map has either loaded or failed.
    pub fn bindable(&self) -> Vec<Binding> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == LoadOutcome::Loaded && !entry.bound)
            .filter_map(|entry| match entry.slot {
                TextureSlot::SurfaceColor => Some(Binding::SurfaceColor),
                TextureSlot::SurfaceSpecular => Some(Binding::SurfaceSpecular),
                TextureSlot::SurfaceBump => Some(Binding::SurfaceBump),
                TextureSlot::NightLights => Some(Binding::NightLights),
                TextureSlot::CloudColor => match self.outcome(TextureSlot::CloudAlpha) {
                    LoadOutcome::Pending => None,
                    LoadOutcome::Loaded => Some(Binding::Clouds { with_alpha: true }),
                    LoadOutcome::Failed => Some(Binding::Clouds { with_alpha: false }),
                },
                TextureSlot::CloudAlpha => None,
            })
            .collect()
    }

    fn slots(binding: Binding) -> &'static [TextureSlot] {
        match binding {
            Binding::SurfaceColor => &[TextureSlot::SurfaceColor],
            Binding::SurfaceSpecular => &[TextureSlot::SurfaceSpecular],
            Binding::SurfaceBump => &[TextureSlot::SurfaceBump],
            Binding::NightLights => &[TextureSlot::NightLights],
            Binding::Clouds { with_alpha: true } => &[TextureSlot::CloudColor, TextureSlot::CloudAlpha],
            Binding::Clouds { with_alpha: false } => &[TextureSlot::CloudColor],
        }
    }

    pub fn mark_bound(&mut self, binding: Binding) {
        let slots = Self::slots(binding);
        for entry in self.entries.iter_mut().filter(|e| slots.contains(&e.slot)) {
            entry.bound = true;
        }
    }

    pub fn mark_failed(&mut self, binding: Binding) {
        let slots = Self::slots(binding);
        for entry in self.entries.iter_mut().filter(|e| slots.contains(&e.slot)) {
            entry.outcome = LoadOutcome::Failed;
        }
    }
}

// record which requested textures finished loading, or failed to
pub fn poll_texture_loads(asset_server: Res<AssetServer>, mut textures: ResMut<ShellTextures>) {
    for entry in textures.pending_mut() {
        match asset_server.get_load_state(entry.handle.id()) {
            Some(LoadState::Loaded) => entry.outcome = LoadOutcome::Loaded,
            Some(LoadState::Failed(err)) => {
                warn!(
                    "Texture {} failed to load, {:?} keeps its fallback: {err}",
                    entry.path, entry.slot
                );
                entry.outcome = LoadOutcome::Failed;
            }
            _ => {}
        }
    }
}

// swap finished textures into the shell materials
pub fn bind_shell_textures(
    mut textures: ResMut<ShellTextures>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    shells: Res<ShellMaterials>,
) {
    for binding in textures.bindable() {
        match bind(binding, &textures, &mut images, &mut materials, &shells) {
            Ok(()) => {
                debug!("Bound {binding:?}");
                textures.mark_bound(binding);
            }
            Err(e) => {
                warn!("Could not bind {binding:?}, shell keeps its fallback: {e}");
                textures.mark_failed(binding);
            }
        }
    }

    // drop the bookkeeping once every slot is bound or failed
    if textures.is_settled() {
        info!("Shell textures settled");
        textures.entries.clear();
    }
}

pub fn has_pending_textures(textures: Option<Res<ShellTextures>>) -> bool {
    textures.is_some_and(|textures| !textures.is_empty())
}

fn bind(
    binding: Binding,
    textures: &ShellTextures,
    images: &mut Assets<Image>,
    materials: &mut Assets<StandardMaterial>,
    shells: &ShellMaterials,
) -> Result<(), BakeError> {
    match binding {
        Binding::SurfaceColor => {
            let texture = slot_handle(textures, TextureSlot::SurfaceColor)?;
            if let Some(material) = materials.get_mut(&shells.surface) {
                material.base_color_texture = Some(texture);
            }
        }
        Binding::SurfaceSpecular => {
            let specular = loaded_image(textures, images, TextureSlot::SurfaceSpecular)?;
            let baked = bake_roughness_map(&specular)?;
            let texture = images.add(from_baked(baked, false));
            if let Some(material) = materials.get_mut(&shells.surface) {
                material.metallic_roughness_texture = Some(texture);
                // texture channels are multiplied by these
                material.perceptual_roughness = 1.0;
                material.metallic = 1.0;
            }
        }
        Binding::SurfaceBump => {
            let bump = loaded_image(textures, images, TextureSlot::SurfaceBump)?;
            let baked = bake_normal_map(&bump, BUMP_SCALE)?;
            let texture = images.add(from_baked(baked, false));
            if let Some(material) = materials.get_mut(&shells.surface) {
                material.normal_map_texture = Some(texture);
            }
        }
        Binding::NightLights => {
            let texture = slot_handle(textures, TextureSlot::NightLights)?;
            if let Some(material) = materials.get_mut(&shells.night_lights) {
                material.base_color_texture = Some(texture);
                material.base_color = Color::WHITE;
            }
        }
        Binding::Clouds { with_alpha } => {
            let texture = if with_alpha {
                let merged = merge_cloud_alpha(
                    &loaded_image(textures, images, TextureSlot::CloudColor)?,
                    &loaded_image(textures, images, TextureSlot::CloudAlpha)?,
                )?;
                images.add(from_baked(merged, true))
            } else {
                slot_handle(textures, TextureSlot::CloudColor)?
            };

            if let Some(material) = materials.get_mut(&shells.clouds) {
                material.base_color_texture = Some(texture);
                material.base_color = clouds_bound_color();
            }
        }
    }

    Ok(())
}

fn slot_handle(textures: &ShellTextures, slot: TextureSlot) -> Result<Handle<Image>, BakeError> {
    textures.handle(slot).cloned().ok_or(BakeError::Missing)
}

fn loaded_image(
    textures: &ShellTextures,
    images: &Assets<Image>,
    slot: TextureSlot,
) -> Result<DynamicImage, BakeError> {
    let image = images
        .get(&slot_handle(textures, slot)?)
        .ok_or(BakeError::Missing)?;

    image
        .clone()
        .try_into_dynamic()
        .map_err(|e| BakeError::Convert(e.to_string()))
}

fn from_baked(baked: RgbaImage, is_srgb: bool) -> Image {
    Image::from_dynamic(
        DynamicImage::ImageRgba8(baked),
        is_srgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
}

fn non_empty(image: GrayImage) -> Result<GrayImage, BakeError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BakeError::Empty);
    }
    Ok(image)
}

/// Tangent space normal map from an equirectangular height map.
/// Longitude wraps, latitude clamps at the poles.
pub fn bake_normal_map(height: &DynamicImage, bump_scale: f32) -> Result<RgbaImage, BakeError> {
    let luma = non_empty(height.to_luma8())?;
    let (width, rows) = luma.dimensions();

    // height is in earth radii, one texel spans TAU / width radians
    let strength = bump_scale * width as f32 / std::f32::consts::TAU;
    let sample = |x: u32, y: u32| luma.get_pixel(x, y).0[0] as f32 / 255.0;

    Ok(RgbaImage::from_fn(width, rows, |x, y| {
        let left = (x + width - 1) % width;
        let right = (x + 1) % width;
        let up = y.saturating_sub(1);
        let down = (y + 1).min(rows - 1);

        let du = (sample(right, y) - sample(left, y)) * 0.5 * strength;
        let dv = (sample(x, up) - sample(x, down)) * 0.5 * strength;
        let normal = Vec3::new(-du, -dv, 1.0).normalize();

        let encode = |c: f32| ((c * 0.5 + 0.5) * 255.0).round() as u8;
        Rgba([encode(normal.x), encode(normal.y), encode(normal.z), 255])
    }))
}

/// Metallic/roughness map (roughness in G, metallic in B) from a specular map.
/// Bright specular means smooth water.
pub fn bake_roughness_map(specular: &DynamicImage) -> Result<RgbaImage, BakeError> {
    let luma = non_empty(specular.to_luma8())?;

    Ok(RgbaImage::from_fn(luma.width(), luma.height(), |x, y| {
        let shine = luma.get_pixel(x, y).0[0] as f32 / 255.0;
        let roughness = LAND_ROUGHNESS + (OCEAN_ROUGHNESS - LAND_ROUGHNESS) * shine;
        Rgba([0, (roughness * 255.0).round() as u8, 0, 255])
    }))
}

/// Cloud colour with the separate transparency map folded into alpha.
pub fn merge_cloud_alpha(
    color: &DynamicImage,
    alpha: &DynamicImage,
) -> Result<RgbaImage, BakeError> {
    let mut merged = color.to_rgba8();
    if merged.width() == 0 || merged.height() == 0 {
        return Err(BakeError::Empty);
    }

    let mut mask = non_empty(alpha.to_luma8())?;
    if mask.dimensions() != merged.dimensions() {
        mask = imageops::resize(&mask, merged.width(), merged.height(), FilterType::Triangle);
    }

    for (pixel, coverage) in merged.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = coverage.0[0];
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    use crate::systems::earth::materials::{clouds_material, night_lights_material, surface_material};

    fn tracked(outcomes: &[(TextureSlot, LoadOutcome)]) -> ShellTextures {
        let mut textures = ShellTextures::default();
        for &(slot, outcome) in outcomes {
            textures.track(slot, format!("{slot:?}"), Handle::default());
            if let Some(entry) = textures.entries.last_mut() {
                entry.outcome = outcome;
            }
        }
        textures
    }

    #[test]
    fn clouds_wait_for_alpha_map() {
        let textures = tracked(&[
            (TextureSlot::CloudColor, LoadOutcome::Loaded),
            (TextureSlot::CloudAlpha, LoadOutcome::Pending),
        ]);
        assert!(textures.bindable().is_empty());
    }

    #[test]
    fn clouds_merge_alpha_when_both_loaded() {
        let mut textures = tracked(&[
            (TextureSlot::CloudColor, LoadOutcome::Loaded),
            (TextureSlot::CloudAlpha, LoadOutcome::Loaded),
        ]);
        assert_eq!(textures.bindable(), vec![Binding::Clouds { with_alpha: true }]);

        textures.mark_bound(Binding::Clouds { with_alpha: true });
        assert!(textures.bindable().is_empty());
        assert!(textures.is_settled());
    }

    #[test]
    fn clouds_fall_back_to_color_when_alpha_fails() {
        let textures = tracked(&[
            (TextureSlot::CloudColor, LoadOutcome::Loaded),
            (TextureSlot::CloudAlpha, LoadOutcome::Failed),
        ]);
        assert_eq!(textures.bindable(), vec![Binding::Clouds { with_alpha: false }]);
    }

    #[test]
    fn failed_color_map_binds_nothing() {
        let textures = tracked(&[
            (TextureSlot::SurfaceColor, LoadOutcome::Failed),
            (TextureSlot::CloudColor, LoadOutcome::Failed),
            (TextureSlot::CloudAlpha, LoadOutcome::Loaded),
        ]);
        assert!(textures.bindable().is_empty());
        assert!(textures.is_settled());
    }

    #[test]
    fn independent_slots_bind_as_they_arrive() {
        let mut textures = tracked(&[
            (TextureSlot::SurfaceColor, LoadOutcome::Loaded),
            (TextureSlot::SurfaceBump, LoadOutcome::Pending),
            (TextureSlot::NightLights, LoadOutcome::Loaded),
        ]);
        assert_eq!(textures.bindable(), vec![Binding::SurfaceColor, Binding::NightLights]);

        textures.mark_failed(Binding::SurfaceColor);
        assert_eq!(textures.outcome(TextureSlot::SurfaceColor), LoadOutcome::Failed);
        assert_eq!(textures.bindable(), vec![Binding::NightLights]);
    }

    struct BindFixture {
        app: App,
        shells: ShellMaterials,
        image: Handle<Image>,
    }

    fn bind_fixture(outcomes: &[(TextureSlot, LoadOutcome)]) -> BindFixture {
        let mut app = App::new();
        app.init_resource::<Assets<Image>>()
            .init_resource::<Assets<StandardMaterial>>()
            .add_systems(Update, bind_shell_textures.run_if(has_pending_textures));

        let world = app.world_mut();
        let image = world.resource_mut::<Assets<Image>>().add(Image::new_fill(
            bevy::render::render_resource::Extent3d {
                width: 4,
                height: 2,
                depth_or_array_layers: 1,
            },
            bevy::render::render_resource::TextureDimension::D2,
            &[180, 180, 180, 255],
            bevy::render::render_resource::TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
        ));

        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        let shells = ShellMaterials {
            surface: materials.add(surface_material()),
            night_lights: materials.add(night_lights_material()),
            clouds: materials.add(clouds_material()),
        };

        let mut textures = tracked(outcomes);
        for entry in textures.entries.iter_mut() {
            entry.handle = image.clone();
        }

        world.insert_resource(shells.clone());
        world.insert_resource(textures);

        BindFixture { app, shells, image }
    }

    fn material(app: &App, handle: &Handle<StandardMaterial>) -> StandardMaterial {
        app.world()
            .resource::<Assets<StandardMaterial>>()
            .get(handle)
            .unwrap()
            .clone()
    }

    #[test]
    fn failed_loads_keep_fallbacks_and_clear_requests() {
        let BindFixture { mut app, shells, .. } = bind_fixture(&[
            (TextureSlot::SurfaceColor, LoadOutcome::Failed),
            (TextureSlot::NightLights, LoadOutcome::Failed),
            (TextureSlot::CloudColor, LoadOutcome::Failed),
            (TextureSlot::CloudAlpha, LoadOutcome::Pending),
        ]);
        app.update();

        let surface = material(&app, &shells.surface);
        assert!(surface.base_color_texture.is_none());
        assert_eq!(surface.base_color, surface_material().base_color);

        let lights = material(&app, &shells.night_lights);
        assert!(lights.base_color_texture.is_none());
        assert_eq!(lights.base_color, Color::BLACK);

        let clouds = material(&app, &shells.clouds);
        assert!(clouds.base_color_texture.is_none());
        assert_eq!(clouds.base_color.alpha(), 0.0);

        assert!(app.world().resource::<ShellTextures>().is_empty());
    }

    #[test]
    fn loaded_textures_are_bound_into_shell_materials() {
        let BindFixture { mut app, shells, image } = bind_fixture(&[
            (TextureSlot::SurfaceColor, LoadOutcome::Loaded),
            (TextureSlot::SurfaceBump, LoadOutcome::Loaded),
            (TextureSlot::NightLights, LoadOutcome::Pending),
            (TextureSlot::CloudColor, LoadOutcome::Loaded),
            (TextureSlot::CloudAlpha, LoadOutcome::Failed),
        ]);
        app.update();

        let surface = material(&app, &shells.surface);
        assert_eq!(surface.base_color_texture, Some(image.clone()));
        assert!(surface.normal_map_texture.is_some());

        let clouds = material(&app, &shells.clouds);
        assert_eq!(clouds.base_color_texture, Some(image));
        assert_eq!(clouds.base_color, clouds_bound_color());

        // night lights still loading
        assert!(material(&app, &shells.night_lights).base_color_texture.is_none());
        assert!(!app.world().resource::<ShellTextures>().is_empty());
    }

    #[test]
    fn flat_height_map_gives_straight_up_normals() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 4, Luma([90])));
        let normals = bake_normal_map(&flat, BUMP_SCALE).unwrap();

        for pixel in normals.pixels() {
            assert_eq!(pixel.0, [128, 128, 255, 255]);
        }
    }

    #[test]
    fn rising_height_tilts_normals_away() {
        // brighter to the east
        let ramp = GrayImage::from_fn(16, 4, |x, _| Luma([(x * 10) as u8]));
        let normals = bake_normal_map(&DynamicImage::ImageLuma8(ramp), BUMP_SCALE).unwrap();

        let inner = normals.get_pixel(8, 2).0;
        assert!(inner[0] < 128);
        assert_eq!(inner[1], 128);
    }

    #[test]
    fn specular_maps_to_roughness() {
        let spec = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let baked = bake_roughness_map(&DynamicImage::ImageLuma8(spec)).unwrap();

        assert_eq!(baked.get_pixel(0, 0).0[1], (OCEAN_ROUGHNESS * 255.0).round() as u8);
        assert_eq!(baked.get_pixel(1, 0).0[1], (LAND_ROUGHNESS * 255.0).round() as u8);
        assert_eq!(baked.get_pixel(1, 0).0[2], 0);
    }

    #[test]
    fn cloud_alpha_is_resized_to_color() {
        let color = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([200, 210, 220, 255])));
        let alpha = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([64])));

        let merged = merge_cloud_alpha(&color, &alpha).unwrap();
        assert_eq!(merged.dimensions(), (8, 4));
        for pixel in merged.pixels() {
            assert_eq!(&pixel.0[..3], &[200, 210, 220]);
            assert!((63..=65).contains(&pixel.0[3]));
        }
    }

    #[test]
    fn cloud_alpha_replaces_color_alpha() {
        let color = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let alpha = GrayImage::from_fn(2, 2, |x, y| Luma([(x * 100 + y * 50) as u8]));

        let merged = merge_cloud_alpha(&color, &DynamicImage::ImageLuma8(alpha)).unwrap();
        assert_eq!(merged.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(merged.get_pixel(1, 1).0, [10, 20, 30, 150]);
    }

    #[test]
    fn empty_images_are_rejected() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(bake_normal_map(&empty, BUMP_SCALE), Err(BakeError::Empty)));
        assert!(matches!(bake_roughness_map(&empty), Err(BakeError::Empty)));
    }
}
