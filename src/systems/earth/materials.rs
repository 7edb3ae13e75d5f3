use bevy::prelude::*;
use bevy::render::render_resource::*;
use bevy::reflect::TypePath;
use bevy::asset::Asset;

use crate::config::{
    CLOUD_OPACITY, FRESNEL_SHADER, GLOW_BIAS, GLOW_POWER, GLOW_RIM_COLOR, GLOW_SCALE,
};

// fresnel tuning data
// rim/base colors are vec4 so the struct packs into 16-byte rows
// https://www.w3.org/TR/WGSL/#address-space-layout-constraints
#[derive(ShaderType, Clone, Copy, Debug)]
#[repr(C)]
pub struct FresnelUniform {
    pub rim_color: Vec4,
    pub base_color: Vec4,
    pub bias: f32,
    pub scale: f32,
    pub power: f32,
    pub _padding: f32,
}

impl Default for FresnelUniform {
    fn default() -> Self {
        let [r, g, b] = GLOW_RIM_COLOR;
        Self {
            rim_color: Vec4::new(r, g, b, 1.0),
            base_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            bias: GLOW_BIAS,
            scale: GLOW_SCALE,
            power: GLOW_POWER,
            _padding: 0.0,
        }
    }
}

// atmosphere glow shell material
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone, Default)]
pub struct FresnelMaterial {
    #[uniform(0)]
    pub fresnel: FresnelUniform,
}

impl Material for FresnelMaterial {
    fn fragment_shader() -> ShaderRef {
        FRESNEL_SHADER.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Add
    }

    // glow must be visible from outside the enlarged shell
    fn specialize(
            _pipeline: &bevy::pbr::MaterialPipeline<Self>,
            descriptor: &mut RenderPipelineDescriptor,
            _layout: &bevy::render::mesh::MeshVertexBufferLayoutRef,
            _key: bevy::pbr::MaterialPipelineKey<Self>,
        ) -> Result<(), SpecializedMeshPipelineError> {
        descriptor.primitive.cull_mode = None;
        Ok(())
    }
}

// surface, lit; textures are bound once they load
pub fn surface_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.8,
        metallic: 0.0,
        ..default()
    }
}

// city lights, additive and unlit
// black adds nothing, so the shell is invisible until its texture arrives
pub fn night_lights_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::BLACK,
        unlit: true,
        alpha_mode: AlphaMode::Add,
        ..default()
    }
}

// cloud layer, transparent until bound
pub fn clouds_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.0),
        alpha_mode: AlphaMode::Add,
        ..default()
    }
}

pub fn clouds_bound_color() -> Color {
    Color::srgba(1.0, 1.0, 1.0, CLOUD_OPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    // same formula as shaders/fresnel.wgsl
    fn factor(fresnel: &FresnelUniform, view_dir: Vec3, normal: Vec3) -> f32 {
        let facing = (1.0 + view_dir.dot(normal)).max(0.0);
        (fresnel.bias + fresnel.scale * facing.powf(fresnel.power)).clamp(0.0, 1.0)
    }

    #[test]
    fn glow_grows_toward_grazing_angles() {
        let fresnel = FresnelUniform::default();
        let view = Vec3::NEG_Z;

        // facing the camera head on
        let center = factor(&fresnel, view, Vec3::Z);
        // limb of the sphere
        let rim = factor(&fresnel, view, Vec3::X);
        let between = factor(&fresnel, view, Vec3::new(1.0, 0.0, 1.0).normalize());

        assert!((center - GLOW_BIAS).abs() < 1e-6);
        assert!(center < between && between < rim);
        assert!(rim <= 1.0);
    }

    // fragment output of shaders/fresnel.wgsl
    fn shaded(fresnel: &FresnelUniform, view_dir: Vec3, normal: Vec3) -> Vec4 {
        let f = factor(fresnel, view_dir, normal);
        let color = fresnel.base_color.truncate().lerp(fresnel.rim_color.truncate(), f);
        (color * f).extend(0.0)
    }

    // blend state behind AlphaMode::Add
    fn blend_premultiplied(src: Vec4, dst: Vec3) -> Vec3 {
        src.truncate() + dst * (1.0 - src.w)
    }

    #[test]
    fn glow_adds_onto_the_surface_behind_it() {
        let material = FresnelMaterial::default();
        let fresnel = material.fresnel;
        assert_eq!(material.alpha_mode(), AlphaMode::Add);
        assert!(fresnel.rim_color.z > fresnel.rim_color.x);

        let view = Vec3::NEG_Z;
        let earth = Vec3::new(0.2, 0.4, 0.3);

        for normal in [Vec3::Z, Vec3::new(1.0, 0.0, 1.0).normalize(), Vec3::X] {
            let f = factor(&fresnel, view, normal);
            let tint = fresnel.base_color.truncate().lerp(fresnel.rim_color.truncate(), f);

            let blended = blend_premultiplied(shaded(&fresnel, view, normal), earth);
            assert!(blended.abs_diff_eq(earth + tint * f, 1e-6));
        }
    }

    #[test]
    fn shader_writes_premultiplied_color_with_zero_alpha() {
        let source = include_str!("../../../assets/shaders/fresnel.wgsl");
        assert!(source.contains("return vec4<f32>(color * f, 0.0);"));
    }
}
