// Earth shells (scene units, earth radius = 1)
pub const EARTH_RADIUS: f32 = 1.0;
pub const ICO_SUBDIVISIONS: u32 = 12;
pub const CLOUD_SCALE: f32 = 1.002;
pub const AXIAL_TILT_DEG: f32 = 23.4;

// Rotation (radians per tick)
pub const CLOUD_SPEED_FACTOR: f32 = 1.15;
pub const STARFIELD_SPIN: f32 = -0.0002;

// Surface shading
pub const BUMP_SCALE: f32 = 0.04;
pub const CLOUD_OPACITY: f32 = 0.8;
pub const OCEAN_ROUGHNESS: f32 = 0.35;
pub const LAND_ROUGHNESS: f32 = 0.95;

// Fresnel glow
pub const GLOW_RIM_COLOR: [f32; 3] = [0.0, 0.533, 1.0]; // #0088ff
pub const GLOW_BIAS: f32 = 0.1;
pub const GLOW_SCALE: f32 = 1.0;
pub const GLOW_POWER: f32 = 4.0;

// Starfield shell
pub const STARFIELD_INNER_RADIUS: f32 = 25.0;
pub const STARFIELD_OUTER_RADIUS: f32 = 50.0;

// Camera
pub const CAMERA_DISTANCE: f32 = 5.0;
pub const CAMERA_FOV_DEG: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const ORBIT_DAMPING: f32 = 0.25;
pub const ORBIT_MIN_RADIUS: f32 = 1.2;
pub const ORBIT_MAX_RADIUS: f32 = 100.0;

// Sun
pub const SUN_POSITION: [f32; 3] = [-2.0, 0.5, 1.5];
pub const SUN_ILLUMINANCE: f32 = 3_000.0;

// Asset paths
pub const SETTINGS_PATH: &str = "assets/config/earth.ron";
pub const FRESNEL_SHADER: &str = "shaders/fresnel.wgsl";
pub const EARTH_COLOR_TEXTURE: &str = "textures/00_earthmap1k.jpg";
pub const EARTH_BUMP_TEXTURE: &str = "textures/01_earthbump1k.jpg";
pub const EARTH_SPECULAR_TEXTURE: &str = "textures/02_earthspec1k.jpg";
pub const EARTH_LIGHTS_TEXTURE: &str = "textures/03_earthlights1k.jpg";
pub const EARTH_CLOUDS_TEXTURE: &str = "textures/04_earthcloudmap.jpg";
pub const EARTH_CLOUDS_ALPHA_TEXTURE: &str = "textures/05_earthcloudmaptrans.jpg";
