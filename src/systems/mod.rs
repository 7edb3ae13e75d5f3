pub mod camera;
pub mod earth;
pub mod frame;
pub mod params;
pub mod scene;
pub mod starfield;
pub mod ui;
