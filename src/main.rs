use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;

mod config;
mod settings;
mod systems;

use settings::{CliArgs, log_settings_report};
use systems::camera::OrbitCamPlugin;
use systems::earth::EarthPlugin;
use systems::frame::FramePlugin;
use systems::params::{EarthParams, ParamsPlugin};
use systems::scene::ScenePlugin;
use systems::starfield::StarfieldPlugin;
use systems::ui::PanelPlugin;

fn main() -> bevy::app::AppExit {
    let args = CliArgs::parse();
    let (settings, report) = settings::resolve(&args);

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: settings.window.title.clone(),
                        resolution: (
                            settings.window.width as f32,
                            settings.window.height as f32,
                        )
                            .into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    level: settings.log_level(),
                    filter: settings.log.filter.clone(),
                    ..default()
                }),
        )
        .insert_resource(EarthParams::from(&settings.params))
        .insert_resource(settings)
        .insert_resource(report)
        .add_plugins((
            ParamsPlugin,
            FramePlugin,
            ScenePlugin,
            EarthPlugin,
            StarfieldPlugin,
            OrbitCamPlugin,
            PanelPlugin,
        ))
        .add_systems(Startup, log_settings_report)
        .run()
}
