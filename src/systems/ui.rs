use bevy::prelude::*;

use crate::systems::params::{EarthParams, ParamChanged, ParamKey};

pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_panel)
           .add_systems(Update, (
               handle_buttons,
               refresh_panel.run_if(resource_changed::<EarthParams>),
           ).chain());
    }
}

const PANEL_BACKGROUND: Color = Color::srgba(0.08, 0.08, 0.1, 0.85);
const BUTTON_IDLE: Color = Color::srgb(0.2, 0.2, 0.25);
const BUTTON_HOVER: Color = Color::srgb(0.3, 0.3, 0.38);
const BUTTON_PRESSED: Color = Color::srgb(0.35, 0.55, 0.9);
const BAR_TRACK: Color = Color::srgb(0.15, 0.15, 0.18);
const BAR_FILL: Color = Color::srgb(0.2, 0.5, 0.95);

// +/- button of one control
#[derive(Component, Clone, Copy, Debug)]
pub struct PanelButton {
    pub key: ParamKey,
    pub direction: f32,
}

// numeric readout of one control
#[derive(Component)]
pub struct ValueText(pub ParamKey);

// fill of the range bar of one control
#[derive(Component)]
pub struct ValueBar(pub ParamKey);

pub fn format_value(key: ParamKey, value: f32) -> String {
    format!("{:.*}", key.spec().precision, value)
}

fn setup_panel(mut commands: Commands, params: Res<EarthParams>) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(10.0),
                right: Val::Px(10.0),
                width: Val::Px(260.0),
                flex_direction: FlexDirection::Column,
                padding: UiRect::all(Val::Px(10.0)),
                row_gap: Val::Px(8.0),
                ..default()
            },
            BackgroundColor(PANEL_BACKGROUND),
            Interaction::default(),
        ))
        .with_children(|parent| {
            for key in ParamKey::ALL {
                spawn_control(parent, key, params.get(key));
            }
        });
}

fn spawn_control(parent: &mut ChildSpawnerCommands, key: ParamKey, value: f32) {
    let spec = key.spec();

    parent
        .spawn(Node {
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(3.0),
            ..default()
        })
        .with_children(|control| {
            // label and buttons
            control
                .spawn(Node {
                    flex_direction: FlexDirection::Row,
                    align_items: AlignItems::Center,
                    column_gap: Val::Px(4.0),
                    ..default()
                })
                .with_children(|row| {
                    row.spawn((
                        Text::new(spec.label),
                        TextFont {
                            font_size: 12.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                        Node {
                            flex_grow: 1.0,
                            ..default()
                        },
                    ));
                    spawn_button(row, key, -1.0, "-");
                    row.spawn((
                        Text::new(format_value(key, value)),
                        TextFont {
                            font_size: 12.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                        Node {
                            width: Val::Px(56.0),
                            justify_content: JustifyContent::Center,
                            ..default()
                        },
                        ValueText(key),
                    ));
                    spawn_button(row, key, 1.0, "+");
                });

            // range bar
            control
                .spawn((
                    Node {
                        width: Val::Percent(100.0),
                        height: Val::Px(4.0),
                        ..default()
                    },
                    BackgroundColor(BAR_TRACK),
                ))
                .with_children(|track| {
                    track.spawn((
                        Node {
                            width: Val::Percent(spec.fraction(value) * 100.0),
                            height: Val::Percent(100.0),
                            ..default()
                        },
                        BackgroundColor(BAR_FILL),
                        ValueBar(key),
                    ));
                });
        });
}

fn spawn_button(row: &mut ChildSpawnerCommands, key: ParamKey, direction: f32, label: &str) {
    row.spawn((
        Button,
        Node {
            width: Val::Px(22.0),
            height: Val::Px(18.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(BUTTON_IDLE),
        PanelButton { key, direction },
    ))
    .with_children(|button| {
        button.spawn((
            Text::new(label),
            TextFont {
                font_size: 12.0,
                ..default()
            },
            TextColor(Color::WHITE),
        ));
    });
}

// one press moves a control by one increment; the model does the clamping
fn handle_buttons(
    mut buttons: Query<(&Interaction, &PanelButton, &mut BackgroundColor), Changed<Interaction>>,
    mut params: ResMut<EarthParams>,
    mut changes: EventWriter<ParamChanged>,
) {
    for (interaction, button, mut background) in buttons.iter_mut() {
        match *interaction {
            Interaction::Pressed => {
                background.0 = BUTTON_PRESSED;
                if let Some(value) = params.nudge(button.key, button.direction) {
                    changes.write(ParamChanged { key: button.key, value });
                }
            }
            Interaction::Hovered => background.0 = BUTTON_HOVER,
            Interaction::None => background.0 = BUTTON_IDLE,
        }
    }
}

// mirror the parameter set into the readouts
fn refresh_panel(
    params: Res<EarthParams>,
    mut texts: Query<(&mut Text, &ValueText)>,
    mut bars: Query<(&mut Node, &ValueBar)>,
) {
    for (mut text, value_text) in texts.iter_mut() {
        text.0 = format_value(value_text.0, params.get(value_text.0));
    }

    for (mut node, bar) in bars.iter_mut() {
        let key = bar.0;
        node.width = Val::Percent(key.spec().fraction(params.get(key)) * 100.0);
    }
}
