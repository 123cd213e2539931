//! Headless Run Demo
//!
//! Runs a short scripted level without a window and logs what the character
//! does: a run to the right, a jump, a wall jump off the right wall, and a
//! final drop onto a spike pit.
//!
//! ```text
//! cargo run --example headless_run
//! RUST_LOG=platformer_movement=debug cargo run --example headless_run
//! ```
//!
//! A tracking point stands in for a camera target: it follows the player's
//! x, and only follows y while the player touches level geometry.

use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier2d::prelude::*;
use platformer_movement::prelude::*;

// ==================== Constants ====================

const PLAYER_HALF_HEIGHT: f32 = 0.5;
const PLAYER_RADIUS: f32 = 0.25;

const FLOOR_HALF_WIDTH: f32 = 12.0;
const WALL_X: f32 = 8.0;
const WALL_HALF_HEIGHT: f32 = 6.0;

/// Above this height the tracking point sits below the player.
const TRACKING_HIGH_Y: f32 = 10.0;
const TRACKING_HIGH_OFFSET: f32 = -3.0;

const FRAMES: u32 = 600;

const TUNING: &str = r#"(
    move_speed: 7.0,
    acceleration: 12.0,
    deceleration: 16.0,
    jump_force: 11.0,
    jump_cut_multiplier: 0.45,
    wall_jump_force: 7.0,
)"#;

// ==================== Components ====================

#[derive(Component)]
struct Player;

/// Point a camera would follow.
#[derive(Component)]
struct TrackingPoint;

#[derive(Resource, Default)]
struct FrameCount(u32);

// ==================== Main ====================

fn main() {
    let tuning = match MovementTuning::from_ron(TUNING) {
        Ok(tuning) => tuning,
        Err(err) => {
            eprintln!("invalid tuning: {err}");
            return;
        }
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(TransformPlugin)
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
        .add_plugins(MovementControllerPlugin::<Rapier2dBackend>::default())
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .insert_resource(Tuning(tuning))
        .init_resource::<FrameCount>()
        .add_systems(Startup, setup)
        .add_systems(Update, drive_player.before(MovementSet::Input))
        .add_systems(Update, (follow_player, report_events, log_state));

    app.finish();
    app.cleanup();

    for _ in 0..FRAMES {
        app.update();
    }

    info!("demo finished after {FRAMES} frames");
}

#[derive(Resource)]
struct Tuning(MovementTuning);

fn setup(mut commands: Commands, tuning: Res<Tuning>) {
    // Floor
    commands.spawn((
        Transform::from_xyz(0.0, -0.5, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(FLOOR_HALF_WIDTH, 0.5),
    ));

    // Right wall
    commands.spawn((
        Transform::from_xyz(WALL_X + 0.5, WALL_HALF_HEIGHT, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(0.5, WALL_HALF_HEIGHT),
    ));

    // Spike pit left of the floor
    commands.spawn((
        Transform::from_xyz(-FLOOR_HALF_WIDTH - 3.0, -4.0, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(3.0, 0.5),
        Hazard,
    ));

    let controller = match MovementController::new(tuning.0) {
        Ok(controller) => controller.with_death_callback(|character| {
            info!("{character} hit the spikes");
        }),
        Err(err) => {
            error!("invalid tuning: {err}");
            return;
        }
    };

    commands.spawn((
        Player,
        Transform::from_xyz(0.0, PLAYER_HALF_HEIGHT + PLAYER_RADIUS + 0.2, 0.0),
        controller,
        MovementIntent::default(),
        Rapier2dCharacterBundle::new(),
        Collider::capsule_y(PLAYER_HALF_HEIGHT, PLAYER_RADIUS),
    ));

    commands.spawn((TrackingPoint, Transform::default()));
}

/// Scripted input: run right, jump, wall jump, then run off the left edge.
fn drive_player(
    mut frames: ResMut<FrameCount>,
    mut query: Query<&mut MovementIntent, With<Player>>,
) {
    frames.0 += 1;
    let frame = frames.0;

    for mut intent in &mut query {
        let horizontal = match frame {
            0..=30 => 0.0,
            31..=200 => 1.0,
            201..=260 => 0.0,
            _ => -1.0,
        };
        intent.set_horizontal(horizontal);

        let jump_held = matches!(frame, 60..=75 | 180..=200 | 230..=250);
        intent.set_jump_pressed(jump_held);
    }
}

fn follow_player(
    player_query: Query<(&Transform, &MovementController), (With<Player>, Without<TrackingPoint>)>,
    mut point_query: Query<&mut Transform, With<TrackingPoint>>,
) {
    let Ok((player_transform, controller)) = player_query.single() else {
        return;
    };
    let Ok(mut point) = point_query.single_mut() else {
        return;
    };

    let player = player_transform.translation.xy();
    point.translation.x = player.x;

    if controller.contacts.any() {
        point.translation.y = if player.y < TRACKING_HIGH_Y {
            player.y
        } else {
            player.y + TRACKING_HIGH_OFFSET
        };
    }
}

fn report_events(
    mut jumps: EventReader<Jumped>,
    mut landings: EventReader<Landed>,
    mut deaths: EventReader<CharacterDied>,
    frames: Res<FrameCount>,
) {
    for jump in jumps.read() {
        info!("frame {}: jump {:?}", frames.0, jump.kind);
    }
    for landing in landings.read() {
        info!("frame {}: landed on {:?}", frames.0, landing.surface);
    }
    for death in deaths.read() {
        warn!("frame {}: {} died on {}", frames.0, death.character, death.hazard);
    }
}

fn log_state(
    frames: Res<FrameCount>,
    player_query: Query<(Entity, &MovementController), With<Player>>,
    point_query: Query<&Transform, With<TrackingPoint>>,
    velocities: Query<&Velocity>,
) {
    if frames.0 % 30 != 0 {
        return;
    }
    let Ok((player, controller)) = player_query.single() else {
        return;
    };

    let velocity = velocities
        .get(player)
        .map(|v| v.linvel)
        .unwrap_or_default();
    let tracking = point_query
        .single()
        .map(|t| t.translation.xy())
        .unwrap_or_default();

    info!(
        "frame {}: velocity {:.2} surface {:?} jumping {} tracking {:.2}",
        frames.0,
        velocity,
        controller.last_grounded_surface(),
        controller.is_jumping(),
        tracking,
    );
}
