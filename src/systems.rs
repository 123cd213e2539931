//! Core controller systems.
//!
//! These systems drive [`MovementController`] from the Bevy schedule. They are
//! generic over the physics backend so different physics engines can be used.
//! The movement rules themselves live on the controller; the physics tick
//! runs them all through [`MovementController::fixed_tick`] against a
//! [`BackendBody`].

use bevy::prelude::*;

use crate::backend::{BackendBody, CharacterPhysicsBackend};
use crate::controller::MovementController;
use crate::error::ControllerError;
use crate::intent::{JumpEdge, MovementIntent};
use crate::lifecycle::{Jumped, Landed};
use crate::state::{Airborne, Grounded, TouchingWall};

/// Run `f` on an entity's controller together with a body view.
///
/// The controller is copied out for the duration of `f` and written back
/// afterwards, so `f` may freely touch the body through the world.
fn with_controller<B: CharacterPhysicsBackend, R>(
    world: &mut World,
    entity: Entity,
    f: impl FnOnce(&mut MovementController, &mut BackendBody<'_, B>) -> R,
) -> Option<R> {
    let mut controller = world.get::<MovementController>(entity)?.clone();
    let result = {
        let mut body = BackendBody::<B>::new(world, entity);
        f(&mut controller, &mut body)
    };
    if let Some(mut slot) = world.get_mut::<MovementController>(entity) {
        *slot = controller;
    }
    Some(result)
}

fn controller_entities(world: &mut World) -> Vec<Entity> {
    world
        .query_filtered::<Entity, With<MovementController>>()
        .iter(world)
        .collect()
}

/// Fail when a controller is attached to an entity without a rigid body.
pub fn verify_attachment<B: CharacterPhysicsBackend>(
    q_missing: Query<Entity, (Added<MovementController>, Without<B::VelocityComponent>)>,
) -> Result {
    if let Some(entity) = q_missing.iter().next() {
        error!("movement controller on {entity} has no rigid body to drive");
        return Err(ControllerError::MissingRigidBody(entity).into());
    }
    Ok(())
}

/// Copy the input axis into each controller and handle queued jump edges.
///
/// Runs every frame. A release while ascending applies the jump cut impulse.
pub fn latch_jump_input<B: CharacterPhysicsBackend>(world: &mut World) {
    let inputs: Vec<(Entity, Vec2, Vec<JumpEdge>)> = world
        .query_filtered::<(Entity, &mut MovementIntent), With<MovementController>>()
        .iter_mut(world)
        .map(|(entity, mut intent)| (entity, intent.axis, intent.drain_edges()))
        .collect();

    for (entity, axis, edges) in inputs {
        with_controller::<B, _>(world, entity, |controller, body| {
            controller.set_axis(axis);
            for edge in edges {
                match edge {
                    JumpEdge::Pressed => controller.on_jump_pressed(),
                    JumpEdge::Released => {
                        if let Some(impulse) = controller.on_jump_released(body) {
                            debug!("jump cut on {entity}: impulse {impulse:.3}");
                        }
                    }
                }
            }
        });
    }
}

/// Count every controller's timers down by the frame delta.
pub fn tick_timers(time: Res<Time>, mut q_controllers: Query<&mut MovementController>) {
    let delta = time.delta_secs();
    for mut controller in &mut q_controllers {
        controller.tick_timers(delta);
    }
}

/// Run one physics tick of every controller against its body.
///
/// Emits [`Landed`] when a classification clears a jump or changes the
/// recorded surface, and [`Jumped`] for every fired jump.
pub fn run_movement_tick<B: CharacterPhysicsBackend>(world: &mut World) {
    for entity in controller_entities(world) {
        let Some((report, was_jumping, previous)) =
            with_controller::<B, _>(world, entity, |controller, body| {
                let was_jumping = controller.is_jumping();
                let previous = controller.last_grounded_surface();
                (controller.fixed_tick(body), was_jumping, previous)
            })
        else {
            continue;
        };

        trace!("{entity} tick: {report:?}");

        if let Some(surface) = report.landed {
            if was_jumping || surface != previous {
                debug!("{entity} landed on {surface:?}");
                world.send_event(Landed {
                    character: entity,
                    surface,
                });
            }
        }

        if let Some(kind) = report.jump {
            debug!("{entity} jumped: {kind:?}");
            world.send_event(Jumped {
                character: entity,
                kind,
            });
        }
    }
}

/// Sync state marker components from the sensed contacts.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &MovementController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&TouchingWall>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, wall) in &q_controllers {
        let contacts = controller.contacts;

        // Sync Grounded/Airborne
        if contacts.ground && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !contacts.ground && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        // Sync TouchingWall
        let touching = TouchingWall::new(contacts.left_wall, contacts.right_wall);
        match (contacts.touching_wall(), wall) {
            (true, Some(current)) if *current == touching => {}
            (true, _) => {
                commands.entity(entity).insert(touching);
            }
            (false, Some(_)) => {
                commands.entity(entity).remove::<TouchingWall>();
            }
            (false, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoOpBackendPlugin;
    use crate::collision::{GroundedSurface, SurfaceContacts};
    use crate::config::MovementTuning;
    use crate::controller::JumpKind;
    use crate::{MovementControllerPlugin, MovementSet};

    /// Rigid body stand-in. Impulses are folded into velocity immediately.
    #[derive(Component, Debug, Default)]
    struct TestBody {
        velocity: Vec2,
        gravity_scale: f32,
        force: Vec2,
    }

    struct TestBackend;

    impl CharacterPhysicsBackend for TestBackend {
        type VelocityComponent = TestBody;

        fn plugin() -> impl Plugin {
            NoOpBackendPlugin
        }

        fn get_velocity(world: &World, entity: Entity) -> Vec2 {
            world
                .get::<TestBody>(entity)
                .map(|b| b.velocity)
                .unwrap_or(Vec2::ZERO)
        }

        fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
            if let Some(mut body) = world.get_mut::<TestBody>(entity) {
                body.velocity = velocity;
            }
        }

        fn set_gravity_scale(world: &mut World, entity: Entity, scale: f32) {
            if let Some(mut body) = world.get_mut::<TestBody>(entity) {
                body.gravity_scale = scale;
            }
        }

        fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
            if let Some(mut body) = world.get_mut::<TestBody>(entity) {
                body.velocity += impulse;
            }
        }

        fn apply_force(world: &mut World, entity: Entity, force: Vec2) {
            if let Some(mut body) = world.get_mut::<TestBody>(entity) {
                body.force += force;
            }
        }
    }

    #[derive(Resource, Default)]
    struct Sensed(SurfaceContacts);

    /// Stands in for backend sensing.
    fn write_contacts(sensed: Res<Sensed>, mut q: Query<&mut MovementController>) {
        for mut controller in &mut q {
            controller.contacts = sensed.0;
        }
    }

    #[derive(Resource, Default)]
    struct JumpLog(Vec<Jumped>);

    fn record_jumps(mut events: EventReader<Jumped>, mut log: ResMut<JumpLog>) {
        log.0.extend(events.read().copied());
    }

    #[derive(Resource, Default)]
    struct LandingLog(Vec<Landed>);

    fn record_landings(mut events: EventReader<Landed>, mut log: ResMut<LandingLog>) {
        log.0.extend(events.read().copied());
    }

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MovementControllerPlugin::<TestBackend>::default());
        app.init_resource::<Time>();
        app.init_resource::<Sensed>();
        app.init_resource::<JumpLog>();
        app.init_resource::<LandingLog>();
        app.add_systems(FixedUpdate, write_contacts.in_set(MovementSet::Sensors));
        app.add_systems(Update, (record_jumps, record_landings));
        app
    }

    fn spawn_character(app: &mut App, velocity: Vec2) -> Entity {
        app.world_mut()
            .spawn((
                MovementController::new(MovementTuning::default()).unwrap(),
                MovementIntent::default(),
                TestBody {
                    velocity,
                    ..default()
                },
            ))
            .id()
    }

    /// One frame: the physics tick, then frame input.
    fn tick(app: &mut App) {
        app.world_mut().run_schedule(FixedUpdate);
        app.update();
    }

    #[test]
    fn falling_then_landing_enables_jump() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec2::new(0.0, -1.0));

        // Falling re-arms landing
        tick(&mut app);
        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::new(true, false, false);
        tick(&mut app);

        let controller = app.world().get::<MovementController>(character).unwrap();
        assert_eq!(controller.last_grounded_surface(), GroundedSurface::Ground);
        assert!(app.world().get::<Grounded>(character).is_some());

        app.world_mut()
            .get_mut::<MovementIntent>(character)
            .unwrap()
            .press_jump();
        tick(&mut app);
        tick(&mut app);

        let body = app.world().get::<TestBody>(character).unwrap();
        assert!(body.velocity.y > 0.0);
        let log = app.world().resource::<JumpLog>();
        assert_eq!(log.0.len(), 1);
        assert_eq!(log.0[0].kind, JumpKind::Ground);
    }

    #[test]
    fn press_buffered_in_the_air_fires_on_the_landing_tick() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec2::new(0.0, -1.0));

        tick(&mut app);
        app.world_mut()
            .get_mut::<MovementIntent>(character)
            .unwrap()
            .press_jump();
        app.update();
        assert!(app.world().resource::<JumpLog>().0.is_empty());

        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::new(true, false, false);
        app.world_mut().run_schedule(FixedUpdate);
        app.update();

        let landings = &app.world().resource::<LandingLog>().0;
        assert_eq!(landings.len(), 1);
        assert_eq!(landings[0].surface, GroundedSurface::Ground);
        let jumps = &app.world().resource::<JumpLog>().0;
        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].kind, JumpKind::Ground);
        assert!(app.world().get::<TestBody>(character).unwrap().velocity.y > 0.0);
    }

    /// Fall, land and jump. Returns the character mid-jump.
    fn jumping_character(app: &mut App) -> Entity {
        let character = spawn_character(app, Vec2::new(0.0, -1.0));
        tick(app);
        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::new(true, false, false);
        tick(app);
        app.world_mut()
            .get_mut::<MovementIntent>(character)
            .unwrap()
            .press_jump();
        tick(app);
        tick(app);
        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::default();
        character
    }

    #[test]
    fn release_edge_cuts_ascent() {
        let mut app = create_test_app();
        let character = jumping_character(&mut app);
        let rising = app.world().get::<TestBody>(character).unwrap().velocity.y;
        assert!(rising > 0.0);

        app.world_mut()
            .get_mut::<MovementIntent>(character)
            .unwrap()
            .release_jump();
        app.update();

        let cut = MovementTuning::default().jump_cut_multiplier;
        let velocity = app.world().get::<TestBody>(character).unwrap().velocity.y;
        assert!((velocity - rising * cut).abs() < 1e-4);
        assert!(app
            .world()
            .get::<MovementIntent>(character)
            .unwrap()
            .pending_edges()
            .is_empty());
    }

    #[test]
    fn axis_is_latched_and_drives_run_force() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec2::ZERO);

        app.world_mut()
            .get_mut::<MovementIntent>(character)
            .unwrap()
            .set_axis(Vec2::new(1.0, 0.0));
        tick(&mut app);
        tick(&mut app);

        let controller = app.world().get::<MovementController>(character).unwrap();
        assert_eq!(controller.state().axis, Vec2::new(1.0, 0.0));
        let body = app.world().get::<TestBody>(character).unwrap();
        assert!(body.force.x > 0.0);
        assert_eq!(body.gravity_scale, controller.tuning().gravity_scale);
    }

    #[test]
    fn wall_contact_adds_touching_wall_marker() {
        let mut app = create_test_app();
        let character = spawn_character(&mut app, Vec2::ZERO);
        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::new(false, true, false);

        tick(&mut app);
        tick(&mut app);

        let wall = app.world().get::<TouchingWall>(character);
        assert_eq!(wall.copied(), Some(TouchingWall::new(true, false)));
        assert!(app.world().get::<Airborne>(character).is_some());

        app.world_mut().resource_mut::<Sensed>().0 = SurfaceContacts::default();
        tick(&mut app);
        tick(&mut app);
        assert!(app.world().get::<TouchingWall>(character).is_none());
    }

    #[test]
    #[should_panic]
    fn missing_rigid_body_fails_attachment() {
        let mut app = create_test_app();
        app.world_mut()
            .spawn(MovementController::new(MovementTuning::default()).unwrap());
        app.update();
    }
}
