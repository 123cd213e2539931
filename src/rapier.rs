//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::{ContactFilters, SurfaceContacts};
use crate::controller::MovementController;
use crate::lifecycle::{dispatch_deaths, Hazard, HazardTouched};
use crate::MovementSet;

/// Rapier2D physics backend for the movement controller.
///
/// Velocity, gravity scale and impulses go straight to Rapier components.
/// Forces are accumulated in [`ControllerForces`] and written to
/// [`ExternalForce`] once per tick. Contact sensing is handled by dedicated
/// Rapier systems that receive `RapierContext` as a system parameter.
pub struct Rapier2dBackend;

impl CharacterPhysicsBackend for Rapier2dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn set_gravity_scale(world: &mut World, entity: Entity, scale: f32) {
        match world.get_mut::<GravityScale>(entity) {
            Some(mut gravity) => {
                // Avoid touching change detection every tick
                if gravity.0 != scale {
                    gravity.0 = scale;
                }
            }
            None => {
                if let Ok(mut entity) = world.get_entity_mut(entity) {
                    entity.insert(GravityScale(scale));
                }
            }
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            vel.linvel += impulse;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec2) {
        // Forces are written to ExternalForce in MovementSet::FinalApplication
        match world.get_mut::<ControllerForces>(entity) {
            Some(mut forces) => forces.add_force(force),
            None => {
                if let Ok(mut entity) = world.get_entity_mut(entity) {
                    let mut forces = ControllerForces::default();
                    forces.add_force(force);
                    entity.insert(forces);
                }
            }
        }
    }
}

/// Plugin that sets up Rapier2D-specific systems for the movement controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ControllerForces>();

        app.add_systems(
            FixedUpdate,
            clear_controller_forces.in_set(MovementSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            rapier_contact_detection.in_set(MovementSet::Sensors),
        );
        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(MovementSet::FinalApplication),
        );

        app.add_systems(Update, rapier_hazard_detection.before(dispatch_deaths));
    }
}

/// Forces the controller applied to a body, kept apart from [`ExternalForce`]
/// so other code can push the same body.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct ControllerForces {
    /// Forces added during the current tick.
    accumulated: Vec2,
    /// Forces written to `ExternalForce` last tick.
    applied: Vec2,
}

impl ControllerForces {
    pub fn add_force(&mut self, force: Vec2) {
        self.accumulated += force;
    }

    /// Forces added so far this tick.
    pub fn accumulated(&self) -> Vec2 {
        self.accumulated
    }

    /// Start a new tick. Returns last tick's contribution so it can be
    /// removed from `ExternalForce`.
    pub fn prepare_new_frame(&mut self) -> Vec2 {
        self.accumulated = Vec2::ZERO;
        std::mem::take(&mut self.applied)
    }

    /// End the tick. Returns the forces to add to `ExternalForce`.
    pub fn finalize_frame(&mut self) -> Vec2 {
        self.applied = std::mem::take(&mut self.accumulated);
        self.applied
    }
}

/// Clear last tick's controller forces from [`ExternalForce`].
pub fn clear_controller_forces(mut q: Query<(&mut ExternalForce, &mut ControllerForces)>) {
    for (mut ext_force, mut forces) in &mut q {
        ext_force.force -= forces.prepare_new_frame();
    }
}

/// Write this tick's controller forces to [`ExternalForce`].
pub fn apply_controller_forces(mut q: Query<(&mut ExternalForce, &mut ControllerForces)>) {
    for (mut ext_force, mut forces) in &mut q {
        ext_force.force += forces.finalize_frame();
    }
}

/// Get the distance from collider center to bottom for a given collider.
/// For capsules, this is half_height + radius.
pub fn get_collider_bottom_offset(collider: &Collider) -> f32 {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let half_height = (segment.a().y - segment.b().y).abs() / 2.0;
        half_height + capsule.radius()
    } else if let Some(ball) = collider.as_ball() {
        ball.radius()
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents().y
    } else {
        0.0
    }
}

/// Get the horizontal half extent of a collider.
pub fn get_collider_radius(collider: &Collider) -> f32 {
    if let Some(capsule) = collider.as_capsule() {
        capsule.radius()
    } else if let Some(ball) = collider.as_ball() {
        ball.radius()
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents().x
    } else {
        0.0
    }
}

/// A surface found by a sensor cast.
struct SensorHit {
    entity: Entity,
    /// Surface normal, pointing back toward the character.
    normal: Vec2,
}

/// Cast an axis-aligned segment from the character's center.
///
/// The segment is perpendicular to `direction` and `half_length` long on each
/// side.
fn rapier_shapecast(
    context: &RapierContext,
    origin: Vec2,
    direction: Vec2,
    half_length: f32,
    max_distance: f32,
    exclude_entity: Entity,
    collision_groups: Option<(Group, Group)>,
) -> Option<SensorHit> {
    let half = direction.perp() * half_length;
    let shape = Collider::segment(-half, half);

    let mut filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors();

    if let Some((memberships, filters)) = collision_groups {
        filter = filter.groups(CollisionGroups::new(memberships, filters));
    }

    context
        .cast_shape(
            origin,
            0.0,
            direction,
            &shape,
            ShapeCastOptions {
                max_time_of_impact: max_distance,
                stop_at_penetration: false,
                ..default()
            },
            filter,
        )
        .map(|(hit_entity, hit)| {
            let normal = hit
                .details
                .map(|d| d.normal1)
                .filter(|n| *n != Vec2::ZERO)
                .unwrap_or(-direction);
            // The cast shape's normal may face either side of the segment
            let normal = if normal.dot(direction) > 0.0 {
                -normal
            } else {
                normal
            };
            SensorHit {
                entity: hit_entity,
                normal,
            }
        })
}

/// Sense ground and wall contacts for every controller.
///
/// Three short casts (down, left, right) look for surfaces within
/// [`ContactFilters::contact_distance`] of the collider. Each hit is matched
/// against the character's filters by normal and collision groups.
pub fn rapier_contact_detection(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &Collider,
        &mut MovementController,
        Option<&ContactFilters>,
        Option<&CollisionGroups>,
    )>,
    q_groups: Query<&CollisionGroups>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, collider, mut controller, filters, collision_groups) in
        &mut q_controllers
    {
        let filters = filters.copied().unwrap_or_default();
        let position = transform.translation().xy();
        let bottom_offset = get_collider_bottom_offset(collider);
        let radius = get_collider_radius(collider);

        // Inherit collision groups from the character's collider
        let groups = collision_groups.map(|cg| (cg.memberships, cg.filters));

        let casts = [
            // Narrower than the body so walls are not read as ground
            (Vec2::NEG_Y, radius * 0.9, bottom_offset),
            // Shorter than the body so floors and ceilings are not read as walls
            (Vec2::NEG_X, bottom_offset * 0.8, radius),
            (Vec2::X, bottom_offset * 0.8, radius),
        ];

        let mut contacts = SurfaceContacts::default();
        for (direction, half_length, reach) in casts {
            let Some(hit) = rapier_shapecast(
                &context,
                position,
                direction,
                half_length,
                reach + filters.contact_distance,
                entity,
                groups,
            ) else {
                continue;
            };

            let other_groups = q_groups
                .get(hit.entity)
                .ok()
                .map(|cg| (cg.memberships.bits(), cg.filters.bits()));
            contacts.merge(filters.classify_contact(hit.normal, other_groups));
        }

        if controller.contacts != contacts {
            controller.contacts = contacts;
        }
    }
}

/// Report characters that started touching a [`Hazard`].
pub fn rapier_hazard_detection(
    mut collisions: EventReader<CollisionEvent>,
    q_characters: Query<(), With<MovementController>>,
    q_hazards: Query<(), With<Hazard>>,
    mut touched: EventWriter<HazardTouched>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = event else {
            continue;
        };

        for (character, hazard) in [(*a, *b), (*b, *a)] {
            if q_characters.contains(character) && q_hazards.contains(hazard) {
                touched.write(HazardTouched { character, hazard });
            }
        }
    }
}

/// Bundle for creating a character with Rapier2D physics.
///
/// Provides the Rapier components the movement controller drives: a dynamic
/// rigid body with locked rotation, unit mass (so impulses are velocity
/// changes), frictionless contacts (the controller applies its own
/// friction), and collision events for hazard detection.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use platformer_movement::prelude::*;
/// use platformer_movement::rapier::Rapier2dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         MovementController::new(MovementTuning::player()).unwrap(),
///         MovementIntent::default(),
///         Rapier2dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.25),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier2dCharacterBundle {
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Persistent force. The controller adds and removes only its own share.
    pub external_force: ExternalForce,
    /// Impulses applied this step: jumps, jump cuts and friction.
    pub external_impulse: ExternalImpulse,
    pub controller_forces: ControllerForces,
    /// Written every tick by the vertical force model.
    pub gravity_scale: GravityScale,
    pub locked_axes: LockedAxes,
    pub damping: Damping,
    pub mass: ColliderMassProperties,
    pub friction: Friction,
    pub active_events: ActiveEvents,
}

impl Default for Rapier2dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier2dCharacterBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            controller_forces: ControllerForces::default(),
            gravity_scale: GravityScale(1.0),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            mass: ColliderMassProperties::Mass(1.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            active_events: ActiveEvents::COLLISION_EVENTS,
        }
    }

    /// Set the collider mass. Impulses are divided by it.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = ColliderMassProperties::Mass(mass);
        self
    }

    /// Set linear damping. Zero by default; the controller models drag itself.
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.damping.linear_damping = damping;
        self
    }
}
