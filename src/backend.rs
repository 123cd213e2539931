//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the movement controller, and the narrow rigid-body view the
//! controller logic runs against. The controller never integrates physics
//! itself: it reads velocity, writes gravity scale and velocity, and applies
//! forces and impulses.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the movement
/// controller. Contact sensing is done by systems the backend's plugin adds
/// to [`MovementSet::Sensors`](crate::MovementSet::Sensors); they must fill
/// [`MovementController::contacts`](crate::controller::MovementController::contacts) each physics tick.
///
/// For an example implementation, see the `rapier` module's `Rapier2dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Component whose presence means the entity has a simulated rigid body.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec2;

    /// Overwrite the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Set the gravity scale of an entity's rigid body.
    fn set_gravity_scale(world: &mut World, entity: Entity, scale: f32);

    /// Apply an impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2);

    /// Apply a force to an entity.
    ///
    /// Force is applied over the physics timestep. Backends whose force
    /// component persists between steps should accumulate per tick and
    /// replace only their own contribution.
    fn apply_force(world: &mut World, entity: Entity, force: Vec2);
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// The slice of a rigid body the controller logic reads and writes.
pub trait RigidBodyView {
    fn velocity(&self) -> Vec2;

    fn set_velocity(&mut self, velocity: Vec2);

    fn set_gravity_scale(&mut self, scale: f32);

    /// Continuous force, integrated over the physics step.
    fn apply_force(&mut self, force: Vec2);

    /// Instantaneous impulse.
    fn apply_impulse(&mut self, impulse: Vec2);
}

/// [`RigidBodyView`] over one entity of a backend-managed world.
pub struct BackendBody<'w, B: CharacterPhysicsBackend> {
    world: &'w mut World,
    entity: Entity,
    _marker: std::marker::PhantomData<B>,
}

impl<'w, B: CharacterPhysicsBackend> BackendBody<'w, B> {
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: CharacterPhysicsBackend> RigidBodyView for BackendBody<'_, B> {
    fn velocity(&self) -> Vec2 {
        B::get_velocity(self.world, self.entity)
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        B::set_velocity(self.world, self.entity, velocity);
    }

    fn set_gravity_scale(&mut self, scale: f32) {
        B::set_gravity_scale(self.world, self.entity, scale);
    }

    fn apply_force(&mut self, force: Vec2) {
        B::apply_force(self.world, self.entity, force);
    }

    fn apply_impulse(&mut self, impulse: Vec2) {
        B::apply_impulse(self.world, self.entity, impulse);
    }
}
