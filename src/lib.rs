//! # `platformer_movement`
//!
//! A force-based 2D platformer movement controller with physics backend
//! abstraction.
//!
//! This crate provides a responsive, tuneable platformer controller that:
//! - Accelerates toward a target run speed along a power curve
//! - Jumps with coyote time, input buffering and variable height (jump cut)
//! - Wall-jumps off either side with a short steering lockout
//! - Falls faster than it rises, with separate fall and wall-slide speed caps
//! - Applies its own bounded ground friction when idle
//! - Abstracts the physics backend for easy swapping (Rapier2D included)
//!
//! ## Architecture
//!
//! The controller never moves the character directly. A dynamic rigid body
//! is simulated by the physics engine and the controller only:
//! 1. Senses which surfaces the body touches each physics tick
//! 2. Classifies the last surface it could jump from
//! 3. Fires jumps as impulses and steers with forces
//! 4. Adjusts gravity scale and clamps fall speed
//!
//! Input arrives through [`MovementIntent`](intent::MovementIntent) every
//! frame; timers tick every frame; the force models run in `FixedUpdate`.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use platformer_movement::prelude::*;
//!
//! // Create controller components for a player character
//! let controller = MovementController::new(MovementTuning::player()).unwrap();
//! let intent = MovementIntent::default();
//!
//! // These can be spawned with physics components
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod intent;
pub mod lifecycle;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{CharacterPhysicsBackend, RigidBodyView};
    pub use crate::collision::{ContactFilter, ContactFilters, GroundedSurface, SurfaceContacts};
    pub use crate::config::MovementTuning;
    pub use crate::controller::{DeathCallback, JumpKind, MovementController};
    pub use crate::error::{ControllerError, TuningError};
    pub use crate::intent::{JumpEdge, MovementIntent};
    pub use crate::lifecycle::{CharacterDied, Hazard, Jumped, Landed};
    pub use crate::state::{Airborne, CharacterState, Grounded, TouchingWall};
    pub use crate::{MovementControllerPlugin, MovementSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dCharacterBundle};
}

/// System sets for the movement controller.
///
/// The `FixedUpdate` sets run chained in declaration order. [`Input`] runs in
/// `Update`; schedule systems that write [`MovementIntent`](intent::MovementIntent)
/// before it.
///
/// [`Input`]: MovementSet::Input
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementSet {
    /// Frame input handling and timers (`Update`).
    Input,
    /// Remove last tick's controller forces.
    Preparation,
    /// Backend contact sensing.
    Sensors,
    /// Contact classification, jumps, gravity, fall clamp, run force and
    /// friction.
    Movement,
    /// Hand accumulated forces to the physics engine.
    FinalApplication,
    /// Marker components.
    Sync,
}

/// Main plugin for the movement controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocity, impulses, contact sensing).
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use platformer_movement::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(MovementControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct MovementControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for MovementControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for MovementControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::MovementController>();
        app.register_type::<config::MovementTuning>();
        app.register_type::<collision::ContactFilters>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<lifecycle::Hazard>();

        app.add_event::<lifecycle::HazardTouched>();
        app.add_event::<lifecycle::CharacterDied>();
        app.add_event::<lifecycle::Jumped>();
        app.add_event::<lifecycle::Landed>();

        app.configure_sets(
            FixedUpdate,
            (
                MovementSet::Preparation,
                MovementSet::Sensors,
                MovementSet::Movement,
                MovementSet::FinalApplication,
                MovementSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            Update,
            (
                systems::verify_attachment::<B>,
                systems::latch_jump_input::<B>,
                systems::tick_timers,
            )
                .chain()
                .in_set(MovementSet::Input),
        );
        app.add_systems(Update, lifecycle::dispatch_deaths);

        app.add_systems(
            FixedUpdate,
            systems::run_movement_tick::<B>.in_set(MovementSet::Movement),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(MovementSet::Sync),
        );
    }
}
