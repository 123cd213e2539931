//! The movement controller component.
//!
//! [`MovementController`] owns the character's tuning, state and sensed
//! contacts. All movement rules live here as plain methods over a
//! [`RigidBodyView`]; the Bevy systems in [`crate::systems`] only fetch the
//! component and a body view and call them in order.
//!
//! Per physics tick the order is fixed:
//! contact classification, jump decision, vertical forces, horizontal force,
//! friction. [`MovementController::fixed_tick`] runs the whole sequence.

use std::sync::Arc;

use bevy::prelude::*;

use crate::backend::RigidBodyView;
use crate::collision::{GroundedSurface, SurfaceContacts};
use crate::config::MovementTuning;
use crate::error::TuningError;
use crate::state::CharacterState;

/// Input magnitude below which the stick counts as released.
pub const INPUT_DEADZONE: f32 = 0.1;

/// Which impulse a fired jump produced.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    Ground,
    /// Pushed off a wall on the left, launched to the right.
    LeftWall,
    /// Pushed off a wall on the right, launched to the left.
    RightWall,
    /// No surface had been recorded yet. No impulse is applied but the jump
    /// still consumes the buffer and grace windows.
    Unclassified,
}

/// Callback invoked when a character touches a hazard.
#[derive(Clone)]
pub struct DeathCallback(Arc<dyn Fn(Entity) + Send + Sync>);

impl DeathCallback {
    pub fn new(f: impl Fn(Entity) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, character: Entity) {
        (self.0)(character);
    }
}

impl std::fmt::Debug for DeathCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeathCallback(..)")
    }
}

/// What happened during one physics tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Surface classified by a qualifying landing this tick.
    pub landed: Option<GroundedSurface>,
    pub jump: Option<JumpKind>,
    /// Horizontal run force, `None` while locked out after a wall jump.
    pub run_force: Option<f32>,
    /// Horizontal friction impulse, `None` when friction did not apply.
    pub friction_impulse: Option<f32>,
}

/// Core movement controller component.
///
/// Build one with [`MovementController::new`], which validates the tuning.
/// The physics backend fills [`contacts`](Self::contacts) every tick before
/// the controller systems run.
///
/// # Example
///
/// ```rust
/// use platformer_movement::prelude::*;
///
/// let controller = MovementController::new(MovementTuning::player())
///     .unwrap()
///     .with_death_callback(|character| println!("{character} died"));
/// assert!(!controller.state().is_jumping);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct MovementController {
    tuning: MovementTuning,
    state: CharacterState,

    /// Surfaces touched during the current physics tick.
    pub contacts: SurfaceContacts,

    #[reflect(ignore)]
    on_death: Option<DeathCallback>,
}

impl MovementController {
    /// Create a controller from validated tuning.
    pub fn new(tuning: MovementTuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self {
            tuning,
            state: CharacterState::default(),
            contacts: SurfaceContacts::default(),
            on_death: None,
        })
    }

    /// Builder: set the callback invoked when this character touches a hazard.
    pub fn with_death_callback(mut self, f: impl Fn(Entity) + Send + Sync + 'static) -> Self {
        self.on_death = Some(DeathCallback::new(f));
        self
    }

    pub fn tuning(&self) -> &MovementTuning {
        &self.tuning
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    pub fn is_jumping(&self) -> bool {
        self.state.is_jumping
    }

    pub fn last_grounded_surface(&self) -> GroundedSurface {
        self.state.last_grounded_surface
    }

    /// Reset state for a respawn. Tuning and the death callback are kept.
    pub fn reset(&mut self) {
        self.state = CharacterState::default();
        self.contacts = SurfaceContacts::default();
    }

    // ==================== Input latch ====================

    /// Store the latest input axis. Values are not clamped.
    pub fn set_axis(&mut self, axis: Vec2) {
        self.state.axis = axis;
    }

    /// Jump button went down: open the buffer window.
    pub fn on_jump_pressed(&mut self) {
        self.state.jump_buffer = self.tuning.jump_buffer_time;
    }

    /// Jump button went up: cut an ascending jump short and close the buffer.
    ///
    /// Returns the vertical cut impulse, if one was applied.
    pub fn on_jump_released(&mut self, body: &mut impl RigidBodyView) -> Option<f32> {
        let velocity = body.velocity();
        let cut = if velocity.y > 0.0 && self.state.is_jumping {
            let impulse = -velocity.y * (1.0 - self.tuning.jump_cut_multiplier);
            body.apply_impulse(Vec2::new(0.0, impulse));
            Some(impulse)
        } else {
            None
        };

        self.state.jump_input_released = true;
        self.state.jump_buffer = 0.0;
        cut
    }

    // ==================== Timer bank ====================

    /// Advance the timers by one frame.
    pub fn tick_timers(&mut self, delta: f32) {
        self.state.tick(delta);
    }

    // ==================== Physics tick ====================

    /// Run every physics-tick model in order.
    pub fn fixed_tick(&mut self, body: &mut impl RigidBodyView) -> TickReport {
        let landed = self.classify_contacts();
        let jump = self.try_jump(body);
        self.apply_vertical_forces(body);
        let run_force = self.apply_run_force(body);
        let friction_impulse = self.apply_friction(body);

        TickReport {
            landed,
            jump,
            run_force,
            friction_impulse,
        }
    }

    /// Record a landing if the character touches a surface and the jump
    /// button has been released since the last jump.
    ///
    /// Returns the newly classified surface, or `None` if nothing changed.
    pub fn classify_contacts(&mut self) -> Option<GroundedSurface> {
        if !self.state.jump_input_released {
            return None;
        }
        let surface = self.contacts.classify()?;

        self.state.grounded_grace = self.tuning.coyote_time;
        self.state.is_jumping = false;
        self.state.wall_jump_lockout = 0.0;
        self.state.last_grounded_surface = surface;
        Some(surface)
    }

    /// Whether a jump would fire this tick.
    pub fn can_jump(&self) -> bool {
        self.state.within_coyote_time() && self.state.jump_buffered() && !self.state.is_jumping
    }

    /// Fire a jump off the last grounded surface if allowed.
    pub fn try_jump(&mut self, body: &mut impl RigidBodyView) -> Option<JumpKind> {
        if !self.can_jump() {
            return None;
        }

        let tuning = &self.tuning;
        let kind = match self.state.last_grounded_surface {
            GroundedSurface::Ground => {
                body.apply_impulse(Vec2::new(0.0, tuning.jump_force));
                JumpKind::Ground
            }
            GroundedSurface::LeftWall => {
                body.apply_impulse(Vec2::new(tuning.wall_jump_force, tuning.jump_force));
                self.state.wall_jump_lockout = tuning.wall_jump_timeout;
                JumpKind::LeftWall
            }
            GroundedSurface::RightWall => {
                body.apply_impulse(Vec2::new(-tuning.wall_jump_force, tuning.jump_force));
                self.state.wall_jump_lockout = tuning.wall_jump_timeout;
                JumpKind::RightWall
            }
            GroundedSurface::None => JumpKind::Unclassified,
        };

        self.state.grounded_grace = 0.0;
        self.state.jump_buffer = 0.0;
        self.state.is_jumping = true;
        self.state.jump_input_released = false;
        Some(kind)
    }

    /// Heavier gravity while falling, and a fall speed cap that is lower
    /// while sliding down a wall.
    pub fn apply_vertical_forces(&mut self, body: &mut impl RigidBodyView) {
        let velocity = body.velocity();

        if velocity.y < 0.0 {
            body.set_gravity_scale(self.tuning.falling_gravity_scale());
            self.state.jump_input_released = true;

            let limit = if self.contacts.touching_wall() {
                self.tuning.max_slide_speed
            } else {
                self.tuning.max_fall_speed
            };
            body.set_velocity(Vec2::new(velocity.x, velocity.y.max(-limit)));
        } else {
            body.set_gravity_scale(self.tuning.gravity_scale);
        }
    }

    /// Horizontal force toward the target run speed.
    ///
    /// Returns the applied force, or `None` during wall-jump lockout.
    pub fn apply_run_force(&self, body: &mut impl RigidBodyView) -> Option<f32> {
        if self.state.wall_jump_locked() {
            return None;
        }

        let force = run_force(
            &self.tuning,
            self.state.axis.x,
            body.velocity().x,
            self.contacts.ground,
        );
        body.apply_force(Vec2::new(force, 0.0));
        Some(force)
    }

    /// Idle ground friction as an impulse that never overshoots zero.
    pub fn apply_friction(&self, body: &mut impl RigidBodyView) -> Option<f32> {
        if !self.contacts.ground || self.state.axis.x.abs() >= INPUT_DEADZONE {
            return None;
        }

        let velocity_x = body.velocity().x;
        let amount = velocity_x.abs().min(self.tuning.friction.abs()) * velocity_x.signum();
        body.apply_impulse(Vec2::new(-amount, 0.0));
        Some(-amount)
    }

    // ==================== Lifecycle ====================

    /// Invoke the death callback, if one was supplied.
    ///
    /// Returns whether a callback ran.
    pub fn notify_death(&self, character: Entity) -> bool {
        match &self.on_death {
            Some(callback) => {
                callback.call(character);
                true
            }
            None => false,
        }
    }
}

/// Power-curve run force.
///
/// `(|target - velocity| * rate) ^ vel_power`, signed toward the target. The
/// rate is picked from grounded/airborne and steering/idle.
pub fn run_force(tuning: &MovementTuning, axis_x: f32, velocity_x: f32, grounded: bool) -> f32 {
    let target_speed = axis_x * tuning.move_speed;
    let speed_diff = target_speed - velocity_x;
    let steering = target_speed.abs() > INPUT_DEADZONE;

    let rate = match (grounded, steering) {
        (true, true) => tuning.acceleration,
        (true, false) => tuning.deceleration,
        (false, true) => tuning.air_acceleration,
        (false, false) => tuning.air_deceleration,
    };

    (speed_diff.abs() * rate).powf(tuning.vel_power) * speed_diff.signum()
}
