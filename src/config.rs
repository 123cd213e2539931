//! Movement tuning parameters.
//!
//! This module defines the per-character tuning that drives running, jumping,
//! wall jumping, gravity and friction. Tuning is validated once when a
//! controller is built and never changes afterwards.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Tuning parameters for the movement controller.
///
/// Units follow the physics world: speeds in units/second, forces and
/// impulses in the engine's native units. The defaults assume a body of
/// mass 1.0 in a world with gravity around `-9.81`.
///
/// # Example
///
/// ```rust
/// use platformer_movement::prelude::*;
///
/// let tuning = MovementTuning::player()
///     .with_run(8.0, 12.0, 16.0)
///     .with_coyote_time(0.12);
/// assert!(tuning.validate().is_ok());
/// ```
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct MovementTuning {
    // === Run ===
    /// Top horizontal speed reached with full input.
    pub move_speed: f32,
    /// Acceleration coefficient while grounded and steering.
    pub acceleration: f32,
    /// Deceleration coefficient while grounded without input.
    pub deceleration: f32,
    /// Acceleration coefficient while airborne and steering.
    pub air_acceleration: f32,
    /// Deceleration coefficient while airborne without input.
    pub air_deceleration: f32,
    /// Exponent of the acceleration curve. Values near 1 are linear.
    pub vel_power: f32,
    /// Largest friction impulse applied per tick when idle on the ground.
    pub friction: f32,

    // === Jump ===
    /// Upward impulse of a jump.
    pub jump_force: f32,
    /// Fraction of upward velocity kept when the jump button is released
    /// mid-ascent (0.0 stops the ascent, 1.0 disables the cut).
    pub jump_cut_multiplier: f32,
    /// Grace window after leaving a surface during which a jump still fires.
    pub coyote_time: f32,
    /// Window before landing during which an early jump press is honoured.
    pub jump_buffer_time: f32,

    // === Wall jump ===
    /// Horizontal impulse pushing away from the wall on a wall jump.
    pub wall_jump_force: f32,
    /// Time after a wall jump during which horizontal steering is ignored.
    pub wall_jump_timeout: f32,

    // === Gravity ===
    /// Gravity scale written to the body while rising or at rest.
    pub gravity_scale: f32,
    /// Multiplier on `gravity_scale` while falling.
    pub fall_gravity_multiplier: f32,
    /// Fastest downward speed in free fall.
    pub max_fall_speed: f32,
    /// Fastest downward speed while touching a wall.
    pub max_slide_speed: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            // Run
            move_speed: 9.0,
            acceleration: 13.0,
            deceleration: 16.0,
            air_acceleration: 6.5,
            air_deceleration: 8.0,
            vel_power: 0.96,
            friction: 0.2,

            // Jump
            jump_force: 12.0,
            jump_cut_multiplier: 0.4,
            coyote_time: 0.15,
            jump_buffer_time: 0.1,

            // Wall jump
            wall_jump_force: 8.0,
            wall_jump_timeout: 0.2,

            // Gravity
            gravity_scale: 1.0,
            fall_gravity_multiplier: 2.0,
            max_fall_speed: 20.0,
            max_slide_speed: 3.0,
        }
    }
}

impl MovementTuning {
    /// Tuning for a responsive player character.
    pub fn player() -> Self {
        Self {
            acceleration: 16.0,
            deceleration: 20.0,
            jump_cut_multiplier: 0.3,
            ..default()
        }
    }

    /// Low-gravity, slow-falling tuning.
    pub fn floaty() -> Self {
        Self {
            air_acceleration: 4.0,
            air_deceleration: 2.0,
            fall_gravity_multiplier: 1.2,
            max_fall_speed: 8.0,
            jump_cut_multiplier: 0.7,
            ..default()
        }
    }

    /// Parse tuning from RON text and validate it.
    ///
    /// Fields that are left out keep their default values.
    ///
    /// ```rust
    /// use platformer_movement::prelude::*;
    ///
    /// let tuning = MovementTuning::from_ron("(move_speed: 6.0, jump_force: 10.0)").unwrap();
    /// assert_eq!(tuning.move_speed, 6.0);
    /// assert_eq!(tuning.coyote_time, MovementTuning::default().coyote_time);
    /// ```
    pub fn from_ron(text: &str) -> Result<Self, TuningError> {
        let tuning: Self = ron::from_str(text).map_err(|e| TuningError::Parse(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize tuning to pretty RON text.
    pub fn to_ron(&self) -> Result<String, TuningError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| TuningError::Serialize(e.to_string()))
    }

    /// Check every parameter: finite, non-negative, fractions at most 1.
    pub fn validate(&self) -> Result<(), TuningError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(TuningError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(TuningError::Negative { field, value });
            }
        }

        if self.jump_cut_multiplier > 1.0 {
            return Err(TuningError::FractionAboveOne {
                field: "jump_cut_multiplier",
                value: self.jump_cut_multiplier,
            });
        }

        Ok(())
    }

    fn fields(&self) -> [(&'static str, f32); 17] {
        [
            ("move_speed", self.move_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("air_acceleration", self.air_acceleration),
            ("air_deceleration", self.air_deceleration),
            ("vel_power", self.vel_power),
            ("friction", self.friction),
            ("jump_force", self.jump_force),
            ("jump_cut_multiplier", self.jump_cut_multiplier),
            ("coyote_time", self.coyote_time),
            ("jump_buffer_time", self.jump_buffer_time),
            ("wall_jump_force", self.wall_jump_force),
            ("wall_jump_timeout", self.wall_jump_timeout),
            ("gravity_scale", self.gravity_scale),
            ("fall_gravity_multiplier", self.fall_gravity_multiplier),
            ("max_fall_speed", self.max_fall_speed),
            ("max_slide_speed", self.max_slide_speed),
        ]
    }

    /// Gravity scale to use while falling.
    #[inline]
    pub fn falling_gravity_scale(&self) -> f32 {
        self.gravity_scale * self.fall_gravity_multiplier
    }

    /// Builder: set top speed and grounded acceleration/deceleration.
    pub fn with_run(mut self, move_speed: f32, acceleration: f32, deceleration: f32) -> Self {
        self.move_speed = move_speed;
        self.acceleration = acceleration;
        self.deceleration = deceleration;
        self
    }

    /// Builder: set airborne acceleration/deceleration.
    pub fn with_air_control(mut self, acceleration: f32, deceleration: f32) -> Self {
        self.air_acceleration = acceleration;
        self.air_deceleration = deceleration;
        self
    }

    /// Builder: set the acceleration curve exponent.
    pub fn with_vel_power(mut self, power: f32) -> Self {
        self.vel_power = power;
        self
    }

    /// Builder: set friction.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Builder: set jump impulse and jump cut fraction.
    pub fn with_jump(mut self, force: f32, cut_multiplier: f32) -> Self {
        self.jump_force = force;
        self.jump_cut_multiplier = cut_multiplier;
        self
    }

    /// Builder: set coyote time.
    pub fn with_coyote_time(mut self, time: f32) -> Self {
        self.coyote_time = time;
        self
    }

    /// Builder: set jump buffer time.
    pub fn with_jump_buffer_time(mut self, time: f32) -> Self {
        self.jump_buffer_time = time;
        self
    }

    /// Builder: set wall jump impulse and lockout.
    pub fn with_wall_jump(mut self, force: f32, timeout: f32) -> Self {
        self.wall_jump_force = force;
        self.wall_jump_timeout = timeout;
        self
    }

    /// Builder: set base gravity scale and falling multiplier.
    pub fn with_gravity(mut self, scale: f32, fall_multiplier: f32) -> Self {
        self.gravity_scale = scale;
        self.fall_gravity_multiplier = fall_multiplier;
        self
    }

    /// Builder: set free-fall and wall-slide speed limits.
    pub fn with_fall_limits(mut self, max_fall_speed: f32, max_slide_speed: f32) -> Self {
        self.max_fall_speed = max_fall_speed;
        self.max_slide_speed = max_slide_speed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(MovementTuning::default().validate().is_ok());
        assert!(MovementTuning::player().validate().is_ok());
        assert!(MovementTuning::floaty().validate().is_ok());
    }

    #[test]
    fn player_preset_is_snappier() {
        let player = MovementTuning::player();
        let default = MovementTuning::default();
        assert!(player.acceleration >= default.acceleration);
    }

    #[test]
    fn negative_value_is_rejected() {
        let tuning = MovementTuning::default().with_friction(-0.5);
        assert_eq!(
            tuning.validate(),
            Err(TuningError::Negative {
                field: "friction",
                value: -0.5
            })
        );
    }

    #[test]
    fn nan_is_rejected() {
        let tuning = MovementTuning::default().with_coyote_time(f32::NAN);
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NotFinite {
                field: "coyote_time",
                ..
            })
        ));
    }

    #[test]
    fn jump_cut_above_one_is_rejected() {
        let tuning = MovementTuning::default().with_jump(10.0, 1.2);
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::FractionAboveOne { .. })
        ));

        // Both ends of the range are fine
        assert!(MovementTuning::default().with_jump(10.0, 0.0).validate().is_ok());
        assert!(MovementTuning::default().with_jump(10.0, 1.0).validate().is_ok());
    }

    #[test]
    fn falling_gravity_scale_multiplies() {
        let tuning = MovementTuning::default().with_gravity(1.5, 2.0);
        assert_eq!(tuning.falling_gravity_scale(), 3.0);
    }

    #[test]
    fn ron_partial_fills_defaults() {
        let tuning = MovementTuning::from_ron("(move_speed: 5.0, vel_power: 2.0)").unwrap();
        assert_eq!(tuning.move_speed, 5.0);
        assert_eq!(tuning.vel_power, 2.0);
        assert_eq!(tuning.jump_force, MovementTuning::default().jump_force);
    }

    #[test]
    fn ron_round_trip_keeps_values() {
        let tuning = MovementTuning::floaty();
        let text = tuning.to_ron().unwrap();
        assert_eq!(MovementTuning::from_ron(&text).unwrap(), tuning);
    }

    #[test]
    fn to_ron_writes_every_field() {
        let text = MovementTuning::player().to_ron().unwrap();
        for (field, _) in MovementTuning::player().fields() {
            assert!(text.contains(field), "{field} missing from {text}");
        }
    }

    #[test]
    fn ron_invalid_values_are_rejected() {
        let err = MovementTuning::from_ron("(max_fall_speed: -3.0)").unwrap_err();
        assert!(matches!(err, TuningError::Negative { field: "max_fall_speed", .. }));

        let err = MovementTuning::from_ron("(move_speed: \"fast\")").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }
}
