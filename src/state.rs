//! Character state.
//!
//! [`CharacterState`] is the mutable half of a movement controller: latched
//! input, countdown timers and jump flags. The marker components below mirror
//! the current contact state so other systems can filter on it in queries.

use bevy::prelude::*;

use crate::collision::GroundedSurface;

/// Mutable per-character movement state.
///
/// Timers count down every frame and are compared with `> 0`. They are
/// never clamped, so a timer that ran out long ago is simply very negative.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterState {
    /// Latest input axis. `y` is stored but not used by any force model.
    pub axis: Vec2,
    /// Coyote window: positive while a jump may still count as grounded.
    pub grounded_grace: f32,
    /// Buffer window: positive while an early jump press is still pending.
    pub jump_buffer: f32,
    /// Positive while horizontal steering is locked out after a wall jump.
    pub wall_jump_lockout: f32,
    /// Set when a jump fires, cleared only by landing.
    pub is_jumping: bool,
    /// Set on jump release or when falling; landing only counts while set.
    pub jump_input_released: bool,
    pub last_grounded_surface: GroundedSurface,
}

impl CharacterState {
    /// Subtract elapsed time from every timer.
    pub fn tick(&mut self, delta: f32) {
        self.grounded_grace -= delta;
        self.jump_buffer -= delta;
        self.wall_jump_lockout -= delta;
    }

    #[inline]
    pub fn within_coyote_time(&self) -> bool {
        self.grounded_grace > 0.0
    }

    #[inline]
    pub fn jump_buffered(&self) -> bool {
        self.jump_buffer > 0.0
    }

    #[inline]
    pub fn wall_jump_locked(&self) -> bool {
        self.wall_jump_lockout > 0.0
    }
}

/// Marker component indicating the character is touching ground this tick.
///
/// Added automatically from the sensed contacts. Mutually exclusive with
/// [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is not touching ground.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Component present while the character touches a wall.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct TouchingWall {
    pub left: bool,
    pub right: bool,
}

impl TouchingWall {
    pub fn new(left: bool, right: bool) -> Self {
        Self { left, right }
    }

    /// Check if the wall is on the left side.
    pub fn is_left(&self) -> bool {
        self.left
    }

    /// Check if the wall is on the right side.
    pub fn is_right(&self) -> bool {
        self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_idle() {
        let state = CharacterState::default();
        assert!(!state.within_coyote_time());
        assert!(!state.jump_buffered());
        assert!(!state.wall_jump_locked());
        assert!(!state.is_jumping);
        assert!(!state.jump_input_released);
        assert_eq!(state.last_grounded_surface, GroundedSurface::None);
    }

    #[test]
    fn tick_decrements_without_floor() {
        let mut state = CharacterState {
            grounded_grace: 0.1,
            jump_buffer: 0.05,
            wall_jump_lockout: 0.0,
            ..default()
        };

        state.tick(0.08);
        assert!(state.within_coyote_time());
        assert!(!state.jump_buffered());
        assert!(state.jump_buffer < 0.0);
        assert!((state.wall_jump_lockout + 0.08).abs() < 1e-6);

        state.tick(0.08);
        assert!(!state.within_coyote_time());
    }

    #[test]
    fn timers_decrease_monotonically() {
        let mut state = CharacterState {
            grounded_grace: 1.0,
            ..default()
        };
        let mut previous = state.grounded_grace;
        for _ in 0..100 {
            state.tick(1.0 / 60.0);
            assert!(state.grounded_grace < previous);
            previous = state.grounded_grace;
        }
    }

    #[test]
    fn touching_wall_sides() {
        let wall = TouchingWall::new(true, false);
        assert!(wall.is_left());
        assert!(!wall.is_right());

        let wall = TouchingWall::new(false, true);
        assert!(wall.is_right());
        assert!(!wall.is_left());
    }
}
