//! Movement intent component.
//!
//! Intents carry what the player (or AI) wants: a 2D input axis and jump
//! button edges. The controller systems drain them every frame.

use bevy::prelude::*;

/// A jump button transition.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpEdge {
    Pressed,
    Released,
}

/// Input for one character.
///
/// Axis values are passed through unchanged. Jump edges are queued in
/// arrival order, so a press and release inside the same frame are both
/// seen by the controller.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use platformer_movement::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_axis(Vec2::new(1.0, 0.0));
/// assert!(intent.is_moving());
///
/// // Level input from a held button becomes edges
/// intent.set_jump_pressed(true);
/// intent.set_jump_pressed(true);
/// intent.set_jump_pressed(false);
/// assert_eq!(intent.pending_edges(), &[JumpEdge::Pressed, JumpEdge::Released]);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Input axis, `x` right and `y` up, nominally in `[-1, 1]`.
    pub axis: Vec2,
    /// Last level passed to `set_jump_pressed`.
    jump_held: bool,
    edges: Vec<JumpEdge>,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input axis. No clamping is performed.
    pub fn set_axis(&mut self, axis: Vec2) {
        self.axis = axis;
    }

    /// Set only the horizontal axis.
    pub fn set_horizontal(&mut self, x: f32) {
        self.axis.x = x;
    }

    /// Zero the axis. Pending jump edges are kept.
    pub fn clear(&mut self) {
        self.axis = Vec2::ZERO;
    }

    /// Check if there is active horizontal input.
    pub fn is_moving(&self) -> bool {
        self.axis.x.abs() > 0.001
    }

    /// Queue a jump press.
    pub fn press_jump(&mut self) {
        self.jump_held = true;
        self.edges.push(JumpEdge::Pressed);
    }

    /// Queue a jump release.
    pub fn release_jump(&mut self) {
        self.jump_held = false;
        self.edges.push(JumpEdge::Released);
    }

    /// Set the jump button level and queue an edge when it changes.
    ///
    /// Call this every frame with the current button state, from any input
    /// source.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        match (self.jump_held, pressed) {
            (false, true) => self.press_jump(),
            (true, false) => self.release_jump(),
            _ => {}
        }
    }

    /// Whether the jump button is currently held.
    pub fn is_jump_held(&self) -> bool {
        self.jump_held
    }

    /// Edges not yet consumed by the controller.
    pub fn pending_edges(&self) -> &[JumpEdge] {
        &self.edges
    }

    /// Take all pending edges, oldest first.
    pub fn drain_edges(&mut self) -> Vec<JumpEdge> {
        std::mem::take(&mut self.edges)
    }

    /// Drop pending edges without handling them.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
    }
}
