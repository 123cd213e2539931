//! Error types.
//!
//! The controller has no runtime error paths. Everything that can go wrong is
//! a configuration or attachment problem and is reported before the first tick.

use bevy::prelude::*;
use thiserror::Error;

/// Rejected tuning parameters.
#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    /// A parameter that must be zero or positive was negative.
    #[error("tuning parameter `{field}` must not be negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    /// A parameter was NaN or infinite.
    #[error("tuning parameter `{field}` must be finite (got {value})")]
    NotFinite { field: &'static str, value: f32 },

    /// A retained fraction was above 1.
    #[error("tuning parameter `{field}` is a fraction and must be at most 1 (got {value})")]
    FractionAboveOne { field: &'static str, value: f32 },

    /// RON text could not be parsed into tuning parameters.
    #[error("failed to parse movement tuning: {0}")]
    Parse(String),

    /// Tuning could not be written out as RON text.
    #[error("failed to serialize movement tuning: {0}")]
    Serialize(String),
}

/// Errors raised while attaching a controller to an entity.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The entity carrying a `MovementController` has no rigid body to drive.
    #[error("entity {0} has a MovementController but no rigid body")]
    MissingRigidBody(Entity),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_message_names_field() {
        let err = TuningError::Negative {
            field: "move_speed",
            value: -1.0,
        };
        assert!(err.to_string().contains("move_speed"));
    }

    #[test]
    fn parse_and_serialize_failures_read_differently() {
        let parse = TuningError::Parse("expected float".into()).to_string();
        let serialize = TuningError::Serialize("io".into()).to_string();
        assert!(parse.starts_with("failed to parse"));
        assert!(serialize.starts_with("failed to serialize"));
    }

    #[test]
    fn missing_rigid_body_names_entity() {
        let entity = Entity::from_raw(7);
        let err = ControllerError::MissingRigidBody(entity);
        assert!(err.to_string().contains(&entity.to_string()));
    }
}
