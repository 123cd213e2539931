//! Contact sensing data.
//!
//! These structures hold what the physics backend reports about the surfaces
//! a character is touching, and how those contacts are classified.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// The surface a character last stood on or clung to.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroundedSurface {
    /// Nothing has been touched since spawn.
    #[default]
    None,
    /// Floor.
    Ground,
    /// A wall on the character's left. Wall jumps push to the right.
    LeftWall,
    /// A wall on the character's right. Wall jumps push to the left.
    RightWall,
}

/// Surfaces touched during the current physics tick.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceContacts {
    pub ground: bool,
    pub left_wall: bool,
    pub right_wall: bool,
}

impl SurfaceContacts {
    /// Classification order. The first touched surface wins.
    pub const PRIORITY: [GroundedSurface; 3] = [
        GroundedSurface::Ground,
        GroundedSurface::LeftWall,
        GroundedSurface::RightWall,
    ];

    pub fn new(ground: bool, left_wall: bool, right_wall: bool) -> Self {
        Self {
            ground,
            left_wall,
            right_wall,
        }
    }

    /// Whether the given surface is being touched.
    pub fn touches(&self, surface: GroundedSurface) -> bool {
        match surface {
            GroundedSurface::None => false,
            GroundedSurface::Ground => self.ground,
            GroundedSurface::LeftWall => self.left_wall,
            GroundedSurface::RightWall => self.right_wall,
        }
    }

    pub fn any(&self) -> bool {
        self.ground || self.left_wall || self.right_wall
    }

    pub fn touching_wall(&self) -> bool {
        self.left_wall || self.right_wall
    }

    /// Highest-priority surface touched, if any.
    pub fn classify(&self) -> Option<GroundedSurface> {
        Self::PRIORITY.into_iter().find(|s| self.touches(*s))
    }

    /// Add every surface `other` touches.
    pub fn merge(&mut self, other: SurfaceContacts) {
        self.ground |= other.ground;
        self.left_wall |= other.left_wall;
        self.right_wall |= other.right_wall;
    }
}

/// Filter deciding whether a contact counts as a given surface.
///
/// A contact matches when its collision groups pass (if set) and the contact
/// normal, oriented from the touched surface toward the character, lies in
/// the angle window `[min_normal_angle, max_normal_angle]` (degrees,
/// counter-clockwise from +X). Windows may wrap past 360.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ContactFilter {
    /// Optional `(memberships, filters)` bit masks the other collider must pass.
    pub groups: Option<(u32, u32)>,
    pub min_normal_angle: f32,
    pub max_normal_angle: f32,
}

impl ContactFilter {
    pub fn new(min_normal_angle: f32, max_normal_angle: f32) -> Self {
        Self {
            groups: None,
            min_normal_angle,
            max_normal_angle,
        }
    }

    /// Ground: surfaces facing up.
    pub fn ground() -> Self {
        Self::new(45.0, 135.0)
    }

    /// Left wall: surfaces facing right.
    pub fn left_wall() -> Self {
        Self::new(-45.0, 45.0)
    }

    /// Right wall: surfaces facing left.
    pub fn right_wall() -> Self {
        Self::new(135.0, 225.0)
    }

    /// Builder: require the other collider to be in these groups.
    pub fn with_groups(mut self, memberships: u32, filters: u32) -> Self {
        self.groups = Some((memberships, filters));
        self
    }

    /// Check a contact normal (pointing toward the character).
    pub fn accepts_normal(&self, normal: Vec2) -> bool {
        if normal == Vec2::ZERO {
            return false;
        }
        let angle = normal.to_angle().to_degrees();
        let span = self.max_normal_angle - self.min_normal_angle;
        if span >= 360.0 {
            return true;
        }
        (angle - self.min_normal_angle).rem_euclid(360.0) <= span
    }

    /// Check the other collider's `(memberships, filters)` against this filter.
    ///
    /// Colliders without groups pass everything.
    pub fn accepts_groups(&self, other: Option<(u32, u32)>) -> bool {
        match (self.groups, other) {
            (Some((memberships, filters)), Some((other_memberships, other_filters))) => {
                memberships & other_filters != 0 && other_memberships & filters != 0
            }
            _ => true,
        }
    }

    pub fn accepts(&self, normal: Vec2, other_groups: Option<(u32, u32)>) -> bool {
        self.accepts_groups(other_groups) && self.accepts_normal(normal)
    }
}

/// Contact filters for the three surfaces a character can stand on.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ContactFilters {
    pub ground: ContactFilter,
    pub left_wall: ContactFilter,
    pub right_wall: ContactFilter,
    /// Largest gap between the character's collider and a surface that still
    /// counts as touching, in world units.
    pub contact_distance: f32,
}

impl Default for ContactFilters {
    fn default() -> Self {
        Self {
            ground: ContactFilter::ground(),
            left_wall: ContactFilter::left_wall(),
            right_wall: ContactFilter::right_wall(),
            contact_distance: 0.05,
        }
    }
}

impl ContactFilters {
    /// Builder: set the touching distance. Pixel-scale worlds need a larger one.
    pub fn with_contact_distance(mut self, distance: f32) -> Self {
        self.contact_distance = distance;
        self
    }

    /// Surfaces matched by one contact.
    pub fn classify_contact(&self, normal: Vec2, other_groups: Option<(u32, u32)>) -> SurfaceContacts {
        SurfaceContacts::new(
            self.ground.accepts(normal, other_groups),
            self.left_wall.accepts(normal, other_groups),
            self.right_wall.accepts(normal, other_groups),
        )
    }
}
