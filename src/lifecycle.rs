//! Hazards, death notification and movement events.
//!
//! Colliders tagged with [`Hazard`] kill a character on first contact. The
//! physics backend reports such contacts as [`HazardTouched`]; the
//! [`dispatch_deaths`] system turns them into a call of the character's
//! [`DeathCallback`](crate::controller::DeathCallback) and a [`CharacterDied`]
//! event. What dying means (respawn, game over) is up to the game.

use bevy::prelude::*;

use crate::collision::GroundedSurface;
use crate::controller::{JumpKind, MovementController};

/// Marker for colliders that kill characters on contact (spikes, lava...).
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Hazard;

/// Raw report from a physics backend: a character started touching a hazard.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardTouched {
    pub character: Entity,
    pub hazard: Entity,
}

/// A character touched a hazard.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterDied {
    pub character: Entity,
    pub hazard: Entity,
}

/// A jump fired this physics tick.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jumped {
    pub character: Entity,
    pub kind: JumpKind,
}

/// A character landed on a surface after being airborne or jumping.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landed {
    pub character: Entity,
    pub surface: GroundedSurface,
}

/// Notify each character that touched a hazard.
pub fn dispatch_deaths(
    mut touched: EventReader<HazardTouched>,
    q_controllers: Query<&MovementController>,
    mut died: EventWriter<CharacterDied>,
) {
    for contact in touched.read() {
        let Ok(controller) = q_controllers.get(contact.character) else {
            continue;
        };

        info!(
            "character {} touched hazard {}",
            contact.character, contact.hazard
        );
        controller.notify_death(contact.character);
        died.write(CharacterDied {
            character: contact.character,
            hazard: contact.hazard,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::MovementTuning;

    #[derive(Resource, Default)]
    struct DeathLog(Vec<CharacterDied>);

    fn record_deaths(mut events: EventReader<CharacterDied>, mut log: ResMut<DeathLog>) {
        log.0.extend(events.read().copied());
    }

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_event::<HazardTouched>();
        app.add_event::<CharacterDied>();
        app.init_resource::<DeathLog>();
        app.add_systems(Update, (dispatch_deaths, record_deaths).chain());
        app
    }

    #[test]
    fn hazard_contact_calls_back_and_emits_event() {
        let mut app = create_test_app();
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();

        let controller = MovementController::new(MovementTuning::default())
            .unwrap()
            .with_death_callback(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        let character = app.world_mut().spawn(controller).id();
        let hazard = app.world_mut().spawn(Hazard).id();

        app.world_mut().send_event(HazardTouched { character, hazard });
        app.update();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let log = app.world().resource::<DeathLog>();
        assert_eq!(log.0, vec![CharacterDied { character, hazard }]);
    }

    #[test]
    fn contacts_for_non_characters_are_ignored() {
        let mut app = create_test_app();
        let bystander = app.world_mut().spawn_empty().id();
        let hazard = app.world_mut().spawn(Hazard).id();

        app.world_mut().send_event(HazardTouched {
            character: bystander,
            hazard,
        });
        app.update();

        assert!(app.world().resource::<DeathLog>().0.is_empty());
    }
}
