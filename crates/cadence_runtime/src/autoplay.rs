//! Scripted player: dashes onto the oldest live note on every beat.

use cadence_core::ecs::Entity;
use cadence_game::components::Position;
use cadence_game::{BeatNotification, Encounter, EventKey, GameEvent};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

type Targets = Rc<RefCell<VecDeque<(Entity, Position)>>>;

pub struct Autoplay {
    targets: Targets,
}

impl Autoplay {
    /// Track spawned notes on the encounter's bus.
    pub fn attach(encounter: &Encounter) -> Self {
        let targets: Targets = Rc::default();

        let spawned = Rc::clone(&targets);
        encounter.bus().subscribe(EventKey::TileSpawned, move |_, _, event| {
            if let GameEvent::TileSpawned { note, position, .. } = *event {
                spawned.borrow_mut().push_back((note, position));
            }
        });
        for key in [EventKey::NoteExpired, EventKey::NoteHit] {
            let gone = Rc::clone(&targets);
            encounter.bus().subscribe(key, move |_, _, event| {
                let note = match *event {
                    GameEvent::NoteExpired { note } | GameEvent::NoteHit { note } => note,
                    _ => return,
                };
                gone.borrow_mut().retain(|(n, _)| *n != note);
            });
        }

        Self { targets }
    }

    /// Press exactly on `beat` if there is a note to chase and a charge to
    /// spend.
    pub fn on_beat(&self, encounter: &mut Encounter, beat: &BeatNotification) -> bool {
        let has_charge = encounter
            .player_resources()
            .is_some_and(|r| r.dash_charges > 0);
        if !has_charge {
            return false;
        }
        let Some(&(note, target)) = self.targets.borrow().front() else {
            return false;
        };
        trace!(%note, x = target.x, y = target.y, "autoplay dash");
        encounter.pointer_down(beat.time, target.x, target.y)
    }

    pub fn pending(&self) -> usize {
        self.targets.borrow().len()
    }
}
