//! Combat events for animation, audio and VFX collaborators.
//!
//! Fighters buffer events while they are stepped; the arena publishes them on
//! a bounded channel at the end of each tick.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use skirmish_common::{AttackId, EntityId, Vec2};

use crate::attack::AttackPhase;

/// Something observable happened to a fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack changed phase.
    PhaseChanged {
        /// Attacking fighter
        fighter: EntityId,
        /// Attack
        attack: AttackId,
        /// Phase entered
        phase: AttackPhase,
    },
    /// A hit dealt damage (possibly zero).
    HitLanded {
        /// Attacker, or `None` for environmental sources
        attacker: Option<EntityId>,
        /// Fighter that was hit
        target: EntityId,
        /// Health removed
        damage: i32,
        /// Contact point
        contact: Vec2,
    },
    /// A hit was blocked.
    HitBlocked {
        /// Attacker, or `None` for environmental sources
        attacker: Option<EntityId>,
        /// Blocking fighter
        target: EntityId,
        /// Damage that got through
        damage: i32,
    },
    /// A fighter was knocked down.
    KnockedDown {
        /// Fighter
        fighter: EntityId,
    },
    /// A knocked-down fighter started getting up.
    WakeupStarted {
        /// Fighter
        fighter: EntityId,
    },
    /// A fighter regained control after a stun or knockdown.
    Recovered {
        /// Fighter
        fighter: EntityId,
    },
    /// A fighter died.
    Died {
        /// Fighter
        fighter: EntityId,
        /// Who dealt the final hit
        killer: Option<EntityId>,
    },
    /// A fighter jumped.
    Jumped {
        /// Fighter
        fighter: EntityId,
    },
    /// A fighter dashed.
    Dashed {
        /// Fighter
        fighter: EntityId,
        /// True for a forward dash
        forward: bool,
    },
    /// A fighter entered or left the ready stance.
    ReadyChanged {
        /// Fighter
        fighter: EntityId,
        /// New stance
        ready: bool,
    },
    /// A fighter started or stopped blocking.
    BlockChanged {
        /// Fighter
        fighter: EntityId,
        /// New state
        blocking: bool,
    },
    /// A fighter switched form.
    FormSwitched {
        /// Fighter
        fighter: EntityId,
        /// New form name
        form: String,
    },
    /// An attack referenced a hitbox slot the fighter does not have.
    HitboxMissing {
        /// Fighter
        fighter: EntityId,
        /// Attack
        attack: AttackId,
        /// Slot index
        slot: usize,
    },
}

impl CombatEvent {
    /// Fighter the event is about (the target for hits).
    #[must_use]
    pub fn fighter(&self) -> EntityId {
        match self {
            Self::HitLanded { target, .. } | Self::HitBlocked { target, .. } => *target,
            Self::PhaseChanged { fighter, .. }
            | Self::KnockedDown { fighter }
            | Self::WakeupStarted { fighter }
            | Self::Recovered { fighter }
            | Self::Died { fighter, .. }
            | Self::Jumped { fighter }
            | Self::Dashed { fighter, .. }
            | Self::ReadyChanged { fighter, .. }
            | Self::BlockChanged { fighter, .. }
            | Self::FormSwitched { fighter, .. }
            | Self::HitboxMissing { fighter, .. } => *fighter,
        }
    }
}

/// Bounded event channel.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns false if the bus was full and it was dropped.
    pub fn publish(&self, event: CombatEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a receiver handle for a collaborator on another thread.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<CombatEvent> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(4);
        let fighter = EntityId::from_raw(3);
        assert!(bus.publish(CombatEvent::Jumped { fighter }));
        assert!(bus.publish(CombatEvent::KnockedDown { fighter }));
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], CombatEvent::Jumped { fighter });
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = EventBus::new(1);
        let fighter = EntityId::from_raw(1);
        assert!(bus.publish(CombatEvent::Jumped { fighter }));
        assert!(!bus.publish(CombatEvent::Jumped { fighter }));
        assert_eq!(bus.capacity(), 1);
    }

    #[test]
    fn test_event_fighter() {
        let attacker = EntityId::from_raw(1);
        let target = EntityId::from_raw(2);
        let event = CombatEvent::HitLanded {
            attacker: Some(attacker),
            target,
            damage: 5,
            contact: Vec2::ZERO,
        };
        assert_eq!(event.fighter(), target);
    }
}
