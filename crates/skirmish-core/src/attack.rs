//! Attack phase state machine.
//!
//! Phases cycle `None -> Startup -> Active -> Recovery -> None`. A new attack
//! can start from `None`, or from `Recovery` when its cancel list names the
//! attack currently recovering. Phase timers are countdowns advanced once per
//! tick; overshoot carries into the next phase, and a tick longer than a
//! phase runs through several transitions in order, so no phase is skipped
//! and the total stays within one tick of the authored duration.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use skirmish_common::{AttackId, EntityId};
use tracing::debug;

use crate::catalog::{AttackCatalog, AttackDefinition};

// ============================================================================
// Phases and outcomes
// ============================================================================

/// Phase of the attack currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackPhase {
    /// No attack.
    #[default]
    None,
    /// Wind-up.
    Startup,
    /// Hitboxes live.
    Active,
    /// Cool-down; cancellable.
    Recovery,
}

impl AttackPhase {
    /// Phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Startup => Self::Active,
            Self::Active => Self::Recovery,
            Self::Recovery => Self::None,
        }
    }

    /// Check if an attack is executing.
    #[must_use]
    pub const fn is_attacking(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Check if hitboxes can deal damage.
    #[must_use]
    pub const fn can_damage(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Why a fire request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireRejection {
    /// The attack name or handle is not in the catalog.
    UnknownAttack,
    /// The fighter is dead.
    Dead,
    /// The fighter is stunned.
    Stunned,
    /// The fighter had to enter its ready stance first.
    NotReady,
    /// The current form cannot attack.
    FormCannotAttack,
    /// Cancel-only attacks cannot start a sequence.
    CancelOnly,
    /// The recovering attack is not in this attack's cancel list.
    NotCancellable,
    /// An attack is in startup or active.
    Busy,
}

/// Result of a fire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The attack entered startup.
    Started {
        /// Attack that started
        attack: AttackId,
        /// Attack whose recovery was cancelled, if any
        cancelled: Option<AttackId>,
    },
    /// The attack did not start.
    Rejected(FireRejection),
}

impl FireOutcome {
    /// Returns true if the attack started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// A phase change reported by `CombatStateMachine::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Attack that changed phase
    pub attack: AttackId,
    /// Phase left
    pub from: AttackPhase,
    /// Phase entered
    pub to: AttackPhase,
}

// ============================================================================
// State machine
// ============================================================================

/// Attack runtime state of one fighter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatStateMachine {
    phase: AttackPhase,
    current: Option<AttackId>,
    phase_remaining: f32,
    damaged: AHashMap<u32, AHashSet<EntityId>>,
    missing_slots_reported: Vec<usize>,
    queue: Vec<AttackId>,
    swept_active: Option<AttackId>,
}

impl CombatStateMachine {
    /// Creates an idle state machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Attack currently executing (`None` when the phase is `None`).
    #[must_use]
    pub const fn current(&self) -> Option<AttackId> {
        self.current
    }

    /// Seconds (at attack speed 1) left in the current phase.
    #[must_use]
    pub const fn phase_remaining(&self) -> f32 {
        self.phase_remaining
    }

    /// Checks whether `attack` may start now, ignoring stun and stance.
    pub fn can_fire(&self, attack: &AttackDefinition) -> Result<(), FireRejection> {
        match self.phase {
            AttackPhase::None if attack.cancel_only => Err(FireRejection::CancelOnly),
            AttackPhase::None => Ok(()),
            AttackPhase::Recovery => match self.current {
                Some(current) if attack.can_cancel_from(current) => Ok(()),
                _ => Err(FireRejection::NotCancellable),
            },
            AttackPhase::Startup | AttackPhase::Active => Err(FireRejection::Busy),
        }
    }

    /// Enters startup of `attack`, discarding whatever was running.
    ///
    /// Returns the attack whose recovery was cancelled, if any.
    pub fn begin(&mut self, attack: &AttackDefinition) -> Option<AttackId> {
        let cancelled = self.current.filter(|_| self.phase.is_attacking());
        self.phase = AttackPhase::Startup;
        self.current = Some(attack.id);
        self.phase_remaining = attack.timing.startup;
        self.damaged.clear();
        self.missing_slots_reported.clear();
        self.swept_active = None;
        debug!(attack = %attack.name, ?cancelled, "Attack started");
        cancelled
    }

    /// Advances the phase timer by `scaled_dt` (elapsed time times attack speed).
    ///
    /// Runs every transition the elapsed time covers, in order, carrying the
    /// overshoot from one phase into the next.
    pub fn advance(&mut self, scaled_dt: f32, catalog: &AttackCatalog) -> Vec<PhaseTransition> {
        self.swept_active = None;
        let mut transitions = Vec::new();
        let Some(attack_id) = self.current else {
            return transitions;
        };
        if !self.phase.is_attacking() {
            return transitions;
        }
        let Some(attack) = catalog.get(attack_id) else {
            // Handle from a different catalog; abandon the attack.
            self.reset_attack();
            return transitions;
        };

        self.phase_remaining -= scaled_dt;
        while self.phase.is_attacking() && self.phase_remaining <= 0.0 {
            let overshoot = -self.phase_remaining;
            let from = self.phase;
            let to = from.next();
            debug_assert!(from != to, "attack phase did not advance");

            self.phase = to;
            match to {
                AttackPhase::None => {
                    self.current = None;
                    self.phase_remaining = 0.0;
                }
                _ => {
                    self.phase_remaining = attack.timing.duration(to) - overshoot;
                }
            }
            if to == AttackPhase::Active {
                self.damaged.clear();
                self.swept_active = Some(attack_id);
            }

            debug!(attack = %attack.name, ?from, ?to, "Attack phase changed");
            transitions.push(PhaseTransition {
                attack: attack_id,
                from,
                to,
            });
        }
        transitions
    }

    /// Attack whose hitboxes are live this tick.
    ///
    /// This is the current attack while active, or an attack whose active
    /// window opened and closed within the last `advance`.
    #[must_use]
    pub fn hitbox_attack(&self) -> Option<AttackId> {
        if self.phase.can_damage() {
            self.current
        } else {
            self.swept_active
        }
    }

    /// Records that `target` was hit by hitbox instance `instance`.
    ///
    /// Returns false if the target was already recorded for that instance.
    pub fn record_hit(&mut self, instance: u32, target: EntityId) -> bool {
        self.damaged.entry(instance).or_default().insert(target)
    }

    /// Returns true if `target` was already hit by `instance` this execution.
    #[must_use]
    pub fn has_hit(&self, instance: u32, target: EntityId) -> bool {
        self.damaged
            .get(&instance)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Marks a missing hitbox slot as reported; returns true the first time
    /// per execution.
    pub fn report_missing_slot(&mut self, slot: usize) -> bool {
        if self.missing_slots_reported.contains(&slot) {
            return false;
        }
        self.missing_slots_reported.push(slot);
        true
    }

    /// Queues an attack for this tick's selection. Duplicates are rejected.
    pub fn try_queue(&mut self, attack: AttackId) -> bool {
        if self.queue.contains(&attack) {
            return false;
        }
        self.queue.push(attack);
        true
    }

    /// Attacks queued this tick.
    #[must_use]
    pub fn queued(&self) -> &[AttackId] {
        &self.queue
    }

    /// Clears the queue and returns its highest-priority entry.
    ///
    /// Ties go to the attack that comes first in the catalog.
    pub fn take_queue_choice(&mut self, catalog: &AttackCatalog) -> Option<AttackId> {
        let choice = self
            .queue
            .iter()
            .filter_map(|id| catalog.get(*id))
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.id.cmp(&a.id)))
            .map(|a| a.id);
        self.queue.clear();
        choice
    }

    fn reset_attack(&mut self) {
        self.phase = AttackPhase::None;
        self.current = None;
        self.phase_remaining = 0.0;
        self.damaged.clear();
        self.missing_slots_reported.clear();
        self.swept_active = None;
    }

    /// Returns to idle and drops the queue.
    pub fn reset(&mut self) {
        self.reset_attack();
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttackSpec, PhaseTiming};

    fn catalog() -> AttackCatalog {
        AttackCatalog::from_specs(vec![
            AttackSpec::new("jab", PhaseTiming::new(0.1, 0.1, 0.2)).with_priority(1),
            AttackSpec::new("cross", PhaseTiming::new(0.1, 0.1, 0.2))
                .with_priority(1)
                .cancels_from("jab"),
            AttackSpec::new("finisher", PhaseTiming::new(0.1, 0.1, 0.2))
                .with_priority(5)
                .cancels_from("cross")
                .cancel_only(),
        ])
        .expect("valid catalog")
    }

    fn def<'a>(catalog: &'a AttackCatalog, name: &str) -> &'a AttackDefinition {
        catalog.by_name(name).expect("attack exists")
    }

    #[test]
    fn test_phase_sequence() {
        let catalog = catalog();
        let mut csm = CombatStateMachine::new();
        assert_eq!(csm.can_fire(def(&catalog, "jab")), Ok(()));
        csm.begin(def(&catalog, "jab"));

        let mut phases = vec![csm.phase()];
        let mut elapsed = 0.0;
        while csm.phase().is_attacking() {
            elapsed += 0.02;
            for t in csm.advance(0.02, &catalog) {
                assert_eq!(t.from, *phases.last().expect("non-empty"));
                phases.push(t.to);
            }
        }
        assert_eq!(
            phases,
            vec![
                AttackPhase::Startup,
                AttackPhase::Active,
                AttackPhase::Recovery,
                AttackPhase::None
            ]
        );
        assert!((elapsed - 0.4_f32).abs() <= 0.02 + 1e-4);
        assert_eq!(csm.current(), None);
    }

    #[test]
    fn test_attack_speed_scales_duration() {
        let catalog = catalog();
        let mut csm = CombatStateMachine::new();
        csm.begin(def(&catalog, "jab"));
        let mut ticks = 0;
        while csm.phase().is_attacking() {
            csm.advance(0.02 * 2.0, &catalog);
            ticks += 1;
        }
        // 0.4 s at double speed is 0.2 s, i.e. ten ticks.
        assert!((10..=11).contains(&ticks));
    }

    #[test]
    fn test_long_tick_runs_every_transition() {
        let catalog = catalog();
        let mut csm = CombatStateMachine::new();
        csm.begin(def(&catalog, "jab"));

        let transitions = csm.advance(0.25, &catalog);
        let phases: Vec<_> = transitions.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            phases,
            vec![
                (AttackPhase::Startup, AttackPhase::Active),
                (AttackPhase::Active, AttackPhase::Recovery),
            ]
        );
        assert!((csm.phase_remaining() - 0.15).abs() < 1e-5);
        assert_eq!(csm.hitbox_attack(), Some(def(&catalog, "jab").id));

        let transitions = csm.advance(0.2, &catalog);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to, AttackPhase::None);
        assert_eq!(csm.hitbox_attack(), None);
    }

    #[test]
    fn test_sub_tick_phases_keep_total_duration() {
        let catalog = AttackCatalog::from_specs(vec![AttackSpec::new(
            "flick",
            PhaseTiming::new(0.01, 0.01, 0.01),
        )])
        .expect("valid catalog");
        let flick = def(&catalog, "flick").id;
        let mut csm = CombatStateMachine::new();
        csm.begin(def(&catalog, "flick"));

        let mut phases = vec![csm.phase()];
        let mut elapsed = 0.0_f32;
        let mut live_ticks = 0;
        while csm.phase().is_attacking() {
            elapsed += 0.02;
            for t in csm.advance(0.02, &catalog) {
                assert_eq!(t.from, *phases.last().expect("non-empty"));
                phases.push(t.to);
            }
            if csm.hitbox_attack() == Some(flick) {
                live_ticks += 1;
            }
            assert!(elapsed < 1.0);
        }

        assert_eq!(
            phases,
            vec![
                AttackPhase::Startup,
                AttackPhase::Active,
                AttackPhase::Recovery,
                AttackPhase::None
            ]
        );
        assert!((elapsed - 0.03_f32).abs() <= 0.02 + 1e-4, "elapsed {elapsed}");
        assert_eq!(live_ticks, 1);
    }

    #[test]
    fn test_can_fire_rules() {
        let catalog = catalog();
        let jab = def(&catalog, "jab");
        let cross = def(&catalog, "cross");
        let finisher = def(&catalog, "finisher");

        let mut csm = CombatStateMachine::new();
        assert_eq!(csm.can_fire(finisher), Err(FireRejection::CancelOnly));

        csm.begin(jab);
        assert_eq!(csm.can_fire(cross), Err(FireRejection::Busy));
        csm.advance(0.1, &catalog);
        assert_eq!(csm.phase(), AttackPhase::Active);
        assert_eq!(csm.can_fire(cross), Err(FireRejection::Busy));
        csm.advance(0.1, &catalog);
        assert_eq!(csm.phase(), AttackPhase::Recovery);

        assert_eq!(csm.can_fire(cross), Ok(()));
        assert_eq!(csm.can_fire(jab), Err(FireRejection::NotCancellable));
        assert_eq!(csm.can_fire(finisher), Err(FireRejection::NotCancellable));

        assert_eq!(csm.begin(cross), Some(jab.id));
        assert_eq!(csm.phase(), AttackPhase::Startup);
        assert_eq!(csm.current(), Some(cross.id));
    }

    #[test]
    fn test_hit_bookkeeping_resets_per_execution() {
        let catalog = catalog();
        let target = EntityId::from_raw(9);
        let mut csm = CombatStateMachine::new();
        csm.begin(def(&catalog, "jab"));
        csm.advance(0.1, &catalog);

        assert!(csm.record_hit(0, target));
        assert!(!csm.record_hit(0, target));
        assert!(csm.record_hit(1, target));
        assert!(csm.has_hit(0, target));

        csm.begin(def(&catalog, "jab"));
        assert!(!csm.has_hit(0, target));
    }

    #[test]
    fn test_queue_selects_highest_priority() {
        let catalog = catalog();
        let mut csm = CombatStateMachine::new();
        let jab = def(&catalog, "jab").id;
        let cross = def(&catalog, "cross").id;
        let finisher = def(&catalog, "finisher").id;

        assert!(csm.try_queue(cross));
        assert!(csm.try_queue(jab));
        assert!(!csm.try_queue(jab));
        // Equal priority: catalog order wins.
        assert_eq!(csm.take_queue_choice(&catalog), Some(jab));
        assert!(csm.queued().is_empty());

        csm.try_queue(jab);
        csm.try_queue(finisher);
        assert_eq!(csm.take_queue_choice(&catalog), Some(finisher));
        assert_eq!(csm.take_queue_choice(&catalog), None);
    }

    #[test]
    fn test_missing_slot_reported_once_per_execution() {
        let catalog = catalog();
        let mut csm = CombatStateMachine::new();
        csm.begin(def(&catalog, "jab"));
        assert!(csm.report_missing_slot(3));
        assert!(!csm.report_missing_slot(3));
        csm.begin(def(&catalog, "jab"));
        assert!(csm.report_missing_slot(3));
    }
}
