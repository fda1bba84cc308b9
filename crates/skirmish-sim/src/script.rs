//! Scripted duel controller.
//!
//! A small deterministic opponent brain: close the distance (running when
//! far), strike when in range, block when the other fighter is winding up,
//! and chain a cancel when an attack is in recovery.

use skirmish_common::EntityId;
use skirmish_core::{Arena, AttackPhase, FireOutcome};
use tracing::trace;

/// Distance at which the controller stops running and walks.
const RUN_DISTANCE: f32 = 5.0;

/// What the controller decided this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do (dead, stunned or opponent gone)
    Idle,
    /// Closing distance
    Approach,
    /// Holding a block
    Block,
    /// Sent an attack input
    Attack,
    /// Waiting for a cooldown in range
    Wait,
}

/// Drives one fighter against one opponent.
#[derive(Debug, Clone)]
pub struct DuelController {
    fighter: EntityId,
    opponent: EntityId,
    attack_range: f32,
    /// Ticks between attack attempts
    cadence: u32,
    cooldown: u32,
    strikes: u32,
}

impl DuelController {
    /// Creates a controller for `fighter` targeting `opponent`.
    #[must_use]
    pub fn new(fighter: EntityId, opponent: EntityId) -> Self {
        Self {
            fighter,
            opponent,
            attack_range: 1.4,
            cadence: 12,
            cooldown: 0,
            strikes: 0,
        }
    }

    /// Sets the distance at which attacks are attempted.
    #[must_use]
    pub fn with_attack_range(mut self, range: f32) -> Self {
        self.attack_range = range.max(0.1);
        self
    }

    /// Sets the ticks between attack attempts.
    #[must_use]
    pub fn with_cadence(mut self, ticks: u32) -> Self {
        self.cadence = ticks.max(1);
        self
    }

    /// Submits this tick's intents. Call once per tick before `Arena::step`.
    pub fn drive(&mut self, arena: &mut Arena) -> Decision {
        self.cooldown = self.cooldown.saturating_sub(1);

        let Some(opponent) = arena.fighter(self.opponent) else {
            return Decision::Idle;
        };
        let opponent_x = opponent.position().x;
        let opponent_threatens = opponent.is_alive()
            && matches!(opponent.phase(), AttackPhase::Startup | AttackPhase::Active);
        let opponent_alive = opponent.is_alive();

        let Some(me) = arena.fighter_mut(self.fighter) else {
            return Decision::Idle;
        };
        if !me.is_alive() || me.is_stunned() || !opponent_alive {
            me.submit_move_intent(0.0);
            return Decision::Idle;
        }

        let dx = opponent_x - me.position().x;
        let distance = dx.abs();
        let toward = if dx < 0.0 { -1.0 } else { 1.0 };

        if distance > self.attack_range {
            me.submit_block_intent(false);
            let intent = if distance > RUN_DISTANCE { 2.0 * toward } else { toward };
            me.submit_move_intent(intent);
            return Decision::Approach;
        }

        // In range: face the opponent before anything else.
        if me.facing() != toward {
            me.submit_move_intent(toward * 0.1);
            return Decision::Approach;
        }
        me.submit_move_intent(0.0);

        if opponent_threatens && me.phase() == AttackPhase::None {
            if me.submit_block_intent(true) {
                return Decision::Block;
            }
        } else if me.is_blocking() {
            me.submit_block_intent(false);
        }

        // Chain the follow-up as soon as the first strike is in recovery.
        if me.phase() == AttackPhase::Recovery {
            me.receive_attack_input("light");
            if let Some(FireOutcome::Started { attack, .. }) = me.resolve_queued_attacks() {
                trace!(fighter = %self.fighter, ?attack, "Chained attack");
                return Decision::Attack;
            }
        }

        if self.cooldown > 0 {
            return Decision::Wait;
        }
        self.cooldown = self.cadence;
        self.strikes += 1;
        let input = if self.strikes % 3 == 0 { "heavy" } else { "light" };
        me.receive_attack_input(input);
        match me.resolve_queued_attacks() {
            Some(outcome) => {
                trace!(fighter = %self.fighter, input, ?outcome, "Attack input");
                Decision::Attack
            }
            None => Decision::Wait,
        }
    }
}
