//! Hit resolution.
//!
//! `resolve_hit` is the only place one fighter's hit mutates another fighter.
//! It applies block mitigation, health loss, death, and target knockback or
//! knockdown. Attacker recoil is returned in the report for the caller to
//! apply to the attacker.

use skirmish_common::{EntityId, Vec2};
use tracing::debug;

use crate::events::CombatEvent;
use crate::fighter::Fighter;

/// One hit about to be applied to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Damage before mitigation
    pub amount: i32,
    /// Attacking fighter, `None` for environmental sources
    pub attacker: Option<EntityId>,
    /// Position the hit comes from (the attacker's position)
    pub source_position: Vec2,
    /// Contact point on the target
    pub contact: Vec2,
    /// Recoil for the attacker, x pointing away from the target
    pub attacker_knockback: Vec2,
    /// Knockback for the target, x pointing away from the attacker
    pub target_knockback: Vec2,
    /// Knock the target down when not blocked
    pub knockdown: bool,
    /// Stun applied with a plain knockback
    pub hit_stun: f32,
    /// Kill outright, ignoring block and invulnerability
    pub lethal: bool,
}

impl Hit {
    /// Environmental damage with no knockback.
    #[must_use]
    pub fn environmental(amount: i32, instigator: Option<EntityId>, location: Vec2) -> Self {
        Self {
            amount,
            attacker: instigator,
            source_position: location,
            contact: location,
            attacker_knockback: Vec2::ZERO,
            target_knockback: Vec2::ZERO,
            knockdown: false,
            hit_stun: 0.0,
            lethal: false,
        }
    }

    /// Unconditionally lethal hazard hit.
    #[must_use]
    pub fn lethal(instigator: Option<EntityId>, location: Vec2) -> Self {
        Self {
            lethal: true,
            ..Self::environmental(0, instigator, location)
        }
    }
}

/// What a resolved hit did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitReport {
    /// Health removed from the target
    pub dealt: i32,
    /// The target blocked the hit
    pub blocked: bool,
    /// The hit killed the target
    pub killed: bool,
    /// The hit knocked the target down
    pub knocked_down: bool,
    /// Recoil the attacker should receive, before scaling by its physics step
    pub attacker_recoil: Vec2,
}

/// Damage that gets through a block: `max(1, amount * factor)`, truncated.
#[must_use]
pub fn mitigated_damage(amount: i32, factor: f32) -> i32 {
    (amount as f32 * factor).max(1.0) as i32
}

/// Horizontal direction from the source to the target; a tie counts as right.
#[must_use]
pub fn hit_direction(target_x: f32, source_x: f32) -> f32 {
    if target_x - source_x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Applies `hit` to `target`. Hits on dead targets are no-ops.
pub fn resolve_hit(target: &mut Fighter, hit: &Hit) -> HitReport {
    if !target.is_alive() {
        return HitReport::default();
    }

    let diff_x = target.position().x - hit.source_position.x;
    let blocked = !hit.lethal
        && target.is_blocking()
        && target.config().block.rule.blocks(target.facing(), diff_x);

    let amount = if hit.lethal {
        target.health().max()
    } else if blocked {
        mitigated_damage(hit.amount, target.config().block.factor)
    } else {
        hit.amount.max(0)
    };

    let change = target.health_mut().apply_damage(amount, hit.lethal);
    let target_id = target.id();
    if blocked {
        target.push_event(CombatEvent::HitBlocked {
            attacker: hit.attacker,
            target: target_id,
            damage: change.dealt,
        });
    } else {
        target.push_event(CombatEvent::HitLanded {
            attacker: hit.attacker,
            target: target_id,
            damage: change.dealt,
            contact: hit.contact,
        });
    }
    debug!(target = %target_id, dealt = change.dealt, blocked, "Hit resolved");

    let direction = hit_direction(target.position().x, hit.source_position.x);
    let attacker_recoil = if hit.attacker_knockback.is_zero() {
        Vec2::ZERO
    } else {
        Vec2::new(hit.attacker_knockback.x * -direction, hit.attacker_knockback.y)
    };

    if change.died {
        target.die(hit.attacker);
    }

    let mut knocked_down = false;
    if !hit.target_knockback.is_zero() {
        let force = Vec2::new(hit.target_knockback.x * direction, hit.target_knockback.y)
            * target.config().fixed_step;
        if hit.knockdown && !blocked {
            target.knock_down(force);
            knocked_down = true;
        } else {
            target.knockback(force, hit.hit_stun);
        }
    }

    HitReport {
        dealt: change.dealt,
        blocked,
        killed: change.died,
        knocked_down,
        attacker_recoil,
    }
}
