//! The fighter aggregate.
//!
//! A `Fighter` composes independent capabilities (health, body, locomotion,
//! modifier stack, stun, attack state machine) with the stance state that
//! ties them together: ready stance, blocking, dashing and forms. Controllers
//! call the intent methods once per tick; the arena drives the per-tick
//! phases in a fixed order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skirmish_common::{AttackId, EntityId, Vec2};
use tracing::{debug, error};

use crate::actor::Health;
use crate::attack::{AttackPhase, CombatStateMachine, FireOutcome, FireRejection};
use crate::body::{Body, BodyContacts};
use crate::catalog::{AttackCatalog, AttackContext, AttackDefinition};
use crate::collision::{CollisionWorld, LayerMask, AABB};
use crate::config::{BlockRule, FighterConfig};
use crate::damage::{resolve_hit, Hit, HitReport};
use crate::events::CombatEvent;
use crate::locomotion::{horizontal_velocity, normalize_intent, Locomotion};
use crate::modifiers::{
    ModifierDuration, ModifierKey, ModifierStack, MovementAttribute, MovementModifier,
    MovementParameters,
};
use crate::stun::{StunEvent, StunState};

// ============================================================================
// Supporting state
// ============================================================================

/// An in-progress dash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    /// True for a forward dash
    pub forward: bool,
    /// Seconds until the dash lock is lifted
    pub remaining: f32,
}

/// A hit found by hit detection, waiting to be resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingHit {
    /// Fighter that will receive the hit
    pub target: EntityId,
    /// The hit
    pub hit: Hit,
}

/// Live area of one hitbox this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxQuery {
    /// Index of the hitbox in its attack
    pub hitbox: usize,
    /// World-space area
    pub area: AABB,
    /// Layers to test
    pub targets: LayerMask,
}

// ============================================================================
// Fighter
// ============================================================================

/// One controllable character.
#[derive(Debug, Clone)]
pub struct Fighter {
    pub(crate) id: EntityId,
    pub(crate) config: FighterConfig,
    pub(crate) catalog: Arc<AttackCatalog>,
    pub(crate) health: Health,
    pub(crate) body: Body,
    pub(crate) locomotion: Locomotion,
    pub(crate) modifiers: ModifierStack,
    pub(crate) stun: StunState,
    pub(crate) combat: CombatStateMachine,
    pub(crate) ready: bool,
    pub(crate) blocking: bool,
    pub(crate) dash: Option<DashState>,
    pub(crate) form: Option<String>,
    pub(crate) move_intent: f32,
    pub(crate) events: Vec<CombatEvent>,
}

impl Fighter {
    /// Creates a fighter at `position`. The config is validated first.
    #[must_use]
    pub fn new(
        id: EntityId,
        mut config: FighterConfig,
        catalog: Arc<AttackCatalog>,
        position: Vec2,
    ) -> Self {
        config.validate();
        let mut fighter = Self {
            id,
            health: Health::new(config.max_health),
            body: Body::new(position, config.half_extents, config.gravity),
            locomotion: Locomotion::new(1.0),
            modifiers: ModifierStack::new(),
            stun: StunState::new(),
            combat: CombatStateMachine::new(),
            ready: false,
            blocking: false,
            dash: None,
            form: None,
            move_intent: 0.0,
            events: Vec::new(),
            config,
            catalog,
        };
        fighter.apply_initial_form();
        fighter
    }

    fn apply_initial_form(&mut self) {
        if let Some(name) = self.config.initial_form.clone() {
            self.switch_form(&name);
            self.events.clear();
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Entity ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Configuration (validated).
    #[must_use]
    pub const fn config(&self) -> &FighterConfig {
        &self.config
    }

    /// Attack catalog shared with other fighters.
    #[must_use]
    pub fn catalog(&self) -> &AttackCatalog {
        &self.catalog
    }

    /// Health.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Mutable health, for invulnerability toggles and tests.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Modifier stack.
    #[must_use]
    pub const fn modifiers(&self) -> &ModifierStack {
        &self.modifiers
    }

    /// Stun state.
    #[must_use]
    pub const fn stun_state(&self) -> &StunState {
        &self.stun
    }

    /// Attack state machine.
    #[must_use]
    pub const fn combat(&self) -> &CombatStateMachine {
        &self.combat
    }

    /// Current attack phase.
    #[must_use]
    pub const fn phase(&self) -> AttackPhase {
        self.combat.phase()
    }

    /// Attack currently executing.
    #[must_use]
    pub const fn current_attack(&self) -> Option<AttackId> {
        self.combat.current()
    }

    /// Facing, `1` (right) or `-1` (left).
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.locomotion.facing()
    }

    /// Returns true if the last ground probe found no ground.
    #[must_use]
    pub const fn is_airborne(&self) -> bool {
        self.locomotion.is_airborne()
    }

    /// Returns true until health first reaches zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Returns true while blocking.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Returns true while stunned or knocked down.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.stun.is_stunned()
    }

    /// Returns true if in the ready stance, or if the fighter has no stance.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.config.ready.is_none() || self.ready
    }

    /// Returns true while a dash lock is active.
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.modifiers.has(ModifierKey::Dash)
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    /// Current position (body center).
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Name of the active form.
    #[must_use]
    pub fn form(&self) -> Option<&str> {
        self.form.as_deref()
    }

    /// In-progress dash.
    #[must_use]
    pub const fn dash_state(&self) -> Option<DashState> {
        self.dash
    }

    /// False iff any full-disable modifier is active.
    #[must_use]
    pub fn can_move(&self) -> bool {
        self.modifiers.can_act()
    }

    /// Base movement parameters scaled by every active modifier.
    #[must_use]
    pub fn effective_parameters(&self) -> MovementParameters {
        self.modifiers.effective_parameters(&self.config.movement)
    }

    /// One effective movement value.
    #[must_use]
    pub fn effective_value(&self, attribute: MovementAttribute) -> f32 {
        self.modifiers.effective_value(&self.config.movement, attribute)
    }

    // ------------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------------

    /// Adds a movement modifier (replace-if-longer).
    pub fn add_modifier(
        &mut self,
        key: ModifierKey,
        modifier: MovementModifier,
        duration: ModifierDuration,
    ) -> bool {
        self.modifiers.add(key, modifier, duration)
    }

    /// Removes a movement modifier.
    pub fn remove_modifier(&mut self, key: ModifierKey) -> bool {
        self.modifiers.remove(key)
    }

    /// Stops the fighter and adds a full-disable modifier under `key`.
    ///
    /// Invalid durations are rejected before the fighter is stopped.
    pub fn disable_movement(&mut self, key: ModifierKey, duration: ModifierDuration) -> bool {
        if !duration.is_valid() {
            return false;
        }
        self.body.velocity = Vec2::ZERO;
        self.modifiers.add(key, MovementModifier::DISABLE, duration)
    }

    // ------------------------------------------------------------------------
    // Stun, knockback, knockdown
    // ------------------------------------------------------------------------

    /// Stuns for `duration` seconds if longer than the current stun.
    pub fn stun(&mut self, duration: f32) -> bool {
        if !self.stun.stun(duration) {
            return false;
        }
        self.modifiers.remove(ModifierKey::Stun);
        self.disable_movement(ModifierKey::Stun, ModifierDuration::from_secs(duration));
        true
    }

    /// Clears stun and knockdown immediately.
    pub fn unstun(&mut self) {
        self.stun.unstun();
        self.modifiers.remove(ModifierKey::Stun);
    }

    /// Adds `velocity`, stunning for `duration` first when positive.
    ///
    /// A blocking fighter pushed from the side it guards keeps only the
    /// horizontal part.
    pub fn knockback(&mut self, velocity: Vec2, duration: f32) {
        let mut velocity = velocity;
        if self.blocking && self.config.block.rule.blocks(self.facing(), velocity.x) {
            velocity.y = 0.0;
        }
        if duration > 0.0 {
            self.stun(duration);
        }
        self.body.velocity += velocity;
    }

    /// Stuns indefinitely, adds `velocity`, and starts the knockdown recovery.
    pub fn knock_down(&mut self, velocity: Vec2) {
        if self.stun.remaining() != f32::INFINITY {
            self.modifiers.remove(ModifierKey::Stun);
            self.disable_movement(ModifierKey::Stun, ModifierDuration::Infinite);
        }
        self.stun.knock_down(self.config.knockdown);
        self.body.velocity += velocity;
        self.events.push(CombatEvent::KnockedDown { fighter: self.id });
    }

    pub(crate) fn die(&mut self, killer: Option<EntityId>) {
        let impulse = self.config.death_impulse.scale_x(self.facing()) * self.config.fixed_step;
        self.set_blocking(false);
        self.combat.reset();
        self.knock_down(impulse);
        self.body.layer = LayerMask::DEAD;
        self.events.push(CombatEvent::Died {
            fighter: self.id,
            killer,
        });
        debug!(fighter = %self.id, ?killer, "Fighter died");
    }

    // ------------------------------------------------------------------------
    // Damage entry points
    // ------------------------------------------------------------------------

    /// Applies a resolved hit from another fighter or the environment.
    pub fn receive_hit(&mut self, hit: &Hit) -> HitReport {
        resolve_hit(self, hit)
    }

    /// Environmental damage. Returns the health actually removed.
    pub fn damage(&mut self, amount: i32, instigator: Option<EntityId>, location: Vec2) -> i32 {
        resolve_hit(self, &Hit::environmental(amount, instigator, location)).dealt
    }

    /// Lethal hazard. Returns the health actually removed.
    pub fn kill(&mut self, instigator: Option<EntityId>, location: Vec2) -> i32 {
        resolve_hit(self, &Hit::lethal(instigator, location)).dealt
    }

    // ------------------------------------------------------------------------
    // Stances
    // ------------------------------------------------------------------------

    /// Enters or leaves the ready stance.
    ///
    /// `transition` overrides the configured transition stun; zero skips it.
    /// Returns false if the fighter has no stance or is already in that state.
    pub fn set_ready(&mut self, ready: bool, transition: Option<f32>) -> bool {
        let Some(stance) = self.config.ready else {
            return false;
        };
        if self.ready == ready {
            return false;
        }

        self.ready = ready;
        let transition = transition.unwrap_or(stance.transition);
        if transition > 0.0 {
            self.stun(transition);
        }
        if ready {
            self.modifiers
                .add(ModifierKey::Ready, stance.modifier, ModifierDuration::Infinite);
        } else {
            self.modifiers.remove(ModifierKey::Ready);
        }
        self.events.push(CombatEvent::ReadyChanged {
            fighter: self.id,
            ready,
        });
        true
    }

    fn set_blocking(&mut self, blocking: bool) {
        if self.blocking == blocking {
            return;
        }
        self.blocking = blocking;
        if blocking {
            self.disable_movement(ModifierKey::Blocking, ModifierDuration::Infinite);
        } else {
            self.modifiers.remove(ModifierKey::Blocking);
        }
        self.events.push(CombatEvent::BlockChanged {
            fighter: self.id,
            blocking,
        });
    }

    /// Checks whether a block may be raised or held now.
    ///
    /// A fighter that is not in its ready stance is put into it (which costs
    /// the transition stun), and the block is refused this tick.
    pub fn can_block(&mut self) -> bool {
        if self.config.block.rule == BlockRule::Disabled || !self.is_alive() {
            return false;
        }
        if self.phase() != AttackPhase::None {
            return false;
        }
        if self.is_stunned() && !self.blocking {
            return false;
        }
        if self.is_airborne() || !self.is_ready() || self.is_dashing() {
            if !self.is_ready() {
                self.set_ready(true, None);
            }
            return false;
        }
        true
    }

    fn block(&mut self) -> bool {
        let allowed = self.can_block();
        self.set_blocking(allowed);
        allowed
    }

    fn unblock(&mut self) -> bool {
        if self.is_stunned() {
            return false;
        }
        self.set_blocking(false);
        true
    }

    /// Raises (`true`) or lowers (`false`) the block. Returns whether the
    /// fighter is blocking afterwards.
    pub fn submit_block_intent(&mut self, wants_block: bool) -> bool {
        if wants_block {
            self.block();
        } else if self.blocking {
            self.unblock();
        }
        self.blocking
    }

    /// Switches to the named form. Returns false if unknown or already active.
    pub fn switch_form(&mut self, name: &str) -> bool {
        if self.form.as_deref() == Some(name) {
            return false;
        }
        let Some(form) = self.config.form(name) else {
            debug!(fighter = %self.id, form = name, "Unknown form");
            return false;
        };
        let modifier = form.modifier;
        self.modifiers.remove(ModifierKey::Form);
        self.modifiers
            .add(ModifierKey::Form, modifier, ModifierDuration::Infinite);
        self.form = Some(name.to_string());
        self.events.push(CombatEvent::FormSwitched {
            fighter: self.id,
            form: name.to_string(),
        });
        true
    }

    fn form_can_attack(&self) -> bool {
        self.form
            .as_deref()
            .and_then(|name| self.config.form(name))
            .map_or(true, |form| form.can_attack)
    }

    // ------------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------------

    /// Buffers a move intent for the next step. Magnitudes above 1 request a run.
    pub fn submit_move_intent(&mut self, dir: f32) {
        self.move_intent = if dir.is_finite() { dir } else { 0.0 };
    }

    /// Buffered move intent.
    #[must_use]
    pub const fn move_intent(&self) -> f32 {
        self.move_intent
    }

    /// Applies one tick of movement. Returns the direction actually moved in.
    pub fn apply_move(&mut self, dir: f32, dt: f32) -> f32 {
        if !self.is_alive() || !self.can_move() {
            return 0.0;
        }

        if dir.abs() > 1.0 {
            self.set_ready(false, None);
            self.modifiers
                .add(ModifierKey::Run, self.config.run, ModifierDuration::Infinite);
        } else if dir == 0.0 {
            self.modifiers.remove(ModifierKey::Run);
        }
        // Leaving the stance may have stunned us.
        if !self.can_move() {
            return 0.0;
        }

        let dir = normalize_intent(dir);
        // Velocity is left as is while turning in place.
        if !self.locomotion.update_facing(dir, self.config.facing, dt) {
            return 0.0;
        }
        let params = self.effective_parameters();
        self.body.velocity.x =
            horizontal_velocity(self.body.velocity.x, dir, &params, self.is_airborne(), dt);
        dir
    }

    /// Jumps. Rejected when dead, airborne, blocking, or unable to move.
    pub fn submit_jump_intent(&mut self) -> bool {
        if !self.is_alive() || self.is_airborne() || !self.can_move() || self.blocking {
            return false;
        }
        self.body.velocity.y += self.effective_value(MovementAttribute::JumpAcceleration);
        self.events.push(CombatEvent::Jumped { fighter: self.id });
        true
    }

    /// Dashes forward (toward the facing) or backward depending on `dir`.
    pub fn dash(&mut self, dir: f32) -> bool {
        if !self.is_alive() || !self.can_move() {
            return false;
        }
        let facing = self.facing();
        let forward = (if dir < 0.0 { -1.0 } else { 1.0 }) == facing;
        let action = if forward {
            self.config.dash.forward
        } else {
            self.config.dash.backward
        };

        self.body.velocity.x += action.speed * self.config.fixed_step * facing;
        let total = action.timing.total();
        if total > 0.0 {
            self.modifiers
                .add(ModifierKey::Dash, MovementModifier::DISABLE, ModifierDuration::Infinite);
            self.dash = Some(DashState {
                forward,
                remaining: total,
            });
        }
        self.events.push(CombatEvent::Dashed {
            fighter: self.id,
            forward,
        });
        true
    }

    // ------------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------------

    /// Queues an attack by name for this tick's selection.
    pub fn queue_attack(&mut self, name: &str) -> bool {
        match self.catalog.id_of(name) {
            Some(id) => self.combat.try_queue(id),
            None => {
                debug!(fighter = %self.id, attack = name, "Unknown attack queued");
                false
            }
        }
    }

    fn context_allows(&self, context: AttackContext) -> bool {
        match context {
            AttackContext::Ground => !self.is_airborne(),
            AttackContext::Air => self.is_airborne(),
            AttackContext::Run => self.modifiers.has(ModifierKey::Run),
            AttackContext::Dash => self.is_dashing(),
        }
    }

    /// Queues every attack triggered by `input` whose context currently holds.
    ///
    /// Returns how many attacks were queued.
    pub fn receive_attack_input(&mut self, input: &str) -> usize {
        let catalog = Arc::clone(&self.catalog);
        let mut queued = 0;
        for attack in catalog.attacks_for_input(input) {
            if self.context_allows(attack.context) && self.combat.try_queue(attack.id) {
                queued += 1;
            }
        }
        queued
    }

    /// Fires the highest-priority queued attack and clears the queue.
    pub fn resolve_queued_attacks(&mut self) -> Option<FireOutcome> {
        let choice = self.combat.take_queue_choice(&self.catalog)?;
        Some(self.fire(choice))
    }

    /// Fires an attack by name.
    pub fn fire_by_name(&mut self, name: &str) -> FireOutcome {
        match self.catalog.id_of(name) {
            Some(id) => self.fire(id),
            None => FireOutcome::Rejected(FireRejection::UnknownAttack),
        }
    }

    /// Starts `attack` if every precondition holds.
    pub fn fire(&mut self, attack: AttackId) -> FireOutcome {
        let catalog = Arc::clone(&self.catalog);
        let Some(definition) = catalog.get(attack) else {
            return FireOutcome::Rejected(FireRejection::UnknownAttack);
        };
        if !self.is_alive() {
            return FireOutcome::Rejected(FireRejection::Dead);
        }
        if !self.form_can_attack() {
            return FireOutcome::Rejected(FireRejection::FormCannotAttack);
        }

        if !self.is_ready() {
            if definition.context.skips_ready_transition() {
                self.set_ready(true, Some(0.0));
            } else {
                self.set_ready(true, None);
                return FireOutcome::Rejected(FireRejection::NotReady);
            }
        }

        if self.is_stunned() {
            return FireOutcome::Rejected(FireRejection::Stunned);
        }
        if let Err(reason) = self.combat.can_fire(definition) {
            return FireOutcome::Rejected(reason);
        }

        if !definition.allows_movement {
            let lock = (definition.timing.startup + definition.timing.recovery)
                / self.config.attack_speed;
            self.disable_movement(ModifierKey::Attack(attack), ModifierDuration::Finite(lock));
        }

        let cancelled = self.combat.begin(definition);
        self.enter_phase(definition, AttackPhase::Startup);
        FireOutcome::Started { attack, cancelled }
    }

    fn enter_phase(&mut self, definition: &AttackDefinition, phase: AttackPhase) {
        let impulse = definition.impulses.for_phase(phase);
        if !impulse.is_zero() {
            self.body.velocity += impulse.scale_x(self.facing()) * self.config.fixed_step;
        }
        self.events.push(CombatEvent::PhaseChanged {
            fighter: self.id,
            attack: definition.id,
            phase,
        });
    }

    /// Advances the attack phase timer by `dt` scaled by attack speed.
    ///
    /// Every phase entered applies its impulse and emits its event, in order.
    /// Returns the last phase entered this tick.
    pub fn advance_attack(&mut self, dt: f32) -> Option<AttackPhase> {
        let catalog = Arc::clone(&self.catalog);
        let transitions = self.combat.advance(dt * self.config.attack_speed, &catalog);
        for transition in &transitions {
            if let Some(definition) = catalog.get(transition.attack) {
                self.enter_phase(definition, transition.to);
            }
        }
        transitions.last().map(|t| t.to)
    }

    /// Live hitbox areas of the current attack. Empty outside the active
    /// phase, except on the tick an active window opened and closed.
    ///
    /// Hitboxes whose slot does not exist are skipped and reported once per
    /// execution.
    pub fn hitbox_queries(&mut self) -> Vec<HitboxQuery> {
        let catalog = Arc::clone(&self.catalog);
        let Some(definition) = self.combat.hitbox_attack().and_then(|id| catalog.get(id)) else {
            return Vec::new();
        };

        let mut queries = Vec::with_capacity(definition.hitboxes.len());
        for (index, hitbox) in definition.hitboxes.iter().enumerate() {
            let Some(slot) = self.config.hitbox_slots.get(hitbox.slot) else {
                if self.combat.report_missing_slot(index) {
                    error!(
                        fighter = %self.id,
                        attack = %definition.name,
                        slot = hitbox.slot,
                        "No hitbox collider assigned"
                    );
                    self.events.push(CombatEvent::HitboxMissing {
                        fighter: self.id,
                        attack: definition.id,
                        slot: hitbox.slot,
                    });
                }
                continue;
            };
            if !slot.enabled {
                continue;
            }
            let center = self.body.position + slot.offset.scale_x(self.facing());
            queries.push(HitboxQuery {
                hitbox: index,
                area: AABB::from_center(center, slot.half_extents),
                targets: hitbox.targets.unwrap_or(definition.targets),
            });
        }
        queries
    }

    /// Finds new hits for the active phase and records them so each hitbox
    /// instance hits each target at most once per execution.
    pub fn collect_hits<W: CollisionWorld + ?Sized>(&mut self, world: &W) -> Vec<PendingHit> {
        let queries = self.hitbox_queries();
        if queries.is_empty() {
            return Vec::new();
        }
        let catalog = Arc::clone(&self.catalog);
        let Some(definition) = self.combat.hitbox_attack().and_then(|id| catalog.get(id)) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        for query in queries {
            let hitbox = &definition.hitboxes[query.hitbox];
            for overlap in world.overlap(&query.area, query.targets) {
                let Some(target) = overlap.owner else {
                    continue;
                };
                if target == self.id || !self.combat.record_hit(hitbox.instance, target) {
                    continue;
                }
                hits.push(PendingHit {
                    target,
                    hit: Hit {
                        amount: hitbox.damage,
                        attacker: Some(self.id),
                        source_position: self.body.position,
                        contact: overlap.contact,
                        attacker_knockback: hitbox.attacker_knockback,
                        target_knockback: hitbox.target_knockback,
                        knockdown: hitbox.knockdown,
                        hit_stun: hitbox.hit_stun,
                        lethal: false,
                    },
                });
            }
        }
        hits
    }

    /// Applies attacker recoil reported by a resolved hit.
    pub fn apply_recoil(&mut self, recoil: Vec2) {
        if !recoil.is_zero() {
            self.knockback(recoil * self.config.fixed_step, 0.0);
        }
    }

    // ------------------------------------------------------------------------
    // Per-tick phases
    // ------------------------------------------------------------------------

    /// Applies the buffered move intent, then advances the attack phase.
    pub fn pre_step(&mut self, dt: f32) {
        let intent = self.move_intent;
        self.apply_move(intent, dt);
        self.advance_attack(dt);
    }

    /// Integrates the body against the world.
    pub fn integrate<W: CollisionWorld + ?Sized>(&mut self, world: &W, dt: f32) -> BodyContacts {
        self.body.integrate(self.id, world, dt)
    }

    /// Probes the ground, then decays modifiers, stun and dash.
    pub fn post_step<W: CollisionWorld + ?Sized>(&mut self, world: &W, dt: f32) {
        let airborne =
            self.locomotion
                .probe_ground(self.id, &self.body, self.config.probe_offset, world);
        if airborne && self.blocking {
            self.set_blocking(false);
        }

        for key in self.modifiers.tick(dt) {
            debug!(fighter = %self.id, ?key, "Modifier expired");
        }

        match self.stun.tick(dt, !airborne, self.is_alive()) {
            Some(StunEvent::Expired) => {
                self.modifiers.remove(ModifierKey::Stun);
                self.events.push(CombatEvent::Recovered { fighter: self.id });
            }
            Some(StunEvent::WakeupStarted) => {
                self.events.push(CombatEvent::WakeupStarted { fighter: self.id });
            }
            Some(StunEvent::Recovered) => {
                self.modifiers.remove(ModifierKey::Stun);
                self.events.push(CombatEvent::Recovered { fighter: self.id });
            }
            Some(StunEvent::StayedDown) | None => {}
        }

        if let Some(dash) = &mut self.dash {
            dash.remaining -= dt;
            if dash.remaining <= 0.0 {
                self.dash = None;
                self.modifiers.remove(ModifierKey::Dash);
                self.body.velocity = Vec2::ZERO;
            }
        }
    }

    /// Runs a full tick for a fighter with no opponents.
    pub fn step<W: CollisionWorld + ?Sized>(&mut self, world: &W, dt: f32) {
        self.pre_step(dt);
        self.integrate(world, dt);
        self.post_step(world, dt);
    }

    /// Takes the events buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    // ------------------------------------------------------------------------
    // Respawn
    // ------------------------------------------------------------------------

    /// Respawns at `position`: full health, no velocity, no attack, no stun,
    /// no stances, and an empty modifier stack apart from the initial form.
    pub fn reset(&mut self, position: Vec2) {
        self.health.reset();
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
        self.body.layer = LayerMask::FIGHTER;
        let facing = self.facing();
        self.locomotion.reset(facing);
        self.combat.reset();
        self.stun.unstun();
        self.modifiers.clear();
        self.ready = false;
        self.blocking = false;
        self.dash = None;
        self.form = None;
        self.move_intent = 0.0;
        self.apply_initial_form();
        debug!(fighter = %self.id, "Fighter reset");
    }
}
