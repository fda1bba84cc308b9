//! The arena: fighters, static colliders and the per-tick step order.
//!
//! Fighters are kept in entity-id order so that hit detection and damage
//! resolution are reproducible. Within one tick every attacker's hits are
//! detected against the same collider snapshot before any of them is
//! resolved.

use std::collections::BTreeMap;
use std::sync::Arc;

use skirmish_common::{ColliderId, EntityId, Vec2};
use tracing::{debug, info, warn};

use crate::catalog::AttackCatalog;
use crate::collision::{ColliderSet, CollisionWorld, LayerMask, AABB};
use crate::config::FighterConfig;
use crate::events::EventBus;
use crate::fighter::{Fighter, PendingHit};

/// A self-contained combat simulation.
#[derive(Debug)]
pub struct Arena {
    catalog: Arc<AttackCatalog>,
    fighters: BTreeMap<EntityId, Fighter>,
    colliders: ColliderSet,
    events: EventBus,
    tick: u64,
}

impl Arena {
    /// Creates an empty arena using `catalog` for every fighter.
    #[must_use]
    pub fn new(catalog: Arc<AttackCatalog>) -> Self {
        info!(attacks = catalog.len(), "Arena created");
        Self {
            catalog,
            fighters: BTreeMap::new(),
            colliders: ColliderSet::new(),
            events: EventBus::default(),
            tick: 0,
        }
    }

    /// Replaces the event bus (for a different capacity).
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Spawns a fighter centered at `position`.
    pub fn spawn(&mut self, config: FighterConfig, position: Vec2) -> EntityId {
        let id = EntityId::new();
        let fighter = Fighter::new(id, config, Arc::clone(&self.catalog), position);
        self.colliders
            .sync_body(id, fighter.body().bounds(), fighter.body().layer);
        info!(fighter = %id, name = %fighter.config().name, "Fighter spawned");
        self.fighters.insert(id, fighter);
        id
    }

    /// Removes a fighter and its body collider.
    pub fn despawn(&mut self, id: EntityId) -> Option<Fighter> {
        self.colliders.remove_body(id);
        self.fighters.remove(&id)
    }

    /// Looks up a fighter.
    #[must_use]
    pub fn fighter(&self, id: EntityId) -> Option<&Fighter> {
        self.fighters.get(&id)
    }

    /// Looks up a fighter for intent submission.
    pub fn fighter_mut(&mut self, id: EntityId) -> Option<&mut Fighter> {
        self.fighters.get_mut(&id)
    }

    /// Iterates fighters in id order.
    pub fn fighters(&self) -> impl Iterator<Item = &Fighter> {
        self.fighters.values()
    }

    /// Adds a static collider (ground, walls, hazards).
    pub fn add_static(&mut self, bounds: AABB, layer: LayerMask) -> ColliderId {
        self.colliders.add_static(bounds, layer)
    }

    /// Collider set, for queries.
    #[must_use]
    pub const fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    /// Shared attack catalog.
    #[must_use]
    pub fn catalog(&self) -> &AttackCatalog {
        &self.catalog
    }

    /// Event bus carrying published combat events.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Applies environmental damage to a fighter. Returns the health removed.
    pub fn damage(
        &mut self,
        id: EntityId,
        amount: i32,
        instigator: Option<EntityId>,
        location: Vec2,
    ) -> Option<i32> {
        let fighter = self.fighters.get_mut(&id)?;
        Some(fighter.damage(amount, instigator, location))
    }

    /// Kills a fighter with a lethal hazard. Returns the health removed.
    pub fn apply_hazard(&mut self, id: EntityId, location: Vec2) -> Option<i32> {
        let fighter = self.fighters.get_mut(&id)?;
        let dealt = fighter.kill(None, location);
        self.colliders
            .sync_body(id, fighter.body().bounds(), fighter.body().layer);
        Some(dealt)
    }

    /// Respawns a fighter at `position`.
    pub fn reset(&mut self, id: EntityId, position: Vec2) -> bool {
        let Some(fighter) = self.fighters.get_mut(&id) else {
            return false;
        };
        fighter.reset(position);
        self.colliders
            .sync_body(id, fighter.body().bounds(), fighter.body().layer);
        true
    }

    /// Advances every fighter by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        // Intents, attack phases and phase impulses
        for fighter in self.fighters.values_mut() {
            fighter.pre_step(dt);
        }

        // Bodies
        for fighter in self.fighters.values_mut() {
            fighter.integrate(&self.colliders, dt);
        }
        for (id, fighter) in &self.fighters {
            self.colliders
                .sync_body(*id, fighter.body().bounds(), fighter.body().layer);
        }

        self.apply_hazard_zones();

        // Hit detection against one collider snapshot, then resolution
        let mut pending: Vec<(EntityId, PendingHit)> = Vec::new();
        for (id, fighter) in &mut self.fighters {
            for hit in fighter.collect_hits(&self.colliders) {
                pending.push((*id, hit));
            }
        }

        let mut recoils = Vec::new();
        for (attacker, pending_hit) in pending {
            let Some(target) = self.fighters.get_mut(&pending_hit.target) else {
                continue;
            };
            let report = target.receive_hit(&pending_hit.hit);
            debug!(
                %attacker,
                target = %pending_hit.target,
                dealt = report.dealt,
                blocked = report.blocked,
                "Hit applied"
            );
            if !report.attacker_recoil.is_zero() {
                recoils.push((attacker, report.attacker_recoil));
            }
        }
        for (attacker, recoil) in recoils {
            if let Some(fighter) = self.fighters.get_mut(&attacker) {
                fighter.apply_recoil(recoil);
            }
        }

        // Ground probe and timer decay
        for fighter in self.fighters.values_mut() {
            fighter.post_step(&self.colliders, dt);
        }
        for (id, fighter) in &self.fighters {
            self.colliders
                .sync_body(*id, fighter.body().bounds(), fighter.body().layer);
        }

        self.publish_events();
        self.tick += 1;
    }

    fn apply_hazard_zones(&mut self) {
        for fighter in self.fighters.values_mut() {
            if !fighter.is_alive() {
                continue;
            }
            let bounds = fighter.body().bounds();
            let contact = self
                .colliders
                .overlap(&bounds, LayerMask::HAZARD)
                .into_iter()
                .find(|overlap| overlap.owner.is_none())
                .map(|overlap| overlap.contact);
            if let Some(contact) = contact {
                debug!(fighter = %fighter.id(), "Entered hazard");
                fighter.kill(None, contact);
            }
        }
    }

    fn publish_events(&mut self) {
        let mut dropped = 0_usize;
        for fighter in self.fighters.values_mut() {
            for event in fighter.drain_events() {
                if !self.events.publish(event) {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, capacity = self.events.capacity(), "Event bus full, events dropped");
        }
    }
}
