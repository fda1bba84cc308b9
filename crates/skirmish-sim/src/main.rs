//! # Skirmish
//!
//! Headless duel runner for Project Skirmish.
//!
//! Loads the runner config and the attack catalog, spawns two fighters on a
//! flat floor and lets two scripted controllers fight until one falls or the
//! tick budget runs out.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use skirmish_common::{EntityId, Vec2};
use skirmish_core::{Arena, AttackCatalog, CombatEvent, EventBus, LayerMask, AABB};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{SimConfig, CONFIG_FILE};
use crate::script::DuelController;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    info!("Skirmish duel runner starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = SimConfig::load_from(&config_path);
    if !config_path.exists() {
        config
            .save_to(&config_path)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
    }

    run(&config)?;

    info!("Skirmish shutdown complete");
    Ok(())
}

/// Runs one duel to completion.
fn run(config: &SimConfig) -> Result<()> {
    let catalog = AttackCatalog::load(&config.catalog_path).with_context(|| {
        format!("loading attack catalog from {}", config.catalog_path.display())
    })?;

    let mut arena =
        Arena::new(Arc::new(catalog)).with_event_bus(EventBus::new(config.event_capacity));
    let half = config.arena_half_width;
    arena.add_static(AABB::new(-half, -1.0, half, 0.0), LayerMask::GROUND);
    arena.add_static(AABB::new(-half - 1.0, 0.0, -half, 10.0), LayerMask::GROUND);
    arena.add_static(AABB::new(half, 0.0, half + 1.0, 10.0), LayerMask::GROUND);
    // Kill plane in case a knockback carries someone over a wall.
    arena.add_static(AABB::new(-half - 50.0, -30.0, half + 50.0, -20.0), LayerMask::HAZARD);

    let left_config = config.left.fighter_config();
    let right_config = config.right.fighter_config();
    let spawn_y = |half_height: f32| half_height + 0.001;
    let left = arena.spawn(
        left_config.clone(),
        Vec2::new(config.left.spawn_x, spawn_y(left_config.half_extents.y)),
    );
    let right = arena.spawn(
        right_config.clone(),
        Vec2::new(config.right.spawn_x, spawn_y(right_config.half_extents.y)),
    );

    let mut controllers = [(left, right), (right, left)].map(|(me, opponent)| {
        DuelController::new(me, opponent)
            .with_attack_range(config.attack_range)
            .with_cadence(config.attack_cadence)
    });

    let dt = config.tick_seconds();
    let mut outcome = Outcome::Undecided;
    for tick in 0..config.max_ticks {
        for controller in &mut controllers {
            controller.drive(&mut arena);
        }
        arena.step(dt);

        let mut fallen = Vec::new();
        for event in arena.events().drain() {
            log_event(&event);
            if let CombatEvent::Died { fighter, .. } = event {
                fallen.push(fighter);
            }
        }
        outcome = Outcome::after_deaths(left, right, &fallen);
        if outcome != Outcome::Undecided {
            info!(tick, "Duel decided");
            break;
        }
    }

    for id in [left, right] {
        if let Some(fighter) = arena.fighter(id) {
            info!(
                fighter = %id,
                name = %fighter.config().name,
                health = fighter.health().current(),
                alive = fighter.is_alive(),
                "Final state"
            );
        }
    }
    match outcome {
        Outcome::Winner(id) => match arena.fighter(id) {
            Some(fighter) => info!(winner = %id, name = %fighter.config().name, "Winner"),
            None => info!(winner = %id, "Winner"),
        },
        Outcome::Draw => info!(ticks = arena.tick_count(), "Draw, both fighters fell"),
        Outcome::Undecided => info!(ticks = arena.tick_count(), "Draw, out of time"),
    }
    Ok(())
}

/// How a duel ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Nobody has fallen yet
    Undecided,
    /// Both fighters fell on the same tick
    Draw,
    /// The other fighter fell
    Winner(EntityId),
}

impl Outcome {
    /// Decides the duel from the fighters that died during one tick.
    fn after_deaths(left: EntityId, right: EntityId, fallen: &[EntityId]) -> Self {
        match (fallen.contains(&left), fallen.contains(&right)) {
            (true, true) => Self::Draw,
            (true, false) => Self::Winner(right),
            (false, true) => Self::Winner(left),
            (false, false) => Self::Undecided,
        }
    }
}

fn log_event(event: &CombatEvent) {
    match event {
        CombatEvent::HitLanded {
            attacker,
            target,
            damage,
            ..
        } => info!(?attacker, %target, damage, "Hit"),
        CombatEvent::HitBlocked {
            attacker,
            target,
            damage,
        } => info!(?attacker, %target, damage, "Blocked"),
        CombatEvent::KnockedDown { fighter } => info!(%fighter, "Knocked down"),
        CombatEvent::Died { fighter, killer } => info!(%fighter, ?killer, "Died"),
        other => debug!(fighter = %other.fighter(), ?other, "Event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_after_deaths() {
        let left = EntityId::from_raw(1);
        let right = EntityId::from_raw(2);
        assert_eq!(Outcome::after_deaths(left, right, &[]), Outcome::Undecided);
        assert_eq!(Outcome::after_deaths(left, right, &[left]), Outcome::Winner(right));
        assert_eq!(Outcome::after_deaths(left, right, &[right]), Outcome::Winner(left));
        assert_eq!(Outcome::after_deaths(left, right, &[right, left]), Outcome::Draw);
    }
}
