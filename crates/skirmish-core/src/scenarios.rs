//! End-to-end combat scenarios driven through the public fighter and arena API.

use std::sync::Arc;

use proptest::prelude::*;
use skirmish_common::{AttackId, EntityId, Vec2};

use crate::prelude::*;

const DT: f32 = 0.02;

fn catalog() -> Arc<AttackCatalog> {
    let text = r#"
        version = "1.0.0"

        [[attacks]]
        name = "jab"
        inputs = ["light"]
        priority = 1
        timing = { startup = 0.1, active = 0.1, recovery = 0.3 }

        [[attacks.hitboxes]]
        damage = 10
        instance = 0

        [[attacks]]
        name = "cross"
        inputs = ["light"]
        cancels_from = ["jab"]
        cancel_only = true
        timing = { startup = 0.1, active = 0.1, recovery = 0.2 }

        [[attacks.hitboxes]]
        damage = 15
        instance = 0

        [[attacks]]
        name = "sweep"
        inputs = ["heavy"]
        timing = { startup = 0.06, active = 0.2, recovery = 0.2 }

        [[attacks.hitboxes]]
        damage = 5
        instance = 0
        knockdown = true
        target_knockback = { x = 50.0, y = 100.0 }

        [[attacks.hitboxes]]
        damage = 5
        instance = 0
    "#;
    Arc::new(AttackCatalog::from_toml_str(text).expect("valid catalog"))
}

fn fighter(config: FighterConfig) -> Fighter {
    Fighter::new(EntityId::new(), config, catalog(), Vec2::new(0.0, 0.901))
}

fn arena() -> Arena {
    let mut arena = Arena::new(catalog());
    arena.add_static(AABB::new(-50.0, -1.0, 50.0, 0.0), LayerMask::GROUND);
    arena
}

fn phases(events: &[CombatEvent]) -> Vec<AttackPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::PhaseChanged { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect()
}

#[test]
fn test_health_scenario() {
    let mut f = fighter(FighterConfig::default());
    assert_eq!(f.damage(40, None, Vec2::ZERO), 40);
    assert_eq!(f.health().current(), 60);
    assert!(f.is_alive());

    assert_eq!(f.damage(70, None, Vec2::ZERO), 60);
    assert_eq!(f.health().current(), 0);
    assert!(!f.is_alive());

    let died = f
        .drain_events()
        .iter()
        .filter(|e| matches!(e, CombatEvent::Died { .. }))
        .count();
    assert_eq!(died, 1);
}

#[test]
fn test_block_reduces_to_one() {
    let mut f = fighter(FighterConfig::default());
    assert!(f.submit_block_intent(true));
    // Attacker in front (to the right of a right-facing fighter).
    assert_eq!(f.damage(50, None, Vec2::new(2.0, 0.9)), 1);
    assert_eq!(f.health().current(), 99);
}

#[test]
fn test_recovery_cancel() {
    let mut f = fighter(FighterConfig::default());
    let jab = f.catalog().id_of("jab").expect("jab");
    let cross = f.catalog().id_of("cross").expect("cross");

    // Cancel-only attacks cannot start from idle.
    assert_eq!(f.fire(cross), FireOutcome::Rejected(FireRejection::CancelOnly));

    assert!(f.fire(jab).is_started());
    while f.phase() != AttackPhase::Recovery {
        f.advance_attack(DT);
    }

    assert_eq!(f.fire(jab), FireOutcome::Rejected(FireRejection::NotCancellable));
    assert_eq!(
        f.fire(cross),
        FireOutcome::Started {
            attack: cross,
            cancelled: Some(jab),
        }
    );
    assert_eq!(f.phase(), AttackPhase::Startup);
    assert_eq!(f.current_attack(), Some(cross));
}

#[test]
fn test_full_disable_then_recover() {
    let world = {
        let mut world = ColliderSet::new();
        world.add_static(AABB::new(-50.0, -1.0, 50.0, 0.0), LayerMask::GROUND);
        world
    };
    let mut f = fighter(FighterConfig::default());
    f.add_modifier(
        ModifierKey::Custom(7),
        MovementModifier::DISABLE,
        ModifierDuration::Finite(1.0),
    );

    for _ in 0..10 {
        assert_eq!(f.apply_move(1.0, DT), 0.0);
        assert_eq!(f.velocity().x, 0.0);
        f.post_step(&world, DT);
    }
    for _ in 0..45 {
        f.post_step(&world, DT);
    }
    assert!(f.can_move());
    assert_eq!(f.apply_move(1.0, DT), 1.0);
    assert!(f.velocity().x > 0.0);
}

#[test]
fn test_phase_sequence_and_duration() {
    for attack_speed in [0.5_f32, 1.0, 2.0] {
        let mut f = fighter(FighterConfig::default().with_attack_speed(attack_speed));
        assert!(f.fire_by_name("jab").is_started());

        let mut ticks = 0;
        while f.phase() != AttackPhase::None {
            f.advance_attack(DT);
            ticks += 1;
            assert!(ticks < 1000);
        }

        let expected = 0.5 / attack_speed;
        let elapsed = ticks as f32 * DT;
        assert!((elapsed - expected).abs() <= DT + 1e-4, "{elapsed} vs {expected}");
        assert_eq!(
            phases(&f.drain_events()),
            vec![
                AttackPhase::Startup,
                AttackPhase::Active,
                AttackPhase::Recovery,
                AttackPhase::None,
            ]
        );
    }
}

#[test]
fn test_multi_tick_active_hits_once_per_instance() {
    let mut arena = arena();
    let attacker = arena.spawn(FighterConfig::default(), Vec2::new(0.0, 0.901));
    let target = arena.spawn(FighterConfig::default(), Vec2::new(1.2, 0.901));

    // Sweep has two hitboxes sharing instance 0 and a 0.2 s active window.
    let catalog = arena.catalog().clone();
    let sweep = catalog.by_name("sweep").expect("sweep");
    assert_eq!(sweep.hitboxes.len(), 2);

    assert!(arena
        .fighter_mut(attacker)
        .expect("attacker")
        .fire_by_name("sweep")
        .is_started());
    for _ in 0..25 {
        arena.step(DT);
    }

    let target = arena.fighter(target).expect("target");
    assert_eq!(target.health().current(), 95);
    let hits = arena
        .events()
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CombatEvent::HitLanded { .. }))
        .count();
    assert_eq!(hits, 1);
}

#[test]
fn test_knockdown_recovery_sequence() {
    let mut arena = arena();
    let attacker = arena.spawn(FighterConfig::default(), Vec2::new(0.0, 0.901));
    let target = arena.spawn(FighterConfig::default(), Vec2::new(1.2, 0.901));
    assert!(arena
        .fighter_mut(attacker)
        .expect("attacker")
        .fire_by_name("sweep")
        .is_started());

    let mut saw_airborne = false;
    let mut ticks = 0;
    loop {
        arena.step(DT);
        ticks += 1;
        let f = arena.fighter(target).expect("target");
        saw_airborne |= f.is_airborne();
        if ticks > 20 && !f.is_stunned() {
            break;
        }
        assert!(ticks < 500, "never recovered");
    }
    assert!(saw_airborne);

    let events: Vec<_> = arena
        .events()
        .drain()
        .into_iter()
        .filter(|e| e.fighter() == target)
        .collect();
    let order: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::KnockedDown { .. } => Some("down"),
            CombatEvent::WakeupStarted { .. } => Some("wakeup"),
            CombatEvent::Recovered { .. } => Some("recovered"),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec!["down", "wakeup", "recovered"]);
    assert!(arena.fighter(target).expect("target").can_move());
}

#[test]
fn test_dead_fighter_never_wakes() {
    let mut arena = arena();
    let id = arena.spawn(FighterConfig::default(), Vec2::new(0.0, 0.901));
    arena.apply_hazard(id, Vec2::ZERO);
    for _ in 0..300 {
        arena.step(DT);
    }
    let f = arena.fighter(id).expect("fighter");
    assert!(f.is_stunned());
    assert!(!f.can_move());
    assert!(!arena
        .events()
        .drain()
        .iter()
        .any(|e| matches!(e, CombatEvent::WakeupStarted { .. })));
}

#[test]
fn test_snapshot_continues_attack() {
    let mut a = fighter(FighterConfig::default());
    assert!(a.fire_by_name("jab").is_started());
    for _ in 0..7 {
        a.advance_attack(DT);
    }

    let bytes = a.snapshot().to_bytes().expect("serialize");
    let mut b = fighter(FighterConfig::default());
    b.restore(&FighterSnapshot::from_bytes(&bytes).expect("deserialize"));
    a.drain_events();

    for _ in 0..30 {
        assert_eq!(a.advance_attack(DT), b.advance_attack(DT));
        assert_eq!(a.phase(), b.phase());
        assert_eq!(a.combat().phase_remaining(), b.combat().phase_remaining());
    }
}

#[test]
fn test_reset_clears_in_progress_state() {
    let mut f = fighter(FighterConfig::default());
    assert!(f.fire_by_name("sweep").is_started());
    f.stun(2.0);
    f.reset(Vec2::new(0.0, 0.901));
    assert_eq!(f.phase(), AttackPhase::None);
    assert!(!f.is_stunned());
    assert!(f.modifiers().is_empty());
    assert!(f.can_move());
    assert_eq!(f.current_attack(), None::<AttackId>);
}

proptest! {
    #[test]
    fn prop_health_stays_in_bounds(hits in prop::collection::vec(0i32..80, 0..20)) {
        let mut f = fighter(FighterConfig::default());
        let mut deaths = 0;
        for amount in hits {
            let was_alive = f.is_alive();
            f.damage(amount, None, Vec2::ZERO);
            prop_assert!(f.health().current() >= 0);
            prop_assert!(f.health().current() <= f.health().max());
            if was_alive && !f.is_alive() {
                deaths += 1;
            }
        }
        prop_assert!(deaths <= 1);
    }
}
