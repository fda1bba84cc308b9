//! Health and life state.

use serde::{Deserialize, Serialize};

/// Outcome of applying damage to a `Health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthChange {
    /// Health actually removed
    pub dealt: i32,
    /// True on the one call that took the actor from alive to dead
    pub died: bool,
}

/// Integer health with an alive flag that flips to false exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    max: i32,
    invulnerable: bool,
    alive: bool,
}

impl Health {
    /// Creates full health. Non-positive maxima are raised to 1.
    #[must_use]
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            invulnerable: false,
            alive: true,
        }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Returns true until health first reaches zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Returns true if incoming damage is ignored.
    #[must_use]
    pub const fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// Sets invulnerability.
    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.invulnerable = invulnerable;
    }

    /// Removes `amount` health.
    ///
    /// Dead actors take nothing. Invulnerable actors take nothing unless
    /// `bypass_invulnerability` is set.
    pub fn apply_damage(&mut self, amount: i32, bypass_invulnerability: bool) -> HealthChange {
        debug_assert!(amount >= 0, "negative damage {amount}");
        if !self.alive {
            return HealthChange::default();
        }

        let amount = if self.invulnerable && !bypass_invulnerability {
            0
        } else {
            amount.max(0)
        };
        let before = self.current.min(self.max);
        self.current = (before - amount).max(0);

        let died = self.current == 0;
        if died {
            self.alive = false;
        }
        HealthChange {
            dealt: before - self.current,
            died,
        }
    }

    /// Restores full health and life.
    pub fn reset(&mut self) {
        self.current = self.max;
        self.alive = true;
    }

    /// Fraction of health remaining (0..=1).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current as f32 / self.max as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_damage_then_death() {
        let mut health = Health::new(100);
        let change = health.apply_damage(40, false);
        assert_eq!(change, HealthChange { dealt: 40, died: false });
        assert_eq!(health.current(), 60);

        let change = health.apply_damage(70, false);
        assert_eq!(change, HealthChange { dealt: 60, died: true });
        assert_eq!(health.current(), 0);
        assert!(!health.is_alive());

        // Further damage is a no-op.
        assert_eq!(health.apply_damage(10, true), HealthChange::default());
    }

    #[test]
    fn test_invulnerable() {
        let mut health = Health::new(50);
        health.set_invulnerable(true);
        assert_eq!(health.apply_damage(30, false).dealt, 0);
        assert_eq!(health.current(), 50);

        let change = health.apply_damage(50, true);
        assert!(change.died);
    }

    #[test]
    fn test_reset() {
        let mut health = Health::new(10);
        health.apply_damage(10, false);
        health.reset();
        assert!(health.is_alive());
        assert_eq!(health.current(), 10);
        assert!((health.fraction() - 1.0).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(hits in proptest::collection::vec(0i32..80, 1..30)) {
            let mut health = Health::new(100);
            let mut deaths = 0;
            for hit in hits {
                let was_alive = health.is_alive();
                let change = health.apply_damage(hit, false);
                prop_assert!(health.current() >= 0 && health.current() <= health.max());
                if change.died {
                    deaths += 1;
                    prop_assert!(was_alive);
                    prop_assert_eq!(health.current(), 0);
                }
            }
            prop_assert!(deaths <= 1);
        }
    }
}
