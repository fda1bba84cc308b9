//! Switchable character forms.
//!
//! A form is a named movement profile installed under `ModifierKey::Form`,
//! plus a flag saying whether the form may attack.

use serde::{Deserialize, Serialize};

use crate::modifiers::MovementModifier;

/// A named movement profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    /// Form name, unique within a fighter
    pub name: String,
    /// Modifier applied while the form is active
    #[serde(default)]
    pub modifier: MovementModifier,
    /// Whether attacks may be fired in this form
    #[serde(default)]
    pub can_attack: bool,
}

impl Form {
    /// Nimble form: unmodified movement, cannot attack.
    #[must_use]
    pub fn thief() -> Self {
        Self {
            name: "thief".to_string(),
            modifier: MovementModifier::IDENTITY,
            can_attack: false,
        }
    }

    /// Heavy form: cannot jump, a third of the speed, can attack.
    #[must_use]
    pub fn gladiator() -> Self {
        Self {
            name: "gladiator".to_string(),
            modifier: MovementModifier::IDENTITY
                .with_jump_acceleration(0.0)
                .with_max_speed(0.34),
            can_attack: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::{ModifierDuration, ModifierKey, ModifierStack, MovementAttribute, MovementParameters};

    #[test]
    fn test_gladiator_cannot_jump() {
        let base = MovementParameters::default();
        let mut stack = ModifierStack::new();
        stack.add(ModifierKey::Form, Form::gladiator().modifier, ModifierDuration::Infinite);
        assert_eq!(stack.effective_value(&base, MovementAttribute::JumpAcceleration), 0.0);
        assert!((stack.effective_value(&base, MovementAttribute::MaxSpeed) - 1.7).abs() < 1e-5);
        assert!(stack.can_act());
    }

    #[test]
    fn test_only_gladiator_attacks() {
        assert!(!Form::thief().can_attack);
        assert!(Form::gladiator().can_attack);
    }
}
