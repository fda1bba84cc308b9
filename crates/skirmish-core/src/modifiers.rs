//! Movement modifier stack.
//!
//! A fighter carries a keyed set of multiplicative movement effects. Each key
//! holds at most one modifier; re-adding under a key only replaces the entry
//! when the new duration is strictly longer than the duration the existing
//! entry was created with. Finite entries count down once per tick and are
//! removed when they reach zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skirmish_common::AttackId;

// ============================================================================
// Keys and durations
// ============================================================================

/// Identifier of a modifier on one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModifierKey {
    /// Running speed boost.
    Run,
    /// Ready (fighting) stance.
    Ready,
    /// Dash movement lock.
    Dash,
    /// Movement lock while blocking.
    Blocking,
    /// Movement lock while stunned.
    Stun,
    /// Current form's movement profile.
    Form,
    /// Movement lock while an attack plays out.
    Attack(AttackId),
    /// Caller-defined effect (status effects, scripted slowdowns).
    Custom(u32),
}

/// How long a modifier lasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModifierDuration {
    /// Expires after this many seconds.
    Finite(f32),
    /// Stays until removed explicitly.
    Infinite,
}

impl ModifierDuration {
    /// Converts seconds to a duration; `f32::INFINITY` maps to `Infinite`.
    #[must_use]
    pub fn from_secs(secs: f32) -> Self {
        if secs == f32::INFINITY {
            Self::Infinite
        } else {
            Self::Finite(secs)
        }
    }

    /// Returns the duration in seconds (`f32::INFINITY` when infinite).
    #[must_use]
    pub fn as_secs(self) -> f32 {
        match self {
            Self::Finite(secs) => secs,
            Self::Infinite => f32::INFINITY,
        }
    }

    /// Zero, negative and NaN durations are rejected on add.
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            Self::Finite(secs) => secs > 0.0,
            Self::Infinite => true,
        }
    }

    /// Strict "longer than" used by the replace rule.
    #[must_use]
    pub fn exceeds(self, other: Self) -> bool {
        self.as_secs() > other.as_secs()
    }
}

// ============================================================================
// Modifier data
// ============================================================================

/// Movement attribute a modifier can scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementAttribute {
    /// Top horizontal speed on land.
    MaxSpeed,
    /// Horizontal acceleration.
    MoveAcceleration,
    /// Deceleration factor applied on top of acceleration.
    Deceleration,
    /// Vertical velocity added by a jump.
    JumpAcceleration,
    /// Fraction of acceleration available while airborne.
    AirControl,
}

impl MovementAttribute {
    /// All attributes, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::MaxSpeed,
        Self::MoveAcceleration,
        Self::Deceleration,
        Self::JumpAcceleration,
        Self::AirControl,
    ];
}

/// Five multipliers plus a full-disable flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementModifier {
    /// Multiplier on max land speed
    pub max_speed: f32,
    /// Multiplier on move acceleration
    pub move_acceleration: f32,
    /// Multiplier on deceleration factor
    pub deceleration: f32,
    /// Multiplier on jump acceleration
    pub jump_acceleration: f32,
    /// Multiplier on air control
    pub air_control: f32,
    /// While active, the owner cannot move, jump or act
    pub full_disable: bool,
}

impl Default for MovementModifier {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl MovementModifier {
    /// Modifier that changes nothing.
    pub const IDENTITY: Self = Self {
        max_speed: 1.0,
        move_acceleration: 1.0,
        deceleration: 1.0,
        jump_acceleration: 1.0,
        air_control: 1.0,
        full_disable: false,
    };

    /// Modifier that only disables movement.
    pub const DISABLE: Self = Self {
        full_disable: true,
        ..Self::IDENTITY
    };

    /// Sets the max speed multiplier.
    #[must_use]
    pub fn with_max_speed(mut self, factor: f32) -> Self {
        self.max_speed = factor;
        self
    }

    /// Sets the move acceleration multiplier.
    #[must_use]
    pub fn with_move_acceleration(mut self, factor: f32) -> Self {
        self.move_acceleration = factor;
        self
    }

    /// Sets the deceleration multiplier.
    #[must_use]
    pub fn with_deceleration(mut self, factor: f32) -> Self {
        self.deceleration = factor;
        self
    }

    /// Sets the jump acceleration multiplier.
    #[must_use]
    pub fn with_jump_acceleration(mut self, factor: f32) -> Self {
        self.jump_acceleration = factor;
        self
    }

    /// Sets the air control multiplier.
    #[must_use]
    pub fn with_air_control(mut self, factor: f32) -> Self {
        self.air_control = factor;
        self
    }

    /// Returns the multiplier for one attribute.
    #[must_use]
    pub fn multiplier(&self, attribute: MovementAttribute) -> f32 {
        match attribute {
            MovementAttribute::MaxSpeed => self.max_speed,
            MovementAttribute::MoveAcceleration => self.move_acceleration,
            MovementAttribute::Deceleration => self.deceleration,
            MovementAttribute::JumpAcceleration => self.jump_acceleration,
            MovementAttribute::AirControl => self.air_control,
        }
    }
}

/// Base movement parameters of a character, before modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParameters {
    /// Vertical velocity added by a jump
    pub jump_acceleration: f32,
    /// Horizontal acceleration (units/s²)
    pub move_acceleration: f32,
    /// Deceleration factor (multiplies move acceleration when braking)
    pub deceleration: f32,
    /// Top horizontal speed
    pub max_land_speed: f32,
    /// Fraction of acceleration available in the air
    pub air_control: f32,
}

impl Default for MovementParameters {
    fn default() -> Self {
        Self {
            jump_acceleration: 6.0,
            move_acceleration: 20.0,
            deceleration: 1.0,
            max_land_speed: 5.0,
            air_control: 0.5,
        }
    }
}

impl MovementParameters {
    /// Returns the base value of one attribute.
    #[must_use]
    pub fn get(&self, attribute: MovementAttribute) -> f32 {
        match attribute {
            MovementAttribute::MaxSpeed => self.max_land_speed,
            MovementAttribute::MoveAcceleration => self.move_acceleration,
            MovementAttribute::Deceleration => self.deceleration,
            MovementAttribute::JumpAcceleration => self.jump_acceleration,
            MovementAttribute::AirControl => self.air_control,
        }
    }

    fn set(&mut self, attribute: MovementAttribute, value: f32) {
        match attribute {
            MovementAttribute::MaxSpeed => self.max_land_speed = value,
            MovementAttribute::MoveAcceleration => self.move_acceleration = value,
            MovementAttribute::Deceleration => self.deceleration = value,
            MovementAttribute::JumpAcceleration => self.jump_acceleration = value,
            MovementAttribute::AirControl => self.air_control = value,
        }
    }
}

// ============================================================================
// Stack
// ============================================================================

/// One active modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierEntry {
    /// The modifier's multipliers
    pub modifier: MovementModifier,
    /// Duration the entry was created with
    pub duration: ModifierDuration,
    /// Seconds left before expiry (ignored when infinite)
    pub remaining: f32,
}

/// Keyed collection of active movement modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierStack {
    entries: BTreeMap<ModifierKey, ModifierEntry>,
}

impl ModifierStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a modifier is active under `key`.
    #[must_use]
    pub fn has(&self, key: ModifierKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Returns the modifier active under `key`.
    #[must_use]
    pub fn get(&self, key: ModifierKey) -> Option<&ModifierEntry> {
        self.entries.get(&key)
    }

    /// Adds a modifier. Returns false if the add was a no-op.
    pub fn add(
        &mut self,
        key: ModifierKey,
        modifier: MovementModifier,
        duration: ModifierDuration,
    ) -> bool {
        if !duration.is_valid() {
            return false;
        }
        if let Some(existing) = self.entries.get(&key) {
            if !duration.exceeds(existing.duration) {
                return false;
            }
        }
        self.entries.insert(
            key,
            ModifierEntry {
                modifier,
                duration,
                remaining: duration.as_secs(),
            },
        );
        true
    }

    /// Removes a modifier. Returns false if none was active under `key`.
    pub fn remove(&mut self, key: ModifierKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Product of one attribute's multiplier across every active entry.
    #[must_use]
    pub fn multiplier(&self, attribute: MovementAttribute) -> f32 {
        self.entries
            .values()
            .map(|entry| entry.modifier.multiplier(attribute))
            .product()
    }

    /// Base value of `attribute` scaled by every active modifier.
    #[must_use]
    pub fn effective_value(&self, base: &MovementParameters, attribute: MovementAttribute) -> f32 {
        base.get(attribute) * self.multiplier(attribute)
    }

    /// Effective values of every attribute.
    #[must_use]
    pub fn effective_parameters(&self, base: &MovementParameters) -> MovementParameters {
        let mut params = *base;
        for attribute in MovementAttribute::ALL {
            params.set(attribute, self.effective_value(base, attribute));
        }
        params
    }

    /// False iff any active entry has `full_disable` set.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.entries.values().any(|entry| entry.modifier.full_disable)
    }

    /// Counts finite entries down by `dt` and removes the expired ones.
    ///
    /// Returns the keys that expired, in key order.
    pub fn tick(&mut self, dt: f32) -> Vec<ModifierKey> {
        let mut expired = Vec::new();
        for (key, entry) in &mut self.entries {
            if let ModifierDuration::Finite(_) = entry.duration {
                entry.remaining -= dt;
                if entry.remaining <= 0.0 {
                    expired.push(*key);
                }
            }
        }
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of active entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modifier is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates active entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModifierKey, &ModifierEntry)> {
        self.entries.iter()
    }
}
