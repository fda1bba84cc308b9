//! Fighter snapshots.
//!
//! A snapshot captures every piece of runtime state a fighter carries between
//! ticks. Configuration and the attack catalog are not included; restoring
//! onto a fighter built from the same config and catalog resumes the
//! simulation exactly where the snapshot was taken.

use serde::{Deserialize, Serialize};
use skirmish_common::{EntityId, MagicBytes, SchemaVersion, SkirmishError, SkirmishResult};
use tracing::debug;

use crate::actor::Health;
use crate::attack::CombatStateMachine;
use crate::body::Body;
use crate::fighter::{DashState, Fighter};
use crate::locomotion::Locomotion;
use crate::modifiers::ModifierStack;
use crate::stun::StunState;

/// Serializable runtime state of one fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSnapshot {
    /// Snapshot schema version
    pub version: SchemaVersion,
    /// Fighter the snapshot was taken from
    pub fighter: EntityId,
    /// Health
    pub health: Health,
    /// Body
    pub body: Body,
    /// Facing and ground state
    pub locomotion: Locomotion,
    /// Active movement modifiers
    pub modifiers: ModifierStack,
    /// Stun and knockdown
    pub stun: StunState,
    /// Attack phase, hit bookkeeping and queue
    pub combat: CombatStateMachine,
    /// Ready stance
    pub ready: bool,
    /// Blocking
    pub blocking: bool,
    /// In-progress dash
    pub dash: Option<DashState>,
    /// Active form
    pub form: Option<String>,
    /// Buffered move intent
    pub move_intent: f32,
}

impl FighterSnapshot {
    /// Serializes to the binary snapshot format (magic bytes, then bincode).
    pub fn to_bytes(&self) -> SkirmishResult<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MagicBytes::SNAPSHOT.0);

        let data =
            bincode::serialize(self).map_err(|e| SkirmishError::Serialization(e.to_string()))?;
        buffer.extend(data);

        Ok(buffer)
    }

    /// Deserializes from the binary snapshot format.
    pub fn from_bytes(bytes: &[u8]) -> SkirmishResult<Self> {
        if bytes.len() < 4 || bytes[0..4] != MagicBytes::SNAPSHOT.0 {
            return Err(SkirmishError::InvalidFormat {
                expected: MagicBytes::SNAPSHOT.0,
            });
        }

        let snapshot: Self = bincode::deserialize(&bytes[4..])
            .map_err(|e| SkirmishError::Serialization(e.to_string()))?;

        let supported = SchemaVersion::FIGHTER_SNAPSHOT;
        if !supported.is_compatible_with(&snapshot.version) {
            return Err(SkirmishError::VersionMismatch {
                expected: supported.to_string(),
                actual: snapshot.version.to_string(),
            });
        }

        Ok(snapshot)
    }
}

impl Fighter {
    /// Captures the fighter's runtime state.
    #[must_use]
    pub fn snapshot(&self) -> FighterSnapshot {
        FighterSnapshot {
            version: SchemaVersion::FIGHTER_SNAPSHOT,
            fighter: self.id,
            health: self.health,
            body: self.body,
            locomotion: self.locomotion,
            modifiers: self.modifiers.clone(),
            stun: self.stun,
            combat: self.combat.clone(),
            ready: self.ready,
            blocking: self.blocking,
            dash: self.dash,
            form: self.form.clone(),
            move_intent: self.move_intent,
        }
    }

    /// Overwrites the runtime state with `snapshot`. Buffered events are dropped.
    pub fn restore(&mut self, snapshot: &FighterSnapshot) {
        if snapshot.fighter != self.id {
            debug!(fighter = %self.id, source = %snapshot.fighter, "Restoring snapshot of another fighter");
        }
        self.health = snapshot.health;
        self.body = snapshot.body;
        self.locomotion = snapshot.locomotion;
        self.modifiers = snapshot.modifiers.clone();
        self.stun = snapshot.stun;
        self.combat = snapshot.combat.clone();
        self.ready = snapshot.ready;
        self.blocking = snapshot.blocking;
        self.dash = snapshot.dash;
        self.form = snapshot.form.clone();
        self.move_intent = snapshot.move_intent;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttackCatalog, AttackSpec, PhaseTiming};
    use crate::config::FighterConfig;
    use skirmish_common::Vec2;
    use std::sync::Arc;

    fn fighter() -> Fighter {
        let catalog = Arc::new(
            AttackCatalog::from_specs(vec![AttackSpec::new("jab", PhaseTiming::new(0.1, 0.1, 0.2))])
                .expect("valid catalog"),
        );
        Fighter::new(
            EntityId::new(),
            FighterConfig::platformer(),
            catalog,
            Vec2::new(0.0, 0.9),
        )
    }

    #[test]
    fn test_snapshot_bytes() {
        let mut f = fighter();
        f.switch_form("gladiator");
        f.stun(0.5);
        f.damage(25, None, Vec2::ZERO);

        let snapshot = f.snapshot();
        let bytes = snapshot.to_bytes().expect("serialize");
        assert_eq!(&bytes[0..4], b"SKSN");

        let decoded = FighterSnapshot::from_bytes(&bytes).expect("deserialize");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = FighterSnapshot::from_bytes(b"NOPE1234");
        assert!(matches!(result, Err(SkirmishError::InvalidFormat { .. })));
        assert!(FighterSnapshot::from_bytes(b"SK").is_err());
    }

    #[test]
    fn test_rejects_newer_major() {
        let mut snapshot = fighter().snapshot();
        snapshot.version = SchemaVersion::new(2, 0, 0);
        let bytes = snapshot.to_bytes().expect("serialize");
        assert!(matches!(
            FighterSnapshot::from_bytes(&bytes),
            Err(SkirmishError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_restore_round_trip() {
        let mut f = fighter();
        let clean = f.snapshot();
        f.switch_form("gladiator");
        f.kill(None, Vec2::ZERO);
        assert!(!f.is_alive());

        f.restore(&clean);
        assert!(f.is_alive());
        assert_eq!(f.form(), Some("thief"));
        assert_eq!(f.snapshot(), clean);
        assert!(f.drain_events().is_empty());
    }
}
