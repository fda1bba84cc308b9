//! Per-fighter configuration.
//!
//! Everything that was authored per character lives in `FighterConfig`:
//! health, base movement, facing mode, block behaviour, stances, dashes,
//! knockdown timing, body shape and hitbox collider slots. Configs load from
//! TOML and fall back to defaults when the file is missing or malformed.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use skirmish_common::Vec2;
use tracing::{info, warn};

use crate::catalog::PhaseTiming;
use crate::forms::Form;
use crate::locomotion::FacingMode;
use crate::modifiers::{MovementModifier, MovementParameters};
use crate::stun::KnockdownTiming;

/// Lowest allowed attack speed.
pub const MIN_ATTACK_SPEED: f32 = 0.01;
/// Highest allowed attack speed.
pub const MAX_ATTACK_SPEED: f32 = 3.0;

// ============================================================================
// Blocking
// ============================================================================

/// Which hits a blocking fighter stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRule {
    /// Only hits arriving from the side the fighter faces.
    #[default]
    Frontal,
    /// Hits from either side.
    Omnidirectional,
    /// The fighter cannot block.
    Disabled,
}

impl BlockRule {
    /// Returns true if a blocking fighter facing `facing` stops a hit whose
    /// attacker sits at `target_x - attacker_x = diff_x` relative to it.
    #[must_use]
    pub fn blocks(self, facing: f32, diff_x: f32) -> bool {
        match self {
            Self::Frontal => {
                let from = if diff_x < 0.0 { -1.0 } else { 1.0 };
                facing != from
            }
            Self::Omnidirectional => true,
            Self::Disabled => false,
        }
    }
}

/// Block behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Which hits are blocked
    pub rule: BlockRule,
    /// Fraction of damage that gets through a block (minimum 1)
    pub factor: f32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            rule: BlockRule::Frontal,
            factor: 0.02,
        }
    }
}

// ============================================================================
// Stances and actions
// ============================================================================

/// Ready (fighting) stance. Fighters with one must be ready to attack or block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyStance {
    /// Modifier held while ready
    pub modifier: MovementModifier,
    /// Stun applied when entering or leaving the stance
    pub transition: f32,
}

impl Default for ReadyStance {
    fn default() -> Self {
        Self {
            modifier: MovementModifier::IDENTITY
                .with_max_speed(0.6)
                .with_move_acceleration(3.0),
            transition: 0.25,
        }
    }
}

/// One dash direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashAction {
    /// Horizontal speed along the facing direction (negative dashes backward)
    pub speed: f32,
    /// Lock duration, split like an attack
    pub timing: PhaseTiming,
}

impl Default for DashAction {
    fn default() -> Self {
        Self {
            speed: 265.0,
            timing: PhaseTiming::new(0.0, 0.0, 0.4),
        }
    }
}

/// Forward and backward dashes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Dash toward the facing direction
    pub forward: DashAction,
    /// Dash away from the facing direction
    pub backward: DashAction,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            forward: DashAction::default(),
            backward: DashAction {
                speed: -200.0,
                ..DashAction::default()
            },
        }
    }
}

/// A hitbox collider attached to the fighter, mirrored with facing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitboxSlot {
    /// Center offset from the body center, x along the facing direction
    pub offset: Vec2,
    /// Half-extents of the box
    pub half_extents: Vec2,
    /// Disabled slots never hit
    pub enabled: bool,
}

impl Default for HitboxSlot {
    fn default() -> Self {
        Self {
            offset: Vec2::new(0.8, 0.2),
            half_extents: Vec2::new(0.5, 0.3),
            enabled: true,
        }
    }
}

// ============================================================================
// Fighter config
// ============================================================================

/// Authored configuration of one fighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterConfig {
    /// Display name
    pub name: String,
    /// Maximum (and starting) health
    pub max_health: i32,
    /// Attack speed multiplier
    pub attack_speed: f32,
    /// Physics step used to scale impulses (seconds)
    pub fixed_step: f32,
    /// Downward acceleration
    pub gravity: f32,
    /// Distance below the feet at which the ground probe runs
    pub probe_offset: f32,
    /// Form active at spawn
    pub initial_form: Option<String>,
    /// Body half-extents
    pub half_extents: Vec2,
    /// Impulse applied on death, x along the facing direction
    pub death_impulse: Vec2,
    /// Base movement parameters
    pub movement: MovementParameters,
    /// How the fighter turns
    pub facing: FacingMode,
    /// Block behaviour
    pub block: BlockConfig,
    /// Ready stance, if the fighter uses one
    pub ready: Option<ReadyStance>,
    /// Modifier held while running
    pub run: MovementModifier,
    /// Dashes
    pub dash: DashConfig,
    /// Knockdown recovery timing
    pub knockdown: KnockdownTiming,
    /// Hitbox colliders referenced by attack hitboxes
    pub hitbox_slots: Vec<HitboxSlot>,
    /// Switchable forms
    pub forms: Vec<Form>,
}

impl Default for FighterConfig {
    fn default() -> Self {
        Self {
            name: "fighter".to_string(),
            max_health: 100,
            attack_speed: 1.0,
            fixed_step: 0.02,
            gravity: 20.0,
            probe_offset: 0.02,
            initial_form: None,
            half_extents: Vec2::new(0.4, 0.9),
            death_impulse: Vec2::new(-150.0, 50.0),
            movement: MovementParameters::default(),
            facing: FacingMode::Instant,
            block: BlockConfig::default(),
            ready: None,
            run: MovementModifier::IDENTITY
                .with_max_speed(2.0)
                .with_move_acceleration(3.0),
            dash: DashConfig::default(),
            knockdown: KnockdownTiming::default(),
            hitbox_slots: vec![HitboxSlot::default()],
            forms: Vec::new(),
        }
    }
}

impl FighterConfig {
    /// Fighting-game variant: turns in place, needs the ready stance,
    /// blocks frontal hits.
    #[must_use]
    pub fn brawler() -> Self {
        Self {
            name: "brawler".to_string(),
            facing: FacingMode::Turn {
                degrees_per_second: 720.0,
            },
            ready: Some(ReadyStance::default()),
            block: BlockConfig {
                rule: BlockRule::Frontal,
                ..BlockConfig::default()
            },
            ..Self::default()
        }
    }

    /// Platformer variant: instant flips, no stance, no blocking, two forms.
    #[must_use]
    pub fn platformer() -> Self {
        Self {
            name: "platformer".to_string(),
            block: BlockConfig {
                rule: BlockRule::Disabled,
                ..BlockConfig::default()
            },
            forms: vec![Form::thief(), Form::gladiator()],
            initial_form: Some("thief".to_string()),
            ..Self::default()
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets max health.
    #[must_use]
    pub fn with_max_health(mut self, max_health: i32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Sets the block rule.
    #[must_use]
    pub fn with_block_rule(mut self, rule: BlockRule) -> Self {
        self.block.rule = rule;
        self
    }

    /// Sets the attack speed.
    #[must_use]
    pub fn with_attack_speed(mut self, attack_speed: f32) -> Self {
        self.attack_speed = attack_speed;
        self
    }

    /// Looks up a form by name.
    #[must_use]
    pub fn form(&self, name: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.name == name)
    }

    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Fighter config {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read fighter config: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded fighter config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse fighter config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a TOML file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved fighter config to {}", path.display());
        Ok(())
    }

    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.max_health = self.max_health.max(1);
        self.attack_speed = if self.attack_speed.is_finite() {
            self.attack_speed.clamp(MIN_ATTACK_SPEED, MAX_ATTACK_SPEED)
        } else {
            1.0
        };
        self.fixed_step = self.fixed_step.clamp(0.001, 0.1);
        self.gravity = self.gravity.max(0.0);
        self.probe_offset = self.probe_offset.max(0.0);
        self.half_extents = Vec2::new(self.half_extents.x.max(0.01), self.half_extents.y.max(0.01));
        self.block.factor = self.block.factor.clamp(0.0, 1.0);
        self.knockdown.recovery = self.knockdown.recovery.max(0.0);
        self.knockdown.wakeup = self.knockdown.wakeup.max(0.0);
        if let Some(ready) = &mut self.ready {
            ready.transition = ready.transition.max(0.0);
        }
        if let FacingMode::Turn { degrees_per_second } = &mut self.facing {
            *degrees_per_second = degrees_per_second.max(1.0);
        }

        if let Some(name) = &self.initial_form {
            if self.form(name).is_none() {
                warn!(form = %name, "Unknown initial form, ignoring");
                self.initial_form = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FighterConfig::default();
        assert_eq!(config.max_health, 100);
        assert_eq!(config.movement.max_land_speed, 5.0);
        assert_eq!(config.block.factor, 0.02);
        assert_eq!(config.dash.forward.speed, 265.0);
        assert_eq!(config.dash.backward.speed, -200.0);
        assert_eq!(config.dash.backward.timing.recovery, 0.4);
        assert!(config.ready.is_none());
    }

    #[test]
    fn test_presets() {
        let brawler = FighterConfig::brawler();
        assert!(brawler.ready.is_some());
        assert_eq!(
            brawler.facing,
            FacingMode::Turn {
                degrees_per_second: 720.0
            }
        );

        let platformer = FighterConfig::platformer();
        assert_eq!(platformer.block.rule, BlockRule::Disabled);
        assert!(platformer.form("gladiator").is_some());
        assert_eq!(platformer.initial_form.as_deref(), Some("thief"));
    }

    #[test]
    fn test_block_rules() {
        // Attacker on the left (diff > 0), target facing left: blocked.
        assert!(BlockRule::Frontal.blocks(-1.0, 2.0));
        assert!(!BlockRule::Frontal.blocks(1.0, 2.0));
        assert!(BlockRule::Frontal.blocks(1.0, -2.0));
        assert!(BlockRule::Omnidirectional.blocks(1.0, 2.0));
        assert!(!BlockRule::Disabled.blocks(-1.0, 2.0));
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = FighterConfig {
            attack_speed: 10.0,
            max_health: -5,
            initial_form: Some("ghost".to_string()),
            ..FighterConfig::default()
        };
        config.validate();
        assert_eq!(config.attack_speed, MAX_ATTACK_SPEED);
        assert_eq!(config.max_health, 1);
        assert!(config.initial_form.is_none());

        config.attack_speed = 0.0;
        config.validate();
        assert_eq!(config.attack_speed, MIN_ATTACK_SPEED);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fighters").join("brawler.toml");

        let config = FighterConfig::brawler().with_max_health(150);
        config.save_to(&path).expect("save");

        let loaded = FighterConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_platformer_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("platformer.toml");
        let config = FighterConfig::platformer();
        config.save_to(&path).expect("save");
        assert_eq!(FighterConfig::load_from(&path), config);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            FighterConfig::load_from(dir.path().join("missing.toml")),
            FighterConfig::default()
        );

        let path = dir.path().join("broken.toml");
        fs::write(&path, "max_health = \"lots\"").expect("write");
        assert_eq!(FighterConfig::load_from(&path), FighterConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.toml");
        fs::write(&path, "max_health = 80\n\n[block]\nrule = \"omnidirectional\"\n").expect("write");
        let config = FighterConfig::load_from(&path);
        assert_eq!(config.max_health, 80);
        assert_eq!(config.block.rule, BlockRule::Omnidirectional);
        assert_eq!(config.block.factor, 0.02);
    }
}
