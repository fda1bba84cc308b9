//! Attack catalog loading and lookup.
//!
//! This module provides:
//! - Authored attack specs (TOML or RON)
//! - Validation on load
//! - Interning of attack names to `AttackId` handles, including cancel lists
//! - Lookup by handle, name, and trigger input

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use skirmish_common::{AttackId, SchemaVersion, Vec2};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attack::AttackPhase;
use crate::collision::LayerMask;

/// Default asset path for the attack catalog.
pub const DEFAULT_CATALOG_PATH: &str = "assets/attacks.toml";

/// Errors that can occur while loading an attack catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File not found.
    #[error("Attack catalog not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read attack catalog: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse attack catalog TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse attack catalog RON: {0}")]
    RonError(#[from] ron::error::SpannedError),

    /// Unsupported file extension.
    #[error("Unsupported attack catalog format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Incompatible catalog version.
    #[error("Attack catalog version {found} is not readable by {supported}")]
    IncompatibleVersion {
        /// Version in the file
        found: String,
        /// Version this build reads
        supported: SchemaVersion,
    },

    /// Validation error.
    #[error("Attack validation error: {0}")]
    ValidationError(String),

    /// Duplicate attack name.
    #[error("Duplicate attack name: {0}")]
    DuplicateName(String),

    /// The catalog has no attacks.
    #[error("Attack catalog is empty")]
    Empty,
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// ============================================================================
// Authored data
// ============================================================================

/// Situation an attack can be started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackContext {
    /// Standing on the ground.
    #[default]
    Ground,
    /// Airborne.
    Air,
    /// Running.
    Run,
    /// Dashing.
    Dash,
}

impl AttackContext {
    /// Run and dash attacks may enter the ready stance without a transition stun.
    #[must_use]
    pub const fn skips_ready_transition(self) -> bool {
        matches!(self, Self::Run | Self::Dash)
    }
}

/// Phase durations in seconds at attack speed 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTiming {
    /// Wind-up before hitboxes go live
    pub startup: f32,
    /// Window in which hitboxes deal damage
    pub active: f32,
    /// Cool-down after the active window
    pub recovery: f32,
}

impl PhaseTiming {
    /// Creates phase timing.
    #[must_use]
    pub const fn new(startup: f32, active: f32, recovery: f32) -> Self {
        Self {
            startup,
            active,
            recovery,
        }
    }

    /// Sum of all three phases.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.startup + self.active + self.recovery
    }

    /// Duration of one phase (zero for `AttackPhase::None`).
    #[must_use]
    pub fn duration(&self, phase: AttackPhase) -> f32 {
        match phase {
            AttackPhase::None => 0.0,
            AttackPhase::Startup => self.startup,
            AttackPhase::Active => self.active,
            AttackPhase::Recovery => self.recovery,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (label, value) in [
            ("startup", self.startup),
            ("active", self.active),
            ("recovery", self.recovery),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{label} duration must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

/// Velocity impulses applied when each phase begins.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseImpulses {
    /// Applied on entering startup
    pub startup: Vec2,
    /// Applied on entering active
    pub active: Vec2,
    /// Applied on entering recovery
    pub recovery: Vec2,
}

impl PhaseImpulses {
    /// Impulse for entering `phase`.
    #[must_use]
    pub fn for_phase(&self, phase: AttackPhase) -> Vec2 {
        match phase {
            AttackPhase::None => Vec2::ZERO,
            AttackPhase::Startup => self.startup,
            AttackPhase::Active => self.active,
            AttackPhase::Recovery => self.recovery,
        }
    }
}

/// One hitbox of an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitboxSpec {
    /// Index into the fighter's hitbox collider slots
    pub slot: usize,
    /// Damage dealt on hit
    pub damage: i32,
    /// Hit-once grouping key within one execution
    pub instance: u32,
    /// Recoil applied to the attacker, x pointing away from the target
    pub attacker_knockback: Vec2,
    /// Knockback applied to the target, x pointing away from the attacker
    pub target_knockback: Vec2,
    /// Knock the target down instead of a plain knockback
    pub knockdown: bool,
    /// Stun applied with a plain knockback
    pub hit_stun: f32,
    /// Overrides the attack's target layers for this hitbox
    pub targets: Option<LayerMask>,
}

impl Default for HitboxSpec {
    fn default() -> Self {
        Self {
            slot: 0,
            damage: 0,
            instance: 0,
            attacker_knockback: Vec2::ZERO,
            target_knockback: Vec2::ZERO,
            knockdown: false,
            hit_stun: 0.0,
            targets: None,
        }
    }
}

fn default_targets() -> LayerMask {
    LayerMask::FIGHTER
}

/// An attack as authored in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    /// Unique attack name
    pub name: String,
    /// Input names that trigger this attack
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Higher priority wins when one input queues several attacks
    #[serde(default)]
    pub priority: i32,
    /// Situation the attack can start from
    #[serde(default)]
    pub context: AttackContext,
    /// Phase durations
    #[serde(default)]
    pub timing: PhaseTiming,
    /// Phase impulses
    #[serde(default)]
    pub impulses: PhaseImpulses,
    /// Hitboxes
    #[serde(default)]
    pub hitboxes: Vec<HitboxSpec>,
    /// Names of attacks whose recovery this attack may cancel
    #[serde(default)]
    pub cancels_from: Vec<String>,
    /// Only reachable as a cancel
    #[serde(default)]
    pub cancel_only: bool,
    /// The attacker may keep moving during the attack
    #[serde(default)]
    pub allows_movement: bool,
    /// Layers hit by this attack's hitboxes
    #[serde(default = "default_targets")]
    pub targets: LayerMask,
}

impl AttackSpec {
    /// Creates a ground attack with the given timing and nothing else.
    #[must_use]
    pub fn new(name: impl Into<String>, timing: PhaseTiming) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            priority: 0,
            context: AttackContext::Ground,
            timing,
            impulses: PhaseImpulses::default(),
            hitboxes: Vec::new(),
            cancels_from: Vec::new(),
            cancel_only: false,
            allows_movement: false,
            targets: LayerMask::FIGHTER,
        }
    }

    /// Adds a trigger input.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: AttackContext) -> Self {
        self.context = context;
        self
    }

    /// Adds a hitbox.
    #[must_use]
    pub fn with_hitbox(mut self, hitbox: HitboxSpec) -> Self {
        self.hitboxes.push(hitbox);
        self
    }

    /// Adds an attack this one may cancel from.
    #[must_use]
    pub fn cancels_from(mut self, name: impl Into<String>) -> Self {
        self.cancels_from.push(name.into());
        self
    }

    /// Marks the attack cancel-only.
    #[must_use]
    pub fn cancel_only(mut self) -> Self {
        self.cancel_only = true;
        self
    }

    /// Lets the attacker keep moving.
    #[must_use]
    pub fn allows_movement(mut self) -> Self {
        self.allows_movement = true;
        self
    }

    /// Sets the phase impulses.
    #[must_use]
    pub fn with_impulses(mut self, impulses: PhaseImpulses) -> Self {
        self.impulses = impulses;
        self
    }

    /// Validates the spec.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Attack name cannot be empty".to_string());
        }
        self.timing
            .validate()
            .map_err(|e| format!("Attack '{}': {e}", self.name))?;
        for (i, hitbox) in self.hitboxes.iter().enumerate() {
            if hitbox.damage < 0 {
                return Err(format!("Attack '{}' hitbox {i}: negative damage", self.name));
            }
            if !hitbox.hit_stun.is_finite() || hitbox.hit_stun < 0.0 {
                return Err(format!("Attack '{}' hitbox {i}: invalid hit stun", self.name));
            }
        }
        Ok(())
    }
}

/// Catalog file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Catalog schema version (`major.minor.patch`)
    pub version: String,
    /// Attacks in authoring order
    #[serde(default)]
    pub attacks: Vec<AttackSpec>,
}

// ============================================================================
// Resolved catalog
// ============================================================================

/// An attack with its name and cancel list resolved to handles.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackDefinition {
    /// Interned handle
    pub id: AttackId,
    /// Unique name
    pub name: String,
    /// Trigger inputs
    pub inputs: Vec<String>,
    /// Selection priority
    pub priority: i32,
    /// Required context
    pub context: AttackContext,
    /// Phase durations
    pub timing: PhaseTiming,
    /// Phase impulses
    pub impulses: PhaseImpulses,
    /// Hitboxes in authoring order
    pub hitboxes: Vec<HitboxSpec>,
    /// Attacks whose recovery this attack may cancel
    pub cancels_from: Vec<AttackId>,
    /// Only reachable as a cancel
    pub cancel_only: bool,
    /// The attacker may keep moving
    pub allows_movement: bool,
    /// Layers hit by default
    pub targets: LayerMask,
}

impl AttackDefinition {
    /// Returns true if this attack may cancel the recovery of `current`.
    #[must_use]
    pub fn can_cancel_from(&self, current: AttackId) -> bool {
        self.cancels_from.contains(&current)
    }

    /// Returns true if `input` triggers this attack.
    #[must_use]
    pub fn triggered_by(&self, input: &str) -> bool {
        self.inputs.iter().any(|i| i == input)
    }
}

/// Immutable set of attacks, indexed by `AttackId`.
#[derive(Debug, Clone, Default)]
pub struct AttackCatalog {
    attacks: Vec<AttackDefinition>,
    by_name: AHashMap<String, AttackId>,
}

impl AttackCatalog {
    /// Builds a catalog from specs in authoring order.
    pub fn from_specs(specs: Vec<AttackSpec>) -> CatalogResult<Self> {
        if specs.is_empty() {
            return Err(CatalogError::Empty);
        }
        if specs.len() > usize::from(u16::MAX) {
            return Err(CatalogError::ValidationError(format!(
                "Too many attacks: {}",
                specs.len()
            )));
        }

        let mut by_name = AHashMap::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            spec.validate().map_err(CatalogError::ValidationError)?;
            if by_name
                .insert(spec.name.clone(), AttackId::new(index as u16))
                .is_some()
            {
                return Err(CatalogError::DuplicateName(spec.name.clone()));
            }
        }

        let attacks = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let cancels_from = spec
                    .cancels_from
                    .iter()
                    .filter_map(|name| {
                        let id = by_name.get(name).copied();
                        if id.is_none() {
                            warn!(attack = %spec.name, cancel = %name, "Unknown attack in cancel list, skipping");
                        }
                        id
                    })
                    .collect();
                AttackDefinition {
                    id: AttackId::new(index as u16),
                    name: spec.name,
                    inputs: spec.inputs,
                    priority: spec.priority,
                    context: spec.context,
                    timing: spec.timing,
                    impulses: spec.impulses,
                    hitboxes: spec.hitboxes,
                    cancels_from,
                    cancel_only: spec.cancel_only,
                    allows_movement: spec.allows_movement,
                    targets: spec.targets,
                }
            })
            .collect::<Vec<_>>();

        debug!(count = attacks.len(), "Built attack catalog");
        Ok(Self { attacks, by_name })
    }

    fn from_file(file: CatalogFile) -> CatalogResult<Self> {
        let supported = SchemaVersion::ATTACK_CATALOG;
        let readable = SchemaVersion::parse(&file.version)
            .is_some_and(|found| supported.is_compatible_with(&found));
        if !readable {
            return Err(CatalogError::IncompatibleVersion {
                found: file.version,
                supported,
            });
        }
        Self::from_specs(file.attacks)
    }

    /// Parses a TOML catalog.
    pub fn from_toml_str(text: &str) -> CatalogResult<Self> {
        Self::from_file(toml::from_str(text)?)
    }

    /// Parses a RON catalog.
    pub fn from_ron_str(text: &str) -> CatalogResult<Self> {
        Self::from_file(ron::from_str(text)?)
    }

    /// Loads a catalog, choosing the format by file extension.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("ron") => Self::from_ron_str(&text)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        };
        info!(path = %path.display(), attacks = catalog.len(), "Loaded attack catalog");
        Ok(catalog)
    }

    /// Looks up an attack by handle.
    #[must_use]
    pub fn get(&self, id: AttackId) -> Option<&AttackDefinition> {
        self.attacks.get(id.index())
    }

    /// Looks up an attack by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&AttackDefinition> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Resolves a name to its handle.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<AttackId> {
        self.by_name.get(name).copied()
    }

    /// Attacks triggered by `input`, in catalog order.
    pub fn attacks_for_input<'a>(
        &'a self,
        input: &'a str,
    ) -> impl Iterator<Item = &'a AttackDefinition> + 'a {
        self.attacks.iter().filter(move |a| a.triggered_by(input))
    }

    /// Iterates all attacks in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &AttackDefinition> {
        self.attacks.iter()
    }

    /// Number of attacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    /// Returns true if the catalog has no attacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }
}
