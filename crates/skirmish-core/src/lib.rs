//! # Skirmish Core
//!
//! Tick-driven combat and movement simulation for 2D action characters.
//!
//! This crate contains:
//! - Movement modifier stack and effective movement parameters
//! - Locomotion (acceleration, facing, ground probe) and body integration
//! - Attack catalog loading and the attack phase state machine
//! - Damage resolution, blocking, knockback and knockdown
//! - Stun and knockdown recovery timers
//! - The fighter aggregate, the arena that steps fighters in a fixed order,
//!   combat events and fighter snapshots

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod arena;
pub mod attack;
pub mod body;
pub mod catalog;
pub mod collision;
pub mod config;
pub mod damage;
pub mod events;
pub mod fighter;
pub mod forms;
pub mod locomotion;
pub mod modifiers;
pub mod snapshot;
pub mod stun;

#[cfg(test)]
mod scenarios;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::arena::*;
    pub use crate::attack::*;
    pub use crate::body::*;
    pub use crate::catalog::*;
    pub use crate::collision::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::events::*;
    pub use crate::fighter::*;
    pub use crate::forms::*;
    pub use crate::locomotion::*;
    pub use crate::modifiers::*;
    pub use crate::snapshot::*;
    pub use crate::stun::*;
}

pub use prelude::*;
