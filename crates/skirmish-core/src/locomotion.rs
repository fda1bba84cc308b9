//! Horizontal movement, facing and ground detection.
//!
//! This module provides:
//! - Acceleration toward an intent and sign-aware deceleration
//! - Instant or rotation-based facing
//! - A horizontal ground probe just below the feet with contact caching

use serde::{Deserialize, Serialize};
use skirmish_common::{math::sign, ColliderId, EntityId, Vec2};

use crate::body::Body;
use crate::collision::{CollisionWorld, LayerMask};
use crate::modifiers::MovementParameters;

/// Intents smaller than this are treated as "no input".
pub const INTENT_EPSILON: f32 = 1e-4;

/// How a fighter turns around.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Flip immediately.
    #[default]
    Instant,
    /// Rotate through 180 degrees; movement waits until the turn completes.
    Turn {
        /// Turn rate in degrees per second
        degrees_per_second: f32,
    },
}

/// Clamps an intent to `-1..=1`, mapping near-zero to zero.
#[must_use]
pub fn normalize_intent(dir: f32) -> f32 {
    if !dir.is_finite() || dir.abs() < INTENT_EPSILON {
        0.0
    } else {
        sign(dir) * dir.abs().min(1.0)
    }
}

/// New horizontal velocity after one tick of movement.
///
/// With no intent the velocity decays toward zero and never crosses it. With
/// an intent it accelerates (scaled by air control while airborne) and is
/// clamped to the max land speed.
#[must_use]
pub fn horizontal_velocity(
    vx: f32,
    dir: f32,
    params: &MovementParameters,
    airborne: bool,
    dt: f32,
) -> f32 {
    if dir == 0.0 {
        let braking = params.move_acceleration * params.deceleration * dt;
        if vx > 0.0 {
            (vx - braking).max(0.0)
        } else if vx < 0.0 {
            (vx + braking).min(0.0)
        } else {
            0.0
        }
    } else {
        let control = if airborne { params.air_control } else { 1.0 };
        let max = params.max_land_speed.max(0.0);
        (vx + dir * params.move_acceleration * control * dt).clamp(-max, max)
    }
}

/// Cached ground contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundContact {
    /// Collider stood on
    pub collider: ColliderId,
    /// Its surface normal, computed when the contact began
    pub normal: Vec2,
}

/// Facing, turn progress and ground state of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    facing: f32,
    /// Degrees of turn still to rotate (0 when not turning)
    turn_remaining: f32,
    airborne: bool,
    contact: Option<GroundContact>,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Locomotion {
    /// Creates grounded locomotion facing right (`1`) or left (`-1`).
    #[must_use]
    pub fn new(facing: f32) -> Self {
        Self {
            facing: if facing < 0.0 { -1.0 } else { 1.0 },
            turn_remaining: 0.0,
            airborne: false,
            contact: None,
        }
    }

    /// Current facing, `1` or `-1`.
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.facing
    }

    /// Forces the facing, cancelling any turn.
    pub fn set_facing(&mut self, facing: f32) {
        self.facing = if facing < 0.0 { -1.0 } else { 1.0 };
        self.turn_remaining = 0.0;
    }

    /// Returns true while a rotation-based turn is in progress.
    #[must_use]
    pub fn is_turning(&self) -> bool {
        self.turn_remaining > 0.0
    }

    /// Returns true if the last probe found no ground.
    #[must_use]
    pub const fn is_airborne(&self) -> bool {
        self.airborne
    }

    /// Current ground contact.
    #[must_use]
    pub const fn contact(&self) -> Option<GroundContact> {
        self.contact
    }

    /// Advances facing toward `dir`.
    ///
    /// Returns true if the fighter may move this tick. Instant facing always
    /// allows movement; rotation facing blocks movement while turning.
    pub fn update_facing(&mut self, dir: f32, mode: FacingMode, dt: f32) -> bool {
        match mode {
            FacingMode::Instant => {
                if dir != 0.0 {
                    self.facing = sign(dir);
                }
                true
            }
            FacingMode::Turn { degrees_per_second } => {
                if self.is_turning() {
                    self.turn_remaining -= degrees_per_second.max(0.0) * dt;
                    if self.turn_remaining <= 0.0 {
                        self.turn_remaining = 0.0;
                        self.facing = -self.facing;
                    }
                    return false;
                }
                if dir != 0.0 && sign(dir) != self.facing {
                    if degrees_per_second.is_infinite() {
                        self.facing = -self.facing;
                        return true;
                    }
                    self.turn_remaining = 180.0;
                    return false;
                }
                true
            }
        }
    }

    /// Horizontal line cast just below the feet against the GROUND layer.
    ///
    /// The surface normal is recomputed only when the contacted collider
    /// changes. Returns true if the fighter is airborne.
    pub fn probe_ground<W: CollisionWorld + ?Sized>(
        &mut self,
        owner: EntityId,
        body: &Body,
        probe_offset: f32,
        world: &W,
    ) -> bool {
        let y = body.position.y - body.half_extents.y - probe_offset;
        let start = Vec2::new(body.position.x - body.half_extents.x, y);
        let end = Vec2::new(body.position.x + body.half_extents.x, y);

        match world.line_cast(start, end, LayerMask::GROUND) {
            Some(hit) if hit.owner != Some(owner) => {
                self.airborne = false;
                if self.contact.map(|c| c.collider) != Some(hit.collider) {
                    self.contact = Some(GroundContact {
                        collider: hit.collider,
                        normal: world.surface_normal(hit.collider, hit.point),
                    });
                }
            }
            _ => {
                self.airborne = true;
                self.contact = None;
            }
        }
        self.airborne
    }

    #[cfg(test)]
    pub(crate) fn set_airborne(&mut self, airborne: bool) {
        self.airborne = airborne;
    }

    /// Resets facing and ground state.
    pub fn reset(&mut self, facing: f32) {
        *self = Self::new(facing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{ColliderSet, AABB};

    fn params() -> MovementParameters {
        MovementParameters::default()
    }

    #[test]
    fn test_normalize_intent() {
        assert_eq!(normalize_intent(0.0), 0.0);
        assert_eq!(normalize_intent(0.00001), 0.0);
        assert_eq!(normalize_intent(2.0), 1.0);
        assert_eq!(normalize_intent(-2.0), -1.0);
        assert_eq!(normalize_intent(-0.5), -0.5);
        assert_eq!(normalize_intent(f32::NAN), 0.0);
    }

    #[test]
    fn test_acceleration_and_clamp() {
        let p = params();
        let mut vx = 0.0;
        vx = horizontal_velocity(vx, 1.0, &p, false, 0.02);
        assert!((vx - 0.4).abs() < 1e-6);
        for _ in 0..100 {
            vx = horizontal_velocity(vx, 1.0, &p, false, 0.02);
        }
        assert_eq!(vx, 5.0);
    }

    #[test]
    fn test_air_control_scales_acceleration() {
        let p = params();
        let vx = horizontal_velocity(0.0, 1.0, &p, true, 0.02);
        assert!((vx - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_deceleration_never_crosses_zero() {
        let p = params();
        assert!((horizontal_velocity(1.0, 0.0, &p, false, 0.02) - 0.6).abs() < 1e-6);
        assert_eq!(horizontal_velocity(0.3, 0.0, &p, false, 0.02), 0.0);
        assert_eq!(horizontal_velocity(-0.3, 0.0, &p, false, 0.02), 0.0);
        assert_eq!(horizontal_velocity(0.0, 0.0, &p, false, 0.02), 0.0);
    }

    #[test]
    fn test_instant_facing() {
        let mut loco = Locomotion::new(1.0);
        assert!(loco.update_facing(-0.5, FacingMode::Instant, 0.02));
        assert_eq!(loco.facing(), -1.0);
        assert!(loco.update_facing(0.0, FacingMode::Instant, 0.02));
        assert_eq!(loco.facing(), -1.0);
    }

    #[test]
    fn test_turn_facing_waits() {
        let mode = FacingMode::Turn {
            degrees_per_second: 720.0,
        };
        let mut loco = Locomotion::new(1.0);
        assert!(loco.update_facing(1.0, mode, 0.02));

        // 180 degrees at 720 deg/s takes 0.25 s.
        assert!(!loco.update_facing(-1.0, mode, 0.02));
        let mut ticks = 0;
        while !loco.update_facing(-1.0, mode, 0.02) {
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(loco.facing(), -1.0);
        assert!((12..=14).contains(&ticks));
    }

    #[test]
    fn test_ground_probe_caches_contact() {
        let mut world = ColliderSet::new();
        let floor = world.add_static(AABB::new(-10.0, -1.0, 10.0, 0.0), LayerMask::GROUND);
        let owner = EntityId::from_raw(1);
        let mut body = Body::new(Vec2::new(0.0, 0.9), Vec2::new(0.4, 0.9), 20.0);
        let mut loco = Locomotion::new(1.0);

        assert!(!loco.probe_ground(owner, &body, 0.02, &world));
        let contact = loco.contact().expect("grounded");
        assert_eq!(contact.collider, floor);
        assert_eq!(contact.normal, Vec2::UP);

        body.position.y = 3.0;
        assert!(loco.probe_ground(owner, &body, 0.02, &world));
        assert!(loco.contact().is_none());
    }

    #[test]
    fn test_ground_probe_ignores_self() {
        let mut world = ColliderSet::new();
        let owner = EntityId::from_raw(1);
        let body = Body::new(Vec2::new(0.0, 0.9), Vec2::new(0.4, 0.9), 20.0);
        // A body registered on the ground layer must not count as ground for itself.
        world.sync_body(
            owner,
            AABB::new(-0.4, -0.5, 0.4, 1.8),
            LayerMask::GROUND,
        );
        let mut loco = Locomotion::new(1.0);
        assert!(loco.probe_ground(owner, &body, 0.02, &world));
    }
}
