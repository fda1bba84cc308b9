//! Rigid body integration for fighters.
//!
//! Gravity plus axis-separated box resolution against the GROUND layer. Each
//! axis is moved and resolved on its own so a fighter walking along the floor
//! never snags on the surface it stands on.

use serde::{Deserialize, Serialize};
use skirmish_common::{EntityId, Vec2};

use crate::collision::{CollisionWorld, LayerMask, AABB};

/// Gap kept between a resolved body and the surface it was pushed out of.
pub const CONTACT_SKIN: f32 = 0.001;

/// Which sides of the body were blocked during one integration step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyContacts {
    /// Landed on something below
    pub floor: bool,
    /// Hit something above
    pub ceiling: bool,
    /// Hit something to the side
    pub wall: bool,
}

/// Position, velocity and box of one fighter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Center of the collision box
    pub position: Vec2,
    /// Velocity in units per second
    pub velocity: Vec2,
    /// Half-extents of the collision box
    pub half_extents: Vec2,
    /// Downward acceleration in units per second squared
    pub gravity: f32,
    /// Layer the body collider is registered on
    pub layer: LayerMask,
}

impl Body {
    /// Creates a body at rest.
    #[must_use]
    pub fn new(position: Vec2, half_extents: Vec2, gravity: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            gravity,
            layer: LayerMask::FIGHTER,
        }
    }

    /// World-space bounds of the body.
    #[must_use]
    pub fn bounds(&self) -> AABB {
        AABB::from_center(self.position, self.half_extents)
    }

    /// Bottom-center point of the box.
    #[must_use]
    pub fn feet(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.y - self.half_extents.y)
    }

    /// Applies gravity, then moves along x and y, pushing out of GROUND colliders.
    pub fn integrate<W: CollisionWorld + ?Sized>(
        &mut self,
        owner: EntityId,
        world: &W,
        dt: f32,
    ) -> BodyContacts {
        let mut contacts = BodyContacts::default();
        self.velocity.y -= self.gravity * dt;

        // Horizontal pass
        self.position.x += self.velocity.x * dt;
        for overlap in world.overlap(&self.bounds(), LayerMask::GROUND) {
            if overlap.owner == Some(owner) {
                continue;
            }
            let Some(other) = world.collider(overlap.collider) else {
                continue;
            };
            if self.velocity.x > 0.0 {
                self.position.x = other.bounds.min_x - self.half_extents.x - CONTACT_SKIN;
            } else if self.velocity.x < 0.0 {
                self.position.x = other.bounds.max_x + self.half_extents.x + CONTACT_SKIN;
            } else {
                continue;
            }
            self.velocity.x = 0.0;
            contacts.wall = true;
        }

        // Vertical pass
        self.position.y += self.velocity.y * dt;
        for overlap in world.overlap(&self.bounds(), LayerMask::GROUND) {
            if overlap.owner == Some(owner) {
                continue;
            }
            let Some(other) = world.collider(overlap.collider) else {
                continue;
            };
            if self.velocity.y < 0.0 {
                self.position.y = other.bounds.max_y + self.half_extents.y + CONTACT_SKIN;
                contacts.floor = true;
            } else if self.velocity.y > 0.0 {
                self.position.y = other.bounds.min_y - self.half_extents.y - CONTACT_SKIN;
                contacts.ceiling = true;
            } else {
                continue;
            }
            self.velocity.y = 0.0;
        }

        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ColliderSet;

    fn floor_world() -> ColliderSet {
        let mut world = ColliderSet::new();
        world.add_static(AABB::new(-50.0, -1.0, 50.0, 0.0), LayerMask::GROUND);
        world
    }

    #[test]
    fn test_body_falls_and_lands() {
        let world = floor_world();
        let mut body = Body::new(Vec2::new(0.0, 3.0), Vec2::new(0.5, 1.0), 20.0);
        let owner = EntityId::from_raw(1);

        let mut landed = false;
        for _ in 0..200 {
            if body.integrate(owner, &world, 0.02).floor {
                landed = true;
            }
        }
        assert!(landed);
        assert!((body.feet().y - CONTACT_SKIN).abs() < 1e-3);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn test_body_slides_along_floor() {
        let world = floor_world();
        let mut body = Body::new(Vec2::new(0.0, 1.0 + CONTACT_SKIN), Vec2::new(0.5, 1.0), 20.0);
        body.velocity.x = 5.0;
        let owner = EntityId::from_raw(1);

        for _ in 0..10 {
            let contacts = body.integrate(owner, &world, 0.02);
            assert!(!contacts.wall);
        }
        assert!((body.position.x - 1.0).abs() < 1e-4);
        assert_eq!(body.velocity.x, 5.0);
    }

    #[test]
    fn test_body_stops_at_wall() {
        let mut world = floor_world();
        world.add_static(AABB::new(2.0, 0.0, 3.0, 5.0), LayerMask::GROUND);
        let mut body = Body::new(Vec2::new(0.0, 1.0 + CONTACT_SKIN), Vec2::new(0.5, 1.0), 20.0);
        let owner = EntityId::from_raw(1);

        let mut hit_wall = false;
        for _ in 0..50 {
            body.velocity.x = 5.0;
            hit_wall |= body.integrate(owner, &world, 0.02).wall;
        }
        assert!(hit_wall);
        assert!(body.bounds().max_x <= 2.0);
    }
}
