//! Anchors: named reference frames owned by bodies.
//!
//! A body (the `"body"` component of a robot) owns a set of anchors. The
//! body owner writes their poses every step; attached devices keep only an
//! [`AnchorHandle`] and read through the table. Removing a body bumps the
//! generation of its anchor slots, so devices still holding a handle get
//! [`EntityError::StaleAnchor`] instead of a dangling pose.

use crate::entity::EntityId;
use crate::error::{ConfigError, EntityError};
use crate::math::{Quat, Vec3};
use std::collections::HashMap;

/// Name of the anchor every body gets on registration.
pub const ORIGIN_ANCHOR: &str = "origin";

/// A reference frame attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub name: String,
    pub body: EntityId,
    /// Current world pose.
    pub position: Vec3,
    pub orientation: Quat,
    /// Pose relative to the body's origin.
    pub offset_position: Vec3,
    pub offset_orientation: Quat,
}

/// Non-owning handle into an [`AnchorTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AnchorHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct AnchorSlot {
    generation: u32,
    anchor: Option<Anchor>,
}

/// Anchor storage for every registered body.
#[derive(Debug, Default)]
pub struct AnchorTable {
    slots: Vec<AnchorSlot>,
    free: Vec<u32>,
    by_body: HashMap<EntityId, HashMap<String, AnchorHandle>>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` with its origin anchor placed at `position`/`orientation`.
    pub fn add_body(
        &mut self,
        body: EntityId,
        position: Vec3,
        orientation: Quat,
    ) -> Result<AnchorHandle, ConfigError> {
        let origin = self.add_anchor(body, ORIGIN_ANCHOR, Vec3::ZERO, Quat::IDENTITY)?;
        self.set_pose(origin, position, orientation);
        Ok(origin)
    }

    pub fn has_body(&self, body: EntityId) -> bool {
        self.by_body.contains_key(&body)
    }

    /// Add a named anchor at an offset from the body's origin.
    ///
    /// Its world pose starts at the offset composed with the origin pose,
    /// or at the bare offset if the body has no origin yet.
    pub fn add_anchor(
        &mut self,
        body: EntityId,
        name: &str,
        offset_position: Vec3,
        offset_orientation: Quat,
    ) -> Result<AnchorHandle, ConfigError> {
        if self
            .by_body
            .get(&body)
            .is_some_and(|anchors| anchors.contains_key(name))
        {
            return Err(ConfigError::DuplicateAnchor {
                body: body_label(body),
                anchor: name.to_string(),
            });
        }
        let (position, orientation) = match self.origin_pose(body) {
            Some((origin_pos, origin_rot)) => (
                origin_pos + origin_rot * offset_position,
                origin_rot * offset_orientation,
            ),
            None => (offset_position, offset_orientation),
        };
        let anchor = Anchor {
            name: name.to_string(),
            body,
            position,
            orientation,
            offset_position,
            offset_orientation,
        };
        let handle = self.alloc(anchor);
        self.by_body
            .entry(body)
            .or_default()
            .insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Look up an anchor by body and name.
    pub fn resolve(&self, body: EntityId, name: &str) -> Result<AnchorHandle, ConfigError> {
        self.by_body
            .get(&body)
            .and_then(|anchors| anchors.get(name))
            .copied()
            .ok_or_else(|| ConfigError::UnknownAnchor {
                body: body_label(body),
                anchor: name.to_string(),
            })
    }

    pub fn get(&self, handle: AnchorHandle) -> Option<&Anchor> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.anchor.as_ref())
    }

    /// Like [`AnchorTable::get`], failing with `StaleAnchor`.
    pub fn try_get(&self, handle: AnchorHandle) -> Result<&Anchor, EntityError> {
        self.get(handle).ok_or(EntityError::StaleAnchor)
    }

    /// Write the world pose of one anchor. Returns `false` for stale handles.
    pub fn set_pose(&mut self, handle: AnchorHandle, position: Vec3, orientation: Quat) -> bool {
        match self.get_mut(handle) {
            Some(anchor) => {
                anchor.position = position;
                anchor.orientation = orientation;
                true
            }
            None => false,
        }
    }

    /// Move a body: its origin goes to the given pose and every other anchor
    /// follows at its fixed offset.
    pub fn move_body(&mut self, body: EntityId, position: Vec3, orientation: Quat) -> bool {
        let Some(anchors) = self.by_body.get(&body) else {
            return false;
        };
        let handles: Vec<AnchorHandle> = anchors.values().copied().collect();
        for handle in handles {
            if let Some(anchor) = self.get_mut(handle) {
                anchor.position = position + orientation * anchor.offset_position;
                anchor.orientation = orientation * anchor.offset_orientation;
            }
        }
        true
    }

    /// Drop every anchor of `body`; outstanding handles become stale.
    pub fn remove_body(&mut self, body: EntityId) -> usize {
        let Some(anchors) = self.by_body.remove(&body) else {
            return 0;
        };
        for handle in anchors.values() {
            let slot = &mut self.slots[handle.index as usize];
            slot.anchor = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(handle.index);
        }
        anchors.len()
    }

    /// Anchors of `body` in name order.
    pub fn anchors_of(&self, body: EntityId) -> Vec<&Anchor> {
        let mut anchors: Vec<&Anchor> = self
            .by_body
            .get(&body)
            .into_iter()
            .flat_map(|map| map.values())
            .filter_map(|&handle| self.get(handle))
            .collect();
        anchors.sort_by(|a, b| a.name.cmp(&b.name));
        anchors
    }

    fn origin_pose(&self, body: EntityId) -> Option<(Vec3, Quat)> {
        let handle = self.by_body.get(&body)?.get(ORIGIN_ANCHOR)?;
        self.get(*handle)
            .map(|origin| (origin.position, origin.orientation))
    }

    fn get_mut(&mut self, handle: AnchorHandle) -> Option<&mut Anchor> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.anchor.as_mut())
    }

    fn alloc(&mut self, anchor: Anchor) -> AnchorHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.anchor = Some(anchor);
            AnchorHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(AnchorSlot {
                generation: 0,
                anchor: Some(anchor),
            });
            AnchorHandle {
                index,
                generation: 0,
            }
        }
    }
}

fn body_label(body: EntityId) -> String {
    format!("body#{}", body.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityTree;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn anchors_follow_their_body() {
        let mut tree = EntityTree::new();
        let robot = tree.add_root("robot0");
        let body = tree.add_child(robot, "body").unwrap();

        let mut anchors = AnchorTable::new();
        let origin = anchors
            .add_body(body, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY)
            .unwrap();
        let mast = anchors
            .add_anchor(body, "mast", Vec3::new(0.5, 0.0, 0.0), Quat::IDENTITY)
            .unwrap();
        assert!(anchors.get(mast).unwrap().position.abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), 1e-6));

        anchors.move_body(body, Vec3::ZERO, Quat::from_rotation_z(FRAC_PI_2));
        let mast_pose = anchors.get(mast).unwrap();
        assert!(mast_pose.position.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-6));
        assert_eq!(anchors.get(origin).unwrap().position, Vec3::ZERO);
        assert_eq!(anchors.resolve(body, "mast").unwrap(), mast);
        assert_eq!(
            anchors
                .anchors_of(body)
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>(),
            ["mast", "origin"]
        );
    }

    #[test]
    fn unknown_and_duplicate_anchors_are_config_errors() {
        let mut tree = EntityTree::new();
        let body = tree.add_root("body");
        let mut anchors = AnchorTable::new();
        anchors.add_body(body, Vec3::ZERO, Quat::IDENTITY).unwrap();

        assert!(matches!(
            anchors.resolve(body, "turret"),
            Err(ConfigError::UnknownAnchor { .. })
        ));
        assert!(matches!(
            anchors.add_anchor(body, ORIGIN_ANCHOR, Vec3::ZERO, Quat::IDENTITY),
            Err(ConfigError::DuplicateAnchor { .. })
        ));
    }

    #[test]
    fn removed_bodies_leave_stale_handles() {
        let mut tree = EntityTree::new();
        let body = tree.add_root("body");
        let mut anchors = AnchorTable::new();
        let origin = anchors.add_body(body, Vec3::ZERO, Quat::IDENTITY).unwrap();

        assert_eq!(anchors.remove_body(body), 1);
        assert!(anchors.get(origin).is_none());
        assert_eq!(anchors.try_get(origin), Err(EntityError::StaleAnchor));
        assert!(!anchors.set_pose(origin, Vec3::ONE, Quat::IDENTITY));

        // The recycled slot must not answer for the old handle.
        let other = tree.add_root("other");
        let fresh = anchors.add_body(other, Vec3::ONE, Quat::IDENTITY).unwrap();
        assert_ne!(fresh, origin);
        assert!(anchors.get(origin).is_none());
    }
}
