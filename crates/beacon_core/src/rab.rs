//! Range-and-bearing device.
//!
//! A RAB device rides on one anchor of its robot's body. Every step it
//! copies the anchor pose (plus a fixed offset), and the medium registers
//! it in every cell its broadcast range reaches. The payload is a fixed
//! size byte buffer that receivers read.

use crate::anchor::{AnchorHandle, AnchorTable};
use crate::config::ConfigNode;
use crate::entity::{EntityId, EntityTree};
use crate::error::{ConfigError, EntityError};
use crate::grid::{Grid, SpaceHash};
use crate::math::{Quat, Vec3};
use crate::medium::Coverage;
use crate::raster::rasterize_sphere;

/// Id given to the device when the configuration node has none.
pub const DEFAULT_RAB_ID: &str = "rab";

/// Component id of the body the device attaches to.
pub const BODY_COMPONENT: &str = "body";

#[derive(Debug, Clone, PartialEq)]
pub struct RabEquipped {
    entity: EntityId,
    anchor: AnchorHandle,
    pos_offset: Vec3,
    rot_offset: Quat,
    position: Vec3,
    orientation: Quat,
    range: f32,
    data: Vec<u8>,
}

impl RabEquipped {
    /// Build a device for an already created `entity`.
    ///
    /// The initial pose is taken from the anchor, so the handle must be live.
    pub fn new(
        entity: EntityId,
        anchor: AnchorHandle,
        anchors: &AnchorTable,
        pos_offset: Vec3,
        rot_offset: Quat,
        msg_size: usize,
        range: f32,
    ) -> Result<Self, EntityError> {
        validate_range(range)?;
        let mut rab = Self {
            entity,
            anchor,
            pos_offset,
            rot_offset,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            range,
            data: vec![0; msg_size],
        };
        rab.update(anchors)?;
        Ok(rab)
    }

    /// Create the device from a `<rab>` node and add it under `parent`.
    ///
    /// The anchor is looked up on the parent's `"body"` component. Nothing
    /// is added to the tree when the node is rejected.
    pub fn from_config(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &AnchorTable,
    ) -> Result<Self, EntityError> {
        let id: String = node.attribute_or("id", DEFAULT_RAB_ID.to_string())?;
        Self::parse(node, tree, parent, anchors, &id).map_err(|err| {
            err.nested(format!(
                "Error initializing a range and bearing entity \"{id}\""
            ))
        })
    }

    fn parse(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &AnchorTable,
        id: &str,
    ) -> Result<Self, EntityError> {
        let body = tree
            .child(parent, BODY_COMPONENT)
            .ok_or_else(|| ConfigError::MissingComponent {
                parent: tree.describe(parent),
                component: BODY_COMPONENT.to_string(),
            })?;
        let anchor_name: String = node.attribute("anchor")?;
        let anchor = anchors.resolve(body, &anchor_name)?;
        let pos_offset = node.attribute_or("pos_offset", Vec3::ZERO)?;
        let rot_offset = node.attribute_or("rot_offset", Quat::IDENTITY)?;
        let msg_size: usize = node.attribute("msg_size")?;
        let range: f32 = node.attribute("range")?;
        validate_range(range)?;

        let entity = tree.add_child(parent, id)?;
        let rab = Self::new(entity, anchor, anchors, pos_offset, rot_offset, msg_size, range)?;
        tree.initialize(entity)?;
        tracing::debug!(
            path = %tree.describe(entity),
            anchor = %anchor_name,
            range,
            msg_size,
            "range and bearing device configured"
        );
        Ok(rab)
    }

    /// Refresh the world pose from the anchor.
    pub fn update(&mut self, anchors: &AnchorTable) -> Result<(), EntityError> {
        let anchor = anchors.try_get(self.anchor)?;
        self.position = anchor.position + anchor.orientation * self.pos_offset;
        self.orientation = anchor.orientation * self.rot_offset;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.clear_data();
    }

    /// Replace the payload. The length must equal `msg_size`; on mismatch
    /// the old payload is kept.
    pub fn set_data(&mut self, data: &[u8]) -> Result<(), EntityError> {
        if data.len() != self.data.len() {
            return Err(EntityError::SizeMismatch {
                expected: self.data.len(),
                actual: data.len(),
            });
        }
        self.data.copy_from_slice(data);
        Ok(())
    }

    pub fn clear_data(&mut self) {
        self.data.fill(0);
    }

    /// Whether `point` lies within broadcast range.
    pub fn covers(&self, point: Vec3) -> bool {
        self.position.distance_squared(point) <= self.range * self.range
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn anchor(&self) -> AnchorHandle {
        self.anchor
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn msg_size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn validate_range(range: f32) -> Result<(), ConfigError> {
    if range.is_finite() && range >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::MalformedAttribute {
            tag: "rab".into(),
            attribute: "range".into(),
            value: range.to_string(),
            reason: "range must be a non-negative number".into(),
        })
    }
}

/// Registers devices into the arena grid.
pub struct GridEntityUpdater<'a> {
    grid: &'a mut Grid<EntityId>,
    coverage: Coverage,
}

impl<'a> GridEntityUpdater<'a> {
    pub fn new(grid: &'a mut Grid<EntityId>, coverage: Coverage) -> Self {
        Self { grid, coverage }
    }

    /// Register `rab` around its current position. Returns the number of
    /// accepted cell writes.
    pub fn register(&mut self, rab: &RabEquipped) -> usize {
        match self.coverage {
            Coverage::Sphere => {
                rasterize_sphere(&mut *self.grid, rab.position, rab.range, rab.entity)
            }
            Coverage::Box => {
                self.grid
                    .register_box(rab.position, Vec3::splat(rab.range), rab.entity)
            }
        }
    }
}

/// Registers devices into an unbounded [`SpaceHash`].
pub struct SpaceHashEntityUpdater<'a> {
    hash: &'a mut SpaceHash<EntityId>,
}

impl<'a> SpaceHashEntityUpdater<'a> {
    pub fn new(hash: &'a mut SpaceHash<EntityId>) -> Self {
        Self { hash }
    }

    pub fn register(&mut self, rab: &RabEquipped) -> usize {
        rasterize_sphere(&mut *self.hash, rab.position, rab.range, rab.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellCoord, CellIndex, GridConfig};
    use std::f32::consts::FRAC_PI_2;

    struct Fixture {
        tree: EntityTree,
        anchors: AnchorTable,
        robot: EntityId,
        body: EntityId,
    }

    fn fixture() -> Fixture {
        let mut tree = EntityTree::new();
        let robot = tree.add_root("robot0");
        let body = tree.add_child(robot, BODY_COMPONENT).unwrap();
        let mut anchors = AnchorTable::new();
        anchors
            .add_body(body, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY)
            .unwrap();
        Fixture {
            tree,
            anchors,
            robot,
            body,
        }
    }

    fn rab_node() -> ConfigNode {
        ConfigNode::new("rab")
            .with_attribute("anchor", "origin")
            .with_attribute("pos_offset", "0.5,0,0")
            .with_attribute("msg_size", "8")
            .with_attribute("range", "2")
    }

    #[test]
    fn pose_follows_the_anchor_with_offsets() {
        let mut f = fixture();
        let mut rab = RabEquipped::from_config(&rab_node(), &mut f.tree, f.robot, &f.anchors).unwrap();
        assert!(rab.position().abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), 1e-6));
        assert_eq!(f.tree.full_path(rab.entity()).unwrap(), "robot0.rab");
        assert_eq!(rab.msg_size(), 8);

        f.anchors
            .move_body(f.body, Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));
        rab.update(&f.anchors).unwrap();
        assert!(rab.position().abs_diff_eq(Vec3::new(1.0, 0.5, 0.0), 1e-6));
        assert!(rab
            .orientation()
            .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-6));
    }

    #[test]
    fn rot_offset_composes_after_the_anchor() {
        let mut f = fixture();
        let node = rab_node().with_attribute("rot_offset", "90,0,0");
        let rab = RabEquipped::from_config(&node, &mut f.tree, f.robot, &f.anchors).unwrap();
        assert!(rab
            .orientation()
            .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-5));
    }

    #[test]
    fn set_data_rejects_wrong_sizes_and_keeps_the_payload() {
        let mut f = fixture();
        let mut rab = RabEquipped::from_config(&rab_node(), &mut f.tree, f.robot, &f.anchors).unwrap();
        rab.set_data(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let err = rab.set_data(&[9, 9, 9, 9]).unwrap_err();
        assert_eq!(
            err,
            EntityError::SizeMismatch {
                expected: 8,
                actual: 4
            }
        );
        assert_eq!(rab.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        rab.reset();
        assert_eq!(rab.data(), &[0; 8]);
    }

    #[test]
    fn configuration_errors_name_the_device() {
        let mut f = fixture();
        let node = rab_node().with_attribute("anchor", "turret");
        let err = RabEquipped::from_config(&node, &mut f.tree, f.robot, &f.anchors).unwrap_err();
        assert!(err
            .chain_message()
            .starts_with("Error initializing a range and bearing entity \"rab\": "));
        assert!(matches!(
            err.root_cause(),
            EntityError::Config(ConfigError::UnknownAnchor { .. })
        ));
        // Rejected devices leave no trace in the tree.
        assert_eq!(f.tree.child(f.robot, "rab"), None);
    }

    #[test]
    fn missing_body_and_bad_ranges_are_rejected() {
        let mut tree = EntityTree::new();
        let robot = tree.add_root("robot0");
        let anchors = AnchorTable::new();
        let err = RabEquipped::from_config(&rab_node(), &mut tree, robot, &anchors).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EntityError::Config(ConfigError::MissingComponent { .. })
        ));

        let mut f = fixture();
        let node = rab_node().with_attribute("range", "-1").with_attribute("id", "rab1");
        let err = RabEquipped::from_config(&node, &mut f.tree, f.robot, &f.anchors).unwrap_err();
        assert!(err
            .chain_message()
            .starts_with("Error initializing a range and bearing entity \"rab1\""));
        assert!(matches!(
            err.root_cause(),
            EntityError::Config(ConfigError::MalformedAttribute { .. })
        ));
    }

    #[test]
    fn stale_anchors_fail_the_update() {
        let mut f = fixture();
        let mut rab = RabEquipped::from_config(&rab_node(), &mut f.tree, f.robot, &f.anchors).unwrap();
        f.anchors.remove_body(f.body);
        assert_eq!(rab.update(&f.anchors), Err(EntityError::StaleAnchor));
    }

    #[test]
    fn updaters_register_around_the_device() {
        let mut f = fixture();
        let rab = RabEquipped::from_config(&rab_node(), &mut f.tree, f.robot, &f.anchors).unwrap();

        let mut grid = Grid::new(&GridConfig {
            min: [-5.0, -5.0, -5.0],
            max: [5.0, 5.0, 5.0],
            cells: [10, 10, 10],
        })
        .unwrap();
        // Device at (1.5, 0, 0) lives in cell (6, 5, 5).
        let sphere = GridEntityUpdater::new(&mut grid, Coverage::Sphere).register(&rab);
        assert_eq!(grid.cell(CellCoord::new(6, 5, 5)), &[rab.entity()]);
        assert_eq!(grid.cell(CellCoord::new(8, 5, 5)), &[rab.entity()]);
        assert!(grid.cell(CellCoord::new(8, 7, 5)).is_empty());

        grid.begin_update();
        let cube = GridEntityUpdater::new(&mut grid, Coverage::Box).register(&rab);
        assert_eq!(cube, 5 * 5 * 5);
        assert!(sphere < cube);
        assert_eq!(grid.cell(CellCoord::new(7, 6, 6)), &[rab.entity()]);

        let mut hash = SpaceHash::uniform(1.0).unwrap();
        SpaceHashEntityUpdater::new(&mut hash).register(&rab);
        assert_eq!(hash.cell(CellCoord::new(3, 0, 0)), &[rab.entity()]);
        assert!(hash.cell(CellCoord::new(4, 0, 0)).is_empty());
    }
}
