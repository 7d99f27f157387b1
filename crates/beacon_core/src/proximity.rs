//! Proximity sensors mounted on body anchors.
//!
//! Sensors are declared one by one with `<sensor>` or as an evenly spaced
//! `<ring>` around a center point in the anchor's XY plane.

use crate::anchor::{AnchorHandle, AnchorTable};
use crate::config::ConfigNode;
use crate::entity::{EntityId, EntityTree};
use crate::error::{ConfigError, EntityError};
use crate::math::{signed_normalize, Quat, Vec3};
use crate::rab::BODY_COMPONENT;
use std::f32::consts::TAU;

pub const DEFAULT_PROXIMITY_ID: &str = "proximity_sensors";

/// One ray sensor, expressed in its anchor's frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProximitySensor {
    pub anchor: AnchorHandle,
    pub offset: Vec3,
    /// Ray direction scaled to the sensing range.
    pub direction: Vec3,
    pub range: f32,
}

impl ProximitySensor {
    /// World-space start and end of the sensing ray.
    pub fn ray(&self, anchors: &AnchorTable) -> Result<(Vec3, Vec3), EntityError> {
        let anchor = anchors.try_get(self.anchor)?;
        let start = anchor.position + anchor.orientation * self.offset;
        Ok((start, start + anchor.orientation * self.direction))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySensorEquipped {
    entity: EntityId,
    sensors: Vec<ProximitySensor>,
}

impl ProximitySensorEquipped {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            sensors: Vec::new(),
        }
    }

    pub fn from_config(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &AnchorTable,
    ) -> Result<Self, EntityError> {
        let id: String = node.attribute_or("id", DEFAULT_PROXIMITY_ID.to_string())?;
        Self::build(node, tree, parent, anchors, &id).map_err(|err| {
            err.nested(format!(
                "Initialization error in proximity sensor equipped entity \"{id}\""
            ))
        })
    }

    fn build(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &AnchorTable,
        id: &str,
    ) -> Result<Self, EntityError> {
        if !node.has_children() {
            return Err(ConfigError::NoChildren {
                tag: node.tag.clone(),
            }
            .into());
        }
        let body = tree
            .child(parent, BODY_COMPONENT)
            .ok_or_else(|| ConfigError::MissingComponent {
                parent: tree.describe(parent),
                component: BODY_COMPONENT.to_string(),
            })?;

        // Entity id is filled in once the node is accepted.
        let mut equipped = Self::new(parent);
        for child in node.children() {
            let anchor_name: String = child.attribute("anchor")?;
            let anchor = anchors.resolve(body, &anchor_name)?;
            match child.tag.as_str() {
                "sensor" => {
                    equipped.add_sensor(
                        anchor,
                        child.attribute("offset")?,
                        child.attribute("direction")?,
                        child.attribute("range")?,
                    );
                }
                "ring" => {
                    let num_sensors: u32 = child.attribute("num_sensors")?;
                    if num_sensors == 0 {
                        return Err(ConfigError::MalformedAttribute {
                            tag: child.tag.clone(),
                            attribute: "num_sensors".into(),
                            value: "0".into(),
                            reason: "a ring needs at least one sensor".into(),
                        }
                        .into());
                    }
                    let start_angle: f32 = child.attribute_or("start_angle", 0.0)?;
                    equipped.add_sensor_ring(
                        anchor,
                        child.attribute_or("center", Vec3::ZERO)?,
                        child.attribute("radius")?,
                        start_angle.to_radians(),
                        child.attribute("range")?,
                        num_sensors,
                    );
                }
                other => {
                    return Err(ConfigError::UnknownTag {
                        tag: other.to_string(),
                    }
                    .into())
                }
            }
        }

        equipped.entity = tree.add_child(parent, id)?;
        tree.initialize(equipped.entity)?;
        tracing::debug!(
            path = %tree.describe(equipped.entity),
            sensors = equipped.len(),
            "proximity sensors configured"
        );
        Ok(equipped)
    }

    pub fn add_sensor(&mut self, anchor: AnchorHandle, offset: Vec3, direction: Vec3, range: f32) {
        self.sensors.push(ProximitySensor {
            anchor,
            offset,
            direction,
            range,
        });
    }

    /// Add `num_sensors` sensors evenly spaced on a circle of `radius`
    /// around `center`, the first one at `start_angle` (radians) from +X,
    /// each pointing outward.
    pub fn add_sensor_ring(
        &mut self,
        anchor: AnchorHandle,
        center: Vec3,
        radius: f32,
        start_angle: f32,
        range: f32,
        num_sensors: u32,
    ) {
        if num_sensors == 0 {
            return;
        }
        let spacing = TAU / num_sensors as f32;
        for i in 0..num_sensors {
            let angle = signed_normalize(start_angle + i as f32 * spacing);
            let rotation = Quat::from_rotation_z(angle);
            self.add_sensor(
                anchor,
                center + rotation * Vec3::new(radius, 0.0, 0.0),
                rotation * Vec3::new(range, 0.0, 0.0),
                range,
            );
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn sensors(&self) -> &[ProximitySensor] {
        &self.sensors
    }

    pub fn sensor(&self, index: usize) -> Result<&ProximitySensor, EntityError> {
        self.sensors.get(index).ok_or(EntityError::IndexOutOfBounds {
            index,
            len: self.sensors.len(),
        })
    }
}
