//! Robot assembly from a `<robot>` configuration node.
//!
//! A robot is a root entity with a `body` component whose origin anchor is
//! placed at the robot's `position`/`orientation`. Its children configure
//! the optional components: `<links>`, `<rab>` (any number) and
//! `<proximity_sensors>`.

use beacon_core::glam::{Quat, Vec3};
use beacon_core::rab::BODY_COMPONENT;
use beacon_core::{
    AnchorHandle, AnchorTable, ConfigError, ConfigNode, EntityError, EntityId, EntityTree,
    LinkEquipped, ProximitySensorEquipped, RabEquipped, RabMedium,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub id: String,
    pub entity: EntityId,
    pub body: EntityId,
    pub origin: AnchorHandle,
    pub links: Option<LinkEquipped>,
    pub proximity: Option<ProximitySensorEquipped>,
    /// Devices handed to the medium.
    pub rabs: Vec<EntityId>,
}

impl Robot {
    /// Build the robot and enable it. RAB devices are added to `medium`.
    ///
    /// A rejected robot leaves no entities, anchors or devices behind.
    pub fn assemble(
        node: &ConfigNode,
        tree: &mut EntityTree,
        anchors: &mut AnchorTable,
        medium: &mut RabMedium,
    ) -> Result<Self, EntityError> {
        let id: String = node.attribute("id")?;
        let position = node.attribute_or("position", Vec3::ZERO)?;
        let orientation = node.attribute_or("orientation", Quat::IDENTITY)?;

        let entity = tree.add_root(id.as_str());
        let body = tree.add_child(entity, BODY_COMPONENT)?;
        let built = anchors
            .add_body(body, position, orientation)
            .map_err(EntityError::from)
            .and_then(|origin| Self::components(node, tree, anchors, entity, body, origin, &id));

        match built {
            Ok((robot, rabs)) => {
                let robot = Self {
                    rabs: rabs.iter().map(RabEquipped::entity).collect(),
                    ..robot
                };
                for rab in rabs {
                    medium.add_entity(rab);
                }
                tracing::info!(robot = %id, rabs = robot.rabs.len(), "robot assembled");
                Ok(robot)
            }
            Err(err) => {
                anchors.remove_body(body);
                // The root was created above, so it is still live.
                let _ = tree.destroy(entity);
                Err(err.nested(format!("Failed to initialize \"{id}\"")))
            }
        }
    }

    fn components(
        node: &ConfigNode,
        tree: &mut EntityTree,
        anchors: &mut AnchorTable,
        entity: EntityId,
        body: EntityId,
        origin: AnchorHandle,
        id: &str,
    ) -> Result<(Self, Vec<RabEquipped>), EntityError> {
        let mut links = None;
        let mut proximity = None;
        let mut rabs = Vec::new();
        // Links first: they register the anchors other devices mount on.
        for child in node.children_named("links") {
            links = Some(LinkEquipped::from_config(child, tree, entity, anchors)?);
        }
        for child in node.children() {
            match child.tag.as_str() {
                "links" => {}
                "rab" => rabs.push(RabEquipped::from_config(child, tree, entity, anchors)?),
                "proximity_sensors" => {
                    proximity = Some(ProximitySensorEquipped::from_config(child, tree, entity, anchors)?)
                }
                other => {
                    return Err(ConfigError::UnknownTag {
                        tag: other.to_string(),
                    }
                    .into())
                }
            }
        }
        tree.enable_recursive(entity)?;
        let robot = Self {
            id: id.to_string(),
            entity,
            body,
            origin,
            links,
            proximity,
            rabs: Vec::new(),
        };
        Ok((robot, rabs))
    }

    /// Current world pose of the body origin.
    pub fn pose(&self, anchors: &AnchorTable) -> Result<(Vec3, Quat), EntityError> {
        let origin = anchors.try_get(self.origin)?;
        Ok((origin.position, origin.orientation))
    }

    /// Remove the robot with every component and device it owns.
    pub fn despawn(
        self,
        tree: &mut EntityTree,
        anchors: &mut AnchorTable,
        medium: &mut RabMedium,
    ) -> Result<usize, EntityError> {
        anchors.remove_body(self.body);
        medium.destroy_entity(tree, self.entity)
    }
}
