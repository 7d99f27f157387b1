//! Rigid links of a multi-body robot.
//!
//! Each `<link>` becomes a child entity and an anchor of the same name on
//! the robot's body, so devices can be mounted on any link.

use crate::anchor::{AnchorHandle, AnchorTable, ORIGIN_ANCHOR};
use crate::config::ConfigNode;
use crate::entity::{EntityId, EntityTree};
use crate::error::{ConfigError, EntityError};
use crate::math::{Quat, Vec3};
use crate::rab::BODY_COMPONENT;

pub const DEFAULT_LINKS_ID: &str = "links";

/// Collision shape of a link.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LinkGeometry {
    Box { size: Vec3 },
    Cylinder { radius: f32, height: f32 },
    Sphere { radius: f32 },
}

impl LinkGeometry {
    fn from_config(node: &ConfigNode) -> Result<Self, ConfigError> {
        let kind: String = node.attribute("geometry")?;
        let geometry = match kind.as_str() {
            "box" => LinkGeometry::Box {
                size: node.attribute("size")?,
            },
            "cylinder" => LinkGeometry::Cylinder {
                radius: node.attribute("radius")?,
                height: node.attribute("height")?,
            },
            "sphere" => LinkGeometry::Sphere {
                radius: node.attribute("radius")?,
            },
            _ => {
                return Err(ConfigError::MalformedAttribute {
                    tag: node.tag.clone(),
                    attribute: "geometry".into(),
                    value: kind,
                    reason: "expected box, cylinder or sphere".into(),
                })
            }
        };
        if geometry.half_extents().cmple(Vec3::ZERO).any() {
            return Err(ConfigError::MalformedAttribute {
                tag: node.tag.clone(),
                attribute: "geometry".into(),
                value: format!("{geometry:?}"),
                reason: "dimensions must be positive".into(),
            });
        }
        Ok(geometry)
    }

    /// Half extents of the axis-aligned box enclosing the shape in link space.
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            LinkGeometry::Box { size } => size * 0.5,
            LinkGeometry::Cylinder { radius, height } => Vec3::new(radius, radius, height * 0.5),
            LinkGeometry::Sphere { radius } => Vec3::splat(radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: String,
    pub entity: EntityId,
    pub anchor: AnchorHandle,
    pub geometry: LinkGeometry,
    pub mass: f32,
    /// Pose relative to the body origin.
    pub position: Vec3,
    pub orientation: Quat,
}

/// Link description read from the configuration, before anything is
/// registered.
struct LinkDef {
    id: String,
    geometry: LinkGeometry,
    mass: f32,
    position: Vec3,
    orientation: Quat,
}

impl LinkDef {
    fn from_config(node: &ConfigNode) -> Result<Self, ConfigError> {
        let id: String = node.attribute("id")?;
        let geometry = LinkGeometry::from_config(node)?;
        let mass: f32 = node.attribute("mass")?;
        if mass <= 0.0 {
            return Err(ConfigError::MalformedAttribute {
                tag: node.tag.clone(),
                attribute: "mass".into(),
                value: mass.to_string(),
                reason: "mass must be positive".into(),
            });
        }
        Ok(Self {
            id,
            geometry,
            mass,
            position: node.attribute_or("position", Vec3::ZERO)?,
            orientation: node.attribute_or("orientation", Quat::IDENTITY)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkEquipped {
    id: String,
    entity: EntityId,
    body: EntityId,
    links: Vec<Link>,
}

impl LinkEquipped {
    /// Read every `<link>` child of `node` and register it under `parent`.
    pub fn from_config(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &mut AnchorTable,
    ) -> Result<Self, EntityError> {
        let id: String = node.attribute_or("id", DEFAULT_LINKS_ID.to_string())?;
        Self::build(node, tree, parent, anchors, &id).map_err(|err| {
            err.nested(format!("Failed to initialize link equipped entity \"{id}\""))
        })
    }

    fn build(
        node: &ConfigNode,
        tree: &mut EntityTree,
        parent: EntityId,
        anchors: &mut AnchorTable,
        id: &str,
    ) -> Result<Self, EntityError> {
        let body = tree
            .child(parent, BODY_COMPONENT)
            .ok_or_else(|| ConfigError::MissingComponent {
                parent: tree.describe(parent),
                component: BODY_COMPONENT.to_string(),
            })?;

        // Validate everything before touching the tree or the anchors.
        let defs = node
            .children_named("link")
            .map(LinkDef::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        for (n, def) in defs.iter().enumerate() {
            let repeated = defs[..n].iter().any(|other| other.id == def.id);
            if repeated || anchors.resolve(body, &def.id).is_ok() {
                return Err(ConfigError::DuplicateAnchor {
                    body: tree.describe(body),
                    anchor: def.id.clone(),
                }
                .into());
            }
        }

        let entity = tree.add_child(parent, id)?;
        let mut links = Vec::with_capacity(defs.len());
        for def in defs {
            let link_entity = tree.add_child(entity, def.id.as_str())?;
            let anchor = anchors.add_anchor(body, &def.id, def.position, def.orientation)?;
            tree.initialize(link_entity)?;
            links.push(Link {
                id: def.id,
                entity: link_entity,
                anchor,
                geometry: def.geometry,
                mass: def.mass,
                position: def.position,
                orientation: def.orientation,
            });
        }
        tree.initialize(entity)?;
        tracing::debug!(path = %tree.describe(entity), links = links.len(), "links configured");
        Ok(Self {
            id: id.to_string(),
            entity,
            body,
            links,
        })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Link at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds; see [`LinkEquipped::try_link`].
    pub fn link(&self, index: usize) -> &Link {
        assert!(
            index < self.links.len(),
            "LinkEquipped::link(), id=\"{}\": index out of bounds: index = {}, len = {}",
            self.id,
            index,
            self.links.len()
        );
        &self.links[index]
    }

    pub fn try_link(&self, index: usize) -> Result<&Link, EntityError> {
        self.links.get(index).ok_or(EntityError::IndexOutOfBounds {
            index,
            len: self.links.len(),
        })
    }

    /// Total mass of all links.
    pub fn mass(&self) -> f32 {
        self.links.iter().map(|link| link.mass).sum()
    }

    /// Put every link anchor back at its configured offset from the body origin.
    pub fn reset(&self, anchors: &mut AnchorTable) -> Result<(), EntityError> {
        let origin = anchors.resolve(self.body, ORIGIN_ANCHOR)?;
        let (origin_position, origin_orientation) = {
            let origin = anchors.try_get(origin)?;
            (origin.position, origin.orientation)
        };
        for link in &self.links {
            anchors.set_pose(
                link.anchor,
                origin_position + origin_orientation * link.position,
                origin_orientation * link.orientation,
            );
        }
        Ok(())
    }
}
