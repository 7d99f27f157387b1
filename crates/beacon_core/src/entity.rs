//! Entity arena with generational handles.
//!
//! Composite entities (a robot with a body, links, a RAB device, ...) are
//! stored as nodes of a flat arena. Parents and children refer to each
//! other by [`EntityId`], never by pointer, and components are found by
//! their string id under a parent.
//!
//! Every node runs the lifecycle
//! `Constructed -> Initialized -> Enabled <-> Disabled`, and any state may
//! move to `Destroyed`, which frees the slot.

use crate::error::EntityError;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Slot in the arena
/// - Generation: Incremented when the slot is freed, so stale handles stop resolving
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for logs and save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

/// Lifecycle state of an entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityState {
    Constructed,
    Initialized,
    Enabled,
    Disabled,
    Destroyed,
}

#[derive(Debug)]
struct Node {
    id: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    state: EntityState,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of composable entities.
#[derive(Debug, Default)]
pub struct EntityTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EntityTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Add a top-level entity.
    pub fn add_root(&mut self, id: impl Into<String>) -> EntityId {
        self.alloc(Node {
            id: id.into(),
            parent: None,
            children: Vec::new(),
            state: EntityState::Constructed,
        })
    }

    /// Add a component under `parent`.
    pub fn add_child(&mut self, parent: EntityId, id: impl Into<String>) -> Result<EntityId, EntityError> {
        self.node(parent)?;
        let child = self.alloc(Node {
            id: id.into(),
            parent: Some(parent),
            children: Vec::new(),
            state: EntityState::Constructed,
        });
        self.node_mut(parent)?.children.push(child);
        Ok(child)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.node(entity).is_ok()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn id(&self, entity: EntityId) -> Result<&str, EntityError> {
        Ok(&self.node(entity)?.id)
    }

    pub fn parent(&self, entity: EntityId) -> Result<EntityId, EntityError> {
        let node = self.node(entity)?;
        node.parent.ok_or_else(|| EntityError::NoParent {
            entity: node.id.clone(),
        })
    }

    pub fn children(&self, entity: EntityId) -> Result<&[EntityId], EntityError> {
        Ok(&self.node(entity)?.children)
    }

    /// Component of `parent` whose id is `id`.
    pub fn child(&self, parent: EntityId, id: &str) -> Option<EntityId> {
        let node = self.node(parent).ok()?;
        node.children
            .iter()
            .copied()
            .find(|&child| self.node(child).map(|c| c.id == id).unwrap_or(false))
    }

    /// Dot-joined ids from the root down to `entity`, e.g. `robot0.rab`.
    pub fn full_path(&self, entity: EntityId) -> Result<String, EntityError> {
        let mut parts = Vec::new();
        let mut cursor = Some(entity);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            parts.push(node.id.as_str());
            cursor = node.parent;
        }
        parts.reverse();
        Ok(parts.join("."))
    }

    /// Best-effort path for diagnostics about entities that may be gone.
    pub fn describe(&self, entity: EntityId) -> String {
        self.full_path(entity)
            .unwrap_or_else(|_| format!("<entity {}v{}>", entity.index(), entity.generation()))
    }

    pub fn state(&self, entity: EntityId) -> EntityState {
        self.node(entity)
            .map(|node| node.state)
            .unwrap_or(EntityState::Destroyed)
    }

    pub fn is_enabled(&self, entity: EntityId) -> bool {
        self.state(entity) == EntityState::Enabled
    }

    /// `Constructed -> Initialized`.
    pub fn initialize(&mut self, entity: EntityId) -> Result<(), EntityError> {
        self.transition(entity, EntityState::Initialized, |from| {
            from == EntityState::Constructed
        })
    }

    /// `Initialized | Disabled -> Enabled`. Enabling twice is a no-op.
    pub fn enable(&mut self, entity: EntityId) -> Result<(), EntityError> {
        self.transition(entity, EntityState::Enabled, |from| {
            matches!(
                from,
                EntityState::Initialized | EntityState::Disabled | EntityState::Enabled
            )
        })
    }

    /// `Enabled -> Disabled`. Disabling twice is a no-op.
    pub fn disable(&mut self, entity: EntityId) -> Result<(), EntityError> {
        self.transition(entity, EntityState::Disabled, |from| {
            matches!(from, EntityState::Enabled | EntityState::Disabled)
        })
    }

    /// Initialize and enable `entity` and all its descendants.
    pub fn enable_recursive(&mut self, entity: EntityId) -> Result<(), EntityError> {
        if self.state(entity) == EntityState::Constructed {
            self.initialize(entity)?;
        }
        self.enable(entity)?;
        for child in self.children(entity)?.to_vec() {
            self.enable_recursive(child)?;
        }
        Ok(())
    }

    /// Destroy `entity` and its descendants, freeing their slots.
    ///
    /// Returns every destroyed handle, children before their parent.
    pub fn destroy(&mut self, entity: EntityId) -> Result<Vec<EntityId>, EntityError> {
        let parent = self.node(entity)?.parent;
        let mut destroyed = Vec::new();
        self.destroy_subtree(entity, &mut destroyed);
        if let Some(parent) = parent {
            if let Ok(node) = self.node_mut(parent) {
                node.children.retain(|&child| child != entity);
            }
        }
        Ok(destroyed)
    }

    fn destroy_subtree(&mut self, entity: EntityId, out: &mut Vec<EntityId>) {
        let children = match self.node(entity) {
            Ok(node) => node.children.clone(),
            Err(_) => return,
        };
        for child in children {
            self.destroy_subtree(child, out);
        }
        let slot = &mut self.slots[entity.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index);
        out.push(entity);
    }

    fn transition(
        &mut self,
        entity: EntityId,
        to: EntityState,
        allowed: impl Fn(EntityState) -> bool,
    ) -> Result<(), EntityError> {
        let node = self.node_mut(entity)?;
        if !allowed(node.state) {
            return Err(EntityError::InvalidTransition {
                entity: node.id.clone(),
                from: node.state,
                to,
            });
        }
        node.state = to;
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            EntityId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            EntityId::new(index, 0)
        }
    }

    fn node(&self, entity: EntityId) -> Result<&Node, EntityError> {
        self.slots
            .get(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(EntityError::UnknownEntity)
    }

    fn node_mut(&mut self, entity: EntityId) -> Result<&mut Node, EntityError> {
        self.slots
            .get_mut(entity.index as usize)
            .filter(|slot| slot.generation == entity.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(EntityError::UnknownEntity)
    }
}
