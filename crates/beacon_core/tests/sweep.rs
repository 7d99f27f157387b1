//! End-to-end sweeps through the public API.

use beacon_core::glam::{Quat, Vec3};
use beacon_core::{
    AnchorTable, CellCoord, ConfigNode, Coverage, EntityError, EntityId, EntityTree, GridConfig,
    LinkEquipped, RabEquipped, RabMedium, SpaceHash, SpaceHashEntityUpdater, ORIGIN_ANCHOR,
};

const ROBOT: &str = r#"{
    "tag": "robot",
    "children": [
        { "tag": "links", "children": [
            { "tag": "link", "attributes": {
                "id": "mast", "geometry": "sphere", "radius": "0.05", "mass": "0.2",
                "position": "0,0,0.5" } }
        ] },
        { "tag": "rab", "attributes": {
            "anchor": "mast", "msg_size": "2", "range": "1" } }
    ]
}"#;

struct Arena {
    tree: EntityTree,
    anchors: AnchorTable,
    medium: RabMedium,
}

impl Arena {
    fn new() -> Self {
        let config = GridConfig {
            min: [-4.0, -4.0, 0.0],
            max: [4.0, 4.0, 2.0],
            cells: [16, 16, 4],
        };
        Self {
            tree: EntityTree::new(),
            anchors: AnchorTable::new(),
            medium: RabMedium::new(&config, Coverage::Sphere).unwrap(),
        }
    }

    /// Returns the body and the RAB device.
    fn spawn(&mut self, id: &str, position: Vec3) -> (EntityId, EntityId) {
        let node = ConfigNode::from_json_str(ROBOT).unwrap();
        let robot = self.tree.add_root(id);
        let body = self.tree.add_child(robot, "body").unwrap();
        self.anchors.add_body(body, position, Quat::IDENTITY).unwrap();
        for links in node.children_named("links") {
            LinkEquipped::from_config(links, &mut self.tree, robot, &mut self.anchors).unwrap();
        }
        let rab_node = node.children_named("rab").next().unwrap();
        let rab = RabEquipped::from_config(rab_node, &mut self.tree, robot, &self.anchors).unwrap();
        let entity = rab.entity();
        self.tree.enable_recursive(robot).unwrap();
        self.medium.add_entity(rab);
        (body, entity)
    }
}

#[test]
fn memberships_follow_moving_bodies() {
    let mut arena = Arena::new();
    let (body, rab) = arena.spawn("walker", Vec3::new(-3.0, 0.0, 0.0));
    arena.medium.update(&arena.tree, &arena.anchors).unwrap();

    let start = arena.medium.rab(rab).unwrap().position();
    assert!(start.abs_diff_eq(Vec3::new(-3.0, 0.0, 0.5), 1e-6));
    let start_cell = arena.medium.grid().geometry().cell_of(start);
    assert_eq!(arena.medium.grid().cell(start_cell), &[rab]);

    arena
        .anchors
        .move_body(body, Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY);
    arena.medium.update(&arena.tree, &arena.anchors).unwrap();

    // Nothing from the previous tick survives.
    assert!(arena.medium.grid().cell(start_cell).is_empty());
    let end = arena.medium.rab(rab).unwrap().position();
    assert_eq!(arena.medium.senders_reaching(end), vec![rab]);
}

#[test]
fn devices_hear_each_other_only_within_range() {
    let mut arena = Arena::new();
    let (_, near_a) = arena.spawn("a", Vec3::new(0.0, 0.0, 0.0));
    let (_, near_b) = arena.spawn("b", Vec3::new(0.75, 0.0, 0.0));
    let (_, far) = arena.spawn("c", Vec3::new(-3.0, -3.0, 0.0));
    arena.medium.update(&arena.tree, &arena.anchors).unwrap();

    let b_position = arena.medium.rab(near_b).unwrap().position();
    let heard: Vec<EntityId> = arena
        .medium
        .senders_reaching(b_position)
        .into_iter()
        .filter(|&id| id != near_b)
        .collect();
    assert_eq!(heard, vec![near_a]);
    assert!(!heard.contains(&far));
}

#[test]
fn removed_bodies_are_reported_with_their_path() {
    let mut arena = Arena::new();
    let (body, _) = arena.spawn("ghost", Vec3::ZERO);
    let (_, alive) = arena.spawn("alive", Vec3::new(2.0, 2.0, 0.0));
    arena.anchors.remove_body(body);

    let err = arena.medium.update(&arena.tree, &arena.anchors).unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].path, "ghost.rab");
    assert_eq!(err.failures[0].source, EntityError::StaleAnchor);
    assert_eq!(
        err.failures[0].to_string(),
        "while updating the RAB entity grid for RAB entity \"ghost.rab\""
    );
    assert_eq!(err.stats.entities_registered, 1);
    assert!(arena.medium.rab(alive).is_some());
}

#[test]
fn unit_cells_register_the_radius_five_sphere() {
    let mut tree = EntityTree::new();
    let robot = tree.add_root("probe");
    let body = tree.add_child(robot, "body").unwrap();
    let rab_entity = tree.add_child(robot, "rab").unwrap();
    let mut anchors = AnchorTable::new();
    anchors.add_body(body, Vec3::ZERO, Quat::IDENTITY).unwrap();
    let origin = anchors.resolve(body, ORIGIN_ANCHOR).unwrap();

    let rab = RabEquipped::new(rab_entity, origin, &anchors, Vec3::ZERO, Quat::IDENTITY, 0, 5.0).unwrap();
    let mut hash = SpaceHash::uniform(1.0).unwrap();
    SpaceHashEntityUpdater::new(&mut hash).register(&rab);

    assert_eq!(hash.cell(CellCoord::new(0, 0, 0)), &[rab_entity]);
    assert_eq!(hash.cell(CellCoord::new(5, 0, 0)), &[rab_entity]);
    assert!(hash.cell(CellCoord::new(10, 0, 0)).is_empty());
}
