//! Scenario files: settings plus the robots to spawn.

use crate::error::{read_json, ServiceError};
use crate::settings::Settings;
use beacon_core::ConfigNode;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub settings: Settings,
    /// One `<robot>` node per robot.
    pub robots: Vec<ConfigNode>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ServiceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let scenario: Scenario = read_json(path.as_ref())?;
        tracing::info!(
            path = %path.as_ref().display(),
            robots = scenario.robots.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// `count` robots evenly spaced on a circle of `radius` around the
    /// arena center, each with a mast link, a RAB device on the mast and a
    /// ring of proximity sensors.
    pub fn demo(count: usize, radius: f32) -> Self {
        let settings = Settings::default();
        let center = settings.grid.center();
        let robots = (0..count)
            .map(|n| {
                let angle = n as f32 * std::f32::consts::TAU / count.max(1) as f32;
                let x = center.x + radius * angle.cos();
                let y = center.y + radius * angle.sin();
                demo_robot(&format!("robot{n}"), x, y, settings.grid.min[2])
            })
            .collect();
        Self { settings, robots }
    }
}

fn demo_robot(id: &str, x: f32, y: f32, floor: f32) -> ConfigNode {
    ConfigNode::new("robot")
        .with_attribute("id", id)
        .with_attribute("position", format!("{x},{y},{floor}"))
        .with_child(
            ConfigNode::new("links").with_child(
                ConfigNode::new("link")
                    .with_attribute("id", "mast")
                    .with_attribute("geometry", "cylinder")
                    .with_attribute("radius", "0.02")
                    .with_attribute("height", "0.2")
                    .with_attribute("mass", "0.05")
                    .with_attribute("position", "0,0,0.2"),
            ),
        )
        .with_child(
            ConfigNode::new("rab")
                .with_attribute("anchor", "mast")
                .with_attribute("pos_offset", "0,0,0.1")
                .with_attribute("msg_size", "10")
                .with_attribute("range", "1.5"),
        )
        .with_child(
            ConfigNode::new("proximity_sensors").with_child(
                ConfigNode::new("ring")
                    .with_attribute("anchor", "origin")
                    .with_attribute("center", "0,0,0.05")
                    .with_attribute("radius", "0.1")
                    .with_attribute("range", "0.1")
                    .with_attribute("num_sensors", "8"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::Coverage;

    #[test]
    fn scenario_documents_parse() {
        let scenario = Scenario::from_json_str(
            r#"{
                "settings": { "grid": { "coverage": "sphere" }, "simulation": { "ticks": 3 } },
                "robots": [
                    { "tag": "robot", "attributes": { "id": "r0", "position": "0,0,0" },
                      "children": [ { "tag": "rab", "attributes": { "anchor": "origin", "msg_size": "4", "range": "1" } } ] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(scenario.settings.simulation.ticks, 3);
        assert_eq!(scenario.settings.grid.coverage, Coverage::Sphere);
        assert_eq!(scenario.robots.len(), 1);
        assert_eq!(scenario.robots[0].children_named("rab").count(), 1);
    }

    #[test]
    fn demo_places_robots_on_a_circle() {
        let scenario = Scenario::demo(4, 2.0);
        assert_eq!(scenario.robots.len(), 4);
        let ids: Vec<&str> = scenario
            .robots
            .iter()
            .filter_map(|robot| robot.raw_attribute("id"))
            .collect();
        assert_eq!(ids, ["robot0", "robot1", "robot2", "robot3"]);
        assert_eq!(scenario.robots[0].raw_attribute("position"), Some("2,0,0"));
    }
}
