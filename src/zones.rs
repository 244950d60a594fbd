//! # Zones
//!
//! Zones partition a floor by declaration order: the first zone whose
//! boundary predicate matches a node claims it, and later zones never see
//! it. Unmatched nodes stay zoneless.

use crate::graph::FloorGraph;
use crate::rooms::RoomKind;
use crate::template::RoomTemplate;
use crate::{WarrenError, WarrenResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Predicate deciding which nodes a zone claims.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneBoundary {
    /// Matches nodes with `min <= distance_from_start <= max`.
    DistanceBased { min: i32, max: i32 },
    /// Matches critical-path nodes whose path index falls inside
    /// `[start_pct * L, end_pct * L]`, `L` being the path length.
    CriticalPathBased { start_pct: f64, end_pct: f64 },
}

impl ZoneBoundary {
    fn matches(&self, graph: &FloorGraph, node_id: i32) -> bool {
        match *self {
            ZoneBoundary::DistanceBased { min, max } => {
                let distance = graph
                    .node(node_id)
                    .map(|n| n.distance_from_start())
                    .unwrap_or(-1);
                distance >= min && distance <= max
            }
            ZoneBoundary::CriticalPathBased { start_pct, end_pct } => {
                match graph.critical_path_index(node_id) {
                    Some(index) => {
                        let length = graph.critical_path().len() as f64;
                        let position = index as f64;
                        position >= start_pct * length && position <= end_pct * length
                    }
                    None => false,
                }
            }
        }
    }
}

/// A named zone: a boundary, optional zone-local templates, and per-zone
/// room requirements.
#[derive(Debug, Clone)]
pub struct Zone<T: RoomKind> {
    id: String,
    name: String,
    boundary: ZoneBoundary,
    templates: Vec<Arc<RoomTemplate<T>>>,
    room_requirements: Vec<(T, usize)>,
}

impl<T: RoomKind> Zone<T> {
    /// Creates a zone. Empty ids and names are rejected.
    pub fn new(id: &str, name: &str, boundary: ZoneBoundary) -> WarrenResult<Self> {
        if id.is_empty() {
            return Err(WarrenError::InvalidConfiguration(
                "zone: id must be non-empty".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(WarrenError::InvalidConfiguration(format!(
                "zone {id:?}: name must be non-empty"
            )));
        }
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            boundary,
            templates: Vec::new(),
            room_requirements: Vec::new(),
        })
    }

    /// Adds zone-local templates; they compose additively with the global
    /// pool during selection.
    pub fn with_templates(
        mut self,
        templates: impl IntoIterator<Item = RoomTemplate<T>>,
    ) -> Self {
        self.templates
            .extend(templates.into_iter().map(Arc::new));
        self
    }

    /// Requires at least `count` rooms of `room_type` inside this zone.
    pub fn require_room(mut self, room_type: T, count: usize) -> Self {
        self.room_requirements.push((room_type, count));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> ZoneBoundary {
        self.boundary
    }

    pub fn templates(&self) -> &[Arc<RoomTemplate<T>>] {
        &self.templates
    }

    pub fn room_requirements(&self) -> &[(T, usize)] {
        &self.room_requirements
    }
}

/// Maps every node to the first matching zone, in declaration order.
pub(crate) fn assign_zones<T: RoomKind>(
    graph: &FloorGraph,
    zones: &[Zone<T>],
) -> BTreeMap<i32, String> {
    let mut assignments = BTreeMap::new();
    for node_id in 0..graph.node_count() as i32 {
        for zone in zones {
            if zone.boundary.matches(graph, node_id) {
                assignments.insert(node_id, zone.id.clone());
                break;
            }
        }
    }
    debug!(
        "zone assigner: {} of {} nodes zoned",
        assignments.len(),
        graph.node_count()
    );
    assignments
}

/// Nodes whose neighborhood (the node plus its graph neighbors) spans at
/// least two distinct zones.
pub(crate) fn transition_rooms(
    graph: &FloorGraph,
    assignments: &BTreeMap<i32, String>,
) -> Vec<i32> {
    let mut transitions = Vec::new();
    for node_id in 0..graph.node_count() as i32 {
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        if let Some(zone) = assignments.get(&node_id) {
            seen.insert(zone);
        }
        for neighbor in graph.neighbors(node_id) {
            if let Some(zone) = assignments.get(&neighbor) {
                seen.insert(zone);
            }
        }
        if seen.len() >= 2 {
            transitions.push(node_id);
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::analysis::analyze;
    use crate::rooms::RoomType;

    fn path_graph(n: i32) -> FloorGraph {
        let mut g = FloorGraph::new(n);
        for i in 1..n {
            g.add_connection(i - 1, i);
        }
        analyze(&mut g).unwrap();
        g
    }

    fn zone(id: &str, min: i32, max: i32) -> Zone<RoomType> {
        Zone::new(id, id, ZoneBoundary::DistanceBased { min, max }).unwrap()
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(Zone::<RoomType>::new("", "castle", ZoneBoundary::DistanceBased {
            min: 0,
            max: 1
        })
        .is_err());
        assert!(Zone::<RoomType>::new("castle", "", ZoneBoundary::DistanceBased {
            min: 0,
            max: 1
        })
        .is_err());
    }

    #[test]
    fn test_distance_based_assignment() {
        let graph = path_graph(7);
        let zones = vec![zone("castle", 0, 2), zone("dungeon", 3, 5)];
        let assignments = assign_zones(&graph, &zones);
        assert_eq!(assignments.get(&0), Some(&"castle".to_string()));
        assert_eq!(assignments.get(&2), Some(&"castle".to_string()));
        assert_eq!(assignments.get(&3), Some(&"dungeon".to_string()));
        assert_eq!(assignments.get(&5), Some(&"dungeon".to_string()));
        assert_eq!(assignments.get(&6), None);
    }

    #[test]
    fn test_first_match_wins() {
        let graph = path_graph(4);
        // Overlapping boundaries: declaration order decides.
        let zones = vec![zone("outer", 0, 3), zone("inner", 1, 2)];
        let assignments = assign_zones(&graph, &zones);
        for node in 0..4 {
            assert_eq!(assignments.get(&node), Some(&"outer".to_string()));
        }
    }

    #[test]
    fn test_critical_path_based() {
        let graph = path_graph(4); // critical path 0..3, L = 4
        let zones = vec![Zone::<RoomType>::new(
            "late",
            "Late Stretch",
            ZoneBoundary::CriticalPathBased {
                start_pct: 0.5,
                end_pct: 1.0,
            },
        )
        .unwrap()];
        let assignments = assign_zones(&graph, &zones);
        assert_eq!(assignments.get(&0), None);
        assert_eq!(assignments.get(&1), None);
        assert_eq!(assignments.get(&2), Some(&"late".to_string()));
        assert_eq!(assignments.get(&3), Some(&"late".to_string()));
    }

    #[test]
    fn test_transition_rooms() {
        let graph = path_graph(6);
        let zones = vec![zone("castle", 0, 2), zone("dungeon", 3, 5)];
        let assignments = assign_zones(&graph, &zones);
        // Node 2 (castle) borders node 3 (dungeon) and vice versa.
        assert_eq!(transition_rooms(&graph, &assignments), vec![2, 3]);
    }

    #[test]
    fn test_zoneless_node_between_zones_is_transition() {
        let graph = path_graph(5);
        let zones = vec![zone("castle", 0, 1), zone("dungeon", 3, 4)];
        let assignments = assign_zones(&graph, &zones);
        // Node 2 has no zone but neighbors in castle and dungeon.
        let transitions = transition_rooms(&graph, &assignments);
        assert!(transitions.contains(&2));
    }
}
