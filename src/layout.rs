//! # Layout Output Types
//!
//! Placed rooms, doors, and the immutable [`FloorLayout`] aggregate the
//! pipeline returns. Everything here is plain read-only data; the stages own
//! construction and nothing mutates a layout after `generate` returns.

use crate::clusters::RoomCluster;
use crate::grid::{Cell, Edge};
use crate::hallways::Hallway;
use crate::rooms::RoomKind;
use crate::secrets::SecretPassage;
use crate::template::{FeatureKind, RoomTemplate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A room with an assigned type, template, and world anchor.
#[derive(Debug, Clone)]
pub struct PlacedRoom<T: RoomKind> {
    node_id: i32,
    room_type: T,
    template: Arc<RoomTemplate<T>>,
    position: Cell,
    difficulty: f64,
}

impl<T: RoomKind> PlacedRoom<T> {
    pub(crate) fn new(
        node_id: i32,
        room_type: T,
        template: Arc<RoomTemplate<T>>,
        position: Cell,
        difficulty: f64,
    ) -> Self {
        Self {
            node_id,
            room_type,
            template,
            position,
            difficulty,
        }
    }

    /// Graph node this room realizes.
    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    /// Assigned room type.
    pub fn room_type(&self) -> &T {
        &self.room_type
    }

    /// The template this room instantiates.
    pub fn template(&self) -> &RoomTemplate<T> {
        &self.template
    }

    /// World anchor paired with the template's `(0, 0)` cell.
    pub fn position(&self) -> Cell {
        self.position
    }

    /// Node difficulty (0 when scoring is disabled).
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Footprint in world coordinates.
    pub fn world_cells(&self) -> Vec<Cell> {
        self.template.world_cells(self.position)
    }

    /// Whether a world cell belongs to this room.
    pub fn contains(&self, cell: Cell) -> bool {
        self.template.cells().contains(&(cell - self.position))
    }

    /// Integer center of the footprint (floor of the cell average).
    pub fn center(&self) -> Cell {
        let cells = self.world_cells();
        let n = cells.len() as i32;
        let sum = cells
            .iter()
            .fold(Cell::origin(), |acc, &c| acc + c);
        Cell::new(sum.x.div_euclid(n), sum.y.div_euclid(n))
    }
}

/// A door on the boundary of a room.
///
/// The position is the exterior cell just across `edge` from an interior
/// cell of the owning room; no other room or hallway may claim that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub position: Cell,
    pub edge: Edge,
    pub room_id: i32,
    pub connects_to_room_id: i32,
}

/// The immutable result of one floor generation.
#[derive(Debug, Clone)]
pub struct FloorLayout<T: RoomKind> {
    rooms: Vec<PlacedRoom<T>>,
    doors: Vec<Door>,
    hallways: Vec<Hallway>,
    seed: i64,
    critical_path: Vec<i32>,
    spawn_room_id: i32,
    boss_room_id: i32,
    secret_passages: Vec<SecretPassage>,
    zone_assignments: BTreeMap<i32, String>,
    transition_rooms: Vec<i32>,
    clusters: BTreeMap<T, Vec<RoomCluster<T>>>,
}

impl<T: RoomKind> FloorLayout<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        rooms: Vec<PlacedRoom<T>>,
        doors: Vec<Door>,
        hallways: Vec<Hallway>,
        seed: i64,
        critical_path: Vec<i32>,
        spawn_room_id: i32,
        boss_room_id: i32,
        secret_passages: Vec<SecretPassage>,
        zone_assignments: BTreeMap<i32, String>,
        transition_rooms: Vec<i32>,
        clusters: BTreeMap<T, Vec<RoomCluster<T>>>,
    ) -> Self {
        Self {
            rooms,
            doors,
            hallways,
            seed,
            critical_path,
            spawn_room_id,
            boss_room_id,
            secret_passages,
            zone_assignments,
            transition_rooms,
            clusters,
        }
    }

    /// All rooms, sorted by node id.
    pub fn rooms(&self) -> &[PlacedRoom<T>] {
        &self.rooms
    }

    /// Room by node id.
    pub fn room(&self, node_id: i32) -> Option<&PlacedRoom<T>> {
        self.rooms.iter().find(|r| r.node_id() == node_id)
    }

    /// All doors, including hallway and secret-passage doors.
    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    /// All routed hallways.
    pub fn hallways(&self) -> &[Hallway] {
        &self.hallways
    }

    /// The master seed this layout was generated from.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Shortest spawn-to-boss node path.
    pub fn critical_path(&self) -> &[i32] {
        &self.critical_path
    }

    /// Node id of the spawn room.
    pub fn spawn_room_id(&self) -> i32 {
        self.spawn_room_id
    }

    /// Node id of the boss room.
    pub fn boss_room_id(&self) -> i32 {
        self.boss_room_id
    }

    /// Secret passages, absent from the main graph's connections.
    pub fn secret_passages(&self) -> &[SecretPassage] {
        &self.secret_passages
    }

    /// Zone membership by node id. Nodes without a matching zone are absent.
    pub fn zone_assignments(&self) -> &BTreeMap<i32, String> {
        &self.zone_assignments
    }

    /// Rooms whose graph neighborhood spans more than one zone.
    pub fn transition_rooms(&self) -> &[i32] {
        &self.transition_rooms
    }

    /// Detected clusters grouped by room type.
    pub fn clusters(&self) -> &BTreeMap<T, Vec<RoomCluster<T>>> {
        &self.clusters
    }

    /// Clusters detected for one room type.
    pub fn clusters_for_room_type(&self, room_type: &T) -> &[RoomCluster<T>] {
        self.clusters
            .get(room_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The largest cluster across all room types; size ties break toward
    /// the earlier room type, then the lower cluster id.
    pub fn largest_cluster(&self) -> Option<&RoomCluster<T>> {
        self.clusters
            .values()
            .flatten()
            .max_by(|a, b| {
                a.size()
                    .cmp(&b.size())
                    .then_with(|| b.cluster_id().cmp(&a.cluster_id()))
            })
    }

    /// Secret passages touching the given room.
    pub fn secret_passages_for_room(&self, node_id: i32) -> Vec<&SecretPassage> {
        self.secret_passages
            .iter()
            .filter(|p| p.room_a_id() == node_id || p.room_b_id() == node_id)
            .collect()
    }

    /// Difficulty of a node, if the node exists.
    pub fn difficulty(&self, node_id: i32) -> Option<f64> {
        self.room(node_id).map(|r| r.difficulty())
    }

    /// Iterates interior features in world coordinates as
    /// `(room id, world cell, feature kind)`.
    pub fn interior_features(
        &self,
    ) -> impl Iterator<Item = (i32, Cell, FeatureKind)> + '_ {
        self.rooms.iter().flat_map(|room| {
            room.template()
                .interior_features()
                .iter()
                .map(move |(&cell, &kind)| (room.node_id(), room.position() + cell, kind))
                .collect::<Vec<_>>()
        })
    }

    /// Serializable projection for CLIs and tooling.
    pub fn summary(&self) -> LayoutSummary {
        LayoutSummary {
            seed: self.seed,
            room_count: self.rooms.len(),
            spawn_room_id: self.spawn_room_id,
            boss_room_id: self.boss_room_id,
            critical_path: self.critical_path.clone(),
            rooms: self
                .rooms
                .iter()
                .map(|room| RoomSummary {
                    node_id: room.node_id(),
                    room_type: format!("{:?}", room.room_type()),
                    template_id: room.template().id().to_string(),
                    anchor: room.position(),
                    cell_count: room.template().cells().len(),
                    difficulty: room.difficulty(),
                    zone: self.zone_assignments.get(&room.node_id()).cloned(),
                })
                .collect(),
            door_count: self.doors.len(),
            hallway_count: self.hallways.len(),
            secret_passage_count: self.secret_passages.len(),
        }
    }
}

/// Serializable summary of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub node_id: i32,
    pub room_type: String,
    pub template_id: String,
    pub anchor: Cell,
    pub cell_count: usize,
    pub difficulty: f64,
    pub zone: Option<String>,
}

/// Serializable summary of a [`FloorLayout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub seed: i64,
    pub room_count: usize,
    pub spawn_room_id: i32,
    pub boss_room_id: i32,
    pub critical_path: Vec<i32>,
    pub rooms: Vec<RoomSummary>,
    pub door_count: usize,
    pub hallway_count: usize,
    pub secret_passage_count: usize,
}

/// Kinds of inter-floor links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorConnectionType {
    StairsDown,
    StairsUp,
    Teleporter,
}

/// A link between nodes on two floors of a multi-floor dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorConnection {
    pub from_floor: usize,
    pub from_node: i32,
    pub to_floor: usize,
    pub to_node: i32,
    pub connection_type: FloorConnectionType,
}

/// The result of multi-floor generation: one layout per floor config plus
/// the validated inter-floor links.
#[derive(Debug, Clone)]
pub struct MultiFloorLayout<T: RoomKind> {
    floors: Vec<FloorLayout<T>>,
    connections: Vec<FloorConnection>,
}

impl<T: RoomKind> MultiFloorLayout<T> {
    pub(crate) fn new(floors: Vec<FloorLayout<T>>, connections: Vec<FloorConnection>) -> Self {
        Self { floors, connections }
    }

    pub fn floors(&self) -> &[FloorLayout<T>] {
        &self.floors
    }

    pub fn floor(&self, index: usize) -> Option<&FloorLayout<T>> {
        self.floors.get(index)
    }

    pub fn connections(&self) -> &[FloorConnection] {
        &self.connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomType;

    fn placed(node_id: i32, anchor: Cell) -> PlacedRoom<RoomType> {
        let template = Arc::new(RoomTemplate::rectangle("t", 3, 3).unwrap());
        PlacedRoom::new(node_id, RoomType::Combat, template, anchor, 1.5)
    }

    #[test]
    fn test_world_cells_follow_anchor() {
        let room = placed(4, Cell::new(10, 20));
        let cells = room.world_cells();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&Cell::new(10, 20)));
        assert!(cells.contains(&Cell::new(12, 22)));
        assert!(room.contains(Cell::new(11, 21)));
        assert!(!room.contains(Cell::new(13, 21)));
    }

    #[test]
    fn test_room_center() {
        let room = placed(1, Cell::new(0, 0));
        assert_eq!(room.center(), Cell::new(1, 1));
    }

    #[test]
    fn test_interior_feature_world_coordinates() {
        let template = Arc::new(
            RoomTemplate::rectangle("t", 3, 3)
                .unwrap()
                .with_feature(Cell::new(1, 1), FeatureKind::Pillar)
                .unwrap(),
        );
        let room = PlacedRoom::new(0, RoomType::Combat, template, Cell::new(5, 5), 0.0);
        let layout = FloorLayout::new(
            vec![room],
            Vec::new(),
            Vec::new(),
            1,
            vec![0],
            0,
            0,
            Vec::new(),
            BTreeMap::new(),
            Vec::new(),
            BTreeMap::new(),
        );
        let features: Vec<_> = layout.interior_features().collect();
        assert_eq!(features, vec![(0, Cell::new(6, 6), FeatureKind::Pillar)]);
    }
}
