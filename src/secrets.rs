//! # Secret Passages
//!
//! Extra room-to-room connections that never appear in the main graph.
//! Candidate pairs are filtered, deterministically shuffled, and connected
//! through the same door/hallway machinery as ordinary edges.

use crate::graph::FloorGraph;
use crate::hallways::{Hallway, Router};
use crate::layout::{Door, PlacedRoom};
use crate::rooms::RoomKind;
use crate::{WarrenError, WarrenResult};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Secret-passage insertion parameters.
#[derive(Debug, Clone)]
pub struct SecretPassageConfig<T: RoomKind> {
    /// Number of passages to insert.
    pub count: usize,
    /// Maximum Manhattan distance between room centers.
    pub max_spatial_distance: i32,
    /// When set, both endpoint rooms must have one of these types.
    pub allowed_room_types: Option<Vec<T>>,
    /// Rooms of these types never host a secret passage.
    pub forbidden_room_types: Vec<T>,
    /// When false, critical-path rooms are excluded.
    pub allow_critical_path_connections: bool,
    /// When false, pairs already linked in the graph are excluded.
    pub allow_graph_connected_rooms: bool,
}

impl<T: RoomKind> SecretPassageConfig<T> {
    /// Passages between any rooms within `max_spatial_distance`, excluding
    /// pairs already connected in the graph.
    pub fn new(count: usize, max_spatial_distance: i32) -> Self {
        Self {
            count,
            max_spatial_distance,
            allowed_room_types: None,
            forbidden_room_types: Vec::new(),
            allow_critical_path_connections: true,
            allow_graph_connected_rooms: false,
        }
    }

    pub(crate) fn validate(&self) -> WarrenResult<()> {
        if self.max_spatial_distance < 0 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "secret passages: max_spatial_distance must be non-negative, got {}",
                self.max_spatial_distance
            )));
        }
        Ok(())
    }
}

/// A hidden connection between two rooms: doors on both, and a routed
/// hallway when the rooms are not door-adjacent.
#[derive(Debug, Clone)]
pub struct SecretPassage {
    id: u32,
    room_a_id: i32,
    room_b_id: i32,
    door_a: Door,
    door_b: Door,
    hallway: Option<Hallway>,
}

impl SecretPassage {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn room_a_id(&self) -> i32 {
        self.room_a_id
    }

    pub fn room_b_id(&self) -> i32 {
        self.room_b_id
    }

    pub fn door_a(&self) -> &Door {
        &self.door_a
    }

    pub fn door_b(&self) -> &Door {
        &self.door_b
    }

    /// The routed hallway, absent when the rooms share a door cell.
    pub fn hallway(&self) -> Option<&Hallway> {
        self.hallway.as_ref()
    }
}

/// Inserts up to `config.count` passages. Too few surviving candidate pairs
/// is a configuration error; surviving pairs that cannot be routed fall
/// through to the next candidate.
pub(crate) fn insert_secret_passages<T: RoomKind>(
    graph: &FloorGraph,
    rooms: &[PlacedRoom<T>],
    router: &mut Router,
    config: &SecretPassageConfig<T>,
    next_hallway_id: u32,
    rng: &mut StdRng,
) -> WarrenResult<Vec<SecretPassage>> {
    if config.count == 0 {
        return Ok(Vec::new());
    }

    let allowed = |room: &PlacedRoom<T>| -> bool {
        if let Some(allowed_types) = &config.allowed_room_types {
            if !allowed_types.contains(room.room_type()) {
                return false;
            }
        }
        if config.forbidden_room_types.contains(room.room_type()) {
            return false;
        }
        if !config.allow_critical_path_connections {
            let on_path = graph
                .node(room.node_id())
                .map(|n| n.is_on_critical_path())
                .unwrap_or(false);
            if on_path {
                return false;
            }
        }
        true
    };

    let mut candidates: Vec<(i32, i32)> = Vec::new();
    for (index, room_a) in rooms.iter().enumerate() {
        if !allowed(room_a) {
            continue;
        }
        for room_b in &rooms[index + 1..] {
            if !allowed(room_b) {
                continue;
            }
            if room_a.center().manhattan_distance(room_b.center())
                > config.max_spatial_distance
            {
                continue;
            }
            if !config.allow_graph_connected_rooms
                && graph.are_connected(room_a.node_id(), room_b.node_id())
            {
                continue;
            }
            candidates.push((room_a.node_id(), room_b.node_id()));
        }
    }

    if candidates.len() < config.count {
        return Err(WarrenError::InvalidConfiguration(format!(
            "secret passages: only {} candidate pairs survive the filters, {} requested",
            candidates.len(),
            config.count
        )));
    }

    candidates.sort_unstable();
    candidates.shuffle(rng);

    let mut passages = Vec::new();
    let mut hallway_id = next_hallway_id;
    for (a, b) in candidates {
        if passages.len() == config.count {
            break;
        }
        if let Some((door_a, door_b)) = router.shared_door(a, b) {
            router.claim_door(door_a);
            passages.push(SecretPassage {
                id: passages.len() as u32,
                room_a_id: a,
                room_b_id: b,
                door_a,
                door_b,
                hallway: None,
            });
            continue;
        }
        match router.route_edge(a, b, hallway_id) {
            Ok(hallway) => {
                hallway_id += 1;
                passages.push(SecretPassage {
                    id: passages.len() as u32,
                    room_a_id: a,
                    room_b_id: b,
                    door_a: hallway.door_a,
                    door_b: hallway.door_b,
                    hallway: Some(hallway),
                });
            }
            Err(_) => {
                debug!("secret passages: pair ({a}, {b}) unroutable, trying next");
            }
        }
    }

    if passages.len() < config.count {
        return Err(WarrenError::SpatialPlacement(format!(
            "secret passages: routed only {} of {} requested passages",
            passages.len(),
            config.count
        )));
    }
    Ok(passages)
}
