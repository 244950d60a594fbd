//! # Spatial Placement
//!
//! Anchors every room on the integer lattice. Rooms are placed in BFS order
//! from the spawn outward; each room is anchored so that one of its door
//! sites faces a door site of its graph parent across a small gap, which
//! keeps every tree edge connectable by a shared door or a short hallway.
//!
//! Candidate anchors are shuffled by the placement stream after a canonical
//! sort, so placement is deterministic. When a room cannot be placed the
//! placer backtracks through the parent's choices; a bounded step budget
//! turns pathological configs into a `SpatialPlacement` error.

use crate::config::HallwayMode;
use crate::constraints::{Constraint, SpatialCtx};
use crate::graph::FloorGraph;
use crate::grid::{BoundingBox, Cell};
use crate::layout::PlacedRoom;
use crate::rooms::RoomKind;
use crate::template::RoomTemplate;
use crate::{WarrenError, WarrenResult};
use log::debug;
use pathfinding::prelude::bfs;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// Candidate evaluations allowed per placement attempt.
pub const MAX_PLACEMENT_STEPS: usize = 20_000;

/// Margin around a pending link used for the free-cell reachability check.
const LINK_CHECK_MARGIN: i32 = 6;

/// Room gaps tried per mode. `AsNeeded` prefers shared-door adjacency
/// (gap 1); `Always` forces a hallway by keeping rooms apart.
const GAPS_AS_NEEDED: [i32; 3] = [1, 2, 3];
const GAPS_ALWAYS: [i32; 2] = [2, 3];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    anchor: Cell,
    door_parent: Cell,
    door_child: Cell,
}

/// Anchors every assigned node. Returns rooms sorted by node id.
#[allow(clippy::too_many_arguments)]
pub(crate) fn place_rooms<T: RoomKind>(
    graph: &FloorGraph,
    assignments: &BTreeMap<i32, T>,
    templates: &BTreeMap<i32, Arc<RoomTemplate<T>>>,
    constraints: &[Constraint<T>],
    zone_assignments: &BTreeMap<i32, String>,
    spawn_node: i32,
    hallway_mode: HallwayMode,
    floor_index: usize,
    rng: &mut StdRng,
) -> WarrenResult<Vec<PlacedRoom<T>>> {
    let (order, parents) = bfs_order(graph, spawn_node);
    let mut placer = Placer {
        graph,
        assignments,
        templates,
        constraints,
        zone_assignments,
        spawn_node,
        floor_index,
        gaps: match hallway_mode {
            HallwayMode::AsNeeded => &GAPS_AS_NEEDED[..],
            HallwayMode::Always => &GAPS_ALWAYS[..],
        },
        order,
        parents,
        occupied: HashMap::new(),
        reserved: HashMap::new(),
        placed: Vec::new(),
        steps: 0,
    };

    if !placer.place(0, rng)? {
        return Err(WarrenError::SpatialPlacement(format!(
            "spatial placer: no overlap-free arrangement found \
             ({} of at most {MAX_PLACEMENT_STEPS} candidate evaluations used)",
            placer.steps
        )));
    }

    let mut rooms = placer.placed;
    rooms.sort_by_key(|r| r.node_id());
    debug!("spatial placer: anchored {} rooms", rooms.len());
    Ok(rooms)
}

/// BFS visit order from the spawn node, neighbors ascending, plus each
/// node's BFS parent.
fn bfs_order(graph: &FloorGraph, spawn_node: i32) -> (Vec<i32>, HashMap<i32, i32>) {
    let mut order = Vec::with_capacity(graph.node_count());
    let mut parents = HashMap::new();
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    visited[spawn_node as usize] = true;
    queue.push_back(spawn_node);
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for neighbor in graph.neighbors(current) {
            if !visited[neighbor as usize] {
                visited[neighbor as usize] = true;
                parents.insert(neighbor, current);
                queue.push_back(neighbor);
            }
        }
    }
    (order, parents)
}

struct Placer<'a, T: RoomKind> {
    graph: &'a FloorGraph,
    assignments: &'a BTreeMap<i32, T>,
    templates: &'a BTreeMap<i32, Arc<RoomTemplate<T>>>,
    constraints: &'a [Constraint<T>],
    zone_assignments: &'a BTreeMap<i32, String>,
    spawn_node: i32,
    floor_index: usize,
    gaps: &'a [i32],
    order: Vec<i32>,
    parents: HashMap<i32, i32>,
    occupied: HashMap<Cell, i32>,
    reserved: HashMap<Cell, i32>,
    placed: Vec<PlacedRoom<T>>,
    steps: usize,
}

impl<'a, T: RoomKind> Placer<'a, T> {
    fn place(&mut self, index: usize, rng: &mut StdRng) -> WarrenResult<bool> {
        if index == self.order.len() {
            return Ok(true);
        }
        let node = self.order[index];
        let template = Arc::clone(
            self.templates
                .get(&node)
                .expect("selector produced a template for every node"),
        );

        let candidates = if index == 0 {
            vec![Candidate {
                anchor: Cell::origin(),
                door_parent: Cell::origin(),
                door_child: Cell::origin(),
            }]
        } else {
            let mut candidates = self.candidates_for(node, &template);
            candidates.shuffle(rng);
            candidates
        };

        for candidate in candidates {
            self.steps += 1;
            if self.steps > MAX_PLACEMENT_STEPS {
                return Err(WarrenError::SpatialPlacement(format!(
                    "spatial placer: exceeded the {MAX_PLACEMENT_STEPS}-step budget \
                     while placing node {node}"
                )));
            }
            if index > 0 && !self.candidate_fits(node, &template, &candidate) {
                continue;
            }
            if !self.satisfies_spatial_constraints(node, &template, candidate.anchor) {
                continue;
            }

            self.commit(node, &template, &candidate);
            if self.place(index + 1, rng)? {
                return Ok(true);
            }
            self.rollback(node, &template, &candidate);
        }
        Ok(false)
    }

    /// Anchors that put one of the room's door sites across a gap from one
    /// of the parent's door sites, canonically sorted.
    fn candidates_for(&self, node: i32, template: &RoomTemplate<T>) -> Vec<Candidate> {
        let parent = self.parents[&node];
        let parent_room = self
            .placed
            .iter()
            .find(|r| r.node_id() == parent)
            .expect("parent precedes child in BFS order");
        let parent_anchor = parent_room.position();
        let parent_sites = parent_room.template().door_sites();
        let child_sites = template.door_sites();

        let mut candidates = Vec::new();
        for &gap in self.gaps {
            for &(parent_cell, direction) in &parent_sites {
                let parent_world = parent_anchor + parent_cell;
                let facing = direction.opposite();
                for &(child_cell, child_direction) in &child_sites {
                    if child_direction != facing {
                        continue;
                    }
                    let mut step = direction.delta();
                    step.x *= gap + 1;
                    step.y *= gap + 1;
                    let child_world = parent_world + step;
                    let anchor = child_world - child_cell;
                    candidates.push(Candidate {
                        anchor,
                        door_parent: parent_world + direction.delta(),
                        door_child: child_world + facing.delta(),
                    });
                }
            }
        }
        candidates.sort();
        candidates.dedup();
        candidates
    }

    fn candidate_fits(
        &self,
        node: i32,
        template: &RoomTemplate<T>,
        candidate: &Candidate,
    ) -> bool {
        let cells = template.world_cells(candidate.anchor);
        if cells
            .iter()
            .any(|c| self.occupied.contains_key(c) || self.reserved.contains_key(c))
        {
            return false;
        }
        for door in [candidate.door_parent, candidate.door_child] {
            if self.occupied.contains_key(&door) {
                return false;
            }
            if self.reserved.get(&door).map(|&n| n != node).unwrap_or(false) {
                return false;
            }
        }
        if candidate.door_parent != candidate.door_child {
            // The future hallway must be routable between the two planned
            // door cells through currently free cells.
            if !self.link_reachable(candidate.door_parent, candidate.door_child, &cells) {
                return false;
            }
        }
        true
    }

    fn link_reachable(&self, from: Cell, to: Cell, pending_cells: &[Cell]) -> bool {
        let bounds = BoundingBox::of([from, to])
            .expect("two cells always have a bounding box")
            .inflated(LINK_CHECK_MARGIN);
        let free = |cell: Cell| {
            !self.occupied.contains_key(&cell)
                && !self.reserved.contains_key(&cell)
                && !pending_cells.contains(&cell)
        };
        bfs(
            &from,
            |&cell: &Cell| {
                cell.neighbors()
                    .into_iter()
                    .filter(|&c| bounds.contains(c) && (c == to || free(c)))
                    .collect::<Vec<_>>()
            },
            |&cell| cell == to,
        )
        .is_some()
    }

    fn satisfies_spatial_constraints(
        &self,
        node: i32,
        template: &RoomTemplate<T>,
        anchor: Cell,
    ) -> bool {
        let room_type = &self.assignments[&node];
        let ctx = SpatialCtx {
            node_id: node,
            anchor,
            template,
            placed: &self.placed,
            spawn_node_id: self.spawn_node,
            graph: self.graph,
            assignments: self.assignments,
            zone_assignments: self.zone_assignments,
            floor_index: self.floor_index,
        };
        self.constraints
            .iter()
            .filter(|c| c.room_type() == room_type && c.is_spatial())
            .all(|c| c.is_valid_spatially(&ctx))
    }

    fn commit(&mut self, node: i32, template: &Arc<RoomTemplate<T>>, candidate: &Candidate) {
        for cell in template.world_cells(candidate.anchor) {
            self.occupied.insert(cell, node);
        }
        // The spawn's candidate carries dummy door cells; only real links
        // reserve their planned doors.
        if node != self.spawn_node {
            self.reserved.insert(candidate.door_parent, node);
            self.reserved.insert(candidate.door_child, node);
        }
        let difficulty = self
            .graph
            .node(node)
            .map(|n| n.difficulty())
            .unwrap_or(0.0);
        self.placed.push(PlacedRoom::new(
            node,
            self.assignments[&node].clone(),
            Arc::clone(template),
            candidate.anchor,
            difficulty,
        ));
    }

    fn rollback(&mut self, node: i32, template: &Arc<RoomTemplate<T>>, candidate: &Candidate) {
        for cell in template.world_cells(candidate.anchor) {
            self.occupied.remove(&cell);
        }
        for door in [candidate.door_parent, candidate.door_child] {
            if self.reserved.get(&door) == Some(&node) {
                self.reserved.remove(&door);
            }
        }
        self.placed.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintKind;
    use crate::graph::analysis::analyze;
    use crate::rooms::RoomType;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn path_graph(n: i32) -> FloorGraph {
        let mut g = FloorGraph::new(n);
        for i in 1..n {
            g.add_connection(i - 1, i);
        }
        analyze(&mut g).unwrap();
        g
    }

    fn simple_inputs(
        n: i32,
    ) -> (
        FloorGraph,
        BTreeMap<i32, RoomType>,
        BTreeMap<i32, Arc<RoomTemplate<RoomType>>>,
    ) {
        let graph = path_graph(n);
        let template = Arc::new(
            RoomTemplate::rectangle("t", 3, 3)
                .unwrap()
                .for_room_types([RoomType::Combat]),
        );
        let assignments: BTreeMap<i32, RoomType> =
            (0..n).map(|i| (i, RoomType::Combat)).collect();
        let templates: BTreeMap<i32, Arc<RoomTemplate<RoomType>>> =
            (0..n).map(|i| (i, Arc::clone(&template))).collect();
        (graph, assignments, templates)
    }

    fn place(
        graph: &FloorGraph,
        assignments: &BTreeMap<i32, RoomType>,
        templates: &BTreeMap<i32, Arc<RoomTemplate<RoomType>>>,
        constraints: &[Constraint<RoomType>],
        mode: HallwayMode,
        seed: u64,
    ) -> WarrenResult<Vec<PlacedRoom<RoomType>>> {
        let zones = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(seed);
        place_rooms(
            graph,
            assignments,
            templates,
            constraints,
            &zones,
            0,
            mode,
            0,
            &mut rng,
        )
    }

    fn assert_disjoint(rooms: &[PlacedRoom<RoomType>]) {
        let mut seen: HashSet<Cell> = HashSet::new();
        for room in rooms {
            for cell in room.world_cells() {
                assert!(seen.insert(cell), "cell {cell} occupied twice");
            }
        }
    }

    #[test]
    fn test_rooms_do_not_overlap() {
        let (graph, assignments, templates) = simple_inputs(8);
        let rooms = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::AsNeeded,
            7,
        )
        .unwrap();
        assert_eq!(rooms.len(), 8);
        assert_disjoint(&rooms);
    }

    #[test]
    fn test_spawn_is_anchored_at_origin() {
        let (graph, assignments, templates) = simple_inputs(4);
        let rooms = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::AsNeeded,
            1,
        )
        .unwrap();
        assert_eq!(rooms[0].node_id(), 0);
        assert_eq!(rooms[0].position(), Cell::origin());
    }

    #[test]
    fn test_always_mode_keeps_rooms_apart() {
        let (graph, assignments, templates) = simple_inputs(5);
        let rooms = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::Always,
            3,
        )
        .unwrap();
        // With gaps of at least 2, connected rooms never touch; only the
        // chain pairs are guaranteed by the placer.
        for pair in (0..4).map(|i| (i, i + 1)) {
            let a = rooms.iter().find(|r| r.node_id() == pair.0).unwrap();
            let b = rooms.iter().find(|r| r.node_id() == pair.1).unwrap();
            let min = crate::grid::set_distance(&a.world_cells(), &b.world_cells());
            assert!(
                min >= 2,
                "connected rooms {} and {} touch",
                a.node_id(),
                b.node_id()
            );
        }
    }

    #[test]
    fn test_determinism() {
        let (graph, assignments, templates) = simple_inputs(10);
        let a = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::AsNeeded,
            42,
        )
        .unwrap();
        let b = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::AsNeeded,
            42,
        )
        .unwrap();
        let anchors = |rooms: &[PlacedRoom<RoomType>]| {
            rooms
                .iter()
                .map(|r| (r.node_id(), r.position()))
                .collect::<Vec<_>>()
        };
        assert_eq!(anchors(&a), anchors(&b));
    }

    #[test]
    fn test_region_constraint_is_honored() {
        let (graph, assignments, templates) = simple_inputs(6);
        let constraints = vec![Constraint::new(
            RoomType::Combat,
            ConstraintKind::MustBeInRegion {
                min_x: -40,
                max_x: 40,
                min_y: -40,
                max_y: 40,
            },
        )
        .unwrap()];
        let rooms = place(
            &graph,
            &assignments,
            &templates,
            &constraints,
            HallwayMode::AsNeeded,
            5,
        )
        .unwrap();
        for room in &rooms {
            for cell in room.world_cells() {
                assert!(cell.x.abs() <= 40 && cell.y.abs() <= 40);
            }
        }
    }

    #[test]
    fn test_impossible_region_fails() {
        let (graph, assignments, templates) = simple_inputs(6);
        // A 3x3 region cannot hold six 3x3 rooms.
        let constraints = vec![Constraint::new(
            RoomType::Combat,
            ConstraintKind::MustBeInRegion {
                min_x: 0,
                max_x: 2,
                min_y: 0,
                max_y: 2,
            },
        )
        .unwrap()];
        let err = place(
            &graph,
            &assignments,
            &templates,
            &constraints,
            HallwayMode::AsNeeded,
            5,
        )
        .unwrap_err();
        assert!(matches!(err, WarrenError::SpatialPlacement(_)));
    }

    #[test]
    fn test_branching_graph_places() {
        // Star graph stresses sibling placement around one parent.
        let mut graph = FloorGraph::new(6);
        for i in 1..6 {
            graph.add_connection(0, i);
        }
        analyze(&mut graph).unwrap();
        let template = Arc::new(
            RoomTemplate::rectangle("t", 3, 3)
                .unwrap()
                .for_room_types([RoomType::Combat]),
        );
        let assignments: BTreeMap<i32, RoomType> =
            (0..6).map(|i| (i, RoomType::Combat)).collect();
        let templates: BTreeMap<i32, _> = (0..6).map(|i| (i, Arc::clone(&template))).collect();
        let rooms = place(
            &graph,
            &assignments,
            &templates,
            &[],
            HallwayMode::AsNeeded,
            11,
        )
        .unwrap();
        assert_eq!(rooms.len(), 6);
        assert_disjoint(&rooms);
    }
}
