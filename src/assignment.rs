//! # Constraint-Satisfaction Room Assignment
//!
//! Depth-first backtracking over typed assignment tasks: spawn first, boss
//! second, then every requirement ordered most-constrained-first. Remaining
//! nodes take the default type, after which the whole assignment is
//! re-validated strictly; a failure there backtracks like any other.
//!
//! The search is deterministic: candidate lists are pure functions of the
//! graph, the constraints, and the partial assignment, and are consumed in
//! sorted order.

use crate::config::FloorConfig;
use crate::constraints::{EvalMode, GraphCtx};
use crate::graph::FloorGraph;
use crate::rooms::RoomKind;
use crate::{WarrenError, WarrenResult};
use log::debug;
use std::collections::BTreeMap;

/// Backtracking step budget; exceeding it means the configuration is
/// infeasible in practice even if a solution theoretically exists.
pub const MAX_SEARCH_STEPS: usize = 50_000;

/// Result of the assignment stage.
#[derive(Debug)]
pub(crate) struct AssignmentOutcome<T: RoomKind> {
    pub assignments: BTreeMap<i32, T>,
    pub spawn_node: i32,
    pub boss_node: i32,
}

#[derive(Debug, Clone)]
struct Task<T: RoomKind> {
    room_type: T,
    zone: Option<String>,
    candidates: Vec<i32>,
}

/// Assigns a room type to every node, honoring requirements, pinning, and
/// every graph constraint.
pub(crate) fn assign_room_types<T: RoomKind>(
    graph: &FloorGraph,
    config: &FloorConfig<T>,
    zone_assignments: &BTreeMap<i32, String>,
    floor_index: usize,
) -> WarrenResult<AssignmentOutcome<T>> {
    let solver = Solver {
        graph,
        config,
        zone_assignments,
        floor_index,
    };
    solver.run()
}

struct Solver<'a, T: RoomKind> {
    graph: &'a FloorGraph,
    config: &'a FloorConfig<T>,
    zone_assignments: &'a BTreeMap<i32, String>,
    floor_index: usize,
}

impl<'a, T: RoomKind> Solver<'a, T> {
    fn run(&self) -> WarrenResult<AssignmentOutcome<T>> {
        let tasks = self.build_tasks()?;
        let mut assignments: BTreeMap<i32, T> = BTreeMap::new();
        let mut steps = 0usize;

        if !self.search(&tasks, 0, &mut assignments, &mut steps)? {
            return Err(WarrenError::InvalidConfiguration(format!(
                "constraint solver: no assignment satisfies all constraints \
                 ({steps} of at most {MAX_SEARCH_STEPS} steps used)"
            )));
        }

        let spawn_node = self.node_of(&assignments, &self.config.spawn_room_type);
        let boss_node = self.node_of(&assignments, &self.config.boss_room_type);
        debug!(
            "constraint solver: solved in {steps} steps, spawn {spawn_node}, boss {boss_node}"
        );
        Ok(AssignmentOutcome {
            assignments,
            spawn_node,
            boss_node,
        })
    }

    fn node_of(&self, assignments: &BTreeMap<i32, T>, room_type: &T) -> i32 {
        assignments
            .iter()
            .find(|(_, t)| *t == room_type)
            .map(|(&id, _)| id)
            .expect("pinned type was assigned by the search")
    }

    fn passes(
        &self,
        node_id: i32,
        room_type: &T,
        assignments: &BTreeMap<i32, T>,
        mode: EvalMode,
    ) -> bool {
        let ctx = GraphCtx {
            node_id,
            graph: self.graph,
            assignments,
            zone_assignments: self.zone_assignments,
            floor_index: self.floor_index,
        };
        self.config
            .constraints
            .iter()
            .filter(|c| c.room_type() == room_type)
            .all(|c| c.is_valid(&ctx, mode))
    }

    /// Nodes passing every constraint for `room_type` against an empty
    /// assignment, restricted to `zone` when given.
    fn feasible_set(&self, room_type: &T, zone: Option<&String>) -> Vec<i32> {
        let empty = BTreeMap::new();
        (0..self.graph.node_count() as i32)
            .filter(|&id| match zone {
                Some(zone_id) => self.zone_assignments.get(&id) == Some(zone_id),
                None => true,
            })
            .filter(|&id| self.passes(id, room_type, &empty, EvalMode::Partial))
            .collect()
    }

    fn build_tasks(&self) -> WarrenResult<Vec<Task<T>>> {
        let spawn_type = &self.config.spawn_room_type;
        let boss_type = &self.config.boss_room_type;

        // Requirements naming the pinned types fold into the pinned task;
        // more than one room of a pinned type can never exist.
        let mut spawn_zone: Option<String> = None;
        let mut boss_zone: Option<String> = None;
        let mut required: Vec<(T, usize, Option<String>)> = Vec::new();

        for zone in &self.config.zones {
            for (room_type, count) in zone.room_requirements() {
                if room_type == spawn_type || room_type == boss_type {
                    if *count > 1 {
                        return Err(WarrenError::InvalidConfiguration(format!(
                            "constraint solver: requirement asks for {count} rooms of \
                             pinned type {room_type:?}, but exactly one exists"
                        )));
                    }
                    if *count == 1 {
                        if room_type == spawn_type {
                            spawn_zone = Some(zone.id().to_string());
                        } else {
                            boss_zone = Some(zone.id().to_string());
                        }
                    }
                } else if *count > 0 {
                    required.push((room_type.clone(), *count, Some(zone.id().to_string())));
                }
            }
        }
        for (room_type, count) in &self.config.room_requirements {
            if room_type == spawn_type || room_type == boss_type {
                if *count > 1 {
                    return Err(WarrenError::InvalidConfiguration(format!(
                        "constraint solver: requirement asks for {count} rooms of \
                         pinned type {room_type:?}, but exactly one exists"
                    )));
                }
                continue;
            }
            // Zone tasks of the same type already count toward the global
            // minimum.
            let zone_covered: usize = required
                .iter()
                .filter(|(t, _, z)| t == room_type && z.is_some())
                .map(|(_, c, _)| c)
                .sum();
            let remaining = count.saturating_sub(zone_covered);
            if remaining > 0 {
                required.push((room_type.clone(), remaining, None));
            }
        }

        // Spawn: node 0 first, then the rest of its feasible set.
        let mut spawn_candidates = self.feasible_set(spawn_type, spawn_zone.as_ref());
        if let Some(position) = spawn_candidates.iter().position(|&id| id == 0) {
            spawn_candidates.remove(position);
            spawn_candidates.insert(0, 0);
        }

        // Boss: farthest node first, ties by lowest id.
        let mut boss_candidates = self.feasible_set(boss_type, boss_zone.as_ref());
        boss_candidates.sort_by_key(|&id| {
            let distance = self
                .graph
                .node(id)
                .map(|n| n.distance_from_start())
                .unwrap_or(0);
            (-distance, id)
        });

        let mut tasks = vec![
            Task {
                room_type: spawn_type.clone(),
                zone: spawn_zone,
                candidates: spawn_candidates,
            },
            Task {
                room_type: boss_type.clone(),
                zone: boss_zone,
                candidates: boss_candidates,
            },
        ];

        // Requirement tasks, most constrained first.
        let mut requirement_tasks: Vec<Task<T>> = Vec::new();
        for (room_type, count, zone) in required {
            let candidates = self.feasible_set(&room_type, zone.as_ref());
            for _ in 0..count {
                requirement_tasks.push(Task {
                    room_type: room_type.clone(),
                    zone: zone.clone(),
                    candidates: candidates.clone(),
                });
            }
        }
        requirement_tasks.sort_by_key(|t| t.candidates.len());
        tasks.extend(requirement_tasks);
        Ok(tasks)
    }

    fn search(
        &self,
        tasks: &[Task<T>],
        index: usize,
        assignments: &mut BTreeMap<i32, T>,
        steps: &mut usize,
    ) -> WarrenResult<bool> {
        if index == tasks.len() {
            return self.finish(assignments, steps);
        }
        let task = &tasks[index];
        for &candidate in &task.candidates {
            if assignments.contains_key(&candidate) {
                continue;
            }
            *steps += 1;
            if *steps > MAX_SEARCH_STEPS {
                return Err(WarrenError::InvalidConfiguration(format!(
                    "constraint solver: exceeded the {MAX_SEARCH_STEPS}-step search cap; \
                     the configuration is infeasible or nearly so"
                )));
            }
            if !self.passes(candidate, &task.room_type, assignments, EvalMode::Partial) {
                continue;
            }
            assignments.insert(candidate, task.room_type.clone());
            if self.search(tasks, index + 1, assignments, steps)? {
                return Ok(true);
            }
            assignments.remove(&candidate);
        }
        Ok(false)
    }

    /// Fills the remaining nodes with the default type and validates the
    /// completed assignment strictly.
    fn finish(
        &self,
        assignments: &mut BTreeMap<i32, T>,
        steps: &mut usize,
    ) -> WarrenResult<bool> {
        *steps += 1;
        if *steps > MAX_SEARCH_STEPS {
            return Err(WarrenError::InvalidConfiguration(format!(
                "constraint solver: exceeded the {MAX_SEARCH_STEPS}-step search cap; \
                 the configuration is infeasible or nearly so"
            )));
        }
        let defaults: Vec<i32> = (0..self.graph.node_count() as i32)
            .filter(|id| !assignments.contains_key(id))
            .collect();
        for &id in &defaults {
            assignments.insert(id, self.config.default_room_type.clone());
        }

        let valid = assignments.iter().all(|(&node_id, room_type)| {
            self.passes(node_id, room_type, assignments, EvalMode::Final)
        });
        if valid {
            return Ok(true);
        }
        for id in defaults {
            assignments.remove(&id);
        }
        Ok(false)
    }
}
