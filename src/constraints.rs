//! # Constraint DSL
//!
//! Constraints are pure predicates attached to a target room type. The
//! solver evaluates the graph family while assigning types; the spatial
//! family is additionally consulted by the placer once a candidate anchor
//! and template are known.
//!
//! During search a constraint may be undecidable (its reference types not
//! assigned yet). Evaluation therefore distinguishes a partial mode, where a
//! constraint fails only if it can no longer become true, from the strict
//! final mode used to validate the completed assignment.

use crate::graph::FloorGraph;
use crate::grid::{set_distance, BoundingBox, Cell};
use crate::layout::PlacedRoom;
use crate::rooms::RoomKind;
use crate::template::RoomTemplate;
use crate::{WarrenError, WarrenResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default center threshold for quadrant constraints, as a fraction of each
/// bounding-box axis.
pub const DEFAULT_CENTER_THRESHOLD: f64 = 0.15;

/// Regions of the occupied bounding box for [`ConstraintKind::MustBeInQuadrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Logical combinator for composite constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeOp {
    And,
    Or,
}

/// User-supplied predicate over `(candidate node, graph, assignments)`.
#[derive(Clone)]
pub struct CustomPredicate<T: RoomKind>(
    Arc<dyn Fn(i32, &FloorGraph, &BTreeMap<i32, T>) -> bool + Send + Sync>,
);

impl<T: RoomKind> CustomPredicate<T> {
    pub fn new(
        predicate: impl Fn(i32, &FloorGraph, &BTreeMap<i32, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(predicate))
    }

    fn call(&self, node_id: i32, graph: &FloorGraph, assignments: &BTreeMap<i32, T>) -> bool {
        (self.0)(node_id, graph, assignments)
    }
}

impl<T: RoomKind> fmt::Debug for CustomPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

/// The recognized constraint variants. See the crate docs for the validity
/// rule of each.
#[derive(Debug, Clone)]
pub enum ConstraintKind<T: RoomKind> {
    MinDistanceFromStart(i32),
    MaxDistanceFromStart(i32),
    MinDistanceFromRoomType { room_types: Vec<T>, distance: i32 },
    MaxDistanceFromRoomType { room_types: Vec<T>, distance: i32 },
    NotOnCriticalPath,
    OnlyOnCriticalPath,
    MustBeDeadEnd,
    MinConnectionCount(usize),
    MaxConnectionCount(usize),
    MaxPerFloor(usize),
    OnlyOnFloor(Vec<usize>),
    NotOnFloor(Vec<usize>),
    MinFloor(usize),
    MaxFloor(usize),
    MustBeAdjacentTo(Vec<T>),
    MustNotBeAdjacentTo(Vec<T>),
    MustComeBefore(Vec<T>),
    OnlyInZone(String),
    MinDifficulty(f64),
    MaxDifficulty(f64),
    MustBeInQuadrant {
        quadrants: Vec<Quadrant>,
        center_threshold: f64,
    },
    MustBeInRegion {
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
    },
    MinSpatialDistanceFromRoomType { room_types: Vec<T>, distance: i32 },
    MaxSpatialDistanceFromRoomType { room_types: Vec<T>, distance: i32 },
    MinSpatialDistanceFromStart(i32),
    MaxSpatialDistanceFromStart(i32),
    MustFormSpatialCluster { radius: i32, min_size: usize },
    Composite {
        op: CompositeOp,
        children: Vec<ConstraintKind<T>>,
    },
    Custom(CustomPredicate<T>),
}

impl<T: RoomKind> ConstraintKind<T> {
    /// Quadrant constraint with the default 15% center threshold.
    pub fn quadrant(quadrants: impl IntoIterator<Item = Quadrant>) -> Self {
        ConstraintKind::MustBeInQuadrant {
            quadrants: quadrants.into_iter().collect(),
            center_threshold: DEFAULT_CENTER_THRESHOLD,
        }
    }

    /// True when the kind (or any composite child) needs placement geometry.
    pub fn is_spatial(&self) -> bool {
        match self {
            ConstraintKind::MustBeInQuadrant { .. }
            | ConstraintKind::MustBeInRegion { .. }
            | ConstraintKind::MinSpatialDistanceFromRoomType { .. }
            | ConstraintKind::MaxSpatialDistanceFromRoomType { .. }
            | ConstraintKind::MinSpatialDistanceFromStart(_)
            | ConstraintKind::MaxSpatialDistanceFromStart(_)
            | ConstraintKind::MustFormSpatialCluster { .. } => true,
            ConstraintKind::Composite { children, .. } => {
                children.iter().any(|c| c.is_spatial())
            }
            _ => false,
        }
    }

    fn validate(&self) -> WarrenResult<()> {
        match self {
            ConstraintKind::MustNotBeAdjacentTo(types) if types.is_empty() => {
                Err(WarrenError::InvalidConfiguration(
                    "constraint: MustNotBeAdjacentTo requires a non-empty room-type set"
                        .to_string(),
                ))
            }
            ConstraintKind::Composite { children, .. } => {
                children.iter().try_for_each(|c| c.validate())
            }
            _ => Ok(()),
        }
    }
}

/// A constraint bound to the room type it applies to. It is only evaluated
/// when the solver proposes that type for a candidate node.
#[derive(Debug, Clone)]
pub struct Constraint<T: RoomKind> {
    room_type: T,
    kind: ConstraintKind<T>,
}

impl<T: RoomKind> Constraint<T> {
    /// Creates a constraint, rejecting statically malformed kinds.
    pub fn new(room_type: T, kind: ConstraintKind<T>) -> WarrenResult<Self> {
        kind.validate()?;
        Ok(Self { room_type, kind })
    }

    /// The room type this constraint targets.
    pub fn room_type(&self) -> &T {
        &self.room_type
    }

    /// The constraint body.
    pub fn kind(&self) -> &ConstraintKind<T> {
        &self.kind
    }

    /// Whether the placer must also consult this constraint.
    pub fn is_spatial(&self) -> bool {
        self.kind.is_spatial()
    }

    /// Evaluates the graph family for a candidate node.
    pub fn is_valid(&self, ctx: &GraphCtx<'_, T>, mode: EvalMode) -> bool {
        eval_graph(&self.kind, &self.room_type, ctx, mode)
    }

    /// Evaluates the spatial family for a proposed placement.
    pub fn is_valid_spatially(&self, ctx: &SpatialCtx<'_, T>) -> bool {
        eval_spatial(&self.kind, &self.room_type, ctx)
    }
}

/// Evaluation strictness for graph constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// During search: fail only when the constraint can no longer hold.
    Partial,
    /// After defaults are assigned: every rule is strict.
    Final,
}

/// Inputs for graph-phase evaluation.
pub struct GraphCtx<'a, T: RoomKind> {
    pub node_id: i32,
    pub graph: &'a FloorGraph,
    pub assignments: &'a BTreeMap<i32, T>,
    pub zone_assignments: &'a BTreeMap<i32, String>,
    pub floor_index: usize,
}

/// Inputs for spatial-phase evaluation of one proposed placement.
pub struct SpatialCtx<'a, T: RoomKind> {
    pub node_id: i32,
    pub anchor: Cell,
    pub template: &'a RoomTemplate<T>,
    pub placed: &'a [PlacedRoom<T>],
    pub spawn_node_id: i32,
    pub graph: &'a FloorGraph,
    pub assignments: &'a BTreeMap<i32, T>,
    pub zone_assignments: &'a BTreeMap<i32, String>,
    pub floor_index: usize,
}

impl<'a, T: RoomKind> SpatialCtx<'a, T> {
    fn graph_ctx(&self) -> GraphCtx<'a, T> {
        GraphCtx {
            node_id: self.node_id,
            graph: self.graph,
            assignments: self.assignments,
            zone_assignments: self.zone_assignments,
            floor_index: self.floor_index,
        }
    }

    fn candidate_cells(&self) -> Vec<Cell> {
        self.template.world_cells(self.anchor)
    }
}

fn assigned_nodes_of<'a, T: RoomKind>(
    assignments: &'a BTreeMap<i32, T>,
    types: &'a [T],
) -> impl Iterator<Item = i32> + 'a {
    assignments
        .iter()
        .filter(move |(_, t)| types.contains(t))
        .map(|(&id, _)| id)
}

fn eval_graph<T: RoomKind>(
    kind: &ConstraintKind<T>,
    target: &T,
    ctx: &GraphCtx<'_, T>,
    mode: EvalMode,
) -> bool {
    let node = match ctx.graph.node(ctx.node_id) {
        Some(node) => node,
        None => return false,
    };
    match kind {
        ConstraintKind::MinDistanceFromStart(d) => node.distance_from_start() >= *d,
        ConstraintKind::MaxDistanceFromStart(d) => node.distance_from_start() <= *d,
        ConstraintKind::MinDistanceFromRoomType { room_types, distance } => {
            match nearest_assigned_distance(ctx, room_types) {
                Some(nearest) => nearest >= *distance,
                None => true,
            }
        }
        ConstraintKind::MaxDistanceFromRoomType { room_types, distance } => {
            match nearest_assigned_distance(ctx, room_types) {
                Some(nearest) => nearest <= *distance,
                None => true,
            }
        }
        ConstraintKind::NotOnCriticalPath => !node.is_on_critical_path(),
        ConstraintKind::OnlyOnCriticalPath => node.is_on_critical_path(),
        ConstraintKind::MustBeDeadEnd => node.connection_count() == 1,
        ConstraintKind::MinConnectionCount(k) => node.connection_count() >= *k,
        ConstraintKind::MaxConnectionCount(k) => node.connection_count() <= *k,
        ConstraintKind::MaxPerFloor(k) => {
            let assigned = ctx.assignments.values().filter(|t| *t == target).count();
            // The candidate itself is not in the map yet during search.
            match mode {
                EvalMode::Partial => assigned < *k,
                EvalMode::Final => assigned <= *k,
            }
        }
        ConstraintKind::OnlyOnFloor(floors) => floors.contains(&ctx.floor_index),
        ConstraintKind::NotOnFloor(floors) => !floors.contains(&ctx.floor_index),
        ConstraintKind::MinFloor(f) => ctx.floor_index >= *f,
        ConstraintKind::MaxFloor(f) => ctx.floor_index <= *f,
        ConstraintKind::MustBeAdjacentTo(types) => {
            let neighbors = ctx.graph.neighbors(ctx.node_id);
            if neighbors.is_empty() {
                return false;
            }
            let satisfied = neighbors.iter().any(|n| {
                ctx.assignments
                    .get(n)
                    .map(|t| types.contains(t))
                    .unwrap_or(false)
            });
            match mode {
                EvalMode::Final => satisfied,
                // Still satisfiable while any neighbor remains untyped.
                EvalMode::Partial => {
                    satisfied || neighbors.iter().any(|n| !ctx.assignments.contains_key(n))
                }
            }
        }
        ConstraintKind::MustNotBeAdjacentTo(types) => !ctx
            .graph
            .neighbors(ctx.node_id)
            .iter()
            .any(|n| {
                ctx.assignments
                    .get(n)
                    .map(|t| types.contains(t))
                    .unwrap_or(false)
            }),
        ConstraintKind::MustComeBefore(types) => {
            let candidate_index = match ctx.graph.critical_path_index(ctx.node_id) {
                Some(index) => index,
                None => return true,
            };
            assigned_nodes_of(ctx.assignments, types).all(|ref_node| {
                if ref_node == ctx.node_id {
                    return false;
                }
                match ctx.graph.critical_path_index(ref_node) {
                    Some(ref_index) => candidate_index < ref_index,
                    None => true,
                }
            })
        }
        ConstraintKind::OnlyInZone(zone_id) => ctx
            .zone_assignments
            .get(&ctx.node_id)
            .map(|z| z == zone_id)
            .unwrap_or(false),
        ConstraintKind::MinDifficulty(bound) => node.difficulty() >= *bound,
        ConstraintKind::MaxDifficulty(bound) => node.difficulty() <= *bound,
        ConstraintKind::Composite { op, children } => match op {
            CompositeOp::And => children.iter().all(|c| eval_graph(c, target, ctx, mode)),
            CompositeOp::Or => children.iter().any(|c| eval_graph(c, target, ctx, mode)),
        },
        ConstraintKind::Custom(predicate) => {
            predicate.call(ctx.node_id, ctx.graph, ctx.assignments)
        }
        // Spatial rules are consulted by the placer, not the solver.
        ConstraintKind::MustBeInQuadrant { .. }
        | ConstraintKind::MustBeInRegion { .. }
        | ConstraintKind::MinSpatialDistanceFromRoomType { .. }
        | ConstraintKind::MaxSpatialDistanceFromRoomType { .. }
        | ConstraintKind::MinSpatialDistanceFromStart(_)
        | ConstraintKind::MaxSpatialDistanceFromStart(_)
        | ConstraintKind::MustFormSpatialCluster { .. } => true,
    }
}

/// BFS distance from the candidate to the nearest assigned node of any of
/// the reference types. `None` when no reference node is assigned yet.
fn nearest_assigned_distance<T: RoomKind>(ctx: &GraphCtx<'_, T>, types: &[T]) -> Option<i32> {
    let refs: Vec<i32> = assigned_nodes_of(ctx.assignments, types).collect();
    if refs.is_empty() {
        return None;
    }
    let distances = ctx.graph.bfs_distances(ctx.node_id);
    refs.iter()
        .map(|&id| distances[id as usize])
        .filter(|&d| d >= 0)
        .min()
}

fn eval_spatial<T: RoomKind>(
    kind: &ConstraintKind<T>,
    target: &T,
    ctx: &SpatialCtx<'_, T>,
) -> bool {
    match kind {
        ConstraintKind::MustBeInQuadrant {
            quadrants,
            center_threshold,
        } => in_quadrant(ctx, quadrants, *center_threshold),
        ConstraintKind::MustBeInRegion {
            min_x,
            max_x,
            min_y,
            max_y,
        } => ctx.candidate_cells().iter().all(|c| {
            c.x >= *min_x && c.x <= *max_x && c.y >= *min_y && c.y <= *max_y
        }),
        ConstraintKind::MinSpatialDistanceFromRoomType { room_types, distance } => {
            match nearest_placed_distance(ctx, |room| room_types.contains(room.room_type())) {
                Some(nearest) => nearest >= *distance,
                None => true,
            }
        }
        ConstraintKind::MaxSpatialDistanceFromRoomType { room_types, distance } => {
            match nearest_placed_distance(ctx, |room| room_types.contains(room.room_type())) {
                Some(nearest) => nearest <= *distance,
                None => true,
            }
        }
        ConstraintKind::MinSpatialDistanceFromStart(distance) => {
            match nearest_placed_distance(ctx, |room| room.node_id() == ctx.spawn_node_id) {
                Some(nearest) => nearest >= *distance,
                None => true,
            }
        }
        ConstraintKind::MaxSpatialDistanceFromStart(distance) => {
            match nearest_placed_distance(ctx, |room| room.node_id() == ctx.spawn_node_id) {
                Some(nearest) => nearest <= *distance,
                None => true,
            }
        }
        ConstraintKind::MustFormSpatialCluster { radius, .. } => {
            match nearest_placed_distance(ctx, |room| room.room_type() == target) {
                Some(nearest) => nearest <= *radius,
                None => true,
            }
        }
        ConstraintKind::Composite { op, children } => match op {
            CompositeOp::And => children.iter().all(|c| eval_spatial(c, target, ctx)),
            CompositeOp::Or => children.iter().any(|c| eval_spatial(c, target, ctx)),
        },
        // Graph rules were settled during assignment; re-check strictly so
        // composites mixing both families stay meaningful.
        _ => eval_graph(kind, target, &ctx.graph_ctx(), EvalMode::Final),
    }
}

/// Manhattan distance (between cell sets) from the candidate placement to
/// the nearest placed room matching the filter.
fn nearest_placed_distance<T: RoomKind>(
    ctx: &SpatialCtx<'_, T>,
    filter: impl Fn(&PlacedRoom<T>) -> bool,
) -> Option<i32> {
    let candidate = ctx.candidate_cells();
    ctx.placed
        .iter()
        .filter(|room| room.node_id() != ctx.node_id)
        .filter(|room| filter(room))
        .map(|room| set_distance(&candidate, &room.world_cells()))
        .min()
}

fn in_quadrant<T: RoomKind>(
    ctx: &SpatialCtx<'_, T>,
    quadrants: &[Quadrant],
    center_threshold: f64,
) -> bool {
    let occupied: Vec<Cell> = ctx
        .placed
        .iter()
        .filter(|room| room.node_id() != ctx.node_id)
        .flat_map(|room| room.world_cells())
        .collect();
    let bb = match BoundingBox::of(occupied) {
        Some(bb) => bb,
        // Nothing placed yet: the box is undefined, so any quadrant holds.
        None => return true,
    };
    let (cx, cy) = bb.center();
    let dx = ctx.anchor.x as f64 - cx;
    let dy = ctx.anchor.y as f64 - cy;
    let near_center = dx.abs() <= bb.width() as f64 * center_threshold
        && dy.abs() <= bb.height() as f64 * center_threshold;
    quadrants.iter().any(|q| match q {
        Quadrant::TopLeft => dx <= 0.0 && dy <= 0.0,
        Quadrant::TopRight => dx >= 0.0 && dy <= 0.0,
        Quadrant::BottomLeft => dx <= 0.0 && dy >= 0.0,
        Quadrant::BottomRight => dx >= 0.0 && dy >= 0.0,
        Quadrant::Center => near_center,
    })
}
