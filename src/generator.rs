//! # Generation Pipeline
//!
//! The single entry points [`generate`] and [`generate_multi`]. Stages run
//! strictly in order, each drawing only from its own PRNG stream: graph,
//! analysis, difficulty, zones, type assignment, template selection, spatial
//! placement, hallway routing, secret passages, clustering, assembly.
//!
//! The spatial phase (placement plus routing) is retried a few times on
//! `SpatialPlacement` failures; each retry continues the placement stream,
//! so retries stay deterministic.

use crate::assignment::assign_room_types;
use crate::clusters::detect_clusters;
use crate::config::{FloorConfig, MultiFloorConfig};
use crate::difficulty::score_graph;
use crate::graph::{analyze, generate_graph, recompute_critical_path, FloorGraph};
use crate::hallways::{route_hallways, RoutedFloor, Router};
use crate::layout::{FloorLayout, MultiFloorLayout, PlacedRoom};
use crate::placement::place_rooms;
use crate::rng::RngStreams;
use crate::rooms::RoomKind;
use crate::secrets::insert_secret_passages;
use crate::selection::select_template;
use crate::template::RoomTemplate;
use crate::zones::{assign_zones, transition_rooms, Zone};
use crate::{WarrenError, WarrenResult};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Spatial-phase attempts before a `SpatialPlacement` error surfaces.
const MAX_SPATIAL_ATTEMPTS: usize = 4;

/// Generates a single floor from the config. The layout is a pure function
/// of `(config, seed)`.
pub fn generate<T: RoomKind>(config: &FloorConfig<T>) -> WarrenResult<FloorLayout<T>> {
    generate_floor(config, 0)
}

/// Generates every floor of a multi-floor dungeon and validates the
/// inter-floor connections against the produced layouts.
pub fn generate_multi<T: RoomKind>(
    config: &MultiFloorConfig<T>,
) -> WarrenResult<MultiFloorLayout<T>> {
    config.validate()?;
    let mut floors = Vec::with_capacity(config.floors.len());
    for (index, floor_config) in config.floors.iter().enumerate() {
        info!("multi-floor generator: generating floor {index}");
        floors.push(generate_floor(floor_config, index)?);
    }
    for connection in &config.connections {
        for (floor, node) in [
            (connection.from_floor, connection.from_node),
            (connection.to_floor, connection.to_node),
        ] {
            if floors[floor].room(node).is_none() {
                return Err(WarrenError::InvalidConfiguration(format!(
                    "multi-floor generator: connection references node {node} \
                     on floor {floor}, which does not exist"
                )));
            }
        }
    }
    Ok(MultiFloorLayout::new(floors, config.connections.clone()))
}

fn generate_floor<T: RoomKind>(
    config: &FloorConfig<T>,
    floor_index: usize,
) -> WarrenResult<FloorLayout<T>> {
    config.validate()?;
    let mut streams = RngStreams::derive(config.seed);
    info!(
        "generator: floor {floor_index}, seed {}, {} rooms",
        config.seed, config.room_count
    );

    // Stage 1: abstract graph.
    let mut graph = generate_graph(
        config.room_count,
        config.branching_factor,
        &mut streams.graph,
        &config.graph_algorithm,
    )?;

    // Stage 2: analysis (distances, provisional boss, critical path).
    analyze(&mut graph)?;

    // Difficulty is a function of distance alone, so it is available to
    // constraints and template bounds before assignment.
    if let Some(difficulty) = &config.difficulty {
        score_graph(&mut graph, difficulty);
    }

    // Stage 3: zones, evaluated against the provisional critical path.
    let zone_assignments = assign_zones(&graph, &config.zones);

    // Stage 4: constraint-driven type assignment.
    let outcome = assign_room_types(&graph, config, &zone_assignments, floor_index)?;
    recompute_critical_path(&mut graph, outcome.boss_node);

    // Stage 5: template selection, in node-id order.
    let templates = select_templates(config, &graph, &outcome.assignments, &zone_assignments, &mut streams)?;

    // Stages 6+7: placement and routing, retried together.
    let (rooms, mut router, routed) = spatial_phase(
        config,
        &graph,
        &outcome.assignments,
        &templates,
        &zone_assignments,
        outcome.spawn_node,
        floor_index,
        &mut streams,
    )?;

    // Stage 8: secret passages.
    let secret_passages = match &config.secret_passages {
        Some(secret_config) => insert_secret_passages(
            &graph,
            &rooms,
            &mut router,
            secret_config,
            routed.hallways.len() as u32,
            &mut streams.secrets,
        )?,
        None => Vec::new(),
    };

    // Stage 9: clustering.
    let clusters = match &config.clustering {
        Some(cluster_config) if cluster_config.enabled => {
            detect_clusters(&rooms, cluster_config)
        }
        _ => BTreeMap::new(),
    };

    // Stage 10: assembly.
    let mut doors = routed.doors;
    doors.extend(
        secret_passages
            .iter()
            .flat_map(|p| [*p.door_a(), *p.door_b()]),
    );
    let transitions = transition_rooms(&graph, &zone_assignments);
    debug!(
        "generator: assembled layout with {} rooms, {} hallways, {} secret passages",
        rooms.len(),
        routed.hallways.len(),
        secret_passages.len()
    );
    Ok(FloorLayout::new(
        rooms,
        doors,
        routed.hallways,
        config.seed,
        graph.critical_path().to_vec(),
        outcome.spawn_node,
        outcome.boss_node,
        secret_passages,
        zone_assignments,
        transitions,
        clusters,
    ))
}

fn select_templates<T: RoomKind>(
    config: &FloorConfig<T>,
    graph: &FloorGraph,
    assignments: &BTreeMap<i32, T>,
    zone_assignments: &BTreeMap<i32, String>,
    streams: &mut RngStreams,
) -> WarrenResult<BTreeMap<i32, Arc<RoomTemplate<T>>>> {
    let zone_by_id = |node_id: i32| -> Option<&Zone<T>> {
        zone_assignments
            .get(&node_id)
            .and_then(|zone_id| config.zones.iter().find(|z| z.id() == zone_id))
    };
    let mut templates = BTreeMap::new();
    for node_id in 0..graph.node_count() as i32 {
        let room_type = &assignments[&node_id];
        let difficulty = graph
            .node(node_id)
            .map(|n| n.difficulty())
            .unwrap_or(0.0);
        let template = select_template(
            room_type,
            zone_by_id(node_id),
            difficulty,
            &config.templates,
            &mut streams.templates,
        )?;
        templates.insert(node_id, template);
    }
    Ok(templates)
}

#[allow(clippy::too_many_arguments)]
fn spatial_phase<T: RoomKind>(
    config: &FloorConfig<T>,
    graph: &FloorGraph,
    assignments: &BTreeMap<i32, T>,
    templates: &BTreeMap<i32, Arc<RoomTemplate<T>>>,
    zone_assignments: &BTreeMap<i32, String>,
    spawn_node: i32,
    floor_index: usize,
    streams: &mut RngStreams,
) -> WarrenResult<(Vec<PlacedRoom<T>>, Router, RoutedFloor)> {
    let mut last_error = None;
    for attempt in 0..MAX_SPATIAL_ATTEMPTS {
        let placed = place_rooms(
            graph,
            assignments,
            templates,
            &config.constraints,
            zone_assignments,
            spawn_node,
            config.hallway_mode,
            floor_index,
            &mut streams.placement,
        );
        let rooms = match placed {
            Ok(rooms) => rooms,
            Err(error @ WarrenError::SpatialPlacement(_)) => {
                warn!("generator: placement attempt {attempt} failed: {error}");
                last_error = Some(error);
                continue;
            }
            Err(error) => return Err(error),
        };

        let mut router = Router::new(&rooms);
        match route_hallways(graph, &mut router, config.hallway_mode) {
            Ok(routed) => return Ok((rooms, router, routed)),
            Err(error @ WarrenError::SpatialPlacement(_)) => {
                warn!("generator: routing attempt {attempt} failed: {error}");
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        WarrenError::SpatialPlacement(format!(
            "generator: spatial phase failed after {MAX_SPATIAL_ATTEMPTS} attempts"
        ))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomType;

    #[test]
    fn test_generate_simple_floor() {
        let config = FloorConfig::simple(12345, 5);
        let layout = generate(&config).unwrap();
        assert_eq!(layout.rooms().len(), 5);
        assert_eq!(layout.seed(), 12345);
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let config = FloorConfig::simple(1, -5);
        assert!(matches!(
            generate(&config),
            Err(WarrenError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_multi_floor_connection_node_validation() {
        use crate::layout::{FloorConnection, FloorConnectionType};
        let mut config = MultiFloorConfig::new(vec![
            FloorConfig::simple(1, 4),
            FloorConfig::simple(2, 4),
        ]);
        config.connect(FloorConnection {
            from_floor: 0,
            from_node: 99,
            to_floor: 1,
            to_node: 0,
            connection_type: FloorConnectionType::StairsDown,
        });
        let err = generate_multi(&config).unwrap_err();
        assert!(err.to_string().contains("node 99"));
    }

    #[test]
    fn test_multi_floor_generates_all_floors() {
        let config = MultiFloorConfig::new(vec![
            FloorConfig::simple(10, 4),
            FloorConfig::simple(11, 6),
        ]);
        let layout = generate_multi(&config).unwrap();
        assert_eq!(layout.floors().len(), 2);
        assert_eq!(layout.floor(1).unwrap().rooms().len(), 6);
    }

    #[test]
    fn test_spawn_type_is_on_spawn_node() {
        let config = FloorConfig::simple(777, 6);
        let layout = generate(&config).unwrap();
        let spawn = layout.room(layout.spawn_room_id()).unwrap();
        assert_eq!(*spawn.room_type(), RoomType::Spawn);
    }
}
