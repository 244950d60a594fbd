//! # Spatial Clustering
//!
//! DBSCAN over room centroids, run independently per room type. Cluster ids
//! are assigned in ascending order of the smallest member node id, so the
//! output is stable across runs.

use crate::grid::{BoundingBox, Cell};
use crate::layout::PlacedRoom;
use crate::rooms::RoomKind;
use crate::{WarrenError, WarrenResult};
use log::debug;
use std::collections::BTreeMap;

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct ClusterConfig<T: RoomKind> {
    pub enabled: bool,
    /// Neighbor radius under Euclidean centroid distance.
    pub epsilon: f64,
    /// Minimum members (the queried room included) for a core room.
    pub min_cluster_size: usize,
    /// Room types to cluster; `None` clusters every type present.
    pub room_types_to_cluster: Option<Vec<T>>,
}

impl<T: RoomKind> ClusterConfig<T> {
    /// Clusters every room type with the given radius and minimum size.
    pub fn new(epsilon: f64, min_cluster_size: usize) -> Self {
        Self {
            enabled: true,
            epsilon,
            min_cluster_size,
            room_types_to_cluster: None,
        }
    }

    pub(crate) fn validate(&self) -> WarrenResult<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "cluster detector: epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(WarrenError::InvalidConfiguration(
                "cluster detector: min_cluster_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A detected cluster of same-type rooms.
#[derive(Debug, Clone)]
pub struct RoomCluster<T: RoomKind> {
    cluster_id: u32,
    room_type: T,
    room_ids: Vec<i32>,
    centroid: Cell,
    bounding_box: (Cell, Cell),
    average_distance: f64,
}

impl<T: RoomKind> RoomCluster<T> {
    /// Stable id, ascending by smallest member node id within a room type.
    pub fn cluster_id(&self) -> u32 {
        self.cluster_id
    }

    pub fn room_type(&self) -> &T {
        &self.room_type
    }

    /// Member node ids in ascending order.
    pub fn room_ids(&self) -> &[i32] {
        &self.room_ids
    }

    /// Integer centroid of the member centroids.
    pub fn centroid(&self) -> Cell {
        self.centroid
    }

    /// Bounding box over all member world cells.
    pub fn bounding_box(&self) -> (Cell, Cell) {
        self.bounding_box
    }

    pub fn contains_room(&self, node_id: i32) -> bool {
        self.room_ids.binary_search(&node_id).is_ok()
    }

    pub fn size(&self) -> usize {
        self.room_ids.len()
    }

    /// Mean Euclidean distance of member centroids to the cluster centroid.
    pub fn average_distance(&self) -> f64 {
        self.average_distance
    }
}

/// Runs DBSCAN per room type and groups the clusters by type.
pub(crate) fn detect_clusters<T: RoomKind>(
    rooms: &[PlacedRoom<T>],
    config: &ClusterConfig<T>,
) -> BTreeMap<T, Vec<RoomCluster<T>>> {
    let mut by_type: BTreeMap<T, Vec<&PlacedRoom<T>>> = BTreeMap::new();
    for room in rooms {
        if let Some(filter) = &config.room_types_to_cluster {
            if !filter.contains(room.room_type()) {
                continue;
            }
        }
        by_type
            .entry(room.room_type().clone())
            .or_default()
            .push(room);
    }

    let mut result = BTreeMap::new();
    for (room_type, mut members) in by_type {
        members.sort_by_key(|r| r.node_id());
        let clusters = dbscan(&members, config.epsilon, config.min_cluster_size);
        if !clusters.is_empty() {
            let built = clusters
                .into_iter()
                .enumerate()
                .map(|(index, member_rooms)| {
                    build_cluster(index as u32, room_type.clone(), &member_rooms)
                })
                .collect();
            result.insert(room_type, built);
        }
    }
    debug!(
        "cluster detector: {} room types produced clusters",
        result.len()
    );
    result
}

/// DBSCAN over room centroids. Returns member groups sorted by their
/// smallest node id; noise rooms are dropped.
fn dbscan<'a, T: RoomKind>(
    rooms: &[&'a PlacedRoom<T>],
    epsilon: f64,
    min_size: usize,
) -> Vec<Vec<&'a PlacedRoom<T>>> {
    let centroids: Vec<Cell> = rooms.iter().map(|r| r.center()).collect();
    let neighbors_of = |i: usize| -> Vec<usize> {
        (0..rooms.len())
            .filter(|&j| centroids[i].euclidean_distance(centroids[j]) <= epsilon)
            .collect()
    };

    const UNVISITED: i32 = -2;
    const NOISE: i32 = -1;
    let mut labels = vec![UNVISITED; rooms.len()];
    let mut next_label = 0i32;

    for i in 0..rooms.len() {
        if labels[i] != UNVISITED {
            continue;
        }
        let seeds = neighbors_of(i);
        if seeds.len() < min_size {
            labels[i] = NOISE;
            continue;
        }
        let label = next_label;
        next_label += 1;
        labels[i] = label;
        let mut frontier = seeds;
        let mut cursor = 0;
        while cursor < frontier.len() {
            let j = frontier[cursor];
            cursor += 1;
            if labels[j] == NOISE {
                labels[j] = label;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = label;
            let expansion = neighbors_of(j);
            if expansion.len() >= min_size {
                frontier.extend(expansion);
            }
        }
    }

    let mut clusters: Vec<Vec<&PlacedRoom<T>>> = vec![Vec::new(); next_label as usize];
    for (index, &label) in labels.iter().enumerate() {
        if label >= 0 {
            clusters[label as usize].push(rooms[index]);
        }
    }
    clusters.retain(|c| !c.is_empty());
    // Rooms arrive sorted by node id, so each cluster's first member is its
    // minimum; order clusters by that minimum.
    clusters.sort_by_key(|c| c[0].node_id());
    clusters
}

fn build_cluster<T: RoomKind>(
    cluster_id: u32,
    room_type: T,
    members: &[&PlacedRoom<T>],
) -> RoomCluster<T> {
    let room_ids: Vec<i32> = members.iter().map(|r| r.node_id()).collect();
    let centroids: Vec<Cell> = members.iter().map(|r| r.center()).collect();
    let n = centroids.len() as f64;
    let (sum_x, sum_y) = centroids
        .iter()
        .fold((0f64, 0f64), |(sx, sy), c| (sx + c.x as f64, sy + c.y as f64));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);
    let average_distance = centroids
        .iter()
        .map(|c| {
            let dx = c.x as f64 - mean_x;
            let dy = c.y as f64 - mean_y;
            (dx * dx + dy * dy).sqrt()
        })
        .sum::<f64>()
        / n;
    let bb = BoundingBox::of(members.iter().flat_map(|r| r.world_cells()))
        .expect("cluster members have cells");
    RoomCluster {
        cluster_id,
        room_type,
        room_ids,
        centroid: Cell::new(mean_x.floor() as i32, mean_y.floor() as i32),
        bounding_box: (bb.min, bb.max),
        average_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomType;
    use crate::template::RoomTemplate;
    use std::sync::Arc;

    fn room(node_id: i32, room_type: RoomType, anchor: Cell) -> PlacedRoom<RoomType> {
        let template = Arc::new(RoomTemplate::rectangle("t", 2, 2).unwrap());
        PlacedRoom::new(node_id, room_type, template, anchor, 0.0)
    }

    #[test]
    fn test_two_tight_groups() {
        let rooms = vec![
            room(0, RoomType::Combat, Cell::new(0, 0)),
            room(1, RoomType::Combat, Cell::new(3, 0)),
            room(2, RoomType::Combat, Cell::new(0, 3)),
            room(3, RoomType::Combat, Cell::new(40, 40)),
            room(4, RoomType::Combat, Cell::new(43, 40)),
            room(5, RoomType::Combat, Cell::new(40, 43)),
        ];
        let clusters = detect_clusters(&rooms, &ClusterConfig::new(6.0, 3));
        let combat = clusters.get(&RoomType::Combat).unwrap();
        assert_eq!(combat.len(), 2);
        assert_eq!(combat[0].cluster_id(), 0);
        assert_eq!(combat[0].room_ids(), &[0, 1, 2]);
        assert_eq!(combat[1].room_ids(), &[3, 4, 5]);
        assert!(combat[0].contains_room(1));
        assert!(!combat[0].contains_room(4));
    }

    #[test]
    fn test_noise_is_dropped() {
        let rooms = vec![
            room(0, RoomType::Combat, Cell::new(0, 0)),
            room(1, RoomType::Combat, Cell::new(3, 0)),
            room(2, RoomType::Combat, Cell::new(100, 100)),
        ];
        let clusters = detect_clusters(&rooms, &ClusterConfig::new(6.0, 2));
        let combat = clusters.get(&RoomType::Combat).unwrap();
        assert_eq!(combat.len(), 1);
        assert_eq!(combat[0].size(), 2);
    }

    #[test]
    fn test_types_cluster_independently() {
        let rooms = vec![
            room(0, RoomType::Combat, Cell::new(0, 0)),
            room(1, RoomType::Treasure, Cell::new(3, 0)),
            room(2, RoomType::Combat, Cell::new(0, 3)),
            room(3, RoomType::Treasure, Cell::new(3, 3)),
        ];
        let clusters = detect_clusters(&rooms, &ClusterConfig::new(10.0, 2));
        assert_eq!(clusters.get(&RoomType::Combat).unwrap().len(), 1);
        assert_eq!(clusters.get(&RoomType::Treasure).unwrap().len(), 1);
        assert_eq!(
            clusters.get(&RoomType::Combat).unwrap()[0].room_ids(),
            &[0, 2]
        );
    }

    #[test]
    fn test_type_filter() {
        let rooms = vec![
            room(0, RoomType::Combat, Cell::new(0, 0)),
            room(1, RoomType::Combat, Cell::new(2, 0)),
            room(2, RoomType::Treasure, Cell::new(0, 2)),
            room(3, RoomType::Treasure, Cell::new(2, 2)),
        ];
        let config = ClusterConfig {
            enabled: true,
            epsilon: 8.0,
            min_cluster_size: 2,
            room_types_to_cluster: Some(vec![RoomType::Treasure]),
        };
        let clusters = detect_clusters(&rooms, &config);
        assert!(!clusters.contains_key(&RoomType::Combat));
        assert!(clusters.contains_key(&RoomType::Treasure));
    }

    #[test]
    fn test_determinism() {
        let rooms: Vec<_> = (0..12)
            .map(|i| room(i, RoomType::Combat, Cell::new((i % 4) * 3, (i / 4) * 3)))
            .collect();
        let config = ClusterConfig::new(5.0, 3);
        let a = detect_clusters(&rooms, &config);
        let b = detect_clusters(&rooms, &config);
        let ids = |m: &BTreeMap<RoomType, Vec<RoomCluster<RoomType>>>| {
            m.values()
                .flatten()
                .map(|c| (c.cluster_id(), c.room_ids().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_config_validation() {
        assert!(ClusterConfig::<RoomType>::new(0.0, 2).validate().is_err());
        assert!(ClusterConfig::<RoomType>::new(3.0, 0).validate().is_err());
        assert!(ClusterConfig::<RoomType>::new(3.0, 2).validate().is_ok());
    }

    #[test]
    fn test_cluster_geometry() {
        let rooms = vec![
            room(0, RoomType::Combat, Cell::new(0, 0)),
            room(1, RoomType::Combat, Cell::new(4, 0)),
        ];
        let clusters = detect_clusters(&rooms, &ClusterConfig::new(10.0, 2));
        let cluster = &clusters.get(&RoomType::Combat).unwrap()[0];
        // Centroids are (0,0) and (4,0) for 2x2 rooms anchored there.
        assert_eq!(cluster.centroid(), Cell::new(2, 0));
        assert_eq!(cluster.bounding_box(), (Cell::new(0, 0), Cell::new(5, 1)));
        assert_eq!(cluster.average_distance(), 2.0);
    }
}
