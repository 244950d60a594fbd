//! # Generation Configuration
//!
//! Declarative description of one floor: counts, pinned role types,
//! templates, requirements, constraints, zones, and the optional stage
//! configs. `FloorConfig::validate` front-loads every precondition the
//! pipeline relies on, so stages can assume a well-formed config.

use crate::clusters::ClusterConfig;
use crate::constraints::{Constraint, ConstraintKind};
use crate::difficulty::DifficultyConfig;
use crate::graph::GraphAlgorithm;
use crate::layout::FloorConnection;
use crate::rooms::{RoomKind, RoomType};
use crate::secrets::SecretPassageConfig;
use crate::template::RoomTemplate;
use crate::zones::Zone;
use crate::{WarrenError, WarrenResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Hallway routing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HallwayMode {
    /// Route a hallway for every graph edge, even between adjacent rooms.
    Always,
    /// Only route when rooms are not already door-adjacent. The default.
    #[default]
    AsNeeded,
}

/// Default branching factor for extra non-tree edges.
pub const DEFAULT_BRANCHING_FACTOR: f32 = 0.3;

/// Configuration for a single floor.
#[derive(Debug, Clone)]
pub struct FloorConfig<T: RoomKind> {
    /// Master PRNG seed.
    pub seed: i64,
    /// Number of abstract graph nodes; at least 2.
    pub room_count: i32,
    /// Type pinned to exactly one node, preferring node 0.
    pub spawn_room_type: T,
    /// Type pinned to exactly one node, preferring the farthest node.
    pub boss_room_type: T,
    /// Type given to every node no requirement claims.
    pub default_room_type: T,
    /// Global template pool.
    pub templates: Vec<Arc<RoomTemplate<T>>>,
    /// Minimum room counts per type.
    pub room_requirements: Vec<(T, usize)>,
    /// Global constraints.
    pub constraints: Vec<Constraint<T>>,
    /// Zone definitions; first-match declaration order is load-bearing.
    pub zones: Vec<Zone<T>>,
    /// Extra-edge probability in `[0, 1]`.
    pub branching_factor: f32,
    /// Hallway routing policy.
    pub hallway_mode: HallwayMode,
    /// Graph algorithm selection.
    pub graph_algorithm: GraphAlgorithm,
    /// Optional secret-passage insertion.
    pub secret_passages: Option<SecretPassageConfig<T>>,
    /// Optional difficulty scoring.
    pub difficulty: Option<DifficultyConfig>,
    /// Optional DBSCAN clustering.
    pub clustering: Option<ClusterConfig<T>>,
}

impl<T: RoomKind> FloorConfig<T> {
    /// Creates a minimal config; templates, requirements, and constraints
    /// are added with the builder methods.
    pub fn new(
        seed: i64,
        room_count: i32,
        spawn_room_type: T,
        boss_room_type: T,
        default_room_type: T,
    ) -> Self {
        Self {
            seed,
            room_count,
            spawn_room_type,
            boss_room_type,
            default_room_type,
            templates: Vec::new(),
            room_requirements: Vec::new(),
            constraints: Vec::new(),
            zones: Vec::new(),
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            hallway_mode: HallwayMode::default(),
            graph_algorithm: GraphAlgorithm::default(),
            secret_passages: None,
            difficulty: None,
            clustering: None,
        }
    }

    /// Adds a template to the global pool.
    pub fn add_template(&mut self, template: RoomTemplate<T>) -> &mut Self {
        self.templates.push(Arc::new(template));
        self
    }

    /// Requires at least `count` rooms of `room_type`.
    pub fn require_room(&mut self, room_type: T, count: usize) -> &mut Self {
        self.room_requirements.push((room_type, count));
        self
    }

    /// Adds a constraint targeting `room_type`.
    pub fn add_constraint(&mut self, room_type: T, kind: ConstraintKind<T>) -> WarrenResult<&mut Self> {
        self.constraints.push(Constraint::new(room_type, kind)?);
        Ok(self)
    }

    /// Appends a zone; declaration order decides first-match priority.
    pub fn add_zone(&mut self, zone: Zone<T>) -> &mut Self {
        self.zones.push(zone);
        self
    }

    /// Checks every precondition the pipeline relies on.
    pub fn validate(&self) -> WarrenResult<()> {
        if self.room_count < 2 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "config: room_count must be at least 2, got {}",
                self.room_count
            )));
        }
        if !(0.0..=1.0).contains(&self.branching_factor) {
            return Err(WarrenError::InvalidConfiguration(format!(
                "config: branching_factor must lie in [0, 1], got {}",
                self.branching_factor
            )));
        }
        if self.spawn_room_type == self.boss_room_type {
            return Err(WarrenError::InvalidConfiguration(
                "config: spawn and boss room types must differ".to_string(),
            ));
        }
        if self.default_room_type == self.spawn_room_type
            || self.default_room_type == self.boss_room_type
        {
            return Err(WarrenError::InvalidConfiguration(
                "config: default room type must differ from the spawn and boss types"
                    .to_string(),
            ));
        }

        let mut ids = BTreeSet::new();
        for template in self.all_templates() {
            if !ids.insert(template.id().to_string()) {
                return Err(WarrenError::InvalidConfiguration(format!(
                    "config: duplicate template id {:?}",
                    template.id()
                )));
            }
        }

        self.check_template_coverage(&self.spawn_room_type, "spawn")?;
        self.check_template_coverage(&self.boss_room_type, "boss")?;
        self.check_template_coverage(&self.default_room_type, "default")?;
        for (room_type, _) in &self.room_requirements {
            self.check_template_coverage(room_type, "required")?;
        }

        if let Some(secret) = &self.secret_passages {
            secret.validate()?;
        }
        if let Some(difficulty) = &self.difficulty {
            difficulty.validate()?;
        }
        if let Some(clustering) = &self.clustering {
            clustering.validate()?;
        }
        Ok(())
    }

    fn check_template_coverage(&self, room_type: &T, role: &str) -> WarrenResult<()> {
        if self
            .all_templates()
            .any(|t| t.allows_room_type(room_type))
        {
            Ok(())
        } else {
            Err(WarrenError::InvalidConfiguration(format!(
                "config: no template accepts the {role} room type {room_type:?}"
            )))
        }
    }

    /// Global templates plus every zone's templates.
    pub(crate) fn all_templates(&self) -> impl Iterator<Item = &Arc<RoomTemplate<T>>> {
        self.templates
            .iter()
            .chain(self.zones.iter().flat_map(|z| z.templates().iter()))
    }
}

impl FloorConfig<RoomType> {
    /// A ready-to-generate config using the built-in vocabulary: square and
    /// L-shaped templates valid for every room type, spawn/boss/combat
    /// roles, default branching.
    pub fn simple(seed: i64, room_count: i32) -> Self {
        let all_types = [
            RoomType::Spawn,
            RoomType::Boss,
            RoomType::Combat,
            RoomType::Treasure,
            RoomType::Shop,
            RoomType::Puzzle,
            RoomType::Sanctuary,
            RoomType::Library,
            RoomType::Secret,
        ];
        let mut config = Self::new(
            seed,
            room_count,
            RoomType::Spawn,
            RoomType::Boss,
            RoomType::Combat,
        );
        config.add_template(
            RoomTemplate::rectangle("room_3x3", 3, 3)
                .expect("static template is well-formed")
                .for_room_types(all_types),
        );
        config.add_template(
            RoomTemplate::rectangle("hall_4x3", 4, 3)
                .expect("static template is well-formed")
                .for_room_types(all_types),
        );
        config
    }
}

/// Configuration for a multi-floor dungeon.
#[derive(Debug, Clone)]
pub struct MultiFloorConfig<T: RoomKind> {
    pub floors: Vec<FloorConfig<T>>,
    pub connections: Vec<FloorConnection>,
}

impl<T: RoomKind> MultiFloorConfig<T> {
    pub fn new(floors: Vec<FloorConfig<T>>) -> Self {
        Self {
            floors,
            connections: Vec::new(),
        }
    }

    /// Adds an inter-floor connection; node existence is checked after the
    /// floors generate.
    pub fn connect(&mut self, connection: FloorConnection) -> &mut Self {
        self.connections.push(connection);
        self
    }

    /// Validates floor configs, connection floor indices, and multi-floor
    /// constraint floor references.
    pub fn validate(&self) -> WarrenResult<()> {
        if self.floors.is_empty() {
            return Err(WarrenError::InvalidConfiguration(
                "multi-floor config: at least one floor is required".to_string(),
            ));
        }
        for floor in &self.floors {
            floor.validate()?;
        }
        for connection in &self.connections {
            for floor in [connection.from_floor, connection.to_floor] {
                if floor >= self.floors.len() {
                    return Err(WarrenError::InvalidConfiguration(format!(
                        "multi-floor config: connection references floor {floor}, \
                         but only {} floors exist",
                        self.floors.len()
                    )));
                }
            }
        }
        for (index, floor) in self.floors.iter().enumerate() {
            for constraint in &floor.constraints {
                check_floor_references(constraint.kind(), self.floors.len(), index)?;
            }
        }
        Ok(())
    }
}

fn check_floor_references<T: RoomKind>(
    kind: &ConstraintKind<T>,
    floor_count: usize,
    declaring_floor: usize,
) -> WarrenResult<()> {
    let check = |floors: &[usize]| -> WarrenResult<()> {
        match floors.iter().find(|&&f| f >= floor_count) {
            Some(&bad) => Err(WarrenError::InvalidConfiguration(format!(
                "multi-floor config: constraint on floor {declaring_floor} names \
                 nonexistent floor {bad}"
            ))),
            None => Ok(()),
        }
    };
    match kind {
        ConstraintKind::OnlyOnFloor(floors) | ConstraintKind::NotOnFloor(floors) => {
            check(floors)
        }
        ConstraintKind::MinFloor(f) | ConstraintKind::MaxFloor(f) => check(&[*f]),
        ConstraintKind::Composite { children, .. } => children
            .iter()
            .try_for_each(|c| check_floor_references(c, floor_count, declaring_floor)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_config_validates() {
        assert!(FloorConfig::simple(42, 8).validate().is_ok());
    }

    #[test]
    fn test_room_count_bounds() {
        let mut config = FloorConfig::simple(1, 1);
        assert!(config.validate().is_err());
        config.room_count = -3;
        assert!(config.validate().is_err());
        config.room_count = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_branching_factor_bounds() {
        let mut config = FloorConfig::simple(1, 5);
        config.branching_factor = 1.2;
        assert!(config.validate().is_err());
        config.branching_factor = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_role_types_must_differ() {
        let config = FloorConfig::new(
            1,
            5,
            RoomType::Spawn,
            RoomType::Spawn,
            RoomType::Combat,
        );
        assert!(config.validate().is_err());

        let mut config = FloorConfig::simple(1, 5);
        config.default_room_type = RoomType::Boss;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_boss_template_detected() {
        let mut config = FloorConfig::new(
            1,
            5,
            RoomType::Spawn,
            RoomType::Boss,
            RoomType::Combat,
        );
        config.add_template(
            RoomTemplate::rectangle("r", 3, 3)
                .unwrap()
                .for_room_types([RoomType::Spawn, RoomType::Combat]),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("boss"));
    }

    #[test]
    fn test_duplicate_template_ids_rejected() {
        let mut config = FloorConfig::simple(1, 5);
        config.add_template(
            RoomTemplate::rectangle("room_3x3", 3, 3)
                .unwrap()
                .for_room_types([RoomType::Combat]),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multi_floor_connection_bounds() {
        use crate::layout::FloorConnectionType;
        let mut config = MultiFloorConfig::new(vec![
            FloorConfig::simple(1, 5),
            FloorConfig::simple(2, 5),
        ]);
        config.connect(FloorConnection {
            from_floor: 0,
            from_node: 0,
            to_floor: 2,
            to_node: 0,
            connection_type: FloorConnectionType::StairsDown,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multi_floor_constraint_reference() {
        let mut floor = FloorConfig::simple(1, 5);
        floor
            .add_constraint(RoomType::Treasure, ConstraintKind::OnlyOnFloor(vec![3]))
            .unwrap();
        let config = MultiFloorConfig::new(vec![floor, FloorConfig::simple(2, 5)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nonexistent floor"));
    }
}
