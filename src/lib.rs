//! # Warren
//!
//! A deterministic procedural dungeon floor generator. Given a seed and a
//! declarative [`FloorConfig`], `warren` produces a fully laid-out floor: an
//! abstract room graph, typed rooms assigned by a backtracking constraint
//! solver, template footprints anchored on an unbounded integer grid,
//! A*-routed hallways with doors at room boundaries, and derived metadata
//! (critical path, zones, difficulty, clusters, secret passages).
//!
//! ## Architecture Overview
//!
//! Generation is a pure, single-threaded pipeline; every stage draws from
//! its own PRNG stream derived from the master seed, so equal configs
//! always produce equal layouts:
//!
//! - **Graph**: five algorithm variants build a connected room graph
//! - **Analysis**: BFS distances, boss selection, the critical path
//! - **Assignment**: constraint-satisfaction search types every node
//! - **Selection**: weighted template sampling per typed node
//! - **Placement**: overlap-free anchoring with spatial constraints
//! - **Routing**: A* hallways between doors on room boundaries
//! - **Extras**: secret passages, difficulty scores, DBSCAN clusters
//!
//! ## Example
//!
//! ```
//! use warren::{generate, FloorConfig};
//!
//! let config = FloorConfig::simple(12345, 5);
//! let layout = generate(&config).unwrap();
//! assert_eq!(layout.rooms().len(), 5);
//! assert_eq!(layout.critical_path()[0], layout.spawn_room_id());
//! ```

pub mod assignment;
pub mod clusters;
pub mod config;
pub mod constraints;
pub mod difficulty;
pub mod generator;
pub mod graph;
pub mod grid;
pub mod hallways;
pub mod layout;
pub mod placement;
pub mod rng;
pub mod rooms;
pub mod secrets;
pub mod selection;
pub mod template;
pub mod zones;

pub use clusters::{ClusterConfig, RoomCluster};
pub use config::{FloorConfig, HallwayMode, MultiFloorConfig, DEFAULT_BRANCHING_FACTOR};
pub use constraints::{
    CompositeOp, Constraint, ConstraintKind, CustomPredicate, Quadrant,
    DEFAULT_CENTER_THRESHOLD,
};
pub use difficulty::{DifficultyConfig, DifficultyFn, DifficultyFunction};
pub use generator::{generate, generate_multi};
pub use graph::{
    CellularAutomataConfig, FloorGraph, GraphAlgorithm, GridBasedConfig, GridConnectivity,
    HubAndSpokeConfig, MazeAlgorithm, MazeBasedConfig, MazeType, RoomConnection, RoomNode,
};
pub use grid::{BoundingBox, Cell, Edge};
pub use hallways::{Hallway, HallwaySegment};
pub use layout::{
    Door, FloorConnection, FloorConnectionType, FloorLayout, LayoutSummary, MultiFloorLayout,
    PlacedRoom, RoomSummary,
};
pub use rng::{Lcg, StageSeeds};
pub use rooms::{RoomKind, RoomType};
pub use secrets::{SecretPassage, SecretPassageConfig};
pub use template::{Corner, DoorPolicy, FeatureKind, RoomTemplate};
pub use zones::{Zone, ZoneBoundary};

/// Core error type for the generator.
#[derive(thiserror::Error, Debug)]
pub enum WarrenError {
    /// I/O operation failed (CLI and tooling paths only; the core never
    /// touches I/O).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The configuration violates a precondition or is infeasible; retrying
    /// with the same config cannot succeed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Placement or routing gave up within its bounded retries; a different
    /// seed may succeed.
    #[error("Spatial placement failed: {0}")]
    SpatialPlacement(String),
}

/// Result type used throughout the warren codebase.
pub type WarrenResult<T> = Result<T, WarrenError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
