//! # Warren CLI
//!
//! Generates a single floor from command-line flags and prints either a
//! human-readable summary or the serializable layout summary as JSON.

use clap::Parser;
use log::info;
use warren::{
    generate, FloorConfig, GraphAlgorithm, HallwayMode, HubAndSpokeConfig, MazeAlgorithm,
    MazeBasedConfig, MazeType, SecretPassageConfig, WarrenError, WarrenResult,
};

/// Command line arguments for the warren generator.
#[derive(Parser, Debug)]
#[command(name = "warren")]
#[command(about = "Deterministic procedural dungeon floor generator")]
#[command(version)]
struct Args {
    /// Master seed for generation
    #[arg(short, long, default_value_t = 42)]
    seed: i64,

    /// Number of rooms on the floor
    #[arg(short, long, default_value_t = 10)]
    rooms: i32,

    /// Graph algorithm (spanning-tree, maze-perfect, maze-imperfect, hub-and-spoke)
    #[arg(long, default_value = "spanning-tree")]
    algorithm: String,

    /// Route a hallway on every edge instead of only where needed
    #[arg(long)]
    always_hallways: bool,

    /// Number of secret passages to insert
    #[arg(long, default_value_t = 0)]
    secret_passages: usize,

    /// Print the layout summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_algorithm(name: &str) -> WarrenResult<GraphAlgorithm> {
    match name {
        "spanning-tree" => Ok(GraphAlgorithm::SpanningTree),
        "maze-perfect" => Ok(GraphAlgorithm::MazeBased(MazeBasedConfig {
            maze_type: MazeType::Perfect,
            algorithm: MazeAlgorithm::Prims,
        })),
        "maze-imperfect" => Ok(GraphAlgorithm::MazeBased(MazeBasedConfig {
            maze_type: MazeType::Imperfect,
            algorithm: MazeAlgorithm::Kruskals,
        })),
        "hub-and-spoke" => Ok(GraphAlgorithm::HubAndSpoke(HubAndSpokeConfig {
            hub_count: 2,
            max_spoke_length: 4,
        })),
        other => Err(WarrenError::InvalidConfiguration(format!(
            "unknown algorithm {other:?}; expected spanning-tree, maze-perfect, \
             maze-imperfect, or hub-and-spoke"
        ))),
    }
}

fn main() -> WarrenResult<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    let mut config = FloorConfig::simple(args.seed, args.rooms);
    config.graph_algorithm = parse_algorithm(&args.algorithm)?;
    if args.always_hallways {
        config.hallway_mode = HallwayMode::Always;
    }
    if args.secret_passages > 0 {
        config.secret_passages = Some(SecretPassageConfig::new(args.secret_passages, 30));
    }

    info!("generating floor: seed {}, {} rooms", args.seed, args.rooms);
    let layout = generate(&config)?;
    let summary = layout.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "floor seed {}: {} rooms, {} doors, {} hallways, {} secret passages",
        summary.seed,
        summary.room_count,
        summary.door_count,
        summary.hallway_count,
        summary.secret_passage_count
    );
    println!(
        "spawn room {} -> boss room {} (critical path {:?})",
        summary.spawn_room_id, summary.boss_room_id, summary.critical_path
    );
    for room in &summary.rooms {
        let zone = room
            .zone
            .as_deref()
            .map(|z| format!(" [{z}]"))
            .unwrap_or_default();
        println!(
            "  room {:>3} {:<10} {} at ({}, {}), difficulty {:.1}{zone}",
            room.node_id,
            room.room_type,
            room.template_id,
            room.anchor.x,
            room.anchor.y,
            room.difficulty
        );
    }
    Ok(())
}
