//! # Cairn Command Line
//!
//! Generates (or loads) a dungeon skeleton, dresses it with features and
//! prints the result.

use cairn::{
    config, AsciiSkeleton, CairnError, CairnResult, DoorRequest, DressedDungeon, DungeonDresser,
    EnvironmentFeatures, FeatureConfig, Percentage, RoomCorridorSkeleton, SkeletonConfig,
    SkeletonSource, VolumeMapping,
};
use clap::Parser;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;

/// Command line arguments for the Cairn dungeon dresser.
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Dresses dungeon skeletons with water, grass, boulders, traps, lakes, mazes and doors")]
#[command(version)]
struct Args {
    /// Random seed for skeleton generation and dressing
    #[arg(short, long)]
    seed: Option<u64>,

    /// Map width for generated skeletons
    #[arg(long, default_value_t = config::DEFAULT_DUNGEON_WIDTH)]
    width: usize,

    /// Map height for generated skeletons
    #[arg(long, default_value_t = config::DEFAULT_DUNGEON_HEIGHT)]
    height: usize,

    /// Text skeleton to dress instead of generating one
    #[arg(long)]
    skeleton: Option<PathBuf>,

    /// JSON feature configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Water percentage in every environment
    #[arg(long)]
    water: Option<u8>,

    /// Grass percentage in every environment
    #[arg(long)]
    grass: Option<u8>,

    /// Boulder percentage in every environment
    #[arg(long)]
    boulders: Option<u8>,

    /// Trap percentage in every environment
    #[arg(long)]
    traps: Option<u8>,

    /// Percentage of viable doorways that get doors
    #[arg(long)]
    doors: Option<u8>,

    /// Also close double-wide gaps with a door and a wall
    #[arg(long)]
    double_doors: bool,

    /// Island spacing inside water pools, at least 2
    #[arg(long)]
    islands: Option<u32>,

    /// Lake percentage of the free rock
    #[arg(long)]
    lake: Option<u8>,

    /// Maze percentage of the free rock
    #[arg(long)]
    maze: Option<u8>,

    /// Map percentages to volumes the sparser legacy way
    #[arg(long)]
    legacy_volume: bool,

    /// Fresh skeletons to try before giving up
    #[arg(long, default_value_t = config::DEFAULT_SKELETON_RETRIES)]
    retries: u32,

    /// Print the map collapsed to wall and floor
    #[arg(long)]
    bare: bool,

    /// Print a JSON summary instead of the map
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    version: &'a str,
    rebuild_seed: u64,
    stairs: cairn::StaircasePair,
    width: usize,
    height: usize,
    map: Vec<String>,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // RUST_LOG wins over the flag when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_target(false)
        .init();
}

fn run(args: &Args) -> CairnResult<()> {
    info!("Starting Cairn v{}", cairn::VERSION);

    let features = feature_config(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dresser = DungeonDresser::new(features)?;

    let source: Box<dyn SkeletonSource> = match &args.skeleton {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Box::new(AsciiSkeleton::new(text))
        }
        None => {
            let skeleton_config = SkeletonConfig::new(seed).with_size(args.width, args.height);
            skeleton_config.validate()?;
            Box::new(RoomCorridorSkeleton::new(skeleton_config))
        }
    };
    info!("Using {} with seed {}", source.source_type(), seed);

    let dungeon = dresser.generate_with_retries(source.as_ref(), &mut rng, args.retries)?;
    print_dungeon(args, dungeon)
}

/// Loads the JSON configuration, if any, and applies flag overrides.
fn feature_config(args: &Args) -> CairnResult<FeatureConfig> {
    let mut features = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<FeatureConfig>(&text)?
        }
        None => FeatureConfig::new(),
    };

    let percentage = |value: Option<u8>| value.map(Percentage::new).transpose();
    let water = percentage(args.water)?;
    let grass = percentage(args.grass)?;
    let boulders = percentage(args.boulders)?;
    let traps = percentage(args.traps)?;

    for env in [&mut features.room, &mut features.corridor, &mut features.cave] {
        override_features(env, water, grass, boulders, traps, args.islands);
    }

    if let Some(doors) = percentage(args.doors)? {
        features.doors = Some(DoorRequest {
            percentage: doors,
            double_wide: args.double_doors,
        });
    } else if args.double_doors {
        let doors = features.doors.get_or_insert_with(DoorRequest::default);
        doors.double_wide = true;
    }
    if let Some(lake) = percentage(args.lake)? {
        features.lake = lake;
    }
    if let Some(maze) = percentage(args.maze)? {
        features.maze = maze;
    }
    if args.legacy_volume {
        features.volume_mapping = VolumeMapping::TwoThirds;
    }

    features.validate()?;
    Ok(features)
}

fn override_features(
    features: &mut EnvironmentFeatures,
    water: Option<Percentage>,
    grass: Option<Percentage>,
    boulders: Option<Percentage>,
    traps: Option<Percentage>,
    islands: Option<u32>,
) {
    if let Some(water) = water {
        features.water = water;
    }
    if let Some(grass) = grass {
        features.grass = grass;
    }
    if let Some(boulders) = boulders {
        features.boulders = boulders;
    }
    if let Some(traps) = traps {
        features.traps = traps;
    }
    if islands.is_some() {
        features.island_spacing = islands;
    }
}

fn print_dungeon(args: &Args, dungeon: &DressedDungeon) -> CairnResult<()> {
    let grid = if args.bare {
        dungeon.bare()
    } else {
        dungeon.terrain().clone()
    };
    let map = cairn::render_terrain(&grid);

    if args.json {
        let summary = Summary {
            version: cairn::VERSION,
            rebuild_seed: dungeon.rebuild_seed(),
            stairs: dungeon.stairs(),
            width: grid.width(),
            height: grid.height(),
            map: map.lines().map(str::to_string).collect(),
        };
        let json = serde_json::to_string_pretty(&summary).map_err(CairnError::from)?;
        println!("{}", json);
    } else {
        println!("{}", map);
        let stairs = dungeon.stairs();
        println!(
            "up stair: ({}, {})  down stair: ({}, {})  rebuild seed: {}",
            stairs.up.x,
            stairs.up.y,
            stairs.down.x,
            stairs.down.y,
            dungeon.rebuild_seed()
        );
    }
    Ok(())
}
