//! Property tests over generated skeletons and random feature mixes.

use cairn::utils::is_connected;
use cairn::{
    bare_terrain, parse_terrain, wall_wrap, Adjacency, DoorwayClassifier, DungeonDresser,
    EnvironmentFeatures, EnvironmentTag, FeatureConfig, FeatureFiller, FeatureKind,
    FeatureRequest, Grid, Metric, Percentage, ReachabilityField, Region, RoomCorridorSkeleton,
    SkeletonSource, Terrain,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn mixed_config(water: u8, grass: u8, boulders: u8, traps: u8, doors: u8, lake: u8, maze: u8) -> FeatureConfig {
    let requests: Vec<FeatureRequest> = [
        (FeatureKind::Water, water),
        (FeatureKind::Grass, grass),
        (FeatureKind::Boulders, boulders),
        (FeatureKind::Traps, traps),
        (FeatureKind::DoubleDoors, doors),
        (FeatureKind::Lake, lake),
        (FeatureKind::Maze, maze),
    ]
    .into_iter()
    .map(|(kind, value)| {
        FeatureRequest::new(kind, Percentage::new(value).expect("generated in range"))
    })
    .collect();
    FeatureConfig::from_requests(&requests).expect("valid config")
}

fn open_room(width: usize, height: usize) -> (Grid<Terrain>, Region) {
    let mut grid = Grid::new(width, height, Terrain::Floor);
    wall_wrap(&mut grid);
    let floor = Region::from_grid(&grid, |t| t.is_passable());
    (grid, floor)
}

/// A row of 3x3 rooms, each joined to the next through a one-cell gap.
fn room_chain(rooms: usize) -> Grid<Terrain> {
    let border = "#".repeat(4 * rooms + 1);
    let solid = format!("#{}", "...#".repeat(rooms));
    let gapped = format!("#{}#", vec!["..."; rooms].join("."));
    let text = [&border, &solid, &gapped, &solid, &border]
        .map(|row| row.as_str())
        .join("\n");
    parse_terrain(&text).expect("valid chain")
}

fn single_feature(kind: FeatureKind, value: u8) -> EnvironmentFeatures {
    let p = Percentage::new(value).expect("generated in range");
    let mut features = EnvironmentFeatures::default();
    match kind {
        FeatureKind::Water => features.water = p,
        FeatureKind::Grass => features.grass = p,
        FeatureKind::Boulders => features.boulders = p,
        FeatureKind::Traps => features.traps = p,
        _ => unreachable!("not a per-environment fill"),
    }
    features
}

fn realized_share(kind: FeatureKind, value: u8, seed: u64) -> f64 {
    let (grid, floor) = open_room(40, 30);
    let layer = FeatureFiller::default().fill(
        &grid,
        &floor,
        &single_feature(kind, value),
        &[],
        &mut StdRng::seed_from_u64(seed),
    );
    let stats = layer.stats;
    let (placed, eligible) = match kind {
        FeatureKind::Water => (stats.water, floor.count()),
        FeatureKind::Grass => (stats.grass, floor.count()),
        FeatureKind::Boulders => (stats.boulders, floor.count()),
        // every cell but the four corners has five open neighbours or more
        _ => (stats.traps, floor.count() - 4),
    };
    assert!(placed <= eligible);
    placed as f64 * 100.0 / eligible as f64
}

#[test]
fn full_requests_take_every_eligible_cell() {
    for kind in [FeatureKind::Water, FeatureKind::Grass, FeatureKind::Traps] {
        assert_eq!(realized_share(kind, 100, 100), 100.0, "{:?}", kind);
    }

    let grid = room_chain(20);
    let empty = Region::new(grid.width(), grid.height());
    let classifier = DoorwayClassifier::default();
    let viable = classifier.find_doorways(&grid, &Region::from_grid(&grid, |t| t.is_passable()), &empty);
    assert_eq!(viable.len(), 19);
    let layer = classifier.place_doors(&grid, &viable, Percentage::FULL, &[], &mut StdRng::seed_from_u64(100));
    assert_eq!(layer.doors.len(), 19);
    assert!(layer.walls.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn fills_land_near_the_requested_share(
        seed in any::<u64>(),
        kind in prop::sample::select(vec![FeatureKind::Water, FeatureKind::Grass, FeatureKind::Traps]),
        value in 0_u8..=100,
    ) {
        let share = realized_share(kind, value, seed);
        prop_assert!((share - value as f64).abs() <= 5.0, "{:?} {}% gave {:.1}%", kind, value, share);
        if value == 0 {
            prop_assert_eq!(share, 0.0);
        }
    }

    #[test]
    fn boulders_land_near_the_requested_share(seed in any::<u64>(), value in 0_u8..=30) {
        let share = realized_share(FeatureKind::Boulders, value, seed);
        prop_assert!((share - value as f64).abs() <= 5.0, "boulders {}% gave {:.1}%", value, share);
    }

    #[test]
    fn doors_land_near_the_requested_share(seed in any::<u64>(), value in 0_u8..=100) {
        let grid = room_chain(20);
        let empty = Region::new(grid.width(), grid.height());
        let classifier = DoorwayClassifier::default();
        let candidates = Region::from_grid(&grid, |t| t.is_passable());
        let viable = classifier.find_doorways(&grid, &candidates, &empty);
        let percentage = Percentage::new(value).expect("generated in range");
        let layer = classifier.place_doors(&grid, &viable, percentage, &[], &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(layer.doors.len(), percentage.of(viable.len()));
        let share = layer.doors.len() as f64 * 100.0 / viable.len() as f64;
        prop_assert!((share - value as f64).abs() <= 5.0);
    }

    #[test]
    fn dressed_dungeons_stay_connected(
        seed in any::<u64>(),
        water in 0_u8..=60,
        grass in 0_u8..=60,
        boulders in 0_u8..=15,
        traps in 0_u8..=20,
        doors in 0_u8..=100,
        lake in 0_u8..=60,
        maze in 0_u8..=60,
    ) {
        let config = mixed_config(water, grass, boulders, traps, doors, lake, maze);
        let source = RoomCorridorSkeleton::for_testing(seed);
        let mut dresser = DungeonDresser::new(config).expect("valid dresser");
        let mut rng = StdRng::seed_from_u64(seed);
        let dungeon = dresser.generate_with_retries(&source, &mut rng, 5).expect("dresses");

        let passable = Region::from_grid(dungeon.terrain(), |t| t.is_passable());
        prop_assert!(is_connected(&passable, Adjacency::Cardinal), "seed={seed}");

        let stairs = dungeon.stairs();
        prop_assert_eq!(dungeon.terrain()[stairs.up], Terrain::StairUp);
        prop_assert_eq!(dungeon.terrain()[stairs.down], Terrain::StairDown);
        for (pos, tag) in dungeon.environment().iter() {
            prop_assert_eq!(*tag != EnvironmentTag::Untouched, passable.contains(pos));
        }
    }

    #[test]
    fn down_stair_is_far_from_up_stair(seed in any::<u64>()) {
        let source = RoomCorridorSkeleton::for_testing(seed);
        let mut dresser = DungeonDresser::new(FeatureConfig::new()).expect("valid dresser");
        let mut rng = StdRng::seed_from_u64(seed);
        let dungeon = dresser.generate_with_retries(&source, &mut rng, 5).expect("dresses");

        let stairs = dungeon.stairs();
        let scan = ReachabilityField::new(dungeon.terrain(), Metric::Manhattan).scan(&[stairs.up], &[]);
        let max = scan.max_distance().expect("up stair reaches something");
        prop_assert!(scan.is_reached(stairs.down));
        prop_assert!(scan.get(stairs.down) >= 0.7 * max, "seed={seed}");
    }

    #[test]
    fn replays_are_identical(seed in any::<u64>(), water in 0_u8..=50, doors in 0_u8..=100) {
        let config = mixed_config(water, 10, 5, 5, doors, 20, 20);
        let skeleton = RoomCorridorSkeleton::for_testing(seed)
            .generate(&mut StdRng::seed_from_u64(seed))
            .expect("skeleton");
        let mut dresser = DungeonDresser::new(config.clone()).expect("valid dresser");
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
        let first = dresser.generate(&skeleton, &mut rng).expect("dresses").clone();

        let mut fresh = DungeonDresser::new(config).expect("valid dresser");
        let replay = fresh.generate_from_seed(&skeleton, first.rebuild_seed()).expect("replays");
        prop_assert_eq!(&first, replay);
    }

    #[test]
    fn bare_collapse_is_idempotent(seed in any::<u64>()) {
        let config = mixed_config(30, 20, 5, 5, 30, 25, 25);
        let source = RoomCorridorSkeleton::for_testing(seed);
        let mut dresser = DungeonDresser::new(config).expect("valid dresser");
        let mut rng = StdRng::seed_from_u64(seed);
        let dungeon = dresser.generate_with_retries(&source, &mut rng, 5).expect("dresses");

        let once = dungeon.bare();
        prop_assert_eq!(bare_terrain(&once), once.clone());
        prop_assert!(once.iter().all(|(_, t)| matches!(t, Terrain::Wall | Terrain::Floor)));
    }
}
